//! Pointer read and move capability.
//!
//! [`CursorService`] is the only way the rest of the crate touches the mouse.
//! [`EnigoCursor`] drives the pointer in-process; the bridge transport in
//! [`crate::bridge`] forwards the same two calls to a helper process.

use crate::bridge::BridgeCursor;
use crate::config::{Config, EdgePolicy, Transport};
use crate::error::{CursorError, Result};
use async_trait::async_trait;
use enigo::{Coordinate, Enigo, Mouse, Settings};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Screen coordinate of the pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x.saturating_add(dx),
            y: self.y.saturating_add(dy),
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Reads and moves the pointer.
///
/// Calls may suspend while a remote helper answers; callers await each call
/// to completion before issuing the next.
#[async_trait(?Send)]
pub trait CursorService {
    /// Current pointer location in screen coordinates.
    async fn position(&mut self) -> std::result::Result<Position, CursorError>;

    /// Move the pointer to an absolute screen coordinate.
    async fn move_to(&mut self, target: Position) -> std::result::Result<(), CursorError>;
}

#[async_trait(?Send)]
impl<S: CursorService + ?Sized> CursorService for Box<S> {
    async fn position(&mut self) -> std::result::Result<Position, CursorError> {
        (**self).position().await
    }

    async fn move_to(&mut self, target: Position) -> std::result::Result<(), CursorError> {
        (**self).move_to(target).await
    }
}

/// Build the cursor service selected by `config.transport`.
pub fn connect(config: &Config) -> Result<Box<dyn CursorService>> {
    match config.transport {
        Transport::Local => Ok(Box::new(EnigoCursor::new(config.edge_policy))),
        Transport::Bridge => Ok(Box::new(BridgeCursor::spawn(config.edge_policy)?)),
    }
}

/// In-process cursor service backed by `enigo`.
///
/// The connection to the input system is opened on first use, so a missing
/// display shows up as a failed activation instead of a failed start.
pub struct EnigoCursor {
    enigo: Option<Enigo>,
    edge_policy: EdgePolicy,
}

impl EnigoCursor {
    pub fn new(edge_policy: EdgePolicy) -> Self {
        Self {
            enigo: None,
            edge_policy,
        }
    }

    fn connection(&mut self) -> std::result::Result<&mut Enigo, CursorError> {
        if self.enigo.is_none() {
            let enigo = Enigo::new(&Settings::default()).map_err(|e| {
                let message = e.to_string();
                if message.to_lowercase().contains("permission") {
                    CursorError::permission_denied(message)
                } else {
                    CursorError::device_unavailable(message)
                }
            })?;
            debug!("opened input automation connection");
            self.enigo = Some(enigo);
        }
        self.enigo
            .as_mut()
            .ok_or_else(|| CursorError::device_unavailable("connection not initialized"))
    }
}

#[async_trait(?Send)]
impl CursorService for EnigoCursor {
    async fn position(&mut self) -> std::result::Result<Position, CursorError> {
        let enigo = self.connection()?;
        let (x, y) = enigo
            .location()
            .map_err(|e| CursorError::device_unavailable(e.to_string()))?;
        Ok(Position::new(x, y))
    }

    async fn move_to(&mut self, target: Position) -> std::result::Result<(), CursorError> {
        let policy = self.edge_policy;
        let enigo = self.connection()?;
        let (x, y) = enigo
            .location()
            .map_err(|e| CursorError::device_unavailable(e.to_string()))?;
        let display = enigo
            .main_display()
            .map_err(|e| CursorError::device_unavailable(e.to_string()))?;
        let target = fit_to_display(Position::new(x, y), target, display, policy)?;
        enigo
            .move_mouse(target.x, target.y, Coordinate::Abs)
            .map_err(|e| CursorError::device_unavailable(e.to_string()))?;
        debug!(x = target.x, y = target.y, "moved pointer");
        Ok(())
    }
}

/// Apply `policy` to a move from `origin` to `target` against the
/// `(width, height)` main display.
///
/// Only the main display's size is known. When the pointer already sits
/// outside it, it is on another monitor whose bounds are unknown, and the
/// target is passed through untouched.
pub fn fit_to_display(
    origin: Position,
    target: Position,
    (width, height): (i32, i32),
    policy: EdgePolicy,
) -> std::result::Result<Position, CursorError> {
    let on_main = |p: Position| (0..width).contains(&p.x) && (0..height).contains(&p.y);
    if on_main(target) || !on_main(origin) {
        return Ok(target);
    }

    match policy {
        EdgePolicy::Reject => Err(CursorError::OutOfBounds {
            x: target.x,
            y: target.y,
            width,
            height,
        }),
        EdgePolicy::Clamp => Ok(Position::new(
            target.x.clamp(0, (width - 1).max(0)),
            target.y.clamp(0, (height - 1).max(0)),
        )),
    }
}

/// Scripted cursor service for unit tests.
#[cfg(test)]
pub(crate) mod fake {
    use super::*;

    pub struct FakeCursor {
        pub reply: std::result::Result<Position, CursorError>,
        pub move_failure: Option<CursorError>,
        pub reads: usize,
        pub moves: Vec<Position>,
    }

    impl FakeCursor {
        pub fn at(x: i32, y: i32) -> Self {
            Self {
                reply: Ok(Position::new(x, y)),
                move_failure: None,
                reads: 0,
                moves: Vec::new(),
            }
        }

        pub fn failing(err: CursorError) -> Self {
            Self {
                reply: Err(err),
                ..Self::at(0, 0)
            }
        }
    }

    #[async_trait(?Send)]
    impl CursorService for FakeCursor {
        async fn position(&mut self) -> std::result::Result<Position, CursorError> {
            self.reads += 1;
            self.reply.clone()
        }

        async fn move_to(&mut self, target: Position) -> std::result::Result<(), CursorError> {
            if let Some(err) = self.move_failure.clone() {
                return Err(err);
            }
            self.moves.push(target);
            if let Ok(position) = self.reply.as_mut() {
                *position = target;
            }
            Ok(())
        }
    }
}
