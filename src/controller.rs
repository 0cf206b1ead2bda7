//! The Start/Stop toggle.
//!
//! [`ToggleController`] owns the only mutable state in the program and is the
//! only thing that calls into the [`CursorService`]. Each activation is
//! dispatched on the explicit [`ToggleState`]; the role bound to the control
//! is always derived from that state.

use crate::cursor::{CursorService, Position};
use crate::error::Result;
use crate::keep_alive::KeepAlive;
use tracing::{debug, info, warn};

/// Vertical distance the pointer moves on every start.
pub const START_OFFSET_Y: i32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ToggleState {
    #[default]
    Idle,
    Running,
}

impl ToggleState {
    /// What the next activation will do from this state.
    pub fn affordance(self) -> Affordance {
        match self {
            Self::Idle => Affordance::Start,
            Self::Running => Affordance::Stop,
        }
    }
}

/// Action offered by the control, which is also the role of its one handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Affordance {
    Start,
    Stop,
}

impl Affordance {
    pub fn label(self) -> &'static str {
        match self {
            Self::Start => "Start",
            Self::Stop => "Stop",
        }
    }
}

/// The single user-facing control.
pub trait Control {
    /// Bind the activation handler for `role`, replacing whatever was bound.
    fn bind(&mut self, role: Affordance);

    fn set_label(&mut self, label: &str);
}

pub struct ToggleController<C, S> {
    control: C,
    cursor: S,
    state: ToggleState,
}

impl<C, S> ToggleController<C, S>
where
    C: Control,
    S: CursorService,
{
    pub fn new(mut control: C, cursor: S) -> Self {
        let state = ToggleState::Idle;
        control.bind(state.affordance());
        control.set_label(state.affordance().label());
        Self {
            control,
            cursor,
            state,
        }
    }

    pub fn state(&self) -> ToggleState {
        self.state
    }

    pub fn control(&self) -> &C {
        &self.control
    }

    pub fn cursor(&self) -> &S {
        &self.cursor
    }

    /// Handle one activation of the control and return the resulting state.
    ///
    /// A failed start leaves the controller `Idle` with the control bound and
    /// labelled for Start again.
    pub async fn activate(&mut self) -> Result<ToggleState> {
        match self.state {
            ToggleState::Idle => self.start().await?,
            ToggleState::Running => self.stop(),
        }
        Ok(self.state)
    }

    async fn start(&mut self) -> Result<()> {
        self.present(Affordance::Stop);

        match self.nudge_down().await {
            Ok(target) => {
                self.state = ToggleState::Running;
                info!(x = target.x, y = target.y, "started");
                Ok(())
            }
            Err(e) => {
                self.present(self.state.affordance());
                warn!(error = %e, "start failed, staying idle");
                Err(e.into())
            }
        }
    }

    fn stop(&mut self) {
        self.present(Affordance::Start);
        self.state = ToggleState::Idle;
        info!("stopped");
    }

    async fn nudge_down(&mut self) -> std::result::Result<Position, crate::error::CursorError> {
        let current = self.cursor.position().await?;
        debug!(x = current.x, y = current.y, "read pointer");
        let target = current.offset(0, START_OFFSET_Y);
        self.cursor.move_to(target).await?;
        Ok(target)
    }

    fn present(&mut self, affordance: Affordance) {
        self.control.bind(affordance);
        self.control.set_label(affordance.label());
    }

    /// Move the pointer one keep-alive step if running.
    ///
    /// Returns whether a move happened. Failures never change the state.
    pub async fn keep_alive(&mut self, keep_alive: &mut KeepAlive) -> Result<bool> {
        if self.state != ToggleState::Running {
            return Ok(false);
        }

        let current = self.cursor.position().await?;
        let target = keep_alive.next_target(current);
        self.cursor.move_to(target).await?;
        debug!(x = target.x, y = target.y, "keep-alive nudge");
        Ok(true)
    }
}
