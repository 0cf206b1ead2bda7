//! # Green Dot
//!
//! A single Start/Stop control that nudges the mouse cursor.
//!
//! Activating the control while idle reads the pointer position and moves
//! the pointer 100 pixels down, then offers Stop. Activating it again returns
//! to idle without touching the pointer. Optionally the pointer is wiggled
//! periodically for as long as the toggle is running.
//!
//! ## Example
//!
//! ```no_run
//! use green_dot::{EdgePolicy, EnigoCursor, TerminalButton, ToggleController};
//!
//! # async fn demo() -> green_dot::Result<()> {
//! let cursor = EnigoCursor::new(EdgePolicy::Clamp);
//! let mut controller = ToggleController::new(TerminalButton::new(), cursor);
//! controller.activate().await?; // pointer moves down, label reads "Stop"
//! controller.activate().await?; // back to "Start"
//! # Ok(())
//! # }
//! ```
//!
//! ## Configuration
//!
//! ```json
//! {
//!   "transport": "bridge",
//!   "toggle_hotkey": "ctrl+alt+g",
//!   "keep_alive": "3s",
//!   "edge_policy": "reject"
//! }
//! ```

pub mod app;
pub mod bridge;
pub mod config;
pub mod control;
pub mod controller;
pub mod cursor;
pub mod error;
pub mod global_hotkey;
pub mod keep_alive;

pub use app::{App, AppEvent, Source};
pub use bridge::BridgeCursor;
pub use config::{Config, EdgePolicy, Transport};
pub use control::TerminalButton;
pub use controller::{Affordance, Control, ToggleController, ToggleState};
pub use cursor::{CursorService, EnigoCursor, Position};
pub use error::{CursorError, GreenDotError, Result};
pub use global_hotkey::HotkeyManager;
pub use keep_alive::KeepAlive;
