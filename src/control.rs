//! Terminal rendition of the Start/Stop control.
//!
//! The button is drawn as a single line on stdout whenever its label changes.
//! Pressing Enter on the terminal activates it.

use crate::controller::{Affordance, Control};
use colored::Colorize;

pub struct TerminalButton {
    label: String,
    role: Option<Affordance>,
}

impl Default for TerminalButton {
    fn default() -> Self {
        Self::new()
    }
}

impl TerminalButton {
    pub fn new() -> Self {
        Self {
            label: String::new(),
            role: None,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn role(&self) -> Option<Affordance> {
        self.role
    }

    fn render(&self) {
        let label = match self.role {
            Some(Affordance::Stop) => self.label.red().bold(),
            _ => self.label.green().bold(),
        };
        println!("[ {} ]  {}", label, "enter: toggle, q: quit".dimmed());
    }
}

impl Control for TerminalButton {
    fn bind(&mut self, role: Affordance) {
        self.role = Some(role);
    }

    fn set_label(&mut self, label: &str) {
        if self.label != label {
            self.label = label.to_string();
            self.render();
        }
    }
}

/// A line typed on the terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminalCommand {
    Activate,
    Quit,
    Unknown(String),
}

pub fn parse_command(line: &str) -> TerminalCommand {
    let command = line.trim().to_lowercase();
    match command.as_str() {
        "" | "t" | "toggle" => TerminalCommand::Activate,
        "q" | "quit" | "exit" => TerminalCommand::Quit,
        _ => TerminalCommand::Unknown(command),
    }
}
