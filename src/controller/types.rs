use crate::error::DetectionError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Display line used for transitions
pub const PRIMARY_LINE: usize = 0;
/// Display line used for diagnostics (rejected input, actuator failures)
pub const DIAGNOSTIC_LINE: usize = 1;

/// Hardware action decided by the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActuationCommand {
    Feed,
    AssertDeterrent,
    ClearDeterrent,
}

impl fmt::Display for ActuationCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ActuationCommand::Feed => "feed",
            ActuationCommand::AssertDeterrent => "assert_deterrent",
            ActuationCommand::ClearDeterrent => "clear_deterrent",
        };
        f.write_str(name)
    }
}

/// Text for one line of the status display
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub line: usize,
    pub text: String,
}

impl StatusMessage {
    pub fn primary<S: Into<String>>(text: S) -> Self {
        Self {
            line: PRIMARY_LINE,
            text: text.into(),
        }
    }

    pub fn diagnostic<S: Into<String>>(text: S) -> Self {
        Self {
            line: DIAGNOSTIC_LINE,
            text: text.into(),
        }
    }
}

/// Everything one `process` or `reset` call decided, in emission order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameOutcome {
    pub commands: Vec<ActuationCommand>,
    pub statuses: Vec<StatusMessage>,
    pub rejected: Vec<DetectionError>,
    pub clock_anomaly: bool,
}

impl FrameOutcome {
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty() && self.statuses.is_empty() && self.rejected.is_empty()
    }

    pub fn contains(&self, command: ActuationCommand) -> bool {
        self.commands.contains(&command)
    }

    pub(crate) fn emit(&mut self, command: ActuationCommand, status: StatusMessage) {
        self.commands.push(command);
        self.statuses.push(status);
    }
}
