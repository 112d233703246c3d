use super::Actuator;
use crate::controller::ActuationCommand;
use crate::error::ActuatorError;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

/// Mock actuator for testing without real hardware.
/// Records every command it receives and fails the ones marked as failing.
#[derive(Clone, Default)]
pub struct MockActuator {
    executed: Arc<Mutex<Vec<ActuationCommand>>>,
    failing: Arc<Mutex<HashSet<ActuationCommand>>>,
    releases: Arc<Mutex<usize>>,
}

impl MockActuator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `command` fail (or succeed again) from now on
    pub fn set_failing(&self, command: ActuationCommand, failing: bool) {
        let mut set = self.failing.lock();
        if failing {
            set.insert(command);
        } else {
            set.remove(&command);
        }
    }

    /// Commands that were executed successfully, in order
    pub fn executed(&self) -> Vec<ActuationCommand> {
        self.executed.lock().clone()
    }

    /// How many times the outputs were released
    pub fn releases(&self) -> usize {
        *self.releases.lock()
    }
}

#[async_trait]
impl Actuator for MockActuator {
    async fn execute(&self, command: ActuationCommand) -> Result<(), ActuatorError> {
        if self.failing.lock().contains(&command) {
            debug!("Mock actuator failing {}", command);
            return Err(ActuatorError::Rejected {
                command: command.to_string(),
                reason: "mock failure".to_string(),
            });
        }

        debug!("Mock actuator executed {}", command);
        self.executed.lock().push(command);
        Ok(())
    }

    async fn release(&self) -> Result<(), ActuatorError> {
        debug!("Mock actuator released");
        *self.releases.lock() += 1;
        Ok(())
    }

    fn name(&self) -> &str {
        "mock"
    }
}
