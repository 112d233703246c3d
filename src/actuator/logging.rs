use super::Actuator;
use crate::controller::ActuationCommand;
use crate::error::ActuatorError;
use async_trait::async_trait;
use tracing::info;

/// Dry-run actuator that only logs what it would do
#[derive(Debug, Default)]
pub struct LoggingActuator;

impl LoggingActuator {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Actuator for LoggingActuator {
    async fn execute(&self, command: ActuationCommand) -> Result<(), ActuatorError> {
        info!(%command, "Actuator command (dry run)");
        Ok(())
    }

    fn name(&self) -> &str {
        "log"
    }
}
