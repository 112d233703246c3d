mod file;
mod logging;
mod mock;

pub use file::FileActuator;
pub use logging::LoggingActuator;
pub use mock::MockActuator;

use crate::config::{ActuatorBackend, ActuatorConfig};
use crate::controller::ActuationCommand;
use crate::error::ActuatorError;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

/// Executes controller commands against feeder and deterrent hardware.
///
/// Implementations must return quickly; anything slow (motor pulses) is
/// queued or spawned internally.
#[async_trait]
pub trait Actuator: Send + Sync {
    async fn execute(&self, command: ActuationCommand) -> Result<(), ActuatorError>;

    /// Drive every output to its idle level and finish pending pulses.
    /// Called once when the controller stops.
    async fn release(&self) -> Result<(), ActuatorError> {
        Ok(())
    }

    fn name(&self) -> &str;
}

/// Build the actuator selected in the configuration
pub fn build_actuator(config: &ActuatorConfig) -> Arc<dyn Actuator> {
    let actuator: Arc<dyn Actuator> = match config.backend {
        ActuatorBackend::File => Arc::new(FileActuator::new(config)),
        ActuatorBackend::Log => Arc::new(LoggingActuator::new()),
    };
    info!("Using {} actuator", actuator.name());
    actuator
}
