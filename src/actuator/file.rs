use super::Actuator;
use crate::config::ActuatorConfig;
use crate::controller::ActuationCommand;
use crate::error::ActuatorError;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

const HIGH: &str = "1";
const LOW: &str = "0";

/// Drives sysfs-style value files: the feeder line is pulsed, the deterrent
/// line follows assert/clear
pub struct FileActuator {
    feeder_path: PathBuf,
    deterrent_path: PathBuf,
    pulse: Duration,
    pending_pulse: Mutex<Option<JoinHandle<()>>>,
}

/// Pulls the feeder line low when dropped unless the pulse ended normally.
/// A pulse task dropped with its runtime still ends the pulse.
struct PulseGuard {
    path: PathBuf,
    armed: bool,
}

impl Drop for PulseGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        match std::fs::write(&self.path, LOW) {
            Ok(()) => warn!("Feeder pulse cut short, line forced low"),
            Err(e) => error!(
                "Failed to force feeder line {} low: {}",
                self.path.display(),
                e
            ),
        }
    }
}

impl FileActuator {
    pub fn new(config: &ActuatorConfig) -> Self {
        Self {
            feeder_path: PathBuf::from(&config.feeder_path),
            deterrent_path: PathBuf::from(&config.deterrent_path),
            pulse: Duration::from_millis(config.feeder_pulse_ms),
            pending_pulse: Mutex::new(None),
        }
    }

    async fn write_value(path: &Path, value: &str) -> Result<(), ActuatorError> {
        tokio::fs::write(path, value)
            .await
            .map_err(|e| ActuatorError::Io {
                path: path.display().to_string(),
                details: e.to_string(),
            })?;
        debug!("Wrote {} to {}", value, path.display());
        Ok(())
    }

    /// Stop a running pulse; its guard pulls the line low
    async fn cancel_pulse(&self) {
        let pending = self.pending_pulse.lock().take();
        if let Some(handle) = pending {
            handle.abort();
            let _ = handle.await;
        }
    }

    fn start_pulse(&self) {
        let mut guard = PulseGuard {
            path: self.feeder_path.clone(),
            armed: true,
        };
        let pulse = self.pulse;

        let handle = tokio::spawn(async move {
            tokio::time::sleep(pulse).await;
            match Self::write_value(&guard.path, LOW).await {
                Ok(()) => guard.armed = false,
                Err(e) => error!("Failed to end feeder pulse: {}", e),
            }
        });
        *self.pending_pulse.lock() = Some(handle);
    }
}

#[async_trait]
impl Actuator for FileActuator {
    async fn execute(&self, command: ActuationCommand) -> Result<(), ActuatorError> {
        match command {
            ActuationCommand::Feed => {
                self.cancel_pulse().await;
                Self::write_value(&self.feeder_path, HIGH).await?;
                self.start_pulse();
                Ok(())
            }
            ActuationCommand::AssertDeterrent => {
                Self::write_value(&self.deterrent_path, HIGH).await
            }
            ActuationCommand::ClearDeterrent => Self::write_value(&self.deterrent_path, LOW).await,
        }
    }

    async fn release(&self) -> Result<(), ActuatorError> {
        self.cancel_pulse().await;
        Self::write_value(&self.feeder_path, LOW).await
    }

    fn name(&self) -> &str {
        "file"
    }
}
