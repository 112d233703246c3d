use super::{ComponentState, FeederOrchestrator};
use crate::error::{FeederError, Result};
use std::future::Future;
use std::time::Duration;
use tokio::task::JoinError;
use tokio::time::timeout;
use tracing::{error, info, warn};

impl FeederOrchestrator {
    /// Stop every task and release the outputs; returns the process exit code
    pub async fn shutdown(&mut self) -> Result<i32> {
        info!("Beginning graceful shutdown");

        self.cancellation_token.cancel();
        let mut exit_code = 0;

        // Inputs first so no reset arrives while the controller drains
        if let Some(keyboard_handler) = self.keyboard_handler.take() {
            if let Err(e) = keyboard_handler.stop().await {
                error!("Error stopping keyboard: {}", e);
                exit_code = 1;
            }
        }
        for (component, task) in std::mem::take(&mut self.input_tasks) {
            if let Err(e) = self.stop_component(component, Duration::from_secs(2), task).await {
                error!("Error stopping {}: {}", component, e);
                exit_code = 1;
            }
        }

        if let Some(task) = self.reader_task.take() {
            match self.stop_component("source", Duration::from_secs(2), task).await {
                Ok(Ok(frames)) => info!("Detection source delivered {} frames", frames),
                Ok(Err(e)) => {
                    error!("Detection source failed: {}", e);
                    self.components.set("source", ComponentState::Failed);
                    exit_code = 1;
                }
                Err(e) => {
                    error!("Error stopping source: {}", e);
                    exit_code = 1;
                }
            }
        }

        // The controller clears an asserted deterrent on its way out
        if let Some(task) = self.service_task.take() {
            match self.stop_component("controller", Duration::from_secs(5), task).await {
                Ok(stats) => self.final_stats = Some(stats),
                Err(e) => {
                    error!("Error stopping controller: {}", e);
                    exit_code = 1;
                }
            }
        } else if self.final_stats.is_some() {
            self.components.set("controller", ComponentState::Stopped);
        }

        if let Some(stats) = &self.final_stats {
            info!("Session summary: {}", stats);
        }

        info!("Graceful shutdown completed with exit code: {}", exit_code);
        Ok(exit_code)
    }

    /// Wait for a component's task to finish within `limit`
    async fn stop_component<T, F>(
        &self,
        component: &'static str,
        limit: Duration,
        task: F,
    ) -> Result<T>
    where
        F: Future<Output = std::result::Result<T, JoinError>>,
    {
        info!("Stopping {} component", component);
        self.components.set(component, ComponentState::Stopping);

        match timeout(limit, task).await {
            Ok(Ok(value)) => {
                self.components.set(component, ComponentState::Stopped);
                info!("{} component stopped", component);
                Ok(value)
            }
            Ok(Err(e)) => {
                self.components.set(component, ComponentState::Failed);
                Err(FeederError::component(component.to_string(), e.to_string()))
            }
            Err(_) => {
                self.components.set(component, ComponentState::Failed);
                warn!("{} component stop timeout", component);
                Err(FeederError::component(
                    component.to_string(),
                    format!("stop timed out after {:?}", limit),
                ))
            }
        }
    }
}
