use super::orchestrator::ShutdownSender;
use super::{FeederOrchestrator, ShutdownReason};
use crate::error::{FeederError, Result};
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};

impl FeederOrchestrator {
    /// Run until a signal, a quit request, or the end of the detection stream
    pub async fn run(&mut self) -> Result<i32> {
        info!("Feeder system is running");

        let shutdown_receiver = self
            .shutdown_receiver
            .take()
            .ok_or_else(|| Self::missing("Shutdown receiver"))?;
        let mut service_task = self
            .service_task
            .take()
            .ok_or_else(|| FeederError::system("Feeder system was not started"))?;

        self.setup_signal_handlers();

        let finished = tokio::select! {
            reason = shutdown_receiver => Err(reason),
            stats = &mut service_task => Ok(stats),
        };

        let shutdown_reason = match finished {
            Err(reason) => {
                self.service_task = Some(service_task);
                reason.map_err(|_| FeederError::system("Shutdown channel closed unexpectedly"))?
            }
            Ok(Ok(stats)) => {
                self.final_stats = Some(stats);
                ShutdownReason::InputEnded
            }
            Ok(Err(e)) => {
                error!("Controller task failed: {}", e);
                ShutdownReason::Error(format!("controller task failed: {}", e))
            }
        };

        info!("Shutdown initiated: {}", shutdown_reason);

        let exit_code = self.shutdown().await?.max(shutdown_reason.exit_code());

        info!("Feeder system shutdown complete");
        Ok(exit_code)
    }

    fn setup_signal_handlers(&self) {
        // Handle SIGTERM (systemd stop) - Unix only
        #[cfg(unix)]
        {
            let shutdown_sender = Arc::clone(&self.shutdown_sender);
            tokio::spawn(async move {
                let mut sigterm = match signal::unix::signal(signal::unix::SignalKind::terminate())
                {
                    Ok(sigterm) => sigterm,
                    Err(e) => {
                        error!("Failed to register SIGTERM handler: {}", e);
                        return;
                    }
                };
                if sigterm.recv().await.is_some() {
                    info!("Received SIGTERM signal");
                    Self::request_shutdown(&shutdown_sender, "SIGTERM").await;
                }
            });
        }

        let shutdown_sender = Arc::clone(&self.shutdown_sender);
        tokio::spawn(async move {
            if signal::ctrl_c().await.is_ok() {
                info!("Received SIGINT signal (Ctrl+C)");
                Self::request_shutdown(&shutdown_sender, "SIGINT").await;
            }
        });
    }

    async fn request_shutdown(sender: &ShutdownSender, signal_name: &str) {
        if let Some(sender) = sender.lock().await.take() {
            let _ = sender.send(ShutdownReason::Signal(signal_name.to_string()));
        }
    }
}
