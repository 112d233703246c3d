use super::{ComponentRegistry, ShutdownReason};
use crate::actuator::{build_actuator, Actuator};
use crate::config::FeederConfig;
use crate::detection::LabelMap;
use crate::error::{FeederError, Result, SourceError};
use crate::events::EventBus;
use crate::keyboard_input::KeyboardInputHandler;
use crate::service::{ResetHandle, ResetRequest, ServiceStats};
use crate::status::{StatusSink, TracingStatusSink};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

pub(super) type ShutdownSender = Arc<Mutex<Option<oneshot::Sender<ShutdownReason>>>>;

/// Wires the detection source, controller task, reset inputs and actuator together
pub struct FeederOrchestrator {
    pub(super) config: FeederConfig,
    pub(super) event_bus: Arc<EventBus>,
    pub(super) labels: Option<LabelMap>,
    pub(super) actuator: Arc<dyn Actuator>,
    pub(super) status_sink: Arc<dyn StatusSink>,

    pub(super) reset_handle: ResetHandle,
    pub(super) reset_receiver: Option<mpsc::Receiver<ResetRequest>>,
    pub(super) keyboard_handler: Option<KeyboardInputHandler>,
    pub(super) keyboard_enabled: bool,

    pub(super) reader_task: Option<JoinHandle<std::result::Result<u64, SourceError>>>,
    pub(super) service_task: Option<JoinHandle<ServiceStats>>,
    pub(super) input_tasks: Vec<(&'static str, JoinHandle<()>)>,
    pub(super) final_stats: Option<ServiceStats>,

    pub(super) components: ComponentRegistry,
    pub(super) shutdown_sender: ShutdownSender,
    pub(super) shutdown_receiver: Option<oneshot::Receiver<ShutdownReason>>,
    pub(super) cancellation_token: CancellationToken,
}

impl FeederOrchestrator {
    /// Create an orchestrator driving the actuator selected in the configuration
    pub async fn new(config: FeederConfig) -> Result<Self> {
        let actuator = build_actuator(&config.actuator);
        Self::with_components(config, actuator, Arc::new(TracingStatusSink))
    }

    /// Create an orchestrator around an explicit actuator and status sink
    pub fn with_components(
        config: FeederConfig,
        actuator: Arc<dyn Actuator>,
        status_sink: Arc<dyn StatusSink>,
    ) -> Result<Self> {
        config.validate()?;

        let event_bus = Arc::new(EventBus::new(config.system.event_bus_capacity));
        let (reset_handle, reset_receiver) =
            ResetHandle::channel(config.button.reset_queue_capacity);
        let (shutdown_sender, shutdown_receiver) = oneshot::channel();

        info!(
            "Feeder orchestrator created (threshold {}, feed cooldown {}s, deterrent cooldown {}s)",
            config.controller.confidence_threshold,
            config.controller.feed_cooldown_seconds,
            config.controller.deterrent_cooldown_seconds
        );

        Ok(Self {
            config,
            event_bus,
            labels: None,
            actuator,
            status_sink,
            reset_handle,
            reset_receiver: Some(reset_receiver),
            keyboard_handler: None,
            keyboard_enabled: false,
            reader_task: None,
            service_task: None,
            input_tasks: Vec::new(),
            final_stats: None,
            components: ComponentRegistry::new(),
            shutdown_sender: Arc::new(Mutex::new(Some(shutdown_sender))),
            shutdown_receiver: Some(shutdown_receiver),
            cancellation_token: CancellationToken::new(),
        })
    }

    /// Enable or disable the debug keyboard handler
    pub fn set_keyboard_enabled(&mut self, enabled: bool) {
        self.keyboard_enabled = enabled;
    }

    pub fn config(&self) -> &FeederConfig {
        &self.config
    }

    pub fn event_bus(&self) -> Arc<EventBus> {
        Arc::clone(&self.event_bus)
    }

    /// Handle for injecting resets, e.g. from an embedding application
    pub fn reset_handle(&self) -> ResetHandle {
        self.reset_handle.clone()
    }

    pub fn components(&self) -> &ComponentRegistry {
        &self.components
    }

    /// Controller counters, available once the controller task has stopped
    pub fn stats(&self) -> Option<&ServiceStats> {
        self.final_stats.as_ref()
    }

    pub(super) fn missing(what: &str) -> FeederError {
        FeederError::system(format!("{} already taken", what))
    }
}
