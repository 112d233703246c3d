use super::{ComponentState, FeederOrchestrator, ShutdownReason};
use crate::controller::{ActuationController, ControllerSettings};
use crate::detection::LabelMap;
use crate::error::Result;
use crate::events::{EventFilter, FeederEvent};
use crate::keyboard_input::KeyboardInputHandler;
use crate::service::ActuationService;
use crate::source::DetectionReader;
use crate::status::StatusBoard;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info};

impl FeederOrchestrator {
    /// Load the label map and register the components that will run
    pub async fn initialize(&mut self) -> Result<()> {
        info!("Initializing feeder components");

        if let Some(path) = &self.config.labels.path {
            let labels = LabelMap::load(path).map_err(|e| {
                error!("Failed to load labels from {}: {}", path, e);
                e
            })?;
            info!("Loaded {} labels from {}", labels.len(), path);
            self.labels = Some(labels);
        }

        self.components.set("controller", ComponentState::Stopped);
        self.components.set("source", ComponentState::Stopped);
        if self.config.button.enabled {
            self.components.set("button", ComponentState::Stopped);
        }
        if self.keyboard_enabled {
            self.components.set("keyboard", ComponentState::Stopped);
        }

        info!("All components initialized successfully");
        Ok(())
    }

    /// Spawn the controller task, the detection reader and the reset inputs
    pub async fn start(&mut self) -> Result<()> {
        info!("Starting feeder system");

        let reset_receiver = self
            .reset_receiver
            .take()
            .ok_or_else(|| Self::missing("Reset receiver"))?;
        let (frame_sender, frame_receiver) =
            mpsc::channel(self.config.input.frame_queue_capacity);

        // Subscribe before any input can publish a quit request
        self.watch_shutdown_requests();

        self.components.set("controller", ComponentState::Starting);
        let controller = ActuationController::new(ControllerSettings::from(&self.config.controller));
        let board = StatusBoard::new(&self.config.display, Arc::clone(&self.status_sink));
        let mut service = ActuationService::new(
            controller,
            Arc::clone(&self.actuator),
            board,
            Arc::clone(&self.event_bus),
        );
        if let Some(labels) = &self.labels {
            service = service.with_labels(labels.clone());
        }
        let cancel = self.cancellation_token.clone();
        self.service_task = Some(tokio::spawn(service.run(
            frame_receiver,
            reset_receiver,
            cancel,
        )));
        self.components.set("controller", ComponentState::Running);

        self.components.set("source", ComponentState::Starting);
        let reader = DetectionReader::new(&self.config.input);
        let cancel = self.cancellation_token.clone();
        self.reader_task = Some(tokio::spawn(reader.run(frame_sender, cancel)));
        self.components.set("source", ComponentState::Running);

        if self.config.button.enabled {
            self.start_button();
        }

        if self.keyboard_enabled {
            self.components.set("keyboard", ComponentState::Starting);
            let handler =
                KeyboardInputHandler::new(self.reset_handle.clone(), Arc::clone(&self.event_bus));
            match handler.start() {
                Ok(task) => {
                    self.input_tasks.push(("keyboard", task));
                    self.keyboard_handler = Some(handler);
                    self.components.set("keyboard", ComponentState::Running);
                }
                Err(e) => {
                    error!("Failed to start keyboard handler: {}", e);
                    self.components.set("keyboard", ComponentState::Failed);
                }
            }
        }

        info!("Feeder system started successfully");
        Ok(())
    }

    #[cfg(all(feature = "button", target_os = "linux"))]
    fn start_button(&mut self) {
        self.components.set("button", ComponentState::Starting);
        let handler = crate::button::ButtonInputHandler::new(
            &self.config.button,
            self.reset_handle.clone(),
            Arc::clone(&self.event_bus),
        );
        let task = handler.start(self.cancellation_token.clone());
        self.input_tasks.push(("button", task));
        self.components.set("button", ComponentState::Running);
    }

    #[cfg(not(all(feature = "button", target_os = "linux")))]
    fn start_button(&mut self) {
        tracing::warn!(
            "Reset button enabled but unusable: {}",
            crate::error::ButtonError::NotAvailable
        );
        self.components.set("button", ComponentState::Failed);
    }

    /// Turn `ShutdownRequested` events from the bus into a shutdown
    fn watch_shutdown_requests(&self) {
        let mut requests = self.event_bus.subscribe_filtered(
            EventFilter::EventTypes(vec!["shutdown_requested"]),
            "orchestrator",
        );
        let shutdown_sender = Arc::clone(&self.shutdown_sender);
        let cancel = self.cancellation_token.clone();

        tokio::spawn(async move {
            let event = tokio::select! {
                _ = cancel.cancelled() => return,
                event = requests.recv() => event,
            };
            if let Ok(FeederEvent::ShutdownRequested { reason, .. }) = event {
                info!("Shutdown requested over the event bus: {}", reason);
                if let Some(sender) = shutdown_sender.lock().await.take() {
                    let _ = sender.send(ShutdownReason::UserRequest);
                }
            }
        });
    }
}
