use crate::controller::ActuationCommand;
use crate::error::EventBusError;
use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

/// Events that can occur in the feeder system
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FeederEvent {
    /// A feeding command was issued
    FeedingTriggered { feed_count: u64, timestamp: SystemTime },
    /// An intruder was sighted and the deterrent asserted
    DeterrentRaised { timestamp: SystemTime },
    /// The intruder left and the deterrent was cleared
    DeterrentCleared { timestamp: SystemTime },
    /// The controller state was reinitialized
    ResetPerformed { timestamp: SystemTime },
    /// A detection record was rejected
    InvalidDetection { reason: String },
    /// The actuator could not execute a command
    ActuatorFailed { command: ActuationCommand, error: String },
    /// The clock went backwards between two frames
    ClockAnomaly { timestamp: SystemTime },
    /// A system error occurred in a component
    SystemError { component: String, error: String },
    /// System shutdown requested
    ShutdownRequested { timestamp: SystemTime, reason: String },
}

impl FeederEvent {
    /// Get a human-readable description of the event
    pub fn description(&self) -> String {
        match self {
            FeederEvent::FeedingTriggered { feed_count, .. } => {
                format!("Feeding #{} triggered", feed_count)
            }
            FeederEvent::DeterrentRaised { .. } => "Deterrent raised".to_string(),
            FeederEvent::DeterrentCleared { .. } => "Deterrent cleared".to_string(),
            FeederEvent::ResetPerformed { .. } => "Controller reset".to_string(),
            FeederEvent::InvalidDetection { reason } => {
                format!("Invalid detection: {}", reason)
            }
            FeederEvent::ActuatorFailed { command, error } => {
                format!("Actuator failed on {}: {}", command, error)
            }
            FeederEvent::ClockAnomaly { .. } => "Clock moved backwards".to_string(),
            FeederEvent::SystemError { component, error } => {
                format!("Error in {}: {}", component, error)
            }
            FeederEvent::ShutdownRequested { reason, .. } => {
                format!("Shutdown requested: {}", reason)
            }
        }
    }

    /// Get the event type as a string for filtering
    pub fn event_type(&self) -> &'static str {
        match self {
            FeederEvent::FeedingTriggered { .. } => "feeding_triggered",
            FeederEvent::DeterrentRaised { .. } => "deterrent_raised",
            FeederEvent::DeterrentCleared { .. } => "deterrent_cleared",
            FeederEvent::ResetPerformed { .. } => "reset_performed",
            FeederEvent::InvalidDetection { .. } => "invalid_detection",
            FeederEvent::ActuatorFailed { .. } => "actuator_failed",
            FeederEvent::ClockAnomaly { .. } => "clock_anomaly",
            FeederEvent::SystemError { .. } => "system_error",
            FeederEvent::ShutdownRequested { .. } => "shutdown_requested",
        }
    }
}

/// Async event bus for component coordination using broadcast channels
pub struct EventBus {
    sender: broadcast::Sender<FeederEvent>,
}

impl EventBus {
    /// Create a new event bus with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to events and get a receiver
    pub fn subscribe(&self) -> broadcast::Receiver<FeederEvent> {
        self.sender.subscribe()
    }

    /// Subscribe with a filter
    pub fn subscribe_filtered(&self, filter: EventFilter, name: &str) -> EventReceiver {
        EventReceiver::new(self.sender.subscribe(), filter, name.to_string())
    }

    /// Publish an event to all subscribers.
    ///
    /// Having no subscribers is not an error; the event is simply dropped.
    pub fn publish(&self, event: FeederEvent) -> Result<usize, EventBusError> {
        match &event {
            FeederEvent::ActuatorFailed { command, error } => {
                error!("Actuator failed on {}: {}", command, error);
            }
            FeederEvent::SystemError { component, error } => {
                error!("System error in {}: {}", component, error);
            }
            FeederEvent::ClockAnomaly { .. } => {
                warn!("Clock anomaly reported");
            }
            FeederEvent::ShutdownRequested { reason, .. } => {
                info!("Shutdown requested: {}", reason);
            }
            _ => {
                debug!("Event: {}", event.description());
            }
        }

        if self.sender.receiver_count() == 0 {
            return Ok(0);
        }

        self.sender
            .send(event)
            .map_err(|e| EventBusError::PublishFailed {
                details: e.to_string(),
            })
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Clone for EventBus {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

/// Event filter for selective event handling
#[derive(Debug, Clone)]
pub enum EventFilter {
    /// Accept all events
    All,
    /// Accept only specific event types
    EventTypes(Vec<&'static str>),
    /// Custom filter function
    Custom(fn(&FeederEvent) -> bool),
}

impl EventFilter {
    /// Check if an event passes this filter
    pub fn matches(&self, event: &FeederEvent) -> bool {
        match self {
            EventFilter::All => true,
            EventFilter::EventTypes(types) => types.contains(&event.event_type()),
            EventFilter::Custom(filter_fn) => filter_fn(event),
        }
    }
}

/// Event receiver with filtering
pub struct EventReceiver {
    receiver: broadcast::Receiver<FeederEvent>,
    filter: EventFilter,
    name: String,
}

impl EventReceiver {
    pub fn new(
        receiver: broadcast::Receiver<FeederEvent>,
        filter: EventFilter,
        name: String,
    ) -> Self {
        Self {
            receiver,
            filter,
            name,
        }
    }

    /// Receive the next event passing the filter; lagging is logged and skipped
    pub async fn recv(&mut self) -> Result<FeederEvent, EventBusError> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => {
                    if self.filter.matches(&event) {
                        debug!(
                            "Receiver '{}' received event: {}",
                            self.name,
                            event.description()
                        );
                        return Ok(event);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("Receiver '{}' lagged behind by {} events", self.name, n);
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!("Event bus closed for receiver '{}'", self.name);
                    return Err(EventBusError::ChannelClosed);
                }
            }
        }
    }
}
