pub mod actuator;
pub mod app;
pub mod button;
pub mod config;
pub mod controller;
pub mod cooldown;
pub mod detection;
pub mod error;
pub mod events;
pub mod keyboard_input;
pub mod service;
pub mod source;
pub mod status;

pub use actuator::{build_actuator, Actuator, FileActuator, LoggingActuator, MockActuator};
pub use app::{ComponentRegistry, ComponentState, FeederOrchestrator, ShutdownReason};
pub use button::MockButton;
#[cfg(all(feature = "button", target_os = "linux"))]
pub use button::ButtonInputHandler;
pub use config::FeederConfig;
pub use controller::{
    ActuationCommand, ActuationController, ActuationState, ControllerSettings, FrameOutcome,
    SharedController, StatusMessage,
};
pub use cooldown::{is_cooldown_expired, Debouncer};
pub use detection::{
    BoundingBox, DetectionEvent, DetectionRecord, LabelMap, RawDetection, Species, SpeciesMap,
};
pub use error::{FeederError, Result};
pub use events::{EventBus, EventFilter, EventReceiver, FeederEvent};
pub use keyboard_input::KeyboardInputHandler;
pub use service::{
    ActuationService, Clock, ManualClock, ResetHandle, ResetRequest, ResetSource, ServiceStats,
    SystemClock,
};
pub use source::{parse_frame_line, DetectionReader, FrameBatch};
pub use status::{RecordingStatusSink, StatusBoard, StatusSink, TracingStatusSink};
