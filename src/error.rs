use thiserror::Error;

#[derive(Error, Debug)]
pub enum FeederError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("Deserialization error: {0}")]
    Deserialization(#[from] toml::de::Error),

    #[error("Invalid detection: {0}")]
    Detection(#[from] DetectionError),

    #[error("Actuator failure: {0}")]
    Actuator(#[from] ActuatorError),

    #[error("Event bus error: {0}")]
    EventBus(#[from] EventBusError),

    #[error("Detection source error: {0}")]
    Source(#[from] SourceError),

    #[error("Button error: {0}")]
    Button(#[from] ButtonError),

    #[error("System error: {message}")]
    System { message: String },

    #[error("Component error in {component}: {message}")]
    Component { component: String, message: String },
}

impl FeederError {
    pub fn system<S: Into<String>>(message: S) -> Self {
        Self::System {
            message: message.into(),
        }
    }

    pub fn component<S: Into<String>>(component: S, message: S) -> Self {
        Self::Component {
            component: component.into(),
            message: message.into(),
        }
    }
}

/// A detection record the controller refuses to act on
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DetectionError {
    #[error("confidence {confidence} is outside [0, 1]")]
    ConfidenceOutOfRange { confidence: f32 },

    #[error("unknown class id {class_id}")]
    UnknownClass { class_id: i64 },

    #[error("malformed record: {details}")]
    Malformed { details: String },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ActuatorError {
    #[error("failed to write {path}: {details}")]
    Io { path: String, details: String },

    #[error("{command} rejected: {reason}")]
    Rejected { command: String, reason: String },

    #[error("actuator unavailable: {0}")]
    Unavailable(String),
}

#[derive(Error, Debug)]
pub enum EventBusError {
    #[error("Failed to publish event: {details}")]
    PublishFailed { details: String },

    #[error("Event bus channel closed")]
    ChannelClosed,
}

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("line {line}: {details}")]
    Parse { line: u64, details: String },

    #[error("read failed: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum ButtonError {
    #[error("Button device not found: {0}")]
    DeviceNotFound(String),

    #[error("Permission denied for button device: {0}")]
    PermissionDenied(String),

    #[error("Button device error: {0}")]
    Device(String),

    #[error("Button input not available on this system")]
    NotAvailable,
}

impl ButtonError {
    /// Whether reopening the device is worth trying
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ButtonError::Device(_) | ButtonError::DeviceNotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, FeederError>;
