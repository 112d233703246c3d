use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct FeederConfig {
    #[serde(default)]
    pub controller: ControllerConfig,
    #[serde(default)]
    pub labels: LabelsConfig,
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub actuator: ActuatorConfig,
    #[serde(default)]
    pub button: ButtonConfig,
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub system: SystemConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ControllerConfig {
    /// Detections must score strictly above this to be acted upon
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f32,

    /// Minimum time between two feedings
    #[serde(default = "default_feed_cooldown")]
    pub feed_cooldown_seconds: u64,

    /// Quiet period after the last intruder sighting before the deterrent clears
    #[serde(default = "default_deterrent_cooldown")]
    pub deterrent_cooldown_seconds: u64,

    /// Class id that triggers a feeding
    #[serde(default = "default_feed_species")]
    pub feed_species: u32,

    /// Class id that triggers the deterrent
    #[serde(default = "default_intruder_species")]
    pub intruder_species: u32,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct LabelsConfig {
    /// Optional label file ("<id> <name>" per line)
    pub path: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct InputConfig {
    /// JSON-lines detection stream, "-" for stdin
    #[serde(default = "default_input_path")]
    pub path: String,

    /// Frames buffered between the reader and the controller
    #[serde(default = "default_frame_queue_capacity")]
    pub frame_queue_capacity: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ActuatorBackend {
    File,
    Log,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ActuatorConfig {
    #[serde(default = "default_actuator_backend")]
    pub backend: ActuatorBackend,

    /// Value file driving the feeder motor line
    #[serde(default = "default_feeder_path")]
    pub feeder_path: String,

    /// Value file driving the deterrent light
    #[serde(default = "default_deterrent_path")]
    pub deterrent_path: String,

    /// How long the feeder line is held high per feeding
    #[serde(default = "default_feeder_pulse_ms")]
    pub feeder_pulse_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ButtonConfig {
    #[serde(default = "default_button_enabled")]
    pub enabled: bool,

    /// Input device exposing the reset button
    #[serde(default = "default_button_device")]
    pub device: String,

    /// Only this key code resets; any key press when unset
    pub key_code: Option<u16>,

    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    #[serde(default = "default_reset_queue_capacity")]
    pub reset_queue_capacity: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DisplayConfig {
    /// Number of text lines on the status display
    #[serde(default = "default_display_lines")]
    pub lines: usize,

    /// Shown on the first line while no intruder is around
    #[serde(default = "default_idle_banner")]
    pub idle_banner: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SystemConfig {
    /// Event bus capacity
    #[serde(default = "default_event_bus_capacity")]
    pub event_bus_capacity: usize,
}

impl FeederConfig {
    /// Load configuration from a specific file path
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy();
        debug!("Loading configuration from: {}", path_str);

        let settings = Config::builder()
            .set_default(
                "controller.confidence_threshold",
                default_confidence_threshold() as f64,
            )?
            .set_default("controller.feed_cooldown_seconds", default_feed_cooldown())?
            .set_default(
                "controller.deterrent_cooldown_seconds",
                default_deterrent_cooldown(),
            )?
            .set_default("controller.feed_species", default_feed_species())?
            .set_default("controller.intruder_species", default_intruder_species())?
            .set_default("input.path", default_input_path())?
            .set_default(
                "input.frame_queue_capacity",
                default_frame_queue_capacity() as i64,
            )?
            .set_default("actuator.backend", "log")?
            .set_default("actuator.feeder_path", default_feeder_path())?
            .set_default("actuator.deterrent_path", default_deterrent_path())?
            .set_default("actuator.feeder_pulse_ms", default_feeder_pulse_ms())?
            .set_default("button.enabled", default_button_enabled())?
            .set_default("button.device", default_button_device())?
            .set_default("button.debounce_ms", default_debounce_ms())?
            .set_default(
                "button.reset_queue_capacity",
                default_reset_queue_capacity() as i64,
            )?
            .set_default("display.lines", default_display_lines() as i64)?
            .set_default("display.idle_banner", default_idle_banner())?
            .set_default(
                "system.event_bus_capacity",
                default_event_bus_capacity() as i64,
            )?
            .add_source(File::with_name(&path_str).required(false))
            // FEEDER_CONTROLLER__FEED_COOLDOWN_SECONDS=20 overrides controller.feed_cooldown_seconds
            .add_source(
                Environment::with_prefix("FEEDER")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: FeederConfig = settings.try_deserialize()?;

        info!("Configuration loaded successfully");
        debug!("Final configuration: {:#?}", config);

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        let threshold = self.controller.confidence_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ConfigError::Message(format!(
                "Confidence threshold must be within [0, 1], got {}",
                threshold
            )));
        }

        if self.controller.feed_species == self.controller.intruder_species {
            return Err(ConfigError::Message(
                "Feed species and intruder species must differ".to_string(),
            ));
        }

        if self.input.frame_queue_capacity == 0 {
            return Err(ConfigError::Message(
                "Frame queue capacity must be greater than 0".to_string(),
            ));
        }

        if self.button.reset_queue_capacity == 0 {
            return Err(ConfigError::Message(
                "Reset queue capacity must be greater than 0".to_string(),
            ));
        }

        if self.display.lines < 2 {
            return Err(ConfigError::Message(
                "Status display needs at least 2 lines".to_string(),
            ));
        }

        if self.actuator.backend == ActuatorBackend::File
            && (self.actuator.feeder_path.is_empty() || self.actuator.deterrent_path.is_empty())
        {
            return Err(ConfigError::Message(
                "File actuator backend requires feeder_path and deterrent_path".to_string(),
            ));
        }

        if self.system.event_bus_capacity == 0 {
            return Err(ConfigError::Message(
                "Event bus capacity must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

impl ControllerConfig {
    pub fn feed_cooldown(&self) -> Duration {
        Duration::from_secs(self.feed_cooldown_seconds)
    }

    pub fn deterrent_cooldown(&self) -> Duration {
        Duration::from_secs(self.deterrent_cooldown_seconds)
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: default_confidence_threshold(),
            feed_cooldown_seconds: default_feed_cooldown(),
            deterrent_cooldown_seconds: default_deterrent_cooldown(),
            feed_species: default_feed_species(),
            intruder_species: default_intruder_species(),
        }
    }
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            path: default_input_path(),
            frame_queue_capacity: default_frame_queue_capacity(),
        }
    }
}

impl Default for ActuatorConfig {
    fn default() -> Self {
        Self {
            backend: default_actuator_backend(),
            feeder_path: default_feeder_path(),
            deterrent_path: default_deterrent_path(),
            feeder_pulse_ms: default_feeder_pulse_ms(),
        }
    }
}

impl Default for ButtonConfig {
    fn default() -> Self {
        Self {
            enabled: default_button_enabled(),
            device: default_button_device(),
            key_code: None,
            debounce_ms: default_debounce_ms(),
            reset_queue_capacity: default_reset_queue_capacity(),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            lines: default_display_lines(),
            idle_banner: default_idle_banner(),
        }
    }
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            event_bus_capacity: default_event_bus_capacity(),
        }
    }
}

// Default value functions
fn default_confidence_threshold() -> f32 {
    0.99
}
fn default_feed_cooldown() -> u64 {
    10
}
fn default_deterrent_cooldown() -> u64 {
    5
}
fn default_feed_species() -> u32 {
    0
}
fn default_intruder_species() -> u32 {
    1
}

fn default_input_path() -> String {
    "-".to_string()
}
fn default_frame_queue_capacity() -> usize {
    32
}

fn default_actuator_backend() -> ActuatorBackend {
    ActuatorBackend::Log
}
fn default_feeder_path() -> String {
    "/sys/class/gpio/gpio17/value".to_string()
}
fn default_deterrent_path() -> String {
    "/sys/class/gpio/gpio27/value".to_string()
}
fn default_feeder_pulse_ms() -> u64 {
    500
}

fn default_button_enabled() -> bool {
    true
}
fn default_button_device() -> String {
    "/dev/input/event0".to_string()
}
fn default_debounce_ms() -> u64 {
    100
}
fn default_reset_queue_capacity() -> usize {
    4
}

fn default_display_lines() -> usize {
    2
}
fn default_idle_banner() -> String {
    "Cat Feeder System".to_string()
}

fn default_event_bus_capacity() -> usize {
    100
}
