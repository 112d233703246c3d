use crate::config::ButtonConfig;
use crate::cooldown::Debouncer;
use crate::error::ButtonError;
use crate::events::{EventBus, FeederEvent};
use crate::service::{ResetHandle, ResetSource};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use evdev::{Device, EventType, InputEventKind};

/// Reset button handler reading key presses from an evdev input device
pub struct ButtonInputHandler {
    pub(crate) device_path: String,
    pub(crate) key_code: Option<u16>,
    pub(crate) debounce: Duration,
    reset: ResetHandle,
    event_bus: Arc<EventBus>,
    max_retries: u32,
    retry_delay: Duration,
}

impl ButtonInputHandler {
    pub fn new(config: &ButtonConfig, reset: ResetHandle, event_bus: Arc<EventBus>) -> Self {
        Self {
            device_path: config.device.clone(),
            key_code: config.key_code,
            debounce: Duration::from_millis(config.debounce_ms),
            reset,
            event_bus,
            max_retries: 10,
            retry_delay: Duration::from_secs(1),
        }
    }

    /// Start monitoring the button in a background task
    pub fn start(&self, cancel: CancellationToken) -> JoinHandle<()> {
        info!("Starting reset button handler for device: {}", self.device_path);

        let device_path = self.device_path.clone();
        let key_code = self.key_code;
        let reset = self.reset.clone();
        let event_bus = Arc::clone(&self.event_bus);
        let max_retries = self.max_retries;
        let retry_delay = self.retry_delay;
        let mut debouncer = Debouncer::new(self.debounce);

        tokio::spawn(async move {
            let mut retry_count = 0;

            loop {
                match Self::monitor_button_device(
                    &device_path,
                    key_code,
                    &mut debouncer,
                    &reset,
                    &cancel,
                )
                .await
                {
                    Ok(()) => {
                        info!("Button monitoring ended normally");
                        break;
                    }
                    Err(e) => {
                        error!("Button device error: {}", e);
                        retry_count += 1;

                        let _ = event_bus.publish(FeederEvent::SystemError {
                            component: "button".to_string(),
                            error: format!("Attempt {}/{}: {}", retry_count, max_retries, e),
                        });

                        if !e.is_recoverable() || retry_count >= max_retries {
                            error!(
                                "Reset button unavailable after {} attempts, giving up",
                                retry_count
                            );
                            break;
                        }

                        let delay = retry_delay * 2_u32.pow(retry_count.min(5));
                        warn!(
                            "Retrying button device in {:?} (attempt {}/{})",
                            delay, retry_count, max_retries
                        );

                        tokio::select! {
                            _ = cancel.cancelled() => break,
                            _ = sleep(delay) => {}
                        }
                    }
                }
            }
        })
    }

    async fn monitor_button_device(
        device_path: &str,
        key_code: Option<u16>,
        debouncer: &mut Debouncer,
        reset: &ResetHandle,
        cancel: &CancellationToken,
    ) -> Result<(), ButtonError> {
        let device = Device::open(device_path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ButtonError::DeviceNotFound(device_path.to_string()),
            std::io::ErrorKind::PermissionDenied => {
                ButtonError::PermissionDenied(device_path.to_string())
            }
            _ => ButtonError::Device(format!("Failed to open {}: {}", device_path, e)),
        })?;

        info!(
            "Button device opened: {} ({})",
            device_path,
            device.name().unwrap_or("Unknown")
        );

        if !device.supported_events().contains(EventType::KEY) {
            return Err(ButtonError::Device(format!(
                "{} does not support key events",
                device_path
            )));
        }

        let mut events = device
            .into_event_stream()
            .map_err(|e| ButtonError::Device(format!("Failed to stream {}: {}", device_path, e)))?;

        loop {
            let event = tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                event = events.next_event() => event
                    .map_err(|e| ButtonError::Device(format!("Read from {} failed: {}", device_path, e)))?,
            };

            if !Self::is_reset_press(&event, key_code) {
                continue;
            }

            if debouncer.accept() {
                debug!("Reset button pressed");
                if !reset.request(ResetSource::Button) {
                    return Ok(());
                }
            } else {
                debug!("Button press debounced");
            }
        }
    }

    /// Key-down of the configured key, or of any key when none is configured
    pub(crate) fn is_reset_press(event: &evdev::InputEvent, key_code: Option<u16>) -> bool {
        match event.kind() {
            InputEventKind::Key(key) => {
                event.value() == 1 && key_code.map_or(true, |code| key.code() == code)
            }
            _ => false,
        }
    }
}
