use crate::error::Result;
use crate::events::{EventBus, FeederEvent};
use crate::service::{ResetHandle, ResetSource};
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::task::{self, JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// What a debug key press asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Reset,
    Quit,
}

impl KeyAction {
    pub fn from_key(code: KeyCode) -> Option<Self> {
        match code {
            KeyCode::Char('r') | KeyCode::Char('R') => Some(KeyAction::Reset),
            KeyCode::Char('q') | KeyCode::Esc => Some(KeyAction::Quit),
            _ => None,
        }
    }
}

/// Keyboard input handler for debugging without a reset button
pub struct KeyboardInputHandler {
    reset: ResetHandle,
    event_bus: Arc<EventBus>,
    cancellation_token: CancellationToken,
}

impl KeyboardInputHandler {
    pub fn new(reset: ResetHandle, event_bus: Arc<EventBus>) -> Self {
        Self {
            reset,
            event_bus,
            cancellation_token: CancellationToken::new(),
        }
    }

    /// Start listening for keyboard input
    pub fn start(&self) -> Result<JoinHandle<()>> {
        info!("Starting keyboard input handler - press 'r' to reset, 'q' to quit");

        let reset = self.reset.clone();
        let event_bus = Arc::clone(&self.event_bus);
        let cancellation_token = self.cancellation_token.clone();

        let handle = task::spawn_blocking(move || {
            if let Err(e) = enable_raw_mode() {
                error!("Failed to enable raw mode for keyboard input: {}", e);
                return;
            }

            loop {
                if cancellation_token.is_cancelled() {
                    debug!("Keyboard input handler stopping");
                    break;
                }

                match event::poll(Duration::from_millis(100)) {
                    Ok(true) => {
                        let Ok(Event::Key(key_event)) = event::read() else {
                            continue;
                        };
                        if key_event.kind != KeyEventKind::Press {
                            continue;
                        }

                        match KeyAction::from_key(key_event.code) {
                            Some(KeyAction::Reset) => {
                                info!("Reset key pressed");
                                if !reset.request(ResetSource::Keyboard) {
                                    break;
                                }
                            }
                            Some(KeyAction::Quit) => {
                                info!("Quit key pressed - requesting shutdown");
                                if let Err(e) = event_bus.publish(FeederEvent::ShutdownRequested {
                                    timestamp: SystemTime::now(),
                                    reason: "User requested via keyboard".to_string(),
                                }) {
                                    warn!("Failed to publish shutdown event: {}", e);
                                }
                                break;
                            }
                            None => debug!("Key pressed: {:?}", key_event.code),
                        }
                    }
                    Ok(false) => {}
                    Err(e) => {
                        warn!("Error polling for keyboard events: {}", e);
                    }
                }
            }

            if let Err(e) = disable_raw_mode() {
                error!("Failed to disable raw mode: {}", e);
            }
            debug!("Keyboard input handler task exited");
        });

        Ok(handle)
    }

    /// Stop the keyboard input handler
    pub async fn stop(&self) -> Result<()> {
        info!("Stopping keyboard input handler");
        self.cancellation_token.cancel();

        // Give the poll loop a chance to restore the terminal itself
        tokio::time::sleep(Duration::from_millis(200)).await;
        let _ = disable_raw_mode();

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_mapping() {
        assert_eq!(KeyAction::from_key(KeyCode::Char('r')), Some(KeyAction::Reset));
        assert_eq!(KeyAction::from_key(KeyCode::Char('R')), Some(KeyAction::Reset));
        assert_eq!(KeyAction::from_key(KeyCode::Char('q')), Some(KeyAction::Quit));
        assert_eq!(KeyAction::from_key(KeyCode::Esc), Some(KeyAction::Quit));
        assert_eq!(KeyAction::from_key(KeyCode::Char(' ')), None);
    }

    #[tokio::test]
    async fn test_keyboard_handler_creation() {
        let (reset, _receiver) = ResetHandle::channel(1);
        let handler = KeyboardInputHandler::new(reset, Arc::new(EventBus::new(8)));
        assert!(!handler.cancellation_token.is_cancelled());
    }
}
