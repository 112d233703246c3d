use super::*;
use crate::service::{ResetHandle, ResetSource};
use std::time::{Duration, Instant};

#[test]
fn test_mock_button_queues_reset() {
    let (handle, mut receiver) = ResetHandle::channel(4);
    let button = MockButton::new(handle, Duration::from_millis(100));

    assert!(button.press());
    let request = receiver.try_recv().unwrap();
    assert_eq!(request.source, ResetSource::Button);
}

#[test]
fn test_mock_button_debounces_bounces() {
    let (handle, mut receiver) = ResetHandle::channel(4);
    let button = MockButton::new(handle, Duration::from_millis(100));
    let start = Instant::now();

    assert!(button.press_at(start));
    assert!(!button.press_at(start + Duration::from_millis(5)));
    assert!(!button.press_at(start + Duration::from_millis(60)));
    assert!(button.press_at(start + Duration::from_millis(150)));

    assert!(receiver.try_recv().is_ok());
    assert!(receiver.try_recv().is_ok());
    assert!(receiver.try_recv().is_err());
}

#[cfg(all(feature = "button", target_os = "linux"))]
mod hardware {
    use super::super::ButtonInputHandler;
    use crate::config::ButtonConfig;
    use crate::events::EventBus;
    use crate::service::ResetHandle;
    use evdev::{EventType, InputEvent, Key};
    use std::sync::Arc;

    #[test]
    fn test_is_reset_press_any_key() {
        let press = InputEvent::new(EventType::KEY, Key::BTN_0.code(), 1);
        let release = InputEvent::new(EventType::KEY, Key::BTN_0.code(), 0);
        let repeat = InputEvent::new(EventType::KEY, Key::BTN_0.code(), 2);

        assert!(ButtonInputHandler::is_reset_press(&press, None));
        assert!(!ButtonInputHandler::is_reset_press(&release, None));
        assert!(!ButtonInputHandler::is_reset_press(&repeat, None));
    }

    #[test]
    fn test_is_reset_press_configured_key() {
        let button = InputEvent::new(EventType::KEY, Key::BTN_0.code(), 1);
        let other = InputEvent::new(EventType::KEY, Key::KEY_A.code(), 1);
        let code = Some(Key::BTN_0.code());

        assert!(ButtonInputHandler::is_reset_press(&button, code));
        assert!(!ButtonInputHandler::is_reset_press(&other, code));
    }

    #[tokio::test]
    async fn test_button_handler_creation() {
        let config = ButtonConfig {
            key_code: Some(256),
            ..ButtonConfig::default()
        };
        let (handle, _receiver) = ResetHandle::channel(1);

        let handler = ButtonInputHandler::new(&config, handle, Arc::new(EventBus::new(4)));
        assert_eq!(handler.device_path, "/dev/input/event0");
        assert_eq!(handler.key_code, Some(256));
        assert_eq!(handler.debounce, std::time::Duration::from_millis(100));
    }
}
