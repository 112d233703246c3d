use crate::config::DisplayConfig;
use crate::controller::{StatusMessage, PRIMARY_LINE};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info};

/// Receiver of human-readable status lines (an OLED panel, a terminal, a log)
pub trait StatusSink: Send + Sync {
    fn show(&self, line: usize, text: &str);
}

/// Writes status lines to the log
#[derive(Debug, Default, Clone)]
pub struct TracingStatusSink;

impl StatusSink for TracingStatusSink {
    fn show(&self, line: usize, text: &str) {
        if text.is_empty() {
            debug!(line, "Status line cleared");
        } else {
            info!(line, "{}", text);
        }
    }
}

/// Keeps every line it was asked to show, for tests and diagnostics
#[derive(Debug, Default, Clone)]
pub struct RecordingStatusSink {
    lines: Arc<Mutex<Vec<(usize, String)>>>,
}

impl RecordingStatusSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<(usize, String)> {
        self.lines.lock().clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.lines.lock().iter().map(|(_, text)| text.clone()).collect()
    }
}

impl StatusSink for RecordingStatusSink {
    fn show(&self, line: usize, text: &str) {
        self.lines.lock().push((line, text.to_string()));
    }
}

/// Fixed-size text display in front of a sink; only changed lines are forwarded
pub struct StatusBoard {
    sink: Arc<dyn StatusSink>,
    current: Vec<String>,
    idle_banner: String,
}

impl StatusBoard {
    pub fn new(config: &DisplayConfig, sink: Arc<dyn StatusSink>) -> Self {
        Self {
            sink,
            current: vec![String::new(); config.lines.max(2)],
            idle_banner: config.idle_banner.clone(),
        }
    }

    pub fn line(&self, line: usize) -> Option<&str> {
        self.current.get(line).map(String::as_str)
    }

    pub fn show(&mut self, line: usize, text: &str) {
        let line = line.min(self.current.len() - 1);
        if self.current[line] == text {
            return;
        }
        self.current[line] = text.to_string();
        self.sink.show(line, text);
    }

    pub fn apply(&mut self, status: &StatusMessage) {
        self.show(status.line, &status.text);
    }

    /// Put the idle banner back up unless an intruder is being deterred
    pub fn refresh_idle(&mut self, deterrent_active: bool) {
        if !deterrent_active {
            let banner = self.idle_banner.clone();
            self.show(PRIMARY_LINE, &banner);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::DIAGNOSTIC_LINE;

    fn create_test_board() -> (StatusBoard, RecordingStatusSink) {
        let sink = RecordingStatusSink::new();
        let config = DisplayConfig {
            lines: 2,
            idle_banner: "Ready".to_string(),
        };
        (StatusBoard::new(&config, Arc::new(sink.clone())), sink)
    }

    #[test]
    fn test_board_forwards_changes_only() {
        let (mut board, sink) = create_test_board();

        board.apply(&StatusMessage::primary("Feeding"));
        board.apply(&StatusMessage::primary("Feeding"));
        board.apply(&StatusMessage::diagnostic("Feeder jammed"));

        assert_eq!(
            sink.lines(),
            vec![
                (PRIMARY_LINE, "Feeding".to_string()),
                (DIAGNOSTIC_LINE, "Feeder jammed".to_string())
            ]
        );
        assert_eq!(board.line(PRIMARY_LINE), Some("Feeding"));
    }

    #[test]
    fn test_idle_banner_suppressed_while_deterring() {
        let (mut board, sink) = create_test_board();

        board.apply(&StatusMessage::primary("Intruder detected"));
        board.refresh_idle(true);
        assert_eq!(board.line(PRIMARY_LINE), Some("Intruder detected"));

        board.refresh_idle(false);
        board.refresh_idle(false);
        assert_eq!(board.line(PRIMARY_LINE), Some("Ready"));
        assert_eq!(sink.texts(), vec!["Intruder detected", "Ready"]);
    }

    #[test]
    fn test_out_of_range_line_clamped() {
        let (mut board, _sink) = create_test_board();
        board.show(7, "overflow");
        assert_eq!(board.line(1), Some("overflow"));
    }
}
