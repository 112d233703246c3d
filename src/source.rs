use crate::config::InputConfig;
use crate::detection::{DetectionRecord, RawDetection};
use crate::error::SourceError;
use serde::Deserialize;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Detections reported for one captured frame
#[derive(Debug, Clone, PartialEq)]
pub struct FrameBatch {
    pub sequence: u64,
    /// Records in arrival order; ones that failed to decode stay in place as errors
    pub detections: Vec<DetectionRecord>,
    /// Capture time carried in the stream, used instead of the wall clock
    /// when replaying recorded detections
    pub timestamp: Option<SystemTime>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FrameLine {
    Frame {
        detections: Vec<serde_json::Value>,
        #[serde(default)]
        timestamp_ms: Option<u64>,
    },
    Bare(Vec<serde_json::Value>),
}

/// Parse one JSON line: either `{"detections": [...], "timestamp_ms": 123}`
/// or a bare array of detections. Blank lines yield `None`. Only a line that
/// is not one of those shapes is an error; a bad record inside a frame is
/// kept as an invalid detection.
pub fn parse_frame_line(line: &str, sequence: u64) -> Result<Option<FrameBatch>, SourceError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let parsed: FrameLine = serde_json::from_str(line).map_err(|e| SourceError::Parse {
        line: sequence,
        details: e.to_string(),
    })?;

    let (detections, timestamp) = match parsed {
        FrameLine::Frame {
            detections,
            timestamp_ms,
        } => (
            detections,
            timestamp_ms.map(|ms| UNIX_EPOCH + Duration::from_millis(ms)),
        ),
        FrameLine::Bare(detections) => (detections, None),
    };

    Ok(Some(FrameBatch {
        sequence,
        detections: detections.into_iter().map(RawDetection::from_value).collect(),
        timestamp,
    }))
}

/// Reads the detection stream and feeds frame batches to the controller task
pub struct DetectionReader {
    path: String,
}

impl DetectionReader {
    pub fn new(config: &InputConfig) -> Self {
        Self {
            path: config.path.clone(),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Read until end of stream or cancellation; returns the number of frames sent
    pub async fn run(
        self,
        sender: mpsc::Sender<FrameBatch>,
        cancel: CancellationToken,
    ) -> Result<u64, SourceError> {
        info!("Reading detections from {}", self.display_name());

        if self.path == "-" {
            Self::pump(BufReader::new(tokio::io::stdin()), sender, cancel).await
        } else {
            let file = tokio::fs::File::open(&self.path).await?;
            Self::pump(BufReader::new(file), sender, cancel).await
        }
    }

    pub async fn pump<R>(
        reader: R,
        sender: mpsc::Sender<FrameBatch>,
        cancel: CancellationToken,
    ) -> Result<u64, SourceError>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = reader.lines();
        let mut line_number = 0u64;
        let mut frames = 0u64;
        let mut malformed = 0u64;

        loop {
            let line = tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Detection reader cancelled");
                    break;
                }
                line = lines.next_line() => line?,
            };

            let Some(line) = line else {
                info!(
                    "Detection stream ended after {} frames ({} malformed lines)",
                    frames, malformed
                );
                break;
            };
            line_number += 1;

            match parse_frame_line(&line, line_number) {
                Ok(Some(batch)) => {
                    if sender.send(batch).await.is_err() {
                        debug!("Frame receiver dropped, stopping reader");
                        break;
                    }
                    frames += 1;
                }
                Ok(None) => {}
                Err(e) => {
                    malformed += 1;
                    warn!("Skipping malformed detection line: {}", e);
                }
            }
        }

        Ok(frames)
    }

    fn display_name(&self) -> &str {
        if self.path == "-" {
            "stdin"
        } else {
            &self.path
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DetectionError;

    #[test]
    fn test_parse_frame_object() {
        let batch = parse_frame_line(
            r#"{"detections":[{"class_id":0,"confidence":0.995,"bbox":[1,2,3,4]}],"timestamp_ms":1500}"#,
            7,
        )
        .unwrap()
        .unwrap();

        assert_eq!(batch.sequence, 7);
        assert_eq!(batch.detections.len(), 1);
        let detection = batch.detections[0].as_ref().unwrap();
        assert_eq!(detection.class_id, 0);
        assert_eq!(detection.bbox, Some([1.0, 2.0, 3.0, 4.0]));
        assert_eq!(
            batch.timestamp,
            Some(UNIX_EPOCH + Duration::from_millis(1500))
        );
    }

    #[test]
    fn test_parse_bare_array_and_empty_frame() {
        let batch = parse_frame_line(r#"[{"class_id":1,"confidence":1.0}]"#, 1)
            .unwrap()
            .unwrap();
        assert_eq!(batch.detections[0].as_ref().unwrap().class_id, 1);
        assert_eq!(batch.timestamp, None);

        let empty = parse_frame_line("[]", 2).unwrap().unwrap();
        assert!(empty.detections.is_empty());

        assert_eq!(parse_frame_line("   ", 3).unwrap(), None);
    }

    #[test]
    fn test_parse_keeps_valid_records_beside_malformed_ones() {
        let batch = parse_frame_line(
            r#"[{"class_id":0,"confidence":1.0},{"class_id":1,"confidence":null},{"class_id":2}]"#,
            1,
        )
        .unwrap()
        .unwrap();

        assert_eq!(batch.detections.len(), 3);
        assert_eq!(batch.detections[0].as_ref().unwrap().class_id, 0);
        assert!(matches!(
            batch.detections[1],
            Err(DetectionError::Malformed { .. })
        ));
        assert!(matches!(
            batch.detections[2],
            Err(DetectionError::Malformed { .. })
        ));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let result = parse_frame_line("{not json", 4);
        assert!(matches!(result, Err(SourceError::Parse { line: 4, .. })));
    }

    #[tokio::test]
    async fn test_pump_skips_malformed_lines() {
        let input = b"[{\"class_id\":0,\"confidence\":1.0}]\nnonsense\n\n{\"detections\":[]}\n";
        let (sender, mut receiver) = mpsc::channel(8);

        let frames = DetectionReader::pump(&input[..], sender, CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(frames, 2);

        let first = receiver.recv().await.unwrap();
        assert_eq!(first.detections.len(), 1);
        let second = receiver.recv().await.unwrap();
        assert!(second.detections.is_empty());
        assert!(receiver.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_run_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("detections.jsonl");
        std::fs::write(&path, "[]\n[]\n[]\n").unwrap();

        let reader = DetectionReader::new(&InputConfig {
            path: path.display().to_string(),
            frame_queue_capacity: 4,
        });
        let (sender, mut receiver) = mpsc::channel(4);

        let frames = reader.run(sender, CancellationToken::new()).await.unwrap();
        assert_eq!(frames, 3);
        assert_eq!(receiver.recv().await.unwrap().sequence, 1);
    }
}
