use super::*;
use crate::detection::SpeciesMap;
use std::thread;
use std::time::{Duration, UNIX_EPOCH};

const CAT: u32 = 0;
const RACCOON: u32 = 1;
const BIRD: u32 = 14;

fn at(secs: u64) -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(secs)
}

fn at_millis(millis: u64) -> SystemTime {
    UNIX_EPOCH + Duration::from_millis(millis)
}

fn create_test_controller() -> ActuationController {
    ActuationController::new(ControllerSettings {
        confidence_threshold: 0.99,
        feed_cooldown: Duration::from_secs(10),
        deterrent_cooldown: Duration::from_secs(5),
        species: SpeciesMap::new(CAT, RACCOON),
    })
}

fn cat() -> DetectionEvent {
    DetectionEvent::new(CAT, 1.0)
}

fn raccoon() -> DetectionEvent {
    DetectionEvent::new(RACCOON, 0.995)
}

#[test]
fn test_feed_cooldown_example() {
    let mut controller = create_test_controller();

    let outcome = controller.process(&[cat()], at(0));
    assert_eq!(outcome.commands, vec![ActuationCommand::Feed]);
    assert!(!controller.state().feed_ready);
    assert_eq!(controller.state().last_feed_time, Some(at(0)));
    assert_eq!(controller.state().feed_count, 1);

    let outcome = controller.process(&[cat()], at(5));
    assert!(outcome.commands.is_empty());

    let outcome = controller.process(&[cat()], at(10));
    assert_eq!(outcome.commands, vec![ActuationCommand::Feed]);
    assert_eq!(controller.state().feed_count, 2);
}

#[test]
fn test_deterrent_hysteresis_example() {
    let mut controller = create_test_controller();

    let outcome = controller.process(&[raccoon()], at(0));
    assert_eq!(outcome.commands, vec![ActuationCommand::AssertDeterrent]);
    assert_eq!(outcome.statuses, vec![StatusMessage::primary("Intruder detected")]);

    let outcome = controller.process(&[], at(4));
    assert!(outcome.commands.is_empty());
    assert!(controller.state().deterrent_active);

    let outcome = controller.process(&[], at(5));
    assert_eq!(outcome.commands, vec![ActuationCommand::ClearDeterrent]);
    assert_eq!(outcome.statuses, vec![StatusMessage::primary("Intruder departed")]);
    assert!(!controller.state().deterrent_active);

    // Cleared exactly once
    for secs in 6..20 {
        assert!(controller.process(&[], at(secs)).commands.is_empty());
    }
}

#[test]
fn test_repeated_sightings_extend_deterrent() {
    let mut controller = create_test_controller();

    controller.process(&[raccoon()], at(0));
    let outcome = controller.process(&[raccoon()], at(3));
    assert_eq!(outcome.commands, vec![ActuationCommand::AssertDeterrent]);

    assert!(controller.process(&[], at(5)).commands.is_empty());
    assert!(controller.process(&[], at(7)).commands.is_empty());
    assert_eq!(
        controller.process(&[], at(8)).commands,
        vec![ActuationCommand::ClearDeterrent]
    );
}

#[test]
fn test_low_confidence_never_acts() {
    let mut controller = create_test_controller();

    for (step, confidence) in [0.0, 0.5, 0.9, 0.98, 0.99].iter().enumerate() {
        let detections = [
            DetectionEvent::new(CAT, *confidence),
            DetectionEvent::new(RACCOON, *confidence),
        ];
        let outcome = controller.process(&detections, at(step as u64 * 20));
        assert!(
            outcome.commands.is_empty(),
            "confidence {} should not act",
            confidence
        );
    }

    assert_eq!(controller.state().feed_count, 0);
    assert!(!controller.state().deterrent_active);
}

#[test]
fn test_no_feed_during_cooldown_regardless_of_detections() {
    let mut controller = create_test_controller();

    assert!(controller.process(&[cat()], at_millis(1_000)).contains(ActuationCommand::Feed));

    for millis in (1_100..11_000).step_by(100) {
        let outcome = controller.process(&[cat(), cat(), cat()], at_millis(millis));
        assert!(!outcome.contains(ActuationCommand::Feed), "fed at {}ms", millis);
    }

    assert!(controller
        .process(&[cat()], at_millis(11_000))
        .contains(ActuationCommand::Feed));
}

#[test]
fn test_one_feed_per_frame() {
    let mut controller = create_test_controller();

    let outcome = controller.process(&[cat(), cat(), cat()], at(0));
    assert_eq!(outcome.commands, vec![ActuationCommand::Feed]);
    assert_eq!(controller.state().feed_count, 1);
}

#[test]
fn test_detections_processed_in_given_order() {
    let mut controller = create_test_controller();
    let outcome = controller.process(&[raccoon(), cat()], at(0));
    assert_eq!(
        outcome.commands,
        vec![ActuationCommand::AssertDeterrent, ActuationCommand::Feed]
    );

    let mut controller = create_test_controller();
    let outcome = controller.process(&[cat(), raccoon()], at(0));
    assert_eq!(
        outcome.commands,
        vec![ActuationCommand::Feed, ActuationCommand::AssertDeterrent]
    );
}

#[test]
fn test_clear_precedes_new_sighting_in_same_frame() {
    let mut controller = create_test_controller();

    controller.process(&[raccoon()], at(0));
    let outcome = controller.process(&[raccoon()], at(6));
    assert_eq!(
        outcome.commands,
        vec![
            ActuationCommand::ClearDeterrent,
            ActuationCommand::AssertDeterrent
        ]
    );
    assert!(controller.state().deterrent_active);
}

#[test]
fn test_other_species_ignored() {
    let mut controller = create_test_controller();

    let outcome = controller.process(&[DetectionEvent::new(BIRD, 1.0)], at(0));
    assert!(outcome.is_empty());
    assert!(controller.state().feed_ready);
}

#[test]
fn test_empty_batches_are_idempotent() {
    let mut controller = create_test_controller();
    controller.process(&[cat()], at(0));

    for secs in 1..40 {
        let outcome = controller.process(&[], at(secs));
        assert!(outcome.commands.is_empty());
        assert_eq!(controller.state().feed_count, 1);
    }
}

#[test]
fn test_reset_rearms_feeder() {
    let mut controller = create_test_controller();

    controller.process(&[cat()], at(0));
    assert!(controller.process(&[cat()], at(1)).commands.is_empty());

    let outcome = controller.reset(at(2));
    assert!(outcome.commands.is_empty());
    assert_eq!(outcome.statuses[0], StatusMessage::primary("Feeder reset"));
    assert_eq!(controller.state().feed_count, 0);
    assert!(controller.state().feed_ready);

    let outcome = controller.process(&[cat()], at(2));
    assert_eq!(outcome.commands, vec![ActuationCommand::Feed]);
}

#[test]
fn test_reset_clears_active_deterrent() {
    let mut controller = create_test_controller();

    controller.process(&[raccoon()], at(0));
    let outcome = controller.reset(at(1));
    assert_eq!(outcome.commands, vec![ActuationCommand::ClearDeterrent]);
    assert!(!controller.state().deterrent_active);

    // Nothing left to clear later
    assert!(controller.process(&[], at(10)).commands.is_empty());
}

#[test]
fn test_invalid_detection_skipped_rest_processed() {
    let mut controller = create_test_controller();

    let detections = [DetectionEvent::new(RACCOON, 1.7), cat()];
    let outcome = controller.process(&detections, at(0));

    assert_eq!(outcome.commands, vec![ActuationCommand::Feed]);
    assert_eq!(
        outcome.rejected,
        vec![DetectionError::ConfidenceOutOfRange { confidence: 1.7 }]
    );
    assert!(outcome
        .statuses
        .iter()
        .any(|status| status.line == DIAGNOSTIC_LINE && status.text.starts_with("Invalid detection")));
    assert!(!controller.state().deterrent_active);
}

#[test]
fn test_process_raw_validates_records() {
    let mut controller = create_test_controller();
    let labels = LabelMap::parse("0 cat\n1 raccoon\n").unwrap();

    let records = vec![
        RawDetection {
            class_id: 99,
            confidence: 1.0,
            bbox: None,
        },
        RawDetection {
            class_id: -3,
            confidence: 1.0,
            bbox: None,
        },
        RawDetection {
            class_id: 1,
            confidence: 0.999,
            bbox: Some([0.0, 0.0, 10.0, 10.0]),
        },
    ];

    let outcome = controller.process_raw(&records, Some(&labels), at(0));
    assert_eq!(outcome.commands, vec![ActuationCommand::AssertDeterrent]);
    assert_eq!(outcome.rejected.len(), 2);
}

#[test]
fn test_malformed_record_skipped_rest_of_frame_kept() {
    let mut controller = create_test_controller();

    let records = vec![
        Err(DetectionError::Malformed {
            details: "invalid type: null, expected f32".to_string(),
        }),
        Ok(RawDetection {
            class_id: CAT as i64,
            confidence: 1.0,
            bbox: None,
        }),
    ];

    let outcome = controller.process_records(&records, None, at(0));
    assert_eq!(outcome.commands, vec![ActuationCommand::Feed]);
    assert_eq!(outcome.rejected.len(), 1);
    assert!(outcome
        .statuses
        .contains(&StatusMessage::diagnostic("Invalid detection: malformed record: invalid type: null, expected f32")));
    assert_eq!(controller.state().feed_count, 1);
}

#[test]
fn test_backwards_clock_holds_cooldowns() {
    let mut controller = create_test_controller();

    controller.process(&[cat(), raccoon()], at(100));

    let outcome = controller.process(&[cat()], at(50));
    assert!(outcome.clock_anomaly);
    assert!(outcome.commands.is_empty());
    assert!(controller.state().deterrent_active);

    let outcome = controller.process(&[cat()], at(105));
    assert!(!outcome.clock_anomaly);
    assert_eq!(outcome.commands, vec![ActuationCommand::ClearDeterrent]);

    let outcome = controller.process(&[cat()], at(110));
    assert_eq!(outcome.commands, vec![ActuationCommand::Feed]);
}

#[test]
fn test_feed_not_delivered_rearms() {
    let mut controller = create_test_controller();

    controller.process(&[cat()], at(0));
    controller.process(&[cat()], at(10));
    assert_eq!(controller.state().last_feed_time, Some(at(10)));

    assert!(controller.feed_not_delivered());
    assert!(controller.state().feed_ready);
    assert_eq!(controller.state().last_feed_time, Some(at(0)));
    assert_eq!(controller.state().failed_feeds, 1);
    assert_eq!(controller.state().feed_count, 2);

    // Nothing outstanding any more
    assert!(!controller.feed_not_delivered());

    let outcome = controller.process(&[cat()], at(11));
    assert_eq!(outcome.commands, vec![ActuationCommand::Feed]);
    assert_eq!(controller.state().feed_count, 3);
}

#[test]
fn test_shared_controller_reset_from_other_thread() {
    let shared = SharedController::new(create_test_controller());

    let resetter = {
        let shared = shared.clone();
        thread::spawn(move || {
            for secs in 0..200 {
                shared.reset(at(secs));
            }
        })
    };

    for secs in 0..200 {
        let outcome = shared.process(&[cat(), raccoon()], at(secs));
        let feeds = outcome
            .commands
            .iter()
            .filter(|command| **command == ActuationCommand::Feed)
            .count();
        assert!(feeds <= 1);
    }

    resetter.join().unwrap();

    shared.reset(at(500));
    let snapshot = shared.snapshot();
    assert!(snapshot.feed_ready);
    assert!(!snapshot.deterrent_active);
    assert_eq!(snapshot.feed_count, 0);

    let outcome = shared.process(&[cat()], at(500));
    assert_eq!(outcome.commands, vec![ActuationCommand::Feed]);
}
