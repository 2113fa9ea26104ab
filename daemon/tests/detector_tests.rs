use autocloser_daemon::collector::{IoCounters, ProcessIdentity};
use autocloser_daemon::detector::{
    Decision, MonitorState, Phase, ResetReason, Sample, Thresholds, TransferDetector,
};
use std::time::{Duration, Instant};

const PID: u32 = 100;

fn secs(n: u64) -> Duration {
    Duration::from_secs(n)
}

fn sample_of(pid: u32, read: u64, write: u64, at: Instant) -> Sample {
    Sample {
        identity: ProcessIdentity::new(pid, 42),
        counters: IoCounters {
            read_bytes: read,
            write_bytes: write,
        },
        at,
    }
}

fn sample(read: u64, write: u64, at: Instant) -> Sample {
    sample_of(PID, read, write, at)
}

/// Tracks PID and pushes it into ActiveTransfer at `t0 + 1s` with read counter 10_000.
fn active_detector(t0: Instant) -> TransferDetector {
    let mut detector = TransferDetector::default();
    detector.advance(Some(&sample(0, 0, t0)));
    let decision = detector.advance(Some(&sample(10_000, 0, t0 + secs(1))));
    assert!(matches!(decision, Decision::ActivityDetected { .. }));
    detector
}

#[test]
fn test_absent_process_keeps_waiting() {
    // Scenario A
    let mut detector = TransferDetector::default();
    for _ in 0..3 {
        assert_eq!(detector.advance(None), Decision::NoOp);
        assert_eq!(detector.phase(), Phase::Waiting);
    }
    assert_eq!(detector.state(), &MonitorState::default());
}

#[test]
fn test_reset_clears_every_phase() {
    let t0 = Instant::now();

    let mut tracking = TransferDetector::default();
    tracking.advance(Some(&sample(0, 0, t0)));
    assert_eq!(tracking.phase(), Phase::TrackingStart);

    let mut active = active_detector(t0);
    let mut idling = active_detector(t0);
    idling.advance(Some(&sample(10_000, 0, t0 + secs(2))));
    assert_eq!(idling.state().idle_streak, 1);

    for detector in [&mut tracking, &mut active, &mut idling] {
        assert_eq!(detector.advance(None), Decision::Reset(ResetReason::ProcessExited));
        assert_eq!(detector.state(), &MonitorState::default());
        // a second absent tick changes nothing
        assert_eq!(detector.advance(None), Decision::NoOp);
        assert_eq!(detector.state(), &MonitorState::default());
    }
}

#[test]
fn test_download_start_detected() {
    // Scenario B
    let t0 = Instant::now();
    let mut detector = TransferDetector::default();
    assert_eq!(
        detector.advance(Some(&sample(1000, 0, t0))),
        Decision::StartTracking(ProcessIdentity::new(PID, 42))
    );
    assert_eq!(detector.tracked(), Some(ProcessIdentity::new(PID, 42)));

    let decision = detector.advance(Some(&sample(7000, 0, t0 + secs(1))));
    assert_eq!(decision, Decision::ActivityDetected { read_bytes_per_sec: 6000.0 });
    assert_eq!(detector.phase(), Phase::ActiveTransfer);
    assert_eq!(detector.state().idle_streak, 0);
    assert_eq!(detector.state().idle_since, None);
}

#[test]
fn test_start_threshold_gating() {
    let t0 = Instant::now();
    let mut detector = TransferDetector::default();
    detector.advance(Some(&sample(0, 0, t0)));

    let mut read = 0;
    for i in 1..=20 {
        read += 5119;
        assert_eq!(detector.advance(Some(&sample(read, 0, t0 + secs(i)))), Decision::NoOp);
        assert_eq!(detector.phase(), Phase::TrackingStart);
    }

    read += 5120;
    let decision = detector.advance(Some(&sample(read, 0, t0 + secs(21))));
    assert_eq!(decision, Decision::ActivityDetected { read_bytes_per_sec: 5120.0 });
    assert_eq!(detector.phase(), Phase::ActiveTransfer);
}

#[test]
fn test_last_sample_updated_while_waiting_for_start() {
    let t0 = Instant::now();
    let mut detector = TransferDetector::default();
    detector.advance(Some(&sample(0, 0, t0)));
    detector.advance(Some(&sample(4000, 0, t0 + secs(1))));
    // Only the delta since the previous tick counts, not the whole run.
    let decision = detector.advance(Some(&sample(8000, 0, t0 + secs(2))));
    assert_eq!(decision, Decision::NoOp);
    assert_eq!(detector.state().last.map(|c| c.counters.read_bytes), Some(8000));
}

#[test]
fn test_zero_elapsed_time_floored() {
    let t0 = Instant::now();
    let mut detector = TransferDetector::default();
    detector.advance(Some(&sample(0, 0, t0)));
    let decision = detector.advance(Some(&sample(6000, 0, t0)));
    assert_eq!(decision, Decision::ActivityDetected { read_bytes_per_sec: 6000.0 });
}

#[test]
fn test_idle_streak_is_monotonic() {
    let t0 = Instant::now();
    let mut detector = active_detector(t0);
    let first_idle = t0 + secs(2);

    for i in 0..20u64 {
        let at = first_idle + secs(i);
        let decision = detector.advance(Some(&sample(10_000 + 500 * (i + 1), 0, at)));
        assert_eq!(
            decision,
            Decision::IdleAccumulating {
                idle_ticks: i as u32 + 1,
                idle_for: secs(i),
                total_bytes_per_sec: 500.0,
            }
        );
        assert_eq!(detector.state().idle_streak, i as u32 + 1);
        assert_eq!(detector.state().idle_since, Some(first_idle));
    }
}

#[test]
fn test_count_reached_before_duration_does_not_terminate() {
    // Scenario C
    let t0 = Instant::now();
    let mut detector = active_detector(t0);
    let first_idle = t0 + secs(2);
    let mut read = 10_000;

    for i in 0..30u64 {
        read += 500;
        let decision = detector.advance(Some(&sample(read, 0, first_idle + secs(i))));
        assert!(
            matches!(decision, Decision::IdleAccumulating { .. }),
            "tick {} decided {:?}",
            i,
            decision
        );
    }
    assert_eq!(detector.state().idle_streak, 30);

    read += 500;
    let decision = detector.advance(Some(&sample(read, 0, first_idle + secs(30))));
    assert_eq!(
        decision,
        Decision::Terminate {
            identity: ProcessIdentity::new(PID, 42),
            idle_ticks: 31,
            idle_for: secs(30),
        }
    );
    assert_eq!(detector.state(), &MonitorState::default());
}

#[test]
fn test_duration_reached_before_count_does_not_terminate() {
    let t0 = Instant::now();
    let mut detector = active_detector(t0);
    let first_idle = t0 + secs(11);

    // Ticks ten seconds apart: 30s of idleness after only four ticks.
    for (n, offset) in [0, 10, 20, 30].into_iter().enumerate() {
        let decision = detector.advance(Some(&sample(10_000, 0, first_idle + secs(offset))));
        assert_eq!(
            decision,
            Decision::IdleAccumulating {
                idle_ticks: n as u32 + 1,
                idle_for: secs(offset),
                total_bytes_per_sec: 0.0,
            }
        );
    }

    let decision = detector.advance(Some(&sample(10_000, 0, first_idle + secs(40))));
    assert!(matches!(decision, Decision::Terminate { idle_ticks: 5, .. }));
}

#[test]
fn test_resumption_clears_streak() {
    let t0 = Instant::now();
    let mut detector = active_detector(t0);
    let mut read = 10_000;
    let mut at = t0 + secs(1);

    for _ in 0..25 {
        at += secs(1);
        read += 100;
        detector.advance(Some(&sample(read, 0, at)));
    }
    assert_eq!(detector.state().idle_streak, 25);

    at += secs(1);
    let decision = detector.advance(Some(&sample(read, 1024, at)));
    assert_eq!(decision, Decision::ActivityResumed { total_bytes_per_sec: 1024.0 });
    assert_eq!(detector.state().idle_streak, 0);
    assert_eq!(detector.state().idle_since, None);
    assert_eq!(detector.phase(), Phase::ActiveTransfer);

    // Sustained activity with no streak to clear reports nothing new.
    at += secs(1);
    assert_eq!(detector.advance(Some(&sample(read + 4096, 1024, at))), Decision::NoOp);
}

#[test]
fn test_writes_count_towards_activity_once_active() {
    let t0 = Instant::now();
    let mut detector = active_detector(t0);
    // Final flush: no reads, heavy writes
    let decision = detector.advance(Some(&sample(10_000, 50_000, t0 + secs(2))));
    assert_eq!(decision, Decision::NoOp);
    assert_eq!(detector.state().idle_streak, 0);
}

#[test]
fn test_counter_decrease_reads_as_idle() {
    let t0 = Instant::now();
    let mut detector = active_detector(t0);
    let decision = detector.advance(Some(&sample(0, 0, t0 + secs(2))));
    assert!(matches!(
        decision,
        Decision::IdleAccumulating { total_bytes_per_sec, .. } if total_bytes_per_sec == 0.0
    ));
}

#[test]
fn test_identity_change_resets() {
    // Scenario D
    let t0 = Instant::now();
    let mut detector = active_detector(t0);
    detector.advance(Some(&sample(10_000, 0, t0 + secs(2))));
    assert_eq!(detector.state().idle_streak, 1);

    let decision = detector.advance(Some(&sample_of(200, 0, 0, t0 + secs(3))));
    assert_eq!(
        decision,
        Decision::Reset(ResetReason::ProcessReplaced {
            previous: ProcessIdentity::new(PID, 42),
            current: ProcessIdentity::new(200, 42),
        })
    );
    assert_eq!(detector.state(), &MonitorState::default());

    // The new instance is picked up on the following tick.
    let decision = detector.advance(Some(&sample_of(200, 0, 0, t0 + secs(4))));
    assert_eq!(decision, Decision::StartTracking(ProcessIdentity::new(200, 42)));
}

#[test]
fn test_default_thresholds() {
    let thresholds = Thresholds::default();
    assert_eq!(thresholds.start_bytes_per_sec, 5120.0);
    assert_eq!(thresholds.idle_bytes_per_sec, 1024.0);
    assert_eq!(thresholds.tick_interval, secs(1));
    assert_eq!(thresholds.idle_confirmation, secs(30));
    assert_eq!(thresholds.idle_ticks, 5);
}
