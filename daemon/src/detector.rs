//! Transfer activity state machine
//!
//! Turns successive counter samples of one process into a decision: start
//! tracking, download activity seen, idle accumulating, or terminate. The
//! detector is pure; handles and OS calls live in [`crate::monitor`].

use crate::collector::{IoCounters, ProcessIdentity};
use std::time::{Duration, Instant};

/// Fixed tuning constants. Not runtime-configurable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    /// Read throughput that marks a download as started.
    pub start_bytes_per_sec: f64,
    /// Total throughput below which a tick counts as idle.
    pub idle_bytes_per_sec: f64,
    pub tick_interval: Duration,
    /// Minimum wall time an idle streak must span before terminating.
    pub idle_confirmation: Duration,
    /// Minimum idle ticks before terminating.
    pub idle_ticks: u32,
}

impl Thresholds {
    pub const DEFAULT: Thresholds = Thresholds {
        start_bytes_per_sec: 5.0 * 1024.0,
        idle_bytes_per_sec: 1024.0,
        tick_interval: Duration::from_secs(1),
        idle_confirmation: Duration::from_secs(30),
        idle_ticks: 5,
    };
}

impl Default for Thresholds {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Counters of one process at one instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub identity: ProcessIdentity,
    pub counters: IoCounters,
    pub at: Instant,
}

/// The part of a sample kept to compute the next delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint {
    pub counters: IoCounters,
    pub at: Instant,
}

impl From<&Sample> for Checkpoint {
    fn from(sample: &Sample) -> Self {
        Self {
            counters: sample.counters,
            at: sample.at,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Throughput {
    pub read_bytes_per_sec: f64,
    pub total_bytes_per_sec: f64,
}

impl Throughput {
    /// Counters that went backwards count as no transfer. A zero elapsed
    /// time is treated as one second.
    pub fn between(previous: &Checkpoint, current: &Sample) -> Self {
        let mut elapsed = current.at.saturating_duration_since(previous.at).as_secs_f64();
        if elapsed <= 0.0 {
            elapsed = 1.0;
        }
        let read = current.counters.read_bytes.saturating_sub(previous.counters.read_bytes);
        let written = current.counters.write_bytes.saturating_sub(previous.counters.write_bytes);
        let total = read.saturating_add(written);
        Self {
            read_bytes_per_sec: read as f64 / elapsed,
            total_bytes_per_sec: total as f64 / elapsed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// No process tracked.
    #[default]
    Waiting,
    /// Tracking a process, waiting for read throughput to cross the start threshold.
    TrackingStart,
    /// Download seen; waiting for a confirmed idle period.
    ActiveTransfer,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MonitorState {
    pub phase: Phase,
    pub tracked: Option<ProcessIdentity>,
    pub last: Option<Checkpoint>,
    pub idle_streak: u32,
    pub idle_since: Option<Instant>,
}

impl MonitorState {
    fn clear_idle(&mut self) {
        self.idle_streak = 0;
        self.idle_since = None;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetReason {
    /// The tracked process is gone.
    ProcessExited,
    /// A different instance now carries the target name.
    ProcessReplaced {
        previous: ProcessIdentity,
        current: ProcessIdentity,
    },
    /// The tracked process's counters could not be read.
    CountersUnavailable,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Decision {
    NoOp,
    StartTracking(ProcessIdentity),
    ActivityDetected {
        read_bytes_per_sec: f64,
    },
    IdleAccumulating {
        idle_ticks: u32,
        idle_for: Duration,
        total_bytes_per_sec: f64,
    },
    ActivityResumed {
        total_bytes_per_sec: f64,
    },
    Reset(ResetReason),
    /// Idle confirmed. The detector has already reset to `Waiting`.
    Terminate {
        identity: ProcessIdentity,
        idle_ticks: u32,
        idle_for: Duration,
    },
}

pub struct TransferDetector {
    thresholds: Thresholds,
    state: MonitorState,
}

impl TransferDetector {
    pub fn new(thresholds: Thresholds) -> Self {
        Self {
            thresholds,
            state: MonitorState::default(),
        }
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    pub fn state(&self) -> &MonitorState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    pub fn tracked(&self) -> Option<ProcessIdentity> {
        self.state.tracked
    }

    /// Feeds one tick. `None` means the target was not found.
    pub fn advance(&mut self, sample: Option<&Sample>) -> Decision {
        let Some(sample) = sample else {
            return self.reset(ResetReason::ProcessExited);
        };

        let tracked = match self.state.tracked {
            None => return self.begin(sample),
            Some(tracked) => tracked,
        };
        if tracked != sample.identity {
            return self.reset(ResetReason::ProcessReplaced {
                previous: tracked,
                current: sample.identity,
            });
        }

        let Some(previous) = self.state.last.replace(Checkpoint::from(sample)) else {
            return Decision::NoOp;
        };
        let throughput = Throughput::between(&previous, sample);

        match self.state.phase {
            Phase::Waiting => Decision::NoOp,
            Phase::TrackingStart => self.await_start(throughput),
            Phase::ActiveTransfer => self.await_idle(throughput, sample),
        }
    }

    /// Drops all tracking state. Always leaves the detector in `Waiting`;
    /// reports `NoOp` if it was already there.
    pub fn reset(&mut self, reason: ResetReason) -> Decision {
        let was_waiting = self.state.phase == Phase::Waiting;
        self.state = MonitorState::default();
        if was_waiting {
            Decision::NoOp
        } else {
            Decision::Reset(reason)
        }
    }

    fn begin(&mut self, sample: &Sample) -> Decision {
        self.state = MonitorState {
            phase: Phase::TrackingStart,
            tracked: Some(sample.identity),
            last: Some(Checkpoint::from(sample)),
            idle_streak: 0,
            idle_since: None,
        };
        Decision::StartTracking(sample.identity)
    }

    fn await_start(&mut self, throughput: Throughput) -> Decision {
        if throughput.read_bytes_per_sec >= self.thresholds.start_bytes_per_sec {
            self.state.phase = Phase::ActiveTransfer;
            self.state.clear_idle();
            Decision::ActivityDetected {
                read_bytes_per_sec: throughput.read_bytes_per_sec,
            }
        } else {
            Decision::NoOp
        }
    }

    fn await_idle(&mut self, throughput: Throughput, sample: &Sample) -> Decision {
        if throughput.total_bytes_per_sec >= self.thresholds.idle_bytes_per_sec {
            if self.state.idle_streak > 0 || self.state.idle_since.is_some() {
                self.state.clear_idle();
                return Decision::ActivityResumed {
                    total_bytes_per_sec: throughput.total_bytes_per_sec,
                };
            }
            return Decision::NoOp;
        }

        self.state.idle_streak += 1;
        let since = *self.state.idle_since.get_or_insert(sample.at);
        let idle_for = sample.at.saturating_duration_since(since);
        let idle_ticks = self.state.idle_streak;

        if idle_ticks >= self.thresholds.idle_ticks && idle_for >= self.thresholds.idle_confirmation {
            self.state = MonitorState::default();
            return Decision::Terminate {
                identity: sample.identity,
                idle_ticks,
                idle_for,
            };
        }

        Decision::IdleAccumulating {
            idle_ticks,
            idle_for,
            total_bytes_per_sec: throughput.total_bytes_per_sec,
        }
    }
}

impl Default for TransferDetector {
    fn default() -> Self {
        Self::new(Thresholds::DEFAULT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(pid: u32, read: u64, write: u64, at: Instant) -> Sample {
        Sample {
            identity: ProcessIdentity::new(pid, 1),
            counters: IoCounters {
                read_bytes: read,
                write_bytes: write,
            },
            at,
        }
    }

    #[test]
    fn throughput_floors_zero_elapsed_to_one_second() {
        let t0 = Instant::now();
        let previous = Checkpoint::from(&sample(1, 0, 0, t0));
        let tp = Throughput::between(&previous, &sample(1, 3000, 1000, t0));
        assert_eq!(tp.read_bytes_per_sec, 3000.0);
        assert_eq!(tp.total_bytes_per_sec, 4000.0);
    }

    #[test]
    fn throughput_clamps_counter_decrease() {
        let t0 = Instant::now();
        let previous = Checkpoint::from(&sample(1, 10_000, 10_000, t0));
        let tp = Throughput::between(&previous, &sample(1, 5, 20_000, t0 + Duration::from_secs(2)));
        assert_eq!(tp.read_bytes_per_sec, 0.0);
        assert_eq!(tp.total_bytes_per_sec, 5000.0);
    }

    #[test]
    fn throughput_uses_fractional_seconds() {
        let t0 = Instant::now();
        let previous = Checkpoint::from(&sample(1, 0, 0, t0));
        let tp = Throughput::between(&previous, &sample(1, 1000, 0, t0 + Duration::from_millis(500)));
        assert_eq!(tp.read_bytes_per_sec, 2000.0);
    }

    #[test]
    fn first_sample_starts_tracking_without_delta() {
        let mut detector = TransferDetector::default();
        let t0 = Instant::now();
        let decision = detector.advance(Some(&sample(9, 1_000_000_000, 0, t0)));
        assert_eq!(decision, Decision::StartTracking(ProcessIdentity::new(9, 1)));
        assert_eq!(detector.phase(), Phase::TrackingStart);
        assert_eq!(
            detector.state().last,
            Some(Checkpoint {
                counters: IoCounters {
                    read_bytes: 1_000_000_000,
                    write_bytes: 0
                },
                at: t0
            })
        );
    }

    #[test]
    fn writes_alone_do_not_start_a_download() {
        let mut detector = TransferDetector::default();
        let t0 = Instant::now();
        detector.advance(Some(&sample(9, 0, 0, t0)));
        let decision = detector.advance(Some(&sample(9, 0, 100_000, t0 + Duration::from_secs(1))));
        assert_eq!(decision, Decision::NoOp);
        assert_eq!(detector.phase(), Phase::TrackingStart);
    }

    #[test]
    fn reset_from_waiting_is_noop() {
        let mut detector = TransferDetector::default();
        assert_eq!(detector.reset(ResetReason::ProcessExited), Decision::NoOp);
        assert_eq!(detector.state(), &MonitorState::default());
    }
}
