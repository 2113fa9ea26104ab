//! Tick driver: samples the target, feeds the detector, owns the handle

use crate::collector::{ProcessCollector, ProcessEntry, ProcessHandle};
use crate::detector::{Decision, Phase, ResetReason, Thresholds, TransferDetector};
use crate::executor;
use crate::notifier::Notifier;
use crate::sampler::Sampler;
use std::future::Future;
use std::time::Instant;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

const KIB: f64 = 1024.0;

/// Watches one target process and terminates it once its transfers finish.
///
/// The held handle exists exactly while the detector tracks a process; every
/// reset drops it.
pub struct ActivityMonitor<C> {
    sampler: Sampler<C>,
    detector: TransferDetector,
    handle: Option<Box<dyn ProcessHandle>>,
    notifier: Option<Notifier>,
}

impl<C: ProcessCollector> ActivityMonitor<C> {
    pub fn new(sampler: Sampler<C>, thresholds: Thresholds) -> Self {
        Self {
            sampler,
            detector: TransferDetector::new(thresholds),
            handle: None,
            notifier: None,
        }
    }

    /// Shows a notification whenever the target is closed.
    pub fn with_notifier(mut self, notifier: Notifier) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn detector(&self) -> &TransferDetector {
        &self.detector
    }

    pub fn phase(&self) -> Phase {
        self.detector.phase()
    }

    pub fn holds_handle(&self) -> bool {
        self.handle.is_some()
    }

    /// Runs one tick at `now`.
    pub fn tick(&mut self, now: Instant) -> Decision {
        let Some(entry) = self.sampler.locate() else {
            return self.reset(ResetReason::ProcessExited);
        };

        match self.detector.tracked() {
            None => self.begin(&entry, now),
            Some(tracked) if tracked != entry.identity => self.reset(ResetReason::ProcessReplaced {
                previous: tracked,
                current: entry.identity,
            }),
            Some(_) => self.observe(now),
        }
    }

    /// Ticks every `tick_interval` until `shutdown` resolves. A slow tick
    /// delays the schedule instead of bursting to catch up.
    pub async fn run<F>(&mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let mut interval = tokio::time::interval(self.detector.thresholds().tick_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; sample one interval after start.
        interval.tick().await;
        tokio::pin!(shutdown);

        info!(target_name = self.sampler.target().name(), "Monitoring target activity...");
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested");
                    break;
                }
                _ = interval.tick() => {
                    self.tick(tokio::time::Instant::now().into_std());
                }
            }
        }
        self.release();
    }

    fn begin(&mut self, entry: &ProcessEntry, now: Instant) -> Decision {
        let mut handle = match self.sampler.open(entry) {
            Ok(handle) => handle,
            Err(e) => {
                warn!(pid = entry.identity.pid, "Error opening process: {}", e);
                return Decision::NoOp;
            }
        };
        let sample = match Sampler::<C>::read(&mut *handle, now) {
            Ok(sample) => sample,
            Err(e) => {
                warn!(pid = entry.identity.pid, "Error getting IO counters: {}", e);
                return Decision::NoOp;
            }
        };

        let decision = self.detector.advance(Some(&sample));
        self.handle = Some(handle);
        info!(
            pid = entry.identity.pid,
            "{} detected. Waiting for download activity...",
            entry.name
        );
        decision
    }

    fn observe(&mut self, now: Instant) -> Decision {
        let Some(handle) = self.handle.as_mut() else {
            return self.reset(ResetReason::CountersUnavailable);
        };
        let sample = match Sampler::<C>::read(&mut **handle, now) {
            Ok(sample) => sample,
            Err(e) => {
                warn!("Error getting IO counters: {}. Resetting.", e);
                return self.reset(ResetReason::CountersUnavailable);
            }
        };

        let decision = self.detector.advance(Some(&sample));
        match decision {
            Decision::ActivityDetected { read_bytes_per_sec } => {
                info!(
                    read_kbps = read_bytes_per_sec / KIB,
                    "Download activity detected. Monitoring..."
                );
            }
            Decision::IdleAccumulating {
                idle_ticks: 1,
                total_bytes_per_sec,
                ..
            } => {
                info!(
                    total_kbps = total_bytes_per_sec / KIB,
                    "Low activity detected. Waiting for confirmation..."
                );
            }
            Decision::IdleAccumulating {
                idle_ticks,
                idle_for,
                ..
            } => {
                debug!(idle_ticks, idle_secs = idle_for.as_secs_f64(), "Still idle");
            }
            Decision::ActivityResumed { total_bytes_per_sec } => {
                info!(
                    total_kbps = total_bytes_per_sec / KIB,
                    "Download activity resumed. Resetting idle counter."
                );
            }
            Decision::Terminate {
                identity,
                idle_ticks,
                idle_for,
            } => {
                info!(
                    pid = identity.pid,
                    idle_ticks,
                    idle_secs = idle_for.as_secs_f64(),
                    "Download finished. Closing target..."
                );
                self.terminate();
            }
            Decision::Reset(reason) => {
                self.handle = None;
                log_reset(reason);
            }
            Decision::NoOp | Decision::StartTracking(_) => {}
        }
        decision
    }

    fn reset(&mut self, reason: ResetReason) -> Decision {
        let decision = self.detector.reset(reason);
        self.handle = None;
        if let Decision::Reset(reason) = decision {
            log_reset(reason);
        }
        decision
    }

    fn terminate(&mut self) {
        let Some(mut handle) = self.handle.take() else {
            return;
        };
        let result = executor::terminate(&mut *handle);
        drop(handle);
        if let (Ok(()), Some(notifier)) = (result, &self.notifier) {
            notifier.info(
                "Downloads finished",
                &format!("{} was closed.", self.sampler.target().name()),
            );
        }
    }

    fn release(&mut self) {
        self.detector = TransferDetector::new(*self.detector.thresholds());
        if self.handle.take().is_some() {
            debug!("Released target handle");
        }
    }
}

fn log_reset(reason: ResetReason) {
    match reason {
        ResetReason::ProcessExited => info!("Target closed. Resetting state."),
        ResetReason::ProcessReplaced { previous, current } => info!(
            previous_pid = previous.pid,
            current_pid = current.pid,
            "Target PID changed. Resetting."
        ),
        ResetReason::CountersUnavailable => warn!("Target counters unavailable. Resetting state."),
    }
}
