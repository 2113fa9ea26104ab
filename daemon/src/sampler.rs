//! Locates the target process and reads its transfer counters

use crate::collector::{ProcessCollector, ProcessEntry, ProcessHandle};
use crate::detector::Sample;
use crate::error::CollectorError;
use std::time::Instant;
use tracing::{debug, warn};

/// Image-name match for the target process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetMatcher {
    name: String,
    case_insensitive: bool,
}

impl TargetMatcher {
    pub fn exact(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            case_insensitive: false,
        }
    }

    /// ASCII case-insensitive, for filesystems that do not preserve case.
    pub fn case_insensitive(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            case_insensitive: true,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn matches(&self, candidate: &str) -> bool {
        if self.case_insensitive {
            candidate.eq_ignore_ascii_case(&self.name)
        } else {
            candidate == self.name
        }
    }
}

pub struct Sampler<C> {
    collector: C,
    target: TargetMatcher,
}

impl<C: ProcessCollector> Sampler<C> {
    pub fn new(collector: C, target: TargetMatcher) -> Self {
        Self { collector, target }
    }

    pub fn target(&self) -> &TargetMatcher {
        &self.target
    }

    /// First live process whose image name matches the target.
    pub fn locate(&self) -> Option<ProcessEntry> {
        self.collector
            .list_processes()
            .into_iter()
            .find(|p| self.target.matches(&p.name))
    }

    pub fn open(&self, entry: &ProcessEntry) -> Result<Box<dyn ProcessHandle>, CollectorError> {
        self.collector.open(entry.identity)
    }

    /// Reads the counters behind an already-open handle.
    pub fn read(handle: &mut dyn ProcessHandle, at: Instant) -> Result<Sample, CollectorError> {
        let counters = handle.io_counters()?;
        Ok(Sample {
            identity: handle.identity(),
            counters,
            at,
        })
    }

    /// Locates, opens and reads the target in one step. The returned handle
    /// belongs to the caller. Any failure yields `None`.
    pub fn sample(&self, at: Instant) -> Option<(Sample, Box<dyn ProcessHandle>)> {
        let entry = self.locate()?;
        let mut handle = match self.open(&entry) {
            Ok(handle) => handle,
            Err(e) => {
                warn!(pid = entry.identity.pid, "Error opening process: {}", e);
                return None;
            }
        };
        match Self::read(&mut *handle, at) {
            Ok(sample) => {
                debug!(pid = entry.identity.pid, counters = ?sample.counters, "Sampled target");
                Some((sample, handle))
            }
            Err(e) => {
                warn!(pid = entry.identity.pid, "Error getting IO counters: {}", e);
                None
            }
        }
    }
}
