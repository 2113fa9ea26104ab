//! Watches a download manager process and closes it once its transfers
//! have finished.

pub mod collector;
pub mod config;
pub mod detector;
pub mod error;
pub mod executor;
pub mod install;
pub mod instance;
pub mod monitor;
pub mod notifier;
pub mod sampler;

pub use detector::{Decision, Phase, Thresholds, TransferDetector};
pub use monitor::ActivityMonitor;
