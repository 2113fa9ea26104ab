//! Desktop notifications

use notify_rust::Notification;
use tracing::warn;

pub const APP_NAME: &str = "Transfer Auto Closer";

/// Fire-and-forget user notifications. Failures are logged, never returned.
#[derive(Debug, Clone)]
pub struct Notifier {
    appname: String,
}

impl Notifier {
    pub fn new() -> Self {
        Self {
            appname: APP_NAME.to_string(),
        }
    }

    pub fn info(&self, summary: &str, body: &str) {
        self.send(summary, body, "dialog-information");
    }

    pub fn warning(&self, summary: &str, body: &str) {
        self.send(summary, body, "dialog-warning");
    }

    fn send(&self, summary: &str, body: &str, icon: &str) {
        if let Err(e) = Notification::new()
            .summary(summary)
            .body(body)
            .icon(icon)
            .appname(&self.appname)
            .show()
        {
            warn!("Failed to show notification '{}': {}", summary, e);
        }
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}
