//! Announcement port
//!
//! Fire-and-forget channel messages (draw winners). Callers treat every
//! failure as non-fatal: log and continue.

use crate::domain::result::Result;

/// Outbound announcement channel
pub trait Notifier: Send + Sync {
    fn announce(&self, message: &str) -> Result<()>;
}

/// No-op notifier used when no webhook is configured
#[derive(Debug, Clone, Copy, Default)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn announce(&self, _message: &str) -> Result<()> {
        Ok(())
    }
}
