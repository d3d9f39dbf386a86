//! RF session activation tracking
//!
//! The RF discovery layer reports when a remote endpoint is activated and
//! deactivated. Power transitions between low and full power wait here until
//! any active session has been torn down.

use tracing::debug;

use crate::sync_event::SyncEvent;

/// Activation state of the current RF session
#[derive(Default)]
pub struct RfSession {
    activated: SyncEvent<bool>,
}

impl RfSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        *self.activated.lock()
    }

    /// A remote endpoint was activated
    pub fn activated(&self) {
        *self.activated.lock() = true;
        debug!("RF session activated");
    }

    /// The active session was deactivated; wakes any waiting transition
    pub fn deactivated(&self) {
        let mut activated = self.activated.lock();
        *activated = false;
        activated.notify_one();
        debug!("RF session deactivated");
    }

    /// Block, without timeout, until no session is active
    pub fn wait_for_deactivation(&self) {
        let mut activated = self.activated.lock();
        while *activated {
            debug!("Waiting for RF deactivation");
            activated.wait();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_wait_returns_immediately_when_idle() {
        let session = RfSession::new();
        session.wait_for_deactivation();
        assert!(!session.is_active());
    }

    #[test]
    fn test_wait_blocks_until_deactivated() {
        let session = Arc::new(RfSession::new());
        session.activated();

        let waiter = {
            let session = session.clone();
            thread::spawn(move || session.wait_for_deactivation())
        };

        thread::sleep(Duration::from_millis(50));
        assert!(!waiter.is_finished());

        session.deactivated();
        waiter.join().unwrap();
        assert!(!session.is_active());
    }
}
