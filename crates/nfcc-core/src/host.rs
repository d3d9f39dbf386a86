//! Host-side collaborators consumed by the power core
//!
//! These are implemented by the NFC service around the core: the RF
//! discovery loop, the startup configuration sequence, and the static
//! configuration store.

/// Configuration key holding the desired screen-off power state
pub const SCREEN_OFF_POWER_STATE: &str = "SCREEN_OFF_POWER_STATE";

/// Control over the controller's RF discovery loop
pub trait RfDiscovery: Send + Sync {
    /// Stop polling so configuration can be written safely
    fn pause_discovery(&self);

    /// Restart polling after a [`RfDiscovery::pause_discovery`]
    fn resume_discovery(&self);
}

/// Re-applies the controller's startup configuration after it wakes up
pub trait StartupConfig: Send + Sync {
    fn apply_startup_config(&self);
}

/// Read-only access to static configuration values
pub trait ConfigStore: Send + Sync {
    /// Unsigned value for `key`, if present
    fn get_unsigned(&self, key: &str) -> Option<u32>;
}

impl ConfigStore for std::collections::HashMap<String, u32> {
    fn get_unsigned(&self, key: &str) -> Option<u32> {
        self.get(key).copied()
    }
}
