//! Runtime-configurable tuning parameters for chorus.
//!
//! All values have sensible defaults. Override via environment variables
//! (prefixed `CHORUS_`) or by constructing a custom `ChorusConfig`.

use std::time::Duration;

/// Tuning parameters for group formation and transport.
///
/// Collective operations deliberately carry no timeouts: a participant that
/// never arrives stalls the group, and supervision is layered externally.
/// The only deadline here is construction-time (group formation), which is
/// the session layer's to report.
#[derive(Debug, Clone)]
pub struct ChorusConfig {
    /// How long the seed waits for all expected participants to join.
    pub formation_timeout: Duration,

    /// Group sizes at or above this threshold use the dissemination
    /// barrier; smaller groups use the two-phase barrier.
    pub dissemination_threshold: u32,

    /// Largest framed or raw payload the receive loop will accept.
    pub max_message_bytes: u64,
}

impl Default for ChorusConfig {
    fn default() -> Self {
        Self {
            formation_timeout: Duration::from_secs(60),
            dissemination_threshold: 5,
            max_message_bytes: 4 * 1024 * 1024 * 1024, // 4 GiB
        }
    }
}

impl ChorusConfig {
    /// Load config from environment variables, falling back to defaults.
    ///
    /// Recognized variables:
    /// - `CHORUS_FORMATION_TIMEOUT_SECS`
    /// - `CHORUS_DISSEMINATION_THRESHOLD`
    /// - `CHORUS_MAX_MESSAGE_BYTES`
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(v) = std::env::var("CHORUS_FORMATION_TIMEOUT_SECS") {
            if let Ok(s) = v.parse::<u64>() {
                cfg.formation_timeout = Duration::from_secs(s);
            }
        }
        if let Ok(v) = std::env::var("CHORUS_DISSEMINATION_THRESHOLD") {
            if let Ok(n) = v.parse::<u32>() {
                cfg.dissemination_threshold = n;
            }
        }
        if let Ok(v) = std::env::var("CHORUS_MAX_MESSAGE_BYTES") {
            if let Ok(n) = v.parse::<u64>() {
                cfg.max_message_bytes = n;
            }
        }

        cfg
    }
}
