//! Crate-wide constants for tuning and storage layout
//!
//! Centralizes magic numbers to make them discoverable and configurable.

/// Maximum number of drafts generated per processor cycle.
/// Bounds calls to the draft service; leftover candidates wait for the next trigger.
pub const AUTOPILOT_BATCH_SIZE: usize = 5;

/// Categories that are excluded by default and cannot be re-enabled from the host UI.
pub const LOCKED_CATEGORIES: [&str; 3] = ["legal", "billing", "personal"];

/// Storage key for the persisted autopilot preferences record.
pub const PREFERENCES_KEY: &str = "autopilot_preferences";

/// Storage key for the persisted daily stats record.
pub const STATS_KEY: &str = "autopilot_stats";

/// Desktop notification display duration in milliseconds.
pub const NOTIFICATION_TIMEOUT_MS: u32 = 5000;

/// Subject/preview length shown in notifications before truncation.
pub const NOTIFICATION_PREVIEW_LEN: usize = 100;
