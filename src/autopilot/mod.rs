//! Autopilot: automatic reply drafting for low-risk mail
//!
//! - Preferences and daily stats persisted in the key-value store
//! - A pure eligibility filter over each email's AI analysis
//! - A review queue of drafts (pending → sent / rejected)
//! - A batch processor that fills the queue, one cycle at a time

mod engine;
mod error;
mod filter;
mod prefs;
mod processor;
mod queue;
mod services;
mod stats;
mod types;

pub use engine::{Autopilot, AutopilotSettings, AutopilotStatus, EnableOutcome};
pub use error::{AutopilotError, AutopilotResult};
pub use filter::{Disqualification, is_auto_draftable, qualify};
pub use prefs::{AutopilotPreferences, PreferenceStore, PreferencesPatch, is_locked_category};
pub use processor::{CycleOutcome, CycleReport, Processor};
pub use queue::DraftQueue;
pub use services::{
    DraftGenerator, DraftRequest, GeneratedDraft, InboxProvider, MailSender, OriginalEmail,
};
pub use stats::{AutopilotStats, StatsStore};
pub use types::{AutopilotDraft, DraftStatus, MaxUrgency, Tone};
