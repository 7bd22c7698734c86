//! Autopilot preferences and their durable store

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::RwLock;

use super::types::{MaxUrgency, Tone};
use crate::constants::{LOCKED_CATEGORIES, PREFERENCES_KEY};
use crate::storage::KvStore;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AutopilotPreferences {
    /// Master switch
    pub enabled: bool,
    /// Temporary suspension that keeps `enabled` intact
    pub paused: bool,
    pub default_tone: Tone,
    pub max_urgency: MaxUrgency,
    pub exclude_categories: BTreeSet<String>,
    /// Hint for hosts: run a cycle after each mailbox sync
    pub auto_draft_on_sync: bool,
    /// Set once the user has confirmed the onboarding explainer
    pub has_seen_explainer: bool,
}

impl Default for AutopilotPreferences {
    fn default() -> Self {
        Self {
            enabled: false,
            paused: false,
            default_tone: Tone::Professional,
            max_urgency: MaxUrgency::Two,
            exclude_categories: LOCKED_CATEGORIES.iter().map(|c| c.to_string()).collect(),
            auto_draft_on_sync: true,
            has_seen_explainer: false,
        }
    }
}

impl AutopilotPreferences {
    /// Enabled and not paused
    pub fn is_active(&self) -> bool {
        self.enabled && !self.paused
    }

    pub fn excludes(&self, category: &str) -> bool {
        self.exclude_categories
            .iter()
            .any(|c| c.eq_ignore_ascii_case(category))
    }
}

/// Whether a category is one of the always-excluded ones
pub fn is_locked_category(category: &str) -> bool {
    LOCKED_CATEGORIES
        .iter()
        .any(|c| c.eq_ignore_ascii_case(category.trim()))
}

/// Partial update; `None` fields keep their current value
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PreferencesPatch {
    pub enabled: Option<bool>,
    pub paused: Option<bool>,
    pub default_tone: Option<Tone>,
    pub max_urgency: Option<MaxUrgency>,
    pub exclude_categories: Option<BTreeSet<String>>,
    pub auto_draft_on_sync: Option<bool>,
    pub has_seen_explainer: Option<bool>,
}

impl PreferencesPatch {
    /// Patch adding `category` to the current exclusion set
    pub fn with_excluded(current: &AutopilotPreferences, category: &str) -> Self {
        let mut categories = current.exclude_categories.clone();
        categories.insert(category.trim().to_lowercase());
        Self {
            exclude_categories: Some(categories),
            ..Self::default()
        }
    }

    /// Patch removing `category` from the current exclusion set.
    /// Locked categories are not protected here; hosts decide whether to allow it.
    pub fn without_excluded(current: &AutopilotPreferences, category: &str) -> Self {
        let mut categories = current.exclude_categories.clone();
        categories.retain(|c| !c.eq_ignore_ascii_case(category.trim()));
        Self {
            exclude_categories: Some(categories),
            ..Self::default()
        }
    }

    fn apply(self, prefs: &mut AutopilotPreferences) {
        if let Some(enabled) = self.enabled {
            prefs.enabled = enabled;
        }
        if let Some(paused) = self.paused {
            prefs.paused = paused;
        }
        if let Some(tone) = self.default_tone {
            prefs.default_tone = tone;
        }
        if let Some(max_urgency) = self.max_urgency {
            prefs.max_urgency = max_urgency;
        }
        if let Some(categories) = self.exclude_categories {
            prefs.exclude_categories = categories;
        }
        if let Some(auto_draft) = self.auto_draft_on_sync {
            prefs.auto_draft_on_sync = auto_draft;
        }
        if let Some(seen) = self.has_seen_explainer {
            prefs.has_seen_explainer = seen;
        }
    }
}

/// Holds the in-memory preferences and writes every change through to storage
pub struct PreferenceStore {
    kv: KvStore,
    current: RwLock<AutopilotPreferences>,
}

impl PreferenceStore {
    /// Load persisted preferences, falling back to defaults when the record is
    /// missing, unreadable or corrupt. Never fails.
    pub async fn load(kv: KvStore) -> Self {
        let prefs = match kv.get_json::<AutopilotPreferences>(PREFERENCES_KEY).await {
            Ok(Some(prefs)) => prefs,
            Ok(None) => AutopilotPreferences::default(),
            Err(e) => {
                tracing::warn!("Ignoring stored autopilot preferences: {:#}", e);
                AutopilotPreferences::default()
            }
        };

        Self {
            kv,
            current: RwLock::new(prefs),
        }
    }

    pub fn get(&self) -> AutopilotPreferences {
        self.current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Merge `patch` into the current preferences, persist, and return the result.
    /// A failed write is logged; the in-memory copy stays authoritative.
    pub async fn update(&self, patch: PreferencesPatch) -> AutopilotPreferences {
        let merged = {
            let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
            patch.apply(&mut guard);
            guard.clone()
        };

        if let Err(e) = self.kv.set_json(PREFERENCES_KEY, &merged).await {
            tracing::warn!("Failed to persist autopilot preferences: {:#}", e);
        }

        merged
    }
}
