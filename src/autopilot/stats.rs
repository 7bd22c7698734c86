//! Daily sent/rejected counters

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

use crate::constants::STATS_KEY;
use crate::storage::KvStore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutopilotStats {
    pub sent_today: u32,
    pub rejected_today: u32,
    /// Local calendar day the counters belong to
    pub date: NaiveDate,
}

impl AutopilotStats {
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            sent_today: 0,
            rejected_today: 0,
            date,
        }
    }

    /// Reset to zero if the record belongs to another day
    fn roll_over(&mut self, today: NaiveDate) {
        if self.date != today {
            *self = Self::empty(today);
        }
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

pub struct StatsStore {
    kv: KvStore,
    current: Mutex<AutopilotStats>,
}

impl StatsStore {
    /// Load today's counters. Records from another day, missing or corrupt
    /// records all yield a zeroed record for today.
    pub async fn load(kv: KvStore) -> Self {
        let today = today();
        let stats = match kv.get_json::<AutopilotStats>(STATS_KEY).await {
            Ok(Some(mut stats)) => {
                stats.roll_over(today);
                stats
            }
            Ok(None) => AutopilotStats::empty(today),
            Err(e) => {
                tracing::warn!("Ignoring stored autopilot stats: {:#}", e);
                AutopilotStats::empty(today)
            }
        };

        Self {
            kv,
            current: Mutex::new(stats),
        }
    }

    pub fn get(&self) -> AutopilotStats {
        let mut guard = self.current.lock().unwrap_or_else(|e| e.into_inner());
        guard.roll_over(today());
        guard.clone()
    }

    pub async fn record_sent(&self) -> AutopilotStats {
        self.record(|stats| stats.sent_today += 1).await
    }

    pub async fn record_rejected(&self) -> AutopilotStats {
        self.record(|stats| stats.rejected_today += 1).await
    }

    async fn record(&self, bump: impl FnOnce(&mut AutopilotStats)) -> AutopilotStats {
        let snapshot = {
            let mut guard = self.current.lock().unwrap_or_else(|e| e.into_inner());
            guard.roll_over(today());
            bump(&mut guard);
            guard.clone()
        };

        if let Err(e) = self.kv.set_json(STATS_KEY, &snapshot).await {
            tracing::warn!("Failed to persist autopilot stats: {:#}", e);
        }

        snapshot
    }
}
