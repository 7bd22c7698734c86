//! Public entry point for hosts
//!
//! `Autopilot` owns the preference and stats stores, the draft queue and the
//! processor, and wires them to the inbox, draft and send services. It is meant to
//! be shared (e.g. behind an `Arc`) by every page or command that triggers cycles.

use std::sync::Mutex;

use super::error::{AutopilotError, AutopilotResult};
use super::prefs::{AutopilotPreferences, PreferenceStore, PreferencesPatch};
use super::processor::{CycleOutcome, Processor};
use super::queue::DraftQueue;
use super::services::{DraftGenerator, InboxProvider, MailSender};
use super::stats::{AutopilotStats, StatsStore};
use super::types::{AutopilotDraft, DraftStatus};
use crate::constants::AUTOPILOT_BATCH_SIZE;
use crate::mail::OutgoingReply;
use crate::storage::KvStore;

/// Identity and tuning for one user session
#[derive(Debug, Clone)]
pub struct AutopilotSettings {
    pub user_id: String,
    /// Mailbox account replies are sent from
    pub account_id: String,
    pub batch_size: usize,
}

impl AutopilotSettings {
    pub fn new(user_id: impl Into<String>, account_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            account_id: account_id.into(),
            batch_size: AUTOPILOT_BATCH_SIZE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnableOutcome {
    Enabled,
    /// First enable: the host must show the explainer and call `confirm_explainer`
    NeedsExplainer,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutopilotStatus {
    pub enabled: bool,
    pub paused: bool,
    pub processing: bool,
    pub pending: usize,
    pub stats: AutopilotStats,
}

impl AutopilotStatus {
    pub fn is_active(&self) -> bool {
        self.enabled && !self.paused
    }
}

pub struct Autopilot<I, G, S> {
    settings: AutopilotSettings,
    prefs: PreferenceStore,
    stats: StatsStore,
    queue: Mutex<DraftQueue>,
    processor: Processor,
    inbox: I,
    generator: G,
    sender: S,
}

impl<I, G, S> Autopilot<I, G, S>
where
    I: InboxProvider,
    G: DraftGenerator,
    S: MailSender,
{
    /// Load persisted preferences and today's stats, starting with an empty queue
    pub async fn open(
        settings: AutopilotSettings,
        kv: KvStore,
        inbox: I,
        generator: G,
        sender: S,
    ) -> Self {
        let prefs = PreferenceStore::load(kv.clone()).await;
        let stats = StatsStore::load(kv).await;
        let processor = Processor::new(settings.batch_size);

        Self {
            settings,
            prefs,
            stats,
            queue: Mutex::new(DraftQueue::new()),
            processor,
            inbox,
            generator,
            sender,
        }
    }

    pub fn settings(&self) -> &AutopilotSettings {
        &self.settings
    }

    // === Preferences ===

    pub fn preferences(&self) -> AutopilotPreferences {
        self.prefs.get()
    }

    pub async fn update_preferences(&self, patch: PreferencesPatch) -> AutopilotPreferences {
        self.prefs.update(patch).await
    }

    pub fn is_active(&self) -> bool {
        self.prefs.get().is_active()
    }

    /// Turn autopilot on, unless the user has not seen the explainer yet
    pub async fn request_enable(&self) -> EnableOutcome {
        if !self.prefs.get().has_seen_explainer {
            return EnableOutcome::NeedsExplainer;
        }
        self.prefs
            .update(PreferencesPatch {
                enabled: Some(true),
                ..Default::default()
            })
            .await;
        EnableOutcome::Enabled
    }

    /// Record that the explainer was accepted and enable autopilot
    pub async fn confirm_explainer(&self) -> AutopilotPreferences {
        self.prefs
            .update(PreferencesPatch {
                enabled: Some(true),
                has_seen_explainer: Some(true),
                ..Default::default()
            })
            .await
    }

    pub async fn disable(&self) -> AutopilotPreferences {
        self.prefs
            .update(PreferencesPatch {
                enabled: Some(false),
                ..Default::default()
            })
            .await
    }

    /// Stop future cycles from starting. A running cycle finishes its batch.
    pub async fn pause(&self) -> AutopilotPreferences {
        self.set_paused(true).await
    }

    pub async fn resume(&self) -> AutopilotPreferences {
        self.set_paused(false).await
    }

    async fn set_paused(&self, paused: bool) -> AutopilotPreferences {
        self.prefs
            .update(PreferencesPatch {
                paused: Some(paused),
                ..Default::default()
            })
            .await
    }

    // === Processing ===

    /// Run one processor cycle if autopilot is active
    pub async fn trigger(&self) -> AutopilotResult<CycleOutcome> {
        let prefs = self.prefs.get();
        if !prefs.is_active() {
            return Ok(CycleOutcome::Inactive);
        }

        self.processor
            .run_cycle(
                &self.settings.user_id,
                &prefs,
                &self.inbox,
                &self.generator,
                &self.queue,
            )
            .await
    }

    /// Hook for hosts after a mailbox sync; honours `autoDraftOnSync`
    pub async fn after_sync(&self) -> AutopilotResult<CycleOutcome> {
        if !self.prefs.get().auto_draft_on_sync {
            tracing::debug!("Auto-draft on sync disabled, skipping cycle");
            return Ok(CycleOutcome::Inactive);
        }
        self.trigger().await
    }

    pub fn is_processing(&self) -> bool {
        self.processor.is_running()
    }

    // === Queue ===

    fn lock_queue(&self) -> std::sync::MutexGuard<'_, DraftQueue> {
        self.queue.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn pending_drafts(&self) -> Vec<AutopilotDraft> {
        self.lock_queue().pending()
    }

    pub fn draft(&self, email_id: &str) -> Option<AutopilotDraft> {
        self.lock_queue().get(email_id).cloned()
    }

    /// Set a draft's status. `Sent` and `Rejected` bump today's counters; unknown
    /// ids are ignored.
    pub async fn set_status(
        &self,
        email_id: &str,
        status: DraftStatus,
        rejection_reason: Option<String>,
    ) {
        let applied = self
            .lock_queue()
            .set_status(email_id, status, rejection_reason)
            .is_some();
        if !applied {
            tracing::debug!("Ignoring status change for unknown draft {}", email_id);
            return;
        }

        match status {
            DraftStatus::Sent => {
                self.stats.record_sent().await;
            }
            DraftStatus::Rejected => {
                self.stats.record_rejected().await;
            }
            DraftStatus::Pending | DraftStatus::Approved => {}
        }
    }

    /// Replace a draft's body after a manual edit. Unknown ids are ignored.
    pub fn update_body(&self, email_id: &str, body: String) {
        if !self.lock_queue().update_body(email_id, body) {
            tracing::debug!("Ignoring edit for unknown draft {}", email_id);
        }
    }

    /// Remove sent and rejected drafts from the queue. Drafts with a send in
    /// flight are kept.
    pub fn clear_processed(&self) -> usize {
        self.lock_queue().clear_processed()
    }

    fn pending_draft(queue: &DraftQueue, email_id: &str) -> AutopilotResult<AutopilotDraft> {
        let draft = queue
            .get(email_id)
            .ok_or_else(|| AutopilotError::DraftNotFound(email_id.to_string()))?;
        if !draft.is_pending() {
            return Err(AutopilotError::NotPending {
                email_id: email_id.to_string(),
                status: draft.status,
            });
        }
        Ok(draft.clone())
    }

    /// Send a pending draft. On failure the draft returns to pending so the user
    /// can retry, and the counters are left alone.
    pub async fn approve(&self, email_id: &str) -> AutopilotResult<AutopilotDraft> {
        // Approved marks the send as in flight so a second approval is refused
        let draft = {
            let mut queue = self.lock_queue();
            let draft = Self::pending_draft(&queue, email_id)?;
            queue.set_status(email_id, DraftStatus::Approved, None);
            draft
        };

        let reply = OutgoingReply {
            account_id: self.settings.account_id.clone(),
            to: draft.email.from_address.clone(),
            subject: draft.draft_subject.clone(),
            body: draft.draft_body.clone(),
            in_reply_to: Some(draft.email_id.clone()),
        };

        if let Err(e) = self.sender.send_email(&reply).await {
            tracing::warn!("Autopilot reply to {} failed: {:#}", email_id, e);
            self.lock_queue().set_status(email_id, DraftStatus::Pending, None);
            return Err(AutopilotError::Send {
                email_id: email_id.to_string(),
                cause: e,
            });
        }

        self.set_status(email_id, DraftStatus::Sent, None).await;
        tracing::info!("Autopilot reply sent to {}", reply.to);

        Ok(AutopilotDraft {
            status: DraftStatus::Sent,
            ..draft
        })
    }

    /// Discard a pending draft, keeping the optional reason for later review
    pub async fn reject(&self, email_id: &str, reason: Option<String>) -> AutopilotResult<()> {
        Self::pending_draft(&self.lock_queue(), email_id)?;
        self.set_status(email_id, DraftStatus::Rejected, reason).await;
        tracing::info!("Autopilot draft for {} rejected", email_id);
        Ok(())
    }

    // === Reporting ===

    pub fn stats(&self) -> AutopilotStats {
        self.stats.get()
    }

    pub fn status(&self) -> AutopilotStatus {
        let prefs = self.prefs.get();
        AutopilotStatus {
            enabled: prefs.enabled,
            paused: prefs.paused,
            processing: self.is_processing(),
            pending: self.lock_queue().pending().len(),
            stats: self.stats.get(),
        }
    }
}
