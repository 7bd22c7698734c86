//! In-memory review queue of autopilot drafts, keyed by email id
//!
//! Iteration follows insertion order. Stats side effects of status changes are
//! applied by the engine, which owns both the queue and the stats store.

use std::collections::HashMap;

use super::types::{AutopilotDraft, DraftStatus};

#[derive(Debug, Default)]
pub struct DraftQueue {
    drafts: HashMap<String, AutopilotDraft>,
    /// Email ids in insertion order
    order: Vec<String>,
}

impl DraftQueue {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.drafts.len()
    }

    pub fn contains(&self, email_id: &str) -> bool {
        self.drafts.contains_key(email_id)
    }

    pub fn get(&self, email_id: &str) -> Option<&AutopilotDraft> {
        self.drafts.get(email_id)
    }

    /// Insert a draft, replacing any existing entry for the same email.
    /// A replaced entry keeps its original position.
    pub fn add(&mut self, draft: AutopilotDraft) {
        if !self.drafts.contains_key(&draft.email_id) {
            self.order.push(draft.email_id.clone());
        }
        self.drafts.insert(draft.email_id.clone(), draft);
    }

    /// Update the status of a queued draft. Returns the previous status, or
    /// `None` when the id is unknown (a silent no-op).
    pub fn set_status(
        &mut self,
        email_id: &str,
        status: DraftStatus,
        rejection_reason: Option<String>,
    ) -> Option<DraftStatus> {
        let draft = self.drafts.get_mut(email_id)?;
        let previous = draft.status;
        draft.status = status;
        if rejection_reason.is_some() {
            draft.rejection_reason = rejection_reason;
        }
        tracing::debug!("Draft {}: {} -> {}", email_id, previous, status);
        Some(previous)
    }

    /// Replace the body of a queued draft without touching its status.
    /// Returns false when the id is unknown.
    pub fn update_body(&mut self, email_id: &str, body: String) -> bool {
        match self.drafts.get_mut(email_id) {
            Some(draft) => {
                draft.draft_body = body;
                true
            }
            None => false,
        }
    }

    /// Pending drafts in insertion order
    pub fn pending(&self) -> Vec<AutopilotDraft> {
        self.iter().filter(|d| d.is_pending()).cloned().collect()
    }

    /// All drafts in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &AutopilotDraft> {
        self.order.iter().filter_map(|id| self.drafts.get(id))
    }

    /// Drop every sent or rejected draft. Approved drafts have a send in flight
    /// and stay until it settles. Returns how many were removed.
    pub fn clear_processed(&mut self) -> usize {
        let before = self.drafts.len();
        self.drafts.retain(|_, d| !d.is_processed());
        let drafts = &self.drafts;
        self.order.retain(|id| drafts.contains_key(id));
        before - self.drafts.len()
    }
}
