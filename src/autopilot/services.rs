//! External capabilities the autopilot core depends on
//!
//! The backend REST client and the AI drafter implement these for production;
//! tests plug in in-process fakes.

use anyhow::Result;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::future::Future;

use super::types::Tone;
use crate::mail::{Analysis, EmailSummary, OutgoingReply};

/// Inbox listing plus the AI analyses keyed by email id
pub trait InboxProvider: Send + Sync {
    fn list_inbox_emails(
        &self,
        user_id: &str,
    ) -> impl Future<Output = Result<Vec<EmailSummary>>> + Send;

    fn get_all_analyses(
        &self,
        user_id: &str,
    ) -> impl Future<Output = Result<HashMap<String, Analysis>>> + Send;
}

/// The email being replied to, as context for generation
#[derive(Debug, Clone, PartialEq)]
pub struct OriginalEmail {
    pub from: String,
    pub subject: String,
    pub body: String,
    pub date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DraftRequest {
    pub original_email: OriginalEmail,
    pub tone: Tone,
    pub is_reply: bool,
}

impl DraftRequest {
    /// Reply request built from an inbox entry; the snippet stands in for the body
    pub fn reply_to(email: &EmailSummary, tone: Tone) -> Self {
        Self {
            original_email: OriginalEmail {
                from: email.sender_mailbox(),
                subject: email.subject.clone(),
                body: email.snippet.clone(),
                date: email.received_at,
            },
            tone,
            is_reply: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedDraft {
    pub subject: String,
    /// HTML body
    pub body: String,
}

pub trait DraftGenerator: Send + Sync {
    /// Generate one draft. Implementations must not retry on their own.
    fn generate_draft(
        &self,
        request: &DraftRequest,
    ) -> impl Future<Output = Result<GeneratedDraft>> + Send;
}

pub trait MailSender: Send + Sync {
    fn send_email(&self, reply: &OutgoingReply) -> impl Future<Output = Result<()>> + Send;
}
