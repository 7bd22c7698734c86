//! Autopilot value types shared by the stores, queue and processor

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::mail::{Analysis, EmailSummary};

/// Tone requested from the draft generator
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    #[default]
    Professional,
    Friendly,
    Concise,
    Firm,
    Empathetic,
}

impl Tone {
    pub const ALL: [Tone; 5] = [
        Tone::Professional,
        Tone::Friendly,
        Tone::Concise,
        Tone::Firm,
        Tone::Empathetic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tone::Professional => "professional",
            Tone::Friendly => "friendly",
            Tone::Concise => "concise",
            Tone::Firm => "firm",
            Tone::Empathetic => "empathetic",
        }
    }
}

impl fmt::Display for Tone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tone {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Tone::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                format!(
                    "unknown tone '{}' (expected one of: professional, friendly, concise, firm, empathetic)",
                    s
                )
            })
    }
}

/// Inclusive urgency ceiling for auto-drafting. Stored as the bare number 1, 2 or 3.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum MaxUrgency {
    One,
    #[default]
    Two,
    Three,
}

impl MaxUrgency {
    pub fn value(self) -> u8 {
        match self {
            MaxUrgency::One => 1,
            MaxUrgency::Two => 2,
            MaxUrgency::Three => 3,
        }
    }
}

impl TryFrom<u8> for MaxUrgency {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(MaxUrgency::One),
            2 => Ok(MaxUrgency::Two),
            3 => Ok(MaxUrgency::Three),
            other => Err(format!("max urgency must be 1, 2 or 3 (got {})", other)),
        }
    }
}

impl From<MaxUrgency> for u8 {
    fn from(value: MaxUrgency) -> Self {
        value.value()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DraftStatus {
    Pending,
    /// Approved by the user, send in flight
    Approved,
    Rejected,
    Sent,
}

impl fmt::Display for DraftStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DraftStatus::Pending => "pending",
            DraftStatus::Approved => "approved",
            DraftStatus::Rejected => "rejected",
            DraftStatus::Sent => "sent",
        };
        f.write_str(s)
    }
}

/// An auto-generated reply awaiting review.
///
/// `email` and `analysis` are snapshots taken when the draft was generated; later
/// changes to the inbox do not touch queued drafts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutopilotDraft {
    pub email_id: String,
    pub email: EmailSummary,
    pub analysis: Analysis,
    pub draft_subject: String,
    /// HTML body
    pub draft_body: String,
    pub tone: Tone,
    pub status: DraftStatus,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl AutopilotDraft {
    /// New pending draft for `email`
    pub fn pending(
        email: EmailSummary,
        analysis: Analysis,
        draft_subject: String,
        draft_body: String,
        tone: Tone,
    ) -> Self {
        Self {
            email_id: email.id.clone(),
            email,
            analysis,
            draft_subject,
            draft_body,
            tone,
            status: DraftStatus::Pending,
            rejection_reason: None,
            created_at: Utc::now(),
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == DraftStatus::Pending
    }

    /// Sent or rejected. An approved draft is still being sent.
    pub fn is_processed(&self) -> bool {
        matches!(self.status, DraftStatus::Sent | DraftStatus::Rejected)
    }
}
