use thiserror::Error;

use super::types::DraftStatus;

#[derive(Debug, Error)]
pub enum AutopilotError {
    #[error("Failed to load emails: {0:#}")]
    InboxFetch(anyhow::Error),

    #[error("No autopilot draft for email {0}")]
    DraftNotFound(String),

    #[error("Draft for email {email_id} is {status}, not pending")]
    NotPending {
        email_id: String,
        status: DraftStatus,
    },

    #[error("Failed to send reply to email {email_id}: {cause:#}")]
    Send {
        email_id: String,
        cause: anyhow::Error,
    },
}

pub type AutopilotResult<T> = std::result::Result<T, AutopilotError>;
