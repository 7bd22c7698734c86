pub mod types;

pub use types::{
    Analysis, EmailSummary, OutgoingReply, Sentiment, html_to_text, reply_subject, text_to_html,
};
