use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Inbox listing entry as returned by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailSummary {
    pub id: String,
    #[serde(default)]
    pub thread_id: Option<String>,
    #[serde(default)]
    pub from_name: Option<String>,
    pub from_address: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub snippet: String,
    pub received_at: DateTime<Utc>,
}

impl EmailSummary {
    pub fn display_from(&self) -> &str {
        self.from_name
            .as_deref()
            .filter(|n| !n.is_empty())
            .unwrap_or(&self.from_address)
    }

    /// Sender formatted as a mailbox, e.g. `Dr. Lee <lee@clinic.org>`
    pub fn sender_mailbox(&self) -> String {
        match self.from_name.as_deref() {
            Some(name) if !name.is_empty() => format!("{} <{}>", name, self.from_address),
            _ => self.from_address.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    #[default]
    Neutral,
    Negative,
    Mixed,
    #[serde(other)]
    Unknown,
}

/// AI triage result for one email
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    pub category: String,
    /// 1 (lowest) to 5 (highest)
    pub urgency: u8,
    #[serde(default)]
    pub sentiment: Sentiment,
    #[serde(default)]
    pub requires_response: bool,
    #[serde(default)]
    pub risk_flags: Vec<String>,
    #[serde(default)]
    pub summary: Option<String>,
}

/// Reply payload handed to the sending service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutgoingReply {
    pub account_id: String,
    pub to: String,
    pub subject: String,
    /// HTML body
    pub body: String,
    pub in_reply_to: Option<String>,
}

/// Prefix a subject with `Re:` unless it already carries one
pub fn reply_subject(subject: &str) -> String {
    let trimmed = subject.trim();
    if trimmed
        .get(..3)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("re:"))
    {
        trimmed.to_string()
    } else if trimmed.is_empty() {
        "Re: (no subject)".to_string()
    } else {
        format!("Re: {}", trimmed)
    }
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// Convert plain text to simple HTML: blank-line separated paragraphs become
/// `<p>` blocks, single newlines `<br>`
pub fn text_to_html(text: &str) -> String {
    text.split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| {
            let lines: Vec<String> = p.lines().map(|l| escape_html(l.trim())).collect();
            format!("<p>{}</p>", lines.join("<br>"))
        })
        .collect()
}

/// Render an HTML body as wrapped plain text for terminal display
pub fn html_to_text(html: &str, width: usize) -> String {
    html2text::config::plain()
        .string_from_read(html.as_bytes(), width)
        .unwrap_or_else(|_| html.to_string())
}
