//! System prompts for reply drafting

use crate::autopilot::{DraftRequest, Tone};

/// Base instructions shared by every tone
pub const REPLY_SYSTEM: &str = r#"You are an email assistant for a busy healthcare professional. Draft a reply to the email provided by the user. Only reply to what the email actually asks; never invent facts, appointments, prices, diagnoses or commitments. Leave placeholders like [date] where specific details are needed. Do not include a signature block.

Respond with a single JSON object and nothing else:
{"subject": "<reply subject>", "body": "<reply body as simple HTML using <p> and <br>>"}"#;

fn tone_guidance(tone: Tone) -> &'static str {
    match tone {
        Tone::Professional => "Write in a professional, courteous tone.",
        Tone::Friendly => "Write in a warm, friendly tone while staying appropriate for work.",
        Tone::Concise => "Be as brief as possible: two or three short sentences.",
        Tone::Firm => "Be polite but firm and unambiguous about boundaries and next steps.",
        Tone::Empathetic => {
            "Acknowledge the sender's situation and feelings before addressing the request."
        }
    }
}

pub fn reply_system_prompt(tone: Tone) -> String {
    format!("{}\n\nTone: {}", REPLY_SYSTEM, tone_guidance(tone))
}

/// User message describing the email being replied to
pub fn reply_context(request: &DraftRequest) -> String {
    let original = &request.original_email;
    format!(
        "From: {}\nDate: {}\nSubject: {}\n\n{}",
        original.from,
        original.date.format("%b %d, %Y at %H:%M UTC"),
        original.subject,
        original.body
    )
}
