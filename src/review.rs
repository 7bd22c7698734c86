//! Interactive terminal review of pending autopilot drafts

use anyhow::Result;
use std::io::{self, BufRead, Write};

use inbox_autopilot::ai::AiDrafter;
use inbox_autopilot::autopilot::{Autopilot, AutopilotDraft, AutopilotError};
use inbox_autopilot::backend::RestClient;
use inbox_autopilot::config::NotificationConfig;
use inbox_autopilot::mail::{html_to_text, text_to_html};

pub type AppAutopilot = Autopilot<RestClient, AiDrafter, RestClient>;

enum Decision {
    Done,
    Quit,
}

fn prompt(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

/// Read lines until a line containing only "."
fn read_multiline() -> Result<String> {
    let stdin = io::stdin();
    let mut lines = Vec::new();
    for line in stdin.lock().lines() {
        let line = line?;
        if line.trim() == "." {
            break;
        }
        lines.push(line);
    }
    Ok(lines.join("\n"))
}

fn print_draft(draft: &AutopilotDraft, index: usize, total: usize) {
    println!();
    println!("[{}/{}] {}", index + 1, total, "-".repeat(60));
    println!("From:     {}", draft.email.sender_mailbox());
    println!("Subject:  {}", draft.email.subject);
    println!(
        "Triage:   {} | urgency {} | {:?}",
        draft.analysis.category, draft.analysis.urgency, draft.analysis.sentiment
    );
    if !draft.email.snippet.is_empty() {
        println!("Snippet:  {}", draft.email.snippet);
    }
    println!();
    println!("Reply ({}): {}", draft.tone, draft.draft_subject);
    println!("{}", html_to_text(&draft.draft_body, 78));
}

#[cfg_attr(not(feature = "notifications"), allow(unused_variables))]
async fn review_one(
    autopilot: &AppAutopilot,
    notifications: &NotificationConfig,
    draft: &AutopilotDraft,
    index: usize,
    total: usize,
) -> Result<Decision> {
    let email_id = draft.email_id.as_str();
    print_draft(draft, index, total);

    loop {
        let choice = prompt("[a]pprove  [r]eject  [e]dit  [s]kip  [q]uit: ")?;
        match choice.as_str() {
            "a" => {
                match autopilot.approve(email_id).await {
                    Ok(sent) => println!("Sent reply to {}.", sent.email.display_from()),
                    Err(AutopilotError::Send { cause, .. }) => {
                        eprintln!("Send failed, draft kept for retry: {:#}", cause);
                        #[cfg(feature = "notifications")]
                        inbox_autopilot::notification::notify_send_failed(
                            notifications,
                            &draft.draft_subject,
                        );
                    }
                    Err(e) => eprintln!("{}", e),
                }
                return Ok(Decision::Done);
            }
            "r" => {
                let reason = prompt("Reason (optional, e.g. wrong_tone): ")?;
                let reason = (!reason.is_empty()).then_some(reason);
                if let Err(e) = autopilot.reject(email_id, reason).await {
                    eprintln!("{}", e);
                }
                return Ok(Decision::Done);
            }
            "e" => {
                println!("Enter the new reply text, then a line with a single '.':");
                let text = read_multiline()?;
                if text.trim().is_empty() {
                    println!("Empty reply, keeping the current draft.");
                    continue;
                }
                autopilot.update_body(email_id, text_to_html(&text));
                if let Some(updated) = autopilot.draft(email_id) {
                    print_draft(&updated, index, total);
                }
            }
            "s" => return Ok(Decision::Done),
            "q" => return Ok(Decision::Quit),
            _ => println!("Please answer a, r, e, s or q."),
        }
    }
}

/// Walk through every pending draft, then drop the processed ones
pub async fn review_pending(
    autopilot: &AppAutopilot,
    notifications: &NotificationConfig,
) -> Result<()> {
    let pending = autopilot.pending_drafts();
    if pending.is_empty() {
        println!("No drafts waiting for review.");
        return Ok(());
    }

    let total = pending.len();
    for (index, draft) in pending.iter().enumerate() {
        if let Decision::Quit = review_one(autopilot, notifications, draft, index, total).await? {
            break;
        }
    }

    let cleared = autopilot.clear_processed();
    let stats = autopilot.stats();
    println!(
        "\nReview finished: {} processed, {} still pending. Today: {} sent, {} rejected.",
        cleared,
        autopilot.pending_drafts().len(),
        stats.sent_today,
        stats.rejected_today
    );
    Ok(())
}
