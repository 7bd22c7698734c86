//! Reply drafting on top of the chat completion client

use anyhow::{Result, bail};
use serde::Deserialize;

use super::client::OpenRouterClient;
use super::prompts;
use crate::autopilot::{DraftGenerator, DraftRequest, GeneratedDraft};
use crate::mail::{reply_subject, text_to_html};

#[derive(Deserialize)]
struct DraftJson {
    #[serde(default)]
    subject: String,
    body: String,
}

pub struct AiDrafter {
    client: OpenRouterClient,
    max_tokens: u32,
}

impl AiDrafter {
    pub fn new(client: OpenRouterClient, max_tokens: u32) -> Self {
        Self { client, max_tokens }
    }
}

impl DraftGenerator for AiDrafter {
    async fn generate_draft(&self, request: &DraftRequest) -> Result<GeneratedDraft> {
        let system = prompts::reply_system_prompt(request.tone);
        let context = prompts::reply_context(request);

        let raw = self
            .client
            .complete(&system, &context, self.max_tokens)
            .await?;

        let draft = parse_draft(&raw, &request.original_email.subject)?;
        tracing::debug!(
            "Drafted {} reply with {} ({} chars)",
            request.tone,
            self.client.model(),
            draft.body.len()
        );
        Ok(draft)
    }
}

/// Parse the model output. JSON (optionally inside a code fence) is preferred;
/// plain text becomes the body of a `Re:` reply.
fn parse_draft(raw: &str, original_subject: &str) -> Result<GeneratedDraft> {
    let text = strip_code_fence(raw.trim());
    if text.is_empty() {
        bail!("AI returned an empty draft");
    }

    if let Ok(parsed) = serde_json::from_str::<DraftJson>(text)
        && !parsed.body.trim().is_empty()
    {
        let subject = if parsed.subject.trim().is_empty() {
            reply_subject(original_subject)
        } else {
            parsed.subject.trim().to_string()
        };
        return Ok(GeneratedDraft {
            subject,
            body: parsed.body,
        });
    }

    Ok(GeneratedDraft {
        subject: reply_subject(original_subject),
        body: text_to_html(text),
    })
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop the info string (e.g. `json`) on the opening line
    let rest = rest.split_once('\n').map(|(_, body)| body).unwrap_or("");
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::autopilot::{OriginalEmail, Tone};
    use chrono::Utc;

    #[test]
    fn test_parse_json_draft() {
        let raw = r#"{"subject": "Re: Friday", "body": "<p>Friday works.</p>"}"#;
        let draft = parse_draft(raw, "Friday").unwrap();
        assert_eq!(draft.subject, "Re: Friday");
        assert_eq!(draft.body, "<p>Friday works.</p>");
    }

    #[test]
    fn test_parse_fenced_json_without_subject() {
        let raw = "```json\n{\"body\": \"<p>Sure.</p>\"}\n```";
        let draft = parse_draft(raw, "Friday").unwrap();
        assert_eq!(draft.subject, "Re: Friday");
        assert_eq!(draft.body, "<p>Sure.</p>");
    }

    #[test]
    fn test_plain_text_fallback() {
        let raw = "Hi Pat,\nThanks for reaching out.\n\nBest & regards";
        let draft = parse_draft(raw, "Re: Visit").unwrap();
        assert_eq!(draft.subject, "Re: Visit");
        assert_eq!(
            draft.body,
            "<p>Hi Pat,<br>Thanks for reaching out.</p><p>Best &amp; regards</p>"
        );
    }

    #[test]
    fn test_empty_output_is_error() {
        assert!(parse_draft("   ", "Visit").is_err());
        assert!(parse_draft("```\n```", "Visit").is_err());
    }

    #[tokio::test]
    async fn test_generate_draft_calls_model_with_tone() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_body(mockito::Matcher::Regex("Tone: Be as brief".to_string()))
            .with_status(200)
            .with_body(
                serde_json::json!({
                    "choices": [{"message": {"content":
                        "{\"subject\": \"Re: Refill\", \"body\": \"<p>Done.</p>\"}"}}]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = OpenRouterClient::new("key".to_string(), "m".to_string())
            .with_base_url(&server.url());
        let drafter = AiDrafter::new(client, 200);
        let request = DraftRequest {
            original_email: OriginalEmail {
                from: "pat@example.com".to_string(),
                subject: "Refill".to_string(),
                body: "Please renew".to_string(),
                date: Utc::now(),
            },
            tone: Tone::Concise,
            is_reply: true,
        };

        let draft = drafter.generate_draft(&request).await.unwrap();
        assert_eq!(draft.subject, "Re: Refill");
        assert_eq!(draft.body, "<p>Done.</p>");
        mock.assert_async().await;
    }
}
