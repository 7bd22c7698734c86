use anyhow::{Context, Result};
use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;
use std::collections::HashMap;

use crate::autopilot::{InboxProvider, MailSender};
use crate::mail::{Analysis, EmailSummary, OutgoingReply};

#[derive(Clone)]
pub struct RestClient {
    client: Client,
    base_url: String,
    token: String,
}

impl RestClient {
    pub fn new(base_url: &str, token: String) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    /// Base URL extended by `segments`, each encoded as a single path segment
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .with_context(|| format!("Invalid backend URL: {}", self.base_url))?;
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("Backend URL cannot take a path: {}", self.base_url))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url, what: &str) -> Result<T> {
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.token)
            .send()
            .await
            .with_context(|| format!("Failed to request {}", what))?;

        let response = check_status(response, what).await?;
        response
            .json()
            .await
            .with_context(|| format!("Failed to parse {}", what))
    }
}

async fn check_status(response: Response, what: &str) -> Result<Response> {
    let status = response.status();
    if !status.is_success() {
        let error_text = response.text().await.unwrap_or_default();
        anyhow::bail!("Backend error loading {} ({}): {}", what, status, error_text);
    }
    Ok(response)
}

impl InboxProvider for RestClient {
    async fn list_inbox_emails(&self, user_id: &str) -> Result<Vec<EmailSummary>> {
        let mut url = self.endpoint(&["users", user_id, "emails"])?;
        url.query_pairs_mut().append_pair("folder", "inbox");
        self.get_json(url, "inbox").await
    }

    async fn get_all_analyses(&self, user_id: &str) -> Result<HashMap<String, Analysis>> {
        let url = self.endpoint(&["users", user_id, "analyses"])?;
        self.get_json(url, "analyses").await
    }
}

impl MailSender for RestClient {
    async fn send_email(&self, reply: &OutgoingReply) -> Result<()> {
        let url = self.endpoint(&["accounts", &reply.account_id, "send"])?;
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.token)
            .json(reply)
            .send()
            .await
            .context("Failed to send email")?;

        check_status(response, "send").await?;
        tracing::info!("Email sent to {}", reply.to);
        Ok(())
    }
}
