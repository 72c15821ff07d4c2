//! LINE Messaging API push notifier.

use async_trait::async_trait;
use serde::Serialize;

use crate::error::{AppError, Result};
use crate::models::NotifierConfig;
use crate::notify::Notifier;
use crate::utils::http::create_notify_client;

/// Push request body.
#[derive(Debug, Serialize)]
struct PushRequest<'a> {
    to: &'a str,
    messages: [TextMessage<'a>; 1],
}

#[derive(Debug, Serialize)]
struct TextMessage<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    text: &'a str,
}

impl<'a> PushRequest<'a> {
    fn text(to: &'a str, text: &'a str) -> Self {
        Self {
            to,
            messages: [TextMessage { kind: "text", text }],
        }
    }
}

/// Sends each message as a text push to a single LINE user.
pub struct LineNotifier {
    client: reqwest::Client,
    endpoint: String,
    token: String,
    user_id: String,
}

impl LineNotifier {
    pub fn new(config: &NotifierConfig) -> Result<Self> {
        Ok(Self {
            client: create_notify_client(config)?,
            endpoint: config.line_endpoint.clone(),
            token: config.line_channel_access_token.clone(),
            user_id: config.line_user_id.clone(),
        })
    }
}

#[async_trait]
impl Notifier for LineNotifier {
    fn name(&self) -> &str {
        "line"
    }

    async fn deliver(&self, message: &str) -> Result<bool> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.token)
            .json(&PushRequest::text(&self.user_id, message))
            .send()
            .await
            .map_err(|e| AppError::delivery(self.name(), e))?;

        let status = response.status();
        if status == reqwest::StatusCode::OK {
            log::info!("LINE push sent");
            return Ok(true);
        }

        let body = response.text().await.unwrap_or_default();
        log::warn!("LINE push rejected: {status}: {body}");
        Ok(false)
    }
}
