//! Messaging provider client (Twilio REST API)

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{error, info};

use super::{MessageSender, OutboundMessage};
use crate::config::MessagingConfig;
use crate::error::AlertError;

/// Error document returned by the provider on a rejected request
#[derive(Debug, Deserialize)]
struct ProviderError {
    message: String,
    #[serde(default)]
    code: Option<i64>,
}

/// Sends messages through the Twilio Messages resource
#[derive(Clone)]
pub struct TwilioSender {
    client: reqwest::Client,
    config: MessagingConfig,
}

impl TwilioSender {
    pub fn new(client: reqwest::Client, config: MessagingConfig) -> Self {
        Self { client, config }
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.config.api_base.trim_end_matches('/'),
            self.config.account_sid
        )
    }
}

#[async_trait]
impl MessageSender for TwilioSender {
    async fn send(&self, message: &OutboundMessage) -> Result<(), AlertError> {
        if !self.config.is_configured() {
            return Err(AlertError::Dispatch(
                "messaging credentials are not configured".to_string(),
            ));
        }

        let to = message
            .to
            .as_deref()
            .map(str::trim)
            .filter(|to| !to.is_empty())
            .unwrap_or(&self.config.to_number);
        if to.is_empty() {
            return Err(AlertError::Dispatch(
                "no recipient number configured".to_string(),
            ));
        }

        let mut form = vec![
            ("Body", message.body.as_str()),
            ("From", self.config.from_number.as_str()),
            ("To", to),
        ];
        if let Some(media_url) = &message.media_url {
            form.push(("MediaUrl", media_url.as_str()));
        }

        let response = self
            .client
            .post(self.messages_url())
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(&form)
            .send()
            .await
            .map_err(|e| {
                error!("Messaging provider unreachable: {}", e);
                AlertError::Dispatch(e.to_string())
            })?;

        let status = response.status();
        if status.is_success() {
            info!("Message accepted by provider for {}", to);
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        let detail = match serde_json::from_str::<ProviderError>(&body) {
            Ok(ProviderError {
                message,
                code: Some(code),
            }) => format!("{message} (code {code})"),
            Ok(ProviderError { message, .. }) => message,
            Err(_) => format!("provider answered {status}"),
        };

        error!("Messaging provider rejected message: {}", detail);
        Err(AlertError::Dispatch(detail))
    }
}
