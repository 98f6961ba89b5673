//! WhatsApp Cloud API client.
//!
//! The only network boundary in the system: one `POST .../{phone_id}/messages`
//! per dispatched contact, plus a credential check used by `followup verify`.
//! A 200 is success; anything else is a failure carrying the provider's
//! `error.message` text, which the dispatch loop inspects to distinguish
//! authentication failures from ordinary per-item errors.

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::time::Duration;

use crate::config::WhatsappConfig;

/// Versioned Graph API root.
pub const GRAPH_API_BASE: &str = "https://graph.facebook.com/v17.0";

/// Outcome of a single send attempt that did not succeed.
#[derive(Debug)]
pub enum SendError {
    /// The provider rejected the message; carries `error.message` from the
    /// response body (or "unknown error" when absent).
    Provider(String),
    /// The request never produced a provider response.
    Network(String),
}

impl std::fmt::Display for SendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SendError::Provider(msg) => write!(f, "{}", msg),
            SendError::Network(msg) => write!(f, "network error: {}", msg),
        }
    }
}

impl std::error::Error for SendError {}

/// Sends one text message to one phone number. The production implementation
/// is [`WhatsappClient`]; tests substitute scripted senders.
#[async_trait]
pub trait MessageSender: Send + Sync {
    async fn send_text(&self, to: &str, body: &str) -> Result<(), SendError>;
}

pub struct WhatsappClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
    phone_id: String,
}

impl WhatsappClient {
    pub fn new(config: &WhatsappConfig) -> Result<Self> {
        if config.token.is_empty() || config.phone_id.is_empty() {
            bail!("WhatsApp credentials missing: set whatsapp.token and whatsapp.phone_id");
        }
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build HTTP client: {}", e))?;
        Ok(Self {
            http,
            base_url: GRAPH_API_BASE.to_string(),
            token: config.token.clone(),
            phone_id: config.phone_id.clone(),
        })
    }

    /// `followup verify`: fetches the phone-number resource to prove the
    /// token and phone id are usable before any real send.
    pub async fn verify_credentials(&self) -> Result<PhoneInfo> {
        let url = format!("{}/{}", self.base_url, self.phone_id);
        let resp = self
            .http
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("connection failed: {}", e))?;

        let status = resp.status();
        let json: serde_json::Value = resp.json().await.unwrap_or(serde_json::Value::Null);
        if status != reqwest::StatusCode::OK {
            bail!("credential check failed: {}", provider_error_message(&json));
        }
        Ok(PhoneInfo {
            display_phone_number: json
                .get("display_phone_number")
                .and_then(|v| v.as_str())
                .map(|s| s.to_string()),
            verified_name: json
                .get("verified_name")
                .and_then(|v| v.as_str())
                .map(|s| s.to_string()),
        })
    }
}

/// Details returned by a successful credential check.
#[derive(Debug)]
pub struct PhoneInfo {
    pub display_phone_number: Option<String>,
    pub verified_name: Option<String>,
}

#[async_trait]
impl MessageSender for WhatsappClient {
    async fn send_text(&self, to: &str, body: &str) -> Result<(), SendError> {
        let url = format!("{}/{}/messages", self.base_url, self.phone_id);
        let payload = serde_json::json!({
            "messaging_product": "whatsapp",
            "to": to,
            "type": "text",
            "text": { "body": body },
        });

        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.token)
            .json(&payload)
            .send()
            .await
            .map_err(|e| SendError::Network(e.to_string()))?;

        if resp.status() == reqwest::StatusCode::OK {
            return Ok(());
        }
        let json: serde_json::Value = resp.json().await.unwrap_or(serde_json::Value::Null);
        Err(SendError::Provider(provider_error_message(&json)))
    }
}

/// Pulls `error.message` out of a provider error body, with a generic
/// fallback when the shape is unexpected.
pub fn provider_error_message(json: &serde_json::Value) -> String {
    json.get("error")
        .and_then(|e| e.get("message"))
        .and_then(|m| m.as_str())
        .unwrap_or("unknown error")
        .to_string()
}

/// `followup verify` entry point.
pub async fn run_verify(config: &WhatsappConfig) -> Result<()> {
    let client = WhatsappClient::new(config)?;
    let info = client.verify_credentials().await?;
    println!("verify");
    println!(
        "  phone: {}",
        info.display_phone_number.as_deref().unwrap_or("n/a")
    );
    println!("  name: {}", info.verified_name.as_deref().unwrap_or("n/a"));
    println!("ok");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_message_extracted_from_nested_error() {
        let json = serde_json::json!({
            "error": { "message": "Invalid OAuth access token.", "code": 190 }
        });
        assert_eq!(
            provider_error_message(&json),
            "Invalid OAuth access token."
        );
    }

    #[test]
    fn missing_error_shape_falls_back_to_unknown() {
        assert_eq!(
            provider_error_message(&serde_json::Value::Null),
            "unknown error"
        );
        assert_eq!(
            provider_error_message(&serde_json::json!({"error": {}})),
            "unknown error"
        );
        assert_eq!(
            provider_error_message(&serde_json::json!({"detail": "nope"})),
            "unknown error"
        );
    }

    #[test]
    fn client_requires_credentials() {
        let config = WhatsappConfig {
            token: String::new(),
            phone_id: String::new(),
            country_code: "57".to_string(),
        };
        assert!(WhatsappClient::new(&config).is_err());
    }
}
