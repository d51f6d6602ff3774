//! Pushbullet Notification Channel

use crate::notifier::{Delivery, LinkPush, Notifier};
use crate::AlertError;
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::info;

const DEFAULT_TIMEOUT_MS: u64 = 10_000;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PushbulletConfig {
    pub api_key: String,
    pub base_url: String,
}

impl Default for PushbulletConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.pushbullet.com".to_string(),
        }
    }
}

/// Pushbullet REST API channel
pub struct PushbulletNotifier {
    http: Client,
    config: PushbulletConfig,
}

impl PushbulletNotifier {
    /// Build the client and check the access token against `/v2/users/me`
    pub async fn connect(config: PushbulletConfig) -> Result<Self, AlertError> {
        let http = Client::builder()
            .timeout(Duration::from_millis(DEFAULT_TIMEOUT_MS))
            .build()
            .map_err(|e| AlertError::Connection(e.to_string()))?;

        let notifier = Self { http, config };
        let me = notifier
            .http
            .get(notifier.url("/v2/users/me"))
            .header("Access-Token", &notifier.config.api_key)
            .send()
            .await?;
        let me = checked_json(me).await?;

        let email = account_email(&me);
        info!("Connected to Pushbullet as {}", email);
        Ok(notifier)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }
}

#[async_trait]
impl Notifier for PushbulletNotifier {
    async fn push_link(&self, push: &LinkPush) -> Result<Delivery, AlertError> {
        let response = self
            .http
            .post(self.url("/v2/pushes"))
            .header("Access-Token", &self.config.api_key)
            .json(&push_body(push))
            .send()
            .await?;
        let body = checked_json(response).await?;
        Ok(parse_delivery(&body))
    }

    fn name(&self) -> &str {
        "pushbullet"
    }
}

async fn checked_json(response: Response) -> Result<Value, AlertError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(AlertError::Rejected {
            status: status.as_u16(),
            body,
        });
    }
    Ok(response.json().await?)
}

fn push_body(push: &LinkPush) -> Value {
    json!({
        "type": "link",
        "title": push.title,
        "body": push.body,
        "url": push.url,
    })
}

fn account_email(me: &Value) -> &str {
    me.get("email")
        .and_then(Value::as_str)
        .unwrap_or("unknown user")
}

fn parse_delivery(body: &Value) -> Delivery {
    Delivery {
        receiver: body
            .get("receiver_email")
            .and_then(Value::as_str)
            .filter(|r| !r.is_empty())
            .map(str::to_string),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_body_shape() {
        let push = LinkPush {
            title: "SPLaSCH ALERT: r".into(),
            url: "https://splunk/app/search".into(),
            body: "*host: x".into(),
        };

        let body = push_body(&push);
        assert_eq!(body["type"], "link");
        assert_eq!(body["title"], "SPLaSCH ALERT: r");
        assert_eq!(body["url"], "https://splunk/app/search");
        assert_eq!(body["body"], "*host: x");
    }

    #[test]
    fn test_parse_delivery() {
        let accepted = json!({ "iden": "ujpah72o0", "receiver_email": "ops@example.com" });
        assert_eq!(
            parse_delivery(&accepted).receiver.as_deref(),
            Some("ops@example.com")
        );

        assert_eq!(parse_delivery(&json!({ "iden": "x" })), Delivery::default());
        assert_eq!(
            parse_delivery(&json!({ "receiver_email": "" })),
            Delivery::default()
        );
    }

    #[test]
    fn test_account_email() {
        let me = json!({ "iden": "ujpah72o0", "email": "ops@example.com" });
        assert_eq!(account_email(&me), "ops@example.com");
        assert_eq!(account_email(&json!({ "iden": "x" })), "unknown user");
    }

    #[test]
    fn test_default_base_url() {
        assert_eq!(
            PushbulletConfig::default().base_url,
            "https://api.pushbullet.com"
        );
    }
}
