//! Notification Channel Trait

use crate::AlertError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A link push: title, target URL and a text body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkPush {
    pub title: String,
    pub url: String,
    pub body: String,
}

/// What the channel reported back for an accepted push
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Delivery {
    /// Identity the push was delivered to, when the channel names one
    pub receiver: Option<String>,
}

/// Outbound notification channel
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send one link push. No retries.
    async fn push_link(&self, push: &LinkPush) -> Result<Delivery, AlertError>;

    /// Channel name used in logs
    fn name(&self) -> &str;
}
