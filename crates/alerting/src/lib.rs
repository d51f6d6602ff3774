//! Alerting System
//!
//! Formats search result rows into alert messages and delivers them as link
//! pushes through a [`Notifier`].

mod dispatcher;
mod message;
mod notifier;
mod pushbullet;

pub use dispatcher::{AlertDispatcher, ALERT_TITLE_PREFIX};
pub use message::{format_message, value_text, TIME_FIELD};
pub use notifier::{Delivery, LinkPush, Notifier};
pub use pushbullet::{PushbulletConfig, PushbulletNotifier};

use thiserror::Error;

/// Alert delivery errors
#[derive(Debug, Error)]
pub enum AlertError {
    #[error("Connection error: {0}")]
    Connection(String),
    #[error("Notification rejected with HTTP {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    #[error("Notification accepted without a receiver")]
    NoReceiver,
}

impl From<reqwest::Error> for AlertError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            AlertError::InvalidResponse(err.to_string())
        } else {
            AlertError::Connection(err.to_string())
        }
    }
}
