//! Alert Dispatcher

use crate::message::format_message;
use crate::notifier::{LinkPush, Notifier};
use crate::AlertError;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde_json::{Map, Value};
use tracing::debug;

/// Prefix of every alert title
pub const ALERT_TITLE_PREFIX: &str = "SPLaSCH ALERT: ";

/// Characters left as-is in the default search link query
const QUERY_SAFE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b'/');

/// Turns result rows into link pushes on a notification channel
pub struct AlertDispatcher<N> {
    notifier: N,
    /// Web UI base URL drilldown paths are appended to
    link_base: String,
}

impl<N: Notifier> AlertDispatcher<N> {
    pub fn new(notifier: N, link_base: impl Into<String>) -> Self {
        Self {
            notifier,
            link_base: link_base.into(),
        }
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    /// Link for an alert: `path` under the base URL, or a search re-running `title`
    pub fn drilldown_link(&self, title: &str, path: Option<&str>) -> String {
        match path.filter(|p| !p.is_empty()) {
            Some(path) => format!("{}{}", self.link_base, path),
            None => format!(
                "{}/app/search/search?q={}",
                self.link_base,
                utf8_percent_encode(&format!("|savedsearch \"{}\"", title), QUERY_SAFE)
            ),
        }
    }

    /// Send one alert for `row` and return the receiver it was delivered to
    pub async fn dispatch(
        &self,
        title: &str,
        row: &Map<String, Value>,
        drilldown_path: Option<&str>,
        requested_fields: Option<&str>,
    ) -> Result<String, AlertError> {
        let push = LinkPush {
            title: format!("{}{}", ALERT_TITLE_PREFIX, title),
            url: self.drilldown_link(title, drilldown_path),
            body: format_message(row, requested_fields),
        };

        debug!("Sending '{}' via {}", push.title, self.notifier.name());
        let delivery = self.notifier.push_link(&push).await?;
        delivery.receiver.ok_or(AlertError::NoReceiver)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifier::Delivery;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    /// Records pushes and answers with a fixed receiver
    struct Recorder {
        receiver: Option<String>,
        pushes: Mutex<Vec<LinkPush>>,
    }

    impl Recorder {
        fn new(receiver: Option<&str>) -> Self {
            Self {
                receiver: receiver.map(str::to_string),
                pushes: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Notifier for Recorder {
        async fn push_link(&self, push: &LinkPush) -> Result<Delivery, AlertError> {
            self.pushes.lock().unwrap().push(push.clone());
            Ok(Delivery {
                receiver: self.receiver.clone(),
            })
        }

        fn name(&self) -> &str {
            "recorder"
        }
    }

    fn row(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_drilldown_with_path() {
        let dispatcher = AlertDispatcher::new(Recorder::new(None), "https://splunk:8000");
        assert_eq!(
            dispatcher.drilldown_link("r", Some("/app/search/search?sid=42")),
            "https://splunk:8000/app/search/search?sid=42"
        );
    }

    #[test]
    fn test_default_drilldown_reruns_search() {
        let dispatcher = AlertDispatcher::new(Recorder::new(None), "https://splunk:8000");
        assert_eq!(
            dispatcher.drilldown_link("ssh brute force", None),
            "https://splunk:8000/app/search/search?q=%7Csavedsearch%20%22ssh%20brute%20force%22"
        );
    }

    #[tokio::test]
    async fn test_dispatch_sends_one_push() {
        let dispatcher = AlertDispatcher::new(Recorder::new(Some("ops@example.com")), "https://s");
        let event = row(json!({ "_time": "t0", "host": "x", "_cd": "1:2" }));

        let receiver = dispatcher
            .dispatch("R1", &event, Some("/app/search/search?sid=1"), None)
            .await
            .unwrap();
        assert_eq!(receiver, "ops@example.com");

        let pushes = dispatcher.notifier().pushes.lock().unwrap();
        assert_eq!(pushes.len(), 1);
        assert_eq!(pushes[0].title, "SPLaSCH ALERT: R1");
        assert_eq!(pushes[0].url, "https://s/app/search/search?sid=1");
        assert_eq!(pushes[0].body, "*_time: t0\n*host: x");
    }

    #[tokio::test]
    async fn test_dispatch_without_receiver_fails() {
        let dispatcher = AlertDispatcher::new(Recorder::new(None), "https://s");
        let err = dispatcher
            .dispatch("R1", &row(json!({ "a": 1 })), None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AlertError::NoReceiver));
    }
}
