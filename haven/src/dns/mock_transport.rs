use super::{DohTransport, TransportFuture, TransportResponse};
use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;
use url::Url;

const NXDOMAIN: &str = r#"{"Status":3}"#;

/// Serves canned bodies keyed by `name/type` and records every query.
/// Unknown names answer NXDOMAIN.
#[derive(Default)]
pub(crate) struct MockTransport {
    bodies: HashMap<String, (u16, String)>,
    queries: Mutex<Vec<String>>,
    delay: Option<Duration>,
}

impl MockTransport {
    pub(crate) fn with(mut self, name: &str, record_type: &str, status: u16, body: &str) -> Self {
        self.bodies.insert(
            format!("{}/{}", name, record_type),
            (status, body.to_string()),
        );
        self
    }

    pub(crate) fn with_answers(self, name: &str, record_type: &str, answers: &[(u16, &str)]) -> Self {
        let answers = answers
            .iter()
            .map(|(code, data)| {
                serde_json::json!({ "name": format!("{}.", name), "type": code, "TTL": 60, "data": data })
            })
            .collect::<Vec<_>>();
        let body = serde_json::json!({ "Status": 0, "Answer": answers }).to_string();
        self.with(name, record_type, 200, &body)
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub(crate) fn queries(&self) -> Vec<String> {
        self.queries.lock().clone()
    }
}

impl DohTransport for MockTransport {
    fn get(&self, url: Url) -> TransportFuture<'_> {
        Box::pin(async move {
            let params: HashMap<String, String> = url.query_pairs().into_owned().collect();
            let key = format!(
                "{}/{}",
                params.get("name").cloned().unwrap_or_default(),
                params.get("type").cloned().unwrap_or_default()
            );
            self.queries.lock().push(key.clone());
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            let (status, body) = self
                .bodies
                .get(&key)
                .cloned()
                .unwrap_or((200, NXDOMAIN.to_string()));
            Ok(TransportResponse {
                status,
                body: Bytes::from(body),
            })
        })
    }
}
