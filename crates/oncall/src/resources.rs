//! Sub-resource collections scoped to a single incident.
//!
//! Each collection client holds the shared transport and a fully-joined
//! endpoint (`incidents/<id>/<suffix>`). Listings use the remote's classic
//! offset pagination: the response carries the keyed array plus `more`,
//! `offset`, and `limit`.

use std::sync::Arc;

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::Error;
use crate::models::{Alert, LogEntry, Note};
use crate::transport::{RequestEnvelope, Transport};

/// Fetch a keyed listing, optionally walking pagination to the end.
///
/// With `fetch_all` unset only the first page is requested. Pages are
/// concatenated in response order. A page without the resource key ends the
/// walk.
async fn find_all<T: DeserializeOwned>(
    transport: &dyn Transport,
    endpoint: &str,
    resource_key: &str,
    query: &[(String, String)],
    fetch_all: bool,
) -> Result<Vec<T>, Error> {
    let mut items = Vec::new();
    let mut offset: u64 = 0;

    loop {
        let mut page_query = query.to_vec();
        if offset > 0 {
            page_query.push(("offset".to_string(), offset.to_string()));
        }

        let envelope = RequestEnvelope::new(Method::GET, endpoint).with_query(page_query);
        let body = transport.request(envelope).await?;

        let Some(page) = body.get(resource_key).and_then(Value::as_array) else {
            break;
        };
        let fetched = page.len() as u64;
        for entry in page {
            items.push(serde_json::from_value(entry.clone())?);
        }

        let more = body.get("more").and_then(Value::as_bool).unwrap_or(false);
        if !fetch_all || !more || fetched == 0 {
            break;
        }
        offset += body.get("limit").and_then(Value::as_u64).unwrap_or(fetched);
    }

    debug!(resource = resource_key, count = items.len(), "Fetched listing");
    Ok(items)
}

/// Log entries recorded against one incident.
#[derive(Clone)]
pub struct LogEntries {
    transport: Arc<dyn Transport>,
    endpoint: String,
}

impl LogEntries {
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, endpoint: impl Into<String>) -> Self {
        Self {
            transport,
            endpoint: endpoint.into(),
        }
    }

    /// List log entries matching the given query parameters.
    ///
    /// # Errors
    ///
    /// Returns transport errors unchanged.
    pub async fn find(
        &self,
        query: Vec<(String, String)>,
        fetch_all: bool,
    ) -> Result<Vec<LogEntry>, Error> {
        find_all(
            self.transport.as_ref(),
            &self.endpoint,
            "log_entries",
            &query,
            fetch_all,
        )
        .await
    }
}

/// Notes attached to one incident.
#[derive(Clone)]
pub struct Notes {
    transport: Arc<dyn Transport>,
    endpoint: String,
}

impl Notes {
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, endpoint: impl Into<String>) -> Self {
        Self {
            transport,
            endpoint: endpoint.into(),
        }
    }

    /// List every note on the incident.
    ///
    /// # Errors
    ///
    /// Returns transport errors unchanged.
    pub async fn find(&self) -> Result<Vec<Note>, Error> {
        find_all(self.transport.as_ref(), &self.endpoint, "notes", &[], true).await
    }

    /// Create a note attributed to the (already validated) acting user.
    ///
    /// # Errors
    ///
    /// Returns transport errors unchanged.
    pub async fn create(&self, from_email: &str, content: &str) -> Result<Note, Error> {
        #[derive(Serialize)]
        struct Payload<'a> {
            content: &'a str,
        }

        #[derive(Deserialize)]
        struct Response {
            note: Note,
        }

        let envelope = RequestEnvelope::new(Method::POST, &self.endpoint)
            .from_header(from_email)
            .with_body(serde_json::to_value(Payload { content })?);

        let result = self.transport.request(envelope).await?;
        let response: Response = serde_json::from_value(result)?;
        Ok(response.note)
    }
}

/// Alerts grouped under one incident.
#[derive(Clone)]
pub struct Alerts {
    transport: Arc<dyn Transport>,
    endpoint: String,
}

impl Alerts {
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, endpoint: impl Into<String>) -> Self {
        Self {
            transport,
            endpoint: endpoint.into(),
        }
    }

    /// List every alert on the incident.
    ///
    /// # Errors
    ///
    /// Returns transport errors unchanged.
    pub async fn find(&self) -> Result<Vec<Alert>, Error> {
        find_all(self.transport.as_ref(), &self.endpoint, "alerts", &[], true).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::RecordingTransport;
    use serde_json::json;

    #[tokio::test]
    async fn test_fetch_all_walks_pages_in_order() {
        let transport = Arc::new(RecordingTransport::with_responses(vec![
            json!({
                "log_entries": [{"id": "L1", "type": "trigger_log_entry"}],
                "limit": 1,
                "offset": 0,
                "more": true
            }),
            json!({
                "log_entries": [{"id": "L2", "type": "resolve_log_entry"}],
                "limit": 1,
                "offset": 1,
                "more": false
            }),
        ]));

        let entries = LogEntries::new(transport.clone(), "incidents/P1/log_entries")
            .find(vec![], true)
            .await
            .unwrap();

        let ids: Vec<&str> = entries.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["L1", "L2"]);

        let recorded = transport.recorded();
        assert_eq!(recorded.len(), 2);
        assert!(recorded[0].query.iter().all(|(k, _)| k != "offset"));
        assert!(recorded[1]
            .query
            .contains(&("offset".to_string(), "1".to_string())));
    }

    #[tokio::test]
    async fn test_first_page_only_without_fetch_all() {
        let transport = Arc::new(RecordingTransport::with_responses(vec![json!({
            "log_entries": [{"id": "L1", "type": "trigger_log_entry"}],
            "limit": 1,
            "more": true
        })]));

        let entries = LogEntries::new(transport.clone(), "incidents/P1/log_entries")
            .find(vec![], false)
            .await
            .unwrap();

        assert_eq!(entries.len(), 1);
        assert_eq!(transport.request_count(), 1);
    }

    #[tokio::test]
    async fn test_missing_resource_key_yields_empty_listing() {
        let transport = Arc::new(RecordingTransport::with_responses(vec![json!({})]));

        let notes = Notes::new(transport.clone(), "incidents/P1/notes")
            .find()
            .await
            .unwrap();

        assert!(notes.is_empty());
        assert_eq!(transport.request_count(), 1);
    }

    #[tokio::test]
    async fn test_note_create_envelope() {
        let transport = Arc::new(RecordingTransport::with_responses(vec![json!({
            "note": {"id": "N1", "content": "looking into it"}
        })]));

        let note = Notes::new(transport.clone(), "incidents/P1/notes")
            .create("ops@example.com", "looking into it")
            .await
            .unwrap();
        assert_eq!(note.id, "N1");

        let recorded = transport.recorded();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].method, Method::POST);
        assert_eq!(recorded[0].endpoint, "incidents/P1/notes");
        assert_eq!(
            recorded[0].headers,
            vec![("from".to_string(), "ops@example.com".to_string())]
        );
        assert_eq!(
            recorded[0].body.as_ref().unwrap(),
            &json!({"content": "looking into it"})
        );
    }
}
