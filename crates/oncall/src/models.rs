//! Response models decoded from the remote API.
//!
//! Fields beyond the id are optional: the remote representation varies by
//! account features and API evolution, and unknown fields are ignored.

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// A server-side snapshot of an incident.
///
/// Returned by the mutating operations; distinct from the
/// [`Incident`](crate::Incident) handle, which caches no server state.
#[derive(Debug, Clone, Deserialize)]
pub struct IncidentRecord {
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub incident_number: Option<u64>,
    #[serde(default)]
    pub urgency: Option<String>,
    #[serde(default)]
    pub html_url: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// An immutable audit record of an action taken on an incident.
#[derive(Debug, Clone, Deserialize)]
pub struct LogEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// A note attached to an incident.
#[derive(Debug, Clone, Deserialize)]
pub struct Note {
    pub id: String,
    pub content: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub user: Option<UserRef>,
}

/// An alert grouped under an incident.
#[derive(Debug, Clone, Deserialize)]
pub struct Alert {
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Acknowledgement of a responder request.
#[derive(Debug, Clone, Deserialize)]
pub struct ResponderRequest {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub requested_at: Option<DateTime<Utc>>,
}

/// Reference to a user embedded in other records.
#[derive(Debug, Clone, Deserialize)]
pub struct UserRef {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub summary: Option<String>,
}
