//! The incident handle and its operation builders.
//!
//! Every mutating operation validates its arguments, shapes the JSON payload
//! and headers the remote API expects, and dispatches exactly one request
//! through the injected [`Transport`]. Validation failures are returned
//! before anything touches the network.

use std::fmt;
use std::sync::Arc;

use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::instrument;

use crate::error::Error;
use crate::models::{Alert, IncidentRecord, LogEntry, Note, ResponderRequest};
use crate::resources::{Alerts, LogEntries, Notes};
use crate::transport::{RequestEnvelope, Transport};

/// Default base path for incident resources.
const DEFAULT_ENDPOINT: &str = "incidents";

/// Reference type tags used in request payloads.
const USER_REFERENCE: &str = "user_reference";
const ESCALATION_POLICY_REFERENCE: &str = "escalation_policy_reference";
const INCIDENT_REFERENCE: &str = "incident_reference";

/// A typed reference to a remote resource, as the API spells them.
#[derive(Serialize)]
struct Reference<'a> {
    id: &'a str,
    #[serde(rename = "type")]
    kind: &'a str,
}

/// A source incident for [`Incident::merge`].
///
/// The remote accepts either a raw incident id or an entity exposing one;
/// both normalize to the id string at conversion time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceIncident(String);

impl SourceIncident {
    /// The normalized incident id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SourceIncident {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for SourceIncident {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&Incident> for SourceIncident {
    fn from(incident: &Incident) -> Self {
        Self(incident.id.clone())
    }
}

/// Query options for [`Incident::log_entries`].
#[derive(Debug, Clone)]
pub struct LogEntryQuery {
    /// Time zone for timestamps in the response.
    pub time_zone: String,
    /// Restrict the listing to overview (high-level) entries.
    pub is_overview: bool,
    /// Related records to include inline.
    pub include: Vec<String>,
    /// Walk pagination to the end instead of returning the first page.
    pub fetch_all: bool,
}

impl Default for LogEntryQuery {
    fn default() -> Self {
        Self {
            time_zone: "UTC".to_string(),
            is_overview: false,
            include: Vec::new(),
            fetch_all: true,
        }
    }
}

/// Handle for one remote incident.
///
/// Thin and ephemeral: it holds the incident id, the base endpoint, and the
/// shared transport. It caches no server state; the mutating operations
/// return the server's own [`IncidentRecord`] snapshot instead.
#[derive(Clone)]
pub struct Incident {
    id: String,
    endpoint: String,
    transport: Arc<dyn Transport>,
}

impl fmt::Debug for Incident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Incident")
            .field("id", &self.id)
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl Incident {
    /// Create a handle for the incident with the given id.
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, id: impl Into<String>) -> Self {
        Self::with_endpoint(transport, DEFAULT_ENDPOINT, id)
    }

    /// Create a handle rooted at a non-default base endpoint.
    #[must_use]
    pub fn with_endpoint(
        transport: Arc<dyn Transport>,
        endpoint: impl Into<String>,
        id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            endpoint: endpoint.into(),
            transport,
        }
    }

    /// The remote-assigned incident id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The base path this handle operates under.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Resolve the incident, attributed to `from_email`.
    ///
    /// `resolution` is free-text context recorded with the status change. On
    /// the wire it sits beside the `incident` object, not inside it; the
    /// remote rejects the nested form.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingFromEmail`] if `from_email` is absent or
    /// blank; transport errors pass through unchanged.
    #[instrument(skip_all, fields(incident_id = %self.id))]
    pub async fn resolve(
        &self,
        from_email: Option<&str>,
        resolution: Option<&str>,
    ) -> Result<IncidentRecord, Error> {
        let from_email = require_from_email(from_email)?;

        let payload = StatusPayload {
            incident: StatusBody {
                kind: "incident",
                status: "resolved",
            },
            resolution,
        };

        self.mutate(Method::PUT, None, from_email, serde_json::to_value(payload)?)
            .await
    }

    /// Acknowledge the incident, attributed to `from_email`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingFromEmail`] if `from_email` is absent or
    /// blank; transport errors pass through unchanged.
    #[instrument(skip_all, fields(incident_id = %self.id))]
    pub async fn acknowledge(&self, from_email: Option<&str>) -> Result<IncidentRecord, Error> {
        let from_email = require_from_email(from_email)?;

        let payload = StatusPayload {
            incident: StatusBody {
                kind: "incident",
                status: "acknowledged",
            },
            resolution: None,
        };

        self.mutate(Method::PUT, None, from_email, serde_json::to_value(payload)?)
            .await
    }

    /// Reassign the incident to the given users.
    ///
    /// An empty list is accepted and clears the assignments server-side.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingFromEmail`] if `from_email` is absent or
    /// blank, [`Error::InvalidArguments`] if any id is blank; transport
    /// errors pass through unchanged.
    #[instrument(skip_all, fields(incident_id = %self.id, user_count = user_ids.len()))]
    pub async fn reassign(
        &self,
        from_email: Option<&str>,
        user_ids: &[String],
    ) -> Result<IncidentRecord, Error> {
        let from_email = require_from_email(from_email)?;
        require_ids(user_ids)?;

        #[derive(Serialize)]
        struct Assignment<'a> {
            assignee: Reference<'a>,
        }

        #[derive(Serialize)]
        struct Body<'a> {
            #[serde(rename = "type")]
            kind: &'a str,
            assignments: Vec<Assignment<'a>>,
        }

        #[derive(Serialize)]
        struct Payload<'a> {
            incident: Body<'a>,
        }

        let assignments = user_ids
            .iter()
            .map(|id| Assignment {
                assignee: Reference {
                    id,
                    kind: USER_REFERENCE,
                },
            })
            .collect();

        let payload = Payload {
            incident: Body {
                kind: "incident",
                assignments,
            },
        };

        self.mutate(Method::PUT, None, from_email, serde_json::to_value(payload)?)
            .await
    }

    /// Ask additional users or escalation policies to join the incident.
    ///
    /// At least one of `user_ids` / `escalation_policy_ids` must be
    /// non-empty. User targets precede escalation-policy targets in the
    /// request.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingFromEmail`] if `from_email` is absent or
    /// blank, [`Error::InvalidArguments`] if no target is supplied or any id
    /// is blank; transport errors pass through unchanged.
    #[instrument(skip_all, fields(incident_id = %self.id))]
    pub async fn add_responders(
        &self,
        from_email: Option<&str>,
        requester_id: &str,
        message: &str,
        user_ids: Option<&[String]>,
        escalation_policy_ids: Option<&[String]>,
    ) -> Result<ResponderRequest, Error> {
        let from_email = require_from_email(from_email)?;

        let users = user_ids.unwrap_or_default();
        let policies = escalation_policy_ids.unwrap_or_default();
        if users.is_empty() && policies.is_empty() {
            return Err(Error::InvalidArguments(
                "need at least one target to be supplied".to_string(),
            ));
        }
        require_ids(users)?;
        require_ids(policies)?;

        #[derive(Serialize)]
        struct Target<'a> {
            responder_request_target: Reference<'a>,
        }

        #[derive(Serialize)]
        struct Payload<'a> {
            requester_id: &'a str,
            message: &'a str,
            responder_request_targets: Vec<Target<'a>>,
        }

        #[derive(Deserialize)]
        struct Response {
            responder_request: ResponderRequest,
        }

        let targets = users
            .iter()
            .map(|id| Target {
                responder_request_target: Reference {
                    id,
                    kind: USER_REFERENCE,
                },
            })
            .chain(policies.iter().map(|id| Target {
                responder_request_target: Reference {
                    id,
                    kind: ESCALATION_POLICY_REFERENCE,
                },
            }))
            .collect();

        let payload = Payload {
            requester_id,
            message,
            responder_request_targets: targets,
        };

        let envelope = RequestEnvelope::new(
            Method::POST,
            self.item_endpoint(Some("responder_requests")),
        )
        .from_header(from_email)
        .with_body(serde_json::to_value(payload)?);

        let result = self.transport.request(envelope).await?;
        let response: Response = serde_json::from_value(result)?;
        Ok(response.responder_request)
    }

    /// Move the incident to another escalation policy.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingFromEmail`] if `from_email` is absent or
    /// blank, [`Error::InvalidArguments`] if the policy id is blank;
    /// transport errors pass through unchanged.
    #[instrument(skip_all, fields(incident_id = %self.id))]
    pub async fn reassign_escalation_policy(
        &self,
        from_email: Option<&str>,
        escalation_policy_id: &str,
    ) -> Result<IncidentRecord, Error> {
        let from_email = require_from_email(from_email)?;
        let escalation_policy_id = require_value("escalation_policy_id", escalation_policy_id)?;

        #[derive(Serialize)]
        struct Body<'a> {
            #[serde(rename = "type")]
            kind: &'a str,
            escalation_policy: Reference<'a>,
        }

        #[derive(Serialize)]
        struct Payload<'a> {
            incident: Body<'a>,
        }

        let payload = Payload {
            incident: Body {
                kind: "incident",
                escalation_policy: Reference {
                    id: escalation_policy_id,
                    kind: ESCALATION_POLICY_REFERENCE,
                },
            },
        };

        self.mutate(Method::PUT, None, from_email, serde_json::to_value(payload)?)
            .await
    }

    /// Rename the incident.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingFromEmail`] if `from_email` is absent or
    /// blank, [`Error::InvalidArguments`] if the title is blank; transport
    /// errors pass through unchanged.
    #[instrument(skip_all, fields(incident_id = %self.id))]
    pub async fn rename(
        &self,
        from_email: Option<&str>,
        title: &str,
    ) -> Result<IncidentRecord, Error> {
        let from_email = require_from_email(from_email)?;
        let title = require_value("title", title)?;

        #[derive(Serialize)]
        struct Body<'a> {
            #[serde(rename = "type")]
            kind: &'a str,
            title: &'a str,
        }

        #[derive(Serialize)]
        struct Payload<'a> {
            incident: Body<'a>,
        }

        let payload = Payload {
            incident: Body {
                kind: "incident",
                title,
            },
        };

        self.mutate(Method::PUT, None, from_email, serde_json::to_value(payload)?)
            .await
    }

    /// Snooze the incident for `duration` seconds.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingFromEmail`] if `from_email` is absent or
    /// blank; transport errors pass through unchanged.
    #[instrument(skip_all, fields(incident_id = %self.id, duration))]
    pub async fn snooze(
        &self,
        from_email: Option<&str>,
        duration: u64,
    ) -> Result<IncidentRecord, Error> {
        let from_email = require_from_email(from_email)?;

        #[derive(Serialize)]
        struct Payload {
            duration: u64,
        }

        self.mutate(
            Method::POST,
            Some("snooze"),
            from_email,
            serde_json::to_value(Payload { duration })?,
        )
        .await
    }

    /// Merge the given source incidents into this one.
    ///
    /// Sources convert from raw ids or other handles; output order follows
    /// input order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingFromEmail`] if `from_email` is absent or
    /// blank; transport errors pass through unchanged.
    #[instrument(skip_all, fields(incident_id = %self.id, source_count = source_incidents.len()))]
    pub async fn merge(
        &self,
        from_email: Option<&str>,
        source_incidents: &[SourceIncident],
    ) -> Result<IncidentRecord, Error> {
        let from_email = require_from_email(from_email)?;

        #[derive(Serialize)]
        struct Payload<'a> {
            source_incidents: Vec<Reference<'a>>,
        }

        let references = source_incidents
            .iter()
            .map(|source| Reference {
                id: source.id(),
                kind: INCIDENT_REFERENCE,
            })
            .collect();

        self.mutate(
            Method::PUT,
            Some("merge"),
            from_email,
            serde_json::to_value(Payload {
                source_incidents: references,
            })?,
        )
        .await
    }

    /// Attach a note to the incident.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingFromEmail`] if `from_email` is absent or
    /// blank; transport errors pass through unchanged.
    #[instrument(skip_all, fields(incident_id = %self.id))]
    pub async fn create_note(
        &self,
        from_email: Option<&str>,
        content: &str,
    ) -> Result<Note, Error> {
        let from_email = require_from_email(from_email)?;
        self.notes_collection().create(from_email, content).await
    }

    /// Query log entries recorded against this incident.
    ///
    /// # Errors
    ///
    /// Returns transport errors unchanged.
    #[instrument(skip_all, fields(incident_id = %self.id))]
    pub async fn log_entries(&self, query: LogEntryQuery) -> Result<Vec<LogEntry>, Error> {
        // The remote expects query-string booleans as JSON literals.
        let mut params = vec![
            ("time_zone".to_string(), query.time_zone.clone()),
            ("is_overview".to_string(), query.is_overview.to_string()),
        ];
        for include in &query.include {
            params.push(("include".to_string(), include.clone()));
        }

        LogEntries::new(
            Arc::clone(&self.transport),
            self.item_endpoint(Some("log_entries")),
        )
        .find(params, query.fetch_all)
        .await
    }

    /// Query notes attached to this incident.
    ///
    /// # Errors
    ///
    /// Returns transport errors unchanged.
    #[instrument(skip_all, fields(incident_id = %self.id))]
    pub async fn notes(&self) -> Result<Vec<Note>, Error> {
        self.notes_collection().find().await
    }

    /// Query alerts attached to this incident.
    ///
    /// # Errors
    ///
    /// Returns transport errors unchanged.
    #[instrument(skip_all, fields(incident_id = %self.id))]
    pub async fn alerts(&self) -> Result<Vec<Alert>, Error> {
        Alerts::new(
            Arc::clone(&self.transport),
            self.item_endpoint(Some("alerts")),
        )
        .find()
        .await
    }

    /// Generic update is not supported on incidents.
    ///
    /// The remote API requires the specialized operations (`resolve`,
    /// `reassign`, `rename`, ...) instead of a generic field update.
    ///
    /// # Errors
    ///
    /// Always returns [`Error::UnsupportedOperation`].
    pub fn update(&self) -> Result<IncidentRecord, Error> {
        Err(Error::UnsupportedOperation("update"))
    }

    fn notes_collection(&self) -> Notes {
        Notes::new(
            Arc::clone(&self.transport),
            self.item_endpoint(Some("notes")),
        )
    }

    /// Endpoint for this incident, with an optional sub-resource suffix.
    fn item_endpoint(&self, suffix: Option<&str>) -> String {
        match suffix {
            Some(suffix) => format!("{}/{}/{}", self.endpoint, self.id, suffix),
            None => format!("{}/{}", self.endpoint, self.id),
        }
    }

    /// Dispatch a mutating request and decode the `incident` envelope key.
    async fn mutate(
        &self,
        method: Method,
        suffix: Option<&str>,
        from_email: &str,
        body: Value,
    ) -> Result<IncidentRecord, Error> {
        #[derive(Deserialize)]
        struct Response {
            incident: IncidentRecord,
        }

        let envelope = RequestEnvelope::new(method, self.item_endpoint(suffix))
            .from_header(from_email)
            .with_body(body);

        let result = self.transport.request(envelope).await?;
        let response: Response = serde_json::from_value(result)?;
        Ok(response.incident)
    }
}

/// Shared body for the status-change operations. `resolution` rides beside
/// the `incident` object, matching the wire shape the remote requires.
#[derive(Serialize)]
struct StatusPayload<'a> {
    incident: StatusBody<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    resolution: Option<&'a str>,
}

#[derive(Serialize)]
struct StatusBody<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    status: &'a str,
}

/// Validate the acting-user email required by every mutating operation.
fn require_from_email(from_email: Option<&str>) -> Result<&str, Error> {
    match from_email {
        Some(email) if !email.trim().is_empty() => Ok(email),
        other => Err(Error::MissingFromEmail(other.map(str::to_string))),
    }
}

/// Validate that every id in a list is non-blank.
fn require_ids(ids: &[String]) -> Result<(), Error> {
    match ids.iter().find(|id| id.trim().is_empty()) {
        Some(bad) => Err(Error::InvalidArguments(format!("blank id in list: {bad:?}"))),
        None => Ok(()),
    }
}

/// Validate a required non-blank scalar argument.
fn require_value<'a>(name: &str, value: &'a str) -> Result<&'a str, Error> {
    if value.trim().is_empty() {
        return Err(Error::InvalidArguments(format!(
            "{name} must be a non-empty string"
        )));
    }
    Ok(value)
}
