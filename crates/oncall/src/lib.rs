//! Client bindings for an incident-management REST API.
//!
//! This crate shapes incident operations (resolve, acknowledge, reassign,
//! merge, snooze, ...) into the exact JSON payloads and headers the remote
//! API expects and dispatches them through a shared, already-authenticated
//! transport. Arguments are validated before anything touches the network.
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use oncall::{HttpTransport, Incident};
//!
//! # async fn run() -> Result<(), oncall::Error> {
//! // Build the transport from ONCALL_API_KEY / ONCALL_API_URL
//! let transport = Arc::new(HttpTransport::from_env()?);
//!
//! let incident = Incident::new(transport, "PIJ90N7");
//! incident.acknowledge(Some("ops@example.com")).await?;
//! incident
//!     .resolve(Some("ops@example.com"), Some("failed over to the replica"))
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration
//!
//! [`HttpTransport::from_env`] reads:
//!
//! - `ONCALL_API_KEY`: API token (required)
//! - `ONCALL_API_URL`: base URL override (optional)
//!
//! # Architecture
//!
//! The crate is a pure request-shaping layer over one injected capability:
//!
//! - [`Transport`] is the seam between the operation builders and the wire;
//!   [`HttpTransport`] is the `reqwest`-backed implementation
//! - [`Incident`] is a thin handle (id + endpoint + transport) whose methods
//!   build one [`RequestEnvelope`] each
//! - [`LogEntries`], [`Notes`], and [`Alerts`] are sub-resource collections
//!   sharing the same transport
//!
//! There are no retries, no caching, and no local state: resilience belongs
//! to the transport, ordering to the remote API.

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod incident;
pub mod models;
pub mod resources;
pub mod transport;

#[cfg(test)]
pub(crate) mod test_support;

pub use error::Error;
pub use incident::{Incident, LogEntryQuery, SourceIncident};
pub use models::{Alert, IncidentRecord, LogEntry, Note, ResponderRequest, UserRef};
pub use resources::{Alerts, LogEntries, Notes};
pub use transport::{HttpTransport, RequestEnvelope, Transport};
