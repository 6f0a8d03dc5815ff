//! Shared test doubles for the transport seam.

use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::error::Error;
use crate::transport::{RequestEnvelope, Transport};

/// Transport fake that records every envelope and replies from a script.
///
/// When the script is exhausted (or empty) it falls back to a minimal
/// `{"incident": {...}}` body so incident mutations decode.
pub struct RecordingTransport {
    requests: Mutex<Vec<RequestEnvelope>>,
    responses: Mutex<Vec<Value>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::with_responses(Vec::new())
    }

    pub fn with_responses(responses: Vec<Value>) -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            responses: Mutex::new(responses),
        }
    }

    /// Every envelope dispatched so far, in order.
    pub fn recorded(&self) -> Vec<RequestEnvelope> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn request(&self, envelope: RequestEnvelope) -> Result<Value, Error> {
        self.requests.lock().unwrap().push(envelope);

        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            Ok(json!({"incident": {"id": "PABC123", "status": "resolved"}}))
        } else {
            Ok(responses.remove(0))
        }
    }
}
