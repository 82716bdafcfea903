//! In-memory transport replaying scripted outcomes
//!
//! Used to exercise the executor and lookups without touching the network.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use thunder_core::EgressRoute;

use crate::{Headers, HttpRequest, HttpResponse, Transport, TransportError};

/// One request as seen by the scripted transport
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub url: String,
    pub route: EgressRoute,
    pub headers: Headers,
}

type Outcome = Result<HttpResponse, TransportError>;

/// Transport answering from per-URL queues, then from a fallback
pub struct ScriptedTransport {
    queues: Mutex<HashMap<String, VecDeque<Outcome>>>,
    fallback: Outcome,
    calls: Mutex<Vec<RecordedCall>>,
}

impl Default for ScriptedTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedTransport {
    /// Unscripted URLs fail with a connection error
    pub fn new() -> Self {
        Self {
            queues: Mutex::new(HashMap::new()),
            fallback: Err(TransportError::Connect("unscripted url".to_string())),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Outcome for any URL without a queued answer
    pub fn with_fallback(mut self, outcome: Outcome) -> Self {
        self.fallback = outcome;
        self
    }

    /// Queue an answer for `url`; queued answers are consumed in order
    pub fn push(&self, url: &str, outcome: Outcome) {
        self.queues
            .lock()
            .entry(url.to_string())
            .or_default()
            .push_back(outcome);
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(
        &self,
        request: &HttpRequest,
        route: &EgressRoute,
        _timeout: Duration,
    ) -> Result<HttpResponse, TransportError> {
        self.calls.lock().push(RecordedCall {
            url: request.url.clone(),
            route: route.clone(),
            headers: request.headers.clone(),
        });

        self.queues
            .lock()
            .get_mut(&request.url)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| self.fallback.clone())
    }
}
