//! Resilient request executor
//!
//! Each attempt takes a fresh route and a fresh header fingerprint. A
//! transport failure or a detected ban rotates identity first, then sleeps
//! a jittered backoff before the next attempt; bans use the longer window.
//! The first unblocked response wins. Running out of attempts is an
//! expected outcome reported as [`RequestOutcome::Failed`], never an error.

use std::sync::Arc;
use tracing::{debug, info, warn};

use thunder_core::BanVerdict;

use crate::{
    jitter, merge_headers, BanDetector, EgressSource, HeaderGenerator, HttpRequest, HttpResponse,
    RetryPolicy, Transport, TransportError,
};

/// Why one attempt did not produce a usable response
#[derive(Debug, Clone)]
pub enum AttemptFailure {
    Transport(TransportError),
    Blocked { status: u16, verdict: BanVerdict },
}

/// Result of a resilient request
#[derive(Debug, Clone)]
pub enum RequestOutcome {
    /// An unblocked response (any status outside the ban rules)
    Completed(HttpResponse),
    /// Every attempt failed; the caller should treat this as "no data"
    Failed {
        attempts: u32,
        last: Option<AttemptFailure>,
    },
}

impl RequestOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, RequestOutcome::Completed(_))
    }

    pub fn response(self) -> Option<HttpResponse> {
        match self {
            RequestOutcome::Completed(response) => Some(response),
            RequestOutcome::Failed { .. } => None,
        }
    }
}

/// HTTP client that retries through rotating egress identities
#[derive(Clone)]
pub struct ResilientClient {
    source: Arc<dyn EgressSource>,
    transport: Arc<dyn Transport>,
    headers: HeaderGenerator,
    detector: BanDetector,
    policy: RetryPolicy,
}

impl ResilientClient {
    pub fn new(
        source: Arc<dyn EgressSource>,
        transport: Arc<dyn Transport>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            source,
            transport,
            headers: HeaderGenerator::new(),
            detector: BanDetector::new(),
            policy,
        }
    }

    pub fn with_headers(mut self, headers: HeaderGenerator) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_detector(mut self, detector: BanDetector) -> Self {
        self.detector = detector;
        self
    }

    pub fn source(&self) -> &Arc<dyn EgressSource> {
        &self.source
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// GET with the default policy
    pub async fn get(&self, url: &str) -> RequestOutcome {
        self.execute(&HttpRequest::get(url)).await
    }

    pub async fn execute(&self, request: &HttpRequest) -> RequestOutcome {
        let max_retries = request.max_retries.unwrap_or(self.policy.max_retries);
        let timeout = request.timeout.unwrap_or(self.policy.timeout);
        let mut last = None;

        for attempt in 1..=max_retries {
            let route = self.source.next_route();
            let prepared = HttpRequest {
                headers: merge_headers(self.headers.headers(), &request.headers),
                ..request.clone()
            };

            debug!(
                "{} {} via {} (attempt {}/{})",
                request.method, request.url, route, attempt, max_retries
            );

            let backoff = match self.transport.send(&prepared, &route, timeout).await {
                Ok(response) => {
                    let verdict = self.detector.classify(&response);
                    if !verdict.blocked {
                        return RequestOutcome::Completed(response);
                    }

                    warn!(
                        "Ban detected on {}: {}. Rotating identity (attempt {}/{})",
                        request.url, verdict, attempt, max_retries
                    );
                    last = Some(AttemptFailure::Blocked {
                        status: response.status,
                        verdict,
                    });
                    &self.policy.ban_backoff
                }
                Err(e) => {
                    warn!(
                        "Request to {} failed: {}. Retrying (attempt {}/{})",
                        request.url, e, attempt, max_retries
                    );
                    last = Some(AttemptFailure::Transport(e));
                    &self.policy.transport_backoff
                }
            };

            // Rotate before sleeping so the next attempt already has a fresh identity
            self.source.renew_identity().await;

            if attempt < max_retries {
                let delay = jitter(backoff);
                debug!("Backing off for {:?}", delay);
                tokio::time::sleep(delay).await;
            }
        }

        info!("Giving up on {} after {} attempts", request.url, max_retries);
        RequestOutcome::Failed {
            attempts: max_retries,
            last,
        }
    }
}
