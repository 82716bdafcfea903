//! GitHub account age lookup
//!
//! Fetches `created_at` from the public users API through the resilient
//! client, so throttled or banned requests rotate identity and retry.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use thunder_net::{HttpRequest, ResilientClient};

use crate::AccountAgeLookup;

const GITHUB_API: &str = "https://api.github.com";

#[derive(Debug, Deserialize)]
struct GitHubUser {
    created_at: Option<String>,
}

/// Account creation dates from the GitHub users API
pub struct GitHubAgeLookup {
    client: ResilientClient,
    token: Option<String>,
    api_base: String,
}

impl GitHubAgeLookup {
    pub fn new(client: ResilientClient) -> Self {
        Self {
            client,
            token: None,
            api_base: GITHUB_API.to_string(),
        }
    }

    /// Personal access token, raises the rate limit
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.is_empty());
        self
    }

    pub fn with_api_base(mut self, base: &str) -> Self {
        self.api_base = base.trim_end_matches('/').to_string();
        self
    }

    fn user_url(&self, handle: &str) -> String {
        format!("{}/users/{}", self.api_base, urlencoding::encode(handle))
    }
}

#[async_trait]
impl AccountAgeLookup for GitHubAgeLookup {
    async fn created_at(&self, handle: &str) -> Option<String> {
        let mut request =
            HttpRequest::get(self.user_url(handle)).header("Accept", "application/vnd.github+json");
        if let Some(token) = &self.token {
            request = request.header("Authorization", format!("token {}", token));
        }

        let response = self.client.execute(&request).await.response()?;
        if response.status != 200 {
            debug!("GitHub lookup for {} returned {}", handle, response.status);
            return None;
        }

        match serde_json::from_str::<GitHubUser>(&response.body) {
            Ok(user) => user.created_at,
            Err(e) => {
                debug!("Failed to parse GitHub user {}: {}", handle, e);
                None
            }
        }
    }
}
