//! Per-request identity resolution.
//!
//! The service holds no session state: every operation carries an opaque
//! bearer token which is resolved against the external identity provider
//! before any policy check runs.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

use crate::error::{Error, Result};

/// A resolved caller: who they are and whether they hold the reviewer
/// capability. Issued by the identity provider, never mutated here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    pub id: Uuid,
    pub username: String,
    pub is_reviewer: bool,
}

#[async_trait]
pub trait IdentityResolver: Send + Sync {
    /// Turn a session token into an identity, or fail with
    /// `Unauthenticated` (bad token) / `DependencyUnavailable`
    /// (provider unreachable or timed out).
    async fn resolve(&self, token: &str) -> Result<Identity>;
}

/// Resolver backed by the identity provider's profile endpoint.
pub struct HttpIdentityResolver {
    client: reqwest::Client,
    base_url: String,
}

impl HttpIdentityResolver {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::DependencyUnavailable(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl IdentityResolver for HttpIdentityResolver {
    async fn resolve(&self, token: &str) -> Result<Identity> {
        let url = format!("{}/api/users/me", self.base_url);
        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| Error::DependencyUnavailable(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            response
                .json::<Identity>()
                .await
                .map_err(|e| Error::DependencyUnavailable(e.to_string()))
        } else if status == reqwest::StatusCode::UNAUTHORIZED
            || status == reqwest::StatusCode::FORBIDDEN
        {
            Err(Error::Unauthenticated("invalid or expired token"))
        } else {
            Err(Error::DependencyUnavailable(format!(
                "identity provider returned {}",
                status
            )))
        }
    }
}
