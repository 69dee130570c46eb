//! Bearer-token extractor.
//!
//! Resolves the `Authorization` header against the identity provider on
//! every request; handlers never see an unresolved credential.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use std::sync::Arc;

use crate::error::Error;
use crate::identity::Identity;
use crate::state::AppState;

pub struct AuthUser(pub Identity);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = Error;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or(Error::Unauthenticated("missing Authorization header"))?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or(Error::Unauthenticated("expected a Bearer token"))?;

        let identity = state.identity.resolve(token).await?;
        Ok(AuthUser(identity))
    }
}
