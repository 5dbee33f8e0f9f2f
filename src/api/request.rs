use std::convert::Infallible;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::domain::DecisionInput;

/// Extracts the decision input straight from the request head.
#[async_trait]
impl<S> FromRequestParts<S> for DecisionInput
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(DecisionInput::from_request(&parts.uri, &parts.headers))
    }
}
