use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::IntoResponse,
};

use crate::error::AppError;
use crate::services::AccessTokenClaims;
use crate::startup::AppState;

/// Middleware to require authentication.
///
/// Rejects with 401 before any handler (or store access) runs. Verified
/// claims are stored in request extensions for the AuthUser extractor.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<impl IntoResponse, AppError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| {
            AppError::AuthError(anyhow::anyhow!("Missing or invalid Authorization header"))
        })?;

    let claims = state
        .verifier
        .validate_access_token(token)
        .map_err(|_| AppError::AuthError(anyhow::anyhow!("Invalid or expired token")))?;

    // Add to tracing span for observability
    tracing::Span::current().record("user_id", claims.sub.as_str());

    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}

/// Extractor to easily get claims in handlers.
pub struct AuthUser(pub AccessTokenClaims);

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let claims = parts
            .extensions
            .get::<AccessTokenClaims>()
            .ok_or_else(|| {
                AppError::InternalError(anyhow::anyhow!(
                    "Auth claims missing from request extensions"
                ))
            })?;

        Ok(AuthUser(claims.clone()))
    }
}
