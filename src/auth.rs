//! # Request Identity
//!
//! Maps `Authorization: Bearer <token>` to a stored user. The token's SHA-256
//! digest is looked up in `users.api_token_hash`; the resolved
//! [`CurrentUser`] travels in request extensions. Administrative routes
//! additionally require the staff flag.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};

use crate::error::{ApiError, forbidden, unauthorized};
use crate::models::user;
use crate::repositories::UserRepository;
use crate::server::AppState;

/// The user on whose behalf a request runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: i32,
    pub username: String,
    pub is_staff: bool,
}

impl From<user::Model> for CurrentUser {
    fn from(model: user::Model) -> Self {
        Self {
            id: model.id,
            username: model.username,
            is_staff: model.is_staff,
        }
    }
}

fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    let header = headers
        .get(AUTHORIZATION)
        .ok_or_else(|| unauthorized(Some("Missing Authorization header")))?
        .to_str()
        .map_err(|_| unauthorized(Some("Invalid Authorization header")))?;

    let token = header
        .strip_prefix("Bearer ")
        .ok_or_else(|| unauthorized(Some("Authorization header must use Bearer scheme")))?
        .trim();

    if token.is_empty() {
        return Err(unauthorized(Some("Empty bearer token")));
    }

    Ok(token)
}

/// Resolve the bearer token to a user and attach it to the request.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer_token(request.headers())?;

    let user = UserRepository::new(&state.db)
        .find_by_token(token)
        .await?
        .ok_or_else(|| unauthorized(Some("Invalid bearer token")))?;

    tracing::debug!(user_id = user.id, username = %user.username, "Authenticated request");

    request.extensions_mut().insert(CurrentUser::from(user));
    Ok(next.run(request).await)
}

/// Refuse requests whose user is not staff. Runs after [`auth_middleware`].
pub async fn require_staff(request: Request, next: Next) -> Result<Response, ApiError> {
    let user = request
        .extensions()
        .get::<CurrentUser>()
        .ok_or_else(|| unauthorized(None))?;

    if !user.is_staff {
        tracing::warn!(user_id = user.id, path = %request.uri().path(), "Staff access denied");
        return Err(forbidden(Some("Staff access required")));
    }

    Ok(next.run(request).await)
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or_else(|| unauthorized(None))
    }
}
