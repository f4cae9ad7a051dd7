use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};

use crate::{error::AppError, services::AuthError, AppState};

/// Identity resolved by [`require_auth`], read by handlers through
/// `Extension<CurrentUser>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentUser {
    pub user_id: i64,
}

/// Extract the token from `Authorization: Bearer <token>`. Any other scheme
/// or shape is rejected.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AppError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(AppError::Unauthorized("Missing authorization header"))?
        .to_str()
        .map_err(|_| AppError::Unauthorized("Invalid authorization header format"))?;

    let mut parts = value.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some("Bearer"), Some(token), None) if !token.is_empty() => Ok(token),
        _ => Err(AppError::Unauthorized(
            "Invalid authorization header format",
        )),
    }
}

/// Authentication stage: validates the bearer token and attaches
/// [`CurrentUser`] to the request.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(req.headers())?;
    let user_id = state.auth.validate_token(token)?;
    req.extensions_mut().insert(CurrentUser { user_id });
    Ok(next.run(req).await)
}

/// Admin stage: must be layered inside [`require_auth`]. Admin status is
/// read from storage on every request, never from the token.
pub async fn require_admin(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some(user) = req.extensions().get::<CurrentUser>().copied() else {
        return Err(AppError::Unauthorized("Unauthorized"));
    };

    match state.auth.is_admin(user.user_id).await {
        Ok(true) => Ok(next.run(req).await),
        Ok(false) => {
            tracing::warn!(user_id = user.user_id, path = %req.uri().path(), "admin access denied");
            Err(AppError::Forbidden("Admin access required"))
        }
        Err(AuthError::UserNotFound) => Err(AppError::Unauthorized("Unauthorized")),
        Err(e) => Err(e.into()),
    }
}
