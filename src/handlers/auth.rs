use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderMap, StatusCode},
    Json,
};

use crate::{
    error::AppError,
    handlers::body,
    middleware::bearer_token,
    models::user::{AuthResponse, LoginPayload, RegisterPayload},
    AppState,
};

const MIN_PASSWORD_LEN: usize = 8;

fn validate_registration(payload: &RegisterPayload) -> Result<(), AppError> {
    if payload.email.trim().is_empty() || payload.password.is_empty() || payload.name.trim().is_empty()
    {
        return Err(AppError::validation("Email, password, and name are required"));
    }
    if !payload.email.contains('@') {
        return Err(AppError::validation("Invalid email address"));
    }
    if payload.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterPayload>, JsonRejection>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    let payload = body(payload)?;
    validate_registration(&payload)?;
    let email = payload.email.trim();

    if state.auth.user_exists(email).await? {
        return Err(AppError::Conflict("Email already registered"));
    }

    let response = state
        .auth
        .register(email, &payload.password, payload.name.trim())
        .await?;
    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginPayload>, JsonRejection>,
) -> Result<Json<AuthResponse>, AppError> {
    let payload = body(payload)?;
    if payload.email.trim().is_empty() || payload.password.is_empty() {
        return Err(AppError::validation("Email and password are required"));
    }

    let response = state
        .auth
        .login(payload.email.trim(), &payload.password)
        .await?;
    Ok(Json(response))
}

pub async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<AuthResponse>, AppError> {
    let token = bearer_token(&headers)?;
    Ok(Json(state.auth.refresh_token(token).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(email: &str, password: &str, name: &str) -> RegisterPayload {
        RegisterPayload {
            email: email.into(),
            password: password.into(),
            name: name.into(),
        }
    }

    #[test]
    fn test_registration_validation() {
        assert!(validate_registration(&payload("a@b.co", "password123", "A")).is_ok());
        assert!(validate_registration(&payload("", "password123", "A")).is_err());
        assert!(validate_registration(&payload("a@b.co", "password123", " ")).is_err());
        assert!(validate_registration(&payload("not-an-email", "password123", "A")).is_err());
        assert!(validate_registration(&payload("a@b.co", "short", "A")).is_err());
    }
}
