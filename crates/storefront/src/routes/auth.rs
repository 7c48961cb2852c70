//! Registration and login.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::post,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use vitrina_core::AuditSeverity;

use crate::error::{AppError, Result, set_sentry_user};
use crate::middleware::{ClientInfo, auth_rate_limiter};
use crate::models::{NewAuditEntry, User};
use crate::services::auth::{AuthError, AuthService, Registration};
use crate::state::AppState;

/// Build the auth router. Both endpoints share one per-IP rate limit.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .layer(auth_rate_limiter())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Token plus the account it belongs to.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

/// `POST /api/auth/register`
#[instrument(skip(state, client, body), fields(email = %body.email))]
pub async fn register(
    State(state): State<AppState>,
    client: ClientInfo,
    Json(body): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>)> {
    let form = Registration {
        email: body.email,
        password: body.password,
        first_name: body.first_name,
        last_name: body.last_name,
        phone: body.phone,
    };

    let user = AuthService::new(state.pool()).register(&form).await?;
    let token = state.jwt().issue(&user)?;

    info!(user_id = %user.id, "user registered");
    state.audit().record(
        NewAuditEntry::new("USER_REGISTER", AuditSeverity::Low)
            .actor(user.id)
            .target("user", user.id.as_i32())
            .new_values(&user)
            .client(&client),
    );

    Ok((StatusCode::CREATED, Json(AuthResponse { token, user })))
}

/// `POST /api/auth/login`
#[instrument(skip(state, client, body), fields(email = %body.email))]
pub async fn login(
    State(state): State<AppState>,
    client: ClientInfo,
    Json(body): Json<LoginRequest>,
) -> Result<Json<AuthResponse>> {
    let user = match AuthService::new(state.pool())
        .login(&body.email, &body.password)
        .await
    {
        Ok(user) => user,
        Err(AuthError::InvalidCredentials) => {
            state.audit().record(
                NewAuditEntry::new("USER_LOGIN_FAILED", AuditSeverity::Medium)
                    .new_values(&serde_json::json!({ "email": body.email.trim() }))
                    .client(&client),
            );
            return Err(AppError::Auth(AuthError::InvalidCredentials));
        }
        Err(e) => return Err(e.into()),
    };

    let token = state.jwt().issue(&user)?;
    set_sentry_user(&user.id, Some(user.email.as_str()));

    state.audit().record(
        NewAuditEntry::new("USER_LOGIN", AuditSeverity::Low)
            .actor(user.id)
            .client(&client),
    );

    Ok(Json(AuthResponse { token, user }))
}
