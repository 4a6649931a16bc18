//! Registration, login and session endpoints

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::{generate_token, PasswordHasher, SALT_LEN, SESSION_TOKEN_LEN};
use crate::db::{SessionStatus, User};
use crate::http::cookies::{clear_session_cookie, session_cookie, session_token};
use crate::http::error::ApiError;
use crate::http::extractors::JsonBody;
use crate::http::server::AppState;
use crate::models::{Password, Username};

const BAD_CREDENTIALS: &str = "invalid username or password";

/// Register request
#[derive(Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    #[serde(rename = "passwordConfirm", alias = "password_confirm")]
    pub password_confirm: String,
}

/// Login request
#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// User response (no credentials)
#[derive(Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub created_at: String,
}

impl From<User> for UserResponse {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            username: u.username,
            created_at: u.created_at.to_rfc3339(),
        }
    }
}

/// Login response; the token is also set as the session cookie
#[derive(Serialize)]
pub struct LoginResponse {
    pub user: UserResponse,
    pub token: String,
    pub expires_at: String,
}

/// Session check response
#[derive(Serialize)]
pub struct SessionResponse {
    pub status: &'static str,
    pub user_id: i64,
    pub expires_at: String,
}

/// POST /api/auth/register - create an account
async fn register(
    State(state): State<Arc<AppState>>,
    JsonBody(req): JsonBody<RegisterRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    let username = Username::new(&req.username)?;
    let password = Password::with_confirmation(&req.password, &req.password_confirm)?;

    let salt = generate_token(SALT_LEN);
    let hasher = state.hasher;
    let hash_salt = salt.clone();
    let hash = tokio::task::spawn_blocking(move || hasher.hash(password.expose(), &hash_salt))
        .await
        .map_err(|e| ApiError::internal(format!("password hashing task failed: {}", e)))?;

    let user = state.users().create(&username, &hash, &salt).await?;
    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

/// POST /api/auth/login - verify credentials and start a session
async fn login(
    State(state): State<Arc<AppState>>,
    JsonBody(req): JsonBody<LoginRequest>,
) -> Result<Response, ApiError> {
    let username = req.username.trim();
    let Some(creds) = state.users().find_credentials(username).await? else {
        verify_password(state.hasher, req.password, None).await?;
        tracing::info!(username, "login for unknown user");
        return Err(ApiError::unauthorized(BAD_CREDENTIALS));
    };

    let stored = Some((creds.salt, creds.password_hash));
    if !verify_password(state.hasher, req.password, stored).await? {
        tracing::info!(user_id = creds.id, "login with wrong password");
        return Err(ApiError::unauthorized(BAD_CREDENTIALS));
    }

    let ttl = state.sessions.ttl();
    let expires_at = session_expiry(Utc::now(), ttl)?;
    let token = generate_token(SESSION_TOKEN_LEN);
    state.session_store().create(creds.id, &token, expires_at).await?;
    let user = state.users().get(creds.id).await?;

    tracing::info!(user_id = user.id, "user logged in");

    let cookie = session_cookie(
        &state.sessions.cookie_name,
        &token,
        ttl,
        state.sessions.secure_cookie,
    );
    let body = LoginResponse {
        user: user.into(),
        token,
        expires_at: expires_at.to_rfc3339(),
    };
    Ok(([(SET_COOKIE, cookie)], Json(body)).into_response())
}

/// GET /api/auth/session - check the presented session
async fn check_session(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let token = session_token(&headers, &state.sessions.cookie_name)
        .ok_or_else(|| ApiError::unauthorized("no session"))?;

    match state.session_store().check(&token).await? {
        SessionStatus::Active(session) => Ok(Json(SessionResponse {
            status: "active",
            user_id: session.user_id,
            expires_at: session.expires_at.to_rfc3339(),
        })
        .into_response()),
        SessionStatus::Expired => {
            let clear = clear_session_cookie(&state.sessions.cookie_name, state.sessions.secure_cookie);
            Ok(([(SET_COOKIE, clear)], ApiError::unauthorized("session expired")).into_response())
        }
        SessionStatus::Missing => Err(ApiError::unauthorized("invalid session")),
    }
}

/// POST /api/auth/logout - end the session and clear the cookie
async fn logout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    if let Some(token) = session_token(&headers, &state.sessions.cookie_name) {
        if state.session_store().delete(&token).await? {
            tracing::info!("session ended");
        }
    }

    let clear = clear_session_cookie(&state.sessions.cookie_name, state.sessions.secure_cookie);
    Ok((StatusCode::NO_CONTENT, [(SET_COOKIE, clear)]).into_response())
}

/// Verify off the async runtime. `stored` is `(salt, hash)`; `None` still
/// runs a full derivation so unknown usernames take as long as wrong passwords.
async fn verify_password(
    hasher: PasswordHasher,
    password: String,
    stored: Option<(String, String)>,
) -> Result<bool, ApiError> {
    tokio::task::spawn_blocking(move || match stored {
        Some((salt, hash)) => hasher.verify(&password, &salt, &hash),
        None => hasher.verify_missing(&password),
    })
    .await
    .map_err(|e| ApiError::internal(format!("password verification task failed: {}", e)))
}

fn session_expiry(now: DateTime<Utc>, ttl: std::time::Duration) -> Result<DateTime<Utc>, ApiError> {
    chrono::Duration::from_std(ttl)
        .ok()
        .and_then(|ttl| now.checked_add_signed(ttl))
        .ok_or_else(|| ApiError::internal("session TTL out of range"))
}

/// Auth routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/session", get(check_session))
        .route("/auth/logout", post(logout))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn register_accepts_both_confirm_spellings() {
        let camel: RegisterRequest = serde_json::from_str(
            r#"{"username":"chef","password":"pw","passwordConfirm":"pw"}"#,
        )
        .unwrap();
        assert_eq!(camel.password_confirm, "pw");

        let snake: RegisterRequest = serde_json::from_str(
            r#"{"username":"chef","password":"pw","password_confirm":"pw"}"#,
        )
        .unwrap();
        assert_eq!(snake.password_confirm, "pw");
    }

    #[tokio::test]
    async fn unknown_account_never_verifies() {
        let hasher = PasswordHasher::new(2);
        assert!(!verify_password(hasher, "hunter2".into(), None).await.unwrap());

        let salt = "pepper".to_string();
        let hash = hasher.hash("hunter2", &salt);
        assert!(verify_password(hasher, "hunter2".into(), Some((salt.clone(), hash.clone())))
            .await
            .unwrap());
        assert!(!verify_password(hasher, "hunter3".into(), Some((salt, hash)))
            .await
            .unwrap());
    }

    #[test]
    fn expiry_adds_ttl() {
        let now = Utc::now();
        let expiry = session_expiry(now, Duration::from_secs(3600)).unwrap();
        assert_eq!((expiry - now).num_seconds(), 3600);
    }

    #[test]
    fn absurd_ttl_is_an_error() {
        assert!(session_expiry(Utc::now(), Duration::from_secs(u64::MAX)).is_err());
    }
}
