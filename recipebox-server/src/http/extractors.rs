//! Custom Axum extractors
//!
//! Rejections are mapped to [`ApiError`] so every failure has the same
//! JSON shape.

use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{FromRequest, FromRequestParts, Path, Query, Request};
use axum::http::request::Parts;
use axum::Json;
use serde::de::DeserializeOwned;

use super::cookies::session_token;
use super::error::ApiError;
use super::server::AppState;
use crate::db::{DbError, SessionStatus, User};

/// The user behind a valid session cookie or bearer token
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = session_token(&parts.headers, &state.sessions.cookie_name)
            .ok_or_else(|| ApiError::unauthorized("login required"))?;

        let session = match state.session_store().check(&token).await? {
            SessionStatus::Active(session) => session,
            SessionStatus::Expired => return Err(ApiError::unauthorized("session expired")),
            SessionStatus::Missing => return Err(ApiError::unauthorized("invalid session")),
        };

        match state.users().get(session.user_id).await {
            Ok(user) => Ok(Self(user)),
            Err(DbError::NotFound { .. }) => Err(ApiError::unauthorized("invalid session")),
            Err(e) => Err(e.into()),
        }
    }
}

/// JSON body with rejections as `bad_request`
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e: JsonRejection| ApiError::bad_request(e.body_text()))?;
        Ok(Self(value))
    }
}

/// Path parameters with rejections as `bad_request`
pub struct ApiPath<T>(pub T);

impl<S, T> FromRequestParts<S> for ApiPath<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Send,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state)
            .await
            .map_err(|e: PathRejection| ApiError::bad_request(e.body_text()))?;
        Ok(Self(value))
    }
}

/// Query string with rejections as `bad_request`
pub struct ApiQuery<T>(pub T);

impl<S, T> FromRequestParts<S> for ApiQuery<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|e: QueryRejection| ApiError::bad_request(e.body_text()))?;
        Ok(Self(value))
    }
}
