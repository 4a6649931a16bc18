//! Signed object downloads

use std::sync::Arc;

use axum::{
    extract::State,
    http::header::{CONTENT_DISPOSITION, CONTENT_TYPE},
    response::IntoResponse,
    routing::get,
    Router,
};
use chrono::Utc;
use serde::Deserialize;

use crate::http::error::ApiError;
use crate::http::extractors::{ApiPath, ApiQuery};
use crate::http::server::AppState;
use crate::storage::SignatureError;

/// Signature query parameters
#[derive(Deserialize)]
pub struct SignedQuery {
    pub expires: Option<i64>,
    pub signature: Option<String>,
}

/// GET /objects/{key}?expires=&signature=
async fn get_object(
    State(state): State<Arc<AppState>>,
    ApiPath(key): ApiPath<String>,
    ApiQuery(query): ApiQuery<SignedQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let (Some(expires), Some(signature)) = (query.expires, query.signature) else {
        return Err(SignatureError::Invalid.into());
    };

    state.signer.verify(&key, expires, &signature, Utc::now())?;
    let bytes = state.store.get(&key).await?;

    Ok((
        [
            (CONTENT_TYPE, "application/octet-stream".to_string()),
            (CONTENT_DISPOSITION, format!("attachment; filename=\"{}\"", key)),
        ],
        bytes,
    ))
}

/// Object routes (outside `/api`)
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/objects/{key}", get(get_object))
}
