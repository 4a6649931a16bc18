//! User read endpoints

use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use super::auth::UserResponse;
use super::files::FileResponse;
use super::recipes::RecipeResponse;
use crate::db::UserProfile;
use crate::http::error::ApiError;
use crate::http::extractors::{ApiPath, ApiQuery, CurrentUser};
use crate::http::server::AppState;
use crate::models::{Paginated, Pagination, PaginationParams};

/// Public profile response
#[derive(Serialize)]
pub struct UserProfileResponse {
    pub username: String,
    pub recipe_count: i64,
    pub created_at: String,
}

impl From<UserProfile> for UserProfileResponse {
    fn from(p: UserProfile) -> Self {
        Self {
            username: p.username,
            recipe_count: p.recipe_count,
            created_at: p.created_at.to_rfc3339(),
        }
    }
}

/// GET /api/user/me
async fn me(CurrentUser(user): CurrentUser) -> Json<UserResponse> {
    Json(user.into())
}

/// GET /api/user/{username}
async fn get_user(
    State(state): State<Arc<AppState>>,
    ApiPath(username): ApiPath<String>,
) -> Result<Json<UserProfileResponse>, ApiError> {
    let profile = state.users().profile(&username).await?;
    Ok(Json(profile.into()))
}

/// GET /api/user/{username}/recipes - newest first
async fn list_user_recipes(
    State(state): State<Arc<AppState>>,
    ApiPath(username): ApiPath<String>,
    ApiQuery(params): ApiQuery<PaginationParams>,
) -> Result<Json<Paginated<RecipeResponse>>, ApiError> {
    let page = Pagination::from(params);
    let user_id = state.users().id_for(&username).await?;
    let recipes = state.recipes().list_for_user(user_id, page).await?;
    Ok(Json(recipes.map(RecipeResponse::from)))
}

/// GET /api/user/{username}/files - newest first
async fn list_user_files(
    State(state): State<Arc<AppState>>,
    ApiPath(username): ApiPath<String>,
    ApiQuery(params): ApiQuery<PaginationParams>,
) -> Result<Json<Paginated<FileResponse>>, ApiError> {
    let page = Pagination::from(params);
    let user_id = state.users().id_for(&username).await?;
    let files = state.files().list_for_user(user_id, page).await?;
    Ok(Json(files.map(FileResponse::from)))
}

/// User routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/user/me", get(me))
        .route("/user/{username}", get(get_user))
        .route("/user/{username}/recipes", get(list_user_recipes))
        .route("/user/{username}/files", get(list_user_files))
}
