//! Tag endpoints

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::db::{Tag, TagWithRecipes, TaggedRecipe};
use crate::http::error::ApiError;
use crate::http::extractors::{ApiPath, CurrentUser, JsonBody};
use crate::http::server::AppState;
use crate::models::TagLabel;

/// Create tag request
#[derive(Deserialize)]
pub struct CreateTagRequest {
    pub tag: String,
}

/// Recipe summary under a tag
#[derive(Serialize)]
pub struct TaggedRecipeResponse {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub created_at: String,
}

impl From<TaggedRecipe> for TaggedRecipeResponse {
    fn from(r: TaggedRecipe) -> Self {
        Self {
            id: r.id,
            name: r.name,
            description: r.description,
            created_at: r.created_at.to_rfc3339(),
        }
    }
}

/// Tag response
#[derive(Serialize)]
pub struct TagResponse {
    pub id: i64,
    pub tag: String,
    pub created_at: String,
    pub recipes: Vec<TaggedRecipeResponse>,
}

impl From<TagWithRecipes> for TagResponse {
    fn from(t: TagWithRecipes) -> Self {
        Self {
            recipes: t.recipes.into_iter().map(Into::into).collect(),
            ..Self::from(t.tag)
        }
    }
}

impl From<Tag> for TagResponse {
    fn from(t: Tag) -> Self {
        Self {
            id: t.id,
            tag: t.tag,
            created_at: t.created_at.to_rfc3339(),
            recipes: Vec::new(),
        }
    }
}

/// GET /api/tag - all tags with their recipes
async fn list_tags(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<TagResponse>>, ApiError> {
    let tags = state.tags().list().await?;
    Ok(Json(tags.into_iter().map(TagResponse::from).collect()))
}

/// POST /api/tag - create a tag
async fn create_tag(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    JsonBody(req): JsonBody<CreateTagRequest>,
) -> Result<(StatusCode, Json<TagResponse>), ApiError> {
    let label = TagLabel::new(&req.tag)?;
    let tag = state.tags().create(label).await?;
    tracing::debug!(user_id = user.id, tag_id = tag.id, "tag created by user");
    Ok((StatusCode::CREATED, Json(tag.into())))
}

/// GET /api/tag/{id}
async fn get_tag(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<TagResponse>, ApiError> {
    let tag = state.tags().get(id).await?;
    Ok(Json(tag.into()))
}

/// DELETE /api/tag/{id} - delete a tag and its recipe links
async fn delete_tag(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<StatusCode, ApiError> {
    state.tags().delete(id).await?;
    tracing::debug!(user_id = user.id, tag_id = id, "tag deleted by user");
    Ok(StatusCode::NO_CONTENT)
}

/// Tag routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/tag", get(list_tags).post(create_tag))
        .route("/tag/{id}", get(get_tag).delete(delete_tag))
}
