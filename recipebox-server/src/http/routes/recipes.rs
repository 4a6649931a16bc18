//! Recipe endpoints
//!
//! Every mutation requires a session and is authorized against the
//! recipe owner inside the repository transaction.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{patch, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::db::{Ingredient, Instruction, RecipeDetail, RecipeTag};
use crate::http::error::ApiError;
use crate::http::extractors::{ApiPath, CurrentUser, JsonBody};
use crate::http::server::AppState;
use crate::models::recipe::validate_description;
use crate::models::{
    IngredientDraft, IngredientPatch, InstructionContents, InstructionDraft, NewRecipe,
    RecipeName, RecipePatch, StepSwap, ValidationError,
};

/// Ingredient as submitted
#[derive(Deserialize)]
pub struct IngredientBody {
    pub name: String,
    #[serde(default)]
    pub quantity: String,
    #[serde(default)]
    pub unit: String,
}

/// Instruction as submitted; `step` orders instructions on create
#[derive(Deserialize)]
pub struct InstructionBody {
    pub step: Option<i32>,
    pub contents: String,
}

/// Create recipe request
#[derive(Deserialize)]
pub struct CreateRecipeRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub ingredients: Vec<IngredientBody>,
    #[serde(default)]
    pub instructions: Vec<InstructionBody>,
}

impl CreateRecipeRequest {
    fn validate(self) -> Result<NewRecipe, ValidationError> {
        let ingredients = self
            .ingredients
            .iter()
            .map(|i| IngredientDraft::new(&i.name, &i.quantity, &i.unit))
            .collect::<Result<Vec<_>, _>>()?;

        let instructions = self
            .instructions
            .iter()
            .map(|i| {
                Ok(InstructionDraft {
                    step: i.step,
                    contents: InstructionContents::new(&i.contents)?,
                })
            })
            .collect::<Result<Vec<_>, ValidationError>>()?;

        Ok(NewRecipe {
            name: RecipeName::new(&self.name)?,
            description: validate_description(&self.description)?,
            ingredients,
            instructions,
        })
    }
}

/// Update recipe request; absent or blank fields are left unchanged
#[derive(Deserialize)]
pub struct UpdateRecipeRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

/// Update ingredient request; absent or blank fields are left unchanged
#[derive(Deserialize)]
pub struct UpdateIngredientRequest {
    pub name: Option<String>,
    pub quantity: Option<String>,
    pub unit: Option<String>,
}

/// Update instruction request
#[derive(Deserialize)]
pub struct UpdateInstructionRequest {
    pub contents: String,
}

/// Ingredient response
#[derive(Debug, Serialize)]
pub struct IngredientResponse {
    pub id: i64,
    pub name: String,
    pub quantity: String,
    pub unit: String,
}

impl From<Ingredient> for IngredientResponse {
    fn from(i: Ingredient) -> Self {
        Self {
            id: i.id,
            name: i.name,
            quantity: i.quantity,
            unit: i.unit,
        }
    }
}

/// Instruction response
#[derive(Debug, Serialize)]
pub struct InstructionResponse {
    pub id: i64,
    pub step: i32,
    pub contents: String,
}

impl From<Instruction> for InstructionResponse {
    fn from(i: Instruction) -> Self {
        Self {
            id: i.id,
            step: i.step,
            contents: i.contents,
        }
    }
}

/// Tag reference inside a recipe
#[derive(Debug, Serialize)]
pub struct TagRef {
    pub id: i64,
    pub tag: String,
}

impl From<RecipeTag> for TagRef {
    fn from(t: RecipeTag) -> Self {
        Self { id: t.id, tag: t.tag }
    }
}

/// Full recipe response
#[derive(Debug, Serialize)]
pub struct RecipeResponse {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub description: String,
    pub created_at: String,
    pub updated_at: String,
    pub ingredients: Vec<IngredientResponse>,
    pub instructions: Vec<InstructionResponse>,
    pub tags: Vec<TagRef>,
}

impl From<RecipeDetail> for RecipeResponse {
    fn from(d: RecipeDetail) -> Self {
        Self {
            id: d.recipe.id,
            user_id: d.recipe.user_id,
            name: d.recipe.name,
            description: d.recipe.description,
            created_at: d.recipe.created_at.to_rfc3339(),
            updated_at: d.recipe.updated_at.to_rfc3339(),
            ingredients: d.ingredients.into_iter().map(Into::into).collect(),
            instructions: d.instructions.into_iter().map(Into::into).collect(),
            tags: d.tags.into_iter().map(Into::into).collect(),
        }
    }
}

type RecipeResult = Result<Json<RecipeResponse>, ApiError>;

/// POST /api/recipe - create a recipe with ingredients and instructions
async fn create_recipe(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    JsonBody(req): JsonBody<CreateRecipeRequest>,
) -> Result<(StatusCode, Json<RecipeResponse>), ApiError> {
    let new = req.validate()?;
    let recipe = state.recipes().create(user.id, new).await?;
    Ok((StatusCode::CREATED, Json(recipe.into())))
}

/// GET /api/recipe/{id} - public read
async fn get_recipe(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> RecipeResult {
    let recipe = state.recipes().get(id).await?;
    Ok(Json(recipe.into()))
}

/// PATCH /api/recipe/{id}
async fn update_recipe(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    ApiPath(id): ApiPath<i64>,
    JsonBody(req): JsonBody<UpdateRecipeRequest>,
) -> RecipeResult {
    let patch = RecipePatch::new(req.name.as_deref(), req.description.as_deref())?;
    let recipe = state.recipes().update(user.id, id, patch).await?;
    Ok(Json(recipe.into()))
}

/// DELETE /api/recipe/{id}
async fn delete_recipe(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<StatusCode, ApiError> {
    state.recipes().delete(user.id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/recipe/{id}/ingredient
async fn add_ingredient(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    ApiPath(id): ApiPath<i64>,
    JsonBody(req): JsonBody<IngredientBody>,
) -> Result<(StatusCode, Json<RecipeResponse>), ApiError> {
    let draft = IngredientDraft::new(&req.name, &req.quantity, &req.unit)?;
    let recipe = state.recipes().add_ingredient(user.id, id, draft).await?;
    Ok((StatusCode::CREATED, Json(recipe.into())))
}

/// PATCH /api/recipe/{id}/ingredient/{ingredient_id}
async fn update_ingredient(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    ApiPath((id, ingredient_id)): ApiPath<(i64, i64)>,
    JsonBody(req): JsonBody<UpdateIngredientRequest>,
) -> RecipeResult {
    let patch = IngredientPatch::new(
        req.name.as_deref(),
        req.quantity.as_deref(),
        req.unit.as_deref(),
    )?;
    let recipe = state
        .recipes()
        .update_ingredient(user.id, id, ingredient_id, patch)
        .await?;
    Ok(Json(recipe.into()))
}

/// DELETE /api/recipe/{id}/ingredient/{ingredient_id}
async fn delete_ingredient(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    ApiPath((id, ingredient_id)): ApiPath<(i64, i64)>,
) -> RecipeResult {
    let recipe = state
        .recipes()
        .delete_ingredient(user.id, id, ingredient_id)
        .await?;
    Ok(Json(recipe.into()))
}

/// POST /api/recipe/{id}/instruction - insert at `step` or append
async fn add_instruction(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    ApiPath(id): ApiPath<i64>,
    JsonBody(req): JsonBody<InstructionBody>,
) -> Result<(StatusCode, Json<RecipeResponse>), ApiError> {
    let contents = InstructionContents::new(&req.contents)?;
    let recipe = state
        .recipes()
        .add_instruction(user.id, id, req.step, contents)
        .await?;
    Ok((StatusCode::CREATED, Json(recipe.into())))
}

/// PATCH /api/recipe/{id}/instruction/{instruction_id}
async fn update_instruction(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    ApiPath((id, instruction_id)): ApiPath<(i64, i64)>,
    JsonBody(req): JsonBody<UpdateInstructionRequest>,
) -> RecipeResult {
    let contents = InstructionContents::new(&req.contents)?;
    let recipe = state
        .recipes()
        .update_instruction(user.id, id, instruction_id, contents)
        .await?;
    Ok(Json(recipe.into()))
}

/// PATCH /api/recipe/{id}/instruction/{instruction_id}/{other_id} - swap steps
async fn swap_instructions(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    ApiPath((id, one_id, two_id)): ApiPath<(i64, i64, i64)>,
) -> RecipeResult {
    let swap = StepSwap::new(one_id, two_id)?;
    let recipe = state.recipes().swap_instructions(user.id, id, swap).await?;
    Ok(Json(recipe.into()))
}

/// DELETE /api/recipe/{id}/instruction/{instruction_id}
async fn delete_instruction(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    ApiPath((id, instruction_id)): ApiPath<(i64, i64)>,
) -> RecipeResult {
    let recipe = state
        .recipes()
        .delete_instruction(user.id, id, instruction_id)
        .await?;
    Ok(Json(recipe.into()))
}

/// PATCH /api/recipe/{id}/tag/{tag_id} - link a tag
async fn add_tag(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    ApiPath((id, tag_id)): ApiPath<(i64, i64)>,
) -> RecipeResult {
    let recipe = state.recipes().add_tag(user.id, id, tag_id).await?;
    Ok(Json(recipe.into()))
}

/// DELETE /api/recipe/{id}/tag/{tag_id} - unlink a tag
async fn remove_tag(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    ApiPath((id, tag_id)): ApiPath<(i64, i64)>,
) -> RecipeResult {
    let recipe = state.recipes().remove_tag(user.id, id, tag_id).await?;
    Ok(Json(recipe.into()))
}

/// Recipe routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/recipe", post(create_recipe))
        .route(
            "/recipe/{id}",
            axum::routing::get(get_recipe)
                .patch(update_recipe)
                .delete(delete_recipe),
        )
        .route("/recipe/{id}/ingredient", post(add_ingredient))
        .route(
            "/recipe/{id}/ingredient/{ingredient_id}",
            patch(update_ingredient).delete(delete_ingredient),
        )
        .route("/recipe/{id}/instruction", post(add_instruction))
        .route(
            "/recipe/{id}/instruction/{instruction_id}",
            patch(update_instruction).delete(delete_instruction),
        )
        .route(
            "/recipe/{id}/instruction/{instruction_id}/{other_id}",
            patch(swap_instructions),
        )
        .route("/recipe/{id}/tag/{tag_id}", patch(add_tag).delete(remove_tag))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(json: &str) -> CreateRecipeRequest {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn create_request_defaults_optional_fields() {
        let new = request(r#"{"name":"Toast"}"#).validate().unwrap();
        assert_eq!(new.name.as_str(), "Toast");
        assert!(new.description.is_empty());
        assert!(new.ingredients.is_empty());
        assert!(new.instructions.is_empty());
    }

    #[test]
    fn create_request_validates_nested_items() {
        let err = request(r#"{"name":"Toast","ingredients":[{"name":"  "}]}"#)
            .validate()
            .unwrap_err();
        assert_eq!(
            err,
            ValidationError::Empty {
                field: "ingredient name"
            }
        );

        let err = request(r#"{"name":"Toast","instructions":[{"contents":""}]}"#)
            .validate()
            .unwrap_err();
        assert_eq!(err, ValidationError::Empty { field: "contents" });
    }

    #[test]
    fn create_request_keeps_submitted_steps() {
        let new = request(
            r#"{"name":"Toast","instructions":[
                {"step":2,"contents":"butter"},
                {"step":1,"contents":"toast bread"}
            ]}"#,
        )
        .validate()
        .unwrap();
        let steps: Vec<Option<i32>> = new.instructions.iter().map(|i| i.step).collect();
        assert_eq!(steps, vec![Some(2), Some(1)]);
    }

    #[test]
    fn blank_name_is_rejected() {
        let err = request(r#"{"name":"  "}"#).validate().unwrap_err();
        assert_eq!(err, ValidationError::Empty { field: "name" });
    }
}
