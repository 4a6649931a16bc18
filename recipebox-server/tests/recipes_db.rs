//! Recipe mutation core against a live database.
//!
//! Run with `DATABASE_URL=... cargo test -- --ignored`.

mod common;

use std::time::Duration;

use recipebox_server::db::{DbError, RecipeDetail, RecipeRepo, TagRepo};
use recipebox_server::models::{
    IngredientDraft, IngredientPatch, InstructionContents, InstructionDraft, NewRecipe,
    RecipeName, RecipePatch, StepSwap, TagLabel,
};
use sqlx::PgPool;

fn draft(step: Option<i32>, contents: &str) -> InstructionDraft {
    InstructionDraft {
        step,
        contents: InstructionContents::new(contents).unwrap(),
    }
}

fn pancakes() -> NewRecipe {
    NewRecipe {
        name: RecipeName::new("Pancakes").unwrap(),
        description: "Sunday breakfast".into(),
        ingredients: vec![
            IngredientDraft::new("flour", "200", "g").unwrap(),
            IngredientDraft::new("milk", "300", "ml").unwrap(),
        ],
        instructions: vec![
            draft(Some(5), "fry"),
            draft(Some(1), "whisk"),
            draft(None, "serve"),
            draft(Some(3), "rest"),
        ],
    }
}

fn steps(detail: &RecipeDetail) -> Vec<(i32, &str)> {
    detail
        .instructions
        .iter()
        .map(|i| (i.step, i.contents.as_str()))
        .collect()
}

async fn instruction_rows(pool: &PgPool, recipe_id: i64) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM instructions WHERE recipe_id = $1")
        .bind(recipe_id)
        .fetch_one(pool)
        .await
        .unwrap()
}

#[tokio::test]
#[ignore = "requires database"]
async fn create_numbers_steps_contiguously() {
    let pool = common::pool().await;
    let owner = common::user(&pool, "cook").await;

    let recipe = RecipeRepo::new(&pool).create(owner.id, pancakes()).await.unwrap();

    assert_eq!(recipe.recipe.user_id, owner.id);
    assert_eq!(recipe.ingredients.len(), 2);
    assert_eq!(
        steps(&recipe),
        vec![(1, "whisk"), (2, "rest"), (3, "fry"), (4, "serve")]
    );

    let fetched = RecipeRepo::new(&pool).get(recipe.recipe.id).await.unwrap();
    assert_eq!(steps(&fetched), steps(&recipe));
}

#[tokio::test]
#[ignore = "requires database"]
async fn update_leaves_absent_fields_alone() {
    let pool = common::pool().await;
    let owner = common::user(&pool, "cook").await;
    let repo = RecipeRepo::new(&pool);
    let recipe = repo.create(owner.id, pancakes()).await.unwrap();

    let patch = RecipePatch::new(Some("Crepes"), None).unwrap();
    let updated = repo.update(owner.id, recipe.recipe.id, patch).await.unwrap();

    assert_eq!(updated.recipe.name, "Crepes");
    assert_eq!(updated.recipe.description, "Sunday breakfast");
    assert!(updated.recipe.updated_at >= recipe.recipe.updated_at);
}

#[tokio::test]
#[ignore = "requires database"]
async fn non_owner_is_forbidden_and_nothing_changes() {
    let pool = common::pool().await;
    let owner = common::user(&pool, "cook").await;
    let other = common::user(&pool, "guest").await;
    let repo = RecipeRepo::new(&pool);
    let recipe = repo.create(owner.id, pancakes()).await.unwrap();
    let id = recipe.recipe.id;

    let patch = RecipePatch::new(Some("Stolen"), None).unwrap();
    assert!(matches!(
        repo.update(other.id, id, patch).await,
        Err(DbError::Forbidden(_))
    ));
    assert!(matches!(
        repo.add_instruction(other.id, id, None, InstructionContents::new("eat").unwrap())
            .await,
        Err(DbError::Forbidden(_))
    ));
    assert!(matches!(
        repo.delete(other.id, id).await,
        Err(DbError::Forbidden(_))
    ));

    let unchanged = repo.get(id).await.unwrap();
    assert_eq!(unchanged.recipe.name, "Pancakes");
    assert_eq!(unchanged.instructions.len(), 4);
}

#[tokio::test]
#[ignore = "requires database"]
async fn missing_recipe_is_not_found_before_ownership() {
    let pool = common::pool().await;
    let someone = common::user(&pool, "cook").await;
    let repo = RecipeRepo::new(&pool);

    assert!(matches!(
        repo.delete(someone.id, i64::MAX).await,
        Err(DbError::NotFound { resource: "recipe", .. })
    ));
    assert!(matches!(
        repo.get(i64::MAX).await,
        Err(DbError::NotFound { .. })
    ));
}

#[tokio::test]
#[ignore = "requires database"]
async fn children_of_another_recipe_conflict() {
    let pool = common::pool().await;
    let owner = common::user(&pool, "cook").await;
    let repo = RecipeRepo::new(&pool);
    let first = repo.create(owner.id, pancakes()).await.unwrap();
    let second = repo.create(owner.id, pancakes()).await.unwrap();

    let foreign_ingredient = second.ingredients[0].id;
    let patch = IngredientPatch::new(Some("sugar"), None, None).unwrap();
    assert!(matches!(
        repo.update_ingredient(owner.id, first.recipe.id, foreign_ingredient, patch)
            .await,
        Err(DbError::Conflict(_))
    ));

    let foreign_instruction = second.instructions[0].id;
    assert!(matches!(
        repo.delete_instruction(owner.id, first.recipe.id, foreign_instruction)
            .await,
        Err(DbError::Conflict(_))
    ));

    let swap = StepSwap::new(first.instructions[0].id, foreign_instruction).unwrap();
    assert!(matches!(
        repo.swap_instructions(owner.id, first.recipe.id, swap).await,
        Err(DbError::Conflict(_))
    ));

    assert_eq!(instruction_rows(&pool, second.recipe.id).await, 4);
    let untouched = repo.get(second.recipe.id).await.unwrap();
    assert_eq!(untouched.ingredients[0].name, "flour");
}

#[tokio::test]
#[ignore = "requires database"]
async fn ingredient_lifecycle() {
    let pool = common::pool().await;
    let owner = common::user(&pool, "cook").await;
    let repo = RecipeRepo::new(&pool);
    let recipe = repo.create(owner.id, pancakes()).await.unwrap();
    let id = recipe.recipe.id;

    let added = repo
        .add_ingredient(owner.id, id, IngredientDraft::new("egg", "2", "").unwrap())
        .await
        .unwrap();
    let egg = added.ingredients.last().unwrap().clone();
    assert_eq!(egg.name, "egg");

    let patch = IngredientPatch::new(None, Some("3"), None).unwrap();
    let updated = repo.update_ingredient(owner.id, id, egg.id, patch).await.unwrap();
    let egg_after = updated.ingredients.iter().find(|i| i.id == egg.id).unwrap();
    assert_eq!(egg_after.name, "egg");
    assert_eq!(egg_after.quantity, "3");

    let removed = repo.delete_ingredient(owner.id, id, egg.id).await.unwrap();
    assert!(removed.ingredients.iter().all(|i| i.id != egg.id));

    assert!(matches!(
        repo.delete_ingredient(owner.id, id, egg.id).await,
        Err(DbError::NotFound { resource: "ingredient", .. })
    ));
}

#[tokio::test]
#[ignore = "requires database"]
async fn instruction_steps_stay_contiguous() {
    let pool = common::pool().await;
    let owner = common::user(&pool, "cook").await;
    let repo = RecipeRepo::new(&pool);
    let recipe = repo.create(owner.id, pancakes()).await.unwrap();
    let id = recipe.recipe.id;

    let inserted = repo
        .add_instruction(owner.id, id, Some(2), InstructionContents::new("sift").unwrap())
        .await
        .unwrap();
    assert_eq!(
        steps(&inserted),
        vec![(1, "whisk"), (2, "sift"), (3, "rest"), (4, "fry"), (5, "serve")]
    );

    let appended = repo
        .add_instruction(owner.id, id, Some(99), InstructionContents::new("wash up").unwrap())
        .await
        .unwrap();
    assert_eq!(appended.instructions.last().unwrap().step, 6);

    let whisk = appended.instructions[0].id;
    let serve = appended.instructions[4].id;
    let swapped = repo
        .swap_instructions(owner.id, id, StepSwap::new(whisk, serve).unwrap())
        .await
        .unwrap();
    assert_eq!(swapped.instructions[0].contents, "serve");
    assert_eq!(swapped.instructions[4].contents, "whisk");

    let rest = swapped.instructions[2].id;
    let deleted = repo.delete_instruction(owner.id, id, rest).await.unwrap();
    let numbered: Vec<i32> = deleted.instructions.iter().map(|i| i.step).collect();
    assert_eq!(numbered, vec![1, 2, 3, 4, 5]);
    assert_eq!(deleted.instructions[2].contents, "fry");

    let fry = deleted.instructions[2].id;
    let edited = repo
        .update_instruction(owner.id, id, fry, InstructionContents::new("fry gently").unwrap())
        .await
        .unwrap();
    assert_eq!(edited.instructions[2].contents, "fry gently");
    assert_eq!(edited.instructions[2].step, 3);
}

#[tokio::test]
#[ignore = "requires database"]
async fn swap_with_missing_instruction_is_not_found() {
    let pool = common::pool().await;
    let owner = common::user(&pool, "cook").await;
    let repo = RecipeRepo::new(&pool);
    let recipe = repo.create(owner.id, pancakes()).await.unwrap();

    let swap = StepSwap::new(recipe.instructions[0].id, i64::MAX).unwrap();
    assert!(matches!(
        repo.swap_instructions(owner.id, recipe.recipe.id, swap).await,
        Err(DbError::NotFound { resource: "instruction", .. })
    ));
}

#[tokio::test]
#[ignore = "requires database"]
async fn tag_links_are_shared_between_views() {
    let pool = common::pool().await;
    let owner = common::user(&pool, "cook").await;
    let repo = RecipeRepo::new(&pool);
    let tags = TagRepo::new(&pool);
    let recipe = repo.create(owner.id, pancakes()).await.unwrap();
    let id = recipe.recipe.id;
    let tag = tags
        .create(TagLabel::new(&common::unique_label("breakfast")).unwrap())
        .await
        .unwrap();

    let tagged = repo.add_tag(owner.id, id, tag.id).await.unwrap();
    assert_eq!(tagged.tags.len(), 1);
    assert_eq!(tagged.tags[0].tag, tag.tag);

    let view = tags.get(tag.id).await.unwrap();
    assert_eq!(view.recipes.len(), 1);
    assert_eq!(view.recipes[0].id, id);

    assert!(matches!(
        repo.add_tag(owner.id, id, tag.id).await,
        Err(DbError::Conflict(_))
    ));
    assert!(matches!(
        repo.add_tag(owner.id, id, i64::MAX).await,
        Err(DbError::NotFound { resource: "tag", .. })
    ));

    tags.delete(tag.id).await.unwrap();
    let after = repo.get(id).await.unwrap();
    assert!(after.tags.is_empty());
    assert!(matches!(
        repo.remove_tag(owner.id, id, tag.id).await,
        Err(DbError::NotFound { .. })
    ));
}

#[tokio::test]
#[ignore = "requires database"]
async fn remove_tag_unlinks_only_that_recipe() {
    let pool = common::pool().await;
    let owner = common::user(&pool, "cook").await;
    let repo = RecipeRepo::new(&pool);
    let tags = TagRepo::new(&pool);
    let a = repo.create(owner.id, pancakes()).await.unwrap();
    let b = repo.create(owner.id, pancakes()).await.unwrap();
    let tag = tags
        .create(TagLabel::new(&common::unique_label("sweet")).unwrap())
        .await
        .unwrap();

    repo.add_tag(owner.id, a.recipe.id, tag.id).await.unwrap();
    repo.add_tag(owner.id, b.recipe.id, tag.id).await.unwrap();
    let after = repo.remove_tag(owner.id, a.recipe.id, tag.id).await.unwrap();
    assert!(after.tags.is_empty());

    let view = tags.get(tag.id).await.unwrap();
    let ids: Vec<i64> = view.recipes.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![b.recipe.id]);
}

#[tokio::test]
#[ignore = "requires database"]
async fn delete_removes_every_child_row() {
    let pool = common::pool().await;
    let owner = common::user(&pool, "cook").await;
    let repo = RecipeRepo::new(&pool);
    let recipe = repo.create(owner.id, pancakes()).await.unwrap();
    let id = recipe.recipe.id;

    repo.delete(owner.id, id).await.unwrap();

    assert_eq!(instruction_rows(&pool, id).await, 0);
    assert!(matches!(repo.get(id).await, Err(DbError::NotFound { .. })));
}

#[tokio::test]
#[ignore = "requires database"]
async fn timed_out_create_commits_nothing() {
    let pool = common::pool().await;
    let owner = common::user(&pool, "cook").await;

    // Holding the owner row blocks the recipe insert on its foreign key.
    let mut blocker = pool.begin().await.unwrap();
    sqlx::query("SELECT id FROM users WHERE id = $1 FOR UPDATE")
        .bind(owner.id)
        .execute(&mut *blocker)
        .await
        .unwrap();

    let repo = RecipeRepo::new(&pool).with_timeout(Duration::from_millis(200));
    let result = repo.create(owner.id, pancakes()).await;
    assert!(matches!(
        result,
        Err(DbError::Timeout { operation: "create_recipe", .. })
    ));
    blocker.rollback().await.unwrap();

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM recipes WHERE user_id = $1")
        .bind(owner.id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 0);
}

#[tokio::test]
#[ignore = "requires database"]
async fn user_listing_is_paginated_newest_first() {
    let pool = common::pool().await;
    let owner = common::user(&pool, "cook").await;
    let repo = RecipeRepo::new(&pool);
    let mut ids = Vec::new();
    for _ in 0..3 {
        ids.push(repo.create(owner.id, pancakes()).await.unwrap().recipe.id);
    }

    let page = repo
        .list_for_user(owner.id, recipebox_server::models::Pagination::new(1, 2))
        .await
        .unwrap();
    assert_eq!(page.total, 3);
    assert_eq!(page.items.len(), 2);
    assert_eq!(page.items[0].recipe.id, ids[2]);
    assert_eq!(page.items[0].instructions.len(), 4);
}
