//! Repository layer
//!
//! Each repository borrows the pool and maps rows to records. Domain
//! rules that span rows (ownership, step order) live in [`recipes`].

pub mod files;
pub mod recipes;
pub mod sessions;
pub mod tags;
pub mod users;

pub use files::{FileRecord, FileRepo};
pub use recipes::{Ingredient, Instruction, Recipe, RecipeDetail, RecipeRepo, RecipeTag};
pub use sessions::{Session, SessionRepo, SessionStatus};
pub use tags::{Tag, TagRepo, TagWithRecipes, TaggedRecipe};
pub use users::{Credentials, User, UserProfile, UserRepo};
