//! Domain models with validation at construction
//!
//! All user input is validated when creating these types.
//! Invalid input returns ValidationError, not panic.

pub mod account;
pub mod instruction;
pub mod pagination;
pub mod recipe;
pub mod tag;
pub mod validation;

pub use account::{Password, Username};
pub use instruction::{
    insertion_step, number_steps, InstructionContents, InstructionDraft, StepSwap,
};
pub use pagination::{Paginated, Pagination, PaginationParams};
pub use recipe::{IngredientDraft, IngredientPatch, NewRecipe, RecipeName, RecipePatch};
pub use tag::TagLabel;
pub use validation::ValidationError;
