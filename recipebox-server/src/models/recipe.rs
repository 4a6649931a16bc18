//! Recipe and ingredient input validation

use super::validation::check_len;
use super::ValidationError;

const MAX_NAME_LEN: usize = 256;
const MAX_DESCRIPTION_LEN: usize = 4096;
const MAX_INGREDIENT_NAME_LEN: usize = 128;
const MAX_MEASURE_LEN: usize = 64;

/// Validated recipe name (trimmed, non-empty)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeName(String);

impl RecipeName {
    /// # Example
    /// ```
    /// use recipebox_server::models::RecipeName;
    ///
    /// assert_eq!(RecipeName::new("  Pancakes ").unwrap().as_str(), "Pancakes");
    /// assert!(RecipeName::new("   ").is_err());
    /// ```
    pub fn new(s: &str) -> Result<Self, ValidationError> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::Empty { field: "name" });
        }
        check_len("name", trimmed, MAX_NAME_LEN)?;
        Ok(Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Free-form recipe description; empty is allowed.
pub fn validate_description(s: &str) -> Result<String, ValidationError> {
    check_len("description", s, MAX_DESCRIPTION_LEN)?;
    Ok(s.to_owned())
}

/// New recipe with nested ingredients and instructions.
#[derive(Debug, Clone)]
pub struct NewRecipe {
    pub name: RecipeName,
    pub description: String,
    pub ingredients: Vec<IngredientDraft>,
    pub instructions: Vec<super::InstructionDraft>,
}

/// Partial update of a recipe's own fields.
///
/// Empty strings mean "leave unchanged", matching the form semantics
/// of the web client.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipePatch {
    pub name: Option<RecipeName>,
    pub description: Option<String>,
}

impl RecipePatch {
    pub fn new(name: Option<&str>, description: Option<&str>) -> Result<Self, ValidationError> {
        let name = non_blank(name).map(RecipeName::new).transpose()?;
        let description = non_blank(description)
            .map(validate_description)
            .transpose()?;

        if name.is_none() && description.is_none() {
            return Err(ValidationError::NoChanges {
                fields: "name or description",
            });
        }
        Ok(Self { name, description })
    }
}

/// Ingredient as submitted by a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngredientDraft {
    pub name: String,
    pub quantity: String,
    pub unit: String,
}

impl IngredientDraft {
    pub fn new(name: &str, quantity: &str, unit: &str) -> Result<Self, ValidationError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::Empty {
                field: "ingredient name",
            });
        }
        let (quantity, unit) = (quantity.trim(), unit.trim());
        check_len("ingredient name", name, MAX_INGREDIENT_NAME_LEN)?;
        check_len("quantity", quantity, MAX_MEASURE_LEN)?;
        check_len("unit", unit, MAX_MEASURE_LEN)?;

        Ok(Self {
            name: name.to_owned(),
            quantity: quantity.to_owned(),
            unit: unit.to_owned(),
        })
    }
}

/// Partial update of an ingredient; blank fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngredientPatch {
    pub name: Option<String>,
    pub quantity: Option<String>,
    pub unit: Option<String>,
}

impl IngredientPatch {
    pub fn new(
        name: Option<&str>,
        quantity: Option<&str>,
        unit: Option<&str>,
    ) -> Result<Self, ValidationError> {
        let patch = Self {
            name: non_blank(name).map(|s| s.trim().to_owned()),
            quantity: non_blank(quantity).map(|s| s.trim().to_owned()),
            unit: non_blank(unit).map(|s| s.trim().to_owned()),
        };

        if patch.name.is_none() && patch.quantity.is_none() && patch.unit.is_none() {
            return Err(ValidationError::NoChanges {
                fields: "name, quantity or unit",
            });
        }
        if let Some(name) = &patch.name {
            check_len("ingredient name", name, MAX_INGREDIENT_NAME_LEN)?;
        }
        if let Some(quantity) = &patch.quantity {
            check_len("quantity", quantity, MAX_MEASURE_LEN)?;
        }
        if let Some(unit) = &patch.unit {
            check_len("unit", unit, MAX_MEASURE_LEN)?;
        }
        Ok(patch)
    }

    /// Apply onto stored values, returning the merged `(name, quantity, unit)`.
    pub fn merge(&self, name: &str, quantity: &str, unit: &str) -> (String, String, String) {
        (
            self.name.clone().unwrap_or_else(|| name.to_owned()),
            self.quantity.clone().unwrap_or_else(|| quantity.to_owned()),
            self.unit.clone().unwrap_or_else(|| unit.to_owned()),
        )
    }
}

fn non_blank(s: Option<&str>) -> Option<&str> {
    s.filter(|v| !v.trim().is_empty())
}
