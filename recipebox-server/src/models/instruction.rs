//! Instruction contents and step ordering
//!
//! The steps of a recipe's instructions always form `1..=n`. The helpers
//! here compute the step numbers the repository writes so that every
//! mutation preserves that shape.

use super::validation::check_len;
use super::ValidationError;

const MAX_CONTENTS_LEN: usize = 4096;

/// Validated instruction text (trimmed, non-empty)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstructionContents(String);

impl InstructionContents {
    pub fn new(s: &str) -> Result<Self, ValidationError> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::Empty { field: "contents" });
        }
        check_len("contents", trimmed, MAX_CONTENTS_LEN)?;
        Ok(Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Instruction as submitted by a client; `step` is a position hint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstructionDraft {
    pub step: Option<i32>,
    pub contents: InstructionContents,
}

/// Assign contiguous steps `1..=n` to submitted instructions.
///
/// Instructions are stably sorted by their submitted step; those without a
/// step keep their submission order after all numbered ones.
pub fn number_steps(mut drafts: Vec<InstructionDraft>) -> Vec<(i32, InstructionContents)> {
    drafts.sort_by_key(|d| d.step.unwrap_or(i32::MAX));
    drafts
        .into_iter()
        .zip(1..)
        .map(|(draft, step)| (step, draft.contents))
        .collect()
}

/// Two distinct instructions whose steps are to be exchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepSwap {
    first: i64,
    second: i64,
}

impl StepSwap {
    pub fn new(first: i64, second: i64) -> Result<Self, ValidationError> {
        if first == second {
            return Err(ValidationError::SameItem {
                field: "instruction",
            });
        }
        Ok(Self { first, second })
    }

    pub fn first(&self) -> i64 {
        self.first
    }

    pub fn second(&self) -> i64 {
        self.second
    }
}

/// Step at which a new instruction lands given `count` existing ones.
///
/// A requested step inside `1..=count + 1` is honoured (later steps shift
/// up); anything else appends.
pub fn insertion_step(requested: Option<i32>, count: i64) -> i32 {
    let append = i32::try_from(count.saturating_add(1)).unwrap_or(i32::MAX);
    match requested {
        Some(step) if (1..=append).contains(&step) => step,
        _ => append,
    }
}
