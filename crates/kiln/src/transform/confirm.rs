//! Explicit yes/no decisions for destructive operations.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Rows affected by removing missing values from a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NullRemovalPreview {
    pub current_rows: usize,
    pub rows_to_remove: usize,
    pub resulting_rows: usize,
}

impl fmt::Display for NullRemovalPreview {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Current rows: {}\nRows to remove: {}\nResulting rows: {}",
            self.current_rows, self.rows_to_remove, self.resulting_rows
        )
    }
}

/// What the caller is asked to confirm.
#[derive(Debug, Clone, Copy)]
pub enum Prompt<'a> {
    /// Remove rows with missing values in a column.
    RemoveNulls {
        column: &'a str,
        preview: NullRemovalPreview,
    },
    /// Delete a custom transform from the store.
    DeleteTransform { name: &'a str },
}

impl fmt::Display for Prompt<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Prompt::RemoveNulls { column, preview } => write!(
                f,
                "Remove rows with missing values in '{}'?\n{}",
                column, preview
            ),
            Prompt::DeleteTransform { name } => {
                write!(f, "Are you sure you want to delete the function '{}'?", name)
            }
        }
    }
}

/// Decides a [`Prompt`]. Destructive operations take one of these instead
/// of a flag so the decision is always made explicitly.
pub trait Confirm {
    fn confirm(&mut self, prompt: &Prompt<'_>) -> bool;
}

/// A fixed answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Answer {
    Yes,
    No,
}

impl Confirm for Answer {
    fn confirm(&mut self, _prompt: &Prompt<'_>) -> bool {
        *self == Answer::Yes
    }
}

impl<F> Confirm for F
where
    F: FnMut(&Prompt<'_>) -> bool,
{
    fn confirm(&mut self, prompt: &Prompt<'_>) -> bool {
        self(prompt)
    }
}
