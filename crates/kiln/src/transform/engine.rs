//! Applies transforms to one column of the shared dataset, with undo.

use serde::{Deserialize, Serialize};

use super::builtin::RemoveNulls;
use super::confirm::{Confirm, NullRemovalPreview, Prompt};
use super::{Transform, TransformContext};
use crate::error::{KilnError, Result};
use crate::input::DataTable;
use crate::schema::ColumnSummary;
use crate::state::DatasetState;

/// Full dataset snapshots, most recent last.
#[derive(Debug, Clone, Default)]
pub struct UndoHistory {
    snapshots: Vec<DataTable>,
}

impl UndoHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, snapshot: DataTable) {
        self.snapshots.push(snapshot);
    }

    pub fn pop(&mut self) -> Option<DataTable> {
        self.snapshots.pop()
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn clear(&mut self) {
        self.snapshots.clear();
    }
}

/// What a successful apply changed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplyReport {
    pub transform: String,
    pub column: String,
    pub rows_before: usize,
    pub rows_after: usize,
    pub columns_added: Vec<String>,
    pub columns_removed: Vec<String>,
    /// Summary of the session column, unless the transform removed it.
    pub summary: Option<ColumnSummary>,
}

impl ApplyReport {
    pub fn rows_removed(&self) -> usize {
        self.rows_before.saturating_sub(self.rows_after)
    }
}

/// Result of [`ColumnSession::undo`].
#[derive(Debug, Clone)]
pub enum UndoOutcome {
    /// The previous snapshot is the shared dataset again.
    Restored {
        summary: Option<ColumnSummary>,
        remaining: usize,
    },
    /// The history was empty; nothing changed.
    NothingToUndo,
}

/// Result of [`ColumnSession::remove_nulls`].
#[derive(Debug, Clone)]
pub enum NullRemoval {
    /// The column has no missing values; nothing changed.
    NoNulls,
    /// The caller declined; nothing changed.
    Cancelled(NullRemovalPreview),
    Removed(ApplyReport),
}

/// An editing session on one column.
///
/// The session holds the only mutable borrow of the dataset state while it
/// lives, and owns the undo history, which ends with the session.
pub struct ColumnSession<'a> {
    state: &'a mut DatasetState,
    column: String,
    history: UndoHistory,
}

impl<'a> ColumnSession<'a> {
    /// Start a session on a column of the dataset.
    pub fn open(state: &'a mut DatasetState, column: &str) -> Result<Self> {
        if !state.table().has_column(column) {
            return Err(KilnError::NotFound(format!("column '{}'", column)));
        }
        Ok(Self {
            state,
            column: column.to_string(),
            history: UndoHistory::new(),
        })
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn state(&self) -> &DatasetState {
        &*self.state
    }

    pub fn history(&self) -> &UndoHistory {
        &self.history
    }

    /// Summary of the session column.
    pub fn summary(&self) -> Result<ColumnSummary> {
        self.state.column_summary(&self.column)
    }

    /// Apply a transform to the session column.
    ///
    /// The current dataset is snapshotted first. On failure the snapshot
    /// stays in the history and the shared dataset is untouched.
    /// Transforms that need a confirmation are refused here; see
    /// [`ColumnSession::remove_nulls`].
    pub fn apply(
        &mut self,
        transform: &dyn Transform,
        ctx: &TransformContext<'_>,
    ) -> Result<ApplyReport> {
        if transform.requires_confirmation() {
            return Err(KilnError::Validation(format!(
                "'{}' needs a confirmation; use remove_nulls with a Confirm instead of apply",
                transform.name()
            )));
        }
        self.apply_unchecked(transform, ctx)
    }

    fn apply_unchecked(
        &mut self,
        transform: &dyn Transform,
        ctx: &TransformContext<'_>,
    ) -> Result<ApplyReport> {
        let before = self.state.table().clone();
        self.history.push(before.clone());
        log::debug!(
            "snapshot pushed before {} on '{}' (depth {})",
            transform.name(),
            self.column,
            self.history.len()
        );

        let output = match transform.apply(ctx, before, &self.column) {
            Ok(Some(table)) => table,
            Ok(None) => {
                log::warn!("{} returned no table", transform.name());
                return Err(KilnError::ContractViolation {
                    transform: transform.name().to_string(),
                });
            }
            Err(err) => {
                log::warn!("{} failed on '{}': {}", transform.name(), self.column, err);
                return Err(match err {
                    KilnError::RuntimeTransform { .. } | KilnError::ContractViolation { .. } => err,
                    other => KilnError::runtime(transform.name(), other.to_string()),
                });
            }
        };

        let previous = self.state.table();
        let rows_before = previous.row_count();
        let columns_added = output
            .headers
            .iter()
            .filter(|h| !previous.has_column(h))
            .cloned()
            .collect();
        let columns_removed = previous
            .headers
            .iter()
            .filter(|h| !output.has_column(h))
            .cloned()
            .collect();
        let rows_after = output.row_count();

        self.state.replace(output);

        Ok(ApplyReport {
            transform: transform.name().to_string(),
            column: self.column.clone(),
            rows_before,
            rows_after,
            columns_added,
            columns_removed,
            summary: self.summary().ok(),
        })
    }

    /// Restore the most recent snapshot.
    pub fn undo(&mut self) -> UndoOutcome {
        match self.history.pop() {
            Some(snapshot) => {
                self.state.replace(snapshot);
                log::debug!(
                    "restored snapshot for '{}' ({} left)",
                    self.column,
                    self.history.len()
                );
                UndoOutcome::Restored {
                    summary: self.summary().ok(),
                    remaining: self.history.len(),
                }
            }
            None => UndoOutcome::NothingToUndo,
        }
    }

    /// How many rows removing missing values would drop.
    pub fn null_removal_preview(&self) -> Result<NullRemovalPreview> {
        let table = self.state.table();
        let col = table
            .column_index(&self.column)
            .ok_or_else(|| KilnError::NotFound(format!("column '{}'", self.column)))?;
        let current_rows = table.row_count();
        let rows_to_remove = table.null_count(col);
        Ok(NullRemovalPreview {
            current_rows,
            rows_to_remove,
            resulting_rows: current_rows - rows_to_remove,
        })
    }

    /// Drop rows missing a value in the session column, after the caller
    /// confirms the preview.
    pub fn remove_nulls(
        &mut self,
        ctx: &TransformContext<'_>,
        confirm: &mut dyn Confirm,
    ) -> Result<NullRemoval> {
        let preview = self.null_removal_preview()?;
        if preview.rows_to_remove == 0 {
            return Ok(NullRemoval::NoNulls);
        }

        let prompt = Prompt::RemoveNulls {
            column: &self.column,
            preview,
        };
        if !confirm.confirm(&prompt) {
            return Ok(NullRemoval::Cancelled(preview));
        }

        self.apply_unchecked(&RemoveNulls, ctx).map(NullRemoval::Removed)
    }
}

impl Drop for ColumnSession<'_> {
    fn drop(&mut self) {
        if !self.history.is_empty() {
            log::debug!(
                "closing session on '{}', discarding {} snapshots",
                self.column,
                self.history.len()
            );
        }
    }
}
