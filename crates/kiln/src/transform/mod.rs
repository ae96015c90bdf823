//! Column transforms and the engine that applies them.
//!
//! Every transform, built-in or user-authored, has the same contract: it
//! receives a dataset and a column name and returns a dataset. Returning no
//! table (`Ok(None)`) is a contract violation that the engine reports
//! without touching the shared dataset.

mod builtin;
mod confirm;
mod engine;
pub mod primitives;
mod survey;

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::TransformOptions;
use crate::error::{KilnError, Result};
use crate::input::DataTable;

pub use builtin::{
    ConvertToDatetime, ConvertToNumeric, EncodeCategorical, FillMethod, FillMissingValues,
    RemoveNulls, RemoveOutliers, builtin_transforms,
};
pub use confirm::{Answer, Confirm, NullRemovalPreview, Prompt};
pub use engine::{ApplyReport, ColumnSession, NullRemoval, UndoHistory, UndoOutcome};
pub use survey::{
    CalculateAge, NormalizeBdate, NormalizeEducationForm, SurveyColumns, SurveyPipeline,
    TransformEducationStatus, survey_transforms,
};

/// The fixed parameter list every transform is declared with.
pub const SIGNATURE: &str = "(dataset, column)";

/// A function from `(dataset, column)` to a new dataset.
pub trait Transform: Send + Sync {
    /// Unique name the transform is registered under.
    fn name(&self) -> &str;

    /// One-line description for listings.
    fn description(&self) -> &str {
        ""
    }

    /// Transforms that drop data only run through a confirmation step,
    /// never through a plain apply.
    fn requires_confirmation(&self) -> bool {
        false
    }

    /// Apply the transform. `Ok(None)` means the transform produced no
    /// table.
    fn apply(
        &self,
        ctx: &TransformContext<'_>,
        dataset: DataTable,
        column: &str,
    ) -> Result<Option<DataTable>>;
}

/// Looks up transforms by name while a transform is running, so that
/// custom transforms can call each other.
pub trait Resolver {
    fn resolve(&self, name: &str) -> Option<Arc<dyn Transform>>;
}

/// Where a transform comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformKind {
    /// Generic column transform shipped with kiln.
    Builtin,
    /// Transform for the known survey schema.
    Survey,
    /// User-authored transform from the text store.
    Custom,
}

impl fmt::Display for TransformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransformKind::Builtin => write!(f, "builtin"),
            TransformKind::Survey => write!(f, "survey"),
            TransformKind::Custom => write!(f, "custom"),
        }
    }
}

/// A catalog record describing one available transform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformInfo {
    pub name: String,
    pub signature: String,
    pub kind: TransformKind,
    pub description: String,
}

impl TransformInfo {
    /// Describe a transform object.
    pub fn of(transform: &dyn Transform, kind: TransformKind) -> Self {
        Self {
            name: transform.name().to_string(),
            signature: SIGNATURE.to_string(),
            kind,
            description: transform.description().to_string(),
        }
    }
}

/// Everything a transform may consult besides its inputs.
#[derive(Clone, Copy)]
pub struct TransformContext<'a> {
    options: &'a TransformOptions,
    resolver: Option<&'a dyn Resolver>,
    depth: usize,
}

impl<'a> TransformContext<'a> {
    /// A context without name resolution.
    pub fn new(options: &'a TransformOptions) -> Self {
        Self {
            options,
            resolver: None,
            depth: 0,
        }
    }

    /// Attach a resolver for nested calls.
    pub fn with_resolver(mut self, resolver: &'a dyn Resolver) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Transform constants.
    pub fn options(&self) -> &'a TransformOptions {
        self.options
    }

    /// Current call nesting.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Look up a transform by name.
    pub fn resolve(&self, name: &str) -> Option<Arc<dyn Transform>> {
        self.resolver.and_then(|r| r.resolve(name))
    }

    /// Context for a call made from inside a transform.
    pub fn nested(&self, caller: &str) -> Result<Self> {
        if self.depth + 1 > self.options.max_call_depth {
            return Err(KilnError::runtime(
                caller,
                format!(
                    "maximum transform call depth of {} exceeded",
                    self.options.max_call_depth
                ),
            ));
        }
        Ok(Self {
            depth: self.depth + 1,
            ..*self
        })
    }
}

/// Adapter that turns a closure into a [`Transform`].
pub struct FnTransform<F> {
    name: String,
    func: F,
}

impl<F> FnTransform<F>
where
    F: Fn(DataTable, &str) -> Result<Option<DataTable>> + Send + Sync,
{
    /// Wrap a closure under a name.
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }
}

impl<F> Transform for FnTransform<F>
where
    F: Fn(DataTable, &str) -> Result<Option<DataTable>> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(
        &self,
        _ctx: &TransformContext<'_>,
        dataset: DataTable,
        column: &str,
    ) -> Result<Option<DataTable>> {
        (self.func)(dataset, column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_depth_limit() {
        let options = TransformOptions {
            max_call_depth: 2,
            ..TransformOptions::default()
        };
        let ctx = TransformContext::new(&options);
        let one = ctx.nested("f").unwrap();
        let two = one.nested("f").unwrap();
        assert_eq!(two.depth(), 2);
        assert!(matches!(
            two.nested("f"),
            Err(KilnError::RuntimeTransform { .. })
        ));
    }

    #[test]
    fn test_fn_transform_passes_through() {
        let options = TransformOptions::default();
        let ctx = TransformContext::new(&options);
        let t = FnTransform::new("identity", |d, _c: &str| Ok(Some(d)));
        let table = DataTable::new(vec!["a".into()], vec![], b',');
        let out = t.apply(&ctx, table.clone(), "a").unwrap();
        assert_eq!(out, Some(table));
        assert_eq!(TransformInfo::of(&t, TransformKind::Custom).signature, SIGNATURE);
    }
}
