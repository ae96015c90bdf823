//! Runs compiled transform bodies.

use indexmap::IndexMap;

use super::ast::{Call, Returned, Stmt, Value};
use crate::error::{KilnError, Result};
use crate::input::DataTable;
use crate::transform::primitives::{self, Args};
use crate::transform::{FillMethod, FillMissingValues, Transform, TransformContext};

/// A compiled custom transform.
#[derive(Debug, Clone)]
pub struct ScriptTransform {
    name: String,
    docstring: Option<String>,
    statements: Vec<Stmt>,
    source: String,
}

impl ScriptTransform {
    pub(crate) fn new(
        name: String,
        docstring: Option<String>,
        statements: Vec<Stmt>,
        source: String,
    ) -> Self {
        Self {
            name,
            docstring,
            statements,
            source,
        }
    }

    /// The source text the transform was compiled from.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Every call in the body, in order.
    pub fn calls(&self) -> impl Iterator<Item = &Call> {
        self.statements.iter().filter_map(|stmt| match stmt {
            Stmt::Assign(call) => Some(call),
            Stmt::Return {
                value: Returned::Call(call),
                ..
            } => Some(call),
            _ => None,
        })
    }

    /// Check every callee against the names that can be called.
    ///
    /// Catalog transforms take no arguments beyond the column, except
    /// `fill_missing_values`, which takes its method.
    pub fn check_calls(&self, is_known: impl Fn(&str) -> bool) -> Result<()> {
        for call in self.calls() {
            let error = |message: String| KilnError::Script {
                function: self.name.clone(),
                line: call.line,
                message,
            };
            if primitives::lookup(&call.callee).is_some() {
                continue;
            }
            if !is_known(&call.callee) {
                return Err(error(format!("unknown transform '{}'", call.callee)));
            }
            let extra = call.args.len() + call.kwargs.len();
            if call.callee == "fill_missing_values" {
                let keyword_ok = call.kwargs.keys().all(|k| k == "method");
                if extra > 1 || !keyword_ok {
                    return Err(error(
                        "fill_missing_values takes only a method argument".to_string(),
                    ));
                }
            } else if extra > 0 {
                return Err(error(format!(
                    "'{}' takes only (dataset, column)",
                    call.callee
                )));
            }
        }
        Ok(())
    }

    /// Reject calls to transforms that only run after the user confirms
    /// them. A script body has no way to ask.
    pub fn check_unconfirmed_calls(
        &self,
        needs_confirmation: impl Fn(&str) -> bool,
    ) -> Result<()> {
        match self.calls().find(|call| needs_confirmation(&call.callee)) {
            Some(call) => Err(KilnError::Script {
                function: self.name.clone(),
                line: call.line,
                message: format!(
                    "'{}' needs a confirmation and cannot be called from a custom transform",
                    call.callee
                ),
            }),
            None => Ok(()),
        }
    }

    fn evaluate(&self, call: &Call, column: &str) -> (Vec<Value>, IndexMap<String, Value>) {
        let args = call.args.iter().map(|e| e.eval(column)).collect();
        let kwargs = call
            .kwargs
            .iter()
            .map(|(k, e)| (k.clone(), e.eval(column)))
            .collect();
        (args, kwargs)
    }

    fn invoke(
        &self,
        ctx: &TransformContext<'_>,
        dataset: DataTable,
        call: &Call,
        column: &str,
    ) -> Result<DataTable> {
        let target = call.column.render(column);
        let (args, kwargs) = self.evaluate(call, column);

        if let Some(primitive) = primitives::lookup(&call.callee) {
            let args = Args::new(&call.callee, &args, &kwargs);
            return primitive(dataset, &target, &args);
        }

        let nested = ctx.nested(&self.name)?;
        let output = if call.callee == "fill_missing_values" {
            let method = match args.first().or_else(|| kwargs.get("method")) {
                None => FillMethod::default(),
                Some(Value::Str(s)) => s
                    .parse::<FillMethod>()
                    .map_err(|e: KilnError| KilnError::runtime(&self.name, e.to_string()))?,
                Some(other) => {
                    return Err(KilnError::runtime(
                        &self.name,
                        format!("fill method must be a string, got {}", other),
                    ));
                }
            };
            FillMissingValues::new(method).apply(&nested, dataset, &target)?
        } else {
            let transform = ctx.resolve(&call.callee).ok_or_else(|| {
                KilnError::runtime(
                    &self.name,
                    format!("line {}: unknown transform '{}'", call.line, call.callee),
                )
            })?;
            transform.apply(&nested, dataset, &target)?
        };

        output.ok_or_else(|| {
            KilnError::runtime(
                &self.name,
                format!("line {}: '{}' returned no table", call.line, call.callee),
            )
        })
    }
}

impl Transform for ScriptTransform {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        self.docstring.as_deref().unwrap_or("Custom transform")
    }

    fn apply(
        &self,
        ctx: &TransformContext<'_>,
        dataset: DataTable,
        column: &str,
    ) -> Result<Option<DataTable>> {
        let mut current = dataset;
        for stmt in &self.statements {
            match stmt {
                Stmt::Assign(call) => {
                    current = self.invoke(ctx, current, call, column)?;
                }
                Stmt::Return { value, .. } => {
                    return match value {
                        Returned::Dataset => Ok(Some(current)),
                        Returned::Call(call) => self.invoke(ctx, current, call, column).map(Some),
                        Returned::Nothing => Ok(None),
                    };
                }
                Stmt::Log { level, message } => {
                    let text = match message.eval(column) {
                        Value::Str(s) => s,
                        other => other.to_string(),
                    };
                    log::log!(target: "kiln::script", level.as_log(), "{}: {}", self.name, text);
                }
                Stmt::Raise {
                    kind,
                    message,
                    line,
                } => {
                    let text = match message.eval(column) {
                        Value::Str(s) => s,
                        other => other.to_string(),
                    };
                    return Err(KilnError::runtime(
                        &self.name,
                        format!("line {}: {}: {}", line, kind, text),
                    ));
                }
                Stmt::Pass => {}
            }
        }
        // Falling off the end returns nothing
        Ok(None)
    }
}
