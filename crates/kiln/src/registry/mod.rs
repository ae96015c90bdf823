//! The registry of transforms, backed by the custom transform text store.
//!
//! Built-in and survey transforms are registered in code. Custom transforms
//! live in the text store; the in-memory table is always rebuilt from the
//! store text after a mutation, so the two never diverge.

mod store;

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;

use crate::error::{KilnError, Result};
use crate::script::{self, ScriptTransform};
use crate::transform::{
    Confirm, FillMissingValues, Prompt, Resolver, Transform, TransformInfo, TransformKind,
    builtin_transforms, primitives, survey_transforms,
};

pub use store::{Block, BlockKind, StoreDocument};

/// Preamble written to a store that does not exist yet.
pub const DEFAULT_PREAMBLE: &str = "\
# Custom transforms for kiln.
# Each function takes (dataset, column) and returns the dataset.";

/// Registry of every transform available by name.
pub struct TransformRegistry {
    path: PathBuf,
    document: StoreDocument,
    custom: IndexMap<String, Arc<ScriptTransform>>,
    builtins: Vec<Arc<dyn Transform>>,
    survey: Vec<Arc<dyn Transform>>,
}

impl TransformRegistry {
    /// A registry backed by the store at `path`, without loading it.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            document: StoreDocument::default(),
            custom: IndexMap::new(),
            builtins: builtin_transforms(),
            survey: survey_transforms(),
        }
    }

    /// Create a registry and load its store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let mut registry = Self::new(path);
        registry.load()?;
        Ok(registry)
    }

    /// Path of the backing store.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Re-read the store and rebuild the custom transform table.
    ///
    /// A missing store is empty. On error the previous table is kept.
    /// Returns the custom transform names in store order.
    pub fn load(&mut self) -> Result<Vec<String>> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(KilnError::io(&self.path, e)),
        };
        let document = StoreDocument::parse(&text);
        let custom = self.build(&document)?;

        log::debug!(
            "loaded {} custom transforms from '{}'",
            custom.len(),
            self.path.display()
        );
        self.document = document;
        self.custom = custom;
        Ok(self.names())
    }

    /// Custom transform names in store order.
    pub fn names(&self) -> Vec<String> {
        self.custom.keys().cloned().collect()
    }

    /// Whether a custom transform called `name` exists.
    pub fn contains(&self, name: &str) -> bool {
        self.custom.contains_key(name)
    }

    /// Whether `name` is taken by a built-in, survey transform or primitive.
    pub fn is_reserved(&self, name: &str) -> bool {
        self.fixed(name).is_some() || primitives::lookup(name).is_some()
    }

    /// Source text of a custom transform.
    pub fn source(&self, name: &str) -> Result<&str> {
        self.custom
            .get(name)
            .map(|t| t.source())
            .ok_or_else(|| not_found(name))
    }

    /// Every transform available by name: built-ins, then survey
    /// transforms, then custom transforms in store order.
    pub fn catalog(&self) -> Vec<TransformInfo> {
        let builtins = self
            .builtins
            .iter()
            .map(|t| TransformInfo::of(t.as_ref(), TransformKind::Builtin));
        let survey = self
            .survey
            .iter()
            .map(|t| TransformInfo::of(t.as_ref(), TransformKind::Survey));
        let custom = self
            .custom
            .values()
            .map(|t| TransformInfo::of(t.as_ref(), TransformKind::Custom));
        builtins.chain(survey).chain(custom).collect()
    }

    /// Look up a transform by name.
    ///
    /// `fill_missing_values` also accepts a method suffix, as in
    /// `fill_missing_values:mode`.
    pub fn resolve(&self, spec: &str) -> Result<Arc<dyn Transform>> {
        if let Some((base, method)) = spec.split_once(':') {
            if base != "fill_missing_values" {
                return Err(KilnError::Validation(format!(
                    "Only fill_missing_values takes a method, got '{}'",
                    spec
                )));
            }
            return Ok(Arc::new(FillMissingValues::new(method.trim().parse()?)));
        }
        if let Some(transform) = self.fixed(spec) {
            return Ok(Arc::clone(transform));
        }
        self.custom
            .get(spec)
            .map(|t| Arc::clone(t) as Arc<dyn Transform>)
            .ok_or_else(|| not_found(spec))
    }

    /// Register a new custom transform and persist it.
    pub fn add(&mut self, name: &str, source: &str) -> Result<()> {
        self.check_name(name, None)?;
        let source = normalize_source(source);
        let block = single_block(name, &source)?;

        let mut document = self.document_for_write();
        document.push(block);
        self.commit(document)?;
        log::info!("added custom transform '{}'", name);
        Ok(())
    }

    /// Replace the custom transform `old_name` with `source`, which may
    /// declare a new name. The block keeps its position in the store.
    pub fn edit(&mut self, old_name: &str, new_name: &str, source: &str) -> Result<()> {
        let index = self
            .document
            .position(old_name)
            .ok_or_else(|| not_found(old_name))?;
        self.check_name(new_name, Some(old_name))?;
        let source = normalize_source(source);
        let block = single_block(new_name, &source)?;

        let mut document = self.document.clone();
        document.replace(index, block);
        self.commit(document)?;
        if old_name == new_name {
            log::info!("edited custom transform '{}'", old_name);
        } else {
            log::info!("edited custom transform '{}' as '{}'", old_name, new_name);
        }
        Ok(())
    }

    /// Delete a custom transform after confirmation.
    ///
    /// Returns `false` when the confirmation was declined.
    pub fn delete(&mut self, name: &str, confirm: &mut dyn Confirm) -> Result<bool> {
        let index = self
            .document
            .position(name)
            .ok_or_else(|| not_found(name))?;
        if !confirm.confirm(&Prompt::DeleteTransform { name }) {
            log::debug!("deletion of '{}' declined", name);
            return Ok(false);
        }

        let mut document = self.document.clone();
        document.remove(index);
        self.commit(document)?;
        log::info!("deleted custom transform '{}'", name);
        Ok(true)
    }

    fn fixed(&self, name: &str) -> Option<&Arc<dyn Transform>> {
        self.builtins
            .iter()
            .chain(self.survey.iter())
            .find(|t| t.name() == name)
    }

    fn check_name(&self, name: &str, replacing: Option<&str>) -> Result<()> {
        if name.is_empty() {
            return Err(KilnError::Validation(
                "The function name cannot be empty".to_string(),
            ));
        }
        if !script::is_identifier(name) {
            return Err(KilnError::Validation(format!(
                "'{}' is not a valid function name",
                name
            )));
        }
        if self.is_reserved(name) {
            return Err(KilnError::Validation(format!(
                "'{}' is a built-in transform and cannot be redefined",
                name
            )));
        }
        if self.contains(name) && replacing != Some(name) {
            return Err(KilnError::Validation(format!(
                "A function named '{}' already exists",
                name
            )));
        }
        Ok(())
    }

    /// Compile every function of a document and check its calls.
    fn build(&self, document: &StoreDocument) -> Result<IndexMap<String, Arc<ScriptTransform>>> {
        let mut custom = IndexMap::new();
        for (name, block) in document.functions() {
            if custom.contains_key(name) {
                return Err(KilnError::Validation(format!(
                    "Function '{}' is defined more than once in '{}'",
                    name,
                    self.path.display()
                )));
            }
            if self.is_reserved(name) {
                return Err(KilnError::Validation(format!(
                    "Function '{}' in '{}' redefines a built-in transform",
                    name,
                    self.path.display()
                )));
            }
            let transform = script::compile(name, &block.text(), block.first_line())?;
            custom.insert(name.to_string(), Arc::new(transform));
        }

        let known: HashSet<&str> = self
            .builtins
            .iter()
            .chain(self.survey.iter())
            .map(|t| t.name())
            .chain(custom.keys().map(String::as_str))
            .collect();
        let confirmed: HashSet<&str> = self
            .builtins
            .iter()
            .filter(|t| t.requires_confirmation())
            .map(|t| t.name())
            .collect();
        for transform in custom.values() {
            transform.check_calls(|callee| known.contains(callee))?;
            transform.check_unconfirmed_calls(|callee| confirmed.contains(callee))?;
        }
        Ok(custom)
    }

    fn document_for_write(&self) -> StoreDocument {
        if self.document.preamble().is_empty() && self.document.blocks().is_empty() {
            StoreDocument::with_preamble(DEFAULT_PREAMBLE)
        } else {
            self.document.clone()
        }
    }

    /// Validate a new document, write it and reload from disk.
    fn commit(&mut self, document: StoreDocument) -> Result<()> {
        let text = document.render();
        self.build(&StoreDocument::parse(&text))?;
        self.write(&text)?;
        self.load()?;
        Ok(())
    }

    /// Write the store through a sibling temp file renamed over it.
    fn write(&self, text: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| {
                    KilnError::Persistence(format!(
                        "Failed to create directory '{}': {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "store".to_string());
        let temp = self.path.with_file_name(format!(".{}.tmp", file_name));
        fs::write(&temp, text).map_err(|e| KilnError::io(&temp, e))?;
        fs::rename(&temp, &self.path).map_err(|e| {
            let _ = fs::remove_file(&temp);
            KilnError::Persistence(format!(
                "Failed to replace '{}': {}",
                self.path.display(),
                e
            ))
        })?;
        log::debug!("wrote {} bytes to '{}'", text.len(), self.path.display());
        Ok(())
    }
}

impl Resolver for TransformRegistry {
    fn resolve(&self, name: &str) -> Option<Arc<dyn Transform>> {
        TransformRegistry::resolve(self, name).ok()
    }
}

fn not_found(name: &str) -> KilnError {
    KilnError::NotFound(format!("No transform named '{}'", name))
}

/// Unix line endings, no leading or trailing blank lines.
fn normalize_source(source: &str) -> String {
    let source = source.replace("\r\n", "\n");
    let lines: Vec<&str> = source
        .lines()
        .skip_while(|l| l.trim().is_empty())
        .collect();
    lines.join("\n").trim_end().to_string()
}

/// Check that `source` defines exactly the function `name` and nothing
/// else, so that it reads back as a single block of the store.
fn single_block(name: &str, source: &str) -> Result<Block> {
    script::check_definition(name, source)?;

    let parsed = StoreDocument::parse(source);
    if !parsed.preamble().is_empty() {
        return Err(KilnError::Validation(
            "Comments before the definition must directly precede the 'def' line".to_string(),
        ));
    }
    match parsed.blocks() {
        [block] if block.name() == Some(name) => {
            let transform = script::compile(name, source, 1)?;
            log::debug!(
                "compiled '{}' with {} calls",
                name,
                transform.calls().count()
            );
            Ok(Block::function(name, source))
        }
        _ => Err(KilnError::Validation(
            "The source must contain exactly one function and nothing after it".to_string(),
        )),
    }
}
