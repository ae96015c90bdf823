//! Integration tests for the transform registry and its text store.

use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;

use kiln::registry::{DEFAULT_PREAMBLE, TransformRegistry};
use kiln::transform::Answer;
use kiln::{KilnError, TransformKind};

/// Helper to create a registry over a store with the given content.
fn registry_with(content: Option<&str>) -> (TempDir, PathBuf, TransformRegistry) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let path = dir.path().join("custom_transforms.kiln");
    if let Some(content) = content {
        fs::write(&path, content).expect("Failed to write store");
    }
    let registry = TransformRegistry::open(&path).expect("Failed to open registry");
    (dir, path, registry)
}

const STORE: &str = "\
import logging

logger = logging.getLogger(__name__)

# Strips nothing.
def first(dataset, column):
    \"\"\"Docstring with an embedded blank line.

    Still the docstring.
    \"\"\"
    return dataset

def second(dataset, column):
    dataset = fill_value(dataset, column, 0)
    return dataset
def third(dataset, column):
    return clip(dataset, column, 0, None)
";

// =============================================================================
// Load
// =============================================================================

#[test]
fn test_load_lists_functions_in_store_order() {
    let (_dir, _path, mut registry) = registry_with(Some(STORE));
    assert_eq!(registry.load().unwrap(), vec!["first", "second", "third"]);

    let catalog = registry.catalog();
    let custom: Vec<&str> = catalog
        .iter()
        .filter(|t| t.kind == TransformKind::Custom)
        .map(|t| t.name.as_str())
        .collect();
    assert_eq!(custom, vec!["first", "second", "third"]);
    assert_eq!(catalog[0].kind, TransformKind::Builtin);
    assert!(catalog.iter().all(|t| t.signature == "(dataset, column)"));
}

#[test]
fn test_docstring_with_blank_line_stays_in_block() {
    let (_dir, _path, registry) = registry_with(Some(STORE));
    let source = registry.source("first").unwrap();
    assert!(source.starts_with("# Strips nothing.\ndef first"));
    assert!(source.contains("Still the docstring."));
    assert!(source.ends_with("    return dataset"));
}

#[test]
fn test_load_reports_compile_errors_with_file_lines() {
    let store = "def broken(dataset, column):\n    x = 1\n";
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("custom.kiln");
    fs::write(&path, store).unwrap();

    match TransformRegistry::open(&path) {
        Err(KilnError::Script { function, line, .. }) => {
            assert_eq!(function, "broken");
            assert_eq!(line, 2);
        }
        Err(other) => panic!("unexpected error: {}", other),
        Ok(_) => panic!("expected a script error"),
    }
}

#[test]
fn test_load_rejects_unknown_callee() {
    let store = "def f(dataset, column):\n    return nowhere(dataset, column)\n";
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("custom.kiln");
    fs::write(&path, store).unwrap();
    assert!(TransformRegistry::open(&path).is_err());
}

// =============================================================================
// Add
// =============================================================================

#[test]
fn test_add_then_load_lists_function() {
    let (_dir, _path, mut registry) = registry_with(None);
    registry
        .add("foo", "def foo(dataset, column):\n    return dataset")
        .unwrap();

    let mut reopened = TransformRegistry::new(registry.path());
    assert_eq!(reopened.load().unwrap(), vec!["foo"]);
}

#[test]
fn test_add_appends_after_existing_functions() {
    let (_dir, path, mut registry) = registry_with(Some(STORE));
    registry
        .add("fourth", "def fourth(dataset, column):\n    return dataset\n")
        .unwrap();

    let text = fs::read_to_string(&path).unwrap();
    assert!(text.starts_with("import logging\n\nlogger = logging.getLogger(__name__)\n\n"));
    assert!(text.ends_with("\n\ndef fourth(dataset, column):\n    return dataset\n"));
    assert_eq!(registry.names(), vec!["first", "second", "third", "fourth"]);
}

#[test]
fn test_add_mismatched_name_leaves_store_unchanged() {
    let (_dir, path, mut registry) = registry_with(Some(STORE));
    let err = registry
        .add("foo", "def bar(dataset, column):\n    return dataset")
        .unwrap_err();
    assert!(matches!(err, KilnError::Validation(_)));
    assert_eq!(fs::read_to_string(&path).unwrap(), STORE);
}

#[test]
fn test_add_validation_failures() {
    let (_dir, path, mut registry) = registry_with(None);
    let cases = [
        ("", "def foo(dataset, column):\n    return dataset"),
        ("not valid", "def foo(dataset, column):\n    return dataset"),
        ("foo", ""),
        ("foo", "# just a comment\n"),
        ("foo", "print('hi')\ndef foo(dataset, column):\n    return dataset"),
        ("foo", "def foo(df, col):\n    return df"),
        ("foo", "def foo(dataset, column, extra):\n    return dataset"),
    ];
    for (name, source) in cases {
        let err = registry.add(name, source).unwrap_err();
        assert!(
            matches!(err, KilnError::Validation(_)),
            "{:?} should fail validation, got {}",
            name,
            err
        );
    }
    assert!(!path.exists());
}

#[test]
fn test_add_rejects_body_that_does_not_compile() {
    let (_dir, path, mut registry) = registry_with(Some(STORE));
    let err = registry
        .add(
            "loop",
            "def loop(dataset, column):\n    while True:\n        pass\n",
        )
        .unwrap_err();
    assert!(matches!(err, KilnError::Script { .. }));
    assert_eq!(fs::read_to_string(&path).unwrap(), STORE);
}

#[test]
fn test_add_duplicate_fails() {
    let (_dir, _path, mut registry) = registry_with(Some(STORE));
    let err = registry
        .add("second", "def second(dataset, column):\n    return dataset")
        .unwrap_err();
    assert!(err.to_string().contains("already exists"));
}

// =============================================================================
// Edit
// =============================================================================

#[test]
fn test_edit_replaces_block_in_place() {
    let (_dir, path, mut registry) = registry_with(Some(STORE));
    registry
        .edit(
            "second",
            "second",
            "def second(dataset, column):\n    return drop_column(dataset, column)",
        )
        .unwrap();

    assert_eq!(registry.names(), vec!["first", "second", "third"]);
    let text = fs::read_to_string(&path).unwrap();
    assert!(text.contains("def second(dataset, column):\n    return drop_column(dataset, column)\n\ndef third"));
    assert!(!text.contains("fill_value"));
}

#[test]
fn test_edit_can_rename() {
    let (_dir, _path, mut registry) = registry_with(Some(STORE));
    registry
        .edit(
            "third",
            "clip_low",
            "def clip_low(dataset, column):\n    return clip(dataset, column, 0, None)",
        )
        .unwrap();
    assert_eq!(registry.names(), vec!["first", "second", "clip_low"]);
    assert!(matches!(registry.source("third"), Err(KilnError::NotFound(_))));
}

#[test]
fn test_edit_missing_function_is_not_found() {
    let (_dir, _path, mut registry) = registry_with(Some(STORE));
    let err = registry
        .edit("ghost", "ghost", "def ghost(dataset, column):\n    return dataset")
        .unwrap_err();
    assert!(matches!(err, KilnError::NotFound(_)));
}

#[test]
fn test_edit_cannot_take_another_name() {
    let (_dir, path, mut registry) = registry_with(Some(STORE));
    let err = registry
        .edit("third", "first", "def first(dataset, column):\n    return dataset")
        .unwrap_err();
    assert!(matches!(err, KilnError::Validation(_)));
    assert_eq!(fs::read_to_string(&path).unwrap(), STORE);
}

// =============================================================================
// Delete
// =============================================================================

#[test]
fn test_delete_keeps_other_functions_byte_for_byte() {
    let (_dir, _path, mut registry) = registry_with(Some(STORE));
    let first = registry.source("first").unwrap().to_string();
    let third = registry.source("third").unwrap().to_string();

    assert!(registry.delete("second", &mut Answer::Yes).unwrap());

    let mut reopened = TransformRegistry::new(registry.path());
    assert_eq!(reopened.load().unwrap(), vec!["first", "third"]);
    assert_eq!(reopened.source("first").unwrap(), first);
    assert_eq!(reopened.source("third").unwrap(), third);
}

#[test]
fn test_delete_last_function_keeps_preamble() {
    let (_dir, path, mut registry) = registry_with(Some(STORE));
    registry.delete("third", &mut Answer::Yes).unwrap();

    let text = fs::read_to_string(&path).unwrap();
    assert!(text.starts_with("import logging\n\nlogger = logging.getLogger(__name__)\n\n# Strips nothing."));
    assert!(text.ends_with("    dataset = fill_value(dataset, column, 0)\n    return dataset\n"));
}

#[test]
fn test_delete_requires_confirmation() {
    let (_dir, path, mut registry) = registry_with(Some(STORE));
    assert!(!registry.delete("first", &mut Answer::No).unwrap());
    assert_eq!(fs::read_to_string(&path).unwrap(), STORE);
    assert_eq!(registry.names().len(), 3);
}

#[test]
fn test_delete_missing_function_is_not_found() {
    let (_dir, _path, mut registry) = registry_with(Some(STORE));
    let err = registry.delete("ghost", &mut Answer::Yes).unwrap_err();
    assert!(matches!(err, KilnError::NotFound(_)));
}

#[test]
fn test_add_then_delete_round_trip() {
    let (_dir, path, mut registry) = registry_with(None);
    registry
        .add("foo", "def foo(dataset, column):\n    return dataset")
        .unwrap();
    registry.delete("foo", &mut Answer::Yes).unwrap();

    assert!(registry.names().is_empty());
    let text = fs::read_to_string(&path).unwrap();
    assert_eq!(text, format!("{}\n", DEFAULT_PREAMBLE));
}
