//! Integration tests for column sessions: apply, undo and null removal.

use std::io::Write;

use tempfile::{NamedTempFile, TempDir};

use kiln::transform::{Answer, FnTransform, NullRemoval, UndoOutcome};
use kiln::{Cell, ColumnSession, DataTable, DatasetState, Kiln, KilnConfig, KilnError};

/// Helper to create a temporary file with given content.
fn create_test_file(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create temp file");
    file.write_all(content.as_bytes())
        .expect("Failed to write to temp file");
    file
}

/// A kiln whose custom transform store lives in a temp dir.
fn create_kiln() -> (TempDir, Kiln) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let config = KilnConfig {
        store_path: dir.path().join("custom_transforms.kiln"),
        ..KilnConfig::default()
    };
    let kiln = Kiln::new(config).expect("Failed to open kiln");
    (dir, kiln)
}

fn age_state() -> DatasetState {
    let table = DataTable::from_columns(vec![
        (
            "age",
            vec![
                Cell::Number(16.0),
                Cell::Number(200.0),
                Cell::Number(-5.0),
                Cell::Number(30.0),
                Cell::Null,
            ],
        ),
        ("result", vec![Cell::Number(0.0); 5]),
    ])
    .unwrap();
    DatasetState::new(table, Default::default())
}

// =============================================================================
// Apply and Undo
// =============================================================================

#[test]
fn test_remove_outliers_scenario() {
    let (_dir, kiln) = create_kiln();
    let mut state = age_state();
    let mut session = ColumnSession::open(&mut state, "age").unwrap();

    let report = kiln.apply(&mut session, "remove_outliers").unwrap();
    assert_eq!(report.rows_removed(), 1);
    drop(session);

    // Bounds over [16, 200, -5, 30] are [-81.875, 165.125]
    let ages: Vec<Cell> = state.table().column_values(0).cloned().collect();
    assert_eq!(
        ages,
        vec![
            Cell::Number(16.0),
            Cell::Number(-5.0),
            Cell::Number(30.0),
            Cell::Null
        ]
    );
    assert_eq!(state.table().null_count(0), 1);
}

#[test]
fn test_undo_restores_exact_snapshot() {
    let (_dir, kiln) = create_kiln();
    let mut state = age_state();
    let before = state.table().clone();
    let valid_before = state.valid_values().clone();

    let mut session = ColumnSession::open(&mut state, "age").unwrap();
    kiln.apply(&mut session, "fill_missing_values:mean").unwrap();
    kiln.apply(&mut session, "remove_outliers").unwrap();
    assert_eq!(session.history().len(), 2);

    session.undo();
    match session.undo() {
        UndoOutcome::Restored { remaining, .. } => assert_eq!(remaining, 0),
        UndoOutcome::NothingToUndo => panic!("expected a snapshot"),
    }
    assert!(matches!(session.undo(), UndoOutcome::NothingToUndo));
    drop(session);

    assert_eq!(state.table(), &before);
    assert_eq!(state.valid_values(), &valid_before);
}

#[test]
fn test_contract_violation_leaves_dataset_unchanged() {
    let (_dir, kiln) = create_kiln();
    let mut state = age_state();
    let before = state.table().clone();

    let nothing = FnTransform::new("nothing", |_d: DataTable, _c: &str| Ok(None));
    let mut session = ColumnSession::open(&mut state, "age").unwrap();
    let err = session.apply(&nothing, &kiln.context()).unwrap_err();
    assert!(matches!(err, KilnError::ContractViolation { .. }));
    assert_eq!(session.state().table(), &before);

    // The snapshot stays available
    assert_eq!(session.history().len(), 1);
}

#[test]
fn test_runtime_error_names_transform() {
    let (_dir, kiln) = create_kiln();
    let table = DataTable::from_columns(vec![
        ("city", vec![Cell::from("NYC"), Cell::from("LA")]),
        ("result", vec![Cell::Number(0.0), Cell::Number(1.0)]),
    ])
    .unwrap();
    let mut state = DatasetState::new(table, Default::default());
    let before = state.table().clone();

    let mut session = ColumnSession::open(&mut state, "city").unwrap();
    let err = kiln.apply(&mut session, "remove_outliers").unwrap_err();
    match &err {
        KilnError::RuntimeTransform { transform, .. } => assert_eq!(transform, "remove_outliers"),
        other => panic!("unexpected error: {}", other),
    }
    drop(session);
    assert_eq!(state.table(), &before);
}

#[test]
fn test_fill_mode_scenario() {
    let (_dir, kiln) = create_kiln();
    let table = DataTable::from_columns(vec![
        (
            "x",
            vec![
                Cell::Number(1.0),
                Cell::Number(1.0),
                Cell::Number(2.0),
                Cell::Null,
            ],
        ),
        ("result", vec![Cell::Number(1.0); 4]),
    ])
    .unwrap();
    let mut state = DatasetState::new(table, Default::default());
    let mut session = ColumnSession::open(&mut state, "x").unwrap();

    let report = kiln.apply(&mut session, "fill_missing_values:mode").unwrap();
    let summary = report.summary.unwrap();
    assert_eq!(summary.null_count, 0);
    assert_eq!(session.state().table().get(3, 0), Some(&Cell::Number(1.0)));
}

#[test]
fn test_unknown_transform_is_not_found() {
    let (_dir, kiln) = create_kiln();
    let mut state = age_state();
    let mut session = ColumnSession::open(&mut state, "age").unwrap();
    assert!(matches!(
        kiln.apply(&mut session, "does_not_exist"),
        Err(KilnError::NotFound(_))
    ));
    assert!(session.history().is_empty());
}

// =============================================================================
// Null Removal
// =============================================================================

#[test]
fn test_remove_nulls_with_confirmation() {
    let (_dir, kiln) = create_kiln();
    let mut state = age_state();
    let mut session = ColumnSession::open(&mut state, "age").unwrap();

    let preview = session.null_removal_preview().unwrap();
    assert_eq!(preview.rows_to_remove, 1);
    assert_eq!(preview.resulting_rows, 4);

    match kiln.remove_nulls(&mut session, &mut Answer::No).unwrap() {
        NullRemoval::Cancelled(p) => assert_eq!(p, preview),
        other => panic!("expected cancellation, got {:?}", other),
    }
    assert!(session.history().is_empty());

    match kiln.remove_nulls(&mut session, &mut Answer::Yes).unwrap() {
        NullRemoval::Removed(report) => assert_eq!(report.rows_after, 4),
        other => panic!("expected removal, got {:?}", other),
    }
    assert!(matches!(
        kiln.remove_nulls(&mut session, &mut Answer::Yes).unwrap(),
        NullRemoval::NoNulls
    ));
}

#[test]
fn test_apply_by_name_does_not_remove_nulls() {
    let (_dir, kiln) = create_kiln();
    let mut state = age_state();
    let before = state.table().clone();
    let mut session = ColumnSession::open(&mut state, "age").unwrap();

    let err = kiln.apply(&mut session, "remove_nulls").unwrap_err();
    assert!(matches!(err, KilnError::Validation(_)));
    assert!(session.history().is_empty());
    drop(session);
    assert_eq!(state.table(), &before);
}

#[test]
fn test_remove_nulls_without_nulls_leaves_history_alone() {
    let (_dir, kiln) = create_kiln();
    let mut state = age_state();
    let mut session = ColumnSession::open(&mut state, "result").unwrap();

    assert!(matches!(
        kiln.remove_nulls(&mut session, &mut Answer::Yes).unwrap(),
        NullRemoval::NoNulls
    ));
    assert!(kiln.apply(&mut session, "remove_nulls").is_err());
    assert!(session.history().is_empty());
}

// =============================================================================
// Custom Transforms
// =============================================================================

#[test]
fn test_custom_transform_cannot_call_remove_nulls() {
    let (_dir, mut kiln) = create_kiln();
    let err = kiln
        .registry_mut()
        .add(
            "drop_gaps",
            "def drop_gaps(dataset, column):\n    return remove_nulls(dataset, column)\n",
        )
        .unwrap_err();
    assert!(matches!(err, KilnError::Script { .. }));
    assert!(err.to_string().contains("needs a confirmation"));
    assert!(kiln.registry().resolve("drop_gaps").is_err());
}

#[test]
fn test_custom_transform_applies_through_registry() {
    let (_dir, mut kiln) = create_kiln();
    kiln.registry_mut()
        .add(
            "clean_age",
            "def clean_age(dataset, column):\n    \"\"\"Fill then trim.\"\"\"\n    dataset = fill_missing_values(dataset, column, \"median\")\n    return remove_outliers(dataset, column)\n",
        )
        .unwrap();
    kiln.registry_mut()
        .add(
            "clean_twice",
            "def clean_twice(dataset, column):\n    dataset = clean_age(dataset, column)\n    return clip(dataset, column, 0, 100)\n",
        )
        .unwrap();

    let mut state = age_state();
    let mut session = ColumnSession::open(&mut state, "age").unwrap();
    let report = kiln.apply(&mut session, "clean_twice").unwrap();
    assert_eq!(report.transform, "clean_twice");
    drop(session);

    // Median of [16, 200, -5, 30] is 23; 200 is an outlier; -5 clips to 0
    let ages: Vec<Cell> = state.table().column_values(0).cloned().collect();
    assert_eq!(
        ages,
        vec![
            Cell::Number(16.0),
            Cell::Number(0.0),
            Cell::Number(30.0),
            Cell::Number(23.0)
        ]
    );
}

#[test]
fn test_custom_transform_without_return_is_contract_violation() {
    let (_dir, mut kiln) = create_kiln();
    kiln.registry_mut()
        .add(
            "forgetful",
            "def forgetful(dataset, column):\n    dataset = fill_value(dataset, column, 0)\n",
        )
        .unwrap();

    let mut state = age_state();
    let before = state.table().clone();
    let mut session = ColumnSession::open(&mut state, "age").unwrap();
    let err = kiln.apply(&mut session, "forgetful").unwrap_err();
    assert!(matches!(err, KilnError::ContractViolation { .. }));
    drop(session);
    assert_eq!(state.table(), &before);
}

#[test]
fn test_recursive_custom_transform_hits_depth_limit() {
    let (_dir, mut kiln) = create_kiln();
    kiln.registry_mut()
        .add(
            "forever",
            "def forever(dataset, column):\n    return forever(dataset, column)\n",
        )
        .unwrap();

    let mut state = age_state();
    let mut session = ColumnSession::open(&mut state, "age").unwrap();
    let err = kiln.apply(&mut session, "forever").unwrap_err();
    assert!(err.to_string().contains("maximum transform call depth"));
}

#[test]
fn test_dataset_file_without_label_is_rejected() {
    let (_dir, kiln) = create_kiln();
    let file = create_test_file("id,age\n1,30\n2,40\n");
    let err = kiln.open_dataset(file.path()).unwrap_err();
    assert!(matches!(err, KilnError::Validation(_)));
    assert!(err.to_string().contains("not a training file"));
}
