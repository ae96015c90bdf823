//! Integration tests for the survey transforms and pipeline.

use std::io::Write;

use tempfile::{NamedTempFile, TempDir};

use kiln::transform::{SurveyColumns, SurveyPipeline};
use kiln::{Cell, ColumnSession, DataTable, DatasetState, Kiln, KilnConfig, ValidValues};

/// Helper to create a temporary file with given content.
fn create_test_file(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create temp file");
    file.write_all(content.as_bytes())
        .expect("Failed to write to temp file");
    file
}

fn create_kiln() -> (TempDir, Kiln) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let config = KilnConfig {
        store_path: dir.path().join("custom_transforms.kiln"),
        ..KilnConfig::default()
    };
    (dir, Kiln::new(config).expect("Failed to open kiln"))
}

/// Survey export with one row per respondent.
fn create_survey_data() -> NamedTempFile {
    let content = "id,bdate,education_status,education_form,occupation_type,result\n\
                   1,5.13.1990,PhD,Full-time,work,1\n\
                   2,,Student (Master's),,work,0\n\
                   3,12.3.1985,Alumnus (Specialist),,university,1\n\
                   4,1.1.1899,,Part-time,,0\n";
    create_test_file(content)
}

#[test]
fn test_bdate_scenario_clips_month_and_derives_age() {
    let (_dir, kiln) = create_kiln();
    let table = DataTable::from_columns(vec![
        ("bdate", vec![Cell::from("5.13.1990")]),
        ("result", vec![Cell::Number(1.0)]),
    ])
    .unwrap();
    let mut state = DatasetState::new(table, Default::default());
    let mut session = ColumnSession::open(&mut state, "bdate").unwrap();

    kiln.apply(&mut session, "normalize_bdate").unwrap();
    let report = kiln.apply(&mut session, "calculate_age").unwrap();
    assert_eq!(report.columns_added, vec!["bdate_age"]);
    drop(session);

    let table = state.table();
    assert_eq!(table.get(0, 0), Some(&Cell::from("5.12.1990")));
    let age = table.column_index("bdate_age").unwrap();
    assert_eq!(table.get(0, age), Some(&Cell::Number(35.0)));
    assert_eq!(
        state.valid_values().get("bdate_age"),
        Some(&ValidValues::Range { min: 16, max: 75 })
    );
}

#[test]
fn test_education_form_falls_back_to_occupation() {
    let (_dir, kiln) = create_kiln();
    let table = DataTable::from_columns(vec![
        ("education_form", vec![Cell::Null, Cell::from("Evening")]),
        ("occupation_type", vec![Cell::from("work"), Cell::from("other")]),
        ("result", vec![Cell::Number(0.0), Cell::Number(1.0)]),
    ])
    .unwrap();
    let mut state = DatasetState::new(table, Default::default());
    let mut session = ColumnSession::open(&mut state, "education_form").unwrap();

    kiln.apply(&mut session, "normalize_education_form").unwrap();
    let codes: Vec<Cell> = session.state().table().column_values(0).cloned().collect();
    assert_eq!(codes, vec![Cell::Number(2.0), Cell::Number(1.0)]);
}

#[test]
fn test_pipeline_on_survey_file() {
    let (_dir, kiln) = create_kiln();
    let file = create_survey_data();
    let state = kiln.open_dataset(file.path()).unwrap();

    let output = kiln.run_survey(state.table()).unwrap();
    let column = |name: &str| -> Vec<Cell> {
        let index = output.column_index(name).unwrap();
        output.column_values(index).cloned().collect()
    };

    // Missing parts take the column medians: day 5, month 3, year 1985
    assert_eq!(
        column("bdate"),
        vec![
            Cell::from("5.12.1990"),
            Cell::from("5.3.1985"),
            Cell::from("12.3.1985"),
            Cell::from("1.1.1900"),
        ]
    );
    assert_eq!(
        column("bdate_age"),
        vec![
            Cell::Number(35.0),
            Cell::Number(40.0),
            Cell::Number(40.0),
            Cell::Number(125.0),
        ]
    );
    assert_eq!(
        column("education_status"),
        vec![
            Cell::Number(7.0),
            Cell::Number(3.0),
            Cell::Number(5.0),
            Cell::Number(0.0),
        ]
    );
    assert_eq!(
        column("education_form"),
        vec![
            Cell::Number(0.0),
            Cell::Number(2.0),
            Cell::Number(0.0),
            Cell::Number(2.0),
        ]
    );
    // The input table is untouched
    assert_eq!(state.table().column_count(), 6);
}

#[test]
fn test_pipeline_with_custom_columns() {
    let (_dir, kiln) = create_kiln();
    let table = DataTable::from_columns(vec![
        ("born", vec![Cell::from("1.2.2000")]),
        ("status", vec![Cell::from("PhD")]),
        ("form", vec![Cell::from("Part-time")]),
        ("occupation_type", vec![Cell::from("work")]),
    ])
    .unwrap();
    let pipeline = SurveyPipeline::new(SurveyColumns {
        bdate: "born".to_string(),
        education_status: "status".to_string(),
        education_form: "form".to_string(),
    });

    let output = pipeline.run(&kiln.context(), &table).unwrap();
    assert_eq!(output.headers, vec!["born", "status", "form", "occupation_type", "born_age"]);
    assert_eq!(output.get(0, 4), Some(&Cell::Number(25.0)));
}

#[test]
fn test_pipeline_missing_column_fails() {
    let (_dir, kiln) = create_kiln();
    let table = DataTable::from_columns(vec![("bdate", vec![Cell::from("1.1.2000")])]).unwrap();
    let err = kiln.run_survey(&table).unwrap_err();
    assert!(err.to_string().contains("education_status"));
}
