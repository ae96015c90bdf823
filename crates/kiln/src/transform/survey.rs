//! Transforms for the survey schema: birth dates, ages and education
//! fields.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{Transform, TransformContext};
use crate::error::{KilnError, Result};
use crate::input::{Cell, DataTable, format_number, parse_number};
use crate::schema::quantile;

/// All survey transforms, in listing order.
pub fn survey_transforms() -> Vec<Arc<dyn Transform>> {
    vec![
        Arc::new(NormalizeBdate),
        Arc::new(CalculateAge),
        Arc::new(TransformEducationStatus),
        Arc::new(NormalizeEducationForm::default()),
    ]
}

/// Normalize `day.month.year` birth dates.
///
/// Each part is parsed as a number; missing or unparseable parts take the
/// median of that part over the column (truncated to an integer), then day,
/// month and year are clipped to their ranges and reassembled.
pub struct NormalizeBdate;

impl NormalizeBdate {
    fn split(cell: &Cell) -> [Option<f64>; 3] {
        let mut parts = [None; 3];
        if let Cell::Text(s) = cell {
            for (slot, part) in parts.iter_mut().zip(s.split('.')) {
                *slot = parse_number(part);
            }
        }
        parts
    }
}

impl Transform for NormalizeBdate {
    fn name(&self) -> &str {
        "normalize_bdate"
    }

    fn description(&self) -> &str {
        "Clip day/month/year of d.m.y birth dates, filling gaps with medians"
    }

    fn apply(
        &self,
        ctx: &TransformContext<'_>,
        mut dataset: DataTable,
        column: &str,
    ) -> Result<Option<DataTable>> {
        let col = dataset.require_column(self.name(), column)?;
        let options = ctx.options();
        let split: Vec<[Option<f64>; 3]> = dataset.column_values(col).map(Self::split).collect();

        let labels = ["day", "month", "year"];
        let mut medians = [0i64; 3];
        for (i, median) in medians.iter_mut().enumerate() {
            let mut present: Vec<f64> = split.iter().filter_map(|parts| parts[i]).collect();
            if present.is_empty() {
                return Err(KilnError::runtime(
                    self.name(),
                    format!("column '{}' has no {} values to take a median of", column, labels[i]),
                ));
            }
            present.sort_by(|a, b| a.total_cmp(b));
            *median = quantile(&present, 0.5).trunc() as i64;
        }
        log::debug!(
            "normalize_bdate medians for '{}': day={}, month={}, year={}",
            column,
            medians[0],
            medians[1],
            medians[2]
        );

        let ranges = [options.day_range, options.month_range, options.year_range];
        for (row, parts) in dataset.rows.iter_mut().zip(&split) {
            let mut fields = [0i64; 3];
            for i in 0..3 {
                let value = parts[i].map_or(medians[i], |v| v.trunc() as i64);
                fields[i] = value.clamp(ranges[i].0, ranges[i].1);
            }
            row[col] = Cell::Text(format!("{}.{}.{}", fields[0], fields[1], fields[2]));
        }
        Ok(Some(dataset))
    }
}

/// Add `<column>_age`: reference year minus the birth year, when the year
/// lies within the plausible range.
pub struct CalculateAge;

impl CalculateAge {
    fn age(cell: &Cell, reference_year: i64, year_range: (i64, i64)) -> Cell {
        let text = match cell {
            Cell::Text(s) => s.clone(),
            Cell::Number(n) => format_number(*n),
            _ => return Cell::Null,
        };
        let year = text
            .rsplit('.')
            .next()
            .and_then(|part| part.trim().parse::<i64>().ok());
        match year {
            Some(year) if (year_range.0..=year_range.1).contains(&year) => {
                Cell::from(reference_year - year)
            }
            _ => Cell::Null,
        }
    }
}

impl Transform for CalculateAge {
    fn name(&self) -> &str {
        "calculate_age"
    }

    fn description(&self) -> &str {
        "Add <column>_age computed from the year of a d.m.y date"
    }

    fn apply(
        &self,
        ctx: &TransformContext<'_>,
        mut dataset: DataTable,
        column: &str,
    ) -> Result<Option<DataTable>> {
        let col = dataset.require_column(self.name(), column)?;
        let options = ctx.options();
        let ages: Vec<Cell> = dataset
            .column_values(col)
            .map(|cell| Self::age(cell, options.reference_year, options.year_range))
            .collect();
        dataset.put_column(&format!("{}_age", column), ages)?;
        Ok(Some(dataset))
    }
}

const EDUCATION_STATUS: &[(&str, i64)] = &[
    ("Undergraduate applicant", 0),
    ("Student (Bachelor's)", 1),
    ("Student (Specialist)", 2),
    ("Student (Master's)", 3),
    ("Alumnus (Bachelor's)", 4),
    ("Alumnus (Specialist)", 5),
    ("Alumnus (Master's)", 6),
    ("PhD", 7),
    ("Candidate of Sciences", 8),
];

/// Map education status labels to their ordinal code. Unknown and missing
/// labels become 0.
pub struct TransformEducationStatus;

impl Transform for TransformEducationStatus {
    fn name(&self) -> &str {
        "transform_education_status"
    }

    fn description(&self) -> &str {
        "Encode education status as an ordinal code (unknown -> 0)"
    }

    fn apply(
        &self,
        _ctx: &TransformContext<'_>,
        mut dataset: DataTable,
        column: &str,
    ) -> Result<Option<DataTable>> {
        let col = dataset.require_column(self.name(), column)?;
        dataset.map_column(col, |cell| {
            let code = cell
                .as_text()
                .and_then(|label| EDUCATION_STATUS.iter().find(|(l, _)| *l == label))
                .map_or(0, |(_, code)| *code);
            Cell::from(code)
        });
        Ok(Some(dataset))
    }
}

const FULL_TIME: i64 = 0;
const DISTANCE_LEARNING: i64 = 1;
const PART_TIME: i64 = 2;

const EDUCATION_FORM: &[(&str, i64)] = &[
    ("Full-time", FULL_TIME),
    ("Distance Learning", DISTANCE_LEARNING),
    ("Part-time", PART_TIME),
];

/// Map education form labels to codes, inferring the form from the
/// occupation type when the label is missing or unknown.
pub struct NormalizeEducationForm {
    occupation_column: String,
}

impl NormalizeEducationForm {
    pub fn new(occupation_column: impl Into<String>) -> Self {
        Self {
            occupation_column: occupation_column.into(),
        }
    }
}

impl Default for NormalizeEducationForm {
    fn default() -> Self {
        Self::new("occupation_type")
    }
}

impl Transform for NormalizeEducationForm {
    fn name(&self) -> &str {
        "normalize_education_form"
    }

    fn description(&self) -> &str {
        "Encode education form, inferring it from occupation_type when unknown"
    }

    fn apply(
        &self,
        _ctx: &TransformContext<'_>,
        mut dataset: DataTable,
        column: &str,
    ) -> Result<Option<DataTable>> {
        let col = dataset.require_column(self.name(), column)?;
        let occupation = dataset.require_column(self.name(), &self.occupation_column)?;

        for row in &mut dataset.rows {
            let known = row[col]
                .as_text()
                .and_then(|label| EDUCATION_FORM.iter().find(|(l, _)| *l == label))
                .map(|(_, code)| *code);
            let code = known.unwrap_or_else(|| match row[occupation].as_text() {
                Some("university") => FULL_TIME,
                Some("work") => PART_TIME,
                _ => DISTANCE_LEARNING,
            });
            row[col] = Cell::from(code);
        }
        Ok(Some(dataset))
    }
}

/// Column names the survey pipeline works on.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SurveyColumns {
    pub bdate: String,
    pub education_status: String,
    pub education_form: String,
}

impl Default for SurveyColumns {
    fn default() -> Self {
        Self {
            bdate: "bdate".to_string(),
            education_status: "education_status".to_string(),
            education_form: "education_form".to_string(),
        }
    }
}

/// Runs every survey transform in order over the survey columns.
#[derive(Default)]
pub struct SurveyPipeline {
    columns: SurveyColumns,
}

impl SurveyPipeline {
    pub fn new(columns: SurveyColumns) -> Self {
        Self { columns }
    }

    /// The steps as `(transform, column)` pairs.
    pub fn steps(&self) -> Vec<(Arc<dyn Transform>, &str)> {
        let columns = &self.columns;
        vec![
            (Arc::new(NormalizeBdate) as Arc<dyn Transform>, columns.bdate.as_str()),
            (Arc::new(CalculateAge) as Arc<dyn Transform>, columns.bdate.as_str()),
            (
                Arc::new(TransformEducationStatus) as Arc<dyn Transform>,
                columns.education_status.as_str(),
            ),
            (
                Arc::new(NormalizeEducationForm::default()) as Arc<dyn Transform>,
                columns.education_form.as_str(),
            ),
        ]
    }

    /// Apply every step to a copy of the dataset.
    pub fn run(&self, ctx: &TransformContext<'_>, dataset: &DataTable) -> Result<DataTable> {
        let mut current = dataset.clone();
        for (transform, column) in self.steps() {
            log::debug!("survey step {} on '{}'", transform.name(), column);
            current = transform
                .apply(ctx, current, column)?
                .ok_or_else(|| KilnError::ContractViolation {
                    transform: transform.name().to_string(),
                })?;
        }
        Ok(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TransformOptions;

    fn run(t: &dyn Transform, table: DataTable, column: &str) -> Result<DataTable> {
        let options = TransformOptions::default();
        let ctx = TransformContext::new(&options);
        Ok(t.apply(&ctx, table, column)?.unwrap())
    }

    #[test]
    fn test_normalize_bdate_clips_and_fills() {
        let table = DataTable::from_columns(vec![(
            "bdate",
            vec![
                Cell::from("5.13.1990"),
                Cell::from("40.2"),
                Cell::Null,
                Cell::from("1.1.1800"),
            ],
        )])
        .unwrap();
        let out = run(&NormalizeBdate, table, "bdate").unwrap();
        let values: Vec<String> = out.column_values(0).map(|c| c.to_string()).collect();
        // medians: day 5, month 2, year 1895
        assert_eq!(values, vec!["5.12.1990", "31.2.1900", "5.2.1900", "1.1.1900"]);
    }

    #[test]
    fn test_normalize_bdate_without_values_fails() {
        let table = DataTable::from_columns(vec![("bdate", vec![Cell::Null])]).unwrap();
        assert!(run(&NormalizeBdate, table, "bdate").is_err());
    }

    #[test]
    fn test_calculate_age() {
        let table = DataTable::from_columns(vec![(
            "bdate",
            vec![
                Cell::from("5.12.1990"),
                Cell::from("1.1.1850"),
                Cell::from("garbage"),
                Cell::Null,
                Cell::Number(2000.0),
            ],
        )])
        .unwrap();
        let out = run(&CalculateAge, table, "bdate").unwrap();
        let ages: Vec<Cell> = out.column_by_name("bdate_age").unwrap().into_iter().cloned().collect();
        assert_eq!(
            ages,
            vec![Cell::from(35i64), Cell::Null, Cell::Null, Cell::Null, Cell::from(25i64)]
        );
    }

    #[test]
    fn test_education_status_unknown_is_zero() {
        let table = DataTable::from_columns(vec![(
            "education_status",
            vec![Cell::from("PhD"), Cell::from("Astronaut"), Cell::Null],
        )])
        .unwrap();
        let out = run(&TransformEducationStatus, table, "education_status").unwrap();
        let codes: Vec<Cell> = out.column_values(0).cloned().collect();
        assert_eq!(codes, vec![Cell::from(7i64), Cell::from(0i64), Cell::from(0i64)]);
    }

    #[test]
    fn test_education_form_falls_back_to_occupation() {
        let table = DataTable::from_columns(vec![
            (
                "education_form",
                vec![Cell::Null, Cell::from("Part-time"), Cell::from("??"), Cell::Null],
            ),
            (
                "occupation_type",
                vec![
                    Cell::from("work"),
                    Cell::from("university"),
                    Cell::from("university"),
                    Cell::Null,
                ],
            ),
        ])
        .unwrap();
        let out = run(&NormalizeEducationForm::default(), table, "education_form").unwrap();
        let codes: Vec<Cell> = out.column_values(0).cloned().collect();
        assert_eq!(
            codes,
            vec![Cell::from(2i64), Cell::from(2i64), Cell::from(0i64), Cell::from(1i64)]
        );
    }

    #[test]
    fn test_education_form_requires_occupation() {
        let table =
            DataTable::from_columns(vec![("education_form", vec![Cell::from("Full-time")])])
                .unwrap();
        assert!(run(&NormalizeEducationForm::default(), table, "education_form").is_err());
    }
}
