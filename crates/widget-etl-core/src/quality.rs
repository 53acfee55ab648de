//! Data-quality gate for raw batches
//!
//! A fixed suite of expectations is evaluated against the raw batch before any
//! transform runs. Null cells are ignored by every rule except `NotNull`; a
//! missing column fails whichever expectation names it.

use regex::Regex;
use serde::Serialize;
use serde_json::Value;

use crate::batch::{Batch, Columnar};
use crate::error::{EtlError, Result};
use crate::schema::columns;

/// Maximum number of offending values kept per expectation
const SAMPLE_LIMIT: usize = 5;

pub const AGE_GROUPS: &[&str] = &["18-24", "25-34", "35-44", "45-54", "55-64", "65+"];

/// A single data-quality rule
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Expectation {
    RowCountBetween { min: usize, max: usize },
    NotNull { column: String },
    MedianBetween { column: String, min: f64, max: f64 },
    InSet { column: String, values: Vec<String> },
    ValuesBetween { column: String, min: f64, max: f64 },
    MatchesRegex { column: String, pattern: String },
}

impl std::fmt::Display for Expectation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Expectation::RowCountBetween { min, max } => {
                write!(f, "row count between {} and {}", min, max)
            }
            Expectation::NotNull { column } => write!(f, "{} is not null", column),
            Expectation::MedianBetween { column, min, max } => {
                write!(f, "median of {} between {} and {}", column, min, max)
            }
            Expectation::InSet { column, values } => {
                write!(f, "{} in {{{}}}", column, values.join(", "))
            }
            Expectation::ValuesBetween { column, min, max } => {
                write!(f, "{} between {} and {}", column, min, max)
            }
            Expectation::MatchesRegex { column, pattern } => {
                write!(f, "{} matches /{}/", column, pattern)
            }
        }
    }
}

/// Outcome of one expectation
#[derive(Debug, Clone, Serialize)]
pub struct ExpectationResult {
    pub expectation: Expectation,
    pub success: bool,
    pub unexpected_count: usize,
    /// A few offending values (or the observed value for aggregate rules)
    pub sample: Vec<String>,
}

/// Outcome of a whole suite
#[derive(Debug, Clone, Serialize)]
pub struct QualityReport {
    pub results: Vec<ExpectationResult>,
}

impl QualityReport {
    pub fn success(&self) -> bool {
        self.results.iter().all(|r| r.success)
    }

    pub fn failures(&self) -> impl Iterator<Item = &ExpectationResult> {
        self.results.iter().filter(|r| !r.success)
    }

    /// Turn a failing report into `EtlError::QualityGate`
    pub fn into_result(self) -> Result<Self> {
        if self.success() {
            return Ok(self);
        }
        let failed: Vec<String> = self.failures().map(|r| r.expectation.to_string()).collect();
        Err(EtlError::QualityGate(failed.join("; ")))
    }
}

/// An ordered list of expectations
#[derive(Debug, Clone, Serialize)]
pub struct QualitySuite {
    pub expectations: Vec<Expectation>,
}

impl Default for QualitySuite {
    /// The rule set applied to raw widget activity feeds
    fn default() -> Self {
        Self {
            expectations: vec![
                Expectation::RowCountBetween { min: 1, max: 10_000 },
                Expectation::NotNull {
                    column: columns::AGE_GROUP.to_string(),
                },
                Expectation::MedianBetween {
                    column: columns::USER_SCORE.to_string(),
                    min: 0.0,
                    max: 10.0,
                },
                Expectation::NotNull {
                    column: columns::EMAIL.to_string(),
                },
                Expectation::InSet {
                    column: columns::AGE_GROUP.to_string(),
                    values: AGE_GROUPS.iter().map(|s| s.to_string()).collect(),
                },
                Expectation::ValuesBetween {
                    column: "revenue".to_string(),
                    min: 0.0,
                    max: 10_000.0,
                },
                Expectation::MatchesRegex {
                    column: columns::LOCATION.to_string(),
                    pattern: ".+,.+".to_string(),
                },
                Expectation::MatchesRegex {
                    column: "creation_date".to_string(),
                    pattern: r"\d{4}-\d{2}-\d{2}".to_string(),
                },
                Expectation::MatchesRegex {
                    column: columns::EMAIL.to_string(),
                    pattern: r"[^@]+@[^@]+\.[^@]+".to_string(),
                },
            ],
        }
    }
}

impl QualitySuite {
    pub fn new(expectations: Vec<Expectation>) -> Self {
        Self { expectations }
    }

    /// Evaluate every expectation; fails only on an invalid regex pattern
    pub fn validate(&self, batch: &Batch) -> Result<QualityReport> {
        let results = self
            .expectations
            .iter()
            .map(|e| evaluate(e, batch))
            .collect::<Result<Vec<_>>>()?;
        Ok(QualityReport { results })
    }
}

fn evaluate(expectation: &Expectation, batch: &Batch) -> Result<ExpectationResult> {
    let result = match expectation {
        Expectation::RowCountBetween { min, max } => {
            let count = batch.len();
            aggregate(expectation, (*min..=*max).contains(&count), count.to_string())
        }
        Expectation::NotNull { column } => match column_values(batch, column) {
            None => missing_column(expectation),
            Some(values) => {
                let nulls = values.iter().filter(|v| v.is_null()).count();
                ExpectationResult {
                    expectation: expectation.clone(),
                    success: nulls == 0,
                    unexpected_count: nulls,
                    sample: Vec::new(),
                }
            }
        },
        Expectation::MedianBetween { column, min, max } => match column_values(batch, column) {
            None => missing_column(expectation),
            Some(values) => {
                let numbers: Vec<f64> = values.iter().filter_map(Value::as_f64).collect();
                match median(numbers) {
                    Some(m) => aggregate(expectation, *min <= m && m <= *max, m.to_string()),
                    None => aggregate(expectation, false, "no numeric values".to_string()),
                }
            }
        },
        Expectation::InSet { column, values: allowed } => {
            per_value(expectation, batch, column, |v| {
                allowed.iter().any(|a| *a == display(v))
            })
        }
        Expectation::ValuesBetween { column, min, max } => {
            per_value(expectation, batch, column, |v| {
                v.as_f64().map(|n| *min <= n && n <= *max).unwrap_or(false)
            })
        }
        Expectation::MatchesRegex { column, pattern } => {
            let re = Regex::new(pattern).map_err(|e| {
                EtlError::QualityGate(format!("invalid pattern /{}/: {}", pattern, e))
            })?;
            per_value(expectation, batch, column, |v| re.is_match(&display(v)))
        }
    };
    Ok(result)
}

/// Check each non-null value of a column
fn per_value<F>(expectation: &Expectation, batch: &Batch, column: &str, check: F) -> ExpectationResult
where
    F: Fn(&Value) -> bool,
{
    let values = match column_values(batch, column) {
        Some(values) => values,
        None => return missing_column(expectation),
    };

    let unexpected: Vec<&Value> = values
        .iter()
        .filter(|v| !v.is_null() && !check(v))
        .collect();

    ExpectationResult {
        expectation: expectation.clone(),
        success: unexpected.is_empty(),
        unexpected_count: unexpected.len(),
        sample: unexpected
            .iter()
            .take(SAMPLE_LIMIT)
            .map(|v| display(v))
            .collect(),
    }
}

fn aggregate(expectation: &Expectation, success: bool, observed: String) -> ExpectationResult {
    ExpectationResult {
        expectation: expectation.clone(),
        success,
        unexpected_count: usize::from(!success),
        sample: vec![observed],
    }
}

fn missing_column(expectation: &Expectation) -> ExpectationResult {
    ExpectationResult {
        expectation: expectation.clone(),
        success: false,
        unexpected_count: 0,
        sample: vec!["column not found".to_string()],
    }
}

fn column_values(batch: &Batch, column: &str) -> Option<Vec<Value>> {
    let index = batch.columns().iter().position(|c| c == column)?;
    Some((0..batch.len()).map(|row| batch.cell(row, index)).collect())
}

fn median(mut values: Vec<f64>) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}

/// Plain string form used for set and regex checks
fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
