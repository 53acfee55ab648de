//! Per-stage column contracts
//!
//! Each operation that depends on specific columns declares a [`Schema`] and
//! checks it before touching any row. Missing columns are reported all at once;
//! cell kinds are checked only once the columns exist and the input is non-empty.

use serde_json::Value;

use crate::batch::Columnar;
use crate::error::{EtlError, Result};

/// Well-known column names
pub mod columns {
    pub const ID: &str = "id";
    pub const CREATED_AT: &str = "created_at";
    pub const AGE_GROUP: &str = "age_group";
    pub const USER_SCORE: &str = "user_score";
    pub const EMAIL: &str = "email";
    pub const LOCATION: &str = "location";
    pub const WIDGET_LIST: &str = "widget_list";
    pub const AGE_GROUP_RANK: &str = "age_group_rank";
    pub const WIDGET_NAME: &str = "widget_name";
    pub const WIDGET_AMOUNT: &str = "widget_amount";
}

/// Kind of value a column is expected to hold
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// Any scalar (ids, categorical labels, timestamps)
    Scalar,
    Numeric,
    Text,
}

impl ColumnKind {
    /// Whether a cell fits this kind; null fits every kind
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Null) => true,
            (ColumnKind::Scalar, v) => !v.is_array() && !v.is_object(),
            (ColumnKind::Numeric, v) => v.is_number(),
            (ColumnKind::Text, v) => v.is_string(),
        }
    }
}

impl std::fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ColumnKind::Scalar => write!(f, "scalar"),
            ColumnKind::Numeric => write!(f, "numeric"),
            ColumnKind::Text => write!(f, "text"),
        }
    }
}

/// A required column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub kind: ColumnKind,
}

impl ColumnSpec {
    pub const fn new(name: &'static str, kind: ColumnKind) -> Self {
        Self { name, kind }
    }
}

/// Structural contract for one stage
#[derive(Debug, Clone, Copy)]
pub struct Schema {
    pub stage: &'static str,
    pub required: &'static [ColumnSpec],
}

impl Schema {
    /// Fail with every required column the input lacks, in contract order
    pub fn check_columns<T: Columnar + ?Sized>(&self, input: &T) -> Result<()> {
        let missing: Vec<String> = self
            .required
            .iter()
            .filter(|spec| !input.has_column(spec.name))
            .map(|spec| spec.name.to_string())
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(EtlError::MissingColumn {
                stage: self.stage,
                missing,
            })
        }
    }

    /// Fail on the first cell that does not fit its column's kind
    pub fn check_kinds<T: Columnar + ?Sized>(&self, input: &T) -> Result<()> {
        for spec in self.required {
            let Some(column) = input.columns().iter().position(|c| c == spec.name) else {
                continue;
            };
            for row in 0..input.len() {
                let value = input.cell(row, column);
                if !spec.kind.accepts(&value) {
                    return Err(EtlError::ColumnKind {
                        stage: self.stage,
                        column: spec.name,
                        expected: spec.kind,
                        row: row + 1,
                        found: value.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Column check first, then the non-empty check, then cell kinds
    pub fn check<T: Columnar + ?Sized>(&self, input: &T) -> Result<()> {
        self.check_columns(input)?;
        ensure_not_empty(self.stage, input)?;
        self.check_kinds(input)
    }
}

/// Fail with `EmptyInput` when the input has no rows
pub fn ensure_not_empty<T: Columnar + ?Sized>(stage: &'static str, input: &T) -> Result<()> {
    if input.is_empty() {
        Err(EtlError::EmptyInput { stage })
    } else {
        Ok(())
    }
}

pub const TOP_USER_SCHEMA: Schema = Schema {
    stage: "get_top_user_per_age_group",
    required: &[
        ColumnSpec::new(columns::AGE_GROUP, ColumnKind::Scalar),
        ColumnSpec::new(columns::USER_SCORE, ColumnKind::Numeric),
        ColumnSpec::new(columns::ID, ColumnKind::Scalar),
        ColumnSpec::new(columns::EMAIL, ColumnKind::Text),
    ],
};

pub const INVERTED_INDEX_SCHEMA: Schema = Schema {
    stage: "build_inverted_index",
    required: &[
        ColumnSpec::new(columns::LOCATION, ColumnKind::Text),
        ColumnSpec::new(columns::ID, ColumnKind::Scalar),
    ],
};
