//! Core type definitions for widget activity records

use serde::Serialize;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

use crate::schema::columns;

/// A single non-composite cell value
#[derive(Debug, Clone, Default, Serialize)]
#[serde(untagged)]
pub enum Scalar {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Scalar {
    /// Convert a JSON value, returning `None` for lists and mappings
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Null => Some(Scalar::Null),
            Value::Bool(b) => Some(Scalar::Bool(*b)),
            Value::Number(n) => Some(match n.as_i64() {
                Some(i) => Scalar::Int(i),
                None => Scalar::Float(n.as_f64().unwrap_or(f64::NAN)),
            }),
            Value::String(s) => Some(Scalar::Text(s.clone())),
            Value::Array(_) | Value::Object(_) => None,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Scalar::Null => Value::Null,
            Scalar::Bool(b) => Value::Bool(*b),
            Scalar::Int(i) => Value::from(*i),
            Scalar::Float(f) => serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Scalar::Text(s) => Value::String(s.clone()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Scalar::Null)
    }

    /// Numeric view of the value (integers widen to f64)
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Int(i) => Some(*i as f64),
            Scalar::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Sort class: booleans, then numbers, then text, nulls last
    fn class(&self) -> u8 {
        match self {
            Scalar::Bool(_) => 0,
            Scalar::Int(_) | Scalar::Float(_) => 1,
            Scalar::Text(_) => 2,
            Scalar::Null => 3,
        }
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Int(value)
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::Float(value)
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Text(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::Text(value)
    }
}

impl Ord for Scalar {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Scalar::Null, Scalar::Null) => Ordering::Equal,
            (Scalar::Bool(a), Scalar::Bool(b)) => a.cmp(b),
            (Scalar::Int(a), Scalar::Int(b)) => a.cmp(b),
            (Scalar::Float(a), Scalar::Float(b)) => a.total_cmp(b),
            // Mixed numerics compare by value; an exact tie puts the integer first
            (Scalar::Int(a), Scalar::Float(b)) => {
                (*a as f64).total_cmp(b).then(Ordering::Less)
            }
            (Scalar::Float(a), Scalar::Int(b)) => {
                a.total_cmp(&(*b as f64)).then(Ordering::Greater)
            }
            (Scalar::Text(a), Scalar::Text(b)) => a.cmp(b),
            _ => self.class().cmp(&other.class()),
        }
    }
}

impl PartialOrd for Scalar {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Scalar {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Scalar {}

impl Hash for Scalar {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Scalar::Null => {}
            Scalar::Bool(b) => b.hash(state),
            Scalar::Int(i) => i.hash(state),
            Scalar::Float(f) => f.to_bits().hash(state),
            Scalar::Text(s) => s.hash(state),
        }
    }
}

impl std::fmt::Display for Scalar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scalar::Null => Ok(()),
            Scalar::Bool(b) => write!(f, "{}", b),
            Scalar::Int(i) => write!(f, "{}", i),
            Scalar::Float(v) => write!(f, "{}", v),
            Scalar::Text(s) => write!(f, "{}", s),
        }
    }
}

/// One element of a `widget_list`
#[derive(Debug, Clone, PartialEq)]
pub enum WidgetElement {
    /// A null element
    Absent,
    /// Anything that is not a mapping with scalar `name` and `amount`
    Malformed(Value),
    /// A well-formed widget descriptor; `raw` is the source mapping, extra keys
    /// and key order included
    Widget {
        name: Scalar,
        amount: Scalar,
        raw: Value,
    },
}

impl WidgetElement {
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => WidgetElement::Absent,
            Value::Object(obj) => {
                let name = obj.get("name").and_then(Scalar::from_json);
                let amount = obj.get("amount").and_then(Scalar::from_json);
                match (name, amount) {
                    (Some(name), Some(amount)) => WidgetElement::Widget {
                        name,
                        amount,
                        raw: value.clone(),
                    },
                    _ => WidgetElement::Malformed(value.clone()),
                }
            }
            other => WidgetElement::Malformed(other.clone()),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            WidgetElement::Absent => Value::Null,
            WidgetElement::Malformed(v) => v.clone(),
            WidgetElement::Widget { raw, .. } => raw.clone(),
        }
    }
}

/// Contents of the `widget_list` column
///
/// Raw input carries a `List`; after flattening each row carries a single
/// `Element`. Null or missing lists are `Absent`.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum WidgetList {
    #[default]
    Absent,
    List(Vec<WidgetElement>),
    Element(WidgetElement),
}

impl WidgetList {
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => WidgetList::Absent,
            Value::Array(items) => {
                WidgetList::List(items.iter().map(WidgetElement::from_json).collect())
            }
            other => WidgetList::Element(WidgetElement::from_json(other)),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            WidgetList::Absent => Value::Null,
            WidgetList::List(items) => {
                Value::Array(items.iter().map(WidgetElement::to_json).collect())
            }
            WidgetList::Element(element) => element.to_json(),
        }
    }
}

/// A single activity record
///
/// Fields the pipeline reasons about are typed; every other input field is
/// carried through untouched in `extra`, in input order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    pub id: Scalar,
    pub created_at: Scalar,
    pub age_group: Scalar,
    /// Numeric or null
    pub user_score: Scalar,
    pub email: Option<String>,
    pub location: Option<String>,
    pub widget_list: WidgetList,
    /// Set by `rank_users`
    pub age_group_rank: Option<u32>,
    /// Set by `extract_widget_info`
    pub widget_name: Scalar,
    /// Set by `extract_widget_info`
    pub widget_amount: Scalar,
    pub extra: Map<String, Value>,
}

impl Row {
    /// Build a row from a JSON object, checking the types of the typed fields
    pub fn from_json(object: &Map<String, Value>) -> Result<Self, String> {
        let mut row = Row::default();

        for (key, value) in object {
            match key.as_str() {
                columns::ID => row.id = scalar_field(key, value)?,
                columns::CREATED_AT => row.created_at = scalar_field(key, value)?,
                columns::AGE_GROUP => row.age_group = scalar_field(key, value)?,
                columns::USER_SCORE => {
                    let score = scalar_field(key, value)?;
                    if !score.is_null() && score.as_f64().is_none() {
                        return Err(format!("'{}' must be numeric, got {}", key, value));
                    }
                    row.user_score = score;
                }
                columns::EMAIL => row.email = text_field(key, value)?,
                columns::LOCATION => row.location = text_field(key, value)?,
                columns::WIDGET_LIST => row.widget_list = WidgetList::from_json(value),
                columns::AGE_GROUP_RANK => {
                    row.age_group_rank = match value {
                        Value::Null => None,
                        v => Some(
                            v.as_u64()
                                .and_then(|r| u32::try_from(r).ok())
                                .filter(|r| *r > 0)
                                .ok_or_else(|| {
                                    format!("'{}' must be a positive integer, got {}", key, v)
                                })?,
                        ),
                    }
                }
                columns::WIDGET_NAME => row.widget_name = scalar_field(key, value)?,
                columns::WIDGET_AMOUNT => row.widget_amount = scalar_field(key, value)?,
                // A null pass-through cell reads the same as an absent one
                _ if value.is_null() => {}
                _ => {
                    row.extra.insert(key.clone(), value.clone());
                }
            }
        }

        Ok(row)
    }

    /// Like [`Row::from_json`], for rows that already went through flattening:
    /// the `widget_list` cell is one element, even when that element is a list
    pub fn from_flattened_json(object: &Map<String, Value>) -> Result<Self, String> {
        let mut row = Row::from_json(object)?;
        if let Some(value) = object.get(columns::WIDGET_LIST) {
            row.widget_list = WidgetList::Element(WidgetElement::from_json(value));
        }
        Ok(row)
    }

    /// Value of a named column as JSON (null when the row does not carry it)
    pub fn value(&self, column: &str) -> Value {
        match column {
            columns::ID => self.id.to_json(),
            columns::CREATED_AT => self.created_at.to_json(),
            columns::AGE_GROUP => self.age_group.to_json(),
            columns::USER_SCORE => self.user_score.to_json(),
            columns::EMAIL => optional_text(&self.email),
            columns::LOCATION => optional_text(&self.location),
            columns::WIDGET_LIST => self.widget_list.to_json(),
            columns::AGE_GROUP_RANK => self
                .age_group_rank
                .map(Value::from)
                .unwrap_or(Value::Null),
            columns::WIDGET_NAME => self.widget_name.to_json(),
            columns::WIDGET_AMOUNT => self.widget_amount.to_json(),
            other => self.extra.get(other).cloned().unwrap_or(Value::Null),
        }
    }
}

fn scalar_field(key: &str, value: &Value) -> Result<Scalar, String> {
    Scalar::from_json(value).ok_or_else(|| format!("'{}' must be a scalar, got {}", key, value))
}

fn text_field(key: &str, value: &Value) -> Result<Option<String>, String> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s.clone())),
        other => Err(format!("'{}' must be a string, got {}", key, other)),
    }
}

fn optional_text(value: &Option<String>) -> Value {
    value
        .as_ref()
        .map(|s| Value::String(s.clone()))
        .unwrap_or(Value::Null)
}

/// Top-ranked user of an age group
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopUser {
    pub id: Scalar,
    pub email: Option<String>,
    pub age_group: Scalar,
}
