//! Transform pipeline stages
//!
//! Every stage takes the previous batch by reference and returns a new value;
//! the input is never modified. Stages fail fast on an empty batch and, where a
//! stage needs specific columns, on a missing column (checked first).

use std::cmp::Ordering;
use std::collections::HashSet;

use serde_json::Value;

use crate::batch::{Batch, Columnar, FlatTable};
use crate::error::Result;
use crate::schema::{columns, ensure_not_empty, TOP_USER_SCHEMA};
use crate::types::{Row, Scalar, TopUser, WidgetElement, WidgetList};

/// Keep the first row for each distinct `(id, created_at)` pair
pub fn deduplicate(batch: &Batch) -> Result<Batch> {
    ensure_not_empty("deduplicate", batch)?;

    let mut seen: HashSet<(&Scalar, &Scalar)> = HashSet::new();
    let rows = batch
        .rows()
        .iter()
        .filter(|row| seen.insert((&row.id, &row.created_at)))
        .cloned()
        .collect();

    Ok(batch.with_rows(rows))
}

/// Rank users within their age group by descending `user_score`
///
/// Rows come back ordered by `age_group` ascending, then `user_score`
/// descending; ties keep their input order and share the lowest rank
/// (1, 2, 2, 4, ...).
pub fn rank_users(batch: &Batch) -> Result<Batch> {
    ensure_not_empty("rank_users", batch)?;

    let mut rows: Vec<Row> = batch.rows().to_vec();
    rows.sort_by(by_group_then_score);

    let mut position = 0u32;
    let mut rank = 0u32;
    for i in 0..rows.len() {
        let new_group = i == 0 || rows[i].age_group != rows[i - 1].age_group;
        if new_group {
            position = 0;
        }
        position += 1;

        let tied = !new_group
            && score_desc(&rows[i].user_score, &rows[i - 1].user_score) == Ordering::Equal;
        if !tied {
            rank = position;
        }
        rows[i].age_group_rank = Some(rank);
    }

    Ok(Batch::new(
        batch.columns_with(&[columns::AGE_GROUP_RANK]),
        rows,
    ))
}

/// The highest-scoring user of each age group, in ascending age group order
///
/// On equal top scores the earliest row wins.
pub fn get_top_user_per_age_group(batch: &Batch) -> Result<Vec<TopUser>> {
    TOP_USER_SCHEMA.check(batch)?;

    let mut ordered: Vec<&Row> = batch.rows().iter().collect();
    ordered.sort_by(|a, b| by_group_then_score(a, b));

    let mut top = Vec::new();
    let mut last_group: Option<&Scalar> = None;
    for row in ordered {
        if last_group == Some(&row.age_group) {
            continue;
        }
        last_group = Some(&row.age_group);
        top.push(TopUser {
            id: row.id.clone(),
            email: row.email.clone(),
            age_group: row.age_group.clone(),
        });
    }

    Ok(top)
}

/// `(id, email, age_group)` table for the top-user report
pub fn top_users_table(users: &[TopUser]) -> FlatTable {
    FlatTable::new(
        vec![
            columns::ID.to_string(),
            columns::EMAIL.to_string(),
            columns::AGE_GROUP.to_string(),
        ],
        users
            .iter()
            .map(|u| {
                vec![
                    u.id.clone(),
                    u.email.clone().map(Scalar::Text).unwrap_or_default(),
                    u.age_group.clone(),
                ]
            })
            .collect(),
    )
}

/// Emit one row per `widget_list` element
///
/// Rows with a null or empty list produce no output rows. A row that already
/// holds a single element passes through unchanged.
pub fn flatten_widget_list(batch: &Batch) -> Result<Batch> {
    ensure_not_empty("flatten_widget_list", batch)?;

    let mut rows = Vec::with_capacity(batch.len());
    for row in batch.rows() {
        match &row.widget_list {
            WidgetList::Absent => {}
            WidgetList::List(elements) => {
                for element in elements {
                    let mut exploded = row.clone();
                    exploded.widget_list = WidgetList::Element(element.clone());
                    rows.push(exploded);
                }
            }
            WidgetList::Element(_) => rows.push(row.clone()),
        }
    }

    Ok(batch.with_rows(rows))
}

/// Add `widget_name` and `widget_amount` from each row's widget element
///
/// Anything other than a well-formed widget (including an unflattened list)
/// yields null for both.
pub fn extract_widget_info(batch: &Batch) -> Result<Batch> {
    ensure_not_empty("extract_widget_info", batch)?;

    let rows = batch
        .rows()
        .iter()
        .map(|row| {
            let mut row = row.clone();
            match &row.widget_list {
                WidgetList::Element(WidgetElement::Widget { name, amount, .. }) => {
                    row.widget_name = name.clone();
                    row.widget_amount = amount.clone();
                }
                _ => {
                    row.widget_name = Scalar::Null;
                    row.widget_amount = Scalar::Null;
                }
            }
            row
        })
        .collect();

    Ok(Batch::new(
        batch.columns_with(&[columns::WIDGET_NAME, columns::WIDGET_AMOUNT]),
        rows,
    ))
}

/// Stringify every list or mapping cell so the batch fits a flat table
///
/// Composite values are rendered as compact JSON text.
pub fn convert_unsupported_types(batch: &Batch) -> Result<FlatTable> {
    ensure_not_empty("convert_unsupported_types", batch)?;

    let rows = batch
        .rows()
        .iter()
        .map(|row| {
            batch
                .columns()
                .iter()
                .map(|column| flatten_value(row.value(column)))
                .collect()
        })
        .collect();

    Ok(FlatTable::new(batch.columns().to_vec(), rows))
}

fn flatten_value(value: Value) -> Scalar {
    match Scalar::from_json(&value) {
        Some(scalar) => scalar,
        None => Scalar::Text(value.to_string()),
    }
}

fn by_group_then_score(a: &Row, b: &Row) -> Ordering {
    a.age_group
        .cmp(&b.age_group)
        .then_with(|| score_desc(&a.user_score, &b.user_score))
}

/// Descending numeric order with nulls last
fn score_desc(a: &Scalar, b: &Scalar) -> Ordering {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
