//! Inverted index from location to record ids

use serde::Serialize;
use std::collections::HashMap;

use crate::batch::FlatTable;
use crate::error::Result;
use crate::schema::{columns, INVERTED_INDEX_SCHEMA};
use crate::types::Scalar;

/// One location and the comma-joined ids observed there
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexEntry {
    pub location: String,
    pub ids: String,
}

/// Location → ids, in order of first appearance
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct InvertedIndex {
    entries: Vec<IndexEntry>,
}

impl InvertedIndex {
    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, location: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.location == location)
            .map(|e| e.ids.as_str())
    }

    /// Two-column `(location, id)` table for persistence
    pub fn to_table(&self) -> FlatTable {
        FlatTable::new(
            vec![columns::LOCATION.to_string(), columns::ID.to_string()],
            self.entries
                .iter()
                .map(|e| vec![Scalar::from(e.location.as_str()), Scalar::from(e.ids.as_str())])
                .collect(),
        )
    }
}

/// Group ids by exact location value
///
/// Locations are not normalized. Rows with a null location are not indexed.
pub fn build_inverted_index(table: &FlatTable) -> Result<InvertedIndex> {
    INVERTED_INDEX_SCHEMA.check(table)?;

    let location_col = table.column_index(columns::LOCATION).unwrap_or_default();
    let id_col = table.column_index(columns::ID).unwrap_or_default();

    let mut groups: Vec<(String, Vec<String>)> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for row in table.rows() {
        let location = match &row[location_col] {
            Scalar::Null => continue,
            other => other.to_string(),
        };
        let id = row[id_col].to_string();

        match positions.get(&location) {
            Some(&pos) => groups[pos].1.push(id),
            None => {
                positions.insert(location.clone(), groups.len());
                groups.push((location, vec![id]));
            }
        }
    }

    Ok(InvertedIndex {
        entries: groups
            .into_iter()
            .map(|(location, ids)| IndexEntry {
                location,
                ids: ids.join(","),
            })
            .collect(),
    })
}
