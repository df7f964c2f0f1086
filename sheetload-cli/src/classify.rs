//! Pick a table strategy for a sheet
//!
//! Decision order matters, first match wins:
//! 1. sheet name sanitizes to `logs` -> [`TableStrategy::StrictFixedSchema`]
//! 2. exactly two columns sanitizing to `{id, text}` -> [`TableStrategy::LookupTable`]
//! 3. anything else -> [`TableStrategy::GenericTextTable`]

use std::collections::BTreeSet;

use crate::naming::{Ident, sanitize};

/// Sheet name (after sanitization) that forces the strict schema
pub const STRICT_SHEET_NAME: &str = "logs";

pub const ID_COLUMN: &str = "id";
pub const TEXT_COLUMN: &str = "text";

/// Table shape a sheet is materialized as
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableStrategy {
    /// Fixed 8-column typed table with a sequence-backed id
    StrictFixedSchema,
    /// `(id, text)` code table, id always taken from the sheet
    LookupTable,
    /// One text column per sheet column, sequence-backed id
    GenericTextTable,
}

impl TableStrategy {
    /// Whether the table's id column is backed by a bound sequence
    pub fn has_sequence(&self) -> bool {
        !matches!(self, TableStrategy::LookupTable)
    }
}

impl std::fmt::Display for TableStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TableStrategy::StrictFixedSchema => write!(f, "strict"),
            TableStrategy::LookupTable => write!(f, "lookup"),
            TableStrategy::GenericTextTable => write!(f, "generic"),
        }
    }
}

/// Classify a sheet from its raw name and raw column names
pub fn classify(sheet_name: &str, columns: &[String]) -> TableStrategy {
    if sanitize(sheet_name) == STRICT_SHEET_NAME {
        return TableStrategy::StrictFixedSchema;
    }

    if columns.len() == 2 {
        let names: BTreeSet<String> = columns.iter().map(|c| sanitize(c)).collect();
        if names.len() == 2 && names.contains(ID_COLUMN) && names.contains(TEXT_COLUMN) {
            return TableStrategy::LookupTable;
        }
    }

    TableStrategy::GenericTextTable
}

/// Data columns of a generic sheet: every sanitized column except `id`,
/// paired with its source position, in source order
pub fn generic_columns(columns: &[String]) -> Vec<(usize, Ident)> {
    columns
        .iter()
        .enumerate()
        .map(|(idx, raw)| (idx, Ident::sanitize(raw)))
        .filter(|(_, ident)| *ident != ID_COLUMN)
        .collect()
}
