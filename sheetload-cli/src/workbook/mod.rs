//! In-memory representation of a workbook's sheets
//!
//! The reader turns each sheet into a [`SheetDescriptor`]: a header of raw
//! column names plus rows of [`CellValue`]s aligned with that header.

pub mod reader;

pub use reader::Workbook;

use anyhow::Result;

/// A single scalar cell
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellValue {
    Integer(i64),
    Text(String),
    Null,
}

impl CellValue {
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// Text rendering used when the target column is `text`
    pub fn to_text(&self) -> Option<String> {
        match self {
            CellValue::Integer(i) => Some(i.to_string()),
            CellValue::Text(s) => Some(s.clone()),
            CellValue::Null => None,
        }
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Integer(value)
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        if value.trim().is_empty() {
            CellValue::Null
        } else {
            CellValue::Text(value.to_string())
        }
    }
}

/// One row; cells are positional and line up with [`SheetDescriptor::columns`]
pub type Row = Vec<CellValue>;

/// A sheet as read from the workbook
#[derive(Debug, Clone, PartialEq)]
pub struct SheetDescriptor {
    /// Raw sheet name
    pub name: String,
    /// Raw header names, in sheet order
    pub columns: Vec<String>,
    /// Data rows, each exactly `columns.len()` wide
    pub rows: Vec<Row>,
}

impl SheetDescriptor {
    /// Build a sheet, padding or truncating every row to the header width
    pub fn new(name: impl Into<String>, columns: Vec<String>, rows: Vec<Row>) -> Self {
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, CellValue::Null);
                row
            })
            .collect();

        Self {
            name: name.into(),
            columns,
            rows,
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

/// Anything that can hand out sheets by name, in a fixed order
pub trait SheetSource {
    fn sheet_names(&self) -> Vec<String>;

    fn read_sheet(&mut self, sheet_name: &str) -> Result<SheetDescriptor>;
}

impl SheetSource for Workbook {
    fn sheet_names(&self) -> Vec<String> {
        Workbook::sheet_names(self)
    }

    fn read_sheet(&mut self, sheet_name: &str) -> Result<SheetDescriptor> {
        Workbook::read_sheet(self, sheet_name)
    }
}

/// Sheets already in memory
impl SheetSource for Vec<SheetDescriptor> {
    fn sheet_names(&self) -> Vec<String> {
        self.iter().map(|s| s.name.clone()).collect()
    }

    fn read_sheet(&mut self, sheet_name: &str) -> Result<SheetDescriptor> {
        self.iter()
            .find(|s| s.name == sheet_name)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("Sheet '{}' not found", sheet_name))
    }
}
