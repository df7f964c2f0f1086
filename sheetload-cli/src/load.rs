//! Row loading
//!
//! Loading is split in two so that a sheet can be rejected before any DDL
//! touches the database:
//! - [`plan`] validates the sheet against its target table, assigns ids and
//!   coerces every cell into a bind value
//! - [`execute`] writes the plan in bounded batches inside one transaction and
//!   resyncs the id sequence when ids were assigned here
//!
//! Id policy:
//!
//! | strategy          | replace / truncate       | append                   |
//! |-------------------|--------------------------|--------------------------|
//! | strict, generic   | `1..N` in sheet order    | from the sequence        |
//! | lookup            | from the sheet           | from the sheet, upsert   |

use anyhow::{Context, Result};
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::classify::{ID_COLUMN, TEXT_COLUMN, TableStrategy, generic_columns};
use crate::config::LoadMode;
use crate::naming::{Ident, sanitize};
use crate::schema::{ColumnType, STRICT_COLUMNS, TargetTable};
use crate::sequence;
use crate::workbook::{CellValue, SheetDescriptor};

/// PostgreSQL's limit on bind parameters in one statement
pub const MAX_BIND_PARAMS: usize = 65535;

/// Error from validating a sheet against its target table
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    /// Strict sheet is missing required columns (after sanitization)
    SchemaMismatch {
        sheet: String,
        table: String,
        missing: Vec<String>,
    },
    /// A column the strategy relies on could not be found
    MissingColumn { sheet: String, column: String },
}

impl std::fmt::Display for LoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadError::SchemaMismatch {
                sheet,
                table,
                missing,
            } => {
                let expected: Vec<&str> = STRICT_COLUMNS.iter().map(|(name, _)| *name).collect();
                write!(
                    f,
                    "Sheet '{}' ({}): missing columns [{}], expected [{}]",
                    sheet,
                    table,
                    missing.join(", "),
                    expected.join(", ")
                )
            }
            LoadError::MissingColumn { sheet, column } => {
                write!(f, "Sheet '{}': column '{}' not found", sheet, column)
            }
        }
    }
}

impl std::error::Error for LoadError {}

/// A single bind parameter, typed by its target column
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlValue {
    Int(Option<i64>),
    Text(Option<String>),
}

impl SqlValue {
    /// Coerce a cell for a column of the given type
    ///
    /// Text that does not parse as an integer is kept as text so the database
    /// rejects it with its own error.
    pub fn coerce(cell: &CellValue, ty: ColumnType) -> Self {
        match ty {
            ColumnType::Text => SqlValue::Text(cell.to_text()),
            ColumnType::Integer => match cell {
                CellValue::Integer(i) => SqlValue::Int(Some(*i)),
                CellValue::Null => SqlValue::Int(None),
                CellValue::Text(s) => match s.trim().parse::<i64>() {
                    Ok(i) => SqlValue::Int(Some(i)),
                    Err(_) => SqlValue::Text(Some(s.clone())),
                },
            },
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Int(None) | SqlValue::Text(None))
    }
}

/// Rows ready to insert into one table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertPlan {
    /// Column list of the INSERT statement
    pub columns: Vec<Ident>,
    /// One bind value per column per row
    pub rows: Vec<Vec<SqlValue>>,
    /// Overwrite `text` on id conflicts (lookup append)
    pub upsert: bool,
    /// Ids were assigned here, so the sequence must be moved past them
    pub resync_sequence: bool,
}

impl InsertPlan {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Rows per statement, bounded by the configured batch size and the
    /// bind parameter limit
    pub fn rows_per_statement(&self, batch_size: usize) -> usize {
        let per_row = self.columns.len().max(1);
        batch_size.min(MAX_BIND_PARAMS / per_row).max(1)
    }
}

/// Map source columns to target columns and build the bind values
pub fn plan(
    table: &TargetTable,
    mode: LoadMode,
    sheet: &SheetDescriptor,
) -> Result<InsertPlan, LoadError> {
    let sanitized: Vec<String> = sheet.columns.iter().map(|c| sanitize(c)).collect();
    let position = |name: &str| sanitized.iter().position(|c| c == name);

    // (source index, target type) per target data column, in insert order
    let sources: Vec<(usize, ColumnType)> = match table.strategy {
        TableStrategy::StrictFixedSchema => {
            let missing: Vec<String> = STRICT_COLUMNS
                .iter()
                .filter(|(name, _)| position(*name).is_none())
                .map(|(name, _)| name.to_string())
                .collect();
            if !missing.is_empty() {
                return Err(LoadError::SchemaMismatch {
                    sheet: sheet.name.clone(),
                    table: table.name.to_string(),
                    missing,
                });
            }
            STRICT_COLUMNS
                .iter()
                .filter_map(|(name, ty)| position(*name).map(|idx| (idx, *ty)))
                .collect()
        }
        TableStrategy::LookupTable => {
            let mut sources = Vec::with_capacity(2);
            for (name, ty) in [(ID_COLUMN, ColumnType::Integer), (TEXT_COLUMN, ColumnType::Text)] {
                let idx = position(name).ok_or_else(|| LoadError::MissingColumn {
                    sheet: sheet.name.clone(),
                    column: name.to_string(),
                })?;
                sources.push((idx, ty));
            }
            sources
        }
        TableStrategy::GenericTextTable => generic_columns(&sheet.columns)
            .into_iter()
            .map(|(idx, _)| (idx, ColumnType::Text))
            .collect(),
    };

    let assign_ids = table.has_sequence && mode.starts_empty();

    let mut columns = Vec::with_capacity(sources.len() + 1);
    if assign_ids {
        columns.push(Ident::sanitize(ID_COLUMN));
    }
    match table.strategy {
        TableStrategy::LookupTable => {
            columns.push(Ident::sanitize(ID_COLUMN));
            columns.push(Ident::sanitize(TEXT_COLUMN));
        }
        _ => columns.extend(table.data_columns().map(|c| c.name.clone())),
    }

    let rows = sheet
        .rows
        .iter()
        .enumerate()
        .map(|(row_idx, row)| {
            let mut values = Vec::with_capacity(columns.len());
            if assign_ids {
                values.push(SqlValue::Int(Some(row_idx as i64 + 1)));
            }
            values.extend(
                sources
                    .iter()
                    .map(|(idx, ty)| SqlValue::coerce(&row[*idx], *ty)),
            );
            values
        })
        .collect();

    Ok(InsertPlan {
        columns,
        rows,
        upsert: table.strategy == TableStrategy::LookupTable && mode == LoadMode::Append,
        resync_sequence: assign_ids,
    })
}

/// Build one INSERT statement for a batch of rows
fn insert_query<'a>(
    table: &TargetTable,
    columns: &[Ident],
    rows: &'a [Vec<SqlValue>],
    upsert: bool,
) -> QueryBuilder<'a, Postgres> {
    let column_list: Vec<String> = columns.iter().map(Ident::quoted).collect();
    let mut builder = QueryBuilder::<Postgres>::new(format!(
        "INSERT INTO {} ({}) ",
        table.qualified_name(),
        column_list.join(", ")
    ));

    builder.push_values(rows, |mut b, row| {
        for value in row {
            match value {
                SqlValue::Int(v) => b.push_bind(*v),
                SqlValue::Text(v) => b.push_bind(v.clone()),
            };
        }
    });

    if upsert {
        let id = Ident::sanitize(ID_COLUMN).quoted();
        let text = Ident::sanitize(TEXT_COLUMN).quoted();
        builder.push(format!(
            " ON CONFLICT ({}) DO UPDATE SET {} = EXCLUDED.{}",
            id, text, text
        ));
    }

    builder
}

/// Row with every column at its default, used when a sheet has no data columns
fn default_values_sql(table: &TargetTable) -> String {
    format!("INSERT INTO {} DEFAULT VALUES", table.qualified_name())
}

/// Insert the planned rows; returns the number of rows written
pub async fn execute(
    pool: &PgPool,
    table: &TargetTable,
    plan: &InsertPlan,
    batch_size: usize,
) -> Result<u64> {
    let mut inserted = 0u64;

    if !plan.rows.is_empty() {
        let mut tx = pool.begin().await.context("Failed to begin transaction")?;

        if plan.columns.is_empty() {
            // Nothing to bind; every row still gets an id from the sequence
            let sql = default_values_sql(table);
            log::debug!(
                "{}: inserting {} default rows",
                table.qualified_name(),
                plan.row_count()
            );
            for _ in &plan.rows {
                let result = sqlx::query(&sql)
                    .execute(&mut *tx)
                    .await
                    .with_context(|| format!("Failed to insert rows into {}", table.qualified_name()))?;
                inserted += result.rows_affected();
            }
        } else {
            let chunk_size = plan.rows_per_statement(batch_size);
            for (chunk_idx, chunk) in plan.rows.chunks(chunk_size).enumerate() {
                log::debug!(
                    "{}: inserting batch {} ({} rows)",
                    table.qualified_name(),
                    chunk_idx + 1,
                    chunk.len()
                );
                let result = insert_query(table, &plan.columns, chunk, plan.upsert)
                    .build()
                    .execute(&mut *tx)
                    .await
                    .with_context(|| format!("Failed to insert rows into {}", table.qualified_name()))?;
                inserted += result.rows_affected();
            }
        }

        tx.commit()
            .await
            .with_context(|| format!("Failed to commit rows for {}", table.qualified_name()))?;
    }

    if plan.resync_sequence {
        sequence::resync(pool, table).await?;
    }

    Ok(inserted)
}
