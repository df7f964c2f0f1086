//! Target table definitions and the DDL that establishes them
//!
//! [`TargetTable::for_strategy`] describes the table a sheet maps to;
//! [`synchronize`] brings the database in line with it for a given load mode,
//! inside a single transaction.

use anyhow::{Context, Result};
use sqlx::PgPool;

use crate::classify::{ID_COLUMN, TEXT_COLUMN, TableStrategy, generic_columns};
use crate::config::LoadMode;
use crate::naming::{Ident, NameError, qualified};

/// Required columns of the strict `logs` table, in table order
pub const STRICT_COLUMNS: [(&str, ColumnType); 8] = [
    ("area", ColumnType::Integer),
    ("type_device", ColumnType::Integer),
    ("device_id", ColumnType::Integer),
    ("type_alarm", ColumnType::Integer),
    ("message", ColumnType::Integer),
    ("date_time_in", ColumnType::Text),
    ("date_time_out", ColumnType::Text),
    ("bit_value", ColumnType::Text),
];

/// Suffix of the sequence backing a table's `id` column
pub const SEQUENCE_SUFFIX: &str = "_id_seq";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Text,
}

impl ColumnType {
    pub fn sql(&self) -> &'static str {
        match self {
            ColumnType::Integer => "integer",
            ColumnType::Text => "text",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: Ident,
    pub ty: ColumnType,
    pub primary_key: bool,
    pub not_null: bool,
}

impl ColumnDef {
    fn data(name: Ident, ty: ColumnType) -> Self {
        Self {
            name,
            ty,
            primary_key: false,
            not_null: false,
        }
    }

    fn id() -> Self {
        Self {
            name: Ident::sanitize(ID_COLUMN),
            ty: ColumnType::Integer,
            primary_key: true,
            not_null: false,
        }
    }
}

/// A table in the target schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetTable {
    pub schema: Ident,
    pub name: Ident,
    pub strategy: TableStrategy,
    /// All columns in table order, including `id`
    pub columns: Vec<ColumnDef>,
    pub has_sequence: bool,
}

impl TargetTable {
    /// Describe the table for a classified sheet
    ///
    /// `source_columns` are the sheet's raw header names; only the generic
    /// strategy derives its columns from them.
    pub fn for_strategy(
        strategy: TableStrategy,
        schema: &Ident,
        name: &Ident,
        source_columns: &[String],
    ) -> Self {
        let columns = match strategy {
            TableStrategy::StrictFixedSchema => {
                let mut columns: Vec<ColumnDef> = STRICT_COLUMNS
                    .iter()
                    .map(|(name, ty)| ColumnDef::data(Ident::sanitize(name), *ty))
                    .collect();
                columns.push(ColumnDef::id());
                columns
            }
            TableStrategy::LookupTable => vec![
                ColumnDef::id(),
                ColumnDef {
                    not_null: true,
                    ..ColumnDef::data(Ident::sanitize(TEXT_COLUMN), ColumnType::Text)
                },
            ],
            TableStrategy::GenericTextTable => std::iter::once(ColumnDef::id())
                .chain(
                    generic_columns(source_columns)
                        .into_iter()
                        .map(|(_, name)| ColumnDef::data(name, ColumnType::Text)),
                )
                .collect(),
        };

        Self {
            schema: schema.clone(),
            name: name.clone(),
            strategy,
            columns,
            has_sequence: strategy.has_sequence(),
        }
    }

    /// `"schema"."table"`
    pub fn qualified_name(&self) -> String {
        qualified(&self.schema, &self.name)
    }

    /// Name of the bound sequence, if the table has one
    pub fn sequence_name(&self) -> Result<Option<Ident>, NameError> {
        if !self.has_sequence {
            return Ok(None);
        }
        self.name.with_suffix(SEQUENCE_SUFFIX).map(Some)
    }

    /// Columns other than `id`, in table order
    pub fn data_columns(&self) -> impl Iterator<Item = &ColumnDef> {
        self.columns.iter().filter(|c| !c.primary_key)
    }
}

/// DDL statements that bring `table` into the state required by `mode`
pub fn ddl_statements(table: &TargetTable, mode: LoadMode) -> Result<Vec<String>, NameError> {
    let full_table = table.qualified_name();
    let full_sequence = table
        .sequence_name()?
        .map(|seq| qualified(&table.schema, &seq));

    let mut statements = Vec::new();

    if mode == LoadMode::Replace {
        statements.push(format!("DROP TABLE IF EXISTS {} CASCADE", full_table));
    }

    if let Some(seq) = &full_sequence {
        statements.push(format!(
            "CREATE SEQUENCE IF NOT EXISTS {} INCREMENT 1 START 1 MINVALUE 1 MAXVALUE 2147483647 CACHE 1",
            seq
        ));
    }

    let column_sql: Vec<String> = table
        .columns
        .iter()
        .map(|column| column_definition(column, full_sequence.as_deref()))
        .collect();
    statements.push(format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        full_table,
        column_sql.join(", ")
    ));

    if mode == LoadMode::Truncate {
        statements.push(format!("TRUNCATE TABLE {}", full_table));
    }

    if let Some(seq) = &full_sequence {
        statements.push(format!(
            "ALTER SEQUENCE {} OWNED BY {}.{}",
            seq,
            full_table,
            Ident::sanitize(ID_COLUMN).quoted()
        ));
    }

    Ok(statements)
}

fn column_definition(column: &ColumnDef, sequence: Option<&str>) -> String {
    let mut sql = format!("{} {}", column.name.quoted(), column.ty.sql());
    if column.primary_key {
        sql.push_str(" PRIMARY KEY");
        if let Some(seq) = sequence {
            // Identifiers are allow-listed, so they cannot break out of the literal
            sql.push_str(&format!(" DEFAULT nextval('{}')", seq));
        }
    }
    if column.not_null {
        sql.push_str(" NOT NULL");
    }
    sql
}

/// Create, reset or keep the table (and its sequence) according to `mode`
pub async fn synchronize(pool: &PgPool, table: &TargetTable, mode: LoadMode) -> Result<()> {
    let statements = ddl_statements(table, mode)
        .with_context(|| format!("Failed to derive names for {}", table.qualified_name()))?;

    let mut tx = pool.begin().await.context("Failed to begin transaction")?;

    for statement in &statements {
        log::debug!("DDL: {}", statement);
        sqlx::query(statement)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to execute DDL: {}", statement))?;
    }

    tx.commit()
        .await
        .with_context(|| format!("Failed to commit schema for {}", table.qualified_name()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> Ident {
        Ident::parse("public").unwrap()
    }

    fn table(strategy: TableStrategy, name: &str, columns: &[&str]) -> TargetTable {
        let columns: Vec<String> = columns.iter().map(|c| c.to_string()).collect();
        TargetTable::for_strategy(strategy, &schema(), &Ident::sanitize(name), &columns)
    }

    fn column_names(table: &TargetTable) -> Vec<&str> {
        table.columns.iter().map(|c| c.name.as_str()).collect()
    }

    #[test]
    fn test_strict_table_shape() {
        let logs = table(TableStrategy::StrictFixedSchema, "Logs", &["whatever"]);

        assert_eq!(
            column_names(&logs),
            vec![
                "area",
                "type_device",
                "device_id",
                "type_alarm",
                "message",
                "date_time_in",
                "date_time_out",
                "bit_value",
                "id"
            ]
        );
        assert!(logs.has_sequence);
        assert_eq!(logs.data_columns().count(), 8);
        assert_eq!(logs.sequence_name().unwrap().unwrap().as_str(), "logs_id_seq");
    }

    #[test]
    fn test_lookup_table_shape() {
        let codes = table(TableStrategy::LookupTable, "ErrCodes", &["id", "text"]);

        assert_eq!(column_names(&codes), vec!["id", "text"]);
        assert!(!codes.has_sequence);
        assert_eq!(codes.sequence_name().unwrap(), None);
        assert!(codes.columns[1].not_null);
    }

    #[test]
    fn test_generic_table_shape() {
        let sensors = table(
            TableStrategy::GenericTextTable,
            "Sensors",
            &["Device ID", "ID", "Value%"],
        );

        assert_eq!(column_names(&sensors), vec!["id", "device_id", "value"]);
        assert!(sensors.columns.iter().skip(1).all(|c| c.ty == ColumnType::Text));
        assert_eq!(
            sensors.columns.iter().filter(|c| c.primary_key).count(),
            1
        );
    }

    #[test]
    fn test_replace_ddl() {
        let sensors = table(TableStrategy::GenericTextTable, "Sensors", &["Device ID"]);
        let ddl = ddl_statements(&sensors, LoadMode::Replace).unwrap();

        assert_eq!(
            ddl,
            vec![
                "DROP TABLE IF EXISTS \"public\".\"sensors\" CASCADE".to_string(),
                "CREATE SEQUENCE IF NOT EXISTS \"public\".\"sensors_id_seq\" INCREMENT 1 START 1 MINVALUE 1 MAXVALUE 2147483647 CACHE 1".to_string(),
                "CREATE TABLE IF NOT EXISTS \"public\".\"sensors\" (\"id\" integer PRIMARY KEY DEFAULT nextval('\"public\".\"sensors_id_seq\"'), \"device_id\" text)".to_string(),
                "ALTER SEQUENCE \"public\".\"sensors_id_seq\" OWNED BY \"public\".\"sensors\".\"id\"".to_string(),
            ]
        );
    }

    #[test]
    fn test_truncate_ddl_keeps_structure() {
        let logs = table(TableStrategy::StrictFixedSchema, "logs", &[]);
        let ddl = ddl_statements(&logs, LoadMode::Truncate).unwrap();

        assert!(!ddl.iter().any(|s| s.starts_with("DROP")));
        assert!(ddl[1].starts_with("CREATE TABLE IF NOT EXISTS \"public\".\"logs\" (\"area\" integer,"));
        assert!(ddl[1].ends_with("\"id\" integer PRIMARY KEY DEFAULT nextval('\"public\".\"logs_id_seq\"'))"));
        assert_eq!(ddl[2], "TRUNCATE TABLE \"public\".\"logs\"");
        assert!(ddl[3].starts_with("ALTER SEQUENCE"));
    }

    #[test]
    fn test_append_ddl_is_not_destructive() {
        let codes = table(TableStrategy::LookupTable, "ErrCodes", &["id", "text"]);
        let ddl = ddl_statements(&codes, LoadMode::Append).unwrap();

        assert_eq!(
            ddl,
            vec![
                "CREATE TABLE IF NOT EXISTS \"public\".\"errcodes\" (\"id\" integer PRIMARY KEY, \"text\" text NOT NULL)".to_string()
            ]
        );
    }
}
