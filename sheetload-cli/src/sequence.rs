//! Keep id sequences ahead of explicitly assigned ids

use anyhow::{Context, Result};
use sqlx::PgPool;

use crate::classify::ID_COLUMN;
use crate::naming::{Ident, qualified};
use crate::schema::TargetTable;

/// `setval` statement moving the sequence to `max(id) + 1`; `$1` is the
/// qualified sequence name
fn resync_sql(table: &TargetTable) -> String {
    format!(
        "SELECT setval($1::regclass, COALESCE((SELECT MAX({}) FROM {}), 0) + 1, false)",
        Ident::sanitize(ID_COLUMN).quoted(),
        table.qualified_name()
    )
}

/// Point the table's sequence at `max(id) + 1` (1 for an empty table)
///
/// Returns the next value the sequence will hand out, or `None` for tables
/// without a sequence.
pub async fn resync(pool: &PgPool, table: &TargetTable) -> Result<Option<i64>> {
    let sequence = table
        .sequence_name()
        .with_context(|| format!("Failed to derive sequence name for {}", table.qualified_name()))?;
    let Some(sequence) = sequence else {
        return Ok(None);
    };
    let full_sequence = qualified(&table.schema, &sequence);

    let next: i64 = sqlx::query_scalar(&resync_sql(table))
        .bind(&full_sequence)
        .fetch_one(pool)
        .await
        .with_context(|| format!("Failed to resync sequence {}", full_sequence))?;

    log::debug!("{} next value is {}", full_sequence, next);
    Ok(Some(next))
}

/// Value the next `nextval` call on the table's sequence will return
#[cfg(test)]
pub(crate) async fn next_value(pool: &PgPool, table: &TargetTable) -> Result<i64> {
    let sequence = table
        .sequence_name()?
        .context("table has no sequence")?;
    let (last_value, is_called): (i64, bool) = sqlx::query_as(&format!(
        "SELECT last_value, is_called FROM {}",
        qualified(&table.schema, &sequence)
    ))
    .fetch_one(pool)
    .await?;

    Ok(if is_called { last_value + 1 } else { last_value })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::TableStrategy;

    #[test]
    fn test_resync_sql() {
        let table = TargetTable::for_strategy(
            TableStrategy::GenericTextTable,
            &Ident::parse("staging").unwrap(),
            &Ident::sanitize("Sensors"),
            &["Device ID".to_string()],
        );

        assert_eq!(
            resync_sql(&table),
            "SELECT setval($1::regclass, COALESCE((SELECT MAX(\"id\") FROM \"staging\".\"sensors\"), 0) + 1, false)"
        );
    }
}
