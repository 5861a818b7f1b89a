use std::collections::HashSet;

use chrono::Utc;
use rusqlite::{Connection, params};
use tracing::{debug, info};

use crate::errors::{GoNextError, Result};
use super::models::iso_timestamp;
use super::schema::{CREATE_MIGRATIONS_TABLE, Migration, Step};

/// Applies every migration not yet recorded in the ledger, in order.
///
/// Each migration runs in its own transaction together with its ledger
/// row. The first failure rolls that migration back and stops the run.
/// Returns the ids that were applied by this call.
pub fn run_migrations(conn: &Connection, migrations: &[Migration]) -> Result<Vec<i64>> {
    conn.execute(CREATE_MIGRATIONS_TABLE, [])?;
    let done = applied_ids(conn)?;
    let mut applied = Vec::new();

    for migration in migrations {
        if done.contains(&migration.id) {
            debug!(id = migration.id, name = migration.name, "migration already applied");
            continue;
        }
        apply_one(conn, migration).map_err(|source| GoNextError::Migration {
            id: migration.id,
            name: migration.name.to_string(),
            source,
        })?;
        info!(id = migration.id, name = migration.name, "applied migration");
        applied.push(migration.id);
    }
    Ok(applied)
}

pub fn applied_ids(conn: &Connection) -> Result<HashSet<i64>> {
    let mut stmt = conn.prepare("SELECT id FROM migrations ORDER BY id ASC")?;
    let ids = stmt
        .query_map([], |row| row.get(0))?
        .collect::<std::result::Result<HashSet<i64>, _>>()?;
    Ok(ids)
}

fn apply_one(conn: &Connection, migration: &Migration) -> rusqlite::Result<()> {
    let tx = conn.unchecked_transaction()?;
    for step in migration.steps {
        match *step {
            Step::Sql(sql) => tx.execute_batch(sql)?,
            Step::AddColumn { table, column, definition } => {
                if !has_column(&tx, table, column)? {
                    tx.execute_batch(&format!(
                        "ALTER TABLE {} ADD COLUMN {} {}",
                        table, column, definition
                    ))?;
                }
            }
        }
    }
    tx.execute(
        "INSERT INTO migrations (id, name, appliedAt) VALUES (?, ?, ?)",
        params![migration.id, migration.name, iso_timestamp(Utc::now())],
    )?;
    tx.commit()
}

pub fn has_column(conn: &Connection, table: &str, column: &str) -> rusqlite::Result<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", table))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        if name == column {
            return Ok(true);
        }
    }
    Ok(false)
}
