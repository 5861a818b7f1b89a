use std::path::Path;

use rusqlite::functions::FunctionFlags;
use rusqlite::types::ValueRef;
use rusqlite::Connection;
use tracing::{debug, warn};

use crate::errors::Result;
use super::migrate::run_migrations;
use super::schema::MIGRATIONS;

/// SQL function lowercasing text with full Unicode rules. SQLite's own
/// `lower()` and `LIKE` only fold ASCII.
pub const FOLD_CASE_FN: &str = "fold_case";

const NESTED_SAVEPOINT: &str = "gonext_nested";

pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    pub fn new(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        register_functions(&conn)?;
        run_migrations(&conn, MIGRATIONS)?;
        Ok(Self { conn })
    }

    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        debug!(path = %path.display(), "opening database");
        Self::new(Connection::open(path)?)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::new(conn)
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Runs `f` inside a transaction, committing on `Ok` and rolling back
    /// on `Err`. Called while a transaction is already open, the work runs
    /// under a savepoint of the outer transaction instead.
    pub(crate) fn in_transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        if !self.conn.is_autocommit() {
            self.conn
                .execute_batch(&format!("SAVEPOINT {}", NESTED_SAVEPOINT))?;
            return match f(&self.conn) {
                Ok(value) => {
                    self.conn
                        .execute_batch(&format!("RELEASE {}", NESTED_SAVEPOINT))?;
                    Ok(value)
                }
                Err(e) => {
                    let undo = format!(
                        "ROLLBACK TO {0}; RELEASE {0}",
                        NESTED_SAVEPOINT
                    );
                    if let Err(rollback) = self.conn.execute_batch(&undo) {
                        warn!(error = %rollback, "savepoint rollback failed");
                    }
                    Err(e)
                }
            };
        }
        let tx = self.conn.unchecked_transaction()?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }

    /// Runs several store operations as one unit: either all of their
    /// writes land or none do.
    pub fn atomically<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Self) -> Result<T>,
    {
        self.in_transaction(|_| f(self))
    }

    /// Like [`in_transaction`](Self::in_transaction) but with foreign-key
    /// enforcement off for the duration. SQLite ignores `foreign_keys`
    /// changes inside an open transaction, so the pragma brackets it.
    pub(crate) fn with_foreign_keys_suspended<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        self.conn.execute_batch("PRAGMA foreign_keys = OFF;")?;
        let result = self.in_transaction(f);
        let restored = self.conn.execute_batch("PRAGMA foreign_keys = ON;");
        let value = result?;
        restored?;
        Ok(value)
    }

    pub fn foreign_keys_enabled(&self) -> Result<bool> {
        let on: i64 = self.conn.query_row("PRAGMA foreign_keys", [], |row| row.get(0))?;
        Ok(on == 1)
    }
}

fn register_functions(conn: &Connection) -> Result<()> {
    conn.create_scalar_function(
        FOLD_CASE_FN,
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let folded = match ctx.get_raw(0) {
                ValueRef::Text(text) => Some(String::from_utf8_lossy(text).to_lowercase()),
                _ => None,
            };
            Ok(folded)
        },
    )?;
    Ok(())
}
