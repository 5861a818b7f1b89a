use rusqlite::params;
use tracing::debug;

use crate::errors::Result;
use super::TagStore;
use super::models::TagTarget;
use super::sqlite::SqliteStorage;

/// Splits free-text tag input on `,` or `;` into canonical tag names:
/// trimmed, lowercased, non-empty, first occurrence wins.
pub fn parse_tag_input(input: &str) -> Vec<String> {
    normalize_tags(input.split([',', ';']))
}

/// Canonical form of an already-split list of names.
pub fn normalize_tags<I, S>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for name in names {
        let normalized = name.as_ref().trim().to_lowercase();
        if normalized.is_empty() || out.contains(&normalized) {
            continue;
        }
        out.push(normalized);
    }
    out
}

impl TagStore for SqliteStorage {
    /// Replaces the full tag set of `target`.
    fn set_tags(&self, target: TagTarget, names: &[String]) -> Result<()> {
        let names = normalize_tags(names);
        let delete_sql = format!(
            "DELETE FROM {} WHERE {} = ?",
            target.link_table(),
            target.owner_column()
        );
        let insert_sql = format!(
            "INSERT OR IGNORE INTO {} ({}, tagId) VALUES (?, ?)",
            target.link_table(),
            target.owner_column()
        );

        self.in_transaction(|tx| {
            let mut tag_ids = Vec::with_capacity(names.len());
            for name in &names {
                tx.execute("INSERT OR IGNORE INTO tag (name) VALUES (?)", params![name])?;
                let id: i64 =
                    tx.query_row("SELECT id FROM tag WHERE name = ?", params![name], |row| {
                        row.get(0)
                    })?;
                tag_ids.push(id);
            }
            tx.execute(&delete_sql, params![target.id()])?;
            for tag_id in &tag_ids {
                tx.execute(&insert_sql, params![target.id(), tag_id])?;
            }
            debug!(?target, tags = tag_ids.len(), "replaced tags");
            Ok(())
        })
    }

    fn list_tags(&self, target: TagTarget) -> Result<Vec<String>> {
        let sql = format!(
            "SELECT t.name FROM tag t
             JOIN {link} l ON l.tagId = t.id
             WHERE l.{owner} = ?
             ORDER BY t.name",
            link = target.link_table(),
            owner = target.owner_column()
        );
        let mut stmt = self.conn().prepare(&sql)?;
        let names = stmt
            .query_map(params![target.id()], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(names)
    }
}
