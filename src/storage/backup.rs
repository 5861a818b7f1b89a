use chrono::{DateTime, Utc};
use rusqlite::types::{Value, ValueRef};
use rusqlite::{Connection, params_from_iter};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json};
use tracing::info;

use crate::errors::{GoNextError, Result};
use super::BackupStore;
use super::models::{TableCount, iso_timestamp};
use super::schema::TABLES;
use super::sqlite::SqliteStorage;

pub const BACKUP_VERSION: u64 = 1;

pub type RawRow = Map<String, Json>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BackupData {
    #[serde(default)]
    pub place: Vec<RawRow>,
    #[serde(default)]
    pub trip: Vec<RawRow>,
    #[serde(default)]
    pub trip_place: Vec<RawRow>,
    #[serde(default)]
    pub tag: Vec<RawRow>,
    #[serde(default)]
    pub place_tag: Vec<RawRow>,
    #[serde(default)]
    pub trip_tag: Vec<RawRow>,
    #[serde(default)]
    pub trip_place_tag: Vec<RawRow>,
}

impl BackupData {
    pub fn rows(&self, table: &str) -> &[RawRow] {
        match table {
            "place" => &self.place,
            "trip" => &self.trip,
            "trip_place" => &self.trip_place,
            "tag" => &self.tag,
            "place_tag" => &self.place_tag,
            "trip_tag" => &self.trip_tag,
            "trip_place_tag" => &self.trip_place_tag,
            _ => &[],
        }
    }

    fn rows_mut(&mut self, table: &str) -> Option<&mut Vec<RawRow>> {
        match table {
            "place" => Some(&mut self.place),
            "trip" => Some(&mut self.trip),
            "trip_place" => Some(&mut self.trip_place),
            "tag" => Some(&mut self.tag),
            "place_tag" => Some(&mut self.place_tag),
            "trip_tag" => Some(&mut self.trip_tag),
            "trip_place_tag" => Some(&mut self.trip_place_tag),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupDocument {
    pub version: u64,
    #[serde(default)]
    pub exported_at: String,
    pub data: BackupData,
}

/// Timestamp columns decoded as `DateTime<Utc>` on read, and whether NULL
/// is allowed in them.
const TIMESTAMP_COLUMNS: [(&str, bool); 2] = [("createdAt", false), ("visitDate", true)];

impl BackupDocument {
    /// Validates and decodes a backup. Every structural problem is reported
    /// as [`GoNextError::InvalidBackupFormat`]. Timestamps are rewritten in
    /// the stored format; a `null` table counts as empty.
    pub fn parse(raw: &str) -> Result<BackupDocument> {
        let mut value: Json = serde_json::from_str(raw)
            .map_err(|e| GoNextError::InvalidBackupFormat(format!("not valid JSON: {}", e)))?;

        let version = value.get("version").cloned().unwrap_or(Json::Null);
        if version.as_f64() != Some(BACKUP_VERSION as f64) {
            return Err(GoNextError::InvalidBackupFormat(format!(
                "unsupported version {}",
                version
            )));
        }
        value["version"] = Json::from(BACKUP_VERSION);

        let Some(data) = value.get_mut("data").and_then(Json::as_object_mut) else {
            return Err(GoNextError::InvalidBackupFormat("missing data object".into()));
        };
        data.retain(|table, rows| TABLES.contains(&table.as_str()) && !rows.is_null());
        for (table, rows) in data.iter_mut() {
            let Some(rows) = rows.as_array_mut() else {
                return Err(GoNextError::InvalidBackupFormat(format!(
                    "table {} is not a list",
                    table
                )));
            };
            for row in rows {
                let Some(row) = row.as_object_mut() else {
                    return Err(GoNextError::InvalidBackupFormat(format!(
                        "table {} contains a non-object row",
                        table
                    )));
                };
                if let Some(column) = row.keys().find(|c| !is_safe_identifier(c)) {
                    return Err(GoNextError::InvalidBackupFormat(format!(
                        "table {} has invalid column name {:?}",
                        table, column
                    )));
                }
                normalize_timestamps(table, row)?;
            }
        }

        serde_json::from_value(value).map_err(|e| GoNextError::InvalidBackupFormat(e.to_string()))
    }
}

fn normalize_timestamps(table: &str, row: &mut RawRow) -> Result<()> {
    for (column, nullable) in TIMESTAMP_COLUMNS {
        let Some(cell) = row.get_mut(column) else {
            continue;
        };
        let parsed = match &*cell {
            Json::Null if nullable => continue,
            Json::String(text) => DateTime::parse_from_rfc3339(text.trim()).ok(),
            _ => None,
        };
        let Some(parsed) = parsed else {
            return Err(GoNextError::InvalidBackupFormat(format!(
                "table {} has invalid {} {}",
                table, column, cell
            )));
        };
        *cell = Json::String(iso_timestamp(parsed.with_timezone(&Utc)));
    }
    Ok(())
}

fn is_safe_identifier(name: &str) -> bool {
    !name.is_empty()
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !name.starts_with(|c: char| c.is_ascii_digit())
}

fn sql_to_json(value: ValueRef<'_>) -> Json {
    match value {
        ValueRef::Null => Json::Null,
        ValueRef::Integer(i) => Json::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f).map_or(Json::Null, Json::Number),
        ValueRef::Text(t) => Json::String(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Json::Array(b.iter().map(|byte| Json::from(*byte)).collect()),
    }
}

fn json_to_sql(value: &Json) -> Value {
    match value {
        Json::Null => Value::Null,
        Json::Bool(b) => Value::Integer(*b as i64),
        Json::Number(n) => match n.as_i64() {
            Some(i) => Value::Integer(i),
            None => n.as_f64().map_or(Value::Null, Value::Real),
        },
        Json::String(s) => Value::Text(s.clone()),
        other => Value::Text(other.to_string()),
    }
}

fn dump_table(conn: &Connection, table: &str) -> Result<Vec<RawRow>> {
    let mut stmt = conn.prepare(&format!("SELECT * FROM {}", table))?;
    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    let rows = stmt
        .query_map([], |row| {
            let mut map = Map::new();
            for (i, column) in columns.iter().enumerate() {
                map.insert(column.clone(), sql_to_json(row.get_ref(i)?));
            }
            Ok(map)
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn delete_all(conn: &Connection) -> Result<()> {
    for table in TABLES {
        conn.execute(&format!("DELETE FROM {}", table), [])?;
    }
    Ok(())
}

fn insert_row(conn: &Connection, table: &str, row: &RawRow) -> Result<()> {
    let columns: Vec<&str> = row.keys().map(String::as_str).collect();
    let quoted: Vec<String> = columns.iter().map(|c| format!("\"{}\"", c)).collect();
    let placeholders = vec!["?"; columns.len()].join(", ");
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        table,
        quoted.join(", "),
        placeholders
    );
    let values: Vec<Value> = row.values().map(json_to_sql).collect();
    conn.execute(&sql, params_from_iter(values.iter()))?;
    Ok(())
}

impl SqliteStorage {
    pub fn snapshot(&self) -> Result<BackupDocument> {
        let mut data = BackupData::default();
        for table in TABLES {
            let rows = dump_table(self.conn(), table)?;
            if let Some(slot) = data.rows_mut(table) {
                *slot = rows;
            }
        }
        Ok(BackupDocument {
            version: BACKUP_VERSION,
            exported_at: iso_timestamp(Utc::now()),
            data,
        })
    }

    pub fn restore(&self, document: &BackupDocument) -> Result<usize> {
        if document.version != BACKUP_VERSION {
            return Err(GoNextError::InvalidBackupFormat(format!(
                "unsupported version {}",
                document.version
            )));
        }
        self.with_foreign_keys_suspended(|tx| {
            delete_all(tx)?;
            let mut inserted = 0;
            for table in TABLES {
                for row in document.data.rows(table) {
                    if row.is_empty() {
                        continue;
                    }
                    insert_row(tx, table, row)?;
                    inserted += 1;
                }
            }
            Ok(inserted)
        })
    }
}

impl BackupStore for SqliteStorage {
    fn export_database(&self) -> Result<String> {
        let document = self.snapshot()?;
        let json = serde_json::to_string_pretty(&document)?;
        info!(bytes = json.len(), "exported database");
        Ok(json)
    }

    /// Replaces the whole dataset with the backup's rows. On any failure
    /// the previous dataset is left untouched.
    fn import_database(&self, raw: &str) -> Result<()> {
        let document = BackupDocument::parse(raw)?;
        let inserted = self.restore(&document)?;
        info!(rows = inserted, exported_at = %document.exported_at, "imported backup");
        Ok(())
    }

    fn clear_database(&self) -> Result<()> {
        self.with_foreign_keys_suspended(|tx| {
            delete_all(tx)?;
            let names = TABLES
                .iter()
                .map(|t| format!("'{}'", t))
                .collect::<Vec<_>>()
                .join(", ");
            tx.execute(
                &format!("DELETE FROM sqlite_sequence WHERE name IN ({})", names),
                [],
            )?;
            Ok(())
        })?;
        info!("cleared database");
        Ok(())
    }

    fn database_stats(&self) -> Result<Vec<TableCount>> {
        TABLES
            .iter()
            .map(|&table| -> Result<TableCount> {
                let rows: i64 = self.conn().query_row(
                    &format!("SELECT COUNT(*) FROM {}", table),
                    [],
                    |row| row.get(0),
                )?;
                Ok(TableCount { table, rows })
            })
            .collect()
    }
}
