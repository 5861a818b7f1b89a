pub mod backup;
pub mod migrate;
pub mod models;
pub mod places;
pub mod query;
pub mod schema;
pub mod search;
pub mod sqlite;
pub mod tags;
pub mod trips;

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::errors::{GoNextError, Result};
use models::{
    MoveDirection, NoteSearchResult, Place, PlaceDraft, SearchFilter, TableCount, TagTarget,
    Trip, TripDraft, TripPlace, TripPlaceUpdate,
};
use sqlite::SqliteStorage;

pub trait PlaceStore {
    fn list_places(&self) -> Result<Vec<Place>>;
    fn get_place(&self, id: i64) -> Result<Option<Place>>;
    fn save_place(&self, place: PlaceDraft) -> Result<i64>;
    fn delete_place(&self, id: i64) -> Result<bool>;
}

pub trait TripStore {
    fn list_trips(&self) -> Result<Vec<Trip>>;
    fn get_trip(&self, id: i64) -> Result<Option<Trip>>;
    fn get_current_trip(&self) -> Result<Option<Trip>>;
    fn save_trip(&self, trip: TripDraft) -> Result<i64>;
    fn delete_trip(&self, id: i64) -> Result<bool>;

    fn list_trip_places(&self, trip_id: i64) -> Result<Vec<TripPlace>>;
    fn get_trip_place(&self, id: i64) -> Result<Option<TripPlace>>;
    fn get_next_unvisited_place(&self, trip_id: i64) -> Result<Option<TripPlace>>;
    fn add_place_to_trip(&self, trip_id: i64, place_id: i64) -> Result<i64>;
    fn update_trip_place(&self, id: i64, update: TripPlaceUpdate) -> Result<()>;
    fn set_visited(&self, id: i64, visited: bool) -> Result<()>;
    fn move_trip_place(&self, id: i64, direction: MoveDirection) -> Result<bool>;
    fn remove_trip_place(&self, id: i64) -> Result<bool>;
}

pub trait TagStore {
    fn set_tags(&self, target: TagTarget, names: &[String]) -> Result<()>;
    fn list_tags(&self, target: TagTarget) -> Result<Vec<String>>;
}

pub trait SearchStore {
    fn search_places(&self, filter: &SearchFilter) -> Result<Vec<Place>>;
    fn search_trips(&self, filter: &SearchFilter) -> Result<Vec<Trip>>;
    fn search_trip_notes(&self, filter: &SearchFilter) -> Result<Vec<NoteSearchResult>>;
}

pub trait BackupStore {
    fn export_database(&self) -> Result<String>;
    fn import_database(&self, raw: &str) -> Result<()>;
    fn clear_database(&self) -> Result<()>;
    fn database_stats(&self) -> Result<Vec<TableCount>>;
}

/// Process-wide handle to the one database connection. The connection is
/// opened (and migrated) on first use; later callers reuse it.
pub struct Database {
    path: PathBuf,
    storage: Mutex<Option<SqliteStorage>>,
}

impl Database {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            storage: Mutex::new(None),
        }
    }

    pub fn is_open(&self) -> bool {
        self.storage.lock().map(|s| s.is_some()).unwrap_or(false)
    }

    pub fn with<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&SqliteStorage) -> Result<T>,
    {
        let mut guard = self.storage.lock().map_err(|_| GoNextError::Lock)?;
        let storage = match &mut *guard {
            Some(storage) => storage,
            slot => slot.insert(SqliteStorage::open(&self.path)?),
        };
        f(storage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use tempfile::TempDir;

    #[test]
    fn test_database_opens_lazily() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("gonext.db");
        let db = Database::new(&path);
        assert!(!db.is_open());
        assert!(!path.exists());

        let places = db.with(|s| s.list_places()).unwrap();
        assert!(places.is_empty());
        assert!(db.is_open());
        assert!(path.exists());
    }

    #[test]
    fn test_database_shares_one_connection_across_threads() {
        let dir = TempDir::new().unwrap();
        let db = Arc::new(Database::new(&dir.path().join("gonext.db")));

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let db = Arc::clone(&db);
                thread::spawn(move || {
                    db.with(|s| {
                        s.save_place(PlaceDraft {
                            name: format!("Place {}", i),
                            ..Default::default()
                        })
                    })
                    .unwrap()
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let count = db.with(|s| s.list_places()).unwrap().len();
        assert_eq!(count, 4);
    }
}
