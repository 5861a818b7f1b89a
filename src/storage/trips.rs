use chrono::Utc;
use rusqlite::types::Value;
use rusqlite::{OptionalExtension, Row, params, params_from_iter};
use tracing::debug;

use crate::errors::{GoNextError, Result};
use super::TripStore;
use super::models::{
    MoveDirection, Trip, TripDraft, TripPlace, TripPlaceUpdate, iso_timestamp, json_or_default,
};
use super::places::optional_text;
use super::sqlite::SqliteStorage;

pub(crate) const TRIP_COLUMNS: &str =
    "t.id, t.title, t.description, t.startDate, t.endDate, t.createdAt, t.current";

const TRIP_PLACE_COLUMNS: &str =
    "tp.id, tp.tripId, tp.placeId, tp.orderIndex, tp.visited, tp.visitDate, tp.notes, tp.photos";

pub(crate) fn row_to_trip(row: &Row) -> rusqlite::Result<Trip> {
    let current: i64 = row.get(6)?;
    Ok(Trip {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        start_date: row.get(3)?,
        end_date: row.get(4)?,
        created_at: row.get(5)?,
        current: current != 0,
    })
}

fn row_to_trip_place(row: &Row) -> rusqlite::Result<TripPlace> {
    let visited: i64 = row.get(4)?;
    let photos: Option<String> = row.get(7)?;
    Ok(TripPlace {
        id: row.get(0)?,
        trip_id: row.get(1)?,
        place_id: row.get(2)?,
        order_index: row.get(3)?,
        visited: visited != 0,
        visit_date: row.get(5)?,
        notes: row.get(6)?,
        photos: json_or_default(photos.as_deref()),
    })
}

impl SqliteStorage {
    fn query_trip_place(&self, sql_tail: &str, id: i64) -> Result<Option<TripPlace>> {
        let sql = format!("SELECT {} FROM trip_place tp {}", TRIP_PLACE_COLUMNS, sql_tail);
        let stop = self
            .conn()
            .query_row(&sql, params![id], row_to_trip_place)
            .optional()?;
        Ok(stop)
    }
}

impl TripStore for SqliteStorage {
    fn list_trips(&self) -> Result<Vec<Trip>> {
        let sql = format!(
            "SELECT {} FROM trip t ORDER BY t.createdAt DESC, t.id DESC",
            TRIP_COLUMNS
        );
        let mut stmt = self.conn().prepare(&sql)?;
        let trips = stmt
            .query_map([], row_to_trip)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(trips)
    }

    fn get_trip(&self, id: i64) -> Result<Option<Trip>> {
        let sql = format!("SELECT {} FROM trip t WHERE t.id = ?", TRIP_COLUMNS);
        let trip = self
            .conn()
            .query_row(&sql, params![id], row_to_trip)
            .optional()?;
        Ok(trip)
    }

    fn get_current_trip(&self) -> Result<Option<Trip>> {
        let sql = format!(
            "SELECT {} FROM trip t WHERE t.current = 1
             ORDER BY t.createdAt DESC, t.id DESC LIMIT 1",
            TRIP_COLUMNS
        );
        let trip = self.conn().query_row(&sql, [], row_to_trip).optional()?;
        Ok(trip)
    }

    /// Saving a trip as current demotes every other trip in the same
    /// transaction.
    fn save_trip(&self, trip: TripDraft) -> Result<i64> {
        let title = trip.title.trim().to_string();
        if title.is_empty() {
            return Err(GoNextError::InvalidInput("trip title is required".into()));
        }
        let description = optional_text(trip.description);
        let start_date = optional_text(trip.start_date);
        let end_date = optional_text(trip.end_date);

        self.in_transaction(|tx| {
            let id = match trip.id {
                Some(id) => {
                    let changes = tx.execute(
                        "UPDATE trip
                         SET title = ?, description = ?, startDate = ?, endDate = ?, current = ?
                         WHERE id = ?",
                        params![title, description, start_date, end_date, trip.current as i32, id],
                    )?;
                    if changes == 0 {
                        return Err(GoNextError::NotFound(format!("Trip with id {} not found", id)));
                    }
                    id
                }
                None => {
                    tx.execute(
                        "INSERT INTO trip (title, description, startDate, endDate, createdAt, current)
                         VALUES (?, ?, ?, ?, ?, ?)",
                        params![
                            title,
                            description,
                            start_date,
                            end_date,
                            iso_timestamp(Utc::now()),
                            trip.current as i32,
                        ],
                    )?;
                    tx.last_insert_rowid()
                }
            };
            if trip.current {
                let demoted = tx.execute(
                    "UPDATE trip SET current = 0 WHERE id != ? AND current = 1",
                    params![id],
                )?;
                debug!(trip_id = id, demoted, "set current trip");
            }
            Ok(id)
        })
    }

    fn delete_trip(&self, id: i64) -> Result<bool> {
        let changes = self.conn().execute("DELETE FROM trip WHERE id = ?", params![id])?;
        Ok(changes > 0)
    }

    fn list_trip_places(&self, trip_id: i64) -> Result<Vec<TripPlace>> {
        let sql = format!(
            "SELECT {} FROM trip_place tp WHERE tp.tripId = ? ORDER BY tp.orderIndex ASC, tp.id ASC",
            TRIP_PLACE_COLUMNS
        );
        let mut stmt = self.conn().prepare(&sql)?;
        let stops = stmt
            .query_map(params![trip_id], row_to_trip_place)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(stops)
    }

    fn get_trip_place(&self, id: i64) -> Result<Option<TripPlace>> {
        self.query_trip_place("WHERE tp.id = ?", id)
    }

    fn get_next_unvisited_place(&self, trip_id: i64) -> Result<Option<TripPlace>> {
        self.query_trip_place(
            "WHERE tp.tripId = ? AND tp.visited = 0 ORDER BY tp.orderIndex ASC, tp.id ASC LIMIT 1",
            trip_id,
        )
    }

    fn add_place_to_trip(&self, trip_id: i64, place_id: i64) -> Result<i64> {
        self.in_transaction(|tx| {
            let max: Option<i64> = tx.query_row(
                "SELECT MAX(orderIndex) FROM trip_place WHERE tripId = ?",
                params![trip_id],
                |row| row.get(0),
            )?;
            let next = max.unwrap_or(0) + 1;
            tx.execute(
                "INSERT INTO trip_place (tripId, placeId, orderIndex, visited) VALUES (?, ?, ?, 0)",
                params![trip_id, place_id, next],
            )?;
            Ok(tx.last_insert_rowid())
        })
    }

    fn update_trip_place(&self, id: i64, update: TripPlaceUpdate) -> Result<()> {
        if update.is_empty() {
            return Ok(());
        }
        let mut sets = Vec::new();
        let mut values: Vec<Value> = Vec::new();

        if let Some(order_index) = update.order_index {
            sets.push("orderIndex = ?");
            values.push(Value::Integer(order_index));
        }
        if let Some(visited) = update.visited {
            sets.push("visited = ?");
            values.push(Value::Integer(visited as i64));
        }
        if let Some(visit_date) = update.visit_date {
            sets.push("visitDate = ?");
            values.push(visit_date.map_or(Value::Null, |d| Value::Text(iso_timestamp(d))));
        }
        if let Some(notes) = update.notes {
            sets.push("notes = ?");
            values.push(optional_text(notes).map_or(Value::Null, Value::Text));
        }
        if let Some(photos) = update.photos {
            sets.push("photos = ?");
            values.push(Value::Text(serde_json::to_string(&photos)?));
        }
        values.push(Value::Integer(id));

        let sql = format!("UPDATE trip_place SET {} WHERE id = ?", sets.join(", "));
        let changes = self.conn().execute(&sql, params_from_iter(values.iter()))?;
        if changes == 0 {
            return Err(GoNextError::NotFound(format!("Trip place with id {} not found", id)));
        }
        Ok(())
    }

    fn set_visited(&self, id: i64, visited: bool) -> Result<()> {
        self.update_trip_place(
            id,
            TripPlaceUpdate {
                visited: Some(visited),
                visit_date: Some(visited.then(Utc::now)),
                ..Default::default()
            },
        )
    }

    /// Swaps route position with the neighbouring stop. Returns `false` when
    /// the stop is already first (up) or last (down).
    fn move_trip_place(&self, id: i64, direction: MoveDirection) -> Result<bool> {
        let stop = self
            .get_trip_place(id)?
            .ok_or_else(|| GoNextError::NotFound(format!("Trip place with id {} not found", id)))?;

        let neighbour_sql = match direction {
            MoveDirection::Up => {
                "SELECT id, orderIndex FROM trip_place
                 WHERE tripId = ? AND (orderIndex < ? OR (orderIndex = ? AND id < ?))
                 ORDER BY orderIndex DESC, id DESC LIMIT 1"
            }
            MoveDirection::Down => {
                "SELECT id, orderIndex FROM trip_place
                 WHERE tripId = ? AND (orderIndex > ? OR (orderIndex = ? AND id > ?))
                 ORDER BY orderIndex ASC, id ASC LIMIT 1"
            }
        };

        self.in_transaction(|tx| {
            let neighbour: Option<(i64, i64)> = tx
                .query_row(
                    neighbour_sql,
                    params![stop.trip_id, stop.order_index, stop.order_index, stop.id],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;
            let Some((other_id, other_index)) = neighbour else {
                return Ok(false);
            };
            tx.execute(
                "UPDATE trip_place SET orderIndex = ? WHERE id = ?",
                params![other_index, stop.id],
            )?;
            tx.execute(
                "UPDATE trip_place SET orderIndex = ? WHERE id = ?",
                params![stop.order_index, other_id],
            )?;
            Ok(true)
        })
    }

    fn remove_trip_place(&self, id: i64) -> Result<bool> {
        let changes = self.conn().execute("DELETE FROM trip_place WHERE id = ?", params![id])?;
        Ok(changes > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::models::{PlaceDraft, TagTarget};
    use crate::storage::{PlaceStore, TagStore};

    fn test_storage() -> SqliteStorage {
        SqliteStorage::in_memory().unwrap()
    }

    fn trip(title: &str, current: bool) -> TripDraft {
        TripDraft {
            title: title.to_string(),
            current,
            ..Default::default()
        }
    }

    fn place(storage: &SqliteStorage, name: &str) -> i64 {
        storage
            .save_place(PlaceDraft {
                name: name.to_string(),
                ..Default::default()
            })
            .unwrap()
    }

    fn current_count(storage: &SqliteStorage) -> i64 {
        storage
            .conn()
            .query_row("SELECT COUNT(*) FROM trip WHERE current = 1", [], |row| row.get(0))
            .unwrap()
    }

    // --- Trips ---

    #[test]
    fn test_save_and_get_trip() {
        let storage = test_storage();
        let id = storage
            .save_trip(TripDraft {
                title: "Paris 2026".into(),
                description: Some("Spring".into()),
                start_date: Some("2026-04-01".into()),
                end_date: Some("2026-04-10".into()),
                current: false,
                id: None,
            })
            .unwrap();
        let trip = storage.get_trip(id).unwrap().unwrap();
        assert_eq!(trip.title, "Paris 2026");
        assert_eq!(trip.description.as_deref(), Some("Spring"));
        assert_eq!(trip.start_date.as_deref(), Some("2026-04-01"));
        assert_eq!(trip.end_date.as_deref(), Some("2026-04-10"));
        assert!(!trip.current);
    }

    #[test]
    fn test_save_trip_requires_title() {
        let storage = test_storage();
        let result = storage.save_trip(trip(" ", true));
        assert!(matches!(result, Err(GoNextError::InvalidInput(_))));
        assert!(storage.list_trips().unwrap().is_empty());
    }

    #[test]
    fn test_get_missing_trip_is_none() {
        let storage = test_storage();
        assert!(storage.get_trip(3).unwrap().is_none());
        assert!(storage.get_current_trip().unwrap().is_none());
    }

    #[test]
    fn test_update_missing_trip_is_not_found_and_keeps_current() {
        let storage = test_storage();
        let a = storage.save_trip(trip("A", true)).unwrap();
        let result = storage.save_trip(TripDraft {
            id: Some(99),
            ..trip("Ghost", true)
        });
        assert!(matches!(result, Err(GoNextError::NotFound(_))));
        assert_eq!(storage.get_current_trip().unwrap().unwrap().id, a);
    }

    #[test]
    fn test_list_trips_newest_first() {
        let storage = test_storage();
        let a = storage.save_trip(trip("A", false)).unwrap();
        let b = storage.save_trip(trip("B", false)).unwrap();
        let ids: Vec<i64> = storage.list_trips().unwrap().iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![b, a]);
    }

    #[test]
    fn test_single_current_trip() {
        let storage = test_storage();
        let a = storage.save_trip(trip("A", true)).unwrap();
        let b = storage.save_trip(trip("B", true)).unwrap();
        assert_eq!(current_count(&storage), 1);
        assert_eq!(storage.get_current_trip().unwrap().unwrap().id, b);

        storage
            .save_trip(TripDraft {
                id: Some(a),
                ..trip("A again", true)
            })
            .unwrap();
        assert_eq!(current_count(&storage), 1);
        assert_eq!(storage.get_current_trip().unwrap().unwrap().id, a);
        assert!(!storage.get_trip(b).unwrap().unwrap().current);
    }

    #[test]
    fn test_saving_non_current_leaves_others() {
        let storage = test_storage();
        let a = storage.save_trip(trip("A", true)).unwrap();
        storage.save_trip(trip("B", false)).unwrap();
        assert_eq!(storage.get_current_trip().unwrap().unwrap().id, a);
    }

    #[test]
    fn test_delete_trip_cascades_stops_not_places() {
        let storage = test_storage();
        let trip_id = storage.save_trip(trip("Rome", false)).unwrap();
        let p1 = place(&storage, "Colosseum");
        let p2 = place(&storage, "Pantheon");
        let stop = storage.add_place_to_trip(trip_id, p1).unwrap();
        storage.add_place_to_trip(trip_id, p2).unwrap();
        storage
            .set_tags(TagTarget::TripPlace(stop), &["ruins".to_string()])
            .unwrap();
        storage
            .set_tags(TagTarget::Trip(trip_id), &["italy".to_string()])
            .unwrap();

        assert!(storage.delete_trip(trip_id).unwrap());
        let stops: i64 = storage
            .conn()
            .query_row("SELECT COUNT(*) FROM trip_place", [], |row| row.get(0))
            .unwrap();
        assert_eq!(stops, 0);
        let links: i64 = storage
            .conn()
            .query_row(
                "SELECT (SELECT COUNT(*) FROM trip_tag) + (SELECT COUNT(*) FROM trip_place_tag)",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(links, 0);
        assert!(storage.get_place(p1).unwrap().is_some());
        assert!(storage.get_place(p2).unwrap().is_some());
    }

    // --- Trip places ---

    #[test]
    fn test_add_place_appends_order() {
        let storage = test_storage();
        let trip_id = storage.save_trip(trip("Route", false)).unwrap();
        let a = place(&storage, "A");
        let b = place(&storage, "B");
        storage.add_place_to_trip(trip_id, a).unwrap();
        storage.add_place_to_trip(trip_id, b).unwrap();
        let stops = storage.list_trip_places(trip_id).unwrap();
        let orders: Vec<i64> = stops.iter().map(|s| s.order_index).collect();
        assert_eq!(orders, vec![1, 2]);
        assert_eq!(stops[0].place_id, a);
        assert!(!stops[0].visited);
        assert!(stops[0].visit_date.is_none());
    }

    #[test]
    fn test_add_place_after_gap_uses_max() {
        let storage = test_storage();
        let trip_id = storage.save_trip(trip("Gappy", false)).unwrap();
        let a = place(&storage, "A");
        let stop = storage.add_place_to_trip(trip_id, a).unwrap();
        storage
            .update_trip_place(stop, TripPlaceUpdate {
                order_index: Some(10),
                ..Default::default()
            })
            .unwrap();
        let next = storage.add_place_to_trip(trip_id, a).unwrap();
        assert_eq!(storage.get_trip_place(next).unwrap().unwrap().order_index, 11);
    }

    #[test]
    fn test_next_unvisited_is_lowest_order() {
        let storage = test_storage();
        let trip_id = storage.save_trip(trip("Route", false)).unwrap();
        let ids: Vec<i64> = ["A", "B", "C"]
            .iter()
            .map(|n| {
                let p = place(&storage, n);
                storage.add_place_to_trip(trip_id, p).unwrap()
            })
            .collect();

        assert_eq!(storage.get_next_unvisited_place(trip_id).unwrap().unwrap().id, ids[0]);
        storage.set_visited(ids[0], true).unwrap();
        assert_eq!(storage.get_next_unvisited_place(trip_id).unwrap().unwrap().id, ids[1]);
        storage.set_visited(ids[1], true).unwrap();
        storage.set_visited(ids[2], true).unwrap();
        assert!(storage.get_next_unvisited_place(trip_id).unwrap().is_none());
    }

    #[test]
    fn test_next_unvisited_empty_trip() {
        let storage = test_storage();
        let trip_id = storage.save_trip(trip("Empty", false)).unwrap();
        assert!(storage.get_next_unvisited_place(trip_id).unwrap().is_none());
    }

    #[test]
    fn test_set_visited_toggles_visit_date() {
        let storage = test_storage();
        let trip_id = storage.save_trip(trip("Route", false)).unwrap();
        let stop = storage.add_place_to_trip(trip_id, place(&storage, "A")).unwrap();

        storage.set_visited(stop, true).unwrap();
        let visited = storage.get_trip_place(stop).unwrap().unwrap();
        assert!(visited.visited);
        assert!(visited.visit_date.is_some());

        storage.set_visited(stop, false).unwrap();
        let unvisited = storage.get_trip_place(stop).unwrap().unwrap();
        assert!(!unvisited.visited);
        assert!(unvisited.visit_date.is_none());
    }

    #[test]
    fn test_update_notes_and_photos_only() {
        let storage = test_storage();
        let trip_id = storage.save_trip(trip("Route", false)).unwrap();
        let stop = storage.add_place_to_trip(trip_id, place(&storage, "A")).unwrap();
        storage
            .update_trip_place(stop, TripPlaceUpdate {
                notes: Some(Some("Great view".into())),
                photos: Some(vec!["/photos/x.jpg".into()]),
                ..Default::default()
            })
            .unwrap();
        let updated = storage.get_trip_place(stop).unwrap().unwrap();
        assert_eq!(updated.notes.as_deref(), Some("Great view"));
        assert_eq!(updated.photos, vec!["/photos/x.jpg"]);
        assert_eq!(updated.order_index, 1);
        assert!(!updated.visited);

        storage
            .update_trip_place(stop, TripPlaceUpdate {
                notes: Some(None),
                ..Default::default()
            })
            .unwrap();
        let cleared = storage.get_trip_place(stop).unwrap().unwrap();
        assert!(cleared.notes.is_none());
        assert_eq!(cleared.photos, vec!["/photos/x.jpg"]);
    }

    #[test]
    fn test_empty_update_is_noop() {
        let storage = test_storage();
        assert!(storage.update_trip_place(12345, TripPlaceUpdate::default()).is_ok());
    }

    #[test]
    fn test_update_missing_stop_is_not_found() {
        let storage = test_storage();
        let result = storage.set_visited(404, true);
        assert!(matches!(result, Err(GoNextError::NotFound(_))));
    }

    #[test]
    fn test_move_swaps_with_neighbour() {
        let storage = test_storage();
        let trip_id = storage.save_trip(trip("Route", false)).unwrap();
        let a = storage.add_place_to_trip(trip_id, place(&storage, "A")).unwrap();
        let b = storage.add_place_to_trip(trip_id, place(&storage, "B")).unwrap();
        let c = storage.add_place_to_trip(trip_id, place(&storage, "C")).unwrap();

        assert!(storage.move_trip_place(c, MoveDirection::Up).unwrap());
        let order: Vec<i64> = storage
            .list_trip_places(trip_id)
            .unwrap()
            .iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(order, vec![a, c, b]);

        assert!(storage.move_trip_place(a, MoveDirection::Down).unwrap());
        let order: Vec<i64> = storage
            .list_trip_places(trip_id)
            .unwrap()
            .iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(order, vec![c, a, b]);
    }

    #[test]
    fn test_move_at_edges_is_noop() {
        let storage = test_storage();
        let trip_id = storage.save_trip(trip("Route", false)).unwrap();
        let a = storage.add_place_to_trip(trip_id, place(&storage, "A")).unwrap();
        let b = storage.add_place_to_trip(trip_id, place(&storage, "B")).unwrap();
        assert!(!storage.move_trip_place(a, MoveDirection::Up).unwrap());
        assert!(!storage.move_trip_place(b, MoveDirection::Down).unwrap());
    }

    #[test]
    fn test_move_does_not_cross_trips() {
        let storage = test_storage();
        let t1 = storage.save_trip(trip("One", false)).unwrap();
        let t2 = storage.save_trip(trip("Two", false)).unwrap();
        let p = place(&storage, "P");
        let only = storage.add_place_to_trip(t1, p).unwrap();
        storage.add_place_to_trip(t2, p).unwrap();
        storage.add_place_to_trip(t2, p).unwrap();
        assert!(!storage.move_trip_place(only, MoveDirection::Down).unwrap());
    }

    #[test]
    fn test_remove_trip_place_keeps_place() {
        let storage = test_storage();
        let trip_id = storage.save_trip(trip("Route", false)).unwrap();
        let p = place(&storage, "A");
        let stop = storage.add_place_to_trip(trip_id, p).unwrap();
        assert!(storage.remove_trip_place(stop).unwrap());
        assert!(storage.get_trip_place(stop).unwrap().is_none());
        assert!(storage.get_place(p).unwrap().is_some());
        assert!(!storage.remove_trip_place(stop).unwrap());
    }

    #[test]
    fn test_paris_scenario() {
        let storage = test_storage();
        let louvre = storage
            .save_place(PlaceDraft {
                name: "Louvre".into(),
                visit_later: true,
                ..Default::default()
            })
            .unwrap();
        let paris = storage.save_trip(trip("Paris 2026", true)).unwrap();
        let stop = storage.add_place_to_trip(paris, louvre).unwrap();
        assert_eq!(storage.get_trip_place(stop).unwrap().unwrap().order_index, 1);

        let current = storage.get_current_trip().unwrap().unwrap();
        assert_eq!(current.title, "Paris 2026");

        let next = storage.get_next_unvisited_place(current.id).unwrap().unwrap();
        assert_eq!(next.id, stop);
        assert_eq!(next.place_id, louvre);

        storage.set_visited(next.id, true).unwrap();
        assert!(storage.get_trip_place(stop).unwrap().unwrap().visit_date.is_some());
        assert!(storage.get_next_unvisited_place(paris).unwrap().is_none());
    }
}
