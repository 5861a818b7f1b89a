use chrono::Utc;
use rusqlite::{OptionalExtension, Row, params};

use crate::errors::{GoNextError, Result};
use super::PlaceStore;
use super::models::{Coordinates, Place, PlaceDraft, iso_timestamp, json_or_default};
use super::sqlite::SqliteStorage;

pub(crate) const PLACE_COLUMNS: &str = "p.id, p.name, p.description, p.visitLater, p.liked,
    p.dd_lat, p.dd_lng, p.dd_text, p.photos, p.createdAt";

pub(crate) fn row_to_place(row: &Row) -> rusqlite::Result<Place> {
    let visit_later: i64 = row.get(3)?;
    let liked: i64 = row.get(4)?;
    let photos: Option<String> = row.get(8)?;
    Ok(Place {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        visit_later: visit_later != 0,
        liked: liked != 0,
        coordinates: Coordinates::from_columns(row.get(5)?, row.get(6)?, row.get(7)?),
        photos: json_or_default(photos.as_deref()),
        created_at: row.get(9)?,
    })
}

/// Trims text and maps blank values to `None`.
pub(crate) fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn validate(place: &PlaceDraft) -> Result<String> {
    let name = place.name.trim();
    if name.is_empty() {
        return Err(GoNextError::InvalidInput("place name is required".into()));
    }
    Ok(name.to_string())
}

impl PlaceStore for SqliteStorage {
    fn list_places(&self) -> Result<Vec<Place>> {
        let sql = format!(
            "SELECT {} FROM place p ORDER BY p.createdAt DESC, p.id DESC",
            PLACE_COLUMNS
        );
        let mut stmt = self.conn().prepare(&sql)?;
        let places = stmt
            .query_map([], row_to_place)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(places)
    }

    fn get_place(&self, id: i64) -> Result<Option<Place>> {
        let sql = format!("SELECT {} FROM place p WHERE p.id = ?", PLACE_COLUMNS);
        let place = self
            .conn()
            .query_row(&sql, params![id], row_to_place)
            .optional()?;
        Ok(place)
    }

    fn save_place(&self, place: PlaceDraft) -> Result<i64> {
        let name = validate(&place)?;
        let description = optional_text(place.description);
        let (lat, lng, text) = Coordinates::to_columns(place.coordinates.as_ref());
        let photos = serde_json::to_string(&place.photos)?;

        if let Some(id) = place.id {
            let changes = self.conn().execute(
                "UPDATE place
                 SET name = ?, description = ?, visitLater = ?, liked = ?,
                     dd_lat = ?, dd_lng = ?, dd_text = ?, photos = ?
                 WHERE id = ?",
                params![
                    name,
                    description,
                    place.visit_later as i32,
                    place.liked as i32,
                    lat,
                    lng,
                    text,
                    photos,
                    id,
                ],
            )?;
            if changes == 0 {
                return Err(GoNextError::NotFound(format!("Place with id {} not found", id)));
            }
            return Ok(id);
        }

        self.conn().execute(
            "INSERT INTO place (name, description, visitLater, liked, dd_lat, dd_lng, dd_text, photos, createdAt)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                name,
                description,
                place.visit_later as i32,
                place.liked as i32,
                lat,
                lng,
                text,
                photos,
                iso_timestamp(Utc::now()),
            ],
        )?;
        Ok(self.conn().last_insert_rowid())
    }

    fn delete_place(&self, id: i64) -> Result<bool> {
        let changes = self.conn().execute("DELETE FROM place WHERE id = ?", params![id])?;
        Ok(changes > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{TagStore, TripStore};
    use crate::storage::models::{TagTarget, TripDraft};

    fn test_storage() -> SqliteStorage {
        SqliteStorage::in_memory().unwrap()
    }

    fn draft(name: &str) -> PlaceDraft {
        PlaceDraft {
            name: name.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_save_then_get_preserves_fields() {
        let storage = test_storage();
        let input = PlaceDraft {
            id: None,
            name: "Louvre".into(),
            description: Some("Museum on the Seine".into()),
            visit_later: true,
            liked: false,
            coordinates: Some(Coordinates::Decimal { lat: 48.8606, lng: 2.3376 }),
            photos: vec!["/photos/a.jpg".into(), "/photos/b.jpg".into()],
        };
        let id = storage.save_place(input.clone()).unwrap();
        let place = storage.get_place(id).unwrap().unwrap();
        assert_eq!(place.id, id);
        assert_eq!(place.name, input.name);
        assert_eq!(place.description, input.description);
        assert_eq!(place.visit_later, input.visit_later);
        assert_eq!(place.liked, input.liked);
        assert_eq!(place.coordinates, input.coordinates);
        assert_eq!(place.photos, input.photos);
    }

    #[test]
    fn test_text_coordinates_round_trip() {
        let storage = test_storage();
        let id = storage
            .save_place(PlaceDraft {
                coordinates: Some(Coordinates::Text("behind the old mill".into())),
                ..draft("Mill")
            })
            .unwrap();
        let place = storage.get_place(id).unwrap().unwrap();
        assert_eq!(place.coordinates, Some(Coordinates::Text("behind the old mill".into())));
    }

    #[test]
    fn test_save_rejects_blank_name() {
        let storage = test_storage();
        let result = storage.save_place(draft("   "));
        assert!(matches!(result, Err(GoNextError::InvalidInput(_))));
        assert!(storage.list_places().unwrap().is_empty());
    }

    #[test]
    fn test_save_trims_name_and_blank_description() {
        let storage = test_storage();
        let id = storage
            .save_place(PlaceDraft {
                description: Some("   ".into()),
                ..draft("  Orsay ")
            })
            .unwrap();
        let place = storage.get_place(id).unwrap().unwrap();
        assert_eq!(place.name, "Orsay");
        assert_eq!(place.description, None);
    }

    #[test]
    fn test_update_overwrites_but_keeps_created_at() {
        let storage = test_storage();
        let id = storage
            .save_place(PlaceDraft {
                liked: true,
                photos: vec!["/p/1.jpg".into()],
                ..draft("Old name")
            })
            .unwrap();
        let before = storage.get_place(id).unwrap().unwrap();

        let same_id = storage
            .save_place(PlaceDraft {
                id: Some(id),
                ..draft("New name")
            })
            .unwrap();
        assert_eq!(same_id, id);

        let after = storage.get_place(id).unwrap().unwrap();
        assert_eq!(after.name, "New name");
        assert!(!after.liked);
        assert!(after.photos.is_empty());
        assert_eq!(after.created_at, before.created_at);
    }

    #[test]
    fn test_update_missing_place_is_not_found() {
        let storage = test_storage();
        let result = storage.save_place(PlaceDraft {
            id: Some(42),
            ..draft("Ghost")
        });
        assert!(matches!(result, Err(GoNextError::NotFound(_))));
    }

    #[test]
    fn test_get_missing_place_is_none() {
        let storage = test_storage();
        assert!(storage.get_place(999).unwrap().is_none());
    }

    #[test]
    fn test_list_newest_first() {
        let storage = test_storage();
        let first = storage.save_place(draft("First")).unwrap();
        let second = storage.save_place(draft("Second")).unwrap();
        let places = storage.list_places().unwrap();
        let ids: Vec<i64> = places.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![second, first]);
    }

    #[test]
    fn test_malformed_photos_read_as_empty() {
        let storage = test_storage();
        let id = storage.save_place(draft("Broken photos")).unwrap();
        storage
            .conn()
            .execute("UPDATE place SET photos = 'not-json' WHERE id = ?", [id])
            .unwrap();
        let place = storage.get_place(id).unwrap().unwrap();
        assert!(place.photos.is_empty());
    }

    #[test]
    fn test_booleans_stored_as_integers() {
        let storage = test_storage();
        let id = storage
            .save_place(PlaceDraft {
                visit_later: true,
                liked: true,
                ..draft("Flags")
            })
            .unwrap();
        let (visit_later, liked): (i64, i64) = storage
            .conn()
            .query_row("SELECT visitLater, liked FROM place WHERE id = ?", [id], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })
            .unwrap();
        assert_eq!((visit_later, liked), (1, 1));
    }

    #[test]
    fn test_delete_cascades_links_and_stops() {
        let storage = test_storage();
        let place_id = storage.save_place(draft("Doomed")).unwrap();
        let trip_id = storage
            .save_trip(TripDraft {
                title: "Trip".into(),
                ..Default::default()
            })
            .unwrap();
        storage.add_place_to_trip(trip_id, place_id).unwrap();
        storage
            .set_tags(TagTarget::Place(place_id), &["art".to_string()])
            .unwrap();

        assert!(storage.delete_place(place_id).unwrap());
        assert!(storage.get_place(place_id).unwrap().is_none());
        assert!(storage.list_trip_places(trip_id).unwrap().is_empty());
        let links: i64 = storage
            .conn()
            .query_row("SELECT COUNT(*) FROM place_tag", [], |row| row.get(0))
            .unwrap();
        assert_eq!(links, 0);
        assert!(storage.get_trip(trip_id).unwrap().is_some());
    }

    #[test]
    fn test_delete_missing_place() {
        let storage = test_storage();
        assert!(!storage.delete_place(7).unwrap());
    }

    #[test]
    fn test_place_and_tags_saved_as_one_unit() {
        let storage = test_storage();
        let result = storage.atomically(|s| {
            let id = s.save_place(draft("Louvre"))?;
            s.set_tags(TagTarget::Place(id), &["museum".to_string()])?;
            // Linking a place that does not exist breaks the foreign key.
            s.set_tags(TagTarget::Place(id + 100), &["museum".to_string()])
        });
        assert!(result.is_err());
        assert!(storage.list_places().unwrap().is_empty());

        let id = storage
            .atomically(|s| {
                let id = s.save_place(draft("Orsay"))?;
                s.set_tags(TagTarget::Place(id), &["museum".to_string()])?;
                Ok(id)
            })
            .unwrap();
        assert_eq!(storage.list_tags(TagTarget::Place(id)).unwrap(), vec!["museum"]);
    }
}
