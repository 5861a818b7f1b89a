use rusqlite::params_from_iter;
use rusqlite::types::Value;

use crate::errors::Result;
use super::SearchStore;
use super::models::{NoteSearchResult, Place, SearchFilter, Trip};
use super::places::{PLACE_COLUMNS, row_to_place};
use super::query::{Predicate, SelectBuilder};
use super::sqlite::SqliteStorage;
use super::tags::normalize_tags;
use super::trips::{TRIP_COLUMNS, row_to_trip};

/// How one entity type maps the shared filter contract onto its columns.
struct SearchShape<'a> {
    select: &'a str,
    text_columns: &'a [&'a str],
    year_expr: &'a str,
    tag_joins: [&'a str; 2],
    group_key: &'a str,
    order_by: &'a str,
}

impl SearchFilter {
    pub fn is_empty(&self) -> bool {
        self.text().is_none() && self.tags.iter().all(|t| t.trim().is_empty()) && self.year.is_none()
    }

    fn text(&self) -> Option<&str> {
        self.text.as_deref().map(str::trim).filter(|t| !t.is_empty())
    }

    fn compose(&self, shape: &SearchShape<'_>) -> (String, Vec<Value>) {
        let mut builder = SelectBuilder::new(shape.select);
        let tags = normalize_tags(&self.tags);

        if !tags.is_empty() {
            for join in shape.tag_joins {
                builder = builder.join(join);
            }
        }
        if let Some(text) = self.text() {
            builder = builder.filter(Predicate::contains_any(shape.text_columns, text));
        }
        if let Some(year) = self.year {
            builder = builder.filter(Predicate::year_equals(shape.year_expr, year));
        }
        if !tags.is_empty() {
            builder = builder
                .filter(Predicate::in_list("tg.name", &tags))
                .group_by(shape.group_key, Predicate::count_distinct_equals("tg.id", tags.len()));
        }
        builder.order_by(shape.order_by).build()
    }
}

impl SearchStore for SqliteStorage {
    fn search_places(&self, filter: &SearchFilter) -> Result<Vec<Place>> {
        let select = format!("SELECT {} FROM place p", PLACE_COLUMNS);
        let (sql, params) = filter.compose(&SearchShape {
            select: &select,
            text_columns: &["p.name", "p.description"],
            year_expr: "p.createdAt",
            tag_joins: [
                "JOIN place_tag pt ON pt.placeId = p.id",
                "JOIN tag tg ON tg.id = pt.tagId",
            ],
            group_key: "p.id",
            order_by: "p.createdAt DESC, p.id DESC",
        });
        let mut stmt = self.conn().prepare(&sql)?;
        let places = stmt
            .query_map(params_from_iter(params.iter()), row_to_place)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(places)
    }

    fn search_trips(&self, filter: &SearchFilter) -> Result<Vec<Trip>> {
        let select = format!("SELECT {} FROM trip t", TRIP_COLUMNS);
        let (sql, params) = filter.compose(&SearchShape {
            select: &select,
            text_columns: &["t.title", "t.description"],
            year_expr: "COALESCE(t.startDate, t.createdAt)",
            tag_joins: [
                "JOIN trip_tag tt ON tt.tripId = t.id",
                "JOIN tag tg ON tg.id = tt.tagId",
            ],
            group_key: "t.id",
            order_by: "t.createdAt DESC, t.id DESC",
        });
        let mut stmt = self.conn().prepare(&sql)?;
        let trips = stmt
            .query_map(params_from_iter(params.iter()), row_to_trip)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(trips)
    }

    fn search_trip_notes(&self, filter: &SearchFilter) -> Result<Vec<NoteSearchResult>> {
        let (sql, params) = filter.compose(&SearchShape {
            select: "SELECT tp.id, tp.tripId, t.title, p.id, p.name, tp.notes, tp.visitDate
                     FROM trip_place tp
                     JOIN trip t ON t.id = tp.tripId
                     JOIN place p ON p.id = tp.placeId",
            text_columns: &["tp.notes", "p.name"],
            year_expr: "COALESCE(tp.visitDate, t.startDate, t.createdAt)",
            tag_joins: [
                "JOIN trip_place_tag tpt ON tpt.tripPlaceId = tp.id",
                "JOIN tag tg ON tg.id = tpt.tagId",
            ],
            group_key: "tp.id",
            order_by: "t.createdAt DESC, t.id DESC, tp.orderIndex ASC, tp.id ASC",
        });
        let mut stmt = self.conn().prepare(&sql)?;
        let notes = stmt
            .query_map(params_from_iter(params.iter()), |row| {
                Ok(NoteSearchResult {
                    trip_place_id: row.get(0)?,
                    trip_id: row.get(1)?,
                    trip_title: row.get(2)?,
                    place_id: row.get(3)?,
                    place_name: row.get(4)?,
                    notes: row.get(5)?,
                    visit_date: row.get(6)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(notes)
    }
}
