use std::sync::LazyLock;

use chrono::{DateTime, SecondsFormat, Utc};
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::errors::{GoNextError, Result};

/// Renders a timestamp the way every `*At`/`*Date` column stores it.
pub fn iso_timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Decodes a JSON column, treating a missing or malformed payload as the
/// type's default.
pub fn json_or_default<T>(raw: Option<&str>) -> T
where
    T: DeserializeOwned + Default,
{
    raw.filter(|s| !s.trim().is_empty())
        .and_then(|s| serde_json::from_str(s).ok())
        .unwrap_or_default()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Coordinates {
    Decimal { lat: f64, lng: f64 },
    /// Free text kept as entered when no decimal pair was stored.
    Text(String),
}

impl Coordinates {
    /// Parses user input such as `48.8606, 2.3376` or `48,8606 2,3376`.
    ///
    /// Blank input means "no coordinates". Anything else must contain at
    /// least two numbers; the first two become latitude and longitude.
    pub fn parse(input: &str) -> Result<Option<Coordinates>> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }
        let numbers = scan_numbers(trimmed);
        if numbers.len() < 2 {
            return Err(GoNextError::InvalidInput(format!(
                "coordinates must look like \"latitude, longitude\", got \"{}\"",
                trimmed
            )));
        }
        let (lat, lng) = (numbers[0], numbers[1]);
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
            return Err(GoNextError::InvalidInput(format!(
                "coordinates out of range: {}, {}",
                lat, lng
            )));
        }
        Ok(Some(Coordinates::Decimal { lat, lng }))
    }

    pub fn from_columns(lat: Option<f64>, lng: Option<f64>, text: Option<String>) -> Option<Self> {
        match (lat, lng) {
            (Some(lat), Some(lng)) => Some(Coordinates::Decimal { lat, lng }),
            _ => text
                .filter(|t| !t.trim().is_empty())
                .map(Coordinates::Text),
        }
    }

    /// Column values for `dd_lat`, `dd_lng`, `dd_text`.
    pub fn to_columns(coords: Option<&Coordinates>) -> (Option<f64>, Option<f64>, Option<String>) {
        match coords {
            Some(Coordinates::Decimal { lat, lng }) => {
                (Some(*lat), Some(*lng), Some(format!("{}, {}", lat, lng)))
            }
            Some(Coordinates::Text(text)) => (None, None, Some(text.clone())),
            None => (None, None, None),
        }
    }
}

static NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-?\d+(?:[.,]\d+)?").expect("number pattern compiles"));

fn scan_numbers(text: &str) -> Vec<f64> {
    NUMBER
        .find_iter(text)
        .filter_map(|m| m.as_str().replace(',', ".").parse::<f64>().ok())
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Place {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub visit_later: bool,
    pub liked: bool,
    pub coordinates: Option<Coordinates>,
    pub photos: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Input for saving a place: `id: None` inserts, `Some(id)` overwrites.
#[derive(Debug, Clone, Default)]
pub struct PlaceDraft {
    pub id: Option<i64>,
    pub name: String,
    pub description: Option<String>,
    pub visit_later: bool,
    pub liked: bool,
    pub coordinates: Option<Coordinates>,
    pub photos: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trip {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub created_at: DateTime<Utc>,
    pub current: bool,
}

#[derive(Debug, Clone, Default)]
pub struct TripDraft {
    pub id: Option<i64>,
    pub title: String,
    pub description: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub current: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TripPlace {
    pub id: i64,
    pub trip_id: i64,
    pub place_id: i64,
    pub order_index: i64,
    pub visited: bool,
    pub visit_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub photos: Vec<String>,
}

/// Partial update of a trip stop. `None` leaves the column untouched; the
/// nested `Option`s distinguish "set to NULL" from "leave alone".
#[derive(Debug, Clone, Default)]
pub struct TripPlaceUpdate {
    pub order_index: Option<i64>,
    pub visited: Option<bool>,
    pub visit_date: Option<Option<DateTime<Utc>>>,
    pub notes: Option<Option<String>>,
    pub photos: Option<Vec<String>>,
}

impl TripPlaceUpdate {
    pub fn is_empty(&self) -> bool {
        self.order_index.is_none()
            && self.visited.is_none()
            && self.visit_date.is_none()
            && self.notes.is_none()
            && self.photos.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveDirection {
    Up,
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagTarget {
    Place(i64),
    Trip(i64),
    TripPlace(i64),
}

impl TagTarget {
    pub fn id(&self) -> i64 {
        match *self {
            TagTarget::Place(id) | TagTarget::Trip(id) | TagTarget::TripPlace(id) => id,
        }
    }

    pub(crate) fn link_table(&self) -> &'static str {
        match self {
            TagTarget::Place(_) => "place_tag",
            TagTarget::Trip(_) => "trip_tag",
            TagTarget::TripPlace(_) => "trip_place_tag",
        }
    }

    pub(crate) fn owner_column(&self) -> &'static str {
        match self {
            TagTarget::Place(_) => "placeId",
            TagTarget::Trip(_) => "tripId",
            TagTarget::TripPlace(_) => "tripPlaceId",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SearchFilter {
    pub text: Option<String>,
    pub tags: Vec<String>,
    pub year: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NoteSearchResult {
    pub trip_place_id: i64,
    pub trip_id: i64,
    pub trip_title: String,
    pub place_id: i64,
    pub place_name: String,
    pub notes: Option<String>,
    pub visit_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableCount {
    pub table: &'static str,
    pub rows: i64,
}
