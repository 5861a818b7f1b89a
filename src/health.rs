use serde::Serialize;

use crate::photos::PhotoStore;
use crate::storage::BackupStore;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthItem {
    pub label: &'static str,
    pub ok: bool,
    pub details: String,
}

/// Offline self-check: the database answers queries and the photo
/// directory is readable. Failures become items, never errors.
pub fn run_health_check<S: BackupStore>(storage: &S, photos: &PhotoStore) -> Vec<HealthItem> {
    let database = match storage.database_stats() {
        Ok(stats) => {
            let count = |name: &str| {
                stats
                    .iter()
                    .find(|c| c.table == name)
                    .map_or(0, |c| c.rows)
            };
            HealthItem {
                label: "Local database",
                ok: true,
                details: format!("places: {}, trips: {}", count("place"), count("trip")),
            }
        }
        Err(e) => HealthItem {
            label: "Local database",
            ok: false,
            details: e.to_string(),
        },
    };

    let photo_store = match photos.ensure_directories_exist().and_then(|_| photos.count()) {
        Ok(n) => HealthItem {
            label: "Photo storage",
            ok: true,
            details: format!("files: {}", n),
        },
        Err(e) => HealthItem {
            label: "Photo storage",
            ok: false,
            details: e.to_string(),
        },
    };

    vec![database, photo_store]
}
