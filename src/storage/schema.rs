/// Tables in dependency order: parents before the join tables that point
/// at them. Backup export/import and clear all walk this list.
pub const TABLES: [&str; 7] = [
    "place",
    "trip",
    "trip_place",
    "tag",
    "place_tag",
    "trip_tag",
    "trip_place_tag",
];

pub const CREATE_MIGRATIONS_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS migrations (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL,
        appliedAt TEXT NOT NULL
    )
";

#[derive(Debug, Clone, Copy)]
pub enum Step {
    Sql(&'static str),
    /// Adds a column unless the live table already has it, so databases
    /// created by older builds converge on the same shape.
    AddColumn {
        table: &'static str,
        column: &'static str,
        definition: &'static str,
    },
}

#[derive(Debug, Clone, Copy)]
pub struct Migration {
    pub id: i64,
    pub name: &'static str,
    pub steps: &'static [Step],
}

const INIT_SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS place (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        description TEXT,
        visitLater INTEGER NOT NULL DEFAULT 0,
        liked INTEGER NOT NULL DEFAULT 0,
        dd_lat REAL,
        dd_lng REAL,
        photos TEXT,
        createdAt TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS trip (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL,
        description TEXT,
        startDate TEXT,
        endDate TEXT,
        createdAt TEXT NOT NULL,
        current INTEGER NOT NULL DEFAULT 0
    );

    CREATE TABLE IF NOT EXISTS trip_place (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        tripId INTEGER NOT NULL,
        placeId INTEGER NOT NULL,
        orderIndex INTEGER NOT NULL,
        visited INTEGER NOT NULL DEFAULT 0,
        visitDate TEXT,
        notes TEXT,
        photos TEXT,
        FOREIGN KEY (tripId) REFERENCES trip(id) ON DELETE CASCADE,
        FOREIGN KEY (placeId) REFERENCES place(id) ON DELETE CASCADE
    );

    CREATE TABLE IF NOT EXISTS tag (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE
    );

    CREATE TABLE IF NOT EXISTS place_tag (
        placeId INTEGER NOT NULL,
        tagId INTEGER NOT NULL,
        PRIMARY KEY (placeId, tagId),
        FOREIGN KEY (placeId) REFERENCES place(id) ON DELETE CASCADE,
        FOREIGN KEY (tagId) REFERENCES tag(id) ON DELETE CASCADE
    );

    CREATE TABLE IF NOT EXISTS trip_tag (
        tripId INTEGER NOT NULL,
        tagId INTEGER NOT NULL,
        PRIMARY KEY (tripId, tagId),
        FOREIGN KEY (tripId) REFERENCES trip(id) ON DELETE CASCADE,
        FOREIGN KEY (tagId) REFERENCES tag(id) ON DELETE CASCADE
    );

    CREATE TABLE IF NOT EXISTS trip_place_tag (
        tripPlaceId INTEGER NOT NULL,
        tagId INTEGER NOT NULL,
        PRIMARY KEY (tripPlaceId, tagId),
        FOREIGN KEY (tripPlaceId) REFERENCES trip_place(id) ON DELETE CASCADE,
        FOREIGN KEY (tagId) REFERENCES tag(id) ON DELETE CASCADE
    );

    CREATE INDEX IF NOT EXISTS idx_trip_current ON trip(current);
    CREATE INDEX IF NOT EXISTS idx_trip_place_trip ON trip_place(tripId);
    CREATE INDEX IF NOT EXISTS idx_trip_place_place ON trip_place(placeId);
";

const SEARCH_INDEXES: &str = "
    CREATE INDEX IF NOT EXISTS idx_place_created_at ON place(createdAt);
    CREATE INDEX IF NOT EXISTS idx_trip_created_at ON trip(createdAt);
    CREATE INDEX IF NOT EXISTS idx_trip_place_order ON trip_place(tripId, orderIndex);
";

pub const MIGRATIONS: &[Migration] = &[
    Migration {
        id: 1,
        name: "init-schema",
        steps: &[Step::Sql(INIT_SCHEMA)],
    },
    Migration {
        id: 2,
        name: "place-coordinates-text",
        steps: &[Step::AddColumn {
            table: "place",
            column: "dd_text",
            definition: "TEXT",
        }],
    },
    Migration {
        id: 3,
        name: "search-indexes",
        steps: &[Step::Sql(SEARCH_INDEXES)],
    },
];
