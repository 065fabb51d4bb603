/// Schema version written to SQLite's `user_version` pragma.
pub const SCHEMA_VERSION: i32 = 1;

pub const SCHEMA: &str = r#"
-- Places table: the user's catalog of locations
CREATE TABLE IF NOT EXISTS places (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    visitlater INTEGER NOT NULL DEFAULT 1,
    liked INTEGER NOT NULL DEFAULT 0,
    latitude REAL,
    longitude REAL,
    createdAt TEXT NOT NULL
);

-- Photos attached to a place; files live in the photo store, rows hold the uri
CREATE TABLE IF NOT EXISTS place_photos (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    placeId INTEGER NOT NULL REFERENCES places(id) ON DELETE CASCADE,
    uri TEXT NOT NULL,
    sortOrder INTEGER NOT NULL DEFAULT 0
);

-- Trips: a titled date range grouping itinerary entries
CREATE TABLE IF NOT EXISTS trips (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    startDate TEXT NOT NULL,
    endDate TEXT NOT NULL,
    createdAt TEXT NOT NULL,
    current INTEGER NOT NULL DEFAULT 0
);

-- Itinerary entries: a place's position within a trip
CREATE TABLE IF NOT EXISTS trip_places (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    tripId INTEGER NOT NULL REFERENCES trips(id) ON DELETE CASCADE,
    placeId INTEGER NOT NULL REFERENCES places(id) ON DELETE CASCADE,
    "order" INTEGER NOT NULL DEFAULT 0,
    visited INTEGER NOT NULL DEFAULT 0,
    visitDate TEXT,
    notes TEXT
);

-- Photos taken during a specific trip visit
CREATE TABLE IF NOT EXISTS trip_place_photos (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    tripPlaceId INTEGER NOT NULL REFERENCES trip_places(id) ON DELETE CASCADE,
    uri TEXT NOT NULL,
    sortOrder INTEGER NOT NULL DEFAULT 0
);

-- Indexes for common queries
CREATE INDEX IF NOT EXISTS idx_place_photos_placeId ON place_photos(placeId);
CREATE INDEX IF NOT EXISTS idx_trip_places_tripId ON trip_places(tripId);
CREATE INDEX IF NOT EXISTS idx_trip_places_placeId ON trip_places(placeId);
CREATE INDEX IF NOT EXISTS idx_trip_place_photos_tripPlaceId ON trip_place_photos(tripPlaceId);
CREATE INDEX IF NOT EXISTS idx_trips_current ON trips(current);
"#;

/// Idempotent statements applied after the base schema. Each runs with
/// errors ignored so re-running against an already-migrated database is safe.
pub const MIGRATIONS: &[&str] = &[];
