mod schema;
pub mod places;
pub mod stats;
pub mod trips;

use anyhow::Result;
use chrono::{SecondsFormat, Utc};
use rusqlite::Connection;
use std::path::Path;

pub use places::{Place, PlacePhoto};
pub use stats::{Stats, TopVisitedPlace};
pub use trips::{Trip, TripPlace, TripPlacePhoto};

use schema::{MIGRATIONS, SCHEMA, SCHEMA_VERSION};

/// Current UTC time as an ISO-8601 string, the format used for all
/// `createdAt`/`exportedAt` columns.
pub(crate) fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Today's date as `YYYY-MM-DD`, the format used for visit dates.
pub(crate) fn today() -> String {
    Utc::now().date_naive().to_string()
}

pub struct Database {
    pub(crate) conn: Connection,
}

impl Database {
    /// Open (creating if necessary) the database at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        // journal_mode reports the resulting mode, so it cannot go through
        // pragma_update.
        let _: String = conn.query_row("PRAGMA journal_mode = wal", [], |row| row.get(0))?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self { conn })
    }

    /// Open a private in-memory database. Used by tests and dry runs.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self { conn })
    }

    /// Create tables and indexes if the stored schema version is behind.
    pub fn initialize(&self) -> Result<()> {
        let current: i32 = self
            .conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))?;
        if current >= SCHEMA_VERSION {
            return Ok(());
        }
        self.conn.execute_batch(SCHEMA)?;
        for migration in MIGRATIONS {
            let _ = self.conn.execute(migration, []);
        }
        self.conn
            .pragma_update(None, "user_version", SCHEMA_VERSION)?;
        Ok(())
    }
}

/// Serialize booleans as the 0/1 integers the backup document format uses,
/// accepting either form when reading.
pub(crate) mod int_bool {
    use serde::de::{self, Deserializer, Unexpected};
    use serde::{Deserialize, Serializer};

    pub fn serialize<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(u8::from(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum IntOrBool {
            Int(i64),
            Bool(bool),
        }

        match IntOrBool::deserialize(deserializer)? {
            IntOrBool::Bool(b) => Ok(b),
            IntOrBool::Int(0) => Ok(false),
            IntOrBool::Int(1) => Ok(true),
            IntOrBool::Int(other) => Err(de::Error::invalid_value(
                Unexpected::Signed(other),
                &"0 or 1",
            )),
        }
    }
}
