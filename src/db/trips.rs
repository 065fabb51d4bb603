//! Trip and itinerary operations.
//!
//! At most one trip carries the `current` flag at any time; every code path
//! that sets it clears the flag on all other rows inside the same
//! transaction.

use anyhow::{ensure, Result};
use rusqlite::{OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use super::{int_bool, now_iso, today, Database};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trip {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub start_date: String,
    pub end_date: String,
    pub created_at: String,
    #[serde(with = "int_bool", default)]
    pub current: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripPlace {
    pub id: i64,
    pub trip_id: i64,
    pub place_id: i64,
    #[serde(default)]
    pub order: i64,
    #[serde(with = "int_bool", default)]
    pub visited: bool,
    #[serde(default)]
    pub visit_date: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TripPlacePhoto {
    pub id: i64,
    pub trip_place_id: i64,
    pub uri: String,
    pub sort_order: i64,
}

#[derive(Debug, Clone, Default)]
pub struct NewTrip {
    pub title: String,
    pub description: String,
    /// `YYYY-MM-DD`. The end date is assumed to be on or after the start
    /// date but is not validated.
    pub start_date: String,
    pub end_date: String,
    pub current: bool,
}

#[derive(Debug, Clone, Default)]
pub struct TripUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub current: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveDirection {
    Up,
    Down,
}

fn map_trip(row: &Row) -> rusqlite::Result<Trip> {
    Ok(Trip {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        start_date: row.get(3)?,
        end_date: row.get(4)?,
        created_at: row.get(5)?,
        current: row.get(6)?,
    })
}

fn map_trip_place(row: &Row) -> rusqlite::Result<TripPlace> {
    Ok(TripPlace {
        id: row.get(0)?,
        trip_id: row.get(1)?,
        place_id: row.get(2)?,
        order: row.get(3)?,
        visited: row.get(4)?,
        visit_date: row.get(5)?,
        notes: row.get(6)?,
    })
}

fn map_trip_place_photo(row: &Row) -> rusqlite::Result<TripPlacePhoto> {
    Ok(TripPlacePhoto {
        id: row.get(0)?,
        trip_place_id: row.get(1)?,
        uri: row.get(2)?,
        sort_order: row.get(3)?,
    })
}

const TRIP_COLUMNS: &str = "id, title, description, startDate, endDate, createdAt, current";
const TRIP_PLACE_COLUMNS: &str = r#"id, tripId, placeId, "order", visited, visitDate, notes"#;

impl Database {
    pub fn get_all_trips(&self) -> Result<Vec<Trip>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {TRIP_COLUMNS} FROM trips ORDER BY startDate DESC"
        ))?;
        let trips = stmt
            .query_map([], map_trip)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(trips)
    }

    pub fn get_trip(&self, id: i64) -> Result<Option<Trip>> {
        let trip = self
            .conn
            .query_row(
                &format!("SELECT {TRIP_COLUMNS} FROM trips WHERE id = ?"),
                [id],
                map_trip,
            )
            .optional()?;
        Ok(trip)
    }

    pub fn get_current_trip(&self) -> Result<Option<Trip>> {
        let trip = self
            .conn
            .query_row(
                &format!("SELECT {TRIP_COLUMNS} FROM trips WHERE current = 1 LIMIT 1"),
                [],
                map_trip,
            )
            .optional()?;
        Ok(trip)
    }

    pub fn insert_trip(&self, input: &NewTrip) -> Result<i64> {
        ensure!(!input.title.trim().is_empty(), "trip title must not be empty");
        let tx = self.conn.unchecked_transaction()?;
        if input.current {
            tx.execute("UPDATE trips SET current = 0", [])?;
        }
        tx.execute(
            r#"
            INSERT INTO trips (title, description, startDate, endDate, createdAt, current)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
            rusqlite::params![
                input.title,
                input.description,
                input.start_date,
                input.end_date,
                now_iso(),
                input.current,
            ],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;
        Ok(id)
    }

    pub fn update_trip(&self, id: i64, update: &TripUpdate) -> Result<()> {
        let Some(trip) = self.get_trip(id)? else {
            tracing::warn!(id, "update_trip: no such trip");
            return Ok(());
        };
        if let Some(title) = &update.title {
            ensure!(!title.trim().is_empty(), "trip title must not be empty");
        }
        let tx = self.conn.unchecked_transaction()?;
        if update.current == Some(true) {
            tx.execute("UPDATE trips SET current = 0", [])?;
        }
        tx.execute(
            r#"
            UPDATE trips SET title = ?, description = ?, startDate = ?, endDate = ?, current = ?
            WHERE id = ?
            "#,
            rusqlite::params![
                update.title.as_deref().unwrap_or(&trip.title),
                update.description.as_deref().unwrap_or(&trip.description),
                update.start_date.as_deref().unwrap_or(&trip.start_date),
                update.end_date.as_deref().unwrap_or(&trip.end_date),
                update.current.unwrap_or(trip.current),
                id,
            ],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Make `trip_id` the single current trip.
    pub fn set_current_trip(&self, trip_id: i64) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("UPDATE trips SET current = 0", [])?;
        tx.execute("UPDATE trips SET current = 1 WHERE id = ?", [trip_id])?;
        tx.commit()?;
        Ok(())
    }

    /// Delete a trip. The cascade removes its itinerary entries and their
    /// photos; the orphaned photo URIs are returned for file cleanup.
    pub fn delete_trip(&self, id: i64) -> Result<Vec<String>> {
        let tx = self.conn.unchecked_transaction()?;
        let mut uris = Vec::new();
        {
            let mut stmt = tx.prepare(
                r#"
                SELECT tpp.uri
                FROM trip_place_photos tpp
                JOIN trip_places tp ON tpp.tripPlaceId = tp.id
                WHERE tp.tripId = ?
                "#,
            )?;
            for uri in stmt.query_map([id], |row| row.get::<_, String>(0))? {
                uris.push(uri?);
            }
        }
        tx.execute("DELETE FROM trips WHERE id = ?", [id])?;
        tx.commit()?;
        Ok(uris)
    }

    // ========================================================================
    // Itinerary operations
    // ========================================================================

    pub fn get_trip_places(&self, trip_id: i64) -> Result<Vec<TripPlace>> {
        let mut stmt = self.conn.prepare(&format!(
            r#"SELECT {TRIP_PLACE_COLUMNS} FROM trip_places WHERE tripId = ? ORDER BY "order", id"#
        ))?;
        let entries = stmt
            .query_map([trip_id], map_trip_place)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(entries)
    }

    pub fn get_trip_place(&self, id: i64) -> Result<Option<TripPlace>> {
        let entry = self
            .conn
            .query_row(
                &format!("SELECT {TRIP_PLACE_COLUMNS} FROM trip_places WHERE id = ?"),
                [id],
                map_trip_place,
            )
            .optional()?;
        Ok(entry)
    }

    /// First unvisited itinerary entry of a trip, in itinerary order.
    pub fn get_next_unvisited_trip_place(&self, trip_id: i64) -> Result<Option<TripPlace>> {
        let entry = self
            .conn
            .query_row(
                &format!(
                    r#"SELECT {TRIP_PLACE_COLUMNS} FROM trip_places
                       WHERE tripId = ? AND visited = 0 ORDER BY "order" LIMIT 1"#
                ),
                [trip_id],
                map_trip_place,
            )
            .optional()?;
        Ok(entry)
    }

    /// Append a place to a trip's itinerary. Without an explicit `order` the
    /// entry goes after the trip's current last entry.
    pub fn add_trip_place(
        &self,
        trip_id: i64,
        place_id: i64,
        order: Option<i64>,
    ) -> Result<i64> {
        let next = match order {
            Some(order) => order,
            None => {
                let max: Option<i64> = self.conn.query_row(
                    r#"SELECT MAX("order") FROM trip_places WHERE tripId = ?"#,
                    [trip_id],
                    |row| row.get(0),
                )?;
                max.unwrap_or(-1) + 1
            }
        };
        self.conn.execute(
            r#"INSERT INTO trip_places (tripId, placeId, "order", visited, visitDate, notes)
               VALUES (?, ?, ?, 0, NULL, NULL)"#,
            rusqlite::params![trip_id, place_id, next],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn update_trip_place_order(&self, id: i64, order: i64) -> Result<()> {
        self.conn.execute(
            r#"UPDATE trip_places SET "order" = ? WHERE id = ?"#,
            rusqlite::params![order, id],
        )?;
        Ok(())
    }

    /// Swap an itinerary entry with its neighbor. A no-op at the ends of the
    /// itinerary or when the entry does not exist.
    pub fn swap_trip_place_order(&self, id: i64, direction: MoveDirection) -> Result<()> {
        let Some(entry) = self.get_trip_place(id)? else {
            return Ok(());
        };
        let all = self.get_trip_places(entry.trip_id)?;
        let Some(idx) = all.iter().position(|tp| tp.id == id) else {
            return Ok(());
        };
        let swap_idx = match direction {
            MoveDirection::Up => idx.checked_sub(1),
            MoveDirection::Down => Some(idx + 1),
        };
        let Some(other) = swap_idx.and_then(|i| all.get(i)) else {
            return Ok(());
        };
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            r#"UPDATE trip_places SET "order" = ? WHERE id = ?"#,
            rusqlite::params![other.order, entry.id],
        )?;
        tx.execute(
            r#"UPDATE trip_places SET "order" = ? WHERE id = ?"#,
            rusqlite::params![entry.order, other.id],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Mark an itinerary entry visited. Defaults the visit date to today.
    pub fn mark_trip_place_visited(&self, id: i64, visit_date: Option<&str>) -> Result<()> {
        let date = visit_date.map(str::to_owned).unwrap_or_else(today);
        self.conn.execute(
            "UPDATE trip_places SET visited = 1, visitDate = ? WHERE id = ?",
            rusqlite::params![date, id],
        )?;
        Ok(())
    }

    pub fn update_trip_place_notes(&self, id: i64, notes: Option<&str>) -> Result<()> {
        self.conn.execute(
            "UPDATE trip_places SET notes = ? WHERE id = ?",
            rusqlite::params![notes, id],
        )?;
        Ok(())
    }

    /// Remove an itinerary entry; returns the URIs of its photos.
    pub fn delete_trip_place(&self, id: i64) -> Result<Vec<String>> {
        let tx = self.conn.unchecked_transaction()?;
        let mut uris = Vec::new();
        {
            let mut stmt =
                tx.prepare("SELECT uri FROM trip_place_photos WHERE tripPlaceId = ?")?;
            for uri in stmt.query_map([id], |row| row.get::<_, String>(0))? {
                uris.push(uri?);
            }
        }
        tx.execute("DELETE FROM trip_places WHERE id = ?", [id])?;
        tx.commit()?;
        Ok(uris)
    }

    // ========================================================================
    // Trip place photo operations
    // ========================================================================

    pub fn get_photos_by_trip_place(&self, trip_place_id: i64) -> Result<Vec<TripPlacePhoto>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, tripPlaceId, uri, sortOrder FROM trip_place_photos WHERE tripPlaceId = ? ORDER BY sortOrder, id",
        )?;
        let photos = stmt
            .query_map([trip_place_id], map_trip_place_photo)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(photos)
    }

    pub fn add_trip_place_photo(
        &self,
        trip_place_id: i64,
        uri: &str,
        sort_order: Option<i64>,
    ) -> Result<i64> {
        let next = match sort_order {
            Some(order) => order,
            None => {
                let max: Option<i64> = self.conn.query_row(
                    "SELECT MAX(sortOrder) FROM trip_place_photos WHERE tripPlaceId = ?",
                    [trip_place_id],
                    |row| row.get(0),
                )?;
                max.unwrap_or(-1) + 1
            }
        };
        self.conn.execute(
            "INSERT INTO trip_place_photos (tripPlaceId, uri, sortOrder) VALUES (?, ?, ?)",
            rusqlite::params![trip_place_id, uri, next],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn delete_trip_place_photo(&self, id: i64) -> Result<Option<String>> {
        let uri = self
            .conn
            .query_row(
                "SELECT uri FROM trip_place_photos WHERE id = ?",
                [id],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        self.conn
            .execute("DELETE FROM trip_place_photos WHERE id = ?", [id])?;
        Ok(uri)
    }

    pub fn delete_all_photos_for_trip_place(&self, trip_place_id: i64) -> Result<Vec<String>> {
        let mut uris = Vec::new();
        {
            let mut stmt = self
                .conn
                .prepare("SELECT uri FROM trip_place_photos WHERE tripPlaceId = ?")?;
            for uri in stmt.query_map([trip_place_id], |row| row.get::<_, String>(0))? {
                uris.push(uri?);
            }
        }
        self.conn.execute(
            "DELETE FROM trip_place_photos WHERE tripPlaceId = ?",
            [trip_place_id],
        )?;
        Ok(uris)
    }
}
