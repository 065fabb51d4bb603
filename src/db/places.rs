//! Place catalog and place photo operations.

use anyhow::{ensure, Result};
use rusqlite::{OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use super::{int_bool, now_iso, Database};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Place {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "visitlater", with = "int_bool", default = "default_true")]
    pub visit_later: bool,
    #[serde(with = "int_bool", default)]
    pub liked: bool,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    pub created_at: String,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone)]
pub struct PlacePhoto {
    pub id: i64,
    pub place_id: i64,
    pub uri: String,
    pub sort_order: i64,
}

/// Input for creating a place. Coordinates are either both present or absent.
#[derive(Debug, Clone)]
pub struct NewPlace {
    pub name: String,
    pub description: String,
    pub visit_later: bool,
    pub liked: bool,
    pub coordinates: Option<(f64, f64)>,
}

impl Default for NewPlace {
    fn default() -> Self {
        Self {
            name: String::new(),
            description: String::new(),
            visit_later: true,
            liked: false,
            coordinates: None,
        }
    }
}

/// Partial update for a place. `None` keeps the stored value;
/// `coordinates: Some(None)` clears stored coordinates.
#[derive(Debug, Clone, Default)]
pub struct PlaceUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub visit_later: Option<bool>,
    pub liked: Option<bool>,
    pub coordinates: Option<Option<(f64, f64)>>,
}

fn map_place(row: &Row) -> rusqlite::Result<Place> {
    Ok(Place {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        visit_later: row.get(3)?,
        liked: row.get(4)?,
        latitude: row.get(5)?,
        longitude: row.get(6)?,
        created_at: row.get(7)?,
    })
}

fn map_place_photo(row: &Row) -> rusqlite::Result<PlacePhoto> {
    Ok(PlacePhoto {
        id: row.get(0)?,
        place_id: row.get(1)?,
        uri: row.get(2)?,
        sort_order: row.get(3)?,
    })
}

const PLACE_COLUMNS: &str =
    "id, name, description, visitlater, liked, latitude, longitude, createdAt";

impl Database {
    pub fn get_all_places(&self) -> Result<Vec<Place>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {PLACE_COLUMNS} FROM places ORDER BY createdAt DESC"
        ))?;
        let places = stmt
            .query_map([], map_place)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(places)
    }

    pub fn get_place(&self, id: i64) -> Result<Option<Place>> {
        let place = self
            .conn
            .query_row(
                &format!("SELECT {PLACE_COLUMNS} FROM places WHERE id = ?"),
                [id],
                map_place,
            )
            .optional()?;
        Ok(place)
    }

    pub fn insert_place(&self, input: &NewPlace) -> Result<i64> {
        ensure!(!input.name.trim().is_empty(), "place name must not be empty");
        let (latitude, longitude) = match input.coordinates {
            Some((lat, lon)) => (Some(lat), Some(lon)),
            None => (None, None),
        };
        self.conn.execute(
            r#"
            INSERT INTO places (name, description, visitlater, liked, latitude, longitude, createdAt)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
            rusqlite::params![
                input.name,
                input.description,
                input.visit_later,
                input.liked,
                latitude,
                longitude,
                now_iso(),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn update_place(&self, id: i64, update: &PlaceUpdate) -> Result<()> {
        let Some(place) = self.get_place(id)? else {
            tracing::warn!(id, "update_place: no such place");
            return Ok(());
        };
        if let Some(name) = &update.name {
            ensure!(!name.trim().is_empty(), "place name must not be empty");
        }
        let (latitude, longitude) = match update.coordinates {
            Some(Some((lat, lon))) => (Some(lat), Some(lon)),
            Some(None) => (None, None),
            None => (place.latitude, place.longitude),
        };
        self.conn.execute(
            r#"
            UPDATE places SET name = ?, description = ?, visitlater = ?, liked = ?, latitude = ?, longitude = ?
            WHERE id = ?
            "#,
            rusqlite::params![
                update.name.as_deref().unwrap_or(&place.name),
                update.description.as_deref().unwrap_or(&place.description),
                update.visit_later.unwrap_or(place.visit_later),
                update.liked.unwrap_or(place.liked),
                latitude,
                longitude,
                id,
            ],
        )?;
        Ok(())
    }

    /// Delete a place. The row delete cascades to its photos and to any
    /// itinerary entries (and their photos) referencing it; the URIs of all
    /// photo files orphaned by the cascade are returned so the caller can
    /// remove them from the photo store in the same operation.
    pub fn delete_place(&self, id: i64) -> Result<Vec<String>> {
        let tx = self.conn.unchecked_transaction()?;
        let mut uris = Vec::new();
        {
            let mut stmt =
                tx.prepare("SELECT uri FROM place_photos WHERE placeId = ?")?;
            for uri in stmt.query_map([id], |row| row.get::<_, String>(0))? {
                uris.push(uri?);
            }
            let mut stmt = tx.prepare(
                r#"
                SELECT tpp.uri
                FROM trip_place_photos tpp
                JOIN trip_places tp ON tpp.tripPlaceId = tp.id
                WHERE tp.placeId = ?
                "#,
            )?;
            for uri in stmt.query_map([id], |row| row.get::<_, String>(0))? {
                uris.push(uri?);
            }
        }
        tx.execute("DELETE FROM places WHERE id = ?", [id])?;
        tx.commit()?;
        Ok(uris)
    }

    // ========================================================================
    // Place photo operations
    // ========================================================================

    pub fn get_photos_by_place(&self, place_id: i64) -> Result<Vec<PlacePhoto>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, placeId, uri, sortOrder FROM place_photos WHERE placeId = ? ORDER BY sortOrder, id",
        )?;
        let photos = stmt
            .query_map([place_id], map_place_photo)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(photos)
    }

    /// Attach a photo to a place. Without an explicit `sort_order` the photo
    /// goes after the place's current last photo.
    pub fn add_place_photo(
        &self,
        place_id: i64,
        uri: &str,
        sort_order: Option<i64>,
    ) -> Result<i64> {
        let next = match sort_order {
            Some(order) => order,
            None => {
                let max: Option<i64> = self.conn.query_row(
                    "SELECT MAX(sortOrder) FROM place_photos WHERE placeId = ?",
                    [place_id],
                    |row| row.get(0),
                )?;
                max.unwrap_or(-1) + 1
            }
        };
        self.conn.execute(
            "INSERT INTO place_photos (placeId, uri, sortOrder) VALUES (?, ?, ?)",
            rusqlite::params![place_id, uri, next],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Delete one place photo row, returning its URI (if the row existed) so
    /// the caller can remove the backing file.
    pub fn delete_place_photo(&self, id: i64) -> Result<Option<String>> {
        let uri = self
            .conn
            .query_row(
                "SELECT uri FROM place_photos WHERE id = ?",
                [id],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        self.conn
            .execute("DELETE FROM place_photos WHERE id = ?", [id])?;
        Ok(uri)
    }

    /// Delete every photo row for a place, returning the orphaned URIs.
    pub fn delete_all_photos_for_place(&self, place_id: i64) -> Result<Vec<String>> {
        let mut uris = Vec::new();
        {
            let mut stmt =
                self.conn.prepare("SELECT uri FROM place_photos WHERE placeId = ?")?;
            for uri in stmt.query_map([place_id], |row| row.get::<_, String>(0))? {
                uris.push(uri?);
            }
        }
        self.conn
            .execute("DELETE FROM place_photos WHERE placeId = ?", [place_id])?;
        Ok(uris)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();
        db
    }

    fn lake() -> NewPlace {
        NewPlace {
            name: "Lake".into(),
            coordinates: Some((42.5, 19.3)),
            ..NewPlace::default()
        }
    }

    #[test]
    fn insert_and_get_place() {
        let db = test_db();
        let id = db.insert_place(&lake()).unwrap();

        let place = db.get_place(id).unwrap().unwrap();
        assert_eq!(place.name, "Lake");
        assert_eq!(place.latitude, Some(42.5));
        assert_eq!(place.longitude, Some(19.3));
        assert!(place.visit_later);
        assert!(!place.liked);
        assert!(!place.created_at.is_empty());
    }

    #[test]
    fn empty_name_rejected() {
        let db = test_db();
        let place = NewPlace {
            name: "   ".into(),
            ..NewPlace::default()
        };
        assert!(db.insert_place(&place).is_err());
    }

    #[test]
    fn update_place_partial() {
        let db = test_db();
        let id = db.insert_place(&lake()).unwrap();

        db.update_place(
            id,
            &PlaceUpdate {
                liked: Some(true),
                coordinates: Some(None),
                ..PlaceUpdate::default()
            },
        )
        .unwrap();

        let place = db.get_place(id).unwrap().unwrap();
        assert_eq!(place.name, "Lake");
        assert!(place.liked);
        assert_eq!(place.latitude, None);
        assert_eq!(place.longitude, None);
    }

    #[test]
    fn update_missing_place_is_noop() {
        let db = test_db();
        db.update_place(999, &PlaceUpdate::default()).unwrap();
    }

    #[test]
    fn photo_sort_order_assigned() {
        let db = test_db();
        let id = db.insert_place(&lake()).unwrap();

        db.add_place_photo(id, "photos/a.jpg", None).unwrap();
        db.add_place_photo(id, "photos/b.jpg", None).unwrap();
        db.add_place_photo(id, "photos/c.jpg", Some(0)).unwrap();

        let photos = db.get_photos_by_place(id).unwrap();
        let uris: Vec<_> = photos.iter().map(|p| p.uri.as_str()).collect();
        // Equal sortOrder values fall back to id order.
        assert_eq!(uris, ["photos/a.jpg", "photos/c.jpg", "photos/b.jpg"]);
        assert_eq!(photos[0].sort_order, 0);
        assert_eq!(photos[2].sort_order, 1);
    }

    #[test]
    fn delete_place_returns_orphaned_uris() {
        let db = test_db();
        let id = db.insert_place(&lake()).unwrap();
        db.add_place_photo(id, "photos/a.jpg", None).unwrap();
        db.add_place_photo(id, "photos/b.jpg", None).unwrap();

        let mut uris = db.delete_place(id).unwrap();
        uris.sort();
        assert_eq!(uris, ["photos/a.jpg", "photos/b.jpg"]);
        assert!(db.get_place(id).unwrap().is_none());
        assert!(db.get_photos_by_place(id).unwrap().is_empty());
    }

    #[test]
    fn delete_single_photo_returns_uri() {
        let db = test_db();
        let id = db.insert_place(&lake()).unwrap();
        let photo_id = db.add_place_photo(id, "photos/a.jpg", None).unwrap();

        assert_eq!(
            db.delete_place_photo(photo_id).unwrap().as_deref(),
            Some("photos/a.jpg")
        );
        assert_eq!(db.delete_place_photo(photo_id).unwrap(), None);
    }

    #[test]
    fn places_listed_newest_first() {
        let db = test_db();
        // createdAt has millisecond resolution; force distinct timestamps.
        let a = db.insert_place(&NewPlace { name: "A".into(), ..NewPlace::default() }).unwrap();
        db.conn
            .execute("UPDATE places SET createdAt = '2026-01-01T00:00:00.000Z' WHERE id = ?", [a])
            .unwrap();
        let b = db.insert_place(&NewPlace { name: "B".into(), ..NewPlace::default() }).unwrap();
        db.conn
            .execute("UPDATE places SET createdAt = '2026-02-01T00:00:00.000Z' WHERE id = ?", [b])
            .unwrap();

        let names: Vec<_> = db
            .get_all_places()
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, ["B", "A"]);
    }
}
