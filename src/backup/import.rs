//! Import restorer: replace the entire catalog with a backup document.
//!
//! Runs as one SQLite transaction. Primary keys are regenerated on insert,
//! so every foreign key in the document is resolved through an old-id to
//! new-id map built as parents are inserted; rows whose parent cannot be
//! resolved are skipped. On failure the transaction rolls back and any photo
//! files already materialized for this import are removed.

use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use rusqlite::Transaction;
use std::collections::HashMap;
use std::path::PathBuf;

use super::BackupData;
use crate::db::Database;
use crate::storage::PhotoStore;

pub fn import_from_backup(db: &Database, store: &PhotoStore, data: &BackupData) -> Result<()> {
    let tx = db.conn.unchecked_transaction()?;
    let mut materialized: Vec<PathBuf> = Vec::new();

    match restore(&tx, store, data, &mut materialized) {
        Ok(()) => {
            tx.commit()?;
            tracing::info!(
                places = data.places.len(),
                trips = data.trips.len(),
                "backup imported"
            );
            Ok(())
        }
        Err(e) => {
            // Dropping the transaction rolls the tables back; the files
            // written for this import are orphans now, so remove them.
            drop(tx);
            for path in &materialized {
                if let Some(uri) = path.to_str() {
                    store.remove_file(uri);
                }
            }
            Err(e)
        }
    }
}

/// Decide the URI for an imported photo row: materialize embedded bytes as
/// a new file, or keep the document's URI verbatim when no bytes were
/// embedded (the file may no longer exist; that is the exporter's contract).
fn resolve_photo_uri(
    store: &PhotoStore,
    prefix: &str,
    uri: &str,
    base64: Option<&str>,
    materialized: &mut Vec<PathBuf>,
) -> Result<String> {
    let Some(encoded) = base64 else {
        return Ok(uri.to_string());
    };
    let bytes = BASE64
        .decode(encoded)
        .context("backup photo has invalid base64 data")?;
    let path = store.write_bytes(prefix, &bytes)?;
    materialized.push(path.clone());
    Ok(path.to_string_lossy().into_owned())
}

fn restore(
    tx: &Transaction,
    store: &PhotoStore,
    data: &BackupData,
    materialized: &mut Vec<PathBuf>,
) -> Result<()> {
    // Child tables first so the deletes never trip a foreign key.
    tx.execute_batch(
        r#"
        DELETE FROM trip_place_photos;
        DELETE FROM trip_places;
        DELETE FROM place_photos;
        DELETE FROM trips;
        DELETE FROM places;
        "#,
    )?;

    let mut place_ids: HashMap<i64, i64> = HashMap::new();
    for place in &data.places {
        tx.execute(
            r#"
            INSERT INTO places (name, description, visitlater, liked, latitude, longitude, createdAt)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
            rusqlite::params![
                place.name,
                place.description,
                place.visit_later,
                place.liked,
                place.latitude,
                place.longitude,
                place.created_at,
            ],
        )?;
        place_ids.insert(place.id, tx.last_insert_rowid());
    }

    for photo in &data.place_photos {
        let Some(&place_id) = place_ids.get(&photo.place_id) else {
            tracing::debug!(place_id = photo.place_id, "skipping photo of unknown place");
            continue;
        };
        let uri = resolve_photo_uri(store, "place", &photo.uri, photo.base64.as_deref(), materialized)?;
        tx.execute(
            "INSERT INTO place_photos (placeId, uri, sortOrder) VALUES (?, ?, ?)",
            rusqlite::params![place_id, uri, photo.sort_order],
        )?;
    }

    let mut trip_ids: HashMap<i64, i64> = HashMap::new();
    for trip in &data.trips {
        tx.execute(
            r#"
            INSERT INTO trips (title, description, startDate, endDate, createdAt, current)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
            rusqlite::params![
                trip.title,
                trip.description,
                trip.start_date,
                trip.end_date,
                trip.created_at,
                trip.current,
            ],
        )?;
        trip_ids.insert(trip.id, tx.last_insert_rowid());
    }

    // Itinerary photos reference entries by id, so the old entry id must be
    // mapped too, not just the (trip, place) pair.
    let mut trip_place_ids: HashMap<i64, i64> = HashMap::new();
    for entry in &data.trip_places {
        let (Some(&trip_id), Some(&place_id)) = (
            trip_ids.get(&entry.trip_id),
            place_ids.get(&entry.place_id),
        ) else {
            tracing::debug!(
                trip_id = entry.trip_id,
                place_id = entry.place_id,
                "skipping itinerary entry with unknown trip or place"
            );
            continue;
        };
        tx.execute(
            r#"INSERT INTO trip_places (tripId, placeId, "order", visited, visitDate, notes)
               VALUES (?, ?, ?, ?, ?, ?)"#,
            rusqlite::params![
                trip_id,
                place_id,
                entry.order,
                entry.visited,
                entry.visit_date,
                entry.notes,
            ],
        )?;
        trip_place_ids.insert(entry.id, tx.last_insert_rowid());
    }

    for photo in &data.trip_place_photos {
        let Some(&trip_place_id) = trip_place_ids.get(&photo.trip_place_id) else {
            tracing::debug!(
                trip_place_id = photo.trip_place_id,
                "skipping photo of unknown itinerary entry"
            );
            continue;
        };
        let uri = resolve_photo_uri(store, "trip", &photo.uri, photo.base64.as_deref(), materialized)?;
        tx.execute(
            "INSERT INTO trip_place_photos (tripPlaceId, uri, sortOrder) VALUES (?, ?, ?)",
            rusqlite::params![trip_place_id, uri, photo.sort_order],
        )?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::export::export_to_backup;
    use crate::backup::{BackupPlacePhoto, BackupTripPlacePhoto, APP_ID, BACKUP_VERSION};
    use crate::db::places::NewPlace;
    use crate::db::trips::{NewTrip, TripPlace};
    use tempfile::TempDir;

    fn test_db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();
        db
    }

    fn empty_doc() -> BackupData {
        BackupData {
            version: BACKUP_VERSION,
            exported_at: "2026-08-26T10:00:00.000Z".into(),
            app: APP_ID.into(),
            places: Vec::new(),
            place_photos: Vec::new(),
            trips: Vec::new(),
            trip_places: Vec::new(),
            trip_place_photos: Vec::new(),
        }
    }

    /// Build a populated source database: one liked place with coordinates,
    /// one plain place, a current trip whose itinerary covers both, one
    /// visit marked, and a photo (with a real file) on the first place.
    fn populate(db: &Database, photo_file: &std::path::Path) {
        std::fs::write(photo_file, b"lake-photo").unwrap();
        let lake = db
            .insert_place(&NewPlace {
                name: "Lake".into(),
                description: "quiet".into(),
                liked: true,
                coordinates: Some((42.5, 19.3)),
                ..NewPlace::default()
            })
            .unwrap();
        let fort = db
            .insert_place(&NewPlace { name: "Fort".into(), ..NewPlace::default() })
            .unwrap();
        db.add_place_photo(lake, photo_file.to_str().unwrap(), None).unwrap();

        let t = db
            .insert_trip(&NewTrip {
                title: "Coast".into(),
                start_date: "2026-05-01".into(),
                end_date: "2026-05-07".into(),
                current: true,
                ..NewTrip::default()
            })
            .unwrap();
        let e1 = db.add_trip_place(t, lake, None).unwrap();
        db.add_trip_place(t, fort, None).unwrap();
        db.mark_trip_place_visited(e1, Some("2026-05-02")).unwrap();
        db.update_trip_place_notes(e1, Some("swim early")).unwrap();
        db.add_trip_place_photo(e1, "/gone/visit.jpg", None).unwrap();
    }

    #[test]
    fn round_trip_preserves_content_with_new_ids() {
        let dir = TempDir::new().unwrap();
        let src = test_db();
        populate(&src, &dir.path().join("lake.jpg"));
        let data = export_to_backup(&src).unwrap();

        let dst = test_db();
        let store = PhotoStore::new(dir.path().join("photos"));
        import_from_backup(&dst, &store, &data).unwrap();

        let places = dst.get_all_places().unwrap();
        assert_eq!(places.len(), 2);
        let lake = places.iter().find(|p| p.name == "Lake").unwrap();
        assert_eq!(lake.description, "quiet");
        assert!(lake.liked);
        assert_eq!(lake.latitude, Some(42.5));
        assert_eq!(lake.longitude, Some(19.3));

        let trips = dst.get_all_trips().unwrap();
        assert_eq!(trips.len(), 1);
        assert!(trips[0].current);
        let entries = dst.get_trip_places(trips[0].id).unwrap();
        assert_eq!(entries.len(), 2);
        let visited: Vec<&TripPlace> = entries.iter().filter(|e| e.visited).collect();
        assert_eq!(visited.len(), 1);
        assert_eq!(visited[0].place_id, lake.id);
        assert_eq!(visited[0].visit_date.as_deref(), Some("2026-05-02"));
        assert_eq!(visited[0].notes.as_deref(), Some("swim early"));

        // The embedded photo was materialized into the store with the same
        // bytes under a fresh name.
        let photos = dst.get_photos_by_place(lake.id).unwrap();
        assert_eq!(photos.len(), 1);
        let path = std::path::Path::new(&photos[0].uri);
        assert!(path.starts_with(store.root()));
        assert_eq!(std::fs::read(path).unwrap(), b"lake-photo");

        // The visit photo had no embedded bytes: its uri survives verbatim.
        let visit_photos = dst.get_photos_by_trip_place(visited[0].id).unwrap();
        assert_eq!(visit_photos.len(), 1);
        assert_eq!(visit_photos[0].uri, "/gone/visit.jpg");
    }

    #[test]
    fn import_replaces_existing_dataset() {
        let dir = TempDir::new().unwrap();
        let db = test_db();
        db.insert_place(&NewPlace { name: "Leftover".into(), ..NewPlace::default() })
            .unwrap();

        let store = PhotoStore::new(dir.path().join("photos"));
        import_from_backup(&db, &store, &empty_doc()).unwrap();

        assert!(db.get_all_places().unwrap().is_empty());
        assert!(db.get_all_trips().unwrap().is_empty());
    }

    #[test]
    fn unmappable_references_are_skipped() {
        let dir = TempDir::new().unwrap();
        let mut data = empty_doc();
        data.places.push(crate::db::Place {
            id: 1,
            name: "Lake".into(),
            description: String::new(),
            visit_later: true,
            liked: false,
            latitude: None,
            longitude: None,
            created_at: "2026-01-01T00:00:00.000Z".into(),
        });
        data.trips.push(crate::db::Trip {
            id: 10,
            title: "Coast".into(),
            description: String::new(),
            start_date: "2026-05-01".into(),
            end_date: "2026-05-07".into(),
            created_at: "2026-01-01T00:00:00.000Z".into(),
            current: false,
        });
        // References place 99, which the document does not contain.
        data.trip_places.push(TripPlace {
            id: 20,
            trip_id: 10,
            place_id: 99,
            order: 0,
            visited: false,
            visit_date: None,
            notes: None,
        });
        // Valid entry alongside the broken one.
        data.trip_places.push(TripPlace {
            id: 21,
            trip_id: 10,
            place_id: 1,
            order: 1,
            visited: false,
            visit_date: None,
            notes: None,
        });
        data.place_photos.push(BackupPlacePhoto {
            place_id: 99,
            uri: "photos/orphan.jpg".into(),
            sort_order: 0,
            base64: None,
        });
        data.trip_place_photos.push(BackupTripPlacePhoto {
            trip_place_id: 20,
            uri: "photos/orphan2.jpg".into(),
            sort_order: 0,
            base64: None,
        });

        let db = test_db();
        let store = PhotoStore::new(dir.path().join("photos"));
        import_from_backup(&db, &store, &data).unwrap();

        let trips = db.get_all_trips().unwrap();
        let entries = db.get_trip_places(trips[0].id).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].order, 1);
        assert!(db.get_photos_by_place(entries[0].place_id).unwrap().is_empty());
    }

    #[test]
    fn failed_import_rolls_back_and_cleans_files() {
        let dir = TempDir::new().unwrap();
        let db = test_db();
        db.insert_place(&NewPlace { name: "Survivor".into(), ..NewPlace::default() })
            .unwrap();

        let mut data = empty_doc();
        data.places.push(crate::db::Place {
            id: 1,
            name: "Lake".into(),
            description: String::new(),
            visit_later: true,
            liked: false,
            latitude: None,
            longitude: None,
            created_at: "2026-01-01T00:00:00.000Z".into(),
        });
        data.place_photos.push(BackupPlacePhoto {
            place_id: 1,
            uri: "photos/ok.jpg".into(),
            sort_order: 0,
            base64: Some(BASE64.encode(b"fine")),
        });
        data.place_photos.push(BackupPlacePhoto {
            place_id: 1,
            uri: "photos/bad.jpg".into(),
            sort_order: 1,
            base64: Some("%%% not base64 %%%".into()),
        });

        let store = PhotoStore::new(dir.path().join("photos"));
        assert!(import_from_backup(&db, &store, &data).is_err());

        // Pre-import rows survive the rollback.
        let places = db.get_all_places().unwrap();
        assert_eq!(places.len(), 1);
        assert_eq!(places[0].name, "Survivor");

        // The file materialized before the failure was cleaned up.
        let leftovers = std::fs::read_dir(store.root())
            .map(|entries| entries.count())
            .unwrap_or(0);
        assert_eq!(leftovers, 0);
    }
}
