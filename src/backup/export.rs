//! Export serializer: dump the whole catalog into one backup document.

use anyhow::Result;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use std::fs;
use std::path::{Path, PathBuf};

use super::{write_backup_file, BackupData, BackupPlacePhoto, BackupTripPlacePhoto, APP_ID, BACKUP_VERSION};
use crate::db::{now_iso, Database};

/// Read a photo file as base64. Best-effort: a missing, unreadable, or
/// non-file URI yields `None` and the photo row is exported without bytes.
fn read_uri_as_base64(uri: &str) -> Option<String> {
    let path = Path::new(uri);
    let meta = fs::metadata(path).ok()?;
    if !meta.is_file() {
        return None;
    }
    let bytes = fs::read(path).ok()?;
    Some(BASE64.encode(bytes))
}

/// Collect every row of the catalog, with photo bytes inlined where the
/// files are readable. Only reads the store; only a database failure aborts.
pub fn export_to_backup(db: &Database) -> Result<BackupData> {
    let places = db.get_all_places()?;
    let trips = db.get_all_trips()?;

    let mut place_photos = Vec::new();
    for place in &places {
        for photo in db.get_photos_by_place(place.id)? {
            let base64 = read_uri_as_base64(&photo.uri);
            place_photos.push(BackupPlacePhoto {
                place_id: photo.place_id,
                uri: photo.uri,
                sort_order: photo.sort_order,
                base64,
            });
        }
    }

    let mut trip_places = Vec::new();
    let mut trip_place_photos = Vec::new();
    for trip in &trips {
        let entries = db.get_trip_places(trip.id)?;
        for entry in &entries {
            for photo in db.get_photos_by_trip_place(entry.id)? {
                let base64 = read_uri_as_base64(&photo.uri);
                trip_place_photos.push(BackupTripPlacePhoto {
                    trip_place_id: photo.trip_place_id,
                    uri: photo.uri,
                    sort_order: photo.sort_order,
                    base64,
                });
            }
        }
        trip_places.extend(entries);
    }

    tracing::info!(
        places = places.len(),
        trips = trips.len(),
        photos = place_photos.len() + trip_place_photos.len(),
        "exported backup document"
    );

    Ok(BackupData {
        version: BACKUP_VERSION,
        exported_at: now_iso(),
        app: APP_ID.to_string(),
        places,
        place_photos,
        trips,
        trip_places,
        trip_place_photos,
    })
}

/// Export the catalog and write it to a timestamped file in `dir`.
pub fn create_backup_file(db: &Database, dir: &Path) -> Result<PathBuf> {
    let data = export_to_backup(db)?;
    write_backup_file(&data, dir)
}
