//! Backup document format: a single self-contained JSON file holding every
//! row of the catalog plus base64 copies of the photo files, restorable on a
//! device that has none of the original files.

pub mod export;
pub mod import;

use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::db::{Place, Trip, TripPlace};

pub const BACKUP_VERSION: u32 = 1;
pub const APP_ID: &str = "waymark";

/// Rejections raised by document validation, always before any table is
/// touched.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BackupError {
    #[error("invalid backup file format")]
    InvalidFormat,
    #[error("unsupported backup version {0} (expected {BACKUP_VERSION})")]
    UnsupportedVersion(u64),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupPlacePhoto {
    pub place_id: i64,
    pub uri: String,
    #[serde(default)]
    pub sort_order: i64,
    /// Base64 copy of the file's bytes; absent when the file could not be
    /// read at export time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base64: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupTripPlacePhoto {
    pub trip_place_id: i64,
    pub uri: String,
    #[serde(default)]
    pub sort_order: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base64: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupData {
    pub version: u32,
    #[serde(rename = "exportedAt")]
    pub exported_at: String,
    pub app: String,
    pub places: Vec<Place>,
    #[serde(default)]
    pub place_photos: Vec<BackupPlacePhoto>,
    pub trips: Vec<Trip>,
    #[serde(default)]
    pub trip_places: Vec<TripPlace>,
    #[serde(default)]
    pub trip_place_photos: Vec<BackupTripPlacePhoto>,
}

/// Parse and validate a backup document. The version must match
/// [`BACKUP_VERSION`], `places` must be present, and `trips` must be an
/// array; anything else is rejected as malformed.
pub fn parse_backup(raw: &str) -> Result<BackupData, BackupError> {
    let value: serde_json::Value =
        serde_json::from_str(raw).map_err(|_| BackupError::InvalidFormat)?;
    let version = value
        .get("version")
        .and_then(|v| v.as_u64())
        .ok_or(BackupError::InvalidFormat)?;
    if version != u64::from(BACKUP_VERSION) {
        return Err(BackupError::UnsupportedVersion(version));
    }
    let places_ok = value.get("places").is_some_and(|p| p.is_array());
    let trips_ok = value.get("trips").is_some_and(|t| t.is_array());
    if !places_ok || !trips_ok {
        return Err(BackupError::InvalidFormat);
    }
    serde_json::from_value(value).map_err(|_| BackupError::InvalidFormat)
}

/// Timestamped backup filename, e.g. `waymark_backup_2026-08-26T10-15-00.json`.
pub fn backup_filename() -> String {
    format!(
        "{}_backup_{}.json",
        APP_ID,
        Utc::now().format("%Y-%m-%dT%H-%M-%S")
    )
}

/// Serialize a backup document into `dir` and return the file path.
pub fn write_backup_file(data: &BackupData, dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create backup directory {}", dir.display()))?;
    let path = dir.join(backup_filename());
    let json = serde_json::to_string(data)?;
    std::fs::write(&path, json)
        .with_context(|| format!("Failed to write backup file {}", path.display()))?;
    Ok(path)
}

/// Read and validate a backup file from disk.
pub fn read_backup_file(path: &Path) -> Result<BackupData> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read backup file {}", path.display()))?;
    Ok(parse_backup(&raw)?)
}
