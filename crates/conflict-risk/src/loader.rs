//! Conflict dataset loading from JSON files

use crate::{ConflictZone, Result};
use serde::Deserialize;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::info;

/// Validate latitude is in valid range
fn is_valid_latitude(lat: f64) -> bool {
    (-90.0..=90.0).contains(&lat) && lat.is_finite()
}

/// Validate longitude is in valid range
fn is_valid_longitude(lon: f64) -> bool {
    (-180.0..=180.0).contains(&lon) && lon.is_finite()
}

/// Sanitize ID to prevent injection (alphanumeric, dash, underscore only)
fn sanitize_id(id: String) -> String {
    id.chars()
        .filter(|c| c.is_alphanumeric() || *c == '-' || *c == '_')
        .take(128) // Max length
        .collect()
}

/// Sanitize free-text fields (allow more chars but still limit)
fn sanitize_text(text: String) -> String {
    text.chars()
        .filter(|c| c.is_alphanumeric() || " -_.,()&'/".contains(*c))
        .take(256)
        .collect()
}

/// Raw conflict zone record from JSON
#[derive(Debug, Deserialize)]
struct RawConflictZone {
    id: Option<String>,
    date: Option<String>,
    #[serde(rename = "type")]
    zone_type: Option<String>,
    location: Option<String>,
    notes: Option<String>,
    position: Option<Vec<f64>>,
}

/// Container for datasets that wrap the array in an object
#[derive(Debug, Deserialize)]
struct ConflictZoneFile {
    zones: Option<Vec<RawConflictZone>>,
}

/// Load conflict zones from a JSON file
///
/// Accepts either a bare array of records or an object with a `zones` field.
/// Records without a usable `[lat, lon]` position are skipped and counted.
pub fn load_conflict_zones(path: impl AsRef<Path>) -> Result<Vec<ConflictZone>> {
    let path = path.as_ref();
    info!("Loading conflict zones from {:?}", path);

    let file = File::open(path)?;
    let reader = BufReader::new(file);

    let raw: serde_json::Value = serde_json::from_reader(reader)?;
    let records: Vec<RawConflictZone> = if raw.is_array() {
        serde_json::from_value(raw)?
    } else {
        let wrapped: ConflictZoneFile = serde_json::from_value(raw)?;
        wrapped.zones.unwrap_or_default()
    };

    let mut zones = Vec::new();
    let mut skipped = 0;

    for (i, record) in records.into_iter().enumerate() {
        let position = match record.position.as_deref() {
            Some([lat, lon]) if is_valid_latitude(*lat) && is_valid_longitude(*lon) => {
                [*lat, *lon]
            }
            _ => {
                skipped += 1;
                continue;
            }
        };

        let id = sanitize_id(record.id.unwrap_or_else(|| format!("cz-{}", i)));
        let zone_type = sanitize_text(record.zone_type.unwrap_or_else(|| "unknown".to_string()));
        let location = sanitize_text(record.location.unwrap_or_else(|| "Unknown".to_string()));
        let date = sanitize_text(record.date.unwrap_or_default());
        let notes = record.notes.map(sanitize_text);

        zones.push(ConflictZone {
            id,
            date,
            zone_type,
            location,
            notes,
            position,
        });
    }

    info!(
        "Loaded {} conflict zones ({} skipped for missing or invalid position)",
        zones.len(),
        skipped
    );

    Ok(zones)
}
