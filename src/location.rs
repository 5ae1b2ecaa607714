//! Location records shared by the manager and hooked processes
//!
//! Structured values are stored in the preferences file as JSON text. Field
//! names are part of the on-disk contract: `latitude`, `longitude`,
//! `altitude`, `accuracy`, `label`.

use crate::constants::FAVORITE_ID_LEN;
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::{SystemTime, UNIX_EPOCH};

/// A single position fix
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationRecord {
    /// Degrees, [-90, 90]
    pub latitude: f64,
    /// Degrees, [-180, 180]
    pub longitude: f64,
    /// Meters above the WGS84 ellipsoid
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub altitude: Option<f64>,
    /// Horizontal accuracy radius in meters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
    /// Degrees east of true north
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bearing: Option<f64>,
    /// Meters per second
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
    /// Capture time, milliseconds since the UNIX epoch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<u64>,
}

impl LocationRecord {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            altitude: None,
            accuracy: None,
            bearing: None,
            speed: None,
            time: None,
        }
    }

    pub fn with_altitude(mut self, altitude: f64) -> Self {
        self.altitude = Some(altitude);
        self
    }

    pub fn with_accuracy(mut self, accuracy: f64) -> Self {
        self.accuracy = Some(accuracy);
        self
    }

    /// Stamp the record with the current wall-clock time
    pub fn stamped_now(mut self) -> Self {
        self.time = Some(now_millis());
        self
    }

    /// Schema check applied to every structured value read from the store
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Latitude or longitude is non-finite or out of range
    /// - An optional value is present but non-finite
    /// - Accuracy or speed is negative
    pub fn validate(&self) -> Result<()> {
        if !self.latitude.is_finite() || !(-90.0..=90.0).contains(&self.latitude) {
            bail!("latitude out of range: {}", self.latitude);
        }
        if !self.longitude.is_finite() || !(-180.0..=180.0).contains(&self.longitude) {
            bail!("longitude out of range: {}", self.longitude);
        }

        let optionals = [
            ("altitude", self.altitude),
            ("accuracy", self.accuracy),
            ("bearing", self.bearing),
            ("speed", self.speed),
        ];
        for (name, value) in optionals {
            if let Some(v) = value {
                if !v.is_finite() {
                    bail!("{} is not a finite number", name);
                }
            }
        }

        if self.accuracy.is_some_and(|a| a < 0.0) {
            bail!("accuracy must not be negative");
        }
        if self.speed.is_some_and(|s| s < 0.0) {
            bail!("speed must not be negative");
        }
        Ok(())
    }
}

/// A named location saved by the user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FavoriteLocation {
    /// Stable identity used for removal and selection
    pub id: String,
    pub label: String,
    #[serde(flatten)]
    pub location: LocationRecord,
}

impl FavoriteLocation {
    /// Create a favorite whose id is derived from the label and coordinates
    pub fn new(label: impl Into<String>, location: LocationRecord) -> Self {
        let label = label.into();
        let id = favorite_id(&label, &location);
        Self {
            id,
            label,
            location,
        }
    }

    /// Create a favorite with an id assigned by the caller
    pub fn with_id(id: impl Into<String>, label: impl Into<String>, location: LocationRecord) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            location,
        }
    }
}

/// Derive a favorite id: truncated hex SHA-256 of label and coordinates
pub fn favorite_id(label: &str, location: &LocationRecord) -> String {
    let mut hasher = Sha256::new();
    hasher.update(label.as_bytes());
    hasher.update(location.latitude.to_bits().to_le_bytes());
    hasher.update(location.longitude.to_bits().to_le_bytes());
    let digest = hex::encode(hasher.finalize());
    digest[..FAVORITE_ID_LEN].to_string()
}

/// Which stored location serves as the base for synthesis
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActiveBase {
    /// The location last picked on the map
    #[default]
    LastClicked,
    /// A saved favorite, by id
    Favorite { id: String },
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_json_parses() {
        let record: LocationRecord =
            serde_json::from_str(r#"{"latitude": 37.0, "longitude": -122.0}"#).unwrap();
        assert_eq!(record, LocationRecord::new(37.0, -122.0));
        assert!(record.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        assert!(LocationRecord::new(91.0, 0.0).validate().is_err());
        assert!(LocationRecord::new(0.0, -180.5).validate().is_err());
        assert!(LocationRecord::new(f64::NAN, 0.0).validate().is_err());
        assert!(LocationRecord::new(0.0, 0.0)
            .with_accuracy(-1.0)
            .validate()
            .is_err());
    }

    #[test]
    fn test_validate_accepts_boundaries() {
        assert!(LocationRecord::new(90.0, 180.0).validate().is_ok());
        assert!(LocationRecord::new(-90.0, -180.0).validate().is_ok());
    }

    #[test]
    fn test_favorite_id_depends_on_label_and_coordinates() {
        let home = LocationRecord::new(48.8566, 2.3522);
        let a = FavoriteLocation::new("Home", home.clone());
        let b = FavoriteLocation::new("Home", home.clone());
        let c = FavoriteLocation::new("Work", home);
        let d = FavoriteLocation::new("Home", LocationRecord::new(48.8567, 2.3522));

        assert_eq!(a.id, b.id);
        assert_ne!(a.id, c.id);
        assert_ne!(a.id, d.id);
        assert_eq!(a.id.len(), FAVORITE_ID_LEN);
    }

    #[test]
    fn test_favorite_json_uses_flat_field_names() {
        let fav = FavoriteLocation::with_id("f1", "Cafe", LocationRecord::new(1.5, 2.5));
        let json = serde_json::to_value(&fav).unwrap();
        assert_eq!(json["label"], "Cafe");
        assert_eq!(json["latitude"], 1.5);
        assert_eq!(json["longitude"], 2.5);
    }

    #[test]
    fn test_active_base_default_is_last_clicked() {
        assert_eq!(ActiveBase::default(), ActiveBase::LastClicked);
        let parsed: ActiveBase =
            serde_json::from_str(r#"{"kind": "favorite", "id": "abc"}"#).unwrap();
        assert_eq!(
            parsed,
            ActiveBase::Favorite {
                id: "abc".to_string()
            }
        );
    }
}
