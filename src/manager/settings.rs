use super::PreferencesWriter;
use crate::bridge::{decode, last_clicked_from, params_from, PrefKey};
use crate::constants::{
    KEY_ACCURACY, KEY_ACTIVE_BASE, KEY_ALTITUDE, KEY_IS_PLAYING, KEY_LAST_CLICKED_LOCATION,
    KEY_RANDOMIZE_RADIUS, KEY_USE_ACCURACY, KEY_USE_ALTITUDE, KEY_USE_RANDOMIZE,
};
use crate::location::{ActiveBase, LocationRecord};
use crate::store::Preferences;
use crate::synthesis::SynthesisParams;
use anyhow::{bail, Context, Result};
use log::info;
use std::sync::Arc;

/// Everything the settings screen shows
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub is_playing: bool,
    pub params: SynthesisParams,
    pub last_clicked_location: Option<LocationRecord>,
}

/// A batch of settings changes; `None` leaves a field as stored
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingsUpdate {
    pub use_accuracy: Option<bool>,
    pub accuracy: Option<f64>,
    pub use_altitude: Option<bool>,
    pub altitude: Option<f64>,
    pub use_randomize: Option<bool>,
    pub randomize_radius: Option<f64>,
}

impl SettingsUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Check every numeric field before anything is written
    pub fn validate(&self) -> Result<()> {
        if let Some(meters) = self.accuracy {
            check_non_negative("Accuracy", meters)?;
        }
        if let Some(meters) = self.altitude {
            check_finite("Altitude", meters)?;
        }
        if let Some(meters) = self.randomize_radius {
            check_non_negative("Randomize radius", meters)?;
        }
        Ok(())
    }
}

fn check_finite(name: &str, meters: f64) -> Result<()> {
    if !meters.is_finite() {
        bail!("{} must be a finite number of meters, got {}", name, meters);
    }
    Ok(())
}

fn check_non_negative(name: &str, meters: f64) -> Result<()> {
    if !meters.is_finite() || meters < 0.0 {
        bail!("{} must be a non-negative number of meters, got {}", name, meters);
    }
    Ok(())
}

/// Parse a numeric field the way the settings form does
///
/// Returns None for anything that is not a finite number, leaving the stored
/// value unchanged.
pub fn parse_setting_input(input: &str) -> Option<f64> {
    input
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

pub struct SettingsRepository {
    writer: Arc<PreferencesWriter>,
}

impl SettingsRepository {
    pub fn new(writer: Arc<PreferencesWriter>) -> Self {
        Self { writer }
    }

    /// Current settings, read from disk
    pub fn load(&self) -> Result<Settings> {
        let prefs = self.writer.load().context("Failed to load settings")?;
        Ok(settings_from(&prefs))
    }

    pub fn set_playing(&self, playing: bool) -> Result<()> {
        self.put_bool(KEY_IS_PLAYING, playing)?;
        info!("Fake location {}", if playing { "started" } else { "stopped" });
        Ok(())
    }

    pub fn set_use_accuracy(&self, enabled: bool) -> Result<()> {
        self.put_bool(KEY_USE_ACCURACY, enabled)
    }

    pub fn set_accuracy(&self, meters: f64) -> Result<()> {
        check_non_negative("Accuracy", meters)?;
        self.put_double(KEY_ACCURACY, meters)
    }

    pub fn set_use_altitude(&self, enabled: bool) -> Result<()> {
        self.put_bool(KEY_USE_ALTITUDE, enabled)
    }

    pub fn set_altitude(&self, meters: f64) -> Result<()> {
        check_finite("Altitude", meters)?;
        self.put_double(KEY_ALTITUDE, meters)
    }

    pub fn set_use_randomize(&self, enabled: bool) -> Result<()> {
        self.put_bool(KEY_USE_RANDOMIZE, enabled)
    }

    pub fn set_randomize_radius(&self, meters: f64) -> Result<()> {
        check_non_negative("Randomize radius", meters)?;
        self.put_double(KEY_RANDOMIZE_RADIUS, meters)
    }

    /// Apply several changes in one write
    ///
    /// Nothing is stored unless every field is valid.
    pub fn update(&self, update: &SettingsUpdate) -> Result<()> {
        update.validate()?;
        self.writer.edit(|prefs| {
            let bools = [
                (KEY_USE_ACCURACY, update.use_accuracy),
                (KEY_USE_ALTITUDE, update.use_altitude),
                (KEY_USE_RANDOMIZE, update.use_randomize),
            ];
            for (key, value) in bools {
                if let Some(value) = value {
                    prefs.put_bool(key, value);
                }
            }
            let numbers = [
                (KEY_ACCURACY, update.accuracy),
                (KEY_ALTITUDE, update.altitude),
                (KEY_RANDOMIZE_RADIUS, update.randomize_radius),
            ];
            for (key, value) in numbers {
                if let Some(value) = value {
                    prefs.put_double(key, value);
                }
            }
            Ok(())
        })?;
        info!("Settings updated: {:?}", update);
        Ok(())
    }

    /// Store the location picked on the map and make it the active base
    pub fn set_last_clicked_location(&self, location: &LocationRecord) -> Result<()> {
        location.validate().context("Invalid location")?;
        self.writer.edit(|prefs| {
            prefs.put_json(KEY_LAST_CLICKED_LOCATION, location)?;
            prefs.put_json(KEY_ACTIVE_BASE, &ActiveBase::LastClicked)
        })?;
        info!(
            "Last clicked location set to ({:.6}, {:.6})",
            location.latitude, location.longitude
        );
        Ok(())
    }

    fn put_bool(&self, key: &str, value: bool) -> Result<()> {
        self.writer.edit(|prefs| {
            prefs.put_bool(key, value);
            Ok(())
        })
    }

    fn put_double(&self, key: &str, value: f64) -> Result<()> {
        self.writer.edit(|prefs| {
            prefs.put_double(key, value);
            Ok(())
        })
    }
}

fn settings_from(prefs: &Preferences) -> Settings {
    Settings {
        is_playing: decode(prefs, PrefKey::IsPlaying).as_bool().unwrap_or(false),
        params: params_from(prefs),
        last_clicked_location: last_clicked_from(prefs),
    }
}
