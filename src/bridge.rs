//! Read side of the preferences store, used inside hooked processes
//!
//! The writer is another process and there is no change notification, so
//! the store is reloaded before every read. Nothing read here outlives the
//! call that asked for it.
//!
//! Reads never fail. A missing or unreadable store yields the documented
//! default for each key; a structured value that does not decode or does not
//! pass its schema check yields `None`.

use crate::constants::{
    DEFAULT_ACCURACY, DEFAULT_ALTITUDE, DEFAULT_RANDOMIZE_RADIUS, KEY_ACCURACY, KEY_ACTIVE_BASE,
    KEY_ALTITUDE, KEY_FAVORITES, KEY_IS_PLAYING, KEY_LAST_CLICKED_LOCATION, KEY_RANDOMIZE_RADIUS,
    KEY_USE_ACCURACY, KEY_USE_ALTITUDE, KEY_USE_RANDOMIZE,
};
use crate::location::{ActiveBase, FavoriteLocation, LocationRecord};
use crate::store::{Preferences, PreferencesFile};
use crate::synthesis::SynthesisParams;
use anyhow::{Context, Result};
use log::{debug, warn};
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use std::sync::Arc;

const TAG: &str = "[ConfigBridge]";

/// Anything that can produce a fresh copy of the preferences
pub trait ConfigSource: Send + Sync {
    /// Re-read the underlying store. Called before every decode.
    fn reload(&self) -> Result<Preferences>;
}

impl ConfigSource for PreferencesFile {
    fn reload(&self) -> Result<Preferences> {
        self.load()
    }
}

/// Preferences held in memory, for the probe command and tests
#[derive(Debug, Default)]
pub struct MemorySource {
    prefs: RwLock<Preferences>,
}

impl MemorySource {
    pub fn new(prefs: Preferences) -> Self {
        Self {
            prefs: RwLock::new(prefs),
        }
    }

    /// Mutate the stored preferences, as the manager would
    pub fn update(&self, f: impl FnOnce(&mut Preferences)) {
        f(&mut self.prefs.write());
    }
}

impl ConfigSource for MemorySource {
    fn reload(&self) -> Result<Preferences> {
        Ok(self.prefs.read().clone())
    }
}

/// Every key the engine reads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrefKey {
    IsPlaying,
    UseAccuracy,
    Accuracy,
    UseAltitude,
    Altitude,
    UseRandomize,
    RandomizeRadius,
    LastClickedLocation,
    Favorites,
    ActiveBase,
}

/// How a key's stored value is decoded
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum KeyKind {
    /// Direct boolean, default `false`
    Boolean,
    /// Double stored as raw bits, with a per-key default
    Number { default: f64 },
    /// JSON text, absent when missing or malformed
    Structured,
}

impl PrefKey {
    pub const ALL: [PrefKey; 10] = [
        PrefKey::IsPlaying,
        PrefKey::UseAccuracy,
        PrefKey::Accuracy,
        PrefKey::UseAltitude,
        PrefKey::Altitude,
        PrefKey::UseRandomize,
        PrefKey::RandomizeRadius,
        PrefKey::LastClickedLocation,
        PrefKey::Favorites,
        PrefKey::ActiveBase,
    ];

    pub fn name(self) -> &'static str {
        match self {
            PrefKey::IsPlaying => KEY_IS_PLAYING,
            PrefKey::UseAccuracy => KEY_USE_ACCURACY,
            PrefKey::Accuracy => KEY_ACCURACY,
            PrefKey::UseAltitude => KEY_USE_ALTITUDE,
            PrefKey::Altitude => KEY_ALTITUDE,
            PrefKey::UseRandomize => KEY_USE_RANDOMIZE,
            PrefKey::RandomizeRadius => KEY_RANDOMIZE_RADIUS,
            PrefKey::LastClickedLocation => KEY_LAST_CLICKED_LOCATION,
            PrefKey::Favorites => KEY_FAVORITES,
            PrefKey::ActiveBase => KEY_ACTIVE_BASE,
        }
    }

    pub fn kind(self) -> KeyKind {
        match self {
            PrefKey::IsPlaying
            | PrefKey::UseAccuracy
            | PrefKey::UseAltitude
            | PrefKey::UseRandomize => KeyKind::Boolean,
            PrefKey::Accuracy => KeyKind::Number {
                default: DEFAULT_ACCURACY,
            },
            PrefKey::Altitude => KeyKind::Number {
                default: DEFAULT_ALTITUDE,
            },
            PrefKey::RandomizeRadius => KeyKind::Number {
                default: DEFAULT_RANDOMIZE_RADIUS,
            },
            PrefKey::LastClickedLocation | PrefKey::Favorites | PrefKey::ActiveBase => {
                KeyKind::Structured
            }
        }
    }
}

/// A fully decoded value
#[derive(Debug, Clone, PartialEq)]
pub enum PrefValue {
    Bool(bool),
    Number(f64),
    Structured(Option<serde_json::Value>),
}

impl PrefValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PrefValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            PrefValue::Number(n) => Some(*n),
            _ => None,
        }
    }
}

/// Decode one key out of a snapshot according to its `KeyKind`
pub fn decode(prefs: &Preferences, key: PrefKey) -> PrefValue {
    let name = key.name();
    match key.kind() {
        KeyKind::Boolean => PrefValue::Bool(prefs.get_bool(name).unwrap_or(false)),
        KeyKind::Number { default } => PrefValue::Number(prefs.get_double(name).unwrap_or(default)),
        KeyKind::Structured => {
            let Some(text) = prefs.get_text(name) else {
                debug!("{} {} not found in preferences.", TAG, name);
                return PrefValue::Structured(None);
            };
            match serde_json::from_str(text) {
                Ok(value) => PrefValue::Structured(Some(value)),
                Err(e) => {
                    warn!("{} Error parsing {} JSON: {}", TAG, name, e);
                    PrefValue::Structured(None)
                }
            }
        }
    }
}

/// Always-fresh accessor for the shared preferences
#[derive(Clone)]
pub struct ConfigBridge {
    source: Arc<dyn ConfigSource>,
}

impl ConfigBridge {
    pub fn new(source: Arc<dyn ConfigSource>) -> Self {
        Self { source }
    }

    /// Bridge over the preferences file at the standard location
    pub fn from_default_location() -> Self {
        Self::new(Arc::new(PreferencesFile::at_default_location()))
    }

    /// Reload the store, falling back to an empty one if it cannot be read
    pub fn snapshot(&self) -> Preferences {
        match self.source.reload() {
            Ok(prefs) => prefs,
            Err(e) => {
                warn!("{} Preferences unavailable, using defaults: {:#}", TAG, e);
                Preferences::new()
            }
        }
    }

    /// Read one key after reloading the store
    pub fn read(&self, key: PrefKey) -> PrefValue {
        decode(&self.snapshot(), key)
    }

    pub fn is_playing(&self) -> bool {
        self.read_bool(PrefKey::IsPlaying)
    }

    pub fn use_accuracy(&self) -> bool {
        self.read_bool(PrefKey::UseAccuracy)
    }

    pub fn accuracy(&self) -> f64 {
        self.read_number(PrefKey::Accuracy)
    }

    pub fn use_altitude(&self) -> bool {
        self.read_bool(PrefKey::UseAltitude)
    }

    pub fn altitude(&self) -> f64 {
        self.read_number(PrefKey::Altitude)
    }

    pub fn use_randomize(&self) -> bool {
        self.read_bool(PrefKey::UseRandomize)
    }

    pub fn randomize_radius(&self) -> f64 {
        self.read_number(PrefKey::RandomizeRadius)
    }

    pub fn last_clicked_location(&self) -> Option<LocationRecord> {
        last_clicked_from(&self.snapshot())
    }

    /// Saved favorites in insertion order; empty if missing or malformed
    pub fn favorites(&self) -> Vec<FavoriteLocation> {
        favorites_from(&self.snapshot())
    }

    pub fn active_base(&self) -> ActiveBase {
        active_base_from(&self.snapshot())
    }

    /// The location synthesis should start from, if one is configured
    pub fn active_base_location(&self) -> Option<LocationRecord> {
        base_location_from(&self.snapshot())
    }

    /// All synthesis parameters from a single reload
    pub fn synthesis_params(&self) -> SynthesisParams {
        params_from(&self.snapshot())
    }

    fn read_bool(&self, key: PrefKey) -> bool {
        self.read(key).as_bool().unwrap_or(false)
    }

    fn read_number(&self, key: PrefKey) -> f64 {
        match (self.read(key), key.kind()) {
            (PrefValue::Number(n), _) => n,
            (_, KeyKind::Number { default }) => default,
            _ => 0.0,
        }
    }
}

fn structured<T: DeserializeOwned>(prefs: &Preferences, key: PrefKey) -> Option<T> {
    let PrefValue::Structured(Some(value)) = decode(prefs, key) else {
        return None;
    };
    match serde_json::from_value(value) {
        Ok(decoded) => Some(decoded),
        Err(e) => {
            warn!("{} {} does not match its schema: {}", TAG, key.name(), e);
            None
        }
    }
}

pub(crate) fn last_clicked_from(prefs: &Preferences) -> Option<LocationRecord> {
    let record: LocationRecord = structured(prefs, PrefKey::LastClickedLocation)?;
    match record.validate() {
        Ok(()) => {
            debug!("{} Retrieved {}: {:?}", TAG, KEY_LAST_CLICKED_LOCATION, record);
            Some(record)
        }
        Err(e) => {
            warn!("{} Rejecting {}: {}", TAG, KEY_LAST_CLICKED_LOCATION, e);
            None
        }
    }
}

/// Stored favorites with out-of-range entries dropped
///
/// Unlike `favorites_from`, a list that does not decode is an error, so a
/// writer never replaces it with an empty one.
pub(crate) fn stored_favorites(prefs: &Preferences) -> Result<Vec<FavoriteLocation>> {
    let favorites: Vec<FavoriteLocation> = match prefs.get_text(KEY_FAVORITES) {
        Some(json) => serde_json::from_str(json).context("Stored favorites are malformed")?,
        None => Vec::new(),
    };
    Ok(favorites
        .into_iter()
        .filter(|f| match f.location.validate() {
            Ok(()) => true,
            Err(e) => {
                warn!("{} Skipping favorite {}: {}", TAG, f.id, e);
                false
            }
        })
        .collect())
}

pub(crate) fn favorites_from(prefs: &Preferences) -> Vec<FavoriteLocation> {
    stored_favorites(prefs).unwrap_or_else(|e| {
        warn!("{} {:#}", TAG, e);
        Vec::new()
    })
}

pub(crate) fn active_base_from(prefs: &Preferences) -> ActiveBase {
    structured(prefs, PrefKey::ActiveBase).unwrap_or_default()
}

/// Resolve the base location out of one snapshot
///
/// A selected favorite wins when it still exists; otherwise the last clicked
/// location is used.
pub fn base_location_from(prefs: &Preferences) -> Option<LocationRecord> {
    match active_base_from(prefs) {
        ActiveBase::Favorite { id } => {
            let favorite = favorites_from(prefs).into_iter().find(|f| f.id == id);
            match favorite {
                Some(favorite) => Some(favorite.location),
                None => {
                    warn!(
                        "{} Selected favorite {} no longer exists, using last clicked location",
                        TAG, id
                    );
                    last_clicked_from(prefs)
                }
            }
        }
        ActiveBase::LastClicked => last_clicked_from(prefs),
    }
}

/// Synthesis parameters out of one snapshot
///
/// Values whose flag is off are carried through unvalidated.
pub fn params_from(prefs: &Preferences) -> SynthesisParams {
    let flag = |key| decode(prefs, key).as_bool().unwrap_or(false);
    let number = |key: PrefKey| {
        let default = match key.kind() {
            KeyKind::Number { default } => default,
            _ => 0.0,
        };
        decode(prefs, key).as_number().unwrap_or(default)
    };

    SynthesisParams {
        use_accuracy: flag(PrefKey::UseAccuracy),
        accuracy: number(PrefKey::Accuracy),
        use_altitude: flag(PrefKey::UseAltitude),
        altitude: number(PrefKey::Altitude),
        use_randomize: flag(PrefKey::UseRandomize),
        randomize_radius: number(PrefKey::RandomizeRadius),
    }
}
