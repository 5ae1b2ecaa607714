//! Preferences file shared between the manager and hooked processes
//!
//! The file is a flat TOML table. Every value is one of three variants:
//! booleans, 64-bit integers (doubles are stored as their raw IEEE-754 bit
//! pattern so the reader gets back exactly what was written), and text
//! (JSON-serialized structured records).
//!
//! Only the manager writes. Writes go to a temporary file that is renamed
//! over the original, so a reader in another process either sees the old
//! contents or the new ones, never a torn file.

use crate::config;
use crate::constants::MAX_PREFS_FILE_BYTES;
use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

/// A single stored value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PreferenceValue {
    Bool(bool),
    Long(i64),
    Text(String),
}

impl PreferenceValue {
    /// Convert one parsed TOML value, or None if its type is not storable
    fn from_toml(value: toml::Value) -> Option<Self> {
        match value {
            toml::Value::Boolean(b) => Some(PreferenceValue::Bool(b)),
            toml::Value::Integer(v) => Some(PreferenceValue::Long(v)),
            toml::Value::String(s) => Some(PreferenceValue::Text(s)),
            _ => None,
        }
    }
}

/// In-memory view of the preferences file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Preferences {
    values: BTreeMap<String, PreferenceValue>,
}

impl Preferences {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the TOML contents of a preferences file
    ///
    /// Entries of a type the store never writes (floats, arrays, tables,
    /// datetimes) are skipped one by one; the rest of the file still loads.
    pub fn parse(contents: &str) -> Result<Self> {
        let table: toml::Table = toml::from_str(contents).context("Failed to parse preferences")?;
        let mut values = BTreeMap::new();
        for (key, value) in table {
            let type_str = value.type_str();
            match PreferenceValue::from_toml(value) {
                Some(value) => {
                    values.insert(key, value);
                }
                None => warn!("Ignoring preference {}: unsupported type {}", key, type_str),
            }
        }
        Ok(Self { values })
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(&self.values).context("Failed to serialize preferences")
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&PreferenceValue> {
        self.values.get(key)
    }

    /// Returns None when the key is missing or holds another variant
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.values.get(key) {
            Some(PreferenceValue::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    pub fn get_long(&self, key: &str) -> Option<i64> {
        match self.values.get(key) {
            Some(PreferenceValue::Long(v)) => Some(*v),
            _ => None,
        }
    }

    /// Decode a double stored as its raw bit pattern
    pub fn get_double(&self, key: &str) -> Option<f64> {
        self.get_long(key).map(|bits| f64::from_bits(bits as u64))
    }

    pub fn get_text(&self, key: &str) -> Option<&str> {
        match self.values.get(key) {
            Some(PreferenceValue::Text(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn put_bool(&mut self, key: &str, value: bool) {
        self.values
            .insert(key.to_string(), PreferenceValue::Bool(value));
    }

    /// Store a double as its raw bit pattern
    pub fn put_double(&mut self, key: &str, value: f64) {
        self.values.insert(
            key.to_string(),
            PreferenceValue::Long(value.to_bits() as i64),
        );
    }

    pub fn put_text(&mut self, key: &str, value: impl Into<String>) {
        self.values
            .insert(key.to_string(), PreferenceValue::Text(value.into()));
    }

    /// Serialize a structured value to JSON text and store it
    pub fn put_json<T: Serialize>(&mut self, key: &str, value: &T) -> Result<()> {
        let json = serde_json::to_string(value)
            .with_context(|| format!("Failed to serialize {}", key))?;
        self.put_text(key, json);
        Ok(())
    }

    pub fn remove(&mut self, key: &str) -> Option<PreferenceValue> {
        self.values.remove(key)
    }
}

/// Handle to the preferences file on disk
///
/// Holds only the path. Every `load` opens and reads the file again.
#[derive(Debug, Clone)]
pub struct PreferencesFile {
    path: PathBuf,
}

impl PreferencesFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Preferences file at the standard location (see `config::resolve_prefs_path`)
    pub fn at_default_location() -> Self {
        Self::new(config::resolve_prefs_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the file from disk
    ///
    /// A missing file is an empty store, not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file exists but cannot be read
    /// - The file is larger than `MAX_PREFS_FILE_BYTES`
    /// - TOML parsing fails
    pub fn load(&self) -> Result<Preferences> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("Preferences file not found at {}", self.path.display());
                return Ok(Preferences::new());
            }
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Failed to open preferences file: {}", self.path.display())
                })
            }
        };

        // One byte past the limit is enough to tell an oversized file apart
        let mut contents = String::new();
        file.take(MAX_PREFS_FILE_BYTES + 1)
            .read_to_string(&mut contents)
            .with_context(|| {
                format!("Failed to read preferences file: {}", self.path.display())
            })?;

        if contents.len() as u64 > MAX_PREFS_FILE_BYTES {
            anyhow::bail!(
                "Preferences file is larger than {} bytes",
                MAX_PREFS_FILE_BYTES
            );
        }

        Preferences::parse(&contents)
    }

    /// Write the preferences atomically and make the file world-readable
    pub fn save(&self, prefs: &Preferences) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).context("Failed to create preferences directory")?;
            }
        }

        let contents = prefs.to_toml_string()?;
        let tmp_path = self.temp_path();

        fs::write(&tmp_path, contents)
            .with_context(|| format!("Failed to write {}", tmp_path.display()))?;

        // Hooked processes run as other users and must be able to read the file
        #[cfg(unix)]
        {
            let mut permissions = fs::metadata(&tmp_path)?.permissions();
            permissions.set_mode(0o644);
            fs::set_permissions(&tmp_path, permissions)
                .context("Failed to make preferences file world-readable")?;
        }

        fs::rename(&tmp_path, &self.path).with_context(|| {
            format!("Failed to replace preferences file: {}", self.path.display())
        })?;

        log::debug!("Preferences saved to {}", self.path.display());
        Ok(())
    }

    /// Load, apply `f`, save
    ///
    /// Callers that may edit concurrently must serialize around this call.
    pub fn edit<R>(&self, f: impl FnOnce(&mut Preferences) -> Result<R>) -> Result<R> {
        let mut prefs = self.load()?;
        let result = f(&mut prefs)?;
        self.save(&prefs)?;
        Ok(result)
    }

    fn temp_path(&self) -> PathBuf {
        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "prefs".to_string());
        self.path
            .with_file_name(format!(".{}.{}.tmp", file_name, std::process::id()))
    }
}
