//! Manager-side state holders
//!
//! The manager is the only writer of the preferences file. Both repositories
//! share one `PreferencesWriter` so their read-modify-write cycles never
//! interleave.

pub mod favorites;
pub mod settings;

use crate::store::{Preferences, PreferencesFile};
use anyhow::Result;
use parking_lot::Mutex;

pub use favorites::FavoritesRepository;
pub use settings::{parse_setting_input, Settings, SettingsRepository, SettingsUpdate};

/// Serialized access to the preferences file
pub struct PreferencesWriter {
    file: PreferencesFile,
    lock: Mutex<()>,
}

impl PreferencesWriter {
    pub fn new(file: PreferencesFile) -> Self {
        Self {
            file,
            lock: Mutex::new(()),
        }
    }

    pub fn file(&self) -> &PreferencesFile {
        &self.file
    }

    pub fn load(&self) -> Result<Preferences> {
        let _guard = self.lock.lock();
        self.file.load()
    }

    pub fn edit<R>(&self, f: impl FnOnce(&mut Preferences) -> Result<R>) -> Result<R> {
        let _guard = self.lock.lock();
        self.file.edit(f)
    }
}
