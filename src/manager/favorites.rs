use super::PreferencesWriter;
use crate::bridge::{active_base_from, stored_favorites};
use crate::constants::{KEY_ACTIVE_BASE, KEY_FAVORITES};
use crate::location::{ActiveBase, FavoriteLocation};
use anyhow::{bail, Context, Result};
use log::{info, warn};
use parking_lot::Mutex;
use std::sync::Arc;

type Listener = Box<dyn Fn(&[FavoriteLocation]) + Send + Sync>;

/// Ordered, observable list of saved locations
///
/// Listeners receive the full list right after they subscribe and again
/// after every successful change.
pub struct FavoritesRepository {
    writer: Arc<PreferencesWriter>,
    listeners: Mutex<Vec<Listener>>,
}

impl FavoritesRepository {
    pub fn new(writer: Arc<PreferencesWriter>) -> Self {
        Self {
            writer,
            listeners: Mutex::new(Vec::new()),
        }
    }

    /// Favorites in insertion order
    pub fn list(&self) -> Result<Vec<FavoriteLocation>> {
        let prefs = self.writer.load().context("Failed to load favorites")?;
        stored_favorites(&prefs)
    }

    pub fn subscribe(&self, listener: impl Fn(&[FavoriteLocation]) + Send + Sync + 'static) -> Result<()> {
        let current = self.list()?;
        listener(&current);
        self.listeners.lock().push(Box::new(listener));
        Ok(())
    }

    /// Append a favorite
    ///
    /// Returns false, and changes nothing, if one with the same id exists.
    pub fn add(&self, favorite: FavoriteLocation) -> Result<bool> {
        favorite
            .location
            .validate()
            .with_context(|| format!("Invalid favorite '{}'", favorite.label))?;

        let label = favorite.label.clone();
        let updated = self.writer.edit(|prefs| {
            let mut favorites = stored_favorites(prefs)?;
            if favorites.iter().any(|f| f.id == favorite.id) {
                return Ok(None);
            }
            favorites.push(favorite);
            prefs.put_json(KEY_FAVORITES, &favorites)?;
            Ok(Some(favorites))
        })?;

        match updated {
            Some(favorites) => {
                info!("Added favorite '{}'", label);
                self.notify(&favorites);
                Ok(true)
            }
            None => {
                warn!("Favorite '{}' already saved", label);
                Ok(false)
            }
        }
    }

    /// Remove the favorite with `id`
    ///
    /// If it was the active base, the base falls back to the last clicked
    /// location. Returns false if no favorite had that id.
    pub fn remove(&self, id: &str) -> Result<bool> {
        let updated = self.writer.edit(|prefs| {
            let mut favorites = stored_favorites(prefs)?;
            let before = favorites.len();
            favorites.retain(|f| f.id != id);
            if favorites.len() == before {
                return Ok(None);
            }
            prefs.put_json(KEY_FAVORITES, &favorites)?;

            if active_base_from(prefs) == (ActiveBase::Favorite { id: id.to_string() }) {
                prefs.put_json(KEY_ACTIVE_BASE, &ActiveBase::LastClicked)?;
            }
            Ok(Some(favorites))
        })?;

        match updated {
            Some(favorites) => {
                info!("Removed favorite {}", id);
                self.notify(&favorites);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Make the favorite with `id` the base location for synthesis
    pub fn select(&self, id: &str) -> Result<()> {
        self.writer.edit(|prefs| {
            let favorites = stored_favorites(prefs)?;
            if !favorites.iter().any(|f| f.id == id) {
                bail!("No favorite with id {}", id);
            }
            prefs.put_json(KEY_ACTIVE_BASE, &ActiveBase::Favorite { id: id.to_string() })
        })?;
        info!("Favorite {} selected as base location", id);
        Ok(())
    }

    pub fn active_base(&self) -> Result<ActiveBase> {
        let prefs = self.writer.load().context("Failed to load active base")?;
        Ok(active_base_from(&prefs))
    }

    fn notify(&self, favorites: &[FavoriteLocation]) {
        for listener in self.listeners.lock().iter() {
            listener(favorites);
        }
    }
}
