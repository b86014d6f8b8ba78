use crate::error::StorageError;
use crate::model::Recipe;
use async_trait::async_trait;
use log::{debug, error, info, warn};
use std::collections::{HashMap, HashSet};
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::fs;

/// String-keyed blob storage the favorites set is persisted to
#[async_trait]
pub trait Storage: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    async fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// In-process storage. Clones share the same entries, which lets a second
/// store instance read what the first one wrote.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.remove(key);
        Ok(())
    }
}

/// One `<key>.json` file per key under a directory
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

#[async_trait]
impl Storage for FileStorage {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.path(key)).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        fs::create_dir_all(&self.dir).await?;
        fs::write(self.path(key), value).await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.path(key)).await {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

/// Saved recipes, unique by id, in the order they were added.
///
/// Nothing is written to storage until [`FavoritesStore::load`] has run, so
/// a store that has not read the persisted set yet can never overwrite it.
/// After that every mutation writes the whole set back before returning, so
/// writes land in the order the mutations were made.
pub struct FavoritesStore {
    storage: Box<dyn Storage>,
    key: String,
    favorites: Vec<Recipe>,
    loaded: bool,
}

impl FavoritesStore {
    pub fn new(storage: impl Storage + 'static, key: impl Into<String>) -> Self {
        Self {
            storage: Box::new(storage),
            key: key.into(),
            favorites: Vec::new(),
            loaded: false,
        }
    }

    /// Construct and load in one step
    pub async fn open(storage: impl Storage + 'static, key: impl Into<String>) -> Self {
        let mut store = Self::new(storage, key);
        store.load().await;
        store
    }

    /// Read the persisted set, replacing the in-memory one. A missing or
    /// unreadable blob yields an empty set.
    pub async fn load(&mut self) {
        self.favorites = match self.storage.get(&self.key).await {
            Ok(Some(blob)) => match serde_json::from_str::<Vec<Recipe>>(&blob) {
                Ok(recipes) => dedup_by_id(recipes),
                Err(e) => {
                    warn!("Ignoring corrupt favorites under '{}': {}", self.key, e);
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!("Failed to read favorites under '{}': {}", self.key, e);
                Vec::new()
            }
        };
        self.loaded = true;
        info!("Loaded {} favorites", self.favorites.len());
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Write the whole set to storage. Skipped until the set has been loaded.
    pub async fn flush(&self) -> Result<(), StorageError> {
        if !self.loaded {
            debug!("Favorites not loaded yet, skipping flush");
            return Ok(());
        }
        let blob = serde_json::to_string(&self.favorites)?;
        self.storage.set(&self.key, &blob).await
    }

    /// Returns true if the recipe was added
    pub async fn add(&mut self, recipe: Recipe) -> bool {
        if self.contains(&recipe.id) {
            return false;
        }
        self.favorites.push(recipe);
        self.persist().await;
        true
    }

    /// Returns true if a recipe was removed
    pub async fn remove(&mut self, id: &str) -> bool {
        let before = self.favorites.len();
        self.favorites.retain(|r| r.id != id);
        if self.favorites.len() == before {
            return false;
        }
        self.persist().await;
        true
    }

    /// Flip membership; returns whether the recipe is now a favorite
    pub async fn toggle(&mut self, recipe: Recipe) -> bool {
        if self.remove(&recipe.id).await {
            false
        } else {
            self.add(recipe).await
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.favorites.iter().any(|r| r.id == id)
    }

    pub fn get(&self, id: &str) -> Option<&Recipe> {
        self.favorites.iter().find(|r| r.id == id)
    }

    pub fn list(&self) -> &[Recipe] {
        &self.favorites
    }

    pub fn len(&self) -> usize {
        self.favorites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.favorites.is_empty()
    }

    async fn persist(&self) {
        if let Err(e) = self.flush().await {
            error!("Failed to save favorites: {}", e);
        }
    }
}

fn dedup_by_id(recipes: Vec<Recipe>) -> Vec<Recipe> {
    let mut seen = HashSet::new();
    recipes
        .into_iter()
        .filter(|r| seen.insert(r.id.clone()))
        .collect()
}
