use std::{
    collections::HashMap,
    fmt,
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, PoisonError, RwLock},
};

use super::error::ClientError;
use crate::account::AccountView;

type Result<T> = std::result::Result<T, ClientError>;

pub const TOKEN_KEY: &str = "@auth_token";
pub const USER_KEY: &str = "@user_data";

/// String key-value storage for the client session.
pub trait SessionCache: Send + Sync {
    /// # Errors
    /// Returns an error if the backing storage cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>>;
    /// # Errors
    /// Returns an error if the backing storage cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<()>;
    /// # Errors
    /// Returns an error if the backing storage cannot be written.
    fn remove(&self, key: &str) -> Result<()>;
}

#[derive(Debug, Default)]
pub struct MemorySessionCache {
    entries: RwLock<HashMap<String, String>>,
}

impl MemorySessionCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionCache for MemorySessionCache {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.remove(key);
        Ok(())
    }
}

/// Whole-file JSON object; a missing file reads as empty.
#[derive(Debug)]
pub struct FileSessionCache {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileSessionCache {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<HashMap<String, String>> {
        match fs::read(&self.path) {
            Ok(bytes) if bytes.is_empty() => Ok(HashMap::new()),
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|err| {
                ClientError::Storage(format!("{}: {err}", self.path.display()))
            }),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(HashMap::new()),
            Err(err) => Err(ClientError::Storage(format!(
                "{}: {err}",
                self.path.display()
            ))),
        }
    }

    fn store(&self, entries: &HashMap<String, String>) -> Result<()> {
        let json = serde_json::to_vec_pretty(entries)
            .map_err(|err| ClientError::Storage(err.to_string()))?;
        fs::write(&self.path, json)
            .map_err(|err| ClientError::Storage(format!("{}: {err}", self.path.display())))
    }

    fn update(&self, apply: impl FnOnce(&mut HashMap<String, String>)) -> Result<()> {
        let _lock = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut entries = self.load()?;
        apply(&mut entries);
        self.store(&entries)
    }
}

impl SessionCache for FileSessionCache {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let _lock = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(self.load()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.update(|entries| {
            entries.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.update(|entries| {
            entries.remove(key);
        })
    }
}

/// Typed view over a [`SessionCache`]: the bearer token and the account it
/// belongs to.
#[derive(Clone)]
pub struct SessionStorage {
    cache: Arc<dyn SessionCache>,
}

impl fmt::Debug for SessionStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionStorage").finish_non_exhaustive()
    }
}

impl SessionStorage {
    #[must_use]
    pub fn new(cache: Arc<dyn SessionCache>) -> Self {
        Self { cache }
    }

    /// # Errors
    /// Returns an error if the cache cannot be written.
    pub fn save_auth(&self, token: &str, user: &AccountView) -> Result<()> {
        let user = serde_json::to_string(user).map_err(|err| ClientError::Storage(err.to_string()))?;
        self.cache.set(USER_KEY, &user)?;
        self.cache.set(TOKEN_KEY, token)
    }

    /// # Errors
    /// Returns an error if the cache cannot be read.
    pub fn token(&self) -> Result<Option<String>> {
        self.cache.get(TOKEN_KEY)
    }

    /// # Errors
    /// Returns an error if the cache cannot be read or holds a malformed user.
    pub fn user(&self) -> Result<Option<AccountView>> {
        self.cache
            .get(USER_KEY)?
            .map(|raw| {
                serde_json::from_str(&raw).map_err(|err| ClientError::Storage(err.to_string()))
            })
            .transpose()
    }

    /// # Errors
    /// Returns an error if the cache cannot be written.
    pub fn clear(&self) -> Result<()> {
        self.cache.remove(USER_KEY)?;
        self.cache.remove(TOKEN_KEY)
    }

    /// Both the token and the user must be present.
    ///
    /// # Errors
    /// Returns an error if the cache cannot be read.
    pub fn is_logged_in(&self) -> Result<bool> {
        Ok(self.token()?.is_some() && self.cache.get(USER_KEY)?.is_some())
    }
}
