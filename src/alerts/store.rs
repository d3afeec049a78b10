//! Storage layer for users and alerts
//!
//! A single JSON document (`users` + `alerts`) held in memory behind a mutex.
//! Mutations only mark the store dirty; the file is rewritten by explicit,
//! rate-limited flushes (see [`AlertStore::spawn_flusher`]).

use super::i18n::Lang;
use super::model::{Alert, User};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Reading or writing the data file failed
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The data file is not a valid store document
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// The persisted document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreData {
    #[serde(default)]
    pub users: BTreeMap<String, User>,
    #[serde(default)]
    pub alerts: BTreeMap<String, Vec<Alert>>,
}

impl StoreData {
    /// Language of a user, `en` when the user is unknown
    #[must_use]
    pub fn lang_of(&self, user_id: &str) -> Lang {
        self.users.get(user_id).map(|u| u.lang).unwrap_or_default()
    }

    #[must_use]
    pub fn alert_count(&self) -> usize {
        self.alerts.values().map(Vec::len).sum()
    }
}

/// Shared, mutex-guarded store with deferred persistence
pub struct AlertStore {
    path: PathBuf,
    data: Mutex<StoreData>,
    dirty: AtomicBool,
    // Serializes file writes so two flushes never share the temp file
    write_lock: Mutex<()>,
}

impl AlertStore {
    /// Create a store backed by `path` holding `data`
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, data: StoreData) -> Self {
        Self {
            path: path.into(),
            data: Mutex::new(data),
            dirty: AtomicBool::new(false),
            write_lock: Mutex::new(()),
        }
    }

    /// Load the store from `path`. A missing file yields an empty store.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub async fn load(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let data = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No data file at {}, starting empty.", path.display());
                StoreData::default()
            }
            Err(source) => return Err(StoreError::Io { path, source }),
        };
        Ok(Self::new(path, data))
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    /// Mutate the document under the lock and mark it dirty.
    pub async fn modify<F, R>(&self, modifier: F) -> R
    where
        F: FnOnce(&mut StoreData) -> R,
    {
        let mut data = self.data.lock().await;
        let result = modifier(&mut data);
        self.dirty.store(true, Ordering::Release);
        result
    }

    /// Read the document under the lock.
    pub async fn read<F, R>(&self, reader: F) -> R
    where
        F: FnOnce(&StoreData) -> R,
    {
        let data = self.data.lock().await;
        reader(&data)
    }

    /// Copy of the whole document
    pub async fn snapshot(&self) -> StoreData {
        self.read(StoreData::clone).await
    }

    /// Register the user with the default language if unknown.
    ///
    /// Returns the user's record.
    pub async fn ensure_user(&self, user_id: &str) -> User {
        let mut data = self.data.lock().await;
        if let Some(user) = data.users.get(user_id) {
            return *user;
        }
        let user = User::default();
        data.users.insert(user_id.to_string(), user);
        self.dirty.store(true, Ordering::Release);
        debug!(user_id, "Registered new user");
        user
    }

    pub async fn lang_of(&self, user_id: &str) -> Lang {
        self.read(|data| data.lang_of(user_id)).await
    }

    /// Change the language of one user, creating the record if needed
    pub async fn set_lang(&self, user_id: &str, lang: Lang) {
        self.modify(|data| {
            data.users.entry(user_id.to_string()).or_default().lang = lang;
        })
        .await;
    }

    /// Append an alert to the user's list
    pub async fn add_alert(&self, user_id: &str, alert: Alert) {
        self.modify(|data| {
            data.alerts
                .entry(user_id.to_string())
                .or_default()
                .push(alert);
        })
        .await;
    }

    /// Active alerts of one user, in creation order
    pub async fn alerts_of(&self, user_id: &str) -> Vec<Alert> {
        self.read(|data| data.alerts.get(user_id).cloned().unwrap_or_default())
            .await
    }

    pub async fn has_alerts(&self) -> bool {
        self.read(|data| data.alerts.values().any(|list| !list.is_empty()))
            .await
    }

    /// Write the document if it changed since the last flush.
    ///
    /// Returns `true` when the file was written.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the file write fails. The store
    /// stays dirty in that case.
    pub async fn flush(&self) -> Result<bool, StoreError> {
        let _guard = self.write_lock.lock().await;
        if !self.dirty.swap(false, Ordering::AcqRel) {
            return Ok(false);
        }

        let body = match self.read(|data| serde_json::to_vec(data)).await {
            Ok(body) => body,
            Err(e) => {
                self.dirty.store(true, Ordering::Release);
                return Err(e.into());
            }
        };

        if let Err(e) = self.write_file(&body).await {
            self.dirty.store(true, Ordering::Release);
            return Err(e);
        }
        debug!(path = %self.path.display(), bytes = body.len(), "Store flushed");
        Ok(true)
    }

    async fn write_file(&self, body: &[u8]) -> Result<(), StoreError> {
        let io_err = |source: std::io::Error| StoreError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
        }
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        tokio::fs::write(&tmp, body).await.map_err(io_err)?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(io_err)
    }

    /// Flush at most once per `interval` until `shutdown` fires, then flush
    /// one last time.
    pub fn spawn_flusher(
        store: Arc<Self>,
        interval: Duration,
        shutdown: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    () = shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        if let Err(e) = store.flush().await {
                            error!("Failed to flush store: {e}");
                        }
                    }
                }
            }
            match store.flush().await {
                Ok(_) => info!("Store flushed on shutdown."),
                Err(e) => error!("Final store flush failed: {e}"),
            }
        })
    }
}
