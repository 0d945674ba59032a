//! In-memory session store with sliding expiry, CSRF tokens and flash messages.
//!
//! Sessions are keyed by an opaque random identifier carried in a cookie.
//! Every read checks expiry on its own; the periodic sweep only reclaims
//! memory.

use std::{collections::HashMap, sync::Arc, time::Duration as StdDuration};

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Duration, Utc};
use rand::{rngs::OsRng, RngCore};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tokio::{sync::RwLock, task::JoinHandle};

use crate::{
    clock::Clock,
    error::{AppError, AppResult},
    models::{
        session::{
            flash_key, Identity, KEY_CSRF_TOKEN, KEY_LOGGED_IN, KEY_USERNAME, KEY_USER_ID,
            KEY_USER_ROLE,
        },
        user::{Role, User},
    },
};

const TOKEN_BYTES: usize = 32;

#[derive(Debug)]
struct SessionEntry {
    data: HashMap<String, Value>,
    expires_at: DateTime<Utc>,
}

/// Process-wide session table
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, SessionEntry>>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl SessionStore {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            ttl,
            clock,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Resume the presented session, extending its expiry, or mint a new one
    /// when the id is absent, unknown or expired.
    pub async fn create_or_resume(&self, presented: Option<&str>) -> Session {
        let now = self.clock.now();
        let mut sessions = self.sessions.write().await;

        if let Some(id) = presented {
            match sessions.get_mut(id) {
                Some(entry) if entry.expires_at > now => {
                    entry.expires_at = now + self.ttl;
                    return Session::new(id.to_string(), self.clone());
                }
                Some(_) => {
                    sessions.remove(id);
                }
                None => {}
            }
        }

        let id = Self::insert_fresh(&mut sessions, now + self.ttl);
        tracing::debug!("Created new session");
        Session::new(id, self.clone())
    }

    fn insert_fresh(sessions: &mut HashMap<String, SessionEntry>, expires_at: DateTime<Utc>) -> String {
        loop {
            let id = random_token();
            if !sessions.contains_key(&id) {
                sessions.insert(
                    id.clone(),
                    SessionEntry {
                        data: HashMap::new(),
                        expires_at,
                    },
                );
                return id;
            }
        }
    }

    /// Read an attribute. A missing or expired session reads as empty.
    pub async fn get<T: DeserializeOwned>(&self, id: &str, key: &str) -> Option<T> {
        let now = self.clock.now();
        let sessions = self.sessions.read().await;
        sessions
            .get(id)
            .filter(|entry| entry.expires_at > now)
            .and_then(|entry| entry.data.get(key))
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }

    pub async fn insert<T: Serialize>(&self, id: &str, key: &str, value: T) -> AppResult<()> {
        let value = serde_json::to_value(value)
            .map_err(|e| AppError::Internal(format!("Failed to serialize session value: {}", e)))?;
        self.with_live_entry(id, |entry| {
            entry.data.insert(key.to_string(), value);
        })
        .await
    }

    /// Remove an attribute and return its previous value
    pub async fn remove<T: DeserializeOwned>(&self, id: &str, key: &str) -> AppResult<Option<T>> {
        let removed = self
            .with_live_entry(id, |entry| entry.data.remove(key))
            .await?;
        Ok(removed.and_then(|value| serde_json::from_value(value).ok()))
    }

    /// Drop every attribute but keep the session alive
    pub async fn clear(&self, id: &str) -> AppResult<()> {
        self.with_live_entry(id, |entry| entry.data.clear()).await
    }

    /// Replace `id` with a brand-new empty session and return the new id
    pub async fn regenerate(&self, id: &str) -> String {
        let now = self.clock.now();
        let mut sessions = self.sessions.write().await;
        sessions.remove(id);
        Self::insert_fresh(&mut sessions, now + self.ttl)
    }

    /// Store a fresh CSRF token in the session and return it
    pub async fn issue_csrf_token(&self, id: &str) -> AppResult<String> {
        let token = random_token();
        self.insert(id, KEY_CSRF_TOKEN, &token).await?;
        Ok(token)
    }

    /// Compare `supplied` with the stored token and consume it on success.
    /// Missing session, missing token and mismatch all fail.
    pub async fn verify_csrf_token(&self, id: &str, supplied: &str) -> AppResult<()> {
        let rejected = || AppError::Csrf("Security verification failed, please try again".to_string());

        let consumed = self
            .with_live_entry(id, |entry| match entry.data.get(KEY_CSRF_TOKEN) {
                Some(Value::String(stored)) if !supplied.is_empty() && stored == supplied => {
                    entry.data.remove(KEY_CSRF_TOKEN);
                    true
                }
                _ => false,
            })
            .await
            .map_err(|_| rejected())?;

        if consumed {
            Ok(())
        } else {
            tracing::warn!("CSRF token verification failed");
            Err(rejected())
        }
    }

    pub async fn set_flash(&self, id: &str, key: &str, message: impl Into<String>) -> AppResult<()> {
        self.insert(id, &flash_key(key), message.into()).await
    }

    /// Single read: the message is removed by the same call that returns it
    pub async fn take_flash(&self, id: &str, key: &str) -> Option<String> {
        self.remove(id, &flash_key(key)).await.ok().flatten()
    }

    /// Remove every expired session, returning how many were dropped
    pub async fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, entry| entry.expires_at > now);
        before - sessions.len()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Periodic housekeeping task; abort the handle to stop it
    pub fn spawn_sweeper(&self, every: StdDuration) -> JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            // the first tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                store.sweep().await;
            }
        })
    }

    /// One sweeper pass. Empty passes log at debug only.
    pub async fn sweep(&self) -> usize {
        let removed = self.purge_expired().await;
        if removed == 0 {
            tracing::debug!("Session sweep found no expired sessions");
        } else {
            tracing::info!("Session sweep removed {} expired session(s)", removed);
        }
        removed
    }

    async fn with_live_entry<R>(&self, id: &str, f: impl FnOnce(&mut SessionEntry) -> R) -> AppResult<R> {
        let now = self.clock.now();
        let mut sessions = self.sessions.write().await;
        match sessions.get_mut(id) {
            Some(entry) if entry.expires_at > now => Ok(f(entry)),
            _ => Err(AppError::Authentication("Session has expired".to_string())),
        }
    }
}

fn random_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Handle on the current visitor's session.
///
/// The id can change during a request (logout rotates it); the session
/// middleware reads the final id back when it writes the cookie.
#[derive(Clone)]
pub struct Session {
    id: Arc<RwLock<String>>,
    store: SessionStore,
}

impl Session {
    fn new(id: String, store: SessionStore) -> Self {
        Self {
            id: Arc::new(RwLock::new(id)),
            store,
        }
    }

    pub async fn id(&self) -> String {
        self.id.read().await.clone()
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let id = self.id().await;
        self.store.get(&id, key).await
    }

    pub async fn insert<T: Serialize>(&self, key: &str, value: T) -> AppResult<()> {
        let id = self.id().await;
        self.store.insert(&id, key, value).await
    }

    pub async fn remove<T: DeserializeOwned>(&self, key: &str) -> AppResult<Option<T>> {
        let id = self.id().await;
        self.store.remove(&id, key).await
    }

    pub async fn clear(&self) -> AppResult<()> {
        let id = self.id().await;
        self.store.clear(&id).await
    }

    /// Clear then recreate: the old id stops working
    pub async fn cycle(&self) {
        let mut id = self.id.write().await;
        let fresh = self.store.regenerate(&id).await;
        *id = fresh;
    }

    pub async fn issue_csrf_token(&self) -> AppResult<String> {
        let id = self.id().await;
        self.store.issue_csrf_token(&id).await
    }

    pub async fn verify_csrf_token(&self, supplied: &str) -> AppResult<()> {
        let id = self.id().await;
        self.store.verify_csrf_token(&id, supplied).await
    }

    pub async fn set_flash(&self, key: &str, message: impl Into<String>) -> AppResult<()> {
        let id = self.id().await;
        self.store.set_flash(&id, key, message).await
    }

    pub async fn take_flash(&self, key: &str) -> Option<String> {
        let id = self.id().await;
        self.store.take_flash(&id, key).await
    }

    /// Record a successful login
    pub async fn log_in(&self, user: &User) -> AppResult<()> {
        self.insert(KEY_USER_ID, user.id).await?;
        self.insert(KEY_USERNAME, &user.username).await?;
        self.insert(KEY_USER_ROLE, user.role).await?;
        self.insert(KEY_LOGGED_IN, true).await
    }

    pub async fn is_logged_in(&self) -> bool {
        self.get::<bool>(KEY_LOGGED_IN).await.unwrap_or(false)
    }

    /// The logged-in user, if every identity attribute is present
    pub async fn identity(&self) -> Option<Identity> {
        if !self.is_logged_in().await {
            return None;
        }
        let user_id = self.get::<i32>(KEY_USER_ID).await?;
        let username = self.get::<String>(KEY_USERNAME).await?;
        let role = self.get::<Role>(KEY_USER_ROLE).await?;
        Some(Identity {
            user_id,
            username,
            role,
        })
    }
}
