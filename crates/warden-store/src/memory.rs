//! In-process [`SessionStore`] implementation.
//!
//! Mirrors the Redis semantics the session layer depends on (TTLs,
//! conditional overwrite, sets that disappear when emptied) on top of a
//! `HashMap` behind a Tokio mutex. Deadlines use the Tokio clock, so tests
//! can `tokio::time::pause()` and `advance()` through days of session
//! lifetime instantly.
//!
//! Expired keys are purged lazily, the first time anything touches them.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::{SessionStore, StoreError, StoredValue};

enum Value {
    Text(String),
    Set(HashSet<String>),
}

struct Entry {
    value: Value,
    /// `None` → the key never expires.
    deadline: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.deadline.is_some_and(|deadline| deadline <= now)
    }
}

/// A single-process session store, used for tests and local development.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of live keys (any type).
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        entries.retain(|_, entry| !entry.is_expired(now));
        entries.len()
    }

    /// Returns `true` if the store holds no live keys.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// Returns the entry for `key` if it exists and hasn't expired, purging
/// it first if it has.
fn live<'a>(
    entries: &'a mut HashMap<String, Entry>,
    key: &str,
) -> Option<&'a mut Entry> {
    let now = Instant::now();
    if entries.get(key).is_some_and(|entry| entry.is_expired(now)) {
        entries.remove(key);
        return None;
    }
    entries.get_mut(key)
}

fn wrong_type(key: &str) -> StoreError {
    StoreError::Command(format!(
        "WRONGTYPE operation against key {key} holding the wrong kind of value"
    ))
}

fn deadline_after(key: &str, ttl: Duration) -> Result<Instant, StoreError> {
    if ttl.is_zero() {
        return Err(StoreError::Command(format!(
            "invalid expire time for key {key}"
        )));
    }
    Ok(Instant::now() + ttl)
}

impl SessionStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut entries = self.entries.lock().await;
        match live(&mut entries, key) {
            None => Ok(None),
            Some(Entry {
                value: Value::Text(text),
                ..
            }) => Ok(Some(text.clone())),
            Some(_) => Err(wrong_type(key)),
        }
    }

    async fn get_with_ttl(
        &self,
        key: &str,
    ) -> Result<Option<StoredValue>, StoreError> {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        match live(&mut entries, key) {
            None => Ok(None),
            Some(Entry {
                value: Value::Text(text),
                deadline,
            }) => Ok(Some(StoredValue {
                value: text.clone(),
                ttl: deadline.map(|d| d.saturating_duration_since(now)),
            })),
            Some(_) => Err(wrong_type(key)),
        }
    }

    async fn set_ex(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        let deadline = deadline_after(key, ttl)?;
        let mut entries = self.entries.lock().await;
        entries.insert(
            key.to_string(),
            Entry {
                value: Value::Text(value.to_string()),
                deadline: Some(deadline),
            },
        );
        Ok(())
    }

    async fn replace_ex(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, StoreError> {
        let deadline = deadline_after(key, ttl)?;
        let mut entries = self.entries.lock().await;
        match live(&mut entries, key) {
            Some(entry) => {
                entry.value = Value::Text(value.to_string());
                entry.deadline = Some(deadline);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let mut entries = self.entries.lock().await;
        if live(&mut entries, key).is_none() {
            return Ok(false);
        }
        entries.remove(key);
        Ok(true)
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        let mut entries = self.entries.lock().await;
        Ok(live(&mut entries, key).is_some())
    }

    async fn set_add(&self, key: &str, member: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().await;
        match live(&mut entries, key) {
            Some(Entry {
                value: Value::Set(members),
                ..
            }) => {
                members.insert(member.to_string());
            }
            Some(_) => return Err(wrong_type(key)),
            None => {
                let members = HashSet::from([member.to_string()]);
                entries.insert(
                    key.to_string(),
                    Entry {
                        value: Value::Set(members),
                        deadline: None,
                    },
                );
            }
        }
        Ok(())
    }

    async fn set_remove(
        &self,
        key: &str,
        member: &str,
    ) -> Result<bool, StoreError> {
        let mut entries = self.entries.lock().await;
        let (removed, now_empty) = match live(&mut entries, key) {
            None => return Ok(false),
            Some(Entry {
                value: Value::Set(members),
                ..
            }) => (members.remove(member), members.is_empty()),
            Some(_) => return Err(wrong_type(key)),
        };
        // Redis drops a set once its last member is gone.
        if now_empty {
            entries.remove(key);
        }
        Ok(removed)
    }

    async fn set_members(&self, key: &str) -> Result<Vec<String>, StoreError> {
        let mut entries = self.entries.lock().await;
        match live(&mut entries, key) {
            None => Ok(Vec::new()),
            Some(Entry {
                value: Value::Set(members),
                ..
            }) => {
                let mut members: Vec<String> = members.iter().cloned().collect();
                members.sort();
                Ok(members)
            }
            Some(_) => Err(wrong_type(key)),
        }
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, StoreError> {
        let deadline = deadline_after(key, ttl)?;
        let mut entries = self.entries.lock().await;
        match live(&mut entries, key) {
            Some(entry) => {
                entry.deadline = Some(deadline);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        entries.retain(|_, entry| !entry.is_expired(now));
        let mut keys: Vec<String> = entries
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect();
        keys.sort();
        Ok(keys)
    }
}
