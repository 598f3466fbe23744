//! Persisted set of opened cards, plus the last-seen content version.

use std::collections::{BTreeSet, HashMap};

use advent_platform::KeyValueStore;
use serde_json::Value;
use tracing::{info, warn};

use crate::card::CardId;
use crate::error::PersistenceError;

pub const OPENED_KEY: &str = "openedCards:v1";
pub const VERSION_KEY: &str = "contentVersion:v1";

/// Identifiers the user has explicitly opened. Only ever grows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OpenedSet(BTreeSet<CardId>);

impl OpenedSet {
    pub fn contains(&self, id: &str) -> bool {
        self.0.contains(id)
    }

    /// Returns `false` when `id` was already present.
    pub fn insert(&mut self, id: CardId) -> bool {
        self.0.insert(id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CardId> {
        self.0.iter()
    }

    fn decode(raw: &str) -> Result<Self, serde_json::Error> {
        let ids = match serde_json::from_str::<Value>(raw)? {
            Value::Array(items) => items
                .into_iter()
                .filter_map(|item| match item {
                    Value::String(s) if !s.is_empty() => Some(CardId::new(s)),
                    Value::Number(n) => Some(CardId::new(n.to_string())),
                    _ => None,
                })
                .collect(),
            _ => BTreeSet::new(),
        };
        Ok(Self(ids))
    }

    fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.0)
    }
}

impl<'a> FromIterator<&'a str> for OpenedSet {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        Self(iter.into_iter().map(CardId::new).collect())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    Opened,
    AlreadyOpen,
}

/// Typed view over a [`KeyValueStore`]. Nothing is cached: every read goes
/// back to the store so edits from elsewhere are always seen.
pub struct OpenedStore<S> {
    inner: S,
}

impl<S: KeyValueStore> OpenedStore<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn inner_mut(&mut self) -> &mut S {
        &mut self.inner
    }

    /// Reads the opened set. A corrupt or non-array value decodes as empty;
    /// only a failing store is an error.
    pub fn try_read(&self) -> Result<OpenedSet, PersistenceError> {
        let raw = self
            .inner
            .get(OPENED_KEY)
            .map_err(|err| PersistenceError::Unavailable(err.to_string()))?;
        let Some(raw) = raw else {
            return Ok(OpenedSet::default());
        };
        Ok(OpenedSet::decode(&raw).unwrap_or_else(|err| {
            warn!("store: corrupt `{OPENED_KEY}` ({err}), treating as empty");
            OpenedSet::default()
        }))
    }

    /// Like [`try_read`](Self::try_read) but never fails; an unavailable
    /// store reads as an empty set for this call.
    pub fn read(&self) -> OpenedSet {
        self.try_read().unwrap_or_else(|err| {
            warn!("store: {err}; continuing with an empty opened set");
            OpenedSet::default()
        })
    }

    pub fn write(&mut self, opened: &OpenedSet) -> Result<(), PersistenceError> {
        let encoded = opened.encode()?;
        self.inner
            .set(OPENED_KEY, &encoded)
            .map_err(|err| PersistenceError::Unavailable(err.to_string()))
    }

    /// Persists `id` as opened. Re-opening is a no-op.
    ///
    /// An unreadable store fails the commit rather than overwriting entries
    /// that could not be seen.
    pub fn commit_open(&mut self, id: &CardId) -> Result<CommitOutcome, PersistenceError> {
        let mut opened = self.try_read()?;
        if !opened.insert(id.clone()) {
            return Ok(CommitOutcome::AlreadyOpen);
        }
        self.write(&opened)?;
        info!("store: card `{id}` opened ({} total)", opened.len());
        Ok(CommitOutcome::Opened)
    }

    pub fn last_seen_version(&self) -> Option<String> {
        match self.inner.get(VERSION_KEY) {
            Ok(version) => version,
            Err(err) => {
                warn!("store: cannot read `{VERSION_KEY}`: {err}");
                None
            }
        }
    }

    /// Records `version` and reports whether it differs from the previous one.
    pub fn record_version(&mut self, version: &str) -> Result<bool, PersistenceError> {
        let changed = self.last_seen_version().as_deref() != Some(version);
        if changed {
            self.inner
                .set(VERSION_KEY, version)
                .map_err(|err| PersistenceError::Unavailable(err.to_string()))?;
        }
        Ok(changed)
    }
}

/// In-memory store for tests and throwaway sessions.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> advent_platform::Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> advent_platform::Result<()> {
        self.entries.insert(key.to_owned(), value.to_owned());
        Ok(())
    }
}
