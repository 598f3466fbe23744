//! Content document model: cards, their unlock schedules, and site metadata.

use std::borrow::Borrow;
use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::error::{ContentError, ScheduleError};

/// Opaque, stable card identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct CardId(String);

impl CardId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for CardId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CardId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl<'de> Deserialize<'de> for CardId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::String(s) if !s.trim().is_empty() => Ok(Self(s)),
            Value::Number(n) if n.is_i64() || n.is_u64() => Ok(Self(n.to_string())),
            other => Err(serde::de::Error::custom(format!(
                "card id must be a non-empty string or integer, got {other}"
            ))),
        }
    }
}

/// When a card unlocks. Unparseable input is kept verbatim rather than rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Schedule {
    At(DateTime<Utc>),
    Malformed(String),
}

impl Schedule {
    pub fn parse(raw: &str) -> Result<DateTime<Utc>, ScheduleError> {
        let trimmed = raw.trim();
        if let Ok(at) = DateTime::parse_from_rfc3339(trimmed) {
            return Ok(at.with_timezone(&Utc));
        }
        for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
            if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
                if let Some(local) = Local.from_local_datetime(&naive).earliest() {
                    return Ok(local.with_timezone(&Utc));
                }
            }
        }
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
            if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
                return Ok(midnight.and_utc());
            }
        }
        Err(ScheduleError::Malformed {
            raw: raw.to_owned(),
        })
    }

    pub fn instant(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::At(at) => Some(*at),
            Self::Malformed(_) => None,
        }
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::Malformed(_))
    }

    fn from_value(value: Value) -> Self {
        match value {
            Value::String(raw) => match Self::parse(&raw) {
                Ok(at) => Self::At(at),
                Err(_) => Self::Malformed(raw),
            },
            Value::Number(n) => n
                .as_i64()
                .and_then(DateTime::from_timestamp_millis)
                .map(Self::At)
                .unwrap_or_else(|| Self::Malformed(n.to_string())),
            other => Self::Malformed(other.to_string()),
        }
    }
}

impl Default for Schedule {
    fn default() -> Self {
        Self::Malformed(String::new())
    }
}

impl<'de> Deserialize<'de> for Schedule {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Self::from_value(Value::deserialize(deserializer)?))
    }
}

impl Serialize for Schedule {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::At(at) => serializer.serialize_str(&at.to_rfc3339()),
            Self::Malformed(raw) => serializer.serialize_str(raw),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub id: CardId,
    #[serde(rename = "unlockAt", default)]
    pub unlock_at: Schedule,
    /// Presentation fields (title, text, image, preview...) the core never interprets.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Card {
    pub fn new(id: impl Into<String>, unlock_at: DateTime<Utc>) -> Self {
        Self {
            id: CardId::new(id),
            unlock_at: Schedule::At(unlock_at),
            extra: Map::new(),
        }
    }

    /// Reads a string presentation field, e.g. `title` or `text`.
    pub fn field(&self, key: &str) -> Option<&str> {
        self.extra.get(key).and_then(Value::as_str)
    }

    /// Teaser shown on a closed card: `preview.teaser`, then `title`.
    pub fn teaser(&self) -> Option<&str> {
        self.extra
            .get("preview")
            .and_then(|preview| preview.get("teaser"))
            .and_then(Value::as_str)
            .filter(|teaser| !teaser.trim().is_empty())
            .or_else(|| self.field("title"))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SiteInfo {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(rename = "eventTime", default)]
    pub event_time: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SiteInfo {
    /// Reads a string field the core doesn't model, e.g. `logo`.
    pub fn field(&self, key: &str) -> Option<&str> {
        self.extra.get(key).and_then(Value::as_str)
    }

    pub fn event_instant(&self) -> Option<DateTime<Utc>> {
        self.event_time
            .as_deref()
            .and_then(|raw| Schedule::parse(raw).ok())
    }
}

#[derive(Debug, Deserialize)]
struct RawDocument {
    #[serde(default)]
    site: Option<SiteInfo>,
    #[serde(default)]
    cards: Option<Value>,
    #[serde(default)]
    version: Option<Value>,
}

/// A parsed content document. Card ids are unique.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContentDocument {
    pub site: SiteInfo,
    pub cards: Vec<Card>,
    pub version: Option<String>,
}

impl ContentDocument {
    pub fn new(cards: Vec<Card>) -> Self {
        Self {
            site: SiteInfo::default(),
            cards,
            version: None,
        }
    }

    /// Parses a content document. Individual bad card entries are skipped;
    /// only a document that is not JSON at all is an error.
    pub fn from_json(raw: &str) -> Result<Self, ContentError> {
        let doc: RawDocument = serde_json::from_str(raw)?;
        let entries = match doc.cards {
            Some(Value::Array(entries)) => entries,
            Some(other) => {
                warn!("content: `cards` is not an array ({other}), treating as empty");
                Vec::new()
            }
            None => Vec::new(),
        };

        let mut seen = HashSet::new();
        let mut cards = Vec::with_capacity(entries.len());
        for (index, entry) in entries.into_iter().enumerate() {
            let card: Card = match serde_json::from_value(entry) {
                Ok(card) => card,
                Err(err) => {
                    warn!("content: skipping card #{index}: {err}");
                    continue;
                }
            };
            if !seen.insert(card.id.clone()) {
                warn!("content: duplicate card id `{}` at #{index}, keeping the first", card.id);
                continue;
            }
            if let Schedule::Malformed(raw) = &card.unlock_at {
                warn!(
                    "content: card `{}` has malformed unlockAt `{raw}`, it stays locked",
                    card.id
                );
            }
            cards.push(card);
        }

        let version = doc.version.and_then(|v| match v {
            Value::String(s) => Some(s),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        });

        Ok(Self {
            site: doc.site.unwrap_or_default(),
            cards,
            version,
        })
    }

    pub fn load(path: &Path) -> Result<Self, ContentError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ContentError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let doc = Self::from_json(&raw)?;
        info!("content: loaded {} cards from {}", doc.cards.len(), path.display());
        Ok(doc)
    }

    pub fn card(&self, id: &str) -> Option<&Card> {
        self.cards.iter().find(|card| card.id.as_str() == id)
    }
}
