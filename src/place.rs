//! Place and origin types - the records that flow into the destination
//!
//! A place is one distinct URL. Its identity across stores is the content hash
//! (see [`crate::hash`]), never the store-local row id. An origin is the
//! `(prefix, host)` pair a place belongs to.

use base64::{Engine as _, engine::general_purpose};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Origin id stored for places whose URL has no usable scheme/host.
pub const NO_ORIGIN: i64 = 0;

/// An origin as read from a source: `("https://", "example.com")`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OriginRecord {
    pub prefix: String,
    pub host: String,
    pub frecency: i64,
}

impl OriginRecord {
    pub fn new(prefix: impl Into<String>, host: impl Into<String>, frecency: i64) -> Self {
        Self {
            prefix: prefix.into(),
            host: host.into(),
            frecency,
        }
    }

    /// Derive the origin of an absolute URL.
    ///
    /// The prefix is `scheme + "://"`. The host carries an explicit port when
    /// one is present and is empty for URLs without a host (`about:`, `file:`).
    pub fn from_url(url: &str, frecency: i64) -> crate::Result<Self> {
        let parsed = url::Url::parse(url)
            .map_err(|e| crate::Error::MalformedInput(format!("cannot parse URL {:?}: {}", url, e)))?;

        let host = match (parsed.host_str(), parsed.port()) {
            (Some(host), Some(port)) => format!("{}:{}", host, port),
            (Some(host), None) => host.to_string(),
            (None, _) => String::new(),
        };

        Ok(Self::new(format!("{}://", parsed.scheme()), host, frecency))
    }
}

/// One place as read from a source, in source-local terms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceRecord {
    pub url: String,
    pub title: Option<String>,
    pub rev_host: Option<String>,
    pub visit_count: i64,
    pub hidden: i64,
    pub typed: i64,
    pub frecency: i64,
    /// Microseconds since the Unix epoch
    pub last_visit_date: Option<i64>,
    pub guid: Option<String>,
    pub foreign_count: i64,
    /// Hash the source stored for this URL, if it had one
    pub source_hash: Option<i64>,
    pub description: Option<String>,
    pub preview_image_url: Option<String>,
    /// `None` means the place has no origin and gets [`NO_ORIGIN`]
    pub origin: Option<OriginRecord>,
}

impl PlaceRecord {
    /// Minimal record for a URL; every counter starts at its neutral value.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: None,
            rev_host: None,
            visit_count: 0,
            hidden: 0,
            typed: 0,
            frecency: -1,
            last_visit_date: None,
            guid: None,
            foreign_count: 0,
            source_hash: None,
            description: None,
            preview_image_url: None,
            origin: None,
        }
    }
}

/// A place row in the destination, as far as merging cares about it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Place {
    pub id: i64,
    pub url: String,
    pub title: Option<String>,
    pub rev_host: Option<String>,
    pub visit_count: i64,
    pub last_visit_date: Option<i64>,
    pub guid: String,
    pub url_hash: i64,
    pub origin_id: i64,
}

/// What to do when a merged URL is already present in the destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UpsertPolicy {
    /// First seen wins; the existing place is left untouched.
    SkipIfPresent,
    /// Visit counter and last-visit date are overwritten when the incoming
    /// last visit is strictly newer.
    RefreshIfNewer,
}

impl UpsertPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpsertPolicy::SkipIfPresent => "skip-if-present",
            UpsertPolicy::RefreshIfNewer => "refresh-if-newer",
        }
    }
}

impl FromStr for UpsertPolicy {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "skip-if-present" | "skip" => Ok(UpsertPolicy::SkipIfPresent),
            "refresh-if-newer" | "refresh" => Ok(UpsertPolicy::RefreshIfNewer),
            _ => Err(crate::Error::MalformedInput(format!("Unknown upsert policy: {}", s))),
        }
    }
}

impl fmt::Display for UpsertPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of upserting one place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceOutcome {
    Inserted(i64),
    Unchanged(i64),
    Refreshed(i64),
}

impl PlaceOutcome {
    pub fn id(&self) -> i64 {
        match *self {
            PlaceOutcome::Inserted(id) | PlaceOutcome::Unchanged(id) | PlaceOutcome::Refreshed(id) => id,
        }
    }
}

/// Reversed host as stored in `rev_host`: `"example.com"` → `"moc.elpmaxe."`.
pub fn reversed_host(host: &str) -> String {
    if host.is_empty() {
        return String::new();
    }
    let mut rev: String = host.chars().rev().collect();
    rev.push('.');
    rev
}

/// Fresh place GUID: 9 random bytes, URL-safe base64, 12 characters.
pub fn generate_guid() -> String {
    let mut bytes = [0u8; 9];
    rand::thread_rng().fill_bytes(&mut bytes);
    general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}
