use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// System location of a storage backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Location {
    Os,
    Sharepoint,
    BlobStorage,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Location::Os => "OS",
            Location::Sharepoint => "SHAREPOINT",
            Location::BlobStorage => "BLOB_STORAGE",
        };
        f.write_str(s)
    }
}

impl FromStr for Location {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "OS" => Ok(Location::Os),
            "SHAREPOINT" => Ok(Location::Sharepoint),
            "BLOB_STORAGE" => Ok(Location::BlobStorage),
            other => Err(format!("unknown location '{}'", other)),
        }
    }
}

/// Serialization format of a config document.
///
/// Serialized as the canonical file extension (`.json`, `.yaml`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataFormat {
    #[serde(rename = ".json", alias = "json", alias = "JSON")]
    Json,
    #[serde(rename = ".yaml", alias = ".yml", alias = "yaml", alias = "yml", alias = "YAML")]
    Yaml,
}

impl DataFormat {
    /// Maps a file extension (with or without the leading dot) to a format.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "json" => Some(DataFormat::Json),
            "yaml" | "yml" => Some(DataFormat::Yaml),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            DataFormat::Json => ".json",
            DataFormat::Yaml => ".yaml",
        }
    }
}

impl fmt::Display for DataFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for DataFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DataFormat::from_extension(s).ok_or_else(|| Error::UnsupportedFormat(s.to_string()))
    }
}

/// Reference to a document in some backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRef {
    pub location: Location,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<DataFormat>,
}

/// A config document that only points at another document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProxyConfig {
    #[serde(rename = "ref")]
    pub reference: FileRef,
}

/// Tri-state existence of a storage object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Existence {
    Exists,
    Absent,
    /// The stat call itself failed for a reason other than non-existence.
    Unknown,
}

impl Existence {
    /// `Some(true|false)` when known, `None` when unknown.
    pub fn known(&self) -> Option<bool> {
        match self {
            Existence::Exists => Some(true),
            Existence::Absent => Some(false),
            Existence::Unknown => None,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Existence::Absent)
    }
}

/// Bundled metadata of a single file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaData {
    pub filename: String,
    pub basename: String,
    pub ext: String,
    pub size: u64,
    pub author: Option<String>,
    pub author_id: Option<u32>,
    pub time_created: Option<DateTime<FixedOffset>>,
    pub time_updated: Option<DateTime<FixedOffset>>,
}

/// Runtime limits and switches for one search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchOptions {
    pub max_depth: usize,
    pub max_items: usize,
    #[serde(with = "duration_secs")]
    pub max_duration: Duration,
    pub skip_empty: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            max_depth: 32,
            max_items: 100_000,
            max_duration: Duration::from_secs(600),
            skip_empty: false,
        }
    }
}

/// A search-fs request: what to search and under which limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SearchRequest {
    pub label: String,
    pub root: FileRef,
    /// Limits for this search; the caller's defaults apply when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<SearchOptions>,
}

/// One published search result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRecord {
    pub timestamp: String,
    pub path: String,
    pub filename: String,
}

/// (De)serializes a `Duration` as fractional seconds.
pub mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}
