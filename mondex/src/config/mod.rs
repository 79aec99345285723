//! The on-disk index configuration.
//!
//! The file is a JSON array of collection entries:
//!
//! ```json
//! [
//!   {
//!     "collection": "users",
//!     "indexes": [
//!       { "email": 1, "@isUnique": true },
//!       { "createdAt": -1, "@expireAfterSeconds": 3600 }
//!     ]
//!   }
//! ]
//! ```
//!
//! Every non-reserved key of an index object is an indexed field, in declaration order.
//! The `@`-prefixed keys carry index metadata and are decoded into typed fields here,
//! so nothing past this module ever inspects raw keys.

pub mod error;

use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub use error::ConfigError;

use crate::types::index::{IndexDirection, IndexKeySpec};

/// Marks an index as unique.
pub const UNIQUE_KEY: &str = "@isUnique";

/// TTL of the documents covered by the index, in seconds.
pub const EXPIRE_AFTER_KEY: &str = "@expireAfterSeconds";

const RESERVED_KEYS: &[&str] = &[UNIQUE_KEY, EXPIRE_AFTER_KEY];

/// Default location of the configuration file, relative to the working directory.
pub const DEFAULT_INDEX_FILE: &str = "indexes.json";

/// One collection and the indexes it should have.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IndexConfigEntry {
    pub collection: String,
    pub indexes: Vec<IndexSpec>,
}

/// A single index as written by the user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexSpec {
    pub keys: IndexKeySpec,
    pub is_unique: bool,
    pub expire_after_seconds: Option<u64>,
}

impl IndexSpec {
    pub fn new(keys: IndexKeySpec) -> Self {
        Self { keys, is_unique: false, expire_after_seconds: None }
    }
}

impl Serialize for IndexSpec {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let extra = usize::from(self.is_unique) + usize::from(self.expire_after_seconds.is_some());
        let mut map = serializer.serialize_map(Some(self.keys.len() + extra))?;
        for (field, direction) in self.keys.iter() {
            map.serialize_entry(field, direction)?;
        }
        if self.is_unique {
            map.serialize_entry(UNIQUE_KEY, &true)?;
        }
        if let Some(seconds) = self.expire_after_seconds {
            map.serialize_entry(EXPIRE_AFTER_KEY, &seconds)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for IndexSpec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(IndexSpecVisitor)
    }
}

struct IndexSpecVisitor;

impl<'de> Visitor<'de> for IndexSpecVisitor {
    type Value = IndexSpec;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an object mapping field names to 1 or -1")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        let mut spec = IndexSpec::default();
        let mut seen_unique = false;

        while let Some(key) = map.next_key::<String>()? {
            match key.as_str() {
                UNIQUE_KEY => {
                    if seen_unique {
                        return Err(de::Error::duplicate_field(UNIQUE_KEY));
                    }
                    seen_unique = true;
                    spec.is_unique = map.next_value()?;
                }
                EXPIRE_AFTER_KEY => {
                    if spec.expire_after_seconds.is_some() {
                        return Err(de::Error::duplicate_field(EXPIRE_AFTER_KEY));
                    }
                    spec.expire_after_seconds = Some(map.next_value()?);
                }
                reserved if reserved.starts_with('@') => {
                    return Err(de::Error::unknown_field(reserved, RESERVED_KEYS));
                }
                _ => {
                    let direction: IndexDirection = map.next_value()?;
                    if !spec.keys.push(key.as_str(), direction) {
                        return Err(de::Error::custom(format!("duplicate field `{}`", key)));
                    }
                }
            }
        }

        Ok(spec)
    }
}

/// Parses configuration text. Shape errors are reported here; semantic checks
/// (empty indexes, duplicates) happen during normalization.
pub fn parse_config(contents: &str) -> Result<Vec<IndexConfigEntry>, ConfigError> {
    Ok(serde_json::from_str(contents)?)
}

/// Reads and parses the configuration file at `path`.
pub fn load_config(path: &Path) -> Result<Vec<IndexConfigEntry>, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| match source.kind() {
        ErrorKind::NotFound => ConfigError::FileNotFound(path.to_path_buf()),
        _ => ConfigError::ReadFailed { path: path.to_path_buf(), source },
    })?;
    parse_config(&contents)
}

/// Renders entries as pretty printed JSON with a trailing newline.
pub fn render_config(entries: &[IndexConfigEntry]) -> Result<String, ConfigError> {
    let mut rendered = serde_json::to_string_pretty(entries)?;
    rendered.push('\n');
    Ok(rendered)
}

/// Writes entries to `path`, replacing whatever is there.
pub fn save_config(path: &Path, entries: &[IndexConfigEntry]) -> Result<(), ConfigError> {
    let rendered = render_config(entries)?;
    fs::write(path, rendered).map_err(|source| ConfigError::WriteFailed { path: path.to_path_buf(), source })
}

/// Fails when `path` already holds a non-empty file, so `pull` never overwrites a configuration.
pub fn ensure_pull_target(path: &Path) -> Result<(), ConfigError> {
    match fs::metadata(path) {
        Ok(metadata) if metadata.len() > 0 => Err(ConfigError::TargetNotEmpty(path.to_path_buf())),
        Ok(_) => Ok(()),
        Err(source) if source.kind() == ErrorKind::NotFound => Ok(()),
        Err(source) => Err(ConfigError::ReadFailed { path: path.to_path_buf(), source }),
    }
}
