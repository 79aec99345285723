//! Canonical index model shared by the desired and observed sides of a run.
//!
//! Both the configuration file and the database are reduced to [`CanonicalIndex`]
//! values before they are compared, so the reconciliation engine never needs to
//! know where an index came from.

use std::fmt;

use indexmap::IndexMap;
use mongodb::bson::{Bson, Document};
use serde::de::{self, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Name of the primary key index MongoDB creates on every collection.
///
/// This index is never created, dropped or rendered by mondex.
pub const SYSTEM_INDEX_NAME: &str = "_id_";

/// Field the system index is built on.
pub const SYSTEM_INDEX_FIELD: &str = "_id";

/// Sort direction (or special index type) of a single indexed field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IndexDirection {
    Ascending,
    Descending,
    /// Non-ordered index types such as `"hashed"` or `"2dsphere"`.
    Special(String),
}

impl IndexDirection {
    /// Interprets the value stored for a field in a driver key document.
    ///
    /// The server accepts any positive number as ascending and any negative number
    /// as descending, and reports whatever numeric type the index was created with.
    pub fn from_bson(value: &Bson) -> Self {
        let numeric = match value {
            Bson::Int32(v) => Some(*v as f64),
            Bson::Int64(v) => Some(*v as f64),
            Bson::Double(v) => Some(*v),
            Bson::String(kind) => return Self::Special(kind.clone()),
            _ => None,
        };

        match numeric {
            Some(v) if v > 0.0 => Self::Ascending,
            Some(v) if v < 0.0 => Self::Descending,
            _ => Self::Special(value.to_string()),
        }
    }

    pub fn to_bson(&self) -> Bson {
        match self {
            Self::Ascending => Bson::Int32(1),
            Self::Descending => Bson::Int32(-1),
            Self::Special(kind) => Bson::String(kind.clone()),
        }
    }
}

impl fmt::Display for IndexDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ascending => write!(f, "1"),
            Self::Descending => write!(f, "-1"),
            Self::Special(kind) => write!(f, "{}", kind),
        }
    }
}

impl Serialize for IndexDirection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Ascending => serializer.serialize_i32(1),
            Self::Descending => serializer.serialize_i32(-1),
            Self::Special(kind) => serializer.serialize_str(kind),
        }
    }
}

impl<'de> Deserialize<'de> for IndexDirection {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(IndexDirectionVisitor)
    }
}

struct IndexDirectionVisitor;

impl<'de> Visitor<'de> for IndexDirectionVisitor {
    type Value = IndexDirection;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("1, -1 or an index type name")
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        match v {
            1 => Ok(IndexDirection::Ascending),
            -1 => Ok(IndexDirection::Descending),
            _ => Err(E::invalid_value(de::Unexpected::Signed(v), &self)),
        }
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        match v {
            1 => Ok(IndexDirection::Ascending),
            _ => Err(E::invalid_value(de::Unexpected::Unsigned(v), &self)),
        }
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        if v.trim().is_empty() {
            return Err(E::invalid_value(de::Unexpected::Str(v), &self));
        }
        Ok(IndexDirection::Special(v.to_string()))
    }
}

/// Ordered list of indexed fields.
///
/// Field order is part of an index's identity: `{a: 1, b: 1}` and `{b: 1, a: 1}`
/// are different indexes to the server, so this is a sequence rather than a map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct IndexKeySpec(Vec<(String, IndexDirection)>);

impl IndexKeySpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a field. Returns `false` and leaves the spec untouched when the field
    /// is already present.
    pub fn push(&mut self, field: impl Into<String>, direction: IndexDirection) -> bool {
        let field = field.into();
        if self.contains(&field) {
            return false;
        }
        self.0.push((field, direction));
        true
    }

    /// Builder-style variant of [`IndexKeySpec::push`], mostly useful in tests.
    pub fn with(mut self, field: impl Into<String>, direction: IndexDirection) -> Self {
        self.push(field, direction);
        self
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.iter().any(|(name, _)| name == field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &IndexDirection)> {
        self.0.iter().map(|(field, direction)| (field.as_str(), direction))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Converts a driver key document, keeping the server-reported field order.
    pub fn from_document(keys: &Document) -> Self {
        Self(keys.iter().map(|(field, value)| (field.clone(), IndexDirection::from_bson(value))).collect())
    }

    pub fn to_document(&self) -> Document {
        let mut document = Document::new();
        for (field, direction) in &self.0 {
            document.insert(field.clone(), direction.to_bson());
        }
        document
    }
}

impl FromIterator<(String, IndexDirection)> for IndexKeySpec {
    fn from_iter<T: IntoIterator<Item = (String, IndexDirection)>>(iter: T) -> Self {
        let mut spec = Self::new();
        for (field, direction) in iter {
            spec.push(field, direction);
        }
        spec
    }
}

/// Serialized as a JSON object whose keys keep the field order.
impl Serialize for IndexKeySpec {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (field, direction) in &self.0 {
            map.serialize_entry(field, direction)?;
        }
        map.end()
    }
}

/// Renders the spec the way it would appear in the configuration file,
/// e.g. `{"a":1,"b":-1}`.
impl fmt::Display for IndexKeySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered = serde_json::to_string(self).map_err(|_| fmt::Error)?;
        f.write_str(&rendered)
    }
}

/// The unit of comparison between observed and desired state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalIndex {
    pub name: String,
    pub keys: IndexKeySpec,
    pub is_unique: bool,
    pub expire_after_seconds: Option<u64>,
}

impl CanonicalIndex {
    pub fn new(name: impl Into<String>, keys: IndexKeySpec) -> Self {
        Self { name: name.into(), keys, is_unique: false, expire_after_seconds: None }
    }

    pub fn unique(mut self, is_unique: bool) -> Self {
        self.is_unique = is_unique;
        self
    }

    pub fn expire_after(mut self, seconds: Option<u64>) -> Self {
        self.expire_after_seconds = seconds;
        self
    }

    pub fn is_system_index(&self) -> bool {
        self.name == SYSTEM_INDEX_NAME
    }

    /// True when both indexes cover the same fields, in the same order, with the same directions.
    pub fn same_keys(&self, other: &CanonicalIndex) -> bool {
        self.keys == other.keys
    }

    /// True when uniqueness and TTL match.
    pub fn same_options(&self, other: &CanonicalIndex) -> bool {
        self.is_unique == other.is_unique && self.expire_after_seconds == other.expire_after_seconds
    }
}

/// An index exactly as the database reported it, before normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservedIndex {
    pub name: String,
    pub keys: Document,
    pub unique: Option<bool>,
    pub expire_after_seconds: Option<u64>,
}

/// Collection name to the indexes of that collection, in insertion order.
pub type CollectionIndexSet = IndexMap<String, Vec<CanonicalIndex>>;
