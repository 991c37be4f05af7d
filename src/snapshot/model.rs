use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::labels::label_key;
use crate::flickr::{AlbumRecord, PhotoRecord, SizeRecord};

/// Resolution variants of one photo, keyed by normalized label.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SizeSet(BTreeMap<String, SizeRecord>);

impl SizeSet {
    /// Key each record by [`label_key`] of its raw label. The raw label stays
    /// on the record.
    pub fn from_records(records: Vec<SizeRecord>) -> Self {
        Self(
            records
                .into_iter()
                .map(|size| (label_key(&size.label), size))
                .collect(),
        )
    }

    #[cfg(test)]
    pub fn get(&self, key: &str) -> Option<&SizeRecord> {
        self.0.get(key)
    }

    pub fn variant_count(&self) -> usize {
        self.0.len()
    }
}

/// A photo in the flat library build: every Flickr field plus its sizes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Photo {
    pub id: String,
    pub title: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
    #[serde(default)]
    pub sizes: SizeSet,
}

impl From<PhotoRecord> for Photo {
    fn from(record: PhotoRecord) -> Self {
        Self {
            id: record.id,
            title: record.title,
            extra: record.extra,
            sizes: SizeSet::default(),
        }
    }
}

/// An album member trimmed to `{id, title}` plus its sizes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoSummary {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub sizes: SizeSet,
}

impl From<PhotoRecord> for PhotoSummary {
    fn from(record: PhotoRecord) -> Self {
        Self {
            id: record.id,
            title: record.title,
            sizes: SizeSet::default(),
        }
    }
}

/// An album with its whitelisted metadata and member photos keyed by id.
///
/// Metadata values are written as Flickr returned them; a field Flickr
/// omitted is omitted here too.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Album {
    pub id: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub title: Value,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub description: Value,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub count_views: Value,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub date_create: Value,
    #[serde(default)]
    pub photos: BTreeMap<String, PhotoSummary>,
}

impl From<AlbumRecord> for Album {
    fn from(record: AlbumRecord) -> Self {
        Self {
            id: record.id,
            title: record.title,
            description: record.description,
            count_views: record.count_views,
            date_create: record.date_create,
            photos: BTreeMap::new(),
        }
    }
}

/// Result of a photo-library build, keyed by photo id.
pub type PhotoLibrary = BTreeMap<String, Photo>;

/// Result of an album-library build, keyed by album id.
pub type AlbumLibrary = BTreeMap<String, Album>;
