//! Wire types for the Flickr REST API (`format=json&nojsoncallback=1`).
//!
//! Flickr is loose with its JSON: numbers often arrive as strings and text
//! fields are sometimes wrapped as `{"_content": "..."}`. The `text` helper
//! accepts every shape seen in practice for the fields the pipeline reads;
//! everything else is carried through exactly as Flickr sent it.

use serde::de::{DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::error::FlickrError;

/// Response envelope status when a call failed.
#[derive(Debug, Deserialize)]
struct FailureEnvelope {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

/// Check the `stat` field and decode the payload into `T`.
pub(crate) fn decode_envelope<T: DeserializeOwned>(
    method: &str,
    body: Value,
) -> Result<T, FlickrError> {
    match body.get("stat").and_then(Value::as_str) {
        Some("ok") => Ok(serde_json::from_value(body)?),
        Some("fail") => {
            let failure: FailureEnvelope = serde_json::from_value(body)?;
            Err(FlickrError::Api {
                method: method.to_string(),
                code: failure.code,
                message: failure.message,
            })
        }
        other => Err(FlickrError::UnexpectedResponse {
            method: method.to_string(),
            reason: format!("missing or unknown stat: {other:?}"),
        }),
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LooseText {
    Plain(String),
    Number(serde_json::Number),
    Wrapped {
        #[serde(rename = "_content")]
        content: String,
    },
}

fn text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match LooseText::deserialize(deserializer)? {
        LooseText::Plain(s) | LooseText::Wrapped { content: s } => s,
        LooseText::Number(n) => n.to_string(),
    })
}

/// A photo as listed by `flickr.people.getPhotos` or `flickr.photosets.getPhotos`.
///
/// Fields other than `id` and `title` are kept verbatim in `extra`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PhotoRecord {
    #[serde(deserialize_with = "text")]
    pub id: String,
    #[serde(default, deserialize_with = "text")]
    pub title: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One resolution variant from `flickr.photos.getSizes`.
///
/// `label` keys the size set and `source` is the image URL; dimensions and
/// the remaining fields are kept verbatim in `extra`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SizeRecord {
    #[serde(deserialize_with = "text")]
    pub label: String,
    pub source: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// An album (photoset) from `flickr.photosets.getList`.
///
/// Only the whitelisted metadata fields are decoded; everything else Flickr
/// sends is dropped here. Their values keep Flickr's shapes (`title` and
/// `description` as `{"_content": ...}`, counters as strings).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AlbumRecord {
    #[serde(deserialize_with = "text")]
    pub id: String,
    #[serde(default)]
    pub title: Value,
    #[serde(default)]
    pub description: Value,
    #[serde(default)]
    pub count_views: Value,
    #[serde(default)]
    pub date_create: Value,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PeoplePhotosResponse {
    pub photos: PhotoPage,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PhotoPage {
    #[serde(default)]
    pub photo: Vec<PhotoRecord>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SizesResponse {
    pub sizes: SizeList,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SizeList {
    #[serde(default)]
    pub size: Vec<SizeRecord>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PhotosetListResponse {
    pub photosets: PhotosetPage,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PhotosetPage {
    #[serde(default)]
    pub photoset: Vec<AlbumRecord>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PhotosetPhotosResponse {
    pub photoset: PhotoPage,
}
