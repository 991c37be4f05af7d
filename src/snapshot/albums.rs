//! Album-library build.
//!
//! Albums overlap: the same photo may sit in several of them. Sizes are
//! fetched once per distinct photo id and then attached to every occurrence,
//! so all copies of a photo carry identical size data.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info};

use super::error::{BuildError, Stage};
use super::fanout::try_join_bounded;
use super::model::{Album, AlbumLibrary, PhotoSummary};
use super::Aggregator;
use crate::flickr::FlickrError;

/// Photo id → ids of every album that contains it.
#[derive(Debug, Default)]
pub struct OwnershipIndex(BTreeMap<String, BTreeSet<String>>);

impl OwnershipIndex {
    pub fn from_albums(albums: &AlbumLibrary) -> Self {
        let mut index: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for album in albums.values() {
            for photo_id in album.photos.keys() {
                index
                    .entry(photo_id.clone())
                    .or_default()
                    .insert(album.id.clone());
            }
        }
        Self(index)
    }

    /// The deduplicated union of photo ids.
    pub fn photo_ids(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn distinct_photos(&self) -> usize {
        self.0.len()
    }

    /// Number of photos that belong to more than one album.
    pub fn shared_photos(&self) -> usize {
        self.0.values().filter(|owners| owners.len() > 1).count()
    }

    #[cfg(test)]
    pub fn owners(&self, photo_id: &str) -> Option<&BTreeSet<String>> {
        self.0.get(photo_id)
    }
}

impl Aggregator {
    /// Fetch every album of the configured user with size-enriched members.
    pub async fn fetch_album_library(&self) -> Result<AlbumLibrary, BuildError> {
        let session = self.session().await?;

        debug!(stage = %Stage::Listing, user_id = %self.user_id, "Listing albums");
        let mut library: AlbumLibrary = self
            .service
            .list_albums(&session, &self.user_id)
            .await
            .map_err(BuildError::remote(Stage::Listing))?
            .into_iter()
            .map(|record| (record.id.clone(), Album::from(record)))
            .collect();

        debug!(stage = %Stage::FetchingMembers, albums = library.len(), "Fetching album members");
        let album_ids: Vec<String> = library.keys().cloned().collect();
        let service = &self.service;
        let session_ref = &*session;
        let user_id = self.user_id.as_str();
        let members = try_join_bounded(album_ids, self.concurrency, |album_id: String| async move {
            let photos = service
                .list_album_photos(session_ref, &album_id, user_id)
                .await?;
            Ok::<_, FlickrError>((album_id, photos))
        })
        .await
        .map_err(BuildError::remote(Stage::FetchingMembers))?;

        for (album_id, photos) in members {
            if let Some(album) = library.get_mut(&album_id) {
                album.photos = photos
                    .into_iter()
                    .map(|record| (record.id.clone(), PhotoSummary::from(record)))
                    .collect();
            }
        }

        let index = OwnershipIndex::from_albums(&library);
        debug!(
            stage = %Stage::Deduplicating,
            distinct = index.distinct_photos(),
            shared = index.shared_photos(),
            "Deduplicated album members"
        );

        let distinct: Vec<String> = index.photo_ids().map(str::to_string).collect();
        let size_sets = self.fetch_size_sets(&session, distinct).await?;

        debug!(stage = %Stage::Merging, "Attaching sizes to album members");
        for album in library.values_mut() {
            for (photo_id, photo) in album.photos.iter_mut() {
                if let Some(sizes) = size_sets.get(photo_id) {
                    photo.sizes = sizes.clone();
                }
            }
        }

        info!(
            albums = library.len(),
            photos = index.distinct_photos(),
            "Album library aggregated"
        );
        Ok(library)
    }
}
