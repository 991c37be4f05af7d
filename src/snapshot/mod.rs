//! Snapshot pipeline: aggregates a user's Flickr library into a nested
//! structure and commits it to a JSON cache file.
//!
//! Each build authenticates once (cached for the process), fans out the
//! dependent Flickr calls with bounded concurrency, joins fail-fast, and
//! only writes the snapshot when every call succeeded.

mod albums;
pub mod builder;
pub mod error;
mod fanout;
pub mod labels;
pub mod model;
mod photos;
pub mod writer;

pub use builder::Builder;

use std::collections::HashMap;
use std::sync::Arc;

use crate::flickr::{Credentials, FlickrError, PhotoService, Session, SessionProvider};

use self::error::{BuildError, Stage};
use self::fanout::try_join_bounded;
use self::model::SizeSet;

/// Shared context for the photo and album aggregators.
pub struct Aggregator {
    service: Arc<dyn PhotoService>,
    sessions: SessionProvider,
    user_id: String,
    concurrency: usize,
}

impl std::fmt::Debug for Aggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Aggregator")
            .field("sessions", &self.sessions)
            .field("user_id", &self.user_id)
            .field("concurrency", &self.concurrency)
            .finish_non_exhaustive()
    }
}

impl Aggregator {
    pub fn new(
        service: Arc<dyn PhotoService>,
        credentials: Credentials,
        user_id: String,
        concurrency: usize,
    ) -> Self {
        Self {
            sessions: SessionProvider::new(Arc::clone(&service), credentials),
            service,
            user_id,
            concurrency: concurrency.max(1),
        }
    }

    async fn session(&self) -> Result<Arc<Session>, BuildError> {
        self.sessions
            .ensure_session()
            .await
            .map_err(BuildError::Authentication)
    }

    /// Fetch and label the sizes of every given photo, one call per id.
    async fn fetch_size_sets(
        &self,
        session: &Session,
        photo_ids: Vec<String>,
    ) -> Result<HashMap<String, SizeSet>, BuildError> {
        tracing::debug!(stage = %Stage::FetchingSizes, "Fetching photo sizes");
        let service = &self.service;
        let sets = try_join_bounded(photo_ids, self.concurrency, |photo_id: String| async move {
            let sizes = service.get_photo_sizes(session, &photo_id).await?;
            Ok::<_, FlickrError>((photo_id, SizeSet::from_records(sizes)))
        })
        .await
        .map_err(BuildError::remote(Stage::FetchingSizes))?;

        let variants: usize = sets.iter().map(|(_, s)| s.variant_count()).sum();
        tracing::debug!(photos = sets.len(), variants, "Fetched photo sizes");
        Ok(sets.into_iter().collect())
    }
}
