//! Photo-library build: the user's flat photo list, each photo enriched with
//! its size variants.

use tracing::{debug, info};

use super::error::{BuildError, Stage};
use super::model::{Photo, PhotoLibrary};
use super::Aggregator;

impl Aggregator {
    /// Fetch every photo of the configured user and attach its sizes.
    ///
    /// One listing call, then one size call per photo with bounded
    /// concurrency. Any failed call fails the whole build.
    pub async fn fetch_photo_library(&self) -> Result<PhotoLibrary, BuildError> {
        let session = self.session().await?;

        debug!(stage = %Stage::Listing, user_id = %self.user_id, "Listing photos");
        let records = self
            .service
            .list_user_photos(&session, &self.user_id)
            .await
            .map_err(BuildError::remote(Stage::Listing))?;

        let mut library: PhotoLibrary = records
            .into_iter()
            .map(|record| (record.id.clone(), Photo::from(record)))
            .collect();
        debug!("Listed {} photos", library.len());

        let ids: Vec<String> = library.keys().cloned().collect();
        let size_sets = self.fetch_size_sets(&session, ids).await?;

        for (id, sizes) in size_sets {
            if let Some(photo) = library.get_mut(&id) {
                photo.sizes = sizes;
            }
        }

        info!(photos = library.len(), "Photo library aggregated");
        Ok(library)
    }
}
