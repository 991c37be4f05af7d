//! Flickr REST client: the remote boundary the aggregation pipeline talks to.
//!
//! [`PhotoService`] is the seam: [`RestClient`] speaks to `api.flickr.com`,
//! tests plug in an in-memory fake.

pub mod error;
#[cfg(test)]
pub(crate) mod fake;
pub mod responses;
pub mod session;

pub use error::FlickrError;
pub use responses::{AlbumRecord, PhotoRecord, SizeRecord};
pub use session::{Credentials, Session, SessionProvider};

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

use self::responses::{
    decode_envelope, PeoplePhotosResponse, PhotosetListResponse, PhotosetPhotosResponse,
    SizesResponse,
};

pub const DEFAULT_API_BASE: &str = "https://api.flickr.com/services/rest/";

/// Flickr caps a page at 500 items; only the first page is ever requested.
const FIRST_PAGE_SIZE: &str = "500";

const USER_AGENT: &str = concat!("flickr-snapshot/", env!("CARGO_PKG_VERSION"));

/// The remote operations the snapshot pipeline consumes.
#[async_trait::async_trait]
pub trait PhotoService: Send + Sync {
    async fn authenticate(&self, credentials: &Credentials) -> Result<Session, FlickrError>;

    async fn list_user_photos(
        &self,
        session: &Session,
        user_id: &str,
    ) -> Result<Vec<PhotoRecord>, FlickrError>;

    async fn get_photo_sizes(
        &self,
        session: &Session,
        photo_id: &str,
    ) -> Result<Vec<SizeRecord>, FlickrError>;

    async fn list_albums(
        &self,
        session: &Session,
        user_id: &str,
    ) -> Result<Vec<AlbumRecord>, FlickrError>;

    async fn list_album_photos(
        &self,
        session: &Session,
        album_id: &str,
        user_id: &str,
    ) -> Result<Vec<PhotoRecord>, FlickrError>;
}

/// `PhotoService` backed by the public Flickr REST endpoint.
#[derive(Debug, Clone)]
pub struct RestClient {
    client: reqwest::Client,
    endpoint: Url,
}

impl RestClient {
    pub fn new(endpoint: Url, timeout: Option<Duration>) -> Result<Self, FlickrError> {
        let mut builder = reqwest::Client::builder().user_agent(USER_AGENT);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
            endpoint,
        })
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        api_key: &str,
        params: &[(&str, &str)],
    ) -> Result<T, FlickrError> {
        let mut query: Vec<(&str, &str)> = vec![
            ("method", method),
            ("api_key", api_key),
            ("format", "json"),
            ("nojsoncallback", "1"),
        ];
        query.extend_from_slice(params);

        tracing::debug!(method, "GET {}", self.endpoint);
        let response = self
            .client
            .get(self.endpoint.clone())
            .query(&query)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FlickrError::HttpStatus {
                method: method.to_string(),
                status: status.as_u16(),
            });
        }

        let body: Value = response.json().await?;
        decode_envelope(method, body)
    }
}

#[async_trait::async_trait]
impl PhotoService for RestClient {
    async fn authenticate(&self, credentials: &Credentials) -> Result<Session, FlickrError> {
        // Key-only access: a successful echo proves the key is accepted.
        let _: Value = self
            .call("flickr.test.echo", &credentials.api_key, &[])
            .await?;
        Ok(Session::new(credentials.api_key.clone()))
    }

    async fn list_user_photos(
        &self,
        session: &Session,
        user_id: &str,
    ) -> Result<Vec<PhotoRecord>, FlickrError> {
        let resp: PeoplePhotosResponse = self
            .call(
                "flickr.people.getPhotos",
                session.api_key(),
                &[("user_id", user_id), ("per_page", FIRST_PAGE_SIZE)],
            )
            .await?;
        Ok(resp.photos.photo)
    }

    async fn get_photo_sizes(
        &self,
        session: &Session,
        photo_id: &str,
    ) -> Result<Vec<SizeRecord>, FlickrError> {
        let resp: SizesResponse = self
            .call(
                "flickr.photos.getSizes",
                session.api_key(),
                &[("photo_id", photo_id)],
            )
            .await?;
        Ok(resp.sizes.size)
    }

    async fn list_albums(
        &self,
        session: &Session,
        user_id: &str,
    ) -> Result<Vec<AlbumRecord>, FlickrError> {
        let resp: PhotosetListResponse = self
            .call(
                "flickr.photosets.getList",
                session.api_key(),
                &[("user_id", user_id), ("per_page", FIRST_PAGE_SIZE)],
            )
            .await?;
        Ok(resp.photosets.photoset)
    }

    async fn list_album_photos(
        &self,
        session: &Session,
        album_id: &str,
        user_id: &str,
    ) -> Result<Vec<PhotoRecord>, FlickrError> {
        let resp: PhotosetPhotosResponse = self
            .call(
                "flickr.photosets.getPhotos",
                session.api_key(),
                &[
                    ("photoset_id", album_id),
                    ("user_id", user_id),
                    ("per_page", FIRST_PAGE_SIZE),
                ],
            )
            .await?;
        Ok(resp.photoset.photo)
    }
}
