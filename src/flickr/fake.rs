//! In-memory `PhotoService` used by the unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use serde_json::{json, Map};

use super::{AlbumRecord, Credentials, FlickrError, PhotoRecord, PhotoService, Session, SizeRecord};

/// Per-operation call counters.
#[derive(Debug, Clone, Default)]
pub(crate) struct Calls {
    pub authenticate: usize,
    pub list_user_photos: usize,
    pub list_albums: usize,
    pub list_album_photos: usize,
    pub size_requests: Vec<String>,
}

#[derive(Default)]
pub(crate) struct FakeFlickr {
    photos: Vec<PhotoRecord>,
    albums: Vec<(AlbumRecord, Vec<PhotoRecord>)>,
    failing_sizes: HashSet<String>,
    failing_members: HashSet<String>,
    fail_auth: bool,
    panic_auth: bool,
    fail_listing: bool,
    auth_delay: Option<Duration>,
    size_delay: Option<Duration>,
    calls: Mutex<Calls>,
}

pub(crate) fn photo(id: &str, title: &str) -> PhotoRecord {
    let mut extra = Map::new();
    extra.insert("secret".into(), json!(format!("s{id}")));
    extra.insert("server".into(), json!("65535"));
    PhotoRecord {
        id: id.into(),
        title: title.into(),
        extra,
    }
}

pub(crate) fn album(id: &str, title: &str) -> AlbumRecord {
    AlbumRecord {
        id: id.into(),
        title: json!({ "_content": title }),
        description: json!({ "_content": format!("About {title}") }),
        count_views: json!("3"),
        date_create: json!("1500000000"),
    }
}

fn size(label: &str, width: u64, height: u64, source: String) -> SizeRecord {
    let mut extra = Map::new();
    extra.insert("width".into(), json!(width));
    extra.insert("height".into(), json!(height));
    extra.insert("media".into(), json!("photo"));
    SizeRecord {
        label: label.into(),
        source,
        extra,
    }
}

/// The sizes the fake returns for any photo id.
pub(crate) fn sizes_for(photo_id: &str) -> Vec<SizeRecord> {
    vec![
        size("Square", 75, 75, format!("https://live.staticflickr.com/{photo_id}_s.jpg")),
        size(
            "Large 1024",
            1024,
            683,
            format!("https://live.staticflickr.com/{photo_id}_b.jpg"),
        ),
    ]
}

impl FakeFlickr {
    pub(crate) fn with_photos(mut self, photos: Vec<PhotoRecord>) -> Self {
        self.photos = photos;
        self
    }

    pub(crate) fn with_album(mut self, album: AlbumRecord, members: Vec<PhotoRecord>) -> Self {
        self.albums.push((album, members));
        self
    }

    pub(crate) fn failing_sizes_for(mut self, photo_id: &str) -> Self {
        self.failing_sizes.insert(photo_id.to_string());
        self
    }

    pub(crate) fn failing_members_for(mut self, album_id: &str) -> Self {
        self.failing_members.insert(album_id.to_string());
        self
    }

    /// Fail both top-level listings (user photos and albums).
    pub(crate) fn failing_listing(mut self) -> Self {
        self.fail_listing = true;
        self
    }

    pub(crate) fn failing_auth(mut self) -> Self {
        self.fail_auth = true;
        self
    }

    pub(crate) fn panicking_auth(mut self) -> Self {
        self.panic_auth = true;
        self
    }

    pub(crate) fn with_auth_delay_ms(mut self, ms: u64) -> Self {
        self.auth_delay = Some(Duration::from_millis(ms));
        self
    }

    pub(crate) fn with_size_delay_ms(mut self, ms: u64) -> Self {
        self.size_delay = Some(Duration::from_millis(ms));
        self
    }

    pub(crate) fn calls(&self) -> Calls {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn total_remote_calls(&self) -> usize {
        let c = self.calls();
        c.authenticate
            + c.list_user_photos
            + c.list_albums
            + c.list_album_photos
            + c.size_requests.len()
    }

    fn api_error(method: &str) -> FlickrError {
        FlickrError::Api {
            method: method.into(),
            code: 1,
            message: "Photo not found".into(),
        }
    }
}

#[async_trait::async_trait]
impl PhotoService for FakeFlickr {
    async fn authenticate(&self, credentials: &Credentials) -> Result<Session, FlickrError> {
        self.calls.lock().unwrap().authenticate += 1;
        if let Some(delay) = self.auth_delay {
            tokio::time::sleep(delay).await;
        }
        if self.panic_auth {
            panic!("authentication exploded");
        }
        if self.fail_auth {
            return Err(FlickrError::Api {
                method: "flickr.test.echo".into(),
                code: 100,
                message: "Invalid API Key".into(),
            });
        }
        Ok(Session::new(credentials.api_key.clone()))
    }

    async fn list_user_photos(
        &self,
        _session: &Session,
        _user_id: &str,
    ) -> Result<Vec<PhotoRecord>, FlickrError> {
        self.calls.lock().unwrap().list_user_photos += 1;
        if self.fail_listing {
            return Err(Self::api_error("flickr.people.getPhotos"));
        }
        Ok(self.photos.clone())
    }

    async fn get_photo_sizes(
        &self,
        _session: &Session,
        photo_id: &str,
    ) -> Result<Vec<SizeRecord>, FlickrError> {
        self.calls
            .lock()
            .unwrap()
            .size_requests
            .push(photo_id.to_string());
        if self.failing_sizes.contains(photo_id) {
            return Err(Self::api_error("flickr.photos.getSizes"));
        }
        if let Some(delay) = self.size_delay {
            tokio::time::sleep(delay).await;
        }
        Ok(sizes_for(photo_id))
    }

    async fn list_albums(
        &self,
        _session: &Session,
        _user_id: &str,
    ) -> Result<Vec<AlbumRecord>, FlickrError> {
        self.calls.lock().unwrap().list_albums += 1;
        if self.fail_listing {
            return Err(Self::api_error("flickr.photosets.getList"));
        }
        Ok(self.albums.iter().map(|(a, _)| a.clone()).collect())
    }

    async fn list_album_photos(
        &self,
        _session: &Session,
        album_id: &str,
        _user_id: &str,
    ) -> Result<Vec<PhotoRecord>, FlickrError> {
        self.calls.lock().unwrap().list_album_photos += 1;
        if self.failing_members.contains(album_id) {
            return Err(Self::api_error("flickr.photosets.getPhotos"));
        }
        let members: HashMap<&str, &Vec<PhotoRecord>> = self
            .albums
            .iter()
            .map(|(a, m)| (a.id.as_str(), m))
            .collect();
        members
            .get(album_id)
            .map(|m| (*m).clone())
            .ok_or_else(|| Self::api_error("flickr.photosets.getPhotos"))
    }
}
