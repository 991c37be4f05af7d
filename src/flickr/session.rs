use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::OnceCell;

use super::error::FlickrError;
use super::PhotoService;

/// Process-level Flickr credentials.
#[derive(Clone)]
pub struct Credentials {
    pub api_key: String,
    pub secret: String,
    pub developer_id: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &self.api_key)
            .field("secret", &"<redacted>")
            .field("developer_id", &self.developer_id)
            .finish()
    }
}

/// An authenticated handle to the Flickr API.
///
/// Flickr never signals expiry for key-only access, so a session stays valid
/// for the lifetime of the process once obtained.
#[derive(Debug, Clone)]
pub struct Session {
    api_key: String,
    authenticated_at: DateTime<Utc>,
}

impl Session {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            authenticated_at: Utc::now(),
        }
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn authenticated_at(&self) -> DateTime<Utc> {
        self.authenticated_at
    }
}

/// Lazily authenticates once and hands out the cached session afterwards.
///
/// Concurrent callers racing on the first use share a single authentication
/// exchange. A failed exchange leaves the cell empty so a later call retries.
pub struct SessionProvider {
    service: Arc<dyn PhotoService>,
    credentials: Credentials,
    session: OnceCell<Arc<Session>>,
}

impl std::fmt::Debug for SessionProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionProvider")
            .field("credentials", &self.credentials)
            .field("initialized", &self.session.initialized())
            .finish_non_exhaustive()
    }
}

impl SessionProvider {
    pub fn new(service: Arc<dyn PhotoService>, credentials: Credentials) -> Self {
        Self {
            service,
            credentials,
            session: OnceCell::new(),
        }
    }

    /// Return the cached session, authenticating on first use.
    pub async fn ensure_session(&self) -> Result<Arc<Session>, FlickrError> {
        let session = self
            .session
            .get_or_try_init(|| async {
                tracing::debug!(
                    developer_id = ?self.credentials.developer_id,
                    "Authenticating with Flickr"
                );
                match self.service.authenticate(&self.credentials).await {
                    Ok(session) => {
                        tracing::info!(
                            at = %session.authenticated_at(),
                            "Flickr session established"
                        );
                        Ok(Arc::new(session))
                    }
                    Err(e) => {
                        tracing::error!("Error retrieving Flickr session: {}", e);
                        Err(e)
                    }
                }
            })
            .await?;
        Ok(Arc::clone(session))
    }
}
