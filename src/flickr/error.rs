use thiserror::Error;

/// Errors raised at the Flickr REST boundary.
#[derive(Error, Debug)]
pub enum FlickrError {
    /// Flickr answered with `stat: "fail"`.
    #[error("Flickr API error {code} in {method}: {message}")]
    Api {
        method: String,
        code: i64,
        message: String,
    },
    #[error("HTTP error {status} calling {method}")]
    HttpStatus { method: String, status: u16 },
    #[error("Unexpected response from {method}: {reason}")]
    UnexpectedResponse { method: String, reason: String },
    /// Transport failure. The request URL is stripped, since its query
    /// string carries the API key.
    #[error(transparent)]
    Http(reqwest::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl From<reqwest::Error> for FlickrError {
    fn from(e: reqwest::Error) -> Self {
        FlickrError::Http(e.without_url())
    }
}
