use std::path::PathBuf;

use thiserror::Error;

use crate::flickr::FlickrError;

/// Pipeline stage of an aggregation run, carried on remote-call errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Listing,
    FetchingMembers,
    Deduplicating,
    FetchingSizes,
    Merging,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Stage::Listing => "listing",
            Stage::FetchingMembers => "fetching-members",
            Stage::Deduplicating => "deduplicating",
            Stage::FetchingSizes => "fetching-sizes",
            Stage::Merging => "merging",
        };
        f.write_str(s)
    }
}

/// Why a build run failed. Each run reports at most one of these.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Flickr authentication failed: {0}")]
    Authentication(#[source] FlickrError),

    #[error("Remote call failed while {stage}: {source}")]
    RemoteCall {
        stage: Stage,
        #[source]
        source: FlickrError,
    },

    #[error(transparent)]
    Write(#[from] WriteError),
}

impl BuildError {
    pub(crate) fn remote(stage: Stage) -> impl FnOnce(FlickrError) -> Self {
        move |source| Self::RemoteCall { stage, source }
    }
}

/// Failure to serialize or persist a snapshot.
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("Failed to serialize snapshot: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Failed to write snapshot to {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}
