use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

/// Which snapshot a build produces.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    clap::ValueEnum,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum BuildKind {
    /// Flat photo library.
    Photos,
    /// Albums with their member photos.
    Albums,
}

impl BuildKind {
    pub const ALL: [BuildKind; 2] = [BuildKind::Photos, BuildKind::Albums];

    pub fn as_str(&self) -> &str {
        match self {
            BuildKind::Photos => "photos",
            BuildKind::Albums => "albums",
        }
    }

    /// Cache file name inside the public directory.
    pub fn file_name(&self) -> &str {
        match self {
            BuildKind::Photos => "gallery.json",
            BuildKind::Albums => "albums.json",
        }
    }

    pub fn output_path(&self, public_dir: &Path) -> PathBuf {
        public_dir.join(self.file_name())
    }
}

impl std::fmt::Display for BuildKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
