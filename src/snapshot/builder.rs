//! Build orchestration: runs one aggregation, commits the snapshot, and keeps
//! a per-kind report for the status endpoint.
//!
//! Every failure is caught here and logged; callers that triggered a build in
//! the background never see it.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::Instrument;
use uuid::Uuid;

use super::error::BuildError;
use super::writer::{write_snapshot, SnapshotMeta};
use super::Aggregator;
use crate::systemd::SystemdNotifier;
use crate::types::BuildKind;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildState {
    #[default]
    Idle,
    Running,
    Succeeded,
    Failed,
}

/// Outcome of the latest build of one kind.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildReport {
    pub state: BuildState,
    pub run_id: Option<Uuid>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    /// `meta.lastModified` of the last snapshot this process wrote.
    pub last_modified: Option<i64>,
    pub last_error: Option<String>,
}

/// In-memory board of build reports, also the in-flight guard.
#[derive(Debug, Default)]
struct StatusBoard(Mutex<BTreeMap<BuildKind, BuildReport>>);

impl StatusBoard {
    // Reports are plain data, so a poisoned lock still holds a usable map.
    fn lock(&self) -> MutexGuard<'_, BTreeMap<BuildKind, BuildReport>> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Mark `kind` as running. Returns false if a build of it already is.
    fn try_begin(&self, kind: BuildKind, run_id: Uuid) -> bool {
        let mut board = self.lock();
        let report = board.entry(kind).or_default();
        if report.state == BuildState::Running {
            return false;
        }
        report.state = BuildState::Running;
        report.run_id = Some(run_id);
        report.started_at = Some(Utc::now());
        report.finished_at = None;
        true
    }

    fn finish(&self, kind: BuildKind, result: &Result<SnapshotMeta, BuildError>) {
        let mut board = self.lock();
        let report = board.entry(kind).or_default();
        report.finished_at = Some(Utc::now());
        match result {
            Ok(meta) => {
                report.state = BuildState::Succeeded;
                report.last_modified = Some(meta.last_modified);
                report.last_error = None;
            }
            Err(e) => {
                report.state = BuildState::Failed;
                report.last_error = Some(e.to_string());
            }
        }
    }

    /// Record a build that ended without a result (panic or cancellation).
    fn abort(&self, kind: BuildKind) {
        let mut board = self.lock();
        let report = board.entry(kind).or_default();
        if report.state == BuildState::Running {
            report.state = BuildState::Failed;
            report.finished_at = Some(Utc::now());
            report.last_error = Some("build aborted before completion".into());
        }
    }

    fn snapshot(&self) -> BTreeMap<BuildKind, BuildReport> {
        let board = self.lock();
        BuildKind::ALL
            .iter()
            .map(|kind| (*kind, board.get(kind).cloned().unwrap_or_default()))
            .collect()
    }
}

/// Releases a claimed kind if its build is dropped before reporting, so a
/// panicked or cancelled build does not coalesce every later trigger.
struct RunGuard<'a> {
    status: &'a StatusBoard,
    kind: BuildKind,
    armed: bool,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            tracing::warn!(kind = %self.kind, "Build ended without a result");
            self.status.abort(self.kind);
        }
    }
}

/// Runs snapshot builds and writes them under the public directory.
#[derive(Debug)]
pub struct Builder {
    aggregator: Aggregator,
    public_dir: PathBuf,
    status: StatusBoard,
    notifier: SystemdNotifier,
}

impl Builder {
    pub fn new(aggregator: Aggregator, public_dir: PathBuf, notifier: SystemdNotifier) -> Self {
        Self {
            aggregator,
            public_dir,
            status: StatusBoard::default(),
            notifier,
        }
    }

    pub fn public_dir(&self) -> &Path {
        &self.public_dir
    }

    /// Run one build of `kind` to completion.
    ///
    /// Returns `None` when a build of the same kind is already in flight.
    pub async fn run(&self, kind: BuildKind) -> Option<Result<SnapshotMeta, BuildError>> {
        let run_id = Uuid::new_v4();
        if !self.status.try_begin(kind, run_id) {
            tracing::info!(%kind, "Build already in progress, skipping");
            return None;
        }
        Some(self.run_claimed(kind, run_id).await)
    }

    /// Start a build of `kind` in the background and return immediately.
    ///
    /// Returns false when the trigger was coalesced into a build that is
    /// already running.
    pub fn trigger(self: &Arc<Self>, kind: BuildKind) -> bool {
        let run_id = Uuid::new_v4();
        if !self.status.try_begin(kind, run_id) {
            tracing::info!(%kind, "Build already in progress, skipping trigger");
            return false;
        }
        let builder = Arc::clone(self);
        tokio::spawn(async move {
            // Already logged and recorded on the status board.
            let _ = builder.run_claimed(kind, run_id).await;
        });
        true
    }

    /// Latest report for every build kind.
    pub fn reports(&self) -> BTreeMap<BuildKind, BuildReport> {
        self.status.snapshot()
    }

    async fn run_claimed(&self, kind: BuildKind, run_id: Uuid) -> Result<SnapshotMeta, BuildError> {
        let span = tracing::info_span!("build", %kind, %run_id);
        let path = kind.output_path(&self.public_dir);
        let mut guard = RunGuard {
            status: &self.status,
            kind,
            armed: true,
        };

        let result = async {
            tracing::info!("Build started");
            let result = self.build_and_write(kind, &path).await;
            match &result {
                Ok(meta) => tracing::info!(
                    last_modified = meta.last_modified,
                    "{} built successfully at {}",
                    kind.file_name(),
                    path.display()
                ),
                Err(e) => tracing::error!(error = %e, "Error building {}", kind.file_name()),
            }
            result
        }
        .instrument(span)
        .await;

        self.status.finish(kind, &result);
        guard.armed = false;
        let status = match &result {
            Ok(_) => format!("{} snapshot refreshed", kind),
            Err(_) => format!("{} snapshot build failed", kind),
        };
        self.notifier.notify_status(&status);
        result
    }

    async fn build_and_write(&self, kind: BuildKind, path: &Path) -> Result<SnapshotMeta, BuildError> {
        // The snapshot is only written once every remote call has succeeded.
        let meta = match kind {
            BuildKind::Photos => {
                let library = self.aggregator.fetch_photo_library().await?;
                write_snapshot(path, &library).await?
            }
            BuildKind::Albums => {
                let library = self.aggregator.fetch_album_library().await?;
                write_snapshot(path, &library).await?
            }
        };
        Ok(meta)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use url::Url;

    use super::*;
    use crate::flickr::fake::{album, photo, FakeFlickr};
    use crate::flickr::{Credentials, RestClient};
    use crate::snapshot::model::PhotoLibrary;
    use crate::snapshot::tests::aggregator;
    use crate::snapshot::writer::Snapshot;

    fn test_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir()
            .join("flickr-snapshot-tests")
            .join(format!("builder-{}-{}", name, std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn builder(fake: Arc<FakeFlickr>, dir: &Path) -> Arc<Builder> {
        Arc::new(Builder::new(
            aggregator(fake),
            dir.to_path_buf(),
            SystemdNotifier::new(false),
        ))
    }

    async fn wait_until_idle(builder: &Builder, kind: BuildKind) -> BuildReport {
        for _ in 0..200 {
            let report = builder.reports()[&kind].clone();
            if report.state != BuildState::Running {
                return report;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("build of {kind} did not finish");
    }

    #[tokio::test]
    async fn test_successful_build_writes_snapshot() {
        let dir = test_dir("success");
        let fake = Arc::new(FakeFlickr::default().with_photos(vec![photo("1", "One")]));
        let b = builder(fake, &dir);

        let meta = b.run(BuildKind::Photos).await.unwrap().unwrap();

        let contents = std::fs::read_to_string(dir.join("gallery.json")).unwrap();
        let parsed: Snapshot<PhotoLibrary> = serde_json::from_str(&contents).unwrap();
        assert_eq!(parsed.meta, meta);
        assert!(parsed.data.contains_key("1"));

        let report = &b.reports()[&BuildKind::Photos];
        assert_eq!(report.state, BuildState::Succeeded);
        assert_eq!(report.last_modified, Some(meta.last_modified));
        assert!(report.last_error.is_none());
    }

    #[tokio::test]
    async fn test_failed_build_leaves_previous_snapshot() {
        let dir = test_dir("failed");
        let path = dir.join("gallery.json");
        let previous = "{\"meta\":{\"lastModified\":1},\"data\":{}}";
        std::fs::write(&path, previous).unwrap();

        let fake = Arc::new(
            FakeFlickr::default()
                .with_photos(vec![photo("1", "One"), photo("2", "Two")])
                .failing_sizes_for("2"),
        );
        let b = builder(fake, &dir);

        let err = b.run(BuildKind::Photos).await.unwrap().unwrap_err();
        assert!(matches!(err, BuildError::RemoteCall { .. }));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), previous);
        assert!(!dir.join("gallery.json.part").exists());

        let report = &b.reports()[&BuildKind::Photos];
        assert_eq!(report.state, BuildState::Failed);
        assert!(report.last_error.as_deref().unwrap().contains("fetching-sizes"));
    }

    #[tokio::test]
    async fn test_auth_failure_writes_nothing() {
        let dir = test_dir("auth");
        let fake = Arc::new(FakeFlickr::default().failing_auth());
        let b = builder(fake, &dir);

        let err = b.run(BuildKind::Albums).await.unwrap().unwrap_err();
        assert!(matches!(err, BuildError::Authentication(_)));
        assert!(!dir.join("albums.json").exists());
    }

    #[tokio::test]
    async fn test_album_build_writes_albums_file() {
        let dir = test_dir("albums");
        let fake = Arc::new(
            FakeFlickr::default().with_album(album("A", "Alps"), vec![photo("1", "One")]),
        );
        let b = builder(fake, &dir);

        b.run(BuildKind::Albums).await.unwrap().unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(dir.join("albums.json")).unwrap())
                .unwrap();
        assert_eq!(value["data"]["A"]["title"]["_content"], "Alps");
        assert!(!dir.join("gallery.json").exists());
    }

    #[tokio::test]
    async fn test_trigger_coalesces_same_kind() {
        let dir = test_dir("coalesce");
        let fake = Arc::new(
            FakeFlickr::default()
                .with_photos(vec![photo("1", "One")])
                .with_album(album("A", "Alps"), vec![photo("1", "One")])
                .with_auth_delay_ms(100),
        );
        let b = builder(fake.clone(), &dir);

        assert!(b.trigger(BuildKind::Photos));
        assert!(!b.trigger(BuildKind::Photos));
        assert!(b.run(BuildKind::Photos).await.is_none());
        // A different kind is not blocked.
        assert!(b.trigger(BuildKind::Albums));

        let photos = wait_until_idle(&b, BuildKind::Photos).await;
        let albums = wait_until_idle(&b, BuildKind::Albums).await;
        assert_eq!(photos.state, BuildState::Succeeded);
        assert_eq!(albums.state, BuildState::Succeeded);
        assert_eq!(fake.calls().list_user_photos, 1);
        assert_eq!(fake.calls().authenticate, 1);

        // Once finished, the same kind can be triggered again.
        assert!(b.trigger(BuildKind::Photos));
        wait_until_idle(&b, BuildKind::Photos).await;
        assert_eq!(fake.calls().list_user_photos, 2);
    }

    #[tokio::test]
    async fn test_failed_member_listing_writes_nothing() {
        let dir = test_dir("members");
        let fake = Arc::new(
            FakeFlickr::default()
                .with_album(album("A", "Alps"), vec![photo("1", "One")])
                .with_album(album("B", "Beach"), vec![photo("2", "Two")])
                .failing_members_for("B"),
        );
        let b = builder(fake.clone(), &dir);

        let err = b.run(BuildKind::Albums).await.unwrap().unwrap_err();
        assert!(err.to_string().contains("fetching-members"), "{err}");
        assert!(fake.calls().size_requests.is_empty());
        assert!(!dir.join("albums.json").exists());
        assert!(!dir.join("albums.json.part").exists());
    }

    #[tokio::test]
    async fn test_report_does_not_expose_api_key() {
        let dir = test_dir("redact");
        let client = RestClient::new(
            Url::parse("http://127.0.0.1:1/services/rest/").unwrap(),
            Some(Duration::from_secs(2)),
        )
        .unwrap();
        let credentials = Credentials {
            api_key: "TOPSECRETKEY123".into(),
            secret: "shh".into(),
            developer_id: None,
        };
        let b = Builder::new(
            Aggregator::new(Arc::new(client), credentials, "u@N01".into(), 2),
            dir,
            SystemdNotifier::new(false),
        );

        let err = b.run(BuildKind::Photos).await.unwrap().unwrap_err();
        assert!(matches!(err, BuildError::Authentication(_)));

        let json = serde_json::to_string(&b.reports()).unwrap();
        assert!(json.contains("Flickr authentication failed"), "{json}");
        assert!(!json.contains("TOPSECRETKEY123"), "{json}");
    }

    #[tokio::test]
    async fn test_panicked_build_releases_kind() {
        let dir = test_dir("panic");
        let fake = Arc::new(FakeFlickr::default().panicking_auth());
        let b = builder(fake.clone(), &dir);

        assert!(b.trigger(BuildKind::Photos));
        let report = wait_until_idle(&b, BuildKind::Photos).await;
        assert_eq!(report.state, BuildState::Failed);
        assert!(report.last_error.unwrap().contains("aborted"));

        // The kind is free again rather than stuck as running.
        assert!(b.trigger(BuildKind::Photos));
        wait_until_idle(&b, BuildKind::Photos).await;
        assert_eq!(fake.calls().authenticate, 2);
    }

    #[test]
    fn test_reports_cover_every_kind() {
        let b = builder(Arc::new(FakeFlickr::default()), Path::new("unused"));
        let reports = b.reports();
        assert_eq!(reports.len(), 2);
        assert!(reports.values().all(|r| r.state == BuildState::Idle));

        let json = serde_json::to_value(&reports).unwrap();
        assert_eq!(json["photos"]["state"], "idle");
        assert!(json["albums"]["lastError"].is_null());
    }
}
