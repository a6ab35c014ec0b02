use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use lawpulse_config::FetchConfig;
use lawpulse_core::{CoreError, Snapshot, load_snapshot_from_str};
use thiserror::Error;
use tokio::time::sleep;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to read snapshot {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("snapshot error: {0}")]
    Core(#[from] CoreError),
    #[error("no snapshot named '{0}'")]
    NotFound(String),
    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted {
        attempts: u32,
        #[source]
        last: Box<FetchError>,
    },
}

impl FetchError {
    /// I/O failures may be transient; a snapshot that does not parse will
    /// not parse on the next attempt either.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub name: String,
}

impl FetchRequest {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn fetch(&self, request: &FetchRequest) -> Result<Snapshot, FetchError>;
}

/// Reads `<dir>/<name>.json`. A name that already carries an extension is
/// used as is.
#[derive(Debug, Clone)]
pub struct FileSnapshotSource {
    dir: PathBuf,
}

impl FileSnapshotSource {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn path_for(&self, request: &FetchRequest) -> PathBuf {
        let path = self.dir.join(request.name.trim());
        if path.extension().is_some() {
            path
        } else {
            path.with_extension("json")
        }
    }
}

#[async_trait]
impl SnapshotSource for FileSnapshotSource {
    async fn fetch(&self, request: &FetchRequest) -> Result<Snapshot, FetchError> {
        let path = self.path_for(request);
        let raw = tokio::fs::read_to_string(&path)
            .await
            .map_err(|source| FetchError::Io {
                path: path.clone(),
                source,
            })?;
        let snapshot = load_snapshot_from_str(&raw)?;
        tracing::debug!(
            path = %path.display(),
            domains = snapshot.domains.len(),
            "read snapshot"
        );
        Ok(snapshot)
    }
}

/// In-memory snapshots keyed by request name.
#[derive(Debug, Clone, Default)]
pub struct StaticSnapshotSource {
    snapshots: HashMap<String, Snapshot>,
}

impl StaticSnapshotSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(mut self, name: impl Into<String>, snapshot: Snapshot) -> Self {
        self.snapshots.insert(name.into(), snapshot);
        self
    }
}

#[async_trait]
impl SnapshotSource for StaticSnapshotSource {
    async fn fetch(&self, request: &FetchRequest) -> Result<Snapshot, FetchError> {
        self.snapshots
            .get(&request.name)
            .cloned()
            .ok_or_else(|| FetchError::NotFound(request.name.clone()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestTicket {
    id: u64,
}

impl RequestTicket {
    pub fn id(self) -> u64 {
        self.id
    }
}

/// Issues increasing request ids. Only the most recently issued ticket is
/// current.
#[derive(Debug, Default)]
pub struct RequestGate {
    latest: AtomicU64,
}

impl RequestGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&self) -> RequestTicket {
        let id = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        RequestTicket { id }
    }

    pub fn is_current(&self, ticket: RequestTicket) -> bool {
        self.latest.load(Ordering::SeqCst) == ticket.id
    }

    pub fn latest(&self) -> u64 {
        self.latest.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&FetchConfig::default())
    }
}

impl From<&FetchConfig> for RetryPolicy {
    fn from(config: &FetchConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            backoff: Duration::from_millis(config.backoff_ms),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    Current(Arc<Snapshot>),
    /// A newer request was issued while this one was in flight.
    Superseded { request_id: u64 },
}

impl LoadOutcome {
    pub fn into_current(self) -> Option<Arc<Snapshot>> {
        match self {
            Self::Current(snapshot) => Some(snapshot),
            Self::Superseded { .. } => None,
        }
    }
}

/// Fetches snapshots with retry. When loads overlap, only the latest one
/// can complete as current.
pub struct SnapshotLoader<S> {
    source: S,
    gate: RequestGate,
    retry: RetryPolicy,
}

impl<S: SnapshotSource> SnapshotLoader<S> {
    pub fn new(source: S, retry: RetryPolicy) -> Self {
        Self {
            source,
            gate: RequestGate::new(),
            retry,
        }
    }

    pub fn gate(&self) -> &RequestGate {
        &self.gate
    }

    pub async fn load(&self, request: &FetchRequest) -> Result<LoadOutcome, FetchError> {
        let ticket = self.gate.issue();
        let superseded = LoadOutcome::Superseded {
            request_id: ticket.id(),
        };

        let mut attempt = 0;
        loop {
            if !self.gate.is_current(ticket) {
                return Ok(superseded);
            }
            attempt += 1;

            match self.source.fetch(request).await {
                Ok(snapshot) => {
                    if !self.gate.is_current(ticket) {
                        tracing::debug!(
                            request_id = ticket.id(),
                            latest = self.gate.latest(),
                            "discarding superseded snapshot"
                        );
                        return Ok(superseded);
                    }
                    return Ok(LoadOutcome::Current(Arc::new(snapshot)));
                }
                Err(_) if !self.gate.is_current(ticket) => return Ok(superseded),
                Err(err) if err.is_retryable() && attempt < self.retry.max_attempts => {
                    tracing::warn!(
                        request_id = ticket.id(),
                        attempt,
                        max_attempts = self.retry.max_attempts,
                        error = %err,
                        "snapshot fetch failed, retrying"
                    );
                    sleep(self.retry.backoff * attempt).await;
                }
                Err(err) if err.is_retryable() => {
                    return Err(FetchError::Exhausted {
                        attempts: attempt,
                        last: Box::new(err),
                    });
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicU32;

    use lawpulse_core::load_snapshot_from_value;
    use serde_json::json;
    use tempfile::tempdir;

    use super::*;

    fn snapshot(domain: &str) -> Snapshot {
        let mut root = serde_json::Map::new();
        root.insert(
            domain.to_owned(),
            json!({ "news": { "daily_timeline": { "2025-03-01": { "count": 1 } } } }),
        );
        load_snapshot_from_value(&serde_json::Value::Object(root)).expect("snapshot")
    }

    fn quick_retry(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            backoff: Duration::from_millis(1),
        }
    }

    struct FlakySource {
        failures: u32,
        calls: AtomicU32,
    }

    #[async_trait]
    impl SnapshotSource for FlakySource {
        async fn fetch(&self, request: &FetchRequest) -> Result<Snapshot, FetchError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                return Err(FetchError::Io {
                    path: PathBuf::from(&request.name),
                    source: std::io::Error::other("temporarily unavailable"),
                });
            }
            Ok(snapshot(&request.name))
        }
    }

    struct DelayedSource;

    #[async_trait]
    impl SnapshotSource for DelayedSource {
        async fn fetch(&self, request: &FetchRequest) -> Result<Snapshot, FetchError> {
            if request.name == "slow" {
                sleep(Duration::from_millis(40)).await;
            }
            Ok(snapshot(&request.name))
        }
    }

    #[test]
    fn gate_tracks_only_the_latest_ticket() {
        let gate = RequestGate::new();
        let first = gate.issue();
        assert!(gate.is_current(first));

        let second = gate.issue();
        assert!(!gate.is_current(first));
        assert!(gate.is_current(second));
        assert!(second.id() > first.id());
    }

    #[tokio::test]
    async fn file_source_reads_named_json() {
        let temp = tempdir().expect("tempdir");
        std::fs::write(
            temp.path().join("latest.json"),
            r#"{ "privacy": { "news": { "daily_timeline": { "2025-03-01": { "count": 4 } } } } }"#,
        )
        .expect("write snapshot");
        let source = FileSnapshotSource::new(temp.path());

        let loaded = source
            .fetch(&FetchRequest::new("latest"))
            .await
            .expect("fetch");
        assert!(loaded.domain("privacy").is_some());

        let missing = source
            .fetch(&FetchRequest::new("absent"))
            .await
            .expect_err("missing file");
        assert!(missing.is_retryable());
    }

    #[tokio::test]
    async fn malformed_snapshot_is_not_retried() {
        let temp = tempdir().expect("tempdir");
        std::fs::write(temp.path().join("broken.json"), "{ not json").expect("write");
        let loader = SnapshotLoader::new(FileSnapshotSource::new(temp.path()), quick_retry(3));

        let error = loader
            .load(&FetchRequest::new("broken"))
            .await
            .expect_err("malformed");
        assert!(matches!(error, FetchError::Core(CoreError::Json(_))));
    }

    #[tokio::test]
    async fn transient_failures_are_retried() {
        let source = FlakySource {
            failures: 2,
            calls: AtomicU32::new(0),
        };
        let loader = SnapshotLoader::new(source, quick_retry(3));

        let outcome = loader
            .load(&FetchRequest::new("privacy"))
            .await
            .expect("load");
        let snapshot = outcome.into_current().expect("current");
        assert!(snapshot.domain("privacy").is_some());
    }

    #[tokio::test]
    async fn retries_stop_at_max_attempts() {
        let source = FlakySource {
            failures: 10,
            calls: AtomicU32::new(0),
        };
        let loader = SnapshotLoader::new(source, quick_retry(2));

        let error = loader
            .load(&FetchRequest::new("privacy"))
            .await
            .expect_err("exhausted");
        assert!(matches!(error, FetchError::Exhausted { attempts: 2, .. }));
        assert_eq!(loader.source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn stale_load_never_wins() {
        let loader = SnapshotLoader::new(DelayedSource, quick_retry(1));

        let slow_request = FetchRequest::new("slow");
        let fast_request = FetchRequest::new("fast");
        let (slow, fast) = tokio::join!(loader.load(&slow_request), loader.load(&fast_request));

        let fast = fast.expect("fast load").into_current().expect("fast is current");
        assert!(fast.domain("fast").is_some());
        assert_eq!(
            slow.expect("slow load"),
            LoadOutcome::Superseded { request_id: 1 }
        );
    }

    #[tokio::test]
    async fn static_source_reports_unknown_names() {
        let source = StaticSnapshotSource::new().with_snapshot("privacy", snapshot("privacy"));

        assert!(source.fetch(&FetchRequest::new("privacy")).await.is_ok());
        let error = source
            .fetch(&FetchRequest::new("child"))
            .await
            .expect_err("unknown");
        assert!(matches!(error, FetchError::NotFound(name) if name == "child"));
    }
}
