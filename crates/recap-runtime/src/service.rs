//! The report generation boundary.
//!
//! [`ReportService::generate`] is the only way a consumer obtains a report:
//! it validates the request, answers from the cache when it can, and
//! otherwise scans the data root. Per-file and per-line problems are
//! contained below this layer; a run either returns a complete report or a
//! [`RecapError`], and only complete reports are cached.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::Utc;
use recap_core::error::{RecapError, Result};
use recap_core::models::{AnnualReport, ReportOptions};
use recap_data::analysis::build_report_from_logs;
use recap_data::discovery::{DataDirLayout, SourceEnumerator};
use recap_data::reader::read_chat_log;
use serde::Serialize;
use tokio::task::JoinError;

use crate::cache::ReportCache;

/// Name reported by [`ReportService::health`].
pub const SERVICE_NAME: &str = "chat-recap";

// ── Health ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub name: &'static str,
    pub version: &'static str,
}

// ── ReportService ─────────────────────────────────────────────────────────────

pub struct ReportService {
    cache: Arc<ReportCache>,
    enumerator: Arc<dyn SourceEnumerator>,
    options: ReportOptions,
    scans: AtomicUsize,
}

impl ReportService {
    /// A service over the standard data directory layout with a default
    /// cache.
    pub fn new(options: ReportOptions) -> Self {
        Self::with_parts(
            Arc::new(ReportCache::default()),
            Arc::new(DataDirLayout),
            options,
        )
    }

    pub fn with_parts(
        cache: Arc<ReportCache>,
        enumerator: Arc<dyn SourceEnumerator>,
        options: ReportOptions,
    ) -> Self {
        Self {
            cache,
            enumerator,
            options,
            scans: AtomicUsize::new(0),
        }
    }

    pub fn options(&self) -> &ReportOptions {
        &self.options
    }

    pub fn cache(&self) -> &Arc<ReportCache> {
        &self.cache
    }

    /// Produce the report for `year` under `root`.
    ///
    /// # Errors
    /// - [`RecapError::MissingRoot`] when `root` is absent or empty.
    /// - [`RecapError::Generation`] when the scan fails unexpectedly. Nothing
    ///   is cached in that case.
    pub async fn generate(&self, root: Option<&Path>, year: i32) -> Result<Arc<AnnualReport>> {
        let root = match root {
            Some(r) if !r.as_os_str().is_empty() => r,
            _ => return Err(RecapError::MissingRoot),
        };

        if let Some(report) = self.cache.get(root, year) {
            tracing::debug!(root = %root.display(), year, "serving cached report");
            return Ok(report);
        }

        tracing::info!(root = %root.display(), year, "generating annual report");
        let report = Arc::new(self.scan(root, year).await?);
        self.cache.put(root, year, Arc::clone(&report));
        Ok(report)
    }

    /// Drop every cached report. Returns how many were removed.
    pub fn clear_cache(&self) -> usize {
        self.cache.clear()
    }

    pub fn health(&self) -> Health {
        Health {
            status: "ok",
            name: SERVICE_NAME,
            version: env!("CARGO_PKG_VERSION"),
        }
    }

    /// Number of full scans run so far; cache hits do not count.
    pub fn scan_count(&self) -> usize {
        self.scans.load(Ordering::SeqCst)
    }

    // ── Private ───────────────────────────────────────────────────────────────

    async fn scan(&self, root: &Path, year: i32) -> Result<AnnualReport> {
        self.scans.fetch_add(1, Ordering::SeqCst);

        let enumerator = Arc::clone(&self.enumerator);
        let root_buf = root.to_path_buf();
        let sources = tokio::task::spawn_blocking(move || enumerator.all_chats(&root_buf))
            .await
            .map_err(generation_failed)?;
        tracing::debug!(sources = sources.len(), "chat sources enumerated");

        // Files are independent; read them all at once and fold in source
        // order afterwards.
        let reads: Vec<_> = sources
            .iter()
            .map(|source| {
                let path = source.path.clone();
                tokio::task::spawn_blocking(move || read_chat_log(&path))
            })
            .collect();

        let mut logs = Vec::with_capacity(reads.len());
        for read in reads {
            logs.push(read.await.map_err(generation_failed)?);
        }

        let options = self.options.clone();
        let generated_at = Utc::now();
        tokio::task::spawn_blocking(move || {
            build_report_from_logs(sources.iter().zip(logs), year, &options, generated_at)
        })
        .await
        .map_err(generation_failed)
    }
}

impl std::fmt::Debug for ReportService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReportService")
            .field("cache", &self.cache)
            .field("options", &self.options)
            .field("scans", &self.scan_count())
            .finish()
    }
}

fn generation_failed(e: JoinError) -> RecapError {
    let reason = if e.is_panic() {
        let payload = e.into_panic();
        payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string())
    } else {
        e.to_string()
    };
    tracing::warn!(error = %reason, "report generation failed");
    RecapError::Generation(reason)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::tests::ManualClock;
    use recap_data::discovery::ChatSource;
    use std::io::Write;
    use std::path::PathBuf;
    use std::time::Duration;
    use tempfile::TempDir;

    // ── Helpers ───────────────────────────────────────────────────────────────

    /// Serves a fixed list of sources regardless of root.
    struct FixedSources(Vec<ChatSource>);

    impl SourceEnumerator for FixedSources {
        fn character_chats(&self, _root: &Path) -> Vec<ChatSource> {
            self.0.clone()
        }

        fn group_chats(&self, _root: &Path) -> Vec<ChatSource> {
            Vec::new()
        }
    }

    struct PanickingSources;

    impl SourceEnumerator for PanickingSources {
        fn character_chats(&self, _root: &Path) -> Vec<ChatSource> {
            panic!("directory listing exploded");
        }

        fn group_chats(&self, _root: &Path) -> Vec<ChatSource> {
            Vec::new()
        }
    }

    fn write_chat(dir: &Path, name: &str, dates: &[&str]) -> PathBuf {
        let path = dir.join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        for (i, date) in dates.iter().enumerate() {
            let line = serde_json::json!({"is_user": i % 2 == 0, "mes": "hi", "send_date": date});
            writeln!(file, "{}", line).unwrap();
        }
        path
    }

    fn service(
        enumerator: Arc<dyn SourceEnumerator>,
        ttl_secs: u64,
    ) -> (ReportService, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let cache = Arc::new(ReportCache::new(Duration::from_secs(ttl_secs), clock.clone()));
        (
            ReportService::with_parts(cache, enumerator, ReportOptions::default()),
            clock,
        )
    }

    // ── generate ──────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_missing_root_rejected() {
        let (svc, _) = service(Arc::new(FixedSources(Vec::new())), 300);
        assert!(matches!(
            svc.generate(None, 2024).await,
            Err(RecapError::MissingRoot)
        ));
        assert!(matches!(
            svc.generate(Some(Path::new("")), 2024).await,
            Err(RecapError::MissingRoot)
        ));
        assert_eq!(svc.scan_count(), 0);
    }

    #[tokio::test]
    async fn test_cache_hit_within_ttl_and_rescan_after() {
        let dir = TempDir::new().unwrap();
        let chat = write_chat(dir.path(), "a.jsonl", &["2024-01-01T10:00:00Z"]);
        let sources = vec![ChatSource::character("Alice", chat)];
        let (svc, clock) = service(Arc::new(FixedSources(sources)), 300);

        let first = svc.generate(Some(dir.path()), 2024).await.unwrap();
        clock.advance(Duration::from_secs(120));
        let second = svc.generate(Some(dir.path()), 2024).await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(svc.scan_count(), 1);

        clock.advance(Duration::from_secs(300));
        let third = svc.generate(Some(dir.path()), 2024).await.unwrap();
        assert_eq!(svc.scan_count(), 2);
        assert_eq!(third.total_messages, first.total_messages);
    }

    #[tokio::test]
    async fn test_panicking_scan_is_contained_and_not_cached() {
        let (svc, _) = service(Arc::new(PanickingSources), 300);
        let dir = TempDir::new().unwrap();

        let err = svc.generate(Some(dir.path()), 2024).await.unwrap_err();
        match err {
            RecapError::Generation(reason) => assert!(reason.contains("exploded")),
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(svc.cache().is_empty());
    }

    #[tokio::test]
    async fn test_clear_cache_forces_rescan() {
        let dir = TempDir::new().unwrap();
        let (svc, _) = service(Arc::new(FixedSources(Vec::new())), 300);

        svc.generate(Some(dir.path()), 2024).await.unwrap();
        assert_eq!(svc.clear_cache(), 1);
        svc.generate(Some(dir.path()), 2024).await.unwrap();
        assert_eq!(svc.scan_count(), 2);
    }

    #[tokio::test]
    async fn test_sources_folded_in_order() {
        let dir = TempDir::new().unwrap();
        let a = write_chat(dir.path(), "a.jsonl", &["2024-05-01T10:00:00Z"]);
        let b = write_chat(dir.path(), "b.jsonl", &["2024-05-01T10:00:00Z"]);
        let sources = vec![
            ChatSource::character("First", a),
            ChatSource::character("Second", b),
        ];
        let (svc, _) = service(Arc::new(FixedSources(sources)), 300);

        let report = svc.generate(Some(dir.path()), 2024).await.unwrap();
        // Same instant in both files: the earlier source keeps first chat.
        assert_eq!(report.first_chat.as_ref().unwrap().partner, "First");
        assert_eq!(report.partners[0].name, "First");
    }

    #[test]
    fn test_health() {
        let svc = ReportService::new(ReportOptions::default());
        let health = svc.health();
        assert_eq!(health.status, "ok");
        assert_eq!(health.name, "chat-recap");
        assert!(!health.version.is_empty());
    }
}
