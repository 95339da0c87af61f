//! Report pipeline: fold every source's log, finish the report.

use chrono::{DateTime, Utc};
use recap_core::models::{AnnualReport, ReportOptions};
use tracing::info;

use crate::aggregator::AnnualAggregator;
use crate::discovery::{ChatSource, SourceKind};
use crate::reader::ChatLog;

/// Fold already-read logs, in iteration order, into a finished report.
///
/// Callers that read files concurrently must still pass the logs in a fixed
/// source order so first-seen tie-breaks stay reproducible.
pub fn build_report_from_logs<'a, I>(
    logs: I,
    year: i32,
    options: &ReportOptions,
    generated_at: DateTime<Utc>,
) -> AnnualReport
where
    I: IntoIterator<Item = (&'a ChatSource, ChatLog)>,
{
    let load_start = std::time::Instant::now();
    let mut aggregator = AnnualAggregator::new(year, options.clone());
    let mut files = 0usize;
    let mut group_files = 0usize;

    for (source, log) in logs {
        files += 1;
        if source.kind == SourceKind::Group {
            group_files += 1;
        }
        aggregator.ingest_session(&source.label, &log.messages);
    }

    let report = aggregator.finish(generated_at);
    info!(
        "Built {} report from {} files ({} group): {} messages in {} sessions across {} partners ({:.3}s)",
        year,
        files,
        group_files,
        report.total_messages,
        report.total_sessions,
        report.partners.len(),
        load_start.elapsed().as_secs_f64(),
    );
    report
}

// ── Tests ─────────────────────────────────────────────────────────────────────
