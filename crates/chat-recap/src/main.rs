mod bootstrap;
mod summary;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use clap::Parser;
use recap_core::error::RecapError;
use recap_core::settings::Settings;
use recap_data::discovery::DataDirLayout;
use recap_runtime::cache::{ReportCache, SystemClock};
use recap_runtime::service::ReportService;

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::parse();

    bootstrap::setup_logging(settings.effective_log_level())?;

    tracing::info!("chat-recap v{} starting", env!("CARGO_PKG_VERSION"));

    let options = settings.report_options();
    let year = settings.target_year(&options);
    tracing::info!(
        "Year: {}, Timezone: {}, Top words: {}",
        year,
        options.timezone,
        options.top_words
    );

    let data_root = bootstrap::resolve_data_root(settings.data_root.as_deref());
    if data_root.is_none() {
        tracing::warn!("No data root given and none found under the home directory");
    }

    let cache = Arc::new(ReportCache::new(
        Duration::from_secs(settings.cache_ttl_secs),
        Arc::new(SystemClock),
    ));
    let service = ReportService::with_parts(cache, Arc::new(DataDirLayout), options);

    let report = service
        .generate(data_root.as_deref(), year)
        .await
        .map_err(|e| match e {
            RecapError::MissingRoot => {
                anyhow!("{}: pass --data-root or set RECAP_DATA_ROOT", e)
            }
            other => anyhow::Error::new(other),
        })?;

    match settings.format.as_str() {
        "summary" => print!("{}", summary::render(&report)),
        _ => {
            let json = if settings.pretty {
                serde_json::to_string_pretty(&*report)?
            } else {
                serde_json::to_string(&*report)?
            };
            println!("{}", json);
        }
    }

    Ok(())
}
