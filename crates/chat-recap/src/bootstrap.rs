use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

// ── Logging bootstrap ──────────────────────────────────────────────────────────

/// Initialise the global `tracing` subscriber on stderr.
///
/// `log_level` is mapped to a [`tracing_subscriber::EnvFilter`] directive.
/// Falls back to `"info"` if the level string is not recognised. Stdout is
/// left for the report itself.
pub fn setup_logging(log_level: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::try_new(filter_directive(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false);

    tracing_subscriber::registry()
        .with(filter)
        .with(subscriber)
        .try_init()?;

    Ok(())
}

/// Map a `--log-level` name onto a tracing filter directive.
fn filter_directive(log_level: &str) -> String {
    let upper = log_level.to_uppercase();
    match upper.as_str() {
        "DEBUG" => "debug".to_string(),
        "INFO" => "info".to_string(),
        "WARNING" => "warn".to_string(),
        "ERROR" | "CRITICAL" => "error".to_string(),
        _ => log_level.to_lowercase(),
    }
}

// ── Data-root discovery ────────────────────────────────────────────────────────

/// Well-known user data roots under `home`, in lookup order.
pub fn data_root_candidates(home: &Path) -> Vec<PathBuf> {
    vec![
        home.join("SillyTavern").join("data").join("default-user"),
        home.join(".local")
            .join("share")
            .join("SillyTavern")
            .join("data")
            .join("default-user"),
        home.join("SillyTavern").join("public"),
    ]
}

/// First candidate under `home` that is a directory.
pub fn discover_data_root_in(home: &Path) -> Option<PathBuf> {
    data_root_candidates(home).into_iter().find(|p| p.is_dir())
}

/// The explicit root when given, otherwise the first well-known location
/// under the home directory.
pub fn resolve_data_root(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(root) = explicit {
        return Some(root.to_path_buf());
    }
    let home = dirs::home_dir()?;
    let found = discover_data_root_in(&home);
    if let Some(root) = &found {
        tracing::debug!("Discovered data root at {}", root.display());
    }
    found
}

// ── Tests ──────────────────────────────────────────────────────────────────────
