use clap::Parser;
use std::path::PathBuf;

use crate::models::{ReportOptions, DEFAULT_TOP_WORDS};
use crate::time_utils::{current_year, resolve_timezone};

/// Default lifetime of a cached report (five minutes).
pub const DEFAULT_CACHE_TTL_SECS: u64 = 300;

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Year-in-review statistics for a chat-log corpus
#[derive(Parser, Debug, Clone)]
#[command(
    name = "chat-recap",
    about = "Year-in-review statistics for a chat-log corpus",
    version
)]
pub struct Settings {
    /// User data root (contains characters/, chats/, groups/, group chats/)
    #[arg(long, env = "RECAP_DATA_ROOT")]
    pub data_root: Option<PathBuf>,

    /// Calendar year to summarise (defaults to the current year)
    #[arg(long)]
    pub year: Option<i32>,

    /// Timezone for day and hour buckets (auto-detected if not specified)
    #[arg(long, default_value = "auto")]
    pub timezone: String,

    /// Number of words kept in the frequency ranking
    #[arg(long, default_value_t = DEFAULT_TOP_WORDS as u32, value_parser = clap::value_parser!(u32).range(1..=10_000))]
    pub top_words: u32,

    /// Seconds a generated report stays cached
    #[arg(long, default_value_t = DEFAULT_CACHE_TTL_SECS)]
    pub cache_ttl_secs: u64,

    /// Output format
    #[arg(long, default_value = "json", value_parser = ["json", "summary"])]
    pub format: String,

    /// Pretty-print JSON output
    #[arg(long)]
    pub pretty: bool,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"])]
    pub log_level: String,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}

impl Settings {
    /// Library-side options derived from the CLI flags.
    pub fn report_options(&self) -> ReportOptions {
        ReportOptions {
            timezone: resolve_timezone(&self.timezone),
            top_words: self.top_words as usize,
        }
    }

    /// The requested year, or the current year in the configured zone.
    pub fn target_year(&self, options: &ReportOptions) -> i32 {
        self.year.unwrap_or_else(|| current_year(options.timezone))
    }

    /// `--debug` wins over `--log-level`.
    pub fn effective_log_level(&self) -> &str {
        if self.debug {
            "DEBUG"
        } else {
            &self.log_level
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::Tz;

    fn parse(args: &[&str]) -> Settings {
        let mut full = vec!["chat-recap"];
        full.extend_from_slice(args);
        Settings::parse_from(full)
    }

    #[test]
    fn test_defaults() {
        let s = parse(&[]);
        assert_eq!(s.timezone, "auto");
        assert_eq!(s.top_words, 200);
        assert_eq!(s.cache_ttl_secs, 300);
        assert_eq!(s.format, "json");
        assert!(!s.pretty);
        assert_eq!(s.effective_log_level(), "INFO");
    }

    #[test]
    fn test_explicit_flags() {
        let s = parse(&[
            "--data-root",
            "/srv/st/default-user",
            "--year",
            "2024",
            "--timezone",
            "Asia/Shanghai",
            "--top-words",
            "50",
            "--format",
            "summary",
        ]);
        assert_eq!(s.data_root, Some(PathBuf::from("/srv/st/default-user")));
        assert_eq!(s.year, Some(2024));
        assert_eq!(s.format, "summary");

        let options = s.report_options();
        assert_eq!(options.timezone, Tz::Asia__Shanghai);
        assert_eq!(options.top_words, 50);
        assert_eq!(s.target_year(&options), 2024);
    }

    #[test]
    fn test_invalid_format_rejected() {
        let result = Settings::try_parse_from(["chat-recap", "--format", "xml"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_top_words_rejected() {
        let result = Settings::try_parse_from(["chat-recap", "--top-words", "0"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_debug_overrides_log_level() {
        let s = parse(&["--log-level", "ERROR", "--debug"]);
        assert_eq!(s.effective_log_level(), "DEBUG");
    }

    #[test]
    fn test_unknown_timezone_falls_back_to_utc() {
        let s = parse(&["--timezone", "Nowhere/Special"]);
        assert_eq!(s.report_options().timezone, Tz::UTC);
    }
}
