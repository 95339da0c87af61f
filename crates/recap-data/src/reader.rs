//! Line-delimited chat log loading.
//!
//! Each chat file holds one JSON value per line. The first parsed line may be
//! a header carrying `chat_metadata`; every other parsed line is a message.

use std::io::BufRead;
use std::path::Path;

use recap_core::error::{RecapError, Result};
use recap_core::models::MessageRecord;
use recap_core::timestamp::TimestampInput;
use serde_json::Value;
use tracing::{debug, warn};

/// Timestamp-bearing message fields, in lookup order.
pub const TIMESTAMP_FIELDS: &[&str] = &["send_date", "gen_finished", "gen_started"];

/// Field whose presence on the first record marks it as the file header.
pub const METADATA_MARKER: &str = "chat_metadata";

// ── ChatLog ───────────────────────────────────────────────────────────────────

/// Parsed contents of one chat file.
#[derive(Debug, Clone, Default)]
pub struct ChatLog {
    /// The header record, when the file starts with one.
    pub metadata: Option<Value>,
    /// Message candidates in file order.
    pub messages: Vec<MessageRecord>,
}

impl ChatLog {
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Read one chat file.
///
/// Never fails: a missing or unreadable file is logged and yields an empty
/// [`ChatLog`]. Blank lines and lines that are not valid JSON are skipped.
pub fn read_chat_log(path: &Path) -> ChatLog {
    match open_chat_log(path) {
        Ok(log) => log,
        Err(e) => {
            warn!("{}", e);
            ChatLog::default()
        }
    }
}

/// Strict variant of [`read_chat_log`] that reports a file that cannot be
/// opened. Problems inside the file are still skipped line by line.
pub fn open_chat_log(path: &Path) -> Result<ChatLog> {
    let file = std::fs::File::open(path).map_err(|source| RecapError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(parse_lines(std::io::BufReader::new(file), path))
}

/// Build a [`MessageRecord`] from one parsed line.
pub fn message_from_value(data: &Value) -> MessageRecord {
    let is_human = data.get("is_user").and_then(Value::as_bool) == Some(true);
    let text = data
        .get("mes")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let token_count = data
        .get("extra")
        .and_then(|extra| extra.get("token_count"))
        .and_then(token_count_from_value);

    MessageRecord {
        is_human,
        text,
        timestamp: TimestampInput::from_fields(data, TIMESTAMP_FIELDS),
        token_count,
    }
}

// ── Internal helpers ──────────────────────────────────────────────────────────

fn parse_lines<R: BufRead>(reader: R, path: &Path) -> ChatLog {
    let mut log = ChatLog::default();
    let mut first_record = true;
    let mut skipped = 0u64;

    for line_result in reader.lines() {
        let line = match line_result {
            Ok(l) => l,
            Err(e) => {
                // Invalid UTF-8 or a read error mid-file: drop this line only.
                debug!("Unreadable line in {}: {}", path.display(), e);
                skipped += 1;
                continue;
            }
        };
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let data: Value = match serde_json::from_str(trimmed) {
            Ok(v) => v,
            Err(e) => {
                debug!("Failed to parse JSON line in {}: {}", path.display(), e);
                skipped += 1;
                continue;
            }
        };

        if first_record && data.get(METADATA_MARKER).is_some() {
            log.metadata = Some(data);
            first_record = false;
            continue;
        }
        first_record = false;

        log.messages.push(message_from_value(&data));
    }

    debug!(
        "File {}: {} messages, {} lines skipped, header: {}",
        path.display(),
        log.messages.len(),
        skipped,
        log.metadata.is_some(),
    );

    log
}

/// Positive token counts only; fractional counts are truncated and floats
/// beyond the `u64` range are dropped.
fn token_count_from_value(value: &Value) -> Option<u64> {
    if let Some(n) = value.as_u64() {
        return (n > 0).then_some(n);
    }
    value
        .as_f64()
        .filter(|f| f.is_finite() && *f >= 1.0 && *f < u64::MAX as f64)
        .map(|f| f as u64)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
