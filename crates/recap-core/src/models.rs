use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::timestamp::TimestampInput;

/// Default number of entries kept in [`AnnualReport::word_frequency`].
pub const DEFAULT_TOP_WORDS: usize = 200;

/// Characters of a message kept in [`FirstChat::message`].
pub const FIRST_CHAT_EXCERPT_CHARS: usize = 200;

/// Characters of a message kept in [`LongestMessage::content`].
pub const LONGEST_MESSAGE_EXCERPT_CHARS: usize = 500;

/// Knobs that shape a single report run.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportOptions {
    /// Zone used for year membership, histograms and day keys.
    pub timezone: Tz,
    /// Maximum number of word-frequency entries in the report.
    pub top_words: usize,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            timezone: Tz::UTC,
            top_words: DEFAULT_TOP_WORDS,
        }
    }
}

/// One chat line, as handed from the log reader to the aggregator.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageRecord {
    /// `true` only when the line was written by the human party.
    pub is_human: bool,
    /// Message body; empty when the line had none.
    pub text: String,
    /// First usable timestamp-bearing field, if any.
    pub timestamp: Option<TimestampInput>,
    /// Attached token usage, when the frontend recorded one.
    pub token_count: Option<u64>,
}

/// Per-partner rollup (a character or a `[group] …` label).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartnerAggregate {
    pub name: String,
    pub message_count: u64,
    pub human_message_count: u64,
    pub other_message_count: u64,
    pub session_count: u64,
    #[serde(with = "crate::time_utils::iso_millis")]
    pub first_message_at: DateTime<Utc>,
    #[serde(with = "crate::time_utils::iso_millis")]
    pub last_message_at: DateTime<Utc>,
    /// `round(message_count / session_count)`; absent until a session closes.
    pub average_turns_per_session: Option<u64>,
}

impl PartnerAggregate {
    /// Start an aggregate whose first and last message are both `at`.
    pub fn new(name: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            message_count: 0,
            human_message_count: 0,
            other_message_count: 0,
            session_count: 0,
            first_message_at: at,
            last_message_at: at,
            average_turns_per_session: None,
        }
    }

    /// Count one in-year message and widen the first/last window.
    ///
    /// Both bounds move only on a strict comparison.
    pub fn record_message(&mut self, is_human: bool, at: DateTime<Utc>) {
        self.message_count += 1;
        if is_human {
            self.human_message_count += 1;
        } else {
            self.other_message_count += 1;
        }
        if at < self.first_message_at {
            self.first_message_at = at;
        }
        if at > self.last_message_at {
            self.last_message_at = at;
        }
    }

    /// Derive [`Self::average_turns_per_session`] from the final counters.
    pub fn finalize_turns(&mut self) {
        if self.session_count > 0 {
            let avg = self.message_count as f64 / self.session_count as f64;
            self.average_turns_per_session = Some(avg.round() as u64);
        }
    }
}

/// Earliest in-year message across every partner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FirstChat {
    pub partner: String,
    #[serde(with = "crate::time_utils::iso_millis")]
    pub date: DateTime<Utc>,
    /// Leading excerpt of the message text.
    pub message: String,
}

/// Longest human-authored message of the year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LongestMessage {
    /// Length in characters of the full message.
    pub length: u64,
    /// Leading excerpt of the message text.
    pub content: String,
    #[serde(with = "crate::time_utils::iso_millis")]
    pub date: DateTime<Utc>,
}

/// Busiest calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeakDay {
    pub date: NaiveDate,
    pub count: u64,
}

/// Messages on one calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyCount {
    pub date: NaiveDate,
    pub count: u64,
}

/// One row of the word-frequency ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordCount {
    pub word: String,
    pub count: u64,
}

/// The finished, immutable statistics for one calendar year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnualReport {
    pub year: i32,
    #[serde(with = "crate::time_utils::iso_millis")]
    pub generated_at: DateTime<Utc>,
    pub total_sessions: u64,
    pub total_messages: u64,
    pub human_messages: u64,
    pub other_messages: u64,
    pub total_tokens: u64,
    /// Messages per local hour of day, `0..24`.
    pub hourly: [u64; 24],
    /// Messages per weekday, Sunday first.
    pub weekday: [u64; 7],
    /// Messages per month, January first.
    pub monthly: [u64; 12],
    /// Ascending by date; only days with at least one message.
    pub daily_stats: Vec<DailyCount>,
    /// Non-whitespace characters written by the human party.
    pub human_char_count: u64,
    /// Non-whitespace characters written by everyone else.
    pub other_char_count: u64,
    pub first_chat: Option<FirstChat>,
    pub longest_message: Option<LongestMessage>,
    pub peak_day: Option<PeakDay>,
    pub longest_streak: u32,
    /// Descending by message count.
    pub partners: Vec<PartnerAggregate>,
    /// Descending by count; ties keep first-encountered order.
    pub word_frequency: Vec<WordCount>,
    /// Mean human message length, rounded.
    pub average_message_length: u64,
    pub active_days: u32,
}

impl AnnualReport {
    /// Check the counting invariants every finished report must satisfy.
    ///
    /// Totals split exactly into human and other messages, and each histogram
    /// as well as the daily map sums back to the total.
    pub fn is_consistent(&self) -> bool {
        let total = self.total_messages;
        total == self.human_messages + self.other_messages
            && self.hourly.iter().sum::<u64>() == total
            && self.weekday.iter().sum::<u64>() == total
            && self.monthly.iter().sum::<u64>() == total
            && self.daily_stats.iter().map(|d| d.count).sum::<u64>() == total
            && self.daily_stats.iter().filter(|d| d.count > 0).count() == self.active_days as usize
    }

    /// Look up a partner rollup by label.
    pub fn partner(&self, name: &str) -> Option<&PartnerAggregate> {
        self.partners.iter().find(|p| p.name == name)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
