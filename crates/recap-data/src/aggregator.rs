//! Single-pass aggregation of chat messages into an [`AnnualReport`].
//!
//! The aggregator is fed one session (the messages of one chat file) at a
//! time. Feeding order matters only for first-seen tie-breaks: sessions must
//! arrive in a fixed order and messages within a session in file order.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, NaiveDate, Utc};
use recap_core::models::{
    AnnualReport, FirstChat, LongestMessage, MessageRecord, PartnerAggregate, ReportOptions,
    FIRST_CHAT_EXCERPT_CHARS, LONGEST_MESSAGE_EXCERPT_CHARS,
};
use recap_core::time_utils::CalendarSlot;
use recap_core::timestamp::TimestampNormalizer;
use tracing::debug;

use crate::finalizer;
use crate::tokenizer::{self, FrequencyTable};

// ── AnnualAggregator ──────────────────────────────────────────────────────────

/// Running state for one report run.
#[derive(Debug, Clone)]
pub struct AnnualAggregator {
    year: i32,
    options: ReportOptions,
    normalizer: TimestampNormalizer,

    total_sessions: u64,
    total_messages: u64,
    human_messages: u64,
    other_messages: u64,
    total_tokens: u64,

    hourly: [u64; 24],
    weekday: [u64; 7],
    monthly: [u64; 12],
    daily: BTreeMap<NaiveDate, u64>,

    human_chars: u64,
    other_chars: u64,
    human_length_sum: u64,
    human_length_count: u64,
    words: FrequencyTable,

    first_chat: Option<FirstChat>,
    longest_message: Option<LongestMessage>,

    /// Insertion-ordered partner rollups, looked up through `partner_index`.
    partners: Vec<PartnerAggregate>,
    partner_index: HashMap<String, usize>,
}

impl AnnualAggregator {
    pub fn new(year: i32, options: ReportOptions) -> Self {
        let normalizer = TimestampNormalizer::new(options.timezone);
        Self::with_normalizer(year, options, normalizer)
    }

    /// Use a specific normalizer, e.g. one with a pinned default year.
    pub fn with_normalizer(
        year: i32,
        options: ReportOptions,
        normalizer: TimestampNormalizer,
    ) -> Self {
        Self {
            year,
            options,
            normalizer,
            total_sessions: 0,
            total_messages: 0,
            human_messages: 0,
            other_messages: 0,
            total_tokens: 0,
            hourly: [0; 24],
            weekday: [0; 7],
            monthly: [0; 12],
            daily: BTreeMap::new(),
            human_chars: 0,
            other_chars: 0,
            human_length_sum: 0,
            human_length_count: 0,
            words: FrequencyTable::new(),
            first_chat: None,
            longest_message: None,
            partners: Vec::new(),
            partner_index: HashMap::new(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn total_messages(&self) -> u64 {
        self.total_messages
    }

    /// Fold one session for `partner` into the running totals.
    ///
    /// Messages whose timestamp is missing, unreadable or outside the target
    /// year are dropped. Returns the number of messages kept; the session is
    /// counted only when that number is non-zero.
    pub fn ingest_session(&mut self, partner: &str, messages: &[MessageRecord]) -> u64 {
        let mut kept = 0u64;
        for message in messages {
            let Some(at) = message
                .timestamp
                .as_ref()
                .and_then(|raw| self.normalizer.normalize(raw))
            else {
                continue;
            };
            let slot = CalendarSlot::of(at, self.options.timezone);
            if slot.year != self.year {
                continue;
            }
            self.record_message(partner, message, at, slot);
            kept += 1;
        }

        if kept > 0 {
            self.total_sessions += 1;
            if let Some(&i) = self.partner_index.get(partner) {
                self.partners[i].session_count += 1;
            }
        }

        debug!(
            "Session for {}: {} of {} messages in {}",
            partner,
            kept,
            messages.len(),
            self.year
        );
        kept
    }

    /// Derive the streak, peak day and averages, and freeze the report.
    pub fn finish(self, generated_at: DateTime<Utc>) -> AnnualReport {
        let days: Vec<NaiveDate> = self.daily.keys().copied().collect();
        let longest_streak = finalizer::longest_streak(&days);
        let peak_day = finalizer::peak_day(&self.daily);
        let daily_stats = finalizer::daily_stats(&self.daily);

        let mut partners = self.partners;
        for partner in &mut partners {
            partner.finalize_turns();
        }
        // stable: equal counts keep first-seen order
        partners.sort_by(|a, b| b.message_count.cmp(&a.message_count));

        let average_message_length = if self.human_length_count > 0 {
            (self.human_length_sum as f64 / self.human_length_count as f64).round() as u64
        } else {
            0
        };

        AnnualReport {
            year: self.year,
            generated_at,
            total_sessions: self.total_sessions,
            total_messages: self.total_messages,
            human_messages: self.human_messages,
            other_messages: self.other_messages,
            total_tokens: self.total_tokens,
            hourly: self.hourly,
            weekday: self.weekday,
            monthly: self.monthly,
            active_days: daily_stats.len() as u32,
            daily_stats,
            human_char_count: self.human_chars,
            other_char_count: self.other_chars,
            first_chat: self.first_chat,
            longest_message: self.longest_message,
            peak_day,
            longest_streak,
            partners,
            word_frequency: self.words.top(self.options.top_words),
            average_message_length,
        }
    }

    // ── Private ───────────────────────────────────────────────────────────────

    fn record_message(
        &mut self,
        partner: &str,
        message: &MessageRecord,
        at: DateTime<Utc>,
        slot: CalendarSlot,
    ) {
        self.total_messages += 1;

        let text = message.text.as_str();
        let length = text.chars().count() as u64;
        let visible = text.chars().filter(|c| !c.is_whitespace()).count() as u64;

        if message.is_human {
            self.human_messages += 1;
            self.human_chars += visible;
            self.human_length_sum += length;
            self.human_length_count += 1;
            self.words.merge(&tokenizer::tokenize(text));

            let current = self.longest_message.as_ref().map_or(0, |m| m.length);
            if length > current {
                self.longest_message = Some(LongestMessage {
                    length,
                    content: excerpt(text, LONGEST_MESSAGE_EXCERPT_CHARS),
                    date: at,
                });
            }
        } else {
            self.other_messages += 1;
            self.other_chars += visible;
        }

        if let Some(tokens) = message.token_count {
            self.total_tokens = self.total_tokens.saturating_add(tokens);
        }

        self.hourly[slot.hour] += 1;
        self.weekday[slot.weekday] += 1;
        self.monthly[slot.month] += 1;
        *self.daily.entry(slot.date).or_insert(0) += 1;

        let index = match self.partner_index.get(partner) {
            Some(&i) => i,
            None => {
                self.partners.push(PartnerAggregate::new(partner, at));
                self.partner_index
                    .insert(partner.to_string(), self.partners.len() - 1);
                self.partners.len() - 1
            }
        };
        self.partners[index].record_message(message.is_human, at);

        if self.first_chat.as_ref().map_or(true, |first| at < first.date) {
            self.first_chat = Some(FirstChat {
                partner: partner.to_string(),
                date: at,
                message: excerpt(text, FIRST_CHAT_EXCERPT_CHARS),
            });
        }
    }
}

/// Leading `max_chars` characters of `text`.
fn excerpt(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono_tz::Tz;
    use recap_core::timestamp::TimestampInput;

    // ── Helpers ───────────────────────────────────────────────────────────────

    fn msg(is_human: bool, text: &str, ts: &str) -> MessageRecord {
        MessageRecord {
            is_human,
            text: text.to_string(),
            timestamp: Some(TimestampInput::Text(ts.to_string())),
            token_count: None,
        }
    }

    fn aggregator(year: i32) -> AnnualAggregator {
        AnnualAggregator::new(year, ReportOptions::default())
    }

    fn generated() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
    }

    // ── Counting ──────────────────────────────────────────────────────────────

    #[test]
    fn test_counts_and_histograms_consistent() {
        let mut agg = aggregator(2024);
        agg.ingest_session(
            "Alice",
            &[
                msg(true, "good morning", "2024-01-15T10:00:00Z"),
                msg(false, "morning!", "2024-01-15T10:00:30Z"),
                msg(true, "tea?", "2024-01-16T23:59:00Z"),
            ],
        );
        let report = agg.finish(generated());

        assert_eq!(report.total_messages, 3);
        assert_eq!(report.human_messages, 2);
        assert_eq!(report.other_messages, 1);
        assert_eq!(report.total_sessions, 1);
        assert_eq!(report.hourly[10], 2);
        assert_eq!(report.hourly[23], 1);
        // 2024-01-15 is a Monday
        assert_eq!(report.weekday[1], 2);
        assert_eq!(report.weekday[2], 1);
        assert_eq!(report.monthly[0], 3);
        assert_eq!(report.active_days, 2);
        assert!(report.is_consistent());
    }

    #[test]
    fn test_out_of_year_and_unparseable_messages_dropped() {
        let mut agg = aggregator(2024);
        let mut no_ts = msg(true, "lost", "");
        no_ts.timestamp = None;
        let kept = agg.ingest_session(
            "Alice",
            &[
                msg(true, "last year", "2023-12-31T23:59:59Z"),
                msg(true, "garbage", "not a date"),
                no_ts,
                msg(true, "kept", "2024-02-01T12:00:00Z"),
                msg(true, "next year", "2025-01-01T00:00:00Z"),
            ],
        );
        assert_eq!(kept, 1);

        let report = agg.finish(generated());
        assert_eq!(report.total_messages, 1);
        assert_eq!(report.human_messages, 1);
    }

    #[test]
    fn test_session_counted_only_with_in_year_messages() {
        let mut agg = aggregator(2024);
        agg.ingest_session("Alice", &[msg(true, "old", "2022-05-05T10:00:00Z")]);
        agg.ingest_session("Alice", &[]);
        agg.ingest_session("Alice", &[msg(true, "new", "2024-05-05T10:00:00Z")]);
        agg.ingest_session("Alice", &[msg(false, "again", "2024-05-06T10:00:00Z")]);

        let report = agg.finish(generated());
        assert_eq!(report.total_sessions, 2);
        let alice = report.partner("Alice").unwrap();
        assert_eq!(alice.session_count, 2);
        assert_eq!(alice.average_turns_per_session, Some(1));
    }

    #[test]
    fn test_year_boundary_follows_configured_zone() {
        let options = ReportOptions {
            timezone: Tz::Asia__Shanghai,
            ..ReportOptions::default()
        };
        let mut agg = AnnualAggregator::new(2024, options);
        // 2023-12-31T18:00Z is already 2024-01-01 02:00 in Shanghai.
        agg.ingest_session("Alice", &[msg(true, "new year", "2023-12-31T18:00:00Z")]);
        let report = agg.finish(generated());
        assert_eq!(report.total_messages, 1);
        assert_eq!(report.hourly[2], 1);
        assert_eq!(
            report.daily_stats[0].date,
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
        );
    }

    #[test]
    fn test_tokens_and_char_counts() {
        let mut agg = aggregator(2024);
        let mut human = msg(true, "a b  c", "2024-03-01T10:00:00Z");
        human.token_count = Some(7);
        let mut other = msg(false, "héllo wörld", "2024-03-01T10:01:00Z");
        other.token_count = Some(20);
        agg.ingest_session("Alice", &[human, other]);

        let report = agg.finish(generated());
        assert_eq!(report.total_tokens, 27);
        assert_eq!(report.human_char_count, 3);
        assert_eq!(report.other_char_count, 10);
        assert_eq!(report.average_message_length, 6);
    }

    #[test]
    fn test_token_total_saturates() {
        let mut agg = aggregator(2024);
        let mut first = msg(true, "big", "2024-03-01T10:00:00Z");
        first.token_count = Some(u64::MAX);
        let mut second = msg(false, "more", "2024-03-01T10:01:00Z");
        second.token_count = Some(12);
        agg.ingest_session("Alice", &[first, second]);

        let report = agg.finish(generated());
        assert_eq!(report.total_tokens, u64::MAX);
        assert_eq!(report.total_messages, 2);
    }

    // ── Extremes ──────────────────────────────────────────────────────────────

    #[test]
    fn test_longest_message_keeps_first_on_tie() {
        let mut agg = aggregator(2024);
        agg.ingest_session(
            "Alice",
            &[
                msg(true, "abcd", "2024-04-01T10:00:00Z"),
                msg(true, "wxyz", "2024-04-02T10:00:00Z"),
                msg(false, "much longer reply from the other side", "2024-04-03T10:00:00Z"),
            ],
        );
        let longest = agg.finish(generated()).longest_message.unwrap();
        assert_eq!(longest.content, "abcd");
        assert_eq!(longest.length, 4);
    }

    #[test]
    fn test_longest_message_excerpt_truncated() {
        let mut agg = aggregator(2024);
        let long = "字".repeat(600);
        agg.ingest_session("Alice", &[msg(true, &long, "2024-04-01T10:00:00Z")]);
        let longest = agg.finish(generated()).longest_message.unwrap();
        assert_eq!(longest.length, 600);
        assert_eq!(longest.content.chars().count(), LONGEST_MESSAGE_EXCERPT_CHARS);
    }

    #[test]
    fn test_first_chat_is_earliest_across_partners() {
        let mut agg = aggregator(2024);
        agg.ingest_session("Alice", &[msg(true, "later", "2024-06-01T10:00:00Z")]);
        agg.ingest_session("[group] Club", &[msg(false, "earliest", "2024-02-01T10:00:00Z")]);
        agg.ingest_session("Bob", &[msg(true, "same instant", "2024-02-01T10:00:00Z")]);

        let first = agg.finish(generated()).first_chat.unwrap();
        assert_eq!(first.partner, "[group] Club");
        assert_eq!(first.message, "earliest");
    }

    #[test]
    fn test_no_messages_gives_empty_extremes() {
        let report = aggregator(2024).finish(generated());
        assert!(report.first_chat.is_none());
        assert!(report.longest_message.is_none());
        assert!(report.peak_day.is_none());
        assert_eq!(report.longest_streak, 0);
        assert_eq!(report.average_message_length, 0);
        assert!(report.is_consistent());
    }

    // ── Partners ──────────────────────────────────────────────────────────────

    #[test]
    fn test_partners_sorted_by_message_count() {
        let mut agg = aggregator(2024);
        agg.ingest_session("Alice", &[msg(true, "hi", "2024-01-01T10:00:00Z")]);
        agg.ingest_session(
            "Bob",
            &[
                msg(true, "hi", "2024-01-02T10:00:00Z"),
                msg(false, "hey", "2024-01-03T10:00:00Z"),
            ],
        );
        agg.ingest_session("Carol", &[msg(true, "yo", "2024-01-04T10:00:00Z")]);

        let report = agg.finish(generated());
        let names: Vec<&str> = report.partners.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Bob", "Alice", "Carol"]);

        let bob = report.partner("Bob").unwrap();
        assert_eq!(bob.human_message_count, 1);
        assert_eq!(bob.other_message_count, 1);
        assert_eq!(
            bob.first_message_at,
            Utc.with_ymd_and_hms(2024, 1, 2, 10, 0, 0).unwrap()
        );
        assert_eq!(
            bob.last_message_at,
            Utc.with_ymd_and_hms(2024, 1, 3, 10, 0, 0).unwrap()
        );
    }

    // ── Words ─────────────────────────────────────────────────────────────────

    #[test]
    fn test_only_human_text_is_tokenized() {
        let mut agg = aggregator(2024);
        agg.ingest_session(
            "Alice",
            &[
                msg(true, "dragon dragon castle", "2024-01-01T10:00:00Z"),
                msg(false, "dragon knight", "2024-01-01T10:01:00Z"),
            ],
        );
        let words = agg.finish(generated()).word_frequency;
        assert_eq!(words[0].word, "dragon");
        assert_eq!(words[0].count, 2);
        assert!(words.iter().all(|w| w.word != "knight"));
    }

    #[test]
    fn test_word_frequency_capped_by_options() {
        let options = ReportOptions {
            top_words: 2,
            ..ReportOptions::default()
        };
        let mut agg = AnnualAggregator::new(2024, options);
        agg.ingest_session(
            "Alice",
            &[msg(true, "alpha beta gamma delta", "2024-01-01T10:00:00Z")],
        );
        let words = agg.finish(generated()).word_frequency;
        assert_eq!(words.len(), 2);
        assert_eq!(words[0].word, "alpha");
        assert_eq!(words[1].word, "beta");
    }

    // ── Streak and peak ───────────────────────────────────────────────────────

    #[test]
    fn test_streak_and_peak_from_daily_counts() {
        let mut agg = aggregator(2024);
        agg.ingest_session(
            "Alice",
            &[
                msg(true, "a", "2024-07-01T10:00:00Z"),
                msg(true, "b", "2024-07-02T10:00:00Z"),
                msg(true, "c", "2024-07-02T11:00:00Z"),
                msg(true, "d", "2024-07-03T10:00:00Z"),
                msg(true, "e", "2024-07-05T10:00:00Z"),
                msg(true, "f", "2024-07-05T11:00:00Z"),
            ],
        );
        let report = agg.finish(generated());
        assert_eq!(report.longest_streak, 3);
        let peak = report.peak_day.unwrap();
        assert_eq!(peak.date, NaiveDate::from_ymd_opt(2024, 7, 2).unwrap());
        assert_eq!(peak.count, 2);
    }

    #[test]
    fn test_humanized_without_year_uses_normalizer_default() {
        let normalizer = TimestampNormalizer::new(Tz::UTC).with_default_year(2024);
        let mut agg = AnnualAggregator::with_normalizer(2024, ReportOptions::default(), normalizer);
        agg.ingest_session("Alice", &[msg(true, "hi", "March 3 @ 9:15pm")]);
        let report = agg.finish(generated());
        assert_eq!(report.total_messages, 1);
        assert_eq!(report.hourly[21], 1);
    }
}
