use std::fmt::Write as _;

use recap_core::formatting::{
    busiest_bucket, format_count, month_name, percentage, weekday_name,
};
use recap_core::models::AnnualReport;
use recap_core::time_utils::format_iso_millis;

const TOP_PARTNERS_SHOWN: usize = 5;
const TOP_WORDS_SHOWN: usize = 10;

/// Plain-text digest of a report for terminal output.
pub fn render(report: &AnnualReport) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = write_summary(&mut out, report);
    out
}

fn write_summary(out: &mut String, r: &AnnualReport) -> std::fmt::Result {
    writeln!(out, "Year in review: {}", r.year)?;
    writeln!(out)?;

    if r.total_messages == 0 {
        writeln!(out, "No messages found for {}.", r.year)?;
        return Ok(());
    }

    let human_share = percentage(r.human_messages as f64, r.total_messages as f64, 1);
    writeln!(
        out,
        "Messages:        {} ({} from you, {}%)",
        format_count(r.total_messages),
        format_count(r.human_messages),
        human_share
    )?;
    writeln!(out, "Sessions:        {}", format_count(r.total_sessions))?;
    writeln!(out, "Partners:        {}", format_count(r.partners.len() as u64))?;
    writeln!(out, "Tokens:          {}", format_count(r.total_tokens))?;
    writeln!(
        out,
        "Characters:      {} written, {} received",
        format_count(r.human_char_count),
        format_count(r.other_char_count)
    )?;
    writeln!(out, "Avg. length:     {} chars", r.average_message_length)?;
    writeln!(
        out,
        "Active days:     {} (longest streak {} days)",
        r.active_days, r.longest_streak
    )?;

    if let Some(peak) = &r.peak_day {
        writeln!(
            out,
            "Peak day:        {} ({} messages)",
            peak.date,
            format_count(peak.count)
        )?;
    }
    if let Some(hour) = busiest_bucket(&r.hourly) {
        writeln!(out, "Busiest hour:    {:02}:00", hour)?;
    }
    if let Some(day) = busiest_bucket(&r.weekday) {
        writeln!(out, "Busiest weekday: {}", weekday_name(day))?;
    }
    if let Some(month) = busiest_bucket(&r.monthly) {
        writeln!(out, "Busiest month:   {}", month_name(month))?;
    }

    if let Some(first) = &r.first_chat {
        writeln!(out)?;
        writeln!(
            out,
            "First chat: {} with {}",
            format_iso_millis(&first.date),
            first.partner
        )?;
    }

    if !r.partners.is_empty() {
        writeln!(out)?;
        writeln!(out, "Top partners:")?;
        for (i, partner) in r.partners.iter().take(TOP_PARTNERS_SHOWN).enumerate() {
            writeln!(
                out,
                "  {}. {} ({} messages, {} sessions)",
                i + 1,
                partner.name,
                format_count(partner.message_count),
                partner.session_count
            )?;
        }
    }

    if !r.word_frequency.is_empty() {
        let words: Vec<String> = r
            .word_frequency
            .iter()
            .take(TOP_WORDS_SHOWN)
            .map(|w| format!("{} ({})", w.word, w.count))
            .collect();
        writeln!(out)?;
        writeln!(out, "Top words: {}", words.join(", "))?;
    }

    Ok(())
}

// ── Tests ──────────────────────────────────────────────────────────────────────
