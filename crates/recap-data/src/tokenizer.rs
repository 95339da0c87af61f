//! Word-frequency extraction for English and Chinese message text.
//!
//! This is a heuristic counter, not a segmenter: Latin words are lower-cased
//! letter runs, and Chinese text contributes every 2–4 character window of
//! each run of ideographs.

use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

use recap_core::models::WordCount;
use regex::Regex;

/// Longest n-gram taken from a run of ideographs.
pub const MAX_NGRAM_CHARS: usize = 4;

/// Shortest token of either script that is counted.
pub const MIN_TOKEN_CHARS: usize = 2;

const STOP_WORDS: &[&str] = &[
    "a", "an", "the", "is", "are", "was", "were", "be", "been", "being",
    "have", "has", "had", "do", "does", "did", "will", "would", "could", "should",
    "may", "might", "must", "can", "need", "dare", "ought", "used", "to",
    "i", "me", "my", "myself", "we", "our", "ours", "ourselves",
    "you", "your", "yours", "yourself", "yourselves",
    "he", "him", "his", "himself", "she", "her", "hers", "herself",
    "it", "its", "itself", "they", "them", "their", "theirs", "themselves",
    "what", "which", "who", "whom", "this", "that", "these", "those",
    "and", "but", "if", "or", "because", "as", "until", "while",
    "of", "at", "by", "for", "with", "about", "against", "between",
    "into", "through", "during", "before", "after", "above", "below",
    "from", "up", "down", "in", "out", "on", "off", "over", "under",
    "again", "further", "then", "once", "here", "there", "when", "where",
    "why", "how", "all", "each", "few", "more", "most", "other", "some",
    "such", "no", "nor", "not", "only", "own", "same", "so", "than",
    "too", "very", "s", "t", "just", "don", "now", "ll", "m", "ve", "d", "re",
    "ok", "okay", "yes", "yeah", "nah", "oh", "ah", "um", "uh",
    "hm", "hmm", "huh", "well", "like", "really",
    "的", "了", "是", "在", "我", "你", "他", "她", "它", "们", "这", "那",
    "有", "和", "与", "或", "但", "而", "因", "为", "所", "以", "也", "就",
    "都", "要", "会", "能", "可", "到", "着", "被", "让", "给", "从", "向",
    "把", "对", "很", "太", "更", "最", "不", "没", "无", "非", "别", "还",
    "又", "再", "已", "曾", "将", "才", "刚", "正", "地", "得", "过",
    "来", "去", "上", "下", "里", "外", "前", "后", "中", "间", "时", "候",
    "什么", "怎么", "如何", "哪", "哪里", "哪儿", "谁", "几", "多少",
    "呢", "吗", "吧", "啊", "呀", "哦", "噢", "嗯", "哼", "唉", "哎",
    "一", "二", "三", "四", "五", "六", "七", "八", "九", "十", "百", "千", "万",
    "个", "只", "些", "每", "某", "各", "另", "其", "此", "彼",
];

fn stop_words() -> &'static HashSet<&'static str> {
    static SET: OnceLock<HashSet<&'static str>> = OnceLock::new();
    SET.get_or_init(|| STOP_WORDS.iter().copied().collect())
}

pub fn is_stop_word(word: &str) -> bool {
    stop_words().contains(word)
}

// ── FrequencyTable ────────────────────────────────────────────────────────────

/// Token counts that remember the order tokens were first seen in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrequencyTable {
    index: HashMap<String, usize>,
    entries: Vec<(String, u64)>,
}

impl FrequencyTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, word: &str, count: u64) {
        match self.index.get(word) {
            Some(&i) => self.entries[i].1 += count,
            None => {
                self.index.insert(word.to_string(), self.entries.len());
                self.entries.push((word.to_string(), count));
            }
        }
    }

    /// Fold `other` in, visiting its tokens in their first-seen order.
    pub fn merge(&mut self, other: &FrequencyTable) {
        for (word, count) in &other.entries {
            self.add(word, *count);
        }
    }

    pub fn get(&self, word: &str) -> u64 {
        self.index.get(word).map(|&i| self.entries[i].1).unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.entries.iter().map(|(w, c)| (w.as_str(), *c))
    }

    /// The `limit` most frequent tokens, highest first. Ties keep first-seen
    /// order.
    pub fn top(&self, limit: usize) -> Vec<WordCount> {
        let mut ranked: Vec<&(String, u64)> = self.entries.iter().collect();
        // stable sort
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked
            .into_iter()
            .take(limit)
            .map(|(word, count)| WordCount {
                word: word.clone(),
                count: *count,
            })
            .collect()
    }
}

// ── Tokenizer ─────────────────────────────────────────────────────────────────

fn markup_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            r"(?s)```.*?```",
            r"`[^`]+`",
            r"\*\*[^*]+\*\*",
            r"\*[^*]+\*",
            r"https?://\S+",
            r"<[^>]+>",
        ]
        .iter()
        .map(|p| Regex::new(p).expect("regex is valid"))
        .collect()
    })
}

fn latin_word_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[a-z]{2,}").expect("regex is valid"))
}

fn cjk_run_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[\x{4e00}-\x{9fa5}]+").expect("regex is valid"))
}

/// Remove code fences, inline code, bold and italic spans, URLs and tags, in
/// that order.
pub fn strip_markup(text: &str) -> String {
    let mut cleaned = text.to_string();
    for pattern in markup_patterns() {
        cleaned = pattern.replace_all(&cleaned, "").into_owned();
    }
    cleaned
}

/// Count the words of one message.
pub fn tokenize(text: &str) -> FrequencyTable {
    let mut counts = FrequencyTable::new();
    if text.is_empty() {
        return counts;
    }

    let cleaned = strip_markup(text);

    let lowered = cleaned.to_lowercase();
    for m in latin_word_pattern().find_iter(&lowered) {
        let word = m.as_str();
        if word.len() >= MIN_TOKEN_CHARS && !is_stop_word(word) {
            counts.add(word, 1);
        }
    }

    for run in cjk_run_pattern().find_iter(&cleaned) {
        let chars: Vec<char> = run.as_str().chars().collect();
        for len in MIN_TOKEN_CHARS..=MAX_NGRAM_CHARS.min(chars.len()) {
            for window in chars.windows(len) {
                let gram: String = window.iter().collect();
                if !is_stop_word(&gram) {
                    counts.add(&gram, 1);
                }
            }
        }
    }

    counts
}

// ── Tests ─────────────────────────────────────────────────────────────────────
