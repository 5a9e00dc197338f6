//! Tables passed between pipeline stages.
//!
//! Each stage takes a table by reference and returns a new one; nothing here is
//! mutated after it leaves the stage that built it.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::Serialize;

use crate::llm::prompts::FILLER_WORDS;
use crate::utils::bare_words;

/// Inclusive length bounds for a generated title or subtitle.
pub const TEXT_MIN_CHARS: usize = 25;
pub const TEXT_MAX_CHARS: usize = 30;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeywordRecord {
    /// Category derived from the export file name.
    pub provenance: String,
    /// Date bucket, only set for dated-folder ingests.
    pub date: Option<String>,
    pub keyword: String,
    pub volume: u64,
    pub difficulty: f64,
    pub growth: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct KeywordTable {
    records: Vec<KeywordRecord>,
}

impl KeywordTable {
    pub fn new(records: Vec<KeywordRecord>) -> Self {
        KeywordTable { records }
    }

    pub fn records(&self) -> &[KeywordRecord] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, KeywordRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn has_dates(&self) -> bool {
        self.records.iter().any(|r| r.date.is_some())
    }

    fn has_growth(&self) -> bool {
        self.records.iter().any(|r| r.growth.is_some())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WordFrequency {
    pub provenance: Option<String>,
    pub word: String,
    pub frequency: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FrequencyTable {
    rows: Vec<WordFrequency>,
}

impl FrequencyTable {
    pub fn new(rows: Vec<WordFrequency>) -> Self {
        FrequencyTable { rows }
    }

    pub fn rows(&self) -> &[WordFrequency] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn words(&self) -> Vec<&str> {
        self.rows.iter().map(|r| r.word.as_str()).collect()
    }

    pub fn total(&self) -> u64 {
        self.rows.iter().map(|r| r.frequency).sum()
    }

    pub fn get(&self, word: &str) -> Option<&WordFrequency> {
        self.rows.iter().find(|r| r.word == word)
    }

    /// Sum the frequencies of rows sharing a word, then order by frequency
    /// descending. Ties keep first-appearance order; a merged row keeps the
    /// provenance of its first contributor.
    pub fn aggregate(self) -> FrequencyTable {
        let mut index: HashMap<String, usize> = HashMap::new();
        let mut merged: Vec<WordFrequency> = Vec::with_capacity(self.rows.len());
        for row in self.rows {
            match index.get(&row.word) {
                Some(&i) => merged[i].frequency += row.frequency,
                None => {
                    index.insert(row.word.clone(), merged.len());
                    merged.push(row);
                }
            }
        }
        merged.sort_by(|a, b| b.frequency.cmp(&a.frequency));
        FrequencyTable { rows: merged }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    pub title: String,
    pub subtitle: String,
    /// Comma-joined unused keywords, packed up to the keyword budget.
    pub keyword_field: String,
    pub title_len: usize,
    pub subtitle_len: usize,
    pub keyword_field_len: usize,
}

impl Candidate {
    pub fn new(title: impl Into<String>, subtitle: impl Into<String>, keyword_field: impl Into<String>) -> Self {
        let title = title.into();
        let subtitle = subtitle.into();
        let keyword_field = keyword_field.into();
        Candidate {
            title_len: title.chars().count(),
            subtitle_len: subtitle.chars().count(),
            keyword_field_len: keyword_field.chars().count(),
            title,
            subtitle,
            keyword_field,
        }
    }

    /// Advisory checks; the pipeline only drops violating candidates under a
    /// strict generation policy. Filler words and reused title words are
    /// reported once each, in the order they appear.
    pub fn violations(&self, app_name: &str) -> Vec<Violation> {
        let mut out = Vec::new();
        if !(TEXT_MIN_CHARS..=TEXT_MAX_CHARS).contains(&self.title_len) {
            out.push(Violation::TitleLength(self.title_len));
        }
        if !(TEXT_MIN_CHARS..=TEXT_MAX_CHARS).contains(&self.subtitle_len) {
            out.push(Violation::SubtitleLength(self.subtitle_len));
        }
        let app = app_name.trim().to_lowercase();
        if !app.is_empty() && !self.title.to_lowercase().contains(&app) {
            out.push(Violation::MissingAppName);
        }

        let title_words = bare_words(&self.title);
        let subtitle_words = bare_words(&self.subtitle);
        let mut fillers: Vec<&String> = Vec::new();
        for w in title_words.iter().chain(&subtitle_words) {
            if FILLER_WORDS.contains(&w.as_str()) && !fillers.contains(&w) {
                fillers.push(w);
            }
        }
        out.extend(fillers.into_iter().map(|w| Violation::FillerWord(w.clone())));

        let in_title: HashSet<&str> = title_words.iter().map(String::as_str).collect();
        let mut reused: Vec<&String> = Vec::new();
        for w in &subtitle_words {
            if in_title.contains(w.as_str()) && !reused.contains(&w) {
                reused.push(w);
            }
        }
        out.extend(reused.into_iter().map(|w| Violation::ReusedTitleWord(w.clone())));
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    TitleLength(usize),
    SubtitleLength(usize),
    MissingAppName,
    FillerWord(String),
    ReusedTitleWord(String),
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::TitleLength(n) => {
                write!(f, "title is {} chars (want {}-{})", n, TEXT_MIN_CHARS, TEXT_MAX_CHARS)
            }
            Violation::SubtitleLength(n) => {
                write!(f, "subtitle is {} chars (want {}-{})", n, TEXT_MIN_CHARS, TEXT_MAX_CHARS)
            }
            Violation::MissingAppName => write!(f, "title does not contain the app name"),
            Violation::FillerWord(w) => write!(f, "uses filler word '{}'", w),
            Violation::ReusedTitleWord(w) => write!(f, "subtitle repeats title word '{}'", w),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredCandidate {
    pub candidate: Candidate,
    pub matched_keywords: Vec<String>,
    pub total_volume: u64,
    pub total_difficulty: f64,
    pub average_volume: f64,
    pub average_difficulty: f64,
    pub match_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchedKeyword {
    /// Index of the candidate in the scored list.
    pub candidate: usize,
    pub keyword: String,
    pub volume: u64,
    pub difficulty: f64,
}

// ── Tabular rendering ──

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Int(i64),
    Float(f64),
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Text(s) => f.write_str(s),
            Cell::Int(n) => write!(f, "{}", n),
            Cell::Float(x) => write!(f, "{}", x),
        }
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Text(s.to_string())
    }
}

impl From<String> for Cell {
    fn from(s: String) -> Self {
        Cell::Text(s)
    }
}

impl From<u64> for Cell {
    fn from(n: u64) -> Self {
        Cell::Int(n as i64)
    }
}

impl From<usize> for Cell {
    fn from(n: usize) -> Self {
        Cell::Int(n as i64)
    }
}

impl From<i64> for Cell {
    fn from(n: i64) -> Self {
        Cell::Int(n)
    }
}

impl From<f64> for Cell {
    fn from(x: f64) -> Self {
        Cell::Float(x)
    }
}

/// Anything that can be shown or exported as a header plus rows.
pub trait Tabular {
    fn headers(&self) -> Vec<String>;
    fn rows(&self) -> Vec<Vec<Cell>>;
}

impl Tabular for KeywordTable {
    fn headers(&self) -> Vec<String> {
        let mut h = Vec::new();
        if self.has_dates() {
            h.push("Date".to_string());
        }
        h.extend(["Category", "Keyword", "Volume", "Difficulty"].map(String::from));
        if self.has_growth() {
            h.push("Growth (Max Reach)".to_string());
        }
        h
    }

    fn rows(&self) -> Vec<Vec<Cell>> {
        let dates = self.has_dates();
        let growth = self.has_growth();
        self.records
            .iter()
            .map(|r| {
                let mut row = Vec::with_capacity(6);
                if dates {
                    row.push(Cell::from(r.date.clone().unwrap_or_default()));
                }
                row.push(Cell::from(r.provenance.as_str()));
                row.push(Cell::from(r.keyword.as_str()));
                row.push(Cell::from(r.volume));
                row.push(Cell::from(r.difficulty));
                if growth {
                    row.push(Cell::from(r.growth.unwrap_or(0)));
                }
                row
            })
            .collect()
    }
}

impl Tabular for FrequencyTable {
    fn headers(&self) -> Vec<String> {
        ["Category", "Word", "Frequency"].map(String::from).to_vec()
    }

    fn rows(&self) -> Vec<Vec<Cell>> {
        self.rows
            .iter()
            .map(|r| {
                vec![
                    Cell::from(r.provenance.clone().unwrap_or_default()),
                    Cell::from(r.word.as_str()),
                    Cell::from(r.frequency),
                ]
            })
            .collect()
    }
}

impl Tabular for [Candidate] {
    fn headers(&self) -> Vec<String> {
        ["Title", "Subtitle", "Keywords", "Title Length", "Subtitle Length", "Keywords Length"]
            .map(String::from)
            .to_vec()
    }

    fn rows(&self) -> Vec<Vec<Cell>> {
        self.iter()
            .map(|c| {
                vec![
                    Cell::from(c.title.as_str()),
                    Cell::from(c.subtitle.as_str()),
                    Cell::from(c.keyword_field.as_str()),
                    Cell::from(c.title_len),
                    Cell::from(c.subtitle_len),
                    Cell::from(c.keyword_field_len),
                ]
            })
            .collect()
    }
}

impl Tabular for [ScoredCandidate] {
    fn headers(&self) -> Vec<String> {
        [
            "Title",
            "Subtitle",
            "Keywords",
            "Title Length",
            "Subtitle Length",
            "Keywords Length",
            "Total Volume",
            "Total Difficulty",
            "Average Volume",
            "Average Difficulty",
            "Matched Count",
        ]
        .map(String::from)
        .to_vec()
    }

    fn rows(&self) -> Vec<Vec<Cell>> {
        self.iter()
            .map(|s| {
                let c = &s.candidate;
                vec![
                    Cell::from(c.title.as_str()),
                    Cell::from(c.subtitle.as_str()),
                    Cell::from(c.keyword_field.as_str()),
                    Cell::from(c.title_len),
                    Cell::from(c.subtitle_len),
                    Cell::from(c.keyword_field_len),
                    Cell::from(s.total_volume),
                    Cell::from(s.total_difficulty),
                    Cell::from(s.average_volume),
                    Cell::from(s.average_difficulty),
                    Cell::from(s.match_count),
                ]
            })
            .collect()
    }
}

impl Tabular for [MatchedKeyword] {
    fn headers(&self) -> Vec<String> {
        ["Candidate", "Matched Keyword", "Volume", "Difficulty"].map(String::from).to_vec()
    }

    fn rows(&self) -> Vec<Vec<Cell>> {
        self.iter()
            .map(|m| {
                vec![
                    Cell::from(m.candidate + 1),
                    Cell::from(m.keyword.as_str()),
                    Cell::from(m.volume),
                    Cell::from(m.difficulty),
                ]
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wf(word: &str, frequency: u64) -> WordFrequency {
        WordFrequency { provenance: None, word: word.to_string(), frequency }
    }

    #[test]
    fn aggregate_sums_and_resorts() {
        let t = FrequencyTable::new(vec![wf("cat", 5), wf("box", 2), wf("cat", 3), wf("apple", 1)]);
        let out = t.aggregate();
        assert_eq!(out.rows(), &[wf("cat", 8), wf("box", 2), wf("apple", 1)]);
    }

    #[test]
    fn aggregate_ties_keep_first_seen_order() {
        let t = FrequencyTable::new(vec![wf("b", 1), wf("a", 1), wf("c", 2)]);
        let words = t.aggregate().words().into_iter().map(String::from).collect::<Vec<_>>();
        assert_eq!(words, ["c", "b", "a"]);
    }

    #[test]
    fn candidate_lengths_count_chars() {
        let c = Candidate::new("Café Music", "ü", "a,b");
        assert_eq!(c.title_len, 10);
        assert_eq!(c.subtitle_len, 1);
        assert_eq!(c.keyword_field_len, 3);
    }

    #[test]
    fn title_bounds_are_inclusive() {
        let sub = "Songs Radio Stream Playlist"; // 27
        let at_25 = Candidate::new("Tuna Music Player Offline", sub, "");
        let at_30 = Candidate::new("Tuna Music Player Offline Hits", sub, "");
        assert_eq!(at_25.title_len, 25);
        assert_eq!(at_30.title_len, 30);
        assert!(at_25.violations("Tuna").is_empty());
        assert!(at_30.violations("Tuna").is_empty());

        let at_24 = Candidate::new("Tuna Music Player Offlin", sub, "");
        let at_31 = Candidate::new("Tuna Music Player Offline Hitss", sub, "");
        assert_eq!(at_24.violations("Tuna"), vec![Violation::TitleLength(24)]);
        assert_eq!(at_31.violations("Tuna"), vec![Violation::TitleLength(31)]);
    }

    #[test]
    fn missing_app_name_is_flagged() {
        let c = Candidate::new("Music Player Offline Hits", "Songs Radio Stream Playlist", "");
        assert_eq!(c.violations("Tuna"), vec![Violation::MissingAppName]);
    }

    #[test]
    fn filler_and_reused_words_are_flagged() {
        let c = Candidate::new("Tuna Music and Player Radio", "Music Player Offline Songs", "");
        assert_eq!(c.title_len, 27);
        assert_eq!(c.subtitle_len, 26);
        assert_eq!(
            c.violations("Tuna"),
            vec![
                Violation::FillerWord("and".into()),
                Violation::ReusedTitleWord("music".into()),
                Violation::ReusedTitleWord("player".into()),
            ]
        );
    }

    #[test]
    fn punctuation_does_not_hide_reuse() {
        let c = Candidate::new("Tuna: Radio, Music Streaming", "Your Music: Offline Playlists", "");
        assert_eq!(
            c.violations("Tuna"),
            vec![Violation::FillerWord("your".into()), Violation::ReusedTitleWord("music".into())]
        );
    }

    #[test]
    fn scored_table_shows_match_count() {
        let scored = vec![ScoredCandidate {
            candidate: Candidate::new("a", "b", ""),
            matched_keywords: vec!["a".into(), "b".into()],
            total_volume: 10,
            total_difficulty: 4.0,
            average_volume: 5.0,
            average_difficulty: 2.0,
            match_count: 2,
        }];
        let headers = scored.headers();
        let rows = scored.rows();
        assert_eq!(headers.last().map(String::as_str), Some("Matched Count"));
        assert_eq!(rows[0].last(), Some(&Cell::Int(2)));
    }

    #[test]
    fn keyword_table_headers_follow_optional_columns() {
        let rec = KeywordRecord {
            provenance: "Music".into(),
            date: Some("20.07.2025".into()),
            keyword: "music player".into(),
            volume: 50,
            difficulty: 10.0,
            growth: None,
        };
        let t = KeywordTable::new(vec![rec]);
        assert_eq!(t.headers(), ["Date", "Category", "Keyword", "Volume", "Difficulty"]);
        assert_eq!(t.rows()[0][0], Cell::Text("20.07.2025".into()));
    }
}
