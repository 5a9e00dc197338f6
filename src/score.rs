//! Keyword coverage scoring for generated candidates.

use std::collections::HashSet;

use tracing::info;

use crate::model::{Candidate, KeywordTable, MatchedKeyword, ScoredCandidate};
use crate::utils::{lower_tokens, round_to};

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Lowercased title and subtitle tokens plus the keyword-field entries.
fn vocabulary(c: &Candidate) -> HashSet<String> {
    let mut vocab = lower_tokens(&c.title);
    vocab.extend(lower_tokens(&c.subtitle));
    vocab.extend(
        c.keyword_field
            .split(',')
            .filter(|k| !k.is_empty())
            .map(|k| k.to_lowercase()),
    );
    vocab
}

fn covers(vocab: &HashSet<String>, keyword: &str) -> bool {
    let mut tokens = keyword.split_whitespace().peekable();
    tokens.peek().is_some() && tokens.all(|t| vocab.contains(&t.to_lowercase()))
}

fn score_one(index: usize, candidate: &Candidate, universe: &KeywordTable) -> (ScoredCandidate, Vec<MatchedKeyword>) {
    let vocab = vocabulary(candidate);
    let matched: Vec<MatchedKeyword> = universe
        .iter()
        .filter(|r| covers(&vocab, &r.keyword))
        .map(|r| MatchedKeyword {
            candidate: index,
            keyword: r.keyword.clone(),
            volume: r.volume,
            difficulty: r.difficulty,
        })
        .collect();

    let total_volume: u64 = matched.iter().map(|m| m.volume).sum();
    let total_difficulty: f64 = matched.iter().map(|m| m.difficulty).sum();
    let n = matched.len();
    let (average_volume, average_difficulty) = if n == 0 {
        (0.0, 0.0)
    } else {
        (
            round_to(total_volume as f64 / n as f64, 3),
            round_to(total_difficulty / n as f64, 3),
        )
    };

    let scored = ScoredCandidate {
        candidate: candidate.clone(),
        matched_keywords: matched.iter().map(|m| m.keyword.clone()).collect(),
        total_volume,
        total_difficulty,
        average_volume,
        average_difficulty,
        match_count: n,
    };
    (scored, matched)
}

#[cfg(feature = "rayon")]
fn score_all(candidates: &[Candidate], universe: &KeywordTable) -> Vec<(ScoredCandidate, Vec<MatchedKeyword>)> {
    candidates
        .par_iter()
        .enumerate()
        .map(|(i, c)| score_one(i, c, universe))
        .collect()
}

#[cfg(not(feature = "rayon"))]
fn score_all(candidates: &[Candidate], universe: &KeywordTable) -> Vec<(ScoredCandidate, Vec<MatchedKeyword>)> {
    candidates
        .iter()
        .enumerate()
        .map(|(i, c)| score_one(i, c, universe))
        .collect()
}

/// Score every candidate against the full keyword universe.
///
/// A keyword matches when all of its lowercased tokens are in the candidate's
/// vocabulary. Returns one row per candidate, in input order, and the flattened
/// list of matches.
pub fn score(candidates: &[Candidate], universe: &KeywordTable) -> (Vec<ScoredCandidate>, Vec<MatchedKeyword>) {
    let mut scored = Vec::with_capacity(candidates.len());
    let mut detail = Vec::new();
    for (s, m) in score_all(candidates, universe) {
        scored.push(s);
        detail.extend(m);
    }
    info!(candidates = scored.len(), matches = detail.len(), universe = universe.len(), "scored candidates");
    (scored, detail)
}
