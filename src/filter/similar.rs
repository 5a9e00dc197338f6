//! Related-keyword search over a keyword table.
//!
//! The chat model picks related keywords (typos, variants, nearby concepts)
//! from the table. When the call fails or its reply cannot be read, a local
//! scorer based on substring overlap and edit distance takes over.

use std::collections::HashSet;

use strsim::normalized_levenshtein;
use tracing::{debug, info, warn};

use crate::llm::extract::parse_string_array;
use crate::llm::prompts::{related_system, related_user};
use crate::llm::{ChatClient, ChatRequest};
use crate::model::KeywordTable;
use crate::settings::Settings;

pub const MAX_RELATED: usize = 100;

const RELATED_TEMPERATURE: f32 = 0.2;

/// Distinct keywords in table order.
fn available(table: &KeywordTable) -> Vec<&str> {
    let mut seen = HashSet::new();
    table
        .iter()
        .map(|r| r.keyword.as_str())
        .filter(|k| !k.is_empty() && seen.insert(*k))
        .collect()
}

fn local_score(term: &str, keyword: &str) -> u32 {
    let term = term.to_lowercase();
    let kw = keyword.to_lowercase();
    let mut score = 0;
    if kw.contains(&term) {
        score += 15;
    }
    if kw == term {
        score += 20;
    }
    for sw in term.split_whitespace() {
        for kw_word in kw.split_whitespace() {
            if kw_word.contains(sw) || sw.contains(kw_word) {
                score += 3;
            }
            if kw_word == sw {
                score += 8;
            }
            let sim = normalized_levenshtein(sw, kw_word);
            if sim > 0.8 {
                score += 5;
            } else if sim > 0.6 {
                score += 2;
            }
        }
    }
    let prefix: String = term.chars().take(3).collect();
    if kw.contains(&prefix) {
        score += 1;
    }
    score
}

/// Rank table keywords against `term` without the chat service. Keywords
/// scoring zero are left out; equal scores keep table order.
pub fn local_related(term: &str, table: &KeywordTable, max_results: usize) -> Vec<String> {
    let term = term.trim();
    if term.is_empty() {
        return Vec::new();
    }
    let mut scored: Vec<(u32, &str)> = available(table)
        .into_iter()
        .map(|k| (local_score(term, k), k))
        .filter(|(s, _)| *s > 0)
        .collect();
    scored.sort_by(|a, b| b.0.cmp(&a.0));
    scored.into_iter().take(max_results).map(|(_, k)| k.to_string()).collect()
}

/// Ask the chat service which table keywords relate to `term`. Only keywords
/// present in the table are returned, at most [`MAX_RELATED`].
pub fn related_keywords<C: ChatClient>(
    term: &str,
    table: &KeywordTable,
    client: &C,
    settings: &Settings,
) -> Vec<String> {
    let term = term.trim();
    let keywords = available(table);
    if term.is_empty() || keywords.is_empty() {
        return Vec::new();
    }

    let request = ChatRequest::new(&settings.similar_model, related_system(MAX_RELATED), related_user(term, &keywords))
        .with_temperature(RELATED_TEMPERATURE)
        .with_max_tokens(settings.similar_max_tokens);

    let reply = match client.complete(&request) {
        Ok(r) => r,
        Err(e) => {
            warn!(error = %e, "related-keyword call failed, using local matching");
            return local_related(term, table, MAX_RELATED);
        }
    };
    let picked = match parse_string_array(&reply) {
        Ok(list) => list,
        Err(e) => {
            warn!(error = %e, "related-keyword reply is not a JSON list, using local matching");
            debug!(reply = %reply, "unparsed related-keyword reply");
            return local_related(term, table, MAX_RELATED);
        }
    };

    let known: HashSet<&str> = keywords.iter().copied().collect();
    let mut seen = HashSet::new();
    let related: Vec<String> = picked
        .into_iter()
        .filter(|k| known.contains(k.as_str()) && seen.insert(k.clone()))
        .take(MAX_RELATED)
        .collect();
    info!(term, related = related.len(), of = keywords.len(), "related keywords");
    related
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::testing::ScriptedClient;
    use crate::model::KeywordRecord;

    fn table(keywords: &[&str]) -> KeywordTable {
        KeywordTable::new(
            keywords
                .iter()
                .map(|k| KeywordRecord {
                    provenance: "Photo".into(),
                    date: None,
                    keyword: k.to_string(),
                    volume: 50,
                    difficulty: 10.0,
                    growth: None,
                })
                .collect(),
        )
    }

    #[test]
    fn reply_is_limited_to_table_keywords() {
        let t = table(&["photo editor", "foto", "camera", "music"]);
        let client = ScriptedClient::new(["```json\n[\"foto\", \"picture\", \"photo editor\", \"foto\"]\n```"]);
        let out = related_keywords("photo", &t, &client, &Settings::default());
        assert_eq!(out, ["foto", "photo editor"]);

        let req = &client.seen.borrow()[0];
        assert_eq!(req.model, "gpt-4o-mini");
        assert_eq!(req.temperature, 0.2);
        assert_eq!(req.max_tokens, Some(2000));
        assert!(req.messages[1].content.contains("photo editor, foto, camera, music"));
    }

    #[test]
    fn failed_call_uses_local_matching() {
        let t = table(&["music", "photos", "photo", "photo editor", "fotos", "camera"]);
        let out = related_keywords("photo", &t, &ScriptedClient::failing(), &Settings::default());
        assert_eq!(out, ["photo", "photo editor", "photos"]);
    }

    #[test]
    fn unreadable_reply_uses_local_matching() {
        let t = table(&["weather app", "wether", "radio"]);
        let client = ScriptedClient::new(["I could not find anything."]);
        let out = related_keywords("weather", &t, &client, &Settings::default());
        assert_eq!(out, ["weather app", "wether"]);
    }

    #[test]
    fn local_scores() {
        assert_eq!(local_score("photo", "photo"), 15 + 20 + 3 + 8 + 5 + 1);
        assert_eq!(local_score("photo", "fotos"), 0);
        assert_eq!(local_score("weather", "wether"), 5);
        assert_eq!(local_score("photo", "radio"), 0);
    }

    #[test]
    fn blank_term_finds_nothing() {
        let t = table(&["photo"]);
        let client = ScriptedClient::new(Vec::<String>::new());
        assert!(related_keywords("  ", &t, &client, &Settings::default()).is_empty());
        assert_eq!(client.calls(), 0);
        assert!(local_related("", &t, 10).is_empty());
    }
}
