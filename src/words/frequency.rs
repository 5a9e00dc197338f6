use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;

use serde::Deserialize;
use tracing::debug;

use crate::model::{FrequencyTable, KeywordTable, WordFrequency};

/// How the category tag is carried onto word rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProvenanceMode {
    /// Each word gets the most common category among the keywords it occurs in.
    #[default]
    PerWord,
    /// Every word gets the most common category of the whole table.
    TableWide,
}

impl FromStr for ProvenanceMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "per-word" => Ok(ProvenanceMode::PerWord),
            "table-wide" => Ok(ProvenanceMode::TableWide),
            other => Err(format!("unknown provenance mode '{}' (expected per-word or table-wide)", other)),
        }
    }
}

/// Most frequent key; ties go to the lexically smallest.
fn mode_of(counts: &BTreeMap<&str, usize>) -> Option<String> {
    counts
        .iter()
        .fold(None::<(&str, usize)>, |best, (k, n)| match best {
            Some((_, m)) if m >= *n => best,
            _ => Some((*k, *n)),
        })
        .map(|(k, _)| k.to_string())
}

/// Count whitespace tokens across every keyword, case-sensitively, ordered by
/// frequency descending (ties in first-seen order).
pub fn tabulate(table: &KeywordTable, mode: ProvenanceMode) -> FrequencyTable {
    let mut order: Vec<&str> = Vec::new();
    let mut counts: HashMap<&str, u64> = HashMap::new();
    let mut tags: HashMap<&str, BTreeMap<&str, usize>> = HashMap::new();
    let mut table_tags: BTreeMap<&str, usize> = BTreeMap::new();

    for rec in table.iter() {
        *table_tags.entry(rec.provenance.as_str()).or_default() += 1;
        for token in rec.keyword.split_whitespace() {
            let n = counts.entry(token).or_insert_with(|| {
                order.push(token);
                0
            });
            *n += 1;
            *tags.entry(token).or_default().entry(rec.provenance.as_str()).or_default() += 1;
        }
    }

    let table_tag = mode_of(&table_tags);
    let mut rows: Vec<WordFrequency> = order
        .into_iter()
        .map(|word| WordFrequency {
            provenance: match mode {
                ProvenanceMode::PerWord => tags.get(word).and_then(mode_of),
                ProvenanceMode::TableWide => table_tag.clone(),
            },
            word: word.to_string(),
            frequency: counts[word],
        })
        .collect();
    rows.sort_by(|a, b| b.frequency.cmp(&a.frequency));
    debug!(keywords = table.len(), words = rows.len(), "word frequencies");
    FrequencyTable::new(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::KeywordRecord;

    fn rec(category: &str, keyword: &str) -> KeywordRecord {
        KeywordRecord {
            provenance: category.into(),
            date: None,
            keyword: keyword.into(),
            volume: 50,
            difficulty: 10.0,
            growth: None,
        }
    }

    fn sample() -> KeywordTable {
        KeywordTable::new(vec![
            rec("Music", "music player"),
            rec("Music", "offline music"),
            rec("Games", "music games"),
            rec("Games", "puzzle games"),
            rec("Games", "Music quiz"),
        ])
    }

    #[test]
    fn counts_tokens_case_sensitively() {
        let t = tabulate(&sample(), ProvenanceMode::PerWord);
        assert_eq!(t.get("music").unwrap().frequency, 3);
        assert_eq!(t.get("Music").unwrap().frequency, 1);
        assert_eq!(t.get("games").unwrap().frequency, 2);
        assert_eq!(t.rows()[0].word, "music");
        let token_total: usize = sample().iter().map(|r| r.keyword.split_whitespace().count()).sum();
        assert_eq!(t.total(), token_total as u64);
    }

    #[test]
    fn per_word_provenance() {
        let t = tabulate(&sample(), ProvenanceMode::PerWord);
        assert_eq!(t.get("music").unwrap().provenance.as_deref(), Some("Music"));
        assert_eq!(t.get("games").unwrap().provenance.as_deref(), Some("Games"));
        assert_eq!(t.get("player").unwrap().provenance.as_deref(), Some("Music"));
    }

    #[test]
    fn table_wide_provenance() {
        let t = tabulate(&sample(), ProvenanceMode::TableWide);
        assert!(t.rows().iter().all(|r| r.provenance.as_deref() == Some("Games")));
    }

    #[test]
    fn tie_breaks_to_smallest_tag() {
        let t = KeywordTable::new(vec![rec("Music", "radio"), rec("Games", "radio")]);
        let f = tabulate(&t, ProvenanceMode::PerWord);
        assert_eq!(f.rows()[0].provenance.as_deref(), Some("Games"));
    }

    #[test]
    fn mode_names_parse() {
        assert_eq!("table-wide".parse::<ProvenanceMode>().unwrap(), ProvenanceMode::TableWide);
        assert_eq!("per-word".parse::<ProvenanceMode>().unwrap(), ProvenanceMode::PerWord);
        assert!("table".parse::<ProvenanceMode>().is_err());
    }

    #[test]
    fn empty_table_gives_empty_frequencies() {
        assert!(tabulate(&KeywordTable::default(), ProvenanceMode::PerWord).is_empty());
    }
}
