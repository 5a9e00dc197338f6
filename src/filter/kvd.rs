//! Keyword-volume-difficulty filter.

use tracing::debug;

use crate::model::{KeywordRecord, KeywordTable};

/// Rows below this volume never reach the generator.
pub const VOLUME_FLOOR: u64 = 20;

/// Keep rows with `volume >= VOLUME_FLOOR` and `difficulty <= ceiling`,
/// sorted by volume descending and projected to category, keyword, volume
/// and difficulty. Rows whose numbers did not coerce were already dropped at
/// ingest. An empty result is valid.
pub fn kvd(table: &KeywordTable, ceiling: f64) -> KeywordTable {
    let mut kept: Vec<KeywordRecord> = table
        .iter()
        .filter(|r| r.volume >= VOLUME_FLOOR && r.difficulty <= ceiling)
        .map(|r| KeywordRecord {
            provenance: r.provenance.clone(),
            date: None,
            keyword: r.keyword.clone(),
            volume: r.volume,
            difficulty: r.difficulty,
            growth: None,
        })
        .collect();
    kept.sort_by(|a, b| b.volume.cmp(&a.volume));
    debug!(before = table.len(), after = kept.len(), ceiling, "kvd filter");
    KeywordTable::new(kept)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(keyword: &str, volume: u64, difficulty: f64) -> KeywordRecord {
        KeywordRecord {
            provenance: "Music".into(),
            date: Some("20.07.2025".into()),
            keyword: keyword.into(),
            volume,
            difficulty,
            growth: Some(10),
        }
    }

    #[test]
    fn floor_and_ceiling_are_inclusive() {
        let t = KeywordTable::new(vec![
            rec("low volume", 19, 5.0),
            rec("at floor", 20, 5.0),
            rec("at ceiling", 90, 30.0),
            rec("too hard", 500, 30.5),
        ]);
        let out = kvd(&t, 30.0);
        let words: Vec<&str> = out.iter().map(|r| r.keyword.as_str()).collect();
        assert_eq!(words, ["at ceiling", "at floor"]);
    }

    #[test]
    fn sorted_by_volume_and_projected() {
        let t = KeywordTable::new(vec![rec("a", 30, 1.0), rec("b", 300, 2.0), rec("c", 100, 3.0)]);
        let out = kvd(&t, 50.0);
        let vols: Vec<u64> = out.iter().map(|r| r.volume).collect();
        assert_eq!(vols, [300, 100, 30]);
        assert!(out.iter().all(|r| r.date.is_none() && r.growth.is_none()));
        assert!(out.iter().all(|r| r.volume >= VOLUME_FLOOR && r.difficulty <= 50.0));
    }

    #[test]
    fn empty_result_is_fine() {
        let t = KeywordTable::new(vec![rec("hard", 100, 80.0)]);
        assert!(kvd(&t, 10.0).is_empty());
        assert!(kvd(&KeywordTable::default(), 10.0).is_empty());
    }
}
