//! Interactive-style narrowing of a keyword table: numeric ranges, include and
//! exclude terms, related-keyword lists, Latin-script only. Also column sorting.

use std::cmp::Ordering;
use std::str::FromStr;

use itertools::Itertools;
use tracing::debug;

use crate::model::{KeywordRecord, KeywordTable};
use crate::utils::is_latin_only;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeColumn {
    Volume,
    Difficulty,
    Growth,
}

impl RangeColumn {
    fn label(self) -> &'static str {
        match self {
            RangeColumn::Volume => "Volume",
            RangeColumn::Difficulty => "Difficulty",
            RangeColumn::Growth => "Growth",
        }
    }

    fn value(self, r: &KeywordRecord) -> Option<f64> {
        match self {
            RangeColumn::Volume => Some(r.volume as f64),
            RangeColumn::Difficulty => Some(r.difficulty),
            RangeColumn::Growth => r.growth.map(|g| g as f64),
        }
    }
}

/// Inclusive bounds on one numeric column. Rows with no value are dropped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangeFilter {
    pub column: RangeColumn,
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewFilter {
    pub ranges: Vec<RangeFilter>,
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub latin_only: bool,
    /// Related keywords from a similar-keyword search. `Some` with an empty
    /// list keeps nothing.
    pub similar: Option<Vec<String>>,
}

/// Exact, prefix or suffix match, case-insensitive.
fn term_matches(keyword_lower: &str, term: &str) -> bool {
    let term = term.to_lowercase();
    keyword_lower == term || keyword_lower.starts_with(&term) || keyword_lower.ends_with(&term)
}

impl ViewFilter {
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
            && self.include.is_empty()
            && self.exclude.is_empty()
            && !self.latin_only
            && self.similar.is_none()
    }

    fn keeps(&self, r: &KeywordRecord) -> bool {
        let in_ranges = self.ranges.iter().all(|f| {
            f.column
                .value(r)
                .map_or(false, |v| v >= f.min && v <= f.max)
        });
        if !in_ranges {
            return false;
        }
        let kw = r.keyword.to_lowercase();
        if !self.include.is_empty() && !self.include.iter().any(|t| term_matches(&kw, t)) {
            return false;
        }
        if self.exclude.iter().any(|t| term_matches(&kw, t)) {
            return false;
        }
        if let Some(similar) = &self.similar {
            let related = similar.iter().any(|s| {
                let s = s.to_lowercase();
                kw.contains(&s) || s.contains(&kw)
            });
            if !related {
                return false;
            }
        }
        !self.latin_only || is_latin_only(&r.keyword)
    }

    pub fn apply(&self, table: &KeywordTable) -> KeywordTable {
        let kept: Vec<KeywordRecord> = table.iter().filter(|r| self.keeps(r)).cloned().collect();
        debug!(before = table.len(), after = kept.len(), filters = %self.summary(), "view filter");
        KeywordTable::new(kept)
    }

    /// One-line description of the active filters.
    pub fn summary(&self) -> String {
        let mut parts: Vec<String> = self
            .ranges
            .iter()
            .map(|f| format!("{}: {:.1}-{:.1}", f.column.label(), f.min, f.max))
            .collect();
        if !self.include.is_empty() {
            parts.push(format!("Include: {}", self.include.iter().map(|t| format!("'{}'", t)).join(" OR ")));
        }
        if !self.exclude.is_empty() {
            parts.push(format!("Exclude: {}", self.exclude.iter().map(|t| format!("'{}'", t)).join(" OR ")));
        }
        if let Some(similar) = &self.similar {
            parts.push(format!("Similar: {} keywords", similar.len()));
        }
        if self.latin_only {
            parts.push("Latin Only".to_string());
        }
        if parts.is_empty() {
            "no filters".to_string()
        } else {
            parts.join(", ")
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortColumn {
    Category,
    Date,
    Keyword,
    Volume,
    Difficulty,
    Growth,
}

impl FromStr for SortColumn {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "category" => Ok(SortColumn::Category),
            "date" => Ok(SortColumn::Date),
            "keyword" => Ok(SortColumn::Keyword),
            "volume" => Ok(SortColumn::Volume),
            "difficulty" => Ok(SortColumn::Difficulty),
            "growth" => Ok(SortColumn::Growth),
            other => Err(format!(
                "unknown column '{}' (expected category, date, keyword, volume, difficulty or growth)",
                other
            )),
        }
    }
}

/// Missing values sort last in either direction.
fn by_option<T: Ord>(a: Option<T>, b: Option<T>, ascending: bool) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) if ascending => x.cmp(&y),
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Stable sort on one column. Rows that compare equal keep their order.
pub fn sort_table(table: &KeywordTable, column: SortColumn, ascending: bool) -> KeywordTable {
    let mut rows = table.records().to_vec();
    let directed = |o: Ordering| if ascending { o } else { o.reverse() };
    match column {
        SortColumn::Category => rows.sort_by(|a, b| directed(a.provenance.cmp(&b.provenance))),
        SortColumn::Keyword => rows.sort_by(|a, b| directed(a.keyword.cmp(&b.keyword))),
        SortColumn::Volume => rows.sort_by(|a, b| directed(a.volume.cmp(&b.volume))),
        SortColumn::Difficulty => rows.sort_by(|a, b| directed(a.difficulty.total_cmp(&b.difficulty))),
        SortColumn::Date => rows.sort_by(|a, b| by_option(a.date.as_deref(), b.date.as_deref(), ascending)),
        SortColumn::Growth => rows.sort_by(|a, b| by_option(a.growth, b.growth, ascending)),
    }
    KeywordTable::new(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(rows: &[(&str, u64, f64, Option<i64>)]) -> KeywordTable {
        KeywordTable::new(
            rows.iter()
                .map(|(k, v, d, g)| KeywordRecord {
                    provenance: "Photo".into(),
                    date: None,
                    keyword: k.to_string(),
                    volume: *v,
                    difficulty: *d,
                    growth: *g,
                })
                .collect(),
        )
    }

    fn keywords(t: &KeywordTable) -> Vec<&str> {
        t.iter().map(|r| r.keyword.as_str()).collect()
    }

    #[test]
    fn include_is_exact_prefix_or_suffix() {
        let t = table(&[
            ("ai", 10, 1.0, None),
            ("ai photo", 10, 1.0, None),
            ("photo ai", 10, 1.0, None),
            ("paint brush", 10, 1.0, None),
            ("chair", 10, 1.0, None),
        ]);
        let f = ViewFilter { include: vec!["AI".into()], ..Default::default() };
        assert_eq!(keywords(&f.apply(&t)), ["ai", "ai photo", "photo ai"]);
    }

    #[test]
    fn exclude_removes_matches() {
        let t = table(&[("photo editor", 10, 1.0, None), ("video editor", 10, 1.0, None), ("collage", 10, 1.0, None)]);
        let f = ViewFilter { exclude: vec!["editor".into(), "coll".into()], ..Default::default() };
        assert!(f.apply(&t).is_empty());
    }

    #[test]
    fn ranges_and_latin() {
        let t = table(&[
            ("photo", 100, 20.0, Some(50)),
            ("фото", 100, 20.0, Some(50)),
            ("collage", 5, 20.0, Some(50)),
            ("filters", 100, 20.0, None),
        ]);
        let f = ViewFilter {
            ranges: vec![
                RangeFilter { column: RangeColumn::Volume, min: 20.0, max: 1000.0 },
                RangeFilter { column: RangeColumn::Growth, min: 0.0, max: 100.0 },
            ],
            latin_only: true,
            ..Default::default()
        };
        assert_eq!(keywords(&f.apply(&t)), ["photo"]);
        assert_eq!(f.summary(), "Volume: 20.0-1000.0, Growth: 0.0-100.0, Latin Only");
    }

    #[test]
    fn empty_filter_keeps_everything() {
        let t = table(&[("a", 1, 1.0, None), ("b", 2, 2.0, None)]);
        let f = ViewFilter::default();
        assert!(f.is_empty());
        assert_eq!(f.apply(&t), t);
        assert_eq!(f.summary(), "no filters");
    }

    #[test]
    fn similar_list_matches_by_containment() {
        let t = table(&[
            ("photo editor", 10, 1.0, None),
            ("foto", 10, 1.0, None),
            ("editor", 10, 1.0, None),
            ("music", 10, 1.0, None),
        ]);
        let f = ViewFilter { similar: Some(vec!["Photo".into(), "fotos".into()]), ..Default::default() };
        assert!(!f.is_empty());
        assert_eq!(keywords(&f.apply(&t)), ["photo editor", "foto"]);
        assert_eq!(f.summary(), "Similar: 2 keywords");

        let nothing = ViewFilter { similar: Some(Vec::new()), ..Default::default() };
        assert!(nothing.apply(&t).is_empty());
    }

    #[test]
    fn sort_is_stable_in_both_directions() {
        let t = table(&[
            ("b", 50, 3.0, Some(10)),
            ("a", 90, 1.0, None),
            ("c", 50, 2.0, Some(-5)),
            ("d", 10, 2.0, Some(10)),
        ]);
        assert_eq!(keywords(&sort_table(&t, SortColumn::Volume, false)), ["a", "b", "c", "d"]);
        assert_eq!(keywords(&sort_table(&t, SortColumn::Volume, true)), ["d", "b", "c", "a"]);
        assert_eq!(keywords(&sort_table(&t, SortColumn::Difficulty, true)), ["a", "c", "d", "b"]);
        assert_eq!(keywords(&sort_table(&t, SortColumn::Keyword, false)), ["d", "c", "b", "a"]);
    }

    #[test]
    fn missing_growth_sorts_last() {
        let t = table(&[("a", 1, 1.0, None), ("b", 1, 1.0, Some(5)), ("c", 1, 1.0, Some(-3))]);
        assert_eq!(keywords(&sort_table(&t, SortColumn::Growth, true)), ["c", "b", "a"]);
        assert_eq!(keywords(&sort_table(&t, SortColumn::Growth, false)), ["b", "c", "a"]);
    }

    #[test]
    fn sort_column_names() {
        assert_eq!("Volume".parse::<SortColumn>(), Ok(SortColumn::Volume));
        assert_eq!("growth".parse::<SortColumn>(), Ok(SortColumn::Growth));
        assert!("rank".parse::<SortColumn>().is_err());
    }
}
