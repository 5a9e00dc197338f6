//! Keyword export ingestion: folder, dated folders, or a single file.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, StringRecord, Trim};
use tracing::{debug, info};

use crate::error::IngestError;
use crate::model::{KeywordRecord, KeywordTable};

const KEYWORD_COL: &str = "Keyword";
const VOLUME_COL: &str = "Volume";
const DIFFICULTY_COL: &str = "Difficulty";
const GROWTH_COL: &str = "Growth (Max Reach)";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DedupPolicy {
    /// One row per keyword: the highest-difficulty occurrence.
    #[default]
    KeepHighestDifficulty,
    /// Every row from every file.
    KeepAll,
}

#[derive(Debug, Clone, PartialEq)]
pub enum IngestSource {
    Folder { path: PathBuf, dedup: DedupPolicy },
    /// A folder of `<date>_...` subfolders, each holding exports.
    DatedFolders { path: PathBuf },
    SingleFile { path: PathBuf },
}

pub fn ingest(source: &IngestSource) -> Result<KeywordTable, IngestError> {
    let (records, dedup) = match source {
        IngestSource::Folder { path, dedup } => (read_folder(path, None)?, *dedup),
        IngestSource::DatedFolders { path } => (read_dated(path)?, DedupPolicy::KeepAll),
        IngestSource::SingleFile { path } => {
            ensure_exists(path)?;
            (read_file(path, None)?, DedupPolicy::KeepAll)
        }
    };
    let table = finish(records, dedup);
    info!(rows = table.len(), ?dedup, "ingest complete");
    Ok(table)
}

/// Category tag from an export file name.
/// `trending-keywords-US-Food & Drink.csv` gives `Food & Drink`.
pub fn category_from_file_name(file_name: &str) -> String {
    let stem = file_name.strip_suffix(".csv").unwrap_or(file_name);
    let parts: Vec<&str> = stem.split('-').collect();
    if parts.len() >= 4 && parts[0] == "trending" && parts[1] == "keywords" {
        parts[3..].join("-")
    } else {
        parts.last().copied().unwrap_or(stem).to_string()
    }
}

/// Date tag from a dated subfolder: `20.07.2025_trending_keywords` gives `20.07.2025`.
pub fn date_from_folder_name(name: &str) -> &str {
    name.split('_').next().unwrap_or(name)
}

/// `"2,333%"` gives 2333; anything unparsable gives 0.
pub fn parse_growth(raw: &str) -> i64 {
    let cleaned: String = raw.chars().filter(|c| *c != ',' && *c != '%').collect();
    cleaned
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .map(|v| v.trunc() as i64)
        .unwrap_or(0)
}

fn ensure_exists(path: &Path) -> Result<(), IngestError> {
    if path.exists() {
        Ok(())
    } else {
        Err(IngestError::MissingPath(path.to_path_buf()))
    }
}

fn csv_files(dir: &Path) -> Result<Vec<PathBuf>, IngestError> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && p.extension().map_or(false, |ext| ext == "csv"))
        .collect();
    files.sort();
    Ok(files)
}

fn read_folder(dir: &Path, date: Option<&str>) -> Result<Vec<KeywordRecord>, IngestError> {
    ensure_exists(dir)?;
    let files = csv_files(dir)?;
    if files.is_empty() {
        return Err(IngestError::NoCsvFiles(dir.to_path_buf()));
    }
    let mut records = Vec::new();
    for file in &files {
        records.extend(read_file(file, date)?);
    }
    Ok(records)
}

fn read_dated(root: &Path) -> Result<Vec<KeywordRecord>, IngestError> {
    ensure_exists(root)?;
    let mut subdirs: Vec<PathBuf> = fs::read_dir(root)?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.is_dir())
        .collect();
    subdirs.sort();
    if subdirs.is_empty() {
        return Err(IngestError::NoSubfolders(root.to_path_buf()));
    }

    let mut records = Vec::new();
    let mut files_seen = 0usize;
    for dir in &subdirs {
        let name = dir.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        let date = date_from_folder_name(&name);
        let files = csv_files(dir)?;
        debug!(folder = %name, date, files = files.len(), "reading dated folder");
        files_seen += files.len();
        for file in &files {
            records.extend(read_file(file, Some(date))?);
        }
    }
    if files_seen == 0 {
        return Err(IngestError::NoCsvFiles(root.to_path_buf()));
    }
    Ok(records)
}

struct Columns {
    keyword: usize,
    volume: usize,
    difficulty: usize,
    growth: Option<usize>,
}

impl Columns {
    fn locate(headers: &StringRecord, path: &Path) -> Result<Self, IngestError> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim_start_matches('\u{feff}').trim() == name)
        };
        let require = |name: &'static str| {
            find(name).ok_or_else(|| IngestError::MissingColumn { path: path.to_path_buf(), column: name })
        };
        Ok(Columns {
            keyword: require(KEYWORD_COL)?,
            volume: require(VOLUME_COL)?,
            difficulty: require(DIFFICULTY_COL)?,
            growth: find(GROWTH_COL),
        })
    }
}

fn read_file(path: &Path, date: Option<&str>) -> Result<Vec<KeywordRecord>, IngestError> {
    let csv_err = |source| IngestError::Csv { path: path.to_path_buf(), source };
    let mut reader = ReaderBuilder::new().trim(Trim::All).from_path(path).map_err(csv_err)?;
    let headers = reader.headers().map_err(csv_err)?.clone();
    let cols = Columns::locate(&headers, path)?;

    let file_name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    let category = category_from_file_name(&file_name);

    let mut out = Vec::new();
    let mut skipped = 0usize;
    for row in reader.records() {
        let row = row.map_err(csv_err)?;
        match parse_row(&row, &cols, &category, date) {
            Some(rec) => out.push(rec),
            None => skipped += 1,
        }
    }
    debug!(file = %file_name, %category, rows = out.len(), skipped, "read keyword export");
    Ok(out)
}

fn parse_number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

fn parse_row(row: &StringRecord, cols: &Columns, category: &str, date: Option<&str>) -> Option<KeywordRecord> {
    let keyword = row.get(cols.keyword)?.trim();
    if keyword.is_empty() {
        return None;
    }
    let volume = parse_number(row.get(cols.volume)?).filter(|v| *v >= 0.0)?;
    let difficulty = parse_number(row.get(cols.difficulty)?)?;
    let growth = cols.growth.map(|i| row.get(i).map(parse_growth).unwrap_or(0));
    Some(KeywordRecord {
        provenance: category.to_string(),
        date: date.map(str::to_string),
        keyword: keyword.to_string(),
        volume: volume.trunc() as u64,
        difficulty,
        growth,
    })
}

/// Stable sort by difficulty descending, then apply the dedup policy.
fn finish(mut records: Vec<KeywordRecord>, dedup: DedupPolicy) -> KeywordTable {
    records.sort_by(|a, b| b.difficulty.total_cmp(&a.difficulty));
    if dedup == DedupPolicy::KeepHighestDifficulty {
        let mut seen = HashSet::new();
        records.retain(|r| seen.insert(r.keyword.clone()));
    }
    KeywordTable::new(records)
}
