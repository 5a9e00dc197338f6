use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use clap::{ArgGroup, Args, Parser, Subcommand};
use tracing::{info, warn};

use aso_keywords::export::{export_table, ExportFormat};
use aso_keywords::filter::{
    kvd, local_related, related_keywords, sort_table, RangeColumn, RangeFilter, SortColumn, ViewFilter, MAX_RELATED,
};
use aso_keywords::generate::GenerationPolicy;
use aso_keywords::ingest::{ingest, DedupPolicy, IngestSource};
use aso_keywords::llm::OpenAiClient;
use aso_keywords::model::{KeywordTable, Tabular};
use aso_keywords::pipeline::{GenerationRequest, Pipeline};
use aso_keywords::settings::Settings;
use aso_keywords::words::{tabulate, ProvenanceMode};

#[derive(Parser)]
#[command(name = "aso-keywords", about = "Merge keyword exports and generate App Store titles")]
struct Cli {
    /// Settings file (default: ./aso.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Max rows to display
    #[arg(short = 'n', long, global = true, default_value = "50")]
    limit: usize,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
#[command(group(ArgGroup::new("source").required(true).args(["folder", "dated", "file"])))]
struct SourceArgs {
    /// Folder of keyword export CSVs
    #[arg(long)]
    folder: Option<PathBuf>,
    /// Folder of dated subfolders (e.g. 20.07.2025_trending)
    #[arg(long)]
    dated: Option<PathBuf>,
    /// A single export CSV
    #[arg(long)]
    file: Option<PathBuf>,
    /// Keep every row instead of one per keyword (--folder only)
    #[arg(long)]
    all_variants: bool,
}

impl SourceArgs {
    fn source(&self) -> IngestSource {
        if let Some(path) = &self.dated {
            IngestSource::DatedFolders { path: path.clone() }
        } else if let Some(path) = &self.file {
            IngestSource::SingleFile { path: path.clone() }
        } else {
            let dedup = if self.all_variants { DedupPolicy::KeepAll } else { DedupPolicy::KeepHighestDifficulty };
            IngestSource::Folder { path: self.folder.clone().unwrap_or_default(), dedup }
        }
    }
}

#[derive(Args)]
struct ExportArgs {
    /// Also export the printed table under this base name
    #[arg(long, value_name = "NAME")]
    export: Option<String>,
    /// csv or xlsx
    #[arg(long, default_value = "xlsx")]
    format: ExportFormat,
}

#[derive(Args)]
struct SortArgs {
    /// Sort by category, date, keyword, volume, difficulty or growth
    #[arg(long, value_name = "COLUMN")]
    sort: Option<SortColumn>,
    /// Ascending instead of descending (with --sort)
    #[arg(long, requires = "sort")]
    asc: bool,
}

impl SortArgs {
    fn apply(&self, table: KeywordTable) -> KeywordTable {
        match self.sort {
            Some(column) => sort_table(&table, column, self.asc),
            None => table,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Merge exports into one keyword table
    Merge {
        #[command(flatten)]
        source: SourceArgs,
        #[command(flatten)]
        sort: SortArgs,
        #[command(flatten)]
        export: ExportArgs,
    },
    /// Keywords with volume >= 20 and difficulty <= ceiling
    Kvd {
        #[command(flatten)]
        source: SourceArgs,
        /// Difficulty ceiling (default from settings)
        #[arg(long)]
        ceiling: Option<f64>,
        #[command(flatten)]
        export: ExportArgs,
    },
    /// Word frequencies of the KVD keywords
    Frequency {
        #[command(flatten)]
        source: SourceArgs,
        #[arg(long)]
        ceiling: Option<f64>,
        /// per-word or table-wide category tags (default from settings)
        #[arg(long)]
        provenance: Option<ProvenanceMode>,
        #[command(flatten)]
        export: ExportArgs,
    },
    /// Full pipeline: generate and score title/subtitle candidates
    Run {
        #[command(flatten)]
        source: SourceArgs,
        /// App name that every title must contain
        #[arg(long)]
        app_name: String,
        /// Target market, e.g. "United States"
        #[arg(long, default_value = "United States")]
        market: String,
        #[arg(long)]
        ceiling: Option<f64>,
        /// Drop candidates that break the length or app-name rules
        #[arg(long)]
        strict: bool,
        /// Print the matched keywords of every candidate
        #[arg(long)]
        details: bool,
        /// per-word or table-wide category tags (default from settings)
        #[arg(long)]
        provenance: Option<ProvenanceMode>,
        #[command(flatten)]
        export: ExportArgs,
    },
    /// Narrow a keyword table by ranges and terms
    View {
        #[command(flatten)]
        source: SourceArgs,
        /// Keep keywords equal to, starting with or ending with any term
        #[arg(long)]
        include: Vec<String>,
        /// Drop keywords equal to, starting with or ending with any term
        #[arg(long)]
        exclude: Vec<String>,
        /// Keep keywords whose first and last letters are Latin
        #[arg(long)]
        latin_only: bool,
        /// Keep keywords related to this term (typos, variants, nearby concepts)
        #[arg(long, value_name = "TERM")]
        similar: Option<String>,
        #[arg(long)]
        min_volume: Option<f64>,
        #[arg(long)]
        max_volume: Option<f64>,
        #[arg(long)]
        min_difficulty: Option<f64>,
        #[arg(long)]
        max_difficulty: Option<f64>,
        #[arg(long)]
        min_growth: Option<f64>,
        #[arg(long)]
        max_growth: Option<f64>,
        #[command(flatten)]
        sort: SortArgs,
        #[command(flatten)]
        export: ExportArgs,
    },
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}

fn load(source: &SourceArgs) -> anyhow::Result<KeywordTable> {
    let src = source.source();
    let table = ingest(&src).with_context(|| format!("reading {:?}", src))?;
    println!("Loaded {} keywords", table.len());
    Ok(table)
}

fn range(column: RangeColumn, min: Option<f64>, max: Option<f64>) -> Option<RangeFilter> {
    if min.is_none() && max.is_none() {
        return None;
    }
    Some(RangeFilter {
        column,
        min: min.unwrap_or(f64::NEG_INFINITY),
        max: max.unwrap_or(f64::INFINITY),
    })
}

fn show_and_export<T: Tabular + ?Sized>(
    table: &T,
    export: &ExportArgs,
    settings: &Settings,
    limit: usize,
) -> anyhow::Result<()> {
    print_table(table, limit);
    if let Some(name) = &export.export {
        let report = export_table(table, name, export.format, &settings.export_dir)
            .with_context(|| format!("exporting '{}'", name))?;
        for path in &report.paths {
            println!("Saved {} to {}", report.format, path.display());
        }
    }
    Ok(())
}

/// Related keywords for `term`, matched locally when no chat client can be built.
fn similar_keywords(term: &str, table: &KeywordTable, settings: &Settings) -> Vec<String> {
    match OpenAiClient::from_settings(settings) {
        Ok(client) => related_keywords(term, table, &client, settings),
        Err(e) => {
            warn!(error = %e, "no chat client, matching related keywords locally");
            local_related(term, table, MAX_RELATED)
        }
    }
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let t0 = Instant::now();
    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref()).context("loading settings")?;
    info!(settings = ?settings, "settings loaded");

    let result = match cli.command {
        Commands::Merge { source, sort, export } => {
            let table = sort.apply(load(&source)?);
            show_and_export(&table, &export, &settings, cli.limit)
        }
        Commands::Kvd { source, ceiling, export } => {
            let table = load(&source)?;
            let ceiling = ceiling.unwrap_or(settings.difficulty_ceiling);
            let filtered = kvd(&table, ceiling);
            println!("{} keywords with volume >= 20 and difficulty <= {}", filtered.len(), ceiling);
            show_and_export(&filtered, &export, &settings, cli.limit)
        }
        Commands::Frequency { source, ceiling, provenance, export } => {
            let table = load(&source)?;
            let filtered = kvd(&table, ceiling.unwrap_or(settings.difficulty_ceiling));
            let freq = tabulate(&filtered, provenance.unwrap_or(settings.frequency_provenance));
            println!("{} distinct words in {} keywords", freq.len(), filtered.len());
            show_and_export(&freq, &export, &settings, cli.limit)
        }
        Commands::Run { source, app_name, market, ceiling, strict, details, provenance, export } => {
            let mut settings = settings.clone();
            if let Some(mode) = provenance {
                settings.frequency_provenance = mode;
            }
            let client = OpenAiClient::from_settings(&settings).context("creating chat client")?;
            let universe = load(&source)?;
            let request = GenerationRequest {
                difficulty_ceiling: ceiling.unwrap_or(settings.difficulty_ceiling),
                policy: if strict { GenerationPolicy::Strict } else { GenerationPolicy::Advisory },
                ..GenerationRequest::new(app_name, market, &settings)
            };
            let t_run = Instant::now();
            let outcome = Pipeline::new(&settings, client).run(&universe, &request)?;
            println!(
                "Generated {} candidates in {:.1}s (attempt {}, difficulty ceiling {})",
                outcome.candidates.len(),
                t_run.elapsed().as_secs_f64(),
                outcome.attempts,
                outcome.final_ceiling
            );
            for m in outcome.tracker.metrics().iter().filter(|m| m.attempt == outcome.attempts) {
                println!("  {:<12} {:>6} -> {:<6}", m.stage, m.before, m.after);
            }
            println!();
            if details {
                print_table(outcome.matches.as_slice(), cli.limit);
                println!();
            }
            show_and_export(outcome.scored.as_slice(), &export, &settings, cli.limit)
        }
        Commands::View {
            source,
            include,
            exclude,
            latin_only,
            similar,
            min_volume,
            max_volume,
            min_difficulty,
            max_difficulty,
            min_growth,
            max_growth,
            sort,
            export,
        } => {
            let table = load(&source)?;
            let similar = similar.map(|term| {
                let related = similar_keywords(&term, &table, &settings);
                println!("{} keywords related to '{}'", related.len(), term);
                related
            });
            let filter = ViewFilter {
                ranges: [
                    range(RangeColumn::Volume, min_volume, max_volume),
                    range(RangeColumn::Difficulty, min_difficulty, max_difficulty),
                    range(RangeColumn::Growth, min_growth, max_growth),
                ]
                .into_iter()
                .flatten()
                .collect(),
                include,
                exclude,
                latin_only,
                similar,
            };
            let view = sort.apply(filter.apply(&table));
            println!("Filters: {} | {} of {} keywords", filter.summary(), view.len(), table.len());
            show_and_export(&view, &export, &settings, cli.limit)
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }
    result
}

const MAX_CELL: usize = 32;

fn print_table<T: Tabular + ?Sized>(table: &T, limit: usize) {
    let headers = table.headers();
    let rows: Vec<Vec<String>> = table
        .rows()
        .iter()
        .map(|r| r.iter().map(|c| truncate(&c.to_string(), MAX_CELL)).collect())
        .collect();
    if rows.is_empty() {
        println!("(no rows)");
        return;
    }

    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows.iter().take(limit) {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let line = |cells: &[String]| {
        cells
            .iter()
            .zip(&widths)
            .map(|(c, w)| format!("{:<width$}", c, width = *w))
            .collect::<Vec<_>>()
            .join(" | ")
    };
    println!("{:>3} | {}", "#", line(headers.as_slice()));
    println!("{}", "-".repeat(6 + widths.iter().sum::<usize>() + 3 * widths.len().saturating_sub(1)));
    for (i, row) in rows.iter().take(limit).enumerate() {
        println!("{:>3} | {}", i + 1, line(row.as_slice()));
    }
    if rows.len() > limit {
        println!("... {} more rows", rows.len() - limit);
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else {
        format!("{}m {}s", secs / 60, secs % 60)
    }
}
