//! CSV and XLSX export of any tabular result.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::Local;
use rust_xlsxwriter::{Workbook, XlsxError};
use tracing::{info, warn};

use crate::error::ExportError;
use crate::model::{Cell, Tabular};
use crate::utils::sanitize_filename;

pub const DEFAULT_BASE_NAME: &str = "aso_table";
pub const SHEET_NAME: &str = "ASO Data";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    Csv,
    #[default]
    Xlsx,
}

impl ExportFormat {
    fn extension(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Xlsx => "xlsx",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "xlsx" | "excel" => Ok(ExportFormat::Xlsx),
            other => Err(format!("unknown export format '{}' (expected csv or xlsx)", other)),
        }
    }
}

/// Where a table ended up and in which format.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportReport {
    pub format: ExportFormat,
    pub paths: Vec<PathBuf>,
}

/// `<sanitized base>_<YYYYMMDD_HHMMSS>`, with a default base for blank input.
pub fn file_stem(base_name: &str) -> String {
    let base = sanitize_filename(base_name);
    let base = if base.is_empty() { DEFAULT_BASE_NAME.to_string() } else { base };
    format!("{}_{}", base, Local::now().format("%Y%m%d_%H%M%S"))
}

fn render_csv<T: Tabular + ?Sized>(table: &T) -> Result<Vec<u8>, ExportError> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    wtr.write_record(table.headers())?;
    for row in table.rows() {
        wtr.write_record(row.iter().map(|c| c.to_string()))?;
    }
    wtr.into_inner().map_err(|e| ExportError::Io(e.into_error()))
}

fn render_xlsx<T: Tabular + ?Sized>(table: &T) -> Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME)?;
    for (col, header) in table.headers().iter().enumerate() {
        sheet.write_string(0, col as u16, header)?;
    }
    for (r, row) in table.rows().iter().enumerate() {
        let r = r as u32 + 1;
        for (col, cell) in row.iter().enumerate() {
            let col = col as u16;
            match cell {
                Cell::Text(s) => sheet.write_string(r, col, s)?,
                Cell::Int(n) => sheet.write_number(r, col, *n as f64)?,
                Cell::Float(x) => sheet.write_number(r, col, *x)?,
            };
        }
    }
    workbook.save_to_buffer()
}

/// Write `bytes` to the first directory (required) and then to the others,
/// where failures are only logged.
fn write_copies(bytes: &[u8], file_name: &str, dirs: &[PathBuf]) -> Result<Vec<PathBuf>, ExportError> {
    let mut written = Vec::new();
    for (i, dir) in dirs.iter().enumerate() {
        let path = dir.join(file_name);
        match fs::write(&path, bytes) {
            Ok(()) => written.push(path),
            Err(e) if i == 0 => return Err(e.into()),
            Err(e) => warn!(path = %path.display(), error = %e, "could not write extra copy"),
        }
    }
    Ok(written)
}

/// Export into each of `dirs`; the first must succeed. An XLSX export that
/// fails falls back to CSV.
pub fn export_to<T: Tabular + ?Sized>(
    table: &T,
    base_name: &str,
    format: ExportFormat,
    dirs: &[PathBuf],
) -> Result<ExportReport, ExportError> {
    let stem = file_stem(base_name);

    if format == ExportFormat::Xlsx {
        let file_name = format!("{}.xlsx", stem);
        let attempt = render_xlsx(table)
            .map_err(ExportError::from)
            .and_then(|bytes| write_copies(&bytes, &file_name, dirs));
        match attempt {
            Ok(paths) => {
                info!(files = paths.len(), file = %file_name, "exported table");
                return Ok(ExportReport { format, paths });
            }
            Err(e) => warn!(error = %e, "xlsx export failed, writing csv instead"),
        }
    }

    let file_name = format!("{}.csv", stem);
    let paths = write_copies(&render_csv(table)?, &file_name, dirs)?;
    info!(files = paths.len(), file = %file_name, "exported table");
    Ok(ExportReport { format: ExportFormat::Csv, paths })
}

/// Export into `dir` and, when there is one, the user's desktop folder.
pub fn export_table<T: Tabular + ?Sized>(
    table: &T,
    base_name: &str,
    format: ExportFormat,
    dir: &Path,
) -> Result<ExportReport, ExportError> {
    let mut targets = vec![dir.to_path_buf()];
    if let Some(desktop) = dirs::desktop_dir().filter(|d| d.is_dir() && d.as_path() != dir) {
        targets.push(desktop);
    }
    export_to(table, base_name, format, &targets)
}
