use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("path does not exist: {0}")]
    MissingPath(PathBuf),

    #[error("no .csv files found in {0}")]
    NoCsvFiles(PathBuf),

    #[error("no dated subfolders found in {0}")]
    NoSubfolders(PathBuf),

    #[error("{path}: required column '{column}' is missing")]
    MissingColumn { path: PathBuf, column: &'static str },

    #[error("{path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Failures talking to the chat-completion service.
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("completion had no content")]
    EmptyCompletion,

    #[error("no API key configured (set ASO_API_KEY or OPENAI_API_KEY)")]
    MissingApiKey,
}

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("response is not valid JSON: {0}")]
    NotJson(#[from] serde_json::Error),

    #[error("unexpected JSON shape: {0}")]
    Shape(String),
}

#[derive(Error, Debug)]
pub enum ExportError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("keyword table is empty")]
    EmptyKeywordUniverse,

    #[error("no title/subtitle candidates after {attempts} attempts (last difficulty ceiling {last_ceiling})")]
    GenerationExhausted { attempts: usize, last_ceiling: f64 },
}
