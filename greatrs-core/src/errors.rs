use thiserror::Error;

#[derive(Error, Debug)]
pub enum GreatError {
    #[error("Mandatory column \"{0}\" not found in input")]
    MissingColumn(String),

    #[error("Column \"{column}\" is not coercible to integer coordinates: {source}")]
    InvalidCoordinate {
        column: String,
        #[source]
        source: polars::prelude::PolarsError,
    },

    #[error("Row {row} has {found} fields, expected {expected}")]
    RaggedInput {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("Invalid {what} \"{given}\". Valid options include: {valid}")]
    InvalidOption {
        what: &'static str,
        given: String,
        valid: &'static str,
    },

    #[error("Loading exceeded {seconds} seconds while waiting for {waiting_for}. {hint}")]
    AnalysisTimeout {
        waiting_for: &'static str,
        seconds: u64,
        hint: &'static str,
    },

    #[error(
        "Results table stayed empty after {attempts} attempts. \
         The server may still be rendering, or returned an unexpected page. \
         Use headless(false) to troubleshoot."
    )]
    EmptyAfterRetries { attempts: usize },

    #[error("Expected page element not found: {0}")]
    MissingElement(String),

    #[error("Gene association count ({found}) does not match region count ({expected})")]
    AssociationMismatch { expected: usize, found: usize },

    #[error(transparent)]
    Polars(#[from] polars::prelude::PolarsError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Image decoding failed: {0}")]
    Image(#[from] image::ImageError),

    #[error("Spreadsheet read failed: {0}")]
    Spreadsheet(#[from] calamine::Error),

    // headless_chrome surfaces anyhow errors
    #[error(transparent)]
    Browser(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, GreatError>;
