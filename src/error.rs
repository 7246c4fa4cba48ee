use std::path::PathBuf;

use thiserror::Error;

/// Errors raised anywhere in the payload / catalog pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Unsupported payload format: {}", .0.display())]
    UnsupportedPayloadFormat(PathBuf),

    #[error("invalid instrument class: {0}")]
    UnknownInstrument(String),

    #[error("Wrong target list format: {}", .0.display())]
    UnsupportedCatalogFormat(PathBuf),

    #[error("data file not found: {}", .0.display())]
    MissingDataFile(PathBuf),

    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    #[error("malformed catalog: {0}")]
    CatalogShape(String),

    #[error("cannot convert {from} to {to}")]
    IncompatibleUnits { from: String, to: String },

    #[error("Unrecognised physical units: {0}")]
    UnrecognisedUnit(String),

    #[error("output store: {0}")]
    Store(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Spreadsheet(#[from] calamine::Error),

    #[error(transparent)]
    Xml(#[from] roxmltree::Error),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
