use std::io;
use thiserror::Error;

/// Errors raised outside the best-effort conversion core: reading sources,
/// building the DOM and writing GeoJSON.
#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("XML parsing error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("document has no root element")]
    EmptyDocument,

    #[error("element <{0}> is never closed")]
    UnclosedElement(String),

    #[error("unsupported source format: {0}")]
    UnsupportedFormat(String),

    #[error("KMZ archive contains no .kml entry")]
    MissingKml,
}

pub type Result<T> = std::result::Result<T, Error>;
