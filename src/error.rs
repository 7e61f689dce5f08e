//! Crate-level error type and `Result` alias for stable, structured error handling.
//! Converts underlying I/O, GDAL, XML and config errors, and carries the semantic
//! variants of the site pipeline (schema gaps, missing mask attributes, missing
//! hydraulic inputs, layer-count violations).
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("GDAL error: {0}")]
    Gdal(#[from] crate::io::GdalError),

    #[error("XML writer error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Config error: {0}")]
    Config(#[from] serde_json::Error),

    #[error("Unknown source attribute: {name}")]
    UnknownAttribute { name: String },

    #[error("Unit conversion {from} -> {to} not implemented")]
    UnsupportedConversion { from: String, to: String },

    #[error("Source grid lacks every attribute required for the validity mask (expected any of: {required})")]
    MissingRequiredAttribute { required: String },

    #[error("Missing hydraulic input parameter(s): {params}")]
    ParameterMissing { params: String },

    #[error("Cell has {found} valid layers, at most {max} are supported")]
    TooManyLayers { found: usize, max: usize },

    #[error("Shape mismatch for {what}: expected {expected:?}, got {found:?}")]
    ShapeMismatch {
        what: String,
        expected: Vec<usize>,
        found: Vec<usize>,
    },

    #[error("Invalid argument: {arg}={value}")]
    InvalidArgument { arg: &'static str, value: String },

    #[error("Cell id {id} does not fit into the companion raster")]
    IdOverflow { id: u64 },

    #[error("Cell id {id} assigned to more than one site")]
    DuplicateId { id: u64 },

    #[error("Processing error: {0}")]
    Processing(String),
}

impl Error {
    pub fn invalid<V: std::fmt::Display>(arg: &'static str, value: V) -> Self {
        Error::InvalidArgument {
            arg,
            value: value.to_string(),
        }
    }
}

impl From<gdal::errors::GdalError> for Error {
    fn from(e: gdal::errors::GdalError) -> Self {
        Error::Gdal(crate::io::GdalError::Gdal(e))
    }
}
