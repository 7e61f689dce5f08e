use thiserror::Error;

/// Application-specific errors for the CLI
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Missing required argument: {arg}")]
    MissingArgument { arg: String },

    #[error("No region matches '{codes}' in {path}")]
    UnknownRegion { codes: String, path: String },

    #[error("Coordinate file {path} contains no points")]
    EmptyCoordinateFile { path: String },

    #[error(transparent)]
    Site(#[from] ldndc_site::Error),
}
