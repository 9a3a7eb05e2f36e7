use thiserror::Error;

use crate::parsers::dimacs::DimacsParseError;

pub(crate) type GourdResult<T> = Result<T, GourdError>;

#[derive(Error, Debug)]
pub(crate) enum GourdError {
    #[error("The reported solution violates a clause of the instance")]
    InconsistentSolution,
    #[error("IO error, more details: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to read file {1}, more details: {0}")]
    FileReadingError(std::io::Error, String),
    #[error("The dimacs file was invalid, more details: {0}")]
    InvalidDimacs(#[from] DimacsParseError),
    #[error("Failed to spawn '{1}' for decompressing the input, more details: {0}")]
    DecompressionError(std::io::Error, String),
    #[error("The value {1} for option '{0}' lies outside {2}")]
    InvalidOptionValue(&'static str, f64, &'static str),
}
