//! Error type for the OLE2 container writer.

use thiserror::Error;

/// Errors raised while writing the compound file container.
#[derive(Error, Debug)]
pub enum OleError {
    /// I/O error on the output writer or the byte sink
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An auxiliary property stream copied from a source container could
    /// not be read. Its byte length is required for geometry computation,
    /// so container construction is abandoned.
    #[error("failed to read imported property stream: {0}")]
    ImportedStream(std::io::Error),

    /// Invalid data handed to the container writer
    #[error("invalid container data: {0}")]
    InvalidData(String),
}
