//! Error types for XLS serialization.

use crate::ole::OleError;
use thiserror::Error;

/// Result type alias for XLS operations
pub type XlsResult<T> = Result<T, XlsError>;

/// Errors that can occur while serializing an XLS workbook.
#[derive(Error, Debug)]
pub enum XlsError {
    /// I/O error on the byte sink or the output writer
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Container-level failure while wrapping the workbook stream
    #[error("container error: {0}")]
    Container(#[from] OleError),

    /// A cell was addressed past the BIFF8 row ceiling
    #[error("row {0} exceeds the BIFF8 limit of 65536 rows")]
    RowsExceeded(u32),

    /// Worksheet index out of range
    #[error("worksheet {0} not found")]
    WorksheetNotFound(usize),

    /// Unknown cell format handle
    #[error("invalid format handle: {0}")]
    InvalidFormat(u16),

    /// Worksheet name empty, too long, or already taken
    #[error("invalid worksheet name: {0}")]
    InvalidSheetName(String),
}
