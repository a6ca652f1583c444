/// Constants for the OLE2 compound file format
pub mod consts;

/// Error type shared by the container writer
mod error;

/// OLE2 compound file writing implementation
pub mod writer;

/// Legacy Excel (.xls) workbook serialization
///
/// This module provides functionality to serialize spreadsheet content
/// into the legacy binary format (.xls files), which are OLE2-based files.
pub mod xls;

// Re-export public types for convenient access
pub use error::OleError;
