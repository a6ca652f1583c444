//! Legacy Excel (.xls) file format writer
//!
//! This module serializes workbooks into the legacy binary format
//! (.xls files), which are OLE2-based files. The implementation follows
//! the BIFF8 (Binary Interchange File Format) record layout used by
//! Excel 97-2003.

/// Error types for XLS serialization
mod error;

/// Workbook serialization implementation
pub mod writer;

pub use error::{XlsError, XlsResult};
