//! Xlscribe - a Rust library for writing legacy Microsoft Excel workbooks
//!
//! This library serializes an in-memory spreadsheet model into the legacy
//! Excel binary format: a BIFF8 record stream stored in the `Workbook`
//! stream of an OLE2 (Object Linking and Embedding) compound document.
//!
//! # Features
//!
//! - **BIFF8 record generation**: workbook globals, shared string table
//!   with CONTINUE/EXTSST framing, worksheet row blocks with DBCELL
//!   indexing and MULRK compaction
//! - **OLE2 container writer**: block geometry computed up front, big and
//!   small block depots, extension (DIFAT) blocks, property storage tree
//! - **Memory- or temp-file-backed output**: identical results either way
//!
//! # Example - Writing an XLS file
//!
//! ```no_run
//! use xlscribe::ole::xls::writer::Workbook;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut workbook = Workbook::new();
//! let sheet = workbook.add_worksheet("Sheet1")?;
//!
//! workbook.write_string(sheet, 0, 0, "Hello")?;
//! workbook.write_number(sheet, 0, 1, 42.0)?;
//!
//! workbook.save("output.xls")?;
//! # Ok(())
//! # }
//! ```

/// OLE2 (Object Linking and Embedding) container and workbook writer
///
/// This module provides functionality to generate OLE2 structured storage
/// files, which wrap the BIFF8 workbook stream produced by the `xls`
/// submodule.
pub mod ole;

// Re-export commonly used types for convenience
pub use ole::xls::writer::{CellPayload, Workbook};
pub use ole::xls::{XlsError, XlsResult};
