//! XLS workbook writer implementation.
//!
//! # Architecture
//!
//! The writer accumulates a workbook model — sheets with cell arenas, a
//! shared string table, a per-workbook format registry — and serializes
//! it in a single synchronous pass when `save` or `write_to` is called:
//! the BIFF record stream goes into a byte sink first, and once every
//! stream length is final the OLE2 container is computed and written
//! around it.
//!
//! # Example
//!
//! ```rust,no_run
//! use xlscribe::ole::xls::writer::Workbook;
//!
//! let mut workbook = Workbook::new();
//! let sheet = workbook.add_worksheet("Sheet1")?;
//!
//! workbook.write_string(sheet, 0, 0, "Hello")?;
//! workbook.write_number(sheet, 0, 1, 42.0)?;
//!
//! workbook.save("output.xls")?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::collections::HashMap;
use std::io::Write;

use super::super::{XlsError, XlsResult};
use super::formatting::{ExtendedFormat, FormattingManager};
use crate::ole::writer::{ByteSink, FileSink, ImportedPropertySet, MemorySink, write_container};

mod stream;
mod worksheet;

use self::stream::WorkbookStreamWriter;
pub use self::worksheet::{CellPayload, Worksheet};

/// Workbook writer for the legacy Excel binary format.
///
/// Each workbook owns its sheets, its shared string table, and its own
/// format registry; nothing is shared across workbook instances.
pub struct Workbook {
    worksheets: Vec<Worksheet>,
    fmt: FormattingManager,
    use_1904_dates: bool,
    temp_file_backed: bool,
    imported: Vec<ImportedPropertySet>,
}

impl Workbook {
    /// Create an empty workbook.
    pub fn new() -> Self {
        Self {
            worksheets: Vec::new(),
            fmt: FormattingManager::new(),
            use_1904_dates: false,
            temp_file_backed: false,
            imported: Vec::new(),
        }
    }

    /// Add a worksheet and return its index.
    ///
    /// Names must be 1-31 characters and unique within the workbook.
    pub fn add_worksheet(&mut self, name: &str) -> XlsResult<usize> {
        if name.is_empty() || name.chars().count() > 31 {
            return Err(XlsError::InvalidSheetName(format!(
                "{:?} must be 1-31 characters",
                name
            )));
        }
        if self.worksheets.iter().any(|sheet| sheet.name() == name) {
            return Err(XlsError::InvalidSheetName(format!(
                "{:?} already exists",
                name
            )));
        }

        let index = self.worksheets.len();
        self.worksheets.push(Worksheet::new(name.to_string()));
        Ok(index)
    }

    /// Write a string cell. The string is interned into the shared
    /// string table at serialization time.
    pub fn write_string(&mut self, sheet: usize, row: u32, col: u16, value: &str) -> XlsResult<()> {
        self.write_cell(sheet, row, col, 0, CellPayload::Label(value.to_string()))
    }

    pub fn write_string_with_format(
        &mut self,
        sheet: usize,
        row: u32,
        col: u16,
        value: &str,
        format: u16,
    ) -> XlsResult<()> {
        self.write_cell(sheet, row, col, format, CellPayload::Label(value.to_string()))
    }

    /// Write a numeric cell.
    pub fn write_number(&mut self, sheet: usize, row: u32, col: u16, value: f64) -> XlsResult<()> {
        self.write_cell(sheet, row, col, 0, CellPayload::Number(value))
    }

    pub fn write_number_with_format(
        &mut self,
        sheet: usize,
        row: u32,
        col: u16,
        value: f64,
        format: u16,
    ) -> XlsResult<()> {
        self.write_cell(sheet, row, col, format, CellPayload::Number(value))
    }

    /// Write a boolean cell.
    pub fn write_boolean(&mut self, sheet: usize, row: u32, col: u16, value: bool) -> XlsResult<()> {
        self.write_cell(sheet, row, col, 0, CellPayload::Boolean(value))
    }

    /// Write a formatted blank cell.
    pub fn write_blank(&mut self, sheet: usize, row: u32, col: u16, format: u16) -> XlsResult<()> {
        self.write_cell(sheet, row, col, format, CellPayload::Blank)
    }

    /// Write a formula cell from a pre-compiled token array and its
    /// cached result. Token compilation happens outside this engine.
    pub fn write_formula(
        &mut self,
        sheet: usize,
        row: u32,
        col: u16,
        tokens: Vec<u8>,
        cached: f64,
    ) -> XlsResult<()> {
        self.write_cell(sheet, row, col, 0, CellPayload::Formula { tokens, cached })
    }

    fn write_cell(
        &mut self,
        sheet: usize,
        row: u32,
        col: u16,
        format: u16,
        payload: CellPayload,
    ) -> XlsResult<()> {
        if self.fmt.format(format).is_none() {
            return Err(XlsError::InvalidFormat(format));
        }
        let worksheet = self
            .worksheets
            .get_mut(sheet)
            .ok_or(XlsError::WorksheetNotFound(sheet))?;
        worksheet.insert(row, col, format, payload)
    }

    /// Register a number format pattern, returning its format index.
    pub fn register_number_format(&mut self, pattern: &str) -> u16 {
        self.fmt.register_number_format(pattern)
    }

    /// Register a cell format, returning the handle to pass to the
    /// `*_with_format` methods.
    pub fn add_cell_format(&mut self, format: ExtendedFormat) -> u16 {
        self.fmt.add_format(format)
    }

    /// Use the 1904 date system (Mac) instead of 1900 (Windows, default).
    pub fn set_1904_dates(&mut self, use_1904: bool) {
        self.use_1904_dates = use_1904;
    }

    /// Buffer the workbook stream in a temp file instead of memory.
    pub fn set_temp_file_backed(&mut self, temp_file_backed: bool) {
        self.temp_file_backed = temp_file_backed;
    }

    /// Carry auxiliary property streams from a source container into the
    /// output file. A failed read aborts, since every stream length is
    /// needed for the container geometry.
    pub fn import_property_sets<I>(&mut self, sets: I) -> XlsResult<()>
    where
        I: IntoIterator<Item = std::io::Result<ImportedPropertySet>>,
    {
        self.imported
            .extend(crate::ole::writer::collect_imported(sets)?);
        Ok(())
    }

    /// Number of worksheets in this workbook.
    pub fn worksheet_count(&self) -> usize {
        self.worksheets.len()
    }

    /// Worksheet name by index.
    pub fn worksheet_name(&self, index: usize) -> Option<&str> {
        self.worksheets.get(index).map(Worksheet::name)
    }

    /// Serialize the workbook to a file.
    pub fn save<P: AsRef<std::path::Path>>(&self, path: P) -> XlsResult<()> {
        let file = std::fs::File::create(path)?;
        let mut buffered = std::io::BufWriter::new(file);
        self.write_to(&mut buffered)?;
        buffered.flush()?;
        Ok(())
    }

    /// Serialize the workbook to a writer.
    pub fn write_to<W: Write>(&self, out: &mut W) -> XlsResult<()> {
        if self.temp_file_backed {
            let mut sink = FileSink::new()?;
            self.serialize(&mut sink, out)
        } else {
            let mut sink = MemorySink::new();
            self.serialize(&mut sink, out)
        }
    }

    /// Phase one: build the shared string table and append every record
    /// to the sink. Phase two: wrap the finished stream in the container.
    fn serialize<S: ByteSink, W: Write>(&self, sink: &mut S, out: &mut W) -> XlsResult<()> {
        let (strings, string_map, total_refs) = self.build_shared_strings();
        let sheet_names: Vec<&str> = self.worksheets.iter().map(Worksheet::name).collect();

        let mut writer =
            WorkbookStreamWriter::begin(sink, &self.fmt, &sheet_names, self.use_1904_dates)?;
        writer.append_shared_strings(&strings, total_refs)?;
        for worksheet in &self.worksheets {
            writer.append_sheet(worksheet, &self.fmt, &string_map)?;
        }

        write_container(sink, &self.imported, out)?;
        Ok(())
    }

    /// Collect the distinct label strings across all sheets, in first-use
    /// order, together with the total reference count.
    fn build_shared_strings(&self) -> (Vec<String>, HashMap<String, u32>, u32) {
        let mut strings = Vec::new();
        let mut map = HashMap::new();
        let mut total_refs = 0u32;

        for worksheet in &self.worksheets {
            for cells in worksheet.rows.values() {
                for cell in cells {
                    if let CellPayload::Label(label) = &cell.payload {
                        total_refs = total_refs.saturating_add(1);
                        if !map.contains_key(label) {
                            map.insert(label.clone(), strings.len() as u32);
                            strings.push(label.clone());
                        }
                    }
                }
            }
        }

        (strings, map, total_refs)
    }
}

impl Default for Workbook {
    fn default() -> Self {
        Self::new()
    }
}
