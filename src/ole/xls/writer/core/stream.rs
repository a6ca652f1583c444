//! Workbook stream serialization.
//!
//! Phase one of the write protocol: every logical record is appended to
//! the byte sink here, with fixed-width placeholders reserved for the
//! values only knowable later — each BOUNDSHEET's stream offset and each
//! sheet's INDEX slots — and back-patched once the dependent content has
//! been written. The finished sink is handed to the container writer as
//! an opaque blob.

use smallvec::SmallVec;
use std::collections::HashMap;

use super::super::super::XlsResult;
use super::super::biff::{cells, sst, workbook as wb, worksheet as ws};
use super::super::formatting::FormattingManager;
use super::worksheet::{Cell, CellPayload, Worksheet};
use crate::ole::writer::ByteSink;

/// Rows covered by one DBCELL block.
const ROWS_PER_BLOCK: u16 = 32;

/// Emits the workbook globals and sheet substreams in order.
///
/// The seam around the serialization engine: `begin` writes the globals
/// prologue, `append_shared_strings` closes the globals substream, and
/// `append_sheet` emits one sheet substream per call, patching the
/// sheet's BOUNDSHEET offset as it lands.
pub(crate) struct WorkbookStreamWriter<'a, S: ByteSink> {
    sink: &'a mut S,
    boundsheet_records: Vec<u64>,
    globals_open: bool,
    sheets_appended: usize,
}

impl<'a, S: ByteSink> WorkbookStreamWriter<'a, S> {
    /// Write the workbook globals up to the BOUNDSHEET table.
    pub(crate) fn begin(
        sink: &'a mut S,
        fmt: &FormattingManager,
        sheet_names: &[&str],
        use_1904_dates: bool,
    ) -> XlsResult<Self> {
        wb::write_bof(sink, 0x0005)?;
        wb::write_codepage(sink, 0x04B0)?;
        wb::write_date1904(sink, use_1904_dates)?;
        wb::write_window1(sink)?;

        // Formatting tables: FONT, FORMAT, then XF records, followed by
        // the built-in STYLE records.
        fmt.write_fonts(sink)?;
        fmt.write_number_formats(sink)?;
        fmt.write_formats(sink)?;
        wb::write_builtin_styles(sink)?;
        wb::write_usesel_fs(sink)?;

        let mut boundsheet_records = Vec::with_capacity(sheet_names.len());
        for name in sheet_names {
            boundsheet_records.push(wb::write_boundsheet(sink, name)?);
        }

        Ok(Self {
            sink,
            boundsheet_records,
            globals_open: true,
            sheets_appended: 0,
        })
    }

    /// Append the shared string table with its EXTSST index and close the
    /// globals substream.
    pub(crate) fn append_shared_strings(
        &mut self,
        strings: &[String],
        total_refs: u32,
    ) -> XlsResult<()> {
        let index = sst::write_shared_strings(self.sink, strings, total_refs)?;
        sst::write_extsst(self.sink, &index)?;
        wb::write_eof(self.sink)?;
        self.globals_open = false;
        Ok(())
    }

    /// Append one sheet substream and patch its BOUNDSHEET offset.
    pub(crate) fn append_sheet(
        &mut self,
        sheet: &Worksheet,
        fmt: &FormattingManager,
        string_map: &HashMap<String, u32>,
    ) -> XlsResult<()> {
        debug_assert!(
            !self.globals_open,
            "shared strings must be appended before the first sheet"
        );

        let position = self.sink.position() as u32;
        wb::patch_boundsheet_position(
            self.sink,
            self.boundsheet_records[self.sheets_appended],
            position,
        )?;
        self.sheets_appended += 1;

        write_sheet_stream(self.sink, sheet, fmt, string_map)
    }
}

/// Serialize one sheet substream: BOF, INDEX, view records, DIMENSIONS,
/// the row blocks, EOF — then back-patch the INDEX with the DBCELL
/// positions captured along the way.
fn write_sheet_stream<S: ByteSink + ?Sized>(
    sink: &mut S,
    sheet: &Worksheet,
    fmt: &FormattingManager,
    string_map: &HashMap<String, u32>,
) -> XlsResult<()> {
    let (row_first, row_last, col_first, col_last) = sheet.bounds().unwrap_or((0, 0, 0, 0));

    let rows: Vec<(u16, &Vec<Cell>)> = sheet.rows.iter().map(|(&row, cells)| (row, cells)).collect();
    let mut blocks: Vec<&[(u16, &Vec<Cell>)]> = Vec::new();
    let mut block_start = 0;
    for i in 1..=rows.len() {
        if i == rows.len() || rows[i].0 / ROWS_PER_BLOCK != rows[block_start].0 / ROWS_PER_BLOCK {
            blocks.push(&rows[block_start..i]);
            block_start = i;
        }
    }

    wb::write_bof(sink, 0x0010)?;
    let index_slots = ws::write_index(sink, row_first, row_last, blocks.len())?;
    ws::write_wsbool(sink)?;
    ws::write_window2(sink)?;
    ws::write_dimensions(sink, row_first, row_last, col_first, col_last)?;

    let mut dbcell_positions = Vec::with_capacity(blocks.len());
    for block in &blocks {
        dbcell_positions.push(write_row_block(sink, block, fmt, string_map)?);
    }

    wb::write_eof(sink)?;
    ws::patch_index_dbcells(sink, index_slots, &dbcell_positions)
}

/// Serialize one 32-row block: all ROW records first, then the cell
/// records row by row, then the block's DBCELL. Returns the DBCELL's
/// stream position for the sheet INDEX.
///
/// The DBCELL deltas depend on positions that only exist once the
/// records around them are written, so every reference position is
/// captured during emission and the deltas are computed at the end.
fn write_row_block<S: ByteSink + ?Sized>(
    sink: &mut S,
    rows: &[(u16, &Vec<Cell>)],
    fmt: &FormattingManager,
    string_map: &HashMap<String, u32>,
) -> XlsResult<u32> {
    let mut first_row_position = 0;
    for (i, &(row, cells)) in rows.iter().enumerate() {
        if i == 0 {
            first_row_position = sink.position();
        }
        let col_first = cells.first().map_or(0, |c| c.col);
        let col_last = cells.last().map_or(0, |c| c.col + 1);
        ws::write_row(sink, row, col_first, col_last)?;
    }

    // Baseline for the first cell delta: the position right behind the
    // block's ROW records.
    let baseline = sink.position();

    let mut first_cell_positions: SmallVec<[u64; 32]> = SmallVec::new();
    for &(row, cells) in rows {
        first_cell_positions.push(sink.position());
        write_row_cells(sink, row, cells, fmt, string_map)?;
    }

    let dbcell_position = sink.position();
    let first_row_delta = (dbcell_position - first_row_position) as u32;
    let mut deltas: SmallVec<[u16; 32]> = SmallVec::new();
    let mut previous = baseline;
    for &position in &first_cell_positions {
        deltas.push((position - previous) as u16);
        previous = position;
    }
    ws::write_dbcell(sink, first_row_delta, &deltas)?;

    Ok(dbcell_position as u32)
}

/// A cell held back as part of a candidate MULRK run.
struct RunCell {
    xf_index: u16,
    value: f64,
    rk: u32,
}

/// Serialize one row's cells left to right, compacting maximal runs of
/// RK-qualifying numbers.
fn write_row_cells<S: ByteSink + ?Sized>(
    sink: &mut S,
    row: u16,
    cells: &[Cell],
    fmt: &FormattingManager,
    string_map: &HashMap<String, u32>,
) -> XlsResult<()> {
    let mut run: SmallVec<[RunCell; 8]> = SmallVec::new();
    let mut run_start: u16 = 0;

    for cell in cells {
        let xf_index = fmt.cell_xf_index_for(cell.format);

        let qualifying = match cell.payload {
            CellPayload::Number(value) => cells::rk_from_f64(value).map(|rk| (value, rk)),
            _ => None,
        };

        match qualifying {
            Some((value, rk)) => {
                // A column gap ends the run even between qualifying cells.
                if !run.is_empty() && run_start + run.len() as u16 != cell.col {
                    flush_run(sink, row, run_start, &mut run)?;
                }
                if run.is_empty() {
                    run_start = cell.col;
                }
                run.push(RunCell {
                    xf_index,
                    value,
                    rk,
                });
            },
            None => {
                flush_run(sink, row, run_start, &mut run)?;
                match &cell.payload {
                    CellPayload::Number(value) => {
                        cells::write_number(sink, row, cell.col, xf_index, *value)?;
                    },
                    CellPayload::Label(label) => {
                        let sst_index = *string_map.get(label).unwrap();
                        cells::write_labelsst(sink, row, cell.col, xf_index, sst_index)?;
                    },
                    CellPayload::Boolean(value) => {
                        cells::write_boolerr(sink, row, cell.col, xf_index, *value)?;
                    },
                    CellPayload::Blank => {
                        cells::write_blank(sink, row, cell.col, xf_index)?;
                    },
                    CellPayload::Formula { tokens, cached } => {
                        cells::write_formula(sink, row, cell.col, xf_index, *cached, tokens)?;
                    },
                }
            },
        }
    }

    flush_run(sink, row, run_start, &mut run)
}

/// Flush a pending run: three or more cells become one MULRK record,
/// shorter runs are written as individual NUMBER records.
fn flush_run<S: ByteSink + ?Sized>(
    sink: &mut S,
    row: u16,
    run_start: u16,
    run: &mut SmallVec<[RunCell; 8]>,
) -> XlsResult<()> {
    if run.len() >= 3 {
        let packed: SmallVec<[(u16, u32); 8]> =
            run.iter().map(|cell| (cell.xf_index, cell.rk)).collect();
        cells::write_mulrk(sink, row, run_start, &packed)?;
    } else {
        for (i, cell) in run.iter().enumerate() {
            cells::write_number(sink, row, run_start + i as u16, cell.xf_index, cell.value)?;
        }
    }
    run.clear();
    Ok(())
}
