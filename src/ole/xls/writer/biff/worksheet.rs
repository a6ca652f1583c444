//! Worksheet-level BIFF8 record writers.

use super::super::super::XlsResult;
use super::write_record_header;
use crate::ole::writer::ByteSink;
use bitflags::bitflags;

bitflags! {
    /// Option flags of the ROW record.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub(crate) struct RowFlags: u16 {
        const COLLAPSED = 0x0010;
        const HIDDEN = 0x0020;
        const UNSYNCED_HEIGHT = 0x0040;
        const FORMATTED = 0x0080;
        /// Always set in BIFF8
        const REQUIRED = 0x0100;
    }
}

bitflags! {
    /// Option flags of the WINDOW2 record.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub(crate) struct SheetViewFlags: u16 {
        const DISPLAY_FORMULAS = 0x0001;
        const DISPLAY_GRIDLINES = 0x0002;
        const DISPLAY_HEADINGS = 0x0004;
        const DISPLAY_ZEROS = 0x0010;
        const DEFAULT_HEADER_COLOR = 0x0020;
        const DISPLAY_GUTS = 0x0080;
        const FROZEN_NO_SPLIT = 0x0100;
        const SELECTED = 0x0200;
        const ACTIVE = 0x0400;
    }
}

/// Write ROW record
///
/// Record type: 0x0208. Rows carry default height and formatting; the
/// column span is the half-open range of the row's populated cells.
pub(crate) fn write_row<S: ByteSink + ?Sized>(
    sink: &mut S,
    row: u16,
    col_first: u16,
    col_last_exclusive: u16,
) -> XlsResult<()> {
    write_record_header(sink, 0x0208, 16)?;
    sink.append(&row.to_le_bytes())?;
    sink.append(&col_first.to_le_bytes())?;
    sink.append(&col_last_exclusive.to_le_bytes())?;
    sink.append(&0x00FFu16.to_le_bytes())?; // miyRw: default height
    sink.append(&0u16.to_le_bytes())?; // irwMac, reserved
    sink.append(&0u16.to_le_bytes())?; // reserved
    sink.append(&RowFlags::REQUIRED.bits().to_le_bytes())?;
    sink.append(&0x000Fu16.to_le_bytes())?; // ixfe: default cell XF
    Ok(())
}

/// Write DBCELL record (row block reverse index)
///
/// Record type: 0x00D7. `first_row_delta` points backward from this
/// record to the block's first ROW record; each entry of `cell_deltas`
/// advances from the previous reference point to a populated row's first
/// cell record, as captured during emission.
pub(crate) fn write_dbcell<S: ByteSink + ?Sized>(
    sink: &mut S,
    first_row_delta: u32,
    cell_deltas: &[u16],
) -> XlsResult<()> {
    let data_len = 4 + 2 * cell_deltas.len() as u16;
    write_record_header(sink, 0x00D7, data_len)?;
    sink.append(&first_row_delta.to_le_bytes())?;
    for &delta in cell_deltas {
        sink.append(&delta.to_le_bytes())?;
    }
    Ok(())
}

/// Write INDEX record with zeroed DBCELL slots
///
/// Record type: 0x020B. The DBCELL positions are unknown until the row
/// blocks are serialized; zero placeholders go out here and
/// [`patch_index_dbcells`] overwrites them afterwards. Returns the stream
/// offset of the first DBCELL slot.
pub(crate) fn write_index<S: ByteSink + ?Sized>(
    sink: &mut S,
    row_first: u32,
    row_last_exclusive: u32,
    block_count: usize,
) -> XlsResult<u64> {
    let data_len = 16 + 4 * block_count as u16;
    write_record_header(sink, 0x020B, data_len)?;
    sink.append(&0u32.to_le_bytes())?; // reserved
    sink.append(&row_first.to_le_bytes())?;
    sink.append(&row_last_exclusive.to_le_bytes())?;
    sink.append(&0u32.to_le_bytes())?; // reserved
    let slots_offset = sink.position();
    sink.append(&vec![0u8; 4 * block_count])?;
    Ok(slots_offset)
}

/// Back-patch the INDEX record with the DBCELL stream positions.
pub(crate) fn patch_index_dbcells<S: ByteSink + ?Sized>(
    sink: &mut S,
    slots_offset: u64,
    dbcell_positions: &[u32],
) -> XlsResult<()> {
    for (i, &position) in dbcell_positions.iter().enumerate() {
        sink.patch(slots_offset + 4 * i as u64, &position.to_le_bytes())?;
    }
    Ok(())
}

/// Write DIMENSIONS record (used cell range)
///
/// Record type: 0x0200. Row and column bounds are half-open.
pub(crate) fn write_dimensions<S: ByteSink + ?Sized>(
    sink: &mut S,
    row_first: u32,
    row_last_exclusive: u32,
    col_first: u16,
    col_last_exclusive: u16,
) -> XlsResult<()> {
    write_record_header(sink, 0x0200, 14)?;
    sink.append(&row_first.to_le_bytes())?;
    sink.append(&row_last_exclusive.to_le_bytes())?;
    sink.append(&col_first.to_le_bytes())?;
    sink.append(&col_last_exclusive.to_le_bytes())?;
    sink.append(&0u16.to_le_bytes())?; // reserved
    Ok(())
}

/// Write WSBOOL record (sheet workspace flags)
///
/// Record type: 0x0081. Default flags for a normal worksheet.
pub(crate) fn write_wsbool<S: ByteSink + ?Sized>(sink: &mut S) -> XlsResult<()> {
    write_record_header(sink, 0x0081, 2)?;
    sink.append(&0x04C1u16.to_le_bytes())?;
    Ok(())
}

/// Write WINDOW2 record (sheet view settings)
///
/// Record type: 0x023E
pub(crate) fn write_window2<S: ByteSink + ?Sized>(sink: &mut S) -> XlsResult<()> {
    let options = SheetViewFlags::DISPLAY_GRIDLINES
        | SheetViewFlags::DISPLAY_HEADINGS
        | SheetViewFlags::DISPLAY_ZEROS
        | SheetViewFlags::DEFAULT_HEADER_COLOR
        | SheetViewFlags::DISPLAY_GUTS
        | SheetViewFlags::FROZEN_NO_SPLIT
        | SheetViewFlags::SELECTED
        | SheetViewFlags::ACTIVE;

    write_record_header(sink, 0x023E, 18)?;
    sink.append(&options.bits().to_le_bytes())?;
    sink.append(&0u16.to_le_bytes())?; // rwTop
    sink.append(&0u16.to_le_bytes())?; // colLeft
    sink.append(&0x0040u16.to_le_bytes())?; // icvHdr: header color
    sink.append(&[0u8; 10])?; // zoom factors and reserved fields
    Ok(())
}
