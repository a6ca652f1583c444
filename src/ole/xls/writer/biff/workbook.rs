//! Workbook-level BIFF8 record writers.

use super::super::super::XlsResult;
use super::write_record_header;
use crate::ole::writer::ByteSink;

/// Write BOF (Beginning of File) record
///
/// Record type: 0x0809
///
/// `substream_type` is 0x0005 for workbook globals, 0x0010 for a
/// worksheet substream.
pub(crate) fn write_bof<S: ByteSink + ?Sized>(sink: &mut S, substream_type: u16) -> XlsResult<()> {
    write_record_header(sink, 0x0809, 16)?;

    // BIFF version (0x0600 = BIFF8)
    sink.append(&0x0600u16.to_le_bytes())?;
    sink.append(&substream_type.to_le_bytes())?;

    // Build identifier and build year
    sink.append(&0x0DBBu16.to_le_bytes())?;
    sink.append(&0x07CCu16.to_le_bytes())?;

    // File history flags
    sink.append(&0u32.to_le_bytes())?;

    // Lowest BIFF version that can read this file
    sink.append(&6u32.to_le_bytes())?;

    Ok(())
}

/// Write EOF (End of File) record
///
/// Record type: 0x000A
pub(crate) fn write_eof<S: ByteSink + ?Sized>(sink: &mut S) -> XlsResult<()> {
    write_record_header(sink, 0x000A, 0)
}

/// Write CODEPAGE record
///
/// Record type: 0x0042. BIFF8 requires the Unicode codepage 1200 (0x04B0).
pub(crate) fn write_codepage<S: ByteSink + ?Sized>(sink: &mut S, codepage: u16) -> XlsResult<()> {
    write_record_header(sink, 0x0042, 2)?;
    sink.append(&codepage.to_le_bytes())?;
    Ok(())
}

/// Write DATE1904 record
///
/// Record type: 0x0022
pub(crate) fn write_date1904<S: ByteSink + ?Sized>(sink: &mut S, is_1904: bool) -> XlsResult<()> {
    write_record_header(sink, 0x0022, 2)?;
    sink.append(&u16::from(is_1904).to_le_bytes())?;
    Ok(())
}

/// Write WINDOW1 record (workbook window properties)
///
/// Record type: 0x003D
pub(crate) fn write_window1<S: ByteSink + ?Sized>(sink: &mut S) -> XlsResult<()> {
    write_record_header(sink, 0x003D, 18)?;

    sink.append(&0u16.to_le_bytes())?; // xWn: horizontal position
    sink.append(&0u16.to_le_bytes())?; // yWn: vertical position
    sink.append(&0x3000u16.to_le_bytes())?; // dxWn: width
    sink.append(&0x1E00u16.to_le_bytes())?; // dyWn: height
    sink.append(&0x0038u16.to_le_bytes())?; // grbit
    sink.append(&0u16.to_le_bytes())?; // itabCur: active sheet
    sink.append(&0u16.to_le_bytes())?; // itabFirst: first displayed tab
    sink.append(&1u16.to_le_bytes())?; // ctabSel: selected sheet count
    sink.append(&0x0258u16.to_le_bytes())?; // wTabRatio

    Ok(())
}

/// Write UseSelFS (natural language formulas) record.
///
/// Record type: 0x0160, Length: 2. Zero disables natural language
/// formulas, matching modern Excel defaults.
pub(crate) fn write_usesel_fs<S: ByteSink + ?Sized>(sink: &mut S) -> XlsResult<()> {
    write_record_header(sink, 0x0160, 2)?;
    sink.append(&0u16.to_le_bytes())?;
    Ok(())
}

/// Write STYLE record for one built-in style
///
/// Record type: 0x0293. Built-in styles use the compact 4-byte payload:
/// XF index with bit 15 set, the built-in style identifier, and 0xFF for
/// "no outline level".
fn write_style_builtin<S: ByteSink + ?Sized>(
    sink: &mut S,
    xf_index: u16,
    builtin_style_id: u8,
) -> XlsResult<()> {
    let xf_field: u16 = (xf_index & 0x0FFF) | 0x8000;
    write_record_header(sink, 0x0293, 4)?;
    sink.append(&xf_field.to_le_bytes())?;
    sink.append(&[builtin_style_id, 0xFF])?;
    Ok(())
}

/// Write the built-in STYLE records Excel expects in the globals
/// substream. The XF indices assume the standard table layout: style XFs
/// 0..14, default cell XF 15, then the comma/currency/percent style XFs.
pub(crate) fn write_builtin_styles<S: ByteSink + ?Sized>(sink: &mut S) -> XlsResult<()> {
    const MAPPINGS: &[(u16, u8)] = &[
        (0x0010, 3), // Comma
        (0x0011, 6), // Comma [0 decimals]
        (0x0012, 4), // Currency
        (0x0013, 7), // Currency [0 decimals]
        (0x0000, 0), // Normal
        (0x0014, 5), // Percent
    ];

    for &(xf_index, builtin_id) in MAPPINGS {
        write_style_builtin(sink, xf_index, builtin_id)?;
    }
    Ok(())
}

/// Write FORMAT record (number format string)
///
/// Record type: 0x041E
pub(crate) fn write_format_record<S: ByteSink + ?Sized>(
    sink: &mut S,
    index_code: u16,
    format_str: &str,
) -> XlsResult<()> {
    if format_str.is_ascii() {
        let bytes = format_str.as_bytes();
        let cch = bytes.len().min(u16::MAX as usize) as u16;
        write_record_header(sink, 0x041E, 2 + 2 + 1 + cch)?;
        sink.append(&index_code.to_le_bytes())?;
        sink.append(&cch.to_le_bytes())?;
        sink.append(&[0x00])?; // compressed 8-bit
        sink.append(&bytes[..cch as usize])?;
    } else {
        let utf16: Vec<u16> = format_str.encode_utf16().collect();
        let cch = utf16.len().min(u16::MAX as usize) as u16;
        write_record_header(sink, 0x041E, 2 + 2 + 1 + cch.saturating_mul(2))?;
        sink.append(&index_code.to_le_bytes())?;
        sink.append(&cch.to_le_bytes())?;
        sink.append(&[0x01])?; // UTF-16LE
        for code_unit in utf16.iter().take(cch as usize) {
            sink.append(&code_unit.to_le_bytes())?;
        }
    }
    Ok(())
}

/// Write BOUNDSHEET8 record (worksheet metadata)
///
/// Record type: 0x0085
///
/// The stream position of the sheet's BOF record is not known yet when
/// the globals are written; a zero placeholder goes out and the caller
/// patches it through the returned record start offset once the sheet
/// substream lands.
pub(crate) fn write_boundsheet<S: ByteSink + ?Sized>(sink: &mut S, name: &str) -> XlsResult<u64> {
    let record_start = sink.position();

    // Sheet names are validated to at most 31 characters on entry.
    let is_ascii = name.is_ascii();
    let (cch, flags, name_bytes): (u8, u8, Vec<u8>) = if is_ascii {
        (name.len() as u8, 0x00, name.as_bytes().to_vec())
    } else {
        let utf16: Vec<u16> = name.encode_utf16().collect();
        let mut buf = Vec::with_capacity(utf16.len() * 2);
        for ch in &utf16 {
            buf.extend_from_slice(&ch.to_le_bytes());
        }
        (utf16.len() as u8, 0x01, buf)
    };

    let data_len = 4 + 2 + 1 + 1 + name_bytes.len() as u16;
    write_record_header(sink, 0x0085, data_len)?;

    // Absolute stream position of the sheet's BOF, patched later
    sink.append(&0u32.to_le_bytes())?;

    // Sheet state and type (visible worksheet)
    sink.append(&0u16.to_le_bytes())?;

    // ShortXLUnicodeString: cch, flags, characters
    sink.append(&[cch, flags])?;
    sink.append(&name_bytes)?;

    Ok(record_start)
}

/// Patch a BOUNDSHEET record's stream position field.
pub(crate) fn patch_boundsheet_position<S: ByteSink + ?Sized>(
    sink: &mut S,
    record_start: u64,
    position: u32,
) -> XlsResult<()> {
    // The position field sits right behind the 4-byte record header.
    sink.patch(record_start + 4, &position.to_le_bytes())?;
    Ok(())
}
