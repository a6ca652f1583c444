//! Cell record BIFF8 writers.
//!
//! Every cell record starts with the common `rw`, `col`, `ixfe` prefix.
//! Runs of three or more integer cells in the RK range are compacted by
//! the sheet stream writer into one MULRK record; shorter runs fall back
//! to individual NUMBER records, where the per-record overhead is lower
//! than the MULRK framing.

use super::super::super::XlsResult;
use super::write_record_header;
use crate::ole::writer::ByteSink;

/// Inclusive bounds of the integers an RK value can carry (30 bits).
pub(crate) const RK_INT_MIN: i64 = -0x2000_0000;
pub(crate) const RK_INT_MAX: i64 = 0x1FFF_FFFF;

/// Pack a number into the RK integer encoding, if it qualifies: an exact
/// integer within the 30-bit range. Bit 1 marks the integer variant; the
/// value occupies the upper 30 bits.
pub(crate) fn rk_from_f64(value: f64) -> Option<u32> {
    if value.fract() != 0.0 {
        return None;
    }
    let int = value as i64;
    if int as f64 != value || !(RK_INT_MIN..=RK_INT_MAX).contains(&int) {
        return None;
    }
    Some((((int as i32) << 2) as u32) | 0x02)
}

/// Write NUMBER record (IEEE 754 double cell)
///
/// Record type: 0x0203
pub(crate) fn write_number<S: ByteSink + ?Sized>(
    sink: &mut S,
    row: u16,
    col: u16,
    xf_index: u16,
    value: f64,
) -> XlsResult<()> {
    write_record_header(sink, 0x0203, 14)?;
    sink.append(&row.to_le_bytes())?;
    sink.append(&col.to_le_bytes())?;
    sink.append(&xf_index.to_le_bytes())?;
    sink.append(&value.to_le_bytes())?;
    Ok(())
}

/// Write MULRK record (run of RK-encoded cells in one row)
///
/// Record type: 0x00BD. `cells` holds the per-cell XF index and packed RK
/// value; the run must hold at least two cells for the record layout to
/// be well formed.
pub(crate) fn write_mulrk<S: ByteSink + ?Sized>(
    sink: &mut S,
    row: u16,
    col_first: u16,
    cells: &[(u16, u32)],
) -> XlsResult<()> {
    debug_assert!(cells.len() >= 2);
    let data_len = 2 + 2 + 6 * cells.len() as u16 + 2;
    write_record_header(sink, 0x00BD, data_len)?;
    sink.append(&row.to_le_bytes())?;
    sink.append(&col_first.to_le_bytes())?;
    for &(xf_index, rk) in cells {
        sink.append(&xf_index.to_le_bytes())?;
        sink.append(&rk.to_le_bytes())?;
    }
    let col_last = col_first + cells.len() as u16 - 1;
    sink.append(&col_last.to_le_bytes())?;
    Ok(())
}

/// Write LABELSST record (string cell referencing the shared string table)
///
/// Record type: 0x00FD
pub(crate) fn write_labelsst<S: ByteSink + ?Sized>(
    sink: &mut S,
    row: u16,
    col: u16,
    xf_index: u16,
    sst_index: u32,
) -> XlsResult<()> {
    write_record_header(sink, 0x00FD, 10)?;
    sink.append(&row.to_le_bytes())?;
    sink.append(&col.to_le_bytes())?;
    sink.append(&xf_index.to_le_bytes())?;
    sink.append(&sst_index.to_le_bytes())?;
    Ok(())
}

/// Write BOOLERR record (boolean cell)
///
/// Record type: 0x0205
pub(crate) fn write_boolerr<S: ByteSink + ?Sized>(
    sink: &mut S,
    row: u16,
    col: u16,
    xf_index: u16,
    value: bool,
) -> XlsResult<()> {
    write_record_header(sink, 0x0205, 8)?;
    sink.append(&row.to_le_bytes())?;
    sink.append(&col.to_le_bytes())?;
    sink.append(&xf_index.to_le_bytes())?;
    sink.append(&[u8::from(value), 0])?;
    Ok(())
}

/// Write BLANK record (formatted empty cell)
///
/// Record type: 0x0201
pub(crate) fn write_blank<S: ByteSink + ?Sized>(
    sink: &mut S,
    row: u16,
    col: u16,
    xf_index: u16,
) -> XlsResult<()> {
    write_record_header(sink, 0x0201, 6)?;
    sink.append(&row.to_le_bytes())?;
    sink.append(&col.to_le_bytes())?;
    sink.append(&xf_index.to_le_bytes())?;
    Ok(())
}

/// Write FORMULA record (pre-compiled token array)
///
/// Record type: 0x0006. The token array arrives opaque from the formula
/// compiler; this writer frames it with the cached result and the
/// calc-on-load flag.
pub(crate) fn write_formula<S: ByteSink + ?Sized>(
    sink: &mut S,
    row: u16,
    col: u16,
    xf_index: u16,
    cached: f64,
    tokens: &[u8],
) -> XlsResult<()> {
    let cce = tokens.len().min(u16::MAX as usize) as u16;
    write_record_header(sink, 0x0006, 2 + 2 + 2 + 8 + 2 + 4 + 2 + cce)?;
    sink.append(&row.to_le_bytes())?;
    sink.append(&col.to_le_bytes())?;
    sink.append(&xf_index.to_le_bytes())?;
    sink.append(&cached.to_le_bytes())?;
    sink.append(&0x0002u16.to_le_bytes())?; // grbit: fCalcOnLoad
    sink.append(&0u32.to_le_bytes())?; // chn, unused
    sink.append(&cce.to_le_bytes())?;
    sink.append(&tokens[..cce as usize])?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ole::writer::{ByteSink, MemorySink};

    #[test]
    fn rk_packing() {
        assert_eq!(rk_from_f64(0.0), Some(0x02));
        assert_eq!(rk_from_f64(1.0), Some(0x06));
        assert_eq!(rk_from_f64(-1.0), Some(0xFFFF_FFFE));
        assert_eq!(rk_from_f64(RK_INT_MAX as f64), Some(0x7FFF_FFFE));
        assert_eq!(rk_from_f64(RK_INT_MIN as f64), Some(0x8000_0002));

        assert_eq!(rk_from_f64(1.5), None);
        assert_eq!(rk_from_f64((RK_INT_MAX + 1) as f64), None);
        assert_eq!(rk_from_f64((RK_INT_MIN - 1) as f64), None);
        assert_eq!(rk_from_f64(f64::NAN), None);
        assert_eq!(rk_from_f64(f64::INFINITY), None);
    }

    #[test]
    fn number_record_layout() {
        let mut sink = MemorySink::new();
        write_number(&mut sink, 3, 2, 0x0F, 42.5).unwrap();
        let mut data = Vec::new();
        sink.copy_padded_to(&mut data, 1).unwrap();

        assert_eq!(&data[0..2], &[0x03, 0x02]);
        assert_eq!(&data[2..4], &[14, 0]);
        assert_eq!(&data[4..6], &[3, 0]);
        assert_eq!(&data[6..8], &[2, 0]);
        assert_eq!(&data[10..18], &42.5f64.to_le_bytes());
    }

    #[test]
    fn mulrk_record_layout() {
        let mut sink = MemorySink::new();
        let cells = [
            (0x0Fu16, rk_from_f64(1.0).unwrap()),
            (0x0F, rk_from_f64(2.0).unwrap()),
            (0x0F, rk_from_f64(3.0).unwrap()),
        ];
        write_mulrk(&mut sink, 0, 0, &cells).unwrap();
        let mut data = Vec::new();
        sink.copy_padded_to(&mut data, 1).unwrap();

        assert_eq!(&data[0..2], &[0xBD, 0x00]);
        assert_eq!(u16::from_le_bytes([data[2], data[3]]), 24); // 4 + 3*6 + 2
        assert_eq!(u16::from_le_bytes([data[6], data[7]]), 0); // colFirst
        // Three 6-byte RK entries, then colLast
        assert_eq!(u32::from_le_bytes(data[10..14].try_into().unwrap()), 0x06);
        assert_eq!(u32::from_le_bytes(data[16..20].try_into().unwrap()), 0x0A);
        assert_eq!(u32::from_le_bytes(data[22..26].try_into().unwrap()), 0x0E);
        assert_eq!(u16::from_le_bytes([data[26], data[27]]), 2); // colLast
    }

    #[test]
    fn formula_record_carries_tokens_verbatim() {
        let tokens = [0x1E, 0x2A, 0x00]; // opaque to this writer
        let mut sink = MemorySink::new();
        write_formula(&mut sink, 0, 0, 0x0F, 0.0, &tokens).unwrap();
        let mut data = Vec::new();
        sink.copy_padded_to(&mut data, 1).unwrap();

        assert_eq!(&data[0..2], &[0x06, 0x00]);
        assert_eq!(u16::from_le_bytes([data[2], data[3]]), 25);
        assert_eq!(u16::from_le_bytes([data[24], data[25]]), 3); // cce
        assert_eq!(&data[26..29], &tokens);
    }
}
