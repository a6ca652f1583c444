//! BIFF record writers for XLS serialization.
//!
//! Each BIFF record consists of a 2-byte record type, a 2-byte payload
//! length, and up to 8224 bytes of payload. Logical content larger than
//! one frame is continued across CONTINUE records; the only producer of
//! such content in this engine is the shared string table (`sst`).
//!
//! Records are written through the [`ByteSink`] so that writers needing a
//! stream position (DBCELL deltas, EXTSST buckets, BOUNDSHEET offsets)
//! can capture it at emission time.

use super::super::XlsResult;
use crate::ole::writer::ByteSink;

pub(crate) mod cells;
pub(crate) mod sst;
pub(crate) mod workbook;
pub(crate) mod worksheet;

/// Maximum payload bytes in one physical record frame (8228 bytes with
/// the 4-byte header).
pub(crate) const MAX_RECORD_DATA: usize = 8224;

/// Write a BIFF record header.
#[inline]
pub(crate) fn write_record_header<S: ByteSink + ?Sized>(
    sink: &mut S,
    record_type: u16,
    data_len: u16,
) -> XlsResult<()> {
    sink.append(&record_type.to_le_bytes())?;
    sink.append(&data_len.to_le_bytes())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ole::writer::MemorySink;

    #[test]
    fn record_header_layout() {
        let mut sink = MemorySink::new();
        write_record_header(&mut sink, 0x0809, 16).unwrap();
        let mut out = Vec::new();
        sink.copy_padded_to(&mut out, 1).unwrap();
        assert_eq!(out, [0x09, 0x08, 16, 0]);
    }
}
