//! Shared string table (SST) BIFF8 writer with CONTINUE framing and the
//! EXTSST bucket index.
//!
//! The SST holds every distinct label string with its global reference
//! count. Its content is unbounded, so it is packed across one SST record
//! and as many CONTINUE records as needed, splitting at UTF-16 character
//! boundaries. A continuation that begins mid-string carries a single
//! leading flag byte (0x00 compressed, 0x01 UTF-16LE) instead of a
//! repeated string header, so no bytes are duplicated or lost.
//!
//! While packing, every k-th string is indexed for the EXTSST record: the
//! absolute stream position of the record holding the string's header and
//! the header's offset within that record, enabling O(1) lookup without a
//! forward scan of the table.

use super::super::super::XlsResult;
use super::{MAX_RECORD_DATA, write_record_header};
use crate::ole::writer::ByteSink;

/// One EXTSST bucket: where the bucket's first string starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ExtSstEntry {
    /// Absolute stream position of the SST or CONTINUE record holding the
    /// string's header
    pub record_position: u32,
    /// Offset of the string header from the record's first byte
    pub offset_in_record: u16,
}

/// Bucket index collected while the string table is packed.
#[derive(Debug, Clone)]
pub(crate) struct ExtSstIndex {
    pub strings_per_bucket: u16,
    pub entries: Vec<ExtSstEntry>,
}

/// An open physical record frame: position of its header and payload
/// bytes written so far. The length field is back-patched on close.
struct Frame {
    start: u64,
    len: usize,
}

fn open_frame<S: ByteSink + ?Sized>(sink: &mut S, record_type: u16) -> XlsResult<Frame> {
    let start = sink.position();
    write_record_header(sink, record_type, 0)?;
    Ok(Frame { start, len: 0 })
}

fn close_frame<S: ByteSink + ?Sized>(sink: &mut S, frame: &Frame) -> XlsResult<()> {
    sink.patch(frame.start + 2, &(frame.len as u16).to_le_bytes())?;
    Ok(())
}

/// Write the shared string table as one SST record plus CONTINUE
/// overflow, returning the bucket index for [`write_extsst`].
///
/// Record types: 0x00FC (SST), 0x003C (CONTINUE). An empty table still
/// produces a minimal SST record.
pub(crate) fn write_shared_strings<S: ByteSink + ?Sized>(
    sink: &mut S,
    strings: &[String],
    total_refs: u32,
) -> XlsResult<ExtSstIndex> {
    // Bucket size keeps the bucket count at or below 128 so the index
    // always fits one EXTSST record.
    let strings_per_bucket = (strings.len() / 128 + 1) as u16;
    let mut entries = Vec::with_capacity(strings.len() / strings_per_bucket as usize + 1);

    let mut frame = open_frame(sink, 0x00FC)?;
    sink.append(&total_refs.to_le_bytes())?;
    sink.append(&(strings.len() as u32).to_le_bytes())?;
    frame.len = 8;

    for (index, string) in strings.iter().enumerate() {
        let compressed = string.is_ascii();
        let (char_count, data): (usize, Vec<u8>) = if compressed {
            (string.len().min(0xFFFF), string.as_bytes().to_vec())
        } else {
            let utf16: Vec<u16> = string.encode_utf16().collect();
            let count = utf16.len().min(0xFFFF);
            let mut bytes = Vec::with_capacity(count * 2);
            for unit in &utf16[..count] {
                bytes.extend_from_slice(&unit.to_le_bytes());
            }
            (count, bytes)
        };
        let flag: u8 = if compressed { 0x00 } else { 0x01 };
        let char_width = if compressed { 1 } else { 2 };

        // The 3-byte string header must not be split, and a non-empty
        // string keeps at least its first character next to it.
        let needed = 3 + if char_count > 0 { char_width } else { 0 };
        if MAX_RECORD_DATA - frame.len < needed {
            close_frame(sink, &frame)?;
            frame = open_frame(sink, 0x003C)?;
        }

        if index % strings_per_bucket as usize == 0 {
            entries.push(ExtSstEntry {
                record_position: frame.start as u32,
                // The record header occupies the first four bytes.
                offset_in_record: (4 + frame.len) as u16,
            });
        }

        sink.append(&(char_count as u16).to_le_bytes())?;
        sink.append(&[flag])?;
        frame.len += 3;

        let total_bytes = char_count * char_width;
        let mut written = 0;
        while written < total_bytes {
            let available = MAX_RECORD_DATA - frame.len;
            if available < char_width {
                close_frame(sink, &frame)?;
                frame = open_frame(sink, 0x003C)?;
                sink.append(&[flag])?;
                frame.len = 1;
                continue;
            }
            let mut take = available.min(total_bytes - written);
            if char_width == 2 {
                take &= !1;
            }
            sink.append(&data[written..written + take])?;
            written += take;
            frame.len += take;
        }
    }

    close_frame(sink, &frame)?;

    Ok(ExtSstIndex {
        strings_per_bucket,
        entries,
    })
}

/// Write the EXTSST record from a collected bucket index.
///
/// Record type: 0x00FF
pub(crate) fn write_extsst<S: ByteSink + ?Sized>(
    sink: &mut S,
    index: &ExtSstIndex,
) -> XlsResult<()> {
    let data_len = 2 + 8 * index.entries.len() as u16;
    write_record_header(sink, 0x00FF, data_len)?;
    sink.append(&index.strings_per_bucket.to_le_bytes())?;
    for entry in &index.entries {
        sink.append(&entry.record_position.to_le_bytes())?;
        sink.append(&entry.offset_in_record.to_le_bytes())?;
        sink.append(&0u16.to_le_bytes())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ole::writer::MemorySink;
    use proptest::prelude::*;

    /// Split the sink contents back into (type, payload) frames.
    fn frames(sink: &mut MemorySink) -> Vec<(u16, Vec<u8>)> {
        let mut data = Vec::new();
        sink.copy_padded_to(&mut data, 1).unwrap();

        let mut result = Vec::new();
        let mut offset = 0;
        while offset < data.len() {
            let record_type = u16::from_le_bytes([data[offset], data[offset + 1]]);
            let len = u16::from_le_bytes([data[offset + 2], data[offset + 3]]) as usize;
            result.push((record_type, data[offset + 4..offset + 4 + len].to_vec()));
            offset += 4 + len;
        }
        result
    }

    /// Reassemble the strings from SST + CONTINUE payloads, checking the
    /// continuation flag bytes on the way.
    fn reassemble(frames: &[(u16, Vec<u8>)], unique: usize) -> Vec<String> {
        let mut strings = Vec::new();
        let mut frame_idx = 0;
        let mut pos = 8; // behind cstTotal and cstUnique

        for _ in 0..unique {
            if frames[frame_idx].1.len() - pos < 3 {
                frame_idx += 1;
                pos = 0;
            }
            let payload = &frames[frame_idx].1;
            let cch = u16::from_le_bytes([payload[pos], payload[pos + 1]]) as usize;
            let mut wide = payload[pos + 2] == 0x01;
            pos += 3;

            let mut units: Vec<u16> = Vec::with_capacity(cch);
            while units.len() < cch {
                let payload = &frames[frame_idx].1;
                if pos >= payload.len() {
                    frame_idx += 1;
                    wide = frames[frame_idx].1[0] == 0x01;
                    pos = 1;
                    continue;
                }
                if wide {
                    units.push(u16::from_le_bytes([payload[pos], payload[pos + 1]]));
                    pos += 2;
                } else {
                    units.push(payload[pos] as u16);
                    pos += 1;
                }
            }
            strings.push(String::from_utf16(&units).unwrap());
        }
        strings
    }

    #[test]
    fn empty_table_emits_minimal_record() {
        let mut sink = MemorySink::new();
        let index = write_shared_strings(&mut sink, &[], 0).unwrap();

        let frames = frames(&mut sink);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].0, 0x00FC);
        assert_eq!(frames[0].1.len(), 8);
        assert_eq!(index.strings_per_bucket, 1);
        assert!(index.entries.is_empty());
    }

    #[test]
    fn small_table_single_record() {
        let strings = vec!["alpha".to_string(), "beta".to_string()];
        let mut sink = MemorySink::new();
        let index = write_shared_strings(&mut sink, &strings, 5).unwrap();

        let frames = frames(&mut sink);
        assert_eq!(frames.len(), 1);
        let payload = &frames[0].1;
        assert_eq!(u32::from_le_bytes(payload[0..4].try_into().unwrap()), 5);
        assert_eq!(u32::from_le_bytes(payload[4..8].try_into().unwrap()), 2);

        assert_eq!(index.strings_per_bucket, 1);
        assert_eq!(index.entries.len(), 2);
        assert_eq!(index.entries[0].offset_in_record, 12);
        // "alpha" occupies 3 + 5 bytes after the first header
        assert_eq!(index.entries[1].offset_in_record, 20);

        assert_eq!(reassemble(&frames, 2), strings);
    }

    #[test]
    fn long_string_splits_mid_string_into_one_continue() {
        // The SST record fills to the payload ceiling mid-first-string;
        // the CONTINUE carries the remainder plus the second string.
        let long = "x".repeat(12_000);
        let strings = vec![long.clone(), "short-tail".to_string()];
        let mut sink = MemorySink::new();
        let index = write_shared_strings(&mut sink, &strings, 2).unwrap();

        let frames = frames(&mut sink);
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].0, 0x00FC);
        assert_eq!(frames[0].1.len(), MAX_RECORD_DATA);
        assert_eq!(frames[1].0, 0x003C);
        // Continuation flag byte, remainder of the long string, then the
        // second string's header and characters.
        let remainder = 12_000 - (MAX_RECORD_DATA - 8 - 3);
        assert_eq!(frames[1].1[0], 0x00);
        assert_eq!(frames[1].1.len(), 1 + remainder + 3 + 10);

        assert_eq!(index.strings_per_bucket, 1);
        assert_eq!(index.entries.len(), 2);
        assert_eq!(index.entries[0].record_position, 0);
        assert_eq!(index.entries[0].offset_in_record, 12);
        // Second bucket points into the CONTINUE record.
        assert_eq!(
            index.entries[1].record_position as usize,
            4 + MAX_RECORD_DATA
        );

        assert_eq!(reassemble(&frames, 2), strings);
    }

    #[test]
    fn giant_string_spans_multiple_continues_without_reheadering() {
        let giant = "y".repeat(30_000);
        let strings = vec![giant.clone()];
        let mut sink = MemorySink::new();
        write_shared_strings(&mut sink, &strings, 1).unwrap();

        let frames = frames(&mut sink);
        assert_eq!(frames.len(), 4);
        assert!(frames.iter().all(|(_, p)| p.len() <= MAX_RECORD_DATA));
        // Every continuation restates only the one-byte flag.
        for (record_type, payload) in &frames[1..] {
            assert_eq!(*record_type, 0x003C);
            assert_eq!(payload[0], 0x00);
            assert!(payload[1..].iter().all(|&b| b == b'y'));
        }

        assert_eq!(reassemble(&frames, 1), strings);
    }

    #[test]
    fn utf16_split_preserves_character_boundaries() {
        // Wide strings sized so a split would land mid-character if the
        // writer did not force an even byte count.
        let wide = "\u{4E2D}".repeat(5_000);
        let strings = vec![wide.clone(), "\u{4E16}\u{754C}".to_string()];
        let mut sink = MemorySink::new();
        write_shared_strings(&mut sink, &strings, 2).unwrap();

        let frames = frames(&mut sink);
        assert!(frames.len() >= 2);
        // First frame: 8 bytes of counts + 3-byte header + even number of
        // character bytes.
        assert_eq!((frames[0].1.len() - 11) % 2, 0);
        assert_eq!(reassemble(&frames, 2), strings);
    }

    #[test]
    fn bucket_size_scales_with_table_size() {
        let strings: Vec<String> = (0..300).map(|i| format!("s{}", i)).collect();
        let mut sink = MemorySink::new();
        let index = write_shared_strings(&mut sink, &strings, 300).unwrap();

        assert_eq!(index.strings_per_bucket, 3);
        assert_eq!(index.entries.len(), 100);
    }

    proptest! {
        /// Concatenating the emitted fragments reproduces every string
        /// exactly, and no physical frame exceeds the payload ceiling.
        #[test]
        fn any_table_round_trips_within_frame_limits(
            mut strings in proptest::collection::vec(".{0,64}", 0..30),
            long_len in 0usize..20_000,
        ) {
            strings.push("z".repeat(long_len));

            let mut sink = MemorySink::new();
            write_shared_strings(&mut sink, &strings, strings.len() as u32).unwrap();

            let frames = frames(&mut sink);
            prop_assert!(frames.iter().all(|(_, p)| p.len() <= MAX_RECORD_DATA));
            prop_assert_eq!(reassemble(&frames, strings.len()), strings);
        }
    }

    #[test]
    fn extsst_record_layout() {
        let index = ExtSstIndex {
            strings_per_bucket: 8,
            entries: vec![
                ExtSstEntry {
                    record_position: 0x100,
                    offset_in_record: 12,
                },
                ExtSstEntry {
                    record_position: 0x100,
                    offset_in_record: 60,
                },
            ],
        };
        let mut sink = MemorySink::new();
        write_extsst(&mut sink, &index).unwrap();
        let mut data = Vec::new();
        sink.copy_padded_to(&mut data, 1).unwrap();

        assert_eq!(&data[0..2], &[0xFF, 0x00]);
        assert_eq!(u16::from_le_bytes([data[2], data[3]]), 18);
        assert_eq!(u16::from_le_bytes([data[4], data[5]]), 8);
        assert_eq!(u32::from_le_bytes(data[6..10].try_into().unwrap()), 0x100);
        assert_eq!(u16::from_le_bytes([data[10], data[11]]), 12);
        assert_eq!(u16::from_le_bytes([data[12], data[13]]), 0);
    }
}
