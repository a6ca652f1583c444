//! OLE2 container writer.
//!
//! Wraps a fully serialized workbook stream (and any property streams
//! imported from a source container) into a compound file. The workbook
//! bytes are consumed as an opaque blob: every stream length is final
//! before the geometry is computed, after which the header, allocation
//! table, and directory passes are emitted in one sequential sweep — the
//! on-disk region order matches the geometry, so the output writer only
//! needs `Write`.

use std::io::{self, Write};

use super::super::consts::*;
use super::super::error::OleError;
use super::depot::DepotBuilder;
use super::directory::{DirectoryBuilder, PropertyEntry};
use super::extension::ExtensionBuilder;
use super::geometry::{Geometry, StreamSizes};
use super::header::header_block;
use super::minifat::SmallBlockDepot;
use super::sink::ByteSink;
use std::collections::HashMap;

/// A property stream copied verbatim from a source container, e.g. a
/// macro storage carried over from a template file.
///
/// The directory references are expressed in the source container's
/// entry indices; the writer remaps them while emitting the directory.
#[derive(Debug, Clone)]
pub struct ImportedPropertySet {
    /// Entry name as it appeared in the source directory
    pub name: String,
    /// `STGTY_STREAM` or `STGTY_STORAGE`
    pub entry_type: u8,
    /// Stream contents; empty for storages
    pub data: Vec<u8>,
    /// Index of this entry in the source directory
    pub source_index: u32,
    /// Source-directory sibling and child references (`NOSTREAM` if none)
    pub prev: u32,
    pub next: u32,
    pub child: u32,
    /// Whether the entry sat directly under the source root
    pub root_child: bool,
}

/// Drain a source of imported property sets, aborting on the first read
/// failure: a missing stream length would leave the geometry incomplete.
pub fn collect_imported<I>(sets: I) -> Result<Vec<ImportedPropertySet>, OleError>
where
    I: IntoIterator<Item = io::Result<ImportedPropertySet>>,
{
    sets.into_iter()
        .map(|set| set.map_err(OleError::ImportedStream))
        .collect()
}

fn write_padded(out: &mut dyn Write, data: &[u8]) -> io::Result<()> {
    out.write_all(data)?;
    let remainder = data.len() % BIG_BLOCK_SIZE;
    if remainder != 0 {
        out.write_all(&vec![0u8; BIG_BLOCK_SIZE - remainder])?;
    }
    Ok(())
}

/// Write the complete compound file: header, data regions, depots, and
/// property storage.
pub(crate) fn write_container<S, W>(
    workbook: &mut S,
    imported: &[ImportedPropertySet],
    out: &mut W,
) -> Result<(), OleError>
where
    S: ByteSink + ?Sized,
    W: Write,
{
    // Route each imported stream to its block region. Streams below the
    // threshold share the small block region; storages occupy no blocks.
    let mut sbd = SmallBlockDepot::new();
    let mut start_blocks = vec![ENDOFCHAIN; imported.len()];
    let mut big_lens = Vec::new();
    let mut big_order = Vec::new();

    for (index, set) in imported.iter().enumerate() {
        if set.entry_type != STGTY_STREAM || set.data.is_empty() {
            continue;
        }
        if set.data.len() < SMALL_BLOCK_THRESHOLD {
            start_blocks[index] = sbd.allocate(&set.data);
        } else {
            big_lens.push(set.data.len() as u64);
            big_order.push(index);
        }
    }

    let sizes = StreamSizes {
        workbook: workbook.len(),
        imported_big: big_lens,
        small_data: sbd.data().len() as u64,
        directory_entries: 4 + imported.len() as u32,
    };
    let geometry = Geometry::compute(&sizes);

    // Big-block starts for the imported streams, in region order.
    let mut cursor = geometry.imported_start;
    for &index in &big_order {
        let blocks = (imported[index].data.len() as u64).div_ceil(BIG_BLOCK_SIZE as u64) as u32;
        start_blocks[index] = cursor;
        cursor += blocks;
    }

    // Depot: every allocated block gets an entry, including the depot's
    // own blocks and the extension blocks.
    let mut depot = DepotBuilder::new(geometry.total_blocks);
    depot.mark_special(geometry.extension_start, geometry.extension_blocks);
    depot.chain(geometry.workbook_start, geometry.workbook_blocks);
    let summary_blocks = (SUMMARY_STREAM_SIZE / BIG_BLOCK_SIZE) as u32;
    depot.chain(geometry.summary_start, summary_blocks);
    depot.chain(geometry.doc_summary_start, summary_blocks);
    for &index in &big_order {
        let blocks = (imported[index].data.len() as u64).div_ceil(BIG_BLOCK_SIZE as u64) as u32;
        depot.chain(start_blocks[index], blocks);
    }
    depot.chain(geometry.small_data_start, geometry.small_data_blocks);
    depot.chain(geometry.sbd_start, geometry.sbd_blocks);
    depot.mark_special(geometry.bbd_start, geometry.bbd_blocks);
    depot.chain(geometry.root_start, geometry.root_blocks);

    // Directory in the fixed entry order, imported references remapped.
    let mut directory =
        DirectoryBuilder::new(geometry.small_data_start, sbd.data().len() as u64);
    directory.add_stream(WORKBOOK_STREAM_NAME, geometry.workbook_start, workbook.len());
    directory.add_stream(
        SUMMARY_STREAM_NAME,
        geometry.summary_start,
        SUMMARY_STREAM_SIZE as u64,
    );
    directory.add_stream(
        DOC_SUMMARY_STREAM_NAME,
        geometry.doc_summary_start,
        SUMMARY_STREAM_SIZE as u64,
    );

    let remap: HashMap<u32, u32> = imported
        .iter()
        .enumerate()
        .map(|(i, set)| (set.source_index, 4 + i as u32))
        .collect();
    for (index, set) in imported.iter().enumerate() {
        let mut entry = PropertyEntry::stream(&set.name, start_blocks[index], set.data.len() as u64);
        entry.entry_type = set.entry_type;
        entry.prev = set.prev;
        entry.next = set.next;
        entry.child = set.child;
        directory.add_imported(entry, &remap, set.root_child);
    }
    debug_assert_eq!(directory.entry_count(), sizes.directory_entries);

    // Sequential emission: header first, then every region in block order.
    out.write_all(&header_block(&geometry))?;

    let extension = ExtensionBuilder::new(geometry.bbd_start, geometry.bbd_blocks);
    for block in extension.to_blocks(geometry.extension_start) {
        out.write_all(&block)?;
    }

    workbook.copy_padded_to(out, BIG_BLOCK_SIZE)?;

    let summary_placeholder = vec![0u8; SUMMARY_STREAM_SIZE];
    out.write_all(&summary_placeholder)?;
    out.write_all(&summary_placeholder)?;

    for &index in &big_order {
        write_padded(out, &imported[index].data)?;
    }

    if !sbd.is_empty() {
        write_padded(out, sbd.data())?;
        for block in sbd.to_blocks() {
            out.write_all(&block)?;
        }
    }

    for block in depot.to_blocks() {
        out.write_all(&block)?;
    }

    write_padded(out, &directory.generate())?;
    out.flush()?;

    Ok(())
}
