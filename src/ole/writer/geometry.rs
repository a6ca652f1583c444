//! Block geometry computation for OLE2 compound files.
//!
//! The container layout must be known in full before any byte is written:
//! the header references the big block depot, the depot describes every
//! block in the file including its own blocks and any extension blocks,
//! and the directory sits at the end of the file. The depot's size depends
//! on the total block count, which includes the depot itself, so the
//! geometry is resolved by fixed-point iteration over the block counts.
//!
//! # Block layout
//!
//! Regions are laid out in this order, each starting where the previous
//! one ends:
//!
//! ```text
//! extension blocks | Workbook | SummaryInformation | DocumentSummaryInformation
//!   | imported big streams | small block data | small block depot
//!   | big block depot | property storage (directory)
//! ```

use super::super::consts::*;

fn blocks_for(len: u64) -> u32 {
    len.div_ceil(BIG_BLOCK_SIZE as u64) as u32
}

/// Final byte lengths of everything the container will hold. This is the
/// allocator's entire input; geometry is a pure function of it.
#[derive(Debug, Clone, Default)]
pub(crate) struct StreamSizes {
    /// Length of the serialized workbook BIFF stream
    pub workbook: u64,
    /// Lengths of imported streams at or above the small block threshold,
    /// in directory order
    pub imported_big: Vec<u64>,
    /// Total length of the small block data region, already padded to
    /// small block granularity
    pub small_data: u64,
    /// Number of property storage entries (root + streams)
    pub directory_entries: u32,
}

/// A complete, self-consistent container layout. Start fields hold a block
/// index, or [`ENDOFCHAIN`] when the region is absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Geometry {
    pub extension_start: u32,
    pub extension_blocks: u32,
    pub workbook_start: u32,
    pub workbook_blocks: u32,
    pub summary_start: u32,
    pub doc_summary_start: u32,
    pub imported_start: u32,
    pub imported_big_blocks: u32,
    pub small_data_start: u32,
    pub small_data_blocks: u32,
    pub sbd_start: u32,
    pub sbd_blocks: u32,
    pub bbd_start: u32,
    pub bbd_blocks: u32,
    pub root_start: u32,
    pub root_blocks: u32,
    pub total_blocks: u32,
}

impl Geometry {
    /// Compute the container geometry from final stream lengths.
    ///
    /// No bytes are produced here; the result drives the header, depot,
    /// and directory passes.
    pub(crate) fn compute(sizes: &StreamSizes) -> Self {
        let summary_blocks = blocks_for(SUMMARY_STREAM_SIZE as u64);
        let workbook_blocks = blocks_for(sizes.workbook);
        let imported_big_blocks: u32 = sizes.imported_big.iter().map(|&l| blocks_for(l)).sum();
        let small_data_blocks = blocks_for(sizes.small_data);
        let small_chain_slots = (sizes.small_data / SMALL_BLOCK_SIZE as u64) as u32;
        let sbd_blocks = small_chain_slots.div_ceil(ENTRIES_PER_DEPOT_BLOCK);
        let root_blocks =
            blocks_for(sizes.directory_entries as u64 * DIRENTRY_SIZE as u64).max(1);

        let fixed = workbook_blocks
            + 2 * summary_blocks
            + imported_big_blocks
            + small_data_blocks
            + sbd_blocks
            + root_blocks;

        // The depot must describe itself and any extension blocks, so the
        // counts are found by iterating to a fixed point. Convergence takes
        // a handful of rounds; the bound is a safety stop only.
        let mut bbd_blocks = 1u32;
        let mut extension_blocks = 0u32;
        for _ in 0..32 {
            let total = fixed + bbd_blocks + extension_blocks;
            let new_bbd = total.div_ceil(ENTRIES_PER_DEPOT_BLOCK).max(1);
            let new_extension = if new_bbd as usize > HEADER_DEPOT_POINTERS {
                let spill = new_bbd - HEADER_DEPOT_POINTERS as u32;
                spill.div_ceil(EXTENSION_BLOCK_POINTERS as u32)
            } else {
                0
            };
            if new_bbd == bbd_blocks && new_extension == extension_blocks {
                break;
            }
            bbd_blocks = new_bbd;
            extension_blocks = new_extension;
        }

        let total_blocks = fixed + bbd_blocks + extension_blocks;

        let mut cursor = 0u32;
        let mut region = |blocks: u32| -> u32 {
            if blocks == 0 {
                return ENDOFCHAIN;
            }
            let start = cursor;
            cursor += blocks;
            start
        };

        let extension_start = region(extension_blocks);
        let workbook_start = region(workbook_blocks);
        let summary_start = region(summary_blocks);
        let doc_summary_start = region(summary_blocks);
        let imported_start = region(imported_big_blocks);
        let small_data_start = region(small_data_blocks);
        let sbd_start = region(sbd_blocks);
        let bbd_start = region(bbd_blocks);
        let root_start = region(root_blocks);

        let geometry = Self {
            extension_start,
            extension_blocks,
            workbook_start,
            workbook_blocks,
            summary_start,
            doc_summary_start,
            imported_start,
            imported_big_blocks,
            small_data_start,
            small_data_blocks,
            sbd_start,
            sbd_blocks,
            bbd_start,
            bbd_blocks,
            root_start,
            root_blocks,
            total_blocks,
        };

        if geometry.root_start + geometry.root_blocks != geometry.total_blocks {
            log::warn!(
                "block geometry mismatch ({} blocks allocated, root region ends at {}), \
                 file may be corrupt",
                geometry.total_blocks,
                geometry.root_start + geometry.root_blocks
            );
        }

        geometry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sizes(workbook: u64) -> StreamSizes {
        StreamSizes {
            workbook,
            imported_big: Vec::new(),
            small_data: 0,
            directory_entries: 4,
        }
    }

    #[test]
    fn minimal_workbook_geometry() {
        let g = Geometry::compute(&sizes(100));
        assert_eq!(g.workbook_start, 0);
        assert_eq!(g.workbook_blocks, 1);
        assert_eq!(g.summary_start, 1);
        assert_eq!(g.doc_summary_start, 9);
        assert_eq!(g.extension_start, ENDOFCHAIN);
        assert_eq!(g.small_data_start, ENDOFCHAIN);
        assert_eq!(g.sbd_start, ENDOFCHAIN);
        // 1 workbook + 16 summary + 1 depot + 1 root
        assert_eq!(g.bbd_blocks, 1);
        assert_eq!(g.bbd_start, 17);
        assert_eq!(g.root_start, 18);
        assert_eq!(g.total_blocks, 19);
    }

    #[test]
    fn depot_covers_total_blocks() {
        for len in [0u64, 1, 511, 512, 513, 100_000, 5_000_000] {
            let g = Geometry::compute(&sizes(len));
            assert!(
                g.total_blocks <= g.bbd_blocks * ENTRIES_PER_DEPOT_BLOCK,
                "depot too small for workbook of {} bytes",
                len
            );
            assert_eq!(g.root_start, g.bbd_start + g.bbd_blocks);
            assert_eq!(g.root_start + g.root_blocks, g.total_blocks);
        }
    }

    #[test]
    fn extension_blocks_engage_past_header_capacity() {
        // 109 depot blocks describe 109 * 128 = 13952 blocks; a workbook of
        // ~7.2 MB stays inline, a much larger one must spill.
        let inline = Geometry::compute(&sizes(6_000_000));
        assert_eq!(inline.extension_blocks, 0);
        assert_eq!(inline.extension_start, ENDOFCHAIN);

        let spilled = Geometry::compute(&sizes(40_000_000));
        assert!(spilled.bbd_blocks > 109);
        assert!(spilled.extension_blocks > 0);
        assert_eq!(spilled.extension_start, 0);
        assert_eq!(
            spilled.extension_blocks,
            (spilled.bbd_blocks - 109).div_ceil(127)
        );
        // The fixed point still closes over the extension blocks.
        assert!(spilled.total_blocks <= spilled.bbd_blocks * ENTRIES_PER_DEPOT_BLOCK);
        assert_eq!(spilled.root_start + spilled.root_blocks, spilled.total_blocks);
    }

    #[test]
    fn small_region_geometry() {
        let g = Geometry::compute(&StreamSizes {
            workbook: 1000,
            imported_big: vec![5000],
            small_data: 1024, // 16 small blocks
            directory_entries: 6,
        });
        assert_eq!(g.imported_start, g.doc_summary_start + 8);
        assert_eq!(g.imported_big_blocks, 10);
        assert_eq!(g.small_data_blocks, 2);
        assert_eq!(g.sbd_blocks, 1);
        assert_eq!(g.small_data_start, g.imported_start + 10);
        assert_eq!(g.sbd_start, g.small_data_start + 2);
    }
}
