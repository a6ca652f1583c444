//! Extension (DIFAT) block generation for OLE2 files.
//!
//! The header block stores the first 109 depot block pointers inline.
//! When the depot outgrows that, the remaining pointers spill into
//! extension blocks: 127 pointers each, plus one trailing pointer to the
//! next extension block (end-of-chain sentinel on the last).

use super::super::consts::*;

/// Builds the extension block region for spilled depot pointers.
#[derive(Debug)]
pub(crate) struct ExtensionBuilder {
    spilled: Vec<u32>,
}

impl ExtensionBuilder {
    /// Collect the depot block pointers that do not fit in the header.
    pub(crate) fn new(bbd_start: u32, bbd_blocks: u32) -> Self {
        let spilled = if bbd_blocks as usize > HEADER_DEPOT_POINTERS {
            (bbd_start + HEADER_DEPOT_POINTERS as u32..bbd_start + bbd_blocks).collect()
        } else {
            Vec::new()
        };
        Self { spilled }
    }

    pub(crate) fn block_count(&self) -> u32 {
        self.spilled.len().div_ceil(EXTENSION_BLOCK_POINTERS) as u32
    }

    /// Serialize the extension blocks. `extension_start` is the block index
    /// of the first extension block, used to chain them together.
    pub(crate) fn to_blocks(&self, extension_start: u32) -> Vec<Vec<u8>> {
        let count = self.block_count();
        let mut blocks = Vec::with_capacity(count as usize);

        for block_idx in 0..count {
            let mut data = vec![0xFFu8; BIG_BLOCK_SIZE];
            let first = block_idx as usize * EXTENSION_BLOCK_POINTERS;
            let last = (first + EXTENSION_BLOCK_POINTERS).min(self.spilled.len());
            for (i, &pointer) in self.spilled[first..last].iter().enumerate() {
                data[i * 4..i * 4 + 4].copy_from_slice(&pointer.to_le_bytes());
            }

            let next = if block_idx + 1 < count {
                extension_start + block_idx + 1
            } else {
                ENDOFCHAIN
            };
            data[BIG_BLOCK_SIZE - 4..].copy_from_slice(&next.to_le_bytes());

            blocks.push(data);
        }
        blocks
    }
}
