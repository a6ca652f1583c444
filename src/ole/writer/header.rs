//! OLE2 header block generation.
//!
//! Produces the 512-byte header with the magic signature, version
//! information, and the locations of the depot, small block depot chain,
//! extension region, and property storage.

use super::super::consts::*;
use super::geometry::Geometry;

/// Serialize the header block for a computed geometry.
pub(crate) fn header_block(geometry: &Geometry) -> Vec<u8> {
    let mut header = vec![0u8; BIG_BLOCK_SIZE];

    // Magic bytes (8 bytes)
    header[0..8].copy_from_slice(MAGIC);

    // CLSID (16 bytes, all zeros)
    // header[8..24] already zeros

    // Minor version (2 bytes) - 0x003E
    header[24..26].copy_from_slice(&0x003Eu16.to_le_bytes());

    // DLL version (2 bytes) - 3 for 512-byte blocks
    header[26..28].copy_from_slice(&3u16.to_le_bytes());

    // Byte order (2 bytes) - 0xFFFE for little-endian
    header[28..30].copy_from_slice(&0xFFFEu16.to_le_bytes());

    // Block shift (2 bytes) - 9 (2^9 = 512)
    header[30..32].copy_from_slice(&9u16.to_le_bytes());

    // Small block shift (2 bytes) - 6 (2^6 = 64)
    header[32..34].copy_from_slice(&6u16.to_le_bytes());

    // Reserved (6 bytes) and directory block count (4 bytes, must be 0
    // for 512-byte blocks)
    // header[34..44] already zeros

    // Number of depot blocks (4 bytes)
    header[44..48].copy_from_slice(&geometry.bbd_blocks.to_le_bytes());

    // First property storage block (4 bytes)
    header[48..52].copy_from_slice(&geometry.root_start.to_le_bytes());

    // Transaction signature (4 bytes) - 0
    // header[52..56] already zeros

    // Small block threshold (4 bytes)
    header[56..60].copy_from_slice(&(SMALL_BLOCK_THRESHOLD as u32).to_le_bytes());

    // Small block depot chain start and count (8 bytes)
    header[60..64].copy_from_slice(&geometry.sbd_start.to_le_bytes());
    header[64..68].copy_from_slice(&geometry.sbd_blocks.to_le_bytes());

    // Extension block start and count (8 bytes)
    header[68..72].copy_from_slice(&geometry.extension_start.to_le_bytes());
    header[72..76].copy_from_slice(&geometry.extension_blocks.to_le_bytes());

    // Inline depot pointers; unused slots are padded with 0xFF.
    let inline = (geometry.bbd_blocks as usize).min(HEADER_DEPOT_POINTERS);
    for i in 0..HEADER_DEPOT_POINTERS {
        let offset = 76 + i * 4;
        let value = if i < inline {
            geometry.bbd_start + i as u32
        } else {
            FREEBLOCK
        };
        header[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
    }

    header
}
