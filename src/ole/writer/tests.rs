//! Integration tests for the container writer.
//!
//! These tests verify the written container by walking its structures the
//! way an external reader would: header fields, depot chains, and the
//! property storage directory.

use super::super::consts::*;
use super::core::write_container;
use super::geometry::{Geometry, StreamSizes};
use super::sink::{ByteSink, MemorySink};
use super::{ImportedPropertySet, collect_imported};
use proptest::prelude::*;

fn block(data: &[u8], index: u32) -> &[u8] {
    let offset = BIG_BLOCK_SIZE * (index as usize + 1);
    &data[offset..offset + BIG_BLOCK_SIZE]
}

fn header_u32(data: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes(data[offset..offset + 4].try_into().unwrap())
}

/// Rebuild the depot table from the header's inline pointers.
fn read_depot(data: &[u8]) -> Vec<u32> {
    let bbd_blocks = header_u32(data, 44);
    let mut depot = Vec::new();
    for i in 0..bbd_blocks.min(109) {
        let pointer = header_u32(data, 76 + i as usize * 4);
        for slot in block(data, pointer).chunks_exact(4) {
            depot.push(u32::from_le_bytes(slot.try_into().unwrap()));
        }
    }
    depot
}

/// Follow a block chain through the depot, collecting `len` bytes.
fn read_stream(data: &[u8], depot: &[u32], start: u32, len: usize) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(len);
    let mut current = start;
    while current != ENDOFCHAIN && bytes.len() < len {
        let take = (len - bytes.len()).min(BIG_BLOCK_SIZE);
        bytes.extend_from_slice(&block(data, current)[..take]);
        current = depot[current as usize];
    }
    bytes
}

fn directory_entry(data: &[u8], depot: &[u32], index: usize) -> Vec<u8> {
    let root_start = header_u32(data, 48);
    let needed = (index + 1) * DIRENTRY_SIZE;
    let directory = read_stream(data, depot, root_start, needed);
    directory[index * DIRENTRY_SIZE..needed].to_vec()
}

fn entry_name(entry: &[u8]) -> String {
    let len = u16::from_le_bytes([entry[64], entry[65]]) as usize / 2 - 1;
    let units: Vec<u16> = (0..len)
        .map(|i| u16::from_le_bytes([entry[i * 2], entry[i * 2 + 1]]))
        .collect();
    String::from_utf16(&units).unwrap()
}

fn write_with_workbook(payload: &[u8], imported: &[ImportedPropertySet]) -> Vec<u8> {
    let mut sink = MemorySink::new();
    sink.append(payload).unwrap();
    let mut out = Vec::new();
    write_container(&mut sink, imported, &mut out).unwrap();
    out
}

#[test]
fn container_signature_and_version() {
    let data = write_with_workbook(b"workbook bytes", &[]);

    assert_eq!(&data[0..8], MAGIC);
    assert_eq!(u16::from_le_bytes([data[26], data[27]]), 3); // DLL version
    assert_eq!(u16::from_le_bytes([data[28], data[29]]), 0xFFFE);
    assert_eq!(u16::from_le_bytes([data[30], data[31]]), 9); // 512-byte blocks
    assert_eq!(data.len() % BIG_BLOCK_SIZE, 0);
}

#[test]
fn workbook_stream_round_trip() {
    let payload: Vec<u8> = (0..100_000u32).map(|i| (i % 251) as u8).collect();
    let data = write_with_workbook(&payload, &[]);
    let depot = read_depot(&data);

    let workbook = directory_entry(&data, &depot, 1);
    assert_eq!(entry_name(&workbook), WORKBOOK_STREAM_NAME);
    let start = u32::from_le_bytes(workbook[116..120].try_into().unwrap());
    let size = u64::from_le_bytes(workbook[120..128].try_into().unwrap());
    assert_eq!(size as usize, payload.len());
    assert_eq!(read_stream(&data, &depot, start, payload.len()), payload);
}

#[test]
fn directory_entries_in_fixed_order() {
    let data = write_with_workbook(b"wb", &[]);
    let depot = read_depot(&data);

    let names: Vec<String> = (0..4)
        .map(|i| entry_name(&directory_entry(&data, &depot, i)))
        .collect();
    assert_eq!(
        names,
        vec![
            ROOT_ENTRY_NAME,
            WORKBOOK_STREAM_NAME,
            SUMMARY_STREAM_NAME,
            DOC_SUMMARY_STREAM_NAME,
        ]
    );

    let summary = directory_entry(&data, &depot, 2);
    assert_eq!(
        u64::from_le_bytes(summary[120..128].try_into().unwrap()),
        SUMMARY_STREAM_SIZE as u64
    );
}

#[test]
fn depot_marks_its_own_blocks_special() {
    let data = write_with_workbook(&vec![7u8; 3000], &[]);
    let depot = read_depot(&data);

    let bbd_blocks = header_u32(&data, 44);
    // Inline pointers locate the depot blocks; each of their slots must
    // carry the special marker, not a chain link.
    for i in 0..bbd_blocks.min(109) {
        let pointer = header_u32(&data, 76 + i as usize * 4);
        assert_eq!(depot[pointer as usize], SPECIAL_BLOCK);
    }
}

#[test]
fn unused_header_pointer_slots_are_padded() {
    let data = write_with_workbook(b"wb", &[]);
    let bbd_blocks = header_u32(&data, 44) as usize;
    assert!(bbd_blocks < 109);
    assert!(data[76 + bbd_blocks * 4..512].iter().all(|&b| b == 0xFF));
}

#[test]
fn small_imported_stream_lands_in_small_block_region() {
    let imported = vec![ImportedPropertySet {
        name: "CompObj".to_string(),
        entry_type: STGTY_STREAM,
        data: vec![0x5A; 200],
        source_index: 1,
        prev: NOSTREAM,
        next: NOSTREAM,
        child: NOSTREAM,
        root_child: true,
    }];
    let data = write_with_workbook(b"workbook", &imported);
    let depot = read_depot(&data);

    // The small block depot chain must be declared in the header.
    let sbd_start = header_u32(&data, 60);
    let sbd_blocks = header_u32(&data, 64);
    assert_ne!(sbd_start, ENDOFCHAIN);
    assert_eq!(sbd_blocks, 1);

    // The root entry owns the small block data region.
    let root = directory_entry(&data, &depot, 0);
    let small_start = u32::from_le_bytes(root[116..120].try_into().unwrap());
    let small_size = u64::from_le_bytes(root[120..128].try_into().unwrap());
    assert_eq!(small_size, 256); // 200 bytes padded to small block granularity

    // The imported entry starts at small block 0; its bytes sit at the
    // beginning of the region.
    let entry = directory_entry(&data, &depot, 4);
    assert_eq!(entry_name(&entry), "CompObj");
    assert_eq!(u32::from_le_bytes(entry[116..120].try_into().unwrap()), 0);
    let region = read_stream(&data, &depot, small_start, small_size as usize);
    assert!(region[..200].iter().all(|&b| b == 0x5A));

    // And its chain exists in the small block depot: 200 bytes = 4 small
    // blocks, linked sequentially.
    let sbd = read_stream(&data, &depot, sbd_start, BIG_BLOCK_SIZE);
    let slot =
        |i: usize| u32::from_le_bytes(sbd[i * 4..i * 4 + 4].try_into().unwrap());
    assert_eq!(slot(0), 1);
    assert_eq!(slot(1), 2);
    assert_eq!(slot(2), 3);
    assert_eq!(slot(3), ENDOFCHAIN);
}

#[test]
fn big_imported_stream_round_trips() {
    let payload: Vec<u8> = (0..10_000u32).map(|i| (i % 7) as u8).collect();
    let imported = vec![ImportedPropertySet {
        name: "Macros".to_string(),
        entry_type: STGTY_STREAM,
        data: payload.clone(),
        source_index: 2,
        prev: NOSTREAM,
        next: NOSTREAM,
        child: NOSTREAM,
        root_child: true,
    }];
    let data = write_with_workbook(b"workbook", &imported);
    let depot = read_depot(&data);

    let entry = directory_entry(&data, &depot, 4);
    assert_eq!(entry_name(&entry), "Macros");
    let start = u32::from_le_bytes(entry[116..120].try_into().unwrap());
    assert_eq!(read_stream(&data, &depot, start, payload.len()), payload);
}

#[test]
fn unreadable_imported_stream_aborts() {
    let sets = vec![
        Ok(ImportedPropertySet {
            name: "Ok".to_string(),
            entry_type: STGTY_STREAM,
            data: vec![1, 2, 3],
            source_index: 1,
            prev: NOSTREAM,
            next: NOSTREAM,
            child: NOSTREAM,
            root_child: true,
        }),
        Err(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            "truncated stream",
        )),
    ];
    assert!(collect_imported(sets).is_err());
}

proptest! {
    /// For any payload length, the depot describes every allocated block
    /// and the property storage sits right behind the depot.
    #[test]
    fn geometry_invariant(len in 0u64..2_000_000) {
        let geometry = Geometry::compute(&StreamSizes {
            workbook: len,
            imported_big: Vec::new(),
            small_data: 0,
            directory_entries: 4,
        });
        prop_assert!(geometry.total_blocks <= geometry.bbd_blocks * ENTRIES_PER_DEPOT_BLOCK);
        prop_assert_eq!(geometry.root_start, geometry.bbd_start + geometry.bbd_blocks);
        prop_assert_eq!(geometry.root_start + geometry.root_blocks, geometry.total_blocks);
    }
}
