//! Property storage (directory) generation for OLE2 files.
//!
//! Each stream in the container is described by one fixed 128-byte entry;
//! the entries form a tree rooted at "Root Entry". Entries are emitted in
//! a fixed order — Root, Workbook, SummaryInformation,
//! DocumentSummaryInformation, then any imported streams — and the root's
//! children are linked as a balanced binary search tree using the
//! name-length-then-alphabetical comparator that Office readers expect.
//! Imported entries keep the shape of the source container's tree: their
//! sibling and child references are remapped through an index table built
//! while scanning the source directory.

use super::super::consts::*;
use std::collections::HashMap;

/// One 128-byte directory node.
#[derive(Debug, Clone)]
pub(crate) struct PropertyEntry {
    pub name: String,
    pub entry_type: u8,
    pub start_block: u32,
    pub size: u64,
    pub prev: u32,
    pub next: u32,
    pub child: u32,
}

impl PropertyEntry {
    pub(crate) fn root(start_block: u32, size: u64) -> Self {
        Self {
            name: ROOT_ENTRY_NAME.to_string(),
            entry_type: STGTY_ROOT,
            start_block,
            size,
            prev: NOSTREAM,
            next: NOSTREAM,
            child: NOSTREAM,
        }
    }

    pub(crate) fn stream(name: &str, start_block: u32, size: u64) -> Self {
        Self {
            name: name.to_string(),
            entry_type: STGTY_STREAM,
            start_block,
            size,
            prev: NOSTREAM,
            next: NOSTREAM,
            child: NOSTREAM,
        }
    }

    /// Serialize this entry to its on-disk 128-byte form.
    fn to_bytes(&self) -> Vec<u8> {
        let mut data = vec![0u8; DIRENTRY_SIZE];

        // Name as UTF-16LE, at most 31 characters plus the null terminator
        let utf16: Vec<u16> = self.name.encode_utf16().collect();
        let name_len = utf16.len().min(31);
        for (i, &ch) in utf16.iter().take(name_len).enumerate() {
            data[i * 2..i * 2 + 2].copy_from_slice(&ch.to_le_bytes());
        }
        let name_len_bytes = ((name_len + 1) * 2) as u16;
        data[64..66].copy_from_slice(&name_len_bytes.to_le_bytes());

        // Entry type and node color (always black)
        data[66] = self.entry_type;
        data[67] = 1;

        // Sibling and child references
        data[68..72].copy_from_slice(&self.prev.to_le_bytes());
        data[72..76].copy_from_slice(&self.next.to_le_bytes());
        data[76..80].copy_from_slice(&self.child.to_le_bytes());

        // CLSID, state bits, timestamps stay zero
        // data[80..116] already zeros

        // Starting block and stream size
        data[116..120].copy_from_slice(&self.start_block.to_le_bytes());
        data[120..128].copy_from_slice(&self.size.to_le_bytes());

        data
    }
}

/// Builds the directory stream in the fixed entry order.
pub(crate) struct DirectoryBuilder {
    entries: Vec<PropertyEntry>,
    root_children: Vec<u32>,
}

impl DirectoryBuilder {
    pub(crate) fn new(small_data_start: u32, small_data_size: u64) -> Self {
        Self {
            entries: vec![PropertyEntry::root(small_data_start, small_data_size)],
            root_children: Vec::new(),
        }
    }

    /// Add a stream entry under the root. Returns its index.
    pub(crate) fn add_stream(&mut self, name: &str, start_block: u32, size: u64) -> u32 {
        let index = self.entries.len() as u32;
        self.entries.push(PropertyEntry::stream(name, start_block, size));
        self.root_children.push(index);
        index
    }

    /// Add an entry copied from a source container. Its sibling and child
    /// references are remapped through `remap`; references to entries that
    /// were not imported become `NOSTREAM`. Entries whose original parent
    /// was the source root are linked into this root's child tree instead.
    pub(crate) fn add_imported(
        &mut self,
        mut entry: PropertyEntry,
        remap: &HashMap<u32, u32>,
        root_child: bool,
    ) -> u32 {
        let remapped = |reference: u32| *remap.get(&reference).unwrap_or(&NOSTREAM);
        entry.prev = remapped(entry.prev);
        entry.next = remapped(entry.next);
        entry.child = remapped(entry.child);

        let index = self.entries.len() as u32;
        self.entries.push(entry);
        if root_child {
            self.root_children.push(index);
        }
        index
    }

    pub(crate) fn entry_count(&self) -> u32 {
        self.entries.len() as u32
    }

    /// Link the root's children and serialize all entries in index order.
    pub(crate) fn generate(mut self) -> Vec<u8> {
        let children = std::mem::take(&mut self.root_children);
        link_children(0, &children, &mut self.entries);

        let mut data = Vec::with_capacity(self.entries.len() * DIRENTRY_SIZE);
        for entry in &self.entries {
            data.extend_from_slice(&entry.to_bytes());
        }
        data
    }
}

/// Order directory siblings the way Office readers expect: shorter names
/// first, then case-insensitive alphabetical; `_VBA_PROJECT` and `__`
/// prefixed names sort last.
fn compare_names(name1: &str, name2: &str) -> std::cmp::Ordering {
    use std::cmp::Ordering;

    match name1.len().cmp(&name2.len()) {
        Ordering::Equal => {
            if name1 == "_VBA_PROJECT" {
                return Ordering::Greater;
            }
            if name2 == "_VBA_PROJECT" {
                return Ordering::Less;
            }
            match (name1.starts_with("__"), name2.starts_with("__")) {
                (true, false) => Ordering::Greater,
                (false, true) => Ordering::Less,
                _ => name1.to_uppercase().cmp(&name2.to_uppercase()),
            }
        },
        other => other,
    }
}

/// Link a parent's children as a balanced tree: the comparator-sorted
/// midpoint becomes the parent's child pointer, entries before it chain
/// through `prev`, entries after it through `next`.
fn link_children(parent: u32, child_indices: &[u32], entries: &mut [PropertyEntry]) {
    if child_indices.is_empty() {
        entries[parent as usize].child = NOSTREAM;
        return;
    }

    let mut sorted: Vec<u32> = child_indices.to_vec();
    sorted.sort_by(|&a, &b| compare_names(&entries[a as usize].name, &entries[b as usize].name));

    let midpoint = sorted.len() / 2;
    entries[parent as usize].child = sorted[midpoint];

    for (position, &index) in sorted.iter().enumerate() {
        let entry = &mut entries[index as usize];
        entry.prev = NOSTREAM;
        entry.next = NOSTREAM;
        if position < midpoint {
            if position > 0 {
                entry.prev = sorted[position - 1];
            }
        } else if position == midpoint {
            if midpoint > 0 {
                entry.prev = sorted[midpoint - 1];
            }
            if midpoint + 1 < sorted.len() {
                entry.next = sorted[midpoint + 1];
            }
        } else if position + 1 < sorted.len() {
            entry.next = sorted[position + 1];
        }
    }
}
