//! Byte sink abstraction used by the workbook stream writer.
//!
//! The serialization engine appends records to a sink and occasionally
//! overwrites a fixed-width region it reserved earlier (a back-patch),
//! once a value that depends on later content becomes known. Two backings
//! are provided: a growable in-memory buffer and a temp file for
//! workbooks too large to hold in memory. Behavior is identical across
//! backings.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom, Write};

/// Append-only, back-patchable byte store.
pub trait ByteSink {
    /// Append bytes at the current end of the sink.
    fn append(&mut self, data: &[u8]) -> io::Result<()>;

    /// Current end-of-sink position, i.e. the offset the next `append`
    /// will write to.
    fn position(&self) -> u64;

    /// Overwrite `data.len()` bytes at `offset`. The region must have been
    /// written before; a patch may not extend the sink.
    fn patch(&mut self, offset: u64, data: &[u8]) -> io::Result<()>;

    /// Total number of bytes written so far.
    fn len(&self) -> u64 {
        self.position()
    }

    /// Copy the whole sink to `out`, zero-padded up to a multiple of
    /// `block_size`. Used by the container writer to emit the workbook
    /// stream region.
    fn copy_padded_to(&mut self, out: &mut dyn Write, block_size: usize) -> io::Result<()>;
}

fn patch_bounds_check(offset: u64, len: usize, end: u64) -> io::Result<()> {
    if offset + len as u64 > end {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!(
                "patch of {} bytes at offset {} exceeds sink length {}",
                len, offset, end
            ),
        ));
    }
    Ok(())
}

fn write_padding(out: &mut dyn Write, written: u64, block_size: usize) -> io::Result<()> {
    let remainder = (written % block_size as u64) as usize;
    if remainder != 0 {
        let pad = vec![0u8; block_size - remainder];
        out.write_all(&pad)?;
    }
    Ok(())
}

/// In-memory byte sink.
#[derive(Debug, Default)]
pub struct MemorySink {
    buf: Vec<u8>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }
}

impl ByteSink for MemorySink {
    fn append(&mut self, data: &[u8]) -> io::Result<()> {
        self.buf.extend_from_slice(data);
        Ok(())
    }

    fn position(&self) -> u64 {
        self.buf.len() as u64
    }

    fn patch(&mut self, offset: u64, data: &[u8]) -> io::Result<()> {
        patch_bounds_check(offset, data.len(), self.buf.len() as u64)?;
        let start = offset as usize;
        self.buf[start..start + data.len()].copy_from_slice(data);
        Ok(())
    }

    fn copy_padded_to(&mut self, out: &mut dyn Write, block_size: usize) -> io::Result<()> {
        out.write_all(&self.buf)?;
        write_padding(out, self.buf.len() as u64, block_size)
    }
}

/// Temp-file-backed byte sink for workbooks too large to buffer in memory.
///
/// The backing file is created unlinked via `tempfile::tempfile`, so it is
/// reclaimed by the OS even on abnormal exit.
#[derive(Debug)]
pub struct FileSink {
    file: File,
    end: u64,
}

impl FileSink {
    pub fn new() -> io::Result<Self> {
        Ok(Self {
            file: tempfile::tempfile()?,
            end: 0,
        })
    }
}

impl ByteSink for FileSink {
    fn append(&mut self, data: &[u8]) -> io::Result<()> {
        self.file.seek(SeekFrom::Start(self.end))?;
        self.file.write_all(data)?;
        self.end += data.len() as u64;
        Ok(())
    }

    fn position(&self) -> u64 {
        self.end
    }

    fn patch(&mut self, offset: u64, data: &[u8]) -> io::Result<()> {
        patch_bounds_check(offset, data.len(), self.end)?;
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(data)
    }

    fn copy_padded_to(&mut self, out: &mut dyn Write, block_size: usize) -> io::Result<()> {
        self.file.seek(SeekFrom::Start(0))?;
        let mut remaining = self.end;
        let mut chunk = [0u8; 8192];
        while remaining > 0 {
            let want = chunk.len().min(remaining as usize);
            self.file.read_exact(&mut chunk[..want])?;
            out.write_all(&chunk[..want])?;
            remaining -= want as u64;
        }
        write_padding(out, self.end, block_size)
    }
}
