//! Positioned I/O over the data file.
//!
//! All traffic moves through a fixed-size scratch buffer and a staging byte
//! queue. Writes are staged with `put_*` and land on disk in one
//! [`FileIo::commit`], which ends in an fsync; the engine treats that fsync
//! as the commit point of every mutating operation. Reads pull bytes into
//! the queue with [`FileIo::fill`] and consume them with `take_*`.
//! [`FileIo::seek`] repositions and discards anything staged.
//!
//! On-disk integers are little-endian, fixed for the life of the file.

use std::collections::VecDeque;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;

use crate::error::{Result, StoreError};

#[cfg(unix)]
fn read_exact_at(file: &File, mut off: u64, mut dst: &mut [u8]) -> io::Result<()> {
    use std::os::unix::fs::FileExt;
    while !dst.is_empty() {
        let read = file.read_at(dst, off)?;
        if read == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "read_at reached EOF",
            ));
        }
        let (_, tail) = dst.split_at_mut(read);
        dst = tail;
        off += read as u64;
    }
    Ok(())
}

#[cfg(unix)]
fn write_all_at(file: &File, mut off: u64, mut src: &[u8]) -> io::Result<()> {
    use std::os::unix::fs::FileExt;
    while !src.is_empty() {
        let written = file.write_at(src, off)?;
        if written == 0 {
            return Err(io::Error::new(
                io::ErrorKind::WriteZero,
                "write_at wrote zero bytes",
            ));
        }
        src = &src[written..];
        off += written as u64;
    }
    Ok(())
}

#[cfg(windows)]
fn read_exact_at(file: &File, mut off: u64, mut dst: &mut [u8]) -> io::Result<()> {
    use std::os::windows::fs::FileExt;
    while !dst.is_empty() {
        let read = file.seek_read(dst, off)?;
        if read == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "seek_read reached EOF",
            ));
        }
        let (_, tail) = dst.split_at_mut(read);
        dst = tail;
        off += read as u64;
    }
    Ok(())
}

#[cfg(windows)]
fn write_all_at(file: &File, mut off: u64, mut src: &[u8]) -> io::Result<()> {
    use std::os::windows::fs::FileExt;
    while !src.is_empty() {
        let written = file.seek_write(src, off)?;
        if written == 0 {
            return Err(io::Error::new(
                io::ErrorKind::WriteZero,
                "seek_write wrote zero bytes",
            ));
        }
        src = &src[written..];
        off += written as u64;
    }
    Ok(())
}

/// Durably records a freshly created file in its parent directory.
#[cfg(unix)]
fn sync_parent_dir(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => File::open(parent)?.sync_all(),
        _ => Ok(()),
    }
}

#[cfg(not(unix))]
fn sync_parent_dir(_path: &Path) -> io::Result<()> {
    Ok(())
}

#[derive(Debug)]
pub struct FileIo {
    file: File,
    pos: u64,
    scratch: Vec<u8>,
    staged: VecDeque<u8>,
}

impl FileIo {
    /// Opens (or creates) the data file. Returns the handle and whether the
    /// file was newly created; on creation the parent directory is fsynced
    /// so the new entry survives a crash.
    pub fn open(path: &Path, scratch_size: usize) -> Result<(Self, bool)> {
        let created = !path.exists();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;
        if created {
            file.sync_all()?;
            sync_parent_dir(path)?;
        }
        Ok((
            Self {
                file,
                pos: 0,
                scratch: vec![0; scratch_size],
                staged: VecDeque::new(),
            },
            created,
        ))
    }

    /// Sets the file position and discards any staged bytes.
    pub fn seek(&mut self, pos: u64) {
        self.pos = pos;
        self.staged.clear();
    }

    /// Stages a little-endian u64.
    pub fn put_u64(&mut self, value: u64) {
        self.staged.extend(value.to_le_bytes());
    }

    /// Stages raw bytes.
    pub fn put_bytes(&mut self, bytes: &[u8]) {
        self.staged.extend(bytes);
    }

    /// Stages `n` zero bytes.
    pub fn put_zeros(&mut self, n: usize) {
        self.staged.extend(std::iter::repeat(0u8).take(n));
    }

    /// Writes every staged byte at the current position, advancing it, and
    /// flushes the file to durable storage.
    pub fn commit(&mut self) -> Result<()> {
        while !self.staged.is_empty() {
            let n = self.scratch.len().min(self.staged.len());
            for (dst, byte) in self.scratch.iter_mut().zip(self.staged.drain(..n)) {
                *dst = byte;
            }
            write_all_at(&self.file, self.pos, &self.scratch[..n])?;
            self.pos += n as u64;
        }
        self.file.sync_all()?;
        Ok(())
    }

    /// Reads exactly `n` bytes at the current position into the staging
    /// queue, advancing the position. Hitting EOF early is an
    /// [`io::ErrorKind::UnexpectedEof`] error.
    pub fn fill(&mut self, n: usize) -> Result<()> {
        let mut remaining = n;
        while remaining > 0 {
            let chunk = remaining.min(self.scratch.len());
            read_exact_at(&self.file, self.pos, &mut self.scratch[..chunk])?;
            self.staged.extend(&self.scratch[..chunk]);
            self.pos += chunk as u64;
            remaining -= chunk;
        }
        Ok(())
    }

    /// Consumes a little-endian u64 from the staging queue.
    pub fn take_u64(&mut self) -> Result<u64> {
        let mut bytes = [0u8; 8];
        for byte in &mut bytes {
            *byte = self.staged.pop_front().ok_or_else(Self::underrun)?;
        }
        Ok(u64::from_le_bytes(bytes))
    }

    /// Consumes `n` raw bytes from the staging queue.
    pub fn take_bytes(&mut self, n: usize) -> Result<Vec<u8>> {
        if self.staged.len() < n {
            return Err(Self::underrun());
        }
        Ok(self.staged.drain(..n).collect())
    }

    fn underrun() -> StoreError {
        StoreError::Corruption("staging queue exhausted before field end".into())
    }

    pub fn len(&self) -> Result<u64> {
        Ok(self.file.metadata()?.len())
    }

    /// Ensures the file is at least `len` bytes long, zero-extending. The
    /// next [`commit`](Self::commit) or [`sync`](Self::sync) makes the new
    /// length durable.
    pub fn grow_to(&mut self, len: u64) -> Result<()> {
        if self.len()? < len {
            self.file.set_len(len)?;
        }
        Ok(())
    }

    /// Sets the file length, discarding bytes past `len`.
    pub fn truncate(&mut self, len: u64) -> Result<()> {
        self.file.set_len(len)?;
        Ok(())
    }

    pub fn sync(&self) -> Result<()> {
        self.file.sync_all()?;
        Ok(())
    }
}
