//! Disk I/O for store files.
//!
//! Record `i` lives at `HEADER_SIZE + i * RECORD_SIZE`. Every write seeks,
//! writes, and flushes before returning; there is no buffering layer above
//! the file, so a returned error means the medium must be assumed
//! undefined and the store re-opened.

use crate::error::Result;
use crate::header::{Header, HEADER_SIZE};
use crate::record::{Record, RECORD_SIZE};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Disk-backed store file.
pub struct StoreFile {
    file: File,
    path: PathBuf,
}

impl StoreFile {
    /// Create a new store file and persist the initial header.
    ///
    /// Fails if the file already exists.
    pub fn create<P: AsRef<Path>>(path: P, header: &Header) -> Result<Self> {
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(&path)?;

        file.write_all(&header.to_bytes())?;
        file.flush()?;

        Ok(StoreFile {
            file,
            path: path.as_ref().to_path_buf(),
        })
    }

    /// Open an existing store file for read and update.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(&path)?;

        Ok(StoreFile {
            file,
            path: path.as_ref().to_path_buf(),
        })
    }

    /// Read the header (offset 0)
    pub fn read_header(&mut self) -> Result<Header> {
        self.file.seek(SeekFrom::Start(0))?;
        let mut buffer = vec![0u8; HEADER_SIZE];
        self.file.read_exact(&mut buffer)?;
        Header::from_bytes(&buffer)
    }

    /// Write the header (offset 0)
    pub fn write_header(&mut self, header: &Header) -> Result<()> {
        self.file.seek(SeekFrom::Start(0))?;
        self.file.write_all(&header.to_bytes())?;
        self.file.flush()?;
        Ok(())
    }

    /// Read record `index`
    pub fn read_record(&mut self, index: u32) -> Result<Record> {
        let offset = HEADER_SIZE as u64 + index as u64 * RECORD_SIZE as u64;
        self.file.seek(SeekFrom::Start(offset))?;

        let mut buffer = vec![0u8; RECORD_SIZE];
        self.file.read_exact(&mut buffer)?;

        Record::from_bytes(&buffer)
    }

    /// Append a record at the end of the file
    pub fn append_record(&mut self, record: &Record) -> Result<()> {
        self.file.seek(SeekFrom::End(0))?;
        self.file.write_all(&record.to_bytes())?;
        self.file.flush()?;
        Ok(())
    }

    /// Current file length in bytes.
    pub fn file_len(&self) -> Result<u64> {
        Ok(self.file.metadata()?.len())
    }

    /// Get file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sync all writes to disk
    pub fn sync(&mut self) -> Result<()> {
        self.file.sync_all()?;
        Ok(())
    }
}
