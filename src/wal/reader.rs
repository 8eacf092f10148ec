//! WAL Reader
//!
//! Handles reading entries from the WAL file.

use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::Path;

use crate::error::{Result, StoreError};

use super::entry::{HEADER_SIZE, MAX_ENTRY_SIZE};
use super::WalEntry;

/// Outcome of reading one record
#[derive(Debug)]
pub enum WalRead {
    /// A complete, checksummed entry
    Entry(WalEntry),

    /// Clean end of file on a record boundary
    Eof,

    /// The file ends part-way through a record (crash mid-append)
    TornTail,

    /// A complete record whose checksum or body does not verify
    Corrupt(String),
}

/// Reads entries from the WAL file
pub struct WalReader {
    reader: BufReader<File>,

    /// Offset just past the last complete, valid record
    valid_offset: u64,
}

impl WalReader {
    /// Open a WAL file for reading
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self {
            reader: BufReader::new(file),
            valid_offset: 0,
        })
    }

    /// Read the next record
    ///
    /// I/O failures are errors; damage to the log is reported as a
    /// [`WalRead`] variant so recovery can decide what to keep.
    pub fn read_next(&mut self) -> Result<WalRead> {
        let mut header = [0u8; HEADER_SIZE];
        match read_full(&mut self.reader, &mut header)? {
            0 => return Ok(WalRead::Eof),
            n if n < HEADER_SIZE => return Ok(WalRead::TornTail),
            _ => {}
        }

        let lsn = u64::from_le_bytes(header[0..8].try_into().unwrap_or_default());
        let crc = u32::from_le_bytes(header[8..12].try_into().unwrap_or_default());
        let len = u32::from_le_bytes(header[12..16].try_into().unwrap_or_default());

        if len > MAX_ENTRY_SIZE {
            return Ok(WalRead::Corrupt(format!("entry length {} exceeds maximum", len)));
        }

        let mut body = vec![0u8; len as usize];
        if read_full(&mut self.reader, &mut body)? < body.len() {
            return Ok(WalRead::TornTail);
        }

        match WalEntry::deserialize(lsn, crc, &body) {
            Ok(entry) => {
                self.valid_offset += (HEADER_SIZE + body.len()) as u64;
                Ok(WalRead::Entry(entry))
            }
            Err(StoreError::WalCorruption(reason)) => Ok(WalRead::Corrupt(reason)),
            Err(e) => Err(e),
        }
    }

    /// Read the next entry, treating any damage as an error
    pub fn next_entry(&mut self) -> Result<Option<WalEntry>> {
        match self.read_next()? {
            WalRead::Entry(entry) => Ok(Some(entry)),
            WalRead::Eof => Ok(None),
            WalRead::TornTail => Err(StoreError::WalCorruption(format!(
                "truncated record at offset {}",
                self.valid_offset
            ))),
            WalRead::Corrupt(reason) => Err(StoreError::WalCorruption(reason)),
        }
    }

    /// Offset just past the last valid record read so far
    pub fn valid_offset(&self) -> u64 {
        self.valid_offset
    }

    /// Iterate over all valid entries
    pub fn entries(self) -> WalIterator {
        WalIterator {
            reader: self,
            done: false,
        }
    }
}

/// Iterator over WAL entries; yields one error and stops on damage
pub struct WalIterator {
    reader: WalReader,
    done: bool,
}

impl Iterator for WalIterator {
    type Item = Result<WalEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        match self.reader.next_entry() {
            Ok(Some(entry)) => Some(Ok(entry)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Fill `buf` as far as the file allows; returns the bytes read
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(filled)
}
