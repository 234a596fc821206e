use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;
use tracing::trace;

use crate::error::Result;

//-------------------------------------------------------------------------

pub const BLOCK_SIZE: usize = 512;

pub type BlockId = u64;

//-------------------------------------------------------------------------

/// Thin wrapper over a seekable file giving random access to fixed
/// 512-byte blocks.  Reads past the end of the file are zero-padded up
/// to a full block; writes must supply exactly one block and are
/// flushed to the OS (and synced) before returning.
pub struct BlockDevice {
    file: File,
}

impl BlockDevice {
    pub fn create_new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path)?;
        Ok(Self { file })
    }

    pub fn open_existing<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        Ok(Self { file })
    }

    /// Grow the underlying file to at least `nr_blocks * BLOCK_SIZE` bytes.
    pub fn set_len_blocks(&mut self, nr_blocks: u64) -> Result<()> {
        self.file.set_len(nr_blocks * BLOCK_SIZE as u64)?;
        Ok(())
    }

    pub fn read_block(&mut self, id: BlockId) -> Result<[u8; BLOCK_SIZE]> {
        trace!("read_block {id}");
        let mut buf = [0u8; BLOCK_SIZE];
        self.file.seek(SeekFrom::Start(id * BLOCK_SIZE as u64))?;

        let mut nread = 0;
        loop {
            match self.file.read(&mut buf[nread..])? {
                0 => break,
                n => nread += n,
            }
        }
        // short reads (allocated-but-never-written blocks, or a file
        // shorter than expected) are zero-padded; `buf` is already zeroed
        // past `nread`.
        Ok(buf)
    }

    pub fn write_block(&mut self, id: BlockId, data: &[u8]) -> Result<()> {
        assert_eq!(
            data.len(),
            BLOCK_SIZE,
            "write_block requires an exact {BLOCK_SIZE}-byte buffer"
        );
        trace!("write_block {id}");
        self.file.seek(SeekFrom::Start(id * BLOCK_SIZE as u64))?;
        self.file.write_all(data)?;
        self.file.sync_data()?;
        Ok(())
    }
}

//-------------------------------------------------------------------------


//-------------------------------------------------------------------------
