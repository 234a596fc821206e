use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Cursor, Write};

use crate::block_device::{BlockId, BLOCK_SIZE};
use crate::error::{IndexError, Result};

//-------------------------------------------------------------------------

pub const MAGIC: &[u8; 8] = b"4348PRJ3";

const ROOT_OFFSET: usize = 8;
const NEXT_FREE_OFFSET: usize = 16;
const RESERVED_OFFSET: usize = 24;

const _: () = assert!(RESERVED_OFFSET + 488 == BLOCK_SIZE);

//-------------------------------------------------------------------------

/// Block 0 of an index file: magic tag, root block id, next-free block id.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Header {
    pub root_id: BlockId,
    pub next_free_id: BlockId,
}

impl Header {
    pub fn encode(&self) -> [u8; BLOCK_SIZE] {
        let mut buf = [0u8; BLOCK_SIZE];
        {
            let mut w = Cursor::new(&mut buf[..]);
            w.write_all(MAGIC).expect("write magic");
            w.write_u64::<BigEndian>(self.root_id).expect("write root_id");
            w.write_u64::<BigEndian>(self.next_free_id)
                .expect("write next_free_id");
        }
        buf
    }

    pub fn decode(data: &[u8; BLOCK_SIZE]) -> Result<Self> {
        if &data[0..8] != MAGIC {
            return Err(IndexError::BadMagic);
        }
        let mut root_slice = &data[ROOT_OFFSET..];
        let root_id = root_slice.read_u64::<BigEndian>()?;
        let mut next_free_slice = &data[NEXT_FREE_OFFSET..];
        let next_free_id = next_free_slice.read_u64::<BigEndian>()?;
        Ok(Header {
            root_id,
            next_free_id,
        })
    }
}

//-------------------------------------------------------------------------


//-------------------------------------------------------------------------
