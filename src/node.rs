use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Cursor, Read, Write};

use crate::block_device::{BlockId, BLOCK_SIZE};

//-------------------------------------------------------------------------

/// Minimum degree of the tree.  Fixed by the on-disk format: changing it
/// changes the block layout below, not just a runtime parameter.
pub const MIN_DEGREE: usize = 10;

/// 2t - 1
pub const MAX_KEYS: usize = 2 * MIN_DEGREE - 1;
/// t - 1
pub const MIN_KEYS: usize = MIN_DEGREE - 1;
/// 2t
pub const MAX_CHILDREN: usize = 2 * MIN_DEGREE;

const LEAF_FLAG_OFFSET: usize = 0;
const ID_OFFSET: usize = 1;
const PARENT_OFFSET: usize = 9;
const NR_KEYS_OFFSET: usize = 17;
const KEYS_OFFSET: usize = 21;
const VALUES_OFFSET: usize = KEYS_OFFSET + 8 * MAX_KEYS;
const CHILDREN_OFFSET: usize = VALUES_OFFSET + 8 * MAX_KEYS;
const RESERVED_OFFSET: usize = CHILDREN_OFFSET + 8 * MAX_CHILDREN;

const _: () = assert!(RESERVED_OFFSET + 27 == BLOCK_SIZE);

//-------------------------------------------------------------------------

/// The logical state of one B-tree node.  A node always occupies exactly
/// one 512-byte block; unused key/value/child slots are zero.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Node {
    pub is_leaf: bool,
    pub id: BlockId,
    pub parent: BlockId,
    pub nr_keys: u32,
    pub keys: [u64; MAX_KEYS],
    pub values: [u64; MAX_KEYS],
    pub children: [BlockId; MAX_CHILDREN],
}

impl Node {
    pub fn new_leaf(id: BlockId, parent: BlockId) -> Self {
        Node {
            is_leaf: true,
            id,
            parent,
            nr_keys: 0,
            keys: [0; MAX_KEYS],
            values: [0; MAX_KEYS],
            children: [0; MAX_CHILDREN],
        }
    }

    pub fn new_internal(id: BlockId, parent: BlockId) -> Self {
        Node {
            is_leaf: false,
            ..Node::new_leaf(id, parent)
        }
    }

    pub fn is_full(&self) -> bool {
        self.nr_keys as usize == MAX_KEYS
    }

    /// Smallest index `i` such that `keys[i] >= key` (or `nr_keys` if none).
    /// The node never holds more than `MAX_KEYS` keys, so a linear scan is
    /// both correct and fast enough.
    pub fn find_index(&self, key: u64) -> usize {
        let mut i = 0;
        while i < self.nr_keys as usize && self.keys[i] < key {
            i += 1;
        }
        i
    }

    pub fn encode(&self) -> [u8; BLOCK_SIZE] {
        let mut buf = [0u8; BLOCK_SIZE];
        let mut w = Cursor::new(&mut buf[..]);
        self.write_into(&mut w).expect("encode into fixed buffer");
        buf
    }

    fn write_into<W: Write>(&self, w: &mut W) -> io::Result<()> {
        w.write_u8(if self.is_leaf { 1 } else { 0 })?;
        w.write_u64::<BigEndian>(self.id)?;
        w.write_u64::<BigEndian>(self.parent)?;
        w.write_u32::<BigEndian>(self.nr_keys)?;
        for k in self.keys.iter() {
            w.write_u64::<BigEndian>(*k)?;
        }
        for v in self.values.iter() {
            w.write_u64::<BigEndian>(*v)?;
        }
        for c in self.children.iter() {
            w.write_u64::<BigEndian>(*c)?;
        }
        w.write_all(&[0u8; 27])?;
        Ok(())
    }

    pub fn decode(data: &[u8; BLOCK_SIZE]) -> io::Result<Self> {
        let mut r = Cursor::new(&data[..]);
        let is_leaf = r.read_u8()? != 0;
        let id = r.read_u64::<BigEndian>()?;
        let parent = r.read_u64::<BigEndian>()?;
        let nr_keys = r.read_u32::<BigEndian>()?;

        let mut keys = [0u64; MAX_KEYS];
        for k in keys.iter_mut() {
            *k = r.read_u64::<BigEndian>()?;
        }

        let mut values = [0u64; MAX_KEYS];
        for v in values.iter_mut() {
            *v = r.read_u64::<BigEndian>()?;
        }

        let mut children = [0u64; MAX_CHILDREN];
        for c in children.iter_mut() {
            *c = r.read_u64::<BigEndian>()?;
        }

        Ok(Node {
            is_leaf,
            id,
            parent,
            nr_keys,
            keys,
            values,
            children,
        })
    }

    #[cfg(test)]
    fn read_back(&self) -> io::Result<Self> {
        Self::decode(&self.encode())
    }
}

// sanity: offsets line up with the layout table in the format spec.
const _: () = assert!(ID_OFFSET == 1);
const _: () = assert!(PARENT_OFFSET == 9);
const _: () = assert!(NR_KEYS_OFFSET == 17);
const _: () = assert!(KEYS_OFFSET == 21);
const _: () = assert!(VALUES_OFFSET == 173);
const _: () = assert!(CHILDREN_OFFSET == 325);
const _: () = assert!(LEAF_FLAG_OFFSET == 0);

//-------------------------------------------------------------------------


//-------------------------------------------------------------------------
