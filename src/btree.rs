use std::path::Path;
use tracing::{debug, trace};

use crate::block_device::{BlockDevice, BlockId};
use crate::cache::NodeCache;
use crate::error::{IndexError, Result};
use crate::header::Header;
use crate::node::{Node, MAX_CHILDREN, MAX_KEYS, MIN_DEGREE};

//-------------------------------------------------------------------------

const CACHE_CAPACITY: usize = 3;
const INITIAL_FILE_BLOCKS: u64 = 4;

/// The on-disk B-tree engine: block device + header + node cache, bound
/// together by the search/insert/traversal algorithms.
///
/// Single-threaded and synchronous by design (see the concurrency model
/// in the format's specification) — every public method runs to
/// completion against the file before returning, there is no locking and
/// no shared ownership.
pub struct BTree {
    device: BlockDevice,
    header: Header,
    cache: NodeCache,
}

impl BTree {
    /// Create a new, empty index file at `path`. Fails if it already exists.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            return Err(IndexError::PathConflict(path.to_path_buf()));
        }

        let mut device = BlockDevice::create_new(path)?;
        device.set_len_blocks(INITIAL_FILE_BLOCKS)?;

        let mut tree = BTree {
            device,
            header: Header {
                root_id: 1,
                next_free_id: 2,
            },
            cache: NodeCache::new(CACHE_CAPACITY),
        };

        tree.persist_header()?;
        let root = Node::new_leaf(1, 0);
        tree.persist_node(&root)?;
        debug!("created empty index at {}", path.display());
        Ok(tree)
    }

    /// Open an existing index file. Fails if it doesn't exist or its
    /// header magic doesn't match.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(IndexError::MissingInput(path.to_path_buf()));
        }

        let mut device = BlockDevice::open_existing(path)?;
        let block0 = device.read_block(0)?;
        let header = Header::decode(&block0)?;

        Ok(BTree {
            device,
            header,
            cache: NodeCache::new(CACHE_CAPACITY),
        })
    }

    //---------------------------------------------------------------

    fn persist_header(&mut self) -> Result<()> {
        self.device.write_block(0, &self.header.encode())?;
        self.cache.clear();
        Ok(())
    }

    fn persist_node(&mut self, node: &Node) -> Result<()> {
        self.device.write_block(node.id, &node.encode())?;
        self.cache.clear();
        Ok(())
    }

    fn load_node(&mut self, id: BlockId) -> Result<Node> {
        if let Some(node) = self.cache.get(id) {
            trace!("cache hit for block {id}");
            return Ok(node);
        }
        let block = self.device.read_block(id)?;
        let node = Node::decode(&block)?;
        self.cache.insert(node.clone());
        Ok(node)
    }

    fn alloc_block(&mut self) -> BlockId {
        let id = self.header.next_free_id;
        self.header.next_free_id += 1;
        id
    }

    //---------------------------------------------------------------
    // Search

    /// Returns the value associated with `key`, or `None` if absent.
    pub fn search(&mut self, key: u64) -> Result<Option<u64>> {
        let mut id = self.header.root_id;
        loop {
            let node = self.load_node(id)?;
            let i = node.find_index(key);
            if i < node.nr_keys as usize && node.keys[i] == key {
                return Ok(Some(node.values[i]));
            }
            if node.is_leaf {
                return Ok(None);
            }
            id = node.children[i];
        }
    }

    //---------------------------------------------------------------
    // Insert

    /// Insert `(key, value)`. Rejects the insertion with
    /// [`IndexError::DuplicateKey`] if `key` is already present — see the
    /// duplicate-key policy discussion in the design notes.
    pub fn insert(&mut self, key: u64, value: u64) -> Result<()> {
        let root_id = self.header.root_id;
        let root = self.load_node(root_id)?;

        if root.is_full() {
            let new_root_id = self.alloc_block();
            let mut new_root = Node::new_internal(new_root_id, 0);
            new_root.children[0] = root_id;

            let mut old_root = root;
            old_root.parent = new_root_id;
            self.persist_node(&old_root)?;

            self.header.root_id = new_root_id;
            self.persist_header()?;
            self.persist_node(&new_root)?;

            self.split_child(new_root_id, 0)?;
            self.insert_nonfull(new_root_id, key, value)
        } else {
            self.insert_nonfull(root_id, key, value)
        }
    }

    /// Split the full child at `parent.children[idx]`, promoting its
    /// median key/value into `parent` at position `idx`.
    fn split_child(&mut self, parent_id: BlockId, idx: usize) -> Result<()> {
        let t = MIN_DEGREE;
        let mut parent = self.load_node(parent_id)?;
        let child_id = parent.children[idx];
        let mut child = self.load_node(child_id)?;

        let new_id = self.alloc_block();
        let mut sibling = if child.is_leaf {
            Node::new_leaf(new_id, parent_id)
        } else {
            Node::new_internal(new_id, parent_id)
        };

        sibling.nr_keys = (t - 1) as u32;
        for j in 0..t - 1 {
            sibling.keys[j] = child.keys[j + t];
            sibling.values[j] = child.values[j + t];
        }
        if !child.is_leaf {
            for j in 0..t {
                sibling.children[j] = child.children[j + t];
            }
        }

        let median_key = child.keys[t - 1];
        let median_value = child.values[t - 1];

        for j in t - 1..MAX_KEYS {
            child.keys[j] = 0;
            child.values[j] = 0;
        }
        if !child.is_leaf {
            for j in t..MAX_CHILDREN {
                child.children[j] = 0;
            }
        }
        child.nr_keys = (t - 1) as u32;

        let nr_parent_keys = parent.nr_keys as usize;
        for j in (idx + 1..=nr_parent_keys).rev() {
            parent.children[j + 1] = parent.children[j];
        }
        parent.children[idx + 1] = new_id;

        for j in (idx..nr_parent_keys).rev() {
            parent.keys[j + 1] = parent.keys[j];
            parent.values[j + 1] = parent.values[j];
        }
        parent.keys[idx] = median_key;
        parent.values[idx] = median_value;
        parent.nr_keys += 1;

        debug!(
            "split block {child_id} at parent {parent_id} idx {idx}, new sibling {new_id}"
        );

        self.persist_node(&child)?;
        self.persist_node(&sibling)?;
        self.persist_node(&parent)?;
        // next_free_id moved, so the header needs rewriting too.
        self.persist_header()?;

        Ok(())
    }

    /// Insert `(key, value)` into the subtree rooted at `node_id`, which
    /// is known not to be full.
    fn insert_nonfull(&mut self, node_id: BlockId, key: u64, value: u64) -> Result<()> {
        let mut node = self.load_node(node_id)?;
        let idx = node.find_index(key);

        if idx < node.nr_keys as usize && node.keys[idx] == key {
            return Err(IndexError::DuplicateKey(key));
        }

        if node.is_leaf {
            let nr_keys = node.nr_keys as usize;
            for j in (idx..nr_keys).rev() {
                node.keys[j + 1] = node.keys[j];
                node.values[j + 1] = node.values[j];
            }
            node.keys[idx] = key;
            node.values[idx] = value;
            node.nr_keys += 1;
            self.persist_node(&node)?;
            Ok(())
        } else {
            let mut i = idx;
            let child_id = node.children[i];
            let child = self.load_node(child_id)?;

            if child.is_full() {
                self.split_child(node_id, i)?;
                let node = self.load_node(node_id)?;
                if key > node.keys[i] {
                    i += 1;
                }
            }

            let node = self.load_node(node_id)?;
            let next_child = node.children[i];
            self.insert_nonfull(next_child, key, value)
        }
    }

    //---------------------------------------------------------------
    // Traversal

    /// All `(key, value)` pairs in strictly ascending key order.
    pub fn iter_ordered(&mut self) -> Result<Vec<(u64, u64)>> {
        let mut out = Vec::new();
        let root = self.header.root_id;
        self.inorder(root, &mut out)?;
        Ok(out)
    }

    fn inorder(&mut self, node_id: BlockId, out: &mut Vec<(u64, u64)>) -> Result<()> {
        let node = self.load_node(node_id)?;
        for i in 0..node.nr_keys as usize {
            if !node.is_leaf {
                self.inorder(node.children[i], out)?;
            }
            out.push((node.keys[i], node.values[i]));
        }
        if !node.is_leaf {
            self.inorder(node.children[node.nr_keys as usize], out)?;
        }
        Ok(())
    }

    //---------------------------------------------------------------
    // Diagnostics (used by the test suite to assert well-formedness)

    #[cfg(test)]
    pub fn root_id(&self) -> BlockId {
        self.header.root_id
    }

    #[cfg(test)]
    pub fn next_free_id(&self) -> BlockId {
        self.header.next_free_id
    }

    #[cfg(test)]
    pub fn load_node_for_test(&mut self, id: BlockId) -> Result<Node> {
        self.load_node(id)
    }

    /// Walks the whole tree checking the invariants from the format spec:
    /// strictly ascending keys per node, bounded fanout, and that every
    /// block id is only reachable once. Returns the total entry count.
    #[cfg(test)]
    pub fn check(&mut self) -> Result<u64> {
        use std::collections::BTreeSet;
        let mut seen = BTreeSet::new();
        let root = self.header.root_id;
        self.check_(root, None, None, &mut seen)
    }

    #[cfg(test)]
    fn check_(
        &mut self,
        node_id: BlockId,
        key_min: Option<u64>,
        key_max: Option<u64>,
        seen: &mut std::collections::BTreeSet<BlockId>,
    ) -> Result<u64> {
        assert!(seen.insert(node_id), "block {node_id} reachable twice");

        let node = self.load_node(node_id)?;
        let nr_keys = node.nr_keys as usize;
        assert!(nr_keys <= MAX_KEYS);

        let mut last: Option<u64> = None;
        for i in 0..nr_keys {
            let k = node.keys[i];
            if let Some(min) = key_min {
                assert!(k > min, "key {k} below lower bound {min}");
            }
            if let Some(max) = key_max {
                assert!(k < max, "key {k} above upper bound {max}");
            }
            if let Some(last) = last {
                assert!(k > last, "keys out of order: {last} >= {k}");
            }
            last = Some(k);
        }

        let mut total = nr_keys as u64;
        if !node.is_leaf {
            for i in 0..=nr_keys {
                let kmin = if i == 0 { key_min } else { Some(node.keys[i - 1]) };
                let kmax = if i == nr_keys { key_max } else { Some(node.keys[i]) };
                total += self.check_(node.children[i], kmin, kmax, seen)?;
            }
        }
        Ok(total)
    }
}

//-------------------------------------------------------------------------


//-------------------------------------------------------------------------
