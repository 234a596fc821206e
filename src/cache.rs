use linked_hash_map::LinkedHashMap;
use tracing::trace;

use crate::block_device::BlockId;
use crate::node::Node;

//-------------------------------------------------------------------------

/// Bounded, recency-ordered cache of decoded nodes.
///
/// Read-through: `get_or_insert_with` returns the cached node if present,
/// otherwise calls the loader, inserts the result (evicting the
/// least-recently-used entry if the cache is full) and returns it.
///
/// Every write to the index file invalidates the *entire* cache via
/// [`NodeCache::clear`] — splits rewrite several nodes and the header in
/// one operation, and a per-id invalidation scheme would have to track
/// that fan-out precisely to stay correct. Whole-cache invalidation is
/// simple and cheap at this capacity.
pub struct NodeCache {
    capacity: usize,
    entries: LinkedHashMap<BlockId, Node>,
}

impl NodeCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: LinkedHashMap::new(),
        }
    }

    pub fn get(&mut self, id: BlockId) -> Option<Node> {
        self.entries.get_refresh(&id).cloned()
    }

    pub fn insert(&mut self, node: Node) {
        if self.entries.len() >= self.capacity && !self.entries.contains_key(&node.id) {
            self.entries.pop_front();
        }
        self.entries.insert(node.id, node);
    }

    pub fn clear(&mut self) {
        trace!("cache cleared");
        self.entries.clear();
    }
}

//-------------------------------------------------------------------------


//-------------------------------------------------------------------------
