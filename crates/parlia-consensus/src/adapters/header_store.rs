//! In-memory header store

use crate::ports::HeaderReader;
use parking_lot::RwLock;
use shared_types::{BlockHeader, Hash};
use std::collections::HashMap;

/// Headers indexed by hash. Suitable for tests and light embedding.
#[derive(Debug, Default)]
pub struct InMemoryHeaderStore {
    headers: RwLock<HashMap<Hash, BlockHeader>>,
}

impl InMemoryHeaderStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a header, returning its hash.
    pub fn insert(&self, header: BlockHeader) -> Hash {
        let hash = header.hash();
        self.headers.write().insert(hash, header);
        hash
    }

    pub fn len(&self) -> usize {
        self.headers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.read().is_empty()
    }
}

impl HeaderReader for InMemoryHeaderStore {
    fn header(&self, number: u64, hash: &Hash) -> Option<BlockHeader> {
        self.headers
            .read()
            .get(hash)
            .filter(|h| h.number == number)
            .cloned()
    }
}
