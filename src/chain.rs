//! Block lookups for explorer-style queries

use std::sync::Arc;

use bitcoin::BlockHash;

use crate::error::NodeError;
use crate::node::ClientFactory;
use crate::types::BlockSummary;

pub struct ChainExplorer {
    factory: Arc<dyn ClientFactory>,
}

impl ChainExplorer {
    pub fn new(factory: Arc<dyn ClientFactory>) -> Self {
        Self { factory }
    }

    pub fn best_block_hash(&self) -> Result<BlockHash, NodeError> {
        self.factory.connect()?.best_block_hash()
    }

    pub fn block_count(&self) -> Result<u64, NodeError> {
        self.factory.connect()?.block_count()
    }

    pub fn block_hash(&self, height: u64) -> Result<BlockHash, NodeError> {
        self.factory.connect()?.block_hash(height)
    }

    pub fn block(&self, hash: &BlockHash) -> Result<BlockSummary, NodeError> {
        self.factory.connect()?.block(hash)
    }

    /// The block currently at the tip of the best chain
    pub fn tip(&self) -> Result<BlockSummary, NodeError> {
        let client = self.factory.connect()?;
        let hash = client.best_block_hash()?;
        client.block(&hash)
    }
}
