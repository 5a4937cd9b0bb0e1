use crate::{Block, Transaction};
use anyhow::Result;

/// Trait the storage backends implement for the ledger to write through.
/// This lives in `donation-core` to avoid a circular dependency.
///
/// `commit_block` must be atomic: the block lands and the pending records it
/// absorbed are gone, or neither. `load_*` return records in chain order.
pub trait LedgerStore: Send + Sync {
    fn append_pending(&self, tx: &Transaction) -> Result<()>;
    fn commit_block(&self, block: &Block) -> Result<()>;
    fn load_blocks(&self) -> Result<Vec<Block>>;
    fn load_pending(&self) -> Result<Vec<Transaction>>;
}

/// Store that keeps nothing. Backs ephemeral ledgers and unit tests;
/// recovery always starts empty.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullStore;

impl LedgerStore for NullStore {
    fn append_pending(&self, _tx: &Transaction) -> Result<()> {
        Ok(())
    }

    fn commit_block(&self, _block: &Block) -> Result<()> {
        Ok(())
    }

    fn load_blocks(&self) -> Result<Vec<Block>> {
        Ok(Vec::new())
    }

    fn load_pending(&self) -> Result<Vec<Transaction>> {
        Ok(Vec::new())
    }
}
