use anyhow::{anyhow, Context, Result};
use donation_core::{Block, Hash, LedgerStore, Transaction};
use sled::transaction::TransactionError;
use sled::{Db, Transactional, Tree};
use std::path::Path;
use tracing::info;

const TREE_BLOCKS: &str = "blocks";
const TREE_PENDING: &str = "pending";

/// Sled-backed ledger store. Blocks are keyed by big-endian index and
/// pending transactions by big-endian seq, so tree iteration order is chain
/// order. The tip is derived from the ordered key space instead of being
/// tracked as separate metadata that could drift from the blocks tree.
#[derive(Clone)]
pub struct SledStore {
    db: Db,
    blocks: Tree,
    pending: Tree,
}

impl SledStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let db = sled::open(path).context("open sled database")?;
        let blocks = db.open_tree(TREE_BLOCKS)?;
        let pending = db.open_tree(TREE_PENDING)?;
        info!("sled store opened");
        Ok(Self {
            db,
            blocks,
            pending,
        })
    }

    pub fn get_block(&self, index: u64) -> Result<Option<Block>> {
        match self.blocks.get(index.to_be_bytes())? {
            Some(value) => {
                let block = bincode::deserialize(&value)
                    .with_context(|| format!("corrupt block record at index {index}"))?;
                Ok(Some(block))
            }
            None => Ok(None),
        }
    }

    pub fn tip_height(&self) -> Result<Option<u64>> {
        Ok(self.last_block()?.map(|b| b.header.index))
    }

    pub fn tip_hash(&self) -> Result<Option<Hash>> {
        Ok(self.last_block()?.map(|b| b.hash))
    }

    fn last_block(&self) -> Result<Option<Block>> {
        match self.blocks.last()? {
            Some((key, value)) => {
                let block = bincode::deserialize(&value)
                    .with_context(|| format!("corrupt block record at key {}", hex::encode(&key)))?;
                Ok(Some(block))
            }
            None => Ok(None),
        }
    }

    /// Drop every stored record.
    pub fn clear(&self) -> Result<()> {
        self.blocks.clear()?;
        self.pending.clear()?;
        self.db.flush()?;
        Ok(())
    }

    pub fn close(&self) -> Result<()> {
        self.db.flush()?;
        Ok(())
    }
}

impl LedgerStore for SledStore {
    fn append_pending(&self, tx: &Transaction) -> Result<()> {
        let bytes = bincode::serialize(tx).context("encode pending transaction")?;
        self.pending.insert(tx.seq.to_be_bytes(), bytes)?;
        self.pending.flush()?;
        Ok(())
    }

    fn commit_block(&self, block: &Block) -> Result<()> {
        let key = block.header.index.to_be_bytes();
        let bytes = bincode::serialize(block).context("encode block")?;
        let absorbed: Vec<[u8; 8]> = block.txs.iter().map(|tx| tx.seq.to_be_bytes()).collect();

        // The block lands and the pending records it absorbed disappear in
        // one atomic step, or neither happens.
        let result: Result<(), TransactionError> =
            (&self.blocks, &self.pending).transaction(|(blocks, pending)| {
                blocks.insert(&key, bytes.clone())?;
                for seq_key in &absorbed {
                    pending.remove(seq_key)?;
                }
                Ok(())
            });
        result.map_err(|e| anyhow!("block commit aborted: {e:?}"))?;
        self.db.flush()?;
        Ok(())
    }

    fn load_blocks(&self) -> Result<Vec<Block>> {
        let mut blocks = Vec::new();
        for entry in self.blocks.iter() {
            let (key, value) = entry.context("scan blocks tree")?;
            let block: Block = bincode::deserialize(&value)
                .with_context(|| format!("corrupt block record at key {}", hex::encode(&key)))?;
            blocks.push(block);
        }
        Ok(blocks)
    }

    fn load_pending(&self) -> Result<Vec<Transaction>> {
        let mut txs = Vec::new();
        for entry in self.pending.iter() {
            let (key, value) = entry.context("scan pending tree")?;
            let tx: Transaction = bincode::deserialize(&value)
                .with_context(|| format!("corrupt pending record at key {}", hex::encode(&key)))?;
            txs.push(tx);
        }
        Ok(txs)
    }
}
