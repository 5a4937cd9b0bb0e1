use crate::error::LedgerError;
use crate::store::{LedgerStore, NullStore};
use crate::{merkle_root, unix_millis, Block, Hash, Transaction};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// Outcome of recording one donation: where its transaction landed.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Receipt {
    #[serde(with = "hex")]
    pub transaction_id: Hash,
    #[serde(with = "hex")]
    pub block_hash: Hash,
    pub block_index: u64,
}

/// One integrity failure found by `audit`, anchored to a block index.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Fault {
    pub index: u64,
    pub kind: FaultKind,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FaultKind {
    /// Recomputed Merkle root disagrees with the header: a transaction in
    /// the block was altered.
    MerkleMismatch,
    /// Recomputed header hash disagrees with the stored hash: a header
    /// field was altered.
    HashMismatch,
    /// `previous_hash` does not match the predecessor's stored hash.
    BrokenLink,
}

/// The append-only chain plus the pending-transaction buffer. Sole writer of
/// both; every mutation is written through to the backing store before the
/// in-memory state changes.
pub struct Ledger<S: LedgerStore> {
    store: Arc<S>,
    chain: Vec<Block>,
    pending: Vec<Transaction>,
    seq: u64,
}

impl Ledger<NullStore> {
    /// Ephemeral ledger with no durable backing.
    pub fn in_memory() -> Self {
        Self::open(Arc::new(NullStore)).expect("null store cannot fail")
    }
}

impl<S: LedgerStore> Ledger<S> {
    /// Open a ledger over `store`, replaying durable state. Creates and
    /// persists the genesis block when the store is empty; refuses to open
    /// a chain that fails the integrity audit.
    pub fn open(store: Arc<S>) -> Result<Self, LedgerError> {
        let mut chain = store.load_blocks()?;
        let pending = store.load_pending()?;
        if chain.is_empty() {
            let genesis = Block::genesis();
            store.commit_block(&genesis)?;
            info!("created genesis block");
            chain.push(genesis);
        } else {
            let faults = audit_chain(&chain);
            if !faults.is_empty() {
                return Err(LedgerError::Corruption(format!(
                    "recovered chain failed integrity audit: {faults:?}"
                )));
            }
            info!(
                blocks = chain.len(),
                pending = pending.len(),
                "recovered ledger state"
            );
        }
        let seq = chain
            .iter()
            .flat_map(|b| b.txs.iter())
            .chain(pending.iter())
            .map(|tx| tx.seq + 1)
            .max()
            .unwrap_or(0);
        Ok(Self {
            store,
            chain,
            pending,
            seq,
        })
    }

    /// Queue a donation into the pending buffer. Identities are opaque
    /// tokens; callers validate them against their own user store.
    pub fn add_transaction(
        &mut self,
        from: String,
        to: String,
        amount: u64,
        message: String,
    ) -> Result<Transaction, LedgerError> {
        if amount == 0 {
            return Err(LedgerError::InvalidAmount);
        }
        let tx = Transaction::new(from, to, amount, message, unix_millis(), self.seq);
        self.store.append_pending(&tx)?;
        self.seq += 1;
        self.pending.push(tx.clone());
        Ok(tx)
    }

    /// Seal the current pending snapshot into a new block. An empty buffer
    /// is legal and yields an empty block. The store commit happens first;
    /// a failed commit leaves no partial block visible.
    pub fn mine(&mut self) -> Result<Block, LedgerError> {
        let tip = self.chain.last().expect("chain always holds genesis");
        let block = Block::seal(
            tip.header.index + 1,
            tip.hash,
            self.pending.clone(),
            unix_millis(),
        );
        self.store.commit_block(&block)?;
        info!(
            index = block.header.index,
            txs = block.txs.len(),
            hash = %hex::encode(block.hash),
            "sealed block"
        );
        self.pending.clear();
        self.chain.push(block.clone());
        Ok(block)
    }

    /// The donation-recording contract: queue the donation, then seal it
    /// immediately into its own block.
    pub fn record_donation(
        &mut self,
        from: String,
        to: String,
        amount: u64,
        message: String,
    ) -> Result<Receipt, LedgerError> {
        let tx = self.add_transaction(from, to, amount, message)?;
        let block = self.mine()?;
        Ok(Receipt {
            transaction_id: tx.id,
            block_hash: block.hash,
            block_index: block.header.index,
        })
    }

    /// Scan every non-genesis block and collect all integrity faults, so
    /// audit tooling sees every failing index rather than the first.
    pub fn audit(&self) -> Vec<Fault> {
        audit_chain(&self.chain)
    }

    pub fn verify(&self) -> bool {
        self.audit().is_empty()
    }

    /// Snapshot of the chain; mutations to it do not touch ledger state.
    pub fn chain(&self) -> Vec<Block> {
        self.chain.clone()
    }

    /// Snapshot of the pending buffer.
    pub fn pending(&self) -> Vec<Transaction> {
        self.pending.clone()
    }

    pub fn tip(&self) -> (u64, Hash) {
        let tip = self.chain.last().expect("chain always holds genesis");
        (tip.header.index, tip.hash)
    }

    /// Signed balance over every mined transaction: credited when `identity`
    /// receives, debited when it gives. Linear in total transaction count.
    pub fn balance_of(&self, identity: &str) -> i128 {
        let mut balance = 0i128;
        for tx in self.mined() {
            if tx.to == identity {
                balance += i128::from(tx.amount);
            }
            if tx.from == identity {
                balance -= i128::from(tx.amount);
            }
        }
        balance
    }

    /// Every mined transaction touching `identity`, in chain order.
    pub fn transactions_for(&self, identity: &str) -> Vec<Transaction> {
        self.mined()
            .filter(|tx| tx.from == identity || tx.to == identity)
            .cloned()
            .collect()
    }

    fn mined(&self) -> impl Iterator<Item = &Transaction> {
        self.chain.iter().flat_map(|b| b.txs.iter())
    }
}

fn audit_chain(chain: &[Block]) -> Vec<Fault> {
    let mut faults = Vec::new();
    for pair in chain.windows(2) {
        let (prev, block) = (&pair[0], &pair[1]);
        let index = block.header.index;
        if merkle_root(&block.txs) != block.header.merkle_root {
            faults.push(Fault {
                index,
                kind: FaultKind::MerkleMismatch,
            });
        }
        if block.header.hash() != block.hash {
            faults.push(Fault {
                index,
                kind: FaultKind::HashMismatch,
            });
        }
        if block.header.previous_hash != prev.hash {
            faults.push(Fault {
                index,
                kind: FaultKind::BrokenLink,
            });
        }
    }
    faults
}
