pub mod constants;
pub mod error;
pub mod ledger;
pub mod store;

pub use constants::{HASH_SIZE, ZERO_HASH};
pub use error::LedgerError;
pub use ledger::{Fault, FaultKind, Ledger, Receipt};
pub use store::{LedgerStore, NullStore};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::{SystemTime, UNIX_EPOCH};

pub type Hash = [u8; constants::HASH_SIZE];

/// Milliseconds since the unix epoch.
pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time went backwards")
        .as_millis() as u64
}

pub(crate) fn sha256(bytes: impl AsRef<[u8]>) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest = hasher.finalize();
    let mut out = ZERO_HASH;
    out.copy_from_slice(&digest[..]);
    out
}

/// A single value transfer between two opaque identities. Immutable once
/// created; `id` is derived from the remaining fields.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Transaction {
    #[serde(with = "hex")]
    pub id: Hash,
    pub from: String,
    pub to: String,
    pub amount: u64,
    pub message: String,
    pub timestamp: u64,
    pub seq: u64,
}

impl Transaction {
    pub fn new(
        from: String,
        to: String,
        amount: u64,
        message: String,
        timestamp: u64,
        seq: u64,
    ) -> Self {
        let id = Self::derive_id(&from, &to, amount, &message, timestamp, seq);
        Self {
            id,
            from,
            to,
            amount,
            message,
            timestamp,
            seq,
        }
    }

    /// Deterministic id over the canonical field bytes. Strings are
    /// length-prefixed so adjacent fields cannot run together; `seq` breaks
    /// ties between identical donations recorded in the same millisecond.
    pub fn derive_id(
        from: &str,
        to: &str,
        amount: u64,
        message: &str,
        timestamp: u64,
        seq: u64,
    ) -> Hash {
        let mut bytes = Vec::with_capacity(from.len() + to.len() + message.len() + 48);
        for field in [from, to, message] {
            bytes.extend_from_slice(&(field.len() as u64).to_le_bytes());
            bytes.extend_from_slice(field.as_bytes());
        }
        bytes.extend_from_slice(&amount.to_le_bytes());
        bytes.extend_from_slice(&timestamp.to_le_bytes());
        bytes.extend_from_slice(&seq.to_le_bytes());
        sha256(bytes)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct BlockHeader {
    pub index: u64,
    #[serde(with = "hex")]
    pub previous_hash: Hash,
    #[serde(with = "hex")]
    pub merkle_root: Hash,
    pub timestamp: u64,
    pub nonce: u64,
}

impl BlockHeader {
    pub fn new(
        index: u64,
        previous_hash: Hash,
        merkle_root: Hash,
        timestamp: u64,
        nonce: u64,
    ) -> Self {
        Self {
            index,
            previous_hash,
            merkle_root,
            timestamp,
            nonce,
        }
    }

    /// Canonical little-endian byte serialization of the header fields.
    pub fn hash_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(8 + 32 + 32 + 8 + 8);
        bytes.extend_from_slice(&self.index.to_le_bytes());
        bytes.extend_from_slice(&self.previous_hash);
        bytes.extend_from_slice(&self.merkle_root);
        bytes.extend_from_slice(&self.timestamp.to_le_bytes());
        bytes.extend_from_slice(&self.nonce.to_le_bytes());
        bytes
    }

    pub fn hash(&self) -> Hash {
        sha256(self.hash_bytes())
    }
}

/// An immutable, hash-linked batch of transactions. `hash` is fixed at seal
/// time; `verify` recomputes it from the header and compares.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Block {
    pub header: BlockHeader,
    #[serde(with = "hex")]
    pub hash: Hash,
    pub txs: Vec<Transaction>,
}

impl Block {
    /// Seal `txs` into a block at `index` on top of `previous_hash`. The
    /// Merkle root binds the transaction list into the hashed header.
    pub fn seal(index: u64, previous_hash: Hash, txs: Vec<Transaction>, timestamp: u64) -> Self {
        let header = BlockHeader::new(index, previous_hash, merkle_root(&txs), timestamp, 0);
        let hash = header.hash();
        Self { header, hash, txs }
    }

    /// The fixed first block: zeroed previous hash, no transactions,
    /// timestamp 0 so every ledger starts from the same genesis hash.
    pub fn genesis() -> Self {
        Self::seal(0, ZERO_HASH, Vec::new(), 0)
    }
}

/// SHA-256 Merkle root over the serialized transactions. Leaves hash the
/// full transaction record, so any field edit moves the root. Zero hash for
/// an empty list; an odd leaf is paired with itself.
pub fn merkle_root(txs: &[Transaction]) -> Hash {
    if txs.is_empty() {
        return ZERO_HASH;
    }
    let mut level: Vec<Hash> = txs
        .iter()
        .map(|tx| sha256(serde_json::to_vec(tx).expect("transaction serializes")))
        .collect();

    while level.len() > 1 {
        let mut next = Vec::with_capacity(level.len().div_ceil(2));
        for pair in level.chunks(2) {
            let (a, b) = if pair.len() == 2 {
                (pair[0], pair[1])
            } else {
                (pair[0], pair[0])
            };
            let mut bytes = Vec::with_capacity(64);
            bytes.extend_from_slice(&a);
            bytes.extend_from_slice(&b);
            next.push(sha256(bytes));
        }
        level = next;
    }
    level[0]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::HASH_HEX_SIZE;

    fn tx(from: &str, to: &str, amount: u64, seq: u64) -> Transaction {
        Transaction::new(
            from.to_string(),
            to.to_string(),
            amount,
            String::new(),
            1_700_000_000_000 + seq,
            seq,
        )
    }

    #[test]
    fn derive_id_is_deterministic() {
        let a = tx("alice", "shelter", 50, 0);
        let b = Transaction::new(
            "alice".to_string(),
            "shelter".to_string(),
            50,
            String::new(),
            a.timestamp,
            0,
        );
        assert_eq!(a.id, b.id);
    }

    #[test]
    fn derive_id_distinguishes_identical_donations() {
        // Same donor, recipient, amount and millisecond; only seq differs.
        let id0 = Transaction::derive_id("alice", "shelter", 50, "", 1_700_000_000_000, 0);
        let id1 = Transaction::derive_id("alice", "shelter", 50, "", 1_700_000_000_000, 1);
        assert_ne!(id0, id1);
    }

    #[test]
    fn derive_id_length_prefix_keeps_fields_apart() {
        // "ab" + "c" must not collide with "a" + "bc".
        let left = Transaction::derive_id("ab", "c", 1, "", 0, 0);
        let right = Transaction::derive_id("a", "bc", 1, "", 0, 0);
        assert_ne!(left, right);
    }

    #[test]
    fn header_hash_bytes_layout() {
        let header = BlockHeader::new(1, [0u8; 32], [1u8; 32], 1_700_000_000_000, 42);
        let bytes = header.hash_bytes();
        assert_eq!(bytes.len(), 88);
        assert_eq!(&bytes[0..8], &1u64.to_le_bytes());
        assert_eq!(&bytes[8..40], &[0u8; 32]);
        assert_eq!(&bytes[40..72], &[1u8; 32]);
        assert_eq!(&bytes[72..80], &1_700_000_000_000u64.to_le_bytes());
        assert_eq!(&bytes[80..88], &42u64.to_le_bytes());
    }

    #[test]
    fn seal_stores_header_hash() {
        let block = Block::seal(1, [7u8; 32], vec![tx("a", "b", 10, 0)], 1_700_000_000_000);
        assert_eq!(block.hash, block.header.hash());
        assert_eq!(block.header.index, 1);
        assert_eq!(block.header.previous_hash, [7u8; 32]);
        assert_eq!(block.header.merkle_root, merkle_root(&block.txs));
        assert_eq!(block.header.nonce, 0);
    }

    #[test]
    fn genesis_is_deterministic() {
        let a = Block::genesis();
        let b = Block::genesis();
        assert_eq!(a, b);
        assert_eq!(a.header.index, 0);
        assert_eq!(a.header.previous_hash, ZERO_HASH);
        assert_eq!(a.header.merkle_root, ZERO_HASH);
        assert_eq!(a.header.timestamp, 0);
        assert!(a.txs.is_empty());
    }

    #[test]
    fn hash_changes_with_any_header_field() {
        let base = BlockHeader::new(1, [0u8; 32], [1u8; 32], 1_700_000_000_000, 0);
        let hash = base.hash();

        let mut h = base.clone();
        h.index = 2;
        assert_ne!(h.hash(), hash);

        let mut h = base.clone();
        h.previous_hash = [9u8; 32];
        assert_ne!(h.hash(), hash);

        let mut h = base.clone();
        h.merkle_root = [9u8; 32];
        assert_ne!(h.hash(), hash);

        let mut h = base.clone();
        h.timestamp += 1;
        assert_ne!(h.hash(), hash);

        let mut h = base;
        h.nonce = 1;
        assert_ne!(h.hash(), hash);
    }

    #[test]
    fn merkle_root_empty_is_zero() {
        assert_eq!(merkle_root(&[]), ZERO_HASH);
    }

    #[test]
    fn merkle_root_single_leaf() {
        let txs = vec![tx("alice", "shelter", 10, 0)];
        let expected = sha256(serde_json::to_vec(&txs[0]).unwrap());
        assert_eq!(merkle_root(&txs), expected);
    }

    #[test]
    fn merkle_root_pairs_leaves() {
        let txs = vec![tx("alice", "shelter", 10, 0), tx("bob", "shelter", 5, 1)];
        let h1 = sha256(serde_json::to_vec(&txs[0]).unwrap());
        let h2 = sha256(serde_json::to_vec(&txs[1]).unwrap());
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&h1);
        bytes.extend_from_slice(&h2);
        assert_eq!(merkle_root(&txs), sha256(bytes));
    }

    #[test]
    fn merkle_root_odd_leaf_pairs_with_itself() {
        let txs = vec![
            tx("alice", "shelter", 10, 0),
            tx("bob", "shelter", 5, 1),
            tx("carol", "shelter", 2, 2),
        ];
        let leaves: Vec<Hash> = txs
            .iter()
            .map(|t| sha256(serde_json::to_vec(t).unwrap()))
            .collect();
        let pair = |a: Hash, b: Hash| {
            let mut bytes = Vec::new();
            bytes.extend_from_slice(&a);
            bytes.extend_from_slice(&b);
            sha256(bytes)
        };
        let expected = pair(pair(leaves[0], leaves[1]), pair(leaves[2], leaves[2]));
        assert_eq!(merkle_root(&txs), expected);
    }

    #[test]
    fn merkle_root_moves_when_a_transaction_changes() {
        let mut txs = vec![tx("alice", "shelter", 10, 0), tx("bob", "shelter", 5, 1)];
        let before = merkle_root(&txs);
        txs[1].amount = 500;
        assert_ne!(merkle_root(&txs), before);
    }

    #[test]
    fn transaction_json_renders_hex_id() {
        let t = tx("alice", "shelter", 10, 0);
        let json = serde_json::to_string(&t).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let id = value["id"].as_str().unwrap();
        assert_eq!(id.len(), HASH_HEX_SIZE);
        assert_eq!(id, hex::encode(t.id));
        let back: Transaction = serde_json::from_str(&json).unwrap();
        assert_eq!(back, t);
    }

    #[test]
    fn block_json_round_trips() {
        let block = Block::seal(
            1,
            Block::genesis().hash,
            vec![tx("alice", "shelter", 10, 0)],
            1_700_000_000_000,
        );
        let json = serde_json::to_string(&block).unwrap();
        let back: Block = serde_json::from_str(&json).unwrap();
        assert_eq!(back, block);
    }
}
