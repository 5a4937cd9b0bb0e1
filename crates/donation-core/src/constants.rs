pub const HASH_SIZE: usize = 32;
pub const HASH_HEX_SIZE: usize = HASH_SIZE * 2;

/// Previous-hash sentinel of the genesis block.
pub const ZERO_HASH: crate::Hash = [0u8; HASH_SIZE];
