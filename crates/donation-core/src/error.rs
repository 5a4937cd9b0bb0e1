use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    /// Donations must move a positive amount.
    #[error("donation amount must be positive")]
    InvalidAmount,

    /// The durable store refused a write; in-memory state was not touched.
    #[error("persistence failed: {0}")]
    Persistence(anyhow::Error),

    /// A stored record could not be decoded or replayed during recovery.
    #[error("corrupt ledger record: {0}")]
    Corruption(String),
}

impl From<anyhow::Error> for LedgerError {
    fn from(err: anyhow::Error) -> Self {
        Self::Persistence(err)
    }
}
