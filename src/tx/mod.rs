//! Transaction submission module with sequence coordination and conflict retry

pub mod builder;
mod sequence;
mod signer;
mod submitter;
pub mod types;

#[cfg(test)]
pub(crate) mod test_support;

pub use builder::TransactionBuilder;
pub use sequence::{InMemorySequenceCache, SequenceCache, SequenceResolver};
pub use signer::{NodeSigner, SignedTransaction, TransactionSigner};
pub use submitter::{AcceptedTransaction, TransactionSubmitter};
pub use types::{Amount, Memo, Transaction, TransactionPayload};
