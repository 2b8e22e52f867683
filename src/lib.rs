//! Ledger transaction relayer
//!
//! Builds, signs and submits transactions against a rippled-family ledger node,
//! coordinating per-account sequence numbers and retrying sequence conflicts.

pub mod api;
pub mod config;
pub mod error;
pub mod facade;
pub mod metrics;
pub mod node;
pub mod tx;

pub use error::{RelayerError, RelayerResult};
pub use facade::{OperationRequest, TransactionFacade};
