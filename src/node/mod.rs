//! Node module - the ledger node RPC boundary
//!
//! This module provides:
//! - The `LedgerNode` trait consumed by the sequence resolver and submission loop
//! - A JSON-RPC over HTTP implementation with endpoint failover
//! - Response shapes and engine result classification

pub mod client;
pub mod types;

pub use client::NodeClient;
pub use types::{
    EngineVerdict, SubmitResponse, SubmittedTxJson, TransactionRecord, TEF_PAST_SEQ, TER_PRE_SEQ,
    TES_SUCCESS,
};

use crate::error::RelayerResult;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

/// Requests the relayer makes against a ledger node.
///
/// Only ledger-semantic results are interpreted by callers; transport failures
/// come back as `RelayerError::Rpc` and are propagated unchanged.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait LedgerNode: Send + Sync {
    /// Current next-sequence for an account.
    async fn fetch_sequence(&self, address: &str) -> RelayerResult<u32>;

    /// Look up a transaction by hash; `None` when the node does not know it.
    async fn fetch_transaction(&self, hash: &str) -> RelayerResult<Option<TransactionRecord>>;

    /// Submit a signed, hex-encoded transaction blob.
    async fn submit_transaction(&self, blob: &str) -> RelayerResult<SubmitResponse>;

    async fn health_check(&self) -> bool;
}
