//! Scripted node and signer fakes for multi-step submission scenarios

use super::signer::{SignedTransaction, TransactionSigner};
use super::types::Transaction;
use crate::error::{RelayerError, RelayerResult};
use crate::node::{LedgerNode, SubmitResponse, TransactionRecord};

use async_trait::async_trait;
use serde_json::json;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

/// Node that answers from fixed scripts.
///
/// `fetch_sequence` pops the next scripted sequence and keeps repeating the last
/// one; `submit_transaction` pops the next engine result and fails once the
/// script runs out.
pub(crate) struct ScriptedNode {
    sequences: Mutex<VecDeque<u32>>,
    results: Mutex<VecDeque<String>>,
    hash: String,
    fetches: AtomicU32,
    submitted: Mutex<Vec<String>>,
}

impl ScriptedNode {
    pub fn new(sequences: &[u32], results: &[&str]) -> Self {
        Self {
            sequences: Mutex::new(sequences.iter().copied().collect()),
            results: Mutex::new(results.iter().map(|r| r.to_string()).collect()),
            hash: "HASH".to_string(),
            fetches: AtomicU32::new(0),
            submitted: Mutex::new(Vec::new()),
        }
    }

    pub fn with_hash(mut self, hash: &str) -> Self {
        self.hash = hash.to_string();
        self
    }

    pub fn fetch_count(&self) -> u32 {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn submitted_blobs(&self) -> Vec<String> {
        self.submitted.lock().unwrap().clone()
    }
}

#[async_trait]
impl LedgerNode for ScriptedNode {
    async fn fetch_sequence(&self, _address: &str) -> RelayerResult<u32> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let mut sequences = self.sequences.lock().unwrap();
        let sequence = if sequences.len() > 1 {
            sequences.pop_front()
        } else {
            sequences.front().copied()
        };
        sequence.ok_or_else(|| RelayerError::Internal("no scripted sequence".to_string()))
    }

    async fn fetch_transaction(&self, _hash: &str) -> RelayerResult<Option<TransactionRecord>> {
        Ok(None)
    }

    async fn submit_transaction(&self, blob: &str) -> RelayerResult<SubmitResponse> {
        self.submitted.lock().unwrap().push(blob.to_string());
        let engine_result = self
            .results
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| RelayerError::Internal("submit script exhausted".to_string()))?;

        Ok(submit_response(&engine_result, &self.hash))
    }

    async fn health_check(&self) -> bool {
        true
    }
}

/// Node that enforces per-account sequence ordering on `EchoSigner` blobs.
///
/// A blob carrying the expected sequence is accepted and bumps it; an older one
/// gets `tefPAST_SEQ` and a newer one `terPRE_SEQ`. Every call yields once so
/// concurrent callers interleave.
pub(crate) struct LedgerSimulator {
    next: Mutex<HashMap<String, u32>>,
    fetches: AtomicU32,
    submissions: AtomicU32,
}

impl LedgerSimulator {
    pub fn new(account: &str, sequence: u32) -> Self {
        let mut next = HashMap::new();
        next.insert(account.to_string(), sequence);
        Self {
            next: Mutex::new(next),
            fetches: AtomicU32::new(0),
            submissions: AtomicU32::new(0),
        }
    }

    pub fn next_sequence(&self, account: &str) -> u32 {
        self.next.lock().unwrap().get(account).copied().unwrap_or(1)
    }

    pub fn fetch_count(&self) -> u32 {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn submission_count(&self) -> u32 {
        self.submissions.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LedgerNode for LedgerSimulator {
    async fn fetch_sequence(&self, address: &str) -> RelayerResult<u32> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        Ok(self.next_sequence(address))
    }

    async fn fetch_transaction(&self, _hash: &str) -> RelayerResult<Option<TransactionRecord>> {
        Ok(None)
    }

    async fn submit_transaction(&self, blob: &str) -> RelayerResult<SubmitResponse> {
        self.submissions.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;

        let mut parts = blob.split(':');
        let account = parts.next().unwrap_or_default().to_string();
        let sequence: u32 = parts
            .nth(1)
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| RelayerError::Internal(format!("unreadable blob {}", blob)))?;

        let mut next = self.next.lock().unwrap();
        let expected = next.entry(account.clone()).or_insert(1);
        let engine_result = if sequence == *expected {
            *expected += 1;
            "tesSUCCESS"
        } else if sequence < *expected {
            "tefPAST_SEQ"
        } else {
            "terPRE_SEQ"
        };

        Ok(submit_response(
            engine_result,
            &format!("TX-{}-{}", account, sequence),
        ))
    }

    async fn health_check(&self) -> bool {
        true
    }
}

/// Signer whose blob encodes account, type and sequence
#[derive(Default)]
pub(crate) struct EchoSigner {
    signed: AtomicU32,
}

impl EchoSigner {
    pub fn sign_count(&self) -> u32 {
        self.signed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TransactionSigner for EchoSigner {
    async fn sign(&self, tx: &Transaction, _secret: &str) -> RelayerResult<SignedTransaction> {
        self.signed.fetch_add(1, Ordering::SeqCst);
        let sequence = tx
            .sequence
            .ok_or_else(|| RelayerError::Signing("missing sequence".to_string()))?;
        Ok(SignedTransaction {
            hash: format!("SIG-{}", sequence),
            blob: format!("{}:{}:{}", tx.account, tx.transaction_type(), sequence),
        })
    }
}

pub(crate) fn submit_response(engine_result: &str, hash: &str) -> SubmitResponse {
    serde_json::from_value(json!({
        "engine_result": engine_result,
        "engine_result_message": format!("scripted {}", engine_result),
        "tx_json": { "hash": hash }
    }))
    .unwrap()
}
