//! Submission loop with sequence-conflict retry
//!
//! One call drives one logical transaction through
//! resolve -> stamp -> sign -> submit, and classifies the engine result:
//! accepted, sequence conflict (invalidate and retry), or fatal.

use super::sequence::SequenceResolver;
use super::signer::TransactionSigner;
use super::types::Transaction;
use crate::error::{RelayerError, RelayerResult};
use crate::node::{EngineVerdict, LedgerNode, SubmitResponse};

use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Outcome of an accepted submission
#[derive(Debug, Clone)]
pub struct AcceptedTransaction {
    /// Transaction hash reported by the node
    pub hash: String,
    /// Sequence the accepted transaction consumed
    pub sequence: u32,
    /// Submission attempts used, including the accepted one
    pub attempts: u32,
    /// Node response for the accepted attempt
    pub response: SubmitResponse,
}

/// Submits transactions, retrying only on sequence conflicts
pub struct TransactionSubmitter {
    node: Arc<dyn LedgerNode>,
    signer: Arc<dyn TransactionSigner>,
    resolver: Arc<SequenceResolver>,
    /// Extra attempts allowed after the first one
    retry_budget: u32,
    /// Pause before re-resolving after a conflict
    retry_delay: Duration,
}

impl TransactionSubmitter {
    /// Create a new submitter
    pub fn new(
        node: Arc<dyn LedgerNode>,
        signer: Arc<dyn TransactionSigner>,
        resolver: Arc<SequenceResolver>,
        retry_budget: u32,
    ) -> Self {
        Self {
            node,
            signer,
            resolver,
            retry_budget,
            retry_delay: Duration::ZERO,
        }
    }

    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    pub fn retry_budget(&self) -> u32 {
        self.retry_budget
    }

    /// Node the loop submits to
    pub fn node(&self) -> &Arc<dyn LedgerNode> {
        &self.node
    }

    /// Resolver the loop reads and invalidates
    pub fn resolver(&self) -> &Arc<SequenceResolver> {
        &self.resolver
    }

    /// Drive `tx` to acceptance or a definitive failure.
    ///
    /// `tx` is never modified; each attempt works on a fresh stamped copy, so a
    /// signature is never reused across sequences. At most `retry_budget + 1`
    /// submissions are made. Resolver, signer and transport errors are returned
    /// unchanged.
    pub async fn submit(&self, secret: &str, tx: &Transaction) -> RelayerResult<AcceptedTransaction> {
        let account = tx.account.as_str();
        let tx_type = tx.transaction_type();
        let submission_id = Uuid::new_v4();
        let started = Instant::now();

        let max_attempts = self.retry_budget.saturating_add(1);
        let mut remaining = i64::from(self.retry_budget);

        for attempt in 1..=max_attempts {
            // Resolving
            let sequence = self.resolver.resolve(account, self.node.as_ref()).await?;
            let pending = tx.stamped(sequence);

            // Signing
            let signed = self.signer.sign(&pending, secret).await?;
            debug!(
                "[{}] {} from {} signed at sequence {} (attempt {}/{})",
                submission_id, tx_type, account, sequence, attempt, max_attempts
            );

            // Submitting
            let response = self.node.submit_transaction(&signed.blob).await?;
            crate::metrics::record_tx_submitted(tx_type);

            match response.verdict() {
                EngineVerdict::Accepted => {
                    let hash = if response.tx_json.hash.is_empty() {
                        signed.hash
                    } else {
                        response.tx_json.hash.clone()
                    };

                    info!(
                        "[{}] {} from {} accepted: {} (sequence {}, attempt {}/{})",
                        submission_id, tx_type, account, hash, sequence, attempt, max_attempts
                    );
                    crate::metrics::record_tx_accepted(tx_type);
                    crate::metrics::record_tx_latency(tx_type, started.elapsed().as_secs_f64());

                    return Ok(AcceptedTransaction {
                        hash,
                        sequence,
                        attempts: attempt,
                        response,
                    });
                }
                EngineVerdict::SequenceConflict => {
                    // The local belief is known wrong: force a fetch on the next pass.
                    self.resolver.invalidate(account);
                    remaining -= 1;
                    crate::metrics::record_tx_retry(tx_type, &response.engine_result);

                    if remaining < 0 {
                        warn!(
                            "[{}] {} from {} gave up after {} attempts, last result {}",
                            submission_id, tx_type, account, attempt, response.engine_result
                        );
                        crate::metrics::record_tx_failed(tx_type, &response.engine_result);
                        return Err(RelayerError::RetriesExhausted {
                            attempts: attempt,
                            engine_result: response.engine_result.clone(),
                            response: Box::new(response),
                        });
                    }

                    warn!(
                        "[{}] {} from {} hit {} at sequence {}, retrying ({} retries left)",
                        submission_id, tx_type, account, response.engine_result, sequence, remaining
                    );

                    if !self.retry_delay.is_zero() {
                        tokio::time::sleep(self.retry_delay).await;
                    }
                }
                EngineVerdict::Fatal => {
                    warn!(
                        "[{}] {} from {} rejected with {}: {}",
                        submission_id,
                        tx_type,
                        account,
                        response.engine_result,
                        response.engine_result_message.as_deref().unwrap_or("")
                    );
                    crate::metrics::record_tx_failed(tx_type, &response.engine_result);
                    return Err(RelayerError::Rejected {
                        engine_result: response.engine_result.clone(),
                        response: Box::new(response),
                    });
                }
            }
        }

        Err(RelayerError::AttemptLimitExceeded(max_attempts))
    }
}
