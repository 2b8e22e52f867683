//! Transaction facade - per-operation entry points
//!
//! Every operation builds its transaction, runs it through the submission loop,
//! and keeps the sequence cache honest afterwards:
//! 1. Success advances the acting account's sequence past the one consumed
//! 2. Any failure clears it so the next call re-reads the node
//! 3. Optionally, calls for the same account are queued instead of raced

mod operations;

pub use operations::OperationRequest;

use crate::error::RelayerResult;
use crate::node::{LedgerNode, TransactionRecord};
use crate::tx::builder::{
    BlacklistUpdate, CancelOrder, CreateOrder, DeleteNft, IssueSet, PublishNft, SetAccount,
    SetBrokerage, SetManageIssuer, SetSignerList, SetTokenIssue, Transfer, TransferNft,
};
use crate::tx::{
    AcceptedTransaction, SequenceResolver, Transaction, TransactionBuilder, TransactionSubmitter,
};

use dashmap::DashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Entry points for every supported ledger operation
pub struct TransactionFacade {
    node: Arc<dyn LedgerNode>,
    resolver: Arc<SequenceResolver>,
    submitter: TransactionSubmitter,
    builder: TransactionBuilder,
    /// Per-account queues, present when same-account calls are serialized
    account_locks: Option<DashMap<String, Arc<Mutex<()>>>>,
}

impl TransactionFacade {
    /// Create a new facade over `submitter`, sharing its node and sequence resolver
    pub fn new(submitter: TransactionSubmitter, builder: TransactionBuilder) -> Self {
        Self {
            node: submitter.node().clone(),
            resolver: submitter.resolver().clone(),
            submitter,
            builder,
            account_locks: None,
        }
    }

    /// Queue same-account calls behind a per-account lock spanning
    /// resolve through bookkeeping
    pub fn with_account_serialization(mut self, enabled: bool) -> Self {
        self.account_locks = enabled.then(DashMap::new);
        self
    }

    /// Run `operation` for `account`, then advance or clear its cached sequence.
    ///
    /// The error of a failed operation is returned unchanged.
    pub async fn with_sequence_bookkeeping<F>(&self, account: &str, operation: F) -> RelayerResult<String>
    where
        F: Future<Output = RelayerResult<AcceptedTransaction>>,
    {
        let lock = self.account_lock(account);
        let guard = match lock.as_ref() {
            Some(lock) => Some(lock.lock().await),
            None => None,
        };

        let outcome = match operation.await {
            Ok(accepted) => {
                self.resolver.advance(account, accepted.sequence);
                Ok(accepted.hash)
            }
            Err(e) => {
                self.resolver.invalidate(account);
                Err(e)
            }
        };

        drop(guard);
        if let Some(lock) = lock {
            self.release_account_lock(account, lock);
        }
        outcome
    }

    fn account_lock(&self, account: &str) -> Option<Arc<Mutex<()>>> {
        self.account_locks
            .as_ref()
            .map(|locks| locks.entry(account.to_string()).or_default().clone())
    }

    /// Drop the account's lock entry once no other caller holds or awaits it
    fn release_account_lock(&self, account: &str, lock: Arc<Mutex<()>>) {
        if let Some(locks) = &self.account_locks {
            // The map and `lock` are the only two owners when nobody is queued.
            locks.remove_if(account, |_, held| {
                Arc::ptr_eq(held, &lock) && Arc::strong_count(held) == 2
            });
        }
    }

    #[cfg(test)]
    fn tracked_account_locks(&self) -> usize {
        self.account_locks.as_ref().map_or(0, DashMap::len)
    }

    async fn submit_built(&self, secret: &str, tx: Transaction) -> RelayerResult<String> {
        debug!("Submitting {} for {}", tx.transaction_type(), tx.account);
        self.with_sequence_bookkeeping(&tx.account, self.submitter.submit(secret, &tx))
            .await
    }

    /// Dispatch a tagged request to its operation
    pub async fn submit_operation(
        &self,
        secret: &str,
        request: &OperationRequest,
    ) -> RelayerResult<String> {
        info!(
            "Operation {} requested by {}",
            request.name(),
            request.acting_account()
        );

        match request {
            OperationRequest::CreateOrder(r) => self.create_order(secret, r).await,
            OperationRequest::CancelOrder(r) => self.cancel_order(secret, r).await,
            OperationRequest::Transfer(r) => self.transfer(secret, r).await,
            OperationRequest::SetBrokerage(r) => self.set_brokerage(secret, r).await,
            OperationRequest::AddBlacklist(r) => self.add_blacklist(secret, r).await,
            OperationRequest::RemoveBlacklist(r) => self.remove_blacklist(secret, r).await,
            OperationRequest::SetManageIssuer(r) => self.set_manage_issuer(secret, r).await,
            OperationRequest::IssueSet(r) => self.issue_set(secret, r).await,
            OperationRequest::SetSignerList(r) => self.set_signer_list(secret, r).await,
            OperationRequest::SetAccount(r) => self.set_account(secret, r).await,
            OperationRequest::TransferNft(r) => self.transfer_nft(secret, r).await,
            OperationRequest::DeleteNft(r) => self.delete_nft(secret, r).await,
            OperationRequest::PublishNft(r) => self.publish_nft(secret, r).await,
            OperationRequest::SetTokenIssue(r) => self.set_token_issue(secret, r).await,
        }
    }

    pub async fn create_order(&self, secret: &str, request: &CreateOrder) -> RelayerResult<String> {
        let tx = self.builder.create_order(request)?;
        self.submit_built(secret, tx).await
    }

    pub async fn cancel_order(&self, secret: &str, request: &CancelOrder) -> RelayerResult<String> {
        let tx = self.builder.cancel_order(request)?;
        self.submit_built(secret, tx).await
    }

    pub async fn transfer(&self, secret: &str, request: &Transfer) -> RelayerResult<String> {
        let tx = self.builder.transfer(request)?;
        self.submit_built(secret, tx).await
    }

    /// Signed by, and sequenced on, the platform account
    pub async fn set_brokerage(&self, secret: &str, request: &SetBrokerage) -> RelayerResult<String> {
        let tx = self.builder.set_brokerage(request)?;
        self.submit_built(secret, tx).await
    }

    pub async fn add_blacklist(&self, secret: &str, request: &BlacklistUpdate) -> RelayerResult<String> {
        let tx = self.builder.add_blacklist(request)?;
        self.submit_built(secret, tx).await
    }

    pub async fn remove_blacklist(
        &self,
        secret: &str,
        request: &BlacklistUpdate,
    ) -> RelayerResult<String> {
        let tx = self.builder.remove_blacklist(request)?;
        self.submit_built(secret, tx).await
    }

    pub async fn set_manage_issuer(
        &self,
        secret: &str,
        request: &SetManageIssuer,
    ) -> RelayerResult<String> {
        let tx = self.builder.set_manage_issuer(request)?;
        self.submit_built(secret, tx).await
    }

    pub async fn issue_set(&self, secret: &str, request: &IssueSet) -> RelayerResult<String> {
        let tx = self.builder.issue_set(request)?;
        self.submit_built(secret, tx).await
    }

    pub async fn set_signer_list(&self, secret: &str, request: &SetSignerList) -> RelayerResult<String> {
        let tx = self.builder.set_signer_list(request)?;
        self.submit_built(secret, tx).await
    }

    pub async fn set_account(&self, secret: &str, request: &SetAccount) -> RelayerResult<String> {
        let tx = self.builder.set_account(request)?;
        self.submit_built(secret, tx).await
    }

    pub async fn transfer_nft(&self, secret: &str, request: &TransferNft) -> RelayerResult<String> {
        let tx = self.builder.transfer_nft(request)?;
        self.submit_built(secret, tx).await
    }

    pub async fn delete_nft(&self, secret: &str, request: &DeleteNft) -> RelayerResult<String> {
        let tx = self.builder.delete_nft(request)?;
        self.submit_built(secret, tx).await
    }

    pub async fn publish_nft(&self, secret: &str, request: &PublishNft) -> RelayerResult<String> {
        let tx = self.builder.publish_nft(request)?;
        self.submit_built(secret, tx).await
    }

    pub async fn set_token_issue(&self, secret: &str, request: &SetTokenIssue) -> RelayerResult<String> {
        let tx = self.builder.set_token_issue(request)?;
        self.submit_built(secret, tx).await
    }

    /// Sequence the next transaction from `address` would use
    pub async fn sequence(&self, address: &str) -> RelayerResult<u32> {
        self.resolver.resolve(address, self.node.as_ref()).await
    }

    /// Look up a submitted transaction
    pub async fn transaction(&self, hash: &str) -> RelayerResult<Option<TransactionRecord>> {
        self.node.fetch_transaction(hash).await
    }

    pub async fn node_healthy(&self) -> bool {
        self.node.health_check().await
    }

    pub fn retry_budget(&self) -> u32 {
        self.submitter.retry_budget()
    }
}
