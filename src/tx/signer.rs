//! Transaction signing boundary

use super::types::Transaction;
use crate::error::{RelayerError, RelayerResult};
use crate::node::types::SignResult;
use crate::node::NodeClient;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use serde_json::json;
use std::sync::Arc;

/// Signed wire form of a transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    /// Canonical transaction hash
    pub hash: String,
    /// Hex-encoded serialized transaction, ready for `submit`
    pub blob: String,
}

/// Produces a signature and wire blob for a fully stamped transaction
#[cfg_attr(test, automock)]
#[async_trait]
pub trait TransactionSigner: Send + Sync {
    async fn sign(&self, tx: &Transaction, secret: &str) -> RelayerResult<SignedTransaction>;
}

/// Signs through the node's offline `sign` method.
///
/// Offline mode stops the node from filling in `Sequence` or `Fee`, so the blob
/// carries exactly the fields stamped by the submission loop.
pub struct NodeSigner {
    client: Arc<NodeClient>,
}

impl NodeSigner {
    pub fn new(client: Arc<NodeClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl TransactionSigner for NodeSigner {
    async fn sign(&self, tx: &Transaction, secret: &str) -> RelayerResult<SignedTransaction> {
        if tx.sequence.is_none() {
            return Err(RelayerError::Signing(
                "Refusing to sign a transaction without a sequence".to_string(),
            ));
        }

        let tx_json = serde_json::to_value(tx)
            .map_err(|e| RelayerError::Signing(format!("Failed to encode transaction: {}", e)))?;

        let result: SignResult = self
            .client
            .call(
                "sign",
                json!({ "tx_json": tx_json, "secret": secret, "offline": true }),
            )
            .await?;

        Ok(SignedTransaction {
            hash: result.tx_json.hash,
            blob: result.tx_blob,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NodeConfig;
    use crate::tx::types::{Amount, TransactionPayload};
    use wiremock::matchers::{body_partial_json, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn transfer() -> Transaction {
        Transaction {
            account: "jAlice".to_string(),
            fee: 10,
            flags: 0,
            sequence: None,
            memos: Vec::new(),
            signing_pub_key: None,
            txn_signature: None,
            payload: TransactionPayload::Payment {
                amount: Amount::Native("1".to_string()),
                destination: "jBob".to_string(),
            },
        }
    }

    async fn signer_for(server: &MockServer) -> NodeSigner {
        let client = NodeClient::new(NodeConfig {
            name: "test".to_string(),
            rpc_urls: vec![server.uri()],
            request_timeout_secs: 5,
            native_currency: "SWT".to_string(),
            default_fee: 10,
        })
        .unwrap();
        NodeSigner::new(Arc::new(client))
    }

    #[tokio::test]
    async fn test_sign_sends_stamped_tx_offline() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({
                "method": "sign",
                "params": [{
                    "offline": true,
                    "secret": "snoPBjXtMeMyMHUVTgbuqAfg1SUTb",
                    "tx_json": { "Account": "jAlice", "Sequence": 12, "Fee": "10" }
                }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "result": {
                    "status": "success",
                    "tx_blob": "12000022",
                    "tx_json": { "hash": "C0FFEE", "Sequence": 12 }
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let signer = signer_for(&server).await;
        let signed = signer
            .sign(&transfer().stamped(12), "snoPBjXtMeMyMHUVTgbuqAfg1SUTb")
            .await
            .unwrap();

        assert_eq!(
            signed,
            SignedTransaction {
                hash: "C0FFEE".to_string(),
                blob: "12000022".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_sign_requires_sequence() {
        let server = MockServer::start().await;
        let signer = signer_for(&server).await;

        let err = signer.sign(&transfer(), "secret").await.unwrap_err();
        assert!(matches!(err, RelayerError::Signing(_)));
    }
}
