//! Error types for the ledger transaction relayer

use crate::node::SubmitResponse;
use thiserror::Error;

/// Main error type for the relayer
#[derive(Error, Debug)]
pub enum RelayerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("RPC call {method} failed: {message}")]
    Rpc { method: String, message: String },

    #[error("Node returned {error} for {method}{}", detail(.message))]
    Node {
        method: String,
        error: String,
        message: Option<String>,
    },

    #[error("Malformed {method} response: {message}")]
    MalformedResponse { method: String, message: String },

    #[error("Signing error: {0}")]
    Signing(String),

    #[error("Invalid transaction: {0}")]
    InvalidTransaction(String),

    #[error("Transaction rejected by node: {engine_result}")]
    Rejected {
        engine_result: String,
        response: Box<SubmitResponse>,
    },

    #[error("Sequence retries exhausted after {attempts} attempts, last result {engine_result}")]
    RetriesExhausted {
        attempts: u32,
        engine_result: String,
        response: Box<SubmitResponse>,
    },

    #[error("Submission loop exceeded {0} attempts")]
    AttemptLimitExceeded(u32),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl RelayerError {
    /// Check if the error comes from the transport and might succeed on a fresh call.
    ///
    /// Ledger-level rejections are never retryable from the caller's side: sequence
    /// conflicts are already retried inside the submission loop.
    pub fn is_retryable(&self) -> bool {
        matches!(self, RelayerError::Rpc { .. })
    }

    /// Last node response attached to a ledger-level failure
    pub fn last_response(&self) -> Option<&SubmitResponse> {
        match self {
            RelayerError::Rejected { response, .. }
            | RelayerError::RetriesExhausted { response, .. } => Some(&**response),
            _ => None,
        }
    }

    /// Engine result code of a ledger-level failure
    pub fn engine_result(&self) -> Option<&str> {
        match self {
            RelayerError::Rejected { engine_result, .. }
            | RelayerError::RetriesExhausted { engine_result, .. } => Some(engine_result),
            _ => None,
        }
    }
}

fn detail(message: &Option<String>) -> String {
    message
        .as_deref()
        .map(|m| format!(": {}", m))
        .unwrap_or_default()
}

/// Result type for relayer operations
pub type RelayerResult<T> = Result<T, RelayerError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn response(engine_result: &str) -> Box<SubmitResponse> {
        Box::new(
            serde_json::from_value(serde_json::json!({
                "engine_result": engine_result,
                "tx_json": { "hash": "ABCD" }
            }))
            .unwrap(),
        )
    }

    #[test]
    fn test_last_response_only_on_ledger_failures() {
        let rejected = RelayerError::Rejected {
            engine_result: "temBAD_FEE".to_string(),
            response: response("temBAD_FEE"),
        };
        assert_eq!(rejected.engine_result(), Some("temBAD_FEE"));
        assert_eq!(rejected.last_response().unwrap().tx_json.hash, "ABCD");

        let rpc = RelayerError::Rpc {
            method: "submit".to_string(),
            message: "connection refused".to_string(),
        };
        assert!(rpc.last_response().is_none());
        assert!(rpc.is_retryable());
        assert!(!rejected.is_retryable());
    }

    #[test]
    fn test_node_error_display() {
        let err = RelayerError::Node {
            method: "account_info".to_string(),
            error: "actNotFound".to_string(),
            message: Some("Account not found.".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "Node returned actNotFound for account_info: Account not found."
        );

        let bare = RelayerError::Node {
            method: "tx".to_string(),
            error: "invalidParams".to_string(),
            message: None,
        };
        assert_eq!(bare.to_string(), "Node returned invalidParams for tx");
    }
}
