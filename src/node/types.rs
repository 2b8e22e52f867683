//! Response shapes of the node JSON-RPC methods used by the relayer

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Engine result for an accepted transaction
pub const TES_SUCCESS: &str = "tesSUCCESS";
/// Sequence is ahead of the account's on-ledger sequence
pub const TER_PRE_SEQ: &str = "terPRE_SEQ";
/// Sequence has already been consumed
pub const TEF_PAST_SEQ: &str = "tefPAST_SEQ";

/// How the submission loop treats an engine result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineVerdict {
    Accepted,
    SequenceConflict,
    Fatal,
}

impl EngineVerdict {
    pub fn classify(engine_result: &str) -> Self {
        match engine_result {
            TES_SUCCESS => EngineVerdict::Accepted,
            TER_PRE_SEQ | TEF_PAST_SEQ => EngineVerdict::SequenceConflict,
            _ => EngineVerdict::Fatal,
        }
    }
}

/// `result` object of a `submit` call
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubmitResponse {
    pub engine_result: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine_result_code: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine_result_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_blob: Option<String>,
    pub tx_json: SubmittedTxJson,
    /// Remaining fields, kept for diagnosis
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SubmitResponse {
    pub fn verdict(&self) -> EngineVerdict {
        EngineVerdict::classify(&self.engine_result)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubmittedTxJson {
    #[serde(default)]
    pub hash: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

/// `result` object of an `account_info` call
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct AccountInfo {
    pub account_data: AccountData,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct AccountData {
    #[serde(rename = "Sequence")]
    pub sequence: u32,
}

/// `result` object of a `sign` call
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SignResult {
    pub tx_blob: String,
    pub tx_json: SubmittedTxJson,
}

/// Transaction as returned by the `tx` method
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransactionRecord {
    pub hash: String,
    #[serde(default)]
    pub validated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ledger_index: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl TransactionRecord {
    /// Final engine result recorded in the transaction metadata
    pub fn transaction_result(&self) -> Option<&str> {
        self.meta
            .as_ref()
            .and_then(|meta| meta.get("TransactionResult"))
            .and_then(Value::as_str)
    }
}

/// Error object returned inside a JSON-RPC `result`
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RpcErrorBody {
    pub error: String,
    #[serde(default)]
    pub error_message: Option<String>,
}
