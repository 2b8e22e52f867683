//! Typed transaction model in the node's JSON wire shape

use serde::{Deserialize, Serialize};

/// `tfSell` offer flag
pub const TF_SELL: u32 = 0x0008_0000;
/// `asfDisableMaster` account flag
pub const ASF_DISABLE_MASTER: u32 = 4;

/// A transaction description as handed to the signer.
///
/// `sequence`, `signing_pub_key` and `txn_signature` belong to the submission loop;
/// builders leave them empty.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct Transaction {
    pub account: String,
    #[serde(with = "drops_string")]
    pub fee: u64,
    #[serde(default)]
    pub flags: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub memos: Vec<Memo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signing_pub_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub txn_signature: Option<String>,
    #[serde(flatten)]
    pub payload: TransactionPayload,
}

impl Transaction {
    /// Fresh copy for one submission attempt, carrying `sequence` and no signature.
    pub fn stamped(&self, sequence: u32) -> Transaction {
        Transaction {
            sequence: Some(sequence),
            signing_pub_key: None,
            txn_signature: None,
            ..self.clone()
        }
    }

    pub fn transaction_type(&self) -> &'static str {
        self.payload.transaction_type()
    }
}

/// Operation-specific fields, tagged by `TransactionType`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "TransactionType")]
pub enum TransactionPayload {
    #[serde(rename_all = "PascalCase")]
    OfferCreate {
        taker_pays: Amount,
        taker_gets: Amount,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        platform: Option<String>,
    },
    #[serde(rename_all = "PascalCase")]
    OfferCancel { offer_sequence: u32 },
    #[serde(rename_all = "PascalCase")]
    Payment { amount: Amount, destination: String },
    #[serde(rename_all = "PascalCase")]
    Brokerage {
        offer_fee_rate_num: u64,
        offer_fee_rate_den: u64,
        amount: Amount,
        #[serde(rename = "FeeAccountID")]
        fee_account_id: String,
    },
    SetBlackList {
        #[serde(rename = "BlackListAccountID")]
        black_list_account_id: String,
    },
    RemoveBlackList {
        #[serde(rename = "BlackListAccountID")]
        black_list_account_id: String,
    },
    ManageIssuer {
        #[serde(rename = "IssuerAccountID")]
        issuer_account_id: String,
    },
    #[serde(rename_all = "PascalCase")]
    IssueSet { total_amount: Amount },
    #[serde(rename_all = "PascalCase")]
    SignerListSet {
        signer_quorum: u32,
        signer_entries: Vec<SignerEntry>,
    },
    #[serde(rename_all = "PascalCase")]
    AccountSet {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        set_flag: Option<u32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        clear_flag: Option<u32>,
    },
    #[serde(rename_all = "PascalCase")]
    TransferToken {
        destination: String,
        #[serde(rename = "TokenID")]
        token_id: String,
    },
    TokenDel {
        #[serde(rename = "TokenID")]
        token_id: String,
    },
    #[serde(rename_all = "PascalCase")]
    TokenIssue {
        destination: String,
        fund_code: String,
        #[serde(rename = "TokenID")]
        token_id: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        token_infos: Vec<TokenInfo>,
    },
    #[serde(rename_all = "PascalCase")]
    SetTokenIssue {
        issuer: String,
        fund_code: String,
        total_count: u64,
    },
}

impl TransactionPayload {
    pub fn transaction_type(&self) -> &'static str {
        match self {
            TransactionPayload::OfferCreate { .. } => "OfferCreate",
            TransactionPayload::OfferCancel { .. } => "OfferCancel",
            TransactionPayload::Payment { .. } => "Payment",
            TransactionPayload::Brokerage { .. } => "Brokerage",
            TransactionPayload::SetBlackList { .. } => "SetBlackList",
            TransactionPayload::RemoveBlackList { .. } => "RemoveBlackList",
            TransactionPayload::ManageIssuer { .. } => "ManageIssuer",
            TransactionPayload::IssueSet { .. } => "IssueSet",
            TransactionPayload::SignerListSet { .. } => "SignerListSet",
            TransactionPayload::AccountSet { .. } => "AccountSet",
            TransactionPayload::TransferToken { .. } => "TransferToken",
            TransactionPayload::TokenDel { .. } => "TokenDel",
            TransactionPayload::TokenIssue { .. } => "TokenIssue",
            TransactionPayload::SetTokenIssue { .. } => "SetTokenIssue",
        }
    }
}

/// Ledger amount: native drops as a string, or an issued currency value
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Amount {
    Native(String),
    Issued {
        value: String,
        currency: String,
        issuer: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct Memo {
    pub memo: MemoFields,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct MemoFields {
    pub memo_type: String,
    pub memo_data: String,
}

impl Memo {
    /// Plain-text memo, hex-encoded as the ledger expects
    pub fn text(data: &str) -> Self {
        Memo {
            memo: MemoFields {
                memo_type: hex::encode_upper("string"),
                memo_data: hex::encode_upper(data),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct SignerEntry {
    pub signer_entry: SignerEntryFields,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct SignerEntryFields {
    pub account: String,
    pub signer_weight: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct TokenInfo {
    pub token_info: TokenInfoFields,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct TokenInfoFields {
    pub info_type: String,
    pub info_data: String,
}

/// Fees travel as decimal strings of drops
mod drops_string {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrNumber {
        String(String),
        Number(u64),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        match StringOrNumber::deserialize(deserializer)? {
            StringOrNumber::String(s) => s.parse().map_err(serde::de::Error::custom),
            StringOrNumber::Number(n) => Ok(n),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payment() -> Transaction {
        Transaction {
            account: "jAlice".to_string(),
            fee: 10,
            flags: 0,
            sequence: None,
            memos: vec![Memo::text("hi")],
            signing_pub_key: None,
            txn_signature: None,
            payload: TransactionPayload::Payment {
                amount: Amount::Native("1000000".to_string()),
                destination: "jBob".to_string(),
            },
        }
    }

    #[test]
    fn test_wire_shape() {
        let value = serde_json::to_value(payment().stamped(5)).unwrap();
        assert_eq!(
            value,
            json!({
                "TransactionType": "Payment",
                "Account": "jAlice",
                "Fee": "10",
                "Flags": 0,
                "Sequence": 5,
                "Memos": [{ "Memo": { "MemoType": "737472696E67", "MemoData": "6869" } }],
                "Amount": "1000000",
                "Destination": "jBob"
            })
        );
    }

    #[test]
    fn test_stamped_clears_signature_and_keeps_original() {
        let mut signed = payment().stamped(5);
        signed.signing_pub_key = Some("02AB".to_string());
        signed.txn_signature = Some("3045".to_string());

        let next = signed.stamped(6);
        assert_eq!(next.sequence, Some(6));
        assert!(next.signing_pub_key.is_none());
        assert!(next.txn_signature.is_none());
        assert_eq!(signed.sequence, Some(5));
        assert_eq!(next.payload, signed.payload);
    }

    #[test]
    fn test_parse_node_tx_json() {
        let tx: Transaction = serde_json::from_value(json!({
            "TransactionType": "OfferCreate",
            "Account": "jAlice",
            "Fee": "10",
            "Flags": 524288,
            "Sequence": 9,
            "TakerPays": { "value": "1", "currency": "CNY", "issuer": "jGate" },
            "TakerGets": "2000000"
        }))
        .unwrap();

        assert_eq!(tx.transaction_type(), "OfferCreate");
        assert_eq!(tx.flags, TF_SELL);
        assert_eq!(tx.sequence, Some(9));
        match tx.payload {
            TransactionPayload::OfferCreate {
                taker_gets,
                platform,
                ..
            } => {
                assert_eq!(taker_gets, Amount::Native("2000000".to_string()));
                assert!(platform.is_none());
            }
            other => panic!("unexpected payload: {:?}", other),
        }
    }
}
