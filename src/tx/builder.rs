//! Transaction construction for each supported operation
//!
//! Pure data shaping: requests in, unsigned `Transaction`s out. Nothing here
//! touches the network or the sequence cache.

use super::types::{
    Amount, Memo, SignerEntry, SignerEntryFields, TokenInfo, TokenInfoFields, Transaction,
    TransactionPayload, ASF_DISABLE_MASTER, TF_SELL,
};
use crate::config::NodeConfig;
use crate::error::{RelayerError, RelayerResult};

use serde::{Deserialize, Serialize};

/// Drops per native unit
const DROPS_PER_UNIT: u64 = 1_000_000;
const DROPS_DECIMALS: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

/// Place an offer trading `amount` of `base` against `sum` of `counter`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrder {
    pub account: String,
    pub side: OrderSide,
    pub amount: String,
    pub base: String,
    pub counter: String,
    pub sum: String,
    /// Issuer of the non-native currencies in the pair
    #[serde(default)]
    pub issuer: Option<String>,
    #[serde(default)]
    pub platform: Option<String>,
    #[serde(default)]
    pub memo: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelOrder {
    pub account: String,
    pub offer_sequence: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transfer {
    pub account: String,
    pub to: String,
    pub amount: String,
    pub token: String,
    #[serde(default)]
    pub issuer: Option<String>,
    #[serde(default)]
    pub memo: Option<String>,
}

/// Brokerage is signed by the platform account, which is the acting account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetBrokerage {
    pub platform_account: String,
    pub fee_account: String,
    pub rate_num: u64,
    pub rate_den: u64,
    pub token: String,
    #[serde(default)]
    pub issuer: Option<String>,
}

/// Blacklist add or remove, signed by the blacklist manager
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlacklistUpdate {
    pub manager: String,
    pub target: String,
    #[serde(default)]
    pub memo: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetManageIssuer {
    pub manager: String,
    pub new_issuer: String,
    #[serde(default)]
    pub memo: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueSet {
    pub account: String,
    pub amount: String,
    pub token: String,
    pub issuer: String,
    #[serde(default)]
    pub memo: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignerWeight {
    pub account: String,
    pub weight: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetSignerList {
    pub account: String,
    pub quorum: u32,
    pub signers: Vec<SignerWeight>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetAccount {
    pub account: String,
    pub disable_master: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferNft {
    pub account: String,
    pub to: String,
    pub token_id: String,
    #[serde(default)]
    pub memo: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteNft {
    pub account: String,
    pub token_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NftInfo {
    pub info_type: String,
    pub info_data: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishNft {
    pub account: String,
    pub receiver: String,
    pub token_name: String,
    pub token_id: String,
    #[serde(default)]
    pub infos: Vec<NftInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetTokenIssue {
    pub manager: String,
    pub publisher: String,
    pub token_name: String,
    pub total_count: u64,
}

/// Builds unsigned transactions with the node's fee and native currency
#[derive(Debug, Clone)]
pub struct TransactionBuilder {
    native_currency: String,
    fee: u64,
}

impl TransactionBuilder {
    pub fn new(native_currency: impl Into<String>, fee: u64) -> Self {
        Self {
            native_currency: native_currency.into().to_uppercase(),
            fee,
        }
    }

    pub fn from_config(config: &NodeConfig) -> Self {
        Self::new(config.native_currency.clone(), config.default_fee)
    }

    /// Amount in `currency`; native amounts are converted to drops
    pub fn amount(&self, value: &str, currency: &str, issuer: Option<&str>) -> RelayerResult<Amount> {
        require("currency", currency)?;
        if currency.eq_ignore_ascii_case(&self.native_currency) {
            return to_drops(value).map(Amount::Native);
        }

        if !is_decimal(value) {
            return Err(RelayerError::InvalidTransaction(format!(
                "Invalid amount {:?} for {}",
                value, currency
            )));
        }
        let issuer = issuer.filter(|i| !i.is_empty()).ok_or_else(|| {
            RelayerError::InvalidTransaction(format!("Currency {} requires an issuer", currency))
        })?;

        Ok(Amount::Issued {
            value: value.to_string(),
            currency: currency.to_uppercase(),
            issuer: issuer.to_string(),
        })
    }

    pub fn create_order(&self, request: &CreateOrder) -> RelayerResult<Transaction> {
        let issuer = request.issuer.as_deref();
        let base = self.amount(&request.amount, &request.base, issuer)?;
        let counter = self.amount(&request.sum, &request.counter, issuer)?;

        let (taker_pays, taker_gets, flags) = match request.side {
            OrderSide::Buy => (base, counter, 0),
            OrderSide::Sell => (counter, base, TF_SELL),
        };

        let mut tx = self.transaction(
            &request.account,
            TransactionPayload::OfferCreate {
                taker_pays,
                taker_gets,
                platform: request.platform.clone().filter(|p| !p.is_empty()),
            },
            request.memo.as_deref(),
        )?;
        tx.flags = flags;
        Ok(tx)
    }

    pub fn cancel_order(&self, request: &CancelOrder) -> RelayerResult<Transaction> {
        if request.offer_sequence == 0 {
            return Err(RelayerError::InvalidTransaction(
                "offer_sequence must be positive".to_string(),
            ));
        }
        self.transaction(
            &request.account,
            TransactionPayload::OfferCancel {
                offer_sequence: request.offer_sequence,
            },
            None,
        )
    }

    pub fn transfer(&self, request: &Transfer) -> RelayerResult<Transaction> {
        require("to", &request.to)?;
        let amount = self.amount(&request.amount, &request.token, request.issuer.as_deref())?;
        self.transaction(
            &request.account,
            TransactionPayload::Payment {
                amount,
                destination: request.to.clone(),
            },
            request.memo.as_deref(),
        )
    }

    pub fn set_brokerage(&self, request: &SetBrokerage) -> RelayerResult<Transaction> {
        require("fee_account", &request.fee_account)?;
        require("token", &request.token)?;
        if request.rate_den == 0 || request.rate_num > request.rate_den {
            return Err(RelayerError::InvalidTransaction(format!(
                "Invalid fee rate {}/{}",
                request.rate_num, request.rate_den
            )));
        }

        self.transaction(
            &request.platform_account,
            TransactionPayload::Brokerage {
                offer_fee_rate_num: request.rate_num,
                offer_fee_rate_den: request.rate_den,
                amount: Amount::Issued {
                    value: "0".to_string(),
                    currency: request.token.to_uppercase(),
                    issuer: request.issuer.clone().unwrap_or_default(),
                },
                fee_account_id: request.fee_account.clone(),
            },
            None,
        )
    }

    pub fn add_blacklist(&self, request: &BlacklistUpdate) -> RelayerResult<Transaction> {
        require("target", &request.target)?;
        self.transaction(
            &request.manager,
            TransactionPayload::SetBlackList {
                black_list_account_id: request.target.clone(),
            },
            request.memo.as_deref(),
        )
    }

    pub fn remove_blacklist(&self, request: &BlacklistUpdate) -> RelayerResult<Transaction> {
        require("target", &request.target)?;
        self.transaction(
            &request.manager,
            TransactionPayload::RemoveBlackList {
                black_list_account_id: request.target.clone(),
            },
            request.memo.as_deref(),
        )
    }

    pub fn set_manage_issuer(&self, request: &SetManageIssuer) -> RelayerResult<Transaction> {
        require("new_issuer", &request.new_issuer)?;
        self.transaction(
            &request.manager,
            TransactionPayload::ManageIssuer {
                issuer_account_id: request.new_issuer.clone(),
            },
            request.memo.as_deref(),
        )
    }

    pub fn issue_set(&self, request: &IssueSet) -> RelayerResult<Transaction> {
        let total_amount = self.amount(&request.amount, &request.token, Some(&request.issuer))?;
        self.transaction(
            &request.account,
            TransactionPayload::IssueSet { total_amount },
            request.memo.as_deref(),
        )
    }

    pub fn set_signer_list(&self, request: &SetSignerList) -> RelayerResult<Transaction> {
        if request.quorum == 0 || request.signers.is_empty() {
            return Err(RelayerError::InvalidTransaction(
                "Signer list needs a positive quorum and at least one signer".to_string(),
            ));
        }
        let total_weight: u64 = request.signers.iter().map(|s| u64::from(s.weight)).sum();
        if total_weight < u64::from(request.quorum) {
            return Err(RelayerError::InvalidTransaction(format!(
                "Quorum {} unreachable with total weight {}",
                request.quorum, total_weight
            )));
        }

        let mut signer_entries = Vec::with_capacity(request.signers.len());
        for signer in &request.signers {
            require("signer account", &signer.account)?;
            if signer.weight == 0 {
                return Err(RelayerError::InvalidTransaction(format!(
                    "Signer {} has zero weight",
                    signer.account
                )));
            }
            signer_entries.push(SignerEntry {
                signer_entry: SignerEntryFields {
                    account: signer.account.clone(),
                    signer_weight: signer.weight,
                },
            });
        }

        self.transaction(
            &request.account,
            TransactionPayload::SignerListSet {
                signer_quorum: request.quorum,
                signer_entries,
            },
            None,
        )
    }

    pub fn set_account(&self, request: &SetAccount) -> RelayerResult<Transaction> {
        let payload = if request.disable_master {
            TransactionPayload::AccountSet {
                set_flag: Some(ASF_DISABLE_MASTER),
                clear_flag: None,
            }
        } else {
            TransactionPayload::AccountSet {
                set_flag: None,
                clear_flag: Some(ASF_DISABLE_MASTER),
            }
        };
        self.transaction(&request.account, payload, None)
    }

    pub fn transfer_nft(&self, request: &TransferNft) -> RelayerResult<Transaction> {
        require("to", &request.to)?;
        require("token_id", &request.token_id)?;
        self.transaction(
            &request.account,
            TransactionPayload::TransferToken {
                destination: request.to.clone(),
                token_id: request.token_id.clone(),
            },
            request.memo.as_deref(),
        )
    }

    pub fn delete_nft(&self, request: &DeleteNft) -> RelayerResult<Transaction> {
        require("token_id", &request.token_id)?;
        self.transaction(
            &request.account,
            TransactionPayload::TokenDel {
                token_id: request.token_id.clone(),
            },
            None,
        )
    }

    pub fn publish_nft(&self, request: &PublishNft) -> RelayerResult<Transaction> {
        require("receiver", &request.receiver)?;
        require("token_name", &request.token_name)?;
        require("token_id", &request.token_id)?;

        let token_infos = request
            .infos
            .iter()
            .map(|info| TokenInfo {
                token_info: TokenInfoFields {
                    info_type: hex::encode_upper(&info.info_type),
                    info_data: hex::encode_upper(&info.info_data),
                },
            })
            .collect();

        self.transaction(
            &request.account,
            TransactionPayload::TokenIssue {
                destination: request.receiver.clone(),
                fund_code: hex::encode_upper(&request.token_name),
                token_id: request.token_id.clone(),
                token_infos,
            },
            None,
        )
    }

    pub fn set_token_issue(&self, request: &SetTokenIssue) -> RelayerResult<Transaction> {
        require("publisher", &request.publisher)?;
        require("token_name", &request.token_name)?;
        if request.total_count == 0 {
            return Err(RelayerError::InvalidTransaction(
                "total_count must be positive".to_string(),
            ));
        }
        self.transaction(
            &request.manager,
            TransactionPayload::SetTokenIssue {
                issuer: request.publisher.clone(),
                fund_code: hex::encode_upper(&request.token_name),
                total_count: request.total_count,
            },
            None,
        )
    }

    fn transaction(
        &self,
        account: &str,
        payload: TransactionPayload,
        memo: Option<&str>,
    ) -> RelayerResult<Transaction> {
        require("account", account)?;
        Ok(Transaction {
            account: account.to_string(),
            fee: self.fee,
            flags: 0,
            sequence: None,
            memos: memo
                .filter(|m| !m.is_empty())
                .map(|m| vec![Memo::text(m)])
                .unwrap_or_default(),
            signing_pub_key: None,
            txn_signature: None,
            payload,
        })
    }
}

fn require(field: &str, value: &str) -> RelayerResult<()> {
    if value.trim().is_empty() {
        return Err(RelayerError::InvalidTransaction(format!("{} is required", field)));
    }
    Ok(())
}

/// Unsigned decimal with at least one digit
fn is_decimal(value: &str) -> bool {
    let (int_part, frac_part) = value.split_once('.').unwrap_or((value, ""));
    !(int_part.is_empty() && frac_part.is_empty())
        && int_part.bytes().all(|b| b.is_ascii_digit())
        && frac_part.bytes().all(|b| b.is_ascii_digit())
}

/// Exact decimal-to-drops conversion
fn to_drops(value: &str) -> RelayerResult<String> {
    let invalid = || RelayerError::InvalidTransaction(format!("Invalid native amount {:?}", value));

    if !is_decimal(value) {
        return Err(invalid());
    }
    let (int_part, frac_part) = value.split_once('.').unwrap_or((value, ""));
    if frac_part.len() > DROPS_DECIMALS {
        return Err(invalid());
    }

    let units: u64 = if int_part.is_empty() {
        0
    } else {
        int_part.parse().map_err(|_| invalid())?
    };
    let fraction: u64 = format!("{:0<width$}", frac_part, width = DROPS_DECIMALS)
        .parse()
        .map_err(|_| invalid())?;

    units
        .checked_mul(DROPS_PER_UNIT)
        .and_then(|drops| drops.checked_add(fraction))
        .map(|drops| drops.to_string())
        .ok_or_else(invalid)
}
