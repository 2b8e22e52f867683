//! Tagged operation requests accepted by the facade dispatcher

use crate::tx::builder::{
    BlacklistUpdate, CancelOrder, CreateOrder, DeleteNft, IssueSet, PublishNft, SetAccount,
    SetBrokerage, SetManageIssuer, SetSignerList, SetTokenIssue, Transfer, TransferNft,
};

use serde::{Deserialize, Serialize};

/// One facade operation with its business fields
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum OperationRequest {
    CreateOrder(CreateOrder),
    CancelOrder(CancelOrder),
    Transfer(Transfer),
    SetBrokerage(SetBrokerage),
    AddBlacklist(BlacklistUpdate),
    RemoveBlacklist(BlacklistUpdate),
    SetManageIssuer(SetManageIssuer),
    IssueSet(IssueSet),
    SetSignerList(SetSignerList),
    SetAccount(SetAccount),
    TransferNft(TransferNft),
    DeleteNft(DeleteNft),
    PublishNft(PublishNft),
    SetTokenIssue(SetTokenIssue),
}

impl OperationRequest {
    pub fn name(&self) -> &'static str {
        match self {
            OperationRequest::CreateOrder(_) => "create_order",
            OperationRequest::CancelOrder(_) => "cancel_order",
            OperationRequest::Transfer(_) => "transfer",
            OperationRequest::SetBrokerage(_) => "set_brokerage",
            OperationRequest::AddBlacklist(_) => "add_blacklist",
            OperationRequest::RemoveBlacklist(_) => "remove_blacklist",
            OperationRequest::SetManageIssuer(_) => "set_manage_issuer",
            OperationRequest::IssueSet(_) => "issue_set",
            OperationRequest::SetSignerList(_) => "set_signer_list",
            OperationRequest::SetAccount(_) => "set_account",
            OperationRequest::TransferNft(_) => "transfer_nft",
            OperationRequest::DeleteNft(_) => "delete_nft",
            OperationRequest::PublishNft(_) => "publish_nft",
            OperationRequest::SetTokenIssue(_) => "set_token_issue",
        }
    }

    /// Account whose sequence and signature govern the operation
    pub fn acting_account(&self) -> &str {
        match self {
            OperationRequest::CreateOrder(r) => &r.account,
            OperationRequest::CancelOrder(r) => &r.account,
            OperationRequest::Transfer(r) => &r.account,
            OperationRequest::SetBrokerage(r) => &r.platform_account,
            OperationRequest::AddBlacklist(r) | OperationRequest::RemoveBlacklist(r) => &r.manager,
            OperationRequest::SetManageIssuer(r) => &r.manager,
            OperationRequest::IssueSet(r) => &r.account,
            OperationRequest::SetSignerList(r) => &r.account,
            OperationRequest::SetAccount(r) => &r.account,
            OperationRequest::TransferNft(r) => &r.account,
            OperationRequest::DeleteNft(r) => &r.account,
            OperationRequest::PublishNft(r) => &r.account,
            OperationRequest::SetTokenIssue(r) => &r.manager,
        }
    }
}
