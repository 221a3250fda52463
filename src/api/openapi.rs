use utoipa::OpenApi;

use crate::{
    api::models::{CalculateSplitRequest, ErrorResponse, NetBalancesRequest, TransferFundsRequest, WalletAmountRequest},
    core::{
        editor::SplitAmendment,
        models::{
            AppLog, Counterparty, ExpenseRef, GroupRef, NetBalance, NetBalances, Obligation, ParticipantInput,
            PendingApproval, SettlementStatus, SplitMethod, SplitRecord, WalletBalance, WalletTransaction,
            WalletTransactionKind,
        },
        services::NewSplit,
    },
};

#[derive(OpenApi)]
#[openapi(
    paths(
        super::handlers::calculate_split,
        super::handlers::create_split,
        super::handlers::get_split,
        super::handlers::amend_split,
        super::handlers::delete_split,
        super::handlers::list_splits_for_user,
        super::handlers::list_splits_for_group,
        super::handlers::request_manual_settlement,
        super::handlers::settle_with_wallet,
        super::handlers::approve_settlement,
        super::handlers::reject_settlement,
        super::handlers::pending_approvals,
        super::handlers::net_balances,
        super::handlers::wallet_balance,
        super::handlers::wallet_history,
        super::handlers::deposit,
        super::handlers::withdraw,
        super::handlers::transfer_funds,
        super::handlers::get_app_logs
    ),
    components(schemas(
        CalculateSplitRequest,
        NetBalancesRequest,
        WalletAmountRequest,
        TransferFundsRequest,
        ErrorResponse,
        NewSplit,
        SplitAmendment,
        ExpenseRef,
        ParticipantInput,
        SplitMethod,
        SettlementStatus,
        Obligation,
        SplitRecord,
        Counterparty,
        GroupRef,
        NetBalance,
        NetBalances,
        PendingApproval,
        WalletBalance,
        WalletTransaction,
        WalletTransactionKind,
        AppLog
    )),
    info(
        title = "SplitLedger API",
        description = "Split ledger and settlement engine for shared expenses",
        version = "0.1.0"
    )
)]
pub struct ApiDoc;
