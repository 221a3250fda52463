use crate::{
    api::models::*,
    auth::jwt::{Claims, JwtService},
    core::{
        editor::SplitAmendment,
        errors::LedgerError,
        models::{AppLog, NetBalances, Obligation, PendingApproval, SplitRecord, WalletBalance, WalletTransaction},
        services::{LedgerService, NewSplit},
    },
    infrastructure::{logging::in_memory::InMemoryLogging, storage::in_memory::InMemoryDocumentStore},
};
use axum::{
    Extension, Json, Router,
    extract::{Path, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::IntoResponse,
    routing::{get, post},
};
use http::header;
use std::sync::Arc;

pub struct AppState {
    pub service: LedgerService<InMemoryLogging, InMemoryDocumentStore>,
    pub jwt: JwtService,
}

pub type SharedState = Arc<AppState>;

// Resolves the acting user from the bearer token
async fn auth_middleware(
    State(state): State<SharedState>,
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Result<impl IntoResponse, ApiError> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| LedgerError::unauthorized("anonymous", "call the API without a token"))?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| LedgerError::unauthorized("anonymous", "use a non-bearer authorization"))?;

    let claims = state.jwt.validate_token(token)?;
    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

fn require_acting_user(claims: &Claims, user_id: &str, action: &str) -> Result<(), ApiError> {
    if claims.sub != user_id {
        return Err(LedgerError::unauthorized(&claims.sub, action).into());
    }
    Ok(())
}

pub fn api_routes(state: SharedState) -> Router {
    Router::new()
        .route("/splits", post(create_split))
        .route("/splits/calculate", post(calculate_split))
        .route(
            "/splits/{split_id}",
            get(get_split).put(amend_split).delete(delete_split),
        )
        .route("/users/{user_id}/splits", get(list_splits_for_user))
        .route("/groups/{group_id}/splits", get(list_splits_for_group))
        .route(
            "/splits/{split_id}/settlement/request",
            post(request_manual_settlement),
        )
        .route("/splits/{split_id}/settlement/wallet", post(settle_with_wallet))
        .route(
            "/splits/{split_id}/participants/{participant_id}/approve",
            post(approve_settlement),
        )
        .route(
            "/splits/{split_id}/participants/{participant_id}/reject",
            post(reject_settlement),
        )
        .route("/settlements/pending", get(pending_approvals))
        .route("/balances", post(net_balances))
        .route("/wallet", get(wallet_balance))
        .route("/wallet/history", get(wallet_history))
        .route("/wallet/deposit", post(deposit))
        .route("/wallet/withdraw", post(withdraw))
        .route("/wallet/transfer", post(transfer_funds))
        .route("/logs", get(get_app_logs))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}

#[utoipa::path(
    post,
    path = "/api/splits/calculate",
    request_body = CalculateSplitRequest,
    responses(
        (status = 200, description = "Computed shares", body = Vec<Obligation>),
        (status = 400, description = "Invalid split input", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
async fn calculate_split(
    State(state): State<SharedState>,
    Json(req): Json<CalculateSplitRequest>,
) -> Result<Json<Vec<Obligation>>, ApiError> {
    let obligations = state.service.calculate_split(
        req.total_amount,
        req.split_method,
        &req.currency,
        &req.participants,
        req.paid_by.as_deref(),
    )?;
    Ok(Json(obligations))
}

#[utoipa::path(
    post,
    path = "/api/splits",
    request_body = NewSplit,
    responses(
        (status = 201, description = "Split created", body = SplitRecord),
        (status = 400, description = "Invalid split input", body = ErrorResponse),
        (status = 403, description = "Caller is neither payer nor participant", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub(crate) async fn create_split(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<NewSplit>,
) -> Result<(StatusCode, Json<SplitRecord>), ApiError> {
    if !req.involves(&claims.sub) {
        return Err(LedgerError::unauthorized(&claims.sub, "create a split they are not part of").into());
    }
    let record = state.service.create_split(req).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

#[utoipa::path(
    get,
    path = "/api/splits/{split_id}",
    params(("split_id" = String, Path, description = "ID of the split")),
    responses(
        (status = 200, description = "Split retrieved", body = SplitRecord),
        (status = 403, description = "Caller not involved in the split", body = ErrorResponse),
        (status = 404, description = "Split not found", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub(crate) async fn get_split(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Path(split_id): Path<String>,
) -> Result<Json<SplitRecord>, ApiError> {
    let record = state.service.get_split(&split_id).await?;
    if !record.involves(&claims.sub) {
        return Err(LedgerError::unauthorized(&claims.sub, "read a split they are not part of").into());
    }
    Ok(Json(record))
}

#[utoipa::path(
    put,
    path = "/api/splits/{split_id}",
    request_body = SplitAmendment,
    params(("split_id" = String, Path, description = "ID of the split")),
    responses(
        (status = 200, description = "Split amended", body = SplitRecord),
        (status = 400, description = "Invalid amendment", body = ErrorResponse),
        (status = 403, description = "Caller not involved in the split", body = ErrorResponse),
        (status = 404, description = "Split not found", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
async fn amend_split(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Path(split_id): Path<String>,
    Json(req): Json<SplitAmendment>,
) -> Result<Json<SplitRecord>, ApiError> {
    Ok(Json(state.service.amend_split(&split_id, req, &claims.sub).await?))
}

#[utoipa::path(
    delete,
    path = "/api/splits/{split_id}",
    params(("split_id" = String, Path, description = "ID of the split")),
    responses(
        (status = 204, description = "Split deleted"),
        (status = 403, description = "Only the payer may delete", body = ErrorResponse),
        (status = 404, description = "Split not found", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
async fn delete_split(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Path(split_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.service.delete_split(&split_id, &claims.sub).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/users/{user_id}/splits",
    params(("user_id" = String, Path, description = "Payer or participant")),
    responses(
        (status = 200, description = "Splits involving the user", body = Vec<SplitRecord>),
        (status = 403, description = "Path user is not the caller", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub(crate) async fn list_splits_for_user(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<SplitRecord>>, ApiError> {
    require_acting_user(&claims, &user_id, "list another user's splits")?;
    Ok(Json(state.service.list_splits_for_user(&user_id).await?))
}

#[utoipa::path(
    get,
    path = "/api/groups/{group_id}/splits",
    params(("group_id" = String, Path, description = "ID of the group")),
    responses((status = 200, description = "Splits of the group", body = Vec<SplitRecord>)),
    security(("Bearer" = []))
)]
async fn list_splits_for_group(
    State(state): State<SharedState>,
    Path(group_id): Path<String>,
) -> Result<Json<Vec<SplitRecord>>, ApiError> {
    Ok(Json(state.service.list_splits_for_group(&group_id).await?))
}

#[utoipa::path(
    post,
    path = "/api/splits/{split_id}/settlement/request",
    params(("split_id" = String, Path, description = "ID of the split")),
    responses(
        (status = 200, description = "Share is pending the payer's approval", body = SplitRecord),
        (status = 404, description = "Split or obligation not found", body = ErrorResponse),
        (status = 409, description = "Share is not unsettled", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
async fn request_manual_settlement(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Path(split_id): Path<String>,
) -> Result<Json<SplitRecord>, ApiError> {
    Ok(Json(
        state.service.request_manual_settlement(&split_id, &claims.sub).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/splits/{split_id}/settlement/wallet",
    params(("split_id" = String, Path, description = "ID of the split")),
    responses(
        (status = 200, description = "Share settled from the caller's wallet", body = SplitRecord),
        (status = 404, description = "Split or obligation not found", body = ErrorResponse),
        (status = 409, description = "Share is not unsettled", body = ErrorResponse),
        (status = 422, description = "Insufficient funds", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
async fn settle_with_wallet(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Path(split_id): Path<String>,
) -> Result<Json<SplitRecord>, ApiError> {
    Ok(Json(state.service.settle_with_wallet(&split_id, &claims.sub).await?))
}

#[utoipa::path(
    post,
    path = "/api/splits/{split_id}/participants/{participant_id}/approve",
    params(
        ("split_id" = String, Path, description = "ID of the split"),
        ("participant_id" = String, Path, description = "Participant whose share is approved")
    ),
    responses(
        (status = 200, description = "Share settled", body = SplitRecord),
        (status = 403, description = "Caller is not the payer", body = ErrorResponse),
        (status = 409, description = "Share is not pending approval", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
async fn approve_settlement(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Path((split_id, participant_id)): Path<(String, String)>,
) -> Result<Json<SplitRecord>, ApiError> {
    Ok(Json(
        state
            .service
            .approve_settlement(&split_id, &participant_id, &claims.sub)
            .await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/splits/{split_id}/participants/{participant_id}/reject",
    params(
        ("split_id" = String, Path, description = "ID of the split"),
        ("participant_id" = String, Path, description = "Participant whose request is rejected")
    ),
    responses(
        (status = 200, description = "Share back to unsettled", body = SplitRecord),
        (status = 403, description = "Caller is not the payer", body = ErrorResponse),
        (status = 409, description = "Share is not pending approval", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
async fn reject_settlement(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Path((split_id, participant_id)): Path<(String, String)>,
) -> Result<Json<SplitRecord>, ApiError> {
    Ok(Json(
        state
            .service
            .reject_settlement(&split_id, &participant_id, &claims.sub)
            .await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/settlements/pending",
    responses((status = 200, description = "Shares awaiting the caller's approval", body = Vec<PendingApproval>)),
    security(("Bearer" = []))
)]
async fn pending_approvals(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<PendingApproval>>, ApiError> {
    Ok(Json(state.service.pending_approvals(&claims.sub).await?))
}

#[utoipa::path(
    post,
    path = "/api/balances",
    request_body = NetBalancesRequest,
    responses((status = 200, description = "Net balances per friend and group", body = NetBalances)),
    security(("Bearer" = []))
)]
async fn net_balances(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<NetBalancesRequest>,
) -> Result<Json<NetBalances>, ApiError> {
    Ok(Json(
        state
            .service
            .net_balances(&claims.sub, &req.friends, &req.groups)
            .await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/wallet",
    responses((status = 200, description = "Caller's wallet", body = WalletBalance)),
    security(("Bearer" = []))
)]
async fn wallet_balance(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<WalletBalance>, ApiError> {
    Ok(Json(state.service.wallet_balance(&claims.sub).await?))
}

#[utoipa::path(
    get,
    path = "/api/wallet/history",
    responses((status = 200, description = "Caller's wallet movements", body = Vec<WalletTransaction>)),
    security(("Bearer" = []))
)]
async fn wallet_history(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<WalletTransaction>>, ApiError> {
    Ok(Json(state.service.wallet_history(&claims.sub).await?))
}

#[utoipa::path(
    post,
    path = "/api/wallet/deposit",
    request_body = WalletAmountRequest,
    responses(
        (status = 200, description = "Funds added", body = WalletBalance),
        (status = 400, description = "Invalid amount", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
async fn deposit(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<WalletAmountRequest>,
) -> Result<Json<WalletBalance>, ApiError> {
    Ok(Json(
        state.service.deposit(&claims.sub, req.amount, &req.currency).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/wallet/withdraw",
    request_body = WalletAmountRequest,
    responses(
        (status = 200, description = "Funds withdrawn", body = WalletBalance),
        (status = 422, description = "Insufficient funds", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
async fn withdraw(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<WalletAmountRequest>,
) -> Result<Json<WalletBalance>, ApiError> {
    Ok(Json(
        state.service.withdraw(&claims.sub, req.amount, &req.currency).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/wallet/transfer",
    request_body = TransferFundsRequest,
    responses(
        (status = 200, description = "Funds moved; returns the caller's wallet", body = WalletBalance),
        (status = 422, description = "Insufficient funds", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
async fn transfer_funds(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<TransferFundsRequest>,
) -> Result<Json<WalletBalance>, ApiError> {
    Ok(Json(
        state
            .service
            .transfer_funds(&claims.sub, &req.to_user_id, req.amount, &req.currency)
            .await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/logs",
    responses((status = 200, description = "Audit entries of the caller", body = Vec<AppLog>)),
    security(("Bearer" = []))
)]
pub(crate) async fn get_app_logs(
    State(state): State<SharedState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<AppLog>>, ApiError> {
    Ok(Json(state.service.get_app_logs_for_user(&claims.sub).await?))
}
