//! # HTTP handlers
//!
//! One handler per route. Handlers translate between JSON bodies and
//! `LedgerService` calls; all failures go through `ApiError`.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use tracing::info;

use crate::application::{AppError, GROUP_INPUT_REQUIRED};
use crate::domain::{cents_from_units, cents_to_units, Cents};

use super::error::{ApiError, ApiJson};
use super::types::*;
use super::AppState;

pub const MOVEMENT_INPUT_REQUIRED: &str = "Customer ID and amount are required";

type ApiResult<T> = Result<T, ApiError>;

/// GET /
pub async fn index() -> &'static str {
    "Hello, World!"
}

/// GET /customers
pub async fn list_customers(State(state): State<AppState>) -> ApiResult<Json<Vec<CustomerView>>> {
    info!("GET /customers");

    let customers = state.service.list_customers().await?;
    Ok(Json(customers.iter().map(CustomerView::from).collect()))
}

/// GET /customer/{id}
pub async fn get_customer(
    State(state): State<AppState>,
    Path(customer_id): Path<String>,
) -> ApiResult<Json<CustomerView>> {
    info!("GET /customer/{}", customer_id);

    let customer = state.service.get_customer(&customer_id).await?;
    Ok(Json(CustomerView::from(&customer)))
}

/// GET /customer/{id}/transactions
pub async fn list_customer_transactions(
    State(state): State<AppState>,
    Path(customer_id): Path<String>,
) -> ApiResult<Json<Vec<TransactionView>>> {
    info!("GET /customer/{}/transactions", customer_id);

    let transactions = state.service.list_transactions(&customer_id).await?;
    Ok(Json(transactions.iter().map(TransactionView::from).collect()))
}

/// POST /customer
pub async fn create_customer(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CreateCustomerRequest>,
) -> ApiResult<impl IntoResponse> {
    info!("POST /customer - request: {:?}", request);

    let customer = state
        .service
        .create_customer(
            request.name.as_deref().unwrap_or_default(),
            request.email.as_deref().unwrap_or_default(),
            request.group.as_deref(),
        )
        .await?;

    let body = CustomerCreated {
        message: CUSTOMER_CREATED.to_string(),
        customer_id: customer.id,
    };
    Ok((StatusCode::CREATED, Json(body)))
}

/// POST /group
pub async fn create_group(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CreateGroupRequest>,
) -> ApiResult<impl IntoResponse> {
    info!("POST /group - request: {:?}", request);
    create_group_from(&state, request).await
}

/// GET /group?name=..&acronym=..
pub async fn create_group_from_query(
    State(state): State<AppState>,
    Query(request): Query<CreateGroupRequest>,
) -> ApiResult<impl IntoResponse> {
    info!("GET /group - query: {:?}", request);
    create_group_from(&state, request).await
}

async fn create_group_from(
    state: &AppState,
    request: CreateGroupRequest,
) -> ApiResult<(StatusCode, Json<GroupCreated>)> {
    let (Some(name), Some(acronym)) = (request.name, request.acronym) else {
        return Err(AppError::Validation(GROUP_INPUT_REQUIRED.to_string()).into());
    };

    let group = state.service.create_group(&name, &acronym).await?;
    let body = GroupCreated {
        message: GROUP_CREATED.to_string(),
        group_id: group.id,
        acronym: group.acronym,
    };
    Ok((StatusCode::CREATED, Json(body)))
}

/// GET /group/{id}
pub async fn get_group(
    State(state): State<AppState>,
    Path(group_id): Path<String>,
) -> ApiResult<Json<GroupView>> {
    info!("GET /group/{}", group_id);

    // A non-numeric ID can never match a group
    let id = group_id
        .parse()
        .map_err(|_| AppError::GroupNotFound(group_id.clone()))?;
    let group = state.service.get_group(id).await?;
    Ok(Json(GroupView::from(group)))
}

/// GET /groups
pub async fn list_groups(State(state): State<AppState>) -> ApiResult<Json<Vec<GroupView>>> {
    info!("GET /groups");

    let groups = state.service.list_groups().await?;
    Ok(Json(groups.into_iter().map(GroupView::from).collect()))
}

/// POST /deposit
pub async fn deposit(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<MovementRequest>,
) -> ApiResult<Json<MovementResponse>> {
    info!("POST /deposit - request: {:?}", request);

    let (customer_id, amount) = movement_input(request)?;
    let balance = state.service.deposit(&customer_id, amount).await?;
    Ok(Json(MovementResponse {
        message: DEPOSIT_SUCCESSFUL.to_string(),
        new_balance: cents_to_units(balance),
    }))
}

/// POST /withdraw
pub async fn withdraw(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<MovementRequest>,
) -> ApiResult<Json<MovementResponse>> {
    info!("POST /withdraw - request: {:?}", request);

    let (customer_id, amount) = movement_input(request)?;
    let balance = state.service.withdraw(&customer_id, amount).await?;
    Ok(Json(MovementResponse {
        message: WITHDRAWAL_SUCCESSFUL.to_string(),
        new_balance: cents_to_units(balance),
    }))
}

/// GET /balance/{id}
pub async fn get_balance(
    State(state): State<AppState>,
    Path(customer_id): Path<String>,
) -> ApiResult<Json<BalanceResponse>> {
    info!("GET /balance/{}", customer_id);

    let balance = state.service.get_balance(&customer_id).await?;
    Ok(Json(BalanceResponse {
        customer_id,
        balance: cents_to_units(balance),
    }))
}

fn movement_input(request: MovementRequest) -> Result<(String, Cents), AppError> {
    let (Some(customer_id), Some(amount)) = (request.customer_id, request.amount) else {
        return Err(AppError::Validation(MOVEMENT_INPUT_REQUIRED.to_string()));
    };
    let cents = cents_from_units(amount).ok_or_else(|| AppError::InvalidAmount(amount.to_string()))?;
    Ok((customer_id, cents))
}
