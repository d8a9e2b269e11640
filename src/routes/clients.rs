//! Client resource handlers.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::Utc;
use tracing::{debug, info};

use super::extract::{ApiJson, ApiPath, ApiQuery, CpfParams, IncomeParams, PageParams};
use super::AppState;
use crate::db::{ClientFilter, UpdateOutcome};
use crate::error::{ApiError, ApiResult};
use crate::models::{Client, ClientPayload, Page};

async fn find_page(
    state: &AppState,
    filter: ClientFilter,
    params: &PageParams,
) -> ApiResult<Json<Page<Client>>> {
    let request = params.resolve(&state.paging)?;
    let page = state.store.find_page(&filter, &request).await?;
    debug!(
        ?filter,
        page = request.page,
        size = request.size,
        returned = page.number_of_elements,
        "Listed clients"
    );
    Ok(Json(page))
}

/// GET /clients - One page of all clients
pub async fn list_clients(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<PageParams>,
) -> ApiResult<Json<Page<Client>>> {
    find_page(&state, ClientFilter::All, &params).await
}

/// GET /clients/{id}
pub async fn get_client(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<Client>> {
    match state.store.find_by_id(id).await? {
        Some(client) => Ok(Json(client)),
        None => {
            debug!(client_id = id, "Client not found");
            Err(ApiError::client_not_found(id))
        }
    }
}

/// POST /clients
pub async fn create_client(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<ClientPayload>,
) -> ApiResult<impl IntoResponse> {
    let new_client = payload.into_new_client(Utc::now()).map_err(|errors| {
        debug!(?errors, "Rejected client");
        ApiError::validation(errors)
    })?;

    let client = state.store.insert(new_client).await?;
    info!(client_id = client.id, "Client created");

    Ok((StatusCode::CREATED, Json(client)))
}

/// PUT /clients/{id} - Fields present in the body replace the stored ones
pub async fn update_client(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(payload): ApiJson<ClientPayload>,
) -> ApiResult<Json<Client>> {
    match state.store.update_with(id, payload, Utc::now()).await? {
        UpdateOutcome::Updated(client) => {
            info!(client_id = id, "Client updated");
            Ok(Json(client))
        }
        UpdateOutcome::NotFound => {
            debug!(client_id = id, "Client not found for update");
            Err(ApiError::client_not_found(id))
        }
        UpdateOutcome::Rejected(errors) => {
            debug!(client_id = id, ?errors, "Rejected client update");
            Err(ApiError::validation(errors))
        }
    }
}

/// DELETE /clients/{id}
pub async fn delete_client(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<StatusCode> {
    if state.store.delete(id).await? {
        info!(client_id = id, "Client deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        debug!(client_id = id, "Client not found for delete");
        Err(ApiError::client_not_found(id))
    }
}

/// GET /clients/incomeGreaterThan?income=
pub async fn income_greater_than(
    State(state): State<AppState>,
    ApiQuery(income): ApiQuery<IncomeParams>,
    ApiQuery(params): ApiQuery<PageParams>,
) -> ApiResult<Json<Page<Client>>> {
    find_page(&state, ClientFilter::IncomeGreaterThan(income.income), &params).await
}

/// GET /clients/income?income=
pub async fn income_equals(
    State(state): State<AppState>,
    ApiQuery(income): ApiQuery<IncomeParams>,
    ApiQuery(params): ApiQuery<PageParams>,
) -> ApiResult<Json<Page<Client>>> {
    find_page(&state, ClientFilter::IncomeEquals(income.income), &params).await
}

/// GET /clients/cpf?cpf=
pub async fn find_by_cpf(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<CpfParams>,
) -> ApiResult<Json<Client>> {
    state
        .store
        .find_by_cpf(params.cpf.trim())
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("No client with CPF {}", params.cpf)))
}

/// GET /clients/cpfLike?cpf=
pub async fn cpf_like(
    State(state): State<AppState>,
    ApiQuery(cpf): ApiQuery<CpfParams>,
    ApiQuery(params): ApiQuery<PageParams>,
) -> ApiResult<Json<Page<Client>>> {
    let fragment = cpf.cpf.trim().to_string();
    find_page(&state, ClientFilter::CpfContains(fragment), &params).await
}
