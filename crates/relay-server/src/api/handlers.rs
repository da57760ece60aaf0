//! HTTP request handlers.

use super::types::{BalanceResponse, HealthResponse, ProviderInfo, QueryRequest, QueryResponse};
use super::AppState;
use crate::coordinator::CompletionRequest;
use crate::error::RelayError;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use tracing::{debug, info};

/// Health check endpoint.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let providers = state
        .relay
        .providers()
        .backends()
        .iter()
        .map(|backend| ProviderInfo {
            name: backend.name().to_string(),
            model: backend.model().to_string(),
        })
        .collect();

    Json(HealthResponse {
        status: "ok".to_string(),
        providers,
        usage_mode: state.relay.settings().usage_mode,
    })
}

/// Complete a prompt for an account holding at least one credit.
pub async fn query_ai(
    State(state): State<AppState>,
    payload: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<QueryResponse>, RelayError> {
    let Json(request) = payload.map_err(|rejection| {
        debug!(
            status = %rejection.status(),
            error = %rejection.body_text(),
            "Rejected request body"
        );
        RelayError::InvalidInput(
            "Request body must be JSON with string query and ethAddress fields.".to_string(),
        )
    })?;

    let (Some(query), Some(eth_address)) = (request.query, request.eth_address) else {
        return Err(RelayError::InvalidInput(
            "Missing query or ethAddress in request body.".to_string(),
        ));
    };

    info!(account = %eth_address, "Query received");

    let completion = state
        .relay
        .handle(CompletionRequest::new(eth_address, query))
        .await?;

    Ok(Json(QueryResponse {
        result: completion.text,
    }))
}

/// Remaining credits for an address.
pub async fn get_balance(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<BalanceResponse>, RelayError> {
    let (account, credits) = state.relay.balance(&address).await?;

    Ok(Json(BalanceResponse {
        address: account.to_string(),
        credits,
    }))
}
