//! Route table and handlers.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use serde::Deserialize;
use tracing::debug;

use mistgate_core::transaction::{SignedTransactionRequest, SponsoredExecutionResult};
use mistgate_kit::{
    catalog::{ContentRecord, ContentSummary},
    ledger::LedgerClient,
    receipts::AccessReceipt,
};

use crate::{errors::ErrorResponse, paywall::Paywall};

/// The inbound request surface: list the catalog, fetch one item (gated
/// payload or challenge), submit a signed transaction, list receipts.
pub fn router<L>(paywall: Paywall<L>) -> Router
where
    L: LedgerClient + Send + Sync + 'static,
{
    Router::new()
        .route("/catalog", get(list_catalog::<L>))
        .route("/catalog/{id}", get(fetch_content::<L>))
        .route("/catalog/{id}/purchase", post(purchase::<L>))
        .route("/receipts/{address}", get(list_receipts::<L>))
        .with_state(paywall)
}

async fn list_catalog<L: LedgerClient>(
    State(paywall): State<Paywall<L>>,
) -> Json<Vec<ContentSummary>> {
    Json(paywall.catalog.list().iter().map(ContentSummary::from).collect())
}

#[derive(Debug, Deserialize)]
struct FetchParams {
    requester: Option<String>,
}

async fn fetch_content<L: LedgerClient>(
    State(paywall): State<Paywall<L>>,
    Path(content_id): Path<String>,
    Query(params): Query<FetchParams>,
) -> Result<Json<ContentRecord>, ErrorResponse> {
    let content = paywall
        .catalog
        .get(&content_id)
        .ok_or_else(|| ErrorResponse::not_found(&content_id))?
        .clone();

    if let Some(requester) = params.requester.as_deref() {
        let address = requester.parse().map_err(|err| {
            ErrorResponse::bad_request(format!("requester address '{requester}': {err}"))
        })?;

        if paywall.gate.check_access(&content_id, address).await? {
            debug!(content_id = %content_id, requester, "access proven; serving gated payload");
            return Ok(Json(content));
        }
    }

    let challenge = paywall
        .challenges
        .generate(&content, params.requester.as_deref())?;
    Err(ErrorResponse::payment_required(challenge))
}

async fn purchase<L: LedgerClient>(
    State(paywall): State<Paywall<L>>,
    Path(content_id): Path<String>,
    Json(request): Json<SignedTransactionRequest>,
) -> Result<Json<SponsoredExecutionResult>, ErrorResponse> {
    if paywall.catalog.get(&content_id).is_none() {
        return Err(ErrorResponse::not_found(&content_id));
    }

    let result = paywall.coordinator.sponsor_and_execute(&request).await?;
    debug!(
        content_id = %content_id,
        success = result.is_success(),
        transaction = %result.transaction,
        "purchase submission finished"
    );
    Ok(Json(result))
}

async fn list_receipts<L: LedgerClient>(
    State(paywall): State<Paywall<L>>,
    Path(address): Path<String>,
) -> Result<Json<Vec<AccessReceipt>>, ErrorResponse> {
    let owner = address
        .parse()
        .map_err(|err| ErrorResponse::bad_request(format!("address '{address}': {err}")))?;
    let receipts = paywall.receipts.list_receipts(owner).await?;
    Ok(Json(receipts))
}
