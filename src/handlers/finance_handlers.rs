use axum::extract::State;
use tracing::{debug, instrument};

use crate::auth::AuthUser;
use crate::dto::FinanceQuery;
use crate::errors::ApiError;
use crate::extract::{Json, Query};
use crate::state::AppState;
use crate::views::{self, FinanceSummary};
use crate::workspace::Transaction;

/// Handler totalling the workspace finances database
///
/// This function handles GET requests to `/finances/summary`. With
/// `?month=YYYY-MM` only transactions dated in that month count. Pages
/// without an amount are ignored.
///
/// ### Errors
///
/// * 400 for a malformed month
/// * 503 without a workspace token or finances database
/// * 502 if the database query fails
#[instrument(skip(state, _user))]
pub async fn finance_summary_handler(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(query): Query<FinanceQuery>,
) -> Result<Json<FinanceSummary>, ApiError> {
    let month = match query.month.as_deref() {
        Some(value) => Some(
            views::parse_month(value).ok_or_else(|| ApiError::BadRequest(format!("invalid month: {}", value)))?,
        ),
        None => None,
    };

    let workspace = state.services.workspace()?;
    let database_id = state
        .config
        .notion_finances_db
        .as_deref()
        .ok_or_else(|| ApiError::NotConfigured("Notion finances database".to_string()))?;

    let pages = workspace
        .query_database(database_id, None)
        .await
        .map_err(|e| ApiError::Upstream(e.to_string()))?;

    let mapping = state.mapping();
    let transactions: Vec<Transaction> = pages.iter().filter_map(|page| mapping.transaction_from_page(page)).collect();
    debug!("Read {} transactions from {} pages", transactions.len(), pages.len());

    Ok(Json(views::summarize_transactions(&transactions, month)))
}
