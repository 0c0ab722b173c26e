use axum::{extract::State, Json};

use crate::history::aggregator::{HistoryAggregator, HistoryReport};
use crate::identity::AuthUser;
use crate::state::AppState;

/// GET /api/v1/history
/// Load failures are reported inside the body (`status: "error"`), not as an HTTP error.
pub async fn handle_get_history(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Json<HistoryReport> {
    let aggregator = HistoryAggregator::new(state.store.clone());
    Json(aggregator.load_history(&user).await)
}
