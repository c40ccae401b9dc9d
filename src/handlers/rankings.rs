use crate::error::AppError;
use crate::middleware::{CurrentAccount, LenientJson};
use crate::router::AppState;
use crate::types::ranking::{AddRankingRequest, RankingEntry, RankingKind, ReorderRequest};

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde_json::{Value, json};
use tracing::info;

/// GET /api/{kind}
pub async fn list(
    kind: RankingKind,
    State(state): State<AppState>,
    CurrentAccount(account): CurrentAccount,
) -> Result<Json<Vec<RankingEntry>>, AppError> {
    Ok(Json(state.rankings.list(account.id, kind).await?))
}

/// POST /api/{kind}
pub async fn add(
    kind: RankingKind,
    State(state): State<AppState>,
    CurrentAccount(account): CurrentAccount,
    LenientJson(body): LenientJson<AddRankingRequest>,
) -> Result<(StatusCode, Json<RankingEntry>), AppError> {
    let name = body.name.unwrap_or_default();
    let entry = state.rankings.add(account.id, kind, &name).await?;
    info!(
        account_id = account.id,
        %kind,
        entry_id = entry.id,
        rank_position = entry.rank_position,
        "ranking entry added"
    );
    Ok((StatusCode::CREATED, Json(entry)))
}

/// PUT /api/{kind}/reorder
pub async fn reorder(
    kind: RankingKind,
    State(state): State<AppState>,
    CurrentAccount(account): CurrentAccount,
    LenientJson(body): LenientJson<ReorderRequest>,
) -> Result<Json<Value>, AppError> {
    let order = body
        .into_ids()
        .ok_or_else(|| AppError::Validation("Order list is required".to_string()))?;
    state.rankings.reorder(account.id, kind, &order).await?;
    info!(account_id = account.id, %kind, count = order.len(), "ranking reordered");
    Ok(Json(json!({ "ok": true })))
}

/// DELETE /api/{kind}/{id}
pub async fn remove(
    kind: RankingKind,
    State(state): State<AppState>,
    CurrentAccount(account): CurrentAccount,
    Path(raw_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let id = raw_id
        .parse::<i64>()
        .map_err(|_| AppError::NotFound("Not found".to_string()))?;
    state.rankings.remove(account.id, kind, id).await?;
    info!(account_id = account.id, %kind, entry_id = id, "ranking entry removed");
    Ok(Json(json!({ "ok": true })))
}
