//! Quote API route handlers.

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use uuid::Uuid;

use crate::error::Result;
use crate::AppState;

use super::models::Region;
use super::requests::{
    CreateQuoteRequest, LineItemRequest, ListQuotesQuery, RecalculateRequest, SaveRegionRequest,
    UpdateLineItemRequest,
};
use super::responses::{QuoteDetailResponse, QuoteResponse};

/// Routes for regions and quotes, mounted under `/api`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/regions", get(list_regions).post(save_region))
        .route("/quotes", get(list_quotes).post(create_quote))
        .route("/quotes/:id", get(get_quote).delete(delete_quote))
        .route("/quotes/:id/items", post(add_line_item))
        .route(
            "/quotes/:id/items/:item_id",
            put(update_line_item).delete(remove_line_item),
        )
        .route("/quotes/:id/recalculate", post(recalculate))
        .route("/quotes/:id/send", post(send_quote))
        .route("/quotes/:id/view", post(view_quote))
        .route("/quotes/:id/accept", post(accept_quote))
        .route("/quotes/:id/decline", post(decline_quote))
        .route("/quotes/:id/revisions", post(create_revision))
}

async fn list_regions(State(state): State<AppState>) -> Result<Json<Vec<Region>>> {
    Ok(Json(state.quotes.list_regions().await?))
}

async fn save_region(
    State(state): State<AppState>,
    Json(req): Json<SaveRegionRequest>,
) -> Result<Json<Region>> {
    Ok(Json(state.quotes.save_region(req.into()).await?))
}

async fn list_quotes(
    State(state): State<AppState>,
    Query(query): Query<ListQuotesQuery>,
) -> Result<Json<Vec<QuoteResponse>>> {
    let quotes = state.quotes.list_quotes(query.status).await?;
    Ok(Json(quotes.iter().map(QuoteResponse::from).collect()))
}

async fn create_quote(
    State(state): State<AppState>,
    Json(req): Json<CreateQuoteRequest>,
) -> Result<(StatusCode, Json<QuoteDetailResponse>)> {
    let detail = state.quotes.create_quote(req.into()).await?;
    Ok((StatusCode::CREATED, Json(QuoteDetailResponse::from(&detail))))
}

async fn get_quote(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<QuoteDetailResponse>> {
    let detail = state.quotes.get_quote(id).await?;
    Ok(Json(QuoteDetailResponse::from(&detail)))
}

async fn delete_quote(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<StatusCode> {
    state.quotes.delete_quote(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn add_line_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<LineItemRequest>,
) -> Result<(StatusCode, Json<QuoteDetailResponse>)> {
    let detail = state.quotes.add_line_item(id, req.into()).await?;
    Ok((StatusCode::CREATED, Json(QuoteDetailResponse::from(&detail))))
}

async fn update_line_item(
    State(state): State<AppState>,
    Path((id, item_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<UpdateLineItemRequest>,
) -> Result<Json<QuoteDetailResponse>> {
    let detail = state.quotes.update_line_item(id, item_id, req.into()).await?;
    Ok(Json(QuoteDetailResponse::from(&detail)))
}

async fn remove_line_item(
    State(state): State<AppState>,
    Path((id, item_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<QuoteDetailResponse>> {
    let detail = state.quotes.remove_line_item(id, item_id).await?;
    Ok(Json(QuoteDetailResponse::from(&detail)))
}

/// Body is optional; an empty request recomputes from persisted items.
/// A non-empty body must parse, otherwise the request is rejected.
async fn recalculate(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Bytes,
) -> Result<Json<QuoteDetailResponse>> {
    let items = if body.iter().all(u8::is_ascii_whitespace) {
        None
    } else {
        serde_json::from_slice::<RecalculateRequest>(&body)?.into_items()
    };
    let detail = state.quotes.recalculate_totals(id, items).await?;
    Ok(Json(QuoteDetailResponse::from(&detail)))
}

async fn send_quote(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<QuoteDetailResponse>> {
    let detail = state.quotes.mark_sent(id).await?;
    Ok(Json(QuoteDetailResponse::from(&detail)))
}

async fn view_quote(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<QuoteResponse>> {
    let quote = state.quotes.mark_viewed(id).await?;
    Ok(Json(QuoteResponse::from(&quote)))
}

async fn accept_quote(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<QuoteResponse>> {
    let quote = state.quotes.mark_accepted(id).await?;
    Ok(Json(QuoteResponse::from(&quote)))
}

async fn decline_quote(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<QuoteResponse>> {
    let quote = state.quotes.mark_declined(id).await?;
    Ok(Json(QuoteResponse::from(&quote)))
}

async fn create_revision(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<QuoteDetailResponse>)> {
    let detail = state.quotes.create_revision(id).await?;
    Ok((StatusCode::CREATED, Json(QuoteDetailResponse::from(&detail))))
}
