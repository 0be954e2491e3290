//! HTTP layer over the book.
//!
//! All calls go through one `tokio::sync::Mutex` around the book, so operations are applied
//! one at a time exactly as the engine expects. The caller identity is taken from the
//! `x-caller-id` header, which an upstream gateway sets after authenticating the request.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::Json,
    routing::{get, post, put},
    Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::betting::BetId;
use crate::book::Book;
use crate::error::{BookError, BookResult};
use crate::ledger::AccountId;
use crate::odds::BetType;
use crate::persistence;
use crate::race::RaceId;
use crate::store::MemoryStore;

pub const CALLER_HEADER: &str = "x-caller-id";

type ApiError = (StatusCode, Json<Value>);
type ApiResult = Result<Json<Value>, ApiError>;

#[derive(Clone)]
pub struct AppState {
    pub book: Arc<Mutex<Book>>,
    /// Rewritten after every successful mutation when set
    pub snapshot_path: Option<PathBuf>,
}

impl AppState {
    pub fn new(book: Book, snapshot_path: Option<PathBuf>) -> Self {
        Self {
            book: Arc::new(Mutex::new(book)),
            snapshot_path,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AmountRequest {
    /// Signed on the wire so negative amounts are reported as InvalidAmount
    pub amount: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreateRaceRequest {
    pub name: String,
    pub racers: Vec<String>,
    pub duration_blocks: u64,
    /// Reference height for the race start; defaults to the current UNIX time
    pub start_height: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct PlaceBetRequest {
    pub racer_index: u32,
    pub amount: u64,
    pub bet_type: BetType,
}

#[derive(Debug, Deserialize)]
pub struct FinishRaceRequest {
    pub final_positions: Vec<u32>,
}

#[derive(Debug, Deserialize)]
pub struct HouseEdgeRequest {
    pub house_edge_bps: u32,
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        // Ledger
        .route("/balances/:account", get(get_balance))
        .route("/deposit", post(deposit))
        .route("/withdraw", post(withdraw))
        // Races
        .route("/races", post(create_race))
        .route("/races/:race_id", get(get_race))
        .route("/races/:race_id/start", post(start_race))
        .route("/races/:race_id/cancel", post(cancel_race))
        .route("/races/:race_id/finish", post(finish_race))
        .route("/races/:race_id/results", get(get_race_results))
        .route("/races/:race_id/racers/:index", get(get_racer))
        .route("/races/:race_id/racers/:index/odds", get(get_current_odds))
        // Bets
        .route("/races/:race_id/bets", post(place_bet))
        .route("/races/:race_id/bets/:account", get(get_user_bets))
        .route("/bets/:bet_id", get(get_bet))
        .route("/bets/:bet_id/claim", post(claim_winnings))
        // Admin
        .route("/admin/house-edge", put(set_house_edge))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

fn book_error(e: BookError) -> ApiError {
    let status = match e {
        BookError::NotOwner | BookError::Unauthorized => StatusCode::FORBIDDEN,
        BookError::BetNotFound | BookError::RaceNotFound => StatusCode::NOT_FOUND,
        BookError::RaceEnded
        | BookError::RaceNotRunning
        | BookError::RaceNotEnded
        | BookError::RaceAlreadyStarted
        | BookError::AlreadyClaimed => StatusCode::CONFLICT,
        BookError::InsufficientFunds
        | BookError::InvalidAmount
        | BookError::InvalidBet
        | BookError::InvalidRacerSet
        | BookError::InvalidRacer => StatusCode::UNPROCESSABLE_ENTITY,
    };
    (
        status,
        Json(json!({
            "error": e.as_str(),
            "code": e.code(),
            "message": e.to_string(),
        })),
    )
}

fn caller(headers: &HeaderMap) -> Result<AccountId, ApiError> {
    headers
        .get(CALLER_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(AccountId::from)
        .ok_or_else(|| {
            (
                StatusCode::UNAUTHORIZED,
                Json(json!({"error": "missing caller identity"})),
            )
        })
}

fn reference_height() -> u64 {
    u64::try_from(Utc::now().timestamp()).unwrap_or(0)
}

fn wire_amount(amount: i64) -> Result<u64, ApiError> {
    u64::try_from(amount).map_err(|_| book_error(BookError::InvalidAmount))
}

/// Apply one mutation under the book lock and persist the result before releasing it.
/// If the snapshot cannot be written the book is rolled back, so a 500 never leaves a change behind.
async fn mutate<T>(
    state: &AppState,
    op: impl FnOnce(&mut Book) -> BookResult<T>,
) -> Result<T, ApiError> {
    let mut book = state.book.lock().await;
    let Some(path) = &state.snapshot_path else {
        return op(&mut *book).map_err(book_error);
    };

    let before = book.store().snapshot();
    let value = op(&mut *book).map_err(book_error)?;

    if let Err(e) = persistence::save_snapshot(path, &book.store().snapshot()).await {
        error!("Snapshot error, rolling back: {:#}", e);
        book.store = MemoryStore::from_snapshot(before);
        return Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": "Internal server error"})),
        ));
    }
    Ok(value)
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "race-book"
    }))
}

async fn get_balance(State(state): State<AppState>, Path(account): Path<String>) -> Json<Value> {
    let account = AccountId::from(account);
    let balance = state.book.lock().await.balance_of(&account);
    Json(json!({ "account": account, "balance": balance }))
}

async fn deposit(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<AmountRequest>,
) -> ApiResult {
    let caller = caller(&headers)?;
    let amount = wire_amount(req.amount)?;
    let (deposited, balance) = mutate(&state, |book| {
        let deposited = book.deposit(&caller, amount)?;
        Ok((deposited, book.balance_of(&caller)))
    })
    .await?;
    Ok(Json(json!({ "amount": deposited, "balance": balance })))
}

async fn withdraw(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<AmountRequest>,
) -> ApiResult {
    let caller = caller(&headers)?;
    let amount = wire_amount(req.amount)?;
    let (withdrawn, balance) = mutate(&state, |book| {
        let withdrawn = book.withdraw(&caller, amount)?;
        Ok((withdrawn, book.balance_of(&caller)))
    })
    .await?;
    Ok(Json(json!({ "amount": withdrawn, "balance": balance })))
}

async fn create_race(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CreateRaceRequest>,
) -> ApiResult {
    let caller = caller(&headers)?;
    let now = req.start_height.unwrap_or_else(reference_height);
    let race_id = mutate(&state, |book| {
        book.create_race(&caller, &req.name, &req.racers, req.duration_blocks, now)
    })
    .await?;
    Ok(Json(json!({ "race_id": race_id })))
}

async fn get_race(State(state): State<AppState>, Path(race_id): Path<RaceId>) -> Json<Value> {
    let race = state.book.lock().await.race_of(race_id);
    Json(json!(race))
}

async fn start_race(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(race_id): Path<RaceId>,
) -> ApiResult {
    let caller = caller(&headers)?;
    mutate(&state, |book| book.start_race(&caller, race_id)).await?;
    Ok(Json(json!({ "race_id": race_id, "status": "running" })))
}

async fn cancel_race(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(race_id): Path<RaceId>,
) -> ApiResult {
    let caller = caller(&headers)?;
    mutate(&state, |book| book.cancel_race(&caller, race_id)).await?;
    Ok(Json(json!({ "race_id": race_id, "status": "cancelled" })))
}

async fn finish_race(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(race_id): Path<RaceId>,
    Json(req): Json<FinishRaceRequest>,
) -> ApiResult {
    let caller = caller(&headers)?;
    let race = mutate(&state, |book| {
        book.finish_race(&caller, race_id, &req.final_positions)?;
        Ok(book.race_of(race_id))
    })
    .await?;
    Ok(Json(json!(race)))
}

async fn get_race_results(
    State(state): State<AppState>,
    Path(race_id): Path<RaceId>,
) -> Json<Value> {
    let results = state.book.lock().await.race_results_of(race_id);
    Json(json!({ "race_id": race_id, "final_positions": results }))
}

async fn get_racer(
    State(state): State<AppState>,
    Path((race_id, index)): Path<(RaceId, u32)>,
) -> Json<Value> {
    let racer = state.book.lock().await.racer_of(race_id, index);
    Json(json!(racer))
}

async fn get_current_odds(
    State(state): State<AppState>,
    Path((race_id, index)): Path<(RaceId, u32)>,
) -> Json<Value> {
    let odds = state.book.lock().await.current_odds_of(race_id, index);
    Json(json!({ "race_id": race_id, "racer_index": index, "odds": odds }))
}

async fn place_bet(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(race_id): Path<RaceId>,
    Json(req): Json<PlaceBetRequest>,
) -> ApiResult {
    let caller = caller(&headers)?;
    let bet = mutate(&state, |book| {
        let bet_id = book.place_bet(&caller, race_id, req.racer_index, req.amount, req.bet_type)?;
        Ok(book.bet_of(bet_id))
    })
    .await?;
    Ok(Json(json!(bet)))
}

async fn get_user_bets(
    State(state): State<AppState>,
    Path((race_id, account)): Path<(RaceId, String)>,
) -> Json<Value> {
    let account = AccountId::from(account);
    let bet_ids = state.book.lock().await.user_bets_of(&account, race_id);
    Json(json!({ "account": account, "race_id": race_id, "bet_ids": bet_ids }))
}

async fn get_bet(State(state): State<AppState>, Path(bet_id): Path<BetId>) -> Json<Value> {
    let bet = state.book.lock().await.bet_of(bet_id);
    Json(json!(bet))
}

async fn claim_winnings(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(bet_id): Path<BetId>,
) -> ApiResult {
    let caller = caller(&headers)?;
    let (payout, balance) = mutate(&state, |book| {
        let payout = book.claim_winnings(&caller, bet_id)?;
        Ok((payout, book.balance_of(&caller)))
    })
    .await?;
    Ok(Json(json!({ "bet_id": bet_id, "payout": payout, "balance": balance })))
}

async fn set_house_edge(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<HouseEdgeRequest>,
) -> ApiResult {
    let caller = caller(&headers)?;
    let house_edge = mutate(&state, |book| {
        book.set_house_edge(&caller, req.house_edge_bps)?;
        Ok(book.house_edge())
    })
    .await?;
    Ok(Json(json!({ "house_edge_bps": house_edge })))
}
