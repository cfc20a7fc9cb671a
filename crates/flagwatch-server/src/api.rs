use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::Method,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use flagwatch_core::{ActorRole, SessionManager, Snapshot};
use flagwatch_shared::constants::DEFAULT_TOP_K;
use flagwatch_source::NetworkConfig;

use crate::error::ServerError;
use crate::views;

#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionManager>,
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/networks", get(list_networks))
        .route("/status", get(session_status))
        .route("/flags", get(flags))
        .route("/stats/daily", get(daily_stats))
        .route("/stats/alignment", get(alignment_stats))
        .route("/stats/votes", get(vote_stats))
        .route("/rankings/:role", get(rankings))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

#[derive(Serialize)]
struct NetworkEntry {
    name: String,
    title: String,
    hub_url: String,
}

#[derive(Serialize)]
struct NetworksResponse {
    default: String,
    active: Option<String>,
    networks: Vec<NetworkEntry>,
}

#[derive(Deserialize)]
struct NetworkQuery {
    network: Option<String>,
}

#[derive(Deserialize)]
struct RankingQuery {
    network: Option<String>,
    k: Option<usize>,
}

/// Resolve the selection parameter, switching sessions if it names another
/// network, and return the active snapshot with its network settings.
async fn current(
    state: &AppState,
    network: Option<&str>,
) -> Result<(Arc<Snapshot>, NetworkConfig), ServerError> {
    let snapshot = state.sessions.select(network).await?;
    let registry = state.sessions.registry();
    let config = registry
        .get(&snapshot.network)
        .unwrap_or_else(|| registry.default_network())
        .clone();
    Ok((snapshot, config))
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn list_networks(State(state): State<AppState>) -> Json<NetworksResponse> {
    let registry = state.sessions.registry();
    Json(NetworksResponse {
        default: registry.default_network().name.clone(),
        active: state.sessions.active_network().await,
        networks: registry
            .iter()
            .map(|n| NetworkEntry {
                name: n.name.clone(),
                title: n.title.clone(),
                hub_url: n.hub_url.clone(),
            })
            .collect(),
    })
}

async fn session_status(
    State(state): State<AppState>,
    Query(q): Query<NetworkQuery>,
) -> Result<Response, ServerError> {
    let (snapshot, network) = current(&state, q.network.as_deref()).await?;
    Ok(Json(views::status(&snapshot, &network)).into_response())
}

async fn flags(
    State(state): State<AppState>,
    Query(q): Query<NetworkQuery>,
) -> Result<Json<Vec<views::FlagRow>>, ServerError> {
    let (snapshot, network) = current(&state, q.network.as_deref()).await?;
    Ok(Json(views::flag_rows(&snapshot, &network)))
}

async fn daily_stats(
    State(state): State<AppState>,
    Query(q): Query<NetworkQuery>,
) -> Result<Json<views::DailyResponse>, ServerError> {
    let (snapshot, _) = current(&state, q.network.as_deref()).await?;
    Ok(Json(views::daily(&snapshot)))
}

async fn alignment_stats(
    State(state): State<AppState>,
    Query(q): Query<NetworkQuery>,
) -> Result<Json<Vec<views::AlignmentPoint>>, ServerError> {
    let (snapshot, _) = current(&state, q.network.as_deref()).await?;
    Ok(Json(views::alignment(&snapshot)))
}

async fn vote_stats(
    State(state): State<AppState>,
    Query(q): Query<NetworkQuery>,
) -> Result<Json<Vec<views::VotePoint>>, ServerError> {
    let (snapshot, _) = current(&state, q.network.as_deref()).await?;
    Ok(Json(views::votes(&snapshot)))
}

async fn rankings(
    State(state): State<AppState>,
    Path(role): Path<String>,
    Query(q): Query<RankingQuery>,
) -> Result<Json<views::RankingResponse>, ServerError> {
    let role = ActorRole::parse(&role)
        .ok_or_else(|| ServerError::NotFound(format!("Unknown ranking role: {role}")))?;
    let k = q.k.unwrap_or(DEFAULT_TOP_K);
    if k == 0 {
        return Err(ServerError::BadRequest("k must be at least 1".into()));
    }
    let (snapshot, network) = current(&state, q.network.as_deref()).await?;
    Ok(Json(views::ranking(&snapshot, &network, role, k)))
}

pub async fn serve(state: AppState, addr: std::net::SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);

    info!(addr = %addr, "Starting HTTP API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
