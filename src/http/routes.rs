//! HTTP route definitions

use axum::{
    extract::{Extension, Path, State},
    http::{header, Method, StatusCode},
    middleware,
    response::{IntoResponse, Json},
    routing::{delete, get, post, put},
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};
use uuid::Uuid;

use crate::app::AppState;
use crate::combat::{Combat, CombatError, CombatSnapshot, NewParticipant, TurnOutcome};
use crate::config::StoreBackend;
use crate::dice::{DiceExpr, DiceRoll};
use crate::http::middleware::{limit_mutations, require_auth, AuthenticatedUser};
use crate::util::time::uptime_secs;

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    // CORS configuration - support multiple origins (comma-separated in CLIENT_ORIGIN)
    let allowed_origins: Vec<header::HeaderValue> = state
        .config
        .client_origin
        .split(',')
        .filter_map(|s| s.trim().parse::<header::HeaderValue>().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true);

    // Public routes (no auth required)
    let public_routes = Router::new().route("/health", get(health_handler));

    // Protected routes (auth required); mutations also pass the rate limiter
    let protected_routes = Router::new()
        .route(
            "/campaigns/:campaign_id/combats",
            get(list_combats_handler).post(create_combat_handler),
        )
        .route(
            "/combats/:combat_id",
            get(get_combat_handler).delete(delete_combat_handler),
        )
        .route("/combats/:combat_id/end", post(end_combat_handler))
        .route("/combats/:combat_id/restart", post(restart_combat_handler))
        .route("/combats/:combat_id/advance", post(advance_turn_handler))
        .route("/combats/:combat_id/initiative", post(roll_initiative_handler))
        .route("/combats/:combat_id/participants", post(add_participant_handler))
        .route(
            "/combats/:combat_id/participants/:participant_id",
            delete(remove_participant_handler),
        )
        .route(
            "/combats/:combat_id/participants/:participant_id/toggle",
            post(toggle_participant_handler),
        )
        .route(
            "/combats/:combat_id/participants/:participant_id/order",
            put(set_order_handler),
        )
        .route("/dice/roll", post(dice_roll_handler))
        .layer(middleware::from_fn_with_state(state.clone(), limit_mutations))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

// ============================================================================
// Health endpoint
// ============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    store: &'static str,
    realtime_enabled: bool,
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let store = match state.config.store_backend {
        StoreBackend::Supabase => "supabase",
        StoreBackend::Memory => "memory",
    };

    Json(HealthResponse {
        status: "ok",
        uptime_secs: uptime_secs(),
        store,
        realtime_enabled: state.realtime_enabled,
    })
}

// ============================================================================
// Combat endpoints
// ============================================================================

#[derive(Deserialize)]
struct CreateCombatRequest {
    name: String,
    #[serde(default)]
    description: String,
}

#[derive(Serialize)]
struct CombatListResponse {
    combats: Vec<Combat>,
}

async fn list_combats_handler(
    State(state): State<AppState>,
    Path(campaign_id): Path<Uuid>,
) -> Result<Json<CombatListResponse>, AppError> {
    let combats = state.combats.list(campaign_id).await?;
    Ok(Json(CombatListResponse { combats }))
}

async fn create_combat_handler(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Path(campaign_id): Path<Uuid>,
    Json(req): Json<CreateCombatRequest>,
) -> Result<(StatusCode, Json<Combat>), AppError> {
    let combat = state
        .combats
        .create(auth.role, campaign_id, &req.name, &req.description)
        .await?;
    info!(user_id = %auth.user_id, combat_id = %combat.id, "Combat created via API");
    Ok((StatusCode::CREATED, Json(combat)))
}

async fn get_combat_handler(
    State(state): State<AppState>,
    Path(combat_id): Path<Uuid>,
) -> Result<Json<CombatSnapshot>, AppError> {
    Ok(Json(state.combats.get(combat_id).await?))
}

async fn delete_combat_handler(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Path(combat_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.combats.delete(auth.role, combat_id).await?;
    info!(user_id = %auth.user_id, combat_id = %combat_id, "Combat deleted via API");
    Ok(StatusCode::NO_CONTENT)
}

async fn end_combat_handler(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Path(combat_id): Path<Uuid>,
) -> Result<Json<Combat>, AppError> {
    Ok(Json(state.combats.end(auth.role, combat_id).await?))
}

async fn restart_combat_handler(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Path(combat_id): Path<Uuid>,
) -> Result<Json<CombatSnapshot>, AppError> {
    Ok(Json(state.combats.restart(auth.role, combat_id).await?))
}

async fn advance_turn_handler(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Path(combat_id): Path<Uuid>,
) -> Result<Json<TurnOutcome>, AppError> {
    Ok(Json(state.combats.advance_turn(auth.role, combat_id).await?))
}

async fn roll_initiative_handler(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Path(combat_id): Path<Uuid>,
) -> Result<Json<CombatSnapshot>, AppError> {
    Ok(Json(state.combats.roll_initiative(auth.role, combat_id).await?))
}

// ============================================================================
// Participant endpoints
// ============================================================================

async fn add_participant_handler(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Path(combat_id): Path<Uuid>,
    Json(req): Json<NewParticipant>,
) -> Result<(StatusCode, Json<CombatSnapshot>), AppError> {
    let snapshot = state
        .combats
        .add_participant(auth.role, combat_id, req)
        .await?;
    Ok((StatusCode::CREATED, Json(snapshot)))
}

async fn remove_participant_handler(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Path((combat_id, participant_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<CombatSnapshot>, AppError> {
    let snapshot = state
        .combats
        .remove_participant(auth.role, combat_id, participant_id)
        .await?;
    Ok(Json(snapshot))
}

async fn toggle_participant_handler(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Path((combat_id, participant_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<CombatSnapshot>, AppError> {
    let snapshot = state
        .combats
        .toggle_active(auth.role, combat_id, participant_id)
        .await?;
    Ok(Json(snapshot))
}

#[derive(Deserialize)]
struct SetOrderRequest {
    order_value: i32,
}

async fn set_order_handler(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthenticatedUser>,
    Path((combat_id, participant_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<SetOrderRequest>,
) -> Result<Json<CombatSnapshot>, AppError> {
    let snapshot = state
        .combats
        .set_order(auth.role, combat_id, participant_id, req.order_value)
        .await?;
    Ok(Json(snapshot))
}

// ============================================================================
// Dice endpoint
// ============================================================================

#[derive(Deserialize)]
struct DiceRollRequest {
    expression: String,
}

async fn dice_roll_handler(
    State(state): State<AppState>,
    Json(req): Json<DiceRollRequest>,
) -> Result<Json<DiceRoll>, AppError> {
    let expr: DiceExpr = req
        .expression
        .parse()
        .map_err(|e: crate::dice::DiceError| AppError::BadRequest(e.to_string()))?;
    Ok(Json(state.dice.roll(&expr)))
}

// ============================================================================
// Error handling
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Too many requests")]
    RateLimited,

    #[error("Upstream error: {0}")]
    Upstream(String),
}

impl From<CombatError> for AppError {
    fn from(err: CombatError) -> Self {
        let message = err.to_string();
        match err {
            CombatError::Validation(_) => AppError::BadRequest(message),
            CombatError::NotFound { .. } => AppError::NotFound(message),
            CombatError::Ended(_) | CombatError::EmptyActiveSet(_) | CombatError::Conflict(_) => {
                AppError::Conflict(message)
            }
            CombatError::Forbidden(_) => AppError::Forbidden(message),
            CombatError::Store(e) => {
                error!(error = %e, "Combat store failure");
                AppError::Upstream(message)
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            AppError::RateLimited => (StatusCode::TOO_MANY_REQUESTS, self.to_string()),
            AppError::Upstream(msg) => (StatusCode::BAD_GATEWAY, msg.clone()),
        };

        let body = serde_json::json!({
            "error": message
        });

        (status, Json(body)).into_response()
    }
}
