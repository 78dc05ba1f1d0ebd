//! # Control Surface
//!
//! One resource per battle:
//!
//! | Method | Path | Body |
//! |--------|------|------|
//! | GET | `/arena/{battleId}` | |
//! | POST | `/arena/{battleId}` | `{"action": "initialize", "combatant1Ref": 1, "combatant2Ref": 2}` |
//! | POST | `/arena/{battleId}` | `{"action": "cleanup"}` |
//! | POST | `/arena/{battleId}` | `{"action": "resume"}` |
//! | POST | `/arena/{battleId}` | `{"action": "status"}` |
//!
//! Other verbs get 405 with an `Allow` header.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{any, get};
use axum::{Json, Router};
use rann_arena::{ArenaError, BattleController, SessionSnapshot};
use rann_shared::BattleId;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::error;

type AppState = Arc<BattleController>;

/// Builds the HTTP router.
#[must_use]
pub fn router(controller: Arc<BattleController>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/arena", any(missing_battle_id))
        .route("/arena/", any(missing_battle_id))
        .route("/arena/{battle_id}", get(get_battle).post(post_battle))
        .layer(TraceLayer::new_for_http())
        .with_state(controller)
}

/// An error response: `{"error": ..., "details"?: ..., "battleId"?: ...}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    error: String,
    details: Option<String>,
    battle_id: Option<BattleId>,
}

impl ApiError {
    /// 400 with a message.
    #[must_use]
    pub fn bad_request(error: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            error: error.into(),
            details: None,
            battle_id: None,
        }
    }

    /// Adds detail text.
    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Status code of this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<ArenaError> for ApiError {
    fn from(err: ArenaError) -> Self {
        let (status, error, battle_id) = match &err {
            ArenaError::NotFound(id) => (StatusCode::NOT_FOUND, "battle not found", Some(id.clone())),
            ArenaError::AlreadyActive(id) => {
                (StatusCode::BAD_REQUEST, "battle already active", Some(id.clone()))
            }
            ArenaError::NotPaused { battle_id, .. } => (
                StatusCode::BAD_REQUEST,
                "battle is not paused",
                Some(battle_id.clone()),
            ),
            ArenaError::InvalidConfig(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal server error", None)
            }
        };
        Self {
            status,
            error: error.to_string(),
            details: Some(err.to_string()),
            battle_id,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(error = %self.error, details = ?self.details, "request failed");
        }
        let mut body = json!({ "error": self.error });
        if let Some(details) = self.details {
            body["details"] = json!(details);
        }
        if let Some(battle_id) = self.battle_id {
            body["battleId"] = json!(battle_id);
        }
        (self.status, Json(body)).into_response()
    }
}

/// POST body, tagged by `action`.
#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
enum ArenaAction {
    Initialize {
        #[serde(rename = "combatant1Ref", alias = "yodha1Id", default = "first_combatant")]
        combatant1_ref: u64,
        #[serde(rename = "combatant2Ref", alias = "yodha2Id", default = "second_combatant")]
        combatant2_ref: u64,
    },
    Cleanup,
    Resume,
    Status,
}

const fn first_combatant() -> u64 {
    1
}

const fn second_combatant() -> u64 {
    2
}

#[derive(Serialize)]
struct ActionResponse {
    message: &'static str,
    #[serde(flatten)]
    state: Option<SessionSnapshot>,
}

fn parse_battle_id(raw: &str) -> Result<BattleId, ApiError> {
    BattleId::new(raw).ok_or_else(|| ApiError::bad_request("battle id is required"))
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn missing_battle_id() -> ApiError {
    ApiError::bad_request("battle id is required")
}

async fn get_battle(
    State(controller): State<AppState>,
    Path(raw): Path<String>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let battle_id = parse_battle_id(&raw)?;
    Ok(Json(controller.get(&battle_id)?))
}

async fn post_battle(
    State(controller): State<AppState>,
    Path(raw): Path<String>,
    body: Result<Json<ArenaAction>, JsonRejection>,
) -> Result<Response, ApiError> {
    let battle_id = parse_battle_id(&raw)?;
    let Json(action) = body.map_err(|rejection| {
        ApiError::bad_request(
            "invalid action, supported actions: initialize, cleanup, resume, status",
        )
        .with_details(rejection.body_text())
    })?;

    let response = match action {
        ArenaAction::Initialize {
            combatant1_ref,
            combatant2_ref,
        } => {
            let snapshot = controller.initialize(battle_id, [combatant1_ref, combatant2_ref])?;
            Json(ActionResponse {
                message: "battle initialized with automatic round execution",
                state: Some(snapshot),
            })
            .into_response()
        }
        ArenaAction::Cleanup => {
            controller.cleanup(&battle_id);
            Json(ActionResponse {
                message: "battle automation cleaned up",
                state: None,
            })
            .into_response()
        }
        ArenaAction::Resume => {
            let snapshot = controller.resume(&battle_id)?;
            Json(ActionResponse {
                message: "battle automation resumed",
                state: Some(snapshot),
            })
            .into_response()
        }
        ArenaAction::Status => Json(controller.status(&battle_id).await?).into_response(),
    };
    Ok(response)
}
