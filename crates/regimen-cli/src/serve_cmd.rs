use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tower_http::cors::CorsLayer;
use uuid::Uuid;

use regimen_core::PlanError;
use regimen_core::approval::{ApprovalOutcome, SendOutcome, TrainerDecision, approve, mark_sent};
use regimen_core::generate::{GenerateMode, PlanGenerator};
use regimen_core::intake::submit_intake;
use regimen_core::plan::PlanStructure;
use regimen_core::profile::IntakeProfile;
use regimen_core::validate::ValidationResult;
use regimen_db::models::Plan;
use regimen_db::store::PlanStore;

type AppState = Arc<PlanGenerator>;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

pub struct AppError {
    status: StatusCode,
    message: String,
    details: Option<Value>,
}

impl AppError {
    fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
            details: None,
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, msg)
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, msg)
    }

    pub fn internal(err: anyhow::Error) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, format!("{err:#}"))
    }

    fn with_details(mut self, key: &str, value: impl Serialize) -> Self {
        if let Ok(value) = serde_json::to_value(value) {
            let mut extra = serde_json::Map::new();
            extra.insert(key.to_owned(), value);
            self.details = Some(Value::Object(extra));
        }
        self
    }
}

impl From<PlanError> for AppError {
    fn from(err: PlanError) -> Self {
        let message = err.to_string();
        match err {
            PlanError::InvalidIntake(e) => {
                Self::bad_request(message).with_details("fields", &e.fields)
            }
            PlanError::ValidationFailed { violations, .. } => {
                Self::new(StatusCode::UNPROCESSABLE_ENTITY, message)
                    .with_details("violations", &violations)
            }
            PlanError::IllegalTransition { .. } | PlanError::GenerationInProgress(_) => {
                Self::new(StatusCode::CONFLICT, message)
            }
            PlanError::NotFound { .. } => Self::not_found(message),
            PlanError::Store(e) => Self::internal(e),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let mut body = serde_json::json!({ "error": self.message });
        if let (Some(Value::Object(extra)), Some(obj)) = (self.details, body.as_object_mut()) {
            obj.extend(extra);
        }
        (self.status, Json(body)).into_response()
    }
}

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct IntakeRequest {
    #[serde(default)]
    pub client_ref: Option<String>,
    pub answers: Value,
}

#[derive(Debug, Serialize)]
pub struct IntakeResponse {
    pub intake_id: Uuid,
    pub profile: IntakeProfile,
}

/// Either a stored intake id or a fresh set of answers to store first.
#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    #[serde(default)]
    pub intake_id: Option<Uuid>,
    #[serde(default)]
    pub intake_override: Option<Value>,
    #[serde(default)]
    pub client_ref: Option<String>,
    #[serde(default)]
    pub regenerate: bool,
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub plan: Plan,
    pub structure: PlanStructure,
    pub validation: ValidationResult,
    pub reused: bool,
}

#[derive(Debug, Serialize)]
pub struct TransitionResponse {
    pub outcome: &'static str,
    pub plan: Plan,
}

#[derive(Debug, Deserialize)]
pub struct SentRequest {
    pub channel: String,
}

#[derive(Debug, Serialize)]
pub struct CatalogResponse {
    pub version: String,
    pub exercises: usize,
    pub patterns: usize,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn build_router(generator: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/catalog", get(catalog_info))
        .route("/api/intake", post(create_intake))
        .route("/api/generate-plan", post(generate_plan))
        .route("/api/plans", get(list_plans))
        .route("/api/plans/{id}", get(get_plan))
        .route("/api/plans/{id}/approve", post(approve_plan))
        .route("/api/plans/{id}/sent", post(mark_plan_sent))
        .layer(CorsLayer::permissive())
        .with_state(generator)
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub async fn run_serve(generator: AppState, bind: &str, port: u16) -> Result<()> {
    let app = build_router(generator);
    let addr: SocketAddr = format!("{bind}:{port}").parse()?;
    tracing::info!("regimen serve listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("regimen serve shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn health() -> Json<Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn catalog_info(State(generator): State<AppState>) -> Json<CatalogResponse> {
    let catalog = generator.catalog();
    Json(CatalogResponse {
        version: catalog.version().to_owned(),
        exercises: catalog.len(),
        patterns: catalog.patterns().len(),
    })
}

async fn create_intake(
    State(generator): State<AppState>,
    Json(req): Json<IntakeRequest>,
) -> Result<axum::response::Response, AppError> {
    let (intake, profile) =
        submit_intake(generator.store(), req.client_ref.as_deref(), &req.answers).await?;
    let body = IntakeResponse {
        intake_id: intake.id,
        profile,
    };
    Ok((StatusCode::CREATED, Json(body)).into_response())
}

async fn generate_plan(
    State(generator): State<AppState>,
    Json(req): Json<GenerateRequest>,
) -> Result<axum::response::Response, AppError> {
    let intake_id = match (req.intake_id, req.intake_override) {
        (_, Some(answers)) => {
            let (intake, _) =
                submit_intake(generator.store(), req.client_ref.as_deref(), &answers).await?;
            intake.id
        }
        (Some(id), None) => id,
        (None, None) => {
            return Err(AppError::bad_request(
                "request needs an intake_id or an intake_override",
            ));
        }
    };

    let mode = if req.regenerate {
        GenerateMode::Regenerate
    } else {
        GenerateMode::Reuse
    };
    let outcome = generator.generate(intake_id, mode).await?;
    let status = if outcome.reused {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };

    let body = GenerateResponse {
        plan: outcome.plan,
        structure: outcome.structure,
        validation: outcome.validation,
        reused: outcome.reused,
    };
    Ok((status, Json(body)).into_response())
}

async fn list_plans(State(generator): State<AppState>) -> Result<Json<Vec<Plan>>, AppError> {
    let plans = generator
        .store()
        .list_plans()
        .await
        .map_err(AppError::internal)?;
    Ok(Json(plans))
}

async fn get_plan(
    State(generator): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Plan>, AppError> {
    let plan = generator
        .store()
        .get_plan(id)
        .await
        .map_err(AppError::internal)?
        .ok_or_else(|| AppError::not_found(format!("plan {id} not found")))?;
    Ok(Json(plan))
}

async fn approve_plan(
    State(generator): State<AppState>,
    Path(id): Path<Uuid>,
    Json(decision): Json<TrainerDecision>,
) -> Result<Json<TransitionResponse>, AppError> {
    let response = match approve(generator.store(), id, &decision).await? {
        ApprovalOutcome::Approved(plan) => TransitionResponse {
            outcome: "approved",
            plan,
        },
        ApprovalOutcome::Declined(plan) => TransitionResponse {
            outcome: "declined",
            plan,
        },
    };
    Ok(Json(response))
}

async fn mark_plan_sent(
    State(generator): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<SentRequest>,
) -> Result<Json<TransitionResponse>, AppError> {
    let response = match mark_sent(generator.store(), id, &req.channel).await? {
        SendOutcome::Sent(plan) => TransitionResponse {
            outcome: "sent",
            plan,
        },
        SendOutcome::AlreadySent(plan) => TransitionResponse {
            outcome: "already_sent",
            plan,
        },
    };
    Ok(Json(response))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
