use super::http_auth::is_admin_authorized;
use super::http_errors::{map_create_employer_error, map_quota_error};
use super::http_parse::{parse_count, parse_plan, parse_resource};
use super::http_types::{
    ChangePlanRequest, CheckQuotaRequest, CreateEmployerRequest, EmployerResponse, HealthResponse,
    UsageResponse,
};
use super::state::AppState;
use crate::domain::{self, Employer, PlanFeatures, SubscriptionPlan};
use crate::infrastructure::EmployerRepository;
use axum::{
    extract::{Path, State},
    http::{header::HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;
use uuid::Uuid;
use validator::Validate;

type JsonResponse = (StatusCode, Json<serde_json::Value>);

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/plans", get(list_plans))
        .route("/plans/:plan", get(get_plan))
        .route("/quota/check", post(check_quota))
        .route("/employers", post(create_employer))
        .route("/employers/:id", get(get_employer))
        .route("/employers/:id/plan", put(change_plan))
        .route("/employers/:id/quota", get(quota_status))
        .route("/employers/:id/quota/:resource", get(preview_quota))
        .route("/employers/:id/quota/:resource/consume", post(consume_quota))
        .route("/employers/:id/quota/:resource/release", post(release_quota))
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn into_json(response: (StatusCode, serde_json::Value)) -> JsonResponse {
    (response.0, Json(response.1))
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health_check,
        list_plans,
        get_plan,
        check_quota,
        create_employer,
        get_employer,
        change_plan,
        quota_status,
        preview_quota,
        consume_quota,
        release_quota,
    ),
    components(
        schemas(
            HealthResponse,
            CreateEmployerRequest,
            ChangePlanRequest,
            CheckQuotaRequest,
            EmployerResponse,
            UsageResponse,
        )
    ),
    tags(
        (name = "Health", description = "Health check endpoints"),
        (name = "Plans", description = "Subscription plan catalog and stateless admission checks"),
        (name = "Employers", description = "Employer accounts and plan assignment"),
        (name = "Quota", description = "Per-employer usage and admission control"),
    ),
    info(
        title = "PintuKerja Quota API",
        version = "0.1.0",
        description = "Subscription plan quotas and admission control for job postings, featured and urgent listings, and CV downloads",
        license(name = "MIT")
    )
)]
struct ApiDoc;

/// Health check endpoint
///
/// Verifies database connectivity and returns service health status.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
        (status = 503, description = "Service is unhealthy", body = HealthResponse)
    )
)]
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    match sqlx::query("SELECT 1").fetch_one(&state.pool).await {
        Ok(_) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "healthy".to_string(),
                error: None,
            }),
        ),
        Err(e) => {
            error!(error = %e, "Health check failed: DB connectivity issue");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "unhealthy".to_string(),
                    error: Some("Database connectivity failed".to_string()),
                }),
            )
        }
    }
}

#[utoipa::path(
    get,
    path = "/plans",
    tag = "Plans",
    responses((status = 200, description = "All subscription plans", body = Object))
)]
async fn list_plans() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!(PlanFeatures::all())))
}

#[utoipa::path(
    get,
    path = "/plans/{plan}",
    tag = "Plans",
    params(("plan" = String, Path, description = "Plan name, e.g. starter")),
    responses(
        (status = 200, description = "Plan features", body = Object),
        (status = 400, description = "Unknown plan", body = Object)
    )
)]
async fn get_plan(Path(plan): Path<String>) -> impl IntoResponse {
    match parse_plan(&plan) {
        Ok(plan) => (StatusCode::OK, Json(serde_json::json!(plan.features()))),
        Err(e) => into_json(e),
    }
}

/// Stateless admission check
///
/// Runs the plan rules against a caller-supplied count without touching stored usage.
#[utoipa::path(
    post,
    path = "/quota/check",
    tag = "Plans",
    request_body = CheckQuotaRequest,
    responses(
        (status = 200, description = "Admission decision", body = Object),
        (status = 400, description = "Unknown plan or resource, or negative count", body = Object)
    )
)]
async fn check_quota(Json(req): Json<CheckQuotaRequest>) -> impl IntoResponse {
    let plan = match parse_plan(&req.plan) {
        Ok(p) => p,
        Err(e) => return into_json(e),
    };
    let resource = match parse_resource(&req.resource) {
        Ok(r) => r,
        Err(e) => return into_json(e),
    };
    let current = match parse_count(req.current_count) {
        Ok(c) => c,
        Err(e) => return into_json(e),
    };

    let admission = domain::check(plan, resource, current);
    (StatusCode::OK, Json(serde_json::json!(admission)))
}

#[utoipa::path(
    post,
    path = "/employers",
    tag = "Employers",
    request_body = CreateEmployerRequest,
    responses(
        (status = 201, description = "Employer created", body = EmployerResponse),
        (status = 400, description = "Invalid request", body = Object),
        (status = 409, description = "Employer already exists", body = Object),
        (status = 500, description = "Failed to create employer", body = Object)
    )
)]
async fn create_employer(
    State(state): State<AppState>,
    Json(req): Json<CreateEmployerRequest>,
) -> impl IntoResponse {
    if let Err(errors) = req.validate() {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": "Invalid employer", "details": errors })),
        );
    }

    let plan = match req.plan.as_deref() {
        Some(p) => match parse_plan(p) {
            Ok(plan) => plan,
            Err(e) => return into_json(e),
        },
        None => SubscriptionPlan::default(),
    };

    let employer = Employer::new(req.external_id, req.company_name, plan);
    if let Err(e) = state.employer_repo.create(&employer).await {
        error!(error = %e, "Failed to create employer");
        return into_json(map_create_employer_error(&e));
    }

    info!(employer_id = %employer.id, plan = %employer.plan, "Employer created");
    (
        StatusCode::CREATED,
        Json(serde_json::json!(EmployerResponse::from(employer))),
    )
}

#[utoipa::path(
    get,
    path = "/employers/{id}",
    tag = "Employers",
    params(("id" = Uuid, Path, description = "Employer ID")),
    responses(
        (status = 200, description = "Employer found", body = EmployerResponse),
        (status = 404, description = "Employer not found", body = Object)
    )
)]
async fn get_employer(State(state): State<AppState>, Path(id): Path<Uuid>) -> impl IntoResponse {
    match state.quota.get_employer(id).await {
        Ok(employer) => (
            StatusCode::OK,
            Json(serde_json::json!(EmployerResponse::from(employer))),
        ),
        Err(e) => into_json(map_quota_error(&e)),
    }
}

/// Change an employer's plan
///
/// Called by the billing flow after a successful payment or downgrade.
#[utoipa::path(
    put,
    path = "/employers/{id}/plan",
    tag = "Employers",
    params(("id" = Uuid, Path, description = "Employer ID")),
    request_body = ChangePlanRequest,
    responses(
        (status = 200, description = "Plan changed", body = EmployerResponse),
        (status = 400, description = "Unknown plan", body = Object),
        (status = 401, description = "Missing or invalid admin token", body = Object),
        (status = 404, description = "Employer not found", body = Object)
    )
)]
async fn change_plan(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Json(req): Json<ChangePlanRequest>,
) -> impl IntoResponse {
    if !is_admin_authorized(&headers, &state.admin_token) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({ "error": "Missing or invalid authorization token" })),
        );
    }

    let plan = match parse_plan(&req.plan) {
        Ok(p) => p,
        Err(e) => return into_json(e),
    };

    match state.quota.change_plan(id, plan).await {
        Ok(employer) => (
            StatusCode::OK,
            Json(serde_json::json!(EmployerResponse::from(employer))),
        ),
        Err(e) => {
            error!(error = %e, employer_id = %id, "Failed to change plan");
            into_json(map_quota_error(&e))
        }
    }
}

#[utoipa::path(
    get,
    path = "/employers/{id}/quota",
    tag = "Quota",
    params(("id" = Uuid, Path, description = "Employer ID")),
    responses(
        (status = 200, description = "Usage, limits and display string", body = Object),
        (status = 404, description = "Employer not found", body = Object)
    )
)]
async fn quota_status(State(state): State<AppState>, Path(id): Path<Uuid>) -> impl IntoResponse {
    match state.quota.status(id).await {
        Ok(summary) => (StatusCode::OK, Json(serde_json::json!(summary))),
        Err(e) => {
            error!(error = %e, employer_id = %id, "Failed to load quota status");
            into_json(map_quota_error(&e))
        }
    }
}

#[utoipa::path(
    get,
    path = "/employers/{id}/quota/{resource}",
    tag = "Quota",
    params(
        ("id" = Uuid, Path, description = "Employer ID"),
        ("resource" = String, Path, description = "job_posting, featured, urgent or cv_download")
    ),
    responses(
        (status = 200, description = "Admission decision for one more unit", body = Object),
        (status = 400, description = "Unknown resource", body = Object),
        (status = 404, description = "Employer not found", body = Object)
    )
)]
async fn preview_quota(
    State(state): State<AppState>,
    Path((id, resource)): Path<(Uuid, String)>,
) -> impl IntoResponse {
    let resource = match parse_resource(&resource) {
        Ok(r) => r,
        Err(e) => return into_json(e),
    };

    match state.quota.check(id, resource).await {
        Ok(admission) => (StatusCode::OK, Json(serde_json::json!(admission))),
        Err(e) => into_json(map_quota_error(&e)),
    }
}

/// Spend one unit of quota
///
/// Call before performing the gated action. A 402 carries the user-facing reason.
#[utoipa::path(
    post,
    path = "/employers/{id}/quota/{resource}/consume",
    tag = "Quota",
    params(
        ("id" = Uuid, Path, description = "Employer ID"),
        ("resource" = String, Path, description = "job_posting, featured, urgent or cv_download")
    ),
    responses(
        (status = 200, description = "Unit granted", body = UsageResponse),
        (status = 400, description = "Unknown resource", body = Object),
        (status = 402, description = "Quota exceeded or feature not in plan", body = Object),
        (status = 404, description = "Employer not found", body = Object)
    )
)]
async fn consume_quota(
    State(state): State<AppState>,
    Path((id, resource)): Path<(Uuid, String)>,
) -> impl IntoResponse {
    let resource = match parse_resource(&resource) {
        Ok(r) => r,
        Err(e) => return into_json(e),
    };

    match state.quota.consume(id, resource).await {
        Ok(usage) => (
            StatusCode::OK,
            Json(serde_json::json!(UsageResponse::new(resource, usage))),
        ),
        Err(e) => into_json(map_quota_error(&e)),
    }
}

/// Return one unit of quota
///
/// Used when the gated action failed after the unit was consumed.
#[utoipa::path(
    post,
    path = "/employers/{id}/quota/{resource}/release",
    tag = "Quota",
    params(
        ("id" = Uuid, Path, description = "Employer ID"),
        ("resource" = String, Path, description = "job_posting, featured, urgent or cv_download")
    ),
    responses(
        (status = 200, description = "Unit released", body = UsageResponse),
        (status = 400, description = "Unknown resource", body = Object),
        (status = 404, description = "Employer not found", body = Object)
    )
)]
async fn release_quota(
    State(state): State<AppState>,
    Path((id, resource)): Path<(Uuid, String)>,
) -> impl IntoResponse {
    let resource = match parse_resource(&resource) {
        Ok(r) => r,
        Err(e) => return into_json(e),
    };

    match state.quota.release(id, resource).await {
        Ok(usage) => (
            StatusCode::OK,
            Json(serde_json::json!(UsageResponse::new(resource, usage))),
        ),
        Err(e) => {
            error!(error = %e, employer_id = %id, "Failed to release quota");
            into_json(map_quota_error(&e))
        }
    }
}
