use crate::domain::{Employer, UsageCounters};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Serialize, ToSchema)]
pub(super) struct HealthResponse {
    pub(super) status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(super) error: Option<String>,
}

#[derive(Deserialize, Validate, ToSchema)]
pub(super) struct CreateEmployerRequest {
    #[validate(length(min = 1, max = 128))]
    #[schema(example = "employer-123")]
    pub(super) external_id: String,
    #[validate(length(min = 1, max = 200))]
    #[schema(example = "PT Maju Jaya")]
    pub(super) company_name: String,
    /// Defaults to `free` when omitted.
    #[schema(example = "starter")]
    pub(super) plan: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub(super) struct ChangePlanRequest {
    #[schema(example = "professional")]
    pub(super) plan: String,
}

#[derive(Deserialize, ToSchema)]
pub(super) struct CheckQuotaRequest {
    #[schema(example = "starter")]
    pub(super) plan: String,
    #[schema(example = "featured")]
    pub(super) resource: String,
    /// Signed so that negative input can be rejected explicitly.
    #[schema(example = 2)]
    pub(super) current_count: i64,
}

#[derive(Serialize, ToSchema)]
pub(super) struct EmployerResponse {
    pub(super) id: Uuid,
    pub(super) external_id: String,
    pub(super) company_name: String,
    pub(super) plan: String,
    pub(super) created_at: chrono::DateTime<chrono::Utc>,
    pub(super) updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<Employer> for EmployerResponse {
    fn from(employer: Employer) -> Self {
        Self {
            id: employer.id,
            external_id: employer.external_id,
            company_name: employer.company_name,
            plan: employer.plan.to_string(),
            created_at: employer.created_at,
            updated_at: employer.updated_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub(super) struct UsageResponse {
    pub(super) resource: String,
    pub(super) job_posting: u32,
    pub(super) featured: u32,
    pub(super) urgent: u32,
    pub(super) cv_download: u32,
}

impl UsageResponse {
    pub(super) fn new(resource: impl ToString, usage: UsageCounters) -> Self {
        Self {
            resource: resource.to_string(),
            job_posting: usage.job_posting,
            featured: usage.featured,
            urgent: usage.urgent,
            cv_download: usage.cv_download,
        }
    }
}
