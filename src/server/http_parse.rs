use crate::domain::{Resource, SubscriptionPlan};
use axum::http::StatusCode;

pub(super) fn parse_plan(plan: &str) -> Result<SubscriptionPlan, (StatusCode, serde_json::Value)> {
    plan.parse().map_err(|_| {
        (
            StatusCode::BAD_REQUEST,
            serde_json::json!({
                "error": "Invalid subscription plan",
                "allowed": SubscriptionPlan::allowed_values()
            }),
        )
    })
}

pub(super) fn parse_resource(resource: &str) -> Result<Resource, (StatusCode, serde_json::Value)> {
    resource.parse().map_err(|_| {
        (
            StatusCode::BAD_REQUEST,
            serde_json::json!({
                "error": "Invalid resource",
                "allowed": Resource::allowed_values()
            }),
        )
    })
}

pub(super) fn parse_count(count: i64) -> Result<u32, (StatusCode, serde_json::Value)> {
    u32::try_from(count).map_err(|_| {
        (
            StatusCode::BAD_REQUEST,
            serde_json::json!({ "error": "current_count must be between 0 and 4294967295" }),
        )
    })
}
