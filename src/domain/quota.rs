//! Admission checks for plan-limited resources.
//!
//! Every check runs in the same order: capability gate (quota of zero),
//! unlimited bypass, then the counter comparison. Reaching the limit blocks
//! the next action, so `current >= quota` denies.

use super::plan::{ParseError, Quota, SubscriptionPlan};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use strum::{Display, EnumIter, IntoEnumIterator, IntoStaticStr};

pub const FEATURE_NOT_AVAILABLE: &str = "Feature not available in your plan";
pub const CV_DATABASE_NOT_AVAILABLE: &str = "CV Database not available in your plan";
pub const JOB_QUOTA_EXHAUSTED: &str = "Quota habis! Hubungi tim kami untuk menambah kuota";
pub const FEATURED_QUOTA_EXHAUSTED: &str = "Featured quota habis";
pub const URGENT_QUOTA_EXHAUSTED: &str = "Urgent quota habis";
pub const CV_QUOTA_EXHAUSTED: &str = "CV download quota habis! Upgrade ke Enterprise";

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    IntoStaticStr,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Resource {
    JobPosting,
    Featured,
    Urgent,
    CvDownload,
}

impl Resource {
    pub fn quota_for(self, plan: SubscriptionPlan) -> Quota {
        let features = plan.features();
        match self {
            Resource::JobPosting => features.job_posting_quota,
            Resource::Featured => features.featured_quota,
            Resource::Urgent => features.urgent_quota,
            Resource::CvDownload if features.has_cv_database => features.cv_download_quota,
            Resource::CvDownload => Quota::Limited(0),
        }
    }

    fn label(self) -> &'static str {
        match self {
            Resource::JobPosting => "Job",
            Resource::Featured => "Featured",
            Resource::Urgent => "Urgent",
            Resource::CvDownload => "CV",
        }
    }

    pub fn allowed_values() -> Vec<&'static str> {
        Self::iter().map(<&'static str>::from).collect()
    }
}

impl FromStr for Resource {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::iter()
            .find(|r| <&'static str>::from(*r) == s)
            .ok_or_else(|| ParseError::Resource(s.to_string()))
    }
}

/// Usage for one employer within an accounting period. Owned by the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageCounters {
    #[serde(default)]
    pub job_posting: u32,
    #[serde(default)]
    pub featured: u32,
    #[serde(default)]
    pub urgent: u32,
    #[serde(default)]
    pub cv_download: u32,
}

impl UsageCounters {
    pub fn get(&self, resource: Resource) -> u32 {
        match resource {
            Resource::JobPosting => self.job_posting,
            Resource::Featured => self.featured,
            Resource::Urgent => self.urgent,
            Resource::CvDownload => self.cv_download,
        }
    }

    pub fn set(&mut self, resource: Resource, count: u32) {
        match resource {
            Resource::JobPosting => self.job_posting = count,
            Resource::Featured => self.featured = count,
            Resource::Urgent => self.urgent = count,
            Resource::CvDownload => self.cv_download = count,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Admission {
    pub allowed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl Admission {
    pub fn allow() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.into()),
        }
    }
}

pub fn can_post_job(plan: SubscriptionPlan, current: u32) -> Admission {
    match plan.features().job_posting_quota {
        Quota::Unlimited => Admission::allow(),
        quota if quota.is_exhausted_at(current) => Admission::deny(job_upgrade_message(plan)),
        Quota::Limited(_) => Admission::allow(),
    }
}

pub fn can_use_featured(plan: SubscriptionPlan, current: u32) -> Admission {
    let exhausted = match plan {
        SubscriptionPlan::Starter => "Featured quota habis! Upgrade ke Professional",
        _ => FEATURED_QUOTA_EXHAUSTED,
    };
    gated_check(plan.features().featured_quota, current, exhausted)
}

pub fn can_use_urgent(plan: SubscriptionPlan, current: u32) -> Admission {
    gated_check(plan.features().urgent_quota, current, URGENT_QUOTA_EXHAUSTED)
}

pub fn can_download_cv(plan: SubscriptionPlan, current: u32) -> Admission {
    let features = plan.features();
    if !features.has_cv_database {
        return Admission::deny(CV_DATABASE_NOT_AVAILABLE);
    }

    match features.cv_download_quota {
        Quota::Unlimited => Admission::allow(),
        quota if quota.is_exhausted_at(current) => Admission::deny(CV_QUOTA_EXHAUSTED),
        Quota::Limited(_) => Admission::allow(),
    }
}

pub fn check(plan: SubscriptionPlan, resource: Resource, current: u32) -> Admission {
    match resource {
        Resource::JobPosting => can_post_job(plan, current),
        Resource::Featured => can_use_featured(plan, current),
        Resource::Urgent => can_use_urgent(plan, current),
        Resource::CvDownload => can_download_cv(plan, current),
    }
}

fn gated_check(quota: Quota, current: u32, exhausted: &str) -> Admission {
    if quota.is_unavailable() {
        return Admission::deny(FEATURE_NOT_AVAILABLE);
    }

    match quota {
        Quota::Unlimited => Admission::allow(),
        quota if quota.is_exhausted_at(current) => Admission::deny(exhausted),
        Quota::Limited(_) => Admission::allow(),
    }
}

fn job_upgrade_message(plan: SubscriptionPlan) -> String {
    match plan.next_tier() {
        Some(next) => {
            let features = next.features();
            match features.monthly_price_idr {
                // Enterprise pricing is negotiated, so no price is quoted.
                price if next == SubscriptionPlan::Enterprise || price == 0 => {
                    format!("Quota habis! Upgrade ke {}", features.name)
                }
                price => format!(
                    "Quota habis! Upgrade ke {} (Rp {}k)",
                    features.name,
                    price / 1000
                ),
            }
        }
        None => JOB_QUOTA_EXHAUSTED.to_string(),
    }
}

/// "Job: 2 / 10, Featured: 1 / 3" style summary.
///
/// Featured and urgent are left out when the plan does not include them, and
/// CV downloads only appear for plans with CV database access.
pub fn quota_display(plan: SubscriptionPlan, usage: &UsageCounters) -> String {
    Resource::iter()
        .filter(|r| is_displayed(plan, *r))
        .map(|r| format!("{}: {} / {}", r.label(), usage.get(r), r.quota_for(plan)))
        .collect::<Vec<_>>()
        .join(", ")
}

fn is_displayed(plan: SubscriptionPlan, resource: Resource) -> bool {
    match resource {
        Resource::JobPosting => true,
        Resource::Featured | Resource::Urgent => !resource.quota_for(plan).is_unavailable(),
        Resource::CvDownload => plan.features().has_cv_database,
    }
}

/// Structured per-resource view backing API responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuotaStatus {
    pub resource: Resource,
    pub used: u32,
    pub limit: Quota,
    /// `None` when unlimited.
    pub remaining: Option<u32>,
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

pub fn quota_statuses(plan: SubscriptionPlan, usage: &UsageCounters) -> Vec<QuotaStatus> {
    Resource::iter()
        .map(|resource| {
            let used = usage.get(resource);
            let limit = resource.quota_for(plan);
            let admission = check(plan, resource, used);
            QuotaStatus {
                resource,
                used,
                limit,
                remaining: limit.remaining(used),
                available: admission.allowed,
                reason: admission.reason,
            }
        })
        .collect()
}
