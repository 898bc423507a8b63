//! Subscription plans and their static feature table.
//!
//! | Plan | Jobs | Featured | Urgent | CV DB | CV downloads | Duration |
//! |------|------|----------|--------|-------|--------------|----------|
//! | Free | 3 | 0 | 0 | No | 0 | 14 days |
//! | Starter | 10 | 3 | 0 | No | 0 | 30 days |
//! | Professional | 30 | 10 | 5 | Yes | 50 | 45 days |
//! | Enterprise | ∞ | ∞ | ∞ | Yes | ∞ | 60 days |

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use strum::{Display, EnumIter, IntoEnumIterator, IntoStaticStr};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Unknown subscription plan: {0}")]
    Plan(String),
    #[error("Unknown resource: {0}")]
    Resource(String),
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    IntoStaticStr,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SubscriptionPlan {
    #[default]
    Free,
    Starter,
    Professional,
    Enterprise,
}

impl SubscriptionPlan {
    pub fn features(self) -> &'static PlanFeatures {
        &PLANS[self as usize]
    }

    /// The plan an upgrade prompt should point at, `None` at the top tier.
    pub fn next_tier(self) -> Option<SubscriptionPlan> {
        match self {
            SubscriptionPlan::Free => Some(SubscriptionPlan::Starter),
            SubscriptionPlan::Starter => Some(SubscriptionPlan::Professional),
            SubscriptionPlan::Professional => Some(SubscriptionPlan::Enterprise),
            SubscriptionPlan::Enterprise => None,
        }
    }

    pub fn allowed_values() -> Vec<&'static str> {
        Self::iter().map(<&'static str>::from).collect()
    }
}

impl FromStr for SubscriptionPlan {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::iter()
            .find(|p| <&'static str>::from(*p) == s)
            .ok_or_else(|| ParseError::Plan(s.to_string()))
    }
}

/// Usage ceiling for one resource.
///
/// `Limited(0)` means the feature is not part of the plan at all, which is
/// reported differently from an exhausted quota.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quota {
    Limited(u32),
    Unlimited,
}

impl Quota {
    pub fn is_unavailable(self) -> bool {
        self == Quota::Limited(0)
    }

    pub fn is_exhausted_at(self, current: u32) -> bool {
        match self {
            Quota::Limited(max) => current >= max,
            Quota::Unlimited => false,
        }
    }

    pub fn remaining(self, current: u32) -> Option<u32> {
        match self {
            Quota::Limited(max) => Some(max.saturating_sub(current)),
            Quota::Unlimited => None,
        }
    }

    /// Ceiling as stored in the usage table, where `NULL` means unlimited.
    pub fn as_db_limit(self) -> Option<i32> {
        match self {
            Quota::Limited(max) => Some(i32::try_from(max).unwrap_or(i32::MAX)),
            Quota::Unlimited => None,
        }
    }
}

impl fmt::Display for Quota {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Quota::Limited(max) => write!(f, "{}", max),
            Quota::Unlimited => f.write_str("∞"),
        }
    }
}

const UNLIMITED_TAG: &str = "unlimited";

impl Serialize for Quota {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Quota::Limited(max) => serializer.serialize_u32(*max),
            Quota::Unlimited => serializer.serialize_str(UNLIMITED_TAG),
        }
    }
}

impl<'de> Deserialize<'de> for Quota {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Count(u32),
            Tag(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Count(max) => Ok(Quota::Limited(max)),
            Raw::Tag(tag) if tag == UNLIMITED_TAG => Ok(Quota::Unlimited),
            Raw::Tag(other) => Err(serde::de::Error::custom(format!(
                "expected a non-negative count or \"{}\", got \"{}\"",
                UNLIMITED_TAG, other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SupportLevel {
    Email,
    Priority,
    Dedicated,
}

/// Presentation metadata for plan cards. Not used by any admission decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PlanBadge {
    pub label: &'static str,
    pub color: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanFeatures {
    pub plan: SubscriptionPlan,
    pub name: &'static str,
    pub tagline: &'static str,
    pub badge: PlanBadge,
    pub monthly_price_idr: u32,
    pub job_posting_quota: Quota,
    pub featured_quota: Quota,
    pub urgent_quota: Quota,
    /// Days a posting stays active. Informational, not enforced here.
    pub job_duration_days: u32,
    pub has_verified_badge: bool,
    pub has_basic_analytics: bool,
    pub has_advanced_analytics: bool,
    pub has_cv_database: bool,
    /// Only meaningful when `has_cv_database` is set.
    pub cv_download_quota: Quota,
    pub support_level: SupportLevel,
}

impl PlanFeatures {
    pub fn all() -> &'static [PlanFeatures] {
        &PLANS
    }
}

// Indexed by `SubscriptionPlan as usize`; order must follow the enum.
static PLANS: [PlanFeatures; 4] = [
    PlanFeatures {
        plan: SubscriptionPlan::Free,
        name: "Free",
        tagline: "Coba gratis",
        badge: PlanBadge {
            label: "Free",
            color: "gray",
        },
        monthly_price_idr: 0,
        job_posting_quota: Quota::Limited(3),
        featured_quota: Quota::Limited(0),
        urgent_quota: Quota::Limited(0),
        job_duration_days: 14,
        has_verified_badge: false,
        has_basic_analytics: false,
        has_advanced_analytics: false,
        has_cv_database: false,
        cv_download_quota: Quota::Limited(0),
        support_level: SupportLevel::Email,
    },
    PlanFeatures {
        plan: SubscriptionPlan::Starter,
        name: "Starter",
        tagline: "Untuk UMKM",
        badge: PlanBadge {
            label: "Starter",
            color: "blue",
        },
        monthly_price_idr: 199_000,
        job_posting_quota: Quota::Limited(10),
        featured_quota: Quota::Limited(3),
        urgent_quota: Quota::Limited(0),
        job_duration_days: 30,
        has_verified_badge: true,
        has_basic_analytics: true,
        has_advanced_analytics: false,
        has_cv_database: false,
        cv_download_quota: Quota::Limited(0),
        support_level: SupportLevel::Email,
    },
    PlanFeatures {
        plan: SubscriptionPlan::Professional,
        name: "Professional",
        tagline: "Untuk perusahaan berkembang",
        badge: PlanBadge {
            label: "Popular",
            color: "purple",
        },
        monthly_price_idr: 499_000,
        job_posting_quota: Quota::Limited(30),
        featured_quota: Quota::Limited(10),
        urgent_quota: Quota::Limited(5),
        job_duration_days: 45,
        has_verified_badge: true,
        has_basic_analytics: true,
        has_advanced_analytics: true,
        has_cv_database: true,
        cv_download_quota: Quota::Limited(50),
        support_level: SupportLevel::Priority,
    },
    PlanFeatures {
        plan: SubscriptionPlan::Enterprise,
        name: "Enterprise",
        tagline: "Untuk korporasi",
        badge: PlanBadge {
            label: "Enterprise",
            color: "gold",
        },
        monthly_price_idr: 1_499_000,
        job_posting_quota: Quota::Unlimited,
        featured_quota: Quota::Unlimited,
        urgent_quota: Quota::Unlimited,
        job_duration_days: 60,
        has_verified_badge: true,
        has_basic_analytics: true,
        has_advanced_analytics: true,
        has_cv_database: true,
        cv_download_quota: Quota::Unlimited,
        support_level: SupportLevel::Dedicated,
    },
];
