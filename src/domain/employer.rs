use super::plan::SubscriptionPlan;
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Employer {
    pub id: Uuid,
    pub external_id: String,
    pub company_name: String,
    pub plan: SubscriptionPlan,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Employer {
    pub fn new(external_id: String, company_name: String, plan: SubscriptionPlan) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            external_id,
            company_name,
            plan,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Calendar month (UTC) that usage is counted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AccountingPeriod {
    start: NaiveDate,
}

impl AccountingPeriod {
    pub fn current() -> Self {
        Self::containing(Utc::now())
    }

    pub fn containing(at: DateTime<Utc>) -> Self {
        let date = at.date_naive();
        Self {
            start: date.with_day(1).unwrap_or(date),
        }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn next(&self) -> Self {
        let (year, month) = match self.start.month() {
            12 => (self.start.year() + 1, 1),
            m => (self.start.year(), m + 1),
        };
        Self {
            start: NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(self.start),
        }
    }
}
