use crate::domain::{
    self, AccountingPeriod, Admission, Employer, Quota, QuotaStatus, Resource,
    SubscriptionPlan, UsageCounters,
};
use crate::infrastructure::{EmployerRepository, RepositoryError, UsageRepository};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum QuotaError {
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
    #[error("{resource} not allowed: {reason}")]
    Denied { resource: Resource, reason: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct QuotaSummary {
    pub employer_id: Uuid,
    pub plan: SubscriptionPlan,
    pub period_start: chrono::NaiveDate,
    pub usage: UsageCounters,
    pub display: String,
    pub resources: Vec<QuotaStatus>,
}

/// Applies plan quotas to an employer's usage.
///
/// Reads go through `check`; actions that spend quota go through `consume`,
/// which records the unit only if the storage layer can do so without passing
/// the limit.
pub struct QuotaService<E, U>
where
    E: EmployerRepository,
    U: UsageRepository,
{
    employer_repo: Arc<E>,
    usage_repo: Arc<U>,
}

impl<E, U> QuotaService<E, U>
where
    E: EmployerRepository,
    U: UsageRepository,
{
    pub fn new(employer_repo: Arc<E>, usage_repo: Arc<U>) -> Self {
        Self {
            employer_repo,
            usage_repo,
        }
    }

    pub async fn get_employer(&self, employer_id: Uuid) -> Result<Employer, QuotaError> {
        Ok(self.employer_repo.get_by_id(employer_id).await?)
    }

    pub async fn plan_for(&self, employer_id: Uuid) -> Result<SubscriptionPlan, QuotaError> {
        Ok(self.employer_repo.get_by_id(employer_id).await?.plan)
    }

    pub async fn usage_for(&self, employer_id: Uuid) -> Result<UsageCounters, QuotaError> {
        Ok(self
            .usage_repo
            .get_usage(employer_id, AccountingPeriod::current())
            .await?)
    }

    /// Preview whether one more unit of `resource` would be admitted.
    pub async fn check(&self, employer_id: Uuid, resource: Resource) -> Result<Admission, QuotaError> {
        let plan = self.plan_for(employer_id).await?;
        let usage = self.usage_for(employer_id).await?;
        Ok(domain::check(plan, resource, usage.get(resource)))
    }

    /// Spend one unit of `resource`, returning the usage after the grant.
    pub async fn consume(
        &self,
        employer_id: Uuid,
        resource: Resource,
    ) -> Result<UsageCounters, QuotaError> {
        self.consume_in(employer_id, resource, AccountingPeriod::current())
            .await
    }

    pub async fn consume_in(
        &self,
        employer_id: Uuid,
        resource: Resource,
        period: AccountingPeriod,
    ) -> Result<UsageCounters, QuotaError> {
        let plan = self.plan_for(employer_id).await?;
        let mut usage = self.usage_repo.get_usage(employer_id, period).await?;

        let admission = domain::check(plan, resource, usage.get(resource));
        if !admission.allowed {
            return Err(self.denied(employer_id, plan, resource, admission));
        }

        let (granted, count) = self
            .usage_repo
            .try_increment(employer_id, period, resource, resource.quota_for(plan))
            .await?;

        if !granted {
            // Another request took the last unit between the read and the increment.
            let seen = match resource.quota_for(plan) {
                Quota::Limited(max) => count.max(max),
                Quota::Unlimited => count,
            };
            let admission = domain::check(plan, resource, seen);
            return Err(self.denied(employer_id, plan, resource, admission));
        }

        usage.set(resource, count);
        info!(
            employer_id = %employer_id,
            plan = %plan,
            resource = %resource,
            used = count,
            "Quota consumed"
        );

        Ok(usage)
    }

    /// Give back a unit when the gated action was rolled back.
    pub async fn release(
        &self,
        employer_id: Uuid,
        resource: Resource,
    ) -> Result<UsageCounters, QuotaError> {
        self.employer_repo.get_by_id(employer_id).await?;

        let period = AccountingPeriod::current();
        let count = self
            .usage_repo
            .decrement(employer_id, period, resource)
            .await?;

        let mut usage = self.usage_repo.get_usage(employer_id, period).await?;
        usage.set(resource, count);
        info!(employer_id = %employer_id, resource = %resource, used = count, "Quota released");

        Ok(usage)
    }

    pub async fn status(&self, employer_id: Uuid) -> Result<QuotaSummary, QuotaError> {
        let plan = self.plan_for(employer_id).await?;
        let period = AccountingPeriod::current();
        let usage = self.usage_repo.get_usage(employer_id, period).await?;

        Ok(QuotaSummary {
            employer_id,
            plan,
            period_start: period.start(),
            usage,
            display: domain::quota_display(plan, &usage),
            resources: domain::quota_statuses(plan, &usage),
        })
    }

    pub async fn change_plan(
        &self,
        employer_id: Uuid,
        plan: SubscriptionPlan,
    ) -> Result<Employer, QuotaError> {
        let previous = self.plan_for(employer_id).await?;
        self.employer_repo.update_plan(employer_id, plan).await?;
        info!(employer_id = %employer_id, from = %previous, to = %plan, "Plan changed");

        Ok(self.employer_repo.get_by_id(employer_id).await?)
    }

    fn denied(
        &self,
        employer_id: Uuid,
        plan: SubscriptionPlan,
        resource: Resource,
        admission: Admission,
    ) -> QuotaError {
        let reason = admission.reason.unwrap_or_default();
        warn!(
            employer_id = %employer_id,
            plan = %plan,
            resource = %resource,
            reason = %reason,
            "Quota denied"
        );
        QuotaError::Denied { resource, reason }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::{MockEmployerRepository, MockUsageRepository};
    use mockall::predicate::eq;

    fn employer(plan: SubscriptionPlan) -> Employer {
        Employer::new("emp".to_string(), "PT Contoh".to_string(), plan)
    }

    fn employer_repo_with(employer: Employer) -> MockEmployerRepository {
        let mut repo = MockEmployerRepository::new();
        repo.expect_get_by_id()
            .returning(move |_| Ok(employer.clone()));
        repo
    }

    #[test]
    fn consume_denied_by_engine_skips_increment() {
        let emp = employer(SubscriptionPlan::Free);
        let id = emp.id;

        let mut usage_repo = MockUsageRepository::new();
        usage_repo.expect_get_usage().returning(|_, _| {
            Ok(UsageCounters {
                job_posting: 3,
                ..Default::default()
            })
        });
        usage_repo.expect_try_increment().never();

        let service = QuotaService::new(Arc::new(employer_repo_with(emp)), Arc::new(usage_repo));
        let result = tokio_test::block_on(service.consume(id, Resource::JobPosting));

        match result {
            Err(QuotaError::Denied { resource, reason }) => {
                assert_eq!(resource, Resource::JobPosting);
                assert_eq!(reason, "Quota habis! Upgrade ke Starter (Rp 199k)");
            }
            other => panic!("expected denial, got {:?}", other),
        }
    }

    #[test]
    fn consume_passes_plan_limit_to_storage() {
        let emp = employer(SubscriptionPlan::Starter);
        let id = emp.id;

        let mut usage_repo = MockUsageRepository::new();
        usage_repo
            .expect_get_usage()
            .returning(|_, _| Ok(UsageCounters::default()));
        usage_repo
            .expect_try_increment()
            .with(
                eq(id),
                mockall::predicate::always(),
                eq(Resource::Featured),
                eq(Quota::Limited(3)),
            )
            .times(1)
            .returning(|_, _, _, _| Ok((true, 1)));

        let service = QuotaService::new(Arc::new(employer_repo_with(emp)), Arc::new(usage_repo));
        let usage = tokio_test::block_on(service.consume(id, Resource::Featured)).unwrap();

        assert_eq!(usage.featured, 1);
    }

    #[test]
    fn lost_race_reports_exhaustion_reason() {
        let emp = employer(SubscriptionPlan::Professional);
        let id = emp.id;

        let mut usage_repo = MockUsageRepository::new();
        usage_repo.expect_get_usage().returning(|_, _| {
            Ok(UsageCounters {
                urgent: 4,
                ..Default::default()
            })
        });
        usage_repo
            .expect_try_increment()
            .returning(|_, _, _, _| Ok((false, 5)));

        let service = QuotaService::new(Arc::new(employer_repo_with(emp)), Arc::new(usage_repo));
        let result = tokio_test::block_on(service.consume(id, Resource::Urgent));

        assert!(matches!(
            result,
            Err(QuotaError::Denied { ref reason, .. }) if reason == domain::URGENT_QUOTA_EXHAUSTED
        ));
    }

    #[test]
    fn unknown_employer_surfaces_not_found() {
        let mut employer_repo = MockEmployerRepository::new();
        employer_repo
            .expect_get_by_id()
            .returning(|id| Err(RepositoryError::NotFound(format!("Employer {}", id))));

        let service = QuotaService::new(
            Arc::new(employer_repo),
            Arc::new(MockUsageRepository::new()),
        );
        let result = tokio_test::block_on(service.check(Uuid::new_v4(), Resource::CvDownload));

        assert!(matches!(
            result,
            Err(QuotaError::Repository(RepositoryError::NotFound(_)))
        ));
    }
}
