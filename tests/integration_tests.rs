//! Integration tests for quota enforcement
//!
//! These run the `QuotaService` against in-memory repositories that follow the
//! same contract as the Postgres implementations.

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use pintu_kerja::application::{QuotaError, QuotaService};
use pintu_kerja::domain::{
    AccountingPeriod, Employer, Quota, Resource, SubscriptionPlan, UsageCounters,
};
use pintu_kerja::infrastructure::{EmployerRepository, RepositoryError, UsageRepository};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

// ============================================================================
// Mock Repositories
// ============================================================================

/// In-memory mock implementation of EmployerRepository
#[derive(Clone, Default)]
struct MockEmployerRepository {
    employers: Arc<Mutex<HashMap<Uuid, Employer>>>,
}

#[async_trait]
impl EmployerRepository for MockEmployerRepository {
    async fn create(&self, employer: &Employer) -> Result<(), RepositoryError> {
        let mut employers = self.employers.lock().unwrap();
        if employers
            .values()
            .any(|e| e.external_id == employer.external_id)
        {
            return Err(RepositoryError::Conflict(format!(
                "Employer {}",
                employer.external_id
            )));
        }
        employers.insert(employer.id, employer.clone());
        Ok(())
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Employer, RepositoryError> {
        let employers = self.employers.lock().unwrap();
        employers
            .get(&id)
            .cloned()
            .ok_or_else(|| RepositoryError::NotFound(format!("Employer {}", id)))
    }

    async fn get_by_external_id(&self, external_id: &str) -> Result<Employer, RepositoryError> {
        let employers = self.employers.lock().unwrap();
        employers
            .values()
            .find(|e| e.external_id == external_id)
            .cloned()
            .ok_or_else(|| RepositoryError::NotFound(format!("Employer {}", external_id)))
    }

    async fn update_plan(&self, id: Uuid, plan: SubscriptionPlan) -> Result<(), RepositoryError> {
        let mut employers = self.employers.lock().unwrap();
        let employer = employers
            .get_mut(&id)
            .ok_or_else(|| RepositoryError::NotFound(format!("Employer {}", id)))?;

        employer.plan = plan;
        employer.updated_at = Utc::now();
        Ok(())
    }
}

/// In-memory mock implementation of UsageRepository
#[derive(Clone, Default)]
struct MockUsageRepository {
    counters: Arc<Mutex<HashMap<(Uuid, AccountingPeriod, Resource), u32>>>,
}

#[async_trait]
impl UsageRepository for MockUsageRepository {
    async fn get_usage(
        &self,
        employer_id: Uuid,
        period: AccountingPeriod,
    ) -> Result<UsageCounters, RepositoryError> {
        let counters = self.counters.lock().unwrap();
        let mut usage = UsageCounters::default();
        for ((id, p, resource), count) in counters.iter() {
            if *id == employer_id && *p == period {
                usage.set(*resource, *count);
            }
        }
        Ok(usage)
    }

    async fn try_increment(
        &self,
        employer_id: Uuid,
        period: AccountingPeriod,
        resource: Resource,
        limit: Quota,
    ) -> Result<(bool, u32), RepositoryError> {
        let mut counters = self.counters.lock().unwrap();
        let current = counters
            .entry((employer_id, period, resource))
            .or_insert(0);

        if limit.is_exhausted_at(*current) {
            return Ok((false, *current));
        }

        *current += 1;
        Ok((true, *current))
    }

    async fn decrement(
        &self,
        employer_id: Uuid,
        period: AccountingPeriod,
        resource: Resource,
    ) -> Result<u32, RepositoryError> {
        let mut counters = self.counters.lock().unwrap();
        let current = counters
            .entry((employer_id, period, resource))
            .or_insert(0);
        *current = current.saturating_sub(1);
        Ok(*current)
    }
}

// ============================================================================
// Test Helpers
// ============================================================================

type Service = QuotaService<MockEmployerRepository, MockUsageRepository>;

async fn setup(plan: SubscriptionPlan) -> (Service, MockUsageRepository, Uuid) {
    let employer_repo = Arc::new(MockEmployerRepository::default());
    let usage_repo = MockUsageRepository::default();

    let employer = Employer::new(
        format!("ext-{}", Uuid::new_v4()),
        "PT Sinar Harapan".to_string(),
        plan,
    );
    let employer_id = employer.id;
    employer_repo
        .create(&employer)
        .await
        .expect("Failed to create employer");

    let service = QuotaService::new(employer_repo, Arc::new(usage_repo.clone()));
    (service, usage_repo, employer_id)
}

fn denial_reason(result: Result<UsageCounters, QuotaError>) -> String {
    match result {
        Err(QuotaError::Denied { reason, .. }) => reason,
        other => panic!("expected denial, got {:?}", other),
    }
}

// ============================================================================
// Test Cases
// ============================================================================

#[tokio::test]
async fn test_free_plan_job_quota() {
    let (service, _, employer_id) = setup(SubscriptionPlan::Free).await;

    for expected in 1..=3 {
        let usage = service
            .consume(employer_id, Resource::JobPosting)
            .await
            .expect("Job posting within quota should be granted");
        assert_eq!(usage.job_posting, expected);
    }

    let reason = denial_reason(service.consume(employer_id, Resource::JobPosting).await);
    assert_eq!(reason, "Quota habis! Upgrade ke Starter (Rp 199k)");

    let usage = service.usage_for(employer_id).await.expect("Failed to read usage");
    assert_eq!(usage.job_posting, 3);
}

#[tokio::test]
async fn test_capability_gate_differs_from_exhaustion() {
    let (service, _, employer_id) = setup(SubscriptionPlan::Free).await;

    let reason = denial_reason(service.consume(employer_id, Resource::Featured).await);
    assert_eq!(reason, "Feature not available in your plan");

    let reason = denial_reason(service.consume(employer_id, Resource::CvDownload).await);
    assert_eq!(reason, "CV Database not available in your plan");
}

#[tokio::test]
async fn test_starter_featured_quota_and_upgrade_message() {
    let (service, _, employer_id) = setup(SubscriptionPlan::Starter).await;

    for _ in 0..3 {
        service
            .consume(employer_id, Resource::Featured)
            .await
            .expect("Featured within quota should be granted");
    }

    let reason = denial_reason(service.consume(employer_id, Resource::Featured).await);
    assert_eq!(reason, "Featured quota habis! Upgrade ke Professional");
}

#[tokio::test]
async fn test_enterprise_is_unlimited() {
    let (service, _, employer_id) = setup(SubscriptionPlan::Enterprise).await;

    for _ in 0..250 {
        service
            .consume(employer_id, Resource::Urgent)
            .await
            .expect("Enterprise urgent listings are unlimited");
    }

    let admission = service
        .check(employer_id, Resource::Urgent)
        .await
        .expect("Failed to check");
    assert!(admission.allowed);
}

#[tokio::test]
async fn test_release_never_goes_below_zero() {
    let (service, _, employer_id) = setup(SubscriptionPlan::Professional).await;

    service
        .consume(employer_id, Resource::CvDownload)
        .await
        .expect("Failed to consume");

    let usage = service
        .release(employer_id, Resource::CvDownload)
        .await
        .expect("Failed to release");
    assert_eq!(usage.cv_download, 0);

    let usage = service
        .release(employer_id, Resource::CvDownload)
        .await
        .expect("Failed to release twice");
    assert_eq!(usage.cv_download, 0);
}

#[tokio::test]
async fn test_plan_change_applies_to_next_check() {
    let (service, _, employer_id) = setup(SubscriptionPlan::Free).await;

    for _ in 0..3 {
        service
            .consume(employer_id, Resource::JobPosting)
            .await
            .expect("Failed to consume");
    }
    assert!(!service
        .check(employer_id, Resource::JobPosting)
        .await
        .expect("Failed to check")
        .allowed);

    let employer = service
        .change_plan(employer_id, SubscriptionPlan::Starter)
        .await
        .expect("Failed to change plan");
    assert_eq!(employer.plan, SubscriptionPlan::Starter);

    let usage = service
        .consume(employer_id, Resource::JobPosting)
        .await
        .expect("Upgrade should free up quota");
    assert_eq!(usage.job_posting, 4);
}

#[tokio::test]
async fn test_status_summary() {
    let (service, _, employer_id) = setup(SubscriptionPlan::Starter).await;

    service
        .consume(employer_id, Resource::JobPosting)
        .await
        .expect("Failed to consume");
    service
        .consume(employer_id, Resource::JobPosting)
        .await
        .expect("Failed to consume");
    service
        .consume(employer_id, Resource::Featured)
        .await
        .expect("Failed to consume");

    let summary = service.status(employer_id).await.expect("Failed to get status");
    assert_eq!(summary.plan, SubscriptionPlan::Starter);
    assert_eq!(summary.display, "Job: 2 / 10, Featured: 1 / 3");
    assert_eq!(summary.resources.len(), 4);
    assert_eq!(summary.period_start, AccountingPeriod::current().start());
}

#[tokio::test]
async fn test_previous_period_usage_does_not_count() {
    let (service, usage_repo, employer_id) = setup(SubscriptionPlan::Free).await;

    let last_year = AccountingPeriod::containing(Utc.with_ymd_and_hms(2020, 1, 15, 0, 0, 0).unwrap());
    for _ in 0..3 {
        service
            .consume_in(employer_id, Resource::JobPosting, last_year)
            .await
            .expect("Failed to consume in old period");
    }

    let old = usage_repo
        .get_usage(employer_id, last_year)
        .await
        .expect("Failed to read old usage");
    assert_eq!(old.job_posting, 3);

    let admission = service
        .check(employer_id, Resource::JobPosting)
        .await
        .expect("Failed to check");
    assert!(admission.allowed);
}

#[tokio::test]
async fn test_concurrent_consumers_never_overshoot() {
    let (service, _, employer_id) = setup(SubscriptionPlan::Starter).await;
    let service = Arc::new(service);

    let mut handles = Vec::new();
    for _ in 0..25 {
        let service = service.clone();
        handles.push(tokio::spawn(async move {
            service.consume(employer_id, Resource::JobPosting).await.is_ok()
        }));
    }

    let mut granted = 0;
    for handle in handles {
        if handle.await.expect("task panicked") {
            granted += 1;
        }
    }

    assert_eq!(granted, 10);
    let usage = service.usage_for(employer_id).await.expect("Failed to read usage");
    assert_eq!(usage.job_posting, 10);
}

#[tokio::test]
async fn test_unknown_employer_is_not_found() {
    let (service, _, _) = setup(SubscriptionPlan::Free).await;

    let result = service.status(Uuid::new_v4()).await;
    assert!(matches!(
        result,
        Err(QuotaError::Repository(RepositoryError::NotFound(_)))
    ));
}

#[tokio::test]
async fn test_duplicate_external_id_conflicts() {
    let employer_repo = MockEmployerRepository::default();
    let first = Employer::new("dup".to_string(), "PT A".to_string(), SubscriptionPlan::Free);
    let second = Employer::new("dup".to_string(), "PT B".to_string(), SubscriptionPlan::Free);

    employer_repo.create(&first).await.expect("Failed to create");
    let result = employer_repo.create(&second).await;
    assert!(matches!(result, Err(RepositoryError::Conflict(_))));

    let found = employer_repo
        .get_by_external_id("dup")
        .await
        .expect("Failed to find by external id");
    assert_eq!(found.id, first.id);
}
