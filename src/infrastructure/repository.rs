use crate::domain::{AccountingPeriod, Employer, Quota, Resource, SubscriptionPlan, UsageCounters};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, Row};
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Invalid data: {0}")]
    InvalidData(String),
    #[error("Conflict: {0}")]
    Conflict(String),
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmployerRepository: Send + Sync {
    async fn create(&self, employer: &Employer) -> Result<(), RepositoryError>;
    async fn get_by_id(&self, id: Uuid) -> Result<Employer, RepositoryError>;
    async fn get_by_external_id(&self, external_id: &str) -> Result<Employer, RepositoryError>;
    async fn update_plan(&self, id: Uuid, plan: SubscriptionPlan) -> Result<(), RepositoryError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UsageRepository: Send + Sync {
    async fn get_usage(
        &self,
        employer_id: Uuid,
        period: AccountingPeriod,
    ) -> Result<UsageCounters, RepositoryError>;
    /// Atomically add one unit while the stored count is below `limit`.
    ///
    /// Returns whether the unit was granted and the count after the attempt.
    /// Two concurrent callers at `limit - 1` cannot both succeed.
    async fn try_increment(
        &self,
        employer_id: Uuid,
        period: AccountingPeriod,
        resource: Resource,
        limit: Quota,
    ) -> Result<(bool, u32), RepositoryError>;
    /// Give one unit back; the count never drops below zero.
    async fn decrement(
        &self,
        employer_id: Uuid,
        period: AccountingPeriod,
        resource: Resource,
    ) -> Result<u32, RepositoryError>;
}

pub struct PostgresEmployerRepository {
    pool: PgPool,
}

impl PostgresEmployerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EmployerRepository for PostgresEmployerRepository {
    async fn create(&self, employer: &Employer) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO employers (id, external_id, company_name, plan, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(employer.id)
        .bind(&employer.external_id)
        .bind(&employer.company_name)
        .bind(employer.plan.to_string())
        .bind(employer.created_at)
        .bind(employer.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                RepositoryError::Conflict(format!("Employer {}", employer.external_id))
            }
            _ => RepositoryError::DatabaseError(e),
        })?;

        Ok(())
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Employer, RepositoryError> {
        let row = sqlx::query(
            r#"
            SELECT id, external_id, company_name, plan, created_at, updated_at
            FROM employers
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => RepositoryError::NotFound(format!("Employer {}", id)),
            _ => RepositoryError::DatabaseError(e),
        })?;

        row_to_employer(&row)
    }

    async fn get_by_external_id(&self, external_id: &str) -> Result<Employer, RepositoryError> {
        let row = sqlx::query(
            r#"
            SELECT id, external_id, company_name, plan, created_at, updated_at
            FROM employers
            WHERE external_id = $1
            "#,
        )
        .bind(external_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => {
                RepositoryError::NotFound(format!("Employer {}", external_id))
            }
            _ => RepositoryError::DatabaseError(e),
        })?;

        row_to_employer(&row)
    }

    async fn update_plan(&self, id: Uuid, plan: SubscriptionPlan) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE employers
            SET plan = $1, updated_at = $2
            WHERE id = $3
            "#,
        )
        .bind(plan.to_string())
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("Employer {}", id)));
        }

        Ok(())
    }
}

fn row_to_employer(row: &sqlx::postgres::PgRow) -> Result<Employer, RepositoryError> {
    let plan_str: String = row.try_get("plan")?;
    let plan = SubscriptionPlan::from_str(&plan_str)
        .map_err(|_| RepositoryError::InvalidData(format!("Unknown plan: {}", plan_str)))?;

    Ok(Employer {
        id: row.try_get("id")?,
        external_id: row.try_get("external_id")?,
        company_name: row.try_get("company_name")?,
        plan,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

pub struct PostgresUsageRepository {
    pool: PgPool,
}

impl PostgresUsageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn current_count(
        &self,
        employer_id: Uuid,
        period: AccountingPeriod,
        resource: Resource,
    ) -> Result<u32, RepositoryError> {
        let row = sqlx::query(
            r#"
            SELECT count
            FROM usage_counters
            WHERE employer_id = $1 AND period_start = $2 AND resource = $3
            "#,
        )
        .bind(employer_id)
        .bind(period.start())
        .bind(resource.to_string())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(r) => count_from_db(r.try_get("count")?),
            None => Ok(0),
        }
    }
}

#[async_trait]
impl UsageRepository for PostgresUsageRepository {
    async fn get_usage(
        &self,
        employer_id: Uuid,
        period: AccountingPeriod,
    ) -> Result<UsageCounters, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT resource, count
            FROM usage_counters
            WHERE employer_id = $1 AND period_start = $2
            "#,
        )
        .bind(employer_id)
        .bind(period.start())
        .fetch_all(&self.pool)
        .await?;

        let mut usage = UsageCounters::default();
        for row in &rows {
            let resource_str: String = row.try_get("resource")?;
            let resource = Resource::from_str(&resource_str).map_err(|_| {
                RepositoryError::InvalidData(format!("Unknown resource: {}", resource_str))
            })?;
            usage.set(resource, count_from_db(row.try_get("count")?)?);
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
        // NULL limit means unlimited. The conflict branch only fires while
        // the stored count is below the limit, so the row lock taken by the
        // upsert serialises concurrent consumers.
        let row = sqlx::query(
            r#"
            INSERT INTO usage_counters (employer_id, period_start, resource, count, updated_at)
            SELECT $1, $2, $3, 1, $5
            WHERE $4::INTEGER IS NULL OR $4::INTEGER > 0
            ON CONFLICT (employer_id, period_start, resource)
            DO UPDATE SET count = usage_counters.count + 1, updated_at = EXCLUDED.updated_at
            WHERE $4::INTEGER IS NULL OR usage_counters.count < $4::INTEGER
            RETURNING count
            "#,
        )
        .bind(employer_id)
        .bind(period.start())
        .bind(resource.to_string())
        .bind(limit.as_db_limit())
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(r) => Ok((true, count_from_db(r.try_get("count")?)?)),
            None => {
                let current = self.current_count(employer_id, period, resource).await?;
                Ok((false, current))
            }
        }
    }

    async fn decrement(
        &self,
        employer_id: Uuid,
        period: AccountingPeriod,
        resource: Resource,
    ) -> Result<u32, RepositoryError> {
        let row = sqlx::query(
            r#"
            UPDATE usage_counters
            SET count = GREATEST(count - 1, 0), updated_at = $4
            WHERE employer_id = $1 AND period_start = $2 AND resource = $3
            RETURNING count
            "#,
        )
        .bind(employer_id)
        .bind(period.start())
        .bind(resource.to_string())
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(r) => count_from_db(r.try_get("count")?),
            None => Ok(0),
        }
    }
}

fn count_from_db(count: i32) -> Result<u32, RepositoryError> {
    u32::try_from(count)
        .map_err(|_| RepositoryError::InvalidData(format!("Negative usage count: {}", count)))
}
