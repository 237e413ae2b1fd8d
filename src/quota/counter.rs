//! Monthly quota gate
//!
//! Company counters are plan-relative: `remaining = max_requests_per_month -
//! requests_made`, floored at zero, and zero when no plan is assigned. User
//! counters are raw usage figures and never gate a request.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

use super::period::PeriodKey;
use super::repository::{UsageCounter, UsageOwner, UsageStore};
use crate::account::AccountStore;
use crate::db::StoreError;
use crate::subscription::PlanStore;

#[derive(Debug, Error)]
pub enum QuotaError {
    #[error("Request limit reached for this month")]
    Exceeded,

    #[error("Unknown company {0}")]
    UnknownCompany(i64),

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
}

pub struct QuotaCounter {
    usage: Arc<dyn UsageStore>,
    accounts: Arc<dyn AccountStore>,
    plans: Arc<dyn PlanStore>,
}

impl QuotaCounter {
    pub fn new(
        usage: Arc<dyn UsageStore>,
        accounts: Arc<dyn AccountStore>,
        plans: Arc<dyn PlanStore>,
    ) -> Self {
        Self {
            usage,
            accounts,
            plans,
        }
    }

    pub fn current_period_key(now: DateTime<Utc>) -> PeriodKey {
        PeriodKey::containing(now)
    }

    pub async fn get_or_create(
        &self,
        owner: UsageOwner,
        period: PeriodKey,
    ) -> Result<UsageCounter, QuotaError> {
        Ok(self.usage.get_or_create(owner, period).await?)
    }

    pub async fn increment(&self, owner: UsageOwner) -> Result<UsageCounter, QuotaError> {
        self.increment_at(owner, Utc::now()).await
    }

    pub async fn increment_at(
        &self,
        owner: UsageOwner,
        now: DateTime<Utc>,
    ) -> Result<UsageCounter, QuotaError> {
        let counter = self
            .usage
            .increment(owner, Self::current_period_key(now))
            .await?;
        debug!(
            owner_kind = owner.kind(),
            owner_id = owner.id(),
            period = %counter.period,
            requests_made = counter.requests_made,
            "Usage counter incremented"
        );
        Ok(counter)
    }

    /// Count one attempt against both the calling user and the tenant.
    pub async fn record_attempt(
        &self,
        user_id: i64,
        company_id: i64,
        now: DateTime<Utc>,
    ) -> Result<(), QuotaError> {
        self.increment_at(UsageOwner::User(user_id), now).await?;
        self.increment_at(UsageOwner::Company(company_id), now).await?;
        Ok(())
    }

    pub async fn remaining(&self, company_id: i64) -> Result<i64, QuotaError> {
        self.remaining_at(company_id, Utc::now()).await
    }

    pub async fn remaining_at(&self, company_id: i64, now: DateTime<Utc>) -> Result<i64, QuotaError> {
        let company = self
            .accounts
            .company_by_id(company_id)
            .await?
            .ok_or(QuotaError::UnknownCompany(company_id))?;

        let Some(plan_id) = company.subscription_id else {
            return Ok(0);
        };
        let Some(plan) = self.plans.get_plan(plan_id).await? else {
            return Ok(0);
        };

        let counter = self
            .usage
            .get_or_create(UsageOwner::Company(company_id), Self::current_period_key(now))
            .await?;
        Ok((plan.max_requests_per_month - counter.requests_made).max(0))
    }

    pub async fn can_make_request(&self, company_id: i64) -> Result<bool, QuotaError> {
        Ok(self.remaining(company_id).await? > 0)
    }

    pub async fn can_make_request_at(
        &self,
        company_id: i64,
        now: DateTime<Utc>,
    ) -> Result<bool, QuotaError> {
        Ok(self.remaining_at(company_id, now).await? > 0)
    }

    /// Gate for a new request: `Exceeded` once the tenant has no capacity
    /// left this month.
    pub async fn ensure_capacity_at(
        &self,
        company_id: i64,
        now: DateTime<Utc>,
    ) -> Result<(), QuotaError> {
        if self.can_make_request_at(company_id, now).await? {
            return Ok(());
        }
        warn!(company_id, period = %Self::current_period_key(now), "Monthly quota exhausted");
        Err(QuotaError::Exceeded)
    }

    /// Raw counters of an owner, newest period first.
    pub async fn history(&self, owner: UsageOwner) -> Result<Vec<UsageCounter>, QuotaError> {
        Ok(self.usage.list_counters(owner).await?)
    }
}
