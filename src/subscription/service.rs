//! Plan catalog CRUD and per-company plan assignment

use std::sync::Arc;
use thiserror::Error;
use tracing::info;

use super::models::{PlanInput, SubscriptionHistory, SubscriptionPlan};
use super::repository::PlanStore;
use crate::account::AccountStore;
use crate::db::StoreError;
use crate::money::{FIAT_SCALE, check_non_negative};

#[derive(Debug, Error)]
pub enum SubscriptionError {
    #[error("Subscription plan not found")]
    PlanNotFound,

    #[error("Company not found")]
    CompanyNotFound,

    #[error("Subscription plan is assigned to a company")]
    PlanInUse,

    #[error("{0}")]
    Validation(String),

    #[error("Storage error: {0}")]
    Storage(StoreError),
}

impl From<StoreError> for SubscriptionError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::InUse(_) => SubscriptionError::PlanInUse,
            other => SubscriptionError::Storage(other),
        }
    }
}

pub struct SubscriptionService {
    plans: Arc<dyn PlanStore>,
    accounts: Arc<dyn AccountStore>,
}

impl SubscriptionService {
    pub fn new(plans: Arc<dyn PlanStore>, accounts: Arc<dyn AccountStore>) -> Self {
        Self { plans, accounts }
    }

    pub async fn create(&self, input: PlanInput) -> Result<SubscriptionPlan, SubscriptionError> {
        validate_input(&input)?;
        let plan = self.plans.create_plan(input).await?;
        info!(plan_id = plan.plan_id, name = %plan.name, "Subscription plan created");
        Ok(plan)
    }

    pub async fn list(&self) -> Result<Vec<SubscriptionPlan>, SubscriptionError> {
        Ok(self.plans.list_plans().await?)
    }

    pub async fn get(&self, plan_id: i64) -> Result<SubscriptionPlan, SubscriptionError> {
        self.plans
            .get_plan(plan_id)
            .await?
            .ok_or(SubscriptionError::PlanNotFound)
    }

    pub async fn update(
        &self,
        plan_id: i64,
        input: PlanInput,
    ) -> Result<SubscriptionPlan, SubscriptionError> {
        validate_input(&input)?;
        self.plans
            .update_plan(plan_id, input)
            .await?
            .ok_or(SubscriptionError::PlanNotFound)
    }

    pub async fn delete(&self, plan_id: i64) -> Result<(), SubscriptionError> {
        if !self.plans.delete_plan(plan_id).await? {
            return Err(SubscriptionError::PlanNotFound);
        }
        info!(plan_id, "Subscription plan deleted");
        Ok(())
    }

    /// Reassign a company's plan on behalf of one of its members.
    ///
    /// The history entry records the plan price; nothing is debited.
    pub async fn change_plan(
        &self,
        actor_user_id: i64,
        company_id: i64,
        plan_id: i64,
    ) -> Result<SubscriptionHistory, SubscriptionError> {
        if !self.accounts.is_member(actor_user_id, company_id).await? {
            return Err(SubscriptionError::CompanyNotFound);
        }
        if self.plans.get_plan(plan_id).await?.is_none() {
            return Err(SubscriptionError::PlanNotFound);
        }

        let entry = self
            .plans
            .assign_plan(actor_user_id, company_id, plan_id)
            .await?
            .ok_or(SubscriptionError::CompanyNotFound)?;

        info!(
            user_id = actor_user_id,
            company_id,
            plan_id,
            amount = %entry.amount,
            "Subscription plan changed"
        );
        Ok(entry)
    }

    pub async fn history(
        &self,
        actor_user_id: i64,
    ) -> Result<Vec<SubscriptionHistory>, SubscriptionError> {
        Ok(self.plans.history_for_user(actor_user_id).await?)
    }
}

fn validate_input(input: &PlanInput) -> Result<(), SubscriptionError> {
    if input.max_requests_per_month < 0 {
        return Err(SubscriptionError::Validation(
            "max_requests_per_month must not be negative".to_string(),
        ));
    }
    check_non_negative(input.price, FIAT_SCALE)
        .map_err(|e| SubscriptionError::Validation(format!("price: {}", e)))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::{NewCompany, NewUser};
    use crate::memory_store::MemoryStore;
    use crate::subscription::models::PlanTier;
    use rust_decimal::Decimal;

    fn plan(name: PlanTier, max: i64, price: Decimal) -> PlanInput {
        PlanInput {
            name,
            max_requests_per_month: max,
            price,
        }
    }

    async fn setup() -> (SubscriptionService, MemoryStore, i64, i64) {
        let store = MemoryStore::new();
        let user = store
            .create_user(NewUser {
                email: "owner@example.com".to_string(),
                username: None,
                phone: None,
                password_hash: None,
            })
            .await
            .unwrap();
        let company = store
            .create_company(
                user.user_id,
                NewCompany {
                    name: "Acme".to_string(),
                    registration_number: "RN-1".to_string(),
                    address: "Main st 1".to_string(),
                },
            )
            .await
            .unwrap();
        let shared = Arc::new(store.clone());
        (
            SubscriptionService::new(shared.clone(), shared),
            store,
            user.user_id,
            company.company_id,
        )
    }

    #[tokio::test]
    async fn test_crud() {
        let (service, _store, _, _) = setup().await;
        let created = service
            .create(plan(PlanTier::Basic, 100, Decimal::new(500, 2)))
            .await
            .unwrap();
        assert_eq!(service.list().await.unwrap().len(), 1);

        let updated = service
            .update(created.plan_id, plan(PlanTier::Premium, 1000, Decimal::new(2500, 2)))
            .await
            .unwrap();
        assert_eq!(updated.name, PlanTier::Premium);
        assert_eq!(updated.max_requests_per_month, 1000);

        service.delete(created.plan_id).await.unwrap();
        assert!(matches!(
            service.get(created.plan_id).await,
            Err(SubscriptionError::PlanNotFound)
        ));
    }

    #[tokio::test]
    async fn test_create_rejects_bad_input() {
        let (service, _store, _, _) = setup().await;
        assert!(matches!(
            service.create(plan(PlanTier::Free, -1, Decimal::ZERO)).await,
            Err(SubscriptionError::Validation(_))
        ));
        assert!(matches!(
            service.create(plan(PlanTier::Free, 10, Decimal::new(-1, 0))).await,
            Err(SubscriptionError::Validation(_))
        ));
        assert!(matches!(
            service.create(plan(PlanTier::Free, 10, Decimal::new(1001, 3))).await,
            Err(SubscriptionError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_change_plan_writes_history() {
        let (service, store, user_id, company_id) = setup().await;
        let basic = service
            .create(plan(PlanTier::Basic, 100, Decimal::new(500, 2)))
            .await
            .unwrap();
        let premium = service
            .create(plan(PlanTier::Premium, 1000, Decimal::new(2500, 2)))
            .await
            .unwrap();

        service.change_plan(user_id, company_id, basic.plan_id).await.unwrap();
        let entry = service
            .change_plan(user_id, company_id, premium.plan_id)
            .await
            .unwrap();
        assert_eq!(entry.amount, Decimal::new(2500, 2));

        let company = store.company_by_id(company_id).await.unwrap().unwrap();
        assert_eq!(company.subscription_id, Some(premium.plan_id));

        let history = service.history(user_id).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].plan_id, premium.plan_id);
        assert_eq!(history[1].plan_id, basic.plan_id);
    }

    #[tokio::test]
    async fn test_change_plan_requires_membership() {
        let (service, _store, user_id, company_id) = setup().await;
        let basic = service
            .create(plan(PlanTier::Basic, 100, Decimal::ZERO))
            .await
            .unwrap();
        assert!(matches!(
            service.change_plan(user_id + 100, company_id, basic.plan_id).await,
            Err(SubscriptionError::CompanyNotFound)
        ));
        assert!(matches!(
            service.change_plan(user_id, company_id, basic.plan_id + 100).await,
            Err(SubscriptionError::PlanNotFound)
        ));
    }

    #[tokio::test]
    async fn test_delete_plan_in_use() {
        let (service, _store, user_id, company_id) = setup().await;
        let basic = service
            .create(plan(PlanTier::Basic, 100, Decimal::ZERO))
            .await
            .unwrap();
        service.change_plan(user_id, company_id, basic.plan_id).await.unwrap();

        assert!(matches!(
            service.delete(basic.plan_id).await,
            Err(SubscriptionError::PlanInUse)
        ));
    }
}
