//! In-process implementation of every store trait
//!
//! Backs the unit tests and the `--memory` development mode. All tables sit
//! behind one mutex, so each trait call is atomic with respect to the others.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

use crate::account::{AccountStore, Company, Membership, NewCompany, NewUser, User};
use crate::api_auth::{ApiKeyRecord, ApiKeyStore};
use crate::db::StoreError;
use crate::invoice::{Invoice, InvoiceStatus, InvoiceStore};
use crate::quota::{PeriodKey, UsageCounter, UsageOwner, UsageStore};
use crate::subscription::{PlanInput, PlanStore, SubscriptionHistory, SubscriptionPlan};
use crate::withdrawal::{
    PendingWithdrawal, SettleOutcome, TransitionOutcome, WithdrawalRequest, WithdrawalStatus,
    WithdrawalStore,
};

#[derive(Debug, Clone, Copy)]
struct MembershipRow {
    user_id: i64,
    company_id: i64,
    is_verified: bool,
}

#[derive(Default)]
struct Inner {
    next_id: i64,
    users: BTreeMap<i64, User>,
    companies: BTreeMap<i64, Company>,
    memberships: Vec<MembershipRow>,
    api_keys: Vec<ApiKeyRecord>,
    usage: HashMap<(UsageOwner, PeriodKey), i64>,
    plans: BTreeMap<i64, SubscriptionPlan>,
    history: Vec<SubscriptionHistory>,
    /// Insertion order
    withdrawals: Vec<WithdrawalRequest>,
    invoices: Vec<Invoice>,
}

impl Inner {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn is_member(&self, user_id: i64, company_id: i64) -> bool {
        self.memberships
            .iter()
            .any(|m| m.user_id == user_id && m.company_id == company_id)
    }
}

/// Newest first; equal timestamps keep reverse insertion order.
fn newest_first<T>(
    rows: impl DoubleEndedIterator<Item = T>,
    key: impl Fn(&T) -> DateTime<Utc>,
) -> Vec<T> {
    let mut out: Vec<T> = rows.rev().collect();
    out.sort_by(|a, b| key(b).cmp(&key(a)));
    out
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Set a company balance directly. Funding is outside the service surface.
    pub fn seed_company_balance(&self, company_id: i64, balance: Decimal) -> bool {
        match self.lock().companies.get_mut(&company_id) {
            Some(company) => {
                company.balance = balance;
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn create_user(&self, new_user: NewUser) -> Result<User, StoreError> {
        let mut inner = self.lock();
        if inner.users.values().any(|u| u.email == new_user.email) {
            return Err(StoreError::Conflict(format!(
                "users_tb.email {}",
                new_user.email
            )));
        }
        let user = User {
            user_id: inner.next_id(),
            email: new_user.email,
            username: new_user.username,
            phone: new_user.phone,
            password_hash: new_user.password_hash,
            email_verified: false,
            is_active: true,
            balance: Decimal::ZERO,
            created_at: Utc::now(),
        };
        inner.users.insert(user.user_id, user.clone());
        Ok(user)
    }

    async fn user_by_id(&self, user_id: i64) -> Result<Option<User>, StoreError> {
        Ok(self.lock().users.get(&user_id).cloned())
    }

    async fn user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self.lock().users.values().find(|u| u.email == email).cloned())
    }

    async fn set_email_verified(&self, user_id: i64) -> Result<bool, StoreError> {
        Ok(match self.lock().users.get_mut(&user_id) {
            Some(user) => {
                user.email_verified = true;
                true
            }
            None => false,
        })
    }

    async fn set_password_hash(&self, user_id: i64, hash: &str) -> Result<bool, StoreError> {
        Ok(match self.lock().users.get_mut(&user_id) {
            Some(user) => {
                user.password_hash = Some(hash.to_string());
                true
            }
            None => false,
        })
    }

    async fn set_email(&self, user_id: i64, email: &str) -> Result<bool, StoreError> {
        let mut inner = self.lock();
        if inner
            .users
            .values()
            .any(|u| u.email == email && u.user_id != user_id)
        {
            return Err(StoreError::Conflict(format!("users_tb.email {}", email)));
        }
        Ok(match inner.users.get_mut(&user_id) {
            Some(user) => {
                user.email = email.to_string();
                user.email_verified = true;
                true
            }
            None => false,
        })
    }

    async fn create_company(
        &self,
        owner_user_id: i64,
        new_company: NewCompany,
    ) -> Result<Company, StoreError> {
        let mut inner = self.lock();
        if !inner.users.contains_key(&owner_user_id) {
            return Err(StoreError::Corrupt(format!(
                "user_company_tb.user_id {} has no user",
                owner_user_id
            )));
        }
        let company = Company {
            company_id: inner.next_id(),
            name: new_company.name,
            registration_number: new_company.registration_number,
            address: new_company.address,
            subscription_id: None,
            balance: Decimal::ZERO,
            created_at: Utc::now(),
        };
        inner.companies.insert(company.company_id, company.clone());
        inner.memberships.push(MembershipRow {
            user_id: owner_user_id,
            company_id: company.company_id,
            is_verified: true,
        });
        Ok(company)
    }

    async fn company_by_id(&self, company_id: i64) -> Result<Option<Company>, StoreError> {
        Ok(self.lock().companies.get(&company_id).cloned())
    }

    async fn companies_for_user(
        &self,
        user_id: i64,
        membership: Membership,
    ) -> Result<Vec<Company>, StoreError> {
        let inner = self.lock();
        let mut companies: Vec<Company> = inner
            .memberships
            .iter()
            .filter(|m| m.user_id == user_id)
            .filter(|m| m.is_verified || membership == Membership::Any)
            .filter_map(|m| inner.companies.get(&m.company_id).cloned())
            .collect();
        companies.sort_by_key(|c| c.company_id);
        companies.dedup_by_key(|c| c.company_id);
        Ok(companies)
    }

    async fn company_for_user_by_name(
        &self,
        user_id: i64,
        name: &str,
    ) -> Result<Option<Company>, StoreError> {
        let companies = self.companies_for_user(user_id, Membership::Any).await?;
        Ok(companies.into_iter().find(|c| c.name == name))
    }

    async fn is_member(&self, user_id: i64, company_id: i64) -> Result<bool, StoreError> {
        Ok(self.lock().is_member(user_id, company_id))
    }
}

#[async_trait]
impl ApiKeyStore for MemoryStore {
    async fn find_active_key_for_user(
        &self,
        user_id: i64,
        key: Uuid,
    ) -> Result<Option<ApiKeyRecord>, StoreError> {
        Ok(self
            .find_key_for_user(user_id, key)
            .await?
            .filter(|record| record.is_active))
    }

    async fn find_key_for_user(
        &self,
        user_id: i64,
        key: Uuid,
    ) -> Result<Option<ApiKeyRecord>, StoreError> {
        let inner = self.lock();
        Ok(inner
            .api_keys
            .iter()
            .find(|record| record.key == key && inner.is_member(user_id, record.company_id))
            .cloned())
    }

    async fn insert_key(&self, company_id: i64, key: Uuid) -> Result<ApiKeyRecord, StoreError> {
        let mut inner = self.lock();
        if inner.api_keys.iter().any(|record| record.key == key) {
            return Err(StoreError::Conflict(format!("api_keys_tb.api_key {}", key)));
        }
        let record = ApiKeyRecord {
            key,
            company_id,
            is_active: true,
            created_at: Utc::now(),
        };
        inner.api_keys.push(record.clone());
        Ok(record)
    }

    async fn deactivate_key(&self, key: Uuid) -> Result<bool, StoreError> {
        let mut inner = self.lock();
        Ok(
            match inner
                .api_keys
                .iter_mut()
                .find(|record| record.key == key && record.is_active)
            {
                Some(record) => {
                    record.is_active = false;
                    true
                }
                None => false,
            },
        )
    }

    async fn rotate_key(&self, old: Uuid, new: Uuid) -> Result<Option<ApiKeyRecord>, StoreError> {
        let mut inner = self.lock();
        if inner.api_keys.iter().any(|record| record.key == new) {
            return Err(StoreError::Conflict(format!("api_keys_tb.api_key {}", new)));
        }
        let Some(old_record) = inner
            .api_keys
            .iter_mut()
            .find(|record| record.key == old && record.is_active)
        else {
            return Ok(None);
        };
        old_record.is_active = false;
        let record = ApiKeyRecord {
            key: new,
            company_id: old_record.company_id,
            is_active: true,
            created_at: Utc::now(),
        };
        inner.api_keys.push(record.clone());
        Ok(Some(record))
    }
}

#[async_trait]
impl UsageStore for MemoryStore {
    async fn get_or_create(
        &self,
        owner: UsageOwner,
        period: PeriodKey,
    ) -> Result<UsageCounter, StoreError> {
        let mut inner = self.lock();
        let requests_made = *inner.usage.entry((owner, period)).or_insert(0);
        Ok(UsageCounter {
            owner,
            period,
            requests_made,
        })
    }

    async fn increment(
        &self,
        owner: UsageOwner,
        period: PeriodKey,
    ) -> Result<UsageCounter, StoreError> {
        let mut inner = self.lock();
        let count = inner.usage.entry((owner, period)).or_insert(0);
        *count += 1;
        Ok(UsageCounter {
            owner,
            period,
            requests_made: *count,
        })
    }

    async fn list_counters(&self, owner: UsageOwner) -> Result<Vec<UsageCounter>, StoreError> {
        let inner = self.lock();
        let mut counters: Vec<UsageCounter> = inner
            .usage
            .iter()
            .filter(|((o, _), _)| *o == owner)
            .map(|((owner, period), requests_made)| UsageCounter {
                owner: *owner,
                period: *period,
                requests_made: *requests_made,
            })
            .collect();
        counters.sort_by(|a, b| b.period.cmp(&a.period));
        Ok(counters)
    }
}

#[async_trait]
impl PlanStore for MemoryStore {
    async fn create_plan(&self, input: PlanInput) -> Result<SubscriptionPlan, StoreError> {
        let mut inner = self.lock();
        let plan = SubscriptionPlan {
            plan_id: inner.next_id(),
            name: input.name,
            max_requests_per_month: input.max_requests_per_month,
            price: input.price,
            created_at: Utc::now(),
        };
        inner.plans.insert(plan.plan_id, plan.clone());
        Ok(plan)
    }

    async fn list_plans(&self) -> Result<Vec<SubscriptionPlan>, StoreError> {
        Ok(self.lock().plans.values().cloned().collect())
    }

    async fn get_plan(&self, plan_id: i64) -> Result<Option<SubscriptionPlan>, StoreError> {
        Ok(self.lock().plans.get(&plan_id).cloned())
    }

    async fn update_plan(
        &self,
        plan_id: i64,
        input: PlanInput,
    ) -> Result<Option<SubscriptionPlan>, StoreError> {
        let mut inner = self.lock();
        Ok(inner.plans.get_mut(&plan_id).map(|plan| {
            plan.name = input.name;
            plan.max_requests_per_month = input.max_requests_per_month;
            plan.price = input.price;
            plan.clone()
        }))
    }

    async fn delete_plan(&self, plan_id: i64) -> Result<bool, StoreError> {
        let mut inner = self.lock();
        if inner
            .companies
            .values()
            .any(|c| c.subscription_id == Some(plan_id))
        {
            return Err(StoreError::InUse(format!(
                "companies_tb.subscription_id references plan {}",
                plan_id
            )));
        }
        Ok(inner.plans.remove(&plan_id).is_some())
    }

    async fn assign_plan(
        &self,
        user_id: i64,
        company_id: i64,
        plan_id: i64,
    ) -> Result<Option<SubscriptionHistory>, StoreError> {
        let mut inner = self.lock();
        let Some(price) = inner.plans.get(&plan_id).map(|p| p.price) else {
            return Ok(None);
        };
        let Some(company) = inner.companies.get_mut(&company_id) else {
            return Ok(None);
        };
        company.subscription_id = Some(plan_id);

        let entry = SubscriptionHistory {
            history_id: inner.next_id(),
            user_id,
            company_id,
            plan_id,
            amount: price,
            date: Utc::now(),
        };
        inner.history.push(entry.clone());
        Ok(Some(entry))
    }

    async fn history_for_user(&self, user_id: i64) -> Result<Vec<SubscriptionHistory>, StoreError> {
        let inner = self.lock();
        Ok(newest_first(
            inner.history.iter().filter(|h| h.user_id == user_id).cloned(),
            |h| h.date,
        ))
    }
}

struct MemoryPendingWithdrawal {
    store: MemoryStore,
    request: WithdrawalRequest,
}

#[async_trait]
impl PendingWithdrawal for MemoryPendingWithdrawal {
    fn request(&self) -> &WithdrawalRequest {
        &self.request
    }

    async fn commit(self: Box<Self>) -> Result<WithdrawalRequest, StoreError> {
        let mut inner = self.store.lock();
        if inner
            .withdrawals
            .iter()
            .any(|r| r.request_id == self.request.request_id)
        {
            return Err(StoreError::Conflict(format!(
                "withdrawal_requests_tb.request_id {}",
                self.request.request_id
            )));
        }
        inner.withdrawals.push(self.request.clone());
        Ok(self.request)
    }
}

#[async_trait]
impl WithdrawalStore for MemoryStore {
    async fn begin_insert(
        &self,
        request: WithdrawalRequest,
    ) -> Result<Box<dyn PendingWithdrawal>, StoreError> {
        Ok(Box::new(MemoryPendingWithdrawal {
            store: self.clone(),
            request,
        }))
    }

    async fn get(&self, request_id: Uuid) -> Result<Option<WithdrawalRequest>, StoreError> {
        Ok(self
            .lock()
            .withdrawals
            .iter()
            .find(|r| r.request_id == request_id)
            .cloned())
    }

    async fn get_for_company(
        &self,
        request_id: Uuid,
        company_id: i64,
    ) -> Result<Option<WithdrawalRequest>, StoreError> {
        Ok(self
            .get(request_id)
            .await?
            .filter(|r| r.company_id == company_id))
    }

    async fn transition(
        &self,
        request_id: Uuid,
        company_id: i64,
        from: WithdrawalStatus,
        to: WithdrawalStatus,
    ) -> Result<TransitionOutcome, StoreError> {
        let mut inner = self.lock();
        let Some(request) = inner
            .withdrawals
            .iter_mut()
            .find(|r| r.request_id == request_id && r.company_id == company_id)
        else {
            return Ok(TransitionOutcome::NotFound);
        };
        if request.status != from {
            return Ok(TransitionOutcome::Rejected(request.status));
        }
        request.status = to;
        request.updated_at = Utc::now();
        Ok(TransitionOutcome::Applied(request.clone()))
    }

    async fn settle(&self, request_id: Uuid) -> Result<SettleOutcome, StoreError> {
        let mut guard = self.lock();
        let inner = &mut *guard;

        let Some(request) = inner
            .withdrawals
            .iter_mut()
            .find(|r| r.request_id == request_id)
        else {
            return Ok(SettleOutcome::NotFound);
        };
        if request.status != WithdrawalStatus::Processing {
            return Ok(SettleOutcome::InvalidState(request.status));
        }

        let company = inner.companies.get_mut(&request.company_id).ok_or_else(|| {
            StoreError::Corrupt(format!(
                "withdrawal {} references missing company {}",
                request_id, request.company_id
            ))
        })?;
        let required = request.deduction_amount;
        if company.balance < required {
            return Ok(SettleOutcome::InsufficientBalance {
                required,
                available: company.balance,
            });
        }

        company.balance -= required;
        request.status = WithdrawalStatus::Payed;
        request.updated_at = Utc::now();
        Ok(SettleOutcome::Settled {
            request: request.clone(),
            balance_after: company.balance,
        })
    }

    async fn list_for_company(
        &self,
        company_id: i64,
    ) -> Result<Vec<WithdrawalRequest>, StoreError> {
        let inner = self.lock();
        Ok(newest_first(
            inner
                .withdrawals
                .iter()
                .filter(|r| r.company_id == company_id)
                .cloned(),
            |r| r.created_at,
        ))
    }

    async fn total_payed(&self, company_id: i64) -> Result<Decimal, StoreError> {
        Ok(self
            .lock()
            .withdrawals
            .iter()
            .filter(|r| r.company_id == company_id && r.status == WithdrawalStatus::Payed)
            .map(|r| r.amount)
            .sum())
    }
}

#[async_trait]
impl InvoiceStore for MemoryStore {
    async fn insert_invoice(&self, invoice: Invoice) -> Result<Invoice, StoreError> {
        let mut inner = self.lock();
        if inner.invoices.iter().any(|i| i.id == invoice.id) {
            return Err(StoreError::Conflict(format!("invoices_tb.invoice_id {}", invoice.id)));
        }
        inner.invoices.push(invoice.clone());
        Ok(invoice)
    }

    async fn invoice_for_user(
        &self,
        invoice_id: Uuid,
        user_id: i64,
    ) -> Result<Option<Invoice>, StoreError> {
        Ok(self
            .lock()
            .invoices
            .iter()
            .find(|i| i.id == invoice_id && i.user_id == user_id)
            .cloned())
    }

    async fn invoices_for_user(&self, user_id: i64) -> Result<Vec<Invoice>, StoreError> {
        let inner = self.lock();
        Ok(newest_first(
            inner.invoices.iter().filter(|i| i.user_id == user_id).cloned(),
            |i| i.created_at,
        ))
    }

    async fn set_invoice_status(
        &self,
        invoice_id: Uuid,
        user_id: i64,
        status: InvoiceStatus,
    ) -> Result<Option<Invoice>, StoreError> {
        let mut inner = self.lock();
        Ok(inner
            .invoices
            .iter_mut()
            .find(|i| i.id == invoice_id && i.user_id == user_id)
            .map(|invoice| {
                invoice.status = status;
                invoice.clone()
            }))
    }

    async fn total_invoiced(&self, user_id: i64) -> Result<Decimal, StoreError> {
        Ok(self
            .lock()
            .invoices
            .iter()
            .filter(|i| i.user_id == user_id)
            .map(|i| i.amount)
            .sum())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subscription::PlanTier;
    use crate::withdrawal::{PayoutMethod, SubtractFrom};

    async fn company_with_owner(store: &MemoryStore, email: &str) -> (User, Company) {
        let user = store
            .create_user(NewUser {
                email: email.to_string(),
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
        (user, company)
    }

    fn request(company_id: i64, user_id: i64, deduction: Decimal) -> WithdrawalRequest {
        let now = Utc::now();
        WithdrawalRequest {
            request_id: Uuid::new_v4(),
            user_id,
            company_id,
            amount: deduction,
            amount_currency: "USD".to_string(),
            currency: "BTC".to_string(),
            rub_amount: None,
            method: PayoutMethod::Bitcoin,
            wallet: "bc1q".to_string(),
            subtract_from: SubtractFrom::Amount,
            commission: Decimal::ZERO,
            deduction_amount: deduction,
            receive_amount: deduction,
            callback_url: None,
            extra: None,
            status: WithdrawalStatus::Processing,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let store = MemoryStore::new();
        company_with_owner(&store, "a@example.com").await;
        let err = store
            .create_user(NewUser {
                email: "a@example.com".to_string(),
                username: None,
                phone: None,
                password_hash: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_dropped_pending_insert_leaves_no_row() {
        let store = MemoryStore::new();
        let (user, company) = company_with_owner(&store, "b@example.com").await;

        let pending = store
            .begin_insert(request(company.company_id, user.user_id, Decimal::ONE))
            .await
            .unwrap();
        let id = pending.request().request_id;
        drop(pending);
        assert!(store.get(id).await.unwrap().is_none());

        let pending = store
            .begin_insert(request(company.company_id, user.user_id, Decimal::ONE))
            .await
            .unwrap();
        let committed = pending.commit().await.unwrap();
        assert!(store.get(committed.request_id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_settle_checks_balance_and_status() {
        let store = MemoryStore::new();
        let (user, company) = company_with_owner(&store, "c@example.com").await;
        store.seed_company_balance(company.company_id, Decimal::new(10, 0));

        let pending = store
            .begin_insert(request(company.company_id, user.user_id, Decimal::new(11, 0)))
            .await
            .unwrap();
        let too_big = pending.commit().await.unwrap();
        assert_eq!(
            store.settle(too_big.request_id).await.unwrap(),
            SettleOutcome::InsufficientBalance {
                required: Decimal::new(11, 0),
                available: Decimal::new(10, 0),
            }
        );

        let pending = store
            .begin_insert(request(company.company_id, user.user_id, Decimal::new(4, 0)))
            .await
            .unwrap();
        let ok = pending.commit().await.unwrap();
        match store.settle(ok.request_id).await.unwrap() {
            SettleOutcome::Settled { balance_after, .. } => {
                assert_eq!(balance_after, Decimal::new(6, 0))
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(
            store.settle(ok.request_id).await.unwrap(),
            SettleOutcome::InvalidState(WithdrawalStatus::Payed)
        );
        assert_eq!(
            store.settle(Uuid::new_v4()).await.unwrap(),
            SettleOutcome::NotFound
        );
    }

    #[tokio::test]
    async fn test_rotate_key_is_single_use() {
        let store = MemoryStore::new();
        let (user, company) = company_with_owner(&store, "d@example.com").await;
        let old = Uuid::new_v4();
        store.insert_key(company.company_id, old).await.unwrap();

        let new = Uuid::new_v4();
        let rotated = store.rotate_key(old, new).await.unwrap().unwrap();
        assert_eq!(rotated.company_id, company.company_id);
        assert!(store.rotate_key(old, Uuid::new_v4()).await.unwrap().is_none());
        assert!(
            store
                .find_active_key_for_user(user.user_id, old)
                .await
                .unwrap()
                .is_none()
        );
        assert!(
            store
                .find_active_key_for_user(user.user_id, new)
                .await
                .unwrap()
                .is_some()
        );
    }

    #[tokio::test]
    async fn test_plan_delete_blocked_while_assigned() {
        let store = MemoryStore::new();
        let (user, company) = company_with_owner(&store, "e@example.com").await;
        let plan = store
            .create_plan(PlanInput {
                name: PlanTier::Basic,
                max_requests_per_month: 10,
                price: Decimal::new(500, 2),
            })
            .await
            .unwrap();
        store
            .assign_plan(user.user_id, company.company_id, plan.plan_id)
            .await
            .unwrap()
            .unwrap();

        assert!(matches!(
            store.delete_plan(plan.plan_id).await,
            Err(StoreError::InUse(_))
        ));
        assert!(
            store
                .assign_plan(user.user_id, company.company_id, plan.plan_id + 100)
                .await
                .unwrap()
                .is_none()
        );
    }
}
