use std::sync::Arc;

use crate::account::AccountStore;
use crate::api_auth::{ApiKeyStore, KeyService, KeyVerifier};
use crate::config::AppConfig;
use crate::db::Database;
use crate::invoice::{InvoiceService, InvoiceStore};
use crate::quota::{QuotaCounter, UsageStore};
use crate::reporting::ReportingService;
use crate::subscription::{PlanStore, SubscriptionService};
use crate::token_store::TokenStore;
use crate::user_auth::{Mailer, UserAuthService};
use crate::withdrawal::{CallbackNotifier, WithdrawalService, WithdrawalStore};

/// A backend able to hold every table of the service.
pub trait BillingStore:
    AccountStore + ApiKeyStore + UsageStore + PlanStore + WithdrawalStore + InvoiceStore
{
}

impl<T> BillingStore for T where
    T: AccountStore + ApiKeyStore + UsageStore + PlanStore + WithdrawalStore + InvoiceStore
{
}

/// Outbound side effects, swapped out in tests.
pub struct Collaborators {
    pub notifier: Arc<dyn CallbackNotifier>,
    pub tokens: Arc<dyn TokenStore>,
    pub mailer: Arc<dyn Mailer>,
}

/// Gateway shared state
pub struct AppState {
    pub withdrawals: WithdrawalService,
    pub invoices: InvoiceService,
    pub reporting: ReportingService,
    pub keys: KeyService,
    pub user_auth: UserAuthService,
    pub subscriptions: SubscriptionService,
    pub accounts: Arc<dyn AccountStore>,
    /// `X-Operator-Secret` value for the settlement route; closed when `None`
    pub operator_secret: Option<String>,
    /// Pinged by the health check when running on PostgreSQL
    pub database: Option<Arc<Database>>,
}

impl AppState {
    pub fn new<S>(
        store: Arc<S>,
        config: &AppConfig,
        collaborators: Collaborators,
        database: Option<Arc<Database>>,
    ) -> Self
    where
        S: BillingStore + 'static,
    {
        let accounts: Arc<dyn AccountStore> = store.clone();
        let api_keys: Arc<dyn ApiKeyStore> = store.clone();
        let usage: Arc<dyn UsageStore> = store.clone();
        let plans: Arc<dyn PlanStore> = store.clone();
        let withdrawals: Arc<dyn WithdrawalStore> = store.clone();
        let invoices: Arc<dyn InvoiceStore> = store;

        let verifier = Arc::new(KeyVerifier::new(accounts.clone(), api_keys.clone()));
        let quota = Arc::new(QuotaCounter::new(usage, accounts.clone(), plans.clone()));

        Self {
            withdrawals: WithdrawalService::new(
                verifier.clone(),
                quota.clone(),
                withdrawals.clone(),
                collaborators.notifier,
                config.billing.clone(),
            ),
            invoices: InvoiceService::new(verifier.clone(), invoices.clone()),
            reporting: ReportingService::new(
                verifier,
                accounts.clone(),
                invoices,
                withdrawals,
                quota,
            ),
            keys: KeyService::new(accounts.clone(), api_keys),
            user_auth: UserAuthService::new(
                accounts.clone(),
                collaborators.tokens,
                collaborators.mailer,
                config.auth.clone(),
            ),
            subscriptions: SubscriptionService::new(plans, accounts.clone()),
            accounts,
            operator_secret: config
                .billing
                .operator_secret
                .clone()
                .filter(|secret| !secret.is_empty()),
            database,
        }
    }
}
