//! Merchant totals and monthly usage reports

use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

use crate::account::{AccountStore, Membership};
use crate::api_auth::{Credentials, KeyVerifier, VerifyError};
use crate::db::StoreError;
use crate::invoice::InvoiceStore;
use crate::quota::{QuotaCounter, QuotaError, UsageCounter, UsageOwner};
use crate::withdrawal::WithdrawalStore;

#[derive(Debug, Error)]
pub enum ReportingError {
    #[error("Invalid credentials")]
    Unauthorized,

    #[error("User not found")]
    UnknownUser,

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
}

impl From<VerifyError> for ReportingError {
    fn from(err: VerifyError) -> Self {
        match err {
            VerifyError::InvalidCredentials => ReportingError::Unauthorized,
            VerifyError::Storage(e) => ReportingError::Storage(e),
        }
    }
}

impl From<QuotaError> for ReportingError {
    fn from(err: QuotaError) -> Self {
        match err {
            QuotaError::Storage(e) => ReportingError::Storage(e),
            // companies come from the membership table, so they exist
            QuotaError::Exceeded | QuotaError::UnknownCompany(_) => ReportingError::UnknownUser,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GeneralStatistics {
    /// Sum of all invoice amounts of the calling user
    pub total_invoices: Decimal,
    /// Sum of payed withdrawal amounts of the tenant
    pub total_withdrawals: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompanyUsage {
    pub company_id: i64,
    pub name: String,
    pub remaining_this_month: i64,
    pub periods: Vec<UsageCounter>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UsageReport {
    pub user: Vec<UsageCounter>,
    pub companies: Vec<CompanyUsage>,
}

pub struct ReportingService {
    verifier: Arc<KeyVerifier>,
    accounts: Arc<dyn AccountStore>,
    invoices: Arc<dyn InvoiceStore>,
    withdrawals: Arc<dyn WithdrawalStore>,
    quota: Arc<QuotaCounter>,
}

impl ReportingService {
    pub fn new(
        verifier: Arc<KeyVerifier>,
        accounts: Arc<dyn AccountStore>,
        invoices: Arc<dyn InvoiceStore>,
        withdrawals: Arc<dyn WithdrawalStore>,
        quota: Arc<QuotaCounter>,
    ) -> Self {
        Self {
            verifier,
            accounts,
            invoices,
            withdrawals,
            quota,
        }
    }

    pub async fn general_statistics(
        &self,
        credentials: &Credentials,
    ) -> Result<GeneralStatistics, ReportingError> {
        let principal = self.verifier.verify(credentials).await?;
        Ok(GeneralStatistics {
            total_invoices: self.invoices.total_invoiced(principal.user_id()).await?,
            total_withdrawals: self.withdrawals.total_payed(principal.company_id()).await?,
        })
    }

    /// Monthly counters of a logged-in user and of their verified companies.
    pub async fn usage_report(&self, user_id: i64) -> Result<UsageReport, ReportingError> {
        if self.accounts.user_by_id(user_id).await?.is_none() {
            return Err(ReportingError::UnknownUser);
        }

        let user = self.quota.history(UsageOwner::User(user_id)).await?;
        let mut companies = Vec::new();
        for company in self
            .accounts
            .companies_for_user(user_id, Membership::VerifiedOnly)
            .await?
        {
            companies.push(CompanyUsage {
                company_id: company.company_id,
                remaining_this_month: self.quota.remaining(company.company_id).await?,
                periods: self
                    .quota
                    .history(UsageOwner::Company(company.company_id))
                    .await?,
                name: company.name,
            });
        }

        Ok(UsageReport { user, companies })
    }
}
