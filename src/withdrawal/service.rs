//! Withdrawal lifecycle
//!
//! ```text
//! submit:  verify -> count attempt -> quota gate -> parse amount -> fees
//!          -> insert
//!          -> callback (optional) -> commit
//! confirm: created -> processing
//! cancel:  created -> cancelled
//! settle:  processing -> payed, debiting the tenant balance atomically
//! ```

use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use super::callback::CallbackNotifier;
use super::error::WithdrawalError;
use super::models::{WithdrawalDraft, WithdrawalRequest};
use super::repository::{SettleOutcome, TransitionOutcome, WithdrawalStore};
use super::types::WithdrawalStatus;
use crate::api_auth::{Credentials, KeyVerifier};
use crate::config::BillingConfig;
use crate::fee;
use crate::money::{self, CRYPTO_SCALE};
use crate::quota::QuotaCounter;

pub struct WithdrawalService {
    verifier: Arc<KeyVerifier>,
    quota: Arc<QuotaCounter>,
    store: Arc<dyn WithdrawalStore>,
    notifier: Arc<dyn CallbackNotifier>,
    config: BillingConfig,
}

impl WithdrawalService {
    pub fn new(
        verifier: Arc<KeyVerifier>,
        quota: Arc<QuotaCounter>,
        store: Arc<dyn WithdrawalStore>,
        notifier: Arc<dyn CallbackNotifier>,
        config: BillingConfig,
    ) -> Self {
        Self {
            verifier,
            quota,
            store,
            notifier,
            config,
        }
    }

    /// Create a withdrawal request in `created` state.
    ///
    /// The attempt is counted against the user and the tenant before the
    /// quota gate and stays counted whatever happens next. When a callback
    /// URL is given the row only becomes visible after successful delivery.
    pub async fn submit(
        &self,
        credentials: &Credentials,
        draft: WithdrawalDraft,
    ) -> Result<WithdrawalRequest, WithdrawalError> {
        let principal = self.verifier.verify(credentials).await?;
        let now = Utc::now();

        self.quota
            .record_attempt(principal.user_id(), principal.company_id(), now)
            .await?;

        self.quota
            .ensure_capacity_at(principal.company_id(), now)
            .await?;

        let amount = validate_draft(&draft)?;
        let fees = fee::breakdown(amount, self.config.commission_rate, draft.subtract_from)
            .map_err(|e| WithdrawalError::Validation(format!("amount: {}", e)))?;
        let request = WithdrawalRequest {
            request_id: Uuid::new_v4(),
            user_id: principal.user_id(),
            company_id: principal.company_id(),
            amount,
            amount_currency: draft.amount_currency,
            currency: draft.method.settlement_currency().to_string(),
            rub_amount: None,
            method: draft.method,
            wallet: draft.wallet,
            subtract_from: draft.subtract_from,
            commission: fees.commission,
            deduction_amount: fees.deduction_amount,
            receive_amount: fees.receive_amount,
            callback_url: draft.callback_url,
            extra: draft.extra,
            status: WithdrawalStatus::Created,
            created_at: now,
            updated_at: now,
        };

        let pending = self.store.begin_insert(request).await?;

        if let Some(url) = pending.request().callback_url.clone() {
            let receipt = pending.request().receipt();
            if let Err(reason) = self.notifier.notify(&url, &receipt).await {
                warn!(
                    request_id = %receipt.id,
                    company_id = principal.company_id(),
                    callback_url = %url,
                    error = %reason,
                    "Withdrawal callback failed, discarding request"
                );
                return Err(WithdrawalError::CallbackDeliveryFailed(reason));
            }
        }

        let request = pending.commit().await?;
        info!(
            request_id = %request.request_id,
            company_id = request.company_id,
            amount = %request.amount,
            commission = %request.commission,
            deduction_amount = %request.deduction_amount,
            method = %request.method,
            "Withdrawal request created"
        );
        Ok(request)
    }

    pub async fn confirm(
        &self,
        credentials: &Credentials,
        request_id: &str,
    ) -> Result<WithdrawalRequest, WithdrawalError> {
        self.transition(credentials, request_id, WithdrawalStatus::Processing, "confirmed")
            .await
    }

    pub async fn cancel(
        &self,
        credentials: &Credentials,
        request_id: &str,
    ) -> Result<WithdrawalRequest, WithdrawalError> {
        self.transition(credentials, request_id, WithdrawalStatus::Cancelled, "cancelled")
            .await
    }

    /// Operator-only: pay out a confirmed request.
    pub async fn settle(&self, request_id: &str) -> Result<WithdrawalRequest, WithdrawalError> {
        let id = parse_request_id(request_id)?;

        match self.store.settle(id).await? {
            SettleOutcome::Settled {
                request,
                balance_after,
            } => {
                info!(
                    request_id = %id,
                    company_id = request.company_id,
                    deducted = %request.deduction_amount,
                    balance_after = %balance_after,
                    "Withdrawal settled"
                );
                Ok(request)
            }
            SettleOutcome::NotFound => Err(WithdrawalError::NotFound),
            SettleOutcome::InvalidState(status) => {
                warn!(request_id = %id, status = %status, "Settlement refused: not processing");
                Err(WithdrawalError::InvalidTransition {
                    action: "settled",
                    status,
                })
            }
            SettleOutcome::InsufficientBalance {
                required,
                available,
            } => {
                warn!(
                    request_id = %id,
                    required = %required,
                    available = %available,
                    "Settlement refused: insufficient balance"
                );
                Err(WithdrawalError::InsufficientBalance {
                    required,
                    available,
                })
            }
        }
    }

    pub async fn get(
        &self,
        credentials: &Credentials,
        request_id: &str,
    ) -> Result<WithdrawalRequest, WithdrawalError> {
        let principal = self.verifier.verify(credentials).await?;
        let id = parse_request_id(request_id)?;
        self.store
            .get_for_company(id, principal.company_id())
            .await?
            .ok_or(WithdrawalError::NotFound)
    }

    /// Tenant's requests, newest first.
    pub async fn history(
        &self,
        credentials: &Credentials,
    ) -> Result<Vec<WithdrawalRequest>, WithdrawalError> {
        let principal = self.verifier.verify(credentials).await?;
        Ok(self.store.list_for_company(principal.company_id()).await?)
    }

    async fn transition(
        &self,
        credentials: &Credentials,
        request_id: &str,
        to: WithdrawalStatus,
        action: &'static str,
    ) -> Result<WithdrawalRequest, WithdrawalError> {
        let principal = self.verifier.verify(credentials).await?;
        let id = parse_request_id(request_id)?;
        let from = WithdrawalStatus::Created;
        debug_assert!(from.can_transition_to(to));

        match self
            .store
            .transition(id, principal.company_id(), from, to)
            .await?
        {
            TransitionOutcome::Applied(request) => {
                info!(
                    request_id = %id,
                    company_id = request.company_id,
                    from = %from,
                    to = %to,
                    "Withdrawal state transition"
                );
                Ok(request)
            }
            TransitionOutcome::NotFound => Err(WithdrawalError::NotFound),
            TransitionOutcome::Rejected(status) => {
                warn!(request_id = %id, status = %status, to = %to, "Withdrawal transition refused");
                Err(WithdrawalError::InvalidTransition { action, status })
            }
        }
    }
}

/// Unparseable ids are reported exactly like unknown ones.
fn parse_request_id(raw: &str) -> Result<Uuid, WithdrawalError> {
    Uuid::parse_str(raw.trim()).map_err(|_| WithdrawalError::NotFound)
}

/// Parsed amount of a well-formed draft.
fn validate_draft(draft: &WithdrawalDraft) -> Result<Decimal, WithdrawalError> {
    let amount = money::parse_amount(&draft.amount, CRYPTO_SCALE)
        .map_err(|e| WithdrawalError::Validation(format!("amount: {}", e)))?;
    if draft.wallet.trim().is_empty() {
        return Err(WithdrawalError::Validation(
            "wallet: must not be empty".to_string(),
        ));
    }
    if draft.amount_currency.trim().is_empty() {
        return Err(WithdrawalError::Validation(
            "amount_currency: must not be empty".to_string(),
        ));
    }
    Ok(amount)
}
