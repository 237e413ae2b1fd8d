//! Invoice record keeping scoped to the authenticating user

use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use super::models::{Invoice, InvoiceDraft, InvoiceStatus};
use super::repository::InvoiceStore;
use crate::api_auth::{Credentials, KeyVerifier, VerifiedPrincipal, VerifyError};
use crate::db::StoreError;
use crate::money::CRYPTO_SCALE;

#[derive(Debug, Error)]
pub enum InvoiceError {
    #[error("Invalid credentials")]
    Unauthorized,

    #[error("Invoice not found")]
    NotFound,

    #[error("{0}")]
    Validation(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
}

impl From<VerifyError> for InvoiceError {
    fn from(err: VerifyError) -> Self {
        match err {
            VerifyError::InvalidCredentials => InvoiceError::Unauthorized,
            VerifyError::Storage(e) => InvoiceError::Storage(e),
        }
    }
}

pub struct InvoiceService {
    verifier: Arc<KeyVerifier>,
    store: Arc<dyn InvoiceStore>,
}

impl InvoiceService {
    pub fn new(verifier: Arc<KeyVerifier>, store: Arc<dyn InvoiceStore>) -> Self {
        Self { verifier, store }
    }

    pub async fn create(
        &self,
        credentials: &Credentials,
        draft: InvoiceDraft,
    ) -> Result<Invoice, InvoiceError> {
        let principal = self.verifier.verify(credentials).await?;
        validate_draft(&draft)?;

        let invoice = Invoice {
            id: Uuid::new_v4(),
            user_id: principal.user_id(),
            amount: draft.amount,
            amount_currency: draft.amount_currency,
            required_method: draft.required_method,
            invoice_type: draft.invoice_type,
            description: draft.description,
            redirect_url: draft.redirect_url,
            callback_url: draft.callback_url,
            extra: draft.extra,
            payer_details: draft.payer_details,
            lifetime: draft.lifetime,
            status: InvoiceStatus::Created,
            created_at: Utc::now(),
        };
        let invoice = self.store.insert_invoice(invoice).await?;
        info!(
            invoice_id = %invoice.id,
            user_id = invoice.user_id,
            amount = %invoice.amount,
            "Invoice created"
        );
        Ok(invoice)
    }

    pub async fn get(&self, credentials: &Credentials, invoice_id: &str) -> Result<Invoice, InvoiceError> {
        let principal = self.verifier.verify(credentials).await?;
        let id = parse_invoice_id(invoice_id)?;
        self.store
            .invoice_for_user(id, principal.user_id())
            .await?
            .ok_or(InvoiceError::NotFound)
    }

    /// Caller's invoices, newest first.
    pub async fn list(&self, credentials: &Credentials) -> Result<Vec<Invoice>, InvoiceError> {
        let principal = self.verifier.verify(credentials).await?;
        Ok(self.store.invoices_for_user(principal.user_id()).await?)
    }

    pub async fn cancel(&self, credentials: &Credentials, invoice_id: &str) -> Result<Invoice, InvoiceError> {
        let principal = self.verifier.verify(credentials).await?;
        self.overwrite_status(&principal, invoice_id, InvoiceStatus::Canceled)
            .await
    }

    pub async fn complete(
        &self,
        credentials: &Credentials,
        invoice_id: &str,
    ) -> Result<Invoice, InvoiceError> {
        let principal = self.verifier.verify(credentials).await?;
        self.overwrite_status(&principal, invoice_id, InvoiceStatus::Completed)
            .await
    }

    async fn overwrite_status(
        &self,
        principal: &VerifiedPrincipal,
        invoice_id: &str,
        status: InvoiceStatus,
    ) -> Result<Invoice, InvoiceError> {
        let id = parse_invoice_id(invoice_id)?;
        let invoice = self
            .store
            .set_invoice_status(id, principal.user_id(), status)
            .await?
            .ok_or(InvoiceError::NotFound)?;
        info!(invoice_id = %id, user_id = principal.user_id(), status = %status, "Invoice status set");
        Ok(invoice)
    }
}

fn parse_invoice_id(raw: &str) -> Result<Uuid, InvoiceError> {
    Uuid::parse_str(raw.trim()).map_err(|_| InvoiceError::NotFound)
}

fn validate_draft(draft: &InvoiceDraft) -> Result<(), InvoiceError> {
    if draft.amount <= rust_decimal::Decimal::ZERO || draft.amount.scale() > CRYPTO_SCALE {
        return Err(InvoiceError::Validation(format!(
            "amount: must be positive with at most {} decimal places",
            CRYPTO_SCALE
        )));
    }
    if draft.invoice_type.trim().is_empty() || draft.invoice_type.len() > 20 {
        return Err(InvoiceError::Validation(
            "type: 1 to 20 characters".to_string(),
        ));
    }
    if draft.lifetime <= 0 {
        return Err(InvoiceError::Validation(
            "lifetime: must be a positive number of seconds".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::{AccountStore, NewCompany, NewUser};
    use crate::api_auth::ApiKeyStore;
    use crate::memory_store::MemoryStore;
    use rust_decimal::Decimal;

    async fn setup() -> (InvoiceService, MemoryStore, Credentials) {
        let store = MemoryStore::new();
        let user = store
            .create_user(NewUser {
                email: "shop@example.com".to_string(),
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
                    name: "Shop".to_string(),
                    registration_number: "RN-9".to_string(),
                    address: "Market 2".to_string(),
                },
            )
            .await
            .unwrap();
        let key = Uuid::new_v4();
        store.insert_key(company.company_id, key).await.unwrap();

        let shared = Arc::new(store.clone());
        let verifier = Arc::new(KeyVerifier::new(shared.clone(), shared.clone()));
        (
            InvoiceService::new(verifier, shared),
            store,
            Credentials::new("shop@example.com", key.to_string()),
        )
    }

    fn draft(amount: Decimal) -> InvoiceDraft {
        InvoiceDraft {
            amount,
            amount_currency: Some("USD".to_string()),
            required_method: None,
            invoice_type: "deposit".to_string(),
            description: Some("Order #1".to_string()),
            redirect_url: None,
            callback_url: None,
            extra: None,
            payer_details: None,
            lifetime: 3600,
        }
    }

    #[tokio::test]
    async fn test_create_get_list() {
        let (service, _store, creds) = setup().await;
        let first = service.create(&creds, draft(Decimal::new(10, 0))).await.unwrap();
        let second = service.create(&creds, draft(Decimal::new(20, 0))).await.unwrap();
        assert_eq!(first.status, InvoiceStatus::Created);

        let fetched = service.get(&creds, &first.id.to_string()).await.unwrap();
        assert_eq!(fetched, first);

        let all = service.list(&creds).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, second.id);
    }

    #[tokio::test]
    async fn test_cancel_and_complete_overwrite_status() {
        let (service, _store, creds) = setup().await;
        let invoice = service.create(&creds, draft(Decimal::ONE)).await.unwrap();
        let id = invoice.id.to_string();

        assert_eq!(
            service.cancel(&creds, &id).await.unwrap().status,
            InvoiceStatus::Canceled
        );
        assert_eq!(
            service.complete(&creds, &id).await.unwrap().status,
            InvoiceStatus::Completed
        );
    }

    #[tokio::test]
    async fn test_foreign_or_unknown_invoice_not_found() {
        let (service, store, creds) = setup().await;
        let invoice = service.create(&creds, draft(Decimal::ONE)).await.unwrap();

        let other = store
            .create_user(NewUser {
                email: "other@example.com".to_string(),
                username: None,
                phone: None,
                password_hash: None,
            })
            .await
            .unwrap();
        let company = store
            .create_company(
                other.user_id,
                NewCompany {
                    name: "Other".to_string(),
                    registration_number: "RN-10".to_string(),
                    address: "Elsewhere 3".to_string(),
                },
            )
            .await
            .unwrap();
        let key = Uuid::new_v4();
        store.insert_key(company.company_id, key).await.unwrap();
        let other_creds = Credentials::new("other@example.com", key.to_string());

        assert!(matches!(
            service.get(&other_creds, &invoice.id.to_string()).await,
            Err(InvoiceError::NotFound)
        ));
        assert!(matches!(
            service.cancel(&other_creds, &invoice.id.to_string()).await,
            Err(InvoiceError::NotFound)
        ));
        assert!(matches!(
            service.get(&creds, "nope").await,
            Err(InvoiceError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_create_validation() {
        let (service, _store, creds) = setup().await;
        let mut bad = draft(Decimal::ONE);
        bad.lifetime = 0;
        assert!(matches!(
            service.create(&creds, bad).await,
            Err(InvoiceError::Validation(_))
        ));
        assert!(matches!(
            service.create(&creds, draft(Decimal::ZERO)).await,
            Err(InvoiceError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_bad_credentials() {
        let (service, _store, _creds) = setup().await;
        let bad = Credentials::new("shop@example.com", Uuid::new_v4().to_string());
        assert!(matches!(
            service.list(&bad).await,
            Err(InvoiceError::Unauthorized)
        ));
    }
}
