//! API key lifecycle for logged-in users

use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use super::error::KeyError;
use super::models::ApiKeyRecord;
use super::repository::ApiKeyStore;
use crate::account::AccountStore;

pub struct KeyService {
    accounts: Arc<dyn AccountStore>,
    keys: Arc<dyn ApiKeyStore>,
}

impl KeyService {
    pub fn new(accounts: Arc<dyn AccountStore>, keys: Arc<dyn ApiKeyStore>) -> Self {
        Self { accounts, keys }
    }

    /// Issue a new active key for one of the user's companies.
    pub async fn generate(&self, user_id: i64, company_name: &str) -> Result<ApiKeyRecord, KeyError> {
        let company = self
            .accounts
            .company_for_user_by_name(user_id, company_name)
            .await?
            .ok_or(KeyError::CompanyNotFound)?;

        let record = self.keys.insert_key(company.company_id, Uuid::new_v4()).await?;
        info!(user_id, company_id = company.company_id, "API key generated");
        Ok(record)
    }

    /// True when `key` is active and bound to one of the user's companies.
    pub async fn check(&self, user_id: i64, key: &str) -> Result<bool, KeyError> {
        let Ok(key) = Uuid::parse_str(key.trim()) else {
            return Ok(false);
        };
        Ok(self
            .keys
            .find_active_key_for_user(user_id, key)
            .await?
            .is_some())
    }

    /// Replace an active key with a fresh one for the same company.
    pub async fn regenerate(&self, user_id: i64, key: &str) -> Result<ApiKeyRecord, KeyError> {
        let old = self.owned_active_key(user_id, key).await?;
        let record = self
            .keys
            .rotate_key(old.key, Uuid::new_v4())
            .await?
            .ok_or(KeyError::KeyNotFound)?;
        info!(user_id, company_id = record.company_id, "API key regenerated");
        Ok(record)
    }

    pub async fn deactivate(&self, user_id: i64, key: &str) -> Result<(), KeyError> {
        let old = self.owned_active_key(user_id, key).await?;
        if !self.keys.deactivate_key(old.key).await? {
            return Err(KeyError::KeyNotFound);
        }
        info!(user_id, company_id = old.company_id, "API key deactivated");
        Ok(())
    }

    async fn owned_active_key(&self, user_id: i64, key: &str) -> Result<ApiKeyRecord, KeyError> {
        let key = Uuid::parse_str(key.trim()).map_err(|_| KeyError::KeyNotFound)?;
        self.keys
            .find_active_key_for_user(user_id, key)
            .await?
            .ok_or(KeyError::KeyNotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::{NewCompany, NewUser};
    use crate::memory_store::MemoryStore;

    async fn setup() -> (KeyService, i64) {
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
        store
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
        let shared = Arc::new(store);
        (KeyService::new(shared.clone(), shared), user.user_id)
    }

    #[tokio::test]
    async fn test_generate_and_check() {
        let (service, user_id) = setup().await;
        let record = service.generate(user_id, "Acme").await.unwrap();
        assert!(record.is_active);
        assert!(service.check(user_id, &record.key.to_string()).await.unwrap());
        assert!(!service.check(user_id, "garbage").await.unwrap());
        assert!(!service.check(user_id + 1, &record.key.to_string()).await.unwrap());
    }

    #[tokio::test]
    async fn test_generate_for_foreign_company_fails() {
        let (service, user_id) = setup().await;
        let err = service.generate(user_id, "Globex").await.unwrap_err();
        assert!(matches!(err, KeyError::CompanyNotFound));
    }

    #[tokio::test]
    async fn test_regenerate_swaps_keys() {
        let (service, user_id) = setup().await;
        let old = service.generate(user_id, "Acme").await.unwrap();
        let new = service
            .regenerate(user_id, &old.key.to_string())
            .await
            .unwrap();

        assert_ne!(old.key, new.key);
        assert_eq!(old.company_id, new.company_id);
        assert!(!service.check(user_id, &old.key.to_string()).await.unwrap());
        assert!(service.check(user_id, &new.key.to_string()).await.unwrap());

        // the old key is spent
        let err = service
            .regenerate(user_id, &old.key.to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, KeyError::KeyNotFound));
    }

    #[tokio::test]
    async fn test_deactivate() {
        let (service, user_id) = setup().await;
        let record = service.generate(user_id, "Acme").await.unwrap();
        service
            .deactivate(user_id, &record.key.to_string())
            .await
            .unwrap();
        assert!(!service.check(user_id, &record.key.to_string()).await.unwrap());
        assert!(matches!(
            service.deactivate(user_id, &record.key.to_string()).await,
            Err(KeyError::KeyNotFound)
        ));
    }
}
