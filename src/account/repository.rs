//! Account persistence
//!
//! Uses runtime queries to avoid sqlx compile-time database connection.

use async_trait::async_trait;
use sqlx::postgres::PgRow;

use super::models::{Company, Membership, NewCompany, NewUser, User};
use crate::db::{PgStore, SafeRow, StoreError};

#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn create_user(&self, new_user: NewUser) -> Result<User, StoreError>;

    async fn user_by_id(&self, user_id: i64) -> Result<Option<User>, StoreError>;

    async fn user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn set_email_verified(&self, user_id: i64) -> Result<bool, StoreError>;

    async fn set_password_hash(&self, user_id: i64, hash: &str) -> Result<bool, StoreError>;

    /// Replace the login email, marking it verified. `Conflict` when taken.
    async fn set_email(&self, user_id: i64, email: &str) -> Result<bool, StoreError>;

    /// Create a company and a verified membership for its creator.
    async fn create_company(
        &self,
        owner_user_id: i64,
        new_company: NewCompany,
    ) -> Result<Company, StoreError>;

    async fn company_by_id(&self, company_id: i64) -> Result<Option<Company>, StoreError>;

    async fn companies_for_user(
        &self,
        user_id: i64,
        membership: Membership,
    ) -> Result<Vec<Company>, StoreError>;

    async fn company_for_user_by_name(
        &self,
        user_id: i64,
        name: &str,
    ) -> Result<Option<Company>, StoreError>;

    async fn is_member(&self, user_id: i64, company_id: i64) -> Result<bool, StoreError>;
}

const USER_COLUMNS: &str = "user_id, email, username, phone, password_hash, email_verified, \
                            is_active, balance, created_at";

const COMPANY_COLUMNS: &str =
    "c.company_id, c.name, c.registration_number, c.address, c.subscription_id, c.balance, \
     c.created_at";

fn row_to_user(row: &PgRow) -> Result<User, StoreError> {
    Ok(User {
        user_id: row.col("user_id")?,
        email: row.col("email")?,
        username: row.col("username")?,
        phone: row.col("phone")?,
        password_hash: row.col("password_hash")?,
        email_verified: row.col("email_verified")?,
        is_active: row.col("is_active")?,
        balance: row.col("balance")?,
        created_at: row.col("created_at")?,
    })
}

pub(crate) fn row_to_company(row: &PgRow) -> Result<Company, StoreError> {
    Ok(Company {
        company_id: row.col("company_id")?,
        name: row.col("name")?,
        registration_number: row.col("registration_number")?,
        address: row.col("address")?,
        subscription_id: row.col("subscription_id")?,
        balance: row.col("balance")?,
        created_at: row.col("created_at")?,
    })
}

#[async_trait]
impl AccountStore for PgStore {
    async fn create_user(&self, new_user: NewUser) -> Result<User, StoreError> {
        let row = sqlx::query(&format!(
            "INSERT INTO users_tb (email, username, phone, password_hash) \
             VALUES ($1, $2, $3, $4) RETURNING {}",
            USER_COLUMNS
        ))
        .bind(&new_user.email)
        .bind(&new_user.username)
        .bind(&new_user.phone)
        .bind(&new_user.password_hash)
        .fetch_one(self.pool())
        .await
        .map_err(StoreError::from_sqlx)?;

        row_to_user(&row)
    }

    async fn user_by_id(&self, user_id: i64) -> Result<Option<User>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM users_tb WHERE user_id = $1",
            USER_COLUMNS
        ))
        .bind(user_id)
        .fetch_optional(self.pool())
        .await?;

        row.as_ref().map(row_to_user).transpose()
    }

    async fn user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM users_tb WHERE email = $1",
            USER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(self.pool())
        .await?;

        row.as_ref().map(row_to_user).transpose()
    }

    async fn set_email_verified(&self, user_id: i64) -> Result<bool, StoreError> {
        let result = sqlx::query("UPDATE users_tb SET email_verified = TRUE WHERE user_id = $1")
            .bind(user_id)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn set_password_hash(&self, user_id: i64, hash: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("UPDATE users_tb SET password_hash = $2 WHERE user_id = $1")
            .bind(user_id)
            .bind(hash)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn set_email(&self, user_id: i64, email: &str) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE users_tb SET email = $2, email_verified = TRUE WHERE user_id = $1",
        )
        .bind(user_id)
        .bind(email)
        .execute(self.pool())
        .await
        .map_err(StoreError::from_sqlx)?;
        Ok(result.rows_affected() > 0)
    }

    async fn create_company(
        &self,
        owner_user_id: i64,
        new_company: NewCompany,
    ) -> Result<Company, StoreError> {
        let mut tx = self.pool().begin().await?;

        let row = sqlx::query(
            r#"
            INSERT INTO companies_tb AS c (name, registration_number, address)
            VALUES ($1, $2, $3)
            RETURNING c.company_id, c.name, c.registration_number, c.address,
                      c.subscription_id, c.balance, c.created_at
            "#,
        )
        .bind(&new_company.name)
        .bind(&new_company.registration_number)
        .bind(&new_company.address)
        .fetch_one(&mut *tx)
        .await
        .map_err(StoreError::from_sqlx)?;
        let company = row_to_company(&row)?;

        sqlx::query(
            r#"
            INSERT INTO user_company_tb (user_id, company_id, is_verified, verified_at)
            VALUES ($1, $2, TRUE, NOW())
            "#,
        )
        .bind(owner_user_id)
        .bind(company.company_id)
        .execute(&mut *tx)
        .await
        .map_err(StoreError::from_sqlx)?;

        tx.commit().await?;
        Ok(company)
    }

    async fn company_by_id(&self, company_id: i64) -> Result<Option<Company>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM companies_tb c WHERE c.company_id = $1",
            COMPANY_COLUMNS
        ))
        .bind(company_id)
        .fetch_optional(self.pool())
        .await?;

        row.as_ref().map(row_to_company).transpose()
    }

    async fn companies_for_user(
        &self,
        user_id: i64,
        membership: Membership,
    ) -> Result<Vec<Company>, StoreError> {
        let verified_only = membership == Membership::VerifiedOnly;
        let rows = sqlx::query(&format!(
            "SELECT {} FROM companies_tb c \
             JOIN user_company_tb uc ON uc.company_id = c.company_id \
             WHERE uc.user_id = $1 AND (uc.is_verified OR NOT $2) \
             ORDER BY c.company_id",
            COMPANY_COLUMNS
        ))
        .bind(user_id)
        .bind(verified_only)
        .fetch_all(self.pool())
        .await?;

        rows.iter().map(row_to_company).collect()
    }

    async fn company_for_user_by_name(
        &self,
        user_id: i64,
        name: &str,
    ) -> Result<Option<Company>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM companies_tb c \
             JOIN user_company_tb uc ON uc.company_id = c.company_id \
             WHERE uc.user_id = $1 AND c.name = $2 \
             ORDER BY c.company_id LIMIT 1",
            COMPANY_COLUMNS
        ))
        .bind(user_id)
        .bind(name)
        .fetch_optional(self.pool())
        .await?;

        row.as_ref().map(row_to_company).transpose()
    }

    async fn is_member(&self, user_id: i64, company_id: i64) -> Result<bool, StoreError> {
        let row = sqlx::query(
            "SELECT 1 AS one FROM user_company_tb WHERE user_id = $1 AND company_id = $2",
        )
        .bind(user_id)
        .bind(company_id)
        .fetch_optional(self.pool())
        .await?;
        Ok(row.is_some())
    }
}
