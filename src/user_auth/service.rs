use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;
use validator::{Validate, ValidateEmail};

use super::mailer::Mailer;
use crate::account::{AccountStore, NewUser, User};
use crate::config::AuthConfig;
use crate::db::StoreError;
use crate::token_store::TokenStore;

/// JWT Claims structure
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String, // Subject (user_id as string)
    pub exp: usize,  // Expiration time (as UTC timestamp)
    pub iat: usize,  // Issued at
}

impl Claims {
    pub fn user_id(&self) -> Option<i64> {
        self.sub.parse().ok()
    }
}

/// User Registration Request
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
    #[validate(length(min = 1, max = 150))]
    pub username: Option<String>,
    #[validate(length(min = 5, max = 32))]
    pub phone: Option<String>,
}

/// User Login Request
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Auth Response (JWT)
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user_id: i64,
    pub email: String,
}

#[derive(Debug, Error)]
pub enum UserAuthError {
    #[error("A user with that email already exists")]
    EmailTaken,

    #[error("A user with that email already exists and is verified.")]
    AlreadyVerified,

    #[error("User with this email does not exist.")]
    UserNotFound,

    #[error("Invalid email or password")]
    InvalidLogin,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Wrong password.")]
    WrongPassword,

    #[error("{0}")]
    Validation(String),

    #[error("Mail delivery failed: {0}")]
    Mail(String),

    #[error("Password hashing failed: {0}")]
    Hashing(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
}

pub struct UserAuthService {
    accounts: Arc<dyn AccountStore>,
    tokens: Arc<dyn TokenStore>,
    mailer: Arc<dyn Mailer>,
    config: AuthConfig,
}

impl UserAuthService {
    pub fn new(
        accounts: Arc<dyn AccountStore>,
        tokens: Arc<dyn TokenStore>,
        mailer: Arc<dyn Mailer>,
        config: AuthConfig,
    ) -> Self {
        Self {
            accounts,
            tokens,
            mailer,
            config,
        }
    }

    /// Register a new, not yet email-verified user
    pub async fn register(&self, req: RegisterRequest) -> Result<User, UserAuthError> {
        req.validate()
            .map_err(|e| UserAuthError::Validation(e.to_string()))?;

        if self.accounts.user_by_email(&req.email).await?.is_some() {
            return Err(UserAuthError::EmailTaken);
        }

        let password_hash = hash_password(&req.password)?;
        let user = self
            .accounts
            .create_user(NewUser {
                email: req.email,
                username: req.username,
                phone: req.phone,
                password_hash: Some(password_hash),
            })
            .await
            .map_err(|e| match e {
                StoreError::Conflict(_) => UserAuthError::EmailTaken,
                other => UserAuthError::Storage(other),
            })?;

        info!(user_id = user.user_id, "User registered");
        Ok(user)
    }

    /// Login user and issue JWT
    pub async fn login(&self, req: LoginRequest) -> Result<AuthResponse, UserAuthError> {
        let user = self
            .accounts
            .user_by_email(&req.email)
            .await?
            .filter(|u| u.is_active)
            .ok_or(UserAuthError::InvalidLogin)?;

        let stored = user
            .password_hash
            .as_deref()
            .ok_or(UserAuthError::InvalidLogin)?;
        if !verify_password(&req.password, stored) {
            warn!(user_id = user.user_id, "Login failed: wrong password");
            return Err(UserAuthError::InvalidLogin);
        }

        let token = self.issue_token(user.user_id)?;
        Ok(AuthResponse {
            token,
            user_id: user.user_id,
            email: user.email,
        })
    }

    /// Verify JWT token
    pub fn verify_token(&self, token: &str) -> Result<Claims, UserAuthError> {
        let decoding_key = DecodingKey::from_secret(self.config.jwt_secret.as_bytes());
        let validation = Validation::new(Algorithm::HS256);
        let token_data = decode::<Claims>(token, &decoding_key, &validation)
            .map_err(|_| UserAuthError::InvalidToken)?;
        Ok(token_data.claims)
    }

    /// Mail a one-shot confirmation link for `email`.
    pub async fn start_registration(&self, email: &str) -> Result<(), UserAuthError> {
        if email.trim().is_empty() {
            return Err(UserAuthError::Validation(
                "Email address is required.".to_string(),
            ));
        }
        if let Some(user) = self.accounts.user_by_email(email).await?
            && user.email_verified
        {
            return Err(UserAuthError::AlreadyVerified);
        }

        let token = Uuid::new_v4().to_string();
        self.tokens.put(&token, email, self.config.token_ttl());
        let confirm_url = format!(
            "{}/api/v1/auth/confirm-registration/{}",
            self.config.public_base_url.trim_end_matches('/'),
            token
        );
        self.mailer
            .send(
                email,
                "Confirm Your Email Address",
                &format!("Please follow this link to confirm your email address: {}", confirm_url),
            )
            .await
            .map_err(UserAuthError::Mail)
    }

    /// Consume a confirmation token. Always yields a frontend URL to redirect
    /// to: the success page, or the error page carrying the reason.
    pub async fn confirm_registration(&self, token: &str) -> Result<String, UserAuthError> {
        let base = self.config.frontend_base_url.trim_end_matches('/');

        let Some(email) = self.tokens.take(token) else {
            return Ok(format!("{}/error?message=Invalid or expired link.", base));
        };
        let Some(user) = self.accounts.user_by_email(&email).await? else {
            return Ok(format!("{}/error?message=User does not exist.", base));
        };

        self.accounts.set_email_verified(user.user_id).await?;
        info!(user_id = user.user_id, "Email confirmed");
        Ok(format!("{}/registration-success", base))
    }

    pub async fn send_reset_email(&self, email: &str) -> Result<(), UserAuthError> {
        if email.trim().is_empty() {
            return Err(UserAuthError::Validation(
                "Email address is required.".to_string(),
            ));
        }
        if self.accounts.user_by_email(email).await?.is_none() {
            return Err(UserAuthError::UserNotFound);
        }

        let token = Uuid::new_v4().to_string();
        self.tokens.put(&token, email, self.config.token_ttl());
        let reset_url = format!(
            "{}/new-password?token={}",
            self.config.frontend_base_url.trim_end_matches('/'),
            token
        );
        self.mailer
            .send(
                email,
                "Password Reset",
                &format!("Follow this link to reset your password: {}", reset_url),
            )
            .await
            .map_err(UserAuthError::Mail)
    }

    pub async fn reset_password(&self, token: &str, new_password: &str) -> Result<(), UserAuthError> {
        let email = self.tokens.get(token).ok_or(UserAuthError::InvalidToken)?;
        check_password_rules(new_password)?;

        let user = self
            .accounts
            .user_by_email(&email)
            .await?
            .ok_or(UserAuthError::UserNotFound)?;

        // spent only once the new password is stored
        if self.tokens.take(token).is_none() {
            return Err(UserAuthError::InvalidToken);
        }
        let hash = hash_password(new_password)?;
        self.accounts.set_password_hash(user.user_id, &hash).await?;
        info!(user_id = user.user_id, "Password reset");
        Ok(())
    }

    pub async fn change_password(
        &self,
        user_id: i64,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), UserAuthError> {
        let user = self
            .accounts
            .user_by_id(user_id)
            .await?
            .ok_or(UserAuthError::InvalidToken)?;
        let stored = user.password_hash.as_deref().unwrap_or_default();
        if !verify_password(old_password, stored) {
            return Err(UserAuthError::WrongPassword);
        }
        check_password_rules(new_password)?;

        let hash = hash_password(new_password)?;
        self.accounts.set_password_hash(user_id, &hash).await?;
        info!(user_id, "Password changed");
        Ok(())
    }

    /// Mail a confirmation link to `new_email`. The login email only changes
    /// once the same user hands the token back.
    pub async fn start_email_change(&self, user_id: i64, new_email: &str) -> Result<(), UserAuthError> {
        let new_email = new_email.trim();
        if new_email.is_empty() {
            return Err(UserAuthError::Validation(
                "Email address is required.".to_string(),
            ));
        }
        if !new_email.validate_email() {
            return Err(UserAuthError::Validation(
                "Enter a valid email address.".to_string(),
            ));
        }
        if self.accounts.user_by_id(user_id).await?.is_none() {
            return Err(UserAuthError::InvalidToken);
        }
        if self.accounts.user_by_email(new_email).await?.is_some() {
            return Err(UserAuthError::EmailTaken);
        }

        let token = Uuid::new_v4().to_string();
        self.tokens.put(
            &token,
            &pending_email_change(user_id, new_email),
            self.config.token_ttl(),
        );
        let confirm_url = format!(
            "{}/confirm-email?token={}",
            self.config.frontend_base_url.trim_end_matches('/'),
            token
        );
        self.mailer
            .send(
                new_email,
                "Confirm Your New Email Address",
                &format!("Please follow this link to confirm your new email address: {}", confirm_url),
            )
            .await
            .map_err(UserAuthError::Mail)
    }

    /// Apply a pending email change and issue a token for the new address.
    pub async fn confirm_email_change(
        &self,
        user_id: i64,
        token: &str,
    ) -> Result<AuthResponse, UserAuthError> {
        let pending = self.tokens.get(token).ok_or(UserAuthError::InvalidToken)?;
        let new_email = match parse_email_change(&pending) {
            Some((owner, email)) if owner == user_id => email.to_string(),
            _ => return Err(UserAuthError::InvalidToken),
        };

        if self.tokens.take(token).is_none() {
            return Err(UserAuthError::InvalidToken);
        }
        let updated = self
            .accounts
            .set_email(user_id, &new_email)
            .await
            .map_err(|e| match e {
                StoreError::Conflict(_) => UserAuthError::EmailTaken,
                other => UserAuthError::from(other),
            })?;
        if !updated {
            return Err(UserAuthError::InvalidToken);
        }
        info!(user_id, "Email changed");

        Ok(AuthResponse {
            token: self.issue_token(user_id)?,
            user_id,
            email: new_email,
        })
    }

    fn issue_token(&self, user_id: i64) -> Result<String, UserAuthError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            exp: (now + Duration::hours(self.config.jwt_ttl_hours)).timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )
        .map_err(|e| UserAuthError::Hashing(format!("token encoding: {}", e)))
    }
}

const EMAIL_CHANGE_PREFIX: &str = "email-change:";

fn pending_email_change(user_id: i64, email: &str) -> String {
    format!("{}{}:{}", EMAIL_CHANGE_PREFIX, user_id, email)
}

fn parse_email_change(value: &str) -> Option<(i64, &str)> {
    let (owner, email) = value.strip_prefix(EMAIL_CHANGE_PREFIX)?.split_once(':')?;
    Some((owner.parse().ok()?, email))
}

fn check_password_rules(password: &str) -> Result<(), UserAuthError> {
    if password.chars().count() < 8 {
        return Err(UserAuthError::Validation(
            "Password must be at least 8 characters".to_string(),
        ));
    }
    Ok(())
}

fn hash_password(password: &str) -> Result<String, UserAuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| UserAuthError::Hashing(e.to_string()))
}

fn verify_password(password: &str, stored: &str) -> bool {
    PasswordHash::new(stored)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_store::MemoryStore;
    use crate::token_store::InMemoryTokenStore;
    use crate::user_auth::mailer::mock::RecordingMailer;

    struct Fixture {
        service: UserAuthService,
        store: MemoryStore,
        mailer: Arc<RecordingMailer>,
    }

    fn fixture() -> Fixture {
        let store = MemoryStore::new();
        let mailer = Arc::new(RecordingMailer::default());
        let service = UserAuthService::new(
            Arc::new(store.clone()),
            Arc::new(InMemoryTokenStore::new()),
            mailer.clone(),
            AuthConfig::default(),
        );
        Fixture {
            service,
            store,
            mailer,
        }
    }

    fn register_req(email: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            email: email.to_string(),
            password: password.to_string(),
            username: Some("alice".to_string()),
            phone: None,
        }
    }

    #[tokio::test]
    async fn test_register_login_verify() {
        let f = fixture();
        let user = f
            .service
            .register(register_req("alice@example.com", "correct horse"))
            .await
            .unwrap();
        assert!(!user.email_verified);

        let auth = f
            .service
            .login(LoginRequest {
                email: "alice@example.com".to_string(),
                password: "correct horse".to_string(),
            })
            .await
            .unwrap();
        let claims = f.service.verify_token(&auth.token).unwrap();
        assert_eq!(claims.user_id(), Some(user.user_id));
        assert!(f.service.verify_token("garbage").is_err());
    }

    #[tokio::test]
    async fn test_register_duplicate_and_invalid() {
        let f = fixture();
        f.service
            .register(register_req("dup@example.com", "password1"))
            .await
            .unwrap();
        assert!(matches!(
            f.service.register(register_req("dup@example.com", "password1")).await,
            Err(UserAuthError::EmailTaken)
        ));
        assert!(matches!(
            f.service.register(register_req("not-an-email", "password1")).await,
            Err(UserAuthError::Validation(_))
        ));
        assert!(matches!(
            f.service.register(register_req("short@example.com", "short")).await,
            Err(UserAuthError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_login_wrong_password() {
        let f = fixture();
        f.service
            .register(register_req("bob@example.com", "password1"))
            .await
            .unwrap();
        assert!(matches!(
            f.service
                .login(LoginRequest {
                    email: "bob@example.com".to_string(),
                    password: "password2".to_string(),
                })
                .await,
            Err(UserAuthError::InvalidLogin)
        ));
    }

    #[tokio::test]
    async fn test_registration_confirmation_flow() {
        let f = fixture();
        let user = f
            .service
            .register(register_req("carol@example.com", "password1"))
            .await
            .unwrap();
        f.service.start_registration("carol@example.com").await.unwrap();

        let sent = f.mailer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "carol@example.com");
        let token = f.mailer.last_token().unwrap();

        let redirect = f.service.confirm_registration(&token).await.unwrap();
        assert_eq!(redirect, "http://localhost:3000/registration-success");
        assert!(
            f.store
                .user_by_id(user.user_id)
                .await
                .unwrap()
                .unwrap()
                .email_verified
        );

        // one-shot
        let again = f.service.confirm_registration(&token).await.unwrap();
        assert!(again.contains("Invalid or expired link."));
        assert!(matches!(
            f.service.start_registration("carol@example.com").await,
            Err(UserAuthError::AlreadyVerified)
        ));
    }

    #[tokio::test]
    async fn test_password_reset_flow() {
        let f = fixture();
        f.service
            .register(register_req("dave@example.com", "password1"))
            .await
            .unwrap();
        assert!(matches!(
            f.service.send_reset_email("nobody@example.com").await,
            Err(UserAuthError::UserNotFound)
        ));

        f.service.send_reset_email("dave@example.com").await.unwrap();
        let token = f.mailer.last_token().unwrap();

        assert!(matches!(
            f.service.reset_password(&token, "short").await,
            Err(UserAuthError::Validation(_))
        ));
        f.service.reset_password(&token, "new password").await.unwrap();
        assert!(matches!(
            f.service.reset_password(&token, "another one").await,
            Err(UserAuthError::InvalidToken)
        ));

        f.service
            .login(LoginRequest {
                email: "dave@example.com".to_string(),
                password: "new password".to_string(),
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_change_password() {
        let f = fixture();
        let user = f
            .service
            .register(register_req("erin@example.com", "password1"))
            .await
            .unwrap();
        assert!(matches!(
            f.service
                .change_password(user.user_id, "wrong", "password2")
                .await,
            Err(UserAuthError::WrongPassword)
        ));
        f.service
            .change_password(user.user_id, "password1", "password2")
            .await
            .unwrap();
        f.service
            .login(LoginRequest {
                email: "erin@example.com".to_string(),
                password: "password2".to_string(),
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_email_change_flow() {
        let f = fixture();
        let user = f
            .service
            .register(register_req("erin@example.com", "password1"))
            .await
            .unwrap();
        f.service
            .start_email_change(user.user_id, "erin.new@example.com")
            .await
            .unwrap();
        assert_eq!(f.mailer.sent()[0].0, "erin.new@example.com");
        let token = f.mailer.last_token().unwrap();

        let auth = f
            .service
            .confirm_email_change(user.user_id, &token)
            .await
            .unwrap();
        assert_eq!(auth.email, "erin.new@example.com");
        assert_eq!(
            f.service.verify_token(&auth.token).unwrap().user_id(),
            Some(user.user_id)
        );
        let stored = f.store.user_by_id(user.user_id).await.unwrap().unwrap();
        assert_eq!(stored.email, "erin.new@example.com");
        assert!(stored.email_verified);

        // single use
        assert!(matches!(
            f.service.confirm_email_change(user.user_id, &token).await,
            Err(UserAuthError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn test_email_change_rejects_taken_address_and_other_user() {
        let f = fixture();
        let erin = f
            .service
            .register(register_req("erin@example.com", "password1"))
            .await
            .unwrap();
        let frank = f
            .service
            .register(register_req("frank@example.com", "password1"))
            .await
            .unwrap();

        assert!(matches!(
            f.service.start_email_change(erin.user_id, "frank@example.com").await,
            Err(UserAuthError::EmailTaken)
        ));
        assert!(matches!(
            f.service.start_email_change(erin.user_id, "nope").await,
            Err(UserAuthError::Validation(_))
        ));

        f.service
            .start_email_change(erin.user_id, "erin.new@example.com")
            .await
            .unwrap();
        let token = f.mailer.last_token().unwrap();
        assert!(matches!(
            f.service.confirm_email_change(frank.user_id, &token).await,
            Err(UserAuthError::InvalidToken)
        ));
        // the owner can still use it
        assert!(f.service.confirm_email_change(erin.user_id, &token).await.is_ok());
    }

    #[tokio::test]
    async fn test_reset_token_cannot_change_email() {
        let f = fixture();
        let user = f
            .service
            .register(register_req("gina@example.com", "password1"))
            .await
            .unwrap();
        f.service.send_reset_email("gina@example.com").await.unwrap();
        let token = f.mailer.last_token().unwrap();
        assert!(matches!(
            f.service.confirm_email_change(user.user_id, &token).await,
            Err(UserAuthError::InvalidToken)
        ));
    }
}
