//! Account holder authentication
//!
//! Password login issuing HS256 JWTs, plus the email confirmation and
//! password reset flows built on one-shot tokens.

pub mod mailer;
pub mod middleware;
pub mod service;

pub use mailer::{LogMailer, Mailer};
pub use middleware::jwt_auth_middleware;
pub use service::{AuthResponse, Claims, LoginRequest, RegisterRequest, UserAuthError, UserAuthService};
