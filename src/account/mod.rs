//! Account management module
//!
//! PostgreSQL-based storage for users, companies and their memberships.

pub mod models;
pub mod repository;

// Re-export commonly used types
pub use models::{Company, Membership, NewCompany, NewUser, User};
pub use repository::AccountStore;
