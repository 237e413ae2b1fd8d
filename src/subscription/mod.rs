//! Subscription plan registry
//!
//! Catalog of plans (tier, monthly request cap, price), the per-company
//! assignment and an append-only history of plan changes.

pub mod models;
pub mod repository;
pub mod service;

pub use models::{PlanInput, PlanTier, SubscriptionHistory, SubscriptionPlan};
pub use repository::PlanStore;
pub use service::{SubscriptionError, SubscriptionService};
