//! Subscription plan catalog types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PlanTier {
    #[default]
    Free,
    Basic,
    Premium,
}

impl PlanTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanTier::Free => "FREE",
            PlanTier::Basic => "BASIC",
            PlanTier::Premium => "PREMIUM",
        }
    }
}

impl fmt::Display for PlanTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlanTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "FREE" => Ok(PlanTier::Free),
            "BASIC" => Ok(PlanTier::Basic),
            "PREMIUM" => Ok(PlanTier::Premium),
            other => Err(format!("unknown plan tier: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionPlan {
    pub plan_id: i64,
    pub name: PlanTier,
    pub max_requests_per_month: i64,
    pub price: Decimal,
    pub created_at: DateTime<Utc>,
}

/// Fields accepted on plan create and update.
#[derive(Debug, Clone, Deserialize)]
pub struct PlanInput {
    #[serde(default)]
    pub name: PlanTier,
    #[serde(default = "default_max_requests")]
    pub max_requests_per_month: i64,
    #[serde(default)]
    pub price: Decimal,
}

fn default_max_requests() -> i64 {
    1000
}

/// Log line written on every plan change. `amount` is recorded, not charged.
#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionHistory {
    pub history_id: i64,
    pub user_id: i64,
    pub company_id: i64,
    pub plan_id: i64,
    pub amount: Decimal,
    pub date: DateTime<Utc>,
}
