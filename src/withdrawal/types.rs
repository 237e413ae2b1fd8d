//! Withdrawal enums: payout rail, fee side and lifecycle state
//!
//! All three are stored as TEXT in PostgreSQL using `as_str()`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Payment rail a withdrawal is paid out through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PayoutMethod {
    #[serde(rename = "LZTMARKET")]
    LztMarket,
    #[serde(rename = "BITCOIN")]
    Bitcoin,
    #[serde(rename = "ETHEREUM")]
    Ethereum,
}

impl PayoutMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PayoutMethod::LztMarket => "LZTMARKET",
            PayoutMethod::Bitcoin => "BITCOIN",
            PayoutMethod::Ethereum => "ETHEREUM",
        }
    }

    /// Currency the rail settles in
    pub fn settlement_currency(&self) -> &'static str {
        match self {
            PayoutMethod::LztMarket => "RUB",
            PayoutMethod::Bitcoin => "BTC",
            PayoutMethod::Ethereum => "ETH",
        }
    }
}

impl fmt::Display for PayoutMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PayoutMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LZTMARKET" => Ok(PayoutMethod::LztMarket),
            "BITCOIN" => Ok(PayoutMethod::Bitcoin),
            "ETHEREUM" => Ok(PayoutMethod::Ethereum),
            other => Err(format!("unknown payout method: {}", other)),
        }
    }
}

/// Where the commission is taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubtractFrom {
    /// Commission charged on top of the amount, against the tenant balance
    Balance,
    /// Commission withheld from the payout itself
    Amount,
}

impl SubtractFrom {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubtractFrom::Balance => "balance",
            SubtractFrom::Amount => "amount",
        }
    }
}

impl fmt::Display for SubtractFrom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubtractFrom {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "balance" => Ok(SubtractFrom::Balance),
            "amount" => Ok(SubtractFrom::Amount),
            other => Err(format!("unknown subtract_from: {}", other)),
        }
    }
}

/// Withdrawal lifecycle
///
/// ```text
/// created ──confirm──> processing ──settle──> payed
///    │
///    └──cancel──> cancelled
/// ```
/// Terminal states: PAYED, CANCELLED
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WithdrawalStatus {
    Created,
    Processing,
    Payed,
    Cancelled,
}

impl WithdrawalStatus {
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, WithdrawalStatus::Payed | WithdrawalStatus::Cancelled)
    }

    /// The only edges of the lifecycle graph.
    pub fn can_transition_to(&self, next: WithdrawalStatus) -> bool {
        matches!(
            (self, next),
            (WithdrawalStatus::Created, WithdrawalStatus::Processing)
                | (WithdrawalStatus::Created, WithdrawalStatus::Cancelled)
                | (WithdrawalStatus::Processing, WithdrawalStatus::Payed)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WithdrawalStatus::Created => "created",
            WithdrawalStatus::Processing => "processing",
            WithdrawalStatus::Payed => "payed",
            WithdrawalStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for WithdrawalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WithdrawalStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(WithdrawalStatus::Created),
            "processing" => Ok(WithdrawalStatus::Processing),
            "payed" => Ok(WithdrawalStatus::Payed),
            "cancelled" => Ok(WithdrawalStatus::Cancelled),
            other => Err(format!("unknown withdrawal status: {}", other)),
        }
    }
}
