//! Invoice (payment-in) records

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    Created,
    Processed,
    Canceled,
    Completed,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Created => "created",
            InvoiceStatus::Processed => "processed",
            InvoiceStatus::Canceled => "canceled",
            InvoiceStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InvoiceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(InvoiceStatus::Created),
            "processed" => Ok(InvoiceStatus::Processed),
            "canceled" => Ok(InvoiceStatus::Canceled),
            "completed" => Ok(InvoiceStatus::Completed),
            other => Err(format!("unknown invoice status: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Invoice {
    pub id: Uuid,
    #[serde(skip_serializing)]
    pub user_id: i64,
    pub amount: Decimal,
    pub amount_currency: Option<String>,
    pub required_method: Option<String>,
    #[serde(rename = "type")]
    pub invoice_type: String,
    pub description: Option<String>,
    pub redirect_url: Option<String>,
    pub callback_url: Option<String>,
    pub extra: Option<String>,
    pub payer_details: Option<String>,
    /// Seconds the invoice stays payable
    pub lifetime: i32,
    pub status: InvoiceStatus,
    pub created_at: DateTime<Utc>,
}

/// Validated invoice fields, amount already parsed.
#[derive(Debug, Clone)]
pub struct InvoiceDraft {
    pub amount: Decimal,
    pub amount_currency: Option<String>,
    pub required_method: Option<String>,
    pub invoice_type: String,
    pub description: Option<String>,
    pub redirect_url: Option<String>,
    pub callback_url: Option<String>,
    pub extra: Option<String>,
    pub payer_details: Option<String>,
    pub lifetime: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_roundtrip() {
        for status in [
            InvoiceStatus::Created,
            InvoiceStatus::Processed,
            InvoiceStatus::Canceled,
            InvoiceStatus::Completed,
        ] {
            assert_eq!(status.as_str().parse::<InvoiceStatus>(), Ok(status));
        }
    }

    #[test]
    fn test_type_field_wire_name() {
        let invoice = Invoice {
            id: Uuid::nil(),
            user_id: 7,
            amount: Decimal::new(1050, 2),
            amount_currency: Some("USD".to_string()),
            required_method: None,
            invoice_type: "deposit".to_string(),
            description: None,
            redirect_url: None,
            callback_url: None,
            extra: None,
            payer_details: None,
            lifetime: 3600,
            status: InvoiceStatus::Created,
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(&invoice).unwrap();
        assert_eq!(json["type"], "deposit");
        assert_eq!(json["status"], "created");
        assert!(json.get("user_id").is_none());
    }
}
