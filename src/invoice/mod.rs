//! Invoice (payment-in) records
//!
//! Flat lifecycle: `created` is overwritten by `processed`, `canceled` or
//! `completed`. No balance is touched.

pub mod models;
pub mod repository;
pub mod service;

pub use models::{Invoice, InvoiceDraft, InvoiceStatus};
pub use repository::InvoiceStore;
pub use service::{InvoiceError, InvoiceService};
