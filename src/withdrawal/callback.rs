//! Outbound submission callbacks
//!
//! The notifier posts the submission receipt to the merchant's `callback_url`.
//! Any transport error, timeout or non-2xx status is a delivery failure.

use async_trait::async_trait;
use std::time::Duration;

use super::models::WithdrawalReceipt;

#[async_trait]
pub trait CallbackNotifier: Send + Sync {
    /// Deliver `receipt` to `url`. The error string is shown to the merchant.
    async fn notify(&self, url: &str, receipt: &WithdrawalReceipt) -> Result<(), String>;
}

/// reqwest-backed notifier with a bounded per-call timeout.
pub struct HttpCallbackNotifier {
    client: reqwest::Client,
}

impl HttpCallbackNotifier {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl CallbackNotifier for HttpCallbackNotifier {
    async fn notify(&self, url: &str, receipt: &WithdrawalReceipt) -> Result<(), String> {
        self.client
            .post(url)
            .json(receipt)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map(|_| ())
            .map_err(|e| e.to_string())
    }
}

#[cfg(test)]
pub mod mock {
    //! Recording notifier for service tests

    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[derive(Default)]
    pub struct MockNotifier {
        fail: AtomicBool,
        delivered: Mutex<Vec<(String, WithdrawalReceipt)>>,
    }

    impl MockNotifier {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn failing() -> Self {
            let notifier = Self::default();
            notifier.fail.store(true, Ordering::SeqCst);
            notifier
        }

        pub fn delivered(&self) -> Vec<(String, WithdrawalReceipt)> {
            self.delivered.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CallbackNotifier for MockNotifier {
        async fn notify(&self, url: &str, receipt: &WithdrawalReceipt) -> Result<(), String> {
            if self.fail.load(Ordering::SeqCst) {
                return Err("error sending request: connection refused".to_string());
            }
            self.delivered
                .lock()
                .unwrap()
                .push((url.to_string(), receipt.clone()));
            Ok(())
        }
    }
}
