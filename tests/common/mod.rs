//! Shared harness for router tests: the real axum router over a MemoryStore.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use rust_decimal::Decimal;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tower::util::ServiceExt;
use uuid::Uuid;

use payout_gateway::account::{AccountStore, NewCompany, NewUser};
use payout_gateway::api_auth::ApiKeyStore;
use payout_gateway::config::AppConfig;
use payout_gateway::gateway::{
    build_router,
    state::{AppState, Collaborators},
};
use payout_gateway::memory_store::MemoryStore;
use payout_gateway::subscription::{PlanInput, PlanStore, PlanTier};
use payout_gateway::token_store::InMemoryTokenStore;
use payout_gateway::user_auth::Mailer;
use payout_gateway::withdrawal::{CallbackNotifier, WithdrawalReceipt};

pub const OPERATOR_SECRET: &str = "test-operator-secret";

const CONFIG: &str = r#"
log_level: info
log_dir: ./logs
log_file: test.log
use_json: false
rotation: never
gateway:
  host: 127.0.0.1
  port: 0
billing:
  commission_rate: "0.015"
  callback_timeout_ms: 1000
  operator_secret: test-operator-secret
"#;

/// Records callbacks; fails every call when `failing` is set.
#[derive(Default)]
pub struct StubNotifier {
    pub failing: bool,
    pub delivered: Mutex<Vec<(String, WithdrawalReceipt)>>,
}

#[async_trait]
impl CallbackNotifier for StubNotifier {
    async fn notify(&self, url: &str, receipt: &WithdrawalReceipt) -> Result<(), String> {
        if self.failing {
            return Err("connection refused".to_string());
        }
        self.delivered
            .lock()
            .unwrap()
            .push((url.to_string(), receipt.clone()));
        Ok(())
    }
}

#[derive(Default)]
pub struct CapturingMailer {
    pub bodies: Mutex<Vec<String>>,
}

impl CapturingMailer {
    /// Token at the end of the first link in the last mail.
    pub fn last_token(&self) -> String {
        let bodies = self.bodies.lock().unwrap();
        let body = bodies.last().expect("no mail sent");
        let link = body
            .split_whitespace()
            .find(|w| w.starts_with("http"))
            .expect("no link in mail");
        link.rsplit(['/', '=']).next().unwrap().to_string()
    }
}

#[async_trait]
impl Mailer for CapturingMailer {
    async fn send(&self, _to: &str, _subject: &str, body: &str) -> Result<(), String> {
        self.bodies.lock().unwrap().push(body.to_string());
        Ok(())
    }
}

pub struct TestApp {
    pub router: Router,
    pub store: MemoryStore,
    pub notifier: Arc<StubNotifier>,
    pub mailer: Arc<CapturingMailer>,
}

pub fn spawn_app() -> TestApp {
    spawn_app_with(StubNotifier::default(), |_| {})
}

pub fn spawn_app_with(notifier: StubNotifier, tweak: impl FnOnce(&mut AppConfig)) -> TestApp {
    let mut config = AppConfig::from_yaml(CONFIG).unwrap();
    tweak(&mut config);

    let store = MemoryStore::new();
    let notifier = Arc::new(notifier);
    let mailer = Arc::new(CapturingMailer::default());
    let state = AppState::new(
        Arc::new(store.clone()),
        &config,
        Collaborators {
            notifier: notifier.clone(),
            tokens: Arc::new(InMemoryTokenStore::new()),
            mailer: mailer.clone(),
        },
        None,
    );

    TestApp {
        router: build_router(Arc::new(state)),
        store,
        notifier,
        mailer,
    }
}

/// A merchant with one company, one active key and a plan.
pub struct Merchant {
    pub email: String,
    pub key: Uuid,
    pub user_id: i64,
    pub company_id: i64,
}

impl Merchant {
    pub fn credentials(&self) -> Value {
        serde_json::json!({
            "auth_login": self.email,
            "auth_secret": self.key.to_string(),
        })
    }

    /// Credentials merged with extra body fields.
    pub fn body(&self, extra: Value) -> Value {
        let mut body = self.credentials();
        if let (Some(target), Value::Object(fields)) = (body.as_object_mut(), extra) {
            target.extend(fields);
        }
        body
    }
}

pub async fn seed_merchant(app: &TestApp, email: &str, monthly_cap: i64, balance: Decimal) -> Merchant {
    let user = app
        .store
        .create_user(NewUser {
            email: email.to_string(),
            username: None,
            phone: None,
            password_hash: None,
        })
        .await
        .unwrap();
    let company = app
        .store
        .create_company(
            user.user_id,
            NewCompany {
                name: format!("{} Ltd", email),
                registration_number: "RN-100".to_string(),
                address: "Harbour road 5".to_string(),
            },
        )
        .await
        .unwrap();
    let key = Uuid::new_v4();
    app.store.insert_key(company.company_id, key).await.unwrap();

    let plan = app
        .store
        .create_plan(PlanInput {
            name: PlanTier::Basic,
            max_requests_per_month: monthly_cap,
            price: Decimal::new(999, 2),
        })
        .await
        .unwrap();
    app.store
        .assign_plan(user.user_id, company.company_id, plan.plan_id)
        .await
        .unwrap();
    app.store.seed_company_balance(company.company_id, balance);

    Merchant {
        email: email.to_string(),
        key,
        user_id: user.user_id,
        company_id: company.company_id,
    }
}

pub async fn send(
    router: &Router,
    method: &str,
    uri: &str,
    headers: &[(&str, &str)],
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

pub async fn post_json(router: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    send(router, "POST", uri, &[], Some(body)).await
}

pub fn decimal(value: &Value) -> Decimal {
    value
        .as_str()
        .expect("decimal fields are strings")
        .parse()
        .unwrap()
}
