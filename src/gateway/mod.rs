//! HTTP gateway
//!
//! - Merchant API: credentials in the request body, no session
//! - Account API: bearer JWT checked by `jwt_auth_middleware`
//! - Operator API: shared secret in `X-Operator-Secret`; settlement and
//!   plan catalog writes

pub mod error;
pub mod handlers;
pub mod state;
pub mod types;

use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{get, post, put},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

use crate::user_auth::jwt_auth_middleware;
use handlers::{
    account, auth, health, invoice, keys, operator, statistics, subscription, withdrawal,
};
use state::AppState;

pub fn build_router(state: Arc<AppState>) -> Router {
    let payoff_routes = Router::new()
        .route("/withdraw", post(withdrawal::submit_withdrawal))
        .route("/confirm", post(withdrawal::confirm_withdrawal))
        .route("/cancel", post(withdrawal::cancel_withdrawal))
        .route("/info", post(withdrawal::withdrawal_info))
        .route("/history", post(withdrawal::withdrawal_history));

    let invoice_routes = Router::new()
        .route("/create", post(invoice::create_invoice))
        .route("/info", post(invoice::invoice_info))
        .route("/history", post(invoice::invoice_history))
        .route("/cancel", post(invoice::cancel_invoice))
        .route("/complete", post(invoice::complete_invoice));

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/start-registration", post(auth::start_registration))
        .route(
            "/confirm-registration/{token}",
            get(auth::confirm_registration),
        )
        .route("/send-reset-email", post(auth::send_reset_email))
        .route("/reset-password/{token}", post(auth::reset_password));

    // Bearer token required
    let account_routes = Router::new()
        .route("/api/v1/auth/change-password", post(auth::change_password))
        .route("/api/v1/auth/change-email", post(auth::change_email))
        .route(
            "/api/v1/auth/confirm-email/{token}",
            post(auth::confirm_email_change),
        )
        .route("/api/v1/keys/generate", post(keys::generate_key))
        .route("/api/v1/keys/check", post(keys::check_key))
        .route("/api/v1/keys/regenerate", post(keys::regenerate_key))
        .route("/api/v1/keys/deactivate", post(keys::deactivate_key))
        .route(
            "/api/v1/companies",
            get(account::list_companies).post(account::create_company),
        )
        .route(
            "/api/v1/companies/{id}/subscription",
            post(subscription::change_plan),
        )
        .route("/api/v1/subscriptions", get(subscription::list_plans))
        .route("/api/v1/subscriptions/{id}", get(subscription::get_plan))
        .route(
            "/api/v1/subscription-history",
            get(subscription::subscription_history),
        )
        .route("/api/v1/usage", get(statistics::usage_report))
        .route_layer(from_fn_with_state(state.clone(), jwt_auth_middleware));

    // X-Operator-Secret required
    let operator_routes = Router::new()
        .route("/internal/payoff/settle", post(operator::settle_withdrawal))
        .route("/api/v1/subscriptions", post(subscription::create_plan))
        .route(
            "/api/v1/subscriptions/{id}",
            put(subscription::update_plan).delete(subscription::delete_plan),
        )
        .route_layer(from_fn_with_state(
            state.clone(),
            operator::operator_auth_middleware,
        ));

    Router::new()
        .route("/health", get(health::health_check))
        .nest("/api/v1/payoff", payoff_routes)
        .nest("/api/v1/invoices", invoice_routes)
        .route(
            "/api/v1/statistics/general",
            post(statistics::general_statistics),
        )
        .nest("/api/v1/auth", auth_routes)
        .merge(account_routes)
        .merge(operator_routes)
        .with_state(state)
}

/// Bind and serve until the listener fails.
pub async fn run_server(host: &str, port: u16, state: Arc<AppState>) -> std::io::Result<()> {
    let app = build_router(state);

    let addr = format!("{}:{}", host, port);
    let listener = TcpListener::bind(&addr).await?;

    info!(%addr, "Gateway listening");
    info!("Merchant API: /api/v1/payoff/*, /api/v1/invoices/*");
    info!("Account API:  /api/v1/* (bearer token)");
    info!("Operator API: /internal/payoff/settle, plan catalog writes");

    axum::serve(listener, app).await
}
