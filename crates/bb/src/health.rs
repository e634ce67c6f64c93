//! Liveness check: `GET /` answers 200 while the card service is reachable.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::get, Router};

use bb_core::{account::AccountService, domain::Credentials, Result};

#[derive(Clone)]
struct HealthState {
    accounts: Arc<dyn AccountService>,
    check_creds: Option<Credentials>,
}

fn app(accounts: Arc<dyn AccountService>, check_creds: Option<Credentials>) -> Router {
    Router::new()
        .route("/", get(liveness))
        .with_state(HealthState { accounts, check_creds })
}

async fn liveness(State(state): State<HealthState>) -> (StatusCode, &'static str) {
    let Some(creds) = &state.check_creds else {
        return (StatusCode::OK, "OK");
    };
    match state.accounts.fetch_balances(creds).await {
        Ok(_) => (StatusCode::OK, "OK"),
        Err(e) => {
            tracing::warn!(error = %e, "liveness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                "Can't connect to the account API",
            )
        }
    }
}

pub async fn serve(
    port: u16,
    accounts: Arc<dyn AccountService>,
    check_creds: Option<Credentials>,
) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    tracing::info!(port, "liveness endpoint listening");
    axum::serve(listener, app(accounts, check_creds)).await?;
    Ok(())
}
