use std::sync::Arc;

use bb_alelo::AleloClient;

use bb_core::{account::AccountService, config::Config, store::FileStore};

mod health;

#[tokio::main]
async fn main() -> Result<(), bb_core::Error> {
    bb_core::logging::init("bb")?;

    let cfg = Arc::new(Config::load()?);

    let store = Arc::new(FileStore::new(cfg.credentials_file.clone())?);
    tracing::info!(path = %store.path().display(), "using credentials file");

    let accounts: Arc<dyn AccountService> = Arc::new(AleloClient::new(
        cfg.account_api_url.clone(),
        cfg.account_timeout,
    ));

    if let Some(port) = cfg.health_port {
        let check_creds = cfg.health_check.clone();
        let accounts = accounts.clone();
        tokio::spawn(async move {
            if let Err(e) = health::serve(port, accounts, check_creds).await {
                tracing::error!(error = %e, "liveness endpoint stopped");
            }
        });
    }

    bb_telegram::router::run_polling(cfg, store, accounts)
        .await
        .map_err(|e| bb_core::Error::External(format!("telegram bot failed: {e}")))?;

    Ok(())
}
