//! Card account service adapter (Alelo-style JSON API over HTTPS).
//!
//! Every call opens its own cookie session: log in, then read the card list
//! and each card's details. Nothing is cached between calls.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use bb_core::{
    account::AccountService,
    domain::{CardRecord, Credentials},
    errors::Error,
    Result,
};

const REJECTED_FALLBACK: &str = "Invalid CPF or password";

#[derive(Clone, Debug)]
pub struct AleloClient {
    base_url: String,
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CardList {
    #[serde(default)]
    cards: Vec<CardSummary>,
}

#[derive(Debug, Deserialize)]
struct CardSummary {
    id: String,
    #[serde(rename = "cardNumber")]
    card_number: String,
}

#[derive(Debug, Deserialize)]
struct CardDetails {
    balance: String,
}

impl AleloClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
        }
    }

    fn session(&self) -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .cookie_store(true)
            .user_agent("bb-rust/0.1")
            .build()
            .map_err(|e| Error::External(format!("http client build failed: {e}")))
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Log in on `http`; the session cookie stays in its jar.
    async fn login(&self, http: &reqwest::Client, creds: &Credentials) -> Result<()> {
        let resp = http
            .post(self.url("/login"))
            .json(&serde_json::json!({
                "cpf": creds.identifier,
                "pwd": creds.secret,
                "captchaResponse": "",
            }))
            .send()
            .await
            .map_err(|e| Error::Remote(format!("could not reach the card service: {e}")))?;

        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }
        if status.is_server_error() {
            return Err(Error::Remote(format!(
                "card service unavailable ({})",
                status.as_u16()
            )));
        }

        let body = resp.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .ok()
            .and_then(|b| b.message)
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| REJECTED_FALLBACK.to_string());
        Err(Error::Validation(message))
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        http: &reqwest::Client,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        let resp = http
            .get(self.url(path))
            .query(query)
            .send()
            .await
            .map_err(|e| Error::Remote(format!("could not reach the card service: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&body)
                .ok()
                .and_then(|b| b.message)
                .unwrap_or_else(|| format!("card service error ({})", status.as_u16()));
            return Err(Error::Remote(message));
        }

        resp.json::<T>()
            .await
            .map_err(|e| Error::Remote(format!("unexpected card service response: {e}")))
    }
}

#[async_trait]
impl AccountService for AleloClient {
    async fn validate_and_link(&self, creds: &Credentials) -> Result<()> {
        let http = self.session()?;
        self.login(&http, creds).await
    }

    async fn fetch_balances(&self, creds: &Credentials) -> Result<Vec<CardRecord>> {
        let http = self.session()?;
        self.login(&http, creds).await.map_err(|e| match e {
            // A pair that stopped working after it was stored (password changed, access revoked).
            Error::Validation(msg) => Error::Remote(msg),
            other => other,
        })?;

        let list: CardList = self.get_json(&http, "/list/cards", &[]).await?;
        tracing::debug!(cards = list.cards.len(), "listed cards");

        let mut out = Vec::with_capacity(list.cards.len());
        for card in list.cards {
            let details: CardDetails = self
                .get_json(
                    &http,
                    "/card/details",
                    &[("selectedCardNumberId", card.id.as_str())],
                )
                .await?;
            out.push(CardRecord::new(card.card_number, details.balance));
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        extract::Query,
        http::StatusCode,
        response::IntoResponse,
        routing::{get, post},
        Json, Router,
    };
    use std::collections::HashMap;

    async fn login(Json(body): Json<serde_json::Value>) -> impl IntoResponse {
        if body["cpf"] == "12345678900" && body["pwd"] == "mypassword" {
            (
                StatusCode::OK,
                [("set-cookie", "SESSION=abc; Path=/")],
                Json(serde_json::json!({})),
            )
                .into_response()
        } else if body["cpf"] == "down" {
            StatusCode::SERVICE_UNAVAILABLE.into_response()
        } else {
            (
                StatusCode::UNAUTHORIZED,
                Json(serde_json::json!({"message": "CPF ou senha inválidos"})),
            )
                .into_response()
        }
    }

    async fn cards(headers: axum::http::HeaderMap) -> impl IntoResponse {
        let has_session = headers
            .get("cookie")
            .and_then(|v| v.to_str().ok())
            .map(|v| v.contains("SESSION=abc"))
            .unwrap_or(false);
        if !has_session {
            return (
                StatusCode::FORBIDDEN,
                Json(serde_json::json!({"message": "session expired"})),
            )
                .into_response();
        }
        Json(serde_json::json!({
            "cards": [
                {"id": "a", "cardNumber": "0001"},
                {"id": "b", "cardNumber": "0002"},
            ]
        }))
        .into_response()
    }

    async fn details(Query(q): Query<HashMap<String, String>>) -> impl IntoResponse {
        let balance = match q.get("selectedCardNumberId").map(String::as_str) {
            Some("a") => "$10.00",
            Some("b") => "$5.00",
            Some("c&d=1 2") => "$0.50",
            _ => return StatusCode::NOT_FOUND.into_response(),
        };
        Json(serde_json::json!({ "balance": balance })).into_response()
    }

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/api")
    }

    async fn fake_service() -> AleloClient {
        let app = Router::new()
            .route("/api/login", post(login))
            .route("/api/list/cards", get(cards))
            .route("/api/card/details", get(details));
        AleloClient::new(serve(app).await, Duration::from_secs(5))
    }

    #[tokio::test]
    async fn accepts_valid_pair() {
        let client = fake_service().await;
        client
            .validate_and_link(&Credentials::new("12345678900", "mypassword"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn rejection_carries_service_message() {
        let client = fake_service().await;
        let err = client
            .validate_and_link(&Credentials::new("12345678900", "nope"))
            .await
            .unwrap_err();
        assert!(matches!(&err, Error::Validation(m) if m == "CPF ou senha inválidos"));
    }

    #[tokio::test]
    async fn outage_during_login_is_not_a_rejection() {
        let client = fake_service().await;
        let err = client
            .validate_and_link(&Credentials::new("down", "x"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Remote(_)));
    }

    #[tokio::test]
    async fn balances_follow_service_order() {
        let client = fake_service().await;
        let cards = client
            .fetch_balances(&Credentials::new("12345678900", "mypassword"))
            .await
            .unwrap();
        assert_eq!(
            cards,
            vec![
                CardRecord::new("0001", "$10.00"),
                CardRecord::new("0002", "$5.00"),
            ]
        );
    }

    #[tokio::test]
    async fn revoked_pair_fails_the_fetch() {
        let client = fake_service().await;
        let err = client
            .fetch_balances(&Credentials::new("12345678900", "changed"))
            .await
            .unwrap_err();
        assert!(matches!(&err, Error::Remote(m) if m == "CPF ou senha inválidos"));
    }

    #[tokio::test]
    async fn unreachable_service_is_a_remote_error() {
        let client = AleloClient::new("http://127.0.0.1:1", Duration::from_secs(2));
        let err = client
            .fetch_balances(&Credentials::new("a", "b"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Remote(_)));
    }

    #[tokio::test]
    async fn card_ids_are_query_encoded() {
        async fn one_odd_card() -> impl IntoResponse {
            Json(serde_json::json!({
                "cards": [{"id": "c&d=1 2", "cardNumber": "0003"}]
            }))
        }

        let app = Router::new()
            .route("/api/login", post(login))
            .route("/api/list/cards", get(one_odd_card))
            .route("/api/card/details", get(details));
        let client = AleloClient::new(serve(app).await, Duration::from_secs(5));

        let cards = client
            .fetch_balances(&Credentials::new("12345678900", "mypassword"))
            .await
            .unwrap();
        assert_eq!(cards, vec![CardRecord::new("0003", "$0.50")]);
    }
}
