use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{domain::Credentials, errors::Error, Result};

/// Typed configuration, read from the environment (and an optional `.env`).
#[derive(Clone, Debug)]
pub struct Config {
    // Core
    pub telegram_bot_token: String,

    // Credential persistence
    pub credentials_file: PathBuf,

    // Card account service
    pub account_api_url: String,
    pub account_timeout: Duration,

    // Dispatch
    pub balance_workers: usize,
    pub event_buffer: usize,

    // Outbound flood control
    pub throttle_global: Duration,
    pub throttle_per_chat: Duration,

    // Liveness check
    pub health_port: Option<u16>,
    pub health_check: Option<Credentials>,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup (the process env in `load`).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).and_then(non_empty);

        let telegram_bot_token = get("TELEGRAM_TOKEN")
            .or_else(|| get("TELEGRAM_BOT_TOKEN"))
            .ok_or_else(|| {
                Error::Config("TELEGRAM_TOKEN environment variable is required".to_string())
            })?;

        // Holds every user's password: keep it under $HOME, never in a shared /tmp.
        let credentials_file = get("CREDENTIALS_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|| match get("HOME") {
                Some(home) => PathBuf::from(home).join(".local/share/balance-bot/credentials.json"),
                None => PathBuf::from("balance-bot-credentials.json"),
            });

        let account_api_url = get("ACCOUNT_API_URL")
            .unwrap_or_else(|| "https://www.meualelo.com.br/api/m/v1".to_string())
            .trim_end_matches('/')
            .to_string();
        let account_timeout =
            Duration::from_millis(parse_num(get("ACCOUNT_TIMEOUT_MS")).unwrap_or(30_000));

        let balance_workers = parse_num(get("BALANCE_WORKERS")).unwrap_or(16).max(1);
        let event_buffer = parse_num(get("EVENT_BUFFER")).unwrap_or(256).max(1);

        let throttle_global =
            Duration::from_millis(parse_num(get("THROTTLE_GLOBAL_MS")).unwrap_or(40));
        let throttle_per_chat =
            Duration::from_millis(parse_num(get("THROTTLE_PER_CHAT_MS")).unwrap_or(1050));

        let health_port = match get("PORT") {
            Some(raw) => Some(
                raw.trim()
                    .parse::<u16>()
                    .map_err(|_| Error::Config(format!("PORT is not a valid port: {raw}")))?,
            ),
            None => None,
        };
        let health_check = match (get("TEST_CPF"), get("TEST_PWD")) {
            (Some(id), Some(pwd)) => Some(Credentials::new(id.trim(), pwd.trim())),
            _ => None,
        };

        Ok(Self {
            telegram_bot_token,
            credentials_file,
            account_api_url,
            account_timeout,
            balance_workers,
            event_buffer,
            throttle_global,
            throttle_per_chat,
            health_port,
            health_check,
        })
    }
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for (key, val) in parse_dotenv(&contents) {
        if env::var_os(&key).is_some() {
            continue; // do not override existing env
        }
        env::set_var(key, val);
    }
}

fn parse_dotenv(contents: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        out.push((key.to_string(), val));
    }
    out
}

fn parse_num<T: std::str::FromStr>(v: Option<String>) -> Option<T> {
    v.and_then(|s| s.trim().parse::<T>().ok())
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
