use std::env;

use anyhow::Result;
use tracing::warn;

pub const DEFAULT_CHAT_ID: &str = "-1003174200950";
pub const DEFAULT_TELEGRAM_API_URL: &str = "https://api.telegram.org";

#[derive(Debug, Clone)]
pub struct Config {
    pub bot_token: String,
    pub telegram_api_url: String,
    pub default_chat_id: String,
    pub database_url: String,
    pub bind_addr: String,
    pub log_level: String,
    pub bot_request_timeout_secs: u64,
    pub strict_status_transitions: bool,
    pub cny_to_rub_rate: f64,
}

fn env_bool(name: &str, default: bool) -> bool {
    env::var(name)
        .ok()
        .map(|value| value.trim().eq_ignore_ascii_case("true"))
        .unwrap_or(default)
}

fn env_string(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_u64(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(default)
}

fn env_f64(name: &str, default: f64) -> f64 {
    env::var(name)
        .ok()
        .and_then(|value| value.parse::<f64>().ok())
        .unwrap_or(default)
}

fn normalize_api_url(value: String) -> String {
    let trimmed = value.trim().trim_end_matches('/');
    let problem = match url::Url::parse(trimmed) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {
            return trimmed.to_string();
        }
        Ok(parsed) => format!("unsupported scheme {}", parsed.scheme()),
        Err(err) => err.to_string(),
    };
    warn!(
        "Invalid TELEGRAM_API_URL '{}' ({}); falling back to {}",
        value, problem, DEFAULT_TELEGRAM_API_URL
    );
    DEFAULT_TELEGRAM_API_URL.to_string()
}

impl Config {
    pub fn load() -> Result<Self> {
        let bot_request_timeout_secs = env_u64("BOT_REQUEST_TIMEOUT_SECS", 10);
        if bot_request_timeout_secs == 0 {
            return Err(anyhow::anyhow!(
                "BOT_REQUEST_TIMEOUT_SECS must be greater than zero"
            ));
        }

        let cny_to_rub_rate = env_f64("CNY_TO_RUB_RATE", 11.40);
        if !(cny_to_rub_rate.is_finite() && cny_to_rub_rate > 0.0) {
            return Err(anyhow::anyhow!("CNY_TO_RUB_RATE must be a positive number"));
        }

        Ok(Config {
            bot_token: env_string("TELEGRAM_BOT_TOKEN", "").trim().to_string(),
            telegram_api_url: normalize_api_url(env_string(
                "TELEGRAM_API_URL",
                DEFAULT_TELEGRAM_API_URL,
            )),
            default_chat_id: env_string("DEFAULT_CHAT_ID", DEFAULT_CHAT_ID),
            database_url: env_string("DATABASE_URL", "sqlite://topup.db"),
            bind_addr: env_string("BIND_ADDR", "0.0.0.0:3000"),
            log_level: env_string("LOG_LEVEL", "info").to_lowercase(),
            bot_request_timeout_secs,
            strict_status_transitions: env_bool("STRICT_STATUS_TRANSITIONS", true),
            cny_to_rub_rate,
        })
    }

    pub fn has_bot_token(&self) -> bool {
        !self.bot_token.is_empty()
    }
}

#[cfg(test)]
pub fn test_config() -> Config {
    Config {
        bot_token: "123:test-token".to_string(),
        telegram_api_url: DEFAULT_TELEGRAM_API_URL.to_string(),
        default_chat_id: DEFAULT_CHAT_ID.to_string(),
        database_url: "sqlite::memory:".to_string(),
        bind_addr: "127.0.0.1:0".to_string(),
        log_level: "debug".to_string(),
        bot_request_timeout_secs: 10,
        strict_status_transitions: true,
        cny_to_rub_rate: 11.40,
    }
}
