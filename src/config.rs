use crate::errors::{PricerError, PricerResult};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server_port: u16,
    pub quote_api_base_url: String,
    pub quote_timeout_secs: u64,
    pub quote_user_agent: String,
    pub default_ticker: String,
}

impl AppConfig {
    pub fn from_env() -> PricerResult<Self> {
        dotenvy::dotenv().ok();

        let server_port = env_var_or("SERVER_PORT", "8050")
            .parse::<u16>()
            .map_err(|e| PricerError::Config(format!("SERVER_PORT: {e}")))?;

        let quote_timeout_secs = env_var_or("QUOTE_TIMEOUT_SECS", "10")
            .parse::<u64>()
            .map_err(|e| PricerError::Config(format!("QUOTE_TIMEOUT_SECS: {e}")))?;

        let default_ticker = env_var_or("DEFAULT_TICKER", "AAPL");
        if default_ticker.trim().is_empty() {
            return Err(PricerError::Config("DEFAULT_TICKER: must not be empty".into()));
        }

        Ok(Self {
            server_port,
            quote_api_base_url: env_var_or(
                "QUOTE_API_BASE_URL",
                "https://query1.finance.yahoo.com",
            ),
            quote_timeout_secs,
            quote_user_agent: env_var_or("QUOTE_USER_AGENT", "Mozilla/5.0 (option-pricer)"),
            default_ticker,
        })
    }
}

fn env_var_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
