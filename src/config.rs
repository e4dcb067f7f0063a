use std::env;
use std::time::Duration;

pub const DEFAULT_SILICONFLOW_URL: &str = "https://api.siliconflow.cn/v1/chat/completions";

#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    /// Bearer credential for the upstream. `None` is reported per request, never at startup.
    pub siliconflow_key: Option<String>,
    pub siliconflow_url: String,
    pub upstream_timeout: Duration,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if it exists (for development)
        dotenvy::dotenv().ok();

        let port = env::var("PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid PORT value: {}", e))?;

        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite:./counter_proxy.db".to_string());

        let siliconflow_key = env::var("SILICONFLOW_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty());

        let siliconflow_url =
            env::var("SILICONFLOW_URL").unwrap_or_else(|_| DEFAULT_SILICONFLOW_URL.to_string());

        let timeout_secs: u64 = env::var("UPSTREAM_TIMEOUT_SECS")
            .unwrap_or_else(|_| "60".to_string())
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid UPSTREAM_TIMEOUT_SECS value: {}", e))?;

        Ok(Config {
            port,
            database_url,
            siliconflow_key,
            siliconflow_url,
            upstream_timeout: Duration::from_secs(timeout_secs),
        })
    }
}
