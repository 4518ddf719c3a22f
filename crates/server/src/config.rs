use anyhow::Context;

/// Runtime settings, read once from the environment at startup.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub db_path: String,
    pub tmdb_api_key: String,
    pub tmdb_language: String,
    pub bind_addr: String,
    pub notify_interval_secs: u64,
    pub log_json: bool,
}

impl ServerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let tmdb_api_key = get("CRONICA_TMDB_API_KEY")
            .filter(|v| !v.trim().is_empty())
            .context("CRONICA_TMDB_API_KEY must be set")?;

        let notify_interval_secs = match get("CRONICA_NOTIFY_INTERVAL_SECS") {
            Some(v) => v
                .parse()
                .with_context(|| format!("invalid CRONICA_NOTIFY_INTERVAL_SECS: {v}"))?,
            None => 300,
        };

        Ok(Self {
            db_path: get("CRONICA_DB").unwrap_or_else(|| "cronica.db".to_string()),
            tmdb_api_key,
            tmdb_language: get("CRONICA_TMDB_LANGUAGE").unwrap_or_else(|| "en-US".to_string()),
            bind_addr: get("CRONICA_BIND").unwrap_or_else(|| "0.0.0.0:8787".to_string()),
            notify_interval_secs,
            log_json: get("CRONICA_LOG_JSON").is_some_and(|v| v == "true" || v == "1"),
        })
    }
}
