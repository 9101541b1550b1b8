use crashline_execution::EngineConfig;
use serde::Serialize;

pub const DEFAULT_HTTP_RATE_LIMIT_PER_SECOND: u64 = 50;
pub const DEFAULT_HTTP_RATE_LIMIT_BURST: u32 = 100;
pub const DEFAULT_HTTP_BODY_LIMIT_BYTES: usize = 16 * 1024;

#[derive(Clone, Debug, Serialize)]
pub struct ServerConfig {
    pub engine: EngineConfig,
    /// Seed for the crash point generator. Entropy when unset.
    pub deterministic_seed: Option<u64>,
    pub http_rate_limit_per_second: Option<u64>,
    pub http_rate_limit_burst: Option<u32>,
    pub http_body_limit_bytes: Option<usize>,
    /// Browser origins accepted by CORS and the origin check. `*` accepts any.
    pub allowed_origins: Vec<String>,
    /// Accept requests that carry no `Origin` header (non-browser clients).
    pub allow_no_origin: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            deterministic_seed: None,
            http_rate_limit_per_second: Some(DEFAULT_HTTP_RATE_LIMIT_PER_SECOND),
            http_rate_limit_burst: Some(DEFAULT_HTTP_RATE_LIMIT_BURST),
            http_body_limit_bytes: Some(DEFAULT_HTTP_BODY_LIMIT_BYTES),
            allowed_origins: Vec::new(),
            allow_no_origin: true,
        }
    }
}

impl ServerConfig {
    pub fn validate(&self) -> Result<(), &'static str> {
        self.engine.validate()?;
        if self.http_body_limit_bytes == Some(0) {
            return Err("http_body_limit_bytes must be greater than zero when set");
        }
        Ok(())
    }

    /// Settings for in-process use: no per-IP limiter, any origin.
    pub fn local() -> Self {
        Self {
            http_rate_limit_per_second: None,
            http_rate_limit_burst: None,
            allowed_origins: vec!["*".to_string()],
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        assert!(ServerConfig::default().validate().is_ok());
        assert!(ServerConfig::local().validate().is_ok());
    }

    #[test]
    fn test_rejects_zero_body_limit() {
        let config = ServerConfig {
            http_body_limit_bytes: Some(0),
            ..ServerConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_invalid_engine_config() {
        let mut config = ServerConfig::default();
        config.engine.rate_limit_window_ms = 0;
        assert_eq!(
            config.validate(),
            Err("rate_limit_window_ms must be greater than zero")
        );
    }
}
