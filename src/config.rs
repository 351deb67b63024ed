//! Configuration module for environment variables and application settings

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Result, anyhow};

use crate::auth::jwt::{ACCESS_TOKEN_TTL_SECS, REFRESH_TOKEN_TTL_SECS, TokenScheme};

#[derive(Debug, Clone)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,

    /// Token issuance
    pub tokens: TokenConfig,

    /// Where the user directory is persisted. In memory when unset.
    pub storage_path: Option<PathBuf>,

    /// Simulated latency of the learning data backend
    pub backend: BackendConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Origins allowed to call the API with credentials
    pub allowed_origins: Vec<String>,
    /// Send session cookies as `Secure; SameSite=None` for a frontend on
    /// another site
    pub cross_site_cookies: bool,
}

#[derive(Debug, Clone)]
pub struct TokenConfig {
    pub secret: String,
    pub scheme: TokenScheme,
    pub access_ttl_secs: i64,
    pub refresh_ttl_secs: i64,
}

#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub load_delay: Duration,
    pub update_delay: Duration,
}

impl Config {
    /// Load configuration from environment variables, after reading `.env`
    /// if there is one.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let scheme = env::var("TOKEN_SCHEME")
            .unwrap_or_else(|_| "signed".to_string())
            .parse::<TokenScheme>()
            .map_err(|e| anyhow!("TOKEN_SCHEME: {e}"))?;

        let tokens = TokenConfig {
            secret: env::var("TOKEN_SECRET").unwrap_or_else(|_| "dev_secret".to_string()),
            scheme,
            access_ttl_secs: env::var("ACCESS_TOKEN_TTL_SECS")
                .unwrap_or_else(|_| ACCESS_TOKEN_TTL_SECS.to_string())
                .parse()
                .unwrap_or(ACCESS_TOKEN_TTL_SECS),
            refresh_ttl_secs: env::var("REFRESH_TOKEN_TTL_SECS")
                .unwrap_or_else(|_| REFRESH_TOKEN_TTL_SECS.to_string())
                .parse()
                .unwrap_or(REFRESH_TOKEN_TTL_SECS),
        };
        if tokens.access_ttl_secs <= 0 || tokens.refresh_ttl_secs <= 0 {
            return Err(anyhow!("token lifetimes must be positive"));
        }

        Ok(Self {
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
                port: env::var("SERVER_PORT")
                    .unwrap_or_else(|_| "3000".to_string())
                    .parse()
                    .unwrap_or(3000),
                allowed_origins: parse_list(
                    &env::var("ALLOWED_ORIGINS").unwrap_or_else(|_| "http://localhost:5173".to_string()),
                ),
                cross_site_cookies: env::var("COOKIE_CROSS_SITE")
                    .unwrap_or_else(|_| "true".to_string())
                    .parse()
                    .unwrap_or(true),
            },

            tokens,

            storage_path: env::var("STORAGE_PATH")
                .ok()
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from),

            backend: BackendConfig {
                load_delay: Duration::from_millis(
                    env::var("SIMULATED_LOAD_DELAY_MS")
                        .unwrap_or_else(|_| "800".to_string())
                        .parse()
                        .unwrap_or(800),
                ),
                update_delay: Duration::from_millis(
                    env::var("SIMULATED_UPDATE_DELAY_MS")
                        .unwrap_or_else(|_| "500".to_string())
                        .parse()
                        .unwrap_or(500),
                ),
            },
        })
    }
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_origin_list() {
        assert_eq!(
            parse_list("http://a.test, http://b.test,,"),
            vec!["http://a.test".to_string(), "http://b.test".to_string()]
        );
        assert!(parse_list(" ").is_empty());
    }
}
