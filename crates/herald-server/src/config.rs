use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, bail};

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
];

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub jwt_secret: String,
}

impl ServerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let jwt_secret = var("HERALD_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("HERALD_JWT_SECRET is unset or still a placeholder; set it in your .env file and restart");
        }

        let host = var("HERALD_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port = match var("HERALD_PORT") {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("HERALD_PORT is not a port number: {raw}"))?,
            None => 8080,
        };
        let db_path = var("HERALD_DB_PATH").unwrap_or_else(|| "herald.db".into()).into();

        Ok(Self {
            host,
            port,
            db_path,
            jwt_secret,
        })
    }

    pub fn addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", self.host, self.port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> anyhow::Result<ServerConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_only_secret_is_set() {
        let config = config(&[("HERALD_JWT_SECRET", "s3cret")]).unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8080);
        assert_eq!(config.db_path, PathBuf::from("herald.db"));
        assert_eq!(config.addr().unwrap().port(), 8080);
    }

    #[test]
    fn missing_or_placeholder_secret_is_rejected() {
        assert!(config(&[]).is_err());
        assert!(config(&[("HERALD_JWT_SECRET", "dev-secret-change-me")]).is_err());
    }

    #[test]
    fn bad_port_is_rejected() {
        let result = config(&[("HERALD_JWT_SECRET", "s3cret"), ("HERALD_PORT", "http")]);
        assert!(result.is_err());
    }
}
