//! Environment-driven server configuration

use std::net::{IpAddr, SocketAddr};

use anyhow::Context;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 5001;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: IpAddr,
    pub port: u16,
    pub rate_limit_enabled: bool,
    /// Identify clients by `X-Forwarded-For` rather than the socket peer
    pub trust_forwarded: bool,
}

impl ServerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let host = env_value("CATEGORIZER_HOST")
            .unwrap_or_else(|| DEFAULT_HOST.to_string())
            .parse()
            .context("CATEGORIZER_HOST is not an IP address")?;
        let port = match env_value("CATEGORIZER_PORT") {
            Some(raw) => raw.parse().context("CATEGORIZER_PORT is not a port number")?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            host,
            port,
            rate_limit_enabled: env_flag("CATEGORIZER_RATE_LIMIT_ENABLED", true),
            trust_forwarded: env_flag("CATEGORIZER_TRUST_FORWARDED", false),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn env_flag(name: &str, default: bool) -> bool {
    match std::env::var(name) {
        Ok(raw) => parse_flag(&raw).unwrap_or(default),
        Err(_) => default,
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
