use std::{net::SocketAddr, time::Duration};

use anyhow::Context;
use serde::Deserialize;

const DEFAULT_TIMEOUT_MS: u64 = 15_000;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub listen_addr: SocketAddr,
    pub database_url: String,
    pub max_connections: u32,
    /// Deadline applied to every individual store call.
    pub request_timeout: Duration,
    pub jwt: JwtConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let listen_addr = parse_listen_addr(
            std::env::var("APP_HOST").ok().as_deref(),
            std::env::var("APP_PORT").ok().as_deref(),
        )?;
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let max_connections = std::env::var("DATABASE_MAX_CONNECTIONS")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(10);
        let request_timeout = parse_timeout(std::env::var("TIMEOUT_RESPONSE").ok().as_deref());
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET").context("JWT_SECRET is not set")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "userdesk".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "userdesk-clients".into()),
            ttl_minutes: std::env::var("JWT_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60),
        };
        Ok(Self {
            listen_addr,
            database_url,
            max_connections,
            request_timeout,
            jwt,
        })
    }
}

fn parse_listen_addr(host: Option<&str>, port: Option<&str>) -> anyhow::Result<SocketAddr> {
    let host = host.unwrap_or("0.0.0.0");
    let port = port.unwrap_or("8080");
    format!("{host}:{port}")
        .parse()
        .with_context(|| format!("invalid APP_HOST/APP_PORT: {host}:{port}"))
}

/// Milliseconds; anything unparsable or zero falls back to the default.
fn parse_timeout(raw: Option<&str>) -> Duration {
    let ms = raw
        .and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|ms| *ms > 0)
        .unwrap_or(DEFAULT_TIMEOUT_MS);
    Duration::from_millis(ms)
}
