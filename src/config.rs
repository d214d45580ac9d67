use std::{net::SocketAddr, path::PathBuf};

use anyhow::Context;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SessionBackend {
    Memory,
    Database,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub addr: SocketAddr,
    pub site_name: String,
    pub database_url: String,
    pub tax_rate_bps: u32,
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub session_backend: SessionBackend,
    pub session_ttl_minutes: i64,
    pub admin_username: String,
    pub admin_email: String,
    pub admin_password: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port: u16 =
            std::env::var("PORT").unwrap_or_else(|_| "3000".to_string()).parse().context("PORT")?;

        let site_name = std::env::var("SITE_NAME").unwrap_or_else(|_| "StreamFlix".to_string());

        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://streamflix.db?mode=rwc".to_string());

        let tax_rate_bps: u32 = match std::env::var("TAX_RATE_BPS") {
            Ok(raw) => raw.parse().context("TAX_RATE_BPS")?,
            Err(_) => 700,
        };

        let upload_dir =
            PathBuf::from(std::env::var("UPLOAD_DIR").unwrap_or_else(|_| "uploads".to_string()));

        let max_upload_bytes: usize = std::env::var("MAX_UPLOAD_BYTES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(5_000_000);

        let session_backend = match std::env::var("SESSION_BACKEND").as_deref() {
            Ok("database") => SessionBackend::Database,
            Ok("memory") | Err(_) => SessionBackend::Memory,
            Ok(other) => anyhow::bail!("SESSION_BACKEND must be memory or database, got {other}"),
        };

        let session_ttl_minutes: i64 =
            std::env::var("SESSION_TTL_MINUTES").ok().and_then(|s| s.parse().ok()).unwrap_or(1440);

        let admin_username =
            std::env::var("ADMIN_USERNAME").unwrap_or_else(|_| "admin".to_string());
        let admin_email =
            std::env::var("ADMIN_EMAIL").unwrap_or_else(|_| "admin@example.com".to_string());
        let admin_password =
            std::env::var("ADMIN_PASSWORD").unwrap_or_else(|_| "admin123".to_string());

        Ok(Self {
            addr: format!("{host}:{port}").parse().context("HOST/PORT")?,
            site_name,
            database_url,
            tax_rate_bps,
            upload_dir,
            max_upload_bytes,
            session_backend,
            session_ttl_minutes,
            admin_username,
            admin_email,
            admin_password,
        })
    }

    pub fn session_ttl_seconds(&self) -> i64 {
        self.session_ttl_minutes.max(1) * 60
    }
}
