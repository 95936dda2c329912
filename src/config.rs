// src/config.rs
use crate::error::{AppError, AppResult};
use std::net::SocketAddr;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_SESSION_TTL_HOURS: i64 = 24;

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Base do backend REST, sem barra final.
    pub backend_url: String,
    pub backend_token: Option<String>,
    pub bind_addr: SocketAddr,
    pub session_ttl_hours: i64,
}

impl AppConfig {
    pub fn from_env() -> AppResult<Self> {
        dotenvy::dotenv().ok(); // Carrega .env
        let backend_url = std::env::var("BACKEND_URL")?;
        let backend_token = std::env::var("BACKEND_TOKEN").ok().filter(|t| !t.trim().is_empty());
        let bind_addr = std::env::var("BIND_ADDR").ok();
        let ttl = std::env::var("SESSION_TTL_HOURS").ok();

        Self::from_parts(&backend_url, backend_token, bind_addr.as_deref(), ttl.as_deref())
    }

    fn from_parts(
        backend_url: &str,
        backend_token: Option<String>,
        bind_addr: Option<&str>,
        session_ttl_hours: Option<&str>,
    ) -> AppResult<Self> {
        let backend_url = backend_url.trim().trim_end_matches('/').to_string();
        if !(backend_url.starts_with("http://") || backend_url.starts_with("https://")) {
            return Err(AppError::Config(format!("BACKEND_URL inválida: '{}'", backend_url)));
        }

        let bind_addr = bind_addr
            .unwrap_or(DEFAULT_BIND_ADDR)
            .parse::<SocketAddr>()
            .map_err(|e| AppError::Config(format!("BIND_ADDR inválido: {}", e)))?;

        let session_ttl_hours = match session_ttl_hours {
            Some(raw) => raw
                .trim()
                .parse::<i64>()
                .ok()
                .filter(|h| *h > 0)
                .ok_or_else(|| AppError::Config(format!("SESSION_TTL_HOURS inválido: '{}'", raw)))?,
            None => DEFAULT_SESSION_TTL_HOURS,
        };

        tracing::info!("Backend configurado em {}", backend_url);

        Ok(Self { backend_url, backend_token, bind_addr, session_ttl_hours })
    }
}
