use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use triage_flow::TriageError;

/// Service configuration loaded explicitly from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding `metadata/keywords.json` and `diseases/*.json`.
    pub data_dir: PathBuf,
    pub bind_addr: String,
    pub port: u16,
    /// Sessions idle for longer than this are dropped.
    pub session_ttl: Duration,
}

impl Config {
    /// Optional:
    /// - `TRIAGE_DATA_DIR`: data directory (default `data`)
    /// - `TRIAGE_BIND_ADDR`: listen address (default `0.0.0.0`)
    /// - `PORT`: listen port (default `3000`)
    /// - `TRIAGE_SESSION_TTL_SECS`: idle session lifetime (default `1800`)
    pub fn from_env() -> Result<Self, TriageError> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self, TriageError> {
        let data_dir = PathBuf::from(var("TRIAGE_DATA_DIR").unwrap_or_else(|| "data".to_string()));
        if !data_dir.is_dir() {
            return Err(TriageError::Config(format!(
                "data directory not found: {}",
                data_dir.display()
            )));
        }

        let port = match var("PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .map_err(|e| TriageError::Config(format!("invalid PORT {raw:?}: {e}")))?,
            None => 3000,
        };

        let ttl_secs = match var("TRIAGE_SESSION_TTL_SECS") {
            Some(raw) => raw.parse::<u64>().map_err(|e| {
                TriageError::Config(format!("invalid TRIAGE_SESSION_TTL_SECS {raw:?}: {e}"))
            })?,
            None => 1800,
        };
        if ttl_secs == 0 {
            return Err(TriageError::Config(
                "TRIAGE_SESSION_TTL_SECS must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            data_dir,
            bind_addr: var("TRIAGE_BIND_ADDR").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            session_ttl: Duration::from_secs(ttl_secs),
        })
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, TriageError> {
        format!("{}:{}", self.bind_addr, self.port)
            .parse()
            .map_err(|e| {
                TriageError::Config(format!("invalid bind address {}: {e}", self.bind_addr))
            })
    }
}
