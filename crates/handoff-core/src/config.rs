use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Durable store backend: whole-file JSON (default) or a SQLite key-value table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Json,
    Sqlite,
}

/// Global configuration loaded from `~/.config/handoff/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandoffConfig {
    /// Host of the external agent's hand-off endpoint.
    pub endpoint_host: String,
    /// Port of the external agent's hand-off endpoint.
    pub endpoint_port: u16,
    /// Maximum number of request records kept in the ledger.
    pub ledger_capacity: usize,
    /// Total time allowed for one hand-off POST, in seconds.
    pub handoff_timeout_secs: u64,
    /// Time allowed to establish the connection to the agent, in seconds.
    pub connect_timeout_secs: u64,
    /// Also record generic async requests (`xmlhttprequest`), not only frames.
    #[serde(default)]
    pub capture_async_requests: bool,
    /// Store backend: "json" (default) or "sqlite".
    #[serde(default)]
    pub store_backend: Option<StoreBackend>,
}

impl Default for HandoffConfig {
    fn default() -> Self {
        Self {
            endpoint_host: "127.0.0.1".to_string(),
            endpoint_port: 2866,
            ledger_capacity: 50,
            handoff_timeout_secs: 10,
            connect_timeout_secs: 2,
            capture_async_requests: false,
            store_backend: None,
        }
    }
}

impl HandoffConfig {
    /// URL the descriptor is POSTed to.
    pub fn endpoint_url(&self) -> String {
        format!("http://{}:{}/", self.endpoint_host, self.endpoint_port)
    }

    /// Ledger bound; a zero capacity in the file is treated as 1.
    pub fn effective_ledger_capacity(&self) -> usize {
        self.ledger_capacity.max(1)
    }

    pub fn handoff_timeout(&self) -> Duration {
        Duration::from_secs(self.handoff_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn store_backend(&self) -> StoreBackend {
        self.store_backend.unwrap_or_default()
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("handoff")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// State directory for logs and the durable store: `~/.local/state/handoff`.
pub fn state_dir() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("handoff")?;
    Ok(xdg_dirs.get_state_home().join("handoff"))
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<HandoffConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = HandoffConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: HandoffConfig = toml::from_str(&data)?;
    Ok(cfg)
}
