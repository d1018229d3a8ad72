use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Where job records are persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// One JSON document rewritten atomically on every change.
    #[default]
    Json,
    /// SQLite database (one row per job).
    Sqlite,
}

/// File host that downloaded payloads are relayed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DestinationKind {
    #[default]
    Pixeldrain,
    Gofile,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PixeldrainConfig {
    /// API key (sent as the basic-auth password). Env: `PIXELDRAIN_API_KEY`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub base_url: String,
}

impl Default for PixeldrainConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://pixeldrain.com".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GofileConfig {
    /// Account token; anonymous uploads when absent. Env: `GOFILE_TOKEN`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    pub upload_url: String,
}

impl Default for GofileConfig {
    fn default() -> Self {
        Self {
            token: None,
            upload_url: "https://upload.gofile.io/uploadfile".to_string(),
        }
    }
}

/// Mailjet credentials. Notifications are disabled unless key, secret and
/// sender are all present.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MailjetConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_secret: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender_email: Option<String>,
    pub sender_name: String,
    pub base_url: String,
}

impl Default for MailjetConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_secret: None,
            sender_email: None,
            sender_name: "relaydrop".to_string(),
            base_url: "https://api.mailjet.com".to_string(),
        }
    }
}

impl MailjetConfig {
    pub fn is_configured(&self) -> bool {
        self.api_key.is_some() && self.api_secret.is_some() && self.sender_email.is_some()
    }
}

/// Global configuration loaded from `~/.config/relaydrop/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub store_backend: StoreBackend,
    /// Override for the job store location (defaults under the XDG state dir).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_path: Option<PathBuf>,
    /// Upper bound on relays running at once.
    pub max_concurrent_jobs: usize,
    /// Worker wake-up interval when no submission signal arrives.
    pub poll_interval_secs: u64,
    /// Projected download time (seconds) above which a "long-running" notice is sent.
    pub long_running_threshold_secs: u64,
    /// Directory for temporary download sinks (defaults to the system temp dir).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temp_dir: Option<PathBuf>,
    pub destination: DestinationKind,
    pub pixeldrain: PixeldrainConfig,
    pub gofile: GofileConfig,
    pub mailjet: MailjetConfig,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            store_backend: StoreBackend::default(),
            store_path: None,
            max_concurrent_jobs: 4,
            poll_interval_secs: 2,
            long_running_threshold_secs: 6000,
            temp_dir: None,
            destination: DestinationKind::default(),
            pixeldrain: PixeldrainConfig::default(),
            gofile: GofileConfig::default(),
            mailjet: MailjetConfig::default(),
        }
    }
}

impl RelayConfig {
    /// Fills secrets from `lookup` (normally the process environment); a
    /// present variable wins over the file.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let set = |slot: &mut Option<String>, var: &str| {
            if let Some(v) = lookup(var).filter(|v| !v.is_empty()) {
                *slot = Some(v);
            }
        };
        set(&mut self.pixeldrain.api_key, "PIXELDRAIN_API_KEY");
        set(&mut self.gofile.token, "GOFILE_TOKEN");
        set(&mut self.mailjet.api_key, "MAILJET_API_KEY");
        set(&mut self.mailjet.api_secret, "MAILJET_API_SECRET");
        set(&mut self.mailjet.sender_email, "MAILJET_SENDER_EMAIL");
    }

    /// Job store location: `store_path` if set, else `jobs.json` / `jobs.db`
    /// under `~/.local/state/relaydrop/`.
    pub fn resolved_store_path(&self) -> Result<PathBuf> {
        if let Some(p) = &self.store_path {
            return Ok(p.clone());
        }
        let file = match self.store_backend {
            StoreBackend::Json => "jobs.json",
            StoreBackend::Sqlite => "jobs.db",
        };
        let xdg_dirs = xdg::BaseDirectories::with_prefix("relaydrop")?;
        Ok(xdg_dirs.place_state_file(file)?)
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("relaydrop")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from the default path, creating a default file if none
/// exists, then apply environment overrides.
pub fn load_or_init() -> Result<RelayConfig> {
    let mut cfg = load_or_init_at(&config_path()?)?;
    cfg.apply_env_overrides(|k| std::env::var(k).ok());
    Ok(cfg)
}

/// Load configuration from `path`, writing defaults there first if missing.
pub fn load_or_init_at(path: &Path) -> Result<RelayConfig> {
    if !path.exists() {
        let default_cfg = RelayConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(path)?;
    let cfg: RelayConfig = toml::from_str(&data)?;
    Ok(cfg)
}
