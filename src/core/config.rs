use anyhow::{Context, Result, bail};
use directories::ProjectDirs;
use lettre::message::Mailbox;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use std::{fs, path::PathBuf};
use tracing::debug;

fn default_db_port() -> u16 {
    5432
}

fn default_connect_timeout_secs() -> u64 {
    30
}

fn default_smtp_port() -> u16 {
    587
}

fn default_subject() -> String {
    "Currency exchange rates".to_string()
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DatabaseConfig {
    pub host: String,
    #[serde(default = "default_db_port")]
    pub port: u16,
    pub user: String,
    #[serde(default)]
    pub password: String,
    pub name: String,
    /// How long to keep retrying the initial connection.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

impl DatabaseConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct EmailConfig {
    pub host: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    pub login: String,
    #[serde(default)]
    pub password: String,
    pub from: String,
    pub to: String,
    #[serde(default = "default_subject")]
    pub subject: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CbrProviderConfig {
    pub base_url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct NbuProviderConfig {
    pub base_url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProvidersConfig {
    #[serde(default = "ProvidersConfig::default_cbr")]
    pub cbr: CbrProviderConfig,
    #[serde(default = "ProvidersConfig::default_nbu")]
    pub nbu: NbuProviderConfig,
}

impl ProvidersConfig {
    fn default_cbr() -> CbrProviderConfig {
        CbrProviderConfig {
            base_url: "https://www.cbr.ru".to_string(),
        }
    }

    fn default_nbu() -> NbuProviderConfig {
        NbuProviderConfig {
            base_url: "https://bank.gov.ua".to_string(),
        }
    }
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        ProvidersConfig {
            cbr: Self::default_cbr(),
            nbu: Self::default_nbu(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct HttpConfig {
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        HttpConfig { timeout_secs: 30 }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub email: EmailConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub http: HttpConfig,
    /// Days before the run date that are back-filled when stored rates lag.
    #[serde(default)]
    pub catch_up_days: u32,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("org", "ratekeeper", "ratekeeper")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let required = [
            ("database.host", &self.database.host),
            ("database.user", &self.database.user),
            ("database.name", &self.database.name),
            ("email.host", &self.email.host),
            ("email.from", &self.email.from),
            ("email.to", &self.email.to),
            ("providers.cbr.base_url", &self.providers.cbr.base_url),
            ("providers.nbu.base_url", &self.providers.nbu.base_url),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                bail!("`{name}` must not be empty");
            }
        }
        self.email
            .from
            .parse::<Mailbox>()
            .with_context(|| format!("`email.from` is not a valid address: {}", self.email.from))?;
        self.email
            .to
            .parse::<Mailbox>()
            .with_context(|| format!("`email.to` is not a valid address: {}", self.email.to))?;
        if self.database.connect_timeout_secs == 0 {
            bail!("`database.connect_timeout_secs` must be greater than zero");
        }
        if self.http.timeout_secs == 0 {
            bail!("`http.timeout_secs` must be greater than zero");
        }
        Ok(())
    }
}
