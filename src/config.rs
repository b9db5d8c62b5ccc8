use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

const FALLBACK_CONFIG_PATH: &str = "config.example.json";

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct MonitorConfig {
    #[serde(default)]
    pub targets: Vec<Target>,
    #[serde(default)]
    pub global_settings: GlobalSettings,
}

/// One monitored endpoint with its own expectations and alert recipients.
/// Immutable for the lifetime of the process.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Target {
    pub name: String,
    pub url: String,
    #[serde(default = "default_expected_status")]
    pub expected_status: u16,
    #[serde(default)]
    pub expected_text: Option<String>,
    #[serde(default = "default_verify_tls")]
    pub verify_tls: bool,
    #[serde(default)]
    pub max_response_time_ms: Option<f64>,
    #[serde(default)]
    pub check_tls_expiry: bool,
    #[serde(default = "default_retries")]
    pub retries: u32,
    #[serde(default)]
    pub alert_recipients: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GlobalSettings {
    #[serde(default = "default_interval")]
    pub monitor_interval_seconds: u64,
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
    #[serde(default = "default_tls_warning_days")]
    pub tls_warning_days: i64,
    #[serde(default = "default_max_response_time")]
    pub max_response_time_ms: f64,
    #[serde(default)]
    pub smtp_server: Option<String>,
    #[serde(default)]
    pub smtp_port: Option<u16>,
    #[serde(default)]
    pub sender_email: Option<String>,
    #[serde(default)]
    pub sender_password: Option<String>,
}

fn default_expected_status() -> u16 { 200 }
fn default_verify_tls() -> bool { true }
fn default_retries() -> u32 { 2 }
fn default_interval() -> u64 { 300 }
fn default_timeout() -> u64 { 30 }
fn default_tls_warning_days() -> i64 { 30 }
fn default_max_response_time() -> f64 { 5000.0 }

impl Default for GlobalSettings {
    fn default() -> Self {
        Self {
            monitor_interval_seconds: default_interval(),
            timeout_seconds: default_timeout(),
            tls_warning_days: default_tls_warning_days(),
            max_response_time_ms: default_max_response_time(),
            smtp_server: None,
            smtp_port: None,
            sender_email: None,
            sender_password: None,
        }
    }
}

impl MonitorConfig {
    /// Loads the config file (falling back to the example file, then to an
    /// empty config), applies SMTP environment overrides and validates that
    /// the credentials are complete before the monitor is allowed to start.
    pub fn load(path: &str) -> Result<Self> {
        let mut config = Self::from_file(path)?;
        config.global_settings.scrub_placeholders();
        config.global_settings.apply_env_overrides();
        config.global_settings.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(raw) => {
                info!("Loaded configuration from {path}");
                serde_json::from_str(&raw).with_context(|| format!("Failed to parse {path}"))
            }
            Err(_) => match std::fs::read_to_string(FALLBACK_CONFIG_PATH) {
                Ok(raw) => {
                    info!("Using {FALLBACK_CONFIG_PATH} as configuration template");
                    serde_json::from_str(&raw)
                        .with_context(|| format!("Failed to parse {FALLBACK_CONFIG_PATH}"))
                }
                Err(_) => {
                    warn!("No configuration file found; relying on environment variables only");
                    Ok(Self::default())
                }
            },
        }
    }
}

impl GlobalSettings {
    /// Environment variables win over file values for the SMTP credentials.
    fn apply_env_overrides(&mut self) {
        if let Some(server) = env_value("SMTP_SERVER") {
            info!("smtp_server taken from environment");
            self.smtp_server = Some(server);
        }
        if let Some(raw) = env_value("SMTP_PORT") {
            match raw.parse() {
                Ok(port) => {
                    info!("smtp_port taken from environment");
                    self.smtp_port = Some(port);
                }
                Err(_) => warn!("Ignoring unparseable SMTP_PORT value {raw:?}"),
            }
        }
        if let Some(email) = env_value("SENDER_EMAIL") {
            info!("sender_email taken from environment");
            self.sender_email = Some(email);
        }
        if let Some(password) = env_value("SENDER_PASSWORD") {
            info!("sender_password taken from environment");
            self.sender_password = Some(password);
        }
    }

    /// Template values like "your_password" must not pass for real credentials.
    fn scrub_placeholders(&mut self) {
        for field in [
            &mut self.smtp_server,
            &mut self.sender_email,
            &mut self.sender_password,
        ] {
            if field.as_deref().is_some_and(is_placeholder) {
                *field = None;
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        let required = [
            ("smtp_server", &self.smtp_server),
            ("sender_email", &self.sender_email),
            ("sender_password", &self.sender_password),
        ];
        for (key, value) in required {
            if value.is_none() {
                bail!("Missing required setting '{key}'; set it in the config file or environment");
            }
        }
        Ok(())
    }
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.is_empty())
}

fn is_placeholder(value: &str) -> bool {
    value.is_empty() || value.starts_with("your_")
}
