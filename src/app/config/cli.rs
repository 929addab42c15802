use super::serde_helpers::{
    load_env_path_opt, load_env_string, load_env_string_opt, load_env_var, load_env_var_opt,
};
use super::{ConfigError, LogFormat, LogLevel};
use crate::buffer::{BatchConfig, DEFAULT_MAX_BODY_BYTES, DEFAULT_MAX_EVENTS_PER_BATCH};
use crate::sender::{
    ClientConfig, Credentials, DEFAULT_COLLECT_ENDPOINT, DEFAULT_DEBUG_ENDPOINT,
    RequiredFieldPolicy, SenderConfig,
};
use clap::Parser;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Parser, Debug, Clone, Serialize, Deserialize)]
#[command(author, version, about, long_about = None)]
#[serde(default)]
pub struct Config {
    /// Measurement id of the destination property
    #[arg(long, env = "MEASUREMENT_ID", default_value = "")]
    pub measurement_id: String,

    /// API secret authorizing ingestion
    #[arg(long, env = "API_SECRET", default_value = "", hide_env_values = true)]
    pub api_secret: String,

    /// Collector endpoint URL
    #[arg(long, env = "MEASUREMENT_ENDPOINT", default_value = DEFAULT_COLLECT_ENDPOINT)]
    pub endpoint: String,

    /// Validation (debug) endpoint URL
    #[arg(long, env = "MEASUREMENT_DEBUG_ENDPOINT", default_value = DEFAULT_DEBUG_ENDPOINT)]
    pub debug_endpoint: String,

    /// Client id the events belong to
    #[arg(long, env = "CLIENT_ID")]
    pub client_id: Option<String>,

    /// User id the events belong to
    #[arg(long, env = "USER_ID")]
    pub user_id: Option<String>,

    /// Session id stamped into every event
    #[arg(long, env = "SESSION_ID")]
    pub session_id: Option<u64>,

    /// Stamp debug_mode=1 into every event
    #[arg(long, env = "DEBUG_MODE")]
    pub debug_mode: bool,

    /// Mark the events as not eligible for personalized ads
    #[arg(long, env = "NON_PERSONALIZED_ADS")]
    pub non_personalized_ads: bool,

    /// Request timestamp, unix seconds or microseconds
    #[arg(long, env = "EVENT_TIMESTAMP")]
    pub timestamp: Option<String>,

    /// User property as NAME=VALUE (VALUE may be JSON); repeatable
    #[arg(long = "user-property", value_name = "NAME=VALUE")]
    pub user_properties: Vec<String>,

    /// NDJSON file of events to send (stdin when omitted)
    #[arg(long, env = "EVENTS_FILE")]
    pub input: Option<PathBuf>,

    /// Send to the validation endpoint and print its findings instead of submitting
    #[arg(long, env = "VALIDATE_ONLY")]
    pub validate_only: bool,

    /// Behaviour when neither client id nor user id is set
    #[arg(long, env = "REQUIRED_FIELDS", default_value = "enforce")]
    pub required_fields: RequiredFieldPolicy,

    /// Events per request
    #[arg(long, env = "BATCH_SIZE", default_value = "25")]
    pub batch_size: usize,

    /// Request body ceiling in kB
    #[arg(long, env = "MAX_BODY_KB", default_value = "130")]
    pub max_body_kb: usize,

    /// Request timeout in seconds
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value = "30")]
    pub request_timeout_secs: u64,

    /// Connection timeout in seconds
    #[arg(long, env = "CONNECTION_TIMEOUT_SECS", default_value = "10")]
    pub connection_timeout_secs: u64,

    /// Log level
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: LogLevel,

    /// Log output format
    #[arg(long, env = "LOG_FORMAT", default_value = "compact")]
    pub log_format: LogFormat,

    /// Configuration file path (optional)
    #[arg(long, env = "CONFIG_FILE")]
    pub config_file: Option<PathBuf>,

    /// Derived fields (not CLI arguments)
    #[serde(skip)]
    #[arg(skip)]
    pub request_timeout: Duration,

    #[serde(skip)]
    #[arg(skip)]
    pub connection_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            measurement_id: String::new(),
            api_secret: String::new(),
            endpoint: DEFAULT_COLLECT_ENDPOINT.to_string(),
            debug_endpoint: DEFAULT_DEBUG_ENDPOINT.to_string(),
            client_id: None,
            user_id: None,
            session_id: None,
            debug_mode: false,
            non_personalized_ads: false,
            timestamp: None,
            user_properties: Vec::new(),
            input: None,
            validate_only: false,
            required_fields: RequiredFieldPolicy::Enforce,
            batch_size: DEFAULT_MAX_EVENTS_PER_BATCH,
            max_body_kb: DEFAULT_MAX_BODY_BYTES / 1024,
            request_timeout_secs: 30,
            connection_timeout_secs: 10,
            log_level: LogLevel::Info,
            log_format: LogFormat::Compact,
            config_file: None,
            request_timeout: Duration::from_secs(30),
            connection_timeout: Duration::from_secs(10),
        }
    }
}

impl Config {
    pub fn from_args<I, T>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let mut config = Config::parse_from(args);
        config.post_process()?;
        config.validate()?;
        Ok(config)
    }

    /// CLI arguments, unless they name a config file, in which case the
    /// file wins.
    pub fn load<I, T>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let mut config = Config::parse_from(args);
        if let Some(config_file) = config.config_file.clone() {
            return Self::from_file(config_file);
        }
        config.post_process()?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Config::default();

        load_env_string("MEASUREMENT_ID", &mut config.measurement_id);
        load_env_string("API_SECRET", &mut config.api_secret);
        load_env_string("MEASUREMENT_ENDPOINT", &mut config.endpoint);
        load_env_string("MEASUREMENT_DEBUG_ENDPOINT", &mut config.debug_endpoint);
        load_env_string_opt("CLIENT_ID", &mut config.client_id);
        load_env_string_opt("USER_ID", &mut config.user_id);
        load_env_var_opt("SESSION_ID", &mut config.session_id)?;
        load_env_var("DEBUG_MODE", &mut config.debug_mode)?;
        load_env_var("NON_PERSONALIZED_ADS", &mut config.non_personalized_ads)?;
        load_env_string_opt("EVENT_TIMESTAMP", &mut config.timestamp);
        load_env_path_opt("EVENTS_FILE", &mut config.input);
        load_env_var("VALIDATE_ONLY", &mut config.validate_only)?;
        load_env_var("BATCH_SIZE", &mut config.batch_size)?;
        load_env_var("MAX_BODY_KB", &mut config.max_body_kb)?;
        load_env_var("REQUEST_TIMEOUT_SECS", &mut config.request_timeout_secs)?;
        load_env_var("CONNECTION_TIMEOUT_SECS", &mut config.connection_timeout_secs)?;
        load_env_var("LOG_LEVEL", &mut config.log_level)?;
        load_env_path_opt("CONFIG_FILE", &mut config.config_file);

        if let Ok(policy) = std::env::var("REQUIRED_FIELDS") {
            config.required_fields = match policy.to_lowercase().as_str() {
                "enforce" => RequiredFieldPolicy::Enforce,
                "lenient" => RequiredFieldPolicy::Lenient,
                _ => {
                    return Err(ConfigError::EnvError(format!(
                        "Invalid REQUIRED_FIELDS: {policy}. Valid values: enforce, lenient"
                    )));
                }
            };
        }

        if let Ok(format) = std::env::var("LOG_FORMAT") {
            config.log_format = match format.to_lowercase().as_str() {
                "compact" => LogFormat::Compact,
                "json" => LogFormat::Json,
                _ => {
                    return Err(ConfigError::EnvError(format!(
                        "Invalid LOG_FORMAT: {format}. Valid values: compact, json"
                    )));
                }
            };
        }

        config.post_process()?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let mut config: Config = toml::from_str(content)?;
        config.post_process()?;
        config.validate()?;
        Ok(config)
    }

    pub fn post_process(&mut self) -> Result<(), ConfigError> {
        self.request_timeout = Duration::from_secs(self.request_timeout_secs);
        self.connection_timeout = Duration::from_secs(self.connection_timeout_secs);
        Ok(())
    }

    pub fn credentials(&self) -> Credentials {
        Credentials::new(&self.measurement_id, &self.api_secret)
    }

    pub fn sender_config(&self) -> SenderConfig {
        SenderConfig {
            endpoint: self.endpoint.clone(),
            debug_endpoint: self.debug_endpoint.clone(),
            batch: BatchConfig {
                max_events: self.batch_size,
                max_body_bytes: self.max_body_kb.saturating_mul(1024),
            },
            required_fields: self.required_fields,
        }
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            timeout: self.request_timeout,
            connection_timeout: self.connection_timeout,
            ..ClientConfig::default()
        }
    }

    /// `NAME=VALUE` pairs; values that parse as JSON keep their type,
    /// anything else is sent as a string.
    pub fn parsed_user_properties(&self) -> Result<Vec<(String, Value)>, ConfigError> {
        self.user_properties
            .iter()
            .map(|entry| {
                let (name, raw) = entry.split_once('=').ok_or_else(|| {
                    ConfigError::InvalidConfig(format!(
                        "User property '{entry}' must be NAME=VALUE"
                    ))
                })?;
                let name = name.trim();
                if name.is_empty() {
                    return Err(ConfigError::InvalidConfig(format!(
                        "User property '{entry}' has an empty name"
                    )));
                }
                let value = serde_json::from_str(raw)
                    .unwrap_or_else(|_| Value::String(raw.to_string()));
                Ok((name.to_string(), value))
            })
            .collect()
    }
}
