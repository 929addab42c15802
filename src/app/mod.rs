pub mod config;
pub mod input;
pub mod logging_system;

pub use config::{Config, ConfigError, LogFormat, LogLevel};
pub use input::{InputError, parse_events, read_events};
pub use logging_system::{LoggingError, setup_logging};

use crate::domain::ValidationError;
use crate::sender::{ClientError, HttpClient, MeasurementSender, SubmissionError};
use std::process;
use thiserror::Error;
use tracing::{error, info, warn};

/// Top-level error type for the command-line application.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Logging error: {0}")]
    Logging(#[from] LoggingError),
    #[error("Client error: {0}")]
    Client(#[from] ClientError),
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
    #[error("Input error: {0}")]
    Input(#[from] InputError),
    #[error(transparent)]
    Submission(#[from] SubmissionError),
}

pub struct App {
    config: Config,
    sender: MeasurementSender<HttpClient>,
}

impl App {
    /// Builds the sender and applies identity, session, timestamp and user
    /// properties from the configuration.
    pub fn from_config(config: Config) -> Result<Self, AppError> {
        let mut sender = MeasurementSender::with_config(
            config.credentials(),
            config.debug_mode,
            config.sender_config(),
            config.client_config(),
        )?;

        if let Some(client_id) = &config.client_id {
            sender.set_client_id(client_id.as_str());
        }
        if let Some(user_id) = &config.user_id {
            sender.set_user_id(user_id.as_str());
        }
        if let Some(session_id) = config.session_id {
            sender.set_session_id(session_id);
        }
        if config.non_personalized_ads {
            sender.set_non_personalized_ads(true);
        }
        if let Some(timestamp) = &config.timestamp {
            sender.set_timestamp_str(timestamp)?;
        }
        for (name, value) in config.parsed_user_properties()? {
            sender.add_user_property(name, value)?;
        }

        Ok(Self { config, sender })
    }

    pub fn sender(&self) -> &MeasurementSender<HttpClient> {
        &self.sender
    }

    pub async fn run(mut self) -> Result<(), AppError> {
        let events = read_events(self.config.input.as_deref()).await?;
        info!("Loaded {} events", events.len());
        for event in events {
            self.sender.add_event(event);
        }

        if self.config.validate_only {
            let messages = self.sender.validate().await?;
            if messages.is_empty() {
                info!("Collector reported no validation messages");
            }
            for message in &messages {
                warn!("{}", message);
            }
            return Ok(());
        }

        let report = self.sender.submit().await?;
        info!(
            "Delivered {} events in {}/{} batches",
            report.events_sent, report.batches_sent, report.batches_planned
        );
        Ok(())
    }
}

pub fn get_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

// Main entry point for the application
pub async fn main() -> anyhow::Result<()> {
    let config = Config::load(std::env::args())?;
    setup_logging(config.log_level, config.log_format)?;

    info!("Starting rask-measurement-forwarder v{}", get_version());
    info!(
        "Configuration: measurement_id={}, endpoint={}, batch_size={}, validate_only={}",
        config.measurement_id, config.endpoint, config.batch_size, config.validate_only
    );

    let app = App::from_config(config)?;
    if let Err(e) = app.run().await {
        error!("{}", e);
        process::exit(1);
    }

    Ok(())
}
