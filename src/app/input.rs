use crate::domain::Event;
use std::path::Path;
use thiserror::Error;
use tokio::io::AsyncReadExt;

#[derive(Error, Debug)]
pub enum InputError {
    #[error("Failed to read events: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid event on line {line}: {source}")]
    InvalidEvent {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// Parses newline-delimited JSON events. Blank lines are skipped.
pub fn parse_events(content: &str) -> Result<Vec<Event>, InputError> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            serde_json::from_str(line).map_err(|source| InputError::InvalidEvent {
                line: index + 1,
                source,
            })
        })
        .collect()
}

/// Reads events from `path`, or from stdin when no path is given.
pub async fn read_events(path: Option<&Path>) -> Result<Vec<Event>, InputError> {
    let content = match path {
        Some(path) => tokio::fs::read_to_string(path).await?,
        None => {
            let mut content = String::new();
            tokio::io::stdin().read_to_string(&mut content).await?;
            content
        }
    };
    parse_events(&content)
}
