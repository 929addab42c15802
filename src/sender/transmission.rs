use super::aggregator::{ErrorAggregator, SubmissionError, SubmissionProblem};
use super::client::{ClientError, Credentials, Transport};
use super::request::{RequestBuilder, RequestFields};
use super::response::{ValidationMessage, interpret_response};
use crate::buffer::{Batch, BatchConfig, BatchPlanner, EventStore};
use crate::domain::Event;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};
use url::Url;

pub const DEFAULT_COLLECT_ENDPOINT: &str = "https://www.google-analytics.com/mp/collect";
pub const DEFAULT_DEBUG_ENDPOINT: &str = "https://www.google-analytics.com/debug/mp/collect";

/// What to do when neither `client_id` nor `user_id` is set at submit time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum RequiredFieldPolicy {
    /// Record the missing fields as a problem and dispatch nothing.
    #[default]
    Enforce,
    /// Log the missing fields and dispatch anyway.
    Lenient,
}

/// Phases of one submission, in the order they are entered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SubmissionState {
    #[default]
    Idle,
    Building,
    Dispatching,
    Interpreting,
    Finalizing,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone)]
pub struct SenderConfig {
    pub endpoint: String,
    pub debug_endpoint: String,
    pub batch: BatchConfig,
    pub required_fields: RequiredFieldPolicy,
}

impl Default for SenderConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_COLLECT_ENDPOINT.to_string(),
            debug_endpoint: DEFAULT_DEBUG_ENDPOINT.to_string(),
            batch: BatchConfig::default(),
            required_fields: RequiredFieldPolicy::Enforce,
        }
    }
}

/// Totals for the batches that reached the collector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubmissionReport {
    pub batches_planned: usize,
    pub batches_sent: usize,
    pub events_sent: usize,
    pub bytes_sent: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Collect,
    Validate,
}

/// The submission engine: plans batches, sends them one at a time, and
/// aggregates every problem into a single result.
#[derive(Debug, Clone)]
pub struct BatchTransmitter<T> {
    transport: T,
    credentials: Credentials,
    collect_url: Url,
    debug_url: Url,
    planner: BatchPlanner,
    required_fields: RequiredFieldPolicy,
}

impl<T: Transport> BatchTransmitter<T> {
    pub fn new(
        transport: T,
        credentials: Credentials,
        config: SenderConfig,
    ) -> Result<Self, ClientError> {
        let collect_url = parse_endpoint(&config.endpoint)?;
        let debug_url = parse_endpoint(&config.debug_endpoint)?;

        Ok(Self {
            transport,
            credentials,
            collect_url,
            debug_url,
            planner: BatchPlanner::new(config.batch),
            required_fields: config.required_fields,
        })
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn planner(&self) -> &BatchPlanner {
        &self.planner
    }

    /// Sends every stored event to the collector.
    ///
    /// Every batch is attempted even after earlier ones failed. The store
    /// is cleared only when no problem at all was recorded.
    pub async fn submit(
        &self,
        store: &mut EventStore,
        fields: RequestFields,
    ) -> (SubmissionState, Result<SubmissionReport, SubmissionError>) {
        let mut state = SubmissionState::Idle;
        enter(&mut state, SubmissionState::Building);

        let mut aggregator = ErrorAggregator::new();
        let mut report = SubmissionReport::default();

        let missing = store.required_fields_missing();
        let blocked = !missing.is_empty() && self.required_fields == RequiredFieldPolicy::Enforce;
        if !missing.is_empty() {
            match self.required_fields {
                RequiredFieldPolicy::Enforce => {
                    aggregator.record(SubmissionProblem::MissingRequiredFields { fields: missing });
                }
                RequiredFieldPolicy::Lenient => {
                    warn!(
                        "Required fields missing ({}), dispatching anyway",
                        missing.join(", ")
                    );
                }
            }
        }

        if !blocked {
            let builder = RequestBuilder::new(store, fields);
            self.dispatch_all(
                &builder,
                store.events(),
                Mode::Collect,
                &mut state,
                &mut aggregator,
                &mut report,
            )
            .await;
        }

        enter(&mut state, SubmissionState::Finalizing);
        let result = aggregator.finish(report);
        match &result {
            Ok(report) => {
                store.clear();
                enter(&mut state, SubmissionState::Succeeded);
                info!(
                    "Submitted {} events in {} batches ({} bytes)",
                    report.events_sent, report.batches_sent, report.bytes_sent
                );
            }
            Err(error) => {
                enter(&mut state, SubmissionState::Failed);
                warn!(
                    "Submission finished with {} problem(s); keeping {} stored events",
                    error.problems.len(),
                    store.event_count()
                );
            }
        }

        (state, result)
    }

    /// Sends the stored events to the debug endpoint and returns what the
    /// collector reported about them. Nothing is cleared.
    pub async fn validate(
        &self,
        store: &EventStore,
        fields: RequestFields,
    ) -> Result<Vec<ValidationMessage>, SubmissionError> {
        let mut state = SubmissionState::Idle;
        enter(&mut state, SubmissionState::Building);

        let mut aggregator = ErrorAggregator::new();
        let mut report = SubmissionReport::default();
        let builder = RequestBuilder::new(store, fields);

        let messages = self
            .dispatch_all(
                &builder,
                store.events(),
                Mode::Validate,
                &mut state,
                &mut aggregator,
                &mut report,
            )
            .await;

        enter(&mut state, SubmissionState::Finalizing);
        aggregator.finish(report).map(|_| messages)
    }

    async fn dispatch_all(
        &self,
        builder: &RequestBuilder<'_>,
        events: &[Event],
        mode: Mode,
        state: &mut SubmissionState,
        aggregator: &mut ErrorAggregator,
        report: &mut SubmissionReport,
    ) -> Vec<ValidationMessage> {
        let base = match mode {
            Mode::Collect => &self.collect_url,
            Mode::Validate => &self.debug_url,
        };
        let url = self.credentials.authorize(base);
        let mut collected = Vec::new();

        report.batches_planned = self.planner.batch_count(events.len());

        for (index, chunk) in self.planner.partition(events).enumerate() {
            let batch = Batch::new(index, builder.stamp_batch(chunk));

            let body = match builder.encode(batch.events()) {
                Ok(body) => body,
                Err(e) => {
                    aggregator.record(SubmissionProblem::Serialization {
                        batch_index: index,
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            if !self.planner.check_size(&body) {
                aggregator.record(SubmissionProblem::BodyTooLarge {
                    batch_index: index,
                    bytes: body.len(),
                    limit: self.planner.config().max_body_bytes,
                });
                continue;
            }

            enter(state, SubmissionState::Dispatching);
            let bytes = body.len();
            debug!(
                "Sending batch {} ({}/{}) with {} events, {} bytes",
                batch.id(),
                index + 1,
                report.batches_planned,
                batch.size(),
                bytes
            );

            let response = match self.transport.post_json(url.clone(), body).await {
                Ok(response) => response,
                Err(e) => {
                    aggregator.record(SubmissionProblem::RequestFailed {
                        batch_index: index,
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            report.batches_sent += 1;
            report.events_sent += batch.size();
            report.bytes_sent += bytes;

            enter(state, SubmissionState::Interpreting);
            let interpretation = interpret_response(&response);
            aggregator.extend(interpretation.problems);
            match mode {
                Mode::Collect => aggregator.extend(
                    interpretation
                        .validation_messages
                        .into_iter()
                        .map(SubmissionProblem::ServerValidation),
                ),
                Mode::Validate => collected.extend(interpretation.validation_messages),
            }
        }

        collected
    }
}

fn enter(state: &mut SubmissionState, next: SubmissionState) {
    trace!("Submission state {:?} -> {:?}", state, next);
    *state = next;
}

fn parse_endpoint(endpoint: &str) -> Result<Url, ClientError> {
    Url::parse(endpoint).map_err(|e| {
        ClientError::InvalidConfiguration(format!("Invalid endpoint URL '{endpoint}': {e}"))
    })
}
