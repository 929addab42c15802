pub mod aggregator;
pub mod client;
pub mod request;
pub mod response;
pub mod transmission;

pub use aggregator::{ErrorAggregator, SubmissionError, SubmissionProblem};
pub use client::{
    ClientConfig, ClientError, ConnectionStats, Credentials, HttpClient, Transport,
    TransportResponse,
};
pub use request::{RequestBuilder, RequestEnvelope, RequestFields, stamp_batch};
pub use response::{ResponseInterpretation, ValidationMessage, interpret_response};
pub use transmission::{
    BatchTransmitter, DEFAULT_COLLECT_ENDPOINT, DEFAULT_DEBUG_ENDPOINT, RequiredFieldPolicy,
    SenderConfig, SubmissionReport, SubmissionState,
};

use crate::buffer::EventStore;
use crate::domain::{Event, SessionContext, Timestamp, UserPropertyValue, ValidationError};
use serde_json::Value;
use std::collections::BTreeMap;

/// Caller-facing handle: accumulates events and request fields, then
/// submits them through a [`BatchTransmitter`].
///
/// Setters take `&mut self` and return `&mut Self` so they chain; the ones
/// that validate return a `Result` and leave state untouched on error.
#[derive(Debug)]
pub struct MeasurementSender<T = HttpClient> {
    transmitter: BatchTransmitter<T>,
    store: EventStore,
    fields: RequestFields,
    last_state: SubmissionState,
}

impl MeasurementSender<HttpClient> {
    /// Sender over a default `reqwest` client posting to the production
    /// collector.
    pub fn new(credentials: Credentials, debug_mode: bool) -> Result<Self, ClientError> {
        Self::with_config(
            credentials,
            debug_mode,
            SenderConfig::default(),
            ClientConfig::default(),
        )
    }

    pub fn with_config(
        credentials: Credentials,
        debug_mode: bool,
        sender_config: SenderConfig,
        client_config: ClientConfig,
    ) -> Result<Self, ClientError> {
        let client = HttpClient::new(client_config)?;
        Self::with_transport(client, credentials, sender_config, debug_mode)
    }
}

impl<T: Transport> MeasurementSender<T> {
    pub fn with_transport(
        transport: T,
        credentials: Credentials,
        config: SenderConfig,
        debug_mode: bool,
    ) -> Result<Self, ClientError> {
        let transmitter = BatchTransmitter::new(transport, credentials, config)?;
        Ok(Self {
            transmitter,
            store: EventStore::new(),
            fields: RequestFields {
                session: SessionContext {
                    session_id: None,
                    debug_mode,
                },
                ..RequestFields::default()
            },
            last_state: SubmissionState::Idle,
        })
    }

    pub fn set_client_id(&mut self, client_id: impl Into<String>) -> &mut Self {
        self.store.identity_mut().client_id = Some(client_id.into());
        self
    }

    pub fn client_id(&self) -> Option<&str> {
        self.store.identity().client_id()
    }

    pub fn set_user_id(&mut self, user_id: impl Into<String>) -> &mut Self {
        self.store.identity_mut().user_id = Some(user_id.into());
        self
    }

    pub fn user_id(&self) -> Option<&str> {
        self.store.identity().user_id()
    }

    pub fn set_session_id(&mut self, session_id: u64) -> &mut Self {
        self.fields.session.session_id = Some(session_id);
        self
    }

    pub fn clear_session_id(&mut self) -> &mut Self {
        self.fields.session.session_id = None;
        self
    }

    pub fn session_id(&self) -> Option<u64> {
        self.fields.session.session_id
    }

    pub fn set_debug_mode(&mut self, debug_mode: bool) -> &mut Self {
        self.fields.session.debug_mode = debug_mode;
        self
    }

    pub fn debug_mode(&self) -> bool {
        self.fields.session.debug_mode
    }

    pub fn set_timestamp(&mut self, timestamp: Timestamp) -> &mut Self {
        self.fields.timestamp = Some(timestamp);
        self
    }

    pub fn set_timestamp_micros(&mut self, micros: i64) -> Result<&mut Self, ValidationError> {
        let timestamp = Timestamp::from_micros(micros)?;
        Ok(self.set_timestamp(timestamp))
    }

    pub fn set_timestamp_secs(&mut self, secs: i64) -> Result<&mut Self, ValidationError> {
        let timestamp = Timestamp::from_secs(secs)?;
        Ok(self.set_timestamp(timestamp))
    }

    /// Accepts numeric text in seconds or microseconds; see [`Timestamp::parse`].
    pub fn set_timestamp_str(&mut self, input: &str) -> Result<&mut Self, ValidationError> {
        let timestamp = Timestamp::parse(input)?;
        Ok(self.set_timestamp(timestamp))
    }

    pub fn timestamp(&self) -> Option<Timestamp> {
        self.fields.timestamp
    }

    /// `true` records that personalization was disallowed for these events.
    pub fn set_non_personalized_ads(&mut self, non_personalized: bool) -> &mut Self {
        self.fields.non_personalized_ads = Some(non_personalized);
        self
    }

    pub fn non_personalized_ads(&self) -> Option<bool> {
        self.fields.non_personalized_ads
    }

    pub fn add_user_property(
        &mut self,
        name: impl Into<String>,
        value: impl Into<Value>,
    ) -> Result<usize, ValidationError> {
        self.store.add_user_property(name, value)
    }

    pub fn user_properties(&self) -> &BTreeMap<String, UserPropertyValue> {
        self.store.user_properties()
    }

    pub fn add_event(&mut self, event: Event) -> usize {
        self.store.add_event(event)
    }

    pub fn events(&self) -> &[Event] {
        self.store.events()
    }

    pub fn store(&self) -> &EventStore {
        &self.store
    }

    pub fn transport(&self) -> &T {
        self.transmitter.transport()
    }

    pub fn last_state(&self) -> SubmissionState {
        self.last_state
    }

    /// Submits all stored events. On success the events are cleared; on
    /// failure they stay put so the call can be repeated.
    pub async fn submit(&mut self) -> Result<SubmissionReport, SubmissionError> {
        let (state, result) = self.transmitter.submit(&mut self.store, self.fields).await;
        self.last_state = state;
        result
    }

    /// Runs the stored events past the debug endpoint without clearing them.
    pub async fn validate(&self) -> Result<Vec<ValidationMessage>, SubmissionError> {
        self.transmitter.validate(&self.store, self.fields).await
    }

    /// Current state as the JSON object a single request would carry,
    /// with every stored event stamped and no batching applied.
    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        let builder = RequestBuilder::new(&self.store, self.fields);
        let events = builder.stamp_batch(self.store.events());
        serde_json::to_value(builder.build_envelope(&events))
    }
}
