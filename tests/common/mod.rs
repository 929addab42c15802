#![allow(dead_code)]

use bytes::Bytes;
use rask_measurement_forwarder::domain::Event;
use rask_measurement_forwarder::sender::{
    ClientError, Credentials, MeasurementSender, SenderConfig, Transport, TransportResponse,
};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use url::Url;

/// Transport double that records every request and replays queued
/// responses, answering 204 once the queue is empty.
#[derive(Default)]
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<Result<TransportResponse, ClientError>>>,
    requests: Mutex<Vec<(Url, Value)>>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn respond(&self, status: u16, body: &str) {
        self.responses.lock().unwrap().push_back(Ok(TransportResponse {
            status,
            body: Bytes::from(body.to_string()),
        }));
    }

    pub fn fail(&self, reason: &str) {
        self.responses
            .lock()
            .unwrap()
            .push_back(Err(ClientError::RequestTimeout(reason.to_string())));
    }

    pub fn requests(&self) -> Vec<(Url, Value)> {
        self.requests.lock().unwrap().clone()
    }

    pub fn bodies(&self) -> Vec<Value> {
        self.requests().into_iter().map(|(_, body)| body).collect()
    }

    pub fn batch_sizes(&self) -> Vec<usize> {
        self.bodies()
            .iter()
            .map(|body| body["events"].as_array().map_or(0, Vec::len))
            .collect()
    }
}

impl Transport for ScriptedTransport {
    async fn post_json(&self, url: Url, body: String) -> Result<TransportResponse, ClientError> {
        let parsed: Value = serde_json::from_str(&body).expect("request body is JSON");
        self.requests.lock().unwrap().push((url, parsed));

        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Ok(TransportResponse {
                    status: 204,
                    body: Bytes::new(),
                })
            })
    }
}

pub fn credentials() -> Credentials {
    Credentials::new("G-TEST123", "test-secret")
}

pub fn scripted_sender(
    debug_mode: bool,
) -> (MeasurementSender<Arc<ScriptedTransport>>, Arc<ScriptedTransport>) {
    scripted_sender_with(SenderConfig::default(), debug_mode)
}

pub fn scripted_sender_with(
    config: SenderConfig,
    debug_mode: bool,
) -> (MeasurementSender<Arc<ScriptedTransport>>, Arc<ScriptedTransport>) {
    let transport = ScriptedTransport::new();
    let sender =
        MeasurementSender::with_transport(Arc::clone(&transport), credentials(), config, debug_mode)
            .expect("default endpoints are valid");
    (sender, transport)
}

pub fn numbered_events(n: usize) -> Vec<Event> {
    (0..n)
        .map(|i| Event::new("page_view").with_param("index", i))
        .collect()
}
