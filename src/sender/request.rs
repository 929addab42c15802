use crate::buffer::EventStore;
use crate::domain::{Event, Identity, SessionContext, Timestamp, UserPropertyValue};
use serde::Serialize;
use std::collections::BTreeMap;

/// Request-wide fields that live next to the store rather than in it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestFields {
    pub timestamp: Option<Timestamp>,
    pub non_personalized_ads: Option<bool>,
    pub session: SessionContext,
}

/// Outer body of one collector request. Unset optional fields are left
/// out of the JSON entirely.
#[derive(Debug, Serialize)]
pub struct RequestEnvelope<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp_micros: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub non_personalized_ads: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_properties: Option<&'a BTreeMap<String, UserPropertyValue>>,
    pub events: &'a [Event],
}

/// Copies `events`, adding `session_id` and `debug_mode` to each copy's
/// params when they are set.
pub fn stamp_batch(events: &[Event], session: &SessionContext) -> Vec<Event> {
    events
        .iter()
        .map(|event| {
            let mut stamped = event.clone();
            if let Some(session_id) = session.session_id {
                stamped = stamped.with_param("session_id", session_id);
            }
            if session.debug_mode {
                stamped = stamped.with_param("debug_mode", 1);
            }
            stamped
        })
        .collect()
}

/// Turns stored state into per-batch request bodies.
#[derive(Debug, Clone, Copy)]
pub struct RequestBuilder<'a> {
    identity: &'a Identity,
    user_properties: &'a BTreeMap<String, UserPropertyValue>,
    fields: RequestFields,
}

impl<'a> RequestBuilder<'a> {
    pub fn new(store: &'a EventStore, fields: RequestFields) -> Self {
        Self {
            identity: store.identity(),
            user_properties: store.user_properties(),
            fields,
        }
    }

    pub fn stamp_batch(&self, events: &[Event]) -> Vec<Event> {
        if self.fields.session.is_empty() {
            return events.to_vec();
        }
        stamp_batch(events, &self.fields.session)
    }

    pub fn build_envelope<'b>(&self, events: &'b [Event]) -> RequestEnvelope<'b>
    where
        'a: 'b,
    {
        RequestEnvelope {
            client_id: self.identity.client_id(),
            user_id: self.identity.user_id(),
            timestamp_micros: self.fields.timestamp,
            non_personalized_ads: self.fields.non_personalized_ads,
            user_properties: Some(self.user_properties).filter(|props| !props.is_empty()),
            events,
        }
    }

    /// Encoded JSON body for a batch of already-stamped events.
    pub fn encode(&self, events: &[Event]) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.build_envelope(events))
    }
}
