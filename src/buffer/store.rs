use crate::domain::{Event, Identity, MAX_USER_PROPERTIES, UserPropertyValue, ValidationError};
use serde_json::Value;
use std::collections::BTreeMap;

/// In-memory accumulation of everything a submission will send.
///
/// Events are append-only until a clean submission clears them. User
/// properties and identity outlive submissions.
#[derive(Debug, Clone, Default)]
pub struct EventStore {
    identity: Identity,
    events: Vec<Event>,
    user_properties: BTreeMap<String, UserPropertyValue>,
}

impl EventStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn identity_mut(&mut self) -> &mut Identity {
        &mut self.identity
    }

    /// Upserts a user property and returns the number stored afterwards.
    ///
    /// Replacing an existing name always succeeds; a new name is rejected
    /// once [`MAX_USER_PROPERTIES`] are stored.
    pub fn add_user_property(
        &mut self,
        name: impl Into<String>,
        value: impl Into<Value>,
    ) -> Result<usize, ValidationError> {
        let name = name.into();
        if self.user_properties.len() >= MAX_USER_PROPERTIES
            && !self.user_properties.contains_key(&name)
        {
            return Err(ValidationError::UserPropertyLimit {
                limit: MAX_USER_PROPERTIES,
            });
        }

        self.user_properties
            .insert(name, UserPropertyValue::new(value));
        Ok(self.user_properties.len())
    }

    pub fn user_properties(&self) -> &BTreeMap<String, UserPropertyValue> {
        &self.user_properties
    }

    pub fn user_property(&self, name: &str) -> Option<&Value> {
        self.user_properties.get(name).map(|property| &property.value)
    }

    /// Appends an event. The per-request cap is applied at planning time.
    pub fn add_event(&mut self, event: Event) -> usize {
        self.events.push(event);
        self.events.len()
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Names of required request fields that are not set.
    pub fn required_fields_missing(&self) -> Vec<&'static str> {
        if self.identity.is_identified() {
            Vec::new()
        } else {
            vec!["client_id"]
        }
    }

    /// Drops all stored events. Identity and user properties are kept.
    pub fn clear(&mut self) {
        self.events.clear();
    }
}
