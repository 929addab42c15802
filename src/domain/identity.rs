use serde::{Deserialize, Serialize};

/// Who the events belong to. At least one of the two identifiers must be
/// set (and non-empty) by the time the events are submitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl Identity {
    pub fn client_id(&self) -> Option<&str> {
        self.client_id.as_deref().filter(|id| !id.is_empty())
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref().filter(|id| !id.is_empty())
    }

    pub fn is_identified(&self) -> bool {
        self.client_id().is_some() || self.user_id().is_some()
    }
}

/// Session-scoped fields stamped into every event of every batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionContext {
    pub session_id: Option<u64>,
    pub debug_mode: bool,
}

impl SessionContext {
    pub fn is_empty(&self) -> bool {
        self.session_id.is_none() && !self.debug_mode
    }
}
