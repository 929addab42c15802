use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Maximum number of distinct user properties a request may carry.
pub const MAX_USER_PROPERTIES: usize = 25;

/// Value of a single user property, serialized as `{"value": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserPropertyValue {
    pub value: Value,
}

impl UserPropertyValue {
    pub fn new(value: impl Into<Value>) -> Self {
        Self {
            value: value.into(),
        }
    }
}
