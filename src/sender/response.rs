use super::aggregator::SubmissionProblem;
use super::client::TransportResponse;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Status codes the collector uses to acknowledge a request.
pub const ACCEPTED_STATUS_CODES: [u16; 2] = [200, 204];

const NO_CONTENT: u16 = 204;

/// A server-reported issue with one submitted event or field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationMessage {
    pub validation_code: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_path: Option<String>,
}

impl fmt::Display for ValidationMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.field_path.as_deref().filter(|path| !path.is_empty()) {
            Some(path) => write!(
                f,
                "Validation Message: {}[{}]: {}",
                self.validation_code, path, self.description
            ),
            None => write!(
                f,
                "Validation Message: {}: {}",
                self.validation_code, self.description
            ),
        }
    }
}

impl ValidationMessage {
    /// Reads one `validationMessages` entry. Missing or non-string fields
    /// become empty strings so one malformed entry never hides the rest.
    fn from_entry(entry: &Value) -> Self {
        let text = |key: &str| {
            entry
                .get(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };

        Self {
            validation_code: text("validationCode"),
            description: text("description"),
            field_path: entry
                .get("fieldPath")
                .and_then(Value::as_str)
                .map(str::to_string),
        }
    }
}

/// `validationMessages` of a parsed body; absent, null or non-array
/// values mean there is nothing to report.
fn validation_messages(body: &Value) -> Vec<ValidationMessage> {
    body.get("validationMessages")
        .and_then(Value::as_array)
        .map(|entries| entries.iter().map(ValidationMessage::from_entry).collect())
        .unwrap_or_default()
}

/// What a single collector response told us.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ResponseInterpretation {
    pub problems: Vec<SubmissionProblem>,
    pub validation_messages: Vec<ValidationMessage>,
}

impl ResponseInterpretation {
    pub fn is_clean(&self) -> bool {
        self.problems.is_empty() && self.validation_messages.is_empty()
    }
}

/// Classifies a response by status, then by body.
///
/// A non-accepted status is recorded and the body is still inspected;
/// only 204 skips body handling.
pub fn interpret_response(response: &TransportResponse) -> ResponseInterpretation {
    let mut interpretation = ResponseInterpretation::default();

    if !ACCEPTED_STATUS_CODES.contains(&response.status) {
        interpretation.problems.push(SubmissionProblem::UnexpectedStatus {
            status: response.status,
        });
    }

    if response.status == NO_CONTENT {
        return interpretation;
    }

    if response.body.iter().all(u8::is_ascii_whitespace) {
        interpretation.problems.push(SubmissionProblem::EmptyBody);
        return interpretation;
    }

    match serde_json::from_slice::<Value>(&response.body) {
        Ok(parsed) => interpretation.validation_messages = validation_messages(&parsed),
        Err(_) => interpretation.problems.push(SubmissionProblem::UnparsableBody),
    }

    interpretation
}
