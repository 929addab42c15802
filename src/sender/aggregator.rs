use super::response::ValidationMessage;
use super::transmission::SubmissionReport;
use thiserror::Error;
use tracing::warn;

/// A single issue recorded while submitting. Submission keeps going after
/// each one; they surface together once every batch was attempted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubmissionProblem {
    #[error("Missing required fields: {}", .fields.join(", "))]
    MissingRequiredFields { fields: Vec<&'static str> },

    #[error("Request body exceeds {}kB", .limit / 1024)]
    BodyTooLarge {
        batch_index: usize,
        bytes: usize,
        limit: usize,
    },

    #[error("Could not serialize request: {reason}")]
    Serialization { batch_index: usize, reason: String },

    #[error("Request failed: {reason}")]
    RequestFailed { batch_index: usize, reason: String },

    #[error("Request received code {status}")]
    UnexpectedStatus { status: u16 },

    #[error("Received not body")]
    EmptyBody,

    #[error("Could not parse response")]
    UnparsableBody,

    #[error("{0}")]
    ServerValidation(ValidationMessage),
}

/// All problems recorded during one `submit` call, in the order they
/// occurred, plus what was dispatched before the attempt finished.
#[derive(Error, Debug, Clone)]
#[error("Submission failed with {} problem(s): {}", .problems.len(), join_problems(.problems))]
pub struct SubmissionError {
    pub problems: Vec<SubmissionProblem>,
    pub report: SubmissionReport,
}

impl SubmissionError {
    pub fn messages(&self) -> Vec<String> {
        self.problems.iter().map(ToString::to_string).collect()
    }

    pub fn contains(&self, message: &str) -> bool {
        self.problems
            .iter()
            .any(|problem| problem.to_string() == message)
    }
}

fn join_problems(problems: &[SubmissionProblem]) -> String {
    problems
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Collects problems across batches; converts to an error only at the end.
#[derive(Debug, Default)]
pub struct ErrorAggregator {
    problems: Vec<SubmissionProblem>,
}

impl ErrorAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, problem: SubmissionProblem) {
        warn!("Submission problem: {}", problem);
        self.problems.push(problem);
    }

    pub fn extend(&mut self, problems: impl IntoIterator<Item = SubmissionProblem>) {
        for problem in problems {
            self.record(problem);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.problems.is_empty()
    }

    pub fn len(&self) -> usize {
        self.problems.len()
    }

    /// `Ok(report)` when nothing was recorded, otherwise one combined error.
    pub fn finish(self, report: SubmissionReport) -> Result<SubmissionReport, SubmissionError> {
        if self.problems.is_empty() {
            Ok(report)
        } else {
            Err(SubmissionError {
                problems: self.problems,
                report,
            })
        }
    }
}
