#![warn(rust_2024_compatibility)]
// Specific pedantic lints enforced (not blanket allow):
#![deny(
    clippy::explicit_iter_loop,
    clippy::manual_let_else,
    clippy::semicolon_if_nothing_returned,
    clippy::inconsistent_struct_constructor
)]
// Noisy pedantic lints suppressed with justification:
#![allow(
    clippy::cast_possible_truncation, // Byte counts and timestamps stay well inside their types
    clippy::cast_precision_loss,      // Fractional-second timestamps only
    clippy::missing_errors_doc,       // Internal API
    clippy::module_name_repetitions,  // e.g. SubmissionError in sender module
    clippy::must_use_candidate,       // Annotated selectively on critical APIs
    clippy::doc_markdown              // Internal API
)]

pub mod app;
pub mod buffer;
pub mod domain;
pub mod sender;

// Re-export main types for easy access
pub use app::Config;
pub use domain::{Event, Identity, SessionContext, Timestamp, UserPropertyValue, ValidationError};
pub use sender::{
    ClientConfig, Credentials, HttpClient, MeasurementSender, RequiredFieldPolicy,
    SubmissionError, SubmissionProblem, SubmissionReport,
};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
