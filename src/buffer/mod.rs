pub mod batch;
pub mod store;

pub use batch::{
    Batch, BatchConfig, BatchPlanner, DEFAULT_MAX_BODY_BYTES, DEFAULT_MAX_EVENTS_PER_BATCH,
};
pub use store::EventStore;
