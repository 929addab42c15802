use crate::domain::Event;
use std::slice::Chunks;
use uuid::Uuid;

/// Maximum number of events the collector accepts per request.
pub const DEFAULT_MAX_EVENTS_PER_BATCH: usize = 25;

/// Maximum encoded request body the collector accepts (130kB).
pub const DEFAULT_MAX_BODY_BYTES: usize = 130 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchConfig {
    pub max_events: usize,
    pub max_body_bytes: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_events: DEFAULT_MAX_EVENTS_PER_BATCH,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

/// One outbound request's worth of events, already stamped with the
/// request-wide fields.
#[derive(Debug, Clone)]
pub struct Batch {
    id: String,
    index: usize,
    events: Vec<Event>,
}

impl Batch {
    pub fn new(index: usize, events: Vec<Event>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            index,
            events,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Position of this batch within its submission, starting at zero.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn size(&self) -> usize {
        self.events.len()
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// Splits stored events into request-sized chunks and enforces the body
/// size ceiling.
#[derive(Debug, Clone, Copy, Default)]
pub struct BatchPlanner {
    config: BatchConfig,
}

impl BatchPlanner {
    pub fn new(config: BatchConfig) -> Self {
        Self {
            config: BatchConfig {
                max_events: config.max_events.max(1),
                ..config
            },
        }
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Contiguous, order-preserving chunks of at most `max_events` events.
    /// Borrowing the slice keeps this lazy and restartable.
    pub fn partition<'a>(&self, events: &'a [Event]) -> Chunks<'a, Event> {
        events.chunks(self.config.max_events)
    }

    pub fn batch_count(&self, event_count: usize) -> usize {
        event_count.div_ceil(self.config.max_events)
    }

    /// True when the encoded body fits under the size ceiling.
    pub fn check_size(&self, body: &str) -> bool {
        body.len() <= self.config.max_body_bytes
    }
}
