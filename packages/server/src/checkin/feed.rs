use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;

/// An accepted check-in, pushed to teacher dashboards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, utoipa::ToSchema)]
pub struct CheckInEvent {
    pub session_id: String,
    pub record_id: String,
    pub student_id: String,
    pub classroom_id: String,
    pub checked_in_at: DateTime<Utc>,
}

/// Fan-out of accepted check-ins.
///
/// Publishing never blocks. A subscriber that falls more than `capacity`
/// events behind loses the oldest ones.
#[derive(Clone)]
pub struct CheckInFeed {
    tx: broadcast::Sender<CheckInEvent>,
}

impl CheckInFeed {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Returns the number of subscribers the event reached.
    pub fn publish(&self, event: CheckInEvent) -> usize {
        self.tx.send(event).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CheckInEvent> {
        self.tx.subscribe()
    }
}
