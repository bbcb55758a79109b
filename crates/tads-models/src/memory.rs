use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decision::TradeAction;
use crate::query::Query;

/// One lesson linking a past decision to its realized market outcome.
///
/// Append-only: records are never mutated or deleted in normal operation.
/// Written solely by the reflection step, read by every reasoning role.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MemoryRecord {
    pub id: Uuid,
    /// The run whose decision this lesson is about.
    pub run_id: Uuid,
    pub query: Query,
    /// Snapshot of what was decided, so the lesson stands on its own.
    pub action: TradeAction,
    pub rationale: String,
    pub realized_return: Decimal,
    pub lesson: String,
    pub created_at: DateTime<Utc>,
}
