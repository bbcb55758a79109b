use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::brief::AnalystBrief;
use crate::debate::DebateTranscript;
use crate::decision::FinalDecision;
use crate::query::Query;

pub const TRACE_SCHEMA_VERSION: u32 = 1;

/// The full ordered audit record of one orchestration run: every brief,
/// every debate turn, and the reviewed decision. Persisted append-only so
/// reflection can revisit it once the realized return is known.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunTrace {
    pub run_id: Uuid,
    pub schema_version: u32,
    pub query: Query,
    pub briefs: Vec<AnalystBrief>,
    pub transcript: DebateTranscript,
    pub final_decision: FinalDecision,
    /// Model calls actually spent, for budget auditing.
    pub model_calls: u32,
    pub degraded_reasons: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::{Decision, TradeAction};
    use chrono::NaiveDate;

    #[test]
    fn roundtrip_run_trace() {
        let query = Query::new("AAPL", NaiveDate::from_ymd_opt(2025, 8, 18).unwrap());
        let run_id = Uuid::new_v4();
        let decision = Decision {
            id: Uuid::new_v4(),
            run_id,
            query: query.clone(),
            action: TradeAction::Hold,
            rationale: "No adversarial review performed; staying flat.".to_string(),
            decided_at: Utc::now(),
        };
        let trace = RunTrace {
            run_id,
            schema_version: TRACE_SCHEMA_VERSION,
            query,
            briefs: vec![],
            transcript: DebateTranscript::new(),
            final_decision: FinalDecision::upheld(decision, vec![]),
            model_calls: 5,
            degraded_reasons: vec![],
            started_at: Utc::now(),
            finished_at: Utc::now(),
        };

        let json = serde_json::to_string(&trace).unwrap();
        let parsed: RunTrace = serde_json::from_str(&json).unwrap();
        assert_eq!(trace, parsed);
        assert_eq!(parsed.final_decision.decision.run_id, parsed.run_id);
    }
}
