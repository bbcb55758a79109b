use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::query::Query;

/// The graded trading signal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TradeAction {
    Buy,
    Sell,
    Hold,
}

impl TradeAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeAction::Buy => "buy",
            TradeAction::Sell => "sell",
            TradeAction::Hold => "hold",
        }
    }
}

impl std::fmt::Display for TradeAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The trader role's synthesis: exactly one per run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Decision {
    pub id: Uuid,
    /// The run that produced this decision; resolves briefs and transcript.
    pub run_id: Uuid,
    pub query: Query,
    pub action: TradeAction,
    pub rationale: String,
    pub decided_at: DateTime<Utc>,
}

/// The trader's decision after risk review. The original decision (and its
/// rationale) is always embedded whole, overridden or not.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FinalDecision {
    pub decision: Decision,
    /// The action after review. Equals `decision.action` unless overridden.
    pub action: TradeAction,
    pub override_flag: bool,
    pub override_reason: Option<String>,
    /// True when any role failure was absorbed while producing this run.
    pub degraded: bool,
    pub degraded_reasons: Vec<String>,
}

impl FinalDecision {
    /// Pass the decision through review unchanged.
    pub fn upheld(decision: Decision, degraded_reasons: Vec<String>) -> Self {
        Self {
            action: decision.action,
            decision,
            override_flag: false,
            override_reason: None,
            degraded: !degraded_reasons.is_empty(),
            degraded_reasons,
        }
    }

    /// Substitute a more conservative action, retaining the original.
    pub fn overridden(
        decision: Decision,
        action: TradeAction,
        reason: String,
        degraded_reasons: Vec<String>,
    ) -> Self {
        Self {
            action,
            decision,
            override_flag: true,
            override_reason: Some(reason),
            degraded: !degraded_reasons.is_empty(),
            degraded_reasons,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn decision(action: TradeAction) -> Decision {
        Decision {
            id: Uuid::new_v4(),
            run_id: Uuid::new_v4(),
            query: Query::new("AAPL", NaiveDate::from_ymd_opt(2025, 8, 18).unwrap()),
            action,
            rationale: "Momentum supports the position.".to_string(),
            decided_at: Utc::now(),
        }
    }

    #[test]
    fn action_serialization() {
        assert_eq!(serde_json::to_string(&TradeAction::Buy).unwrap(), "\"buy\"");
        assert_eq!(serde_json::to_string(&TradeAction::Hold).unwrap(), "\"hold\"");
    }

    #[test]
    fn upheld_keeps_action_and_rationale() {
        let d = decision(TradeAction::Buy);
        let rationale = d.rationale.clone();
        let fin = FinalDecision::upheld(d, vec![]);
        assert_eq!(fin.action, TradeAction::Buy);
        assert!(!fin.override_flag);
        assert!(!fin.degraded);
        assert_eq!(fin.decision.rationale, rationale);
    }

    #[test]
    fn overridden_retains_original_decision() {
        let d = decision(TradeAction::Buy);
        let fin = FinalDecision::overridden(
            d,
            TradeAction::Hold,
            "buy is blocked by policy".to_string(),
            vec!["news analyst unavailable".to_string()],
        );
        assert_eq!(fin.action, TradeAction::Hold);
        assert_eq!(fin.decision.action, TradeAction::Buy);
        assert!(fin.override_flag);
        assert!(fin.degraded);
        assert_eq!(fin.degraded_reasons.len(), 1);
    }

    #[test]
    fn roundtrip_final_decision() {
        let fin = FinalDecision::upheld(decision(TradeAction::Sell), vec![]);
        let json = serde_json::to_string(&fin).unwrap();
        let parsed: FinalDecision = serde_json::from_str(&json).unwrap();
        assert_eq!(fin, parsed);
    }
}
