use tads_models::{Decision, FinalDecision, RiskPolicy, TradeAction};
use tracing::info;

/// Stateless risk adjudication over the trader's decision and a static
/// policy. Never drops the original rationale: the reviewed decision is
/// embedded whole in the FinalDecision either way. No model calls.
pub struct RiskManager {
    policy: RiskPolicy,
}

impl RiskManager {
    pub fn new(policy: RiskPolicy) -> Self {
        Self { policy }
    }

    pub fn review(&self, decision: Decision, degraded_reasons: Vec<String>) -> FinalDecision {
        let action = decision.action;

        if action != TradeAction::Hold && self.policy.blocked_actions.contains(&action) {
            info!(%action, "Risk policy blocks action, tempering to hold");
            return FinalDecision::overridden(
                decision,
                TradeAction::Hold,
                format!("{action} is blocked by risk policy"),
                degraded_reasons,
            );
        }

        if self.policy.hold_when_degraded
            && action != TradeAction::Hold
            && !degraded_reasons.is_empty()
        {
            info!(%action, "Degraded run tempered to hold per risk policy");
            return FinalDecision::overridden(
                decision,
                TradeAction::Hold,
                "degraded run tempered to hold".to_string(),
                degraded_reasons,
            );
        }

        FinalDecision::upheld(decision, degraded_reasons)
    }
}
