use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tads_models::{MemoryRecord, ModelTier, RunTrace};
use tracing::warn;
use uuid::Uuid;

use crate::client::{CallBudget, ModelClient};
use crate::prompts::{reflection_system_prompt, render_transcript};

/// Turns a completed run plus its realized return into one memory record.
/// Explicitly user-triggered; never invoked inside a run.
pub struct Reflector {
    client: Arc<ModelClient>,
    tier: ModelTier,
}

impl Reflector {
    pub fn new(client: Arc<ModelClient>) -> Self {
        Self {
            client,
            tier: ModelTier::Quick,
        }
    }

    /// Compose the lesson. Backend failure degrades to a deterministic
    /// lesson so the reflection always yields a usable record.
    pub async fn reflect(&self, trace: &RunTrace, realized_return: Decimal) -> MemoryRecord {
        let decision = &trace.final_decision.decision;

        let system = reflection_system_prompt();
        let user = format!(
            "Instrument: {} as of {}\nDecision taken: {}\nRationale at the time:\n{}\n\n\
             {}\nRealized return since: {realized_return}",
            trace.query.symbol,
            trace.query.as_of_date,
            trace.final_decision.action,
            decision.rationale,
            render_transcript(&trace.transcript),
        );

        // A reflection is one logical call plus headroom for a retry path.
        let budget = CallBudget::new(2);
        let lesson = match self.client.complete(self.tier, &system, &user, &budget).await {
            Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
            Ok(_) => fallback_lesson(trace, realized_return),
            Err(e) => {
                warn!(run_id = %trace.run_id, error = %e, "Reflection degraded to canned lesson");
                fallback_lesson(trace, realized_return)
            }
        };

        MemoryRecord {
            id: Uuid::new_v4(),
            run_id: trace.run_id,
            query: trace.query.clone(),
            action: decision.action,
            rationale: decision.rationale.clone(),
            realized_return,
            lesson,
            created_at: Utc::now(),
        }
    }
}

fn fallback_lesson(trace: &RunTrace, realized_return: Decimal) -> String {
    let decision = &trace.final_decision.decision;
    let verdict = if realized_return < Decimal::ZERO {
        "the realized return contradicted it"
    } else {
        "the realized return was consistent with it"
    };
    format!(
        "Decided to {} {} on {}; {verdict} ({realized_return}). Revisit the weight given \
         to each brief before repeating this call.",
        decision.action, trace.query.symbol, trace.query.as_of_date
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::RetryConfig;
    use crate::test_support::{ScriptedBackend, UnavailableBackend};
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use tads_models::trace::TRACE_SCHEMA_VERSION;
    use tads_models::{
        DebateTranscript, Decision, FinalDecision, Query, TradeAction,
    };

    fn make_trace() -> RunTrace {
        let run_id = Uuid::new_v4();
        let query = Query::new("AAPL", NaiveDate::from_ymd_opt(2025, 8, 18).unwrap());
        let decision = Decision {
            id: Uuid::new_v4(),
            run_id,
            query: query.clone(),
            action: TradeAction::Buy,
            rationale: "bull case carried".to_string(),
            decided_at: Utc::now(),
        };
        RunTrace {
            run_id,
            schema_version: TRACE_SCHEMA_VERSION,
            query,
            briefs: vec![],
            transcript: DebateTranscript::new(),
            final_decision: FinalDecision::upheld(decision, vec![]),
            model_calls: 7,
            degraded_reasons: vec![],
            started_at: Utc::now(),
            finished_at: Utc::now(),
        }
    }

    fn reflector(backend: Arc<dyn crate::backend::CompletionBackend>) -> Reflector {
        Reflector::new(Arc::new(ModelClient::new(
            backend.clone(),
            backend,
            RetryConfig::immediate(1),
        )))
    }

    #[tokio::test]
    async fn reflection_composes_record() {
        let reflector = reflector(Arc::new(ScriptedBackend::default()));
        let trace = make_trace();

        let record = reflector.reflect(&trace, dec!(-50)).await;
        assert_eq!(record.run_id, trace.run_id);
        assert_eq!(record.realized_return, dec!(-50));
        assert_eq!(record.action, TradeAction::Buy);
        assert!(!record.lesson.is_empty());
    }

    #[tokio::test]
    async fn reflection_degrades_to_fallback_lesson() {
        let reflector = reflector(Arc::new(UnavailableBackend));
        let trace = make_trace();

        let record = reflector.reflect(&trace, dec!(-50)).await;
        assert!(!record.lesson.is_empty());
        assert!(record.lesson.contains("contradicted"));
    }

    #[tokio::test]
    async fn two_reflections_are_distinct_records() {
        let reflector = reflector(Arc::new(ScriptedBackend::default()));
        let trace = make_trace();

        let a = reflector.reflect(&trace, dec!(-50)).await;
        let b = reflector.reflect(&trace, dec!(25)).await;
        assert_ne!(a.id, b.id);
        assert_eq!(a.run_id, b.run_id);
        assert_ne!(a.realized_return, b.realized_return);
    }
}
