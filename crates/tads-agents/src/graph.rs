use std::sync::Arc;
use std::time::Instant;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use tads_memory::MemoryStore;
use tads_models::trace::TRACE_SCHEMA_VERSION;
use tads_models::{
    AnalystBrief, Decision, EngineConfig, FinalDecision, MemoryRecord, ModelTier, Query, RunTrace,
    TradeAction,
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::analyst::{Analyst, AnalystContext};
use crate::client::{CallBudget, ModelClient};
use crate::debate::{turn_char_budget, ResearcherDebate};
use crate::error::{BackendError, EngineError};
use crate::prompts::{debate_user_prompt, researcher_system_prompt};
use crate::reflection::Reflector;
use crate::risk::RiskManager;
use crate::trader::Trader;

/// The orchestration graph: sequences analysts, the researcher debate,
/// the trader and risk review for one query, and owns the feedback loop
/// into the memory store.
pub struct TradingGraph {
    client: Arc<ModelClient>,
    analysts: Vec<Arc<dyn Analyst>>,
    trader: Trader,
    risk: RiskManager,
    reflector: Reflector,
    store: Arc<MemoryStore>,
    config: EngineConfig,
    recall_limit: usize,
    cancel: CancellationToken,
}

impl TradingGraph {
    pub fn new(
        client: Arc<ModelClient>,
        analysts: Vec<Arc<dyn Analyst>>,
        store: Arc<MemoryStore>,
        config: EngineConfig,
        recall_limit: usize,
    ) -> Self {
        let trader = Trader::new(Arc::clone(&client));
        let risk = RiskManager::new(config.risk.clone());
        let reflector = Reflector::new(Arc::clone(&client));
        Self {
            client,
            analysts,
            trader,
            risk,
            reflector,
            store,
            config,
            recall_limit,
            cancel: CancellationToken::new(),
        }
    }

    /// Token for cancelling in-flight runs at their next suspension point.
    /// Cancellation cannot corrupt the memory store: the only write inside
    /// a run is the final trace append.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Hard ceiling on model calls per run: one primary call per analyst,
    /// per debate turn and for the trader, each with one re-prompt slot.
    pub fn call_limit(&self) -> u32 {
        2 * (self.analysts.len() as u32 + 2 * self.config.max_debate_rounds + 1)
    }

    fn ensure_active(&self) -> Result<(), EngineError> {
        if self.cancel.is_cancelled() {
            return Err(EngineError::Cancelled);
        }
        Ok(())
    }

    /// Primary entry operation: parse and validate the raw inputs, then run.
    pub async fn propagate(
        &self,
        symbol: &str,
        as_of_date: &str,
    ) -> Result<(RunTrace, FinalDecision), EngineError> {
        let symbol = symbol.trim();
        if symbol.is_empty() {
            return Err(EngineError::InvalidQuery(
                "symbol must not be empty".to_string(),
            ));
        }
        let date = NaiveDate::parse_from_str(as_of_date, "%Y-%m-%d")
            .map_err(|e| EngineError::InvalidQuery(format!("as_of_date {as_of_date:?}: {e}")))?;

        self.run(Query::new(symbol, date)).await
    }

    /// One full orchestration run. Non-strict runs always reach a
    /// FinalDecision, absorbing role failures as degraded reasons; strict
    /// runs surface the first role failure.
    pub async fn run(&self, query: Query) -> Result<(RunTrace, FinalDecision), EngineError> {
        let started_at = Utc::now();
        let start = Instant::now();
        let run_id = Uuid::new_v4();
        let budget = Arc::new(CallBudget::new(self.call_limit()));
        let mut degraded: Vec<String> = Vec::new();

        info!(%run_id, query = %query, call_limit = budget.limit(), "Starting run");
        self.ensure_active()?;

        // 1. Recall lessons once; every role reads the same snapshot.
        let lessons = match self.store.recall(&query.symbol, self.recall_limit).await {
            Ok(lessons) => lessons,
            Err(e) if self.config.strict => return Err(e.into()),
            Err(e) => {
                warn!(error = %e, "Lesson recall failed, continuing without memory");
                degraded.push(format!("lesson recall failed: {e}"));
                Vec::new()
            }
        };
        let lessons = Arc::new(lessons);

        // 2. Fan out analysts; they share no mutable state.
        let mut handles = Vec::new();
        for analyst in &self.analysts {
            let analyst = Arc::clone(analyst);
            let ctx = AnalystContext {
                query: query.clone(),
                lessons: Arc::clone(&lessons),
                budget: Arc::clone(&budget),
            };
            handles.push(tokio::spawn(async move {
                let agent_start = Instant::now();
                let kind = analyst.kind();
                let result = analyst.analyze(ctx).await;
                (kind, result, agent_start.elapsed())
            }));
        }

        let mut briefs: Vec<AnalystBrief> = Vec::new();
        for handle in handles {
            match handle.await {
                Ok((kind, Ok(brief), elapsed)) => {
                    info!(analyst = %kind, elapsed_ms = elapsed.as_millis() as u64, "Brief ready");
                    briefs.push(brief);
                }
                Ok((kind, Err(e), elapsed)) => {
                    if self.config.strict {
                        return Err(EngineError::Role {
                            role: format!("{kind} analyst"),
                            query: query.to_string(),
                            source: e,
                        });
                    }
                    warn!(analyst = %kind, error = %e, elapsed_ms = elapsed.as_millis() as u64, "Analyst degraded");
                    degraded.push(format!("{kind} analyst failed: {e}"));
                    briefs.push(AnalystBrief::unavailable(kind, query.clone(), &e.to_string()));
                }
                Err(e) => {
                    if self.config.strict {
                        return Err(EngineError::Role {
                            role: "analyst task".to_string(),
                            query: query.to_string(),
                            source: BackendError::Unavailable(format!("task panicked: {e}")),
                        });
                    }
                    error!(error = %e, "Analyst task panicked");
                    degraded.push(format!("analyst task panicked: {e}"));
                }
            }
        }
        // The brief set is order-independent; fix a canonical order for the trace.
        briefs.sort_by_key(|brief| brief.kind);

        // 3. Adversarial debate, strictly sequential.
        let turn_budget = turn_char_budget(self.client.context_window(ModelTier::Deep));
        let mut debate = ResearcherDebate::new(self.config.max_debate_rounds, turn_budget);
        while let Some((speaker, round)) = debate.pending_speaker() {
            self.ensure_active()?;
            let system = researcher_system_prompt(speaker);
            let user = debate_user_prompt(&query, &briefs, debate.transcript(), &lessons);

            match self
                .client
                .complete(ModelTier::Deep, &system, &user, &budget)
                .await
            {
                Ok(content) => {
                    let turn = debate.submit(content);
                    if turn.truncated {
                        warn!(%speaker, round, "Debate turn truncated to fit budget");
                    }
                }
                Err(e) => {
                    if self.config.strict {
                        return Err(EngineError::Role {
                            role: format!("{speaker} researcher (round {round})"),
                            query: query.to_string(),
                            source: e,
                        });
                    }
                    warn!(%speaker, round, error = %e, "Debate turn degraded");
                    degraded.push(format!("{speaker} researcher round {round} failed: {e}"));
                    debate.submit(format!("({speaker} turn unavailable: {e})"));
                }
            }
        }
        let transcript = debate.into_transcript();

        // 4. Synthesis: exactly one decision, even when everything upstream
        // degraded.
        self.ensure_active()?;
        let decision = match self
            .trader
            .decide(run_id, &query, &briefs, &transcript, &lessons, &budget)
            .await
        {
            Ok(decision) => decision,
            Err(e) => {
                if self.config.strict {
                    return Err(EngineError::Role {
                        role: "trader".to_string(),
                        query: query.to_string(),
                        source: e,
                    });
                }
                warn!(error = %e, "Trader degraded to fallback hold");
                degraded.push(format!("trader failed: {e}"));
                fallback_decision(run_id, &query, &degraded)
            }
        };

        // 5. Risk review, then freeze the trace.
        let final_decision = self.risk.review(decision, degraded.clone());
        let trace = RunTrace {
            run_id,
            schema_version: TRACE_SCHEMA_VERSION,
            query: query.clone(),
            briefs,
            transcript,
            final_decision: final_decision.clone(),
            model_calls: budget.used(),
            degraded_reasons: degraded,
            started_at,
            finished_at: Utc::now(),
        };

        if let Err(e) = self.store.append_trace(&trace) {
            if self.config.strict {
                return Err(e.into());
            }
            warn!(error = %e, "Trace not persisted; reflection will not find this run");
        }

        info!(
            %run_id,
            action = %final_decision.action,
            override_flag = final_decision.override_flag,
            degraded = final_decision.degraded,
            model_calls = trace.model_calls,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Run complete"
        );

        Ok((trace, final_decision))
    }

    /// Secondary entry operation: reflect on one stored run by explicit id
    /// and append exactly one memory record.
    pub async fn reflect_and_remember(
        &self,
        run_id: Uuid,
        realized_return: Decimal,
    ) -> Result<MemoryRecord, EngineError> {
        let trace = self
            .store
            .get_trace(run_id)?
            .ok_or(EngineError::UnknownRun(run_id))?;

        let record = self.reflector.reflect(&trace, realized_return).await;
        self.store.append_record(&record).await?;

        info!(%run_id, record_id = %record.id, %realized_return, "Reflection stored");
        Ok(record)
    }

    /// Most recently stored run id, so callers reflect on "the latest
    /// decision" by explicit id rather than by implication.
    pub fn latest_run_id(&self) -> Result<Option<Uuid>, EngineError> {
        Ok(self.store.latest_run_id()?)
    }
}

fn fallback_decision(run_id: Uuid, query: &Query, degraded: &[String]) -> Decision {
    Decision {
        id: Uuid::new_v4(),
        run_id,
        query: query.clone(),
        action: TradeAction::Hold,
        rationale: format!(
            "No model-backed synthesis was possible for this run; holding by default. \
             Degraded inputs: {}.",
            degraded.join("; ")
        ),
        decided_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::scripted_graph;
    use tads_models::TadsConfig;

    #[test]
    fn call_limit_formula() {
        let mut config = TadsConfig::default();
        config.engine.max_debate_rounds = 2;
        let graph = scripted_graph(&config);
        // 4 analysts + 4 debate turns + 1 trader, doubled for re-prompts.
        assert_eq!(graph.call_limit(), 18);

        config.engine.max_debate_rounds = 0;
        let graph = scripted_graph(&config);
        assert_eq!(graph.call_limit(), 10);
    }

    #[tokio::test]
    async fn cancelled_graph_refuses_runs() {
        let config = TadsConfig::default();
        let graph = scripted_graph(&config);
        graph.cancel_token().cancel();

        let err = graph.propagate("AAPL", "2025-08-18").await.unwrap_err();
        assert!(matches!(err, EngineError::Cancelled));
    }

    #[tokio::test]
    async fn empty_symbol_rejected() {
        let graph = scripted_graph(&TadsConfig::default());
        let err = graph.propagate("  ", "2025-08-18").await.unwrap_err();
        assert!(matches!(err, EngineError::InvalidQuery(_)));
    }

    #[tokio::test]
    async fn malformed_date_rejected() {
        let graph = scripted_graph(&TadsConfig::default());
        let err = graph.propagate("AAPL", "18-08-2025").await.unwrap_err();
        assert!(matches!(err, EngineError::InvalidQuery(_)));
    }
}
