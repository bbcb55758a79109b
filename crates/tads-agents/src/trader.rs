use std::sync::Arc;

use chrono::Utc;
use tads_models::{AnalystBrief, DebateTranscript, Decision, MemoryRecord, ModelTier, Query};
use tracing::debug;
use uuid::Uuid;

use crate::client::{CallBudget, ModelClient};
use crate::error::BackendError;
use crate::parser::extract_action;
use crate::prompts::{trader_system_prompt, trader_user_prompt};

/// The synthesis role: folds briefs, debate and lessons into exactly one
/// decision, on the deep tier.
pub struct Trader {
    client: Arc<ModelClient>,
    tier: ModelTier,
}

impl Trader {
    pub fn new(client: Arc<ModelClient>) -> Self {
        Self {
            client,
            tier: ModelTier::Deep,
        }
    }

    pub async fn decide(
        &self,
        run_id: Uuid,
        query: &Query,
        briefs: &[AnalystBrief],
        transcript: &DebateTranscript,
        lessons: &[MemoryRecord],
        budget: &CallBudget,
    ) -> Result<Decision, BackendError> {
        let system = trader_system_prompt();
        let user = trader_user_prompt(query, briefs, transcript, lessons);

        let mut text = self.client.complete(self.tier, &system, &user, budget).await?;

        let action = match extract_action(&text) {
            Some(action) => action,
            None => {
                // One re-prompt for the missing marker, then give up.
                debug!(%run_id, "Trader reply had no proposal marker, re-prompting once");
                let retry_user = format!(
                    "{user}\n\nYour previous reply did not end with the required marker. \
                     Reply again and end with FINAL TRANSACTION PROPOSAL: **BUY**, \
                     **SELL** or **HOLD**."
                );
                text = self
                    .client
                    .complete(self.tier, &system, &retry_user, budget)
                    .await?;
                extract_action(&text).ok_or_else(|| {
                    BackendError::MalformedOutput(
                        "no transaction proposal in trader reply".to_string(),
                    )
                })?
            }
        };

        Ok(Decision {
            id: Uuid::new_v4(),
            run_id,
            query: query.clone(),
            action,
            rationale: text.trim().to_string(),
            decided_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::RetryConfig;
    use crate::test_support::ScriptedBackend;
    use chrono::NaiveDate;
    use tads_models::TradeAction;

    fn trader(backend: Arc<dyn crate::backend::CompletionBackend>) -> Trader {
        Trader::new(Arc::new(ModelClient::new(
            backend.clone(),
            backend,
            RetryConfig::immediate(1),
        )))
    }

    fn query() -> Query {
        Query::new("AAPL", NaiveDate::from_ymd_opt(2025, 8, 18).unwrap())
    }

    #[tokio::test]
    async fn produces_exactly_one_decision_with_empty_transcript() {
        let trader = trader(Arc::new(ScriptedBackend::default()));
        let budget = CallBudget::new(4);

        let decision = trader
            .decide(
                Uuid::new_v4(),
                &query(),
                &[],
                &DebateTranscript::new(),
                &[],
                &budget,
            )
            .await
            .unwrap();

        assert_eq!(decision.action, TradeAction::Buy);
        assert!(!decision.rationale.is_empty());
        assert_eq!(budget.used(), 1);
    }

    #[tokio::test]
    async fn reprompts_once_on_missing_marker() {
        // First reply lacks the marker, second carries it.
        let backend = Arc::new(ScriptedBackend::trader_replies(vec![
            "the outlook is mixed and I cannot commit".to_string(),
            "on reflection: FINAL TRANSACTION PROPOSAL: **SELL**".to_string(),
        ]));
        let trader = trader(backend);
        let budget = CallBudget::new(4);

        let decision = trader
            .decide(
                Uuid::new_v4(),
                &query(),
                &[],
                &DebateTranscript::new(),
                &[],
                &budget,
            )
            .await
            .unwrap();

        assert_eq!(decision.action, TradeAction::Sell);
        assert_eq!(budget.used(), 2);
    }

    #[tokio::test]
    async fn gives_up_after_second_unparseable_reply() {
        let backend = Arc::new(ScriptedBackend::trader_replies(vec![
            "no signal here".to_string(),
            "still no signal".to_string(),
        ]));
        let trader = trader(backend);
        let budget = CallBudget::new(4);

        let err = trader
            .decide(
                Uuid::new_v4(),
                &query(),
                &[],
                &DebateTranscript::new(),
                &[],
                &budget,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::MalformedOutput(_)));
    }
}
