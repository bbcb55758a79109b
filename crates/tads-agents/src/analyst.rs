use std::sync::Arc;

use async_trait::async_trait;
use tads_models::{AnalystBrief, AnalystKind, MemoryRecord, ModelTier, Query};
use tracing::debug;

use crate::client::{CallBudget, ModelClient};
use crate::error::BackendError;
use crate::prompts::{analyst_system_prompt, analyst_user_prompt, tools_for};
use crate::tools::{record_call, DataFeed};

/// Run-scoped inputs shared by every analyst. Cloned into each analyst
/// task; all fields are read-only.
#[derive(Clone)]
pub struct AnalystContext {
    pub query: Query,
    pub lessons: Arc<Vec<MemoryRecord>>,
    pub budget: Arc<CallBudget>,
}

/// An independent data-gathering role. Mockable for testing.
#[async_trait]
pub trait Analyst: Send + Sync {
    fn kind(&self) -> AnalystKind;

    async fn analyze(&self, ctx: AnalystContext) -> Result<AnalystBrief, BackendError>;
}

/// Analyst backed by the model client. One per configured kind; the kind
/// fixes the tool list and system prompt.
pub struct LlmAnalyst {
    kind: AnalystKind,
    tier: ModelTier,
    client: Arc<ModelClient>,
    /// None when online tools are disabled: no fetches are attempted and
    /// the brief reasons from model knowledge plus memory alone.
    feed: Option<Arc<dyn DataFeed>>,
}

impl LlmAnalyst {
    pub fn new(
        kind: AnalystKind,
        tier: ModelTier,
        client: Arc<ModelClient>,
        feed: Option<Arc<dyn DataFeed>>,
    ) -> Self {
        Self {
            kind,
            tier,
            client,
            feed,
        }
    }
}

#[async_trait]
impl Analyst for LlmAnalyst {
    fn kind(&self) -> AnalystKind {
        self.kind
    }

    async fn analyze(&self, ctx: AnalystContext) -> Result<AnalystBrief, BackendError> {
        let mut tool_calls = Vec::new();
        if let Some(feed) = &self.feed {
            for tool in tools_for(self.kind) {
                let args = serde_json::json!({
                    "symbol": ctx.query.symbol,
                    "as_of_date": ctx.query.as_of_date.to_string(),
                });
                tool_calls.push(record_call(feed.as_ref(), tool, args).await);
            }
        }

        let system = analyst_system_prompt(self.kind);
        let user = analyst_user_prompt(&ctx.query, &tool_calls, &ctx.lessons);

        let content = match self
            .client
            .complete(self.tier, &system, &user, &ctx.budget)
            .await
        {
            Ok(text) => text,
            Err(BackendError::MalformedOutput(reason)) => {
                // One re-prompt, then the failure stands.
                debug!(kind = %self.kind, %reason, "Malformed brief, re-prompting once");
                let retry_user = format!(
                    "{user}\n\nYour previous reply was unusable ({reason}). \
                     Write the brief again as plain prose."
                );
                self.client
                    .complete(self.tier, &system, &retry_user, &ctx.budget)
                    .await?
            }
            Err(e) => return Err(e),
        };

        Ok(AnalystBrief {
            kind: self.kind,
            query: ctx.query,
            content: content.trim().to_string(),
            tool_calls,
            degraded: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::RetryConfig;
    use crate::test_support::{FailingFeed, ScriptedBackend, ScriptedFeed, UnavailableBackend};
    use chrono::NaiveDate;
    use tads_models::ToolOutcome;

    fn ctx() -> AnalystContext {
        AnalystContext {
            query: Query::new("AAPL", NaiveDate::from_ymd_opt(2025, 8, 18).unwrap()),
            lessons: Arc::new(vec![]),
            budget: Arc::new(CallBudget::new(8)),
        }
    }

    fn client(backend: Arc<dyn crate::backend::CompletionBackend>) -> Arc<ModelClient> {
        Arc::new(ModelClient::new(
            backend.clone(),
            backend,
            RetryConfig::immediate(1),
        ))
    }

    #[tokio::test]
    async fn analyst_records_tool_calls_in_order() {
        let analyst = LlmAnalyst::new(
            AnalystKind::News,
            ModelTier::Quick,
            client(Arc::new(ScriptedBackend::default())),
            Some(Arc::new(ScriptedFeed::default())),
        );

        let brief = analyst.analyze(ctx()).await.unwrap();
        assert_eq!(brief.kind, AnalystKind::News);
        assert!(!brief.degraded);
        let names: Vec<_> = brief.tool_calls.iter().map(|c| c.tool_name.as_str()).collect();
        assert_eq!(names, vec!["company_news", "global_news"]);
    }

    #[tokio::test]
    async fn failed_tool_call_does_not_fail_analysis() {
        let analyst = LlmAnalyst::new(
            AnalystKind::Market,
            ModelTier::Quick,
            client(Arc::new(ScriptedBackend::default())),
            Some(Arc::new(FailingFeed)),
        );

        let brief = analyst.analyze(ctx()).await.unwrap();
        assert!(!brief.degraded);
        assert!(brief
            .tool_calls
            .iter()
            .all(|c| matches!(c.outcome, ToolOutcome::Failed { .. })));
    }

    #[tokio::test]
    async fn offline_analyst_skips_tools() {
        let analyst = LlmAnalyst::new(
            AnalystKind::Social,
            ModelTier::Quick,
            client(Arc::new(ScriptedBackend::default())),
            None,
        );

        let brief = analyst.analyze(ctx()).await.unwrap();
        assert!(brief.tool_calls.is_empty());
        assert!(!brief.content.is_empty());
    }

    #[tokio::test]
    async fn unavailable_backend_propagates() {
        let analyst = LlmAnalyst::new(
            AnalystKind::Market,
            ModelTier::Quick,
            client(Arc::new(UnavailableBackend)),
            None,
        );

        let err = analyst.analyze(ctx()).await.unwrap_err();
        assert!(matches!(err, BackendError::Unavailable(_)));
    }
}
