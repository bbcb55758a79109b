use async_trait::async_trait;
use tads_models::{ToolCallRecord, ToolOutcome};
use tracing::warn;

use crate::error::ToolError;

/// The external data-retrieval collaborator. Out of core scope; analysts
/// call it synchronously from their perspective and record every outcome,
/// including failures, inline in their brief.
#[async_trait]
pub trait DataFeed: Send + Sync {
    async fn fetch(
        &self,
        tool_name: &str,
        args: serde_json::Value,
    ) -> Result<serde_json::Value, ToolError>;
}

/// Issue one tool call and fold the outcome into a trace record. A failed
/// fetch becomes data for downstream roles, never an orchestration error.
pub async fn record_call(
    feed: &dyn DataFeed,
    tool_name: &str,
    args: serde_json::Value,
) -> ToolCallRecord {
    match feed.fetch(tool_name, args.clone()).await {
        Ok(result) => ToolCallRecord {
            tool_name: tool_name.to_string(),
            args,
            outcome: ToolOutcome::Ok { result },
        },
        Err(e) => {
            warn!(tool = tool_name, error = %e, "Tool call failed; recording inline");
            ToolCallRecord {
                tool_name: tool_name.to_string(),
                args,
                outcome: ToolOutcome::Failed {
                    reason: e.to_string(),
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FailingFeed, ScriptedFeed};

    #[tokio::test]
    async fn successful_call_records_result() {
        let feed = ScriptedFeed::default();
        let record = record_call(&feed, "price_history", serde_json::json!({"symbol": "AAPL"}))
            .await;
        assert_eq!(record.tool_name, "price_history");
        assert!(matches!(record.outcome, ToolOutcome::Ok { .. }));
    }

    #[tokio::test]
    async fn failed_call_recorded_inline() {
        let feed = FailingFeed;
        let record = record_call(&feed, "price_history", serde_json::json!({})).await;
        match record.outcome {
            ToolOutcome::Failed { reason } => assert!(reason.contains("fetch failed")),
            other => panic!("expected failure outcome, got {other:?}"),
        }
    }
}
