use serde::{Deserialize, Serialize};

use crate::query::Query;

/// The closed set of analyst roles. Which of these run, and in what
/// configuration, is resolved from static configuration, never at runtime.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum AnalystKind {
    Market,
    Social,
    News,
    Fundamentals,
}

impl AnalystKind {
    pub const ALL: [AnalystKind; 4] = [
        AnalystKind::Market,
        AnalystKind::Social,
        AnalystKind::News,
        AnalystKind::Fundamentals,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AnalystKind::Market => "market",
            AnalystKind::Social => "social",
            AnalystKind::News => "news",
            AnalystKind::Fundamentals => "fundamentals",
        }
    }
}

impl std::fmt::Display for AnalystKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a single data-retrieval tool call. A failed call is recorded
/// here, inline, so downstream roles can reason about missing data.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ToolOutcome {
    Ok { result: serde_json::Value },
    Failed { reason: String },
}

/// One tool invocation made by an analyst, in call order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCallRecord {
    pub tool_name: String,
    pub args: serde_json::Value,
    pub outcome: ToolOutcome,
}

/// A structured, role-specific summary produced by one analyst for one run.
/// Immutable after creation; owned by the run trace.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalystBrief {
    pub kind: AnalystKind,
    pub query: Query,
    pub content: String,
    /// Tool calls issued while composing the brief, in order.
    pub tool_calls: Vec<ToolCallRecord>,
    /// True when the brief is a placeholder produced after a role failure.
    pub degraded: bool,
}

impl AnalystBrief {
    /// Placeholder brief used when the analyst itself failed but the run
    /// continues in degraded mode.
    pub fn unavailable(kind: AnalystKind, query: Query, reason: &str) -> Self {
        Self {
            kind,
            query,
            content: format!("{kind} analysis unavailable: {reason}"),
            tool_calls: Vec::new(),
            degraded: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn query() -> Query {
        Query::new("AAPL", NaiveDate::from_ymd_opt(2025, 8, 18).unwrap())
    }

    #[test]
    fn analyst_kind_serialization() {
        assert_eq!(
            serde_json::to_string(&AnalystKind::Fundamentals).unwrap(),
            "\"fundamentals\""
        );
        assert_eq!(serde_json::to_string(&AnalystKind::Market).unwrap(), "\"market\"");
    }

    #[test]
    fn roundtrip_brief_with_failed_tool_call() {
        let brief = AnalystBrief {
            kind: AnalystKind::News,
            query: query(),
            content: "Headline risk is elevated going into earnings.".to_string(),
            tool_calls: vec![
                ToolCallRecord {
                    tool_name: "company_news".to_string(),
                    args: serde_json::json!({"symbol": "AAPL", "lookback_days": 7}),
                    outcome: ToolOutcome::Ok {
                        result: serde_json::json!([{"headline": "AAPL earnings ahead"}]),
                    },
                },
                ToolCallRecord {
                    tool_name: "global_news".to_string(),
                    args: serde_json::json!({"lookback_days": 7}),
                    outcome: ToolOutcome::Failed {
                        reason: "feed timeout".to_string(),
                    },
                },
            ],
            degraded: false,
        };

        let json = serde_json::to_string(&brief).unwrap();
        let parsed: AnalystBrief = serde_json::from_str(&json).unwrap();
        assert_eq!(brief, parsed);
    }

    #[test]
    fn unavailable_brief_is_degraded() {
        let brief = AnalystBrief::unavailable(AnalystKind::Social, query(), "backend unreachable");
        assert!(brief.degraded);
        assert!(brief.content.contains("social"));
        assert!(brief.content.contains("backend unreachable"));
        assert!(brief.tool_calls.is_empty());
    }
}
