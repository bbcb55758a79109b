pub mod brief;
pub mod config;
pub mod debate;
pub mod decision;
pub mod memory;
pub mod query;
pub mod trace;

pub use brief::{AnalystBrief, AnalystKind, ToolCallRecord, ToolOutcome};
pub use config::{
    BackendTuning, ConfigError, EngineConfig, LlmConfig, LlmProvider, MemoryConfig, ModelTier,
    RiskPolicy, TadsConfig,
};
pub use debate::{DebateTranscript, DebateTurn, Speaker};
pub use decision::{Decision, FinalDecision, TradeAction};
pub use memory::MemoryRecord;
pub use query::Query;
pub use trace::RunTrace;
