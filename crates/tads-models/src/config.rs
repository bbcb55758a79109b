use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::brief::AnalystKind;
use crate::decision::TradeAction;

/// Fatal configuration problems, surfaced at construction time.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("backend_url must not be empty")]
    EmptyBackendUrl,

    #[error("model identifier for the {0} tier must not be empty")]
    EmptyModelId(&'static str),

    #[error("at least one analyst must be configured")]
    NoAnalysts,

    #[error("duplicate analyst configured: {0}")]
    DuplicateAnalyst(AnalystKind),

    #[error("timeout_seconds must be positive")]
    ZeroTimeout,

    #[error("context_window must be positive")]
    ZeroContextWindow,

    #[error("memory.recall_limit must be positive")]
    ZeroRecallLimit,
}

/// A named binding of reasoning cost/quality to a backend model.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ModelTier {
    /// Low-cost model for data summarization and reflection.
    Quick,
    /// High-cost model for debate and decision synthesis.
    Deep,
}

impl ModelTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelTier::Quick => "quick",
            ModelTier::Deep => "deep",
        }
    }
}

/// Backend family selector. Selects auth/identification conventions only;
/// all providers speak the same text-completion protocol.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    LlamaCpp,
    OpenAi,
    Ollama,
}

impl LlmProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            LlmProvider::LlamaCpp => "llamacpp",
            LlmProvider::OpenAi => "openai",
            LlmProvider::Ollama => "ollama",
        }
    }
}

/// Backend-specific tuning, passed through to the endpoint unmodified.
/// The orchestration logic never interprets these beyond the overflow
/// preflight against `context_window`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BackendTuning {
    /// Prompt context window in tokens.
    pub context_window: usize,
    pub batch_size: u32,
    /// Hardware-acceleration hint (offloaded layer count).
    pub gpu_layers: u32,
}

impl Default for BackendTuning {
    fn default() -> Self {
        Self {
            context_window: 131_072,
            batch_size: 1024,
            gpu_layers: 80,
        }
    }
}

/// Model backend configuration for both tiers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    /// Endpoint base URL, e.g. "http://localhost:8080/v1".
    pub backend_url: String,
    /// Model identifier bound to the deep tier.
    pub deep_think_llm: String,
    /// Model identifier bound to the quick tier.
    pub quick_think_llm: String,
    /// Per-call timeout. A timeout is treated as backend unavailability.
    pub timeout_seconds: u64,
    /// Maximum retry attempts for transient unavailability.
    pub max_retries: u32,
    pub tuning: BackendTuning,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::LlamaCpp,
            backend_url: "http://localhost:8080/v1".to_string(),
            deep_think_llm: "models/gemma-3-4b-it-BF16.gguf".to_string(),
            quick_think_llm: "models/gemma-3-4b-it-BF16.gguf".to_string(),
            timeout_seconds: 120,
            max_retries: 3,
            tuning: BackendTuning::default(),
        }
    }
}

/// Static risk constraints applied by the review step. Defaults are
/// permissive: nothing blocked, degraded runs pass through.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RiskPolicy {
    /// Actions the reviewer tempers to hold.
    pub blocked_actions: Vec<TradeAction>,
    /// Temper any non-hold action to hold when the run is degraded.
    pub hold_when_degraded: bool,
}

/// Orchestration-graph configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngineConfig {
    /// Full bull+bear round-trips. Zero skips adversarial review entirely.
    pub max_debate_rounds: u32,
    /// Enable external data-retrieval tool calls for analysts.
    pub online_tools: bool,
    /// Emit the full run trace alongside the final decision.
    pub debug: bool,
    /// Propagate the first role failure instead of degrading.
    pub strict: bool,
    pub analysts: Vec<AnalystKind>,
    pub risk: RiskPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_debate_rounds: 1,
            online_tools: true,
            debug: false,
            strict: false,
            analysts: AnalystKind::ALL.to_vec(),
            risk: RiskPolicy::default(),
        }
    }
}

/// Memory store configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MemoryConfig {
    pub sqlite_path: String,
    /// Maximum entries in the in-memory recall cache.
    pub hot_capacity: u64,
    /// TTL in seconds for recall cache entries.
    pub hot_ttl_seconds: u64,
    /// How many recent lessons to surface into prompts.
    pub recall_limit: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            sqlite_path: "data/tads_memory.db".to_string(),
            hot_capacity: 1024,
            hot_ttl_seconds: 60,
            recall_limit: 5,
        }
    }
}

/// Top-level configuration for TADS. Immutable once handed to the graph
/// constructor; threaded explicitly through role constructors.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TadsConfig {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub memory: MemoryConfig,
    #[serde(default)]
    pub engine: EngineConfig,
}

impl TadsConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.llm.backend_url.trim().is_empty() {
            return Err(ConfigError::EmptyBackendUrl);
        }
        if self.llm.deep_think_llm.trim().is_empty() {
            return Err(ConfigError::EmptyModelId("deep"));
        }
        if self.llm.quick_think_llm.trim().is_empty() {
            return Err(ConfigError::EmptyModelId("quick"));
        }
        if self.llm.timeout_seconds == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        if self.llm.tuning.context_window == 0 {
            return Err(ConfigError::ZeroContextWindow);
        }
        if self.engine.analysts.is_empty() {
            return Err(ConfigError::NoAnalysts);
        }
        let mut seen = std::collections::BTreeSet::new();
        for kind in &self.engine.analysts {
            if !seen.insert(*kind) {
                return Err(ConfigError::DuplicateAnalyst(*kind));
            }
        }
        if self.memory.recall_limit == 0 {
            return Err(ConfigError::ZeroRecallLimit);
        }
        Ok(())
    }
}
