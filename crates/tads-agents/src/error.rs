use thiserror::Error;
use uuid::Uuid;

/// Failures of the text-completion backend, per call.
#[derive(Error, Debug)]
pub enum BackendError {
    /// The endpoint is unreachable, overloaded, or timed out. Transient;
    /// retried with bounded backoff.
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    /// The prompt does not fit the configured context window. Never
    /// retried; the triggering role call degrades.
    #[error("prompt (~{prompt_tokens} tokens) exceeds context window of {context_window}")]
    Overflow {
        prompt_tokens: usize,
        context_window: usize,
    },

    /// The response could not be parsed into the expected structure.
    /// Never retried; the caller may re-prompt once, then degrade.
    #[error("backend returned malformed output: {0}")]
    MalformedOutput(String),

    /// The run's global model-call bound was reached.
    #[error("model call budget exhausted ({limit} calls)")]
    BudgetExhausted { limit: u32 },
}

/// Failures of the external data-retrieval collaborator. Recorded inline
/// in the issuing brief, never propagated as a run failure.
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("fetch failed: {0}")]
    Fetch(String),

    #[error("unknown tool: {0}")]
    UnknownTool(String),
}

/// Orchestration-level failures that can escape `run`.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("configuration error: {0}")]
    Config(#[from] tads_models::ConfigError),

    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// A role failed hard. Only surfaced in strict mode (or past the retry
    /// budget); carries enough context to name the role and query.
    #[error("{role} failed for {query}: {source}")]
    Role {
        role: String,
        query: String,
        #[source]
        source: BackendError,
    },

    #[error("run cancelled")]
    Cancelled,

    #[error("no stored run trace with id {0}")]
    UnknownRun(Uuid),

    #[error("memory store error: {0}")]
    Memory(#[from] tads_memory::MemoryError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
