//! TADS - Trading Agents Debate System
//!
//! A multi-agent decision engine that turns an instrument symbol and an
//! as-of date into a reviewed trading recommendation: parallel analyst
//! briefs, a bounded bull/bear debate, trader synthesis, rule-based risk
//! review, and a reflection loop that feeds realized outcomes back into
//! an append-only memory.
//!
//! # Library Usage
//!
//! ```rust,no_run
//! use tads::models::TadsConfig;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = TadsConfig::default();
//! let graph = tads::build_graph(&config, None)?;
//! let (trace, decision) = graph.propagate("AAPL", "2025-08-18").await?;
//! println!("{} ({} model calls)", decision.action, trace.model_calls);
//! # Ok(())
//! # }
//! ```

pub use tads_agents as agents;
pub use tads_memory as memory;
pub use tads_models as models;

use std::sync::Arc;
use std::time::Duration;

use tads_agents::analyst::{Analyst, LlmAnalyst};
use tads_agents::backend::HttpBackend;
use tads_agents::client::{ModelClient, RetryConfig};
use tads_agents::error::EngineError;
use tads_agents::graph::TradingGraph;
use tads_agents::tools::DataFeed;
use tads_memory::MemoryStore;
use tads_models::{LlmProvider, ModelTier, TadsConfig};

/// Build a TradingGraph from configuration.
///
/// `feed` is the external data-retrieval collaborator; pass None to run
/// analysts on model knowledge and memory alone (tool calls are only made
/// when both a feed is supplied and `engine.online_tools` is set).
pub fn build_graph(
    config: &TadsConfig,
    feed: Option<Arc<dyn DataFeed>>,
) -> Result<TradingGraph, EngineError> {
    config.validate()?;

    // Credential loading stays outside the core; the OpenAI provider is the
    // only one that expects a bearer token.
    let api_key = match config.llm.provider {
        LlmProvider::OpenAi => std::env::var("OPENAI_API_KEY").ok(),
        LlmProvider::LlamaCpp | LlmProvider::Ollama => None,
    };

    let timeout = Duration::from_secs(config.llm.timeout_seconds);
    let quick = Arc::new(HttpBackend::new(
        config.llm.provider,
        config.llm.backend_url.clone(),
        config.llm.quick_think_llm.clone(),
        config.llm.tuning.clone(),
        timeout,
        api_key.clone(),
    ));
    let deep = Arc::new(HttpBackend::new(
        config.llm.provider,
        config.llm.backend_url.clone(),
        config.llm.deep_think_llm.clone(),
        config.llm.tuning.clone(),
        timeout,
        api_key,
    ));

    let retry = RetryConfig {
        max_retries: config.llm.max_retries,
        ..RetryConfig::default()
    };
    let client = Arc::new(ModelClient::new(quick, deep, retry));

    let feed = if config.engine.online_tools { feed } else { None };
    let analysts: Vec<Arc<dyn Analyst>> = config
        .engine
        .analysts
        .iter()
        .map(|kind| {
            Arc::new(LlmAnalyst::new(
                *kind,
                ModelTier::Quick,
                Arc::clone(&client),
                feed.clone(),
            )) as Arc<dyn Analyst>
        })
        .collect();

    let store = Arc::new(MemoryStore::open(
        &config.memory.sqlite_path,
        config.memory.hot_capacity,
        Duration::from_secs(config.memory.hot_ttl_seconds),
    )?);

    Ok(TradingGraph::new(
        client,
        analysts,
        store,
        config.engine.clone(),
        config.memory.recall_limit,
    ))
}
