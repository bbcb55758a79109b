//! Test support: deterministic backends and feeds for exercising the
//! orchestration graph without a live model server.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tads_memory::MemoryStore;
use tads_models::{ModelTier, TadsConfig};

use crate::analyst::{Analyst, LlmAnalyst};
use crate::backend::CompletionBackend;
use crate::client::{ModelClient, RetryConfig};
use crate::error::{BackendError, ToolError};
use crate::graph::TradingGraph;
use crate::tools::DataFeed;

/// Deterministic backend returning fixed canned text per role, routed on
/// the system prompt. An optional reply queue (served in order to every
/// call) scripts specific exchanges, e.g. trader re-prompts.
pub struct ScriptedBackend {
    replies: Mutex<VecDeque<String>>,
    window: usize,
}

impl Default for ScriptedBackend {
    fn default() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            window: 131_072,
        }
    }
}

impl ScriptedBackend {
    /// Serve these replies, in order, before falling back to role routing.
    pub fn trader_replies(replies: Vec<String>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            window: 131_072,
        }
    }

    fn canned_for_role(system_prompt: &str) -> String {
        if system_prompt.contains("market analyst") {
            "Price action is constructive; the trend is up on rising volume.".to_string()
        } else if system_prompt.contains("social media analyst") {
            "Retail chatter is mildly positive with no unusual volume.".to_string()
        } else if system_prompt.contains("news analyst") {
            "No adverse headlines; earnings coverage skews favorable.".to_string()
        } else if system_prompt.contains("fundamentals analyst") {
            "Margins are stable and valuation is in line with peers.".to_string()
        } else if system_prompt.contains("bull researcher") {
            "The briefs support upside: momentum, clean headlines, fair value.".to_string()
        } else if system_prompt.contains("bear researcher") {
            "The upside is priced in; positioning is crowded and catalysts are thin.".to_string()
        } else if system_prompt.contains("trader responsible") {
            "The bull case holds up under the bear's pushback.\n\
             FINAL TRANSACTION PROPOSAL: **BUY**"
                .to_string()
        } else if system_prompt.contains("reflection step") {
            "The decision leaned on momentum; check crowd positioning first next time."
                .to_string()
        } else {
            "ok".to_string()
        }
    }
}

#[async_trait]
impl CompletionBackend for ScriptedBackend {
    async fn complete(
        &self,
        system_prompt: &str,
        _user_prompt: &str,
    ) -> Result<String, BackendError> {
        if let Some(reply) = self.replies.lock().unwrap().pop_front() {
            return Ok(reply);
        }
        Ok(Self::canned_for_role(system_prompt))
    }

    fn context_window(&self) -> usize {
        self.window
    }
}

/// Backend that always raises unavailability.
pub struct UnavailableBackend;

#[async_trait]
impl CompletionBackend for UnavailableBackend {
    async fn complete(&self, _: &str, _: &str) -> Result<String, BackendError> {
        Err(BackendError::Unavailable(
            "connection refused (scripted)".to_string(),
        ))
    }

    fn context_window(&self) -> usize {
        131_072
    }
}

/// Backend that fails N times with unavailability, then succeeds.
pub struct FlakyBackend {
    remaining_failures: AtomicU32,
    calls: AtomicU32,
}

impl FlakyBackend {
    pub fn failing_times(n: u32) -> Self {
        Self {
            remaining_failures: AtomicU32::new(n),
            calls: AtomicU32::new(0),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompletionBackend for FlakyBackend {
    async fn complete(&self, system_prompt: &str, _: &str) -> Result<String, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let remaining = self.remaining_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.remaining_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(BackendError::Unavailable("flaky (scripted)".to_string()));
        }
        Ok(ScriptedBackend::canned_for_role(system_prompt))
    }

    fn context_window(&self) -> usize {
        131_072
    }
}

/// Feed returning canned structured results for every known tool.
#[derive(Default)]
pub struct ScriptedFeed;

#[async_trait]
impl DataFeed for ScriptedFeed {
    async fn fetch(
        &self,
        tool_name: &str,
        args: serde_json::Value,
    ) -> Result<serde_json::Value, ToolError> {
        Ok(serde_json::json!({
            "tool": tool_name,
            "args": args,
            "data": format!("canned {tool_name} payload"),
        }))
    }
}

/// Feed whose every fetch fails, for exercising inline failure recording.
pub struct FailingFeed;

#[async_trait]
impl DataFeed for FailingFeed {
    async fn fetch(&self, _: &str, _: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        Err(ToolError::Fetch("feed offline (scripted)".to_string()))
    }
}

/// Build a graph over an arbitrary backend with an in-memory store and
/// zero-delay retries.
pub fn graph_with_backend(
    config: &TadsConfig,
    backend: Arc<dyn CompletionBackend>,
) -> TradingGraph {
    let client = Arc::new(ModelClient::new(
        Arc::clone(&backend),
        backend,
        RetryConfig::immediate(1),
    ));

    let feed: Option<Arc<dyn DataFeed>> = if config.engine.online_tools {
        Some(Arc::new(ScriptedFeed))
    } else {
        None
    };

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

    let store = Arc::new(MemoryStore::open_in_memory().expect("in-memory store"));
    TradingGraph::new(
        client,
        analysts,
        store,
        config.engine.clone(),
        config.memory.recall_limit,
    )
}

/// Build a graph over the role-routed scripted backend.
pub fn scripted_graph(config: &TadsConfig) -> TradingGraph {
    graph_with_backend(config, Arc::new(ScriptedBackend::default()))
}
