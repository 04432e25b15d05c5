//! LLM client module.
//!
//! A single OpenAI-compatible gateway reaches every model tier the router
//! selects; there is no provider branching.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

pub mod client;
mod error;
mod gateway;
mod types;

pub use client::LlmClient;
pub use error::LlmError;
pub use gateway::GatewayClient;
#[allow(unused_imports)]
pub use types::Role;
pub use types::{
    CompletionRequest, CompletionResponse, ContentBlock, Message, MessageContent, StopReason, TokenUsage, ToolCall,
    ToolDefinition,
};

use crate::config::ResolvedLlmConfig;

/// Build the gateway client from resolved configuration.
pub fn create_client(config: &ResolvedLlmConfig) -> Result<Arc<dyn LlmClient>, LlmError> {
    debug!(model = %config.default_model, base_url = %config.base_url, "create_client: building gateway client");
    let client = GatewayClient::new(
        config.base_url.clone(),
        config.api_key.clone(),
        config.default_model.clone(),
        config.max_tokens,
        Duration::from_secs(config.timeout_secs),
    )?;
    Ok(Arc::new(client))
}
