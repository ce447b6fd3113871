//! Routes model function calls to local handlers.
//!
//! Every call gets exactly one [`ToolResult`] with the same id. Handlers
//! never fail the session: unknown names and malformed arguments are logged
//! and answered with `{"status": "ok"}` so the model is not left waiting.

pub mod catalog;
mod handlers;

use crate::events::{ToolCall, ToolResult};
use crate::playback::cue::CuePlayer;
use crate::store::{MedicationList, MemoryStore, StoreError};
use crate::ui::UiPublisher;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// What a handler may touch while processing a call.
#[derive(Clone)]
pub struct ToolContext {
    pub ui: UiPublisher,
    pub medications: MedicationList,
    pub memory: Arc<dyn MemoryStore>,
    pub cues: Arc<dyn CuePlayer>,
}

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("invalid arguments: {0}")]
    InvalidArgs(#[from] serde_json::Error),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

pub trait ToolHandler: Send + Sync {
    fn name(&self) -> &'static str;

    fn handle(&self, args: &Value, ctx: &ToolContext) -> Result<Value, ToolError>;
}

/// Deserializes a call's argument object into a handler's typed arguments.
pub(crate) fn parse_args<T: DeserializeOwned>(args: &Value) -> Result<T, ToolError> {
    Ok(T::deserialize(args)?)
}

pub fn fallback_result() -> Value {
    json!({ "status": "ok" })
}

pub struct ToolRouter {
    handlers: HashMap<&'static str, Box<dyn ToolHandler>>,
    ctx: ToolContext,
}

impl ToolRouter {
    /// Builds a router with every catalog tool registered.
    pub fn new(ctx: ToolContext) -> Self {
        let mut router = Self {
            handlers: HashMap::new(),
            ctx,
        };
        for handler in handlers::all() {
            router.register(handler);
        }
        router
    }

    pub fn register(&mut self, handler: Box<dyn ToolHandler>) {
        self.handlers.insert(handler.name(), handler);
    }

    pub fn knows(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    pub fn dispatch(&self, call: &ToolCall) -> ToolResult {
        debug!("Tool call {} ({})", call.name, call.id);
        let result = match self.handlers.get(call.name.as_str()) {
            Some(handler) => match handler.handle(&call.args, &self.ctx) {
                Ok(value) => value,
                Err(e) => {
                    warn!("Tool {} failed: {}", call.name, e);
                    fallback_result()
                }
            },
            None => {
                warn!("Unknown tool requested: {}", call.name);
                fallback_result()
            }
        };

        ToolResult {
            id: call.id.clone(),
            name: call.name.clone(),
            result,
        }
    }
}
