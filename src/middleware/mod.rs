//! Tool-call middleware chain.
//!
//! Every tool invocation runs through an ordered list of stages before the
//! tool's own handler. Stages are installed outermost-first: the first stage
//! added sees the call first and the outcome last.
//!
//! ```text
//!   call ─▶ ErrorHandling ─▶ Timing ─▶ Logging ─▶ tool handler
//!                                                     │
//!   outcome ◀──────────────────────────────────────────┘
//! ```
//!
//! A stage never turns a fault into data. Faults travel back as the `Err`
//! side of [`ToolOutcome`]; turning them into an error envelope is the
//! dispatcher's job.

use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use crate::tools::ToolHandler;
use crate::types::Error;

pub mod context;
pub mod error_handling;
pub mod logging;
pub mod timing;

pub use context::{InvocationLogger, InvocationMeta, LogRecord, ToolCallContext, TracingLogger};
pub use error_handling::ErrorHandlingMiddleware;
pub use logging::LoggingMiddleware;
pub use timing::TimingMiddleware;

/// Result of running a tool call through the chain.
pub type ToolOutcome = std::result::Result<Value, ToolFault>;

/// A fault raised by a tool, passed through the chain unchanged.
#[derive(Debug)]
pub struct ToolFault {
    error: Error,
    logged: bool,
}

impl ToolFault {
    pub fn new(error: Error) -> Self {
        Self {
            error,
            logged: false,
        }
    }

    pub fn error(&self) -> &Error {
        &self.error
    }

    pub fn into_error(self) -> Error {
        self.error
    }

    /// Whether a stage has already written this fault to the log.
    pub fn is_logged(&self) -> bool {
        self.logged
    }

    pub(crate) fn mark_logged(&mut self) {
        self.logged = true;
    }
}

impl From<Error> for ToolFault {
    fn from(error: Error) -> Self {
        Self::new(error)
    }
}

impl fmt::Display for ToolFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.error, f)
    }
}

impl std::error::Error for ToolFault {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// One cross-cutting stage around a tool call.
#[async_trait]
pub trait Middleware: Send + Sync + fmt::Debug {
    fn name(&self) -> &'static str;

    async fn on_call_tool(&self, ctx: &mut ToolCallContext, next: Next<'_>) -> ToolOutcome;
}

/// The rest of the chain, handed to each stage.
pub struct Next<'a> {
    stages: &'a [Arc<dyn Middleware>],
    handler: &'a dyn ToolHandler,
}

impl fmt::Debug for Next<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next")
            .field("remaining_stages", &self.stages.len())
            .finish_non_exhaustive()
    }
}

impl<'a> Next<'a> {
    /// Run the remaining stages, then the tool handler.
    pub async fn run(self, ctx: &mut ToolCallContext) -> ToolOutcome {
        match self.stages.split_first() {
            Some((stage, rest)) => {
                let next = Next {
                    stages: rest,
                    handler: self.handler,
                };
                stage.on_call_tool(ctx, next).await
            }
            None => self.handler.call(ctx).await.map_err(ToolFault::from),
        }
    }
}

/// Ordered list of installed stages.
#[derive(Debug, Default, Clone)]
pub struct MiddlewareChain {
    stages: Vec<Arc<dyn Middleware>>,
}

impl MiddlewareChain {
    pub fn new() -> Self {
        Self { stages: Vec::new() }
    }

    /// Chain with the three core stages installed.
    pub fn core() -> Self {
        let mut chain = Self::new();
        chain.install_core();
        chain
    }

    /// Install error handling, timing, and logging, in that order.
    ///
    /// Timing sits outside logging so the "end" record can report the
    /// duration, and inside error handling so faults are timed too.
    pub fn install_core(&mut self) {
        self.add(ErrorHandlingMiddleware);
        self.add(TimingMiddleware);
        self.add(LoggingMiddleware);
    }

    /// Append a stage (it runs inside every stage added before it).
    pub fn add<M: Middleware + 'static>(&mut self, stage: M) {
        self.stages.push(Arc::new(stage));
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Run a tool call through every stage.
    pub async fn execute(&self, ctx: &mut ToolCallContext, handler: &dyn ToolHandler) -> ToolOutcome {
        Next {
            stages: &self.stages,
            handler,
        }
        .run(ctx)
        .await
    }
}
