//! Fault interception stage.
//!
//! Logs a fault once through the call's logger and hands it back unchanged.

use async_trait::async_trait;

use super::context::{LogRecord, ToolCallContext};
use super::{Middleware, Next, ToolOutcome};

#[derive(Debug, Default, Clone, Copy)]
pub struct ErrorHandlingMiddleware;

#[async_trait]
impl Middleware for ErrorHandlingMiddleware {
    fn name(&self) -> &'static str {
        "error_handling"
    }

    async fn on_call_tool(&self, ctx: &mut ToolCallContext, next: Next<'_>) -> ToolOutcome {
        let mut fault = match next.run(ctx).await {
            Ok(value) => return Ok(value),
            Err(fault) => fault,
        };

        if fault.is_logged() {
            return Err(fault);
        }

        if let Some(logger) = ctx.logger() {
            let record = LogRecord::Fault {
                tool: ctx.tool_name(),
                meta: ctx.meta(),
                error: fault.error(),
                elapsed: ctx.duration(),
            };
            match logger.log(&record) {
                Ok(()) => fault.mark_logged(),
                Err(err) => tracing::debug!("fault logging skipped: {}", err),
            }
        }

        Err(fault)
    }
}
