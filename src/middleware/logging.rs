//! Request/response logging stage.

use async_trait::async_trait;
use std::time::Instant;

use super::context::{LogRecord, ToolCallContext};
use super::{Middleware, Next, ToolOutcome};

#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingMiddleware;

impl LoggingMiddleware {
    fn emit(ctx: &ToolCallContext, record: &LogRecord<'_>) {
        if let Some(logger) = ctx.logger() {
            if let Err(err) = logger.log(record) {
                tracing::debug!("tool request logging skipped: {}", err);
            }
        }
    }
}

#[async_trait]
impl Middleware for LoggingMiddleware {
    fn name(&self) -> &'static str {
        "logging"
    }

    async fn on_call_tool(&self, ctx: &mut ToolCallContext, next: Next<'_>) -> ToolOutcome {
        Self::emit(
            ctx,
            &LogRecord::Start {
                tool: ctx.tool_name(),
                meta: ctx.meta(),
                at: Instant::now(),
            },
        );

        let outcome = next.run(ctx).await;

        // Faults are logged by the error-handling stage.
        if outcome.is_ok() {
            let now = Instant::now();
            Self::emit(
                ctx,
                &LogRecord::End {
                    tool: ctx.tool_name(),
                    meta: ctx.meta(),
                    elapsed: ctx.elapsed_at(now),
                    at: now,
                },
            );
        }

        outcome
    }
}
