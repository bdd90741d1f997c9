//! Duration measurement stage.
//!
//! Sets the start mark the logging stage reads, and stores the final
//! duration on every exit path. If the call is dropped mid-flight, the drop
//! guard still records and reports how long it ran.

use async_trait::async_trait;
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use super::context::{InvocationLogger, LogRecord, ToolCallContext};
use super::{Middleware, Next, ToolOutcome};
use crate::types::RequestId;

#[derive(Debug, Default, Clone, Copy)]
pub struct TimingMiddleware;

/// Records the duration and reports a cancellation unless disarmed by a
/// normal exit.
struct CancelGuard {
    started: Instant,
    slot: Arc<OnceLock<Duration>>,
    tool: String,
    request_id: RequestId,
    logger: Option<Arc<dyn InvocationLogger>>,
    armed: bool,
}

impl Drop for CancelGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let elapsed = self.started.elapsed();
        let _ = self.slot.set(elapsed);
        if let Some(logger) = &self.logger {
            let record = LogRecord::Cancelled {
                tool: &self.tool,
                request_id: &self.request_id,
                elapsed,
            };
            let _ = logger.log(&record);
        }
    }
}

#[async_trait]
impl Middleware for TimingMiddleware {
    fn name(&self) -> &'static str {
        "timing"
    }

    async fn on_call_tool(&self, ctx: &mut ToolCallContext, next: Next<'_>) -> ToolOutcome {
        let started = Instant::now();
        ctx.mark_started(started);

        let mut guard = CancelGuard {
            started,
            slot: ctx.duration_slot(),
            tool: ctx.tool_name().to_string(),
            request_id: ctx.meta().request_id.clone(),
            logger: ctx.logger().cloned(),
            armed: true,
        };

        let outcome = next.run(ctx).await;

        guard.armed = false;
        ctx.record_duration(started.elapsed());
        outcome
    }
}
