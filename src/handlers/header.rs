use async_trait::async_trait;

use super::{Handler, StepContext, Verb};
use crate::error::ProbeError;

/// `HEADER [name]`: echo inbound request headers.
pub struct HeaderHandler;

#[async_trait]
impl Handler for HeaderHandler {
    fn verb(&self) -> Verb {
        Verb::Header
    }

    fn usage(&self) -> &str {
        "[name]"
    }

    async fn execute(&self, args: &[String], ctx: &StepContext<'_>) -> Result<String, ProbeError> {
        if let Some(name) = args.first() {
            let values = ctx.request.header_values(name).join(", ");
            return Ok(format!("HEADER: {name}: {values}"));
        }
        Ok(ctx
            .request
            .headers
            .iter()
            .map(|(k, v)| format!("HEADER: {k}: {v}"))
            .collect::<Vec<_>>()
            .join("\n"))
    }
}
