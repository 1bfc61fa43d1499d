use async_trait::async_trait;

use super::{Handler, StepContext, Verb};
use crate::error::ProbeError;

/// `CONNECTION [IP]`: the peer address the script arrived from.
pub struct ConnectionHandler;

#[async_trait]
impl Handler for ConnectionHandler {
    fn verb(&self) -> Verb {
        Verb::Connection
    }

    fn usage(&self) -> &str {
        "[IP]"
    }

    async fn execute(&self, args: &[String], ctx: &StepContext<'_>) -> Result<String, ProbeError> {
        let ip_only = args.first().is_some_and(|a| a == "IP");
        Ok(match (ctx.request.remote, ip_only) {
            (Some(addr), true) => format!("IP: {}", addr.ip()),
            (Some(addr), false) => format!("CONNECTION: {}:{}", addr.ip(), addr.port()),
            (None, true) => "IP: unknown".to_string(),
            (None, false) => "CONNECTION: unknown".to_string(),
        })
    }
}
