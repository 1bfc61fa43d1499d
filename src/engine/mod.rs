pub mod interpreter;
pub mod transcript;

use async_trait::async_trait;

use crate::handlers::InboundRequest;

/// The outermost boundary. The transport only knows this trait.
#[async_trait]
pub trait Engine: Send + Sync {
    /// Run a request body as a script and return the response text.
    async fn run(&self, body: &str, request: &InboundRequest) -> String;
}

/// Why a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Halt {
    /// Every line was started locally.
    Exhausted,
    /// A step handed the remaining lines to a peer.
    Forwarded,
}
