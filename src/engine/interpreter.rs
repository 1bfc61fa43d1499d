use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::transcript::Transcript;
use super::{Engine, Halt};
use crate::consts::EMPTY_SCRIPT_RESPONSE;
use crate::error::ProbeError;
use crate::handlers::{HandlerRegistry, InboundRequest, Outcome, StepContext, StepResult};
use crate::script::{Command, split_script};

/// What a run did: the transcript, how it stopped, and how many lines it
/// started.
#[derive(Debug)]
pub struct RunReport {
    pub transcript: Transcript,
    pub halt: Halt,
    pub executed: usize,
}

/// Runs scripts one line at a time against a handler registry.
pub struct Interpreter {
    registry: Arc<HandlerRegistry>,
    step_timeout: Duration,
}

impl Interpreter {
    pub fn new(registry: Arc<HandlerRegistry>, step_timeout: Duration) -> Self {
        Self {
            registry,
            step_timeout,
        }
    }

    /// Execute `lines` in order until they run out or a step forwards.
    pub async fn run_script(
        &self,
        started: Instant,
        lines: &[String],
        request: &InboundRequest,
    ) -> RunReport {
        info!(lines = lines.len(), "running script");
        let mut transcript = Transcript::new(started);
        let mut cursor = lines;

        let halt = loop {
            let Some((line, remainder)) = cursor.split_first() else {
                break Halt::Exhausted;
            };

            transcript.begin(line);
            let result = self.execute_step(line, remainder, request).await;
            transcript.finish(line, &result.outcome);
            cursor = remainder;

            if result.forwarded {
                info!(forwarded_lines = remainder.len(), "remainder handed to peer");
                break Halt::Forwarded;
            }
        };

        let executed = transcript.steps();
        debug!(?halt, executed, "script finished");
        RunReport {
            transcript,
            halt,
            executed,
        }
    }

    /// Run one line. A line without tokens does nothing and continues.
    async fn execute_step(
        &self,
        line: &str,
        remainder: &[String],
        request: &InboundRequest,
    ) -> StepResult {
        let Some(command) = Command::parse(line) else {
            return StepResult::noop();
        };

        // Decided up front so a failed or timed-out forward still stops here.
        let forwarded = self.registry.forwards(&command);
        let ctx = StepContext { remainder, request };
        let step_started = Instant::now();

        let outcome = match tokio::time::timeout(
            self.step_timeout,
            self.registry.execute(&command, &ctx),
        )
        .await
        {
            Ok(outcome) => outcome,
            Err(_) => Outcome::Failure(ProbeError::Timeout(self.step_timeout).to_string()),
        };

        match &outcome {
            Outcome::Success(_) => debug!(
                verb = %command.verb,
                elapsed_ms = step_started.elapsed().as_millis() as u64,
                "step ok"
            ),
            Outcome::Failure(detail) => warn!(verb = %command.verb, %detail, "step failed"),
        }

        StepResult { outcome, forwarded }
    }
}

#[async_trait]
impl Engine for Interpreter {
    async fn run(&self, body: &str, request: &InboundRequest) -> String {
        let started = Instant::now();
        let lines = split_script(body);
        if lines.is_empty() {
            return EMPTY_SCRIPT_RESPONSE.to_string();
        }
        self.run_script(started, &lines, request)
            .await
            .transcript
            .render()
    }
}
