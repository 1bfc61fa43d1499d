use std::time::Instant;

use crate::handlers::Outcome;

/// Append-only record of the steps a run started.
///
/// Each step is a block:
///
/// ```text
/// -> Start: <line>
/// <output lines, if any>
/// <- End: <line> <ms since request start>ms
/// ```
///
/// Blocks are separated by a blank line.
#[derive(Debug)]
pub struct Transcript {
    started: Instant,
    blocks: Vec<String>,
}

impl Transcript {
    pub fn new(started: Instant) -> Self {
        Self {
            started,
            blocks: Vec::new(),
        }
    }

    /// Open a block for `line`.
    pub fn begin(&mut self, line: &str) {
        self.blocks.push(format!("-> Start: {line}\n"));
    }

    /// Close the open block with the step's output and the end marker.
    pub fn finish(&mut self, line: &str, outcome: &Outcome) {
        let elapsed_ms = self.started.elapsed().as_secs_f64() * 1000.0;
        let Some(block) = self.blocks.last_mut() else {
            return;
        };
        let text = match outcome {
            Outcome::Success(out) => out.trim_end_matches(['\r', '\n']).to_string(),
            Outcome::Failure(detail) => format!("ERROR: {detail}"),
        };
        if !text.is_empty() {
            block.push_str(&text);
            block.push('\n');
        }
        block.push_str(&format!("<- End: {line} {elapsed_ms:.2}ms\n"));
    }

    /// Number of steps started.
    pub fn steps(&self) -> usize {
        self.blocks.len()
    }

    pub fn render(&self) -> String {
        self.blocks.join("\n")
    }
}
