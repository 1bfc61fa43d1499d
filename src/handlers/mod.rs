pub mod blob;
pub mod connection;
pub mod dns;
pub mod file;
pub mod header;
pub mod http;
pub mod info;
pub mod kv;
pub mod sql;
pub mod tcp;

use async_trait::async_trait;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

use crate::clients::blob::AzureBlobConnector;
use crate::clients::kv::RedisConnector;
use crate::error::ProbeError;
use crate::script::Command;

/// Every verb a script line can start with. Matching is exact and
/// case-sensitive: `TCP` is a verb, `tcp` is not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(serialize_all = "UPPERCASE")]
pub enum Verb {
    Http,
    Tcp,
    Blob,
    File,
    Redis,
    Sql,
    Iplookup,
    Nslookup,
    Info,
    Header,
    Connection,
}

/// Outcome of a single step. Failures are information, not errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success(String),
    Failure(String),
}

/// What one executed line produced, and whether it handed the rest of the
/// script to someone else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepResult {
    pub outcome: Outcome,
    pub forwarded: bool,
}

impl StepResult {
    /// The result of a line with nothing to run.
    pub fn noop() -> Self {
        Self {
            outcome: Outcome::Success(String::new()),
            forwarded: false,
        }
    }
}

/// The inbound HTTP request that carried the script, as far as handlers care.
#[derive(Debug, Clone, Default)]
pub struct InboundRequest {
    pub headers: Vec<(String, String)>,
    pub remote: Option<SocketAddr>,
}

impl InboundRequest {
    /// All values of a header, matched case-insensitively.
    pub fn header_values(&self, name: &str) -> Vec<&str> {
        self.headers
            .iter()
            .filter(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
            .collect()
    }
}

/// Per-step view of the run: the lines not yet started and the request.
pub struct StepContext<'a> {
    pub remainder: &'a [String],
    pub request: &'a InboundRequest,
}

impl StepContext<'_> {
    /// The unexecuted lines as a script body.
    pub fn remainder_script(&self) -> String {
        self.remainder.join("\n")
    }
}

/// Something a script line can do. Implement this to add a verb.
#[async_trait]
pub trait Handler: Send + Sync {
    fn verb(&self) -> Verb;

    /// One-line argument synopsis.
    fn usage(&self) -> &str;

    /// Whether running these args hands the remainder of the script to a
    /// peer. Decided before `execute` and independent of its result.
    fn forwards(&self, _args: &[String]) -> bool {
        false
    }

    async fn execute(&self, args: &[String], ctx: &StepContext<'_>) -> Result<String, ProbeError>;
}

/// Settings shared by the built-in handlers.
#[derive(Debug, Clone)]
pub struct HandlerSettings {
    pub connect_timeout: Duration,
}

impl Default for HandlerSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(crate::consts::DEFAULT_CONNECT_TIMEOUT_SECS),
        }
    }
}

/// Verb -> handler table, built once at startup and read-only afterwards.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<Verb, Arc<dyn Handler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// All built-in verbs wired to their production collaborators.
    pub fn builtin(settings: &HandlerSettings) -> Result<Self, ProbeError> {
        let mut registry = Self::new();
        registry.register(Arc::new(http::HttpHandler::new(settings.connect_timeout)?));
        registry.register(Arc::new(tcp::TcpHandler::new(settings.connect_timeout)));
        registry.register(Arc::new(blob::BlobHandler::new(Arc::new(
            AzureBlobConnector::new(settings.connect_timeout)?,
        ))));
        registry.register(Arc::new(file::FileHandler));
        registry.register(Arc::new(kv::RedisHandler::new(Arc::new(RedisConnector))));
        registry.register(Arc::new(sql::SqlHandler));
        registry.register(Arc::new(dns::IpLookupHandler));
        registry.register(Arc::new(dns::NsLookupHandler));
        registry.register(Arc::new(info::InfoHandler));
        registry.register(Arc::new(header::HeaderHandler));
        registry.register(Arc::new(connection::ConnectionHandler));
        Ok(registry)
    }

    /// Add or replace the handler for its verb.
    pub fn register(&mut self, handler: Arc<dyn Handler>) {
        self.handlers.insert(handler.verb(), handler);
    }

    pub fn resolve(&self, verb: &str) -> Option<&Arc<dyn Handler>> {
        let verb = Verb::from_str(verb).ok()?;
        self.handlers.get(&verb)
    }

    /// Whether the command hands the rest of the script onward.
    pub fn forwards(&self, command: &Command) -> bool {
        self.resolve(&command.verb)
            .is_some_and(|h| h.forwards(&command.args))
    }

    /// Run a command. Unknown verbs succeed with empty output.
    pub async fn execute(&self, command: &Command, ctx: &StepContext<'_>) -> Outcome {
        let Some(handler) = self.resolve(&command.verb) else {
            return Outcome::Success(String::new());
        };
        match handler.execute(&command.args, ctx).await {
            Ok(output) => Outcome::Success(output),
            Err(e) => Outcome::Failure(e.to_string()),
        }
    }

    /// Registered verbs with their usage lines, in declaration order.
    pub fn usages(&self) -> Vec<(Verb, String)> {
        Verb::iter()
            .filter_map(|verb| {
                self.handlers
                    .get(&verb)
                    .map(|h| (verb, h.usage().to_string()))
            })
            .collect()
    }
}

/// Positional argument `index`, or a `MissingArg` naming it.
pub(crate) fn required<'a>(
    verb: Verb,
    args: &'a [String],
    index: usize,
    name: &'static str,
) -> Result<&'a str, ProbeError> {
    args.get(index)
        .map(String::as_str)
        .ok_or(ProbeError::MissingArg { verb, name })
}
