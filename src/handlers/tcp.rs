use async_trait::async_trait;
use std::time::Duration;
use tokio::net::TcpStream;

use super::{Handler, StepContext, Verb, required};
use crate::error::ProbeError;

/// `TCP <host> <port>`: open a connection and close it again.
pub struct TcpHandler {
    connect_timeout: Duration,
}

impl TcpHandler {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

#[async_trait]
impl Handler for TcpHandler {
    fn verb(&self) -> Verb {
        Verb::Tcp
    }

    fn usage(&self) -> &str {
        "<host> <port>"
    }

    async fn execute(&self, args: &[String], _ctx: &StepContext<'_>) -> Result<String, ProbeError> {
        let host = required(Verb::Tcp, args, 0, "host")?;
        let port: u16 = required(Verb::Tcp, args, 1, "port")?
            .parse()
            .map_err(|e| ProbeError::invalid(Verb::Tcp, format!("port: {e}")))?;
        let target = format!("{host}:{port}");

        match tokio::time::timeout(self.connect_timeout, TcpStream::connect((host, port))).await {
            Ok(Ok(_stream)) => Ok("OK".to_string()),
            Ok(Err(source)) => Err(ProbeError::Connect { target, source }),
            Err(_) => Err(ProbeError::Timeout(self.connect_timeout)),
        }
    }
}
