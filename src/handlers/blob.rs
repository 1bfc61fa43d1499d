use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::sync::Arc;

use super::{Handler, StepContext, Verb, required};
use crate::clients::blob::BlobConnector;
use crate::error::ProbeError;

/// `BLOB GET <container> <blob> <endpoint>` /
/// `BLOB PUT <container> <blob> <endpoint> <value>`.
pub struct BlobHandler {
    connector: Arc<dyn BlobConnector>,
}

impl BlobHandler {
    pub fn new(connector: Arc<dyn BlobConnector>) -> Self {
        Self { connector }
    }
}

/// Blob contents as transcript text. Binary data is shown as base64.
pub(crate) fn render_bytes(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => format!("base64:{}", STANDARD.encode(e.as_bytes())),
    }
}

#[async_trait]
impl Handler for BlobHandler {
    fn verb(&self) -> Verb {
        Verb::Blob
    }

    fn usage(&self) -> &str {
        "GET <container> <blob> <endpoint> | PUT <container> <blob> <endpoint> <value>"
    }

    async fn execute(&self, args: &[String], _ctx: &StepContext<'_>) -> Result<String, ProbeError> {
        let op = required(Verb::Blob, args, 0, "operation")?;
        let container = required(Verb::Blob, args, 1, "container")?;
        let blob = required(Verb::Blob, args, 2, "blob")?;
        let endpoint = required(Verb::Blob, args, 3, "endpoint")?;

        match op {
            "GET" => {
                let store = self.connector.open(endpoint, container)?;
                store.ensure_exists().await?;
                Ok(render_bytes(store.get(blob).await?))
            }
            "PUT" => {
                let value = required(Verb::Blob, args, 4, "value")?;
                let store = self.connector.open(endpoint, container)?;
                store.ensure_exists().await?;
                store.delete(blob).await?;
                let etag = store.put(blob, value.as_bytes().to_vec()).await?;
                Ok(format!("Wrote {etag}"))
            }
            other => Err(ProbeError::invalid(
                Verb::Blob,
                format!("unsupported operation {other:?} (expected GET or PUT)"),
            )),
        }
    }
}
