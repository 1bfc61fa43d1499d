use async_trait::async_trait;
use std::sync::Arc;

use super::{Handler, StepContext, Verb, required};
use crate::clients::kv::KvConnector;
use crate::error::ProbeError;

/// `REDIS GET <key> <endpoint>` / `REDIS SET <key> <value> <endpoint>`.
pub struct RedisHandler {
    connector: Arc<dyn KvConnector>,
}

impl RedisHandler {
    pub fn new(connector: Arc<dyn KvConnector>) -> Self {
        Self { connector }
    }
}

#[async_trait]
impl Handler for RedisHandler {
    fn verb(&self) -> Verb {
        Verb::Redis
    }

    fn usage(&self) -> &str {
        "GET <key> <endpoint> | SET <key> <value> <endpoint>"
    }

    async fn execute(&self, args: &[String], _ctx: &StepContext<'_>) -> Result<String, ProbeError> {
        let op = required(Verb::Redis, args, 0, "operation")?;
        let key = required(Verb::Redis, args, 1, "key")?;
        match op {
            "GET" => {
                let endpoint = required(Verb::Redis, args, 2, "endpoint")?;
                let mut store = self.connector.connect(endpoint).await?;
                let value = store.get(key).await?.unwrap_or_default();
                Ok(format!("GET: {value}"))
            }
            "SET" => {
                let value = required(Verb::Redis, args, 2, "value")?;
                let endpoint = required(Verb::Redis, args, 3, "endpoint")?;
                let mut store = self.connector.connect(endpoint).await?;
                store.set(key, value).await?;
                Ok(format!("SET: {key}={value}"))
            }
            other => Err(ProbeError::invalid(
                Verb::Redis,
                format!("unsupported operation {other:?} (expected GET or SET)"),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::kv::KeyValueStore;
    use crate::handlers::InboundRequest;
    use crate::handlers::tests::ctx;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Shared map keyed by (endpoint, key).
    #[derive(Default)]
    struct FakeConnector {
        data: Arc<Mutex<HashMap<(String, String), String>>>,
    }

    struct FakeStore {
        endpoint: String,
        data: Arc<Mutex<HashMap<(String, String), String>>>,
    }

    #[async_trait]
    impl KvConnector for FakeConnector {
        async fn connect(&self, endpoint: &str) -> Result<Box<dyn KeyValueStore>, ProbeError> {
            if endpoint == "down:6379" {
                return Err(ProbeError::KeyValue("Connection refused (os error 111)".to_string()));
            }
            Ok(Box::new(FakeStore {
                endpoint: endpoint.to_string(),
                data: Arc::clone(&self.data),
            }))
        }
    }

    #[async_trait]
    impl KeyValueStore for FakeStore {
        async fn get(&mut self, key: &str) -> Result<Option<String>, ProbeError> {
            let data = self.data.lock().unwrap();
            Ok(data.get(&(self.endpoint.clone(), key.to_string())).cloned())
        }

        async fn set(&mut self, key: &str, value: &str) -> Result<(), ProbeError> {
            self.data
                .lock()
                .unwrap()
                .insert((self.endpoint.clone(), key.to_string()), value.to_string());
            Ok(())
        }
    }

    async fn run(handler: &RedisHandler, parts: &[&str]) -> Result<String, ProbeError> {
        let args: Vec<String> = parts.iter().map(|s| s.to_string()).collect();
        let request = InboundRequest::default();
        handler.execute(&args, &ctx(&[], &request)).await
    }

    #[tokio::test]
    async fn set_then_get() {
        let handler = RedisHandler::new(Arc::new(FakeConnector::default()));
        assert_eq!(
            run(&handler, &["SET", "probe", "hop-1", "cache:6379"]).await.unwrap(),
            "SET: probe=hop-1"
        );
        assert_eq!(
            run(&handler, &["GET", "probe", "cache:6379"]).await.unwrap(),
            "GET: hop-1"
        );
    }

    #[tokio::test]
    async fn missing_key_reads_as_empty() {
        let handler = RedisHandler::new(Arc::new(FakeConnector::default()));
        assert_eq!(run(&handler, &["GET", "nothing", "cache:6379"]).await.unwrap(), "GET: ");
    }

    #[tokio::test]
    async fn connection_failure_is_reported() {
        let handler = RedisHandler::new(Arc::new(FakeConnector::default()));
        let err = run(&handler, &["GET", "k", "down:6379"]).await.unwrap_err();
        assert!(err.to_string().starts_with("key-value store error: Connection refused"));
    }

    #[tokio::test]
    async fn set_needs_endpoint_after_value() {
        let handler = RedisHandler::new(Arc::new(FakeConnector::default()));
        let err = run(&handler, &["SET", "k", "v"]).await.unwrap_err();
        assert_eq!(err.to_string(), "REDIS: missing argument <endpoint>");
    }
}
