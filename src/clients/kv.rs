use async_trait::async_trait;
use redis::AsyncCommands;
use url::Url;

use crate::error::ProbeError;

const DEFAULT_PORT: u16 = 6379;

/// Opens a key-value store connection for an endpoint.
#[async_trait]
pub trait KvConnector: Send + Sync {
    async fn connect(&self, endpoint: &str) -> Result<Box<dyn KeyValueStore>, ProbeError>;
}

#[async_trait]
pub trait KeyValueStore: Send {
    async fn get(&mut self, key: &str) -> Result<Option<String>, ProbeError>;
    async fn set(&mut self, key: &str, value: &str) -> Result<(), ProbeError>;
}

/// Connects to Redis.
pub struct RedisConnector;

#[async_trait]
impl KvConnector for RedisConnector {
    async fn connect(&self, endpoint: &str) -> Result<Box<dyn KeyValueStore>, ProbeError> {
        let client = redis::Client::open(redis_url(endpoint)?)?;
        let conn = client.get_multiplexed_async_connection().await?;
        Ok(Box::new(RedisStore { conn }))
    }
}

struct RedisStore {
    conn: redis::aio::MultiplexedConnection,
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn get(&mut self, key: &str) -> Result<Option<String>, ProbeError> {
        Ok(self.conn.get(key).await?)
    }

    async fn set(&mut self, key: &str, value: &str) -> Result<(), ProbeError> {
        let _: () = self.conn.set(key, value).await?;
        Ok(())
    }
}

/// Normalise an endpoint into a `redis://` URL.
///
/// URLs pass through unchanged. Otherwise the endpoint is read as
/// `host[:port][,password=..][,user=..][,ssl=true][,defaultDatabase=N]`;
/// other options are ignored.
pub fn redis_url(endpoint: &str) -> Result<String, ProbeError> {
    if endpoint.contains("://") {
        return Ok(endpoint.to_string());
    }

    let mut parts = endpoint.split(',').map(str::trim);
    let host = parts
        .next()
        .filter(|h| !h.is_empty())
        .ok_or_else(|| ProbeError::KeyValue("empty endpoint".to_string()))?;

    let mut password = None;
    let mut user = None;
    let mut tls = false;
    let mut database = None;
    for option in parts {
        let Some((key, value)) = option.split_once('=') else {
            continue;
        };
        match key.trim().to_ascii_lowercase().as_str() {
            "password" => password = Some(value),
            "user" => user = Some(value),
            "ssl" => tls = value.eq_ignore_ascii_case("true"),
            "defaultdatabase" => database = Some(value),
            _ => {}
        }
    }

    let scheme = if tls { "rediss" } else { "redis" };
    let host = if host.contains(':') {
        host.to_string()
    } else {
        format!("{host}:{DEFAULT_PORT}")
    };
    let mut url = Url::parse(&format!("{scheme}://{host}"))
        .map_err(|e| ProbeError::KeyValue(format!("endpoint {endpoint:?}: {e}")))?;
    if let Some(user) = user {
        url.set_username(user)
            .map_err(|_| ProbeError::KeyValue("user not allowed for this endpoint".to_string()))?;
    }
    if let Some(password) = password {
        url.set_password(Some(password))
            .map_err(|_| ProbeError::KeyValue("password not allowed for this endpoint".to_string()))?;
    }
    if let Some(db) = database {
        url.set_path(db);
    }
    Ok(url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_pass_through() {
        assert_eq!(
            redis_url("rediss://:pw@cache:6380/2").unwrap(),
            "rediss://:pw@cache:6380/2"
        );
    }

    #[test]
    fn bare_host_gets_default_port() {
        assert_eq!(redis_url("cache").unwrap(), "redis://cache:6379");
    }

    #[test]
    fn option_list_is_translated() {
        assert_eq!(
            redis_url("cache.example.net:6380,password=p@ss,ssl=True,abortConnect=False").unwrap(),
            "rediss://:p%40ss@cache.example.net:6380"
        );
    }

    #[test]
    fn database_and_user_are_applied() {
        assert_eq!(
            redis_url("localhost:6379,user=probe,password=x,defaultDatabase=3").unwrap(),
            "redis://probe:x@localhost:6379/3"
        );
    }

    #[test]
    fn tls_endpoints_open_a_tls_client() {
        for endpoint in ["cache.example.net:6380,password=p,ssl=True", "rediss://cache:6380"] {
            let client = redis::Client::open(redis_url(endpoint).unwrap()).unwrap();
            assert!(
                matches!(
                    client.get_connection_info().addr,
                    redis::ConnectionAddr::TcpTls { port: 6380, .. }
                ),
                "{endpoint} did not select TLS"
            );
        }
    }

    #[test]
    fn empty_endpoint_is_rejected() {
        assert!(redis_url("").is_err());
        assert!(redis_url(",password=x").is_err());
    }
}
