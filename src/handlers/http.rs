use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use std::time::Duration;
use tracing::info;

use super::{Handler, StepContext, Verb, required};
use crate::error::ProbeError;

const USER_AGENT: &str = concat!("relayprobe/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Method {
    Get,
    Post,
}

impl Method {
    fn parse(s: &str) -> Result<Self, ProbeError> {
        match s {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            other => Err(ProbeError::invalid(
                Verb::Http,
                format!("unsupported method {other:?} (expected GET or POST)"),
            )),
        }
    }
}

/// `HTTP GET <url> [headers]` / `HTTP POST <url> [headers]`.
///
/// POST sends every line after this one as the request body, so the peer
/// runs the rest of the script and its transcript becomes this step's output.
pub struct HttpHandler {
    client: reqwest::Client,
}

impl HttpHandler {
    /// The client is shared but never mutated; headers are built per call.
    pub fn new(connect_timeout: Duration) -> Result<Self, ProbeError> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { client })
    }
}

/// Parse `k=v|k2=v2` into a header map. Empty segments are skipped.
fn parse_headers(list: &str) -> Result<HeaderMap, ProbeError> {
    let mut headers = HeaderMap::new();
    for pair in list.split('|').filter(|p| !p.is_empty()) {
        let (name, value) = pair
            .split_once('=')
            .ok_or_else(|| ProbeError::invalid(Verb::Http, format!("header {pair:?} is not key=value")))?;
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| ProbeError::invalid(Verb::Http, format!("header name {name:?}: {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| ProbeError::invalid(Verb::Http, format!("header value {value:?}: {e}")))?;
        headers.append(name, value);
    }
    Ok(headers)
}

#[async_trait]
impl Handler for HttpHandler {
    fn verb(&self) -> Verb {
        Verb::Http
    }

    fn usage(&self) -> &str {
        "GET|POST <url> [\"name=value|name=value\"]  (POST forwards the rest of the script)"
    }

    fn forwards(&self, args: &[String]) -> bool {
        args.first().is_some_and(|m| m == "POST")
    }

    async fn execute(&self, args: &[String], ctx: &StepContext<'_>) -> Result<String, ProbeError> {
        let method = Method::parse(required(Verb::Http, args, 0, "method")?)?;
        let url = required(Verb::Http, args, 1, "url")?;
        let headers = match args.get(2) {
            Some(list) => parse_headers(list)?,
            None => HeaderMap::new(),
        };

        let request = match method {
            Method::Get => self.client.get(url),
            Method::Post => {
                info!(url, lines = ctx.remainder.len(), "forwarding remainder");
                self.client
                    .post(url)
                    .header(CONTENT_TYPE, "text/plain; charset=utf-8")
                    .body(ctx.remainder_script())
            }
        };

        let response = request.headers(headers).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response.text().await?);
        }

        // Error bodies are best-effort.
        let body = response.text().await.unwrap_or_default();
        Ok(format!(
            "{} {} {}",
            status.as_u16(),
            status.canonical_reason().unwrap_or(""),
            body
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::InboundRequest;
    use crate::handlers::tests::ctx;

    fn args(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn only_post_forwards() {
        let handler = HttpHandler::new(Duration::from_secs(1)).unwrap();
        assert!(handler.forwards(&args(&["POST", "http://peer"])));
        assert!(!handler.forwards(&args(&["GET", "http://peer"])));
        assert!(!handler.forwards(&args(&["post", "http://peer"])));
        assert!(!handler.forwards(&[]));
    }

    #[test]
    fn header_list_is_split_on_pipes_and_first_equals() {
        let headers = parse_headers("a=1|b=x=y||").unwrap();
        assert_eq!(headers.len(), 2);
        assert_eq!(headers["a"], "1");
        assert_eq!(headers["b"], "x=y");
    }

    #[test]
    fn header_without_equals_is_rejected() {
        let err = parse_headers("a=1|broken").unwrap_err();
        assert!(err.to_string().contains("broken"));
    }

    #[tokio::test]
    async fn unsupported_method_fails_before_any_request() {
        let handler = HttpHandler::new(Duration::from_secs(1)).unwrap();
        let request = InboundRequest::default();
        let err = handler
            .execute(&args(&["DELETE", "http://127.0.0.1:1"]), &ctx(&[], &request))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("unsupported method"));
    }

    #[tokio::test]
    async fn missing_url_is_reported() {
        let handler = HttpHandler::new(Duration::from_secs(1)).unwrap();
        let request = InboundRequest::default();
        let err = handler
            .execute(&args(&["GET"]), &ctx(&[], &request))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "HTTP: missing argument <url>");
    }
}
