use super::{FetchRequest, Transport};
use crate::{Error, ErrorContext, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT};
use reqwest::Proxy;
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn, Instrument};
use url::Url;

const REQUEST_ID_HEADER: &str = "x-request-id";

#[derive(Debug, Clone)]
pub struct HttpTransportConfig {
    /// Prefix for relative request URLs.
    pub base_url: Option<String>,
    pub timeout: Duration,
    pub pool_max_idle_per_host: usize,
    pub pool_idle_timeout: Duration,
    pub proxy_url: Option<String>,
    /// Sent with every request; per-request headers win on conflict.
    pub default_headers: BTreeMap<String, String>,
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout: Duration::from_secs(30),
            pool_max_idle_per_host: 32,
            pool_idle_timeout: Duration::from_secs(90),
            proxy_url: None,
            default_headers: BTreeMap::new(),
        }
    }
}

pub struct HttpTransport {
    client: reqwest::Client,
    base_url: Option<Url>,
}

impl HttpTransport {
    pub fn new(config: &HttpTransportConfig) -> Result<Self> {
        let base_url = config
            .base_url
            .as_deref()
            .map(parse_base_url)
            .transpose()?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        for (name, value) in &config.default_headers {
            let (name, value) = header_pair(name, value)?;
            headers.insert(name, value);
        }

        let mut builder = reqwest::Client::builder()
            .timeout(config.timeout)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .pool_idle_timeout(Some(config.pool_idle_timeout))
            .default_headers(headers);

        if let Some(proxy_url) = &config.proxy_url {
            let proxy = Proxy::all(proxy_url)
                .map_err(|e| rejected("invalid proxy URL", "proxy_url", proxy_url, e))?;
            builder = builder.proxy(proxy);
        }

        let client = builder.build().map_err(|e| {
            Error::configuration_with_context(
                "failed to build HTTP client",
                ErrorContext::new().with_reason(e.to_string()),
            )
        })?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> Option<&Url> {
        self.base_url.as_ref()
    }

    fn resolve_url(&self, raw: &str) -> Result<Url> {
        match Url::parse(raw) {
            Ok(url) => Ok(url),
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                let base = self.base_url.as_ref().ok_or_else(|| {
                    Error::configuration_with_context(
                        "relative URL requires a base URL",
                        ErrorContext::new().with_setting("base_url").with_value(raw),
                    )
                })?;
                base.join(raw.trim_start_matches('/'))
                    .map_err(|e| rejected("invalid request URL", "url", raw, e))
            }
            Err(e) => Err(rejected("invalid request URL", "url", raw, e)),
        }
    }

    async fn send(&self, request: &FetchRequest, request_id: &str) -> Result<Value> {
        let url = self.resolve_url(&request.url)?;
        let options = &request.options;

        let mut builder = self
            .client
            .request(options.method.into(), url)
            .header(REQUEST_ID_HEADER, request_id);
        for (name, value) in &options.headers {
            let (name, value) = header_pair(name, value)?;
            builder = builder.header(name, value);
        }
        if !options.query.is_empty() {
            builder = builder.query(&options.query);
        }
        if let Some(body) = &options.body {
            builder = builder.json(body);
        }

        let started = Instant::now();
        let response = builder.send().await.map_err(|e| {
            warn!(error = %e, timeout = e.is_timeout(), "request failed before a response arrived");
            Error::from(e)
        })?;
        let status = response.status();
        let text = response.text().await?;
        debug!(
            status = status.as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            bytes = text.len(),
            "response received"
        );

        if !status.is_success() {
            let reason = status.canonical_reason().unwrap_or("unknown status");
            return Err(Error::http(status.as_u16(), error_message(&text, reason)));
        }
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: &FetchRequest, cancel: &CancellationToken) -> Result<Value> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        let request_id = uuid::Uuid::new_v4().to_string();
        let span = tracing::debug_span!(
            "fetch",
            request_id = %request_id,
            method = %request.method(),
            url = %request.url
        );

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(Error::Cancelled),
            r = self.send(request, &request_id).instrument(span) => r,
        };
        // A result that lands after the token fired is still stale.
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        result
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

/// Prefer a message the server put in its JSON error body.
fn error_message(body: &str, fallback: &str) -> String {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let from_body = parsed.as_ref().and_then(|v| {
        v.get("message")
            .or_else(|| v.pointer("/error/message"))
            .or_else(|| v.get("error"))
            .and_then(Value::as_str)
            .map(str::to_string)
    });
    from_body.unwrap_or_else(|| fallback.to_string())
}

fn parse_base_url(raw: &str) -> Result<Url> {
    // Url::join drops the last path segment unless it ends with '/'
    let normalized = if raw.ends_with('/') {
        raw.to_string()
    } else {
        format!("{}/", raw)
    };
    Url::parse(&normalized).map_err(|e| rejected("invalid base URL", "base_url", raw, e))
}

fn header_pair(name: &str, value: &str) -> Result<(HeaderName, HeaderValue)> {
    let setting = format!("headers.{}", name);
    let header_name = HeaderName::from_bytes(name.as_bytes())
        .map_err(|e| rejected("invalid header name", &setting, name, e))?;
    let header_value = HeaderValue::from_str(value)
        .map_err(|e| rejected("invalid header value", &setting, value, e))?;
    Ok((header_name, header_value))
}

fn rejected(message: &str, setting: &str, value: &str, reason: impl std::fmt::Display) -> Error {
    Error::configuration_with_context(
        message,
        ErrorContext::new()
            .with_setting(setting)
            .with_value(value)
            .with_reason(reason.to_string()),
    )
}
