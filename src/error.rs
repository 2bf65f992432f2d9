use crate::error_kind::ErrorKind;
use thiserror::Error;

/// What a configuration error rejected.
///
/// `setting` names the builder setting or request part (`"base_url"`,
/// `"proxy_url"`, `"url"`, `"headers.<name>"`), `value` is the input as given
/// and `reason` is what the parser reported.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorContext {
    pub setting: Option<String>,
    pub value: Option<String>,
    pub reason: Option<String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_setting(mut self, setting: impl Into<String>) -> Self {
        self.setting = Some(setting.into());
        self
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

/// Unified error type for fetch-cache.
///
/// Every variant is `Clone` so an error can be stored inside a published
/// [`RequestState`](crate::query::RequestState) and handed to any number of
/// subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The request never produced a response (DNS, refused connection, reset, timeout).
    #[error("Network error: {message}")]
    Network { message: String },

    /// The server answered with a status outside 2xx.
    #[error("HTTP error: status {status}: {message}")]
    Http { status: u16, message: String },

    /// The response body was not valid JSON (or did not match the requested type).
    #[error("Parse error: {message}")]
    Parse { message: String },

    /// The request was superseded or its consumer went away. Not user-visible.
    #[error("Request cancelled")]
    Cancelled,

    #[error("Configuration error: {message}{}", format_context(.context))]
    Configuration {
        message: String,
        context: ErrorContext,
    },
}

fn format_context(ctx: &ErrorContext) -> String {
    let parts: Vec<String> = [
        ("setting", &ctx.setting),
        ("value", &ctx.value),
        ("reason", &ctx.reason),
    ]
    .into_iter()
    .filter_map(|(label, part)| part.as_ref().map(|p| format!("{}: {}", label, p)))
    .collect();
    if parts.is_empty() {
        String::new()
    } else {
        format!(" ({})", parts.join(", "))
    }
}

impl Error {
    pub fn network(msg: impl Into<String>) -> Self {
        Error::Network {
            message: msg.into(),
        }
    }

    pub fn http(status: u16, msg: impl Into<String>) -> Self {
        Error::Http {
            status,
            message: msg.into(),
        }
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Error::Parse {
            message: msg.into(),
        }
    }

    pub fn configuration_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Configuration {
            message: msg.into(),
            context,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Network { .. } => ErrorKind::Network,
            Error::Http { .. } => ErrorKind::Http,
            Error::Parse { .. } => ErrorKind::Parse,
            Error::Cancelled => ErrorKind::Cancelled,
            Error::Configuration { .. } => ErrorKind::Configuration,
        }
    }

    /// HTTP status carried by an [`Error::Http`].
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }

    /// Whether a consumer should render this error. Only cancellation is silent.
    pub fn is_user_visible(&self) -> bool {
        self.kind().is_user_visible()
    }

    /// Context of an [`Error::Configuration`].
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            Error::Configuration { context, .. } => Some(context),
            _ => None,
        }
    }
}

/// Errors from `send()` and body reads. A status is only attached by
/// `error_for_status`, so transport failures and timeouts land in `Network`.
impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if let Some(status) = e.status() {
            return Error::http(status.as_u16(), e.to_string());
        }
        if e.is_decode() {
            return Error::parse(e.to_string());
        }
        Error::network(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::parse(e.to_string())
    }
}
