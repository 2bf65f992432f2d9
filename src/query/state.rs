use crate::cache::CacheKey;
use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Status {
    #[default]
    Idle,
    Loading,
    Success,
    Error,
}

/// The `{ status, data, error }` view a consumer renders.
///
/// Exactly one status holds: `data` is only set for `Success`, `error` only
/// for `Error`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RequestState {
    status: Status,
    data: Option<Value>,
    error: Option<Error>,
    key: Option<CacheKey>,
    from_cache: bool,
}

impl RequestState {
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn loading(key: CacheKey) -> Self {
        Self {
            status: Status::Loading,
            key: Some(key),
            ..Default::default()
        }
    }

    pub fn success(key: CacheKey, data: Value, from_cache: bool) -> Self {
        Self {
            status: Status::Success,
            data: Some(data),
            key: Some(key),
            from_cache,
            ..Default::default()
        }
    }

    pub fn failed(key: CacheKey, error: Error) -> Self {
        Self {
            status: Status::Error,
            error: Some(error),
            key: Some(key),
            ..Default::default()
        }
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    pub fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    /// Key of the request this state belongs to; `None` while idle.
    pub fn key(&self) -> Option<&CacheKey> {
        self.key.as_ref()
    }

    pub fn is_from_cache(&self) -> bool {
        self.from_cache
    }

    pub fn is_loading(&self) -> bool {
        self.status == Status::Loading
    }

    /// `Success` and `Error` are stable until the next request.
    pub fn is_settled(&self) -> bool {
        matches!(self.status, Status::Success | Status::Error)
    }

    /// Deserialize the payload into `T`.
    pub fn data_as<T: DeserializeOwned>(&self) -> Result<Option<T>> {
        self.data
            .as_ref()
            .map(|v| serde_json::from_value(v.clone()).map_err(Error::from))
            .transpose()
    }
}
