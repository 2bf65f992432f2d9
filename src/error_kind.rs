//! Error kinds: the stable, data-free classification of every [`Error`](crate::Error).
//!
//! | Code  | Name            | User-visible | Meaning                                   |
//! |-------|-----------------|--------------|-------------------------------------------|
//! | F1001 | `network`       | yes          | transport failure, no response received   |
//! | F1002 | `http`          | yes          | server responded with a non-2xx status    |
//! | F1003 | `parse`         | yes          | response body is not the expected JSON    |
//! | F2001 | `cancelled`     | no           | request superseded or consumer torn down  |
//! | F9001 | `configuration` | yes          | client could not be built                 |
//!
//! ## Example
//!
//! ```rust
//! use fetch_cache::error_kind::ErrorKind;
//!
//! let kind = ErrorKind::from_name("cancelled").unwrap();
//! assert_eq!(kind.code(), "F2001");
//! assert!(!kind.is_user_visible());
//! ```

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Network,
    Http,
    Parse,
    Cancelled,
    Configuration,
}

impl ErrorKind {
    /// Returns the stable code string (e.g., `"F1002"`).
    #[inline]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Network => "F1001",
            Self::Http => "F1002",
            Self::Parse => "F1003",
            Self::Cancelled => "F2001",
            Self::Configuration => "F9001",
        }
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Http => "http",
            Self::Parse => "parse",
            Self::Cancelled => "cancelled",
            Self::Configuration => "configuration",
        }
    }

    /// Cancelled requests mean "no update", never a failure to show.
    #[inline]
    pub fn is_user_visible(&self) -> bool {
        !matches!(self, Self::Cancelled)
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let kind = match name {
            "network" => Self::Network,
            "http" => Self::Http,
            "parse" => Self::Parse,
            "cancelled" | "canceled" => Self::Cancelled,
            "configuration" => Self::Configuration,
            _ => return None,
        };
        Some(kind)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
