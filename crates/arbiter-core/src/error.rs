use core::result::Result as CoreResult;
use std::io::Error as IoError;

use reqwest::Error as ReqwestError;
use serde_json::Error as SerdeJsonError;
use thiserror::Error;
use toml::de::Error as TomlError;

/// Result alias used across the workspace for core failures.
pub type Result<T> = CoreResult<T, Error>;

/// Failures shared by every layer: transport, serialization, configuration,
/// and provider-reported errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Filesystem access failed, usually while reading or writing config.
    #[error("io error: {0}")]
    Io(#[from] IoError),

    /// The HTTP transport failed before a response arrived.
    #[error("http error: {0}")]
    Request(#[from] ReqwestError),

    /// A JSON body could not be produced or interpreted.
    #[error("json error: {0}")]
    Json(#[from] SerdeJsonError),

    /// The configuration file is not valid TOML.
    #[error("config parse error: {0}")]
    Toml(#[from] TomlError),

    /// The configuration is structurally valid but unusable.
    #[error("configuration error: {0}")]
    Config(String),

    /// A provider reported a failure while serving a call.
    #[error("provider failure: {0}")]
    Provider(String),

    /// No API key available for a vendor that requires one.
    #[error("no API key available: {0}")]
    MissingApiKey(String),

    /// A provider answered with a body this client cannot use.
    #[error("unexpected provider response: {0}")]
    InvalidResponse(String),

    /// Anything without a better home.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether retrying the same operation could plausibly succeed.
    ///
    /// Transport failures and provider-side failures are transient; config
    /// and parse failures are not.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Request(_) | Self::Provider(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value as JsonValue;
    use std::io;

    #[test]
    fn test_display_messages() {
        assert_eq!(
            Error::Provider("model overloaded".to_owned()).to_string(),
            "provider failure: model overloaded"
        );
        assert_eq!(
            Error::MissingApiKey("OPENAI_API_KEY".to_owned()).to_string(),
            "no API key available: OPENAI_API_KEY"
        );
        assert_eq!(
            Error::InvalidResponse("empty choices".to_owned()).to_string(),
            "unexpected provider response: empty choices"
        );
        assert_eq!(Error::Other("plain".to_owned()).to_string(), "plain");
    }

    #[test]
    fn test_retryable_split() {
        assert!(Error::Provider("overloaded".to_owned()).is_retryable());

        assert!(!Error::Config("missing section".to_owned()).is_retryable());
        assert!(!Error::MissingApiKey("KEY".to_owned()).is_retryable());
        assert!(!Error::InvalidResponse("bad body".to_owned()).is_retryable());
        assert!(!Error::Other("misc".to_owned()).is_retryable());
    }

    #[test]
    fn test_from_conversions() {
        let from_io: Error = io::Error::new(io::ErrorKind::PermissionDenied, "locked").into();
        assert!(matches!(from_io, Error::Io(_)));
        assert!(!from_io.is_retryable());

        let from_json: Error = serde_json::from_str::<JsonValue>("{not json").unwrap_err().into();
        assert!(matches!(from_json, Error::Json(_)));

        let from_toml: Error = toml::from_str::<toml::Value>("= broken").unwrap_err().into();
        assert!(matches!(from_toml, Error::Toml(_)));
    }
}
