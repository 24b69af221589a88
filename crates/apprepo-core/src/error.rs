use apprepo_manifest::ManifestError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::store::StoreError;

/// Wire code carried by a declined install prompt.
pub const DENIED_CODE: &str = "denied";
pub const DENIED_MESSAGE: &str = "User denied installation request";

/// Failures reported by registry operations.
///
/// Each variant maps to a stable camelCase code used in the
/// `{"error": [code, message]}` wire form; see [`RegistryError::code`].
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("install requires a url or manifest argument")]
    MissingManifest,
    #[error("couldn't validate your manifest: {0}")]
    InvalidManifest(#[source] ManifestError),
    #[error("couldn't retrieve application manifest from network")]
    NetworkError { url: String },
    #[error("couldn't parse manifest JSON from {url}")]
    ManifestParseError {
        url: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("no application exists with the id: {key}")]
    NoSuchApplication { key: String },
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl RegistryError {
    pub fn code(&self) -> &'static str {
        match self {
            RegistryError::MissingManifest => "missingManifest",
            RegistryError::InvalidManifest(_) => "invalidManifest",
            RegistryError::NetworkError { .. } => "networkError",
            RegistryError::ManifestParseError { .. } => "manifestParseError",
            RegistryError::NoSuchApplication { .. } => "noSuchApplication",
            RegistryError::Store(_) => "storeError",
        }
    }

    pub fn to_payload(&self) -> ErrorPayload {
        ErrorPayload::new(self.code(), self.to_string())
    }

    pub fn to_wire(&self) -> Value {
        self.to_payload().to_value()
    }
}

/// `{"error": [code, message]}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub error: (String, String),
}

impl ErrorPayload {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: (code.into(), message.into()),
        }
    }

    pub fn denied() -> Self {
        Self::new(DENIED_CODE, DENIED_MESSAGE)
    }

    pub fn code(&self) -> &str {
        &self.error.0
    }

    pub fn message(&self) -> &str {
        &self.error.1
    }

    pub fn to_value(&self) -> Value {
        serde_json::json!({ "error": [self.error.0, self.error.1] })
    }
}
