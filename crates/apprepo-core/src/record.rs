use apprepo_manifest::{ManifestError, ManifestValidator, WebAppManifest};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::store::StoreError;

/// A confirmed installation, stored under its launch key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstallRecord {
    pub app: WebAppManifest,
    /// Milliseconds since the Unix epoch at confirmation.
    #[serde(rename = "installTime")]
    pub install_time: i64,
    /// Origin that asked for the installation.
    #[serde(rename = "installURL")]
    pub install_url: String,
    #[serde(
        rename = "authorizationURL",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub authorization_url: Option<String>,
}

impl InstallRecord {
    pub fn key(&self) -> String {
        self.app.launch_url()
    }

    pub(crate) fn encode(&self) -> Result<Value, StoreError> {
        serde_json::to_value(self).map_err(|source| StoreError::Encode {
            key: self.key(),
            source,
        })
    }

    /// Decode a stored value, re-running the validator over `app`.
    pub(crate) fn decode(
        value: Value,
        validator: &dyn ManifestValidator,
    ) -> Result<Self, RecordError> {
        let stored: StoredRecord = serde_json::from_value(value).map_err(RecordError::Shape)?;
        let app = validator.validate(&stored.app).map_err(RecordError::Manifest)?;
        Ok(Self {
            app,
            install_time: stored.install_time,
            install_url: stored.install_url,
            authorization_url: stored.authorization_url,
        })
    }
}

// Same layout as InstallRecord with the manifest left untyped, so that a
// manifest which no longer validates is reported as such rather than as a
// shape error. Only `app` decides whether a record survives; missing
// provenance reads as zero / empty.
#[derive(Deserialize)]
struct StoredRecord {
    app: Value,
    #[serde(rename = "installTime", default)]
    install_time: i64,
    #[serde(rename = "installURL", default)]
    install_url: String,
    #[serde(rename = "authorizationURL", default)]
    authorization_url: Option<String>,
}

#[derive(Debug, Error)]
pub(crate) enum RecordError {
    #[error("stored record is malformed: {0}")]
    Shape(#[source] serde_json::Error),
    #[error("stored manifest no longer validates: {0}")]
    Manifest(#[source] ManifestError),
}

/// Provenance entry returned by `get_installed_by`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstalledBy {
    #[serde(rename = "installURL")]
    pub install_url: String,
    #[serde(rename = "installTime")]
    pub install_time: i64,
    pub manifest: WebAppManifest,
}

impl From<InstallRecord> for InstalledBy {
    fn from(record: InstallRecord) -> Self {
        Self {
            install_url: record.install_url,
            install_time: record.install_time,
            manifest: record.app,
        }
    }
}
