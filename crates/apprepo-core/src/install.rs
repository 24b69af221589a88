//! The install protocol: resolve a manifest, validate it, ask the user, and
//! persist on confirmation.

use apprepo_events::{APPS_INSTALLED, APPS_INSTALL_DENIED};
use apprepo_manifest::WebAppManifest;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::error::{ErrorPayload, RegistryError};
use crate::record::InstallRecord;
use crate::registry::Registry;

/// Arguments supplied by the page requesting an install.
///
/// Empty `url` and `authorization_url` strings are treated as absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstallArgs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifest: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorization_url: Option<String>,
}

impl InstallArgs {
    /// Direct install of an inline manifest.
    pub fn from_manifest(manifest: Value) -> Self {
        Self {
            manifest: Some(manifest),
            ..Self::default()
        }
    }

    /// Install of a manifest fetched from `url`.
    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Self::default()
        }
    }

    pub fn with_authorization_url(mut self, url: impl Into<String>) -> Self {
        self.authorization_url = Some(url.into());
        self
    }

    fn fetch_url(&self) -> Option<&str> {
        self.url.as_deref().filter(|url| !url.is_empty())
    }

    fn authorization(&self) -> Option<String> {
        self.authorization_url
            .as_deref()
            .filter(|url| !url.is_empty())
            .map(str::to_string)
    }
}

/// What the consent prompt is shown.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PromptRequest {
    pub install_origin: String,
    pub manifest: WebAppManifest,
    /// Set when the manifest was not served from where it says it lives, or
    /// was supplied inline.
    pub is_external_server: bool,
}

/// Capabilities the embedder supplies for a single install.
#[async_trait]
pub trait InstallHost: Send + Sync {
    /// Fetch manifest text; `None` on any transport failure.
    async fn fetch_manifest(&self, url: &str) -> Option<String>;

    /// Show the consent prompt and resolve to the user's answer.
    async fn prompt(&self, request: PromptRequest) -> bool;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    Installed { key: String },
    Denied,
}

impl InstallOutcome {
    pub fn is_installed(&self) -> bool {
        matches!(self, InstallOutcome::Installed { .. })
    }

    /// `true` for an installation, the `denied` error payload otherwise.
    pub fn to_wire(&self) -> Value {
        match self {
            InstallOutcome::Installed { .. } => Value::Bool(true),
            InstallOutcome::Denied => ErrorPayload::denied().to_value(),
        }
    }
}

/// Render an install result the way completion callbacks receive it.
pub fn completion_wire(result: &Result<InstallOutcome, RegistryError>) -> Value {
    match result {
        Ok(outcome) => outcome.to_wire(),
        Err(err) => err.to_wire(),
    }
}

impl Registry {
    /// Run the install protocol for `origin`.
    ///
    /// The store is written at most once, and only after the host confirmed.
    /// An inline manifest takes precedence over `args.url`.
    pub async fn install(
        &self,
        origin: &str,
        args: &InstallArgs,
        host: &dyn InstallHost,
    ) -> Result<InstallOutcome, RegistryError> {
        let (manifest, is_external_server) = if let Some(raw) = args.manifest.as_ref() {
            let manifest = self
                .validator()
                .validate(raw)
                .map_err(RegistryError::InvalidManifest)?;
            (manifest, true)
        } else if let Some(url) = args.fetch_url() {
            let manifest = self.fetch_and_validate(url, host).await?;
            let expected = manifest.expected_manifest_url(self.default_manifest_name());
            let external = expected != url;
            if external {
                debug!(
                    target: "apprepo::install",
                    %url,
                    %expected,
                    "manifest served from a foreign location"
                );
            }
            (manifest, external)
        } else {
            return Err(RegistryError::MissingManifest);
        };

        let allowed = host
            .prompt(PromptRequest {
                install_origin: origin.to_string(),
                manifest: manifest.clone(),
                is_external_server,
            })
            .await;

        if !allowed {
            info!(target: "apprepo::install", %origin, app = %manifest.name, "installation denied");
            self.publish(
                APPS_INSTALL_DENIED,
                &json!({"installURL": origin, "launchURL": manifest.launch_url()}),
            );
            return Ok(InstallOutcome::Denied);
        }

        let record = InstallRecord {
            app: manifest,
            install_time: chrono::Utc::now().timestamp_millis(),
            install_url: origin.to_string(),
            authorization_url: args.authorization(),
        };
        let key = record.key();
        self.stores().apps.put(&key, record.encode()?)?;
        info!(target: "apprepo::install", %origin, %key, "application installed");
        self.publish(
            APPS_INSTALLED,
            &json!({"id": key, "installURL": origin, "installTime": record.install_time}),
        );
        Ok(InstallOutcome::Installed { key })
    }

    async fn fetch_and_validate(
        &self,
        url: &str,
        host: &dyn InstallHost,
    ) -> Result<WebAppManifest, RegistryError> {
        let body = match host.fetch_manifest(url).await {
            Some(body) if !body.is_empty() => body,
            _ => {
                debug!(target: "apprepo::install", %url, "manifest fetch returned nothing");
                return Err(RegistryError::NetworkError {
                    url: url.to_string(),
                });
            }
        };
        let raw: Value =
            serde_json::from_str(&body).map_err(|source| RegistryError::ManifestParseError {
                url: url.to_string(),
                source,
            })?;
        self.validator()
            .validate(&raw)
            .map_err(RegistryError::InvalidManifest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn wire_forms() {
        let installed = InstallOutcome::Installed {
            key: "http://a.com".into(),
        };
        assert!(installed.is_installed());
        assert_eq!(installed.to_wire(), json!(true));
        assert_eq!(
            InstallOutcome::Denied.to_wire(),
            json!({"error": ["denied", "User denied installation request"]})
        );
        assert_eq!(
            completion_wire(&Err(RegistryError::MissingManifest)),
            json!({"error": ["missingManifest", "install requires a url or manifest argument"]})
        );
    }

    #[test]
    fn blank_arguments_count_as_absent() {
        let args = InstallArgs::from_url("").with_authorization_url("");
        assert_eq!(args.fetch_url(), None);
        assert_eq!(args.authorization(), None);

        let args: InstallArgs = serde_json::from_value(json!({
            "url": "http://a.com/manifest.webapp",
            "authorization_url": "http://a.com/auth"
        }))
        .unwrap();
        assert_eq!(args.fetch_url(), Some("http://a.com/manifest.webapp"));
        assert_eq!(args.authorization().as_deref(), Some("http://a.com/auth"));
    }
}
