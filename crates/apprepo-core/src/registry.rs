use std::sync::Arc;

use apprepo_events::{Bus, Receiver, APPS_PURGED, APPS_REMOVED};
use apprepo_manifest::{
    ManifestValidator, StandardValidator, WebAppManifest, DEFAULT_MANIFEST_NAME,
};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::RegistryError;
use crate::origin::{application_matches_domain, url_matches_domain};
use crate::record::{InstallRecord, InstalledBy};
use crate::store::{MemoryBackend, StoreSet};
use crate::view::{generate_external_view, ExternalView};

/// Installation registry over an app-record store and a state store.
///
/// Every read path goes through [`Registry::iterate_apps`], which re-validates
/// stored manifests and prunes records that no longer decode. Callers never
/// observe an invalid record.
#[derive(Clone)]
pub struct Registry {
    stores: StoreSet,
    validator: Arc<dyn ManifestValidator>,
    events: Option<Bus>,
    default_manifest_name: String,
}

impl Registry {
    pub fn new(stores: StoreSet) -> Self {
        Self {
            stores,
            validator: Arc::new(StandardValidator::new()),
            events: None,
            default_manifest_name: DEFAULT_MANIFEST_NAME.to_string(),
        }
    }

    /// In-memory registry laid out according to `config`, with an event bus.
    pub fn from_config(config: &Config) -> Self {
        let stores = MemoryBackend::new().stores(
            &config.registry.apps_namespace,
            &config.registry.state_namespace,
        );
        Self::new(stores)
            .with_default_manifest_name(config.registry.default_manifest_name.clone())
            .with_events(Bus::new(config.events.capacity))
    }

    pub fn with_validator(mut self, validator: Arc<dyn ManifestValidator>) -> Self {
        self.validator = validator;
        self
    }

    pub fn with_events(mut self, bus: Bus) -> Self {
        self.events = Some(bus);
        self
    }

    pub fn with_default_manifest_name(mut self, name: impl Into<String>) -> Self {
        self.default_manifest_name = name.into();
        self
    }

    /// Lifecycle events, when the registry was built with a bus.
    pub fn subscribe(&self) -> Option<Receiver> {
        self.events.as_ref().map(Bus::subscribe)
    }

    pub(crate) fn stores(&self) -> &StoreSet {
        &self.stores
    }

    pub(crate) fn validator(&self) -> &dyn ManifestValidator {
        self.validator.as_ref()
    }

    pub(crate) fn default_manifest_name(&self) -> &str {
        &self.default_manifest_name
    }

    pub(crate) fn publish<T: Serialize>(&self, kind: &str, payload: &T) {
        if let Some(bus) = &self.events {
            bus.publish(kind, payload);
        }
    }

    /// Visit every valid installation in store order.
    ///
    /// Records that fail to decode or validate are skipped and removed once
    /// the walk is over. A callback error is logged and does not stop the
    /// walk. A record that cannot be deleted is logged and retried on the
    /// next walk. Only a failure to enumerate keys is returned.
    pub fn iterate_apps<F>(&self, mut callback: F) -> Result<(), RegistryError>
    where
        F: FnMut(&str, &InstallRecord) -> anyhow::Result<()>,
    {
        let mut purge = Vec::new();
        for key in self.stores.apps.keys()? {
            let value = match self.stores.apps.get(&key) {
                Ok(Some(value)) => value,
                Ok(None) => continue,
                Err(err) => {
                    warn!(
                        target: "apprepo::registry",
                        %key,
                        error = %err,
                        "failed to read installation"
                    );
                    continue;
                }
            };
            let record = match InstallRecord::decode(value, self.validator()) {
                Ok(record) => record,
                Err(err) => {
                    warn!(
                        target: "apprepo::registry",
                        %key,
                        error = %err,
                        "invalid installation will be purged"
                    );
                    purge.push(key);
                    continue;
                }
            };
            if let Err(err) = callback(&key, &record) {
                let error = format!("{err:#}");
                warn!(target: "apprepo::registry", %key, %error, "installation visitor failed");
            }
        }

        for key in purge {
            if let Err(err) = self.stores.apps.remove(&key) {
                warn!(
                    target: "apprepo::registry",
                    %key,
                    error = %err,
                    "failed to purge installation"
                );
                continue;
            }
            debug!(target: "apprepo::registry", %key, "purged installation");
            self.publish(APPS_PURGED, &json!({ "id": key }));
        }
        Ok(())
    }

    /// Installations whose application is served from `origin`.
    pub fn installs_for_origin(&self, origin: &str) -> Result<Vec<InstallRecord>, RegistryError> {
        let mut result = Vec::new();
        self.iterate_apps(|_, record| {
            if application_matches_domain(&record.app, origin) {
                result.push(record.clone());
            }
            Ok(())
        })?;
        Ok(result)
    }

    /// Installations requested by `origin`.
    pub fn installs_by_origin(&self, origin: &str) -> Result<Vec<InstallRecord>, RegistryError> {
        let mut result = Vec::new();
        self.iterate_apps(|_, record| {
            if url_matches_domain(&record.install_url, origin) {
                result.push(record.clone());
            }
            Ok(())
        })?;
        Ok(result)
    }

    /// Manifests of the applications installed for `origin`. Provenance is
    /// withheld.
    pub fn get_installed(&self, origin: &str) -> Result<Vec<WebAppManifest>, RegistryError> {
        Ok(self
            .installs_for_origin(origin)?
            .into_iter()
            .map(|record| record.app)
            .collect())
    }

    pub fn get_installed_by(&self, origin: &str) -> Result<Vec<InstalledBy>, RegistryError> {
        Ok(self
            .installs_by_origin(origin)?
            .into_iter()
            .map(InstalledBy::from)
            .collect())
    }

    pub fn list(&self) -> Result<Vec<ExternalView>, RegistryError> {
        let mut installed = Vec::new();
        self.iterate_apps(|key, record| {
            installed.push(generate_external_view(key, record));
            Ok(())
        })?;
        Ok(installed)
    }

    /// Delete the installation stored under `key`. State saved under the same
    /// id is left alone.
    pub fn remove(&self, key: &str) -> Result<(), RegistryError> {
        if !self.stores.apps.contains(key)? {
            return Err(RegistryError::NoSuchApplication {
                key: key.to_string(),
            });
        }
        self.stores.apps.remove(key)?;
        debug!(target: "apprepo::registry", %key, "removed installation");
        self.publish(APPS_REMOVED, &json!({ "id": key }));
        Ok(())
    }

    pub fn load_state(&self, id: &str) -> Result<Option<Value>, RegistryError> {
        Ok(self.stores.state.get(id)?)
    }

    /// `None` deletes the entry; any other value replaces it as-is.
    pub fn save_state(&self, id: &str, state: Option<Value>) -> Result<(), RegistryError> {
        match state {
            Some(value) => self.stores.state.put(id, value)?,
            None => self.stores.state.remove(id)?,
        }
        Ok(())
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new(StoreSet::in_memory())
    }
}
