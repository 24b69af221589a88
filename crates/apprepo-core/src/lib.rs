//! Origin-scoped installation registry for web applications.
//!
//! A [`Registry`] lets an origin install applications described by a
//! manifest, records who installed what and when, and answers the queries an
//! installation dashboard needs. Storage is injected through
//! [`KeyValueStore`]; fetching manifests and asking the user for consent are
//! injected per install through [`InstallHost`].

pub mod config;
pub mod error;
pub mod install;
pub mod origin;
pub mod record;
pub mod registry;
pub mod store;
mod test_support;
pub mod view;

pub use config::{load_config, resolve_config, Config, EventsConfig, RegistryConfig};
pub use error::{ErrorPayload, RegistryError};
pub use install::{completion_wire, InstallArgs, InstallHost, InstallOutcome, PromptRequest};
pub use origin::{application_matches_domain, url_matches_domain, WebOrigin};
pub use record::{InstallRecord, InstalledBy};
pub use registry::Registry;
pub use store::{KeyValueStore, MemoryBackend, MemoryStore, StoreError, StoreSet};
pub use view::{generate_external_view, ExternalView};

pub use apprepo_events as events;
pub use apprepo_manifest as manifest;
