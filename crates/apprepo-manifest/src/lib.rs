//! Web application manifests for the apprepo installation registry.
//!
//! This crate owns the manifest data model and the validation contract the
//! registry depends on. The registry never persists a manifest that has not
//! passed a [`ManifestValidator`], and it re-validates stored manifests on
//! every read, so validators must be idempotent.

use std::{fs, path::Path};

use anyhow::Context as _;
use serde_json::Value;
use thiserror::Error;

pub mod manifest;
pub mod validate;

pub use manifest::{
    DeveloperInfo, WebAppManifest, WidgetDimension, WidgetSpec, DEFAULT_MANIFEST_NAME,
};
pub use validate::{
    ManifestError, ManifestValidator, StandardValidator, ValidationIssue, ValidationReport,
    MAX_NAME_LEN,
};

/// Load a manifest from disk and run the [`StandardValidator`] over it.
///
/// The manifest is returned as published (not canonicalized) together with
/// the full report, so callers can surface warnings as well as errors. A
/// document that does not even deserialize is reported as
/// [`ManifestLoadError::Manifest`].
pub fn load_manifest_with_report<P: AsRef<Path>>(
    path: P,
) -> Result<(WebAppManifest, ValidationReport), ManifestLoadError> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read manifest at {}", path.display()))
        .map_err(ManifestLoadError::Io)?;
    let value: Value = serde_json::from_str(&raw).map_err(ManifestLoadError::Parse)?;
    if !value.is_object() {
        return Err(ManifestLoadError::Manifest(ManifestError::NotAnObject));
    }
    let manifest: WebAppManifest = serde_json::from_value(value)
        .map_err(|err| ManifestLoadError::Manifest(ManifestError::Shape(err)))?;
    let report = StandardValidator.inspect(&manifest);
    Ok((manifest, report))
}

/// Errors encountered while loading a manifest file.
#[derive(Debug, Error)]
pub enum ManifestLoadError {
    #[error("{0:#}")]
    Io(anyhow::Error),
    #[error("failed to parse manifest as JSON: {0}")]
    Parse(#[source] serde_json::Error),
    #[error("{0}")]
    Manifest(#[source] ManifestError),
}
