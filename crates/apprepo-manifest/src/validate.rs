use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use url::Url;

use crate::manifest::WebAppManifest;

/// Upper bound on the length of an application name.
pub const MAX_NAME_LEN: usize = 128;

/// Turns untrusted manifest JSON into a canonical [`WebAppManifest`].
///
/// Implementations must be idempotent: validating the serialized form of a
/// manifest they produced yields the same manifest again. The registry relies
/// on this when it re-validates stored records on every read.
pub trait ManifestValidator: Send + Sync {
    fn validate(&self, raw: &Value) -> Result<WebAppManifest, ManifestError>;
}

impl<F> ManifestValidator for F
where
    F: Fn(&Value) -> Result<WebAppManifest, ManifestError> + Send + Sync,
{
    fn validate(&self, raw: &Value) -> Result<WebAppManifest, ManifestError> {
        self(raw)
    }
}

/// Baseline validator enforcing the structural rules every installable
/// manifest must satisfy.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardValidator;

impl StandardValidator {
    pub fn new() -> Self {
        Self
    }

    /// Check an already-typed manifest. The returned report contains errors
    /// and warnings.
    pub fn inspect(&self, manifest: &WebAppManifest) -> ValidationReport {
        let mut report = ValidationReport::default();

        if manifest.name.is_empty() {
            report.push_error("name", "name is required");
        } else if manifest.name.chars().count() > MAX_NAME_LEN {
            report.push_error(
                "name",
                format!("name must be at most {MAX_NAME_LEN} characters").as_str(),
            );
        }

        let mut base = None;
        if manifest.base_url.is_empty() {
            report.push_error("base_url", "base_url is required");
        } else {
            match Url::parse(&manifest.base_url) {
                Ok(url) if matches!(url.scheme(), "http" | "https") => {
                    if url.fragment().is_some() {
                        report.push_error("base_url", "base_url must not contain a fragment");
                    }
                    base = Some(url);
                }
                Ok(_) => report.push_error("base_url", "base_url must use http or https"),
                Err(_) => report.push_error("base_url", "base_url must be an absolute URL"),
            }
        }
        let base = base.as_ref();

        if let Some(path) = &manifest.launch_path {
            check_relative(&mut report, "launch_path", &manifest.base_url, base, path);
        }
        if let Some(name) = &manifest.manifest_name {
            if name.is_empty() {
                report.push_error("manifest_name", "manifest_name must not be empty");
            } else {
                check_relative(&mut report, "manifest_name", &manifest.base_url, base, name);
            }
        }

        if let Some(icons) = &manifest.icons {
            for (size, location) in icons {
                let field = format!("icons.{size}");
                if size.parse::<u32>().map_or(true, |px| px == 0) {
                    report.push_warning(field.as_str(), "icon size should be a positive integer");
                }
                if location.trim().is_empty() {
                    report.push_error(field.as_str(), "icon location must not be empty");
                }
            }
        }

        if let Some(developer) = &manifest.developer {
            if let Some(url) = &developer.url {
                if Url::parse(url).is_err() {
                    report.push_error("developer.url", "developer url must be an absolute URL");
                }
            }
            if developer.name.as_deref().map_or(true, str::is_empty) {
                report.push_warning("developer.name", "developer name should be provided");
            }
        }

        if let Some(widget) = &manifest.widget {
            if let Some(path) = &widget.path {
                check_relative(&mut report, "widget.path", &manifest.base_url, base, path);
            }
            let dimensions = [
                ("widget.width", &widget.width),
                ("widget.height", &widget.height),
            ];
            for (field, dimension) in dimensions {
                if let Some(dimension) = dimension {
                    match dimension.as_pixels() {
                        Some(px) if px > 0 => {}
                        Some(_) => report.push_error(field, "widget dimension must be positive"),
                        None => report.push_error(field, "widget dimension must be an integer"),
                    }
                }
            }
        }

        report
    }
}

impl ManifestValidator for StandardValidator {
    fn validate(&self, raw: &Value) -> Result<WebAppManifest, ManifestError> {
        if !raw.is_object() {
            return Err(ManifestError::NotAnObject);
        }
        let mut manifest: WebAppManifest =
            serde_json::from_value(raw.clone()).map_err(ManifestError::Shape)?;
        canonicalize(&mut manifest);
        let report = self.inspect(&manifest);
        if report.is_success() {
            Ok(manifest)
        } else {
            Err(ManifestError::Invalid(report))
        }
    }
}

fn canonicalize(manifest: &mut WebAppManifest) {
    let trimmed = manifest.name.trim();
    if trimmed.len() != manifest.name.len() {
        manifest.name = trimmed.to_string();
    }
    let trimmed = manifest.base_url.trim();
    if trimmed.len() != manifest.base_url.len() {
        manifest.base_url = trimmed.to_string();
    }
    if manifest
        .description
        .as_deref()
        .is_some_and(|description| description.trim().is_empty())
    {
        manifest.description = None;
    }
}

// Paths are appended verbatim to base_url; the joined URL must keep the
// origin of base_url (catches "@host", ".suffix" and ":port" as well as
// schemes and protocol-relative prefixes).
fn check_relative(
    report: &mut ValidationReport,
    field: &str,
    base_url: &str,
    base: Option<&Url>,
    value: &str,
) {
    if value.starts_with("//") || Url::parse(value).is_ok() {
        report.push_error(field, "must be a path relative to base_url");
        return;
    }
    let Some(base) = base else {
        return;
    };
    let same_origin = Url::parse(&format!("{base_url}{value}"))
        .is_ok_and(|joined| joined.origin() == base.origin());
    if !same_origin {
        report.push_error(field, "must stay within the origin of base_url");
    }
}

/// Report emitted by [`StandardValidator::inspect`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ValidationReport {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ValidationIssue>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn push_error<S: Into<String>>(&mut self, field: S, message: S) {
        self.errors.push(ValidationIssue::new(field, message));
    }

    pub fn push_warning<S: Into<String>>(&mut self, field: S, message: S) {
        self.warnings.push(ValidationIssue::new(field, message));
    }

    /// One-line rendering of the errors, `field: message` joined by `; `.
    pub fn summary(&self) -> String {
        self.errors
            .iter()
            .map(|issue| format!("{}: {}", issue.field, issue.message))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Individual validation issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ValidationIssue {
    pub field: String,
    pub message: String,
}

impl ValidationIssue {
    pub fn new<S: Into<String>>(field: S, message: S) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Reasons a manifest is rejected.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("manifest must be a JSON object")]
    NotAnObject,
    #[error("manifest has an unexpected shape: {0}")]
    Shape(#[source] serde_json::Error),
    #[error("{}", .0.summary())]
    Invalid(ValidationReport),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn validate(raw: Value) -> Result<WebAppManifest, ManifestError> {
        StandardValidator.validate(&raw)
    }

    fn error_fields(err: ManifestError) -> Vec<String> {
        match err {
            ManifestError::Invalid(report) => {
                report.errors.into_iter().map(|issue| issue.field).collect()
            }
            other => panic!("expected a validation report, got {other:?}"),
        }
    }

    #[test]
    fn accepts_minimal_manifest() {
        let manifest = validate(json!({"name": "Demo", "base_url": "http://a.com"})).unwrap();
        assert_eq!(manifest.name, "Demo");
        assert_eq!(manifest.base_url, "http://a.com");
    }

    #[test]
    fn rejects_non_objects() {
        assert!(matches!(validate(json!("nope")), Err(ManifestError::NotAnObject)));
        assert!(matches!(validate(json!([1, 2])), Err(ManifestError::NotAnObject)));
    }

    #[test]
    fn rejects_wrongly_typed_fields() {
        let err = validate(json!({"name": 7, "base_url": "http://a.com"})).unwrap_err();
        assert!(matches!(err, ManifestError::Shape(_)));
    }

    #[test]
    fn requires_name_and_http_base_url() {
        let fields = error_fields(validate(json!({"base_url": "ftp://a.com"})).unwrap_err());
        assert_eq!(fields, vec!["name".to_string(), "base_url".to_string()]);

        let fields = error_fields(validate(json!({"name": "x", "base_url": "a.com"})).unwrap_err());
        assert_eq!(fields, vec!["base_url".to_string()]);
    }

    #[test]
    fn rejects_paths_that_escape_base_url() {
        let err = validate(json!({
            "name": "Demo",
            "base_url": "http://a.com",
            "launch_path": "//evil.com/x",
            "widget": {"path": "http://evil.com/w"}
        }))
        .unwrap_err();
        assert_eq!(
            error_fields(err),
            vec!["launch_path".to_string(), "widget.path".to_string()]
        );
    }

    #[test]
    fn rejects_paths_that_move_the_joined_origin() {
        for path in ["@evil.com/x", ".evil.com/x", ":9999/x"] {
            let err = validate(json!({
                "name": "Demo",
                "base_url": "http://a.com",
                "launch_path": path,
                "manifest_name": path,
                "widget": {"path": path}
            }))
            .unwrap_err();
            assert_eq!(
                error_fields(err),
                vec![
                    "launch_path".to_string(),
                    "manifest_name".to_string(),
                    "widget.path".to_string()
                ],
                "{path}"
            );
        }
    }

    #[test]
    fn relative_names_under_a_directory_base_are_allowed() {
        let manifest = validate(json!({
            "name": "Demo",
            "base_url": "http://a.com/suite/",
            "launch_path": "index.html",
            "manifest_name": "app.webapp",
            "widget": {"path": "?widget=1"}
        }))
        .unwrap();
        assert_eq!(manifest.launch_url(), "http://a.com/suite/index.html");
    }

    #[test]
    fn rejects_unreadable_widget_dimensions() {
        let err = validate(json!({
            "name": "Demo",
            "base_url": "http://a.com",
            "widget": {"width": "wide", "height": 0}
        }))
        .unwrap_err();
        assert_eq!(
            error_fields(err),
            vec!["widget.width".to_string(), "widget.height".to_string()]
        );
    }

    #[test]
    fn icon_size_oddities_are_warnings_only() {
        let manifest = WebAppManifest {
            name: "Demo".into(),
            base_url: "http://a.com".into(),
            icons: Some([("large".to_string(), "/i.png".to_string())].into()),
            ..Default::default()
        };
        let report = StandardValidator.inspect(&manifest);
        assert!(report.is_success());
        assert_eq!(report.warnings.len(), 1);
    }

    #[test]
    fn validation_is_idempotent() {
        let first = validate(json!({
            "name": "  Demo  ",
            "base_url": " http://a.com/ ",
            "launch_path": "index.html",
            "description": "   ",
            "icons": {"16": "/i16.png"},
            "developer": {"name": "Dev", "url": "http://dev.example"},
            "widget": {"path": "/w.html", "width": "200", "height": 100},
            "locales": {"fr": {"name": "Démo"}}
        }))
        .unwrap();
        assert_eq!(first.name, "Demo");
        assert_eq!(first.base_url, "http://a.com/");
        assert!(first.description.is_none());

        let second = validate(serde_json::to_value(&first).unwrap()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn closures_can_stand_in_for_validators() {
        let reject_all = |_: &Value| -> Result<WebAppManifest, ManifestError> {
            Err(ManifestError::NotAnObject)
        };
        assert!(reject_all.validate(&json!({})).is_err());
    }
}
