use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

/// File name a manifest is expected to be served under when `manifest_name`
/// is not declared.
pub const DEFAULT_MANIFEST_NAME: &str = "manifest.webapp";

/// An installable web application description.
///
/// Only the fields the registry reasons about are typed; everything else the
/// publisher declared is carried through `extra` untouched so that a stored
/// manifest round-trips without loss.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[serde(rename_all = "snake_case")]
pub struct WebAppManifest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub base_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub launch_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifest_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icons: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub developer: Option<DeveloperInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub widget: Option<WidgetSpec>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl WebAppManifest {
    /// `base_url` followed by `launch_path` (if any). This doubles as the
    /// registry key of an installation.
    pub fn launch_url(&self) -> String {
        join_url(&self.base_url, self.launch_path.as_deref())
    }

    /// Where the manifest claims it lives; used to detect manifests that were
    /// fetched from somewhere other than their own origin.
    pub fn expected_manifest_url(&self, default_name: &str) -> String {
        let name = self.manifest_name.as_deref().unwrap_or(default_name);
        format!("{}{}", self.base_url, name)
    }

    /// URL of the widget surface, when the manifest declares one.
    pub fn widget_url(&self) -> Option<String> {
        self.widget
            .as_ref()
            .map(|widget| join_url(&self.base_url, widget.path.as_deref()))
    }
}

fn join_url(base: &str, path: Option<&str>) -> String {
    match path {
        Some(path) => format!("{base}{path}"),
        None => base.to_string(),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub struct DeveloperInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[serde(rename_all = "snake_case")]
pub struct WidgetSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<WidgetDimension>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<WidgetDimension>,
}

/// Widget sizes arrive either as JSON numbers or as strings such as `"300"`
/// or `"300px"`; the raw form is kept and interpreted on demand.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(untagged)]
pub enum WidgetDimension {
    Number(Number),
    Text(String),
}

impl WidgetDimension {
    /// Base-10 integer value of the dimension. Strings are read up to the
    /// first non-digit after an optional sign; numbers are truncated toward
    /// zero. Returns `None` when no integer can be read.
    pub fn as_pixels(&self) -> Option<i64> {
        match self {
            WidgetDimension::Number(n) => n.as_i64().or_else(|| {
                n.as_f64()
                    .filter(|f| f.is_finite() && f.abs() < i64::MAX as f64)
                    .map(|f| f.trunc() as i64)
            }),
            WidgetDimension::Text(s) => parse_leading_int(s),
        }
    }
}

fn parse_leading_int(raw: &str) -> Option<i64> {
    let trimmed = raw.trim_start();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let end = digits
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit())
        .map(|(idx, _)| idx)
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    let value: i64 = digits[..end].parse().ok()?;
    Some(if negative { -value } else { value })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn launch_url_appends_launch_path() {
        let mut manifest = WebAppManifest {
            name: "Demo".into(),
            base_url: "http://a.com".into(),
            ..Default::default()
        };
        assert_eq!(manifest.launch_url(), "http://a.com");
        manifest.launch_path = Some("/app.html".into());
        assert_eq!(manifest.launch_url(), "http://a.com/app.html");
    }

    #[test]
    fn expected_manifest_url_falls_back_to_default_name() {
        let mut manifest = WebAppManifest {
            base_url: "http://a.com/".into(),
            ..Default::default()
        };
        assert_eq!(
            manifest.expected_manifest_url(DEFAULT_MANIFEST_NAME),
            "http://a.com/manifest.webapp"
        );
        manifest.manifest_name = Some("app.json".into());
        assert_eq!(
            manifest.expected_manifest_url(DEFAULT_MANIFEST_NAME),
            "http://a.com/app.json"
        );
    }

    #[test]
    fn unknown_fields_survive_a_round_trip() {
        let raw = json!({
            "name": "Demo",
            "base_url": "http://a.com",
            "capabilities": ["geolocation"],
            "version": "1.2"
        });
        let manifest: WebAppManifest = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(manifest.extra.len(), 2);
        assert_eq!(serde_json::to_value(&manifest).unwrap(), raw);
    }

    #[test]
    fn widget_dimensions_follow_leading_integer_rules() {
        let dim = |v: Value| serde_json::from_value::<WidgetDimension>(v).unwrap();
        assert_eq!(dim(json!(300)).as_pixels(), Some(300));
        assert_eq!(dim(json!(120.9)).as_pixels(), Some(120));
        assert_eq!(dim(json!("250")).as_pixels(), Some(250));
        assert_eq!(dim(json!(" 64px")).as_pixels(), Some(64));
        assert_eq!(dim(json!("-12")).as_pixels(), Some(-12));
        assert_eq!(dim(json!("wide")).as_pixels(), None);
        assert_eq!(dim(json!("")).as_pixels(), None);
    }
}
