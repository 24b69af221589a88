//! Dashboard-facing projection of installation records.

use std::collections::BTreeMap;

use apprepo_manifest::{DeveloperInfo, WidgetDimension};
use serde::{Deserialize, Serialize};

use crate::record::InstallRecord;

/// Filtered, read-only shape of an installation handed to dashboards.
///
/// Optional fields are omitted from the serialized form rather than emitted
/// as `null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalView {
    pub id: String,
    #[serde(rename = "installURL")]
    pub install_url: String,
    pub install_time: i64,
    #[serde(rename = "launchURL")]
    pub launch_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icons: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub developer: Option<DeveloperInfo>,
    #[serde(rename = "widgetURL", default, skip_serializing_if = "Option::is_none")]
    pub widget_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub widget_width: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub widget_height: Option<i64>,
}

pub fn generate_external_view(key: &str, record: &InstallRecord) -> ExternalView {
    let app = &record.app;
    let widget = app.widget.as_ref();
    ExternalView {
        id: key.to_string(),
        install_url: record.install_url.clone(),
        install_time: record.install_time,
        launch_url: app.launch_url(),
        icons: app.icons.clone().filter(|icons| !icons.is_empty()),
        name: non_empty(Some(&app.name)),
        description: non_empty(app.description.as_ref()),
        developer: app.developer.clone(),
        widget_url: app.widget_url(),
        widget_width: widget.and_then(|w| dimension(w.width.as_ref())),
        widget_height: widget.and_then(|w| dimension(w.height.as_ref())),
    }
}

fn non_empty(value: Option<&String>) -> Option<String> {
    value.filter(|s| !s.is_empty()).cloned()
}

// Zero and the empty string count as "not declared".
fn dimension(raw: Option<&WidgetDimension>) -> Option<i64> {
    match raw? {
        WidgetDimension::Number(n) if n.as_f64() == Some(0.0) => None,
        WidgetDimension::Text(s) if s.is_empty() => None,
        declared => declared.as_pixels(),
    }
}
