//! Origin comparison for install-time and query-time security checks.
//!
//! Everything here fails closed: input that cannot be parsed into a
//! `scheme://host[:port]` triple never matches anything.

use std::fmt;

use apprepo_manifest::WebAppManifest;
use url::{Origin, Url};

/// Origin string browsers report for documents without a real origin
/// (local files, sandboxed frames). Two such origins are treated as equal so
/// the registry can be exercised from local test pages.
pub const NULL_ORIGIN: &str = "null";

/// Normalized `scheme://host[:port]` triple.
///
/// The port is always the effective port, so `http://a.com` and
/// `http://a.com:80` compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WebOrigin {
    scheme: String,
    host: String,
    port: u16,
    default_port: bool,
}

impl WebOrigin {
    /// Parse any absolute URL and keep only its origin. Returns `None` for
    /// malformed input and for URLs with an opaque origin (`data:`, `file:`,
    /// custom schemes without a host).
    pub fn parse(input: &str) -> Option<Self> {
        let url = Url::parse(input).ok()?;
        match url.origin() {
            Origin::Tuple(scheme, host, port) => Some(Self {
                scheme,
                host: host.to_string(),
                port,
                default_port: url.port().is_none(),
            }),
            Origin::Opaque(_) => None,
        }
    }

    /// Whether `url` lives inside this origin.
    pub fn contains(&self, url: &str) -> bool {
        WebOrigin::parse(url).is_some_and(|other| *self == other)
    }
}

impl fmt::Display for WebOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.scheme, self.host)?;
        if !self.default_port {
            write!(f, ":{}", self.port)?;
        }
        Ok(())
    }
}

/// Returns whether `url` belongs to `domain` (`scheme://hostname[:nonStandardPort]`).
/// Paths and queries on either side are ignored.
pub fn url_matches_domain(url: &str, domain: &str) -> bool {
    if url == NULL_ORIGIN && domain == NULL_ORIGIN {
        return true;
    }
    WebOrigin::parse(domain).is_some_and(|origin| origin.contains(url))
}

/// Returns whether the application is served from `domain`.
pub fn application_matches_domain(app: &WebAppManifest, domain: &str) -> bool {
    url_matches_domain(&app.base_url, domain)
}
