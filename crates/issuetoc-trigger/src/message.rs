//! Trigger wire format and URL scoping.

use serde::{Deserialize, Serialize};
use url::Url;

/// Messages delivered over the navigation trigger channel.
///
/// Adjacently tagged: `{"type": "mount_outline", "payload": {...}}`. Unknown
/// message types fail deserialization and are dropped by the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum NavigationMessage {
    /// A host navigation completed; the engine should evaluate a mount.
    MountOutline(NavigationDetails),
}

/// Details of a completed navigation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationDetails {
    /// The URL the host navigated to.
    pub url: String,

    /// Identifier of the originating host context, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_id: Option<u64>,

    /// Milliseconds since epoch when the navigation completed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp_ms: Option<u64>,
}

impl NavigationMessage {
    /// Decode a message from its JSON wire form.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}

/// Whether a URL is inside the engine's scope: an issue page of the form
/// `https://github.com/<owner>/<repo>/issues/<number>`.
///
/// The number must be all digits. Trailing path segments, query strings, and
/// fragments are allowed; navigations within one issue keep their scope.
pub fn is_issue_url(raw: &str) -> bool {
    let Ok(url) = Url::parse(raw) else {
        return false;
    };
    if url.scheme() != "https" || url.host_str() != Some("github.com") {
        return false;
    }
    let Some(segments) = url.path_segments() else {
        return false;
    };
    let segments: Vec<&str> = segments.collect();
    let [owner, repo, keyword, number, ..] = segments.as_slice() else {
        return false;
    };
    !owner.is_empty()
        && !repo.is_empty()
        && *keyword == "issues"
        && !number.is_empty()
        && number.bytes().all(|b| b.is_ascii_digit())
}
