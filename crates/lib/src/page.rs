//! Page identity and anchor targets.
//!
//! A [`PageKey`] is what a remembered position is filed under: the page's
//! address with the query string and fragment removed. An [`AnchorTarget`] is
//! the element id named by the fragment at load time.

use std::fmt;

use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};
use url::Url;

/// Canonical page identity used as the store key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageKey(String);

impl PageKey {
    /// Wraps an already-canonical key.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Derives the key for a location: origin followed by path.
    ///
    /// Locations that are not absolute URLs are cut at the first `?` or `#`.
    ///
    /// ```
    /// use reading_progress::PageKey;
    ///
    /// let key = PageKey::from_location("https://example.com/post/1?ref=feed#comments");
    /// assert_eq!(key.as_str(), "https://example.com/post/1");
    /// ```
    pub fn from_location(location: &str) -> Self {
        match Url::parse(location) {
            Ok(url) => Self(format!("{}{}", url.origin().ascii_serialization(), url.path())),
            Err(_) => {
                let end = location.find(['?', '#']).unwrap_or(location.len());
                Self(location[..end].to_string())
            }
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PageKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

/// Element id named by the location fragment when the page loaded.
///
/// Captured once, before the controller strips the fragment, and never
/// re-derived for the rest of the page load.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AnchorTarget(String);

impl AnchorTarget {
    /// Wraps a decoded element id. Empty ids are not anchors.
    pub fn new(id: impl Into<String>) -> Option<Self> {
        let id = id.into();
        (!id.is_empty()).then_some(Self(id))
    }

    /// Extracts the anchor from a fragment such as `#part%202`.
    ///
    /// The leading `#` is optional. Percent-escapes are decoded; invalid
    /// UTF-8 after decoding is replaced rather than rejected.
    pub fn from_fragment(fragment: &str) -> Option<Self> {
        let raw = fragment.strip_prefix('#').unwrap_or(fragment);
        Self::new(percent_decode_str(raw).decode_utf8_lossy().into_owned())
    }

    /// Extracts the anchor from a full location, if it has a fragment.
    pub fn from_location(location: &str) -> Option<Self> {
        match Url::parse(location) {
            Ok(url) => url.fragment().and_then(Self::from_fragment),
            Err(_) => location
                .split_once('#')
                .and_then(|(_, fragment)| Self::from_fragment(fragment)),
        }
    }

    /// The decoded element id.
    pub fn id(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AnchorTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Returns `location` with its fragment replaced by `anchor`, or removed when
/// `anchor` is `None`. The query string is kept.
pub(crate) fn with_fragment(location: &str, anchor: Option<&AnchorTarget>) -> String {
    match Url::parse(location) {
        Ok(mut url) => {
            url.set_fragment(anchor.map(AnchorTarget::id));
            url.into()
        }
        Err(_) => {
            let base = location.split_once('#').map_or(location, |(base, _)| base);
            match anchor {
                Some(anchor) => format!("{base}#{}", anchor.id()),
                None => base.to_string(),
            }
        }
    }
}
