use chrono::{DateTime, FixedOffset, Utc};
use serde::Serialize;

// ============================================================================
// Decoded feed tree
// ============================================================================

/// A `<channel>` element as read from an RSS document.
///
/// Channel-level fields are always present; an absent element decodes to an
/// empty string. Items keep their document order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawChannel {
    pub title: String,
    pub link: String,
    pub description: String,
    pub items: Vec<RawItem>,
}

/// An `<item>` element as read from an RSS document.
///
/// Every field is optional. `published` holds the already-decoded `pubDate`;
/// a malformed date never reaches this struct because it fails the whole
/// document during decoding.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawItem {
    pub title: Option<String>,
    pub link: Option<String>,
    pub description: Option<String>,
    pub published: Option<DateTime<FixedOffset>>,
    pub source: Option<RawSource>,
}

/// The `<source url="...">name</source>` attribution of an item.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawSource {
    /// Element text.
    pub name: String,
    /// The `url` attribute.
    pub url: String,
}

// ============================================================================
// Normalized output
// ============================================================================

/// A flattened item with its source attribution resolved.
///
/// Produced once by [`normalize`](fn@crate::feed::normalize) and never mutated
/// afterwards. The serialized field names are part of the JSON export format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedItem {
    #[serde(rename = "Title")]
    pub title: String,
    /// Display name of the source; also the grouping key.
    #[serde(rename = "Source")]
    pub source: String,
    #[serde(rename = "SourceURL")]
    pub source_url: String,
    #[serde(rename = "Link")]
    pub link: String,
    /// Publish instant in UTC, `None` when the item had no `pubDate`.
    #[serde(rename = "PublishDate")]
    pub published: Option<DateTime<Utc>>,
    #[serde(rename = "Description")]
    pub description: String,
}
