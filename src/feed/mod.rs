//! RSS 2.0 feed retrieval and normalization.
//!
//! The pipeline runs leaf-first through five stages:
//!
//! - [`date`] - `pubDate` decoding with a named-zone and a numeric-zone layout
//! - [`parser`] - XML decoding into [`RawChannel`]/[`RawItem`] trees
//! - [`fetcher`] - HTTP GET of each feed URL
//! - [`normalize`](mod@normalize) - flattening with channel-level source fallback
//! - [`group`] - grouping by source name and per-group recency sort
//!
//! [`read_feeds`] chains the first four; [`group_items`] is applied by the
//! caller before rendering.
//!
//! # Example
//!
//! ```ignore
//! use rssreader::feed::{build_client, group_items, read_feeds, ReadOptions};
//!
//! let options = ReadOptions::default();
//! let client = build_client("rssreader/0.1", options.fetch.host_policy)?;
//! let items = read_feeds(&client, &urls, &options).await?;
//! for (channel, items) in group_items(items).iter() {
//!     println!("{channel}: {} items", items.len());
//! }
//! ```

pub mod date;
pub mod fetcher;
pub mod group;
pub mod normalize;
pub mod parser;
pub mod types;

use futures::stream::{self, StreamExt, TryStreamExt};
use thiserror::Error;

pub use date::{decode_pub_date, MalformedDate};
pub use fetcher::{build_client, fetch_feed, FetchError, FetchOptions, RedirectError};
pub use group::{group_items, GroupedItems};
pub use normalize::normalize;
pub use parser::{parse_feed, DecodeError};
pub use types::{NormalizedItem, RawChannel, RawItem, RawSource};

/// The first failure of a run, tagged with the URL it came from.
#[derive(Debug, Error)]
pub enum ReadError {
    #[error("Failed to fetch {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: FetchError,
    },
    #[error("Failed to decode {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: DecodeError,
    },
}

impl ReadError {
    /// URL of the feed that failed.
    pub fn url(&self) -> &str {
        match self {
            ReadError::Fetch { url, .. } | ReadError::Decode { url, .. } => url,
        }
    }
}

/// Options for [`read_feeds`].
#[derive(Debug, Clone)]
pub struct ReadOptions {
    pub fetch: FetchOptions,
    /// Feeds fetched at the same time. `1` fetches strictly one after another.
    pub concurrency: usize,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            fetch: FetchOptions::default(),
            concurrency: 1,
        }
    }
}

/// Fetches, decodes and normalizes every feed in `urls`.
///
/// Items come back in URL order, then channel order, then document order,
/// regardless of `options.concurrency`.
///
/// # Errors
///
/// Fails fast: the first URL (in input order) whose fetch or decode fails
/// aborts the run, in-flight requests are dropped and no items are returned.
/// There is no partial-success mode.
pub async fn read_feeds(
    client: &reqwest::Client,
    urls: &[String],
    options: &ReadOptions,
) -> Result<Vec<NormalizedItem>, ReadError> {
    let documents: Vec<Vec<RawChannel>> = stream::iter(urls)
        .map(|url| read_channels(client, url, &options.fetch))
        .buffered(options.concurrency.max(1))
        .try_collect()
        .await?;

    let channels: Vec<RawChannel> = documents.into_iter().flatten().collect();
    let items = normalize(channels);

    tracing::info!(feeds = urls.len(), items = items.len(), "Read feeds");
    Ok(items)
}

async fn read_channels(
    client: &reqwest::Client,
    url: &str,
    options: &FetchOptions,
) -> Result<Vec<RawChannel>, ReadError> {
    let bytes = fetch_feed(client, url, options)
        .await
        .map_err(|source| ReadError::Fetch {
            url: url.to_string(),
            source,
        })?;

    let channels = parse_feed(&bytes).map_err(|source| ReadError::Decode {
        url: url.to_string(),
        source,
    })?;

    tracing::debug!(
        url = %url,
        bytes = bytes.len(),
        channels = channels.len(),
        "Decoded feed"
    );
    Ok(channels)
}
