use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::feed::{GroupedItems, NormalizedItem};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Failed to serialize items: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Failed to write '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// One exported channel: `{"Channel": ..., "Items": [...]}`.
#[derive(Serialize)]
struct ChannelRecord<'a> {
    #[serde(rename = "Channel")]
    channel: &'a str,
    #[serde(rename = "Items")]
    items: &'a [NormalizedItem],
}

/// Serializes the grouped items as a pretty-printed JSON array.
///
/// Channels appear in the same order as on the console. `PublishDate` is an
/// RFC 3339 UTC timestamp, or `null` for undated items.
pub fn render_json(grouped: &GroupedItems) -> Result<String, serde_json::Error> {
    let records: Vec<ChannelRecord<'_>> = grouped
        .iter()
        .map(|(channel, items)| ChannelRecord { channel, items })
        .collect();
    serde_json::to_string_pretty(&records)
}

/// Writes `rss_items_<unix-seconds>.json` into `dir` and returns its path.
///
/// The file is written to a temporary sibling first and renamed into place,
/// so a failed export never leaves a partial file behind.
pub fn export_json(
    grouped: &GroupedItems,
    dir: &Path,
    now: DateTime<Utc>,
) -> Result<PathBuf, ExportError> {
    let mut json = render_json(grouped)?;
    json.push('\n');

    let path = dir.join(format!("rss_items_{}.json", now.timestamp()));
    atomic_write(&path, json.as_bytes())?;

    tracing::info!(path = %path.display(), channels = grouped.len(), "Exported items as JSON");
    Ok(path)
}

fn atomic_write(dst: &Path, content: &[u8]) -> Result<(), ExportError> {
    // Unpredictable temp name so nothing can pre-place a symlink there
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let temp_path = dst.with_extension(format!("json.tmp.{:016x}", nanos));

    let result = write_new_file(&temp_path, content)
        .map_err(|source| ExportError::Io {
            path: temp_path.clone(),
            source,
        })
        .and_then(|()| {
            std::fs::rename(&temp_path, dst).map_err(|source| ExportError::Io {
                path: dst.to_path_buf(),
                source,
            })
        });

    if result.is_err() {
        let _ = std::fs::remove_file(&temp_path);
    }
    result
}

fn write_new_file(path: &Path, content: &[u8]) -> std::io::Result<()> {
    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create_new(true) // Fails if the path exists, including as a symlink
        .open(path)?;
    file.write_all(content)?;
    file.sync_all()
}
