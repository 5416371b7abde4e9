use std::collections::BTreeMap;

use crate::feed::types::NormalizedItem;

/// Normalized items partitioned by source name.
///
/// Channels iterate in ascending byte order of their name. Within a channel,
/// items are ordered by publish time, most recent first; items with equal
/// timestamps keep their arrival order, and undated items come last.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupedItems {
    groups: BTreeMap<String, Vec<NormalizedItem>>,
}

impl GroupedItems {
    /// Channel names in output order.
    pub fn channels(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    /// Sorted items of one channel.
    pub fn items(&self, channel: &str) -> Option<&[NormalizedItem]> {
        self.groups.get(channel).map(Vec::as_slice)
    }

    /// `(channel, items)` pairs in output order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[NormalizedItem])> {
        self.groups
            .iter()
            .map(|(channel, items)| (channel.as_str(), items.as_slice()))
    }

    /// Number of channels.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Total number of items across all channels.
    pub fn item_count(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }
}

/// Groups items by their source name and sorts each group.
///
/// Arrival order is the initial order of each group; the per-group sort is
/// stable and descending on `published`.
pub fn group_items(items: Vec<NormalizedItem>) -> GroupedItems {
    let mut groups: BTreeMap<String, Vec<NormalizedItem>> = BTreeMap::new();
    for item in items {
        groups.entry(item.source.clone()).or_default().push(item);
    }

    for items in groups.values_mut() {
        // `Option` orders `None` first, so undated items end up last
        items.sort_by(|a, b| b.published.cmp(&a.published));
    }

    GroupedItems { groups }
}
