use chrono::Utc;

use crate::feed::types::{NormalizedItem, RawChannel, RawItem, RawSource};

/// Flattens decoded channels into normalized items.
///
/// Output order is channel order, then item order within each channel; nothing
/// is reordered here. Missing item text becomes an empty string. An item whose
/// `<source>` name or URL is empty inherits the channel title or link
/// respectively, so the two fields fall back independently.
pub fn normalize(channels: Vec<RawChannel>) -> Vec<NormalizedItem> {
    channels
        .into_iter()
        .flat_map(|channel| {
            let RawChannel {
                title, link, items, ..
            } = channel;
            let fallback = RawSource {
                name: title,
                url: link,
            };
            items
                .into_iter()
                .map(move |item| normalize_item(item, &fallback))
        })
        .collect()
}

fn normalize_item(item: RawItem, fallback: &RawSource) -> NormalizedItem {
    let RawSource { name, url } = item.source.unwrap_or_default();

    NormalizedItem {
        title: item.title.unwrap_or_default(),
        source: non_empty_or(name, &fallback.name),
        source_url: non_empty_or(url, &fallback.url),
        link: item.link.unwrap_or_default(),
        published: item.published.map(|p| p.with_timezone(&Utc)),
        description: item.description.unwrap_or_default(),
    }
}

fn non_empty_or(value: String, fallback: &str) -> String {
    if value.is_empty() {
        fallback.to_string()
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone};
    use pretty_assertions::assert_eq;

    fn channel(title: &str, link: &str, items: Vec<RawItem>) -> RawChannel {
        RawChannel {
            title: title.to_string(),
            link: link.to_string(),
            description: String::new(),
            items,
        }
    }

    fn titled(title: &str) -> RawItem {
        RawItem {
            title: Some(title.to_string()),
            ..RawItem::default()
        }
    }

    #[test]
    fn test_item_source_wins_over_channel() {
        let item = RawItem {
            source: Some(RawSource {
                name: "Tomalak's Realm".to_string(),
                url: "http://www.tomalak.org/links2.xml".to_string(),
            }),
            ..titled("Star City")
        };

        let items = normalize(vec![channel("Liftoff News", "http://liftoff/", vec![item])]);
        assert_eq!(items[0].source, "Tomalak's Realm");
        assert_eq!(items[0].source_url, "http://www.tomalak.org/links2.xml");
    }

    #[test]
    fn test_missing_source_falls_back_to_channel() {
        let items = normalize(vec![channel(
            "Liftoff News",
            "http://liftoff.msfc.nasa.gov/",
            vec![RawItem::default()],
        )]);

        assert_eq!(
            items,
            vec![NormalizedItem {
                title: String::new(),
                source: "Liftoff News".to_string(),
                source_url: "http://liftoff.msfc.nasa.gov/".to_string(),
                link: String::new(),
                published: None,
                description: String::new(),
            }]
        );
    }

    #[test]
    fn test_partial_source_falls_back_per_field() {
        let name_only = RawItem {
            source: Some(RawSource {
                name: "Elsewhere".to_string(),
                url: String::new(),
            }),
            ..RawItem::default()
        };
        let url_only = RawItem {
            source: Some(RawSource {
                name: String::new(),
                url: "http://elsewhere/".to_string(),
            }),
            ..RawItem::default()
        };

        let items = normalize(vec![channel("Home", "http://home/", vec![name_only, url_only])]);
        assert_eq!(
            (items[0].source.as_str(), items[0].source_url.as_str()),
            ("Elsewhere", "http://home/")
        );
        assert_eq!(
            (items[1].source.as_str(), items[1].source_url.as_str()),
            ("Home", "http://elsewhere/")
        );
    }

    #[test]
    fn test_channel_then_item_order_preserved() {
        let items = normalize(vec![
            channel("B", "http://b/", vec![titled("b1"), titled("b2")]),
            channel("A", "http://a/", vec![titled("a1")]),
            channel("Empty", "http://e/", vec![]),
        ]);

        let titles: Vec<_> = items.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["b1", "b2", "a1"]);
    }

    #[test]
    fn test_published_normalized_to_utc() {
        let published = DateTime::parse_from_rfc2822("Tue, 03 Jun 2003 11:39:21 +0200").unwrap();
        let item = RawItem {
            published: Some(published),
            ..RawItem::default()
        };

        let items = normalize(vec![channel("C", "http://c/", vec![item])]);
        assert_eq!(
            items[0].published,
            Some(Utc.with_ymd_and_hms(2003, 6, 3, 9, 39, 21).unwrap())
        );
    }

    #[test]
    fn test_no_channels() {
        assert!(normalize(Vec::new()).is_empty());
    }
}
