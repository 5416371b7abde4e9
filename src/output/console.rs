use std::io::{self, Write};

use crate::feed::{GroupedItems, NormalizedItem};
use crate::util::strip_control_chars;

const BANNER: &str = "-----------------------";

/// Writes every channel and its items as plain text.
///
/// Each channel opens with a banner naming it, followed by one block per
/// item. Feed-provided text is passed through [`strip_control_chars`].
pub fn render_text<W: Write>(grouped: &GroupedItems, out: &mut W) -> io::Result<()> {
    for (channel, items) in grouped.iter() {
        writeln!(out, "{BANNER}")?;
        writeln!(out, "RSS items in channel {}:", strip_control_chars(channel))?;
        writeln!(out, "{BANNER}")?;
        writeln!(out)?;

        for item in items {
            render_item(item, out)?;
        }
    }
    out.flush()
}

fn render_item<W: Write>(item: &NormalizedItem, out: &mut W) -> io::Result<()> {
    let published = item
        .published
        .map(|p| p.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "unknown".to_string());

    writeln!(out, "Title: {}", strip_control_chars(&item.title))?;
    writeln!(out, "Source: {}", strip_control_chars(&item.source))?;
    writeln!(out, "Source URL: {}", strip_control_chars(&item.source_url))?;
    writeln!(out, "Link: {}", strip_control_chars(&item.link))?;
    writeln!(out, "Publish Date: {published}")?;
    writeln!(out, "Description: {}", strip_control_chars(&item.description))?;
    writeln!(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::group_items;
    use pretty_assertions::assert_eq;

    fn item(source: &str, title: &str, published: Option<&str>) -> NormalizedItem {
        NormalizedItem {
            title: title.to_string(),
            source: source.to_string(),
            source_url: "http://example.com/".to_string(),
            link: format!("http://example.com/{title}"),
            published: published.map(|p| p.parse().unwrap()),
            description: "desc".to_string(),
        }
    }

    fn render(grouped: &GroupedItems) -> String {
        let mut out = Vec::new();
        render_text(grouped, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_render_single_channel() {
        let grouped = group_items(vec![item("News", "one", Some("2003-06-03T09:39:21Z"))]);

        let expected = "\
-----------------------
RSS items in channel News:
-----------------------

Title: one
Source: News
Source URL: http://example.com/
Link: http://example.com/one
Publish Date: 2003-06-03 09:39:21 UTC
Description: desc

";
        assert_eq!(render(&grouped), expected);
    }

    #[test]
    fn test_render_channels_in_order() {
        let grouped = group_items(vec![item("Zeta", "z", None), item("Alpha", "a", None)]);
        let text = render(&grouped);

        let alpha = text.find("channel Alpha").unwrap();
        let zeta = text.find("channel Zeta").unwrap();
        assert!(alpha < zeta);
        assert!(text.contains("Publish Date: unknown"));
    }

    #[test]
    fn test_render_strips_escape_sequences() {
        let grouped = group_items(vec![item("News", "\u{1b}[2Jwiped", None)]);
        let text = render(&grouped);

        assert!(text.contains("Title: wiped\n"));
        assert!(!text.contains('\u{1b}'));
    }

    #[test]
    fn test_render_empty() {
        assert_eq!(render(&GroupedItems::default()), "");
    }
}
