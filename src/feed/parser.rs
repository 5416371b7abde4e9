use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use thiserror::Error;

use crate::feed::date::{decode_pub_date, MalformedDate};
use crate::feed::types::{RawChannel, RawItem, RawSource};

/// Errors that fail the decoding of a whole feed document.
///
/// Decoding is all-or-nothing: one malformed item invalidates every channel
/// in the document.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The document is not well-formed XML.
    #[error("XML parse error at byte {position}: {source}")]
    Xml {
        position: u64,
        #[source]
        source: quick_xml::Error,
    },

    /// An item carries a `pubDate` in neither accepted layout.
    #[error("Invalid item date: {0}")]
    MalformedDate(#[from] MalformedDate),

    /// The input holds no root element at all.
    #[error("Document has no root element")]
    NoRootElement,

    /// The input ended while elements were still open.
    #[error("Unexpected end of document inside <{0}>")]
    UnexpectedEof(String),
}

/// Element whose text is being collected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    ChannelTitle,
    ChannelLink,
    ChannelDescription,
    ItemTitle,
    ItemLink,
    ItemDescription,
    ItemPubDate,
    ItemSource,
}

impl Field {
    fn for_channel_child(name: &[u8]) -> Option<Self> {
        match name {
            b"title" => Some(Field::ChannelTitle),
            b"link" => Some(Field::ChannelLink),
            b"description" => Some(Field::ChannelDescription),
            _ => None,
        }
    }

    fn for_item_child(name: &[u8]) -> Option<Self> {
        match name {
            b"title" => Some(Field::ItemTitle),
            b"link" => Some(Field::ItemLink),
            b"description" => Some(Field::ItemDescription),
            b"pubDate" => Some(Field::ItemPubDate),
            b"source" => Some(Field::ItemSource),
            _ => None,
        }
    }
}

struct Capture {
    field: Field,
    /// Stack depth of the captured element; only its direct text is kept.
    depth: usize,
    text: String,
    /// `url` attribute, only read for `<source>`.
    url: String,
}

/// Decodes an RSS 2.0 document into its channels.
///
/// Every `<channel>` directly under the root element becomes one
/// [`RawChannel`], in document order; a document without channels decodes to
/// an empty `Vec`. Only unprefixed elements are read, so namespaced
/// extensions such as `<atom:link>` never shadow the RSS fields. Text is
/// entity-unescaped and CDATA sections are taken verbatim. Leading whitespace
/// before the XML declaration is tolerated.
///
/// # Errors
///
/// - [`DecodeError::Xml`] for malformed XML, mismatched tags or bad escapes
/// - [`DecodeError::MalformedDate`] when any item's `pubDate` fails to decode
/// - [`DecodeError::NoRootElement`] for empty or whitespace-only input
/// - [`DecodeError::UnexpectedEof`] for truncated documents
///
/// # Security
///
/// `quick-xml` (0.37) does not parse `<!ENTITY>` declarations; only the five
/// predefined entities and character references are resolved, and custom
/// entities surface as [`DecodeError::Xml`].
pub fn parse_feed(bytes: &[u8]) -> Result<Vec<RawChannel>, DecodeError> {
    FeedParser::default().run(bytes.trim_ascii_start())
}

#[derive(Default)]
struct FeedParser {
    /// Qualified names of the currently open elements, root first.
    stack: Vec<Vec<u8>>,
    seen_root: bool,
    channels: Vec<RawChannel>,
    channel: Option<RawChannel>,
    item: Option<RawItem>,
    capture: Option<Capture>,
}

impl FeedParser {
    fn run(mut self, bytes: &[u8]) -> Result<Vec<RawChannel>, DecodeError> {
        let mut reader = Reader::from_reader(bytes);
        let mut buf = Vec::new();

        loop {
            let event = reader
                .read_event_into(&mut buf)
                .map_err(|e| xml_error(&reader, e))?;

            match event {
                Event::Start(e) => {
                    self.open(&e, &reader)?;
                    self.stack.push(e.name().as_ref().to_vec());
                }
                Event::Empty(e) => {
                    self.open(&e, &reader)?;
                    self.stack.push(e.name().as_ref().to_vec());
                    self.close()?;
                }
                Event::End(_) => self.close()?,
                Event::Text(e) => {
                    if self.capturing_text() {
                        let text = e.unescape().map_err(|err| xml_error(&reader, err))?;
                        self.push_text(&text);
                    }
                }
                Event::CData(e) => {
                    if self.capturing_text() {
                        let text = reader
                            .decoder()
                            .decode(&e)
                            .map_err(|err| xml_error(&reader, err))?;
                        self.push_text(&text);
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        if let Some(open) = self.stack.last() {
            return Err(DecodeError::UnexpectedEof(
                String::from_utf8_lossy(open).into_owned(),
            ));
        }
        if !self.seen_root {
            return Err(DecodeError::NoRootElement);
        }

        Ok(self.channels)
    }

    /// Handles an opening tag before it is pushed onto the stack.
    fn open(&mut self, e: &BytesStart<'_>, reader: &Reader<&[u8]>) -> Result<(), DecodeError> {
        let name = e.name();
        let name = name.as_ref();
        let depth = self.stack.len() + 1;

        match self.stack.len() {
            0 => self.seen_root = true,
            1 if name == b"channel" => self.channel = Some(RawChannel::default()),
            2 if self.channel.is_some() => {
                if name == b"item" {
                    self.item = Some(RawItem::default());
                } else if let Some(field) = Field::for_channel_child(name) {
                    self.start_capture(field, depth);
                }
            }
            3 if self.item.is_some() => {
                if let Some(field) = Field::for_item_child(name) {
                    self.start_capture(field, depth);
                    if field == Field::ItemSource {
                        let url = source_url(e, reader)?;
                        if let Some(capture) = self.capture.as_mut() {
                            capture.url = url;
                        }
                    }
                }
            }
            _ => {}
        }

        Ok(())
    }

    /// Handles a closing tag (or the implicit close of an empty element).
    fn close(&mut self) -> Result<(), DecodeError> {
        let depth = self.stack.len();

        if self
            .capture
            .as_ref()
            .is_some_and(|capture| capture.depth == depth)
        {
            if let Some(capture) = self.capture.take() {
                self.finish_capture(capture)?;
            }
        } else if depth == 3 {
            if let (Some(item), Some(channel)) = (self.item.take(), self.channel.as_mut()) {
                channel.items.push(item);
            }
        } else if depth == 2 {
            if let Some(channel) = self.channel.take() {
                self.channels.push(channel);
            }
        }

        self.stack.pop();
        Ok(())
    }

    fn start_capture(&mut self, field: Field, depth: usize) {
        self.capture = Some(Capture {
            field,
            depth,
            text: String::new(),
            url: String::new(),
        });
    }

    fn capturing_text(&self) -> bool {
        self.capture
            .as_ref()
            .is_some_and(|capture| capture.depth == self.stack.len())
    }

    fn push_text(&mut self, text: &str) {
        if let Some(capture) = self.capture.as_mut() {
            capture.text.push_str(text);
        }
    }

    fn finish_capture(&mut self, capture: Capture) -> Result<(), DecodeError> {
        let Capture {
            field, text, url, ..
        } = capture;

        // A repeated element overwrites the earlier value
        match field {
            Field::ChannelTitle | Field::ChannelLink | Field::ChannelDescription => {
                if let Some(channel) = self.channel.as_mut() {
                    match field {
                        Field::ChannelTitle => channel.title = text,
                        Field::ChannelLink => channel.link = text,
                        _ => channel.description = text,
                    }
                }
            }
            Field::ItemPubDate => {
                let published = decode_pub_date(&text)?;
                if let Some(item) = self.item.as_mut() {
                    item.published = Some(published);
                }
            }
            Field::ItemSource => {
                if let Some(item) = self.item.as_mut() {
                    item.source = Some(RawSource { name: text, url });
                }
            }
            Field::ItemTitle | Field::ItemLink | Field::ItemDescription => {
                if let Some(item) = self.item.as_mut() {
                    match field {
                        Field::ItemTitle => item.title = Some(text),
                        Field::ItemLink => item.link = Some(text),
                        _ => item.description = Some(text),
                    }
                }
            }
        }

        Ok(())
    }
}

fn source_url(e: &BytesStart<'_>, reader: &Reader<&[u8]>) -> Result<String, DecodeError> {
    for attr in e.attributes() {
        let attr = attr.map_err(|err| xml_error(reader, err))?;
        if attr.key.as_ref() == b"url" {
            let value = attr
                .decode_and_unescape_value(reader.decoder())
                .map_err(|err| xml_error(reader, err))?;
            return Ok(value.into_owned());
        }
    }
    Ok(String::new())
}

fn xml_error(reader: &Reader<&[u8]>, err: impl Into<quick_xml::Error>) -> DecodeError {
    DecodeError::Xml {
        position: reader.buffer_position() as u64,
        source: err.into(),
    }
}
