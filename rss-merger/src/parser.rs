use crate::types::{FeedItem, ParseError, ParsedFeed};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::mem;
use tracing::debug;

/// Parses an RSS 2.0 document into its channel title and items.
///
/// The channel title at `rss/channel/title` is mandatory. Item titles and
/// links are kept exactly as written in the document; the only decoding
/// applied is what XML itself requires (character references, CDATA).
pub fn parse(raw: &[u8]) -> Result<ParsedFeed, ParseError> {
    let document = read_document(raw)?;

    if !document.channel_seen {
        return Err(ParseError::malformed("tag <channel> not found"));
    }
    let title = document
        .title
        .ok_or_else(|| ParseError::malformed("tag <title> not found in <channel>"))?;
    let items = document.items.into_feed_items();

    debug!("Parsed feed '{}' with {} items", title, items.len());
    Ok(ParsedFeed { title, items })
}

#[derive(Debug, Default)]
struct RawItem {
    title: Option<String>,
    link: Option<String>,
}

impl RawItem {
    fn into_feed_item(self, sequence_index: usize) -> FeedItem {
        FeedItem {
            sequence_index,
            title: self.title.unwrap_or_default(),
            link: self.link.unwrap_or_default(),
        }
    }
}

/// The item list of a channel as it appears in the document.
#[derive(Debug, Default)]
enum ItemNodes {
    #[default]
    NoItems,
    SingleItem(RawItem),
    ItemList(Vec<RawItem>),
}

impl ItemNodes {
    fn push(self, item: RawItem) -> Self {
        match self {
            ItemNodes::NoItems => ItemNodes::SingleItem(item),
            ItemNodes::SingleItem(first) => ItemNodes::ItemList(vec![first, item]),
            ItemNodes::ItemList(mut items) => {
                items.push(item);
                ItemNodes::ItemList(items)
            }
        }
    }

    fn into_feed_items(self) -> Vec<FeedItem> {
        let raw = match self {
            ItemNodes::NoItems => Vec::new(),
            ItemNodes::SingleItem(item) => vec![item],
            ItemNodes::ItemList(items) => items,
        };

        raw.into_iter()
            .enumerate()
            .map(|(index, item)| item.into_feed_item(index))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    ChannelTitle,
    ItemTitle,
    ItemLink,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Location {
    Channel,
    Item,
    Field(Field),
    Other,
}

#[derive(Debug)]
struct Capture {
    field: Field,
    depth: usize,
    text: String,
}

#[derive(Debug, Default)]
struct Document {
    path: Vec<Vec<u8>>,
    root_seen: bool,
    channel_seen: bool,
    title: Option<String>,
    items: ItemNodes,
    current_item: Option<RawItem>,
    capture: Option<Capture>,
}

impl Document {
    fn location(&self) -> Location {
        let path: Vec<&[u8]> = self.path.iter().map(Vec::as_slice).collect();
        match path.as_slice() {
            [b"rss", b"channel"] => Location::Channel,
            [b"rss", b"channel", b"title"] => Location::Field(Field::ChannelTitle),
            [b"rss", b"channel", b"item"] => Location::Item,
            [b"rss", b"channel", b"item", b"title"] => Location::Field(Field::ItemTitle),
            [b"rss", b"channel", b"item", b"link"] => Location::Field(Field::ItemLink),
            _ => Location::Other,
        }
    }

    fn open(&mut self, name: &[u8]) -> Result<(), ParseError> {
        if self.path.is_empty() {
            if self.root_seen {
                return Err(ParseError::malformed("more than one root element"));
            }
            if name != b"rss" {
                return Err(ParseError::malformed(format!(
                    "expected <rss> root element, found <{}>",
                    String::from_utf8_lossy(name)
                )));
            }
            self.root_seen = true;
        }

        self.path.push(name.to_vec());
        match self.location() {
            Location::Channel => self.channel_seen = true,
            Location::Item => self.current_item = Some(RawItem::default()),
            Location::Field(field) => {
                self.capture = Some(Capture {
                    field,
                    depth: self.path.len(),
                    text: String::new(),
                })
            }
            Location::Other => {}
        }
        Ok(())
    }

    fn close(&mut self) {
        match self.location() {
            Location::Field(_) => {
                if let Some(capture) = self.capture.take() {
                    self.assign(capture.field, capture.text);
                }
            }
            Location::Item => {
                if let Some(item) = self.current_item.take() {
                    self.items = mem::take(&mut self.items).push(item);
                }
            }
            Location::Channel | Location::Other => {}
        }
        self.path.pop();
    }

    fn append(&mut self, text: &str) {
        if let Some(capture) = self.capture.as_mut() {
            // Text of nested markup inside a field is not part of its value.
            if capture.depth == self.path.len() {
                capture.text.push_str(text);
            }
        }
    }

    // First occurrence wins for duplicated fields.
    fn assign(&mut self, field: Field, text: String) {
        match field {
            Field::ChannelTitle => {
                self.title.get_or_insert(text);
            }
            Field::ItemTitle => {
                if let Some(item) = self.current_item.as_mut() {
                    item.title.get_or_insert(text);
                }
            }
            Field::ItemLink => {
                if let Some(item) = self.current_item.as_mut() {
                    item.link.get_or_insert(text);
                }
            }
        }
    }
}

fn read_document(raw: &[u8]) -> Result<Document, ParseError> {
    let mut reader = Reader::from_reader(raw);
    let mut document = Document::default();
    let mut buf = Vec::new();

    loop {
        let event = reader.read_event_into(&mut buf).map_err(|e| {
            ParseError::malformed(format!("error at position {}: {}", reader.buffer_position(), e))
        })?;

        match event {
            Event::Start(e) => document.open(e.name().as_ref())?,
            Event::Empty(e) => {
                document.open(e.name().as_ref())?;
                document.close();
            }
            Event::End(_) => document.close(),
            Event::Text(e) => {
                let text = e
                    .unescape()
                    .map_err(|e| ParseError::malformed(format!("invalid text: {}", e)))?;
                check_chars(&text, reader.buffer_position())?;
                document.append(&text);
            }
            Event::CData(e) => {
                let text = std::str::from_utf8(&e)
                    .map_err(|e| ParseError::malformed(format!("invalid CDATA: {}", e)))?;
                check_chars(text, reader.buffer_position())?;
                document.append(text);
            }
            Event::Eof => break,
            _ => (),
        }
        buf.clear();
    }

    if let Some(open) = document.path.last() {
        return Err(ParseError::malformed(format!(
            "tag <{}> not closed",
            String::from_utf8_lossy(open)
        )));
    }
    if !document.root_seen {
        return Err(ParseError::malformed("tag <rss> not found"));
    }

    Ok(document)
}

/// Rejects characters outside the XML 1.0 `Char` production, whether written
/// raw or as character references.
fn check_chars(text: &str, position: impl std::fmt::Display) -> Result<(), ParseError> {
    match text.chars().find(|c| !is_xml_char(*c)) {
        Some(c) => Err(ParseError::malformed(format!(
            "character U+{:04X} not allowed in XML near position {}",
            c as u32, position
        ))),
        None => Ok(()),
    }
}

fn is_xml_char(c: char) -> bool {
    matches!(c, '\u{9}' | '\u{A}' | '\u{D}' | '\u{20}'..='\u{D7FF}' | '\u{E000}'..='\u{FFFD}' | '\u{10000}'..='\u{10FFFF}')
}
