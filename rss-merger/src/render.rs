use crate::types::MergedFeed;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io;

pub const RSS_CONTENT_TYPE: &str = "application/rss+xml; charset=utf-8";

/// Serializes a merged feed as an RSS 2.0 document.
///
/// Only titles and links are emitted; the per-source sequence index is an
/// ordering aid and stays internal.
pub fn render(feed: &MergedFeed) -> Vec<u8> {
    let mut writer = Writer::new(Vec::with_capacity(128 + feed.items.len() * 160));
    // Writes into a Vec never fail.
    write_feed(&mut writer, feed).expect("in-memory XML writer failed");
    writer.into_inner()
}

fn write_feed(writer: &mut Writer<Vec<u8>>, feed: &MergedFeed) -> io::Result<()> {
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let mut rss_start = BytesStart::new("rss");
    rss_start.push_attribute(("version", "2.0"));
    writer.write_event(Event::Start(rss_start))?;
    writer.write_event(Event::Start(BytesStart::new("channel")))?;
    write_text_element(writer, "title", &feed.title)?;

    for merged in &feed.items {
        writer.write_event(Event::Start(BytesStart::new("item")))?;
        write_text_element(writer, "title", &merged.item.title)?;
        write_text_element(writer, "link", &merged.item.link)?;
        writer.write_event(Event::End(BytesEnd::new("item")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("channel")))?;
    writer.write_event(Event::End(BytesEnd::new("rss")))?;
    Ok(())
}

fn write_text_element(writer: &mut Writer<Vec<u8>>, tag: &str, text: &str) -> io::Result<()> {
    writer.write_event(Event::Start(BytesStart::new(tag)))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new(tag)))?;
    Ok(())
}
