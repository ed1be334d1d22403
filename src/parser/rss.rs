use quick_xml::Reader;

use super::xml::{next_child, read_image_url, read_text, skip, Child};
use super::{build_post, Dialect, RawItem};
use crate::error::ParseError;
use crate::model::Feed;

/// Parses the children of `<rss>`, expecting a `<channel>` among them.
pub(super) fn read_rss(
    reader: &mut Reader<&[u8]>,
    source_url: &str,
    is_default: bool,
) -> Result<Feed, ParseError> {
    while let Some(child) = next_child(reader)? {
        match child.name() {
            b"channel" => return read_channel(reader, &child, source_url, is_default),
            _ => skip(reader, &child)?,
        }
    }

    Err(ParseError::MissingField("channel"))
}

fn read_channel(
    reader: &mut Reader<&[u8]>,
    channel: &Child<'_>,
    source_url: &str,
    is_default: bool,
) -> Result<Feed, ParseError> {
    let mut title = None;
    let mut link = None;
    let mut description = None;
    let mut image_url = None;
    let mut items = Vec::new();

    if let Child::Open(_) = channel {
        while let Some(child) = next_child(reader)? {
            match child.name() {
                b"title" => title = Some(read_text(reader, &child)?),
                b"link" => link = Some(read_text(reader, &child)?),
                b"description" => description = Some(read_text(reader, &child)?),
                b"image" => image_url = read_image_url(reader, &child)?,
                b"item" => items.push(read_item(reader, &child)?),
                _ => skip(reader, &child)?,
            }
        }
    }

    let title = title.ok_or(ParseError::MissingField("title"))?;
    let link = link.ok_or(ParseError::MissingField("link"))?;

    let posts = items
        .into_iter()
        .map(|item| build_post(item, &title, Dialect::Rss))
        .collect();

    Ok(Feed {
        title,
        link,
        description: description.unwrap_or_default(),
        image_url,
        posts,
        source_url: source_url.to_string(),
        is_default,
    })
}

fn read_item(reader: &mut Reader<&[u8]>, item: &Child<'_>) -> Result<RawItem, ParseError> {
    let mut raw = RawItem::default();
    if let Child::Empty(_) = item {
        return Ok(raw);
    }

    while let Some(child) = next_child(reader)? {
        match child.name() {
            b"title" => raw.title = Some(read_text(reader, &child)?),
            b"link" => raw.link = Some(read_text(reader, &child)?),
            b"description" => raw.description = Some(read_text(reader, &child)?),
            b"content:encoded" => raw.content = Some(read_text(reader, &child)?),
            b"pubDate" => raw.date = Some(read_text(reader, &child)?),
            b"dc:creator" => raw.creator = Some(read_text(reader, &child)?),
            _ => skip(reader, &child)?,
        }
    }

    Ok(raw)
}
