use std::collections::HashMap;

use quick_xml::Reader;

use super::xml::{next_child, read_image_url, read_text, skip, Child};
use super::{build_post, Dialect, RawItem};
use crate::error::ParseError;
use crate::model::Feed;

/// Parses the children of `<rdf:RDF>`. The channel's own fields sit inside
/// `<channel>`, while `<image>` and `<item>` are its siblings.
pub(super) fn read_rdf(
    reader: &mut Reader<&[u8]>,
    source_url: &str,
    is_default: bool,
) -> Result<Feed, ParseError> {
    let mut properties = HashMap::new();
    let mut image_url = None;
    let mut items = Vec::new();

    while let Some(child) = next_child(reader)? {
        match child.name() {
            b"channel" => properties.extend(read_channel_properties(reader, &child)?),
            b"image" => image_url = read_image_url(reader, &child)?,
            b"item" => items.push(read_item(reader, &child)?),
            _ => skip(reader, &child)?,
        }
    }

    let title = properties
        .remove("title")
        .ok_or(ParseError::MissingField("title"))?;
    let link = properties
        .remove("link")
        .ok_or(ParseError::MissingField("link"))?;

    let posts = items
        .into_iter()
        .map(|item| build_post(item, &title, Dialect::Rdf))
        .collect();

    Ok(Feed {
        title,
        link,
        description: properties.remove("description").unwrap_or_default(),
        image_url,
        posts,
        source_url: source_url.to_string(),
        is_default,
    })
}

fn read_channel_properties(
    reader: &mut Reader<&[u8]>,
    channel: &Child<'_>,
) -> Result<HashMap<&'static str, String>, ParseError> {
    let mut properties = HashMap::new();
    if let Child::Empty(_) = channel {
        return Ok(properties);
    }

    while let Some(child) = next_child(reader)? {
        let key = match child.name() {
            b"title" => "title",
            b"link" => "link",
            b"description" => "description",
            _ => {
                skip(reader, &child)?;
                continue;
            }
        };
        properties.insert(key, read_text(reader, &child)?);
    }

    Ok(properties)
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
            b"dc:date" => raw.date = Some(read_text(reader, &child)?),
            b"dc:creator" => raw.creator = Some(read_text(reader, &child)?),
            _ => skip(reader, &child)?,
        }
    }

    Ok(raw)
}
