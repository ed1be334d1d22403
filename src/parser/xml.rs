use std::borrow::Cow;
use std::sync::LazyLock;

use quick_xml::escape::{resolve_predefined_entity, unescape_with};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use regex::{Captures, Regex};

use crate::error::ParseError;

/// Opens a pull reader over a feed document.
pub(crate) fn reader(xml: &str) -> Reader<&[u8]> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    reader
}

/// The next child of the element currently open, or `None` once it closes.
pub(crate) enum Child<'a> {
    /// A child with content; the caller must consume it up to its end tag.
    Open(BytesStart<'a>),
    /// A self-closing child.
    Empty(BytesStart<'a>),
}

impl<'a> Child<'a> {
    pub(crate) fn name(&self) -> &[u8] {
        match self {
            Child::Open(e) | Child::Empty(e) => e.name().into_inner(),
        }
    }
}

/// An ampersand and the reference that may follow it.
static AMPERSAND: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&(#?[A-Za-z0-9]+;)?").unwrap());

/// Advances to the next child element of the currently open element, skipping text
/// and other non-element events.
pub(crate) fn next_child<'a>(reader: &mut Reader<&'a [u8]>) -> Result<Option<Child<'a>>, ParseError> {
    loop {
        match reader.read_event()? {
            Event::Start(e) => return Ok(Some(Child::Open(e))),
            Event::Empty(e) => return Ok(Some(Child::Empty(e))),
            Event::End(_) => return Ok(None),
            Event::Eof => return Err(ParseError::Truncated),
            _ => {}
        }
    }
}

fn is_known_reference(reference: &str) -> bool {
    let name = reference.trim_end_matches(';');
    name.starts_with('#') || resolve_predefined_entity(name).is_some()
}

/// Resolves entity and character references in text content. HTML entities are
/// understood; unknown references and stray ampersands stay as written.
fn decode_text(raw: &str) -> Cow<'_, str> {
    if let Ok(text) = unescape_with(raw, resolve_predefined_entity) {
        return text;
    }

    let escaped = AMPERSAND.replace_all(raw, |caps: &Captures| match caps.get(1) {
        Some(reference) if is_known_reference(reference.as_str()) => caps[0].to_string(),
        Some(reference) => format!("&amp;{}", reference.as_str()),
        None => "&amp;".to_string(),
    });

    match unescape_with(&escaped, resolve_predefined_entity) {
        Ok(text) => Cow::Owned(text.into_owned()),
        Err(_) => Cow::Borrowed(raw),
    }
}

/// Collects the text content of `child`, consuming it entirely. Nested markup is
/// skipped; CDATA is taken verbatim.
pub(crate) fn read_text(reader: &mut Reader<&[u8]>, child: &Child<'_>) -> Result<String, ParseError> {
    if let Child::Empty(_) = child {
        return Ok(String::new());
    }

    let mut text = String::new();
    loop {
        match reader.read_event()? {
            Event::Text(t) => text.push_str(&decode_text(&String::from_utf8_lossy(&t))),
            Event::CData(c) => text.push_str(&String::from_utf8_lossy(&c.into_inner())),
            Event::Start(e) => {
                reader.read_to_end(e.name())?;
            }
            Event::End(_) => break,
            Event::Eof => return Err(ParseError::Truncated),
            _ => {}
        }
    }

    // Line ends are normalized to `\n` as XML requires.
    let text = text.replace("\r\n", "\n").replace('\r', "\n");
    Ok(text.trim().to_string())
}

/// Consumes `child` and everything below it.
pub(crate) fn skip(reader: &mut Reader<&[u8]>, child: &Child<'_>) -> Result<(), ParseError> {
    if let Child::Open(e) = child {
        reader.read_to_end(e.name())?;
    }
    Ok(())
}

/// Reads `<image><url>...</url></image>`.
pub(crate) fn read_image_url(
    reader: &mut Reader<&[u8]>,
    image: &Child<'_>,
) -> Result<Option<String>, ParseError> {
    if let Child::Empty(_) = image {
        return Ok(None);
    }

    let mut url = None;
    while let Some(child) = next_child(reader)? {
        match child.name() {
            b"url" => url = Some(read_text(reader, &child)?),
            _ => skip(reader, &child)?,
        }
    }

    Ok(url.filter(|url| !url.is_empty()))
}
