//! Feed document parsing.
//!
//! Two XML dialects are understood:
//!
//! - **RSS 2.0**: `rss > channel > {title, link, description, image > url, item*}`
//! - **RDF / RSS 1.0**: `rdf:RDF > {channel > {title, link, description}, image > url, item*}`
//!
//! [`parse`] looks at the document root and hands the rest of the document to the
//! matching dialect reader. Both dialects build their posts through the same
//! normalization steps (date, text, image).

mod rdf;
mod rss;
mod xml;

use quick_xml::events::Event;

use crate::error::ParseError;
use crate::model::{Feed, Post};
use crate::normalize::{clean_text, normalize_date, pull_post_image_url};

/// Parses a raw feed document into a [`Feed`] keyed by `source_url`.
///
/// # Errors
///
/// - [`ParseError::UnsupportedFormat`] when the root is neither `rss` nor `rdf:RDF`
/// - [`ParseError::MissingField`] when the channel has no `title` or `link`
/// - [`ParseError::EmptyDocument`] when there is no root element
/// - [`ParseError::Xml`] for malformed XML
pub fn parse(source_url: &str, raw_xml: &str, is_default: bool) -> Result<Feed, ParseError> {
    let mut reader = xml::reader(raw_xml);

    let root = loop {
        match reader.read_event()? {
            Event::Start(e) => break e,
            Event::Empty(e) => {
                return Err(unsupported_or_missing(e.name().into_inner()));
            }
            Event::Eof => return Err(ParseError::EmptyDocument),
            _ => {}
        }
    };

    match root.name().into_inner() {
        b"rss" => rss::read_rss(&mut reader, source_url, is_default),
        b"rdf:RDF" => rdf::read_rdf(&mut reader, source_url, is_default),
        other => Err(ParseError::UnsupportedFormat(
            String::from_utf8_lossy(other).into_owned(),
        )),
    }
}

/// A self-closing root carries no channel at all.
fn unsupported_or_missing(name: &[u8]) -> ParseError {
    match name {
        b"rss" | b"rdf:RDF" => ParseError::MissingField("channel"),
        other => ParseError::UnsupportedFormat(String::from_utf8_lossy(other).into_owned()),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dialect {
    Rss,
    Rdf,
}

/// Item fields exactly as they appeared in the document.
#[derive(Debug, Default)]
struct RawItem {
    title: Option<String>,
    link: Option<String>,
    description: Option<String>,
    content: Option<String>,
    date: Option<String>,
    creator: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn build_post(item: RawItem, feed_title: &str, dialect: Dialect) -> Post {
    let link = non_empty(item.link);

    // RDF sources rarely inline usable pictures; their images are left at feed level.
    let image_url = match dialect {
        Dialect::Rss => pull_post_image_url(
            link.as_deref(),
            &[item.description.as_deref(), item.content.as_deref()],
        ),
        Dialect::Rdf => None,
    };

    Post {
        title: non_empty(item.title).unwrap_or_else(|| feed_title.to_string()),
        description: clean_text(item.description.as_deref()),
        image_url,
        published_at: normalize_date(item.date.as_deref()),
        creator: non_empty(item.creator),
        link,
        feed_title: feed_title.to_string(),
    }
}
