use super::decoder::DecodedDocument;
use super::types::RawAlertEntry;
use crate::util::strip_control_chars;
use quick_xml::events::Event;
use quick_xml::Reader;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Most alerts ever taken from one feed document.
pub const MAX_ALERTS: usize = 10;

const DEFAULT_TITLE: &str = "Weather Alert";

/// Errors that make a decoded document unusable as an alert feed.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The XML reader rejected the document (bad syntax, mismatched tags, bad entities)
    #[error("XML parse error: {0}")]
    Xml(String),
    /// Well-formed XML whose root is neither `rss` nor `feed`
    #[error("not an RSS or Atom feed: root element is <{0}>")]
    NotAFeed(String),
    #[error("document ended with {0} unclosed element(s)")]
    UnclosedElement(usize),
    #[error("document has no root element")]
    NoRootElement,
    #[error("document has more than one root element")]
    MultipleRoots,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ItemField {
    Title,
    Description,
    PubDate,
    Guid,
}

impl ItemField {
    fn from_name(name: &[u8]) -> Option<Self> {
        match name {
            b"title" => Some(ItemField::Title),
            b"description" => Some(ItemField::Description),
            b"pubDate" => Some(ItemField::PubDate),
            b"guid" => Some(ItemField::Guid),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
struct ItemBuilder {
    title: String,
    description: String,
    pub_date: String,
    guid: String,
}

impl ItemBuilder {
    fn push(&mut self, field: ItemField, text: &str) {
        let target = match field {
            ItemField::Title => &mut self.title,
            ItemField::Description => &mut self.description,
            ItemField::PubDate => &mut self.pub_date,
            ItemField::Guid => &mut self.guid,
        };
        target.push_str(text);
    }

    fn finish(self) -> RawAlertEntry {
        let title = match strip_control_chars(self.title.trim()).trim() {
            "" => DEFAULT_TITLE.to_string(),
            t => t.to_string(),
        };
        let description = strip_control_chars(self.description.trim()).into_owned();
        let published_at = Some(self.pub_date.trim())
            .filter(|d| !d.is_empty())
            .map(str::to_string);
        let guid = generate_guid(&self.guid, &title, published_at.as_deref(), &description);

        RawAlertEntry {
            title,
            description,
            published_at,
            guid,
        }
    }
}

/// Parses a decoded feed document into at most `max` raw alert entries.
///
/// The whole document is read even after `max` items have been collected, so
/// a syntax error anywhere still rejects the feed. A valid `rss`/`feed` root
/// with no `<item>` children yields an empty list, which is not an error.
///
/// # Errors
///
/// Returns [`ParseError`] for malformed XML or a root element that is not a feed.
pub fn parse(doc: &DecodedDocument, max: usize) -> Result<Vec<RawAlertEntry>, ParseError> {
    parse_str(doc.as_str(), max)
}

/// String form of [`parse`], for callers that already hold XML text.
pub fn parse_str(xml: &str, max: usize) -> Result<Vec<RawAlertEntry>, ParseError> {
    let mut reader = Reader::from_str(xml.trim_start_matches('\u{feff}'));
    reader.config_mut().trim_text(false);

    let mut entries = Vec::new();
    let mut depth: usize = 0;
    let mut seen_root = false;
    let mut item: Option<ItemBuilder> = None;
    let mut item_depth: usize = 0;
    let mut field: Option<ItemField> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                if depth == 0 {
                    check_root(e.local_name().as_ref(), &mut seen_root)?;
                }
                depth += 1;

                if item.is_none() && e.name().as_ref() == b"item" {
                    item = Some(ItemBuilder::default());
                    item_depth = depth;
                } else if item.is_some() && depth == item_depth + 1 {
                    field = ItemField::from_name(e.name().as_ref());
                }
            }
            Ok(Event::Empty(e)) => {
                if depth == 0 {
                    check_root(e.local_name().as_ref(), &mut seen_root)?;
                } else if item.is_none() && e.name().as_ref() == b"item" && entries.len() < max {
                    entries.push(ItemBuilder::default().finish());
                }
            }
            Ok(Event::End(_)) => {
                if item.is_some() {
                    if depth == item_depth + 1 {
                        field = None;
                    } else if depth == item_depth {
                        if let Some(done) = item.take() {
                            if entries.len() < max {
                                entries.push(done.finish());
                            }
                        }
                    }
                }
                depth = depth.saturating_sub(1);
            }
            Ok(Event::Text(e)) => {
                if depth == 0 && !e.iter().all(u8::is_ascii_whitespace) {
                    return Err(ParseError::Xml(
                        "text outside the root element".to_string(),
                    ));
                }
                if let (Some(builder), Some(f)) = (item.as_mut(), field) {
                    let text = e.unescape().map_err(|e| ParseError::Xml(e.to_string()))?;
                    builder.push(f, &text);
                }
            }
            Ok(Event::CData(e)) => {
                if depth == 0 {
                    return Err(ParseError::Xml(
                        "CDATA outside the root element".to_string(),
                    ));
                }
                if let (Some(builder), Some(f)) = (item.as_mut(), field) {
                    let raw = e.into_inner();
                    builder.push(f, &String::from_utf8_lossy(&raw));
                }
            }
            Ok(Event::Eof) => {
                if depth > 0 {
                    return Err(ParseError::UnclosedElement(depth));
                }
                if !seen_root {
                    return Err(ParseError::NoRootElement);
                }
                break;
            }
            Err(e) => return Err(ParseError::Xml(e.to_string())),
            _ => {}
        }
    }

    Ok(entries)
}

fn check_root(local_name: &[u8], seen_root: &mut bool) -> Result<(), ParseError> {
    if *seen_root {
        return Err(ParseError::MultipleRoots);
    }
    *seen_root = true;
    match local_name {
        b"rss" | b"feed" => Ok(()),
        other => Err(ParseError::NotAFeed(
            String::from_utf8_lossy(other).into_owned(),
        )),
    }
}

/// Uses the feed's own guid when present, otherwise a stable hash of the content.
fn generate_guid(
    existing: &str,
    title: &str,
    published: Option<&str>,
    description: &str,
) -> String {
    let trimmed = existing.trim();
    if !trimmed.is_empty() {
        return trimmed.to_string();
    }

    let input = format!("{}|{}|{}", title, published.unwrap_or(""), description);
    let hash = Sha256::digest(input.as_bytes());
    format!("{:x}", hash)
}
