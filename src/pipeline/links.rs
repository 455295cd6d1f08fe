//! Link extraction: hyperlink annotations with a URI action.
//!
//! Each page's `/Annots` entries are parsed into a typed [`PageAnnotation`]
//! first, and only then filtered for `Link` annotations carrying a `/URI`
//! action. Parsing never chains unchecked lookups: every indirect reference
//! is resolved explicitly, every expected type is matched, and a failure is
//! reported as a [`MalformedAnnotation`] for that one annotation. The scan
//! is best-effort: malformed entries are logged and skipped, the rest of the
//! document is still processed.
//!
//! Links with a rectangle also get a `context`: the words drawn inside it,
//! see [`words`].

use crate::error::ExtractError;
use crate::output::{ExtractedLinkSet, LinkAnnotation, Rect};
use crate::pipeline::{document, words};
use lopdf::{Dictionary, Document, Object, ObjectId};
use std::fmt;
use std::path::Path;
use tracing::{debug, info, warn};

/// Reference chains longer than this are treated as broken.
const MAX_REFERENCE_DEPTH: usize = 8;

/// Typed view of one annotation dictionary.
#[derive(Debug, Clone, PartialEq)]
pub enum PageAnnotation {
    /// `/Subtype /Link`.
    Link {
        rect: Option<Rect>,
        action: Option<LinkAction>,
    },
    /// Any other subtype (`Widget`, `Text`, `Popup`, ...).
    Other { subtype: String },
}

/// The `/A` action of a link annotation.
#[derive(Debug, Clone, PartialEq)]
pub enum LinkAction {
    /// Navigate to an external URI.
    Uri(String),
    /// Jump within the document.
    GoTo,
    /// Any other action type, by its `/S` name.
    Other(String),
}

impl PageAnnotation {
    /// The target URI, if this is a link with a URI action.
    pub fn uri(&self) -> Option<&str> {
        match self {
            PageAnnotation::Link {
                action: Some(LinkAction::Uri(uri)),
                ..
            } => Some(uri),
            _ => None,
        }
    }
}

/// Why a single annotation could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedAnnotation(pub String);

impl fmt::Display for MalformedAnnotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Read, parse, and scan a document for URI links.
pub fn extract_links_blocking(path: &Path) -> Result<ExtractedLinkSet, ExtractError> {
    let loaded = document::load(path)?;
    let links = collect_links_with_context(&loaded.document);
    info!(
        "Extracted {} links from {} ({} pages)",
        links.len(),
        path.display(),
        loaded.page_count()
    );
    Ok(links)
}

/// [`collect_links`], then label each link with the words under its rectangle.
///
/// A page-content decoding failure only costs the labels.
pub fn collect_links_with_context(doc: &Document) -> ExtractedLinkSet {
    let mut links = collect_links(doc);
    if links.iter().all(|l| l.rect.is_none()) {
        return links;
    }
    match words::page_words(doc) {
        Ok(page_words) => words::attach_context(&mut links, &page_words),
        Err(e) => warn!("Link context unavailable: {}", e),
    }
    links
}

/// Scan every page in order and collect URI links.
pub fn collect_links(doc: &Document) -> ExtractedLinkSet {
    let mut links = Vec::new();

    // `get_pages` is keyed by 1-based page number, ascending.
    for (page_num, page_id) in doc.get_pages() {
        for (index, parsed) in page_annotations(doc, page_id).into_iter().enumerate() {
            match parsed {
                Ok(annotation) => {
                    let rect = match &annotation {
                        PageAnnotation::Link { rect, .. } => *rect,
                        PageAnnotation::Other { .. } => None,
                    };
                    match annotation.uri() {
                        Some(uri) => links.push(LinkAnnotation {
                            url: uri.to_string(),
                            page: page_num,
                            rect,
                            context: String::new(),
                        }),
                        None => debug!(page = page_num, index, "Skipping annotation without URI"),
                    }
                }
                Err(e) => debug!(page = page_num, index, "Skipping malformed annotation: {}", e),
            }
        }
    }

    ExtractedLinkSet::new(links)
}

/// Parse every annotation on one page, in `/Annots` order.
///
/// A page whose `/Annots` entry itself is unusable yields no annotations.
pub fn page_annotations(
    doc: &Document,
    page_id: ObjectId,
) -> Vec<Result<PageAnnotation, MalformedAnnotation>> {
    let page = match doc.get_dictionary(page_id) {
        Ok(dict) => dict,
        Err(e) => {
            warn!("Page object {:?} is not a dictionary: {:?}", page_id, e);
            return Vec::new();
        }
    };

    let annots = match page.get(b"Annots") {
        Ok(obj) => obj,
        Err(_) => return Vec::new(),
    };

    let entries = match resolve(doc, annots) {
        Ok(Object::Array(entries)) => entries,
        Ok(other) => {
            warn!(
                "Page object {:?} has /Annots of type {}, expected array",
                page_id,
                type_name(other)
            );
            return Vec::new();
        }
        Err(e) => {
            warn!("Page object {:?}: {}", page_id, e);
            return Vec::new();
        }
    };

    entries
        .iter()
        .map(|entry| match resolve(doc, entry)? {
            Object::Dictionary(dict) => parse_annotation(doc, dict),
            other => Err(MalformedAnnotation(format!(
                "annotation is {}, expected dictionary",
                type_name(other)
            ))),
        })
        .collect()
}

/// Parse one annotation dictionary into its typed form.
pub fn parse_annotation(
    doc: &Document,
    dict: &Dictionary,
) -> Result<PageAnnotation, MalformedAnnotation> {
    let subtype = match dict.get(b"Subtype") {
        Ok(obj) => name_of(resolve(doc, obj)?)
            .ok_or_else(|| MalformedAnnotation("/Subtype is not a name".into()))?,
        Err(_) => return Err(MalformedAnnotation("missing /Subtype".into())),
    };

    if subtype != "Link" {
        return Ok(PageAnnotation::Other { subtype });
    }

    let rect = dict
        .get(b"Rect")
        .ok()
        .and_then(|obj| resolve(doc, obj).ok())
        .and_then(|obj| parse_rect(doc, obj));

    let action = match dict.get(b"A") {
        Ok(obj) => match resolve(doc, obj)? {
            Object::Dictionary(action) => Some(parse_action(doc, action)?),
            other => {
                return Err(MalformedAnnotation(format!(
                    "/A is {}, expected dictionary",
                    type_name(other)
                )))
            }
        },
        // Links that only carry /Dest have no action.
        Err(_) => None,
    };

    Ok(PageAnnotation::Link { rect, action })
}

fn parse_action(doc: &Document, action: &Dictionary) -> Result<LinkAction, MalformedAnnotation> {
    let kind = match action.get(b"S") {
        Ok(obj) => name_of(resolve(doc, obj)?),
        Err(_) => None,
    };

    match kind.as_deref() {
        Some("URI") => uri_of(doc, action)
            .map(LinkAction::Uri)
            .ok_or_else(|| MalformedAnnotation("URI action without a /URI string".into())),
        Some("GoTo") => Ok(LinkAction::GoTo),
        Some(other) => Ok(LinkAction::Other(other.to_string())),
        // Some producers omit /S on URI actions.
        None => uri_of(doc, action)
            .map(LinkAction::Uri)
            .ok_or_else(|| MalformedAnnotation("action without /S".into())),
    }
}

fn uri_of(doc: &Document, action: &Dictionary) -> Option<String> {
    let obj = resolve(doc, action.get(b"URI").ok()?).ok()?;
    let uri = match obj {
        Object::String(bytes, _) => decode_pdf_string(bytes),
        _ => return None,
    };
    let uri = uri.trim().to_string();
    (!uri.is_empty()).then_some(uri)
}

fn parse_rect(doc: &Document, obj: &Object) -> Option<Rect> {
    let items = match obj {
        Object::Array(items) if items.len() == 4 => items,
        _ => return None,
    };
    let mut coords = [0.0f64; 4];
    for (slot, item) in coords.iter_mut().zip(items) {
        *slot = number_of(resolve(doc, item).ok()?)?;
    }
    Some(Rect::new(coords[0], coords[1], coords[2], coords[3]))
}

/// Follow indirect references until a direct object is reached.
fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> Result<&'a Object, MalformedAnnotation> {
    let mut current = obj;
    for _ in 0..MAX_REFERENCE_DEPTH {
        match current {
            Object::Reference(id) => {
                current = doc.get_object(*id).map_err(|_| {
                    MalformedAnnotation(format!("dangling reference {} {} R", id.0, id.1))
                })?;
            }
            direct => return Ok(direct),
        }
    }
    Err(MalformedAnnotation("reference chain too deep".into()))
}

fn name_of(obj: &Object) -> Option<String> {
    match obj {
        Object::Name(name) => Some(String::from_utf8_lossy(name).into_owned()),
        _ => None,
    }
}

fn number_of(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(f64::from(*r)),
        _ => None,
    }
}

fn type_name(obj: &Object) -> &'static str {
    match obj {
        Object::Null => "null",
        Object::Boolean(_) => "boolean",
        Object::Integer(_) => "integer",
        Object::Real(_) => "real",
        Object::Name(_) => "name",
        Object::String(..) => "string",
        Object::Array(_) => "array",
        Object::Dictionary(_) => "dictionary",
        Object::Stream(_) => "stream",
        Object::Reference(_) => "reference",
    }
}

/// Decode a PDF text string: UTF-16BE with BOM, UTF-8, or single-byte.
pub fn decode_pdf_string(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = rest
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    let bytes = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}
