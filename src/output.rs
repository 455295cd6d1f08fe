//! Data types produced by the pipeline.
//!
//! Everything here is plain data: `Serialize`/`Deserialize`, no I/O. The
//! JSON shapes are part of the on-disk contract (`links.json`,
//! `report.json`), so field names are fixed.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

// ── Document ─────────────────────────────────────────────────────────────

/// Retrieval state of a [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchStatus {
    Pending,
    Succeeded,
    Failed,
}

/// A remote document and the local path it is (or will be) stored at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub source_url: String,
    pub path: PathBuf,
    pub status: FetchStatus,
}

impl Document {
    /// A document whose fetch has been requested but not attempted.
    pub fn pending(source_url: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            source_url: source_url.into(),
            path: path.into(),
            status: FetchStatus::Pending,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_available(&self) -> bool {
        self.status == FetchStatus::Succeeded
    }
}

// ── Links ────────────────────────────────────────────────────────────────

/// A bounding rectangle in PDF user-space units, as stored in `/Rect`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl Rect {
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub fn width(&self) -> f64 {
        (self.x1 - self.x0).abs()
    }

    pub fn height(&self) -> f64 {
        (self.y1 - self.y0).abs()
    }

    /// The same rectangle with `x0 <= x1` and `y0 <= y1`.
    pub fn normalized(&self) -> Self {
        Self::new(
            self.x0.min(self.x1),
            self.y0.min(self.y1),
            self.x0.max(self.x1),
            self.y0.max(self.y1),
        )
    }

    /// Whether the two rectangles share an area. Touching edges do not count.
    pub fn intersects(&self, other: &Rect) -> bool {
        let (a, b) = (self.normalized(), other.normalized());
        a.x0 < b.x1 && b.x0 < a.x1 && a.y0 < b.y1 && b.y0 < a.y1
    }

    /// Smallest rectangle covering both.
    pub fn union(&self, other: &Rect) -> Self {
        let (a, b) = (self.normalized(), other.normalized());
        Self::new(a.x0.min(b.x0), a.y0.min(b.y0), a.x1.max(b.x1), a.y1.max(b.y1))
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} {} {} {}]", self.x0, self.y0, self.x1, self.y1)
    }
}

impl FromStr for Rect {
    type Err = String;

    /// Parses `[x0 y0 x1 y1]`; brackets optional, commas accepted as separators.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let inner = s.trim().trim_start_matches('[').trim_end_matches(']');
        let nums = inner
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|t| !t.is_empty())
            .map(|t| t.parse::<f64>().map_err(|e| format!("bad coordinate '{t}': {e}")))
            .collect::<Result<Vec<_>, _>>()?;

        match nums.as_slice() {
            [x0, y0, x1, y1] => Ok(Rect::new(*x0, *y0, *x1, *y1)),
            other => Err(format!("expected 4 coordinates, got {}", other.len())),
        }
    }
}

/// One outbound hyperlink found in a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkAnnotation {
    /// Target URI.
    pub url: String,
    /// 1-indexed page the annotation sits on.
    pub page: u32,
    /// Clickable area. Serialized as `"[x0 y0 x1 y1]"`, or `""` if the
    /// annotation carried no usable `/Rect`.
    #[serde(with = "rect_string")]
    pub rect: Option<Rect>,
    /// Words drawn inside `rect`, usually the visible label of the link.
    /// Omitted from JSON when empty.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub context: String,
}

/// Links of one document, ordered by page then discovery order.
///
/// Serializes as a bare JSON array.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExtractedLinkSet {
    pub links: Vec<LinkAnnotation>,
}

impl ExtractedLinkSet {
    pub fn new(links: Vec<LinkAnnotation>) -> Self {
        Self { links }
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, LinkAnnotation> {
        self.links.iter()
    }

    /// Distinct pages that carry at least one link, ascending.
    pub fn pages(&self) -> Vec<u32> {
        let mut pages: Vec<u32> = self.links.iter().map(|l| l.page).collect();
        pages.dedup();
        pages
    }
}

impl IntoIterator for ExtractedLinkSet {
    type Item = LinkAnnotation;
    type IntoIter = std::vec::IntoIter<LinkAnnotation>;

    fn into_iter(self) -> Self::IntoIter {
        self.links.into_iter()
    }
}

mod rect_string {
    use super::Rect;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(rect: &Option<Rect>, s: S) -> Result<S::Ok, S::Error> {
        match rect {
            Some(r) => s.serialize_str(&r.to_string()),
            None => s.serialize_str(""),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Rect>, D::Error> {
        let raw = String::deserialize(d)?;
        if raw.trim().is_empty() {
            return Ok(None);
        }
        raw.parse().map(Some).map_err(serde::de::Error::custom)
    }
}

// ── Text ─────────────────────────────────────────────────────────────────

/// Linearized text of a whole document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedText {
    pub text: String,
    pub page_count: usize,
}

impl ExtractedText {
    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

impl fmt::Display for ExtractedText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

// ── Dates ────────────────────────────────────────────────────────────────

/// A date-like token found in extracted text, with surrounding context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateMention {
    pub date: String,
    pub context: String,
}

// ── Report ───────────────────────────────────────────────────────────────

/// Everything the pipeline learned about one fetched document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentReport {
    pub source_url: String,
    pub document_path: PathBuf,
    pub page_count: usize,
    pub links: ExtractedLinkSet,
    pub text: String,
    pub important_dates: Vec<DateMention>,
}
