//! Positioned words, used to label each link with the text drawn under it.
//!
//! `pdf-extract` reports every glyph together with its text rendering
//! matrix. [`WordCollector`] groups consecutive glyphs on one baseline into
//! words and keeps each word's box in user space, the coordinate system an
//! annotation's `/Rect` is expressed in. A link's context is every word
//! whose box overlaps the link rectangle, in content-stream order.
//!
//! Context is decoration: when the page content cannot be decoded the links
//! are still returned, just without it.

use crate::output::{ExtractedLinkSet, Rect};
use crate::pipeline::text::panic_message;
use lopdf::Document;
use pdf_extract::{MediaBox, OutputDev, OutputError, Transform};
use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};

/// Glyphs further apart than this fraction of the font size start a new word.
const WORD_GAP: f64 = 0.1;

/// A word and the box it occupies on its page.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedWord {
    pub text: String,
    pub bbox: Rect,
}

/// Words keyed by 1-based page number.
pub type PageWords = BTreeMap<u32, Vec<PlacedWord>>;

/// An [`OutputDev`] that records words instead of rendering text.
#[derive(Debug, Default)]
pub struct WordCollector {
    page: u32,
    pages: PageWords,
    current: Option<PlacedWord>,
}

impl WordCollector {
    /// Finish the word in progress and return everything collected.
    pub fn finish(mut self) -> PageWords {
        self.flush();
        self.pages
    }

    fn flush(&mut self) {
        if let Some(word) = self.current.take() {
            self.pages.entry(self.page).or_default().push(word);
        }
    }
}

impl OutputDev for WordCollector {
    fn begin_page(
        &mut self,
        page_num: u32,
        _media_box: &MediaBox,
        _art_box: Option<(f64, f64, f64, f64)>,
    ) -> Result<(), OutputError> {
        self.flush();
        self.page = page_num;
        Ok(())
    }

    fn end_page(&mut self) -> Result<(), OutputError> {
        self.flush();
        Ok(())
    }

    fn output_character(
        &mut self,
        trm: &Transform,
        width: f64,
        _spacing: f64,
        font_size: f64,
        ch: &str,
    ) -> Result<(), OutputError> {
        if ch.trim().is_empty() {
            self.flush();
            return Ok(());
        }

        let glyph = glyph_box(trm, width, font_size);
        let extends = self
            .current
            .as_ref()
            .is_some_and(|word| continues(&word.bbox, &glyph));

        if extends {
            if let Some(word) = self.current.as_mut() {
                word.text.push_str(ch);
                word.bbox = word.bbox.union(&glyph);
            }
        } else {
            self.flush();
            self.current = Some(PlacedWord {
                text: ch.to_string(),
                bbox: glyph,
            });
        }
        Ok(())
    }

    fn begin_word(&mut self) -> Result<(), OutputError> {
        Ok(())
    }

    fn end_word(&mut self) -> Result<(), OutputError> {
        Ok(())
    }

    fn end_line(&mut self) -> Result<(), OutputError> {
        self.flush();
        Ok(())
    }
}

/// Box of one glyph: origin on the baseline, one em tall, `width` em wide.
fn glyph_box(trm: &Transform, width: f64, font_size: f64) -> Rect {
    let scale_x = trm.m11.hypot(trm.m12);
    let scale_y = trm.m21.hypot(trm.m22);
    let (x, y) = (trm.m31, trm.m32);
    Rect::new(x, y, x + width * font_size * scale_x, y + font_size * scale_y)
}

/// Whether `glyph` sits right after `word` on the same baseline.
fn continues(word: &Rect, glyph: &Rect) -> bool {
    let slack = glyph.height() * WORD_GAP;
    (glyph.y0 - word.y0).abs() <= glyph.height() * 0.5
        && glyph.x0 >= word.x1 - slack
        && glyph.x0 <= word.x1 + slack
}

/// Collect the words of every page.
pub fn page_words(doc: &Document) -> Result<PageWords, String> {
    // Same decoder as text extraction, same panics to contain.
    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        let mut collector = WordCollector::default();
        pdf_extract::output_doc(doc, &mut collector)?;
        Ok::<_, OutputError>(collector.finish())
    }));

    match result {
        Ok(Ok(words)) => Ok(words),
        Ok(Err(e)) => Err(format!("{:?}", e)),
        Err(payload) => Err(format!(
            "text decoder aborted: {}",
            panic_message(payload.as_ref())
        )),
    }
}

/// Words whose box overlaps `rect`, joined by single spaces.
pub fn words_in(words: &[PlacedWord], rect: &Rect) -> String {
    words
        .iter()
        .filter(|w| w.bbox.intersects(rect))
        .map(|w| w.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Fill in `context` for every link that has a rectangle.
pub fn attach_context(links: &mut ExtractedLinkSet, words: &PageWords) {
    for link in links.links.iter_mut() {
        if let (Some(rect), Some(on_page)) = (link.rect, words.get(&link.page)) {
            link.context = words_in(on_page, &rect);
        }
    }
}
