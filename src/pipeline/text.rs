//! Text extraction: decode every page's content streams into plain text.
//!
//! The document is opened through [`document::load`] first so that a missing
//! file, a non-PDF and a locked document are reported the same way as for
//! link extraction. Decoding itself is delegated to `pdf-extract`, which
//! handles font encodings and `ToUnicode` maps, run over the already parsed
//! (and decrypted) document. Its output keeps the library's default spacing;
//! no layout reconstruction is attempted.

use crate::error::ExtractError;
use crate::output::ExtractedText;
use crate::pipeline::document::{self, LoadedPdf};
use pdf_extract::PlainTextOutput;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use tracing::{info, warn};

/// Read, parse, and decode the text of a document.
pub fn extract_text_blocking(path: &Path) -> Result<ExtractedText, ExtractError> {
    let loaded = document::load(path)?;
    let text = decode_text(&loaded)?;
    info!(
        "Extracted {} chars of text from {} ({} pages)",
        text.text.chars().count(),
        path.display(),
        text.page_count
    );
    Ok(text)
}

/// Decode the text of an already loaded document.
pub fn decode_text(loaded: &LoadedPdf) -> Result<ExtractedText, ExtractError> {
    // pdf-extract panics on some malformed font programs instead of
    // returning an error.
    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        let mut text = String::new();
        let outcome = pdf_extract::output_doc(&loaded.document, &mut PlainTextOutput::new(&mut text));
        outcome.map(|()| text)
    }));

    let text = match result {
        Ok(Ok(text)) => text,
        Ok(Err(e)) => {
            return Err(ExtractError::Unparseable {
                path: loaded.path.clone(),
                detail: format!("{:?}", e),
            })
        }
        Err(payload) => {
            let detail = panic_message(payload.as_ref());
            warn!("Text decoder aborted on {}: {}", loaded.path.display(), detail);
            return Err(ExtractError::Unparseable {
                path: loaded.path.clone(),
                detail: format!("text decoder aborted: {detail}"),
            });
        }
    };

    Ok(ExtractedText {
        text,
        page_count: loaded.page_count(),
    })
}

pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
