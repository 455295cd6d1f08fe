//! Opening a persisted document for extraction.
//!
//! Both extractors share the same preconditions: the file must be readable
//! (otherwise [`ExtractError::NotFound`]) and must parse as a PDF (otherwise
//! [`ExtractError::Unparseable`]). Nothing here writes to the filesystem.
//!
//! ## Encrypted documents
//!
//! Many published PDFs are encrypted with an owner password only: anyone can
//! open them, the empty user password unlocks the content. Such documents are
//! decrypted in memory right after parsing, so both extractors see plain
//! strings and streams. A document that needs a real user password is
//! `Unparseable`; no password can be supplied.

use crate::error::ExtractError;
use lopdf::encryption::{self, DecryptionError};
use lopdf::{Document, Object, ObjectId};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// How far into the file the `%PDF-` header may start. Some producers emit
/// junk before it and viewers tolerate that.
const HEADER_SEARCH_WINDOW: usize = 1024;

/// A document read into memory, parsed, and decrypted if needed.
pub struct LoadedPdf {
    pub path: PathBuf,
    pub document: Document,
}

impl LoadedPdf {
    pub fn page_count(&self) -> usize {
        self.document.get_pages().len()
    }
}

/// Read the raw bytes of a document.
pub fn read_document(path: &Path) -> Result<Vec<u8>, ExtractError> {
    std::fs::read(path).map_err(|e| {
        debug!("Cannot read {}: {}", path.display(), e);
        ExtractError::NotFound {
            path: path.to_path_buf(),
        }
    })
}

/// Check that `bytes` carries a PDF header near the start.
pub fn check_pdf_header(path: &Path, bytes: &[u8]) -> Result<(), ExtractError> {
    let window = &bytes[..bytes.len().min(HEADER_SEARCH_WINDOW)];
    if window.windows(5).any(|w| w == b"%PDF-") {
        return Ok(());
    }

    let mut magic = [0u8; 4];
    let n = bytes.len().min(4);
    magic[..n].copy_from_slice(&bytes[..n]);
    Err(ExtractError::Unparseable {
        path: path.to_path_buf(),
        detail: format!("not a PDF file (first bytes: {magic:?})"),
    })
}

/// Read and parse a document.
pub fn load(path: &Path) -> Result<LoadedPdf, ExtractError> {
    let bytes = read_document(path)?;
    check_pdf_header(path, &bytes)?;

    let mut document = Document::load_mem(&bytes).map_err(|e| ExtractError::Unparseable {
        path: path.to_path_buf(),
        detail: format!("{:?}", e),
    })?;

    if document.is_encrypted() {
        decrypt_with_empty_password(&mut document).map_err(|e| ExtractError::Unparseable {
            path: path.to_path_buf(),
            detail: format!("encrypted, and the empty user password does not open it: {e}"),
        })?;
        info!("Decrypted {} with the empty user password", path.display());
    }

    debug!(
        "Parsed {} ({} bytes, {} pages)",
        path.display(),
        bytes.len(),
        document.get_pages().len()
    );

    Ok(LoadedPdf {
        path: path.to_path_buf(),
        document,
    })
}

/// Decrypt every string and stream in place, then drop `/Encrypt`.
///
/// Unlike `Document::decrypt`, strings nested inside dictionaries and arrays
/// are decrypted too; a `/URI` usually sits in a direct action dictionary.
pub fn decrypt_with_empty_password(document: &mut Document) -> Result<(), DecryptionError> {
    let encrypt_id = document
        .trailer
        .get(b"Encrypt")
        .and_then(Object::as_reference)
        .ok();
    let metadata_encrypted = document
        .get_encrypted()
        .ok()
        .and_then(|dict| dict.get(b"EncryptMetadata").and_then(Object::as_bool).ok())
        .unwrap_or(true);

    let key = encryption::get_encryption_key(document, "", true)?;

    for (&id, object) in document.objects.iter_mut() {
        if Some(id) == encrypt_id {
            continue;
        }
        if !metadata_encrypted && object.type_name().ok() == Some("Metadata") {
            continue;
        }
        decrypt_in_place(&key, id, object)?;
    }

    document.trailer.remove(b"Encrypt");
    Ok(())
}

/// RC4 keys are derived per object, so nested values use their owner's id.
fn decrypt_in_place(key: &[u8], id: ObjectId, object: &mut Object) -> Result<(), DecryptionError> {
    match object {
        Object::String(..) => {
            let plain = encryption::decrypt_object(key, id, object)?;
            if let Object::String(content, _) = object {
                *content = plain;
            }
        }
        Object::Stream(_) => {
            let plain = encryption::decrypt_object(key, id, object)?;
            if let Object::Stream(stream) = object {
                for (_, value) in stream.dict.iter_mut() {
                    decrypt_in_place(key, id, value)?;
                }
                stream.set_content(plain);
            }
        }
        Object::Array(items) => {
            for item in items.iter_mut() {
                decrypt_in_place(key, id, item)?;
            }
        }
        Object::Dictionary(dict) => {
            for (_, value) in dict.iter_mut() {
                decrypt_in_place(key, id, value)?;
            }
        }
        _ => {}
    }
    Ok(())
}
