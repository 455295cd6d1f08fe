//! Pipeline stages for fetching documents and extracting their content.
//!
//! Each submodule implements exactly one step. The extraction stages are
//! synchronous and CPU-bound; the async entry points in [`crate::harvest`]
//! run them on the blocking pool.
//!
//! ## Data Flow
//!
//! ```text
//! fetch ──▶ document ──┬──▶ links ◀── words
//! (HTTPS)   (lopdf)    │          (pdf-extract)
//!                      └──▶ text ──▶ dates
//!                                    (regex)
//! ```
//!
//! 1. [`fetch`]: stream a URL to a local file; the only stage with
//!    network I/O
//! 2. [`document`]: read a persisted file, parse it once, decrypt it when
//!    the empty user password opens it
//! 3. [`links`]: walk `/Annots` per page into typed annotations and keep
//!    the `/URI` links
//! 4. [`words`]: positioned words, to label each link with the text under
//!    its rectangle
//! 5. [`text`]: decode content streams via `pdf-extract`
//! 6. [`dates`]: pick date mentions out of the decoded text
//!
//! [`persist`] is shared by every stage that writes to disk: nothing is ever
//! written in place, so a crash never leaves a truncated artifact behind.

pub mod dates;
pub mod document;
pub mod fetch;
pub mod links;
pub mod persist;
pub mod text;
pub mod words;
