//! Shared fixtures: in-memory PDFs built with lopdf and a loopback HTTP
//! server that replays canned responses.

#![allow(dead_code)]

use lopdf::content::{Content, Operation};
use lopdf::encryption;
use lopdf::{dictionary, Document, Object, ObjectId, Stream, StringFormat};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Route library logs to the test harness; `RUST_LOG=debug` to see them.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// ── PDF fixtures ─────────────────────────────────────────────────────────────

/// Baseline of the text line when it is not a link label.
const TEXT_Y: i64 = 700;

/// One page of a generated PDF.
///
/// Link `i` covers `[72, 600 - 30i, 272, 620 - 30i]`.
#[derive(Default, Clone)]
pub struct PageFixture {
    /// A single line of text drawn on the page.
    pub text: Option<String>,
    /// Baseline of `text`; defaults to [`TEXT_Y`].
    pub text_y: Option<i64>,
    /// One `/URI` link annotation per entry.
    pub links: Vec<String>,
}

impl PageFixture {
    pub fn blank() -> Self {
        Self::default()
    }

    pub fn text(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
            ..Self::default()
        }
    }

    pub fn links(links: &[&str]) -> Self {
        Self {
            links: links.iter().map(|s| s.to_string()).collect(),
            ..Self::default()
        }
    }

    /// One link whose rectangle frames `label`.
    pub fn labelled_link(label: &str, uri: &str) -> Self {
        Self {
            text: Some(label.to_string()),
            text_y: Some(605),
            links: vec![uri.to_string()],
        }
    }
}

/// Build a PDF with the given pages and return its bytes.
pub fn pdf_bytes(pages: &[PageFixture]) -> Vec<u8> {
    save(&mut build_document(pages))
}

fn save(doc: &mut Document) -> Vec<u8> {
    let mut out = Vec::new();
    doc.save_to(&mut out).unwrap();
    out
}

fn build_document(pages: &[PageFixture]) -> Document {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids = Vec::new();
    for page_fixture in pages {
        let mut operations = Vec::new();
        if let Some(ref text) = page_fixture.text {
            operations = vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), Object::Integer(12)]),
                Operation::new(
                    "Td",
                    vec![
                        Object::Integer(72),
                        Object::Integer(page_fixture.text_y.unwrap_or(TEXT_Y)),
                    ],
                ),
                Operation::new("Tj", vec![Object::string_literal(text.as_str())]),
                Operation::new("ET", vec![]),
            ];
        }
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(
            lopdf::Dictionary::new(),
            content.encode().unwrap(),
        ));

        let mut page = dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(595),
                Object::Integer(842),
            ],
        };

        if !page_fixture.links.is_empty() {
            let annots: Vec<Object> = page_fixture
                .links
                .iter()
                .enumerate()
                .map(|(i, uri)| {
                    let y = 600 - 30 * i as i64;
                    let id = doc.add_object(dictionary! {
                        "Type" => "Annot",
                        "Subtype" => "Link",
                        "Rect" => vec![
                            Object::Integer(72),
                            Object::Integer(y),
                            Object::Integer(272),
                            Object::Integer(y + 20),
                        ],
                        "Border" => vec![Object::Integer(0), Object::Integer(0), Object::Integer(0)],
                        "A" => dictionary! {
                            "S" => "URI",
                            "URI" => Object::string_literal(uri.as_str()),
                        },
                    });
                    Object::Reference(id)
                })
                .collect();
            page.set("Annots", annots);
        }

        kids.push(Object::Reference(doc.add_object(page)));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc
}

/// Padding string of the standard security handler.
const PASSWORD_PAD: [u8; 32] = [
    0x28, 0xBF, 0x4E, 0x5E, 0x4E, 0x75, 0x8A, 0x41, 0x64, 0x00, 0x4E, 0x56, 0xFF, 0xFA, 0x01,
    0x08, 0x2E, 0x2E, 0x00, 0xB6, 0xD0, 0x68, 0x3E, 0x80, 0x2F, 0x0C, 0xA9, 0xFE, 0x64, 0x53,
    0x69, 0x7A,
];

/// Build a PDF encrypted with the standard handler, revision 2 (RC4, 40-bit).
///
/// An empty `user_password` gives the common "owner password only" file
/// that opens without prompting.
pub fn encrypted_pdf_bytes(pages: &[PageFixture], user_password: &str) -> Vec<u8> {
    let mut doc = build_document(pages);

    let encrypt_id = doc.add_object(dictionary! {
        "Filter" => "Standard",
        "V" => Object::Integer(1),
        "R" => Object::Integer(2),
        "Length" => Object::Integer(40),
        "O" => Object::String(vec![0x4F; 32], StringFormat::Hexadecimal),
        "P" => Object::Integer(-4),
    });
    let file_id = Object::String(b"pdf-harvest-test".to_vec(), StringFormat::Hexadecimal);
    doc.trailer.set("Encrypt", encrypt_id);
    doc.trailer.set("ID", vec![file_id.clone(), file_id]);

    let key = encryption::get_encryption_key(&doc, user_password, false).unwrap();
    let check = rc4(&key, &PASSWORD_PAD);
    doc.get_object_mut(encrypt_id)
        .and_then(Object::as_dict_mut)
        .unwrap()
        .set("U", Object::String(check, StringFormat::Hexadecimal));

    for (&id, object) in doc.objects.iter_mut() {
        if id != encrypt_id {
            encrypt_in_place(&key, id, object);
        }
    }
    save(&mut doc)
}

/// RC4 is symmetric, so lopdf's per-object decryption also encrypts.
fn encrypt_in_place(key: &[u8], id: ObjectId, object: &mut Object) {
    match object {
        Object::String(..) => {
            let cipher = encryption::decrypt_object(key, id, object).unwrap();
            *object = Object::String(cipher, StringFormat::Hexadecimal);
        }
        Object::Stream(_) => {
            let cipher = encryption::decrypt_object(key, id, object).unwrap();
            if let Object::Stream(stream) = object {
                for (_, value) in stream.dict.iter_mut() {
                    encrypt_in_place(key, id, value);
                }
                stream.set_content(cipher);
            }
        }
        Object::Array(items) => items.iter_mut().for_each(|item| encrypt_in_place(key, id, item)),
        Object::Dictionary(dict) => {
            for (_, value) in dict.iter_mut() {
                encrypt_in_place(key, id, value);
            }
        }
        _ => {}
    }
}

fn rc4(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut state: Vec<u8> = (0..=255).collect();
    let mut j: u8 = 0;
    for i in 0..256 {
        j = j.wrapping_add(state[i]).wrapping_add(key[i % key.len()]);
        state.swap(i, j as usize);
    }

    let (mut i, mut j) = (0u8, 0u8);
    data.iter()
        .map(|&byte| {
            i = i.wrapping_add(1);
            j = j.wrapping_add(state[i as usize]);
            state.swap(i as usize, j as usize);
            byte ^ state[state[i as usize].wrapping_add(state[j as usize]) as usize]
        })
        .collect()
}

/// Build a PDF and write it to `path`.
pub fn write_pdf(path: &Path, pages: &[PageFixture]) {
    write_bytes(path, &pdf_bytes(pages));
}

/// Write already built PDF bytes to `path`.
pub fn write_bytes(path: &Path, bytes: &[u8]) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, bytes).unwrap();
}

// ── Loopback HTTP server ─────────────────────────────────────────────────────

/// A plain-HTTP server on 127.0.0.1 that answers each request path with a
/// fixed raw response. Unknown paths get a 404.
pub struct TestServer {
    pub addr: SocketAddr,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

pub async fn spawn_server(routes: Vec<(&str, Vec<u8>)>) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let routes: Arc<HashMap<String, Vec<u8>>> = Arc::new(
        routes
            .into_iter()
            .map(|(path, resp)| (path.to_string(), resp))
            .collect(),
    );

    tokio::spawn(async move {
        while let Ok((mut sock, _)) = listener.accept().await {
            let routes = Arc::clone(&routes);
            tokio::spawn(async move {
                let mut request = Vec::new();
                let mut chunk = [0u8; 1024];
                loop {
                    let n = sock.read(&mut chunk).await.unwrap_or(0);
                    if n == 0 {
                        break;
                    }
                    request.extend_from_slice(&chunk[..n]);
                    if request.windows(4).any(|w| w == b"\r\n\r\n") {
                        break;
                    }
                }
                let head = String::from_utf8_lossy(&request);
                let path = head.split_whitespace().nth(1).unwrap_or("/").to_string();
                let response = routes
                    .get(&path)
                    .cloned()
                    .unwrap_or_else(|| status_response(404, "Not Found"));
                let _ = sock.write_all(&response).await;
                let _ = sock.shutdown().await;
            });
        }
    });

    TestServer { addr }
}

/// `200 OK` with the full body.
pub fn ok_response(body: &[u8]) -> Vec<u8> {
    let mut resp = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: application/pdf\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        body.len()
    )
    .into_bytes();
    resp.extend_from_slice(body);
    resp
}

/// A bodyless error response.
pub fn status_response(code: u16, reason: &str) -> Vec<u8> {
    format!("HTTP/1.1 {code} {reason}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n").into_bytes()
}

/// A non-200 success status carrying `body`.
pub fn status_with_body(code: u16, reason: &str, body: &[u8]) -> Vec<u8> {
    let mut resp = format!(
        "HTTP/1.1 {code} {reason}\r\nContent-Type: application/pdf\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        body.len()
    )
    .into_bytes();
    resp.extend_from_slice(body);
    resp
}

/// `204 No Content`: no body and no length header.
pub fn no_content_response() -> Vec<u8> {
    b"HTTP/1.1 204 No Content\r\nConnection: close\r\n\r\n".to_vec()
}

/// `302 Found` pointing at `location`.
pub fn redirect_response(location: &str) -> Vec<u8> {
    format!("HTTP/1.1 302 Found\r\nLocation: {location}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n")
        .into_bytes()
}

/// Announces `claimed_len` bytes but sends only `body` before closing.
pub fn truncated_response(body: &[u8], claimed_len: usize) -> Vec<u8> {
    let mut resp = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: application/pdf\r\nContent-Length: {claimed_len}\r\nConnection: close\r\n\r\n"
    )
    .into_bytes();
    resp.extend_from_slice(body);
    resp
}

/// An address nothing listens on.
pub async fn refused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

/// Entries of `dir`, or empty if it does not exist.
pub fn dir_entries(dir: &Path) -> Vec<String> {
    match std::fs::read_dir(dir) {
        Ok(rd) => rd
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect(),
        Err(_) => Vec::new(),
    }
}
