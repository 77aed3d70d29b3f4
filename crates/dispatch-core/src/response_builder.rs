//! Response Builder: synthesizes an HTTP response from a stored mock body
//! plus headers JSON, applying `gzip`/`br` content-encoding when requested.

use crate::model::MockResponse;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::Write;

/// A fully materialized HTTP response ready to be handed to an HTTP
/// framework. Header order/case is preserved as given by the stored headers
/// JSON, as far as a `Vec` of pairs can represent it.
#[derive(Debug, Clone)]
pub struct BuiltResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers, in the order the stored JSON object declared them.
    pub headers: Vec<(String, String)>,
    /// Response body, already encoded per `Content-Encoding` if applicable.
    pub body: Vec<u8>,
}

/// Build a [`BuiltResponse`] from a stored [`MockResponse`].
///
/// `headers` is parsed as a JSON object (header name -> value); a parse
/// failure is tolerated by treating headers as empty, matching the "no
/// observer-visible panic on malformed stored config" contract the rest of
/// the dispatch core follows. A `Content-Encoding` of `gzip` or `br`
/// (case-insensitive name, lowercased value) compresses the body and the
/// returned `Content-Length` reflects the compressed size; anything else
/// passes the body through unmodified.
pub fn build(mock: &MockResponse) -> BuiltResponse {
    let mut headers: Vec<(String, String)> = serde_json::from_str::<serde_json::Map<String, serde_json::Value>>(
        &mock.headers,
    )
    .ok()
    .map(|map| {
        map.into_iter()
            .filter_map(|(k, v)| v.as_str().map(|s| (k, s.to_string())))
            .collect()
    })
    .unwrap_or_default();

    let content_encoding = headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("content-encoding"))
        .map(|(_, v)| v.to_ascii_lowercase());

    let raw = mock.body.as_bytes();
    let body = match content_encoding.as_deref() {
        Some("gzip") => gzip_encode(raw),
        Some("br") => brotli_encode(raw),
        _ => raw.to_vec(),
    };

    headers.retain(|(k, _)| !k.eq_ignore_ascii_case("content-length"));
    headers.push(("Content-Length".to_string(), body.len().to_string()));

    BuiltResponse { status: mock.status_code, headers, body }
}

fn gzip_encode(raw: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    // Writing to an in-memory Vec cannot fail.
    encoder.write_all(raw).expect("gzip encode into memory buffer");
    encoder.finish().expect("gzip finish into memory buffer")
}

fn brotli_encode(raw: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    let params = brotli::enc::BrotliEncoderParams::default();
    brotli::BrotliCompress(&mut std::io::Cursor::new(raw), &mut out, &params)
        .expect("brotli encode into memory buffer");
    out
}
