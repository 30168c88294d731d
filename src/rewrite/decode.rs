//! Upstream body decoding.
//!
//! Dispatches on `Content-Encoding`: `gzip`, `br` and `deflate` (zlib) are
//! decoded; any other value, or none, passes the body through untouched.
//! A body that fails to decode, or that decodes to more than the configured
//! limit, is an error, never a partial result.

use std::io::{self, Read};

use axum::body::Bytes;
use axum::http::{header, HeaderMap};
use flate2::read::{MultiGzDecoder, ZlibDecoder};

use crate::error::{ProxyError, ProxyResult};

const BROTLI_BUFFER_SIZE: usize = 4096;

/// Content encodings the decoder understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentEncoding {
    Gzip,
    Brotli,
    Deflate,
    /// Absent, `identity`, or anything unsupported.
    Identity,
}

impl ContentEncoding {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        headers
            .get(header::CONTENT_ENCODING)
            .and_then(|v| v.to_str().ok())
            .map(Self::from_token)
            .unwrap_or(ContentEncoding::Identity)
    }

    pub fn from_token(token: &str) -> Self {
        let token = token.trim();
        if token.eq_ignore_ascii_case("gzip") {
            ContentEncoding::Gzip
        } else if token.eq_ignore_ascii_case("br") {
            ContentEncoding::Brotli
        } else if token.eq_ignore_ascii_case("deflate") {
            ContentEncoding::Deflate
        } else {
            ContentEncoding::Identity
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentEncoding::Gzip => "gzip",
            ContentEncoding::Brotli => "br",
            ContentEncoding::Deflate => "deflate",
            ContentEncoding::Identity => "identity",
        }
    }
}

/// Decode `body` according to the response headers, producing at most
/// `max_decoded_size` bytes.
pub fn decode_body(headers: &HeaderMap, body: Bytes, max_decoded_size: usize) -> ProxyResult<Bytes> {
    decode(ContentEncoding::from_headers(headers), body, max_decoded_size)
}

/// Decode `body` with an explicit encoding.
pub fn decode(encoding: ContentEncoding, body: Bytes, max_decoded_size: usize) -> ProxyResult<Bytes> {
    let result = match encoding {
        ContentEncoding::Identity => return Ok(body),
        ContentEncoding::Gzip => read_limited(MultiGzDecoder::new(&body[..]), max_decoded_size),
        ContentEncoding::Deflate => read_limited(ZlibDecoder::new(&body[..]), max_decoded_size),
        ContentEncoding::Brotli => read_limited(
            brotli::Decompressor::new(&body[..], BROTLI_BUFFER_SIZE),
            max_decoded_size,
        ),
    };

    result.map(Bytes::from).map_err(|source| ProxyError::DecodeError {
        encoding: encoding.as_str(),
        source,
    })
}

/// Read a decoder to the end, failing once output passes `limit` bytes.
fn read_limited(decoder: impl Read, limit: usize) -> io::Result<Vec<u8>> {
    let mut decoded = Vec::new();
    decoder
        .take((limit as u64).saturating_add(1))
        .read_to_end(&mut decoded)?;

    if decoded.len() > limit {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("decoded body exceeds {} bytes", limit),
        ));
    }
    Ok(decoded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use flate2::write::{GzEncoder, ZlibEncoder};
    use flate2::Compression;
    use std::io::Write;

    const LIMIT: usize = 1024 * 1024;

    const SCRIPT: &str = "var u=\"https://www.google-analytics.com/analytics.js\";";

    fn headers(encoding: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_ENCODING, HeaderValue::from_str(encoding).unwrap());
        headers
    }

    fn gzip(data: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn gzip_round_trips() {
        let body = Bytes::from(gzip(SCRIPT.as_bytes()));
        let decoded = decode_body(&headers("gzip"), body, LIMIT).unwrap();
        assert_eq!(decoded, SCRIPT.as_bytes());
    }

    #[test]
    fn deflate_is_zlib() {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(SCRIPT.as_bytes()).unwrap();
        let body = Bytes::from(encoder.finish().unwrap());

        let decoded = decode_body(&headers("deflate"), body, LIMIT).unwrap();
        assert_eq!(decoded, SCRIPT.as_bytes());
    }

    #[test]
    fn brotli_decodes() {
        let mut compressed = Vec::new();
        {
            let mut writer = brotli::CompressorWriter::new(&mut compressed, 4096, 5, 22);
            writer.write_all(SCRIPT.as_bytes()).unwrap();
        }

        let decoded = decode_body(&headers("br"), Bytes::from(compressed), LIMIT).unwrap();
        assert_eq!(decoded, SCRIPT.as_bytes());
    }

    #[test]
    fn unknown_or_missing_encoding_passes_through() {
        let body = Bytes::from_static(b"\x28\xb5\x2f\xfd opaque");
        assert_eq!(decode_body(&headers("zstd"), body.clone(), LIMIT).unwrap(), body);
        assert_eq!(decode_body(&HeaderMap::new(), body.clone(), LIMIT).unwrap(), body);
    }

    #[test]
    fn encoding_token_is_case_insensitive() {
        assert_eq!(ContentEncoding::from_token(" GZIP "), ContentEncoding::Gzip);
        assert_eq!(ContentEncoding::from_token("Br"), ContentEncoding::Brotli);
        assert_eq!(ContentEncoding::from_token("gzip, br"), ContentEncoding::Identity);
    }

    #[test]
    fn corrupt_body_is_an_error() {
        let body = Bytes::from_static(b"definitely not gzip");
        let err = decode_body(&headers("gzip"), body, LIMIT).unwrap_err();
        assert!(matches!(err, ProxyError::DecodeError { encoding: "gzip", .. }));
    }

    #[test]
    fn truncated_gzip_is_an_error() {
        let mut data = gzip(SCRIPT.as_bytes());
        data.truncate(data.len() / 2);
        assert!(decode_body(&headers("gzip"), Bytes::from(data), LIMIT).is_err());
    }

    #[test]
    fn output_beyond_limit_is_an_error() {
        let body = Bytes::from(gzip(&vec![b'a'; 4096]));
        let err = decode_body(&headers("gzip"), body.clone(), 1024).unwrap_err();
        assert!(matches!(err, ProxyError::DecodeError { encoding: "gzip", .. }));

        assert_eq!(decode_body(&headers("gzip"), body, 4096).unwrap().len(), 4096);
    }

    #[test]
    fn identity_bodies_are_not_limited() {
        let body = Bytes::from(vec![b'a'; 64]);
        assert_eq!(decode_body(&HeaderMap::new(), body.clone(), 16).unwrap(), body);
    }
}
