//! Turning raw response bytes into text.
//!
//! Decompression follows the declared `Content-Encoding`; a body that fails to
//! decompress is used as-is. Decoding uses the declared charset, then a sniffed
//! one, then UTF-8, always with lossy substitution, so it cannot fail.

use std::io::Read;

use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};
use flate2::read::{DeflateDecoder, GzDecoder, ZlibDecoder};
use tracing::debug;

/// Decompress and decode a response body.
pub fn decode_body(
    body: &[u8],
    content_encoding: Option<&str>,
    content_type: Option<&str>,
) -> String {
    let bytes = match content_encoding {
        Some(encoding) if !encoding.trim().is_empty() => decompress(body, encoding),
        _ => body.to_vec(),
    };
    decode_text(&bytes, content_type)
}

/// Decompress `body` per a `Content-Encoding` value (gzip, deflate, br).
///
/// Unknown encodings and failed decompression return the raw bytes.
pub fn decompress(body: &[u8], content_encoding: &str) -> Vec<u8> {
    let encoding = content_encoding.to_ascii_lowercase();

    let result = if encoding.contains("gzip") {
        read_all(GzDecoder::new(body))
    } else if encoding.contains("deflate") {
        // Servers disagree on whether "deflate" means zlib-wrapped or raw.
        read_all(ZlibDecoder::new(body)).or_else(|_| read_all(DeflateDecoder::new(body)))
    } else if encoding.contains("br") {
        read_all(brotli::Decompressor::new(body, 4096))
    } else {
        return body.to_vec();
    };

    match result {
        Ok(bytes) => bytes,
        Err(e) => {
            debug!(encoding = %encoding, error = %e, "decompression failed, using raw body");
            body.to_vec()
        }
    }
}

fn read_all(mut reader: impl Read) -> std::io::Result<Vec<u8>> {
    let mut out = Vec::new();
    reader.read_to_end(&mut out)?;
    Ok(out)
}

/// Decode bytes to text using the declared charset, falling back to detection.
///
/// A missing or Latin-1 declaration is treated as "unknown" because servers
/// and HTTP defaults emit it without checking the content.
pub fn decode_text(bytes: &[u8], content_type: Option<&str>) -> String {
    let declared = content_type
        .and_then(charset_from_content_type)
        .and_then(|label| Encoding::for_label(label.as_bytes()))
        .filter(|enc| *enc != WINDOWS_1252);

    let encoding = declared.or_else(|| sniff(bytes)).unwrap_or(UTF_8);
    let (text, used, had_errors) = encoding.decode(bytes);

    if had_errors {
        debug!(encoding = used.name(), "replacement characters inserted while decoding");
    }

    text.into_owned()
}

fn sniff(bytes: &[u8]) -> Option<&'static Encoding> {
    if bytes.is_empty() {
        return None;
    }
    let mut detector = chardetng::EncodingDetector::new();
    detector.feed(bytes, true);
    Some(detector.guess(None, true))
}

/// Pull the `charset=` parameter out of a `Content-Type` header value.
fn charset_from_content_type(content_type: &str) -> Option<String> {
    content_type.split(';').skip(1).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        if key.trim().eq_ignore_ascii_case("charset") {
            let value = value.trim().trim_matches('"').trim();
            (!value.is_empty()).then(|| value.to_string())
        } else {
            None
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::{GzEncoder, ZlibEncoder};
    use std::io::Write;

    fn gzip(data: &[u8]) -> Vec<u8> {
        let mut enc = GzEncoder::new(Vec::new(), Compression::default());
        enc.write_all(data).unwrap();
        enc.finish().unwrap()
    }

    #[test]
    fn gzip_body_is_decompressed() {
        let body = gzip(b"<p>hello</p>");
        assert_eq!(decompress(&body, "gzip"), b"<p>hello</p>");
    }

    #[test]
    fn zlib_deflate_body_is_decompressed() {
        let mut enc = ZlibEncoder::new(Vec::new(), Compression::default());
        enc.write_all(b"deflated text").unwrap();
        let body = enc.finish().unwrap();
        assert_eq!(decompress(&body, "deflate"), b"deflated text");
    }

    #[test]
    fn brotli_body_is_decompressed() {
        let mut compressed = Vec::new();
        {
            let mut writer = brotli::CompressorWriter::new(&mut compressed, 4096, 5, 22);
            writer.write_all(b"brotli text").unwrap();
        }
        assert_eq!(decompress(&compressed, "br"), b"brotli text");
    }

    #[test]
    fn bad_gzip_falls_back_to_raw() {
        let raw = b"<html>not actually gzip</html>";
        assert_eq!(decompress(raw, "gzip"), raw.to_vec());
    }

    #[test]
    fn unknown_encoding_is_passthrough() {
        assert_eq!(decompress(b"abc", "zstd"), b"abc".to_vec());
    }

    #[test]
    fn declared_charset_is_used() {
        let bytes = "Grüße".as_bytes();
        let text = decode_text(bytes, Some("text/html; charset=utf-8"));
        assert_eq!(text, "Grüße");
    }

    #[test]
    fn latin1_declaration_triggers_detection() {
        // Valid UTF-8 mislabelled as ISO-8859-1 should still come out right.
        let bytes = "Ceci est une phrase en français, très jolie.".as_bytes();
        let text = decode_text(bytes, Some("text/html; charset=ISO-8859-1"));
        assert!(text.contains("français"));
    }

    #[test]
    fn invalid_bytes_never_fail() {
        let bytes = [0x66, 0x6f, 0xff, 0xfe, 0x6f];
        let text = decode_text(&bytes, Some("text/html; charset=utf-8"));
        assert!(text.starts_with("fo"));
        assert!(text.contains('\u{FFFD}'));
    }

    #[test]
    fn charset_parameter_parsing() {
        assert_eq!(
            charset_from_content_type("text/html; charset=\"Shift_JIS\""),
            Some("Shift_JIS".into())
        );
        assert_eq!(charset_from_content_type("text/html"), None);
    }

    #[test]
    fn full_body_pipeline() {
        let body = gzip("<h1>Über uns</h1>".as_bytes());
        let text = decode_body(&body, Some("gzip"), Some("text/html; charset=utf-8"));
        assert_eq!(text, "<h1>Über uns</h1>");
    }
}
