//! Content-type detection by byte sniffing
//!
//! Inspects at most the first 512 bytes of a payload and returns the MIME
//! type the upload should declare. Covers the signatures that matter for the
//! expected workload (photos, documents, archives) plus a text/binary
//! heuristic; everything unrecognized is `application/octet-stream`.

use mime::Mime;

/// Only this many leading bytes participate in detection.
const SNIFF_LEN: usize = 512;

/// Detects the MIME type of a payload from its leading bytes.
///
/// An empty payload is reported as UTF-8 text, matching the behavior of
/// common sniffers.
pub fn detect_content_type(data: &[u8]) -> Mime {
    let head = &data[..data.len().min(SNIFF_LEN)];

    if head.starts_with(b"\xFF\xD8\xFF") {
        return mime::IMAGE_JPEG;
    }
    if head.starts_with(b"\x89PNG\r\n\x1a\n") {
        return mime::IMAGE_PNG;
    }
    if head.starts_with(b"GIF87a") || head.starts_with(b"GIF89a") {
        return mime::IMAGE_GIF;
    }
    if head.len() >= 12 && head.starts_with(b"RIFF") && &head[8..12] == b"WEBP" {
        return parse_static("image/webp");
    }
    if head.starts_with(b"%PDF-") {
        return mime::APPLICATION_PDF;
    }
    if head.starts_with(b"PK\x03\x04") {
        return parse_static("application/zip");
    }
    if head.starts_with(b"\x1f\x8b\x08") {
        return parse_static("application/x-gzip");
    }

    if looks_like_text(head) {
        mime::TEXT_PLAIN_UTF_8
    } else {
        mime::APPLICATION_OCTET_STREAM
    }
}

/// Parses a known-good literal; falls back to octet-stream rather than
/// panicking if the literal were ever wrong.
fn parse_static(s: &str) -> Mime {
    s.parse().unwrap_or(mime::APPLICATION_OCTET_STREAM)
}

/// A prefix is "text" when it contains no control bytes other than the
/// usual whitespace and escape characters.
fn looks_like_text(head: &[u8]) -> bool {
    head.iter().all(|&b| {
        !matches!(b, 0x00..=0x08 | 0x0B | 0x0E..=0x1A | 0x1C..=0x1F)
    })
}
