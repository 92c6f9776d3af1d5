//! Response bytes to text, before the structural check.

use chardetng::EncodingDetector;
use encoding_rs::{Encoding, UTF_8};

/// Which signal picked the encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharsetSource {
    Bom,
    Header,
    Utf8,
    Detected,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedBody {
    pub text: String,
    pub encoding_label: &'static str,
    pub chosen_by: CharsetSource,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("malformed {encoding_label} byte sequence (encoding from {chosen_by:?})")]
pub struct DecodeError {
    pub encoding_label: &'static str,
    pub chosen_by: CharsetSource,
}

/// BOM, then the Content-Type charset, then plain UTF-8, then detection.
pub fn decode_body(bytes: &[u8], content_type: Option<&str>) -> Result<DecodedBody, DecodeError> {
    let (encoding, chosen_by) = pick_encoding(bytes, content_type);
    let (text, had_errors) = encoding.decode_with_bom_removal(bytes);
    if had_errors {
        return Err(DecodeError {
            encoding_label: encoding.name(),
            chosen_by,
        });
    }
    Ok(DecodedBody {
        text: text.into_owned(),
        encoding_label: encoding.name(),
        chosen_by,
    })
}

fn pick_encoding(bytes: &[u8], content_type: Option<&str>) -> (&'static Encoding, CharsetSource) {
    if let Some((encoding, _)) = Encoding::for_bom(bytes) {
        return (encoding, CharsetSource::Bom);
    }
    if let Some(encoding) = content_type.and_then(header_charset) {
        return (encoding, CharsetSource::Header);
    }
    if std::str::from_utf8(bytes).is_ok() {
        return (UTF_8, CharsetSource::Utf8);
    }
    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    (detector.guess(None, true), CharsetSource::Detected)
}

fn header_charset(content_type: &str) -> Option<&'static Encoding> {
    content_type.split(';').skip(1).find_map(|param| {
        let (name, value) = param.split_once('=')?;
        if !name.trim().eq_ignore_ascii_case("charset") {
            return None;
        }
        Encoding::for_label(value.trim().trim_matches(['"', '\'']).as_bytes())
    })
}
