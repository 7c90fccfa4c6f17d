//! Filename encoding on the wire.
//!
//! Cache names travel percent-encoded so a request line never holds raw
//! spaces or control characters. Decoding is strict: a `%` must be followed
//! by two hex digits, and the result must be non-empty UTF-8 without NULs.

use std::borrow::Cow;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodingError {
    #[error("empty filename")]
    Empty,

    #[error("malformed escape at byte {0}")]
    MalformedEscape(usize),

    #[error("raw whitespace or control character at byte {0}")]
    RawControl(usize),

    #[error("decoded filename is not valid UTF-8")]
    InvalidUtf8,

    #[error("decoded filename contains NUL")]
    Nul,
}

/// Encode a filename for use in a request or response line.
pub fn encode(name: &str) -> Cow<'_, str> {
    urlencoding::encode(name)
}

/// Decode a filename received from a peer.
pub fn decode(encoded: &str) -> Result<String, EncodingError> {
    if encoded.is_empty() {
        return Err(EncodingError::Empty);
    }

    let bytes = encoded.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if b == b'%' {
            let valid = bytes.len() > i + 2
                && bytes[i + 1].is_ascii_hexdigit()
                && bytes[i + 2].is_ascii_hexdigit();
            if !valid {
                return Err(EncodingError::MalformedEscape(i));
            }
            i += 3;
            continue;
        }
        if b.is_ascii_whitespace() || b.is_ascii_control() {
            return Err(EncodingError::RawControl(i));
        }
        i += 1;
    }

    let decoded = urlencoding::decode(encoded).map_err(|_| EncodingError::InvalidUtf8)?;
    if decoded.contains('\0') {
        return Err(EncodingError::Nul);
    }
    Ok(decoded.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_escapes() {
        assert_eq!(decode("file.1234").unwrap(), "file.1234");
        assert_eq!(decode("my%20input%2Fpart").unwrap(), "my input/part");
        assert_eq!(decode("%e2%9c%93").unwrap(), "\u{2713}");
    }

    #[test]
    fn encode_then_decode_preserves_awkward_names() {
        let name = "out put/100% done\tv2";
        let encoded = encode(name);
        assert!(!encoded.contains(' '));
        assert_eq!(decode(&encoded).unwrap(), name);
    }

    #[test]
    fn rejects_malformed_escapes() {
        assert_eq!(decode("bad%zz"), Err(EncodingError::MalformedEscape(3)));
        assert_eq!(decode("trunc%4"), Err(EncodingError::MalformedEscape(5)));
        assert_eq!(decode("%"), Err(EncodingError::MalformedEscape(0)));
    }

    #[test]
    fn rejects_raw_controls_and_empty() {
        assert_eq!(decode(""), Err(EncodingError::Empty));
        assert_eq!(decode("a\tb"), Err(EncodingError::RawControl(1)));
        assert_eq!(decode("%00"), Err(EncodingError::Nul));
        assert_eq!(decode("%ff%fe"), Err(EncodingError::InvalidUtf8));
    }
}
