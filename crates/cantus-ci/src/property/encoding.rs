//! Property body transfer encodings and ASCII escaping.

use std::io::{Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;

use super::property_encoding;
use crate::error::PropertyError;

/// Repacks every 7 bytes into 8: a leading byte holding the top bits (byte
/// `i` of the group at bit `6 - i`) followed by the 7-bit remainders.
pub fn encode_mcoded7(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() + data.len().div_ceil(7));
    for group in data.chunks(7) {
        let high = group
            .iter()
            .enumerate()
            .fold(0u8, |acc, (i, b)| acc | ((b >> 7) << (6 - i)));
        out.push(high);
        out.extend(group.iter().map(|b| b & 0x7F));
    }
    out
}

pub fn decode_mcoded7(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    for group in data.chunks(8) {
        let high = group[0];
        out.extend(
            group[1..]
                .iter()
                .enumerate()
                .map(|(i, b)| (b & 0x7F) | (((high >> (6 - i)) & 1) << 7)),
        );
    }
    out
}

pub fn encode_zlib(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}

pub fn decode_zlib(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut out = Vec::new();
    ZlibDecoder::new(data).read_to_end(&mut out)?;
    Ok(out)
}

/// Applies the `mutualEncoding` of a message to an outgoing body.
pub fn encode_body(data: &[u8], encoding: Option<&str>) -> Result<Vec<u8>, PropertyError> {
    match encoding {
        None | Some(property_encoding::ASCII) => Ok(data.to_vec()),
        Some(property_encoding::MCODED7) => Ok(encode_mcoded7(data)),
        Some(property_encoding::ZLIB_MCODED7) => encode_zlib(data)
            .map(|z| encode_mcoded7(&z))
            .map_err(|e| PropertyError::Internal(e.to_string())),
        Some(other) => Err(PropertyError::UnsupportedEncoding(other.to_string())),
    }
}

pub fn decode_body(data: &[u8], encoding: Option<&str>) -> Result<Vec<u8>, PropertyError> {
    match encoding {
        None | Some(property_encoding::ASCII) => Ok(data.to_vec()),
        Some(property_encoding::MCODED7) => Ok(decode_mcoded7(data)),
        Some(property_encoding::ZLIB_MCODED7) => {
            decode_zlib(&decode_mcoded7(data)).map_err(|e| PropertyError::BadRequest(e.to_string()))
        }
        Some(other) => Err(PropertyError::UnsupportedEncoding(other.to_string())),
    }
}

/// Escapes non-ASCII and control characters (other than JSON whitespace) as
/// `\uXXXX`, using surrogate pairs beyond the BMP.
pub fn encode_ascii(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if c.is_ascii() && (!c.is_ascii_control() || matches!(c, '\t' | '\n' | '\r')) {
            out.push(c);
            continue;
        }
        let mut units = [0u16; 2];
        for unit in c.encode_utf16(&mut units) {
            out.push_str(&format!("\\u{unit:04x}"));
        }
    }
    out
}

/// Reverses [`encode_ascii`]. Escaped backslashes and malformed sequences are
/// copied through unchanged.
pub fn decode_ascii(s: &str) -> String {
    fn hex4(s: &[u8]) -> Option<u16> {
        std::str::from_utf8(s.get(..4)?)
            .ok()
            .and_then(|h| u16::from_str_radix(h, 16).ok())
    }

    let bytes = s.as_bytes();
    let mut units: Vec<u16> = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' {
            if bytes.get(i + 1) == Some(&b'\\') {
                units.extend_from_slice(&[b'\\' as u16, b'\\' as u16]);
                i += 2;
                continue;
            }
            if bytes.get(i + 1) == Some(&b'u') {
                if let Some(unit) = hex4(&bytes[i + 2..]) {
                    units.push(unit);
                    i += 6;
                    continue;
                }
            }
        }
        // non-ASCII input passes through as its UTF-16 units
        let c = s[i..].chars().next().unwrap_or('\u{FFFD}');
        let mut buf = [0u16; 2];
        units.extend_from_slice(c.encode_utf16(&mut buf));
        i += c.len_utf8();
    }
    String::from_utf16_lossy(&units)
}

#[cfg(test)]
mod tests {
    use super::*;

    const JSON: &[u8] = b"{\"foo\": [1,2,3,4,5], \"bar\": [6,7,8,9,0]}\n";
    const MCODED7: [u8; 47] = [
        0x00, 0x7b, 0x22, 0x66, 0x6f, 0x6f, 0x22, 0x3a, //
        0x00, 0x20, 0x5b, 0x31, 0x2c, 0x32, 0x2c, 0x33, //
        0x00, 0x2c, 0x34, 0x2c, 0x35, 0x5d, 0x2c, 0x20, //
        0x00, 0x22, 0x62, 0x61, 0x72, 0x22, 0x3a, 0x20, //
        0x00, 0x5b, 0x36, 0x2c, 0x37, 0x2c, 0x38, 0x2c, //
        0x00, 0x39, 0x2c, 0x30, 0x5d, 0x7d, 0x0a,
    ];

    #[test]
    fn test_mcoded7_vectors() {
        assert_eq!(encode_mcoded7(JSON), MCODED7);
        assert_eq!(decode_mcoded7(&MCODED7), JSON);
    }

    #[test]
    fn test_mcoded7_high_bits() {
        let data = [0x80, 0x01, 0xFF, 0, 0, 0, 0x81, 0xC0];
        let encoded = encode_mcoded7(&data);
        assert_eq!(encoded[0], 0b101_0001);
        assert_eq!(&encoded[1..8], &[0, 1, 0x7F, 0, 0, 0, 1]);
        assert_eq!(&encoded[8..], &[0b100_0000, 0x40]);
        assert!(encoded.iter().all(|b| *b < 0x80));
        assert_eq!(decode_mcoded7(&encoded), data);
    }

    #[test]
    fn test_zlib_round_trip() {
        let z = encode_zlib(JSON).unwrap();
        assert_eq!(&z[..1], &[0x78]);
        assert_eq!(decode_zlib(&z).unwrap(), JSON);
        let body = encode_body(JSON, Some(property_encoding::ZLIB_MCODED7)).unwrap();
        assert!(body.iter().all(|b| *b < 0x80));
        assert_eq!(decode_body(&body, Some(property_encoding::ZLIB_MCODED7)).unwrap(), JSON);
    }

    #[test]
    fn test_unknown_encoding() {
        assert!(matches!(
            encode_body(b"x", Some("gzip")),
            Err(PropertyError::UnsupportedEncoding(_))
        ));
    }

    #[test]
    fn test_ascii_escape() {
        assert_eq!(encode_ascii("plain {\"a\":1}"), "plain {\"a\":1}");
        assert_eq!(encode_ascii("caf\u{e9}"), "caf\\u00e9");
        assert_eq!(encode_ascii("\u{1F3B9}"), "\\ud83c\\udfb9");
        assert_eq!(encode_ascii("a\u{1}b"), "a\\u0001b");
        for s in ["caf\u{e9}", "\u{1F3B9} keys", "tab\there"] {
            assert_eq!(decode_ascii(&encode_ascii(s)), s);
        }
        assert_eq!(decode_ascii("a\\\\u0041"), "a\\\\u0041");
    }
}
