//! Variable-length quantities: 7 bits per byte, most significant group first,
//! continuation flagged by the top bit.

/// Largest value that fits in the four bytes SMF allows.
pub const MAX_VLQ: u32 = 0x0FFF_FFFF;

pub fn vlq_length(value: u32) -> usize {
    let mut len = 1;
    let mut v = value >> 7;
    while v != 0 {
        len += 1;
        v >>= 7;
    }
    len
}

pub fn write_vlq(out: &mut Vec<u8>, value: u32) {
    let len = vlq_length(value);
    for i in (0..len).rev() {
        let group = ((value >> (7 * i)) & 0x7F) as u8;
        out.push(if i > 0 { group | 0x80 } else { group });
    }
}

/// Decodes a quantity from the start of `bytes`, returning the value and the
/// bytes consumed. `None` when the input ends early or runs past four bytes.
pub fn read_vlq(bytes: &[u8]) -> Option<(u32, usize)> {
    let mut value = 0u32;
    for (i, &b) in bytes.iter().take(4).enumerate() {
        value = (value << 7) | (b & 0x7F) as u32;
        if b < 0x80 {
            return Some((value, i + 1));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_encodings() {
        for (value, bytes) in [
            (0u32, vec![0x00]),
            (0x40, vec![0x40]),
            (0x7F, vec![0x7F]),
            (0x80, vec![0x81, 0x00]),
            (0x2000, vec![0xC0, 0x00]),
            (0x3FFF, vec![0xFF, 0x7F]),
            (0x10_0000, vec![0xC0, 0x80, 0x00]),
            (MAX_VLQ, vec![0xFF, 0xFF, 0xFF, 0x7F]),
        ] {
            let mut out = Vec::new();
            write_vlq(&mut out, value);
            assert_eq!(out, bytes, "value {value:#X}");
            assert_eq!(vlq_length(value), bytes.len());
            assert_eq!(read_vlq(&bytes), Some((value, bytes.len())));
        }
    }

    #[test]
    fn test_read_limits() {
        assert_eq!(read_vlq(&[0x81]), None);
        assert_eq!(read_vlq(&[0xFF, 0xFF, 0xFF, 0xFF, 0x7F]), None);
    }
}
