//! UTF-8 encoding of string arguments.
//!
//! The node compares argument bytes exactly, so the encoder is spelled out per sequence
//! length (1–4 bytes) instead of leaning on a platform encoder; property tests pin it to
//! `str::as_bytes`. The decoder is lenient: truncated sequences read missing bytes as zero
//! and invalid scalar values decode to U+FFFD.

/// Encode a string as UTF-8, one code point at a time.
pub fn string_to_utf8(s: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(s.len());
    for ch in s.chars() {
        let c = ch as u32;
        if c < 0x80 {
            out.push(c as u8);
        } else if c < 0x800 {
            out.push(((c >> 6) | 0xc0) as u8);
            out.push(((c & 0x3f) | 0x80) as u8);
        } else if c < 0x1_0000 {
            out.push(((c >> 12) | 0xe0) as u8);
            out.push((((c >> 6) & 0x3f) | 0x80) as u8);
            out.push(((c & 0x3f) | 0x80) as u8);
        } else {
            // Supplementary planes: four bytes carrying 21 bits.
            out.push(((c >> 18) | 0xf0) as u8);
            out.push((((c >> 12) & 0x3f) | 0x80) as u8);
            out.push((((c >> 6) & 0x3f) | 0x80) as u8);
            out.push(((c & 0x3f) | 0x80) as u8);
        }
    }
    out
}

/// Decode UTF-8 bytes, never failing.
pub fn utf8_to_string(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    let mut pos = 0usize;
    let next = |pos: &mut usize| -> u32 {
        let b = bytes.get(*pos).copied().unwrap_or(0);
        *pos += 1;
        u32::from(b)
    };
    while pos < bytes.len() {
        let c1 = next(&mut pos);
        let code_point = if c1 < 0x80 {
            c1
        } else if (0xc0..0xe0).contains(&c1) {
            let c2 = next(&mut pos);
            ((c1 & 0x1f) << 6) | (c2 & 0x3f)
        } else if c1 >= 0xf0 {
            let c2 = next(&mut pos);
            let c3 = next(&mut pos);
            let c4 = next(&mut pos);
            ((c1 & 0x07) << 18) | ((c2 & 0x3f) << 12) | ((c3 & 0x3f) << 6) | (c4 & 0x3f)
        } else {
            let c2 = next(&mut pos);
            let c3 = next(&mut pos);
            ((c1 & 0x0f) << 12) | ((c2 & 0x3f) << 6) | (c3 & 0x3f)
        };
        out.push(char::from_u32(code_point).unwrap_or(char::REPLACEMENT_CHARACTER));
    }
    out
}
