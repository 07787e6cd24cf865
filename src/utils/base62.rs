//! Base-62 encoding of counter values into short keys.
//!
//! Digits are ordered `0-9`, `a-z`, `A-Z`. Encoding is a plain positional
//! conversion, so distinct counter values always yield distinct keys.

/// The 62-symbol alphabet, in digit order.
pub const ALPHABET: &[u8; 62] = b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

const BASE: u64 = ALPHABET.len() as u64;

/// Longest possible encoding of a `u64` (62^11 > 2^64).
const MAX_LEN: usize = 11;

/// Encodes a counter value as a base-62 key.
///
/// `encode(0)` is `"0"`; no other value gets leading zeros.
///
/// # Examples
///
/// ```
/// use shortkey::utils::base62::encode;
///
/// assert_eq!(encode(0), "0");
/// assert_eq!(encode(61), "Z");
/// assert_eq!(encode(62), "10");
/// ```
pub fn encode(mut n: u64) -> String {
    if n == 0 {
        return "0".to_string();
    }

    let mut buf = [0u8; MAX_LEN];
    let mut pos = MAX_LEN;
    while n > 0 {
        pos -= 1;
        buf[pos] = ALPHABET[(n % BASE) as usize];
        n /= BASE;
    }

    // The alphabet is pure ASCII.
    buf[pos..].iter().map(|&b| b as char).collect()
}

/// Decodes a base-62 key back into its counter value.
///
/// Returns `None` for empty input, symbols outside the alphabet, or values
/// that overflow `u64`.
pub fn decode(key: &str) -> Option<u64> {
    if key.is_empty() {
        return None;
    }

    key.bytes().try_fold(0u64, |acc, b| {
        let digit = digit_value(b)?;
        acc.checked_mul(BASE)?.checked_add(digit)
    })
}

fn digit_value(b: u8) -> Option<u64> {
    match b {
        b'0'..=b'9' => Some((b - b'0') as u64),
        b'a'..=b'z' => Some((b - b'a') as u64 + 10),
        b'A'..=b'Z' => Some((b - b'A') as u64 + 36),
        _ => None,
    }
}
