//! Redeem-code generation.
//!
//! Codes are bearer tokens for gifted value, so randomness comes from the
//! operating system CSPRNG ([`OsRng`]); a predictable generator here would
//! let anyone mint claimable codes offline.

use std::collections::HashSet;

use rand::rngs::OsRng;
use rand::Rng;

use crate::errors::{ClientError, Result};

/// Uppercase alphanumerics, the charset printed on gift emails.
pub const DEFAULT_CHARSET: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Flat code length when no format pattern is given.
pub const DEFAULT_LENGTH: usize = 16;

/// Dash-grouped pattern used for issued gifts.
pub const GIFT_CODE_FORMAT: &str = "XXXX-XXXX-XXXX-XXXX";

fn random_char(charset: &[u8]) -> char {
    charset[OsRng.gen_range(0..charset.len())] as char
}

/// Generate one redeem code.
///
/// With a `format` pattern every `X` is replaced independently by a random
/// charset character and every other character passes through unchanged
/// (`"XXXX-XXXX"` → `"K3QD-80ZP"`). Without one, the code is `length` random
/// charset characters.
pub fn generate_code(length: usize, format: Option<&str>, charset: &str) -> String {
    let charset = if charset.is_empty() {
        DEFAULT_CHARSET.as_bytes()
    } else {
        charset.as_bytes()
    };

    match format {
        Some(pattern) => pattern
            .chars()
            .map(|c| if c == 'X' { random_char(charset) } else { c })
            .collect(),
        None => (0..length).map(|_| random_char(charset)).collect(),
    }
}

/// Generate `count` distinct codes, in generation order.
///
/// Uniqueness is checked within this batch only; collisions are regenerated.
/// A format whose code space cannot hold `count` distinct values fails with
/// [`ClientError::CodeSpaceExhausted`] once the retry budget runs out,
/// rather than looping forever.
pub fn generate_batch(count: usize, length: usize, format: Option<&str>) -> Result<Vec<String>> {
    let max_attempts = count.saturating_mul(100).max(1_000);
    let mut seen = HashSet::with_capacity(count);
    let mut codes = Vec::with_capacity(count);

    let mut attempts = 0usize;
    while codes.len() < count {
        attempts += 1;
        if attempts > max_attempts {
            return Err(ClientError::CodeSpaceExhausted(format!(
                "collected {} of {count} distinct codes after {max_attempts} attempts",
                codes.len()
            )));
        }
        let code = generate_code(length, format, DEFAULT_CHARSET);
        if seen.insert(code.clone()) {
            codes.push(code);
        }
    }
    Ok(codes)
}
