use rand::Rng;
use std::time::{SystemTime, UNIX_EPOCH};

/// Current unix time in seconds, adjusted by the caller's local clock
/// offset. Saturates at the epoch rather than going negative.
pub(crate) fn utc_now(offset_in_seconds: i64) -> u64 {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0);
    now.saturating_add(offset_in_seconds).max(0) as u64
}

/// Create a random string of `length` characters drawn from the URL-safe
/// base64 alphabet, suitable for nonces.
pub(crate) fn random_string(length: usize) -> String {
    const ALPHABET: &[u8] =
        b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| ALPHABET[rng.gen_range(0, ALPHABET.len())] as char)
        .collect()
}
