//! Time-based one-time passwords (RFC 6238): SHA-1, 6 digits, 30 second period.
//!
//! Secrets are hex strings; [`uri`] re-encodes them as base32 for authenticator apps.

use std::time::{SystemTime, UNIX_EPOCH};

use hmac::{Hmac, Mac};
use rand::Rng;
use sha1::Sha1;

type HmacSha1 = Hmac<Sha1>;

pub const DIGITS: u32 = 6;
pub const PERIOD_SECS: u64 = 30;
pub const DEFAULT_SECRET_LEN: usize = 64;

const BASE32_ALPHABET: &[u8; 32] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OtpError {
    #[error("secret is not a hex string: {0}")]
    InvalidSecret(String),
}

/// Random hex secret of `length` characters.
#[must_use]
pub fn secret(length: usize) -> String {
    let mut rng = rand::rng();
    (0..length)
        .map(|_| {
            let nibble: u32 = rng.random_range(0..16);
            char::from_digit(nibble, 16).unwrap_or('0')
        })
        .collect()
}

/// Token for `timestamp_ms` (milliseconds since the Unix epoch), or for now.
pub fn token(secret: &str, timestamp_ms: Option<u64>) -> Result<String, OtpError> {
    let key = decode_hex(secret)?;
    let timestamp_ms = timestamp_ms.unwrap_or_else(now_ms);
    Ok(hotp(&key, timestamp_ms / 1000 / PERIOD_SECS))
}

/// `otpauth://` URI for QR codes.
pub fn uri(label: &str, issuer: &str, secret: &str) -> Result<String, OtpError> {
    let key = decode_hex(secret)?;
    let enc = |s: &str| urlencoding::encode(s).into_owned();
    let prefix = if issuer.is_empty() {
        format!("{}?", enc(label))
    } else {
        format!("{}:{}?issuer={}&", enc(issuer), enc(label), enc(issuer))
    };
    Ok(format!(
        "otpauth://totp/{prefix}secret={}&algorithm=SHA1&digits={DIGITS}&period={PERIOD_SECS}",
        base32_encode(&key)
    ))
}

/// Whether `token` is the token of the current period.
#[must_use]
pub fn validate(token: &str, secret: &str) -> bool {
    validate_at(token, secret, now_ms())
}

/// Whether `token` is the token of the period containing `timestamp_ms`.
#[must_use]
pub fn validate_at(token: &str, secret: &str, timestamp_ms: u64) -> bool {
    match self::token(secret, Some(timestamp_ms)) {
        Ok(expected) => constant_time_eq(expected.as_bytes(), token.trim().as_bytes()),
        Err(_) => false,
    }
}

/// HOTP value (RFC 4226) for `counter`.
#[must_use]
pub fn hotp(key: &[u8], counter: u64) -> String {
    // HMAC accepts keys of any length.
    let mut mac = match HmacSha1::new_from_slice(key) {
        Ok(m) => m,
        Err(_) => return String::new(),
    };
    mac.update(&counter.to_be_bytes());
    let hash = mac.finalize().into_bytes();

    let offset = (hash[hash.len() - 1] & 0x0f) as usize;
    let binary = (u32::from(hash[offset] & 0x7f) << 24)
        | (u32::from(hash[offset + 1]) << 16)
        | (u32::from(hash[offset + 2]) << 8)
        | u32::from(hash[offset + 3]);
    let code = binary % 10u32.pow(DIGITS);
    format!("{code:0width$}", width = DIGITS as usize)
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

/// Decode hex two characters at a time; a trailing odd character is read as one nibble.
fn decode_hex(secret: &str) -> Result<Vec<u8>, OtpError> {
    let secret = secret.trim();
    if secret.is_empty() || !secret.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(OtpError::InvalidSecret(secret.to_string()));
    }
    secret
        .as_bytes()
        .chunks(2)
        .map(|pair| {
            std::str::from_utf8(pair)
                .ok()
                .and_then(|s| u8::from_str_radix(s, 16).ok())
                .ok_or_else(|| OtpError::InvalidSecret(secret.to_string()))
        })
        .collect()
}

/// RFC 4648 base32 without padding.
fn base32_encode(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len().div_ceil(5) * 8);
    let mut buffer: u32 = 0;
    let mut bits = 0;
    for &byte in data {
        buffer = (buffer << 8) | u32::from(byte);
        bits += 8;
        while bits >= 5 {
            bits -= 5;
            out.push(BASE32_ALPHABET[((buffer >> bits) & 0x1f) as usize] as char);
        }
    }
    if bits > 0 {
        out.push(BASE32_ALPHABET[((buffer << (5 - bits)) & 0x1f) as usize] as char);
    }
    out
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
