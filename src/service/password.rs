//! Stored password verification
//!
//! Accounts created by the existing Django deployment carry
//! `pbkdf2_sha256$<iterations>$<salt>$<base64 hash>`; newer ones carry an
//! argon2 PHC string.

use crate::error::{AppError, Result};
use argon2::{Argon2, PasswordHash, PasswordVerifier};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use sha2::Sha256;

const DJANGO_PBKDF2_SHA256: &str = "pbkdf2_sha256";
/// Marks an unusable password in the Django format.
const UNUSABLE_PREFIX: char = '!';

/// Verify `password` against a stored hash in either supported format.
///
/// A hash that matches neither format is an internal error, not a failed login.
pub fn verify_password(password: &str, stored: &str) -> Result<bool> {
    if stored.starts_with(UNUSABLE_PREFIX) {
        return Ok(false);
    }
    if let Some(rest) = stored
        .strip_prefix(DJANGO_PBKDF2_SHA256)
        .and_then(|rest| rest.strip_prefix('$'))
    {
        return verify_django_pbkdf2(password, rest);
    }
    verify_phc(password, stored)
}

fn invalid_hash(reason: impl std::fmt::Display) -> AppError {
    AppError::Internal(anyhow::anyhow!("Invalid password hash: {}", reason))
}

fn verify_django_pbkdf2(password: &str, encoded: &str) -> Result<bool> {
    let mut parts = encoded.splitn(3, '$');
    let (Some(iterations), Some(salt), Some(expected)) = (parts.next(), parts.next(), parts.next())
    else {
        return Err(invalid_hash("expected <iterations>$<salt>$<hash>"));
    };
    let iterations: u32 = iterations
        .parse()
        .map_err(|_| invalid_hash("iteration count is not a number"))?;
    if iterations == 0 {
        return Err(invalid_hash("iteration count is zero"));
    }
    let expected = BASE64.decode(expected).map_err(invalid_hash)?;
    if expected.is_empty() {
        return Err(invalid_hash("empty digest"));
    }

    // Django feeds the salt to PBKDF2 as its literal text.
    let mut derived = vec![0u8; expected.len()];
    pbkdf2::pbkdf2_hmac::<Sha256>(password.as_bytes(), salt.as_bytes(), iterations, &mut derived);

    Ok(constant_time_eq(&derived, &expected))
}

fn verify_phc(password: &str, stored: &str) -> Result<bool> {
    let parsed_hash = PasswordHash::new(stored).map_err(invalid_hash)?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}
