//! Cryptographic Utilities
//!
//! Randomness for generated references and HMAC-signed opaque tokens.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use hmac::{Hmac, Mac};
use rand::Rng;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Length of the signed identifier (a UUID)
pub const ID_LEN: usize = 16;
const SIGNATURE_LEN: usize = 32;

/// Errors from signed token handling
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("Token is not valid base64")]
    Encoding,
    #[error("Token has wrong length")]
    Length,
    #[error("Token signature mismatch")]
    Signature,
    #[error("Signing key rejected")]
    Key,
}

/// Generate a 32-byte secret
pub fn random_secret() -> [u8; 32] {
    let mut bytes = [0u8; 32];
    rand::rng().fill(&mut bytes);
    bytes
}

/// Generate a string of `len` random decimal digits
pub fn random_digits(len: usize) -> String {
    let mut rng = rand::rng();
    (0..len)
        .map(|_| char::from(b'0' + rng.random_range(0..10u8)))
        .collect()
}

/// Uniform integer in `min..=max`
pub fn random_in_range(min: i64, max: i64) -> i64 {
    if min >= max {
        return min;
    }
    rand::rng().random_range(min..=max)
}

/// Compute HMAC-SHA256
pub fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<[u8; 32], TokenError> {
    let mut mac = HmacSha256::new_from_slice(key).map_err(|_| TokenError::Key)?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().into())
}

/// Sign a 16-byte identifier into an opaque cookie-safe token
///
/// Layout: `base64url(id || HMAC-SHA256(secret, id))`
pub fn sign_id(id: &[u8; ID_LEN], secret: &[u8]) -> Result<String, TokenError> {
    let signature = hmac_sha256(secret, id)?;
    let mut token = Vec::with_capacity(ID_LEN + SIGNATURE_LEN);
    token.extend_from_slice(id);
    token.extend_from_slice(&signature);
    Ok(URL_SAFE_NO_PAD.encode(token))
}

/// Verify a token produced by [`sign_id`] and return the identifier
pub fn verify_signed_id(token: &str, secret: &[u8]) -> Result<[u8; ID_LEN], TokenError> {
    let data = URL_SAFE_NO_PAD
        .decode(token)
        .map_err(|_| TokenError::Encoding)?;
    if data.len() != ID_LEN + SIGNATURE_LEN {
        return Err(TokenError::Length);
    }

    let (id, signature) = data.split_at(ID_LEN);
    let mut mac = HmacSha256::new_from_slice(secret).map_err(|_| TokenError::Key)?;
    mac.update(id);
    // verify_slice compares in constant time
    mac.verify_slice(signature)
        .map_err(|_| TokenError::Signature)?;

    id.try_into().map_err(|_| TokenError::Length)
}

/// Sign an arbitrary string value
///
/// Layout: `base64url(value) "." base64url(HMAC-SHA256(secret, value))`
pub fn sign_value(value: &str, secret: &[u8]) -> Result<String, TokenError> {
    let signature = hmac_sha256(secret, value.as_bytes())?;
    Ok(format!(
        "{}.{}",
        URL_SAFE_NO_PAD.encode(value),
        URL_SAFE_NO_PAD.encode(signature)
    ))
}

/// Verify a token produced by [`sign_value`] and return the value
pub fn verify_signed_value(token: &str, secret: &[u8]) -> Result<String, TokenError> {
    let (value, signature) = token.split_once('.').ok_or(TokenError::Encoding)?;
    let value = URL_SAFE_NO_PAD
        .decode(value)
        .map_err(|_| TokenError::Encoding)?;
    let signature = URL_SAFE_NO_PAD
        .decode(signature)
        .map_err(|_| TokenError::Encoding)?;
    if signature.len() != SIGNATURE_LEN {
        return Err(TokenError::Length);
    }

    let mut mac = HmacSha256::new_from_slice(secret).map_err(|_| TokenError::Key)?;
    mac.update(&value);
    mac.verify_slice(&signature)
        .map_err(|_| TokenError::Signature)?;

    String::from_utf8(value).map_err(|_| TokenError::Encoding)
}

/// Compare a presented secret with the expected one without leaking timing
pub fn secrets_match(expected: &str, presented: &str) -> bool {
    let key = random_secret();
    let Ok(expected_tag) = hmac_sha256(&key, expected.as_bytes()) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(&key) else {
        return false;
    };
    mac.update(presented.as_bytes());
    mac.verify_slice(&expected_tag).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hmac_known_value() {
        // RFC 4231 test case 2
        let mac = hmac_sha256(b"Jefe", b"what do ya want for nothing?").unwrap();
        let expected =
            hex::decode("5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843")
                .unwrap();
        assert_eq!(mac.to_vec(), expected);
    }

    #[test]
    fn test_signed_id_roundtrip() {
        let secret = random_secret();
        let id = [7u8; 16];
        let token = sign_id(&id, &secret).unwrap();
        assert!(!token.contains('='));
        assert_eq!(verify_signed_id(&token, &secret).unwrap(), id);
    }

    #[test]
    fn test_signed_id_rejects_other_secret() {
        let token = sign_id(&[1u8; 16], &[1u8; 32]).unwrap();
        assert_eq!(
            verify_signed_id(&token, &[2u8; 32]),
            Err(TokenError::Signature)
        );
    }

    #[test]
    fn test_signed_id_rejects_garbage() {
        assert_eq!(verify_signed_id("***", &[0u8; 32]), Err(TokenError::Encoding));
        assert_eq!(verify_signed_id("AAAA", &[0u8; 32]), Err(TokenError::Length));
    }

    #[test]
    fn test_signed_value_roundtrip() {
        let secret = [3u8; 32];
        let token = sign_value("member-42", &secret).unwrap();
        assert_eq!(verify_signed_value(&token, &secret).unwrap(), "member-42");
        assert_eq!(
            verify_signed_value(&token, &[4u8; 32]),
            Err(TokenError::Signature)
        );

        // Swapping the value keeps the old signature
        let (_, signature) = token.split_once('.').unwrap();
        let forged = format!("{}.{signature}", URL_SAFE_NO_PAD.encode("member-1"));
        assert_eq!(
            verify_signed_value(&forged, &secret),
            Err(TokenError::Signature)
        );
        assert_eq!(verify_signed_value("member-42", &secret), Err(TokenError::Encoding));
    }

    #[test]
    fn test_secrets_match() {
        assert!(secrets_match("s3cret-token", "s3cret-token"));
        assert!(!secrets_match("s3cret-token", "s3cret-tokem"));
        assert!(!secrets_match("s3cret-token", ""));
    }

    #[test]
    fn test_random_digits() {
        let digits = random_digits(12);
        assert_eq!(digits.len(), 12);
        assert!(digits.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_random_in_range_bounds() {
        for _ in 0..200 {
            let n = random_in_range(1, 10);
            assert!((1..=10).contains(&n));
        }
        assert_eq!(random_in_range(4, 4), 4);
    }
}
