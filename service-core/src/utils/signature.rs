use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Generate a hex-encoded HMAC-SHA256 signature over a raw payload.
///
/// This is the scheme payment processors use for webhook deliveries:
/// the signature covers the request body exactly as transmitted.
pub fn sign_payload(secret: &str, payload: &str) -> Result<String, anyhow::Error> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| anyhow::anyhow!("Invalid key length: {}", e))?;

    mac.update(payload.as_bytes());
    let result = mac.finalize();

    Ok(hex::encode(result.into_bytes()))
}

/// Verify a hex-encoded HMAC-SHA256 payload signature using constant-time comparison.
pub fn verify_payload(secret: &str, payload: &str, signature: &str) -> Result<bool, anyhow::Error> {
    let expected_signature = sign_payload(secret, payload)?;

    let expected_bytes = expected_signature.as_bytes();
    let signature_bytes = signature.as_bytes();

    if expected_bytes.len() != signature_bytes.len() {
        return Ok(false);
    }

    Ok(expected_bytes.ct_eq(signature_bytes).into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_generation_and_verification() {
        let secret = "my_secret_key";
        let body = r#"{"event_id":"evt_1","type":"payment_succeeded"}"#;

        let signature = sign_payload(secret, body).unwrap();
        assert!(!signature.is_empty());

        let is_valid = verify_payload(secret, body, &signature).unwrap();
        assert!(is_valid);
    }

    #[test]
    fn test_invalid_signature() {
        let secret = "my_secret_key";
        let body = r#"{"event_id":"evt_1","type":"payment_succeeded"}"#;

        let signature = sign_payload(secret, body).unwrap();
        let invalid_signature = format!("a{}", &signature[1..]);

        let is_valid = verify_payload(secret, body, &invalid_signature).unwrap();
        assert!(!is_valid);
    }

    #[test]
    fn test_tampered_body() {
        let secret = "my_secret_key";
        let body = r#"{"event_id":"evt_1","type":"payment_succeeded"}"#;

        let signature = sign_payload(secret, body).unwrap();

        let modified_body = r#"{"event_id":"evt_2","type":"payment_succeeded"}"#;
        let is_valid = verify_payload(secret, modified_body, &signature).unwrap();
        assert!(!is_valid);
    }

    #[test]
    fn test_wrong_secret() {
        let body = r#"{"event_id":"evt_1"}"#;

        let signature = sign_payload("secret_a", body).unwrap();
        let is_valid = verify_payload("secret_b", body, &signature).unwrap();
        assert!(!is_valid);
    }
}
