/// Payment gateway signatures
///
/// The gateway signs two things with HMAC-SHA256 and sends the digest as
/// lowercase hex:
///
/// - checkout completion: `"{order_id}|{payment_id}"` keyed with the API key secret
/// - webhook deliveries: the raw request body keyed with the webhook secret
///
/// Verification decodes the hex and compares in constant time.
///
/// # Example
///
/// ```
/// use eprofile_shared::auth::signature::{sign, verify_payment_signature, payment_payload};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let secret = "gateway-key-secret";
/// let sig = sign(secret, payment_payload("order_1", "pay_1").as_bytes())?;
///
/// verify_payment_signature(secret, "order_1", "pay_1", &sig)?;
/// assert!(verify_payment_signature(secret, "order_1", "pay_2", &sig).is_err());
/// # Ok(())
/// # }
/// ```

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Signature failure
#[derive(Debug, thiserror::Error)]
pub enum SignatureError {
    /// Secret rejected by HMAC
    #[error("Invalid signing key")]
    InvalidKey,

    /// Signature is not valid hex
    #[error("Signature is not hex encoded")]
    Malformed,

    /// Digest mismatch
    #[error("Signature mismatch")]
    Mismatch,
}

fn mac_for(secret: &str, payload: &[u8]) -> Result<HmacSha256, SignatureError> {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| SignatureError::InvalidKey)?;
    mac.update(payload);
    Ok(mac)
}

/// Signs a payload, returning the lowercase hex digest
pub fn sign(secret: &str, payload: &[u8]) -> Result<String, SignatureError> {
    Ok(hex::encode(mac_for(secret, payload)?.finalize().into_bytes()))
}

/// Verifies a hex signature over `payload` in constant time
pub fn verify(secret: &str, payload: &[u8], signature_hex: &str) -> Result<(), SignatureError> {
    let expected = hex::decode(signature_hex.trim()).map_err(|_| SignatureError::Malformed)?;

    mac_for(secret, payload)?
        .verify_slice(&expected)
        .map_err(|_| SignatureError::Mismatch)
}

/// Payload the gateway signs when a checkout completes
pub fn payment_payload(order_id: &str, payment_id: &str) -> String {
    format!("{}|{}", order_id, payment_id)
}

/// Verifies a checkout completion signature
pub fn verify_payment_signature(
    key_secret: &str,
    order_id: &str,
    payment_id: &str,
    signature_hex: &str,
) -> Result<(), SignatureError> {
    verify(
        key_secret,
        payment_payload(order_id, payment_id).as_bytes(),
        signature_hex,
    )
}

/// Verifies a webhook signature over the raw request body
pub fn verify_webhook_signature(
    webhook_secret: &str,
    body: &[u8],
    signature_hex: &str,
) -> Result<(), SignatureError> {
    verify(webhook_secret, body, signature_hex)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_is_deterministic_hex() {
        let a = sign("secret", b"payload").unwrap();
        let b = sign("secret", b"payload").unwrap();

        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_known_vector() {
        // RFC 4231 test case 2
        let sig = sign("Jefe", b"what do ya want for nothing?").unwrap();
        assert_eq!(
            sig,
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn test_payment_signature_accepts_correct() {
        let sig = sign("key_secret", b"order_abc|pay_xyz").unwrap();
        assert!(verify_payment_signature("key_secret", "order_abc", "pay_xyz", &sig).is_ok());
    }

    #[test]
    fn test_payment_signature_rejects_tampered() {
        let sig = sign("key_secret", b"order_abc|pay_xyz").unwrap();

        assert!(matches!(
            verify_payment_signature("key_secret", "order_abc", "pay_other", &sig),
            Err(SignatureError::Mismatch)
        ));
        assert!(matches!(
            verify_payment_signature("wrong_secret", "order_abc", "pay_xyz", &sig),
            Err(SignatureError::Mismatch)
        ));

        let mut flipped = sig.clone().into_bytes();
        flipped[0] = if flipped[0] == b'0' { b'1' } else { b'0' };
        let flipped = String::from_utf8(flipped).unwrap();
        assert!(verify_payment_signature("key_secret", "order_abc", "pay_xyz", &flipped).is_err());
    }

    #[test]
    fn test_malformed_signature() {
        assert!(matches!(
            verify_webhook_signature("s", b"{}", "not hex!"),
            Err(SignatureError::Malformed)
        ));
        assert!(matches!(
            verify_webhook_signature("s", b"{}", "abcd"),
            Err(SignatureError::Mismatch)
        ));
    }

    #[test]
    fn test_webhook_signature_over_raw_body() {
        let body = br#"{"event":"payment.captured"}"#;
        let sig = sign("whsec", body).unwrap();

        assert!(verify_webhook_signature("whsec", body, &sig).is_ok());
        assert!(verify_webhook_signature("whsec", br#"{"event":"payment.failed"}"#, &sig).is_err());
    }
}
