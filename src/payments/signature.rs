//! Gateway payment signature verification (HMAC-SHA256, hex encoded)

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Checks that a reported payment completion was authorized by the gateway
pub trait SignatureVerifier: Send + Sync {
    fn verify(&self, order_id: &str, payment_id: &str, signature: &str) -> bool;
}

/// Verifier holding the gateway's shared secret
pub struct HmacSignatureVerifier {
    secret: String,
}

impl HmacSignatureVerifier {
    pub fn new(secret: impl Into<String>) -> Self {
        Self { secret: secret.into() }
    }
}

impl SignatureVerifier for HmacSignatureVerifier {
    fn verify(&self, order_id: &str, payment_id: &str, signature: &str) -> bool {
        verify_payment_signature(order_id, payment_id, signature, &self.secret)
    }
}

/// Hex HMAC-SHA256 of `order_id|payment_id`
pub fn sign_payment(order_id: &str, payment_id: &str, secret: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .unwrap_or_else(|_| unreachable!("HMAC can take key of any size"));
    mac.update(order_id.as_bytes());
    mac.update(b"|");
    mac.update(payment_id.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Constant-time comparison against the expected signature.
///
/// A wrong-length signature still costs a full digest comparison.
pub fn verify_payment_signature(order_id: &str, payment_id: &str, signature: &str, secret: &str) -> bool {
    let expected = sign_payment(order_id, payment_id, secret);
    let expected = expected.as_bytes();
    let provided = signature.as_bytes();

    let same_len = (expected.len() as u64).ct_eq(&(provided.len() as u64));
    let candidate = if provided.len() == expected.len() { provided } else { expected };

    (same_len & expected.ct_eq(candidate)).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test_secret";
    const VALID: &str = "51f0a34958f0ce7ac342356ff88777051f9020cd6312db5c113ae9a3d3da2d78";

    #[test]
    fn test_known_vector() {
        assert_eq!(sign_payment("order_abc", "pay_1", SECRET), VALID);
        assert!(verify_payment_signature("order_abc", "pay_1", VALID, SECRET));
    }

    #[test]
    fn test_rejects_tampered_inputs() {
        assert!(!verify_payment_signature("order_abd", "pay_1", VALID, SECRET));
        assert!(!verify_payment_signature("order_abc", "pay_2", VALID, SECRET));
        assert!(!verify_payment_signature("order_abc", "pay_1", VALID, "other_secret"));
        assert!(!verify_payment_signature("order_abc", "pay_1", &VALID.to_uppercase(), SECRET));
    }

    #[test]
    fn test_rejects_wrong_lengths() {
        assert!(!verify_payment_signature("order_abc", "pay_1", "", SECRET));
        assert!(!verify_payment_signature("order_abc", "pay_1", &VALID[..63], SECRET));
        assert!(!verify_payment_signature("order_abc", "pay_1", &format!("{}00", VALID), SECRET));
    }

    #[test]
    fn test_field_boundaries_matter() {
        assert_ne!(sign_payment("order_a", "bpay", SECRET), sign_payment("order_ab", "pay", SECRET));
    }

    #[test]
    fn test_verifier_trait() {
        let verifier = HmacSignatureVerifier::new(SECRET);
        assert!(verifier.verify("order_abc", "pay_1", VALID));
        assert!(!verifier.verify("order_abc", "pay_1", "invalid"));
    }
}
