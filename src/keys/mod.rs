//! Key material: symmetric keys, RSA and EC key parameters, and PEM/DER import.

pub mod der;
mod ec;
pub mod pem;
mod rsa;

use ct_codecs::{Base64UrlSafeNoPadding, Encoder};
use hmac_sha256::Hash as SHA256;
use serde_json::json;
use zeroize::Zeroize;

use crate::common::random_bytes;
use crate::error::*;
use crate::jwa::{
    Algorithm, AlgorithmCategory, EncryptionAlgorithm, KeyManagementAlgorithm, SignatureAlgorithm,
};

pub(crate) use self::ec::with_curve;
pub use self::ec::EcKeyParameters;
pub use self::rsa::{RsaKeyParameters, RsaPrivateParameters};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyType {
    Symmetric,
    Rsa,
    Ec,
}

impl KeyType {
    /// JWK `kty` value.
    pub fn name(&self) -> &'static str {
        match self {
            KeyType::Symmetric => "oct",
            KeyType::Rsa => "RSA",
            KeyType::Ec => "EC",
        }
    }
}

/// Content-based identity of a key.
///
/// Two keys built independently from the same components have the same identity.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyIdentity {
    key_type: KeyType,
    fingerprint: [u8; 32],
}

impl KeyIdentity {
    fn new(key_type: KeyType, components: &[&[u8]]) -> Self {
        let mut h = SHA256::new();
        h.update(key_type.name());
        for component in components {
            h.update((component.len() as u64).to_be_bytes());
            h.update(component);
        }
        KeyIdentity {
            key_type,
            fingerprint: h.finalize(),
        }
    }

    pub fn key_type(&self) -> KeyType {
        self.key_type
    }
}

impl std::fmt::Debug for KeyIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyIdentity")
            .field("key_type", &self.key_type)
            .field("fingerprint", &format_args!("{:02x?}", &self.fingerprint[..4]))
            .finish_non_exhaustive()
    }
}

/// Raw symmetric key, zeroed when dropped.
#[derive(Clone)]
pub struct SymmetricKey {
    key: Vec<u8>,
}

impl std::fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SymmetricKey")
            .field("key_size_bits", &self.key_size_bits())
            .finish_non_exhaustive()
    }
}

impl Drop for SymmetricKey {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}

impl SymmetricKey {
    pub fn from_bytes(key: &[u8]) -> Result<Self, Error> {
        ensure!(!key.is_empty(), JWTError::InvalidKeySize);
        Ok(SymmetricKey { key: key.to_vec() })
    }

    /// Generate a random key. `bits` must be a non-zero multiple of 8.
    pub fn generate(bits: usize) -> Result<Self, Error> {
        ensure!(bits > 0 && bits % 8 == 0, JWTError::InvalidKeySize);
        Ok(SymmetricKey {
            key: random_bytes(bits / 8),
        })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.key
    }

    pub fn key_size_bits(&self) -> usize {
        self.key.len() * 8
    }
}

impl PartialEq for SymmetricKey {
    fn eq(&self, other: &Self) -> bool {
        self.key.len() == other.key.len() && ct_codecs::verify(&self.key, &other.key)
    }
}

impl Eq for SymmetricKey {}

/// A key usable by the signers, encryptors and key wrappers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Jwk {
    Symmetric(SymmetricKey),
    Rsa(RsaKeyParameters),
    Ec(EcKeyParameters),
}

impl From<SymmetricKey> for Jwk {
    fn from(key: SymmetricKey) -> Self {
        Jwk::Symmetric(key)
    }
}

impl From<RsaKeyParameters> for Jwk {
    fn from(key: RsaKeyParameters) -> Self {
        Jwk::Rsa(key)
    }
}

impl From<EcKeyParameters> for Jwk {
    fn from(key: EcKeyParameters) -> Self {
        Jwk::Ec(key)
    }
}

impl Jwk {
    /// Import a key from a PEM document.
    ///
    /// Recognized labels: `RSA PUBLIC KEY`, `RSA PRIVATE KEY`, `EC PRIVATE KEY`,
    /// `PUBLIC KEY` and `PRIVATE KEY`.
    pub fn from_pem(pem: &str) -> Result<Self, Error> {
        pem::decode_key(pem)
    }

    pub fn symmetric(key: &[u8]) -> Result<Self, Error> {
        SymmetricKey::from_bytes(key).map(Jwk::Symmetric)
    }

    pub fn key_type(&self) -> KeyType {
        match self {
            Jwk::Symmetric(_) => KeyType::Symmetric,
            Jwk::Rsa(_) => KeyType::Rsa,
            Jwk::Ec(_) => KeyType::Ec,
        }
    }

    pub fn key_size_bits(&self) -> usize {
        match self {
            Jwk::Symmetric(key) => key.key_size_bits(),
            Jwk::Rsa(key) => key.key_size_bits(),
            Jwk::Ec(key) => key.key_size_bits(),
        }
    }

    pub fn has_private_key(&self) -> bool {
        match self {
            Jwk::Symmetric(_) => true,
            Jwk::Rsa(key) => key.has_private_key(),
            Jwk::Ec(key) => key.has_private_key(),
        }
    }

    /// Same key without private components. Symmetric keys have none to strip.
    pub fn to_public(&self) -> Self {
        match self {
            Jwk::Symmetric(key) => Jwk::Symmetric(key.clone()),
            Jwk::Rsa(key) => Jwk::Rsa(key.to_public()),
            Jwk::Ec(key) => Jwk::Ec(key.to_public()),
        }
    }

    pub fn identity(&self) -> KeyIdentity {
        match self {
            Jwk::Symmetric(key) => KeyIdentity::new(KeyType::Symmetric, &[key.as_bytes()]),
            Jwk::Rsa(key) => KeyIdentity::new(KeyType::Rsa, &key.components()),
            Jwk::Ec(key) => KeyIdentity::new(KeyType::Ec, &key.components()),
        }
    }

    /// ECDSA algorithms are bound to a single curve.
    pub fn supports_signature(&self, alg: SignatureAlgorithm) -> bool {
        let descriptor = alg.descriptor();
        match (self, descriptor.category) {
            (Jwk::Symmetric(_), AlgorithmCategory::Hmac) | (Jwk::Rsa(_), AlgorithmCategory::Rsa) => {
                true
            }
            (Jwk::Ec(key), AlgorithmCategory::EllipticCurve) => {
                descriptor.curve == Some(key.curve())
            }
            _ => false,
        }
    }

    pub fn supports_key_management(&self, alg: KeyManagementAlgorithm) -> bool {
        matches!(
            (self, alg.category()),
            (
                Jwk::Symmetric(_),
                AlgorithmCategory::Direct | AlgorithmCategory::AesKeyWrap | AlgorithmCategory::AesGcm
            ) | (Jwk::Rsa(_), AlgorithmCategory::Rsa)
                | (Jwk::Ec(_), AlgorithmCategory::EcdhEs)
        )
    }

    pub fn supports_encryption(&self, enc: EncryptionAlgorithm) -> bool {
        matches!(
            (self, enc.category()),
            (
                Jwk::Symmetric(_),
                AlgorithmCategory::AesCbcHmac | AlgorithmCategory::AesGcm
            )
        )
    }

    /// RFC 7638 thumbprint: base64url(SHA-256(canonical JSON of the required public members)).
    pub fn thumbprint(&self) -> Result<String, Error> {
        let b64 = |bin: &[u8]| Base64UrlSafeNoPadding::encode_to_string(bin);
        // serde_json maps are sorted by key, which is the canonical member order.
        let members = match self {
            Jwk::Symmetric(key) => json!({ "k": b64(key.as_bytes())?, "kty": "oct" }),
            Jwk::Rsa(key) => json!({ "e": b64(key.e())?, "kty": "RSA", "n": b64(key.n())? }),
            Jwk::Ec(key) => json!({
                "crv": key.curve().name(),
                "kty": "EC",
                "x": b64(key.x())?,
                "y": b64(key.y())?,
            }),
        };
        let digest = SHA256::hash(members.to_string().as_bytes());
        Ok(Base64UrlSafeNoPadding::encode_to_string(digest)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jwa::EllipticCurve;
    use ct_codecs::Decoder;

    #[test]
    fn identity_is_content_based() {
        let a = Jwk::symmetric(b"0123456789abcdef").unwrap();
        let b = Jwk::symmetric(b"0123456789abcdef").unwrap();
        let c = Jwk::symmetric(b"0123456789abcdeF").unwrap();
        assert_eq!(a.identity(), b.identity());
        assert_ne!(a.identity(), c.identity());
        assert_eq!(a, b);
        assert_ne!(a, c);

        let ec = EcKeyParameters::generate(EllipticCurve::P256).unwrap();
        let ec_pub = Jwk::Ec(ec.to_public());
        let ec = Jwk::Ec(ec);
        assert_ne!(ec.identity(), ec_pub.identity());
        assert_eq!(ec.identity().key_type(), KeyType::Ec);
    }

    #[test]
    fn supported_algorithms() {
        let key = Jwk::Symmetric(SymmetricKey::generate(256).unwrap());
        assert!(key.supports_signature(SignatureAlgorithm::HS256));
        assert!(!key.supports_signature(SignatureAlgorithm::RS256));
        assert!(key.supports_key_management(KeyManagementAlgorithm::A256KW));
        assert!(key.supports_key_management(KeyManagementAlgorithm::Direct));
        assert!(!key.supports_key_management(KeyManagementAlgorithm::ECDH_ES));
        assert!(key.supports_encryption(EncryptionAlgorithm::A128CBC_HS256));

        let key = Jwk::Ec(EcKeyParameters::generate(EllipticCurve::P384).unwrap());
        assert!(key.supports_signature(SignatureAlgorithm::ES384));
        assert!(!key.supports_signature(SignatureAlgorithm::ES256));
        assert!(key.supports_key_management(KeyManagementAlgorithm::ECDH_ES_A128KW));
        assert!(!key.supports_encryption(EncryptionAlgorithm::A128GCM));
        assert_eq!(key.key_size_bits(), 384);
    }

    #[test]
    fn thumbprint() {
        // RFC 7638, section 3.1
        let n = "0vx7agoebGcQSuuPiLJXZptN9nndrQmbXEps2aiAFbWhM78LhWx4cbbfAAtVT86zwu1RK7aPFFxuhDR1L6tSoc_BJECPebWKRXjBZCiFV4n3oknjhMstn64tZ_2W-5JsGY4Hc5n9yBXArwl93lqt7_RN5w6Cf0h4QyQ5v-65YGjQR0_FDW2QvzqY368QQMicAtaSqzs8KJZgnYb9c7d0zgdAZHzu6qMQvRL5hajrn1n91CbOpbISD08qNLyrdkt-bFTWhAI4vMQFh6WeZu0fM4lFd2NcRwr3XPksINHaQ-G_xBniIqbw0Ls1jF44-csFCur-kEgU8awapJzKnqDKgw";
        let n = ct_codecs::Base64UrlSafeNoPadding::decode_to_vec(n, None).unwrap();
        let key = Jwk::Rsa(RsaKeyParameters::from_public_components(&n, &[1, 0, 1]).unwrap());
        assert_eq!(
            key.thumbprint().unwrap(),
            "NzbLsXh8uDCcd-6MNwXF4W_7noWXFZAfHkxZsRGC9Xs"
        );
    }
}
