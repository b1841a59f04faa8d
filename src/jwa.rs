//! Algorithm identifiers (RFC 7518) and their descriptors.

use serde::{Deserialize, Serialize};

use crate::common::random_bytes;
use crate::error::*;
use crate::key_wrap::CEK;

/// Family an algorithm belongs to. Determines which key type can serve it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlgorithmCategory {
    Hmac,
    Rsa,
    EllipticCurve,
    AesCbcHmac,
    AesGcm,
    AesKeyWrap,
    Direct,
    EcdhEs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashAlgorithm {
    Sha1,
    Sha256,
    Sha384,
    Sha512,
}

impl HashAlgorithm {
    pub fn output_size(&self) -> usize {
        match self {
            HashAlgorithm::Sha1 => 20,
            HashAlgorithm::Sha256 => 32,
            HashAlgorithm::Sha384 => 48,
            HashAlgorithm::Sha512 => 64,
        }
    }
}

/// NIST curves usable for ECDSA and ECDH-ES.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EllipticCurve {
    #[serde(rename = "P-256")]
    P256,
    #[serde(rename = "P-384")]
    P384,
    #[serde(rename = "P-521")]
    P521,
}

impl EllipticCurve {
    pub fn name(&self) -> &'static str {
        match self {
            EllipticCurve::P256 => "P-256",
            EllipticCurve::P384 => "P-384",
            EllipticCurve::P521 => "P-521",
        }
    }

    pub fn from_name(name: &str) -> Result<Self, Error> {
        match name {
            "P-256" => Ok(EllipticCurve::P256),
            "P-384" => Ok(EllipticCurve::P384),
            "P-521" => Ok(EllipticCurve::P521),
            _ => bail!(JWTError::UnsupportedAlgorithm(name.to_string())),
        }
    }

    /// Size of a coordinate or of the private scalar, in bytes.
    pub fn coordinate_size(&self) -> usize {
        match self {
            EllipticCurve::P256 => 32,
            EllipticCurve::P384 => 48,
            EllipticCurve::P521 => 66,
        }
    }

    pub fn key_size_bits(&self) -> usize {
        match self {
            EllipticCurve::P256 => 256,
            EllipticCurve::P384 => 384,
            EllipticCurve::P521 => 521,
        }
    }
}

/// Immutable description of an algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlgorithmDescriptor {
    pub id: &'static str,
    pub category: AlgorithmCategory,
    /// Minimum key size for signature algorithms, exact size for symmetric encryption and wrapping.
    pub required_key_size_bits: usize,
    pub hash: Option<HashAlgorithm>,
    pub curve: Option<EllipticCurve>,
}

impl AlgorithmDescriptor {
    const fn new(id: &'static str, category: AlgorithmCategory, bits: usize) -> Self {
        AlgorithmDescriptor {
            id,
            category,
            required_key_size_bits: bits,
            hash: None,
            curve: None,
        }
    }

    const fn with_hash(mut self, hash: HashAlgorithm) -> Self {
        self.hash = Some(hash);
        self
    }

    const fn with_curve(mut self, curve: EllipticCurve) -> Self {
        self.curve = Some(curve);
        self
    }
}

/// Common interface of the three algorithm families.
pub trait Algorithm: Copy + Eq + std::hash::Hash + Send + Sync + 'static {
    fn descriptor(&self) -> AlgorithmDescriptor;

    fn name(&self) -> &'static str {
        self.descriptor().id
    }

    fn category(&self) -> AlgorithmCategory {
        self.descriptor().category
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignatureAlgorithm {
    HS256,
    HS384,
    HS512,
    RS256,
    RS384,
    RS512,
    PS256,
    PS384,
    PS512,
    ES256,
    ES384,
    ES512,
}

impl SignatureAlgorithm {
    pub const ALL: [SignatureAlgorithm; 12] = [
        SignatureAlgorithm::HS256,
        SignatureAlgorithm::HS384,
        SignatureAlgorithm::HS512,
        SignatureAlgorithm::RS256,
        SignatureAlgorithm::RS384,
        SignatureAlgorithm::RS512,
        SignatureAlgorithm::PS256,
        SignatureAlgorithm::PS384,
        SignatureAlgorithm::PS512,
        SignatureAlgorithm::ES256,
        SignatureAlgorithm::ES384,
        SignatureAlgorithm::ES512,
    ];

    pub fn from_name(name: &str) -> Result<Self, Error> {
        Self::ALL
            .into_iter()
            .find(|alg| alg.name() == name)
            .ok_or_else(|| anyhow!(JWTError::UnsupportedAlgorithm(name.to_string())))
    }
}

impl Algorithm for SignatureAlgorithm {
    fn descriptor(&self) -> AlgorithmDescriptor {
        use AlgorithmCategory as C;
        use HashAlgorithm::*;
        match self {
            SignatureAlgorithm::HS256 => {
                AlgorithmDescriptor::new("HS256", C::Hmac, 128).with_hash(Sha256)
            }
            SignatureAlgorithm::HS384 => {
                AlgorithmDescriptor::new("HS384", C::Hmac, 192).with_hash(Sha384)
            }
            SignatureAlgorithm::HS512 => {
                AlgorithmDescriptor::new("HS512", C::Hmac, 256).with_hash(Sha512)
            }
            SignatureAlgorithm::RS256 => {
                AlgorithmDescriptor::new("RS256", C::Rsa, 2048).with_hash(Sha256)
            }
            SignatureAlgorithm::RS384 => {
                AlgorithmDescriptor::new("RS384", C::Rsa, 2048).with_hash(Sha384)
            }
            SignatureAlgorithm::RS512 => {
                AlgorithmDescriptor::new("RS512", C::Rsa, 2048).with_hash(Sha512)
            }
            SignatureAlgorithm::PS256 => {
                AlgorithmDescriptor::new("PS256", C::Rsa, 2048).with_hash(Sha256)
            }
            SignatureAlgorithm::PS384 => {
                AlgorithmDescriptor::new("PS384", C::Rsa, 2048).with_hash(Sha384)
            }
            SignatureAlgorithm::PS512 => {
                AlgorithmDescriptor::new("PS512", C::Rsa, 2048).with_hash(Sha512)
            }
            SignatureAlgorithm::ES256 => AlgorithmDescriptor::new("ES256", C::EllipticCurve, 256)
                .with_hash(Sha256)
                .with_curve(EllipticCurve::P256),
            SignatureAlgorithm::ES384 => AlgorithmDescriptor::new("ES384", C::EllipticCurve, 384)
                .with_hash(Sha384)
                .with_curve(EllipticCurve::P384),
            SignatureAlgorithm::ES512 => AlgorithmDescriptor::new("ES512", C::EllipticCurve, 521)
                .with_hash(Sha512)
                .with_curve(EllipticCurve::P521),
        }
    }
}

#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyManagementAlgorithm {
    #[serde(rename = "dir")]
    Direct,
    A128KW,
    A192KW,
    A256KW,
    A128GCMKW,
    A192GCMKW,
    A256GCMKW,
    RSA1_5,
    #[serde(rename = "RSA-OAEP")]
    RSA_OAEP,
    #[serde(rename = "RSA-OAEP-256")]
    RSA_OAEP_256,
    #[serde(rename = "ECDH-ES")]
    ECDH_ES,
    #[serde(rename = "ECDH-ES+A128KW")]
    ECDH_ES_A128KW,
    #[serde(rename = "ECDH-ES+A192KW")]
    ECDH_ES_A192KW,
    #[serde(rename = "ECDH-ES+A256KW")]
    ECDH_ES_A256KW,
}

impl KeyManagementAlgorithm {
    pub const ALL: [KeyManagementAlgorithm; 14] = [
        KeyManagementAlgorithm::Direct,
        KeyManagementAlgorithm::A128KW,
        KeyManagementAlgorithm::A192KW,
        KeyManagementAlgorithm::A256KW,
        KeyManagementAlgorithm::A128GCMKW,
        KeyManagementAlgorithm::A192GCMKW,
        KeyManagementAlgorithm::A256GCMKW,
        KeyManagementAlgorithm::RSA1_5,
        KeyManagementAlgorithm::RSA_OAEP,
        KeyManagementAlgorithm::RSA_OAEP_256,
        KeyManagementAlgorithm::ECDH_ES,
        KeyManagementAlgorithm::ECDH_ES_A128KW,
        KeyManagementAlgorithm::ECDH_ES_A192KW,
        KeyManagementAlgorithm::ECDH_ES_A256KW,
    ];

    pub fn from_name(name: &str) -> Result<Self, Error> {
        Self::ALL
            .into_iter()
            .find(|alg| alg.name() == name)
            .ok_or_else(|| anyhow!(JWTError::UnsupportedAlgorithm(name.to_string())))
    }

    /// Size in bytes of the AES key used to wrap the CEK, if the algorithm wraps with AES.
    pub fn wrap_key_size(&self) -> Option<usize> {
        match self {
            KeyManagementAlgorithm::A128KW
            | KeyManagementAlgorithm::A128GCMKW
            | KeyManagementAlgorithm::ECDH_ES_A128KW => Some(16),
            KeyManagementAlgorithm::A192KW
            | KeyManagementAlgorithm::A192GCMKW
            | KeyManagementAlgorithm::ECDH_ES_A192KW => Some(24),
            KeyManagementAlgorithm::A256KW
            | KeyManagementAlgorithm::A256GCMKW
            | KeyManagementAlgorithm::ECDH_ES_A256KW => Some(32),
            _ => None,
        }
    }

    /// `true` if the CEK is not transported in the encrypted key field.
    pub fn produces_empty_encrypted_key(&self) -> bool {
        matches!(
            self,
            KeyManagementAlgorithm::Direct | KeyManagementAlgorithm::ECDH_ES
        )
    }
}

impl Algorithm for KeyManagementAlgorithm {
    fn descriptor(&self) -> AlgorithmDescriptor {
        use AlgorithmCategory as C;
        use HashAlgorithm::*;
        match self {
            KeyManagementAlgorithm::Direct => AlgorithmDescriptor::new("dir", C::Direct, 0),
            KeyManagementAlgorithm::A128KW => {
                AlgorithmDescriptor::new("A128KW", C::AesKeyWrap, 128)
            }
            KeyManagementAlgorithm::A192KW => {
                AlgorithmDescriptor::new("A192KW", C::AesKeyWrap, 192)
            }
            KeyManagementAlgorithm::A256KW => {
                AlgorithmDescriptor::new("A256KW", C::AesKeyWrap, 256)
            }
            KeyManagementAlgorithm::A128GCMKW => {
                AlgorithmDescriptor::new("A128GCMKW", C::AesGcm, 128)
            }
            KeyManagementAlgorithm::A192GCMKW => {
                AlgorithmDescriptor::new("A192GCMKW", C::AesGcm, 192)
            }
            KeyManagementAlgorithm::A256GCMKW => {
                AlgorithmDescriptor::new("A256GCMKW", C::AesGcm, 256)
            }
            KeyManagementAlgorithm::RSA1_5 => AlgorithmDescriptor::new("RSA1_5", C::Rsa, 2048),
            KeyManagementAlgorithm::RSA_OAEP => {
                AlgorithmDescriptor::new("RSA-OAEP", C::Rsa, 2048).with_hash(Sha1)
            }
            KeyManagementAlgorithm::RSA_OAEP_256 => {
                AlgorithmDescriptor::new("RSA-OAEP-256", C::Rsa, 2048).with_hash(Sha256)
            }
            KeyManagementAlgorithm::ECDH_ES => {
                AlgorithmDescriptor::new("ECDH-ES", C::EcdhEs, 0).with_hash(Sha256)
            }
            KeyManagementAlgorithm::ECDH_ES_A128KW => {
                AlgorithmDescriptor::new("ECDH-ES+A128KW", C::EcdhEs, 128).with_hash(Sha256)
            }
            KeyManagementAlgorithm::ECDH_ES_A192KW => {
                AlgorithmDescriptor::new("ECDH-ES+A192KW", C::EcdhEs, 192).with_hash(Sha256)
            }
            KeyManagementAlgorithm::ECDH_ES_A256KW => {
                AlgorithmDescriptor::new("ECDH-ES+A256KW", C::EcdhEs, 256).with_hash(Sha256)
            }
        }
    }
}

/// Content encryption algorithm identifier.
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EncryptionAlgorithm {
    #[serde(rename = "A128CBC-HS256")]
    A128CBC_HS256,
    #[serde(rename = "A192CBC-HS384")]
    A192CBC_HS384,
    #[serde(rename = "A256CBC-HS512")]
    A256CBC_HS512,
    A128GCM,
    A192GCM,
    /// AES-256-GCM (recommended default)
    #[default]
    A256GCM,
}

impl EncryptionAlgorithm {
    pub const ALL: [EncryptionAlgorithm; 6] = [
        EncryptionAlgorithm::A128CBC_HS256,
        EncryptionAlgorithm::A192CBC_HS384,
        EncryptionAlgorithm::A256CBC_HS512,
        EncryptionAlgorithm::A128GCM,
        EncryptionAlgorithm::A192GCM,
        EncryptionAlgorithm::A256GCM,
    ];

    /// Parse a content encryption algorithm from its JWE name.
    pub fn from_name(name: &str) -> Result<Self, Error> {
        Self::ALL
            .into_iter()
            .find(|alg| alg.name() == name)
            .ok_or_else(|| anyhow!(JWTError::UnsupportedAlgorithm(name.to_string())))
    }

    /// Get the required key size in bytes.
    pub fn key_size(&self) -> usize {
        self.descriptor().required_key_size_bits / 8
    }

    /// Get the IV size in bytes.
    pub fn nonce_size(&self) -> usize {
        match self.category() {
            AlgorithmCategory::AesGcm => 12,
            _ => 16,
        }
    }

    /// Get the authentication tag size in bytes.
    pub fn tag_size(&self) -> usize {
        match self {
            EncryptionAlgorithm::A128CBC_HS256 => 16,
            EncryptionAlgorithm::A192CBC_HS384 => 24,
            EncryptionAlgorithm::A256CBC_HS512 => 32,
            _ => 16,
        }
    }

    /// Generate a random Content Encryption Key (CEK) for this algorithm.
    pub fn generate_cek(&self) -> CEK {
        CEK::new(random_bytes(self.key_size()))
    }

    /// Generate a random IV for this algorithm.
    pub fn generate_nonce(&self) -> Vec<u8> {
        random_bytes(self.nonce_size())
    }
}

impl Algorithm for EncryptionAlgorithm {
    fn descriptor(&self) -> AlgorithmDescriptor {
        use AlgorithmCategory as C;
        use HashAlgorithm::*;
        match self {
            EncryptionAlgorithm::A128CBC_HS256 => {
                AlgorithmDescriptor::new("A128CBC-HS256", C::AesCbcHmac, 256).with_hash(Sha256)
            }
            EncryptionAlgorithm::A192CBC_HS384 => {
                AlgorithmDescriptor::new("A192CBC-HS384", C::AesCbcHmac, 384).with_hash(Sha384)
            }
            EncryptionAlgorithm::A256CBC_HS512 => {
                AlgorithmDescriptor::new("A256CBC-HS512", C::AesCbcHmac, 512).with_hash(Sha512)
            }
            EncryptionAlgorithm::A128GCM => AlgorithmDescriptor::new("A128GCM", C::AesGcm, 128),
            EncryptionAlgorithm::A192GCM => AlgorithmDescriptor::new("A192GCM", C::AesGcm, 192),
            EncryptionAlgorithm::A256GCM => AlgorithmDescriptor::new("A256GCM", C::AesGcm, 256),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for alg in SignatureAlgorithm::ALL {
            assert_eq!(SignatureAlgorithm::from_name(alg.name()).unwrap(), alg);
            let json = serde_json::to_string(&alg).unwrap();
            assert_eq!(json, format!("\"{}\"", alg.name()));
        }
        for alg in KeyManagementAlgorithm::ALL {
            assert_eq!(KeyManagementAlgorithm::from_name(alg.name()).unwrap(), alg);
            let json = serde_json::to_string(&alg).unwrap();
            assert_eq!(json, format!("\"{}\"", alg.name()));
        }
        for alg in EncryptionAlgorithm::ALL {
            assert_eq!(EncryptionAlgorithm::from_name(alg.name()).unwrap(), alg);
            let json = serde_json::to_string(&alg).unwrap();
            assert_eq!(json, format!("\"{}\"", alg.name()));
        }
        let err = SignatureAlgorithm::from_name("none").unwrap_err();
        assert!(matches!(
            JWTError::kind_of(&err),
            Some(JWTError::UnsupportedAlgorithm(_))
        ));
    }

    #[test]
    fn descriptors() {
        let d = SignatureAlgorithm::ES512.descriptor();
        assert_eq!(d.category, AlgorithmCategory::EllipticCurve);
        assert_eq!(d.curve, Some(EllipticCurve::P521));
        assert_eq!(d.required_key_size_bits, 521);

        assert_eq!(EncryptionAlgorithm::A192CBC_HS384.key_size(), 48);
        assert_eq!(EncryptionAlgorithm::A192CBC_HS384.tag_size(), 24);
        assert_eq!(EncryptionAlgorithm::A128GCM.key_size(), 16);
        assert_eq!(EncryptionAlgorithm::A128GCM.nonce_size(), 12);
        assert_eq!(EncryptionAlgorithm::A256GCM.generate_cek().as_bytes().len(), 32);

        assert_eq!(KeyManagementAlgorithm::ECDH_ES_A192KW.wrap_key_size(), Some(24));
        assert_eq!(KeyManagementAlgorithm::RSA_OAEP.wrap_key_size(), None);
        assert_eq!(
            KeyManagementAlgorithm::RSA_OAEP_256.descriptor().hash,
            Some(HashAlgorithm::Sha256)
        );
    }
}
