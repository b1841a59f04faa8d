//! JWS signatures: HMAC, RSASSA-PKCS1-v1_5, RSASSA-PSS and ECDSA.

mod ecdsa;
mod rsa;

use crate::common::{CryptoOptions, Disposable};
use crate::error::*;
use crate::hmac::KeyedHash;
use crate::jwa::{Algorithm, AlgorithmCategory, HashAlgorithm, SignatureAlgorithm};
use crate::keys::Jwk;

use self::ecdsa::EcdsaSigner;
use self::rsa::RsaSigner;

enum SignerKind {
    Hmac(KeyedHash),
    Rsa(RsaSigner),
    Ecdsa(EcdsaSigner),
}

/// Signature engine bound to one key and one algorithm.
pub struct Signer {
    alg: SignatureAlgorithm,
    signature_size: usize,
    state: Disposable<SignerKind>,
}

impl std::fmt::Debug for Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signer")
            .field("alg", &self.alg)
            .field("disposed", &self.is_disposed())
            .finish_non_exhaustive()
    }
}

impl Signer {
    /// Create a signer.
    ///
    /// With `will_create_signatures`, the key must include its private part.
    pub fn new(
        key: &Jwk,
        alg: SignatureAlgorithm,
        will_create_signatures: bool,
    ) -> Result<Self, Error> {
        Self::with_options(key, alg, will_create_signatures, &CryptoOptions::default())
    }

    pub fn with_options(
        key: &Jwk,
        alg: SignatureAlgorithm,
        will_create_signatures: bool,
        options: &CryptoOptions,
    ) -> Result<Self, Error> {
        let descriptor = alg.descriptor();
        let hash = descriptor.hash.unwrap_or(HashAlgorithm::Sha256);
        let kind = match (descriptor.category, key) {
            (AlgorithmCategory::Hmac, Jwk::Symmetric(k)) => {
                ensure!(
                    k.key_size_bits() >= options.minimum_hmac_key_size_bits,
                    JWTError::InvalidKeySize
                );
                SignerKind::Hmac(KeyedHash::new(k.as_bytes(), hash)?)
            }
            (AlgorithmCategory::Rsa, Jwk::Rsa(k)) => {
                ensure!(
                    k.key_size_bits() >= options.minimum_rsa_key_size_bits,
                    JWTError::InvalidKeySize
                );
                let pss = matches!(
                    alg,
                    SignatureAlgorithm::PS256 | SignatureAlgorithm::PS384 | SignatureAlgorithm::PS512
                );
                SignerKind::Rsa(RsaSigner::new(k, hash, pss)?)
            }
            (AlgorithmCategory::EllipticCurve, Jwk::Ec(k)) => {
                ensure!(
                    descriptor.curve == Some(k.curve()),
                    JWTError::UnsupportedAlgorithm(format!(
                        "{} with a {} key",
                        alg.name(),
                        k.curve().name()
                    ))
                );
                SignerKind::Ecdsa(EcdsaSigner::new(k)?)
            }
            _ => bail!(JWTError::UnsupportedAlgorithm(format!(
                "{} with a {} key",
                alg.name(),
                key.key_type().name()
            ))),
        };
        if will_create_signatures {
            ensure!(key.has_private_key(), JWTError::MissingPrivateKey);
        }
        let signature_size = match &kind {
            SignerKind::Hmac(mac) => mac.output_size(),
            SignerKind::Rsa(rsa) => rsa.signature_size(),
            SignerKind::Ecdsa(ecdsa) => ecdsa.signature_size(),
        };
        Ok(Signer {
            alg,
            signature_size,
            state: Disposable::new(kind),
        })
    }

    pub fn algorithm(&self) -> SignatureAlgorithm {
        self.alg
    }

    /// Size of a signature, in bytes.
    pub fn signature_size(&self) -> usize {
        self.signature_size
    }

    /// Sign a message.
    pub fn sign(&self, message: &[u8]) -> Result<Vec<u8>, Error> {
        self.state.with(|kind| match kind {
            SignerKind::Hmac(mac) => Ok(mac.compute(message)),
            SignerKind::Rsa(rsa) => rsa.sign(message),
            SignerKind::Ecdsa(ecdsa) => ecdsa.sign(message),
        })
    }

    /// Verify a signature. An invalid signature is `Ok(false)`, not an error.
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> Result<bool, Error> {
        self.state.with(|kind| {
            Ok(match kind {
                SignerKind::Hmac(mac) => {
                    signature.len() == mac.output_size() && mac.verify(message, signature)
                }
                SignerKind::Rsa(rsa) => rsa.verify(message, signature),
                SignerKind::Ecdsa(ecdsa) => ecdsa.verify(message, signature),
            })
        })
    }

    /// Release the key. Later calls fail with `DisposedAccess`.
    pub fn dispose(&self) {
        self.state.dispose();
    }

    pub fn is_disposed(&self) -> bool {
        self.state.is_disposed()
    }
}
