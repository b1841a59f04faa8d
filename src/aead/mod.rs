//! Content encryption: AES-CBC-HMAC and AES-GCM.

mod cbc_hmac;
#[cfg(feature = "gcm")]
pub(crate) mod gcm;

use crate::aes::{AesStrategy, BLOCK_SIZE};
use crate::common::{CryptoOptions, Disposable};
use crate::error::*;
use crate::jwa::{Algorithm, AlgorithmCategory, EncryptionAlgorithm};

use self::cbc_hmac::CbcHmac;
#[cfg(feature = "gcm")]
use self::gcm::GcmCipher;

enum AeadKind {
    CbcHmac(CbcHmac),
    #[cfg(feature = "gcm")]
    Gcm(GcmCipher),
}

/// Authenticated encryption bound to one content encryption key and algorithm.
pub struct AuthenticatedEncryptor {
    alg: EncryptionAlgorithm,
    state: Disposable<AeadKind>,
}

impl std::fmt::Debug for AuthenticatedEncryptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthenticatedEncryptor")
            .field("alg", &self.alg)
            .field("disposed", &self.is_disposed())
            .finish_non_exhaustive()
    }
}

impl AuthenticatedEncryptor {
    /// Create an encryptor. The key must have the exact size required by the algorithm.
    pub fn new(key: &[u8], alg: EncryptionAlgorithm) -> Result<Self, Error> {
        Self::with_options(key, alg, &CryptoOptions::default())
    }

    pub fn with_options(
        key: &[u8],
        alg: EncryptionAlgorithm,
        options: &CryptoOptions,
    ) -> Result<Self, Error> {
        ensure!(key.len() == alg.key_size(), JWTError::InvalidKeySize);
        let kind = match alg.category() {
            AlgorithmCategory::AesCbcHmac => {
                let hash = alg
                    .descriptor()
                    .hash
                    .ok_or_else(|| JWTError::InternalError("missing hash".into()))?;
                AeadKind::CbcHmac(CbcHmac::new(key, hash, options.aes_strategy())?)
            }
            AlgorithmCategory::AesGcm => Self::gcm(key, alg)?,
            _ => bail!(JWTError::UnsupportedAlgorithm(alg.name().to_string())),
        };
        Ok(AuthenticatedEncryptor {
            alg,
            state: Disposable::new(kind),
        })
    }

    #[cfg(feature = "gcm")]
    fn gcm(key: &[u8], _alg: EncryptionAlgorithm) -> Result<AeadKind, Error> {
        Ok(AeadKind::Gcm(GcmCipher::new(key)?))
    }

    #[cfg(not(feature = "gcm"))]
    fn gcm(_key: &[u8], alg: EncryptionAlgorithm) -> Result<AeadKind, Error> {
        bail!(JWTError::UnsupportedAlgorithm(alg.name().to_string()))
    }

    pub fn algorithm(&self) -> EncryptionAlgorithm {
        self.alg
    }

    /// Nonce (IV) size in bytes.
    pub fn nonce_size(&self) -> usize {
        self.alg.nonce_size()
    }

    /// Authentication tag size in bytes.
    pub fn tag_size(&self) -> usize {
        self.alg.tag_size()
    }

    /// Size of the ciphertext produced for a plaintext of `plaintext_len` bytes.
    pub fn ciphertext_size(&self, plaintext_len: usize) -> usize {
        match self.alg.category() {
            AlgorithmCategory::AesCbcHmac => (plaintext_len / BLOCK_SIZE + 1) * BLOCK_SIZE,
            _ => plaintext_len,
        }
    }

    /// Generate a random nonce of the right size for this algorithm.
    pub fn generate_nonce(&self) -> Vec<u8> {
        self.alg.generate_nonce()
    }

    /// Encrypt and authenticate `plaintext` and `aad`.
    ///
    /// Returns `(ciphertext, tag)`.
    pub fn encrypt(
        &self,
        nonce: &[u8],
        aad: &[u8],
        plaintext: &[u8],
    ) -> Result<(Vec<u8>, Vec<u8>), Error> {
        ensure!(nonce.len() == self.nonce_size(), JWTError::InvalidNonce);
        self.state.with(|kind| match kind {
            AeadKind::CbcHmac(c) => c.encrypt(nonce, aad, plaintext),
            #[cfg(feature = "gcm")]
            AeadKind::Gcm(c) => c.encrypt(nonce, aad, plaintext),
        })
    }

    /// Verify and decrypt. Every failure is reported as `AuthenticationFailure`.
    pub fn decrypt(
        &self,
        nonce: &[u8],
        aad: &[u8],
        ciphertext: &[u8],
        tag: &[u8],
    ) -> Result<Vec<u8>, Error> {
        self.state.with(|kind| match kind {
            AeadKind::CbcHmac(c) => {
                ensure!(tag.len() == c.tag_len(), JWTError::AuthenticationFailure);
                c.decrypt(nonce, aad, ciphertext, tag)
            }
            #[cfg(feature = "gcm")]
            AeadKind::Gcm(c) => c.decrypt(nonce, aad, ciphertext, tag),
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
