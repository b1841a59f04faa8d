use std::sync::{PoisonError, RwLock};

use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::aes::AesStrategy;
use crate::error::*;

pub const DEFAULT_MINIMUM_HMAC_KEY_SIZE_BITS: usize = 128;
pub const DEFAULT_MINIMUM_RSA_KEY_SIZE_BITS: usize = 2048;

/// Settings shared by every engine a factory builds
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CryptoOptions {
    /// Reject HMAC keys shorter than this, in bits
    pub minimum_hmac_key_size_bits: usize,

    /// Reject RSA keys whose modulus is shorter than this, in bits
    ///
    /// Values below 2048 are only useful to interoperate with legacy systems.
    pub minimum_rsa_key_size_bits: usize,

    /// Force a specific AES implementation instead of probing the CPU
    pub aes_strategy: Option<AesStrategy>,
}

impl Default for CryptoOptions {
    fn default() -> Self {
        CryptoOptions {
            minimum_hmac_key_size_bits: DEFAULT_MINIMUM_HMAC_KEY_SIZE_BITS,
            minimum_rsa_key_size_bits: DEFAULT_MINIMUM_RSA_KEY_SIZE_BITS,
            aes_strategy: None,
        }
    }
}

impl CryptoOptions {
    /// Load options from a JSON document. Missing fields take their default value.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        serde_json::from_str(json).map_err(|e| anyhow!(JWTError::InternalError(e.to_string())))
    }

    pub(crate) fn aes_strategy(&self) -> AesStrategy {
        self.aes_strategy.unwrap_or_else(AesStrategy::selected)
    }
}

/// Secret engine state that can be released while the engine is still shared.
///
/// Operations take a read lock for the duration of the call; `dispose()` takes the write lock,
/// so in-flight operations complete before the state is dropped.
pub(crate) struct Disposable<T> {
    inner: RwLock<Option<T>>,
}

impl<T> Disposable<T> {
    pub fn new(value: T) -> Self {
        Disposable {
            inner: RwLock::new(Some(value)),
        }
    }

    pub fn with<R>(&self, f: impl FnOnce(&T) -> Result<R, Error>) -> Result<R, Error> {
        let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        match guard.as_ref() {
            Some(value) => f(value),
            None => bail!(JWTError::DisposedAccess),
        }
    }

    /// Drops the state. Returns `true` only for the call that actually released it.
    pub fn dispose(&self) -> bool {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        guard.take().is_some()
    }

    pub fn is_disposed(&self) -> bool {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }
}

pub(crate) fn random_bytes(len: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_from_json() {
        let options = CryptoOptions::from_json(r#"{"minimum_rsa_key_size_bits": 3072}"#).unwrap();
        assert_eq!(options.minimum_rsa_key_size_bits, 3072);
        assert_eq!(
            options.minimum_hmac_key_size_bits,
            DEFAULT_MINIMUM_HMAC_KEY_SIZE_BITS
        );
        assert_eq!(options.aes_strategy, None);

        let options = CryptoOptions::from_json(r#"{"aes_strategy": "portable"}"#).unwrap();
        assert_eq!(options.aes_strategy, Some(AesStrategy::Portable));
        assert_eq!(options.aes_strategy(), AesStrategy::Portable);

        assert!(CryptoOptions::from_json("{").is_err());
    }

    #[test]
    fn disposable() {
        let cell = Disposable::new(42u32);
        assert_eq!(cell.with(|v| Ok(*v + 1)).unwrap(), 43);
        assert!(!cell.is_disposed());
        assert!(cell.dispose());
        assert!(!cell.dispose());
        assert!(cell.is_disposed());
        let err = cell.with(|v| Ok(*v)).unwrap_err();
        assert_eq!(JWTError::kind_of(&err), Some(&JWTError::DisposedAccess));
    }
}
