//! Caching factories for signers, authenticated encryptors and key wrappers.
//!
//! A factory maps `(key identity, algorithm)` to a shared engine. Engines are built on first
//! request and disposed together with the factory.

use std::fmt::Debug;
use std::hash::Hash;
use std::sync::{Arc, PoisonError, RwLock};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::{debug, trace};

use crate::aead::AuthenticatedEncryptor;
use crate::common::CryptoOptions;
use crate::error::*;
use crate::jwa::{EncryptionAlgorithm, KeyManagementAlgorithm, SignatureAlgorithm};
use crate::key_wrap::KeyWrapper;
use crate::keys::{Jwk, KeyIdentity};
use crate::signer::Signer;

/// Engines that hold key material a factory must release.
pub(crate) trait Disposal {
    fn dispose(&self);
}

impl Disposal for Signer {
    fn dispose(&self) {
        Signer::dispose(self)
    }
}

impl Disposal for AuthenticatedEncryptor {
    fn dispose(&self) {
        AuthenticatedEncryptor::dispose(self)
    }
}

impl Disposal for KeyWrapper {
    fn dispose(&self) {
        KeyWrapper::dispose(self)
    }
}

struct ProviderCache<A, T> {
    name: &'static str,
    disposed: RwLock<bool>,
    entries: DashMap<(KeyIdentity, A), Arc<T>>,
}

impl<A, T> ProviderCache<A, T>
where
    A: Copy + Eq + Hash + Debug,
    T: Disposal,
{
    fn new(name: &'static str) -> Self {
        ProviderCache {
            name,
            disposed: RwLock::new(false),
            entries: DashMap::new(),
        }
    }

    /// Returns the cached engine for `(key, alg)`, building and publishing one on a miss.
    ///
    /// The gate is held shared for the whole call, so `dispose()` cannot run in between.
    fn get_or_create(
        &self,
        key: &Jwk,
        alg: A,
        build: impl FnOnce() -> Result<T, Error>,
    ) -> Result<Arc<T>, Error> {
        let gate = self.disposed.read().unwrap_or_else(PoisonError::into_inner);
        ensure!(!*gate, JWTError::DisposedAccess);

        let slot = (key.identity(), alg);
        if let Some(engine) = self.entries.get(&slot) {
            trace!(cache = self.name, ?alg, "cache hit");
            return Ok(Arc::clone(engine.value()));
        }

        debug!(cache = self.name, ?alg, key_type = key.key_type().name(), "cache miss");
        let engine = Arc::new(build()?);
        let winner = match self.entries.entry(slot) {
            Entry::Occupied(entry) => Some(Arc::clone(entry.get())),
            Entry::Vacant(entry) => {
                entry.insert(Arc::clone(&engine));
                None
            }
        };
        match winner {
            Some(winner) => {
                engine.dispose();
                debug!(cache = self.name, ?alg, "lost publish race");
                Ok(winner)
            }
            None => Ok(engine),
        }
    }

    fn dispose(&self) {
        let mut gate = self.disposed.write().unwrap_or_else(PoisonError::into_inner);
        if *gate {
            return;
        }
        *gate = true;
        let count = self.entries.len();
        for entry in self.entries.iter() {
            entry.value().dispose();
        }
        self.entries.clear();
        debug!(cache = self.name, count, "disposed");
    }

    fn is_disposed(&self) -> bool {
        *self.disposed.read().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Builds and caches [`Signer`]s.
///
/// Signing and verification-only engines live in separate caches: a verifier built from a key
/// pair never needs its private half.
pub struct SignerFactory {
    options: CryptoOptions,
    signers: ProviderCache<SignatureAlgorithm, Signer>,
    verifiers: ProviderCache<SignatureAlgorithm, Signer>,
}

impl Default for SignerFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl SignerFactory {
    pub fn new() -> Self {
        Self::with_options(CryptoOptions::default())
    }

    pub fn with_options(options: CryptoOptions) -> Self {
        SignerFactory {
            options,
            signers: ProviderCache::new("signers"),
            verifiers: ProviderCache::new("verifiers"),
        }
    }

    /// Returns a signer for `key` and `alg`, or `None` if the key cannot serve the algorithm.
    pub fn create(
        &self,
        key: &Jwk,
        alg: SignatureAlgorithm,
        will_create_signatures: bool,
    ) -> Result<Option<Arc<Signer>>, Error> {
        let cache = if will_create_signatures {
            &self.signers
        } else {
            &self.verifiers
        };
        ensure!(!cache.is_disposed(), JWTError::DisposedAccess);
        if !key.supports_signature(alg) {
            return Ok(None);
        }
        cache
            .get_or_create(key, alg, || {
                Signer::with_options(key, alg, will_create_signatures, &self.options)
            })
            .map(Some)
    }

    pub fn dispose(&self) {
        self.signers.dispose();
        self.verifiers.dispose();
    }

    pub fn is_disposed(&self) -> bool {
        self.signers.is_disposed()
    }
}

/// Builds and caches [`AuthenticatedEncryptor`]s for symmetric keys.
pub struct AuthenticatedEncryptorFactory {
    options: CryptoOptions,
    encryptors: ProviderCache<EncryptionAlgorithm, AuthenticatedEncryptor>,
}

impl Default for AuthenticatedEncryptorFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthenticatedEncryptorFactory {
    pub fn new() -> Self {
        Self::with_options(CryptoOptions::default())
    }

    pub fn with_options(options: CryptoOptions) -> Self {
        AuthenticatedEncryptorFactory {
            options,
            encryptors: ProviderCache::new("encryptors"),
        }
    }

    /// Returns an encryptor for `key` and `enc`, or `None` if the key is not a symmetric key.
    pub fn create(
        &self,
        key: &Jwk,
        enc: EncryptionAlgorithm,
    ) -> Result<Option<Arc<AuthenticatedEncryptor>>, Error> {
        ensure!(!self.encryptors.is_disposed(), JWTError::DisposedAccess);
        let secret = match key {
            Jwk::Symmetric(secret) if key.supports_encryption(enc) => secret,
            _ => return Ok(None),
        };
        self.encryptors
            .get_or_create(key, enc, || {
                AuthenticatedEncryptor::with_options(secret.as_bytes(), enc, &self.options)
            })
            .map(Some)
    }

    pub fn dispose(&self) {
        self.encryptors.dispose();
    }

    pub fn is_disposed(&self) -> bool {
        self.encryptors.is_disposed()
    }
}

/// Builds and caches [`KeyWrapper`]s, keyed by the key management and content encryption
/// algorithm pair.
pub struct KeyWrapperFactory {
    options: CryptoOptions,
    wrappers: ProviderCache<(KeyManagementAlgorithm, EncryptionAlgorithm), KeyWrapper>,
}

impl Default for KeyWrapperFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyWrapperFactory {
    pub fn new() -> Self {
        Self::with_options(CryptoOptions::default())
    }

    pub fn with_options(options: CryptoOptions) -> Self {
        KeyWrapperFactory {
            options,
            wrappers: ProviderCache::new("key wrappers"),
        }
    }

    /// Returns a key wrapper for `key`, `alg` and `enc`, or `None` if the key cannot serve `alg`.
    pub fn create(
        &self,
        key: &Jwk,
        alg: KeyManagementAlgorithm,
        enc: EncryptionAlgorithm,
    ) -> Result<Option<Arc<KeyWrapper>>, Error> {
        ensure!(!self.wrappers.is_disposed(), JWTError::DisposedAccess);
        if !key.supports_key_management(alg) {
            return Ok(None);
        }
        self.wrappers
            .get_or_create(key, (alg, enc), || {
                KeyWrapper::with_options(key, alg, enc, &self.options)
            })
            .map(Some)
    }

    pub fn dispose(&self) {
        self.wrappers.dispose();
    }

    pub fn is_disposed(&self) -> bool {
        self.wrappers.is_disposed()
    }
}
