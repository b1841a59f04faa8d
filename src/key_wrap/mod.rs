//! Key management: how the content encryption key is produced, protected and recovered.

mod aes_kw;
#[cfg(feature = "gcm")]
mod aes_gcm_kw;
mod ecdh_es;
mod rsa;

use zeroize::Zeroize;

use crate::aes::{AesBlockCipher, AesStrategy};
use crate::common::{CryptoOptions, Disposable};
use crate::error::*;
use crate::jwa::{Algorithm, AlgorithmCategory, EncryptionAlgorithm, KeyManagementAlgorithm};
use crate::keys::{EcKeyParameters, Jwk, SymmetricKey};

#[cfg(feature = "gcm")]
use self::aes_gcm_kw::AesGcmKeyWrap;
use self::rsa::RsaKeyWrap;

/// A Content Encryption Key (CEK) that is zeroized on drop.
#[derive(Clone)]
pub struct CEK {
    key: Vec<u8>,
}

impl CEK {
    /// Create a new CEK from bytes.
    pub fn new(key: Vec<u8>) -> Self {
        CEK { key }
    }

    /// Get the key bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.key
    }
}

impl Drop for CEK {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}

impl AsRef<[u8]> for CEK {
    fn as_ref(&self) -> &[u8] {
        &self.key
    }
}

impl std::fmt::Debug for CEK {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CEK")
            .field("len", &self.key.len())
            .finish_non_exhaustive()
    }
}

/// Header parameters written by `wrap` and read by `unwrap`, as raw bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyManagementHeader {
    /// Ephemeral public key (ECDH-ES)
    pub epk: Option<EcKeyParameters>,
    /// Agreement PartyUInfo (ECDH-ES)
    pub apu: Option<Vec<u8>>,
    /// Agreement PartyVInfo (ECDH-ES)
    pub apv: Option<Vec<u8>>,
    /// Key encryption IV (AES-GCM key wrap)
    pub iv: Option<Vec<u8>>,
    /// Key encryption tag (AES-GCM key wrap)
    pub tag: Option<Vec<u8>>,
}

/// Output of `KeyWrapper::wrap`.
#[derive(Debug)]
pub struct WrappedKey {
    /// Key to encrypt the content with
    pub cek: CEK,
    /// Value of the JWE encrypted key field. Empty for `dir` and `ECDH-ES`.
    pub encrypted_key: Vec<u8>,
}

enum KeyWrapKind {
    Direct(SymmetricKey),
    AesKw(AesBlockCipher),
    #[cfg(feature = "gcm")]
    AesGcmKw(AesGcmKeyWrap),
    Rsa(RsaKeyWrap),
    EcdhEs {
        key: EcKeyParameters,
        strategy: AesStrategy,
    },
}

/// Key management bound to one key, one key management algorithm and one content
/// encryption algorithm.
pub struct KeyWrapper {
    alg: KeyManagementAlgorithm,
    enc: EncryptionAlgorithm,
    state: Disposable<KeyWrapKind>,
}

impl std::fmt::Debug for KeyWrapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyWrapper")
            .field("alg", &self.alg)
            .field("enc", &self.enc)
            .field("disposed", &self.is_disposed())
            .finish_non_exhaustive()
    }
}

fn unsupported(alg: KeyManagementAlgorithm, key: &Jwk) -> Error {
    anyhow!(JWTError::UnsupportedAlgorithm(format!(
        "{} with a {} key",
        alg.name(),
        key.key_type().name()
    )))
}

impl KeyWrapper {
    pub fn new(
        key: &Jwk,
        alg: KeyManagementAlgorithm,
        enc: EncryptionAlgorithm,
    ) -> Result<Self, Error> {
        Self::with_options(key, alg, enc, &CryptoOptions::default())
    }

    pub fn with_options(
        key: &Jwk,
        alg: KeyManagementAlgorithm,
        enc: EncryptionAlgorithm,
        options: &CryptoOptions,
    ) -> Result<Self, Error> {
        let kind = match (alg.category(), key) {
            (AlgorithmCategory::Direct, Jwk::Symmetric(k)) => {
                ensure!(
                    k.as_bytes().len() == enc.key_size(),
                    JWTError::InvalidKeySize
                );
                KeyWrapKind::Direct(k.clone())
            }
            (AlgorithmCategory::AesKeyWrap, Jwk::Symmetric(k)) => {
                ensure!(
                    Some(k.as_bytes().len()) == alg.wrap_key_size(),
                    JWTError::InvalidKeySize
                );
                KeyWrapKind::AesKw(AesBlockCipher::with_strategy(
                    k.as_bytes(),
                    options.aes_strategy(),
                )?)
            }
            (AlgorithmCategory::AesGcm, Jwk::Symmetric(k)) => {
                ensure!(
                    Some(k.as_bytes().len()) == alg.wrap_key_size(),
                    JWTError::InvalidKeySize
                );
                Self::aes_gcm_kw(k, alg)?
            }
            (AlgorithmCategory::Rsa, Jwk::Rsa(k)) => {
                ensure!(
                    k.key_size_bits() >= options.minimum_rsa_key_size_bits,
                    JWTError::InvalidKeySize
                );
                KeyWrapKind::Rsa(RsaKeyWrap::new(k, alg)?)
            }
            (AlgorithmCategory::EcdhEs, Jwk::Ec(k)) => KeyWrapKind::EcdhEs {
                key: k.clone(),
                strategy: options.aes_strategy(),
            },
            _ => return Err(unsupported(alg, key)),
        };
        Ok(KeyWrapper {
            alg,
            enc,
            state: Disposable::new(kind),
        })
    }

    #[cfg(feature = "gcm")]
    fn aes_gcm_kw(
        key: &SymmetricKey,
        _alg: KeyManagementAlgorithm,
    ) -> Result<KeyWrapKind, Error> {
        Ok(KeyWrapKind::AesGcmKw(AesGcmKeyWrap::new(key.as_bytes())?))
    }

    #[cfg(not(feature = "gcm"))]
    fn aes_gcm_kw(
        _key: &SymmetricKey,
        alg: KeyManagementAlgorithm,
    ) -> Result<KeyWrapKind, Error> {
        bail!(JWTError::UnsupportedAlgorithm(alg.name().to_string()))
    }

    pub fn algorithm(&self) -> KeyManagementAlgorithm {
        self.alg
    }

    pub fn encryption_algorithm(&self) -> EncryptionAlgorithm {
        self.enc
    }

    /// Uses the caller's CEK if there is one, or generates a new one.
    fn content_key(&self, static_cek: Option<&[u8]>) -> Result<CEK, Error> {
        match static_cek {
            Some(cek) => {
                ensure!(cek.len() == self.enc.key_size(), JWTError::InvalidKeySize);
                Ok(CEK::new(cek.to_vec()))
            }
            None => Ok(self.enc.generate_cek()),
        }
    }

    /// Produce the CEK and its encrypted form.
    ///
    /// `static_cek` is used instead of a random key when the algorithm transports the CEK.
    /// `dir` and `ECDH-ES` determine the CEK themselves and reject a supplied one. Header
    /// parameters the algorithm produces (`epk`, `iv`, `tag`) are written to `header`;
    /// `apu` and `apv` are read from it.
    pub fn wrap(
        &self,
        static_cek: Option<&[u8]>,
        header: &mut KeyManagementHeader,
    ) -> Result<WrappedKey, Error> {
        if self.alg.produces_empty_encrypted_key() {
            ensure!(static_cek.is_none(), JWTError::InvalidKeyWrapInput);
        }
        self.state.with(|kind| match kind {
            KeyWrapKind::Direct(key) => Ok(WrappedKey {
                cek: CEK::new(key.as_bytes().to_vec()),
                encrypted_key: vec![],
            }),
            KeyWrapKind::AesKw(kek) => {
                let cek = self.content_key(static_cek)?;
                let encrypted_key = aes_kw::wrap(kek, cek.as_bytes())?;
                Ok(WrappedKey { cek, encrypted_key })
            }
            #[cfg(feature = "gcm")]
            KeyWrapKind::AesGcmKw(kw) => {
                let cek = self.content_key(static_cek)?;
                let encrypted_key = kw.wrap(cek.as_bytes(), header)?;
                Ok(WrappedKey { cek, encrypted_key })
            }
            KeyWrapKind::Rsa(rsa) => {
                let cek = self.content_key(static_cek)?;
                let encrypted_key = rsa.encrypt(cek.as_bytes())?;
                Ok(WrappedKey { cek, encrypted_key })
            }
            KeyWrapKind::EcdhEs { key, strategy } => {
                let ephemeral = EcKeyParameters::generate(key.curve())?;
                let shared_secret = ecdh_es::shared_secret(&ephemeral, key)?;
                let apu = header.apu.as_deref();
                let apv = header.apv.as_deref();
                let wrapped = match self.alg.wrap_key_size() {
                    None => {
                        let cek = ecdh_es::concat_kdf(
                            &shared_secret,
                            self.enc.key_size(),
                            self.enc.name(),
                            apu,
                            apv,
                        );
                        WrappedKey {
                            cek: CEK::new(cek.to_vec()),
                            encrypted_key: vec![],
                        }
                    }
                    Some(kek_len) => {
                        let kek = ecdh_es::concat_kdf(
                            &shared_secret,
                            kek_len,
                            self.alg.name(),
                            apu,
                            apv,
                        );
                        let kek = AesBlockCipher::with_strategy(&kek, *strategy)?;
                        let cek = self.content_key(static_cek)?;
                        let encrypted_key = aes_kw::wrap(&kek, cek.as_bytes())?;
                        WrappedKey { cek, encrypted_key }
                    }
                };
                header.epk = Some(ephemeral.to_public());
                Ok(wrapped)
            }
        })
    }

    /// Recover the CEK from the encrypted key and the header parameters.
    ///
    /// Integrity failures, including a recovered key of the wrong size, are reported as
    /// `AuthenticationFailure`.
    pub fn unwrap(
        &self,
        encrypted_key: &[u8],
        header: &KeyManagementHeader,
    ) -> Result<CEK, Error> {
        if self.alg.produces_empty_encrypted_key() {
            ensure!(encrypted_key.is_empty(), JWTError::InvalidKeyWrapInput);
        }
        let cek = self.state.with(|kind| match kind {
            KeyWrapKind::Direct(key) => Ok(CEK::new(key.as_bytes().to_vec())),
            KeyWrapKind::AesKw(kek) => {
                aes_kw::unwrap(kek, encrypted_key).map(|cek| CEK::new(cek.to_vec()))
            }
            #[cfg(feature = "gcm")]
            KeyWrapKind::AesGcmKw(kw) => kw.unwrap(encrypted_key, header),
            KeyWrapKind::Rsa(rsa) => rsa.decrypt(encrypted_key),
            KeyWrapKind::EcdhEs { key, strategy } => {
                ensure!(key.has_private_key(), JWTError::MissingPrivateKey);
                let epk = header.epk.as_ref().ok_or(JWTError::MissingEphemeralKey)?;
                ensure!(epk.curve() == key.curve(), JWTError::InvalidEphemeralKey);
                let shared_secret = ecdh_es::shared_secret(key, epk)?;
                let apu = header.apu.as_deref();
                let apv = header.apv.as_deref();
                match self.alg.wrap_key_size() {
                    None => {
                        let cek = ecdh_es::concat_kdf(
                            &shared_secret,
                            self.enc.key_size(),
                            self.enc.name(),
                            apu,
                            apv,
                        );
                        Ok(CEK::new(cek.to_vec()))
                    }
                    Some(kek_len) => {
                        let kek = ecdh_es::concat_kdf(
                            &shared_secret,
                            kek_len,
                            self.alg.name(),
                            apu,
                            apv,
                        );
                        let kek = AesBlockCipher::with_strategy(&kek, *strategy)?;
                        aes_kw::unwrap(&kek, encrypted_key).map(|cek| CEK::new(cek.to_vec()))
                    }
                }
            }
        })?;
        ensure!(
            cek.as_bytes().len() == self.enc.key_size(),
            JWTError::AuthenticationFailure
        );
        Ok(cek)
    }

    /// Release the key. Later calls fail with `DisposedAccess`.
    pub fn dispose(&self) {
        self.state.dispose();
    }

    pub fn is_disposed(&self) -> bool {
        self.state.is_disposed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jwa::EllipticCurve;
    use crate::keys::pem::tests::{EC_P256_PRIVATE_KEY_PEM, RSA_PRIVATE_KEY_PEM};

    fn kind(err: &Error) -> Option<&JWTError> {
        JWTError::kind_of(err)
    }

    fn round_trip(key: &Jwk, alg: KeyManagementAlgorithm, enc: EncryptionAlgorithm) {
        let sender = KeyWrapper::new(&key.to_public(), alg, enc).unwrap();
        let recipient = KeyWrapper::new(key, alg, enc).unwrap();
        let mut header = KeyManagementHeader {
            apu: Some(b"Alice".to_vec()),
            apv: Some(b"Bob".to_vec()),
            ..Default::default()
        };
        let wrapped = sender.wrap(None, &mut header).unwrap();
        assert_eq!(wrapped.cek.as_bytes().len(), enc.key_size());
        assert_eq!(
            wrapped.encrypted_key.is_empty(),
            alg.produces_empty_encrypted_key()
        );
        let cek = recipient.unwrap(&wrapped.encrypted_key, &header).unwrap();
        assert_eq!(cek.as_bytes(), wrapped.cek.as_bytes());
    }

    #[test]
    fn direct() {
        let key = Jwk::symmetric(&[9u8; 32]).unwrap();
        let kw = KeyWrapper::new(&key, KeyManagementAlgorithm::Direct, EncryptionAlgorithm::A256GCM)
            .unwrap();
        let wrapped = kw.wrap(None, &mut KeyManagementHeader::default()).unwrap();
        assert_eq!(wrapped.cek.as_bytes(), &[9u8; 32]);
        assert!(wrapped.encrypted_key.is_empty());
        let err = kw
            .wrap(Some(&[1u8; 32][..]), &mut KeyManagementHeader::default())
            .unwrap_err();
        assert_eq!(kind(&err), Some(&JWTError::InvalidKeyWrapInput));

        let err = KeyWrapper::new(&key, KeyManagementAlgorithm::Direct, EncryptionAlgorithm::A128GCM)
            .unwrap_err();
        assert_eq!(kind(&err), Some(&JWTError::InvalidKeySize));
    }

    #[test]
    fn aes_key_wrap() {
        for (alg, size) in [
            (KeyManagementAlgorithm::A128KW, 16),
            (KeyManagementAlgorithm::A192KW, 24),
            (KeyManagementAlgorithm::A256KW, 32),
        ] {
            let key = Jwk::symmetric(&vec![0x42; size]).unwrap();
            for enc in EncryptionAlgorithm::ALL {
                round_trip(&key, alg, enc);
            }
            let err = KeyWrapper::new(
                &Jwk::symmetric(&vec![0x42; size + 8]).unwrap(),
                alg,
                EncryptionAlgorithm::A128GCM,
            )
            .unwrap_err();
            assert_eq!(kind(&err), Some(&JWTError::InvalidKeySize));
        }
    }

    #[test]
    fn aes_key_wrap_tampering() {
        let key = Jwk::symmetric(&[7u8; 16]).unwrap();
        let kw = KeyWrapper::new(&key, KeyManagementAlgorithm::A128KW, EncryptionAlgorithm::A128GCM)
            .unwrap();
        let cek = [3u8; 16];
        let mut header = KeyManagementHeader::default();
        let wrapped = kw.wrap(Some(&cek[..]), &mut header).unwrap();
        assert_eq!(wrapped.cek.as_bytes(), &cek);
        assert_eq!(wrapped.encrypted_key.len(), 24);
        for i in 0..wrapped.encrypted_key.len() {
            let mut tampered = wrapped.encrypted_key.clone();
            tampered[i] ^= 0x80;
            let err = kw.unwrap(&tampered, &header).unwrap_err();
            assert_eq!(kind(&err), Some(&JWTError::AuthenticationFailure));
        }
        let err = kw.wrap(Some(&[3u8; 24][..]), &mut header).unwrap_err();
        assert_eq!(kind(&err), Some(&JWTError::InvalidKeySize));
    }

    #[test]
    fn wrong_cek_size_after_unwrap() {
        let key = Jwk::symmetric(&[7u8; 16]).unwrap();
        let wrap_32 =
            KeyWrapper::new(&key, KeyManagementAlgorithm::A128KW, EncryptionAlgorithm::A256GCM)
                .unwrap();
        let unwrap_16 =
            KeyWrapper::new(&key, KeyManagementAlgorithm::A128KW, EncryptionAlgorithm::A128GCM)
                .unwrap();
        let mut header = KeyManagementHeader::default();
        let wrapped = wrap_32.wrap(None, &mut header).unwrap();
        let err = unwrap_16
            .unwrap(&wrapped.encrypted_key, &header)
            .unwrap_err();
        assert_eq!(kind(&err), Some(&JWTError::AuthenticationFailure));
    }

    #[cfg(feature = "gcm")]
    #[test]
    fn aes_gcm_key_wrap() {
        let key = Jwk::symmetric(&[5u8; 32]).unwrap();
        round_trip(
            &key,
            KeyManagementAlgorithm::A256GCMKW,
            EncryptionAlgorithm::A128CBC_HS256,
        );

        let kw = KeyWrapper::new(
            &key,
            KeyManagementAlgorithm::A256GCMKW,
            EncryptionAlgorithm::A256GCM,
        )
        .unwrap();
        let mut header = KeyManagementHeader::default();
        let wrapped = kw.wrap(None, &mut header).unwrap();
        assert_eq!(header.iv.as_ref().map(Vec::len), Some(12));
        assert_eq!(header.tag.as_ref().map(Vec::len), Some(16));

        let mut tampered = header.clone();
        if let Some(tag) = tampered.tag.as_mut() {
            tag[0] ^= 1;
        }
        let err = kw.unwrap(&wrapped.encrypted_key, &tampered).unwrap_err();
        assert_eq!(kind(&err), Some(&JWTError::AuthenticationFailure));

        let err = kw
            .unwrap(&wrapped.encrypted_key, &KeyManagementHeader::default())
            .unwrap_err();
        assert_eq!(kind(&err), Some(&JWTError::AuthenticationFailure));
    }

    #[test]
    fn rsa() {
        let key = Jwk::from_pem(RSA_PRIVATE_KEY_PEM).unwrap();
        for alg in [
            KeyManagementAlgorithm::RSA1_5,
            KeyManagementAlgorithm::RSA_OAEP,
            KeyManagementAlgorithm::RSA_OAEP_256,
        ] {
            round_trip(&key, alg, EncryptionAlgorithm::A256GCM);

            let kw = KeyWrapper::new(&key, alg, EncryptionAlgorithm::A128CBC_HS256).unwrap();
            let wrapped = kw.wrap(None, &mut KeyManagementHeader::default()).unwrap();
            assert_eq!(wrapped.encrypted_key.len(), 256);
            let mut tampered = wrapped.encrypted_key.clone();
            tampered[100] ^= 0x01;
            let err = kw
                .unwrap(&tampered, &KeyManagementHeader::default())
                .unwrap_err();
            assert_eq!(kind(&err), Some(&JWTError::AuthenticationFailure));
            let err = kw
                .unwrap(&wrapped.encrypted_key[1..], &KeyManagementHeader::default())
                .unwrap_err();
            assert_eq!(kind(&err), Some(&JWTError::AuthenticationFailure));
        }

        let public_only = KeyWrapper::new(
            &key.to_public(),
            KeyManagementAlgorithm::RSA_OAEP,
            EncryptionAlgorithm::A256GCM,
        )
        .unwrap();
        let err = public_only
            .unwrap(&[0u8; 256], &KeyManagementHeader::default())
            .unwrap_err();
        assert_eq!(kind(&err), Some(&JWTError::MissingPrivateKey));

        let strict = CryptoOptions {
            minimum_rsa_key_size_bits: 3072,
            ..Default::default()
        };
        let err = KeyWrapper::with_options(
            &key,
            KeyManagementAlgorithm::RSA_OAEP,
            EncryptionAlgorithm::A256GCM,
            &strict,
        )
        .unwrap_err();
        assert_eq!(kind(&err), Some(&JWTError::InvalidKeySize));
    }

    #[test]
    fn ecdh_es() {
        for curve in [EllipticCurve::P256, EllipticCurve::P384, EllipticCurve::P521] {
            let key = Jwk::Ec(EcKeyParameters::generate(curve).unwrap());
            for alg in [
                KeyManagementAlgorithm::ECDH_ES,
                KeyManagementAlgorithm::ECDH_ES_A128KW,
                KeyManagementAlgorithm::ECDH_ES_A192KW,
                KeyManagementAlgorithm::ECDH_ES_A256KW,
            ] {
                round_trip(&key, alg, EncryptionAlgorithm::A256CBC_HS512);
                round_trip(&key, alg, EncryptionAlgorithm::A128GCM);
            }
        }
    }

    #[test]
    fn ecdh_es_header_errors() {
        let key = Jwk::from_pem(EC_P256_PRIVATE_KEY_PEM).unwrap();
        let kw = KeyWrapper::new(
            &key,
            KeyManagementAlgorithm::ECDH_ES_A128KW,
            EncryptionAlgorithm::A128GCM,
        )
        .unwrap();
        let mut header = KeyManagementHeader::default();
        let wrapped = kw.wrap(None, &mut header).unwrap();
        assert_eq!(
            header.epk.as_ref().map(EcKeyParameters::curve),
            Some(EllipticCurve::P256)
        );
        assert!(!header.epk.as_ref().is_some_and(EcKeyParameters::has_private_key));

        let err = kw
            .unwrap(&wrapped.encrypted_key, &KeyManagementHeader::default())
            .unwrap_err();
        assert_eq!(kind(&err), Some(&JWTError::MissingEphemeralKey));

        let other_curve = KeyManagementHeader {
            epk: Some(
                EcKeyParameters::generate(EllipticCurve::P384)
                    .unwrap()
                    .to_public(),
            ),
            ..Default::default()
        };
        let err = kw.unwrap(&wrapped.encrypted_key, &other_curve).unwrap_err();
        assert_eq!(kind(&err), Some(&JWTError::InvalidEphemeralKey));

        let mut wrong_apu = header.clone();
        wrong_apu.apu = Some(b"Mallory".to_vec());
        let err = kw.unwrap(&wrapped.encrypted_key, &wrong_apu).unwrap_err();
        assert_eq!(kind(&err), Some(&JWTError::AuthenticationFailure));

        let direct = KeyWrapper::new(
            &key,
            KeyManagementAlgorithm::ECDH_ES,
            EncryptionAlgorithm::A128GCM,
        )
        .unwrap();
        let err = direct.unwrap(&[1, 2, 3], &header).unwrap_err();
        assert_eq!(kind(&err), Some(&JWTError::InvalidKeyWrapInput));
    }

    #[test]
    fn key_type_mismatch() {
        let key = Jwk::symmetric(&[0u8; 16]).unwrap();
        let err = KeyWrapper::new(&key, KeyManagementAlgorithm::RSA_OAEP, EncryptionAlgorithm::A128GCM)
            .unwrap_err();
        assert!(matches!(kind(&err), Some(JWTError::UnsupportedAlgorithm(_))));
    }

    #[test]
    fn dispose() {
        let key = Jwk::symmetric(&[0u8; 16]).unwrap();
        let kw = KeyWrapper::new(&key, KeyManagementAlgorithm::A128KW, EncryptionAlgorithm::A128GCM)
            .unwrap();
        kw.dispose();
        assert!(kw.is_disposed());
        let err = kw.wrap(None, &mut KeyManagementHeader::default()).unwrap_err();
        assert_eq!(kind(&err), Some(&JWTError::DisposedAccess));
    }
}
