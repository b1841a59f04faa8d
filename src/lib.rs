//! Cryptographic core for JSON Web Tokens.
//!
//! Signers (HS*, RS*, PS*, ES*), content encryption (AES-CBC-HMAC, AES-GCM), key management
//! (`dir`, AES-KW, AES-GCM-KW, RSA, ECDH-ES) and the caching factories that build and dispose
//! them. Token serialization is left to the caller.

#![forbid(unsafe_code)]

pub mod aead;
pub mod aes;
pub mod common;
pub mod error;
pub mod factory;
pub mod hmac;
pub mod jwa;
pub mod key_wrap;
pub mod keys;
pub mod signer;

pub mod prelude {
    pub use crate::aead::AuthenticatedEncryptor;
    pub use crate::aes::{AesBlockCipher, AesStrategy};
    pub use crate::common::*;
    pub use crate::error::{Error, JWTError};
    pub use crate::factory::{AuthenticatedEncryptorFactory, KeyWrapperFactory, SignerFactory};
    pub use crate::hmac::KeyedHash;
    pub use crate::jwa::*;
    pub use crate::key_wrap::{KeyManagementHeader, KeyWrapper, WrappedKey, CEK};
    pub use crate::keys::{
        EcKeyParameters, Jwk, KeyIdentity, KeyType, RsaKeyParameters, SymmetricKey,
    };
    pub use crate::signer::Signer;
}

#[cfg(test)]
mod tests {
    use crate::keys::pem::tests::{EC_P256_PRIVATE_KEY_PEM, RSA_PRIVATE_KEY_PEM};
    use crate::prelude::*;

    const PROTECTED_HEADER: &[u8] = b"eyJhbGciOiJBMjU2S1ciLCJlbmMiOiJBMjU2R0NNIn0";

    fn encrypt_then_decrypt(key: &Jwk, alg: KeyManagementAlgorithm, enc: EncryptionAlgorithm) {
        let wrappers = KeyWrapperFactory::new();
        let encryptors = AuthenticatedEncryptorFactory::new();

        let mut header = KeyManagementHeader {
            apu: Some(b"Alice".to_vec()),
            apv: Some(b"Bob".to_vec()),
            ..Default::default()
        };
        let sender = wrappers.create(key, alg, enc).unwrap().unwrap();
        let wrapped = sender.wrap(None, &mut header).unwrap();
        let cek = Jwk::symmetric(wrapped.cek.as_bytes()).unwrap();
        let encryptor = encryptors.create(&cek, enc).unwrap().unwrap();
        let nonce = encryptor.generate_nonce();
        let plaintext = b"The true sign of intelligence is not knowledge but imagination.";
        let (ciphertext, tag) = encryptor
            .encrypt(&nonce, PROTECTED_HEADER, plaintext)
            .unwrap();

        let recipient = wrappers.create(key, alg, enc).unwrap().unwrap();
        let cek = recipient.unwrap(&wrapped.encrypted_key, &header).unwrap();
        let cek = Jwk::symmetric(cek.as_bytes()).unwrap();
        let decryptor = encryptors.create(&cek, enc).unwrap().unwrap();
        let decrypted = decryptor
            .decrypt(&nonce, PROTECTED_HEADER, &ciphertext, &tag)
            .unwrap();
        assert_eq!(decrypted, plaintext);

        let err = decryptor
            .decrypt(&nonce, b"eyJhbGciOiJkaXIifQ", &ciphertext, &tag)
            .unwrap_err();
        assert_eq!(
            JWTError::kind_of(&err),
            Some(&JWTError::AuthenticationFailure)
        );

        wrappers.dispose();
        encryptors.dispose();
        assert!(sender.is_disposed());
        assert!(decryptor.is_disposed());
    }

    #[test]
    fn aes_key_wrap_with_gcm() {
        let key = Jwk::Symmetric(SymmetricKey::generate(256).unwrap());
        encrypt_then_decrypt(
            &key,
            KeyManagementAlgorithm::A256KW,
            EncryptionAlgorithm::A256GCM,
        );
    }

    #[test]
    fn direct_with_cbc_hmac() {
        let key = Jwk::Symmetric(SymmetricKey::generate(512).unwrap());
        encrypt_then_decrypt(
            &key,
            KeyManagementAlgorithm::Direct,
            EncryptionAlgorithm::A256CBC_HS512,
        );
    }

    #[test]
    fn rsa_oaep_with_cbc_hmac() {
        let key = Jwk::from_pem(RSA_PRIVATE_KEY_PEM).unwrap();
        encrypt_then_decrypt(
            &key,
            KeyManagementAlgorithm::RSA_OAEP_256,
            EncryptionAlgorithm::A128CBC_HS256,
        );
    }

    #[test]
    fn ecdh_es() {
        let key = Jwk::from_pem(EC_P256_PRIVATE_KEY_PEM).unwrap();
        encrypt_then_decrypt(
            &key,
            KeyManagementAlgorithm::ECDH_ES,
            EncryptionAlgorithm::A128GCM,
        );
        encrypt_then_decrypt(
            &key,
            KeyManagementAlgorithm::ECDH_ES_A192KW,
            EncryptionAlgorithm::A192CBC_HS384,
        );
    }

    #[test]
    fn sign_with_pem_keys() {
        let factory = SignerFactory::new();
        let signing_input = b"eyJhbGciOiJFUzI1NiJ9.eyJpc3MiOiJqb2UifQ";
        for (pem, alg) in [
            (RSA_PRIVATE_KEY_PEM, SignatureAlgorithm::PS384),
            (EC_P256_PRIVATE_KEY_PEM, SignatureAlgorithm::ES256),
        ] {
            let key_pair = Jwk::from_pem(pem).unwrap();
            let signer = factory.create(&key_pair, alg, true).unwrap().unwrap();
            let signature = signer.sign(signing_input).unwrap();

            let public_key = key_pair.to_public();
            let verifier = factory.create(&public_key, alg, false).unwrap().unwrap();
            assert!(verifier.verify(signing_input, &signature).unwrap());
        }
    }

    #[test]
    fn options_from_json() {
        let options = CryptoOptions::from_json(
            r#"{"minimum_rsa_key_size_bits": 3072, "aes_strategy": "portable"}"#,
        )
        .unwrap();
        assert_eq!(options.minimum_rsa_key_size_bits, 3072);
        assert_eq!(options.aes_strategy, Some(AesStrategy::Portable));

        let factory = SignerFactory::with_options(options);
        let key = Jwk::from_pem(RSA_PRIVATE_KEY_PEM).unwrap();
        let err = factory
            .create(&key, SignatureAlgorithm::RS256, false)
            .unwrap_err();
        assert_eq!(JWTError::kind_of(&err), Some(&JWTError::InvalidKeySize));
    }
}
