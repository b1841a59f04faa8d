//! RSA key encryption: RSA1_5, RSA-OAEP and RSA-OAEP-256.

use rand::thread_rng;
use rsa::{Oaep, Pkcs1v15Encrypt, RsaPrivateKey, RsaPublicKey};

use super::CEK;
use crate::error::*;
use crate::jwa::KeyManagementAlgorithm;
use crate::keys::RsaKeyParameters;

pub(crate) struct RsaKeyWrap {
    alg: KeyManagementAlgorithm,
    public_key: RsaPublicKey,
    private_key: Option<RsaPrivateKey>,
}

impl RsaKeyWrap {
    pub fn new(key: &RsaKeyParameters, alg: KeyManagementAlgorithm) -> Result<Self, Error> {
        ensure!(
            matches!(
                alg,
                KeyManagementAlgorithm::RSA1_5
                    | KeyManagementAlgorithm::RSA_OAEP
                    | KeyManagementAlgorithm::RSA_OAEP_256
            ),
            JWTError::UnsupportedAlgorithm(format!("{:?}", alg))
        );
        let private_key = if key.has_private_key() {
            Some(key.to_rsa_private_key()?)
        } else {
            None
        };
        Ok(RsaKeyWrap {
            alg,
            public_key: key.to_rsa_public_key()?,
            private_key,
        })
    }

    pub fn encrypt(&self, cek: &[u8]) -> Result<Vec<u8>, Error> {
        let mut rng = thread_rng();
        let res = match self.alg {
            KeyManagementAlgorithm::RSA_OAEP => {
                self.public_key
                    .encrypt(&mut rng, Oaep::new::<sha1::Sha1>(), cek)
            }
            KeyManagementAlgorithm::RSA_OAEP_256 => {
                self.public_key
                    .encrypt(&mut rng, Oaep::new::<sha2::Sha256>(), cek)
            }
            _ => self.public_key.encrypt(&mut rng, Pkcs1v15Encrypt, cek),
        };
        res.map_err(|e| anyhow!(JWTError::InternalError(e.to_string())))
    }

    /// Decryption with blinding. Every failure is the same `AuthenticationFailure`.
    pub fn decrypt(&self, encrypted_key: &[u8]) -> Result<CEK, Error> {
        let private_key = self
            .private_key
            .as_ref()
            .ok_or(JWTError::MissingPrivateKey)?;
        let mut rng = thread_rng();
        let res = match self.alg {
            KeyManagementAlgorithm::RSA_OAEP => {
                private_key.decrypt_blinded(&mut rng, Oaep::new::<sha1::Sha1>(), encrypted_key)
            }
            KeyManagementAlgorithm::RSA_OAEP_256 => {
                private_key.decrypt_blinded(&mut rng, Oaep::new::<sha2::Sha256>(), encrypted_key)
            }
            _ => private_key.decrypt_blinded(&mut rng, Pkcs1v15Encrypt, encrypted_key),
        };
        res.map(CEK::new)
            .map_err(|_| anyhow!(JWTError::AuthenticationFailure))
    }
}
