//! Key encryption with AES-GCM (RFC 7518, section 4.7).

use crate::aead::gcm::GcmCipher;
use crate::common::random_bytes;
use crate::error::*;

use super::{KeyManagementHeader, CEK};

pub(crate) struct AesGcmKeyWrap {
    cipher: GcmCipher,
}

impl AesGcmKeyWrap {
    pub fn new(key: &[u8]) -> Result<Self, Error> {
        Ok(AesGcmKeyWrap {
            cipher: GcmCipher::new(key)?,
        })
    }

    /// Encrypts the CEK under a fresh IV and stores `iv` and `tag` in the header.
    pub fn wrap(&self, cek: &[u8], header: &mut KeyManagementHeader) -> Result<Vec<u8>, Error> {
        let iv = random_bytes(crate::aead::gcm::NONCE_SIZE);
        let (encrypted_key, tag) = self.cipher.encrypt(&iv, &[], cek)?;
        header.iv = Some(iv);
        header.tag = Some(tag);
        Ok(encrypted_key)
    }

    pub fn unwrap(
        &self,
        encrypted_key: &[u8],
        header: &KeyManagementHeader,
    ) -> Result<CEK, Error> {
        let (iv, tag) = match (&header.iv, &header.tag) {
            (Some(iv), Some(tag)) => (iv, tag),
            _ => bail!(JWTError::AuthenticationFailure),
        };
        self.cipher
            .decrypt(iv, &[], encrypted_key, tag)
            .map(CEK::new)
    }
}
