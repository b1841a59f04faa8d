//! AES-GCM through the `aes-gcm` crate.

use aes_gcm::aead::consts::U12;
use aes_gcm::aead::generic_array::GenericArray;
use aes_gcm::aead::{AeadInPlace, KeyInit};
use aes_gcm::aes::Aes192;
use aes_gcm::{Aes128Gcm, Aes256Gcm, AesGcm};

use crate::error::*;

pub(crate) const NONCE_SIZE: usize = 12;
pub(crate) const TAG_SIZE: usize = 16;

type Aes192Gcm = AesGcm<Aes192, U12>;

pub(crate) enum GcmCipher {
    Aes128(Box<Aes128Gcm>),
    Aes192(Box<Aes192Gcm>),
    Aes256(Box<Aes256Gcm>),
}

fn seal<C: AeadInPlace>(
    cipher: &C,
    nonce: &[u8],
    aad: &[u8],
    plaintext: &[u8],
) -> Result<(Vec<u8>, Vec<u8>), Error> {
    let mut buffer = plaintext.to_vec();
    let tag = cipher
        .encrypt_in_place_detached(GenericArray::from_slice(nonce), aad, &mut buffer)
        .map_err(|_| JWTError::InternalError("AES-GCM encryption failed".to_string()))?;
    Ok((buffer, tag.to_vec()))
}

fn open<C: AeadInPlace>(
    cipher: &C,
    nonce: &[u8],
    aad: &[u8],
    ciphertext: &[u8],
    tag: &[u8],
) -> Result<Vec<u8>, Error> {
    let mut buffer = ciphertext.to_vec();
    cipher
        .decrypt_in_place_detached(
            GenericArray::from_slice(nonce),
            aad,
            &mut buffer,
            GenericArray::from_slice(tag),
        )
        .map_err(|_| JWTError::AuthenticationFailure)?;
    Ok(buffer)
}

impl GcmCipher {
    pub fn new(key: &[u8]) -> Result<Self, Error> {
        let invalid = |_| JWTError::InvalidKeySize;
        Ok(match key.len() {
            16 => GcmCipher::Aes128(Box::new(Aes128Gcm::new_from_slice(key).map_err(invalid)?)),
            24 => GcmCipher::Aes192(Box::new(Aes192Gcm::new_from_slice(key).map_err(invalid)?)),
            32 => GcmCipher::Aes256(Box::new(Aes256Gcm::new_from_slice(key).map_err(invalid)?)),
            _ => bail!(JWTError::InvalidKeySize),
        })
    }

    pub fn encrypt(
        &self,
        nonce: &[u8],
        aad: &[u8],
        plaintext: &[u8],
    ) -> Result<(Vec<u8>, Vec<u8>), Error> {
        ensure!(nonce.len() == NONCE_SIZE, JWTError::InvalidNonce);
        match self {
            GcmCipher::Aes128(c) => seal(c.as_ref(), nonce, aad, plaintext),
            GcmCipher::Aes192(c) => seal(c.as_ref(), nonce, aad, plaintext),
            GcmCipher::Aes256(c) => seal(c.as_ref(), nonce, aad, plaintext),
        }
    }

    pub fn decrypt(
        &self,
        nonce: &[u8],
        aad: &[u8],
        ciphertext: &[u8],
        tag: &[u8],
    ) -> Result<Vec<u8>, Error> {
        ensure!(
            nonce.len() == NONCE_SIZE && tag.len() == TAG_SIZE,
            JWTError::AuthenticationFailure
        );
        match self {
            GcmCipher::Aes128(c) => open(c.as_ref(), nonce, aad, ciphertext, tag),
            GcmCipher::Aes192(c) => open(c.as_ref(), nonce, aad, ciphertext, tag),
            GcmCipher::Aes256(c) => open(c.as_ref(), nonce, aad, ciphertext, tag),
        }
    }
}
