//! AES through the `aes` crate, which uses AES-NI or the ARMv8 crypto extensions when present.

use aes::cipher::{BlockDecrypt, BlockEncrypt, KeyInit};
use aes::{Aes128, Aes192, Aes256, Block};

use crate::error::*;

/// Expanded AES key. The `aes` crate zeroes its round keys on drop.
#[derive(Clone)]
pub enum AcceleratedAes {
    Aes128(Aes128),
    Aes192(Aes192),
    Aes256(Aes256),
}

impl AcceleratedAes {
    pub fn new(key: &[u8]) -> Result<Self, Error> {
        let invalid = |_| JWTError::InvalidKeySize;
        Ok(match key.len() {
            16 => AcceleratedAes::Aes128(Aes128::new_from_slice(key).map_err(invalid)?),
            24 => AcceleratedAes::Aes192(Aes192::new_from_slice(key).map_err(invalid)?),
            32 => AcceleratedAes::Aes256(Aes256::new_from_slice(key).map_err(invalid)?),
            _ => bail!(JWTError::InvalidKeySize),
        })
    }

    pub fn key_size(&self) -> usize {
        match self {
            AcceleratedAes::Aes128(_) => 16,
            AcceleratedAes::Aes192(_) => 24,
            AcceleratedAes::Aes256(_) => 32,
        }
    }

    pub fn encrypt_block(&self, block: &mut [u8; 16]) {
        let block = Block::from_mut_slice(block);
        match self {
            AcceleratedAes::Aes128(cipher) => cipher.encrypt_block(block),
            AcceleratedAes::Aes192(cipher) => cipher.encrypt_block(block),
            AcceleratedAes::Aes256(cipher) => cipher.encrypt_block(block),
        }
    }

    pub fn decrypt_block(&self, block: &mut [u8; 16]) {
        let block = Block::from_mut_slice(block);
        match self {
            AcceleratedAes::Aes128(cipher) => cipher.decrypt_block(block),
            AcceleratedAes::Aes192(cipher) => cipher.decrypt_block(block),
            AcceleratedAes::Aes256(cipher) => cipher.decrypt_block(block),
        }
    }
}
