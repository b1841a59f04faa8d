//! AES-CBC with HMAC-SHA2 (RFC 7518, section 5.2).

use crate::aes::{AesBlockCipher, AesStrategy};
use crate::error::*;
use crate::hmac::KeyedHash;
use crate::jwa::HashAlgorithm;

pub(crate) struct CbcHmac {
    cipher: AesBlockCipher,
    mac: KeyedHash,
    tag_len: usize,
}

impl CbcHmac {
    /// The first half of `key` is the MAC key, the second half the encryption key.
    pub fn new(key: &[u8], hash: HashAlgorithm, strategy: AesStrategy) -> Result<Self, Error> {
        ensure!(
            !key.is_empty() && key.len() % 2 == 0,
            JWTError::InvalidKeySize
        );
        let (mac_key, enc_key) = key.split_at(key.len() / 2);
        Ok(CbcHmac {
            cipher: AesBlockCipher::with_strategy(enc_key, strategy)?,
            mac: KeyedHash::new(mac_key, hash)?,
            tag_len: mac_key.len(),
        })
    }

    pub fn tag_len(&self) -> usize {
        self.tag_len
    }

    fn tag(&self, iv: &[u8], aad: &[u8], ciphertext: &[u8]) -> Vec<u8> {
        let aad_bits = (aad.len() as u64).wrapping_mul(8).to_be_bytes();
        let mut tag = self.mac.compute_parts(&[aad, iv, ciphertext, &aad_bits]);
        tag.truncate(self.tag_len);
        tag
    }

    pub fn encrypt(
        &self,
        iv: &[u8],
        aad: &[u8],
        plaintext: &[u8],
    ) -> Result<(Vec<u8>, Vec<u8>), Error> {
        let ciphertext = self.cipher.encrypt_cbc(iv, plaintext)?;
        let tag = self.tag(iv, aad, &ciphertext);
        Ok((ciphertext, tag))
    }

    /// The tag is checked before anything is decrypted.
    pub fn decrypt(
        &self,
        iv: &[u8],
        aad: &[u8],
        ciphertext: &[u8],
        tag: &[u8],
    ) -> Result<Vec<u8>, Error> {
        let expected = self.tag(iv, aad, ciphertext);
        ensure!(
            tag.len() == self.tag_len && ct_codecs::verify(&expected, tag),
            JWTError::AuthenticationFailure
        );
        self.cipher
            .decrypt_cbc(iv, ciphertext)
            .map_err(|_| anyhow!(JWTError::AuthenticationFailure))
    }
}
