use super::{AesBlockCipher, BLOCK_SIZE};
use crate::error::*;

/// `0xff` if `a < b`, `0x00` otherwise.
#[inline(always)]
fn ct_lt(a: u8, b: u8) -> u8 {
    ((a as u16).wrapping_sub(b as u16) >> 8) as u8
}

/// `0xff` if `a == b`, `0x00` otherwise.
#[inline(always)]
fn ct_eq(a: u8, b: u8) -> u8 {
    ct_lt(a ^ b, 1)
}

/// Checks PKCS#7 padding of the final block and returns the pad length.
///
/// All 16 bytes are examined whatever the pad value is.
fn padding_len(last_block: &[u8; BLOCK_SIZE]) -> Result<usize, Error> {
    let pad = last_block[BLOCK_SIZE - 1];
    let mut good = !ct_eq(pad, 0) & ct_lt(pad, BLOCK_SIZE as u8 + 1);
    for (i, &b) in last_block.iter().enumerate() {
        let distance_from_end = (BLOCK_SIZE - 1 - i) as u8;
        let in_padding = ct_lt(distance_from_end, pad);
        good &= !in_padding | ct_eq(b, pad);
    }
    ensure!(good == 0xff, JWTError::AuthenticationFailure);
    Ok(pad as usize)
}

impl AesBlockCipher {
    /// CBC encryption with PKCS#7 padding. A full block of padding is added when the
    /// plaintext length is a multiple of the block size.
    pub fn encrypt_cbc(&self, iv: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, Error> {
        let mut chain: [u8; BLOCK_SIZE] = iv.try_into().map_err(|_| JWTError::InvalidNonce)?;
        let pad = BLOCK_SIZE - plaintext.len() % BLOCK_SIZE;
        let mut ciphertext = Vec::with_capacity(plaintext.len() + pad);
        ciphertext.extend_from_slice(plaintext);
        ciphertext.resize(plaintext.len() + pad, pad as u8);

        for block in ciphertext.chunks_exact_mut(BLOCK_SIZE) {
            for (c, b) in chain.iter_mut().zip(block.iter()) {
                *c ^= b;
            }
            self.encrypt_block(&mut chain);
            block.copy_from_slice(&chain);
        }
        Ok(ciphertext)
    }

    /// CBC decryption followed by PKCS#7 padding removal.
    ///
    /// Bad lengths and bad padding are both reported as `AuthenticationFailure`.
    pub fn decrypt_cbc(&self, iv: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, Error> {
        let mut chain: [u8; BLOCK_SIZE] = iv.try_into().map_err(|_| JWTError::InvalidNonce)?;
        ensure!(
            !ciphertext.is_empty() && ciphertext.len() % BLOCK_SIZE == 0,
            JWTError::AuthenticationFailure
        );

        let mut plaintext = ciphertext.to_vec();
        let mut block = [0u8; BLOCK_SIZE];
        for chunk in plaintext.chunks_exact_mut(BLOCK_SIZE) {
            block.copy_from_slice(chunk);
            let next_chain = block;
            self.decrypt_block(&mut block);
            for ((p, b), c) in chunk.iter_mut().zip(block.iter()).zip(chain.iter()) {
                *p = b ^ c;
            }
            chain = next_chain;
        }

        block.copy_from_slice(&plaintext[plaintext.len() - BLOCK_SIZE..]);
        let pad = padding_len(&block)?;
        plaintext.truncate(plaintext.len() - pad);
        Ok(plaintext)
    }
}
