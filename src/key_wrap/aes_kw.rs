//! AES Key Wrap (RFC 3394).

use zeroize::Zeroizing;

use crate::aes::AesBlockCipher;
use crate::error::*;

const DEFAULT_IV: [u8; 8] = [0xa6; 8];

/// Wrap `key` under `kek`. The output is 8 bytes longer than the input.
pub(crate) fn wrap(kek: &AesBlockCipher, key: &[u8]) -> Result<Vec<u8>, Error> {
    ensure!(
        key.len() >= 16 && key.len() % 8 == 0,
        JWTError::InvalidKeyWrapInput
    );
    let n = key.len() / 8;
    let mut a = DEFAULT_IV;
    let mut r = Zeroizing::new(key.to_vec());
    let mut block = Zeroizing::new([0u8; 16]);

    for j in 0..6 {
        for (i, ri) in r.chunks_exact_mut(8).enumerate() {
            block[..8].copy_from_slice(&a);
            block[8..].copy_from_slice(ri);
            kek.encrypt_block(&mut block);
            let t = (n * j + i + 1) as u64;
            for (ak, (bk, tk)) in a.iter_mut().zip(block[..8].iter().zip(t.to_be_bytes())) {
                *ak = bk ^ tk;
            }
            ri.copy_from_slice(&block[8..]);
        }
    }

    let mut wrapped = Vec::with_capacity(key.len() + 8);
    wrapped.extend_from_slice(&a);
    wrapped.extend_from_slice(&r);
    Ok(wrapped)
}

/// Unwrap a key wrapped with `wrap`.
///
/// Any malformed input or integrity check mismatch is an `AuthenticationFailure`.
pub(crate) fn unwrap(kek: &AesBlockCipher, wrapped: &[u8]) -> Result<Zeroizing<Vec<u8>>, Error> {
    ensure!(
        wrapped.len() >= 24 && wrapped.len() % 8 == 0,
        JWTError::AuthenticationFailure
    );
    let n = wrapped.len() / 8 - 1;
    let mut a = [0u8; 8];
    a.copy_from_slice(&wrapped[..8]);
    let mut r = Zeroizing::new(wrapped[8..].to_vec());
    let mut block = Zeroizing::new([0u8; 16]);

    for j in (0..6).rev() {
        for (i, ri) in r.chunks_exact_mut(8).enumerate().rev() {
            let t = (n * j + i + 1) as u64;
            for (bk, (ak, tk)) in block[..8].iter_mut().zip(a.iter().zip(t.to_be_bytes())) {
                *bk = ak ^ tk;
            }
            block[8..].copy_from_slice(ri);
            kek.decrypt_block(&mut block);
            a.copy_from_slice(&block[..8]);
            ri.copy_from_slice(&block[8..]);
        }
    }

    ensure!(
        ct_codecs::verify(&a, &DEFAULT_IV),
        JWTError::AuthenticationFailure
    );
    Ok(r)
}
