//! HMAC (RFC 2104) over SHA-256, SHA-384 and SHA-512.

use hmac_sha512::sha384 as hmac_sha384;
use zeroize::Zeroize;

use crate::error::*;
use crate::jwa::HashAlgorithm;

const MAX_BLOCK_SIZE: usize = 128;

enum Hasher {
    Sha256(hmac_sha256::Hash),
    Sha384(hmac_sha384::Hash),
    Sha512(hmac_sha512::Hash),
}

impl Hasher {
    fn new(hash: HashAlgorithm) -> Self {
        match hash {
            HashAlgorithm::Sha384 => Hasher::Sha384(hmac_sha384::Hash::new()),
            HashAlgorithm::Sha512 => Hasher::Sha512(hmac_sha512::Hash::new()),
            _ => Hasher::Sha256(hmac_sha256::Hash::new()),
        }
    }

    fn update(&mut self, data: &[u8]) {
        match self {
            Hasher::Sha256(h) => h.update(data),
            Hasher::Sha384(h) => h.update(data),
            Hasher::Sha512(h) => h.update(data),
        }
    }

    fn finalize(self) -> Vec<u8> {
        match self {
            Hasher::Sha256(h) => h.finalize().to_vec(),
            Hasher::Sha384(h) => h.finalize().to_vec(),
            Hasher::Sha512(h) => h.finalize().to_vec(),
        }
    }
}

fn block_size(hash: HashAlgorithm) -> usize {
    match hash {
        HashAlgorithm::Sha384 | HashAlgorithm::Sha512 => 128,
        _ => 64,
    }
}

/// HMAC with a precomputed key schedule.
///
/// The key blocks are derived once; every call hashes with its own local state, so a
/// `KeyedHash` can be shared between threads.
pub struct KeyedHash {
    hash: HashAlgorithm,
    inner_block: [u8; MAX_BLOCK_SIZE],
    outer_block: [u8; MAX_BLOCK_SIZE],
}

impl Drop for KeyedHash {
    fn drop(&mut self) {
        self.inner_block.zeroize();
        self.outer_block.zeroize();
    }
}

impl std::fmt::Debug for KeyedHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyedHash")
            .field("hash", &self.hash)
            .finish_non_exhaustive()
    }
}

impl KeyedHash {
    /// Supported hash functions are SHA-256, SHA-384 and SHA-512.
    pub fn new(key: &[u8], hash: HashAlgorithm) -> Result<Self, Error> {
        ensure!(
            hash != HashAlgorithm::Sha1,
            JWTError::UnsupportedAlgorithm("HMAC-SHA1".to_string())
        );
        let block_size = block_size(hash);
        let mut block = [0u8; MAX_BLOCK_SIZE];
        if key.len() > block_size {
            let mut h = Hasher::new(hash);
            h.update(key);
            let mut digest = h.finalize();
            block[..digest.len()].copy_from_slice(&digest);
            digest.zeroize();
        } else {
            block[..key.len()].copy_from_slice(key);
        }

        let mut inner_block = [0u8; MAX_BLOCK_SIZE];
        let mut outer_block = [0u8; MAX_BLOCK_SIZE];
        for i in 0..block_size {
            inner_block[i] = block[i] ^ 0x36;
            outer_block[i] = block[i] ^ 0x5c;
        }
        block.zeroize();

        Ok(KeyedHash {
            hash,
            inner_block,
            outer_block,
        })
    }

    pub fn hash_algorithm(&self) -> HashAlgorithm {
        self.hash
    }

    /// Tag size in bytes.
    pub fn output_size(&self) -> usize {
        self.hash.output_size()
    }

    /// Compute the tag of a message.
    pub fn compute(&self, message: &[u8]) -> Vec<u8> {
        self.compute_parts(&[message])
    }

    /// Compute the tag of the concatenation of `parts`.
    pub fn compute_parts(&self, parts: &[&[u8]]) -> Vec<u8> {
        let block_size = block_size(self.hash);
        let mut inner = Hasher::new(self.hash);
        inner.update(&self.inner_block[..block_size]);
        for part in parts {
            inner.update(part);
        }
        let inner_digest = inner.finalize();

        let mut outer = Hasher::new(self.hash);
        outer.update(&self.outer_block[..block_size]);
        outer.update(&inner_digest);
        outer.finalize()
    }

    /// Verify a tag in constant time. Truncated tags are accepted if they are at least
    /// half the hash output.
    pub fn verify(&self, message: &[u8], tag: &[u8]) -> bool {
        let expected = self.compute(message);
        tag.len() >= expected.len() / 2
            && tag.len() <= expected.len()
            && ct_codecs::verify(&expected[..tag.len()], tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    const LONG_KEY: [u8; 131] = [0xaa; 131];

    fn hmac256(key: &[u8], message: &[u8]) -> Vec<u8> {
        KeyedHash::new(key, HashAlgorithm::Sha256)
            .unwrap()
            .compute(message)
    }

    #[test]
    fn rfc4231_sha256() {
        assert_eq!(
            hmac256(&[0x0b; 20], b"Hi There"),
            hex!("b0344c61d8db38535ca8afceaf0bf12b881dc200c9833da726e9376c2e32cff7")
        );
        assert_eq!(
            hmac256(b"Jefe", b"what do ya want for nothing?"),
            hex!("5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843")
        );
        assert_eq!(
            hmac256(&[0xaa; 20], &[0xdd; 50]),
            hex!("773ea91e36800e46854db8ebd09181a72959098b3ef8c122d9635514ced565fe")
        );
        let key: Vec<u8> = (0x01..=0x19).collect();
        assert_eq!(
            hmac256(&key, &[0xcd; 50]),
            hex!("82558a389a443c0ea4cc819899f2083a85f0faa3e578f8077a2e3ff46729665b")
        );
        assert_eq!(
            hmac256(&[0x0c; 20], b"Test With Truncation")[..16],
            hex!("a3b6167473100ee06e0c796c2955552b")
        );
        assert_eq!(
            hmac256(
                &LONG_KEY,
                b"Test Using Larger Than Block-Size Key - Hash Key First"
            ),
            hex!("60e431591ee0b67f0d8a26aacbf5b77f8e0bc6213728c5140546040f0ee37f54")
        );
        assert_eq!(
            hmac256(
                &LONG_KEY,
                b"This is a test using a larger than block-size key and a larger than block-size \
                  data. The key needs to be hashed before being used by the HMAC algorithm."
            ),
            hex!("9b09ffa71b942fcb27635fbcd5b0e944bfdc63644f0713938a7f51535c3a35e2")
        );
    }

    #[test]
    fn rfc4231_sha384_sha512() {
        let h384 = |key: &[u8], msg: &[u8]| {
            KeyedHash::new(key, HashAlgorithm::Sha384)
                .unwrap()
                .compute(msg)
        };
        let h512 = |key: &[u8], msg: &[u8]| {
            KeyedHash::new(key, HashAlgorithm::Sha512)
                .unwrap()
                .compute(msg)
        };
        assert_eq!(
            h384(&[0x0b; 20], b"Hi There"),
            hex!("afd03944d84895626b0825f4ab46907f15f9dadbe4101ec682aa034c7cebc59cfaea9ea9076ede7f4af152e8b2fa9cb6")
        );
        assert_eq!(
            h384(b"Jefe", b"what do ya want for nothing?"),
            hex!("af45d2e376484031617f78d2b58a6b1b9c7ef464f5a01b47e42ec3736322445e8e2240ca5e69e2c78b3239ecfab21649")
        );
        assert_eq!(
            h384(&LONG_KEY, b"Test Using Larger Than Block-Size Key - Hash Key First"),
            hex!("4ece084485813e9088d2c63a041bc5b44f9ef1012a2b588f3cd11f05033ac4c60c2ef6ab4030fe8296248df163f44952")
        );
        assert_eq!(
            h512(&[0x0b; 20], b"Hi There"),
            hex!("87aa7cdea5ef619d4ff0b4241a1d6cb02379f4e2ce4ec2787ad0b30545e17cdedaa833b7d6b8a702038b274eaea3f4e4be9d914eeb61f1702e696c203a126854")
        );
        assert_eq!(
            h512(b"Jefe", b"what do ya want for nothing?"),
            hex!("164b7a7bfcf819e2e395fbe73b56e0a387bd64222e831fd610270cd7ea2505549758bf75c05a994a6d034f65f8f0e6fdcaeab1a34d4a6b4b636e070a38bce737")
        );
        assert_eq!(
            h512(&LONG_KEY, b"Test Using Larger Than Block-Size Key - Hash Key First"),
            hex!("80b24263c7c1a3ebb71493c1dd7be8b49b46d1f41b4aeec1121b013783f8f3526b56d037e05f2598bd0fd2215d6a1e5295e64f73f63f0aec8b915a985d786598")
        );
    }

    #[test]
    fn parts_and_verify() {
        let mac = KeyedHash::new(b"Jefe", HashAlgorithm::Sha256).unwrap();
        let tag = mac.compute(b"what do ya want for nothing?");
        assert_eq!(
            mac.compute_parts(&[b"what do ", b"", b"ya want for nothing?"]),
            tag
        );
        assert!(mac.verify(b"what do ya want for nothing?", &tag));
        assert!(mac.verify(b"what do ya want for nothing?", &tag[..16]));
        assert!(!mac.verify(b"what do ya want for nothing?", &tag[..8]));
        assert!(!mac.verify(b"what do ya want for nothing!", &tag));
        let mut bad = tag.clone();
        bad[31] ^= 1;
        assert!(!mac.verify(b"what do ya want for nothing?", &bad));
    }

    #[test]
    fn sha1_is_rejected() {
        assert!(KeyedHash::new(b"key", HashAlgorithm::Sha1).is_err());
    }
}
