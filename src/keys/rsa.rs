use rsa::traits::{PrivateKeyParts, PublicKeyParts};
use rsa::{BigUint, RsaPrivateKey, RsaPublicKey};
use zeroize::Zeroize;

use crate::error::*;

/// Largest modulus accepted for public-key operations.
const MAX_PUBLIC_MODULUS_BITS: usize = 16384;

/// Private components of an RSA key, as big-endian unsigned integers.
#[derive(Clone)]
pub struct RsaPrivateParameters {
    pub d: Vec<u8>,
    pub p: Vec<u8>,
    pub q: Vec<u8>,
    pub dp: Vec<u8>,
    pub dq: Vec<u8>,
    pub qi: Vec<u8>,
}

impl Drop for RsaPrivateParameters {
    fn drop(&mut self) {
        self.d.zeroize();
        self.p.zeroize();
        self.q.zeroize();
        self.dp.zeroize();
        self.dq.zeroize();
        self.qi.zeroize();
    }
}

/// RSA key: modulus, public exponent and optional private components.
#[derive(Clone)]
pub struct RsaKeyParameters {
    n: Vec<u8>,
    e: Vec<u8>,
    private: Option<RsaPrivateParameters>,
}

impl std::fmt::Debug for RsaKeyParameters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RsaKeyParameters")
            .field("key_size_bits", &self.key_size_bits())
            .field("has_private_key", &self.has_private_key())
            .finish_non_exhaustive()
    }
}

fn strip_leading_zeros(bytes: &[u8]) -> Vec<u8> {
    let start = bytes
        .iter()
        .position(|&b| b != 0)
        .unwrap_or(bytes.len().saturating_sub(1));
    bytes[start..].to_vec()
}

impl RsaKeyParameters {
    pub fn from_public_components(n: &[u8], e: &[u8]) -> Result<Self, Error> {
        let n = strip_leading_zeros(n);
        ensure!(
            !n.is_empty() && n != [0] && !e.is_empty(),
            JWTError::InvalidPublicKey
        );
        Ok(RsaKeyParameters {
            n,
            e: e.to_vec(),
            private: None,
        })
    }

    #[allow(clippy::too_many_arguments)]
    pub fn from_private_components(
        n: &[u8],
        e: &[u8],
        d: &[u8],
        p: &[u8],
        q: &[u8],
        dp: &[u8],
        dq: &[u8],
        qi: &[u8],
    ) -> Result<Self, Error> {
        let mut key = Self::from_public_components(n, e)?;
        key.private = Some(RsaPrivateParameters {
            d: strip_leading_zeros(d),
            p: strip_leading_zeros(p),
            q: strip_leading_zeros(q),
            dp: strip_leading_zeros(dp),
            dq: strip_leading_zeros(dq),
            qi: strip_leading_zeros(qi),
        });
        Ok(key)
    }

    /// Generate a new key pair. `bits` must be 2048, 3072 or 4096.
    pub fn generate(bits: usize) -> Result<Self, Error> {
        ensure!(
            matches!(bits, 2048 | 3072 | 4096),
            JWTError::InvalidKeySize
        );
        let sk = RsaPrivateKey::new(&mut rand::thread_rng(), bits)
            .map_err(|e| JWTError::InternalError(e.to_string()))?;
        Self::from_rsa_private_key(&sk)
    }

    pub(crate) fn from_rsa_private_key(sk: &RsaPrivateKey) -> Result<Self, Error> {
        let primes = sk.primes();
        ensure!(primes.len() == 2, JWTError::UnsupportedAlgorithm("multi-prime RSA".into()));
        let missing = || JWTError::InternalError("missing CRT parameters".into());
        let dp = sk.dp().ok_or_else(missing)?;
        let dq = sk.dq().ok_or_else(missing)?;
        let qi = sk.crt_coefficient().ok_or_else(missing)?;
        Self::from_private_components(
            &sk.n().to_bytes_be(),
            &sk.e().to_bytes_be(),
            &sk.d().to_bytes_be(),
            &primes[0].to_bytes_be(),
            &primes[1].to_bytes_be(),
            &dp.to_bytes_be(),
            &dq.to_bytes_be(),
            &qi.to_bytes_be(),
        )
    }

    pub fn n(&self) -> &[u8] {
        &self.n
    }

    pub fn e(&self) -> &[u8] {
        &self.e
    }

    pub fn private(&self) -> Option<&RsaPrivateParameters> {
        self.private.as_ref()
    }

    pub fn has_private_key(&self) -> bool {
        self.private.is_some()
    }

    /// Size of the modulus in bits.
    pub fn key_size_bits(&self) -> usize {
        match self.n.first() {
            Some(&msb) => self.n.len() * 8 - msb.leading_zeros() as usize,
            None => 0,
        }
    }

    /// Same key without its private components.
    pub fn to_public(&self) -> Self {
        RsaKeyParameters {
            n: self.n.clone(),
            e: self.e.clone(),
            private: None,
        }
    }

    pub(crate) fn to_rsa_public_key(&self) -> Result<RsaPublicKey, Error> {
        RsaPublicKey::new_with_max_size(
            BigUint::from_bytes_be(&self.n),
            BigUint::from_bytes_be(&self.e),
            MAX_PUBLIC_MODULUS_BITS,
        )
        .map_err(|_| anyhow!(JWTError::InvalidPublicKey))
    }

    pub(crate) fn to_rsa_private_key(&self) -> Result<RsaPrivateKey, Error> {
        let private = self.private.as_ref().ok_or(JWTError::MissingPrivateKey)?;
        RsaPrivateKey::from_components(
            BigUint::from_bytes_be(&self.n),
            BigUint::from_bytes_be(&self.e),
            BigUint::from_bytes_be(&private.d),
            vec![
                BigUint::from_bytes_be(&private.p),
                BigUint::from_bytes_be(&private.q),
            ],
        )
        .map_err(|_| anyhow!(JWTError::MalformedKeyEncoding))
    }

    pub(crate) fn components(&self) -> Vec<&[u8]> {
        let mut components = vec![self.n.as_slice(), self.e.as_slice()];
        if let Some(private) = &self.private {
            components.extend_from_slice(&[
                private.d.as_slice(),
                private.p.as_slice(),
                private.q.as_slice(),
                private.dp.as_slice(),
                private.dq.as_slice(),
                private.qi.as_slice(),
            ]);
        }
        components
    }
}

impl PartialEq for RsaKeyParameters {
    fn eq(&self, other: &Self) -> bool {
        self.n == other.n && self.e == other.e
    }
}

impl Eq for RsaKeyParameters {}
