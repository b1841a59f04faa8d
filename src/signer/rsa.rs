use rand::thread_rng;
use rsa::{Pkcs1v15Sign, Pss, RsaPrivateKey, RsaPublicKey};
use sha2::{Digest, Sha256, Sha384, Sha512};

use crate::error::*;
use crate::jwa::HashAlgorithm;
use crate::keys::RsaKeyParameters;

/// Hashes `message` and runs `$op` with the padding scheme matching `$hash` and `$pss`.
macro_rules! with_scheme {
    ($hash:expr, $pss:expr, $message:expr, |$scheme:ident, $digest:ident| $op:expr) => {
        match ($hash, $pss) {
            (HashAlgorithm::Sha384, false) => {
                let ($scheme, $digest) = (Pkcs1v15Sign::new::<Sha384>(), Sha384::digest($message));
                $op
            }
            (HashAlgorithm::Sha512, false) => {
                let ($scheme, $digest) = (Pkcs1v15Sign::new::<Sha512>(), Sha512::digest($message));
                $op
            }
            (_, false) => {
                let ($scheme, $digest) = (Pkcs1v15Sign::new::<Sha256>(), Sha256::digest($message));
                $op
            }
            (HashAlgorithm::Sha384, true) => {
                let ($scheme, $digest) = (Pss::new::<Sha384>(), Sha384::digest($message));
                $op
            }
            (HashAlgorithm::Sha512, true) => {
                let ($scheme, $digest) = (Pss::new::<Sha512>(), Sha512::digest($message));
                $op
            }
            (_, true) => {
                let ($scheme, $digest) = (Pss::new::<Sha256>(), Sha256::digest($message));
                $op
            }
        }
    };
}

/// RSASSA-PKCS1-v1_5 and RSASSA-PSS. PSS uses a salt as long as the hash output.
pub(crate) struct RsaSigner {
    hash: HashAlgorithm,
    pss: bool,
    signature_size: usize,
    public_key: RsaPublicKey,
    private_key: Option<RsaPrivateKey>,
}

impl RsaSigner {
    pub fn new(key: &RsaKeyParameters, hash: HashAlgorithm, pss: bool) -> Result<Self, Error> {
        let private_key = if key.has_private_key() {
            Some(key.to_rsa_private_key()?)
        } else {
            None
        };
        Ok(RsaSigner {
            hash,
            pss,
            signature_size: (key.key_size_bits() + 7) / 8,
            public_key: key.to_rsa_public_key()?,
            private_key,
        })
    }

    pub fn signature_size(&self) -> usize {
        self.signature_size
    }

    pub fn sign(&self, message: &[u8]) -> Result<Vec<u8>, Error> {
        let private_key = self
            .private_key
            .as_ref()
            .ok_or(JWTError::MissingPrivateKey)?;
        let mut rng = thread_rng();
        let res = with_scheme!(self.hash, self.pss, message, |scheme, digest| {
            private_key.sign_with_rng(&mut rng, scheme, &digest)
        });
        res.map_err(|e| anyhow!(JWTError::InternalError(e.to_string())))
    }

    pub fn verify(&self, message: &[u8], signature: &[u8]) -> bool {
        if signature.len() != self.signature_size {
            return false;
        }
        with_scheme!(self.hash, self.pss, message, |scheme, digest| {
            self.public_key.verify(scheme, &digest, signature).is_ok()
        })
    }
}
