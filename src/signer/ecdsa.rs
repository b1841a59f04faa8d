use crate::error::*;
use crate::jwa::EllipticCurve;
use crate::keys::EcKeyParameters;

macro_rules! ecdsa_keys {
    ($c:ident, $key:expr) => {{
        let verifying_key = $c::ecdsa::VerifyingKey::from_sec1_bytes(&$key.sec1_point())
            .map_err(|_| JWTError::InvalidPublicKey)?;
        let signing_key = match $key.d() {
            Some(d) => Some(
                $c::ecdsa::SigningKey::from_slice(d)
                    .map_err(|_| JWTError::MalformedKeyEncoding)?,
            ),
            None => None,
        };
        (signing_key, verifying_key)
    }};
}

macro_rules! ecdsa_sign {
    ($c:ident, $signing_key:expr, $message:expr) => {{
        let signing_key = $signing_key
            .as_ref()
            .ok_or(JWTError::MissingPrivateKey)?;
        let signature: $c::ecdsa::Signature =
            $c::ecdsa::signature::Signer::try_sign(signing_key, $message)
                .map_err(|e| JWTError::InternalError(e.to_string()))?;
        signature.to_bytes().to_vec()
    }};
}

macro_rules! ecdsa_verify {
    ($c:ident, $verifying_key:expr, $message:expr, $signature:expr) => {{
        match $c::ecdsa::Signature::from_slice($signature) {
            Ok(signature) => {
                $c::ecdsa::signature::Verifier::verify($verifying_key, $message, &signature)
                    .is_ok()
            }
            Err(_) => false,
        }
    }};
}

/// ECDSA over P-256/SHA-256, P-384/SHA-384 or P-521/SHA-512.
///
/// Signatures are the fixed-size concatenation `R || S`.
pub(crate) enum EcdsaSigner {
    P256 {
        signing_key: Option<p256::ecdsa::SigningKey>,
        verifying_key: p256::ecdsa::VerifyingKey,
    },
    P384 {
        signing_key: Option<p384::ecdsa::SigningKey>,
        verifying_key: p384::ecdsa::VerifyingKey,
    },
    P521 {
        signing_key: Option<p521::ecdsa::SigningKey>,
        verifying_key: p521::ecdsa::VerifyingKey,
    },
}

impl EcdsaSigner {
    pub fn new(key: &EcKeyParameters) -> Result<Self, Error> {
        Ok(match key.curve() {
            EllipticCurve::P256 => {
                let (signing_key, verifying_key) = ecdsa_keys!(p256, key);
                EcdsaSigner::P256 {
                    signing_key,
                    verifying_key,
                }
            }
            EllipticCurve::P384 => {
                let (signing_key, verifying_key) = ecdsa_keys!(p384, key);
                EcdsaSigner::P384 {
                    signing_key,
                    verifying_key,
                }
            }
            EllipticCurve::P521 => {
                let (signing_key, verifying_key) = ecdsa_keys!(p521, key);
                EcdsaSigner::P521 {
                    signing_key,
                    verifying_key,
                }
            }
        })
    }

    pub fn curve(&self) -> EllipticCurve {
        match self {
            EcdsaSigner::P256 { .. } => EllipticCurve::P256,
            EcdsaSigner::P384 { .. } => EllipticCurve::P384,
            EcdsaSigner::P521 { .. } => EllipticCurve::P521,
        }
    }

    pub fn signature_size(&self) -> usize {
        self.curve().coordinate_size() * 2
    }

    pub fn sign(&self, message: &[u8]) -> Result<Vec<u8>, Error> {
        Ok(match self {
            EcdsaSigner::P256 { signing_key, .. } => ecdsa_sign!(p256, signing_key, message),
            EcdsaSigner::P384 { signing_key, .. } => ecdsa_sign!(p384, signing_key, message),
            EcdsaSigner::P521 { signing_key, .. } => ecdsa_sign!(p521, signing_key, message),
        })
    }

    pub fn verify(&self, message: &[u8], signature: &[u8]) -> bool {
        if signature.len() != self.signature_size() {
            return false;
        }
        match self {
            EcdsaSigner::P256 { verifying_key, .. } => {
                ecdsa_verify!(p256, verifying_key, message, signature)
            }
            EcdsaSigner::P384 { verifying_key, .. } => {
                ecdsa_verify!(p384, verifying_key, message, signature)
            }
            EcdsaSigner::P521 { verifying_key, .. } => {
                ecdsa_verify!(p521, verifying_key, message, signature)
            }
        }
    }
}
