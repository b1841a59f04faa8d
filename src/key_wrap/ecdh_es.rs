//! ECDH-ES key agreement (RFC 7518, section 4.6).

use zeroize::Zeroizing;

use crate::error::*;
use crate::keys::{with_curve, EcKeyParameters};

/// Concat KDF (NIST SP 800-56A) with SHA-256, as profiled by RFC 7518.
pub(crate) fn concat_kdf(
    shared_secret: &[u8],
    key_len: usize,
    alg: &str,
    apu: Option<&[u8]>,
    apv: Option<&[u8]>,
) -> Zeroizing<Vec<u8>> {
    use hmac_sha256::Hash as SHA256;

    let apu = apu.unwrap_or(&[]);
    let apv = apv.unwrap_or(&[]);

    let alg_bytes = alg.as_bytes();
    let alg_len = (alg_bytes.len() as u32).to_be_bytes();
    let apu_len = (apu.len() as u32).to_be_bytes();
    let apv_len = (apv.len() as u32).to_be_bytes();
    let key_bits = ((key_len * 8) as u32).to_be_bytes();

    let mut derived_key = Zeroizing::new(Vec::with_capacity(key_len + 32));
    let mut round: u32 = 1;

    while derived_key.len() < key_len {
        let mut hasher = SHA256::new();
        hasher.update(round.to_be_bytes());
        hasher.update(shared_secret);
        hasher.update(alg_len);
        hasher.update(alg_bytes);
        hasher.update(apu_len);
        hasher.update(apu);
        hasher.update(apv_len);
        hasher.update(apv);
        hasher.update(key_bits);
        derived_key.extend_from_slice(&hasher.finalize());
        round += 1;
    }

    derived_key.truncate(key_len);
    derived_key
}

/// Raw ECDH shared secret (the x coordinate of `d * P`).
pub(crate) fn shared_secret(
    private_key: &EcKeyParameters,
    public_key: &EcKeyParameters,
) -> Result<Zeroizing<Vec<u8>>, Error> {
    let curve = private_key.curve();
    ensure!(public_key.curve() == curve, JWTError::InvalidEphemeralKey);
    let d = private_key.d().ok_or(JWTError::MissingPrivateKey)?;
    let point = public_key.sec1_point();
    with_curve!(curve, |c| {
        let sk = c::SecretKey::from_slice(d).map_err(|_| JWTError::MalformedKeyEncoding)?;
        let pk = c::PublicKey::from_sec1_bytes(&point).map_err(|_| JWTError::InvalidPublicKey)?;
        let shared = c::ecdh::diffie_hellman(sk.to_nonzero_scalar(), pk.as_affine());
        Ok(Zeroizing::new(shared.raw_secret_bytes().to_vec()))
    })
}
