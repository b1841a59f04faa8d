//! PEM import of RSA (PKCS#1), EC (SEC1) and PKCS#8 keys.

use ct_codecs::{Base64, Decoder};
use zeroize::Zeroizing;

use super::der::DerReader;
use super::{EcKeyParameters, Jwk, RsaKeyParameters};
use crate::error::*;
use crate::jwa::EllipticCurve;

const OID_RSA_ENCRYPTION: &[u8] = &[0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x01, 0x01, 0x01];
const OID_EC_PUBLIC_KEY: &[u8] = &[0x2a, 0x86, 0x48, 0xce, 0x3d, 0x02, 0x01];
const OID_P256: &[u8] = &[0x2a, 0x86, 0x48, 0xce, 0x3d, 0x03, 0x01, 0x07];
const OID_P384: &[u8] = &[0x2b, 0x81, 0x04, 0x00, 0x22];
const OID_P521: &[u8] = &[0x2b, 0x81, 0x04, 0x00, 0x23];

const RSA_PRIVATE_KEY_VERSION: u32 = 0;
const EC_PRIVATE_KEY_VERSION: u32 = 1;
const PKCS8_VERSION: u32 = 0;

/// Extracts the label and the DER payload of the first PEM block.
pub fn parse_pem(pem: &str) -> Result<(String, Zeroizing<Vec<u8>>), Error> {
    let start = pem
        .find("-----BEGIN ")
        .ok_or(JWTError::MalformedKeyEncoding)?;
    let rest = &pem[start + "-----BEGIN ".len()..];
    let label_end = rest.find("-----").ok_or(JWTError::MalformedKeyEncoding)?;
    let label = &rest[..label_end];
    let body = &rest[label_end + "-----".len()..];
    let footer = format!("-----END {}-----", label);
    let body_end = body.find(&footer).ok_or(JWTError::MalformedKeyEncoding)?;
    let der = Base64::decode_to_vec(&body[..body_end], Some(b"\r\n \t"))
        .map_err(|_| JWTError::MalformedKeyEncoding)?;
    ensure!(!der.is_empty(), JWTError::MalformedKeyEncoding);
    Ok((label.to_string(), Zeroizing::new(der)))
}

/// Decodes a PEM-encoded RSA or EC key.
pub fn decode_key(pem: &str) -> Result<Jwk, Error> {
    let (label, der) = parse_pem(pem)?;
    match label.as_str() {
        "RSA PUBLIC KEY" => read_rsa_public_key(&der).map(Jwk::Rsa),
        "RSA PRIVATE KEY" => read_rsa_private_key(&der).map(Jwk::Rsa),
        "EC PRIVATE KEY" => read_ec_private_key(&der, None).map(Jwk::Ec),
        "PUBLIC KEY" => read_public_key_info(&der),
        "PRIVATE KEY" => read_private_key_info(&der),
        _ => bail!(JWTError::MalformedKeyEncoding),
    }
}

fn curve_from_oid(oid: &[u8]) -> Result<EllipticCurve, Error> {
    match oid {
        OID_P256 => Ok(EllipticCurve::P256),
        OID_P384 => Ok(EllipticCurve::P384),
        OID_P521 => Ok(EllipticCurve::P521),
        _ => bail!(JWTError::MalformedKeyEncoding),
    }
}

/// `RSAPublicKey ::= SEQUENCE { modulus, publicExponent }`
pub fn read_rsa_public_key(der: &[u8]) -> Result<RsaKeyParameters, Error> {
    let mut reader = DerReader::new(der);
    let mut seq = reader.read_sequence()?;
    let n = seq.read_unsigned_integer()?;
    let e = seq.read_integer()?;
    seq.finish()?;
    reader.finish()?;
    RsaKeyParameters::from_public_components(n, e)
        .map_err(|_| anyhow!(JWTError::MalformedKeyEncoding))
}

/// `RSAPrivateKey ::= SEQUENCE { version, n, e, d, p, q, dp, dq, qi }`
pub fn read_rsa_private_key(der: &[u8]) -> Result<RsaKeyParameters, Error> {
    let mut reader = DerReader::new(der);
    let mut seq = reader.read_sequence()?;
    ensure!(
        seq.read_small_integer()? == RSA_PRIVATE_KEY_VERSION,
        JWTError::MalformedKeyEncoding
    );
    let n = seq.read_unsigned_integer()?;
    let e = seq.read_integer()?;
    let d = seq.read_unsigned_integer()?;
    let p = seq.read_unsigned_integer()?;
    let q = seq.read_unsigned_integer()?;
    let dp = seq.read_unsigned_integer()?;
    let dq = seq.read_unsigned_integer()?;
    let qi = seq.read_unsigned_integer()?;
    seq.finish()?;
    reader.finish()?;
    RsaKeyParameters::from_private_components(n, e, d, p, q, dp, dq, qi)
        .map_err(|_| anyhow!(JWTError::MalformedKeyEncoding))
}

/// `ECPrivateKey ::= SEQUENCE { 1, OCTET STRING d, [0] curve OID, [1] BIT STRING point }`
///
/// Inside PKCS#8 the curve comes from the outer algorithm identifier and the inner
/// parameters may be omitted. A missing public point is recomputed from `d`.
pub fn read_ec_private_key(
    der: &[u8],
    outer_curve: Option<EllipticCurve>,
) -> Result<EcKeyParameters, Error> {
    let mut reader = DerReader::new(der);
    let mut seq = reader.read_sequence()?;
    ensure!(
        seq.read_small_integer()? == EC_PRIVATE_KEY_VERSION,
        JWTError::MalformedKeyEncoding
    );
    let d = seq.read_octet_string()?;
    let inner_curve = match seq.read_optional_context_specific(0)? {
        Some(mut params) => {
            let curve = curve_from_oid(params.read_oid()?)?;
            params.finish()?;
            Some(curve)
        }
        None => None,
    };
    let curve = match (inner_curve, outer_curve) {
        (Some(inner), Some(outer)) if inner != outer => bail!(JWTError::MalformedKeyEncoding),
        (Some(curve), _) | (None, Some(curve)) => curve,
        (None, None) => bail!(JWTError::MalformedKeyEncoding),
    };
    let point = match seq.read_optional_context_specific(1)? {
        Some(mut public_key) => {
            let point = public_key.read_bit_string()?;
            public_key.finish()?;
            Some(point)
        }
        None => None,
    };
    seq.finish()?;
    reader.finish()?;

    ensure!(
        d.len() == curve.coordinate_size(),
        JWTError::MalformedKeyEncoding
    );
    let key = match point {
        Some(point) => {
            let (x, y) = split_point(point, d.len())?;
            EcKeyParameters::from_private_components(curve, x, y, d)
        }
        None => EcKeyParameters::from_private_key(curve, d),
    };
    key.map_err(|_| anyhow!(JWTError::MalformedKeyEncoding))
}

/// Splits an uncompressed point `04 || x || y` with coordinates of `size` bytes.
fn split_point(point: &[u8], size: usize) -> Result<(&[u8], &[u8]), Error> {
    match point.split_first() {
        Some((0x04, xy)) if xy.len() == 2 * size => Ok(xy.split_at(size)),
        _ => bail!(JWTError::MalformedKeyEncoding),
    }
}

/// `SubjectPublicKeyInfo ::= SEQUENCE { AlgorithmIdentifier, BIT STRING }`
pub fn read_public_key_info(der: &[u8]) -> Result<Jwk, Error> {
    let mut reader = DerReader::new(der);
    let mut seq = reader.read_sequence()?;
    let mut alg_id = seq.read_sequence()?;
    let oid = alg_id.read_oid()?;
    let key = match oid {
        OID_RSA_ENCRYPTION => {
            if !alg_id.is_empty() {
                alg_id.read_null()?;
            }
            alg_id.finish()?;
            Jwk::Rsa(read_rsa_public_key(seq.read_bit_string()?)?)
        }
        OID_EC_PUBLIC_KEY => {
            let curve = curve_from_oid(alg_id.read_oid()?)?;
            alg_id.finish()?;
            let (x, y) = split_point(seq.read_bit_string()?, curve.coordinate_size())?;
            Jwk::Ec(
                EcKeyParameters::from_public_components(curve, x, y)
                    .map_err(|_| anyhow!(JWTError::MalformedKeyEncoding))?,
            )
        }
        _ => bail!(JWTError::MalformedKeyEncoding),
    };
    seq.finish()?;
    reader.finish()?;
    Ok(key)
}

/// `PrivateKeyInfo ::= SEQUENCE { 0, AlgorithmIdentifier, OCTET STRING, [0] attributes OPTIONAL }`
pub fn read_private_key_info(der: &[u8]) -> Result<Jwk, Error> {
    let mut reader = DerReader::new(der);
    let mut seq = reader.read_sequence()?;
    ensure!(
        seq.read_small_integer()? == PKCS8_VERSION,
        JWTError::MalformedKeyEncoding
    );
    let mut alg_id = seq.read_sequence()?;
    let oid = alg_id.read_oid()?;
    let key = match oid {
        OID_RSA_ENCRYPTION => {
            if !alg_id.is_empty() {
                alg_id.read_null()?;
            }
            alg_id.finish()?;
            Jwk::Rsa(read_rsa_private_key(seq.read_octet_string()?)?)
        }
        OID_EC_PUBLIC_KEY => {
            let curve = curve_from_oid(alg_id.read_oid()?)?;
            alg_id.finish()?;
            Jwk::Ec(read_ec_private_key(seq.read_octet_string()?, Some(curve))?)
        }
        _ => bail!(JWTError::MalformedKeyEncoding),
    };
    seq.read_optional_context_specific(0)?;
    seq.finish()?;
    reader.finish()?;
    Ok(key)
}
