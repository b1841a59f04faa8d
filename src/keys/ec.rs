use rand::thread_rng;
use zeroize::Zeroize;

use crate::error::*;
use crate::jwa::EllipticCurve;

/// Runs `$body` with `$m` bound to the crate implementing `$curve`.
macro_rules! with_curve {
    ($curve:expr, |$m:ident| $body:block) => {
        match $curve {
            $crate::jwa::EllipticCurve::P256 => {
                use p256 as $m;
                $body
            }
            $crate::jwa::EllipticCurve::P384 => {
                use p384 as $m;
                $body
            }
            $crate::jwa::EllipticCurve::P521 => {
                use p521 as $m;
                $body
            }
        }
    };
}

pub(crate) use with_curve;

/// Elliptic-curve key: affine public point and optional private scalar.
#[derive(Clone)]
pub struct EcKeyParameters {
    curve: EllipticCurve,
    x: Vec<u8>,
    y: Vec<u8>,
    d: Option<Vec<u8>>,
}

impl std::fmt::Debug for EcKeyParameters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EcKeyParameters")
            .field("curve", &self.curve)
            .field("has_private_key", &self.has_private_key())
            .finish_non_exhaustive()
    }
}

impl Drop for EcKeyParameters {
    fn drop(&mut self) {
        if let Some(d) = self.d.as_mut() {
            d.zeroize();
        }
    }
}

/// Uncompressed public point of a private scalar, as `(x, y)`.
fn public_coordinates(curve: EllipticCurve, d: &[u8]) -> Result<(Vec<u8>, Vec<u8>), Error> {
    with_curve!(curve, |c| {
        let sk = c::SecretKey::from_slice(d).map_err(|_| JWTError::MalformedKeyEncoding)?;
        let point =
            c::elliptic_curve::sec1::ToEncodedPoint::to_encoded_point(&sk.public_key(), false);
        match (point.x(), point.y()) {
            (Some(x), Some(y)) => Ok((x.to_vec(), y.to_vec())),
            _ => bail!(JWTError::InvalidPublicKey),
        }
    })
}

impl EcKeyParameters {
    /// Public key from affine coordinates. The point must be on the curve.
    pub fn from_public_components(
        curve: EllipticCurve,
        x: &[u8],
        y: &[u8],
    ) -> Result<Self, Error> {
        let size = curve.coordinate_size();
        ensure!(
            x.len() == size && y.len() == size,
            JWTError::InvalidPublicKey
        );
        let key = EcKeyParameters {
            curve,
            x: x.to_vec(),
            y: y.to_vec(),
            d: None,
        };
        let point = key.sec1_point();
        with_curve!(curve, |c| {
            c::PublicKey::from_sec1_bytes(&point).map_err(|_| JWTError::InvalidPublicKey)?;
        });
        Ok(key)
    }

    /// Key pair from its components. The public point must match the private scalar.
    pub fn from_private_components(
        curve: EllipticCurve,
        x: &[u8],
        y: &[u8],
        d: &[u8],
    ) -> Result<Self, Error> {
        ensure!(d.len() == curve.coordinate_size(), JWTError::InvalidKeySize);
        let (px, py) = public_coordinates(curve, d)?;
        ensure!(px == x && py == y, JWTError::InvalidPublicKey);
        Ok(EcKeyParameters {
            curve,
            x: px,
            y: py,
            d: Some(d.to_vec()),
        })
    }

    /// Key pair from the private scalar alone.
    pub fn from_private_key(curve: EllipticCurve, d: &[u8]) -> Result<Self, Error> {
        ensure!(d.len() == curve.coordinate_size(), JWTError::InvalidKeySize);
        let (x, y) = public_coordinates(curve, d)?;
        Ok(EcKeyParameters {
            curve,
            x,
            y,
            d: Some(d.to_vec()),
        })
    }

    /// Generate a new key pair.
    pub fn generate(curve: EllipticCurve) -> Result<Self, Error> {
        let mut d = with_curve!(curve, |c| {
            c::SecretKey::random(&mut thread_rng()).to_bytes().to_vec()
        });
        let key = Self::from_private_key(curve, &d);
        d.zeroize();
        key
    }

    pub fn curve(&self) -> EllipticCurve {
        self.curve
    }

    pub fn x(&self) -> &[u8] {
        &self.x
    }

    pub fn y(&self) -> &[u8] {
        &self.y
    }

    pub fn d(&self) -> Option<&[u8]> {
        self.d.as_deref()
    }

    pub fn has_private_key(&self) -> bool {
        self.d.is_some()
    }

    pub fn key_size_bits(&self) -> usize {
        self.curve.key_size_bits()
    }

    /// Same key without its private scalar.
    pub fn to_public(&self) -> Self {
        EcKeyParameters {
            curve: self.curve,
            x: self.x.clone(),
            y: self.y.clone(),
            d: None,
        }
    }

    /// Uncompressed SEC1 encoding of the public point: `04 || x || y`.
    pub fn sec1_point(&self) -> Vec<u8> {
        let mut point = Vec::with_capacity(1 + self.x.len() + self.y.len());
        point.push(0x04);
        point.extend_from_slice(&self.x);
        point.extend_from_slice(&self.y);
        point
    }

    pub(crate) fn components(&self) -> Vec<&[u8]> {
        let mut components = vec![
            self.curve.name().as_bytes(),
            self.x.as_slice(),
            self.y.as_slice(),
        ];
        if let Some(d) = &self.d {
            components.push(d.as_slice());
        }
        components
    }
}

impl PartialEq for EcKeyParameters {
    fn eq(&self, other: &Self) -> bool {
        self.curve == other.curve && self.x == other.x && self.y == other.y
    }
}

impl Eq for EcKeyParameters {}
