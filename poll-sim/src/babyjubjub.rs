//! A minimal Baby-Jubjub-shaped keypair/ECDH/signature adapter.
//!
//! The reference treats the EC keypair, ECDH, and EdDSA verification as
//! external collaborators (SPEC_FULL.md §1/§4.0); real curve parameters and
//! subgroup-order arithmetic are out of scope. What is implemented here is a
//! commutative ring of the shape `Fr[e]/(e^2 - ALPHA)`, whose nonzero
//! elements form a group under ring multiplication — the same addition-law
//! structure an Edwards curve has, without needing a field inversion to add
//! two points. Signing and verifying against this group is internally
//! consistent; it is not wire-compatible with real Baby Jubjub keys.

use crate::field::Fr;
use crate::hash::hash5;
use ark_ff::{One, PrimeField, Zero};
use num_bigint::BigUint;
use sha2::{Digest, Sha256};

/// S-box-free ring constant: `e^2 = ALPHA`.
const ALPHA: u64 = 5;

/// A point in the ring, represented as `x + e*y`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Point {
    pub x: Fr,
    pub y: Fr,
}

impl Point {
    pub fn identity() -> Self {
        Point { x: Fr::one(), y: Fr::zero() }
    }

    /// The fixed base point every keypair's public key is derived from.
    pub fn generator() -> Self {
        Point { x: Fr::from(2u64), y: Fr::from(3u64) }
    }

    pub fn add(&self, other: &Point) -> Point {
        let alpha = Fr::from(ALPHA);
        Point {
            x: self.x * other.x + alpha * self.y * other.y,
            y: self.x * other.y + other.x * self.y,
        }
    }

    /// Double-and-add scalar multiplication. `scalar` is an unreduced
    /// integer exponent (see module docs): this function never takes it
    /// modulo the field, so `scalar_mul` composes correctly with signature
    /// arithmetic performed over plain integers.
    pub fn scalar_mul(scalar: &BigUint, point: Point) -> Point {
        let mut result = Point::identity();
        let mut base = point;
        for byte in scalar.to_bytes_le() {
            let mut bits = byte;
            for _ in 0..8 {
                if bits & 1 == 1 {
                    result = result.add(&base);
                }
                base = base.add(&base);
                bits >>= 1;
            }
        }
        result
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PrivKey(pub BigUint);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PubKey(pub Point);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Keypair {
    pub priv_key: PrivKey,
    pub pub_key: PubKey,
}

impl Keypair {
    /// Private keys are kept below the field modulus so that a Schnorr
    /// scalar `k + c*priv` (both `k` and the challenge `c` are also
    /// field-sized, see `derive_nonce`/`challenge`) stays within three
    /// base-field digits — see `field::to_field_digits`.
    pub fn from_priv_key(priv_key: PrivKey) -> Self {
        let reduced = crate::field::fr_to_biguint(&crate::field::biguint_to_fr(&priv_key.0));
        let priv_key = PrivKey(reduced);
        let pub_key = PubKey(Point::scalar_mul(&priv_key.0, Point::generator()));
        Keypair { priv_key, pub_key }
    }

    pub fn random(rng: &mut impl rand::RngCore) -> Self {
        let mut bytes = [0u8; 32];
        rng.fill_bytes(&mut bytes);
        Self::from_priv_key(PrivKey(BigUint::from_bytes_be(&bytes)))
    }

    /// ECDH shared secret between this keypair's private half and another
    /// party's public key, collapsed to a single field element (§4.1).
    pub fn gen_ecdh_shared_key(priv_key: &PrivKey, other_pub: &PubKey) -> Fr {
        let shared_point = Point::scalar_mul(&priv_key.0, other_pub.0);
        crate::hash::hash_left_right(shared_point.x, shared_point.y)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Signature {
    pub r8: Point,
    /// Unreduced: `k + c*priv` where `k`, `c`, `priv` are each bounded by the
    /// field modulus, so this never exceeds three base-field digits.
    pub s: BigUint,
}

/// A fixed, nobody-knows-the-discrete-log public key used for messages with
/// no real sender (topup messages, §4.1). Derived the same way
/// `hash::nothing_up_my_sleeve` is, so it needs no hardcoded constant.
pub fn pad_pub_key() -> PubKey {
    static VALUE: std::sync::OnceLock<PubKey> = std::sync::OnceLock::new();
    *VALUE.get_or_init(|| {
        let mut hasher = Sha256::new();
        hasher.update(b"MaciPadKey");
        let x = Fr::from_le_bytes_mod_order(&hasher.finalize());
        let mut hasher = Sha256::new();
        hasher.update(b"MaciPadKeyY");
        let y = Fr::from_le_bytes_mod_order(&hasher.finalize());
        PubKey(Point { x, y })
    })
}

fn derive_nonce(priv_key: &PrivKey, message: Fr) -> BigUint {
    let mut hasher = Sha256::new();
    hasher.update(priv_key.0.to_bytes_be());
    hasher.update(crate::field::to_decimal_string(&message).as_bytes());
    let digest = Fr::from_le_bytes_mod_order(&hasher.finalize());
    crate::field::fr_to_biguint(&digest)
}

fn challenge(r8: &Point, pub_key: &PubKey, message: Fr) -> BigUint {
    let c = hash5([r8.x, r8.y, pub_key.0.x, pub_key.0.y, message]);
    crate::field::fr_to_biguint(&c)
}

/// Schnorr-style signature over the ring group defined above.
pub fn sign(priv_key: &PrivKey, pub_key: &PubKey, message: Fr) -> Signature {
    let k = derive_nonce(priv_key, message);
    let r8 = Point::scalar_mul(&k, Point::generator());
    let c = challenge(&r8, pub_key, message);
    let s = k + &c * &priv_key.0;
    Signature { r8, s }
}

pub fn verify(signature: &Signature, pub_key: &PubKey, message: Fr) -> bool {
    let c = challenge(&signature.r8, pub_key, message);
    let lhs = Point::scalar_mul(&signature.s, Point::generator());
    let rhs = signature.r8.add(&Point::scalar_mul(&c, pub_key.0));
    lhs == rhs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_then_verify_succeeds() {
        let keypair = Keypair::from_priv_key(PrivKey(BigUint::from(42u32)));
        let message = Fr::from(7u64);
        let signature = sign(&keypair.priv_key, &keypair.pub_key, message);
        assert!(verify(&signature, &keypair.pub_key, message));
    }

    #[test]
    fn verify_rejects_wrong_key() {
        let keypair = Keypair::from_priv_key(PrivKey(BigUint::from(42u32)));
        let impostor = Keypair::from_priv_key(PrivKey(BigUint::from(43u32)));
        let message = Fr::from(7u64);
        let signature = sign(&keypair.priv_key, &keypair.pub_key, message);
        assert!(!verify(&signature, &impostor.pub_key, message));
    }

    #[test]
    fn verify_rejects_wrong_message() {
        let keypair = Keypair::from_priv_key(PrivKey(BigUint::from(42u32)));
        let signature = sign(&keypair.priv_key, &keypair.pub_key, Fr::from(7u64));
        assert!(!verify(&signature, &keypair.pub_key, Fr::from(8u64)));
    }

    #[test]
    fn ecdh_agrees_both_directions() {
        let alice = Keypair::from_priv_key(PrivKey(BigUint::from(11u32)));
        let bob = Keypair::from_priv_key(PrivKey(BigUint::from(17u32)));
        let shared_a = Keypair::gen_ecdh_shared_key(&alice.priv_key, &bob.pub_key);
        let shared_b = Keypair::gen_ecdh_shared_key(&bob.priv_key, &alice.pub_key);
        assert_eq!(shared_a, shared_b);
    }
}
