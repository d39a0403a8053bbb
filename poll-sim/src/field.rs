//! BN254 scalar-field wrapper and the handful of big-integer operations the
//! Poll state machine needs that `ark_ff::Fr` cannot express directly (signed
//! subtraction, base-10 (de)serialization).

use ark_ff::{BigInteger, PrimeField, Zero};
use num_bigint::{BigInt, BigUint, Sign};
use std::sync::OnceLock;
use thiserror::Error;

/// The BN254 scalar field every value in this crate lives in.
pub type Fr = ark_bn254::Fr;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FieldError {
    #[error("value is not a valid base-10 field element: {0}")]
    InvalidDecimal(String),
}

/// `SNARK_FIELD_SIZE`: the BN254 scalar field modulus, as an unsigned big
/// integer, matching the quantity circuits call `p`.
pub fn snark_field_size() -> &'static BigUint {
    static SIZE: OnceLock<BigUint> = OnceLock::new();
    SIZE.get_or_init(|| BigUint::from_bytes_be(&Fr::MODULUS.to_bytes_be()))
}

pub fn fr_to_biguint(value: &Fr) -> BigUint {
    BigUint::from_bytes_be(&value.into_bigint().to_bytes_be())
}

pub fn biguint_to_fr(value: &BigUint) -> Fr {
    Fr::from_le_bytes_mod_order(&value.to_bytes_le())
}

/// Base-10 rendering used throughout the JSON circuit-input layout (§6).
pub fn to_decimal_string(value: &Fr) -> String {
    fr_to_biguint(value).to_str_radix(10)
}

pub fn from_decimal_string(s: &str) -> Result<Fr, FieldError> {
    let digits = BigUint::parse_bytes(s.trim().as_bytes(), 10)
        .ok_or_else(|| FieldError::InvalidDecimal(s.to_string()))?;
    Ok(biguint_to_fr(&digits))
}

/// The quadratic-voting refund-and-repay check (§4.3 rule 5, §9): the
/// subtraction is performed over signed integers *before* any modular
/// reduction, so a result that would be negative is detected here rather
/// than silently wrapping around the field.
pub fn checked_credits_left(balance: Fr, old_weight: Fr, new_weight: Fr) -> Option<Fr> {
    let balance = BigInt::from(fr_to_biguint(&balance));
    let old_weight = BigInt::from(fr_to_biguint(&old_weight));
    let new_weight = BigInt::from(fr_to_biguint(&new_weight));
    let credits_left = balance + &old_weight * &old_weight - &new_weight * &new_weight;
    if credits_left.sign() == Sign::Minus {
        return None;
    }
    let (_, magnitude) = credits_left.into_parts();
    Some(biguint_to_fr(&magnitude))
}

pub fn is_below_field_size(value: &Fr) -> bool {
    // Every `Fr` is already a canonical residue, so this only exists to make
    // the preconditions in §4.1 checkable against raw decimal input before
    // it is parsed into an `Fr`.
    &fr_to_biguint(value) < snark_field_size()
}

pub fn zero() -> Fr {
    Fr::zero()
}

/// Splits an arbitrarily large unsigned integer into `count` base-`p` digits
/// (least-significant first), each one a canonical field element. Used to
/// pack the signature scalar (§4.0: it is an unreduced integer, not a field
/// element) into a fixed number of `Message` words.
pub fn to_field_digits(value: &BigUint, count: usize) -> Vec<Fr> {
    let modulus = snark_field_size();
    let mut remaining = value.clone();
    let mut digits = Vec::with_capacity(count);
    for _ in 0..count {
        let digit = &remaining % modulus;
        digits.push(biguint_to_fr(&digit));
        remaining = &remaining / modulus;
    }
    digits
}

pub fn from_field_digits(digits: &[Fr]) -> BigUint {
    let modulus = snark_field_size();
    let mut value = BigUint::from(0u32);
    for digit in digits.iter().rev() {
        value = value * modulus + fr_to_biguint(digit);
    }
    value
}
