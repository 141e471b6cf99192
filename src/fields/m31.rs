use core::fmt::{self, Display};
use core::ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Rem, RemAssign, Sub, SubAssign};

use bytemuck::{Pod, Zeroable};
use num_traits::{One, Zero};
use serde::{Deserialize, Serialize};

use crate::fields::{ComplexConjugate, FieldExpOps};
use crate::impl_field;

/// The Mersenne prime 2^31 - 1.
pub const P: u32 = 2147483647;

pub type BaseField = M31;

/// An element of the base field, the prime field of order `2^31 - 1`.
///
/// The inner value is always kept in the canonical range `[0, P)`.
#[derive(Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize, Pod, Zeroable)]
#[repr(transparent)]
pub struct M31(pub u32);

impl_field!(M31, P);

impl M31 {
    /// Builds from a value already known to be in `[0, P)`. Caller's responsibility; a value
    /// outside that range is a silent correctness bug, not a panic, so use `From` when unsure.
    pub const fn from_u32_unchecked(val: u32) -> Self {
        Self(val)
    }

    pub const fn to_u32(self) -> u32 {
        self.0
    }

    pub fn to_bytes(self) -> [u8; 4] {
        self.0.to_le_bytes()
    }
}

impl Display for M31 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for M31 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "M31({})", self.0)
    }
}

impl ComplexConjugate for M31 {
    fn complex_conjugate(&self) -> Self {
        *self
    }
}

impl Zero for M31 {
    fn zero() -> Self {
        Self(0)
    }

    fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl One for M31 {
    fn one() -> Self {
        Self(1)
    }
}

impl Add for M31 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        reduce_once(self.0 + rhs.0)
    }
}

impl Neg for M31 {
    type Output = Self;

    fn neg(self) -> Self::Output {
        if self.0 == 0 {
            self
        } else {
            Self(P - self.0)
        }
    }
}

impl Sub for M31 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        self + (-rhs)
    }
}

impl Mul for M31 {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self::Output {
        Self(reduce_u64((self.0 as u64) * (rhs.0 as u64)))
    }
}

impl FieldExpOps for M31 {
    fn inverse(&self) -> Self {
        assert!(!self.is_zero(), "0 has no inverse");
        pow2147483645(*self)
    }
}

/// Reduces a sum of two values already in `[0, P)`, whose sum fits in `[0, 2P)`.
#[inline]
fn reduce_once(v: u32) -> M31 {
    M31(if v >= P { v - P } else { v })
}

/// Reduces an arbitrary `u64` modulo `P = 2^31 - 1` using the Mersenne shortcut:
/// `x mod (2^31 - 1) == (x & P) + (x >> 31) mod P`, applied until the result fits below `2P`.
#[inline]
pub fn reduce_u64(v: u64) -> u32 {
    let v = (v & (P as u64)) + (v >> 31);
    // v < 2^32, possibly still >= P; one more fold plus a conditional subtraction settles it.
    let v = (v & (P as u64)) + (v >> 31);
    if v >= P as u64 {
        (v - P as u64) as u32
    } else {
        v as u32
    }
}

/// `x^(P-2) = x^2147483645`, computed via the standard stwo 37-step addition chain for
/// Mersenne-prime inversion rather than generic square-and-multiply over 31 bits.
fn pow2147483645(x: M31) -> M31 {
    let t0 = sqn(x, 2) * x;
    let t1 = sqn(t0, 1) * t0;
    let t2 = sqn(t1, 3) * t0;
    let t3 = sqn(t2, 1) * t0;
    let t4 = sqn(t3, 8) * t3;
    let t5 = sqn(t4, 8) * t3;
    sqn(t5, 7) * t2
}

fn sqn(x: M31, n: usize) -> M31 {
    let mut res = x;
    for _ in 0..n {
        res = res * res;
    }
    res
}

impl From<u32> for M31 {
    fn from(value: u32) -> Self {
        reduce_once(value % P)
    }
}

impl From<usize> for M31 {
    fn from(value: usize) -> Self {
        Self::from((value % (P as usize)) as u32)
    }
}

impl From<i32> for M31 {
    fn from(value: i32) -> Self {
        let p = P as i64;
        let reduced = (value as i64).rem_euclid(p) as u32;
        Self(reduced)
    }
}

impl From<M31> for u32 {
    fn from(value: M31) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_traits::{One, Zero};
    use proptest::prelude::*;

    #[test]
    fn add_sub_neg_roundtrip() {
        let a = M31::from(123456789u32);
        let b = M31::from(987654321u32);
        assert_eq!(a + b - b, a);
        assert_eq!(a + (-a), M31::zero());
    }

    #[test]
    fn mul_identity_and_inverse() {
        let a = M31::from(42u32);
        assert_eq!(a * M31::one(), a);
        assert_eq!(a * a.inverse(), M31::one());
    }

    #[test]
    fn wraps_at_p() {
        assert_eq!(M31::from(P), M31::zero());
        assert_eq!(M31::from(P + 1), M31::one());
    }

    #[test]
    #[should_panic]
    fn zero_inverse_panics() {
        let _ = M31::zero().inverse();
    }

    #[test]
    fn negative_from_i32_wraps_into_canonical_range() {
        assert_eq!(M31::from(-1i32), M31(P - 1));
    }

    #[test]
    fn reduce_u64_matches_naive_mod() {
        for v in [0u64, 1, P as u64, (P as u64) * 2, u64::from(u32::MAX) * u64::from(u32::MAX)] {
            assert_eq!(reduce_u64(v) as u64, v % (P as u64));
        }
    }

    proptest::proptest! {
        #[test]
        fn add_is_commutative_and_associative(a in 0..P, b in 0..P, c in 0..P) {
            let (a, b, c) = (M31::from(a), M31::from(b), M31::from(c));
            prop_assert_eq!(a + b, b + a);
            prop_assert_eq!((a + b) + c, a + (b + c));
        }

        #[test]
        fn mul_distributes_over_add(a in 0..P, b in 0..P, c in 0..P) {
            let (a, b, c) = (M31::from(a), M31::from(b), M31::from(c));
            prop_assert_eq!(a * (b + c), a * b + a * c);
        }

        #[test]
        fn nonzero_inverse_is_a_true_inverse(a in 1..P) {
            let a = M31::from(a);
            prop_assert_eq!(a * a.inverse(), M31::one());
        }
    }
}
