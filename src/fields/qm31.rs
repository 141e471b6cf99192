use core::fmt;
use core::ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Rem, RemAssign, Sub, SubAssign};

use num_traits::Zero;
use serde::{Deserialize, Serialize};

use super::cm31::CM31;
use super::m31::M31;
use super::secure_column::SECURE_EXTENSION_DEGREE;
use super::{ComplexConjugate, FieldExpOps};
use crate::{impl_extension_field, impl_field};

pub const P4: u128 = 21267647892944572736998860269687930881; // (2^31 - 1)^4
/// The element `u^2 = 2 + i` defining the quartic extension.
pub const R: CM31 = CM31::from_u32_unchecked(2, 1);

/// Degree-4 extension of M31, used as the secure field for Fiat-Shamir challenges and
/// folded FRI evaluations. `q = c0 + c1 * u` with `u^2 = 2 + i`.
/// Represented as `((a, b), (c, d))` for `(a + bi) + (c + di) * u`.
#[derive(Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
pub struct QM31(pub CM31, pub CM31);
pub type SecureField = QM31;

impl_field!(QM31, P4);
impl_extension_field!(QM31, CM31);

impl QM31 {
    pub const fn from_u32_unchecked(a: u32, b: u32, c: u32, d: u32) -> Self {
        Self(CM31::from_u32_unchecked(a, b), CM31::from_u32_unchecked(c, d))
    }

    pub const fn from_m31(a: M31, b: M31, c: M31, d: M31) -> Self {
        Self(CM31::from_m31(a, b), CM31::from_m31(c, d))
    }

    pub const fn from_m31_array(array: [M31; SECURE_EXTENSION_DEGREE]) -> Self {
        Self::from_m31(array[0], array[1], array[2], array[3])
    }

    pub const fn to_m31_array(self) -> [M31; SECURE_EXTENSION_DEGREE] {
        [self.0 .0, self.0 .1, self.1 .0, self.1 .1]
    }

    /// Recombines the four coordinate-polynomial evaluations at a point into the
    /// corresponding secure-field evaluation.
    pub fn from_partial_evals(evals: [Self; SECURE_EXTENSION_DEGREE]) -> Self {
        let mut res = evals[0];
        res += evals[1] * Self::from_u32_unchecked(0, 1, 0, 0);
        res += evals[2] * Self::from_u32_unchecked(0, 0, 1, 0);
        res += evals[3] * Self::from_u32_unchecked(0, 0, 0, 1);
        res
    }

    // A `Mul<CM31>` impl drives inference insane over QM31 * QM31; spell it out instead.
    pub fn mul_cm31(self, rhs: CM31) -> Self {
        Self(self.0 * rhs, self.1 * rhs)
    }
}

impl fmt::Debug for QM31 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:?} + {:?}u)", self.0, self.1)
    }
}

impl Mul for QM31 {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self::Output {
        // (a + bu) * (c + du) = (ac + r*bd) + (ad + bc)u.
        Self(
            self.0 * rhs.0 + R * self.1 * rhs.1,
            self.0 * rhs.1 + self.1 * rhs.0,
        )
    }
}

impl From<usize> for QM31 {
    fn from(value: usize) -> Self {
        M31::from(value).into()
    }
}

impl From<u32> for QM31 {
    fn from(value: u32) -> Self {
        M31::from(value).into()
    }
}

impl From<i32> for QM31 {
    fn from(value: i32) -> Self {
        M31::from(value).into()
    }
}

impl TryInto<M31> for QM31 {
    type Error = ();

    fn try_into(self) -> Result<M31, Self::Error> {
        if self.1 != CM31::zero() {
            return Err(());
        }
        self.0.try_into()
    }
}

impl FieldExpOps for QM31 {
    fn inverse(&self) -> Self {
        assert!(!self.is_zero(), "0 has no inverse");
        // (a + bu)^-1 = (a - bu) / (a^2 - (2+i)*b^2).
        let b2 = self.1.square();
        let ib2 = CM31(-b2.1, b2.0);
        let denom = self.0.square() - (b2 + b2 + ib2);
        let denom_inverse = denom.inverse();
        Self(self.0 * denom_inverse, -self.1 * denom_inverse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_traits::One;

    #[test]
    fn m31_array_roundtrip() {
        let arr = [M31::from(1u32), M31::from(2u32), M31::from(3u32), M31::from(4u32)];
        assert_eq!(QM31::from_m31_array(arr).to_m31_array(), arr);
    }

    #[test]
    fn mul_inverse_is_one() {
        let x = QM31::from_u32_unchecked(1, 2, 3, 4);
        assert_eq!(x * x.inverse(), QM31::one());
    }

    #[test]
    fn from_partial_evals_reassembles_value() {
        let x = QM31::from_u32_unchecked(5, 6, 7, 8);
        let coords = x.to_m31_array();
        let partial = [
            QM31::from(coords[0]),
            QM31::from(coords[1]),
            QM31::from(coords[2]),
            QM31::from(coords[3]),
        ];
        assert_eq!(QM31::from_partial_evals(partial), x);
    }

    #[test]
    #[should_panic]
    fn zero_inverse_panics() {
        let _ = QM31::zero().inverse();
    }
}
