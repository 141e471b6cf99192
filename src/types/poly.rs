use alloc::vec::Vec;
use core::marker::PhantomData;

use num_traits::{One, Zero};
use serde::{Deserialize, Serialize};

use crate::circle::CircleDomain;
use crate::fields::backend::{ColumnOps, CpuBackend};
use crate::fields::m31::M31;
use crate::fields::qm31::SecureField;
use crate::fields::secure_column::SecureColumnByCoords;
use crate::fields::FieldExpOps;
use crate::fft_utils::ibutterfly;
use crate::line::LineDomain;
use crate::utils::bit_reverse_index;

/// Marker for containers whose values are stored in bit-reversed coset order.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct BitReversedOrder;

/// A secure-field polynomial in the bit-reversed "doubling-map basis"
/// `{1, x, pi(x), pi(x)*x, ...}` where `pi(x) = 2x^2 - 1`. Coefficient count is always a
/// power of two; coefficients stay bit-reversed except at the `eval_at_point` boundary.
#[derive(Clone, Default, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct LinePoly {
    coeffs: Vec<SecureField>,
    log_size: u32,
}

impl LinePoly {
    pub fn new(coeffs: Vec<SecureField>) -> Self {
        assert!(coeffs.len().is_power_of_two(), "LinePoly coefficient count must be a power of two");
        let log_size = coeffs.len().trailing_zeros();
        Self { coeffs, log_size }
    }

    pub fn coeffs(&self) -> &[SecureField] {
        &self.coeffs
    }

    pub fn log_size(&self) -> u32 {
        self.log_size
    }

    pub fn len(&self) -> usize {
        self.coeffs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coeffs.is_empty()
    }

    /// Evaluates the polynomial at `point` via the recursive splitting
    /// `p(x) = p_even(x^2) + x * p_odd(x^2)`, where bit-reversed storage places the even
    /// half's coefficients before the odd half's at every level.
    pub fn eval_at_point(&self, point: SecureField) -> SecureField {
        fn rec(coeffs: &[SecureField], x: SecureField) -> SecureField {
            if coeffs.len() == 1 {
                return coeffs[0];
            }
            let (lhs, rhs) = coeffs.split_at(coeffs.len() / 2);
            let x_sq = x.square();
            rec(lhs, x_sq) + x * rec(rhs, x_sq)
        }
        rec(&self.coeffs, point)
    }
}

/// A secure-field evaluation over a [`LineDomain`]: the shape of every FRI layer after the
/// first circle-to-line fold.
#[derive(Clone)]
pub struct LineEvaluation<B: ColumnOps<M31>> {
    pub domain: LineDomain,
    pub values: SecureColumnByCoords<B>,
}

impl<B: ColumnOps<M31>> LineEvaluation<B> {
    pub fn new(domain: LineDomain, values: SecureColumnByCoords<B>) -> Self {
        assert_eq!(domain.size(), values.len());
        Self { domain, values }
    }

    pub fn zero(domain: LineDomain) -> Self {
        Self { domain, values: SecureColumnByCoords::zeros(domain.size()) }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl LineEvaluation<CpuBackend<M31>> {
    /// Interpolates the bit-reversed evaluations into [`LinePoly`] coefficients, undoing the
    /// same butterfly the forward fold applies. Each butterfly level doubles the values
    /// (`ibutterfly` convention), so the final coefficients are rescaled by `1/n`.
    pub fn interpolate(self) -> LinePoly {
        fn rec(values: Vec<SecureField>, domain: LineDomain) -> Vec<SecureField> {
            if values.len() == 1 {
                return values;
            }
            let log_size = domain.log_size();
            let mut evens = Vec::with_capacity(values.len() / 2);
            let mut odds = Vec::with_capacity(values.len() / 2);
            for (i, chunk) in values.chunks_exact(2).enumerate() {
                let mut f0 = chunk[0];
                let mut f1 = chunk[1];
                let domain_index = bit_reverse_index(i * 2, log_size);
                let x_inv = domain.at(domain_index).inverse();
                ibutterfly(&mut f0, &mut f1, x_inv.into());
                evens.push(f0);
                odds.push(f1);
            }
            let half_domain = domain.double();
            let mut coeffs = rec(evens, half_domain);
            coeffs.extend(rec(odds, half_domain));
            coeffs
        }

        let n = self.values.len();
        let values: Vec<SecureField> = (0..n).map(|i| self.values.at(i)).collect();
        let coeffs = rec(values, self.domain);
        let inv_n = SecureField::from(n as u32).inverse();
        LinePoly::new(coeffs.into_iter().map(|c| c * inv_n).collect())
    }
}

/// A secure-field evaluation over a [`CircleDomain`], always held in bit-reversed order.
#[derive(Clone)]
pub struct SecureEvaluation<B: ColumnOps<M31>> {
    pub domain: CircleDomain,
    pub values: SecureColumnByCoords<B>,
    _order: PhantomData<BitReversedOrder>,
}

impl<B: ColumnOps<M31>> SecureEvaluation<B> {
    pub fn new(domain: CircleDomain, values: SecureColumnByCoords<B>) -> Self {
        assert_eq!(domain.size(), values.len());
        Self { domain, values, _order: PhantomData }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
