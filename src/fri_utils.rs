//! Shared folding arithmetic and witness reconstruction used by both the FRI prover and
//! verifier.

use alloc::vec::Vec;
use core::iter::zip;

use crate::fields::backend::CpuBackend;
use crate::fields::m31::M31;
use crate::fields::qm31::SecureField;
use crate::fields::FieldExpOps;
use crate::fft_utils::ibutterfly;
use crate::queries::{Queries, SparseEvaluation};
use crate::types::error::FriVerificationError;
use crate::types::poly::{LineEvaluation, SecureEvaluation};
use crate::utils::bit_reverse_index;

pub const FOLD_STEP: u32 = 1;
pub const CIRCLE_TO_LINE_FOLD_STEP: u32 = 1;

/// Expands sorted query positions into the full `2^fold_step`-sized cosets they fold
/// within, without reconstructing any values. The prover side of
/// [`compute_decommitment_positions_and_rebuild_evals`]: it already knows every value, so it
/// only needs the position bookkeeping.
pub fn expand_to_cosets(positions: &[usize], fold_step: u32) -> Vec<usize> {
    let fold_step_size = 1usize << fold_step;
    let mut result = Vec::new();
    let mut i = 0;
    while i < positions.len() {
        let subset_start = (positions[i] >> fold_step) << fold_step;
        while i < positions.len() && (positions[i] >> fold_step) << fold_step == subset_start {
            i += 1;
        }
        result.extend(subset_start..subset_start + fold_step_size);
    }
    result
}

/// Splits queries into the `2^FOLD_STEP`-sized subsets they fold within, then reconstructs
/// each subset's full evaluation from the queried values plus witness evaluations for the
/// positions not directly queried.
///
/// Returns the positions the caller needs from the Merkle proof (queried positions plus
/// every sibling needed to complete each subset) together with the reconstructed
/// [`SparseEvaluation`].
pub fn compute_decommitment_positions_and_rebuild_evals(
    queries: &Queries,
    query_evals: &[SecureField],
    mut witness_evals: impl Iterator<Item = SecureField>,
    fold_step: u32,
) -> Result<(Vec<usize>, SparseEvaluation), FriVerificationError> {
    let mut query_evals_iter = query_evals.iter().copied();

    let mut decommitment_positions = Vec::new();
    let mut subset_evals = Vec::new();
    let mut subset_domain_initial_indices = Vec::new();

    let fold_step_size = 1usize << fold_step;

    let mut i = 0;
    while i < queries.positions.len() {
        let subset_start = (queries.positions[i] >> fold_step) << fold_step;
        let mut subset_queries = Vec::new();
        while i < queries.positions.len() && (queries.positions[i] >> fold_step) << fold_step == subset_start {
            subset_queries.push(queries.positions[i]);
            i += 1;
        }

        let subset_positions = subset_start..subset_start + fold_step_size;
        decommitment_positions.extend(subset_positions.clone());

        let mut current_subset_queries = subset_queries.iter().copied().peekable();
        let mut current_subset_evals = Vec::with_capacity(fold_step_size);
        for position in subset_positions {
            match current_subset_queries.next_if_eq(&position) {
                Some(_) => {
                    let eval = query_evals_iter.next().ok_or(FriVerificationError::InsufficientWitness)?;
                    current_subset_evals.push(eval);
                }
                None => {
                    let eval = witness_evals.next().ok_or(FriVerificationError::InsufficientWitness)?;
                    current_subset_evals.push(eval);
                }
            }
        }
        subset_evals.push(current_subset_evals);
        subset_domain_initial_indices.push(bit_reverse_index(subset_start, queries.log_domain_size));
    }

    if query_evals_iter.next().is_some() {
        return Err(FriVerificationError::InsufficientWitness);
    }

    let sparse_evaluation = SparseEvaluation::new(subset_evals, subset_domain_initial_indices);
    Ok((decommitment_positions, sparse_evaluation))
}

/// Folds a line evaluation by one level: `2f(x) = f0(pi(x)) + x*f1(pi(x))`, combined via
/// `alpha` into a single evaluation over the doubled domain.
pub fn fold_line(eval: &LineEvaluation<CpuBackend<M31>>, alpha: SecureField) -> LineEvaluation<CpuBackend<M31>> {
    let n = eval.len();
    assert!(n >= 2 && n.is_power_of_two());

    let domain = eval.domain;
    let log_size = domain.log_size();
    let mut folded_values = Vec::with_capacity(n / 2);

    for i in 0..n / 2 {
        let mut f0 = eval.values.at(2 * i);
        let mut f1 = eval.values.at(2 * i + 1);

        let domain_index = bit_reverse_index(i * 2, log_size);
        let x = domain.at(domain_index);
        ibutterfly(&mut f0, &mut f1, x.inverse().into());

        folded_values.push(f0 + alpha * f1);
    }

    let mut column = crate::fields::secure_column::SecureColumnByCoords::zeros(folded_values.len());
    for (i, v) in folded_values.into_iter().enumerate() {
        column.set(i, v);
    }
    LineEvaluation::new(domain.double(), column)
}

/// Folds a circle-domain evaluation one level into an existing line-domain accumulator:
/// `dst[i] = dst[i]*alpha^2 + fold_one_step(src[2i], src[2i+1])`.
pub fn fold_circle_into_line(
    dst: &mut LineEvaluation<CpuBackend<M31>>,
    src: &SecureEvaluation<CpuBackend<M31>>,
    alpha: SecureField,
) {
    let n_src = src.len();
    assert!(n_src >= 2 && n_src.is_power_of_two());
    assert_eq!(n_src >> CIRCLE_TO_LINE_FOLD_STEP, dst.len());

    let domain = src.domain;
    let log_size = domain.log_size();
    let alpha_sq = alpha.square();

    for i in 0..n_src / 2 {
        let mut f0 = src.values.at(2 * i);
        let mut f1 = src.values.at(2 * i + 1);

        let domain_index = bit_reverse_index(i << CIRCLE_TO_LINE_FOLD_STEP, log_size);
        let p = domain.at(domain_index);
        ibutterfly(&mut f0, &mut f1, p.y.inverse().into());

        let folded = alpha * f1 + f0;
        let prev = dst.values.at(i);
        dst.values.set(i, prev * alpha_sq + folded);
    }
}

/// Folds each of a column's per-subset values into the running per-query layer
/// evaluations: `layer[i] = layer[i]*alpha^2 + column[i]`.
pub fn accumulate_line(layer_query_evals: &mut [SecureField], column_query_evals: &[SecureField], alpha: SecureField) {
    let alpha_sq = alpha.square();
    for (layer_eval, column_eval) in zip(layer_query_evals, column_query_evals) {
        *layer_eval = *layer_eval * alpha_sq + *column_eval;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circle::Coset;
    use crate::fields::secure_column::SecureColumnByCoords;
    use crate::line::LineDomain;
    use crate::types::poly::LinePoly;

    fn line_eval_of(domain: LineDomain, values: &[SecureField]) -> LineEvaluation<CpuBackend<M31>> {
        let mut col = SecureColumnByCoords::<CpuBackend<M31>>::zeros(values.len());
        for (i, v) in values.iter().enumerate() {
            col.set(i, *v);
        }
        LineEvaluation::new(domain, col)
    }

    #[test]
    fn fold_line_matches_interpolated_polynomial_split() {
        let log_size = 3;
        let domain = LineDomain::new(Coset::half_odds(log_size));
        let values: Vec<SecureField> = (0..domain.size()).map(|i| SecureField::from((i as u32) + 1)).collect();
        let eval = line_eval_of(domain, &values);

        let poly = line_eval_of(domain, &values).interpolate();
        let alpha = SecureField::from(3u32);
        let folded = fold_line(&eval, alpha);
        assert_eq!(folded.len(), domain.size() / 2);

        let folded_poly = folded.interpolate();
        let (lhs, rhs) = poly.coeffs().split_at(poly.len() / 2);
        // `poly`'s coefficients already carry interpolate()'s single top-level `1/n` rescale,
        // so splitting them in half gives the true even/odd coefficients divided by `n`, not
        // `n/2`; `fold_line`'s raw evaluations in turn carry `ibutterfly`'s factor of 2
        // (spec §8 property #4), and `folded.interpolate()` rescales those by `1/(n/2)`. Net
        // factor between the two interpolated sides is 4.
        let four = SecureField::from(4u32);
        let expected = LinePoly::new(zip(lhs, rhs).map(|(&e, &o)| four * (e + alpha * o)).collect());
        for i in 0..folded_poly.len() {
            assert_eq!(folded_poly.coeffs()[i], expected.coeffs()[i]);
        }
    }

    #[test]
    fn accumulate_line_matches_manual_combination() {
        let mut layer = alloc::vec![SecureField::from(1u32), SecureField::from(2u32)];
        let column = alloc::vec![SecureField::from(10u32), SecureField::from(20u32)];
        let alpha = SecureField::from(2u32);
        accumulate_line(&mut layer, &column, alpha);
        assert_eq!(layer[0], SecureField::from(1u32) * alpha.square() + SecureField::from(10u32));
        assert_eq!(layer[1], SecureField::from(2u32) * alpha.square() + SecureField::from(20u32));
    }
}
