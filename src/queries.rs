//! Channel-driven query sampling and the sparse-evaluation reconstruction the verifier
//! folds queried positions through.

use alloc::vec::Vec;

use crate::channel::Channel;
use crate::circle::CircleDomain;
use crate::fields::qm31::SecureField;
use crate::fft_utils::ibutterfly;
use crate::fields::FieldExpOps;
use crate::line::LineDomain;

/// Sorted, deduplicated query positions into a domain of size `2^log_domain_size`.
///
/// `Queries::generate` draws exactly `n_queries` draws from the channel and dedups the
/// result, so the final length can be `< n_queries` if two draws collide — the
/// implementation does not redraw to compensate (see module docs at the crate root for the
/// `security_bits` implication of this choice).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Queries {
    pub positions: Vec<usize>,
    pub log_domain_size: u32,
}

impl Queries {
    pub fn generate<C: Channel>(channel: &mut C, log_domain_size: u32, n_queries: usize) -> Self {
        let mut positions = Vec::with_capacity(n_queries);
        let domain_size = 1usize << log_domain_size;
        for _ in 0..n_queries {
            let bytes = channel.draw_random_bytes();
            let mut raw = [0u8; 8];
            raw.copy_from_slice(&bytes[..8]);
            let index = (u64::from_le_bytes(raw) as usize) % domain_size;
            positions.push(index);
        }
        positions.sort_unstable();
        positions.dedup();
        Self { positions, log_domain_size }
    }

    /// Strips `n_bits` low bits from every position, dedups, keeps ascending order.
    pub fn fold(&self, n_bits: u32) -> Self {
        assert!(n_bits <= self.log_domain_size);
        let mut positions: Vec<usize> = self.positions.iter().map(|p| p >> n_bits).collect();
        positions.dedup();
        Self { positions, log_domain_size: self.log_domain_size - n_bits }
    }
}

/// The per-coset fragments of a column evaluation the verifier reconstructs from
/// `queries ∪ witness`: `subset_evals[i]` has exactly `2^FOLD_STEP` entries, the evaluation
/// of the coset whose initial index (bit-reversed into the parent domain) is
/// `subset_domain_initial_indices[i]`.
#[derive(Clone, Debug)]
pub struct SparseEvaluation {
    pub subset_evals: Vec<Vec<SecureField>>,
    pub subset_domain_initial_indices: Vec<usize>,
}

impl SparseEvaluation {
    pub fn new(subset_evals: Vec<Vec<SecureField>>, subset_domain_initial_indices: Vec<usize>) -> Self {
        assert_eq!(subset_evals.len(), subset_domain_initial_indices.len());
        for subset in &subset_evals {
            assert_eq!(subset.len(), 2, "FRI fold step is fixed to 1: subsets hold exactly 2 values");
        }
        Self { subset_evals, subset_domain_initial_indices }
    }

    /// Folds each 2-point subset as a tiny line evaluation, producing one folded value per
    /// subset (matching `fold_line`'s per-pair computation).
    pub fn fold_line(&self, alpha: SecureField, domain: LineDomain) -> Vec<SecureField> {
        self.subset_evals
            .iter()
            .zip(&self.subset_domain_initial_indices)
            .map(|(subset, &initial_index)| {
                let mut f0 = subset[0];
                let mut f1 = subset[1];
                let x = domain.at(initial_index);
                ibutterfly(&mut f0, &mut f1, x.inverse().into());
                f0 + alpha * f1
            })
            .collect()
    }

    /// Folds each 2-point subset as a circle-to-line step (matching
    /// `fold_circle_into_line`'s per-pair computation, with a zero destination).
    pub fn fold_circle(&self, alpha: SecureField, domain: CircleDomain) -> Vec<SecureField> {
        self.subset_evals
            .iter()
            .zip(&self.subset_domain_initial_indices)
            .map(|(subset, &initial_index)| {
                let mut f0 = subset[0];
                let mut f1 = subset[1];
                let p = domain.at(initial_index);
                ibutterfly(&mut f0, &mut f1, p.y.inverse().into());
                f0 + alpha * f1
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::Blake2sChannel;

    #[test]
    fn generate_is_sorted_deduplicated_and_in_range() {
        let mut channel = Blake2sChannel::new(b"queries");
        let queries = Queries::generate(&mut channel, 10, 20);
        assert!(queries.positions.windows(2).all(|w| w[0] < w[1]));
        assert!(queries.positions.iter().all(|&p| p < (1 << 10)));
    }

    #[test]
    fn fold_strips_bits_and_stays_sorted_deduplicated() {
        let mut channel = Blake2sChannel::new(b"fold");
        let queries = Queries::generate(&mut channel, 10, 30);
        let folded = queries.fold(2);
        assert_eq!(folded.log_domain_size, 8);
        assert!(folded.positions.windows(2).all(|w| w[0] < w[1]));
        for p in &folded.positions {
            assert!(queries.positions.iter().any(|q| q >> 2 == *p));
        }
    }

    #[test]
    fn identical_channel_sequences_draw_identical_queries() {
        let mut a = Blake2sChannel::new(b"same");
        let mut b = Blake2sChannel::new(b"same");
        a.mix_u64(7);
        b.mix_u64(7);
        use crate::channel::Channel;
        assert_eq!(Queries::generate(&mut a, 8, 4), Queries::generate(&mut b, 8, 4));
    }
}
