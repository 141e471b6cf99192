use alloc::vec::Vec;

use crate::channel::MerkleHasher;
use crate::fields::qm31::SecureField;
use crate::types::commitment::MerkleDecommitment;
use crate::types::poly::LinePoly;

/// Fixes the shape of a FRI instance: how many layers it needs and how many positions get
/// spot-checked.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FriConfig {
    pub log_last_layer_degree_bound: u32,
    pub log_blowup_factor: u32,
    pub n_queries: usize,
}

impl FriConfig {
    pub const LOG_LAST_LAYER_DEGREE_BOUND_MAX: u32 = 10;
    pub const LOG_BLOWUP_FACTOR_MIN: u32 = 1;
    pub const LOG_BLOWUP_FACTOR_MAX: u32 = 16;

    pub fn new(log_last_layer_degree_bound: u32, log_blowup_factor: u32, n_queries: usize) -> Self {
        assert!(log_last_layer_degree_bound <= Self::LOG_LAST_LAYER_DEGREE_BOUND_MAX);
        assert!((Self::LOG_BLOWUP_FACTOR_MIN..=Self::LOG_BLOWUP_FACTOR_MAX).contains(&log_blowup_factor));
        Self { log_last_layer_degree_bound, log_blowup_factor, n_queries }
    }

    pub fn security_bits(&self) -> u32 {
        self.log_blowup_factor * self.n_queries as u32
    }

    pub fn last_layer_domain_size(&self) -> usize {
        1 << (self.log_last_layer_degree_bound + self.log_blowup_factor)
    }
}

/// One committed FRI layer: the witness needed to fold it, and the Merkle decommitment
/// proving the witness (plus the queried values, carried alongside) is consistent with the
/// committed root.
#[derive(Clone, Debug)]
pub struct FriLayerProof<H: MerkleHasher> {
    pub fri_witness: Vec<SecureField>,
    pub decommitment: MerkleDecommitment<H>,
    pub commitment: H::Hash,
}

#[derive(Clone, Debug)]
pub struct FriProof<H: MerkleHasher> {
    pub first_layer: FriLayerProof<H>,
    pub inner_layers: Vec<FriLayerProof<H>>,
    pub last_layer_poly: LinePoly,
}

/// The log-degree bound of a single committed column, as seen by the verifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct FriCirclePolyDegreeBound {
    pub log_degree_bound: u32,
}

impl FriCirclePolyDegreeBound {
    pub fn new(log_degree_bound: u32) -> Self {
        Self { log_degree_bound }
    }

    /// The degree bound of the line polynomial obtained after the first (circle-to-line)
    /// fold: one less than the circle polynomial's.
    pub fn fold_to_line(&self) -> FriLinePolyDegreeBound {
        FriLinePolyDegreeBound { log_degree_bound: self.log_degree_bound - 1 }
    }
}

/// The log-degree bound of a line polynomial (post first fold).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct FriLinePolyDegreeBound {
    pub log_degree_bound: u32,
}

impl FriLinePolyDegreeBound {
    pub fn fold(&self, n_folds: u32) -> Option<Self> {
        self.log_degree_bound
            .checked_sub(n_folds)
            .map(|log_degree_bound| Self { log_degree_bound })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn security_bits_and_last_layer_domain_size() {
        let config = FriConfig::new(2, 3, 5);
        assert_eq!(config.security_bits(), 15);
        assert_eq!(config.last_layer_domain_size(), 1 << 5);
    }

    #[test]
    fn fold_to_line_then_fold_tracks_degree() {
        let bound = FriCirclePolyDegreeBound::new(6).fold_to_line();
        assert_eq!(bound.log_degree_bound, 5);
        assert_eq!(bound.fold(2).unwrap().log_degree_bound, 3);
        assert!(bound.fold(10).is_none());
    }
}
