use alloc::vec::Vec;
use core::fmt::Debug;

use crate::channel::MerkleHasher;
use crate::fields::m31::BaseField;

/// The minimal set of sibling hashes and unqueried leaf values the verifier needs to
/// recompute a Merkle root from the queried leaves alone.
#[derive(Clone, Debug)]
pub struct MerkleDecommitment<H: MerkleHasher> {
    pub hash_witness: Vec<H::Hash>,
    pub column_witness: Vec<BaseField>,
}

impl<H: MerkleHasher> Default for MerkleDecommitment<H> {
    fn default() -> Self {
        Self { hash_witness: Vec::new(), column_witness: Vec::new() }
    }
}
