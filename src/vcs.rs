//! Merkle commitment over mixed-log-size columns, the vector-commitment scheme each FRI
//! layer uses to bind its coordinate columns before folding.

use alloc::collections::{BTreeMap, BTreeSet};
use alloc::vec::Vec;

use crate::channel::MerkleHasher;
use crate::fields::m31::BaseField;
use crate::types::commitment::MerkleDecommitment;

fn group_by_log_size<'a>(columns: &[&'a [BaseField]]) -> BTreeMap<u32, Vec<&'a [BaseField]>> {
    let mut grouped: BTreeMap<u32, Vec<&[BaseField]>> = BTreeMap::new();
    for &col in columns {
        assert!(col.len().is_power_of_two(), "Merkle columns must have power-of-two length");
        grouped.entry(col.len().trailing_zeros()).or_default().push(col);
    }
    grouped
}

/// `RootMismatch` means every witness/value was consistent in shape but the recomputed
/// root didn't match; `InsufficientWitness` means the witness ran out (or had leftovers)
/// while reconstructing a layer. The caller maps these to the layer-specific
/// [`crate::types::error::FriVerificationError`] variant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MerkleVerificationError {
    InsufficientWitness,
    RootMismatch,
}

/// Builds the full Merkle tree over a set of mixed-log-size columns and can later produce
/// a decommitment for any subset of queried positions.
#[derive(Clone, Debug)]
pub struct MerkleProver<H: MerkleHasher> {
    /// Node hashes by log_size; `layers[&0]` holds the single root hash.
    layers: BTreeMap<u32, Vec<H::Hash>>,
    pub column_log_sizes: Vec<u32>,
}

impl<H: MerkleHasher> MerkleProver<H> {
    pub fn commit(columns: &[&[BaseField]]) -> Self {
        log::trace!("Merkle commit over {} columns", columns.len());
        let column_log_sizes = columns.iter().map(|c| c.len().trailing_zeros()).collect();
        let grouped = group_by_log_size(columns);
        let mut layers: BTreeMap<u32, Vec<H::Hash>> = BTreeMap::new();

        let Some((&max_log_size, _)) = grouped.iter().next_back() else {
            layers.insert(0, alloc::vec![H::hash_node(None, &[])]);
            return Self { layers, column_log_sizes };
        };

        let empty: Vec<&[BaseField]> = Vec::new();
        for layer_log_size in (0..=max_log_size).rev() {
            let layer_columns = grouped.get(&layer_log_size).unwrap_or(&empty);
            let n_nodes = 1usize << layer_log_size;
            let mut hashes = Vec::with_capacity(n_nodes);
            for index in 0..n_nodes {
                let children = layers
                    .get(&(layer_log_size + 1))
                    .map(|child_layer| (child_layer[index * 2], child_layer[index * 2 + 1]));
                let values: Vec<BaseField> = layer_columns.iter().map(|col| col[index]).collect();
                hashes.push(H::hash_node(children, &values));
            }
            layers.insert(layer_log_size, hashes);
        }
        Self { layers, column_log_sizes }
    }

    pub fn root(&self) -> H::Hash {
        self.layers[&0][0]
    }

    /// Returns the queried base-field values (in the order Merkle walks queried columns,
    /// largest log size first, ascending position within each) and the witness needed to
    /// let a verifier recompute the root from them alone.
    pub fn decommit(
        &self,
        queries_per_log_size: &BTreeMap<u32, Vec<usize>>,
        columns: &[&[BaseField]],
    ) -> (Vec<BaseField>, MerkleDecommitment<H>) {
        let grouped = group_by_log_size(columns);
        let Some(&max_log_size) = self.layers.keys().next_back() else {
            return (Vec::new(), MerkleDecommitment::default());
        };

        let mut queried_values = Vec::new();
        let mut hash_witness = Vec::new();
        let mut column_witness = Vec::new();
        let mut prev_required: BTreeSet<usize> = BTreeSet::new();
        let empty: Vec<&[BaseField]> = Vec::new();
        let empty_queries: Vec<usize> = Vec::new();

        for layer_log_size in (0..=max_log_size).rev() {
            let layer_columns = grouped.get(&layer_log_size).unwrap_or(&empty);
            let this_layer_queries = queries_per_log_size.get(&layer_log_size).unwrap_or(&empty_queries);
            let mut required: BTreeSet<usize> = this_layer_queries.iter().copied().collect();
            for &r in &prev_required {
                required.insert(r / 2);
            }

            let child_layer = self.layers.get(&(layer_log_size + 1));
            for &node_index in &required {
                let is_query = this_layer_queries.binary_search(&node_index).is_ok();

                if let Some(children) = child_layer {
                    for child in [node_index * 2, node_index * 2 + 1] {
                        if !prev_required.contains(&child) {
                            hash_witness.push(children[child]);
                        }
                    }
                }

                if is_query {
                    for col in layer_columns {
                        queried_values.push(col[node_index]);
                    }
                } else {
                    for col in layer_columns {
                        column_witness.push(col[node_index]);
                    }
                }
            }
            prev_required = required;
        }

        (queried_values, MerkleDecommitment { hash_witness, column_witness })
    }
}

/// Verifies a decommitment against a previously-observed root, without ever holding the
/// full tree.
#[derive(Clone, Debug)]
pub struct MerkleVerifier<H: MerkleHasher> {
    pub commitment: H::Hash,
    pub column_log_sizes: Vec<u32>,
    n_columns_per_log_size: BTreeMap<u32, usize>,
}

impl<H: MerkleHasher> MerkleVerifier<H> {
    pub fn new(commitment: H::Hash, column_log_sizes: Vec<u32>) -> Self {
        let mut n_columns_per_log_size = BTreeMap::new();
        for &log_size in &column_log_sizes {
            *n_columns_per_log_size.entry(log_size).or_insert(0) += 1;
        }
        Self { commitment, column_log_sizes, n_columns_per_log_size }
    }

    pub fn verify(
        &self,
        queries_per_log_size: &BTreeMap<u32, Vec<usize>>,
        queried_values: &[BaseField],
        decommitment: MerkleDecommitment<H>,
    ) -> Result<(), MerkleVerificationError> {
        let Some(&max_log_size) = self.column_log_sizes.iter().max() else {
            let empty_hash = H::hash_node(None, &[]);
            return if self.commitment == empty_hash && queried_values.is_empty() {
                Ok(())
            } else {
                Err(MerkleVerificationError::RootMismatch)
            };
        };

        let mut queried_values_iter = queried_values.iter().copied();
        let mut hash_witness_iter = decommitment.hash_witness.into_iter();
        let mut column_witness_iter = decommitment.column_witness.into_iter();

        let mut layer_hashes: BTreeMap<usize, H::Hash> = BTreeMap::new();
        let mut prev_required: BTreeSet<usize> = BTreeSet::new();
        let empty_queries: Vec<usize> = Vec::new();

        for layer_log_size in (0..=max_log_size).rev() {
            let n_columns_in_layer = *self.n_columns_per_log_size.get(&layer_log_size).unwrap_or(&0);
            let this_layer_queries = queries_per_log_size.get(&layer_log_size).unwrap_or(&empty_queries);
            let mut required: BTreeSet<usize> = this_layer_queries.iter().copied().collect();
            for &r in &prev_required {
                required.insert(r / 2);
            }

            let mut next_layer_hashes = BTreeMap::new();
            for &node_index in &required {
                let children = if layer_log_size == max_log_size {
                    None
                } else {
                    let mut child_hash = |child: usize| -> Result<H::Hash, MerkleVerificationError> {
                        match layer_hashes.get(&child) {
                            Some(h) => Ok(*h),
                            None => hash_witness_iter.next().ok_or(MerkleVerificationError::InsufficientWitness),
                        }
                    };
                    Some((child_hash(node_index * 2)?, child_hash(node_index * 2 + 1)?))
                };

                let is_query = this_layer_queries.binary_search(&node_index).is_ok();
                let mut values = Vec::with_capacity(n_columns_in_layer);
                if is_query {
                    for _ in 0..n_columns_in_layer {
                        values.push(
                            queried_values_iter.next().ok_or(MerkleVerificationError::InsufficientWitness)?,
                        );
                    }
                } else {
                    for _ in 0..n_columns_in_layer {
                        values.push(
                            column_witness_iter.next().ok_or(MerkleVerificationError::InsufficientWitness)?,
                        );
                    }
                }

                next_layer_hashes.insert(node_index, H::hash_node(children, &values));
            }
            layer_hashes = next_layer_hashes;
            prev_required = required;
        }

        if hash_witness_iter.next().is_some()
            || column_witness_iter.next().is_some()
            || queried_values_iter.next().is_some()
        {
            return Err(MerkleVerificationError::InsufficientWitness);
        }
        if layer_hashes.len() != 1 || layer_hashes.get(&0) != Some(&self.commitment) {
            return Err(MerkleVerificationError::RootMismatch);
        }
        Ok(())
    }
}
