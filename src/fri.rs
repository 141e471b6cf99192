//! The FRI commit/decommit/verify protocol itself: layered folding of circle/line
//! evaluations, bound to a Merkle commitment per layer and driven by a Fiat-Shamir channel.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;
use core::marker::PhantomData;

use num_traits::Zero;

use crate::channel::{Channel, MerkleChannel, MerkleHasher};
use crate::circle::{CanonicCoset, CircleDomain, Coset};
use crate::fields::backend::CpuBackend;
use crate::fields::m31::{BaseField, M31};
use crate::fields::qm31::SecureField;
use crate::fields::secure_column::SecureColumnByCoords;
use crate::fields::FieldExpOps;
use crate::fri_utils::{
    compute_decommitment_positions_and_rebuild_evals, expand_to_cosets, fold_circle_into_line, fold_line,
    CIRCLE_TO_LINE_FOLD_STEP, FOLD_STEP,
};
use crate::line::LineDomain;
use crate::queries::Queries;
use crate::types::commitment::MerkleDecommitment;
use crate::types::error::FriVerificationError;
use crate::types::fri::{FriCirclePolyDegreeBound, FriConfig, FriLayerProof, FriLinePolyDegreeBound, FriProof};
use crate::types::poly::{LineEvaluation, SecureEvaluation};
use crate::utils::bit_reverse_index;
use crate::vcs::{MerkleProver, MerkleVerifier};

fn coordinate_columns<B: crate::fields::backend::ColumnOps<M31>>(values: &SecureColumnByCoords<B>) -> [Vec<M31>; 4] {
    core::array::from_fn(|i| (0..values.columns[i].len()).map(|j| values.columns[i].at(j)).collect())
}

/// Builds the base-field coordinate columns of every input column (4 per column, in order)
/// so they can be handed to [`MerkleProver::commit`] as one combined tree.
fn flatten_first_layer_columns(columns: &[SecureEvaluation<CpuBackend<M31>>]) -> Vec<Vec<M31>> {
    let mut flat = Vec::with_capacity(columns.len() * 4);
    for column in columns {
        for coord in coordinate_columns(&column.values) {
            flat.push(coord);
        }
    }
    flat
}

fn refs_of<'a>(columns: &'a [Vec<M31>]) -> Vec<&'a [M31]> {
    columns.iter().map(Vec::as_slice).collect()
}

/// For every position needed (query positions expanded to their fold coset), splits the
/// known values into the ones the verifier will already know (queries, dropped) and the
/// ones it needs as witness, in ascending-position order.
fn split_witness(positions: &[usize], queries: &[usize], value_at: impl Fn(usize) -> SecureField) -> Vec<SecureField> {
    let mut witness = Vec::new();
    for &pos in positions {
        if queries.binary_search(&pos).is_err() {
            witness.push(value_at(pos));
        }
    }
    witness
}

/// Drives the layered-folding commit phase: one Merkle tree per layer, one Fiat-Shamir
/// draw per fold. `commit` runs the whole folding loop eagerly; `decommit` only needs to
/// sample queries and extract witnesses from the already-folded layers it kept around.
pub struct FriProver<MC: MerkleChannel> {
    config: FriConfig,
    columns: Vec<SecureEvaluation<CpuBackend<M31>>>,
    first_layer_merkle: MerkleProver<MC::H>,
    inner_layers: Vec<(LineEvaluation<CpuBackend<M31>>, MerkleProver<MC::H>)>,
    last_layer_poly: crate::types::poly::LinePoly,
    _phantom: PhantomData<MC>,
}

impl<MC: MerkleChannel> FriProver<MC> {
    /// # Panics
    /// On any constructive precondition violation: no columns, non-canonic domain,
    /// non-decreasing column sizes, a column smaller than `config.last_layer_domain_size()`,
    /// leftover unconsumed columns, or a last layer whose tail coefficients aren't zero.
    pub fn commit(
        channel: &mut MC::C,
        config: FriConfig,
        columns: Vec<SecureEvaluation<CpuBackend<M31>>>,
        _twiddles: (),
    ) -> Self {
        assert!(!columns.is_empty(), "no columns");
        for column in &columns {
            assert!(column.domain.is_canonic(), "not canonic");
            assert!(column.len() >= config.last_layer_domain_size(), "column smaller than last layer");
        }
        for pair in columns.windows(2) {
            assert!(pair[0].len() > pair[1].len(), "column sizes not decreasing");
        }

        log::debug!("FRI commit: {} columns, last layer domain size {}", columns.len(), config.last_layer_domain_size());

        let flat_columns = flatten_first_layer_columns(&columns);
        let first_layer_merkle = MerkleProver::<MC::H>::commit(&refs_of(&flat_columns));
        MC::mix_root(channel, first_layer_merkle.root());

        let alpha_0 = channel.draw_secure_felt();

        let first_domain = LineDomain::new(columns[0].domain.half_coset);
        let mut layer_eval = LineEvaluation::zero(first_domain);
        fold_circle_into_line(&mut layer_eval, &columns[0], alpha_0);

        let mut inner_layers = Vec::new();
        let mut next_column_index = 1;
        let mut current_alpha = alpha_0;

        // Any other first-layer column whose line-degree bound already matches this domain
        // merges in here, before it's ever committed as an inner layer.
        if let Some(next_column) = columns.get(next_column_index) {
            if next_column.len() >> CIRCLE_TO_LINE_FOLD_STEP == layer_eval.len() {
                fold_circle_into_line(&mut layer_eval, next_column, current_alpha);
                next_column_index += 1;
            }
        }

        while layer_eval.len() > config.last_layer_domain_size() {
            log::trace!("FRI folding inner layer of size {}", layer_eval.len());
            let coord_columns = coordinate_columns(&layer_eval.values);
            let merkle = MerkleProver::<MC::H>::commit(&refs_of(&coord_columns));
            MC::mix_root(channel, merkle.root());
            let committed_eval = layer_eval;

            let alpha_k = channel.draw_secure_felt();
            layer_eval = fold_line(&committed_eval, alpha_k);
            inner_layers.push((committed_eval, merkle));

            current_alpha = alpha_k;
            if let Some(next_column) = columns.get(next_column_index) {
                if next_column.len() >> CIRCLE_TO_LINE_FOLD_STEP == layer_eval.len() {
                    fold_circle_into_line(&mut layer_eval, next_column, current_alpha);
                    next_column_index += 1;
                }
            }
        }
        assert_eq!(next_column_index, columns.len(), "unconsumed columns");
        assert_eq!(layer_eval.len(), config.last_layer_domain_size());

        let full_poly = layer_eval.interpolate();
        let keep = 1usize << config.log_last_layer_degree_bound;
        assert!(
            full_poly.coeffs()[keep..].iter().all(|c| c.is_zero()),
            "invalid degree: last layer has nonzero high coefficients"
        );
        let last_layer_poly = crate::types::poly::LinePoly::new(full_poly.coeffs()[..keep].to_vec());
        channel.mix_felts(last_layer_poly.coeffs());

        Self { config, columns, first_layer_merkle, inner_layers, last_layer_poly, _phantom: PhantomData }
    }

    pub fn decommit(self, channel: &mut MC::C) -> (FriProof<MC::H>, BTreeMap<u32, Vec<usize>>) {
        let max_log_size = self.columns[0].domain.log_size();
        let queries = Queries::generate(channel, max_log_size, self.config.n_queries);
        log::debug!("FRI decommit: {} queries over {} inner layers", queries.positions.len(), self.inner_layers.len());

        let mut query_positions_by_log_size = BTreeMap::new();
        for column in &self.columns {
            let log_size = column.domain.log_size();
            query_positions_by_log_size
                .entry(log_size)
                .or_insert_with(|| queries.fold(max_log_size - log_size).positions);
        }
        for (layer_eval, _) in &self.inner_layers {
            let log_size = layer_eval.domain.log_size();
            query_positions_by_log_size
                .entry(log_size)
                .or_insert_with(|| queries.fold(max_log_size - log_size).positions);
        }

        // First layer: one Merkle tree shared by all input columns' coordinate columns.
        let mut merkle_queries_per_log_size: BTreeMap<u32, Vec<usize>> = BTreeMap::new();
        let mut fri_witness = Vec::new();
        for column in &self.columns {
            let log_size = column.domain.log_size();
            let col_queries = &query_positions_by_log_size[&log_size];
            let positions = expand_to_cosets(col_queries, CIRCLE_TO_LINE_FOLD_STEP);
            fri_witness.extend(split_witness(&positions, col_queries, |p| column.values.at(p)));
            merkle_queries_per_log_size.insert(log_size, positions);
        }
        let flat_columns = flatten_first_layer_columns(&self.columns);
        let (_, decommitment) =
            self.first_layer_merkle.decommit(&merkle_queries_per_log_size, &refs_of(&flat_columns));
        let first_layer =
            FriLayerProof { fri_witness, decommitment, commitment: self.first_layer_merkle.root() };

        let mut inner_layer_proofs = Vec::new();
        for (layer_eval, merkle) in &self.inner_layers {
            let log_size = layer_eval.domain.log_size();
            let layer_queries = &query_positions_by_log_size[&log_size];
            let positions = expand_to_cosets(layer_queries, FOLD_STEP);
            let fri_witness = split_witness(&positions, layer_queries, |p| layer_eval.values.at(p));
            let coord_columns = coordinate_columns(&layer_eval.values);
            let mut queries_map = BTreeMap::new();
            queries_map.insert(log_size, positions);
            let (_, decommitment) = merkle.decommit(&queries_map, &refs_of(&coord_columns));
            inner_layer_proofs.push(FriLayerProof { fri_witness, decommitment, commitment: merkle.root() });
        }

        let proof = FriProof { first_layer, inner_layers: inner_layer_proofs, last_layer_poly: self.last_layer_poly };
        (proof, query_positions_by_log_size)
    }
}

struct FirstLayerMerge {
    target_log_size: u32,
    domain: CircleDomain,
    sparse: crate::queries::SparseEvaluation,
}

/// Reconstructs a verifier from a committed proof: `commit` replays the channel
/// interaction and checks the last-layer degree bound; `sample_query_positions` draws the
/// query set; `decommit` does the actual layer-by-layer Merkle/fold verification.
pub struct FriVerifier<MC: MerkleChannel> {
    config: FriConfig,
    column_bounds: Vec<FriCirclePolyDegreeBound>,
    column_commitment_domains: Vec<CircleDomain>,
    proof: FriProof<MC::H>,
    folding_alphas: Vec<SecureField>,
    inner_layer_domains: Vec<LineDomain>,
    last_layer_domain: LineDomain,
    queries: Option<Queries>,
    _phantom: PhantomData<MC>,
}

impl<MC: MerkleChannel> FriVerifier<MC> {
    pub fn commit(
        channel: &mut MC::C,
        config: FriConfig,
        proof: FriProof<MC::H>,
        column_bounds: Vec<FriCirclePolyDegreeBound>,
    ) -> Result<Self, FriVerificationError> {
        assert!(!column_bounds.is_empty(), "no columns");
        assert!(
            column_bounds.windows(2).all(|w| w[0].log_degree_bound >= w[1].log_degree_bound),
            "column_bounds must be sorted non-increasing"
        );

        MC::mix_root(channel, proof.first_layer.commitment);
        let alpha_0 = channel.draw_secure_felt();

        let column_commitment_domains: Vec<CircleDomain> = column_bounds
            .iter()
            .map(|b| CanonicCoset::new(b.log_degree_bound + config.log_blowup_factor).circle_domain())
            .collect();

        let mut folding_alphas = alloc::vec![alpha_0];
        let mut inner_layer_domains = Vec::new();

        let mut layer_bound = column_bounds[0].fold_to_line();
        let mut layer_domain = LineDomain::new(Coset::half_odds(layer_bound.log_degree_bound + config.log_blowup_factor));

        for inner_layer_proof in &proof.inner_layers {
            MC::mix_root(channel, inner_layer_proof.commitment);
            let alpha_k = channel.draw_secure_felt();
            inner_layer_domains.push(layer_domain);
            folding_alphas.push(alpha_k);

            layer_bound = layer_bound.fold(FOLD_STEP).ok_or(FriVerificationError::InvalidNumFriLayers)?;
            layer_domain = layer_domain.double();
        }

        if layer_bound.log_degree_bound != config.log_last_layer_degree_bound {
            return Err(FriVerificationError::InvalidNumFriLayers);
        }
        if proof.last_layer_poly.len() > (1usize << config.log_last_layer_degree_bound) {
            return Err(FriVerificationError::LastLayerDegreeInvalid);
        }

        channel.mix_felts(proof.last_layer_poly.coeffs());

        Ok(Self {
            config,
            column_bounds,
            column_commitment_domains,
            proof,
            folding_alphas,
            inner_layer_domains,
            last_layer_domain: layer_domain,
            queries: None,
            _phantom: PhantomData,
        })
    }

    pub fn sample_query_positions(&mut self, channel: &mut MC::C) -> BTreeMap<u32, Vec<usize>> {
        let max_log_size = self.column_commitment_domains.iter().map(|d| d.log_size()).max().unwrap();
        let queries = Queries::generate(channel, max_log_size, self.config.n_queries);

        let mut result = BTreeMap::new();
        for domain in &self.column_commitment_domains {
            let log_size = domain.log_size();
            result.entry(log_size).or_insert_with(|| queries.fold(max_log_size - log_size).positions);
        }
        for domain in &self.inner_layer_domains {
            let log_size = domain.log_size();
            result.entry(log_size).or_insert_with(|| queries.fold(max_log_size - log_size).positions);
        }
        self.queries = Some(queries);
        result
    }

    pub fn decommit(self, first_layer_query_evals: Vec<Vec<SecureField>>) -> Result<(), FriVerificationError> {
        let queries = self.queries.expect("queries not sampled");
        let max_log_size = queries.log_domain_size;
        log::debug!("FRI verify: {} queries, {} inner layers", queries.positions.len(), self.proof.inner_layers.len());

        let mut fri_witness_iter = self.proof.first_layer.fri_witness.iter().copied();
        let mut merkle_queries_per_log_size: BTreeMap<u32, Vec<usize>> = BTreeMap::new();
        let mut queried_values_all: Vec<BaseField> = Vec::new();
        let mut column_log_sizes = Vec::new();
        let mut first_layer_merges = Vec::new();

        for (col_idx, bound) in self.column_bounds.iter().enumerate() {
            let domain = self.column_commitment_domains[col_idx];
            let log_size = domain.log_size();
            let col_queries = queries.fold(max_log_size - log_size);
            let query_evals = first_layer_query_evals
                .get(col_idx)
                .map(Vec::as_slice)
                .unwrap_or(&[]);

            let (decommitment_positions, sparse_eval) = compute_decommitment_positions_and_rebuild_evals(
                &col_queries,
                query_evals,
                &mut fri_witness_iter,
                CIRCLE_TO_LINE_FOLD_STEP,
            )
            .map_err(|_| FriVerificationError::FirstLayerEvaluationsInvalid)?;

            for subset in &sparse_eval.subset_evals {
                for v in subset {
                    for coord in v.to_m31_array() {
                        queried_values_all.push(coord);
                    }
                }
            }
            for _ in 0..4 {
                column_log_sizes.push(log_size);
            }
            merkle_queries_per_log_size.insert(log_size, decommitment_positions);

            let target_log_size = bound.fold_to_line().log_degree_bound + self.config.log_blowup_factor;
            first_layer_merges.push(FirstLayerMerge { target_log_size, domain, sparse: sparse_eval });
        }
        if fri_witness_iter.next().is_some() {
            return Err(FriVerificationError::FirstLayerEvaluationsInvalid);
        }

        let first_layer_verifier = MerkleVerifier::<MC::H>::new(self.proof.first_layer.commitment, column_log_sizes);
        first_layer_verifier
            .verify(&merkle_queries_per_log_size, &queried_values_all, self.proof.first_layer.decommitment.clone())
            .map_err(|_| FriVerificationError::FirstLayerCommitmentInvalid)?;

        let first_domain = *self.inner_layer_domains.first().unwrap_or(&self.last_layer_domain);
        let mut layer_queries = queries.fold(max_log_size - first_domain.log_size());
        let mut layer_query_evals = alloc::vec![SecureField::zero(); layer_queries.positions.len()];

        for k in 0..=self.proof.inner_layers.len() {
            let layer_domain =
                if k < self.inner_layer_domains.len() { self.inner_layer_domains[k] } else { self.last_layer_domain };
            let merge_alpha = self.folding_alphas[k];

            for merge in &first_layer_merges {
                if merge.target_log_size == layer_domain.log_size() {
                    let folded_column = merge.sparse.fold_circle(merge_alpha, merge.domain);
                    let alpha_sq = merge_alpha.square();
                    for (acc, v) in layer_query_evals.iter_mut().zip(folded_column.iter()) {
                        *acc = *acc * alpha_sq + *v;
                    }
                }
            }

            if k == self.proof.inner_layers.len() {
                break;
            }

            let inner_proof = &self.proof.inner_layers[k];
            let (decommitment_positions, sparse) = compute_decommitment_positions_and_rebuild_evals(
                &layer_queries,
                &layer_query_evals,
                inner_proof.fri_witness.iter().copied(),
                FOLD_STEP,
            )
            .map_err(|_| FriVerificationError::InnerLayerEvaluationsInvalid { layer_index: k })?;

            let mut queried_vals_k = Vec::new();
            for subset in &sparse.subset_evals {
                for v in subset {
                    for coord in v.to_m31_array() {
                        queried_vals_k.push(coord);
                    }
                }
            }
            let mut queries_map = BTreeMap::new();
            queries_map.insert(layer_domain.log_size(), decommitment_positions);
            let verifier_k =
                MerkleVerifier::<MC::H>::new(inner_proof.commitment, alloc::vec![layer_domain.log_size(); 4]);
            verifier_k
                .verify(&queries_map, &queried_vals_k, inner_proof.decommitment.clone())
                .map_err(|_| FriVerificationError::InnerLayerCommitmentInvalid { layer_index: k })?;

            let fold_alpha = self.folding_alphas[k + 1];
            layer_query_evals = sparse.fold_line(fold_alpha, layer_domain);
            layer_queries = layer_queries.fold(FOLD_STEP);
        }

        for (i, &q) in layer_queries.positions.iter().enumerate() {
            let domain_index = bit_reverse_index(q, self.last_layer_domain.log_size());
            let x = self.last_layer_domain.at(domain_index);
            let expected = self.proof.last_layer_poly.eval_at_point(SecureField::from(x));
            if expected != layer_query_evals[i] {
                return Err(FriVerificationError::LastLayerEvaluationsInvalid);
            }
        }

        Ok(())
    }
}
