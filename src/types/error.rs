use thiserror_no_std::Error;

/// Verifier-side failures. Never thrown for control flow: every adversarial proof maps
/// to exactly one of these variants rather than a panic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum FriVerificationError {
    /// The number of inner layers in the proof doesn't match what `config` and the column
    /// bounds require.
    #[error("number of FRI layers does not match the config")]
    InvalidNumFriLayers,
    /// Witness too short or too long to reconstruct the first layer's queried cosets.
    #[error("first layer witness is inconsistent with the queries")]
    FirstLayerEvaluationsInvalid,
    /// Recomputed first-layer Merkle root doesn't match the committed one.
    #[error("first layer Merkle commitment is invalid")]
    FirstLayerCommitmentInvalid,
    /// Witness exhaustion or leftover while reconstructing inner layer `layer_index`.
    #[error("inner layer {layer_index} witness is inconsistent with the queries")]
    InnerLayerEvaluationsInvalid { layer_index: usize },
    /// Recomputed Merkle root for inner layer `layer_index` doesn't match the committed one.
    #[error("inner layer {layer_index} Merkle commitment is invalid")]
    InnerLayerCommitmentInvalid { layer_index: usize },
    /// `last_layer_poly` has more coefficients than `2^config.log_last_layer_degree_bound`.
    #[error("last layer polynomial exceeds the degree bound")]
    LastLayerDegreeInvalid,
    /// A query's folded evaluation disagrees with `last_layer_poly` at that point.
    #[error("last layer evaluation does not match a query")]
    LastLayerEvaluationsInvalid,
    /// Internal reconstruction signal: a witness ran out where a value was required. Always
    /// surfaced as the enclosing layer's `*EvaluationsInvalid` variant, never returned bare.
    #[error("witness exhausted during reconstruction")]
    InsufficientWitness,
}
