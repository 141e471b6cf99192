#![no_std]

extern crate alloc;

pub mod channel;
pub mod circle;
pub mod fields;
pub mod fri;
pub mod fri_utils;
pub mod fft_utils;
pub mod line;
pub mod queries;
pub mod serde_utils;
pub mod types;
pub mod utils;
pub mod vcs;

pub const SECURE_EXTENSION_DEGREE: usize = 4;

pub use channel::{Blake2sChannel, Blake2sMerkleChannel, Blake2sMerkleHasher, Channel, MerkleChannel, MerkleHasher};
pub use circle::CirclePoint;
pub use fields::m31::BaseField;
pub use fields::qm31::SecureField;
pub use fri::{FriProver, FriVerifier};
pub use queries::Queries;
pub use types::commitment::MerkleDecommitment;
pub use types::error::FriVerificationError;
pub use types::fri::{FriCirclePolyDegreeBound, FriConfig, FriLinePolyDegreeBound, FriProof};
pub use types::poly::LinePoly;
pub use vcs::{MerkleProver, MerkleVerifier};