//! The Fiat-Shamir contract FRI is driven through, plus the one concrete hash family
//! (Blake2s) this crate ships so the prover and verifier have something to instantiate
//! against in tests. Everything above this module talks to `Channel`/`MerkleChannel`
//! abstractly; swapping in Poseidon252 or another hash means adding another impl here.

use alloc::vec::Vec;
use core::fmt::Debug;

use blake2::{Blake2s256, Digest};

use crate::fields::m31::{BaseField, M31};
use crate::fields::qm31::SecureField;

/// Hashes Merkle tree nodes from their children (if any) and the base-field column values
/// attached to that node.
pub trait MerkleHasher: Default + Clone {
    type Hash: Copy + Clone + Debug + Default + Eq + AsRef<[u8]>;

    fn hash_node(children_hashes: Option<(Self::Hash, Self::Hash)>, column_values: &[BaseField]) -> Self::Hash;
}

/// A stateful Fiat-Shamir oracle. Every `mix_*`/`draw_*` call advances internal state
/// monotonically, so replaying the same sequence on prover and verifier reproduces the
/// exact same transcript.
pub trait Channel: Default + Clone + Debug {
    const BYTES_PER_HASH: usize;

    /// Number of trailing zero bits in the channel's digest, surfaced for proof-of-work
    /// grinding. Not consulted by FRI itself.
    fn trailing_zeros(&self) -> u32;

    fn mix_felts(&mut self, felts: &[SecureField]);
    fn mix_u64(&mut self, value: u64);

    fn draw_felt(&mut self) -> BaseField;
    fn draw_secure_felt(&mut self) -> SecureField {
        SecureField::from_m31_array([
            self.draw_felt(),
            self.draw_felt(),
            self.draw_felt(),
            self.draw_felt(),
        ])
    }

    fn draw_felts(&mut self, n_felts: usize) -> Vec<SecureField> {
        (0..n_felts).map(|_| self.draw_secure_felt()).collect()
    }

    fn draw_random_bytes(&mut self) -> Vec<u8>;
}

/// Binds a `Channel` to a `MerkleHasher`: the sole coupling between the two, needed
/// because mixing a Merkle root into the transcript requires knowing its byte shape.
pub trait MerkleChannel: Default {
    type C: Channel;
    type H: MerkleHasher;

    fn mix_root(channel: &mut Self::C, root: <Self::H as MerkleHasher>::Hash);
}

#[derive(Clone, Default, Debug)]
pub struct Blake2sMerkleHasher;

impl MerkleHasher for Blake2sMerkleHasher {
    type Hash = [u8; 32];

    fn hash_node(children_hashes: Option<(Self::Hash, Self::Hash)>, column_values: &[BaseField]) -> Self::Hash {
        let mut hasher = Blake2s256::new();
        if let Some((left, right)) = children_hashes {
            hasher.update(left);
            hasher.update(right);
        }
        for value in column_values {
            hasher.update(value.to_bytes());
        }
        hasher.finalize().into()
    }
}

#[derive(Clone, Debug)]
pub struct Blake2sChannel {
    digest: [u8; 32],
    channel_time_n_challenges: u64,
}

impl Default for Blake2sChannel {
    fn default() -> Self {
        Self { digest: [0u8; 32], channel_time_n_challenges: 0 }
    }
}

impl Blake2sChannel {
    pub fn new(seed: &[u8]) -> Self {
        let mut channel = Self::default();
        let mut hasher = Blake2s256::new();
        hasher.update(seed);
        channel.digest.copy_from_slice(&hasher.finalize());
        channel
    }

    fn mix_digest(&mut self, bytes: &[u8]) {
        let mut hasher = Blake2s256::new();
        hasher.update(self.digest);
        hasher.update(bytes);
        self.digest.copy_from_slice(&hasher.finalize());
        self.channel_time_n_challenges += 1;
    }
}

impl Channel for Blake2sChannel {
    const BYTES_PER_HASH: usize = 32;

    fn trailing_zeros(&self) -> u32 {
        let mut count = 0u32;
        for &byte in self.digest.iter().rev() {
            if byte == 0 {
                count += 8;
            } else {
                count += byte.trailing_zeros();
                break;
            }
        }
        count
    }

    fn mix_felts(&mut self, felts: &[SecureField]) {
        let mut bytes = Vec::with_capacity(felts.len() * 16);
        for felt in felts {
            for coord in felt.to_m31_array() {
                bytes.extend_from_slice(&coord.to_bytes());
            }
        }
        self.mix_digest(&bytes);
    }

    fn mix_u64(&mut self, value: u64) {
        self.mix_digest(&value.to_le_bytes());
    }

    fn draw_felt(&mut self) -> BaseField {
        self.mix_digest(&self.channel_time_n_challenges.to_le_bytes());
        let bytes: [u8; 4] = self.digest[..4].try_into().unwrap();
        M31::from(u32::from_le_bytes(bytes))
    }

    fn draw_random_bytes(&mut self) -> Vec<u8> {
        self.mix_digest(&self.channel_time_n_challenges.to_le_bytes());
        self.digest.to_vec()
    }
}

#[derive(Clone, Default, Debug)]
pub struct Blake2sMerkleChannel;

impl MerkleChannel for Blake2sMerkleChannel {
    type C = Blake2sChannel;
    type H = Blake2sMerkleHasher;

    fn mix_root(channel: &mut Self::C, root: <Self::H as MerkleHasher>::Hash) {
        channel.mix_digest(&root);
    }
}
