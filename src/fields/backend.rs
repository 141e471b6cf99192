use alloc::vec::Vec;
use core::cmp::{Eq, Ord, PartialEq, PartialOrd};
use core::hash::Hash;
use core::marker::PhantomData;
use num_traits::Zero;
use serde::{Deserialize, Serialize};

use crate::utils::bit_reverse_index;

/// Seam for SIMD/GPU column storage. A conforming backend only needs to allocate columns
/// of a fixed field type and support bit-reversal in place; everything above this layer
/// is written against [`Col`] and never touches a concrete backend directly.
pub trait ColumnOps<F: Zero + Clone + Copy>: Clone {
    fn zeros(len: usize) -> Self;
    /// # Safety
    /// Every index must be written before it is read.
    unsafe fn uninitialized(len: usize) -> Self;
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool;
    fn at(&self, index: usize) -> F;
    fn set(&mut self, index: usize, value: F);
    fn to_cpu(&self) -> Col<CpuBackend<F>, F>;
    fn bit_reverse_column(col: &mut Self);
}

/// A column of field elements over some [`ColumnOps`] backend.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Col<B: ColumnOps<F>, F: Zero + Clone + Copy> {
    backend: B,
    _phantom: PhantomData<F>,
}

impl<B: ColumnOps<F>, F: Zero + Clone + Copy> Col<B, F> {
    pub fn zeros(len: usize) -> Self {
        Self {
            backend: B::zeros(len),
            _phantom: PhantomData,
        }
    }

    /// # Safety
    /// Every index must be written before it is read.
    pub unsafe fn uninitialized(len: usize) -> Self {
        Self {
            backend: B::uninitialized(len),
            _phantom: PhantomData,
        }
    }

    pub fn from_vec(values: Vec<F>) -> Self
    where
        B: From<Vec<F>>,
    {
        Self {
            backend: B::from(values),
            _phantom: PhantomData,
        }
    }

    pub fn len(&self) -> usize {
        self.backend.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backend.is_empty()
    }

    pub fn at(&self, index: usize) -> F {
        self.backend.at(index)
    }

    pub fn set(&mut self, index: usize, value: F) {
        self.backend.set(index, value);
    }

    pub fn to_cpu(&self) -> Col<CpuBackend<F>, F> {
        self.backend.to_cpu()
    }

    pub fn bit_reverse(&mut self) {
        B::bit_reverse_column(&mut self.backend);
    }
}

impl<B: ColumnOps<F>, F: Zero + Clone + Copy + Serialize> Serialize for Col<B, F> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut values = Vec::with_capacity(self.len());
        for i in 0..self.len() {
            values.push(self.at(i));
        }
        values.serialize(serializer)
    }
}

impl<'de, B: ColumnOps<F>, F: Zero + Clone + Copy + Deserialize<'de>> Deserialize<'de> for Col<B, F> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let values = Vec::<F>::deserialize(deserializer)?;
        let mut col = unsafe { Self::uninitialized(values.len()) };
        for (i, value) in values.into_iter().enumerate() {
            col.set(i, value);
        }
        Ok(col)
    }
}

/// The single CPU backend this crate ships. A SIMD/GPU backend would implement the same
/// [`ColumnOps`] contract and could be swapped in without touching `fri.rs` or `vcs.rs`.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct CpuBackend<F: Zero + Clone + Copy> {
    values: Vec<F>,
}

impl<F: Zero + Clone + Copy> From<Vec<F>> for CpuBackend<F> {
    fn from(values: Vec<F>) -> Self {
        Self { values }
    }
}

impl<F: Zero + Clone + Copy> ColumnOps<F> for CpuBackend<F> {
    fn zeros(len: usize) -> Self {
        Self {
            values: alloc::vec![F::zero(); len],
        }
    }

    unsafe fn uninitialized(len: usize) -> Self {
        let mut values = Vec::with_capacity(len);
        values.set_len(len);
        Self { values }
    }

    fn len(&self) -> usize {
        self.values.len()
    }

    fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn at(&self, index: usize) -> F {
        self.values[index]
    }

    fn set(&mut self, index: usize, value: F) {
        self.values[index] = value;
    }

    fn to_cpu(&self) -> Col<CpuBackend<F>, F> {
        Col {
            backend: self.clone(),
            _phantom: PhantomData,
        }
    }

    fn bit_reverse_column(col: &mut Self) {
        bit_reverse_in_place(&mut col.values);
    }
}

/// In-place bit-reversal permutation. Fails (debug-asserts) on non-power-of-two length,
/// as required for the index math to be well-defined.
pub fn bit_reverse_in_place<T>(v: &mut [T]) {
    let n = v.len();
    assert!(n.is_power_of_two(), "bit_reverse_in_place: length must be a power of two");
    let log_n = n.trailing_zeros();
    for i in 0..n {
        let j = bit_reverse_index(i, log_n);
        if j > i {
            v.swap(i, j);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn bit_reverse_is_involution() {
        let original = vec![0, 1, 2, 3, 4, 5, 6, 7];
        let mut v = original.clone();
        bit_reverse_in_place(&mut v);
        bit_reverse_in_place(&mut v);
        assert_eq!(v, original);
    }

    #[test]
    #[should_panic]
    fn bit_reverse_rejects_non_power_of_two() {
        let mut v = vec![0, 1, 2];
        bit_reverse_in_place(&mut v);
    }
}
