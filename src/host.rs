//! Owned, dense row-major host storage.

use std::ops::{Index, IndexMut};

use halide_buffer_view::{
    checked_volume, offset_of, row_major_strides, with_slice_buffer, BufferError, BufferRef,
    HalideScalar, Result,
};

use crate::nested::NestedSeq;

/// Owned row-major array of rank `N`.
///
/// The managed-container counterpart of a scoped [`BufferRef`]: it owns its
/// storage and lends a descriptor over it through [`HostBuffer::with_buffer`].
#[derive(Clone, PartialEq)]
pub struct HostBuffer<T, const N: usize> {
    data: Vec<T>,
    shape: [usize; N],
}

impl<T: std::fmt::Debug, const N: usize> std::fmt::Debug for HostBuffer<T, N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostBuffer")
            .field("shape", &self.shape)
            .field("len", &self.data.len())
            .finish()
    }
}

fn volume(shape: &[usize]) -> Result<usize> {
    checked_volume(shape).ok_or(BufferError::OffsetOverflow)
}

impl<T: HalideScalar, const N: usize> HostBuffer<T, N> {
    /// Zero-filled buffer of the given shape.
    ///
    /// Fails with [`BufferError::OffsetOverflow`] if the element count
    /// overflows `usize`.
    pub fn zeros(shape: [usize; N]) -> Result<Self> {
        let total = volume(&shape)?;
        Ok(Self {
            data: vec![T::zero(); total],
            shape,
        })
    }

    /// Buffer with values produced by a function.
    ///
    /// The function is called with indices in row-major iteration order. An
    /// element count overflowing `usize` fails before `f` is ever called.
    pub fn from_fn(shape: [usize; N], mut f: impl FnMut([usize; N]) -> T) -> Result<Self> {
        let total = volume(&shape)?;
        let mut data = Vec::with_capacity(total);
        let mut idx = [0usize; N];
        for _ in 0..total {
            data.push(f(idx));
            for d in (0..N).rev() {
                idx[d] += 1;
                if idx[d] < shape[d] {
                    break;
                }
                idx[d] = 0;
            }
        }
        Ok(Self { data, shape })
    }

    /// Take ownership of row-major `data`; its length must equal the volume.
    pub fn from_vec(shape: [usize; N], data: Vec<T>) -> Result<Self> {
        let total = volume(&shape)?;
        if data.len() != total {
            return Err(BufferError::LengthMismatch {
                expected: total,
                found: data.len(),
            });
        }
        Ok(Self { data, shape })
    }

    /// Copy a nested sequence of depth `N` into owned storage.
    pub fn from_nested<S>(xs: &S) -> Result<Self>
    where
        S: NestedSeq<Scalar = T>,
    {
        if S::RANK != N {
            return Err(BufferError::RankMismatch {
                expected: N,
                found: S::RANK,
            });
        }
        let (shape, data) = xs.flatten()?;
        let shape = <[usize; N]>::try_from(shape.as_slice()).map_err(|_| {
            BufferError::RankMismatch {
                expected: N,
                found: shape.len(),
            }
        })?;
        Ok(Self { data, shape })
    }

    #[inline]
    pub fn shape(&self) -> [usize; N] {
        self.shape
    }

    pub fn strides(&self) -> Vec<isize> {
        row_major_strides(&self.shape)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn data(&self) -> &[T] {
        &self.data
    }

    #[inline]
    pub fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Contents as raw bytes, in the order the engine sees them.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.data)
    }

    pub fn into_vec(self) -> Vec<T> {
        self.data
    }

    fn flat_index(&self, index: &[usize; N]) -> usize {
        for (d, (&i, &extent)) in index.iter().zip(self.shape.iter()).enumerate() {
            assert!(
                i < extent,
                "index {} out of bounds for dim {} with extent {}",
                i,
                d,
                extent
            );
        }
        offset_of(index, &self.strides()) as usize
    }

    pub fn get(&self, index: [usize; N]) -> T {
        self.data[self.flat_index(&index)]
    }

    pub fn set(&mut self, index: [usize; N], value: T) {
        let i = self.flat_index(&index);
        self.data[i] = value;
    }

    /// Lend a descriptor over this storage for the duration of `f`.
    pub fn with_buffer<R, F>(&mut self, f: F) -> Result<R>
    where
        F: FnOnce(&mut BufferRef<'_, T, N>) -> R,
    {
        let strides = row_major_strides(&self.shape);
        with_slice_buffer(&mut self.data, &self.shape, &strides, f)
    }

    /// Copy the contents out as a nested sequence of depth `N`.
    pub fn to_nested<S>(&self) -> Result<S>
    where
        S: NestedSeq<Scalar = T>,
    {
        if S::RANK != N {
            return Err(BufferError::RankMismatch {
                expected: N,
                found: S::RANK,
            });
        }
        // SAFETY: dense row-major storage covers every in-bounds offset.
        Ok(unsafe { S::read_strided(self.data.as_ptr(), &self.shape, &self.strides()) })
    }
}

impl<T: HalideScalar, const N: usize> Index<[usize; N]> for HostBuffer<T, N> {
    type Output = T;

    fn index(&self, index: [usize; N]) -> &T {
        &self.data[self.flat_index(&index)]
    }
}

impl<T: HalideScalar, const N: usize> IndexMut<[usize; N]> for HostBuffer<T, N> {
    fn index_mut(&mut self, index: [usize; N]) -> &mut T {
        let i = self.flat_index(&index);
        &mut self.data[i]
    }
}
