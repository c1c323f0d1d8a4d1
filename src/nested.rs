//! Nested `Vec` representation of buffer contents.
//!
//! A rank-`r` buffer of `T` corresponds to `r` levels of `Vec` around `T`
//! (`Vec<Vec<f64>>` for rank 2, bare `T` for rank 0). Shapes are inferred
//! outer-to-inner from the first element at each level; siblings of a
//! different length are rejected as ragged.

use halide_buffer_view::{BufferError, BufferRef, HalideScalar, Result};

/// A host value that can be flattened into, and rebuilt from, a strided buffer.
pub trait NestedSeq: Sized {
    /// Element type at the innermost level.
    type Scalar: HalideScalar;

    /// Nesting depth (rank of the corresponding buffer).
    const RANK: usize;

    /// Push this level's length, then recurse into the first child.
    ///
    /// An empty sequence contributes extent 0 for itself and every level
    /// below it.
    fn infer_shape_into(&self, shape: &mut Vec<usize>);

    /// Append the scalars in row-major order, checking every level against
    /// `shape`. `depth` is the nesting level of `self`, used for errors.
    fn flatten_into(&self, shape: &[usize], depth: usize, out: &mut Vec<Self::Scalar>)
        -> Result<()>;

    /// Rebuild a value of the given shape by reading through `strides`.
    ///
    /// # Safety
    ///
    /// `ptr` must be valid for reads at every offset `Σ i_k * strides[k]`
    /// with `i_k < shape[k]`.
    unsafe fn read_strided(ptr: *const Self::Scalar, shape: &[usize], strides: &[isize]) -> Self;

    /// Inferred shape of this value.
    fn shape(&self) -> Vec<usize> {
        let mut shape = Vec::with_capacity(Self::RANK);
        self.infer_shape_into(&mut shape);
        shape
    }

    /// Inferred shape plus contiguous row-major contents.
    ///
    /// The inferred shape is only trusted once every level has been checked,
    /// so storage grows with the scalars actually present rather than being
    /// reserved from the shape up front.
    fn flatten(&self) -> Result<(Vec<usize>, Vec<Self::Scalar>)> {
        let shape = self.shape();
        let mut data = Vec::new();
        self.flatten_into(&shape, 0, &mut data)?;
        Ok((shape, data))
    }
}

macro_rules! impl_nested_scalar {
    ($($t:ty),*) => {
        $(
            impl NestedSeq for $t {
                type Scalar = $t;
                const RANK: usize = 0;

                #[inline]
                fn infer_shape_into(&self, _shape: &mut Vec<usize>) {}

                #[inline]
                fn flatten_into(&self, _shape: &[usize], _depth: usize, out: &mut Vec<$t>) -> Result<()> {
                    out.push(*self);
                    Ok(())
                }

                #[inline]
                unsafe fn read_strided(ptr: *const $t, _shape: &[usize], _strides: &[isize]) -> Self {
                    unsafe { *ptr }
                }
            }
        )*
    };
}

impl_nested_scalar!(i8, i16, i32, i64, u8, u16, u32, u64, f32, f64);

impl<S: NestedSeq> NestedSeq for Vec<S> {
    type Scalar = S::Scalar;
    const RANK: usize = S::RANK + 1;

    fn infer_shape_into(&self, shape: &mut Vec<usize>) {
        shape.push(self.len());
        match self.first() {
            Some(first) => first.infer_shape_into(shape),
            None => shape.extend(std::iter::repeat(0).take(S::RANK)),
        }
    }

    fn flatten_into(&self, shape: &[usize], depth: usize, out: &mut Vec<S::Scalar>) -> Result<()> {
        let expected = shape[0];
        if self.len() != expected {
            return Err(BufferError::RaggedSequence {
                depth,
                expected,
                found: self.len(),
            });
        }
        for child in self {
            child.flatten_into(&shape[1..], depth + 1, out)?;
        }
        Ok(())
    }

    unsafe fn read_strided(ptr: *const S::Scalar, shape: &[usize], strides: &[isize]) -> Self {
        // wrapping_offset: zero-volume buffers may sit on a null base.
        (0..shape[0])
            .map(|i| unsafe {
                S::read_strided(
                    ptr.wrapping_offset(i as isize * strides[0]),
                    &shape[1..],
                    &strides[1..],
                )
            })
            .collect()
    }
}

/// Rebuild the contents of a buffer as a nested sequence.
///
/// The nesting depth of `S` must equal the buffer rank. Strides are honored
/// as-is, so permuted, broadcast and reversed layouts read back correctly.
pub fn read_nested<S, const N: usize>(buf: &BufferRef<'_, S::Scalar, N>) -> Result<S>
where
    S: NestedSeq,
{
    if S::RANK != N {
        return Err(BufferError::RankMismatch {
            expected: N,
            found: S::RANK,
        });
    }
    // SAFETY: a BufferRef guarantees every in-bounds offset is readable.
    Ok(unsafe { S::read_strided(buf.host_ptr(), &buf.shape(), &buf.strides()) })
}

#[cfg(test)]
mod tests {
    use super::*;
    use halide_buffer_view::{row_major_strides, with_slice_buffer};

    #[test]
    fn test_rank_constants() {
        assert_eq!(<f32 as NestedSeq>::RANK, 0);
        assert_eq!(<Vec<u8> as NestedSeq>::RANK, 1);
        assert_eq!(<Vec<Vec<Vec<i64>>> as NestedSeq>::RANK, 3);
    }

    #[test]
    fn test_infer_shape() {
        assert_eq!(3.5f64.shape(), Vec::<usize>::new());
        assert_eq!(vec![1u8, 2, 3].shape(), vec![3]);
        assert_eq!(vec![vec![1i32, 2, 3], vec![4, 5, 6]].shape(), vec![2, 3]);
        assert_eq!(vec![vec![Vec::<f32>::new(); 4]; 2].shape(), vec![2, 4, 0]);
    }

    #[test]
    fn test_empty_outer_zeroes_inner_extents() {
        let xs: Vec<Vec<Vec<f64>>> = Vec::new();
        assert_eq!(xs.shape(), vec![0, 0, 0]);
        let (shape, data) = xs.flatten().unwrap();
        assert_eq!(shape, vec![0, 0, 0]);
        assert!(data.is_empty());
    }

    #[test]
    fn test_flatten_row_major() {
        let xs = vec![vec![vec![1u16, 2], vec![3, 4]], vec![vec![5, 6], vec![7, 8]]];
        let (shape, data) = xs.flatten().unwrap();
        assert_eq!(shape, vec![2, 2, 2]);
        assert_eq!(data, vec![1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn test_flatten_rejects_ragged() {
        let xs = vec![vec![1i64, 2, 3], vec![4, 5]];
        match xs.flatten() {
            Err(BufferError::RaggedSequence {
                depth,
                expected,
                found,
            }) => {
                assert_eq!((depth, expected, found), (1, 3, 2));
            }
            other => panic!("expected ragged error, got {other:?}"),
        }

        let deeper = vec![vec![vec![1.0f32], vec![2.0]], vec![vec![3.0], vec![]]];
        assert!(matches!(
            deeper.flatten(),
            Err(BufferError::RaggedSequence {
                depth: 2,
                expected: 1,
                found: 0
            })
        ));
    }

    #[test]
    fn test_flatten_ragged_with_long_first_child() {
        // The first child at every level is long and its siblings are empty,
        // so the shape inferred from first children overflows usize.
        const LONG: usize = 1 << 16;
        let mut level1 = vec![Vec::new(); LONG];
        let mut level2 = vec![Vec::new(); LONG];
        level2[0] = vec![0u64; LONG];
        level1[0] = level2;
        let mut xs: Vec<Vec<Vec<Vec<u64>>>> = vec![Vec::new(); LONG];
        xs[0] = level1;
        assert_eq!(xs.shape(), vec![LONG; 4]);
        assert!(matches!(
            xs.flatten(),
            Err(BufferError::RaggedSequence {
                depth: 3,
                expected: LONG,
                found: 0
            })
        ));
    }

    #[test]
    fn test_flatten_ragged_without_oversized_reserve() {
        // Inferred volume is 2^40 bytes; only 2^20 are present.
        const LONG: usize = 1 << 20;
        let mut xs: Vec<Vec<u8>> = vec![Vec::new(); LONG];
        xs[0] = vec![7u8; LONG];
        assert!(matches!(
            xs.flatten(),
            Err(BufferError::RaggedSequence {
                depth: 1,
                expected: LONG,
                found: 0
            })
        ));
    }

    #[test]
    fn test_read_strided_row_major() {
        let data: Vec<i32> = (0..6).collect();
        let shape = [2, 3];
        let xs: Vec<Vec<i32>> =
            unsafe { NestedSeq::read_strided(data.as_ptr(), &shape, &row_major_strides(&shape)) };
        assert_eq!(xs, vec![vec![0, 1, 2], vec![3, 4, 5]]);
    }

    #[test]
    fn test_read_nested_permuted() {
        let mut data: Vec<i32> = (0..6).collect();
        // Transposed view of a 2x3 row-major array.
        let xs: Vec<Vec<i32>> =
            with_slice_buffer(&mut data, &[3, 2], &[1, 3], |buf: &mut BufferRef<'_, i32, 2>| {
                read_nested::<Vec<Vec<i32>>, 2>(buf)
            })
            .unwrap()
            .unwrap();
        assert_eq!(xs, vec![vec![0, 3], vec![1, 4], vec![2, 5]]);
    }

    #[test]
    fn test_read_nested_broadcast_and_reversed() {
        let mut data = vec![1.0f64, 2.0, 3.0];
        let xs: Vec<Vec<f64>> =
            with_slice_buffer(&mut data, &[2, 3], &[0, 1], |buf: &mut BufferRef<'_, f64, 2>| {
                read_nested::<Vec<Vec<f64>>, 2>(buf)
            })
            .unwrap()
            .unwrap();
        assert_eq!(xs, vec![vec![1.0, 2.0, 3.0], vec![1.0, 2.0, 3.0]]);

        let reversed: Vec<f64> = unsafe { NestedSeq::read_strided(data.as_ptr().add(2), &[3], &[-1]) };
        assert_eq!(reversed, vec![3.0, 2.0, 1.0]);
    }

    #[test]
    fn test_read_nested_rank_mismatch() {
        let mut data = vec![0u8; 4];
        let res = with_slice_buffer(&mut data, &[2, 2], &[2, 1], |buf: &mut BufferRef<'_, u8, 2>| {
            read_nested::<Vec<u8>, 2>(buf).map(|_| ())
        })
        .unwrap();
        assert!(matches!(
            res,
            Err(BufferError::RankMismatch {
                expected: 2,
                found: 1
            })
        ));
    }
}
