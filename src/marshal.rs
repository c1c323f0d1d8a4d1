//! Scoped marshaling of host data into foreign buffers.
//!
//! Every entry point allocates (at most) one contiguous row-major `Vec` owned
//! by the call, builds a descriptor over it, runs the caller's block, and
//! releases both before returning.

use halide_buffer_view::{
    checked_volume, row_major_strides, with_slice_buffer, BufferError, BufferRef, HalideScalar,
    Result,
};

use crate::nested::NestedSeq;

fn check_depth<S: NestedSeq, const N: usize>() -> Result<()> {
    if S::RANK != N {
        tracing::debug!(expected = N, found = S::RANK, "nested depth does not match rank");
        return Err(BufferError::RankMismatch {
            expected: N,
            found: S::RANK,
        });
    }
    Ok(())
}

/// Copy `xs` into scope-owned row-major storage and run `f` on a descriptor
/// over it.
///
/// Writes made through the descriptor are discarded when the scope ends; use
/// [`with_nested_buffer_mut`] to keep them.
pub fn with_nested_buffer<S, const N: usize, R, F>(xs: &S, f: F) -> Result<R>
where
    S: NestedSeq,
    F: FnOnce(&mut BufferRef<'_, S::Scalar, N>) -> R,
{
    check_depth::<S, N>()?;
    let (shape, mut storage) = xs.flatten()?;
    tracing::trace!(?shape, elements = storage.len(), "marshaled nested sequence");
    let strides = row_major_strides(&shape);
    with_slice_buffer(&mut storage, &shape, &strides, f)
}

/// Like [`with_nested_buffer`], then copy the buffer contents back into `xs`.
pub fn with_nested_buffer_mut<S, const N: usize, R, F>(xs: &mut S, f: F) -> Result<R>
where
    S: NestedSeq,
    F: FnOnce(&mut BufferRef<'_, S::Scalar, N>) -> R,
{
    check_depth::<S, N>()?;
    let (shape, mut storage) = xs.flatten()?;
    let strides = row_major_strides(&shape);
    let out = with_slice_buffer(&mut storage, &shape, &strides, f)?;
    // SAFETY: `storage` is dense row-major for `shape`.
    *xs = unsafe { S::read_strided(storage.as_ptr(), &shape, &strides) };
    Ok(out)
}

/// Allocate zero-filled row-major storage of `shape` for the scope of `f`.
///
/// Intended for engine outputs: the callback passes the descriptor to the
/// engine and reads the results back before the storage is released.
pub fn with_cpu_buffer<T, const N: usize, R, F>(shape: &[usize], f: F) -> Result<R>
where
    T: HalideScalar,
    F: FnOnce(&mut BufferRef<'_, T, N>) -> R,
{
    if shape.len() != N {
        tracing::debug!(expected = N, found = shape.len(), "shape does not match rank");
        return Err(BufferError::RankMismatch {
            expected: N,
            found: shape.len(),
        });
    }
    let total = checked_volume(shape).ok_or(BufferError::OffsetOverflow)?;
    let mut storage = vec![T::zero(); total];
    tracing::trace!(?shape, elements = total, "allocated cpu buffer");
    let strides = row_major_strides(shape);
    with_slice_buffer(&mut storage, shape, &strides, f)
}
