use halide_buffer_view::{
    is_row_major, with_raw_buffer, with_slice_buffer_shape, BufferError, BufferRef, HalideScalar,
    Result,
};
use ndarray::{ArrayBase, ArrayD, Data, DataMut, Dimension, IxDyn};

/// Describe an ndarray array (owned or mutable view) as a rank-`N` buffer.
///
/// Dims and strides are passed through directly; `N` must equal `arr.ndim()`.
pub fn with_array_buffer<T, S, D, const N: usize, R, F>(
    arr: &mut ArrayBase<S, D>,
    f: F,
) -> Result<R>
where
    T: HalideScalar,
    S: DataMut<Elem = T>,
    D: Dimension,
    F: FnOnce(&mut BufferRef<'_, T, N>) -> R,
{
    let shape = arr.shape().to_vec();
    let strides = arr.strides().to_vec();
    let host = arr.as_mut_ptr();
    // SAFETY: ndarray guarantees every in-bounds index of `arr` is a valid
    // element, and `arr` stays mutably borrowed for the whole call.
    unsafe { with_raw_buffer(host, &shape, &strides, f) }
}

/// Copy an array into scope-owned row-major storage and describe the copy.
///
/// For read-only inputs; writes through the descriptor are discarded.
/// Standard-layout arrays are copied as one contiguous block.
pub fn with_array_copy_buffer<T, S, D, const N: usize, R, F>(
    arr: &ArrayBase<S, D>,
    f: F,
) -> Result<R>
where
    T: HalideScalar,
    S: Data<Elem = T>,
    D: Dimension,
    F: FnOnce(&mut BufferRef<'_, T, N>) -> R,
{
    let shape = arr.shape().to_vec();
    let mut storage: Vec<T> = match arr.as_slice() {
        Some(dense) if is_row_major(&shape, arr.strides()) => dense.to_vec(),
        _ => arr.iter().copied().collect(),
    };
    with_slice_buffer_shape(&mut storage, &shape, f)
}

/// Convert buffer contents into a dense row-major `ArrayD`.
///
/// A copy is performed since the buffer may have arbitrary strides.
pub fn buffer_to_ndarray<T, const N: usize>(buf: &BufferRef<'_, T, N>) -> Result<ArrayD<T>>
where
    T: HalideScalar,
{
    let shape = buf.shape();
    let data = buf.to_vec();
    let found = data.len();
    ArrayD::from_shape_vec(IxDyn(&shape), data).map_err(|err| {
        tracing::debug!(%err, ?shape, found, "ndarray rejected buffer contents");
        BufferError::LengthMismatch {
            expected: buf.len(),
            found,
        }
    })
}
