//! Scoped, typed handles to foreign buffer descriptors.
//!
//! A [`BufferRef`] never owns the memory it describes, and the descriptor it
//! points to only lives for the duration of a `with_*` callback. The callback
//! receives `&mut BufferRef<'_, T, N>` with a fresh lifetime, so the handle
//! cannot be smuggled out of the scope; the descriptor is dropped on every
//! exit path, including unwinding.

use std::marker::PhantomData;
use std::os::raw::c_void;

use halide_buffer_traits::{HalideScalar, HalideType};

use crate::ffi::{RawBuffer, RawDimension, HOST_DIRTY};
use crate::layout::{
    checked_volume, is_row_major, offset_of, row_major_strides, to_foreign, validate_bounds,
};
use crate::{BufferError, Result};

#[cfg(test)]
thread_local! {
    static LIVE_DESCRIPTORS: std::cell::Cell<usize> = const { std::cell::Cell::new(0) };
}

fn reject(err: BufferError) -> BufferError {
    tracing::debug!(error = %err, "rejected buffer descriptor");
    err
}

fn check_arity_and_rank<const N: usize>(shape: &[usize], strides: &[isize]) -> Result<()> {
    if shape.len() != strides.len() {
        return Err(reject(BufferError::ShapeStrideArity {
            shape: shape.len(),
            strides: strides.len(),
        }));
    }
    if shape.len() != N {
        return Err(reject(BufferError::RankMismatch {
            expected: N,
            found: shape.len(),
        }));
    }
    Ok(())
}

fn check_type<T: HalideScalar>(found: HalideType) -> Result<()> {
    if found != T::HALIDE_TYPE {
        return Err(reject(BufferError::TypeMismatch {
            expected: T::HALIDE_TYPE,
            found,
        }));
    }
    Ok(())
}

fn check_host(host: *const u8, volume: usize) -> Result<()> {
    if host.is_null() && volume != 0 {
        return Err(reject(BufferError::NullPointer { volume }));
    }
    Ok(())
}

// ============================================================================
// Scope-owned descriptor storage
// ============================================================================

/// Heap storage for one descriptor and its dimension array.
///
/// `raw.dim` points into `dims`; both boxes are released together.
struct ScopedDescriptor {
    raw: Box<RawBuffer>,
    _dims: Box<[RawDimension]>,
}

impl ScopedDescriptor {
    fn new(host: *mut u8, type_: HalideType, dims: Vec<RawDimension>) -> Self {
        let mut dims = dims.into_boxed_slice();
        let mut raw = Box::new(RawBuffer::host_only(host, type_));
        raw.dimensions = dims.len() as i32;
        if !dims.is_empty() {
            raw.dim = dims.as_mut_ptr();
        }
        #[cfg(test)]
        LIVE_DESCRIPTORS.with(|live| live.set(live.get() + 1));
        Self { raw, _dims: dims }
    }
}

impl Drop for ScopedDescriptor {
    fn drop(&mut self) {
        tracing::trace!(rank = self.raw.dimensions, "buffer view released");
        #[cfg(test)]
        LIVE_DESCRIPTORS.with(|live| live.set(live.get() - 1));
    }
}

/// Validate a request and build its descriptor. Nothing is allocated unless
/// every check passes.
fn describe<T: HalideScalar, const N: usize>(
    host: *mut u8,
    type_: HalideType,
    shape: &[usize],
    strides: &[isize],
) -> Result<ScopedDescriptor> {
    check_arity_and_rank::<N>(shape, strides)?;
    check_type::<T>(type_)?;
    let volume = checked_volume(shape).ok_or_else(|| reject(BufferError::OffsetOverflow))?;
    check_host(host, volume)?;
    let dims = shape
        .iter()
        .zip(strides.iter())
        .enumerate()
        .map(|(d, (&extent, &stride))| {
            Ok(RawDimension::new(
                0,
                to_foreign(d, extent as u64)?,
                to_foreign(d, stride as i64)?,
            ))
        })
        .collect::<Result<Vec<_>>>()
        .map_err(reject)?;
    Ok(ScopedDescriptor::new(host, type_, dims))
}

// ============================================================================
// BufferRef
// ============================================================================

/// Typed, rank-checked, non-owning handle to a foreign buffer descriptor.
///
/// # Type Parameters
/// - `'s`: Lifetime of the enclosing scope
/// - `T`: Element type; its tag has been checked against the descriptor
/// - `N`: Rank; equal to the descriptor's `dimensions`
pub struct BufferRef<'s, T, const N: usize> {
    raw: &'s mut RawBuffer,
    _elem: PhantomData<*mut T>,
}

impl<T: HalideScalar, const N: usize> std::fmt::Debug for BufferRef<'_, T, N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferRef")
            .field("type", &self.raw.type_)
            .field("dims", &self.dims())
            .field("host", &self.raw.host)
            .field("flags", &self.raw.flags)
            .finish()
    }
}

impl<'s, T: HalideScalar, const N: usize> BufferRef<'s, T, N> {
    /// Wrap a descriptor produced elsewhere (typically by the engine).
    ///
    /// Checks that the descriptor has rank `N`, element type `T`, no negative
    /// extents, and a non-null host pointer if it addresses any element.
    ///
    /// # Safety
    ///
    /// `raw.dim` must point to `raw.dimensions` valid dimensions and `raw.host`
    /// must be valid for reads and writes at every offset reachable through
    /// them, for all of `'s`.
    pub unsafe fn from_raw(raw: &'s mut RawBuffer) -> Result<Self> {
        let found = usize::try_from(raw.dimensions).unwrap_or(0);
        if raw.dimensions < 0 || found != N {
            return Err(reject(BufferError::RankMismatch { expected: N, found }));
        }
        if N > 0 && raw.dim.is_null() {
            return Err(reject(BufferError::NullDimensions { rank: N }));
        }
        check_type::<T>(raw.type_)?;
        let mut shape = Vec::with_capacity(N);
        for (dim, d) in unsafe { raw.dims() }.iter().enumerate() {
            if d.extent < 0 {
                return Err(reject(BufferError::NegativeExtent {
                    dim,
                    extent: d.extent,
                }));
            }
            shape.push(d.extent as usize);
        }
        let volume = checked_volume(&shape).ok_or_else(|| reject(BufferError::OffsetOverflow))?;
        check_host(raw.host, volume)?;
        Ok(Self {
            raw,
            _elem: PhantomData,
        })
    }
}

impl<T: HalideScalar, const N: usize> BufferRef<'_, T, N> {
    /// Per-dimension `(min, extent, stride, flags)` records.
    #[inline]
    pub fn dims(&self) -> &[RawDimension] {
        // SAFETY: every constructor checked that `dim` holds N dimensions.
        unsafe { self.raw.dims() }
    }

    #[inline]
    pub fn rank(&self) -> usize {
        N
    }

    #[inline]
    pub fn element_type(&self) -> HalideType {
        self.raw.type_
    }

    pub fn shape(&self) -> [usize; N] {
        let dims = self.dims();
        std::array::from_fn(|d| dims[d].extent as usize)
    }

    pub fn strides(&self) -> [isize; N] {
        let dims = self.dims();
        std::array::from_fn(|d| dims[d].stride as isize)
    }

    pub fn mins(&self) -> [isize; N] {
        let dims = self.dims();
        std::array::from_fn(|d| dims[d].min as isize)
    }

    /// Extent of dimension `d`.
    ///
    /// # Panics
    /// Panics if `d >= N`.
    #[inline]
    pub fn extent(&self, d: usize) -> usize {
        self.dims()[d].extent as usize
    }

    /// Stride of dimension `d`, in elements.
    ///
    /// # Panics
    /// Panics if `d >= N`.
    #[inline]
    pub fn stride(&self, d: usize) -> isize {
        self.dims()[d].stride as isize
    }

    /// Number of addressed elements.
    pub fn len(&self) -> usize {
        self.dims().iter().map(|d| d.extent as usize).product()
    }

    pub fn is_empty(&self) -> bool {
        self.dims().iter().any(|d| d.extent == 0)
    }

    /// Base address, installed unmodified from the constructor's input.
    #[inline]
    pub fn host_ptr(&self) -> *mut T {
        self.raw.host.cast()
    }

    /// Pointer to pass to the engine.
    #[inline]
    pub fn as_raw(&self) -> *const RawBuffer {
        &*self.raw
    }

    /// Mutable pointer to pass to the engine.
    #[inline]
    pub fn as_raw_mut(&mut self) -> *mut RawBuffer {
        &mut *self.raw
    }

    #[inline]
    pub fn host_dirty(&self) -> bool {
        self.raw.host_dirty()
    }

    #[inline]
    pub fn set_host_dirty(&mut self, dirty: bool) {
        self.raw.set_flag(HOST_DIRTY, dirty);
    }

    #[inline]
    pub fn device_dirty(&self) -> bool {
        self.raw.device_dirty()
    }

    fn checked_offset(&self, index: &[usize; N]) -> isize {
        for (d, (&i, dim)) in index.iter().zip(self.dims()).enumerate() {
            assert!(
                i < dim.extent as usize,
                "index {} out of bounds for dim {} with extent {}",
                i,
                d,
                dim.extent
            );
        }
        offset_of(index, &self.strides())
    }

    /// Read one element.
    ///
    /// # Panics
    /// Panics if any index component is out of bounds.
    pub fn get(&self, index: [usize; N]) -> T {
        let off = self.checked_offset(&index);
        // SAFETY: in-bounds index, and constructors guarantee every in-bounds
        // offset is readable.
        unsafe { *self.host_ptr().offset(off) }
    }

    /// Write one element and mark the host copy dirty.
    ///
    /// # Panics
    /// Panics if any index component is out of bounds.
    pub fn set(&mut self, index: [usize; N], value: T) {
        let off = self.checked_offset(&index);
        // SAFETY: as in `get`; the handle is exclusive for its scope.
        unsafe { *self.host_ptr().offset(off) = value };
        self.set_host_dirty(true);
    }

    /// Copy the contents into a dense row-major `Vec`, honoring the
    /// descriptor's strides (including zero and negative ones).
    pub fn to_vec(&self) -> Vec<T> {
        let shape = self.shape();
        let strides = self.strides();
        let total = self.len();
        let base = self.host_ptr();
        if total == 0 {
            return Vec::new();
        }
        if is_row_major(&shape, &strides) {
            // SAFETY: a dense row-major layout addresses exactly `total`
            // consecutive elements starting at the base.
            return unsafe { std::slice::from_raw_parts(base, total) }.to_vec();
        }
        let mut out = Vec::with_capacity(total);
        let mut idx = [0usize; N];
        for _ in 0..total {
            // SAFETY: `idx` stays within `shape` by construction of the odometer.
            out.push(unsafe { *base.offset(offset_of(&idx, &strides)) });
            for d in (0..N).rev() {
                idx[d] += 1;
                if idx[d] < shape[d] {
                    break;
                }
                idx[d] = 0;
            }
        }
        out
    }
}

// ============================================================================
// Scoped constructors
// ============================================================================

/// Describe `host` as a rank-`N` buffer of `T` and run `f` on the descriptor.
///
/// The type tag is supplied at runtime and must equal `T::HALIDE_TYPE`.
///
/// # Safety
///
/// `host` must be valid for reads and writes of `T` at every offset
/// reachable through `shape` and `strides`, for the duration of the call.
pub unsafe fn with_untyped_raw_buffer<T, const N: usize, R, F>(
    host: *mut c_void,
    type_: HalideType,
    shape: &[usize],
    strides: &[isize],
    f: F,
) -> Result<R>
where
    T: HalideScalar,
    F: FnOnce(&mut BufferRef<'_, T, N>) -> R,
{
    let mut scoped = describe::<T, N>(host.cast(), type_, shape, strides)?;
    tracing::trace!(rank = N, elem = %type_, ?shape, ?strides, "buffer view created");
    let mut buf = BufferRef {
        raw: &mut *scoped.raw,
        _elem: PhantomData,
    };
    Ok(f(&mut buf))
}

/// Describe `host` as a rank-`N` buffer of `T` with explicit strides.
///
/// # Safety
///
/// Same contract as [`with_untyped_raw_buffer`].
pub unsafe fn with_raw_buffer<T, const N: usize, R, F>(
    host: *mut T,
    shape: &[usize],
    strides: &[isize],
    f: F,
) -> Result<R>
where
    T: HalideScalar,
    F: FnOnce(&mut BufferRef<'_, T, N>) -> R,
{
    unsafe { with_untyped_raw_buffer(host.cast(), T::HALIDE_TYPE, shape, strides, f) }
}

/// Describe `host` as a dense row-major buffer of the given shape.
///
/// # Safety
///
/// Same contract as [`with_untyped_raw_buffer`].
pub unsafe fn with_raw_buffer_shape<T, const N: usize, R, F>(
    host: *mut T,
    shape: &[usize],
    f: F,
) -> Result<R>
where
    T: HalideScalar,
    F: FnOnce(&mut BufferRef<'_, T, N>) -> R,
{
    let strides = row_major_strides(shape);
    unsafe { with_raw_buffer(host, shape, &strides, f) }
}

/// Describe a borrowed slice as a strided buffer.
///
/// Every offset reachable through `shape`/`strides` must fall inside `data`;
/// otherwise [`BufferError::OffsetOverflow`] is returned.
pub fn with_slice_buffer<T, const N: usize, R, F>(
    data: &mut [T],
    shape: &[usize],
    strides: &[isize],
    f: F,
) -> Result<R>
where
    T: HalideScalar,
    F: FnOnce(&mut BufferRef<'_, T, N>) -> R,
{
    with_slice_buffer_at(data, 0, shape, strides, f)
}

/// Describe a borrowed slice as a strided buffer whose base element is
/// `data[offset]`.
///
/// Negative strides walk below the base, so reversed views of a slice are
/// described by starting at their last element.
pub fn with_slice_buffer_at<T, const N: usize, R, F>(
    data: &mut [T],
    offset: usize,
    shape: &[usize],
    strides: &[isize],
    f: F,
) -> Result<R>
where
    T: HalideScalar,
    F: FnOnce(&mut BufferRef<'_, T, N>) -> R,
{
    check_arity_and_rank::<N>(shape, strides)?;
    if offset > data.len() {
        return Err(reject(BufferError::OffsetOverflow));
    }
    let base = isize::try_from(offset).map_err(|_| reject(BufferError::OffsetOverflow))?;
    validate_bounds(data.len(), shape, strides, base).map_err(reject)?;
    let host = bytemuck::cast_slice_mut::<T, u8>(&mut data[offset..]).as_mut_ptr();
    // SAFETY: bounds validated against the slice, which is borrowed mutably
    // for the whole call.
    unsafe { with_untyped_raw_buffer(host.cast(), T::HALIDE_TYPE, shape, strides, f) }
}

/// Describe a borrowed slice as a dense row-major buffer of the given shape.
pub fn with_slice_buffer_shape<T, const N: usize, R, F>(
    data: &mut [T],
    shape: &[usize],
    f: F,
) -> Result<R>
where
    T: HalideScalar,
    F: FnOnce(&mut BufferRef<'_, T, N>) -> R,
{
    let strides = row_major_strides(shape);
    with_slice_buffer(data, shape, &strides, f)
}
