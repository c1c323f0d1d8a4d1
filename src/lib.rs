//! Typed, strided buffer descriptors for an array-compiler engine.
//!
//! This crate marshals host data into the engine's foreign buffer structure
//! (`halide_buffer_t`) and back. Descriptors are always scoped to a callback,
//! never returned, so a handle cannot outlive the memory it describes.
//!
//! # Core Types
//!
//! - [`BufferRef`]: typed, rank-checked, non-owning handle passed to callbacks
//! - [`HostBuffer`]: owned dense row-major storage that lends descriptors
//! - [`NestedSeq`]: nested `Vec` representation of buffer contents
//! - [`HalideScalar`]: element types with a runtime tag ([`HalideType`])
//!
//! # Primary API
//!
//! ## Describing existing memory
//!
//! - [`with_slice_buffer`], [`with_slice_buffer_shape`], [`with_slice_buffer_at`]:
//!   bounds-checked, over a slice
//! - [`with_raw_buffer`], [`with_raw_buffer_shape`], [`with_untyped_raw_buffer`]:
//!   over a raw pointer (unsafe)
//!
//! ## Marshaling
//!
//! - [`with_nested_buffer`], [`with_nested_buffer_mut`]: nested `Vec` → buffer
//! - [`with_cpu_buffer`]: zero-filled scratch buffer for engine outputs
//! - [`read_nested`]: buffer → nested `Vec`, honoring arbitrary strides
//!
//! ## Layout
//!
//! - [`row_major_strides`], [`col_major_strides`], [`validate_bounds`]
//!
//! # Example
//!
//! ```rust
//! use halide_buffer::{read_nested, with_nested_buffer, BufferRef};
//!
//! let xs = vec![vec![1.0f64, 2.0, 3.0], vec![4.0, 5.0, 6.0]];
//! let back: Vec<Vec<f64>> = with_nested_buffer(&xs, |buf: &mut BufferRef<'_, f64, 2>| {
//!     assert_eq!(buf.shape(), [2, 3]);
//!     assert_eq!(buf.strides(), [3, 1]);
//!     read_nested::<Vec<Vec<f64>>, 2>(buf)
//! })
//! .unwrap()
//! .unwrap();
//! assert_eq!(back, xs);
//! ```
//!
//! # Features
//!
//! - `ndarray`: zero-copy descriptors over `ndarray` arrays (re-exported as
//!   [`ndarray_interop`])

mod host;
mod marshal;
mod nested;

// ============================================================================
// Element types
// ============================================================================
pub use halide_buffer_view::{HalideScalar, HalideType, TypeCode};

// ============================================================================
// Descriptors and scoped constructors
// ============================================================================
pub use halide_buffer_view::{
    with_raw_buffer, with_raw_buffer_shape, with_slice_buffer, with_slice_buffer_at,
    with_slice_buffer_shape, with_untyped_raw_buffer, BufferRef, RawBuffer, RawDimension,
    DEVICE_DIRTY, HOST_DIRTY,
};

// ============================================================================
// Layout utilities
// ============================================================================
pub use halide_buffer_view::{
    checked_volume, col_major_strides, is_row_major, offset_of, offset_range, row_major_strides,
    validate_bounds,
};

// ============================================================================
// Marshaling
// ============================================================================
pub use host::HostBuffer;
pub use marshal::{with_cpu_buffer, with_nested_buffer, with_nested_buffer_mut};
pub use nested::{read_nested, NestedSeq};

// ============================================================================
// Error types
// ============================================================================
pub use halide_buffer_view::{BufferError, Result};

#[cfg(feature = "ndarray")]
pub use ndarray_halide_buffer as ndarray_interop;
