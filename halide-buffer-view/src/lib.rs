//! Foreign buffer descriptors and their strided memory-layout contract.
//!
//! This crate owns the boundary between Rust memory and the array compiler's
//! `halide_buffer_t`: it lays out the descriptor exactly as the engine expects,
//! validates shape / stride / rank / element type before anything is handed
//! across, and scopes every descriptor to a callback so that the handle can
//! never outlive the memory it describes.
//!
//! # Core Types
//!
//! - [`BufferRef`]: typed, rank-checked, non-owning handle to a foreign descriptor
//! - [`RawBuffer`] / [`RawDimension`]: `#[repr(C)]` mirrors of the engine structs
//!
//! # Scoped Constructors
//!
//! - [`with_raw_buffer`] / [`with_raw_buffer_shape`]: describe memory behind a raw pointer
//! - [`with_untyped_raw_buffer`]: same, with the element type supplied at runtime
//! - [`with_slice_buffer`] / [`with_slice_buffer_shape`] / [`with_slice_buffer_at`]:
//!   bounds-checked, over a borrowed slice
//!
//! # Example
//!
//! ```rust
//! use halide_buffer_view::{with_slice_buffer_shape, BufferRef};
//!
//! let mut data = vec![1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0];
//! let corner = with_slice_buffer_shape(&mut data, &[2, 3], |buf: &mut BufferRef<'_, f32, 2>| {
//!     assert_eq!(buf.strides(), [3, 1]);
//!     buf.get([1, 2])
//! })
//! .unwrap();
//! assert_eq!(corner, 6.0);
//! ```

pub mod buffer;
pub mod ffi;
pub mod layout;

pub use halide_buffer_traits::{HalideScalar, HalideType, TypeCode};

pub use buffer::{
    with_raw_buffer, with_raw_buffer_shape, with_slice_buffer, with_slice_buffer_at,
    with_slice_buffer_shape, with_untyped_raw_buffer, BufferRef,
};
pub use ffi::{RawBuffer, RawDimension, DEVICE_DIRTY, HOST_DIRTY};
pub use layout::{
    checked_volume, col_major_strides, is_row_major, offset_of, offset_range, row_major_strides,
    validate_bounds,
};

// ============================================================================
// Error types
// ============================================================================

/// Errors raised while building or interpreting a buffer descriptor.
///
/// Every variant is a usage error detected before any foreign allocation.
#[derive(Debug, thiserror::Error)]
pub enum BufferError {
    /// Shape and stride sequences have different lengths.
    #[error("shape and strides length mismatch: {shape} vs {strides}")]
    ShapeStrideArity { shape: usize, strides: usize },

    /// Supplied rank differs from the statically requested rank.
    #[error("rank mismatch: expected {expected}, found {found}")]
    RankMismatch { expected: usize, found: usize },

    /// Element type tag differs from the statically requested element type.
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: HalideType,
        found: HalideType,
    },

    /// Null host pointer for a buffer that addresses at least one element.
    #[error("null host pointer for buffer of {volume} elements")]
    NullPointer { volume: usize },

    /// Nested sequence whose siblings have differing lengths.
    #[error("ragged sequence at depth {depth}: expected length {expected}, found {found}")]
    RaggedSequence {
        depth: usize,
        expected: usize,
        found: usize,
    },

    /// Flat data length differs from the volume of the declared shape.
    #[error("length mismatch: shape holds {expected} elements, data has {found}")]
    LengthMismatch { expected: usize, found: usize },

    /// Foreign descriptor of nonzero rank without a dimension array.
    #[error("descriptor of rank {rank} has a null dimension array")]
    NullDimensions { rank: usize },

    /// Extent or stride does not fit the descriptor's 32-bit fields.
    #[error("value {value} for dim {dim} does not fit in the foreign descriptor")]
    DimensionOverflow { dim: usize, value: i128 },

    /// Foreign descriptor reports a negative extent.
    #[error("negative extent {extent} for dim {dim}")]
    NegativeExtent { dim: usize, extent: i32 },

    /// Integer overflow or out-of-range access while computing an offset.
    #[error("offset overflow while computing pointer")]
    OffsetOverflow,
}

/// Result type for buffer operations.
pub type Result<T> = std::result::Result<T, BufferError>;
