//! `ndarray` interop for foreign buffer descriptors.
//!
//! Arrays are described zero-copy: extents and strides (including negative
//! ones) are passed through unchanged, and the base address is the array's
//! first logical element.

mod convert;

pub use convert::{buffer_to_ndarray, with_array_buffer, with_array_copy_buffer};
