//! Shared element-type traits for the halide-buffer workspace.
//!
//! This crate provides the runtime type tag carried by every foreign buffer
//! descriptor ([`HalideType`]) and the [`HalideScalar`] trait that binds a Rust
//! scalar type to its tag at compile time. It is shared by `halide-buffer-view`,
//! `halide-buffer` and `ndarray-halide-buffer`.
//!
//! External crates can depend on `halide-buffer-traits` alone to implement
//! [`HalideScalar`] for their own `#[repr(transparent)]` scalar wrappers.

pub mod scalar;
pub mod type_tag;

pub use scalar::HalideScalar;
pub use type_tag::{HalideType, TypeCode};
