//! Scalar type bounds for buffer elements.

use crate::type_tag::{HalideType, TypeCode};

/// Element types that can live in a foreign buffer.
///
/// Associates a Rust scalar with the runtime tag the engine expects. The
/// `Pod` bound guarantees that a slice of scalars can be reinterpreted as the
/// raw bytes installed in the descriptor's host pointer, and `Zero` is used
/// for zero-initialised scratch buffers.
pub trait HalideScalar:
    bytemuck::Pod + num_traits::Zero + PartialEq + std::fmt::Debug + 'static
{
    /// Runtime tag written into (and checked against) the foreign descriptor.
    const HALIDE_TYPE: HalideType;
}

macro_rules! impl_halide_scalar {
    ($($t:ty => $code:ident, $bits:expr;)*) => {
        $(
            impl HalideScalar for $t {
                const HALIDE_TYPE: HalideType = HalideType::new(TypeCode::$code, $bits);
            }
        )*
    };
}

impl_halide_scalar! {
    i8 => Int, 8;
    i16 => Int, 16;
    i32 => Int, 32;
    i64 => Int, 64;
    u8 => UInt, 8;
    u16 => UInt, 16;
    u32 => UInt, 32;
    u64 => UInt, 64;
    f32 => Float, 32;
    f64 => Float, 64;
}
