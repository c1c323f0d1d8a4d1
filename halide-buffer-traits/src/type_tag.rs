//! Runtime element-type tags.
//!
//! The engine has no static typing at its foreign boundary: every buffer
//! carries a `(code, bits, lanes)` triple describing its elements. These
//! types mirror that triple field for field.

use std::fmt;

/// Category of an element type.
///
/// Discriminants match the engine's `halide_type_code_t`.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeCode {
    /// Signed two's-complement integer.
    Int = 0,
    /// Unsigned integer.
    UInt = 1,
    /// IEEE floating point.
    Float = 2,
    /// Opaque pointer.
    Handle = 3,
    /// Brain floating point.
    BFloat = 4,
}

impl TypeCode {
    /// Decode a raw code byte, returning `None` for codes the engine does not define.
    pub fn from_raw(code: u8) -> Option<Self> {
        match code {
            0 => Some(TypeCode::Int),
            1 => Some(TypeCode::UInt),
            2 => Some(TypeCode::Float),
            3 => Some(TypeCode::Handle),
            4 => Some(TypeCode::BFloat),
            _ => None,
        }
    }
}

impl fmt::Display for TypeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeCode::Int => write!(f, "int"),
            TypeCode::UInt => write!(f, "uint"),
            TypeCode::Float => write!(f, "float"),
            TypeCode::Handle => write!(f, "handle"),
            TypeCode::BFloat => write!(f, "bfloat"),
        }
    }
}

/// Element type descriptor: `(code, bits, lanes)`.
///
/// `#[repr(C)]` so it can be embedded directly in the foreign buffer struct.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HalideType {
    pub code: u8,
    pub bits: u8,
    pub lanes: u16,
}

impl HalideType {
    /// Scalar (single-lane) type of the given category and width.
    pub const fn new(code: TypeCode, bits: u8) -> Self {
        Self {
            code: code as u8,
            bits,
            lanes: 1,
        }
    }

    /// Vector type with `lanes` elements.
    pub const fn with_lanes(self, lanes: u16) -> Self {
        Self {
            code: self.code,
            bits: self.bits,
            lanes,
        }
    }

    /// Decoded type category, if the code byte is known.
    pub fn type_code(&self) -> Option<TypeCode> {
        TypeCode::from_raw(self.code)
    }

    /// Size in bytes of one element (all lanes), rounding bits up to whole bytes.
    pub fn bytes(&self) -> usize {
        (self.bits as usize).div_ceil(8) * self.lanes as usize
    }
}

impl fmt::Display for HalideType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.type_code() {
            Some(code) => write!(f, "{}{}", code, self.bits)?,
            None => write!(f, "code{}:{}", self.code, self.bits)?,
        }
        if self.lanes != 1 {
            write!(f, "x{}", self.lanes)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_code_roundtrip() {
        for code in [
            TypeCode::Int,
            TypeCode::UInt,
            TypeCode::Float,
            TypeCode::Handle,
            TypeCode::BFloat,
        ] {
            assert_eq!(TypeCode::from_raw(code as u8), Some(code));
        }
        assert_eq!(TypeCode::from_raw(5), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(HalideType::new(TypeCode::Float, 32).to_string(), "float32");
        assert_eq!(HalideType::new(TypeCode::UInt, 8).to_string(), "uint8");
        assert_eq!(
            HalideType::new(TypeCode::Int, 16).with_lanes(4).to_string(),
            "int16x4"
        );
        let unknown = HalideType {
            code: 9,
            bits: 8,
            lanes: 1,
        };
        assert_eq!(unknown.to_string(), "code9:8");
    }

    #[test]
    fn test_bytes() {
        assert_eq!(HalideType::new(TypeCode::Float, 64).bytes(), 8);
        assert_eq!(HalideType::new(TypeCode::UInt, 1).bytes(), 1);
        assert_eq!(HalideType::new(TypeCode::Int, 16).with_lanes(8).bytes(), 16);
    }

    #[test]
    fn test_layout() {
        assert_eq!(std::mem::size_of::<HalideType>(), 4);
        assert_eq!(std::mem::align_of::<HalideType>(), 2);
    }
}
