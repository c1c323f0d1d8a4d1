//! `#[repr(C)]` mirror of the engine's foreign buffer structure.
//!
//! Field order, widths and alignment follow `halide_buffer_t` /
//! `halide_dimension_t` exactly; the engine reads these structs directly.

use std::os::raw::c_void;
use std::ptr;

pub use halide_buffer_traits::HalideType as RawType;

/// Host memory has been written and the device copy (if any) is stale.
pub const HOST_DIRTY: u64 = 1;
/// Device memory has been written and the host copy is stale.
pub const DEVICE_DIRTY: u64 = 2;

/// One dimension of a foreign buffer.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RawDimension {
    pub min: i32,
    pub extent: i32,
    pub stride: i32,
    pub flags: u32,
}

impl RawDimension {
    pub const fn new(min: i32, extent: i32, stride: i32) -> Self {
        Self {
            min,
            extent,
            stride,
            flags: 0,
        }
    }
}

/// The foreign buffer descriptor.
///
/// `dim` points to `dimensions` consecutive [`RawDimension`]s (or is null for
/// a rank-0 buffer). Device fields are left zeroed: device memory is managed
/// entirely by the engine.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RawBuffer {
    pub device: u64,
    pub device_interface: *const c_void,
    pub host: *mut u8,
    pub flags: u64,
    pub type_: RawType,
    pub dimensions: i32,
    pub dim: *mut RawDimension,
    pub padding: *mut c_void,
}

impl RawBuffer {
    /// A host-only descriptor with no dimensions attached yet.
    pub fn host_only(host: *mut u8, type_: RawType) -> Self {
        Self {
            device: 0,
            device_interface: ptr::null(),
            host,
            flags: 0,
            type_,
            dimensions: 0,
            dim: ptr::null_mut(),
            padding: ptr::null_mut(),
        }
    }

    /// Borrow the dimension array.
    ///
    /// # Safety
    ///
    /// `dim` must be null or point to at least `dimensions` valid, properly
    /// aligned `RawDimension`s that outlive the returned slice.
    pub unsafe fn dims(&self) -> &[RawDimension] {
        if self.dim.is_null() || self.dimensions <= 0 {
            return &[];
        }
        unsafe { std::slice::from_raw_parts(self.dim, self.dimensions as usize) }
    }

    #[inline]
    pub fn host_dirty(&self) -> bool {
        self.flags & HOST_DIRTY != 0
    }

    #[inline]
    pub fn device_dirty(&self) -> bool {
        self.flags & DEVICE_DIRTY != 0
    }

    #[inline]
    pub fn set_flag(&mut self, flag: u64, value: bool) {
        if value {
            self.flags |= flag;
        } else {
            self.flags &= !flag;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use halide_buffer_traits::HalideScalar;
    use std::mem::{align_of, offset_of, size_of};

    #[test]
    fn dimension_layout() {
        assert_eq!(size_of::<RawDimension>(), 16);
        assert_eq!(align_of::<RawDimension>(), 4);
        assert_eq!(offset_of!(RawDimension, min), 0);
        assert_eq!(offset_of!(RawDimension, extent), 4);
        assert_eq!(offset_of!(RawDimension, stride), 8);
        assert_eq!(offset_of!(RawDimension, flags), 12);
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn buffer_layout() {
        assert_eq!(size_of::<RawBuffer>(), 56);
        assert_eq!(align_of::<RawBuffer>(), 8);
        assert_eq!(offset_of!(RawBuffer, device), 0);
        assert_eq!(offset_of!(RawBuffer, device_interface), 8);
        assert_eq!(offset_of!(RawBuffer, host), 16);
        assert_eq!(offset_of!(RawBuffer, flags), 24);
        assert_eq!(offset_of!(RawBuffer, type_), 32);
        assert_eq!(offset_of!(RawBuffer, dimensions), 36);
        assert_eq!(offset_of!(RawBuffer, dim), 40);
        assert_eq!(offset_of!(RawBuffer, padding), 48);
    }

    #[test]
    fn flags_toggle() {
        let mut raw = RawBuffer::host_only(ptr::null_mut(), f32::HALIDE_TYPE);
        assert!(!raw.host_dirty());
        raw.set_flag(HOST_DIRTY, true);
        assert!(raw.host_dirty());
        assert!(!raw.device_dirty());
        raw.set_flag(DEVICE_DIRTY, true);
        raw.set_flag(HOST_DIRTY, false);
        assert!(!raw.host_dirty());
        assert!(raw.device_dirty());
        assert_eq!(raw.flags, DEVICE_DIRTY);
    }

    #[test]
    fn empty_dims_for_null_pointer() {
        let mut raw = RawBuffer::host_only(ptr::null_mut(), u8::HALIDE_TYPE);
        raw.dimensions = 3;
        // SAFETY: `dim` is null, which `dims` treats as rank 0.
        assert!(unsafe { raw.dims() }.is_empty());
    }
}
