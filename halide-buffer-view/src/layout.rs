//! Shape and stride arithmetic shared by every buffer constructor.

use crate::{BufferError, Result};

/// Compute row-major strides (C default: last index varies fastest).
///
/// `strides[k]` is the product of all extents to the right of `k`.
pub fn row_major_strides(dims: &[usize]) -> Vec<isize> {
    let rank = dims.len();
    if rank == 0 {
        return vec![];
    }
    let mut strides = vec![1isize; rank];
    for i in (0..rank - 1).rev() {
        strides[i] = strides[i + 1] * dims[i + 1] as isize;
    }
    strides
}

/// Compute column-major strides (Fortran order: first index varies fastest).
pub fn col_major_strides(dims: &[usize]) -> Vec<isize> {
    let rank = dims.len();
    if rank == 0 {
        return vec![];
    }
    let mut strides = vec![1isize; rank];
    for i in 1..rank {
        strides[i] = strides[i - 1] * dims[i - 1] as isize;
    }
    strides
}

/// Whether `strides` is exactly the row-major layout of `dims`.
///
/// Strides of unit or zero-extent dimensions never affect addressing and are
/// ignored.
pub fn is_row_major(dims: &[usize], strides: &[isize]) -> bool {
    if dims.len() != strides.len() {
        return false;
    }
    let expected = row_major_strides(dims);
    dims.iter()
        .zip(strides.iter().zip(expected.iter()))
        .all(|(&d, (&s, &e))| d <= 1 || s == e)
}

/// Number of elements addressed by `dims`, or `None` on overflow.
///
/// Any zero extent makes the volume zero regardless of the other extents.
/// The empty shape has volume one (a single scalar).
pub fn checked_volume(dims: &[usize]) -> Option<usize> {
    if dims.contains(&0) {
        return Some(0);
    }
    dims.iter().try_fold(1usize, |acc, &d| acc.checked_mul(d))
}

/// Flat element offset of `index` under `strides`.
#[inline]
pub fn offset_of(index: &[usize], strides: &[isize]) -> isize {
    index
        .iter()
        .zip(strides.iter())
        .map(|(&i, &s)| i as isize * s)
        .sum()
}

/// Validate that every offset reachable from `offset` stays within `[0, len)`.
///
/// Negative strides reach below `offset`, so a reversed view must start at a
/// base offset large enough to cover them.
pub fn validate_bounds(len: usize, dims: &[usize], strides: &[isize], offset: isize) -> Result<()> {
    if dims.len() != strides.len() {
        return Err(BufferError::ShapeStrideArity {
            shape: dims.len(),
            strides: strides.len(),
        });
    }
    // Empty array - no access needed
    if dims.contains(&0) {
        return Ok(());
    }
    let (lo, hi) = offset_range(dims, strides)?;
    let lo = offset.checked_add(lo).ok_or(BufferError::OffsetOverflow)?;
    let hi = offset.checked_add(hi).ok_or(BufferError::OffsetOverflow)?;
    if lo < 0 || hi as usize >= len {
        return Err(BufferError::OffsetOverflow);
    }
    Ok(())
}

/// Min and max element offset reachable from index `[0, .., 0]`.
///
/// Non-negative strides only extend the max; negative strides (reversed
/// views) reach below the base. Dimensions of extent 0 or 1 contribute
/// nothing.
pub fn offset_range(dims: &[usize], strides: &[isize]) -> Result<(isize, isize)> {
    if dims.len() != strides.len() {
        return Err(BufferError::ShapeStrideArity {
            shape: dims.len(),
            strides: strides.len(),
        });
    }
    dims.iter()
        .zip(strides)
        .filter(|&(&d, _)| d > 1)
        .try_fold((0isize, 0isize), |(lo, hi), (&d, &s)| -> Result<(isize, isize)> {
            let reach = isize::try_from(d - 1)
                .ok()
                .and_then(|steps| s.checked_mul(steps))
                .ok_or(BufferError::OffsetOverflow)?;
            if reach < 0 {
                Ok((lo.checked_add(reach).ok_or(BufferError::OffsetOverflow)?, hi))
            } else {
                Ok((lo, hi.checked_add(reach).ok_or(BufferError::OffsetOverflow)?))
            }
        })
}

/// Convert one extent/stride into the foreign `i32` field for dimension `dim`.
pub(crate) fn to_foreign<V>(dim: usize, value: V) -> Result<i32>
where
    V: Copy + TryInto<i32> + Into<i128>,
{
    value
        .try_into()
        .map_err(|_| BufferError::DimensionOverflow {
            dim,
            value: value.into(),
        })
}
