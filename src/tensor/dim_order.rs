//! Dimension order: the physical nesting of a tensor's logical dimensions
//!
//! A dim order lists logical dimensions from outermost (slowest varying) to
//! innermost (fastest varying) in memory. `[0, 1, 2, 3]` is the row-major NCHW
//! layout; `[0, 2, 3, 1]` is channels-last (NHWC) storage of the same logical
//! NCHW tensor. The order is only used to derive strides; kernels work purely
//! in strides afterwards.

use super::shape::STACK_DIMS;
use super::strides::Strides;
use crate::error::{Error, Result};
use smallvec::SmallVec;
use std::fmt;
use std::ops::Deref;

/// Permutation of `0..ndim` describing memory nesting, outermost first
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct DimOrder(SmallVec<[usize; STACK_DIMS]>);

impl DimOrder {
    /// Validate and wrap a dim order.
    pub fn new(order: &[usize]) -> Result<Self> {
        if !Self::is_valid(order) {
            return Err(Error::invalid_dim_order(order, order.len()));
        }
        Ok(Self(order.iter().copied().collect()))
    }

    /// Row-major order `[0, 1, .., ndim - 1]`.
    pub fn contiguous(ndim: usize) -> Self {
        Self((0..ndim).collect())
    }

    /// Channels-last order `[0, 2, 3, .., ndim - 1, 1]`.
    ///
    /// Tensors with fewer than 3 dimensions have no spatial axes, so this is the
    /// contiguous order for them.
    pub fn channels_last(ndim: usize) -> Self {
        if ndim < 3 {
            return Self::contiguous(ndim);
        }
        let mut order: SmallVec<[usize; STACK_DIMS]> = SmallVec::with_capacity(ndim);
        order.push(0);
        order.extend(2..ndim);
        order.push(1);
        Self(order)
    }

    /// Whether `order` is a permutation of `0..order.len()`.
    pub fn is_valid(order: &[usize]) -> bool {
        let mut seen: SmallVec<[bool; STACK_DIMS]> = SmallVec::from_elem(false, order.len());
        for &d in order {
            if d >= order.len() || seen[d] {
                return false;
            }
            seen[d] = true;
        }
        true
    }

    /// Number of dimensions
    #[inline]
    pub fn ndim(&self) -> usize {
        self.0.len()
    }

    /// View as a slice.
    pub fn as_slice(&self) -> &[usize] {
        self.0.as_slice()
    }

    /// Whether this is the row-major order.
    pub fn is_contiguous(&self) -> bool {
        self.0.iter().enumerate().all(|(i, &d)| i == d)
    }

    /// Whether this is the channels-last order.
    pub fn is_channels_last(&self) -> bool {
        self.ndim() >= 3 && *self == Self::channels_last(self.ndim())
    }

    /// Derive element strides for `sizes` laid out in this order.
    ///
    /// Returns [`Error::ShapeMismatch`] when `sizes` has a different rank.
    pub fn to_strides(&self, sizes: &[usize]) -> Result<Strides> {
        if sizes.len() != self.ndim() {
            return Err(Error::ShapeMismatch {
                expected: vec![0; self.ndim()],
                got: sizes.to_vec(),
            });
        }
        Ok(dim_order_to_strides_nocheck(sizes, self))
    }

    /// Dim order of the tensor obtained by inserting a size-1 axis at `dim`.
    ///
    /// Existing dims `>= dim` shift up by one. The new axis is nested directly
    /// outside the dim that previously held index `dim`, so a lifted channels-last
    /// 3-d order `[0, 2, 1]` becomes the 4-d channels-last order `[0, 2, 3, 1]`.
    /// Inserting at `dim == ndim` appends the new axis innermost.
    pub fn unsqueeze(&self, dim: usize) -> Result<Self> {
        let ndim = self.ndim();
        if dim > ndim {
            return Err(Error::InvalidDimension {
                dim: dim as isize,
                ndim,
            });
        }
        let mut order: SmallVec<[usize; STACK_DIMS]> = SmallVec::with_capacity(ndim + 1);
        for &d in &self.0 {
            if d == dim {
                order.push(dim);
                order.push(dim + 1);
            } else if d > dim {
                order.push(d + 1);
            } else {
                order.push(d);
            }
        }
        if dim == ndim {
            order.push(dim);
        }
        Ok(Self(order))
    }

    /// Inverse of [`DimOrder::unsqueeze`]: drop axis `dim` and renumber the rest.
    pub fn squeeze(&self, dim: usize) -> Result<Self> {
        let ndim = self.ndim();
        if dim >= ndim {
            return Err(Error::InvalidDimension {
                dim: dim as isize,
                ndim,
            });
        }
        Ok(Self(
            self.0
                .iter()
                .filter(|&&d| d != dim)
                .map(|&d| if d > dim { d - 1 } else { d })
                .collect(),
        ))
    }
}

impl Deref for DimOrder {
    type Target = [usize];

    fn deref(&self) -> &Self::Target {
        self.0.as_slice()
    }
}

impl fmt::Debug for DimOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Derive strides from `sizes` and a dim order, validating both.
pub fn dim_order_to_strides(sizes: &[usize], dim_order: &[usize]) -> Result<Strides> {
    if sizes.len() != dim_order.len() || !DimOrder::is_valid(dim_order) {
        return Err(Error::invalid_dim_order(dim_order, sizes.len()));
    }
    Ok(dim_order_to_strides_nocheck(sizes, dim_order))
}

/// Derive strides from `sizes` and a dim order without validation.
///
/// The innermost dim gets stride 1; each outer dim's stride is the next inner
/// dim's stride times its size. A size-0 dim contributes a factor of 1 so the
/// strides stay distinct and non-zero.
pub fn dim_order_to_strides_nocheck(sizes: &[usize], dim_order: &[usize]) -> Strides {
    let ndim = sizes.len();
    let mut strides = Strides::zeroed(ndim);
    if ndim == 0 {
        return strides;
    }
    strides[dim_order[ndim - 1]] = 1;
    for i in (0..ndim - 1).rev() {
        let inner = dim_order[i + 1];
        let inner_size = sizes[inner];
        strides[dim_order[i]] = if inner_size == 0 {
            strides[inner]
        } else {
            strides[inner] * inner_size as isize
        };
    }
    strides
}
