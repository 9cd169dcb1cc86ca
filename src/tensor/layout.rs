//! Layout: shape, dim order, and derived strides for dense tensor memory

use super::dim_order::{DimOrder, dim_order_to_strides_nocheck};
use super::index::calculate_linear_index;
use super::shape::Shape;
use super::strides::Strides;
use crate::error::{Error, Result};
use std::fmt;

/// Layout describes the memory layout of a dense tensor
///
/// A tensor's elements fill a contiguous buffer, but not necessarily in
/// row-major order. The dim order says which logical dimension is nested where
/// in memory; the strides derived from it give the element offset of any
/// logical coordinate:
///
///   i0 * strides[0] + i1 * strides[1] + ... + in * strides[n]
#[derive(Clone, PartialEq, Eq)]
pub struct Layout {
    /// Shape: size along each logical dimension
    shape: Shape,
    /// Dim order: physical nesting of the logical dimensions, outermost first
    dim_order: DimOrder,
    /// Strides: offset (in elements) between consecutive elements along each dimension
    strides: Strides,
}

impl Layout {
    /// Create a new contiguous (row-major/C-order) layout from a shape
    ///
    /// # Example
    /// ```
    /// use strided_conv::tensor::Layout;
    /// let layout = Layout::contiguous(&[2, 3, 4]);
    /// assert_eq!(layout.shape(), &[2, 3, 4]);
    /// assert_eq!(layout.strides(), &[12, 4, 1]);
    /// ```
    pub fn contiguous(shape: &[usize]) -> Self {
        Self::from_parts(Shape::from(shape), DimOrder::contiguous(shape.len()))
    }

    /// Create a channels-last layout (e.g. NHWC storage of an NCHW tensor)
    ///
    /// # Example
    /// ```
    /// use strided_conv::tensor::Layout;
    /// let layout = Layout::channels_last(&[1, 3, 2, 2]);
    /// assert_eq!(layout.dim_order(), &[0, 2, 3, 1]);
    /// assert_eq!(layout.strides(), &[12, 1, 6, 3]);
    /// ```
    pub fn channels_last(shape: &[usize]) -> Self {
        Self::from_parts(Shape::from(shape), DimOrder::channels_last(shape.len()))
    }

    /// Create a layout with an explicit dim order
    pub fn with_dim_order(shape: &[usize], dim_order: &[usize]) -> Result<Self> {
        if shape.len() != dim_order.len() {
            return Err(Error::invalid_dim_order(dim_order, shape.len()));
        }
        Ok(Self::from_parts(Shape::from(shape), DimOrder::new(dim_order)?))
    }

    fn from_parts(shape: Shape, dim_order: DimOrder) -> Self {
        let strides = dim_order_to_strides_nocheck(&shape, &dim_order);
        Self {
            shape,
            dim_order,
            strides,
        }
    }

    /// Get the shape
    #[inline]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Get the strides
    #[inline]
    pub fn strides(&self) -> &[isize] {
        &self.strides
    }

    /// Get the dim order
    #[inline]
    pub fn dim_order(&self) -> &[usize] {
        &self.dim_order
    }

    /// Number of dimensions (rank)
    #[inline]
    pub fn ndim(&self) -> usize {
        self.shape.ndim()
    }

    /// Total number of elements
    #[inline]
    pub fn elem_count(&self) -> usize {
        self.shape.numel()
    }

    /// Check if memory is in row-major order
    pub fn is_contiguous(&self) -> bool {
        self.dim_order.is_contiguous()
    }

    /// Check if memory is in channels-last order
    pub fn is_channels_last(&self) -> bool {
        self.dim_order.is_channels_last()
    }

    /// Get size along a specific dimension
    ///
    /// Supports negative indexing: -1 is the last dimension
    pub fn dim(&self, d: isize) -> Option<usize> {
        let idx = self.normalize_dim(d)?;
        Some(self.shape[idx])
    }

    /// Normalize a dimension index (handle negative indices)
    pub fn normalize_dim(&self, d: isize) -> Option<usize> {
        let ndim = self.ndim() as isize;
        let idx = if d < 0 { ndim + d } else { d };
        if idx >= 0 && idx < ndim {
            Some(idx as usize)
        } else {
            None
        }
    }

    /// Compute the element offset for given logical indices, with bounds checks
    pub fn index(&self, indices: &[usize]) -> Option<usize> {
        if indices.len() != self.ndim() {
            return None;
        }
        if indices.iter().zip(self.shape.iter()).any(|(&i, &dim)| i >= dim) {
            return None;
        }
        Some(calculate_linear_index(indices, &self.strides) as usize)
    }

    /// Layout of the same memory viewed with a size-1 axis inserted at `dim`
    ///
    /// The element count and every existing element's offset are unchanged.
    pub fn unsqueeze(&self, dim: usize) -> Result<Self> {
        let dim_order = self.dim_order.unsqueeze(dim)?;
        let mut shape = self.shape.clone();
        shape.insert(dim, 1);
        Ok(Self::from_parts(shape, dim_order))
    }

    /// Inverse of [`Layout::unsqueeze`]: drop the size-1 axis at `dim`
    pub fn squeeze(&self, dim: usize) -> Result<Self> {
        match self.shape.get(dim) {
            Some(1) => {}
            Some(_) => {
                return Err(Error::invalid_argument(
                    "dim",
                    format!(
                        "cannot squeeze dim {} of size {} in shape {:?}",
                        dim, self.shape[dim], self.shape
                    ),
                ));
            }
            None => {
                return Err(Error::InvalidDimension {
                    dim: dim as isize,
                    ndim: self.ndim(),
                });
            }
        }
        let dim_order = self.dim_order.squeeze(dim)?;
        let mut shape = self.shape.clone();
        shape.remove(dim);
        Ok(Self::from_parts(shape, dim_order))
    }

    /// Same dim order, new sizes of the same rank
    pub fn with_shape(&self, shape: &[usize]) -> Result<Self> {
        if shape.len() != self.ndim() {
            return Err(Error::shape_mismatch(&self.shape, shape));
        }
        Ok(Self::from_parts(Shape::from(shape), self.dim_order.clone()))
    }
}

impl fmt::Debug for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Layout {{ shape: {:?}, dim_order: {:?}, strides: {:?} }}",
            self.shape.as_slice(),
            self.dim_order.as_slice(),
            self.strides.as_slice()
        )
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.shape.as_slice())
    }
}
