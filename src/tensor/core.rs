//! Core Tensor type

use super::index::{CoordIter, calculate_linear_index};
use super::{Layout, Storage};
use crate::dtype::{DType, Element};
use crate::error::{Error, Result};
use std::fmt;

/// Dense n-dimensional array in CPU memory
///
/// `Tensor` consists of:
/// - **Storage**: owned, aligned memory tagged with its element type
/// - **Layout**: shape, dim order, and the strides derived from them
///
/// The logical shape is independent of the physical order: an NCHW tensor may be
/// stored row-major or channels-last, and every accessor here speaks logical
/// coordinates.
///
/// # Example
///
/// ```
/// use strided_conv::tensor::Tensor;
///
/// let t = Tensor::from_slice(&[1.0f32, 2.0, 3.0, 4.0], &[1, 2, 2]);
/// let nhwc = t.to_dim_order(&[0, 2, 1]).unwrap();
/// assert_eq!(nhwc.as_slice::<f32>().unwrap(), &[1.0, 3.0, 2.0, 4.0]);
/// assert_eq!(nhwc.to_vec::<f32>(), vec![1.0, 2.0, 3.0, 4.0]);
/// ```
#[derive(Clone)]
pub struct Tensor {
    /// Element memory, in physical order
    storage: Storage,
    /// Shape, dim order, strides
    layout: Layout,
}

impl Tensor {
    /// Create a tensor from storage and layout
    ///
    /// Returns an error if the storage does not hold exactly `layout.elem_count()` elements.
    pub fn from_parts(storage: Storage, layout: Layout) -> Result<Self> {
        if storage.len() != layout.elem_count() {
            return Err(Error::ShapeMismatch {
                expected: layout.shape().to_vec(),
                got: vec![storage.len()],
            });
        }
        Ok(Self { storage, layout })
    }

    /// Create a row-major tensor from a slice of data
    ///
    /// # Panics
    ///
    /// Panics if `data.len()` does not equal the product of the `shape` dimensions.
    /// For a fallible alternative, use [`Self::try_from_slice`].
    pub fn from_slice<T: Element>(data: &[T], shape: &[usize]) -> Self {
        Self::try_from_slice(data, shape).expect("Tensor::from_slice failed")
    }

    /// Create a row-major tensor from a slice of data (fallible version)
    pub fn try_from_slice<T: Element>(data: &[T], shape: &[usize]) -> Result<Self> {
        let expected_len: usize = shape.iter().product();
        if data.len() != expected_len {
            return Err(Error::ShapeMismatch {
                expected: shape.to_vec(),
                got: vec![data.len()],
            });
        }
        Self::from_parts(Storage::from_slice(data)?, Layout::contiguous(shape))
    }

    /// Create a tensor stored in `dim_order` from data given in logical row-major order
    pub fn from_slice_with_dim_order<T: Element>(
        data: &[T],
        shape: &[usize],
        dim_order: &[usize],
    ) -> Result<Self> {
        Self::try_from_slice(data, shape)?.to_dim_order(dim_order)
    }

    /// Create a row-major tensor filled with zeros
    ///
    /// # Panics
    ///
    /// Panics if allocation fails. For a fallible alternative, use [`Self::try_zeros`].
    pub fn zeros(shape: &[usize], dtype: DType) -> Self {
        Self::try_zeros(shape, dtype).expect("Tensor::zeros failed")
    }

    /// Create a row-major tensor filled with zeros (fallible version)
    pub fn try_zeros(shape: &[usize], dtype: DType) -> Result<Self> {
        Self::zeros_with_layout(Layout::contiguous(shape), dtype)
    }

    /// Create a zero tensor stored in `dim_order`
    pub fn zeros_with_dim_order(shape: &[usize], dtype: DType, dim_order: &[usize]) -> Result<Self> {
        Self::zeros_with_layout(Layout::with_dim_order(shape, dim_order)?, dtype)
    }

    fn zeros_with_layout(layout: Layout, dtype: DType) -> Result<Self> {
        let storage = Storage::zeros(layout.elem_count(), dtype)?;
        Ok(Self { storage, layout })
    }

    // ===== Accessors =====

    /// Get the storage
    #[inline]
    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    /// Get the layout
    #[inline]
    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Get the shape
    #[inline]
    pub fn shape(&self) -> &[usize] {
        self.layout.shape()
    }

    /// Get the strides
    #[inline]
    pub fn strides(&self) -> &[isize] {
        self.layout.strides()
    }

    /// Get the dim order
    #[inline]
    pub fn dim_order(&self) -> &[usize] {
        self.layout.dim_order()
    }

    /// Number of dimensions
    #[inline]
    pub fn ndim(&self) -> usize {
        self.layout.ndim()
    }

    /// Total number of elements
    #[inline]
    pub fn numel(&self) -> usize {
        self.layout.elem_count()
    }

    /// Element type
    #[inline]
    pub fn dtype(&self) -> DType {
        self.storage.dtype()
    }

    /// Size of one element in bytes
    #[inline]
    pub fn element_size(&self) -> usize {
        self.dtype().size_in_bytes()
    }

    /// Size of the data in bytes
    #[inline]
    pub fn nbytes(&self) -> usize {
        self.storage.nbytes()
    }

    /// Whether memory is in row-major order
    #[inline]
    pub fn is_contiguous(&self) -> bool {
        self.layout.is_contiguous()
    }

    /// Whether memory is in channels-last order
    #[inline]
    pub fn is_channels_last(&self) -> bool {
        self.layout.is_channels_last()
    }

    /// Size along a dimension (supports negative indexing)
    #[inline]
    pub fn size(&self, dim: isize) -> Option<usize> {
        self.layout.dim(dim)
    }

    // ===== Data Access =====

    /// Typed view of the elements in physical order
    pub fn as_slice<T: Element>(&self) -> Result<&[T]> {
        self.storage.as_slice()
    }

    /// Typed mutable view of the elements in physical order
    pub fn as_mut_slice<T: Element>(&mut self) -> Result<&mut [T]> {
        self.storage.as_mut_slice()
    }

    /// Read one element by logical coordinate
    pub fn get<T: Element>(&self, indices: &[usize]) -> Result<T> {
        let offset = self.layout.index(indices).ok_or_else(|| {
            Error::invalid_argument(
                "indices",
                format!("{:?} out of bounds for shape {:?}", indices, self.shape()),
            )
        })?;
        Ok(self.as_slice::<T>()?[offset])
    }

    /// Copy the elements to a Vec in logical row-major order
    ///
    /// # Panics
    ///
    /// Panics if `T` does not match the tensor dtype. For a fallible
    /// alternative, use [`Self::try_to_vec`].
    pub fn to_vec<T: Element>(&self) -> Vec<T> {
        self.try_to_vec().expect("Tensor::to_vec failed")
    }

    /// Copy the elements to a Vec in logical row-major order (fallible version)
    pub fn try_to_vec<T: Element>(&self) -> Result<Vec<T>> {
        let data = self.as_slice::<T>()?;
        if self.is_contiguous() {
            return Ok(data.to_vec());
        }
        let strides = self.strides();
        Ok(CoordIter::new(self.shape())
            .map(|coord| data[calculate_linear_index(&coord, strides) as usize])
            .collect())
    }

    // ===== Layout Changes =====

    /// Copy into a new tensor with the same logical values stored in `dim_order`
    pub fn to_dim_order(&self, dim_order: &[usize]) -> Result<Self> {
        let layout = Layout::with_dim_order(self.shape(), dim_order)?;
        let mut out = Self::zeros_with_layout(layout, self.dtype())?;
        let elem = self.element_size();
        let src = self.storage.as_bytes();
        let src_strides = self.strides();
        let dst_strides = out.layout.strides().to_vec();
        let dst = out.storage.as_bytes_mut();
        for coord in CoordIter::new(self.shape()) {
            let from = calculate_linear_index(&coord, src_strides) as usize * elem;
            let to = calculate_linear_index(&coord, &dst_strides) as usize * elem;
            dst[to..to + elem].copy_from_slice(&src[from..from + elem]);
        }
        Ok(out)
    }

    /// Resize to `shape`, keeping rank, dtype, and dim order
    ///
    /// Storage is reallocated (zeroed) only when the element count changes.
    /// Returns whether a reallocation happened.
    pub fn resize(&mut self, shape: &[usize]) -> Result<bool> {
        if shape == self.shape() {
            return Ok(false);
        }
        let layout = self.layout.with_shape(shape)?;
        let realloc = layout.elem_count() != self.storage.len();
        if realloc {
            self.storage = Storage::zeros(layout.elem_count(), self.dtype())?;
        }
        self.layout = layout;
        Ok(realloc)
    }
}

impl fmt::Debug for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tensor")
            .field("shape", &self.shape())
            .field("dim_order", &self.dim_order())
            .field("dtype", &self.dtype())
            .finish()
    }
}
