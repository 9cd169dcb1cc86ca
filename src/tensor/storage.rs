//! Storage: owned, aligned, dtype-tagged CPU memory

use crate::dtype::{DType, Element};
use crate::error::{Error, Result};
use std::alloc::{Layout as AllocLayout, alloc_zeroed, dealloc};
use std::ptr::NonNull;

/// Alignment of every allocation (AVX-512 friendly)
const ALIGN: usize = 64;

/// Storage for tensor data
///
/// Owns a zero-initialized, 64-byte aligned byte buffer holding `len` elements
/// of `dtype`. Typed access checks the requested element type against the tag.
pub struct Storage {
    ptr: NonNull<u8>,
    /// Number of elements (not bytes)
    len: usize,
    dtype: DType,
}

// SAFETY: Storage uniquely owns its allocation; shared access is read-only and
// mutation requires `&mut self`.
unsafe impl Send for Storage {}
unsafe impl Sync for Storage {}

impl Storage {
    /// Allocate `len` zeroed elements of `dtype`.
    pub fn zeros(len: usize, dtype: DType) -> Result<Self> {
        let size = len
            .checked_mul(dtype.size_in_bytes())
            .ok_or(Error::OutOfMemory { size: usize::MAX })?;
        if size == 0 {
            return Ok(Self {
                ptr: NonNull::<u64>::dangling().cast(),
                len,
                dtype,
            });
        }
        let layout =
            AllocLayout::from_size_align(size, ALIGN).map_err(|_| Error::OutOfMemory { size })?;
        // SAFETY: layout has non-zero size
        let raw = unsafe { alloc_zeroed(layout) };
        let ptr = NonNull::new(raw).ok_or(Error::OutOfMemory { size })?;
        Ok(Self { ptr, len, dtype })
    }

    /// Allocate storage holding a copy of `data`.
    pub fn from_slice<T: Element>(data: &[T]) -> Result<Self> {
        let mut storage = Self::zeros(data.len(), T::DTYPE)?;
        storage.as_bytes_mut().copy_from_slice(bytemuck::cast_slice(data));
        Ok(storage)
    }

    /// Element type
    #[inline]
    pub fn dtype(&self) -> DType {
        self.dtype
    }

    /// Number of elements
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the storage holds no elements
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Size in bytes
    #[inline]
    pub fn nbytes(&self) -> usize {
        self.len * self.dtype.size_in_bytes()
    }

    /// Raw bytes, in physical order
    pub fn as_bytes(&self) -> &[u8] {
        // SAFETY: ptr is valid for nbytes (or dangling with nbytes == 0)
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.nbytes()) }
    }

    /// Raw mutable bytes, in physical order
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        // SAFETY: as above, and &mut self guarantees exclusivity
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.nbytes()) }
    }

    /// Typed view of the elements, in physical order
    pub fn as_slice<T: Element>(&self) -> Result<&[T]> {
        self.check_dtype::<T>()?;
        // SAFETY: dtype matches T, allocation is aligned to ALIGN >= align_of::<T>()
        Ok(unsafe { std::slice::from_raw_parts(self.ptr.as_ptr() as *const T, self.len) })
    }

    /// Typed mutable view of the elements, in physical order
    pub fn as_mut_slice<T: Element>(&mut self) -> Result<&mut [T]> {
        self.check_dtype::<T>()?;
        // SAFETY: as above, and &mut self guarantees exclusivity
        Ok(unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr() as *mut T, self.len) })
    }

    fn check_dtype<T: Element>(&self) -> Result<()> {
        if T::DTYPE != self.dtype {
            return Err(Error::DTypeMismatch {
                lhs: self.dtype,
                rhs: T::DTYPE,
            });
        }
        Ok(())
    }
}

impl Clone for Storage {
    fn clone(&self) -> Self {
        let mut copy = match Self::zeros(self.len, self.dtype) {
            Ok(copy) => copy,
            Err(_) => std::alloc::handle_alloc_error(
                AllocLayout::from_size_align(self.nbytes(), ALIGN)
                    .unwrap_or_else(|_| AllocLayout::new::<u8>()),
            ),
        };
        copy.as_bytes_mut().copy_from_slice(self.as_bytes());
        copy
    }
}

impl Drop for Storage {
    fn drop(&mut self) {
        let size = self.nbytes();
        if size == 0 {
            return;
        }
        // SAFETY: the same layout was used for the allocation
        unsafe {
            let layout = AllocLayout::from_size_align_unchecked(size, ALIGN);
            dealloc(self.ptr.as_ptr(), layout);
        }
    }
}

impl std::fmt::Debug for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storage")
            .field("len", &self.len)
            .field("dtype", &self.dtype)
            .finish()
    }
}
