//! Bias loading: read one bias element in its stored dtype, return it in the compute type.
//!
//! A bias tensor may be stored in a different dtype than the one a convolution
//! computes in (e.g. BF16 bias for an F32 convolution). The op layer picks a
//! [`LoadFn`] from [`get_load_to_compute_fn`] once per call; the kernel only ever
//! sees the compute type.

use crate::dtype::{DType, Element};
use crate::error::{Error, Result};
use crate::tensor::Tensor;

/// Converts the bytes of one stored element into the compute type `T`.
pub type LoadFn<T> = fn(&[u8]) -> T;

#[inline]
fn load_same<T: Element>(bytes: &[u8]) -> T {
    bytemuck::pod_read_unaligned(&bytes[..std::mem::size_of::<T>()])
}

#[inline]
fn load_and_convert<S: Element, T: Element>(bytes: &[u8]) -> T {
    let value: S = bytemuck::pod_read_unaligned(&bytes[..std::mem::size_of::<S>()]);
    T::from_f64(value.to_f64())
}

#[inline]
fn load_and_wrap<S: Element, T: Element>(bytes: &[u8]) -> T {
    let value: S = bytemuck::pod_read_unaligned(&bytes[..std::mem::size_of::<S>()]);
    T::from_i64_wrapping(value.to_i64())
}

/// Integer sources narrow with wrapping into integer compute types; a float on
/// either side goes through f64.
fn load_int<S: Element, T: Element>() -> LoadFn<T> {
    if T::DTYPE.is_int() {
        load_and_wrap::<S, T>
    } else {
        load_and_convert::<S, T>
    }
}

/// Select the load function converting elements of `dtype` to `T`.
///
/// Returns [`Error::UnsupportedDType`] when `dtype` is not a bias dtype this
/// build can read (F16/BF16 require the `f16` feature).
pub fn get_load_to_compute_fn<T: Element>(dtype: DType, op: &'static str) -> Result<LoadFn<T>> {
    if dtype == T::DTYPE {
        return Ok(load_same::<T>);
    }
    let load: LoadFn<T> = match dtype {
        DType::F64 => load_and_convert::<f64, T>,
        DType::F32 => load_and_convert::<f32, T>,
        DType::I64 => load_int::<i64, T>(),
        DType::I32 => load_int::<i32, T>(),
        DType::I16 => load_int::<i16, T>(),
        DType::I8 => load_int::<i8, T>(),
        DType::U8 => load_int::<u8, T>(),
        #[cfg(feature = "f16")]
        DType::F16 => load_and_convert::<half::f16, T>,
        #[cfg(feature = "f16")]
        DType::BF16 => load_and_convert::<half::bf16, T>,
        #[allow(unreachable_patterns)]
        _ => return Err(Error::unsupported_dtype(dtype, op)),
    };
    Ok(load)
}

/// Per-channel bias values of a 1-d bias tensor, converted on load.
#[derive(Clone, Copy)]
pub struct BiasLoader<'a, T> {
    bytes: &'a [u8],
    elem_size: usize,
    load: LoadFn<T>,
}

impl<'a, T: Element> BiasLoader<'a, T> {
    /// Wrap a 1-d bias tensor with the load function for its dtype.
    pub fn new(bias: &'a Tensor, load: LoadFn<T>) -> Self {
        Self {
            bytes: bias.storage().as_bytes(),
            elem_size: bias.element_size(),
            load,
        }
    }

    /// Bias value for output channel `channel`.
    #[inline]
    pub fn load(&self, channel: usize) -> T {
        let start = channel * self.elem_size;
        (self.load)(&self.bytes[start..start + self.elem_size])
    }
}

impl<T> std::fmt::Debug for BiasLoader<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BiasLoader")
            .field("nbytes", &self.bytes.len())
            .field("elem_size", &self.elem_size)
            .finish()
    }
}
