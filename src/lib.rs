//! # strided-conv
//!
//! **Layout-aware strided convolution for dense multi-dimensional buffers.**
//!
//! strided-conv computes forward and transposed 2-D convolution (and 1-D
//! convolution through the same kernel) over tensors whose physical memory order
//! is given by an explicit dim order rather than assumed row-major.
//!
//! ## Features
//!
//! - **Any layout**: row-major, channels-last, or any permutation; every access
//!   goes through strides derived from the tensor's dim order
//! - **Forward and transposed**: gather and scatter-accumulate kernels
//! - **Grouped, strided, padded, dilated** sampling per spatial axis
//! - **Mixed-dtype bias**: bias stored in any supported dtype, converted on load
//! - **Integer and float compute types**: f64, f32, i64, i32, i16, i8, u8 (and f16)
//!
//! ## Quick Start
//!
//! ```rust
//! use strided_conv::prelude::*;
//!
//! let client = CpuClient::new();
//! let data: Vec<f32> = (0..16).map(|v| v as f32).collect();
//! let input = Tensor::from_slice_with_dim_order(&data, &[1, 1, 4, 4], &[0, 2, 3, 1])?;
//! let weight = Tensor::from_slice(&[1.0f32; 4], &[1, 1, 2, 2]);
//!
//! let out = client.conv2d(&input, &weight, None, (1, 1), (0, 0), (1, 1), 1)?;
//! assert_eq!(out.shape(), &[1, 1, 3, 3]);
//! assert!(out.is_channels_last());
//! assert_eq!(out.get::<f32>(&[0, 0, 0, 0])?, 10.0);
//! # Ok::<(), strided_conv::error::Error>(())
//! ```
//!
//! ## Feature Flags
//!
//! - `rayon` (default): Multi-threaded CPU kernels
//! - `f16`: Half-precision floats (F16 compute, F16/BF16 bias)

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod dtype;
pub mod error;
pub mod ops;
pub mod runtime;
pub mod tensor;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::dtype::{DType, Element};
    pub use crate::error::{Error, Result};
    pub use crate::ops::{ConvOps, ConvOptions};
    pub use crate::runtime::cpu::{CpuClient, ParallelismConfig};
    pub use crate::tensor::{DimOrder, Layout, Tensor};
}
