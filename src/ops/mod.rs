//! Tensor operations
//!
//! Operations are defined as traits implemented by a runtime client, so the
//! client's execution configuration reaches every kernel it dispatches.
//!
//! ```text
//! CpuClient
//!   └── implements ConvOps
//!         ├── convolution_out / convolution (forward or transposed, 1D or 2D)
//!         └── conv1d, conv2d, conv_transpose1d, conv_transpose2d
//! ```
//!
//! # Layers
//!
//! 1. **Validation** ([`conv_common`]): argument checks and output-size inference.
//!    Every invalid combination is rejected here as an `Error`.
//! 2. **Dispatch** (`cpu/`): resize the output, pick the compute type from the
//!    input dtype and the bias load function from the bias dtype.
//! 3. **Kernels** (`runtime::cpu::kernels`): typed, validation-free loops over
//!    strided buffers.

pub mod conv_common;
pub(crate) mod cpu;
mod traits;

pub use traits::*;
