//! CPU kernel implementations
//!
//! This module provides low-level compute kernels for CPU operations.
//! Kernels are generic over `T: Element`; the compute type is chosen by the op
//! layer through a single dtype dispatch per call.

pub mod bias;
pub mod conv;

pub use bias::{BiasLoader, LoadFn, get_load_to_compute_fn};
pub use conv::{Conv2dGeometry, conv2d_geometry, conv2d_kernel};
