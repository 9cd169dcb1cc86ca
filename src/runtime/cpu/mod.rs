//! CPU runtime implementation
//!
//! The CPU runtime provides the reference implementation of every operation.
//!
//! # Non-row-major Tensors
//!
//! Kernels never assume row-major memory. Each buffer is addressed through the
//! strides derived from its dim order, so channels-last (or any permuted)
//! tensors are read and written in place without a relayout.

mod client;
pub(crate) mod helpers;
pub mod kernels;

pub use client::{CpuClient, ParallelismConfig};
