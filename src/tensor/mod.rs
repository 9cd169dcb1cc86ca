//! Tensor types
//!
//! This module provides the dense `Tensor` type together with the layout
//! machinery the convolution kernels are built on: dim orders, the strides
//! derived from them, and the strided index calculator.

mod core;
pub mod dim_order;
pub mod index;
mod layout;
mod shape;
mod storage;
mod strides;

pub use core::Tensor;
pub use dim_order::{DimOrder, dim_order_to_strides};
pub use index::{CoordIter, calculate_linear_index};
pub use layout::Layout;
pub use shape::Shape;
pub use storage::Storage;
pub use strides::Strides;
