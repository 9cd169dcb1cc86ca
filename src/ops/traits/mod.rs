//! Operation traits for tensor operations.
//!
//! Implementations live in the backend-specific modules (`cpu/`).

mod conv;

pub use conv::{ConvOps, ConvOptions, ConvParam};
