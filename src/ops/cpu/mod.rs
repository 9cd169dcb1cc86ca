//! CPU implementation of tensor operations.
//!
//! This module contains the operation trait implementations for `CpuClient`.

pub mod conv;
