//! Runtime backends for tensor computation
//!
//! Only a CPU backend exists. A client carries the execution configuration
//! (thread pool, split sizes) that operations dispatch through.

pub mod cpu;

pub use cpu::{CpuClient, ParallelismConfig};
