//! Convolution operations over strided, layout-aware tensors.
//!
//! This module defines the `ConvOps` trait for forward and transposed 1D/2D
//! convolution, and `ConvOptions`, the parameter bundle every entry point shares.

use crate::error::Result;
use crate::tensor::Tensor;
use smallvec::{SmallVec, smallvec};

/// Per-spatial-axis parameter list: empty, one value broadcast to every axis, or one per axis.
pub type ConvParam = SmallVec<[usize; 2]>;

/// Parameters of one convolution call.
///
/// `stride`, `padding`, `dilation`, and `output_padding` take either one value
/// (broadcast to every spatial axis) or one value per spatial axis, height first.
/// An empty `padding` or `output_padding` means 0 and an empty `dilation` means 1.
///
/// # Example
///
/// ```
/// use strided_conv::ops::ConvOptions;
///
/// let opts = ConvOptions::new().with_stride(&[2, 1]).with_padding(&[1]).with_groups(2);
/// assert_eq!(opts.stride.as_slice(), &[2, 1]);
/// assert!(!opts.transposed);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvOptions {
    /// Sampling stride
    pub stride: ConvParam,
    /// Implicit zero padding on both sides of each spatial axis
    pub padding: ConvParam,
    /// Spacing between kernel taps
    pub dilation: ConvParam,
    /// Scatter-accumulate (transposed) instead of gather (forward) convolution
    pub transposed: bool,
    /// Extra size added to one side of each transposed output axis
    pub output_padding: ConvParam,
    /// Number of channel groups
    pub groups: usize,
}

impl Default for ConvOptions {
    fn default() -> Self {
        Self {
            stride: smallvec![1],
            padding: smallvec![0],
            dilation: smallvec![1],
            transposed: false,
            output_padding: smallvec![0],
            groups: 1,
        }
    }
}

impl ConvOptions {
    /// Forward convolution, stride 1, no padding, no dilation, one group
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the stride
    pub fn with_stride(mut self, stride: &[usize]) -> Self {
        self.stride = SmallVec::from_slice(stride);
        self
    }

    /// Set the padding
    pub fn with_padding(mut self, padding: &[usize]) -> Self {
        self.padding = SmallVec::from_slice(padding);
        self
    }

    /// Set the dilation
    pub fn with_dilation(mut self, dilation: &[usize]) -> Self {
        self.dilation = SmallVec::from_slice(dilation);
        self
    }

    /// Select transposed (scatter-accumulate) mode
    pub fn with_transposed(mut self, transposed: bool) -> Self {
        self.transposed = transposed;
        self
    }

    /// Set the transposed-mode output padding
    pub fn with_output_padding(mut self, output_padding: &[usize]) -> Self {
        self.output_padding = SmallVec::from_slice(output_padding);
        self
    }

    /// Set the number of channel groups
    pub fn with_groups(mut self, groups: usize) -> Self {
        self.groups = groups;
        self
    }
}

/// Convolution operations.
///
/// Forward and transposed convolution over 3D (1D convolution) or 4D (2D
/// convolution) tensors in any dim order. Outputs keep the input's dim order.
///
/// # Memory Layout
///
/// Shapes are logical; physical order follows each tensor's dim order:
/// - **Input**: (N, C_in, H, W) or (N, C_in, L)
/// - **Weight**: (C_out, C_in/groups, K_h, K_w), or (C_in, C_out/groups, K_h, K_w) when transposed
/// - **Bias**: (C_out,) - one bias per output channel, in any supported bias dtype
/// - **Output**: (N, C_out, H_out, W_out) or (N, C_out, L_out)
///
/// # Data Types
///
/// Input, weight, and output share one compute dtype: F64, F32, I64, I32, I16,
/// I8, U8, and F16 with the `f16` feature. Bias may additionally be BF16.
/// Integer accumulation wraps on overflow.
pub trait ConvOps {
    /// Convolve into a caller-provided output tensor.
    ///
    /// `out` must have the input's dtype and dim order. It is resized to the
    /// convolution output shape (reallocating only when the element count
    /// changes) and then fully overwritten. When the output has no elements the
    /// call returns after the resize without running the kernel.
    ///
    /// Output spatial sizes:
    /// - forward: `floor((in + 2*padding - dilation*(k - 1) - 1) / stride) + 1`
    /// - transposed: `(in - 1)*stride - 2*padding + dilation*(k - 1) + output_padding + 1`
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidArgument` if:
    /// - Input is not a 3D or 4D tensor, or weight rank differs from input rank
    /// - A parameter list has the wrong length, or stride/dilation/groups is 0
    /// - Channels are not divisible by groups, or weight channels do not match
    /// - Bias is not a 1D tensor with length C_out
    /// - `output_padding` is not smaller than `max(stride, dilation)` (transposed)
    /// - `input` and `out` have different dim orders
    /// - An output spatial size would be non-positive
    ///
    /// Returns `Error::DTypeMismatch` if weight or out dtype differs from input dtype,
    /// and `Error::UnsupportedDType` for dtypes outside the supported sets.
    ///
    /// On error `out` is left untouched.
    fn convolution_out(
        &self,
        input: &Tensor,
        weight: &Tensor,
        bias: Option<&Tensor>,
        opts: &ConvOptions,
        out: &mut Tensor,
    ) -> Result<()>;

    /// Convolve into a newly allocated output in the input's dim order.
    ///
    /// Same validation and semantics as [`ConvOps::convolution_out`].
    fn convolution(
        &self,
        input: &Tensor,
        weight: &Tensor,
        bias: Option<&Tensor>,
        opts: &ConvOptions,
    ) -> Result<Tensor>;

    /// Applies a 1D convolution over an input signal.
    ///
    /// Given input of shape (N, C_in, L) and weight of shape (C_out, C_in/groups, K),
    /// produces output of shape (N, C_out, L_out).
    ///
    /// # Examples
    ///
    /// ```
    /// use strided_conv::prelude::*;
    ///
    /// let client = CpuClient::new();
    /// let input = Tensor::from_slice(&[1.0f32, 2.0, 3.0, 4.0], &[1, 1, 4]);
    /// let weight = Tensor::from_slice(&[1.0f32, -1.0], &[1, 1, 2]);
    /// let out = client.conv1d(&input, &weight, None, 1, 0, 1, 1).unwrap();
    /// assert_eq!(out.shape(), &[1, 1, 3]);
    /// assert_eq!(out.to_vec::<f32>(), vec![-1.0, -1.0, -1.0]);
    /// ```
    #[allow(clippy::too_many_arguments)]
    fn conv1d(
        &self,
        input: &Tensor,
        weight: &Tensor,
        bias: Option<&Tensor>,
        stride: usize,
        padding: usize,
        dilation: usize,
        groups: usize,
    ) -> Result<Tensor> {
        let opts = ConvOptions::new()
            .with_stride(&[stride])
            .with_padding(&[padding])
            .with_dilation(&[dilation])
            .with_groups(groups);
        self.convolution(input, weight, bias, &opts)
    }

    /// Applies a 2D convolution over an input image.
    ///
    /// Given input of shape (N, C_in, H, W) and weight of shape (C_out, C_in/groups, K_h, K_w),
    /// produces output of shape (N, C_out, H_out, W_out). Pairs are (height, width).
    #[allow(clippy::too_many_arguments)]
    fn conv2d(
        &self,
        input: &Tensor,
        weight: &Tensor,
        bias: Option<&Tensor>,
        stride: (usize, usize),
        padding: (usize, usize),
        dilation: (usize, usize),
        groups: usize,
    ) -> Result<Tensor> {
        let opts = ConvOptions::new()
            .with_stride(&[stride.0, stride.1])
            .with_padding(&[padding.0, padding.1])
            .with_dilation(&[dilation.0, dilation.1])
            .with_groups(groups);
        self.convolution(input, weight, bias, &opts)
    }

    /// Applies a 1D transposed convolution.
    ///
    /// Given input of shape (N, C_in, L) and weight of shape (C_in, C_out/groups, K),
    /// produces output of shape (N, C_out, L_out).
    #[allow(clippy::too_many_arguments)]
    fn conv_transpose1d(
        &self,
        input: &Tensor,
        weight: &Tensor,
        bias: Option<&Tensor>,
        stride: usize,
        padding: usize,
        output_padding: usize,
        dilation: usize,
        groups: usize,
    ) -> Result<Tensor> {
        let opts = ConvOptions::new()
            .with_transposed(true)
            .with_stride(&[stride])
            .with_padding(&[padding])
            .with_output_padding(&[output_padding])
            .with_dilation(&[dilation])
            .with_groups(groups);
        self.convolution(input, weight, bias, &opts)
    }

    /// Applies a 2D transposed convolution.
    ///
    /// Given input of shape (N, C_in, H, W) and weight of shape (C_in, C_out/groups, K_h, K_w),
    /// produces output of shape (N, C_out, H_out, W_out). Pairs are (height, width).
    #[allow(clippy::too_many_arguments)]
    fn conv_transpose2d(
        &self,
        input: &Tensor,
        weight: &Tensor,
        bias: Option<&Tensor>,
        stride: (usize, usize),
        padding: (usize, usize),
        output_padding: (usize, usize),
        dilation: (usize, usize),
        groups: usize,
    ) -> Result<Tensor> {
        let opts = ConvOptions::new()
            .with_transposed(true)
            .with_stride(&[stride.0, stride.1])
            .with_padding(&[padding.0, padding.1])
            .with_output_padding(&[output_padding.0, output_padding.1])
            .with_dilation(&[dilation.0, dilation.1])
            .with_groups(groups);
        self.convolution(input, weight, bias, &opts)
    }
}
