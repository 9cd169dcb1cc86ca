//! Shared validation and output-size arithmetic for convolution operations.
//!
//! Kernels assume mutually consistent shapes and never check them; everything
//! here runs first and rejects invalid combinations as `Error` values.

use crate::dtype::{DType, DTypeSet};
use crate::error::{Error, Result};
use crate::ops::ConvOptions;
use crate::runtime::cpu::kernels::conv::val_at;
use crate::tensor::{Shape, Tensor};

/// Validates that a tensor is 3-dimensional or 4-dimensional (1D or 2D convolution).
#[inline]
pub fn validate_conv_ndim(shape: &[usize], arg_name: &'static str, op: &'static str) -> Result<()> {
    if shape.len() != 3 && shape.len() != 4 {
        return Err(Error::InvalidArgument {
            arg: arg_name,
            reason: format!("{} expects 3D or 4D tensor, got {}D", op, shape.len()),
        });
    }
    Ok(())
}

/// Validates that a tensor is 1-dimensional (for bias).
#[inline]
pub fn validate_1d_tensor(shape: &[usize], arg_name: &'static str, op: &'static str) -> Result<()> {
    if shape.len() != 1 {
        return Err(Error::InvalidArgument {
            arg: arg_name,
            reason: format!("{} expects 1D tensor, got {}D", op, shape.len()),
        });
    }
    Ok(())
}

/// Validates that `got` matches the input dtype.
#[inline]
pub fn validate_same_dtype(input_dtype: DType, got: DType) -> Result<()> {
    if got != input_dtype {
        return Err(Error::DTypeMismatch {
            lhs: input_dtype,
            rhs: got,
        });
    }
    Ok(())
}

/// Validates that a value is non-zero.
#[inline]
pub fn validate_positive(value: usize, name: &'static str, op: &'static str) -> Result<()> {
    if value == 0 {
        return Err(Error::InvalidArgument {
            arg: name,
            reason: format!("{} requires {} > 0, got 0", op, name),
        });
    }
    Ok(())
}

/// Validates a per-axis parameter list length: 1 or `kernel_ndim`, or 0 when `allow_empty`.
#[inline]
pub fn validate_param_len(
    values: &[usize],
    kernel_ndim: usize,
    allow_empty: bool,
    name: &'static str,
    op: &'static str,
) -> Result<()> {
    let len = values.len();
    if len == 1 || len == kernel_ndim || (allow_empty && len == 0) {
        return Ok(());
    }
    Err(Error::InvalidArgument {
        arg: name,
        reason: format!(
            "{} expects {} to have {}1 or {} values, got {}",
            op,
            name,
            if allow_empty { "0, " } else { "" },
            kernel_ndim,
            len
        ),
    })
}

/// Validates that `channels` (the C_in or C_out named by `which`) is divisible by groups.
#[inline]
pub fn validate_groups(
    channels: usize,
    groups: usize,
    which: &'static str,
    op: &'static str,
) -> Result<()> {
    if !channels.is_multiple_of(groups) {
        return Err(Error::InvalidArgument {
            arg: "groups",
            reason: format!(
                "{} requires {} ({}) to be divisible by groups ({})",
                op, which, channels, groups
            ),
        });
    }
    Ok(())
}

/// Validates a weight channel axis against its expected size.
#[inline]
pub fn validate_weight_channels(
    axis: usize,
    expected: usize,
    got: usize,
    op: &'static str,
) -> Result<()> {
    if got != expected {
        return Err(Error::InvalidArgument {
            arg: "weight",
            reason: format!(
                "{} weight.shape[{}] should be {}, got {}",
                op, axis, expected, got
            ),
        });
    }
    Ok(())
}

/// Validates that bias has the correct length.
#[inline]
pub fn validate_bias_length(bias_len: usize, c_out: usize, op: &'static str) -> Result<()> {
    if bias_len != c_out {
        return Err(Error::InvalidArgument {
            arg: "bias",
            reason: format!(
                "{} bias should have length C_out = {}, got {}",
                op, c_out, bias_len
            ),
        });
    }
    Ok(())
}

/// Validates input, weight, bias, and parameters of a convolution call.
pub fn check_convolution_args(
    input: &Tensor,
    weight: &Tensor,
    bias: Option<&Tensor>,
    opts: &ConvOptions,
    op: &'static str,
) -> Result<()> {
    let in_shape = input.shape();
    let w_shape = weight.shape();

    // Validate dtypes
    validate_same_dtype(input.dtype(), weight.dtype())?;
    if !DTypeSet::REALH.contains(input.dtype()) {
        return Err(Error::UnsupportedDType {
            dtype: input.dtype(),
            op,
        });
    }

    // Validate tensor dimensions
    validate_conv_ndim(in_shape, "input", op)?;
    if w_shape.len() != in_shape.len() {
        return Err(Error::InvalidArgument {
            arg: "weight",
            reason: format!(
                "{} expects weight rank {} to match input rank {}",
                op,
                w_shape.len(),
                in_shape.len()
            ),
        });
    }
    let kernel_ndim = in_shape.len() - 2;
    for (axis, &k) in w_shape[2..].iter().enumerate() {
        if k == 0 {
            return Err(Error::InvalidArgument {
                arg: "weight",
                reason: format!("{} kernel size along spatial axis {} is 0", op, axis),
            });
        }
    }

    // Validate hyperparameters
    validate_param_len(&opts.stride, kernel_ndim, false, "stride", op)?;
    validate_param_len(&opts.padding, kernel_ndim, true, "padding", op)?;
    validate_param_len(&opts.dilation, kernel_ndim, true, "dilation", op)?;
    for &s in &opts.stride {
        validate_positive(s, "stride", op)?;
    }
    for &d in &opts.dilation {
        validate_positive(d, "dilation", op)?;
    }
    validate_positive(opts.groups, "groups", op)?;

    // Validate groups and weight channels
    let c_in = in_shape[1];
    let groups = opts.groups;
    validate_groups(c_in, groups, "C_in", op)?;
    let c_out = if opts.transposed {
        validate_weight_channels(0, c_in, w_shape[0], op)?;
        validate_param_len(&opts.output_padding, kernel_ndim, true, "output_padding", op)?;
        for axis in 0..kernel_ndim {
            let output_padding = val_at(&opts.output_padding, axis, 0);
            let limit = val_at(&opts.stride, axis, 1).max(val_at(&opts.dilation, axis, 1));
            if output_padding >= limit {
                return Err(Error::InvalidArgument {
                    arg: "output_padding",
                    reason: format!(
                        "{} output_padding ({}) must be smaller than max(stride, dilation) ({}) along spatial axis {}",
                        op, output_padding, limit, axis
                    ),
                });
            }
        }
        w_shape[1] * groups
    } else {
        let c_out = w_shape[0];
        validate_groups(c_out, groups, "C_out", op)?;
        validate_weight_channels(1, c_in / groups, w_shape[1], op)?;
        c_out
    };

    // Validate bias
    if let Some(bias) = bias {
        validate_1d_tensor(bias.shape(), "bias", op)?;
        validate_bias_length(bias.shape()[0], c_out, op)?;
        if !DTypeSet::REALHBF16.contains(bias.dtype()) {
            return Err(Error::UnsupportedDType {
                dtype: bias.dtype(),
                op,
            });
        }
    }

    Ok(())
}

/// Validates that `out` can receive the result: same dtype and dim order as `input`.
pub fn check_out_tensor(input: &Tensor, out: &Tensor, op: &'static str) -> Result<()> {
    validate_same_dtype(input.dtype(), out.dtype())?;
    if input.dim_order() != out.dim_order() {
        return Err(Error::InvalidArgument {
            arg: "out",
            reason: format!(
                "{} requires input and out to share a dim order, got {:?} and {:?}",
                op,
                input.dim_order(),
                out.dim_order()
            ),
        });
    }
    Ok(())
}

/// Computes output size for a single dimension in forward convolution.
///
/// output_size = floor((input_size + 2 * padding - dilation * (kernel_size - 1) - 1) / stride) + 1
///
/// The result may be zero or negative for kernels larger than the padded input.
#[inline]
pub fn compute_output_size(
    input_size: usize,
    kernel_size: usize,
    stride: usize,
    dilation: usize,
    padding: usize,
) -> isize {
    let numerator = input_size as isize + 2 * padding as isize
        - dilation as isize * (kernel_size as isize - 1)
        - 1;
    numerator.div_euclid(stride as isize) + 1
}

/// Computes output size for a single dimension in transposed convolution.
///
/// output_size = (input_size - 1) * stride - 2 * padding + dilation * (kernel_size - 1) + output_padding + 1
#[inline]
pub fn compute_transposed_output_size(
    input_size: usize,
    kernel_size: usize,
    stride: usize,
    dilation: usize,
    padding: usize,
    output_padding: usize,
) -> isize {
    (input_size as isize - 1) * stride as isize - 2 * padding as isize
        + dilation as isize * (kernel_size as isize - 1)
        + output_padding as isize
        + 1
}

/// Infers the output shape of a validated convolution call.
///
/// `[N, C_out, spatial...]` with C_out taken from the weight (times groups when
/// transposed). Returns `Error::InvalidArgument` if any spatial size is not positive.
pub fn get_convolution_out_target_size(
    input_shape: &[usize],
    weight_shape: &[usize],
    opts: &ConvOptions,
    op: &'static str,
) -> Result<Shape> {
    let c_out = if opts.transposed {
        weight_shape[1] * opts.groups
    } else {
        weight_shape[0]
    };

    let mut out = Shape::from([input_shape[0], c_out]);
    for (axis, (&in_size, &k)) in input_shape[2..]
        .iter()
        .zip(&weight_shape[2..])
        .enumerate()
    {
        let stride = val_at(&opts.stride, axis, 1);
        let padding = val_at(&opts.padding, axis, 0);
        let dilation = val_at(&opts.dilation, axis, 1);
        let size = if opts.transposed {
            let output_padding = val_at(&opts.output_padding, axis, 0);
            compute_transposed_output_size(in_size, k, stride, dilation, padding, output_padding)
        } else {
            compute_output_size(in_size, k, stride, dilation, padding)
        };
        if size <= 0 {
            return Err(Error::InvalidArgument {
                arg: "input",
                reason: format!(
                    "{} computed output size {} along spatial axis {} is too small (input {:?}, weight {:?})",
                    op, size, axis, input_shape, weight_shape
                ),
            });
        }
        out.insert(out.ndim(), size as usize);
    }
    Ok(out)
}
