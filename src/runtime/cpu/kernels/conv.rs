//! CPU convolution kernels.
//!
//! Direct strided convolution without im2col. Every buffer access goes through
//! [`calculate_linear_index`] with strides derived from each tensor's dim order,
//! so the same loops serve row-major, channels-last, or any other physical layout.
//!
//! 1-D convolution runs through the 2-D kernel: 3-d layouts are lifted to 4-d by
//! inserting a size-1 height axis at dim 2 with stride 1, padding 0, dilation 1.

use super::bias::BiasLoader;
use crate::dtype::Element;
use crate::error::{Error, Result};
use crate::runtime::cpu::CpuClient;
use crate::tensor::{CoordIter, Layout, calculate_linear_index};

/// Sizes, strides, and sampling parameters of one 2-D convolution call.
///
/// All tensors are viewed as 4-d `[N, C, H, W]`; strides are in elements.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Conv2dGeometry {
    /// Input sizes `[N, C_in, H_in, W_in]`
    pub in_sizes: [usize; 4],
    /// Input strides
    pub in_strides: [isize; 4],
    /// Weight sizes, `[C_out, C_in/groups, kH, kW]` or `[C_in, C_out/groups, kH, kW]` when transposed
    pub w_sizes: [usize; 4],
    /// Weight strides
    pub w_strides: [isize; 4],
    /// Output sizes `[N, C_out, H_out, W_out]`
    pub out_sizes: [usize; 4],
    /// Output strides
    pub out_strides: [isize; 4],
    /// Sampling stride `[y, x]`
    pub stride: [isize; 2],
    /// Zero padding `[y, x]`
    pub padding: [isize; 2],
    /// Kernel dilation `[y, x]`
    pub dilation: [isize; 2],
    /// Channel groups
    pub groups: usize,
}

impl Conv2dGeometry {
    /// Input channels read by each group
    #[inline]
    pub fn in_channels_per_group(&self) -> usize {
        self.in_sizes[1] / self.groups
    }

    /// Output channels written by each group
    #[inline]
    pub fn out_channels_per_group(&self) -> usize {
        self.out_sizes[1] / self.groups
    }

    /// Number of independent (batch, output-channel) work items
    #[inline]
    pub fn work_items(&self) -> usize {
        self.out_sizes[0] * self.out_sizes[1]
    }
}

/// Element `i` of a length-0/1/n parameter list: empty gives `default`, length 1 broadcasts.
#[inline]
pub(crate) fn val_at(values: &[usize], i: usize, default: usize) -> usize {
    match values.len() {
        0 => default,
        1 => values[0],
        _ => values[i],
    }
}

fn to_4d(layout: &Layout) -> ([usize; 4], [isize; 4]) {
    let mut sizes = [0usize; 4];
    let mut strides = [0isize; 4];
    sizes.copy_from_slice(layout.shape());
    strides.copy_from_slice(layout.strides());
    (sizes, strides)
}

/// Build the 4-d geometry for already-validated input, weight, and output layouts.
///
/// 3-d layouts are lifted to 4-d; any other rank is rejected.
pub fn conv2d_geometry(
    input: &Layout,
    weight: &Layout,
    output: &Layout,
    stride: &[usize],
    padding: &[usize],
    dilation: &[usize],
    groups: usize,
) -> Result<Conv2dGeometry> {
    let ndim = input.ndim();
    if weight.ndim() != ndim || output.ndim() != ndim {
        return Err(Error::invalid_argument(
            "weight",
            format!(
                "convolution tensors must share a rank, got input {}D, weight {}D, output {}D",
                ndim,
                weight.ndim(),
                output.ndim()
            ),
        ));
    }

    let (input, weight, output, stride, padding, dilation) = match ndim {
        4 => (
            input.clone(),
            weight.clone(),
            output.clone(),
            [val_at(stride, 0, 1), val_at(stride, 1, 1)],
            [val_at(padding, 0, 0), val_at(padding, 1, 0)],
            [val_at(dilation, 0, 1), val_at(dilation, 1, 1)],
        ),
        3 => (
            input.unsqueeze(2)?,
            weight.unsqueeze(2)?,
            output.unsqueeze(2)?,
            [1, val_at(stride, 0, 1)],
            [0, val_at(padding, 0, 0)],
            [1, val_at(dilation, 0, 1)],
        ),
        _ => {
            return Err(Error::invalid_argument(
                "input",
                format!("convolution expects 3D or 4D tensors, got {}D", ndim),
            ));
        }
    };

    let (in_sizes, in_strides) = to_4d(&input);
    let (w_sizes, w_strides) = to_4d(&weight);
    let (out_sizes, out_strides) = to_4d(&output);

    Ok(Conv2dGeometry {
        in_sizes,
        in_strides,
        w_sizes,
        w_strides,
        out_sizes,
        out_strides,
        stride: stride.map(|v| v as isize),
        padding: padding.map(|v| v as isize),
        dilation: dilation.map(|v| v as isize),
        groups,
    })
}

/// Gather one output channel of a forward convolution.
///
/// `out_c` is the absolute output channel; `group` must be the group owning it.
///
/// # Safety
///
/// - `input`, `weight`, `output` must be valid for every offset `geom` can produce
/// - no other thread may write the `(batch, out_c)` plane of `output` concurrently
#[allow(clippy::too_many_arguments)]
unsafe fn conv2d_forward_channel<T: Element>(
    input: *const T,
    weight: *const T,
    bias: Option<T>,
    output: *mut T,
    geom: &Conv2dGeometry,
    batch: usize,
    group: usize,
    out_c: usize,
) {
    let [_, _, in_h, in_w] = geom.in_sizes;
    let [_, _, w_h, w_w] = geom.w_sizes;
    let [_, _, out_h, out_w] = geom.out_sizes;
    let [stride_y, stride_x] = geom.stride;
    let [pad_y, pad_x] = geom.padding;
    let [dil_y, dil_x] = geom.dilation;

    let in_c_per_group = geom.in_channels_per_group();
    let in_c_start = group * in_c_per_group;

    for out_y in 0..out_h {
        for out_x in 0..out_w {
            let mut acc = T::zero();

            for in_c in in_c_start..in_c_start + in_c_per_group {
                for w_y in 0..w_h {
                    let in_y = stride_y * out_y as isize + dil_y * w_y as isize - pad_y;
                    if in_y < 0 || in_y >= in_h as isize {
                        continue;
                    }
                    for w_x in 0..w_w {
                        let in_x = stride_x * out_x as isize + dil_x * w_x as isize - pad_x;
                        if in_x < 0 || in_x >= in_w as isize {
                            continue;
                        }
                        let in_idx = calculate_linear_index(
                            &[batch, in_c, in_y as usize, in_x as usize],
                            &geom.in_strides,
                        );
                        let w_idx = calculate_linear_index(
                            &[out_c, in_c - in_c_start, w_y, w_x],
                            &geom.w_strides,
                        );
                        unsafe {
                            acc = acc.mul_acc(*input.offset(in_idx), *weight.offset(w_idx));
                        }
                    }
                }
            }

            if let Some(b) = bias {
                // mul_acc wraps for integer types
                acc = acc.mul_acc(b, T::one());
            }
            let out_idx =
                calculate_linear_index(&[batch, out_c, out_y, out_x], &geom.out_strides);
            unsafe {
                *output.offset(out_idx) = acc;
            }
        }
    }
}

/// Scatter-accumulate one output channel of a transposed convolution.
///
/// Output must already hold its initial values (zero or bias).
///
/// # Safety
///
/// Same contract as [`conv2d_forward_channel`].
unsafe fn conv2d_transposed_channel<T: Element>(
    input: *const T,
    weight: *const T,
    output: *mut T,
    geom: &Conv2dGeometry,
    batch: usize,
    group: usize,
    out_c: usize,
) {
    let [_, _, in_h, in_w] = geom.in_sizes;
    let [_, _, w_h, w_w] = geom.w_sizes;
    let [_, _, out_h, out_w] = geom.out_sizes;
    let [stride_y, stride_x] = geom.stride;
    let [pad_y, pad_x] = geom.padding;
    let [dil_y, dil_x] = geom.dilation;

    let in_c_per_group = geom.in_channels_per_group();
    let in_c_start = group * in_c_per_group;
    // Weight is [C_in, C_out/groups, kH, kW]: second axis is the offset within the group
    let w_c = out_c - group * geom.out_channels_per_group();

    for in_y in 0..in_h {
        for in_x in 0..in_w {
            for in_c in in_c_start..in_c_start + in_c_per_group {
                let in_idx =
                    calculate_linear_index(&[batch, in_c, in_y, in_x], &geom.in_strides);
                let in_val = unsafe { *input.offset(in_idx) };

                for w_y in 0..w_h {
                    let out_y = stride_y * in_y as isize + dil_y * w_y as isize - pad_y;
                    if out_y < 0 || out_y >= out_h as isize {
                        continue;
                    }
                    for w_x in 0..w_w {
                        let out_x = stride_x * in_x as isize + dil_x * w_x as isize - pad_x;
                        if out_x < 0 || out_x >= out_w as isize {
                            continue;
                        }
                        let w_idx =
                            calculate_linear_index(&[in_c, w_c, w_y, w_x], &geom.w_strides);
                        let out_idx = calculate_linear_index(
                            &[batch, out_c, out_y as usize, out_x as usize],
                            &geom.out_strides,
                        );
                        unsafe {
                            let dst = output.offset(out_idx);
                            *dst = (*dst).mul_acc(in_val, *weight.offset(w_idx));
                        }
                    }
                }
            }
        }
    }
}

/// Set every output element to zero, or to the bias of its channel.
///
/// # Safety
///
/// `output` must be valid for every offset the output strides produce over `geom.out_sizes`.
unsafe fn init_transposed_output<T: Element>(
    output: *mut T,
    geom: &Conv2dGeometry,
    bias: Option<&BiasLoader<'_, T>>,
) {
    match bias {
        None => {
            for coord in CoordIter::new(&geom.out_sizes) {
                let idx = calculate_linear_index(&coord, &geom.out_strides);
                unsafe { *output.offset(idx) = T::zero() };
            }
        }
        Some(bias) => {
            for coord in CoordIter::new(&geom.out_sizes) {
                let idx = calculate_linear_index(&coord, &geom.out_strides);
                unsafe { *output.offset(idx) = bias.load(coord[1]) };
            }
        }
    }
}

/// Run one (batch, output-channel) work item.
///
/// # Safety
///
/// Same contract as [`conv2d_forward_channel`].
#[inline]
#[allow(clippy::too_many_arguments)]
unsafe fn conv2d_work_item<T: Element>(
    input: *const T,
    weight: *const T,
    bias: Option<&BiasLoader<'_, T>>,
    output: *mut T,
    geom: &Conv2dGeometry,
    batch: usize,
    out_c: usize,
    transposed: bool,
) {
    let group = out_c / geom.out_channels_per_group();
    unsafe {
        if transposed {
            conv2d_transposed_channel(input, weight, output, geom, batch, group, out_c);
        } else {
            let bias = bias.map(|b| b.load(out_c));
            conv2d_forward_channel(input, weight, bias, output, geom, batch, group, out_c);
        }
    }
}

/// 2-D convolution kernel with groups support, forward or transposed.
///
/// Iterates batch, then group, then the group's output channels. With the
/// `rayon` feature the (batch, output-channel) items are spread over the
/// client's pool instead; each item owns one output plane so results are
/// identical to the sequential order.
///
/// # Safety
///
/// Caller must ensure:
/// - `input`, `weight`, `output` point to buffers valid for every offset
///   `geom`'s sizes and strides can produce
/// - `geom` is consistent: groups divides both channel counts, weight and output
///   sizes match the convolution mode, and the output holds the sizes the
///   size formula gives
/// - `bias`, if present, holds at least `C_out` values
pub unsafe fn conv2d_kernel<T: Element>(
    client: &CpuClient,
    input: *const T,
    weight: *const T,
    bias: Option<&BiasLoader<'_, T>>,
    output: *mut T,
    geom: &Conv2dGeometry,
    transposed: bool,
) {
    if transposed {
        unsafe { init_transposed_output(output, geom, bias) };
    }

    let [batch, out_c, _, _] = geom.out_sizes;

    #[cfg(feature = "rayon")]
    if client.use_parallel(geom.work_items()) {
        use rayon::prelude::*;

        let min_len = client.rayon_min_len();
        let in_addr = input as usize;
        let w_addr = weight as usize;
        let out_addr = output as usize;
        client.install_parallelism(|| {
            (0..geom.work_items())
                .into_par_iter()
                .with_min_len(min_len)
                .for_each(|item| unsafe {
                    conv2d_work_item(
                        in_addr as *const T,
                        w_addr as *const T,
                        bias,
                        out_addr as *mut T,
                        geom,
                        item / out_c,
                        item % out_c,
                        transposed,
                    );
                });
        });
        return;
    }
    #[cfg(not(feature = "rayon"))]
    let _ = client;

    let out_c_per_group = geom.out_channels_per_group();
    for b in 0..batch {
        for g in 0..geom.groups {
            let out_c_start = g * out_c_per_group;
            for c in out_c_start..out_c_start + out_c_per_group {
                unsafe {
                    conv2d_work_item(input, weight, bias, output, geom, b, c, transposed);
                }
            }
        }
    }
}
