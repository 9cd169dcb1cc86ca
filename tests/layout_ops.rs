//! Integration tests for dim orders, strides, and layout-independent convolution.

mod common;

use common::{create_cpu_client, random_f32, random_i32, seeded_rng};
use strided_conv::dtype::DType;
use strided_conv::error::Error;
use strided_conv::ops::{ConvOps, ConvOptions};
use strided_conv::tensor::{
    CoordIter, DimOrder, Layout, Tensor, calculate_linear_index, dim_order_to_strides,
};

// =============================================================================
// Index Calculator and Stride Derivation
// =============================================================================

#[test]
fn test_linear_index_is_dot_product() {
    assert_eq!(calculate_linear_index(&[1, 2, 3], &[20, 5, 1]), 33);
    assert_eq!(calculate_linear_index(&[0, 0, 0], &[20, 5, 1]), 0);
    assert_eq!(calculate_linear_index(&[], &[]), 0);
}

#[test]
fn test_strides_for_common_orders() {
    let sizes = [2, 3, 4, 5];
    let contiguous = dim_order_to_strides(&sizes, &[0, 1, 2, 3]).unwrap();
    assert_eq!(contiguous.as_slice(), &[60, 20, 5, 1]);

    let channels_last = dim_order_to_strides(&sizes, &[0, 2, 3, 1]).unwrap();
    assert_eq!(channels_last.as_slice(), &[60, 1, 15, 3]);

    let reversed = dim_order_to_strides(&sizes, &[3, 2, 1, 0]).unwrap();
    assert_eq!(reversed.as_slice(), &[1, 2, 6, 24]);
}

#[test]
fn test_strides_reject_invalid_order() {
    assert!(matches!(
        dim_order_to_strides(&[2, 3], &[0, 0]),
        Err(Error::InvalidDimOrder { .. })
    ));
    assert!(matches!(
        dim_order_to_strides(&[2, 3], &[0, 1, 2]),
        Err(Error::InvalidDimOrder { .. })
    ));
    assert!(DimOrder::new(&[1, 2]).is_err());
}

#[test]
fn test_every_coordinate_maps_to_a_distinct_offset() {
    let shape = [2, 3, 2, 4];
    for order in [[0, 1, 2, 3], [0, 2, 3, 1], [1, 0, 3, 2], [3, 2, 1, 0]] {
        let layout = Layout::with_dim_order(&shape, &order).unwrap();
        let mut seen = vec![false; layout.elem_count()];
        for coord in CoordIter::new(&shape) {
            let offset = layout.index(&coord).unwrap();
            assert!(!seen[offset], "order {:?}: offset {} visited twice", order, offset);
            seen[offset] = true;
        }
        assert!(seen.iter().all(|&v| v), "order {:?}: offsets not covered", order);
    }
}

#[test]
fn test_innermost_dim_has_unit_stride() {
    let layout = Layout::with_dim_order(&[3, 5, 7], &[2, 0, 1]).unwrap();
    assert_eq!(layout.strides()[1], 1);
    assert_eq!(layout.strides()[0], 5);
    assert_eq!(layout.strides()[2], 15);
}

// =============================================================================
// Dimension Lifting
// =============================================================================

#[test]
fn test_unsqueeze_keeps_every_offset() {
    for order in [[0, 1, 2], [0, 2, 1], [2, 1, 0]] {
        let layout = Layout::with_dim_order(&[2, 3, 5], &order).unwrap();
        let lifted = layout.unsqueeze(2).unwrap();
        assert_eq!(lifted.shape(), &[2, 3, 1, 5]);
        for coord in CoordIter::new(&[2, 3, 5]) {
            let lifted_coord = [coord[0], coord[1], 0, coord[2]];
            assert_eq!(layout.index(&coord), lifted.index(&lifted_coord));
        }
        assert_eq!(lifted.squeeze(2).unwrap(), layout);
    }
}

#[test]
fn test_unsqueeze_channels_last_stays_channels_last() {
    let layout = Layout::channels_last(&[2, 3, 5]);
    assert!(layout.is_channels_last());
    let lifted = layout.unsqueeze(2).unwrap();
    assert_eq!(lifted.dim_order(), &[0, 2, 3, 1]);
    assert!(lifted.is_channels_last());
}

#[test]
fn test_squeeze_rejects_non_unit_dim() {
    let layout = Layout::contiguous(&[2, 3, 4]);
    assert!(layout.squeeze(1).is_err());
    assert!(layout.squeeze(3).is_err());
}

// =============================================================================
// Tensor Relayout
// =============================================================================

#[test]
fn test_relayout_preserves_logical_values() {
    let mut rng = seeded_rng(21);
    let t = random_i32(&mut rng, &[2, 3, 4, 5]);
    let nhwc = t.to_dim_order(&[0, 2, 3, 1]).unwrap();
    assert_eq!(nhwc.to_vec::<i32>(), t.to_vec::<i32>());
    assert_ne!(nhwc.as_slice::<i32>().unwrap(), t.as_slice::<i32>().unwrap());
    let back = nhwc.to_dim_order(&[0, 1, 2, 3]).unwrap();
    assert_eq!(back.as_slice::<i32>().unwrap(), t.as_slice::<i32>().unwrap());
}

// =============================================================================
// Layout-Independent Convolution
// =============================================================================

fn assert_layout_independent(opts: &ConvOptions, in_shape: &[usize], w_shape: &[usize], seed: u64) {
    let client = create_cpu_client();
    let mut rng = seeded_rng(seed);
    let input = random_i32(&mut rng, in_shape);
    let weight = random_i32(&mut rng, w_shape);
    let c_out = if opts.transposed {
        w_shape[1] * opts.groups
    } else {
        w_shape[0]
    };
    let bias = random_i32(&mut rng, &[c_out]);

    let reference = client
        .convolution(&input, &weight, Some(&bias), opts)
        .unwrap();

    let ndim = in_shape.len();
    let in_order = DimOrder::channels_last(ndim);
    let w_order: Vec<usize> = (0..ndim).rev().collect();

    let input_cl = input.to_dim_order(&in_order).unwrap();
    let weight_perm = weight.to_dim_order(&w_order).unwrap();
    let out = client
        .convolution(&input_cl, &weight_perm, Some(&bias), opts)
        .unwrap();

    assert_eq!(out.dim_order(), in_order.as_slice());
    assert_eq!(out.shape(), reference.shape());
    assert_eq!(out.to_vec::<i32>(), reference.to_vec::<i32>());
}

#[test]
fn test_forward_conv2d_layout_independent() {
    let opts = ConvOptions::new()
        .with_stride(&[2, 1])
        .with_padding(&[1, 2])
        .with_dilation(&[1, 2])
        .with_groups(2);
    assert_layout_independent(&opts, &[2, 4, 7, 6], &[6, 2, 3, 2], 31);
}

#[test]
fn test_transposed_conv2d_layout_independent() {
    let opts = ConvOptions::new()
        .with_transposed(true)
        .with_stride(&[2])
        .with_padding(&[1])
        .with_output_padding(&[1, 0])
        .with_groups(2);
    assert_layout_independent(&opts, &[2, 4, 3, 4], &[4, 3, 3, 2], 32);
}

#[test]
fn test_conv1d_layout_independent() {
    let opts = ConvOptions::new().with_stride(&[2]).with_padding(&[1]);
    assert_layout_independent(&opts, &[3, 2, 9], &[4, 2, 3], 33);

    let opts = opts.with_transposed(true);
    assert_layout_independent(&opts, &[3, 4, 5], &[4, 2, 3], 34);
}

#[test]
fn test_channels_last_output_buffer_written_in_place() {
    let client = create_cpu_client();
    let mut rng = seeded_rng(35);
    let input = random_f32(&mut rng, &[1, 3, 5, 5])
        .to_dim_order(&[0, 2, 3, 1])
        .unwrap();
    let weight = random_f32(&mut rng, &[2, 3, 3, 3]);
    let mut out = Tensor::zeros_with_dim_order(&[1, 2, 3, 3], DType::F32, &[0, 2, 3, 1]).unwrap();

    client
        .convolution_out(&input, &weight, None, &ConvOptions::new(), &mut out)
        .unwrap();

    let reference = client
        .convolution(
            &input.to_dim_order(&[0, 1, 2, 3]).unwrap(),
            &weight,
            None,
            &ConvOptions::new(),
        )
        .unwrap();
    assert!(out.is_channels_last());
    assert_eq!(out.to_vec::<f32>(), reference.to_vec::<f32>());
}
