//! CPU implementation of convolution operations.

use crate::dtype::DType;
use crate::error::{Error, Result};
use crate::ops::conv_common::{
    check_convolution_args, check_out_tensor, get_convolution_out_target_size,
};
use crate::ops::{ConvOps, ConvOptions};
use crate::runtime::cpu::helpers::dispatch_realh;
use crate::runtime::cpu::kernels::{self, BiasLoader};
use crate::runtime::cpu::CpuClient;
use crate::tensor::Tensor;

const OP: &str = "convolution";

impl ConvOps for CpuClient {
    fn convolution_out(
        &self,
        input: &Tensor,
        weight: &Tensor,
        bias: Option<&Tensor>,
        opts: &ConvOptions,
        out: &mut Tensor,
    ) -> Result<()> {
        let dtype = input.dtype();

        // Validate all inputs before touching `out`
        check_convolution_args(input, weight, bias, opts, OP)?;
        check_out_tensor(input, out, OP)?;
        let out_shape = get_convolution_out_target_size(input.shape(), weight.shape(), opts, OP)?;

        if out.resize(&out_shape)? {
            log::debug!(
                "{}: reallocated output for shape {:?} ({} elements)",
                OP,
                out.shape(),
                out.numel()
            );
        }

        // Handle empty output
        if out.numel() == 0 {
            log::debug!("{}: output {:?} is empty, nothing to compute", OP, out.shape());
            return Ok(());
        }

        let geom = kernels::conv2d_geometry(
            input.layout(),
            weight.layout(),
            out.layout(),
            &opts.stride,
            &opts.padding,
            &opts.dilation,
            opts.groups,
        )?;

        log::trace!(
            "{}: dtype={} input={:?} weight={:?} out={:?} transposed={} lifted={} groups={}",
            OP,
            dtype,
            input.shape(),
            weight.shape(),
            out.shape(),
            opts.transposed,
            input.ndim() == 3,
            opts.groups
        );

        dispatch_realh!(dtype, T => {
            let load = bias
                .map(|b| kernels::get_load_to_compute_fn::<T>(b.dtype(), OP))
                .transpose()?;
            let loader = bias.zip(load).map(|(b, load)| BiasLoader::new(b, load));

            let input_data = input.as_slice::<T>()?;
            let weight_data = weight.as_slice::<T>()?;
            let out_data = out.as_mut_slice::<T>()?;

            // SAFETY: the buffers hold exactly the elements their layouts describe,
            // and validation guarantees the geometry is consistent.
            unsafe {
                kernels::conv2d_kernel::<T>(
                    self,
                    input_data.as_ptr(),
                    weight_data.as_ptr(),
                    loader.as_ref(),
                    out_data.as_mut_ptr(),
                    &geom,
                    opts.transposed,
                );
            }
        }, OP);

        Ok(())
    }

    fn convolution(
        &self,
        input: &Tensor,
        weight: &Tensor,
        bias: Option<&Tensor>,
        opts: &ConvOptions,
    ) -> Result<Tensor> {
        check_convolution_args(input, weight, bias, opts, OP)?;
        let out_shape = get_convolution_out_target_size(input.shape(), weight.shape(), opts, OP)?;

        // Allocate output
        let mut out = Tensor::zeros_with_dim_order(&out_shape, input.dtype(), input.dim_order())?;
        self.convolution_out(input, weight, bias, opts, &mut out)?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::cpu::ParallelismConfig;

    #[test]
    fn test_conv2d_window_sums() {
        let client = CpuClient::new();
        let input: Vec<f32> = (0..16).map(|v| v as f32).collect();
        let input = Tensor::from_slice(&input, &[1, 1, 4, 4]);
        let weight = Tensor::from_slice(&[1.0f32; 4], &[1, 1, 2, 2]);

        let out = client
            .conv2d(&input, &weight, None, (1, 1), (0, 0), (1, 1), 1)
            .unwrap();
        assert_eq!(out.shape(), &[1, 1, 3, 3]);
        assert_eq!(out.get::<f32>(&[0, 0, 0, 0]).unwrap(), 10.0);
        assert_eq!(out.get::<f32>(&[0, 0, 2, 2]).unwrap(), 50.0);
    }

    #[test]
    fn test_forward_bias_converted() {
        let client = CpuClient::new();
        let input = Tensor::from_slice(&[1i32, 2, 3], &[1, 1, 3]);
        let weight = Tensor::from_slice(&[2i32, 3], &[2, 1, 1]);
        let bias = Tensor::from_slice(&[10.7f64, -1.2], &[2]);

        let out = client.conv1d(&input, &weight, Some(&bias), 1, 0, 1, 1).unwrap();
        assert_eq!(out.dtype(), DType::I32);
        assert_eq!(out.to_vec::<i32>(), vec![12, 14, 16, 2, 5, 8]);
    }

    #[test]
    fn test_transposed_bias_init() {
        let client = CpuClient::new();
        let input = Tensor::from_slice(&[1.0f64; 4], &[1, 1, 2, 2]);
        let weight = Tensor::from_slice(&[1.0f64; 8], &[1, 2, 2, 2]);
        let bias = Tensor::from_slice(&[0.5f32, -1.0], &[2]);

        let out = client
            .conv_transpose2d(&input, &weight, Some(&bias), (1, 1), (0, 0), (0, 0), (1, 1), 1)
            .unwrap();
        assert_eq!(out.shape(), &[1, 2, 3, 3]);
        let values = out.to_vec::<f64>();
        assert_eq!(&values[..9], &[1.5, 2.5, 1.5, 2.5, 4.5, 2.5, 1.5, 2.5, 1.5]);
        assert_eq!(&values[9..], &[0.0, 1.0, 0.0, 1.0, 3.0, 1.0, 0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_out_is_resized_and_overwritten() {
        let client = CpuClient::with_parallelism(ParallelismConfig::sequential()).unwrap();
        let input = Tensor::from_slice(&[1.0f32, 2.0, 3.0, 4.0], &[1, 1, 2, 2]);
        let weight = Tensor::from_slice(&[3.0f32], &[1, 1, 1, 1]);
        let mut out = Tensor::from_slice(&[7.0f32; 9], &[1, 1, 3, 3]);

        client
            .convolution_out(&input, &weight, None, &ConvOptions::new(), &mut out)
            .unwrap();
        assert_eq!(out.shape(), &[1, 1, 2, 2]);
        assert_eq!(out.to_vec::<f32>(), vec![3.0, 6.0, 9.0, 12.0]);
    }

    #[test]
    fn test_invalid_args_leave_out_untouched() {
        let client = CpuClient::new();
        let input = Tensor::from_slice(&[1.0f32; 4], &[1, 1, 2, 2]);
        let weight = Tensor::from_slice(&[1.0f32; 9], &[1, 1, 3, 3]);
        let mut out = Tensor::from_slice(&[7.0f32; 4], &[1, 1, 2, 2]);

        let result = client.convolution_out(&input, &weight, None, &ConvOptions::new(), &mut out);
        assert!(matches!(result, Err(Error::InvalidArgument { .. })));
        assert_eq!(out.shape(), &[1, 1, 2, 2]);
        assert_eq!(out.to_vec::<f32>(), vec![7.0; 4]);
    }

    #[test]
    fn test_zero_batch_is_noop() {
        let client = CpuClient::new();
        let input = Tensor::zeros(&[0, 2, 4, 4], DType::F32);
        let weight = Tensor::zeros(&[3, 2, 3, 3], DType::F32);
        let out = client.convolution(&input, &weight, None, &ConvOptions::new()).unwrap();
        assert_eq!(out.shape(), &[0, 3, 2, 2]);
        assert_eq!(out.numel(), 0);
    }

    #[cfg(not(feature = "f16"))]
    #[test]
    fn test_f16_requires_feature() {
        let client = CpuClient::new();
        let input = Tensor::zeros(&[1, 1, 2, 2], DType::F16);
        let weight = Tensor::zeros(&[1, 1, 1, 1], DType::F16);
        assert!(matches!(
            client.convolution(&input, &weight, None, &ConvOptions::new()),
            Err(Error::UnsupportedDType { .. })
        ));
    }

    #[test]
    fn test_bf16_compute_unsupported() {
        let client = CpuClient::new();
        let input = Tensor::zeros(&[1, 1, 2, 2], DType::BF16);
        let weight = Tensor::zeros(&[1, 1, 1, 1], DType::BF16);
        assert!(matches!(
            client.convolution(&input, &weight, None, &ConvOptions::new()),
            Err(Error::UnsupportedDType { .. })
        ));
    }
}
