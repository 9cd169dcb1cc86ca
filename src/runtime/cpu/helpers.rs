//! Helper macros for CPU operation dispatch

// ============================================================================
// DType Dispatch Macro
// ============================================================================

/// Macro for dtype dispatch to typed kernel calls over the REALH compute types
///
/// This macro matches on dtype and executes the code block with the appropriate type.
/// Usage: `dispatch_realh!(dtype, T => { code using T }, "op_name")`
///
/// F16 is supported when the "f16" feature is enabled. BF16 is never a compute
/// type; it returns `UnsupportedDType` like any other unlisted dtype.
macro_rules! dispatch_realh {
    ($dtype:expr, $T:ident => $body:block, $error_op:expr) => {
        match $dtype {
            DType::F64 => {
                type $T = f64;
                $body
            }
            DType::F32 => {
                type $T = f32;
                $body
            }
            #[cfg(feature = "f16")]
            DType::F16 => {
                type $T = half::f16;
                $body
            }
            DType::I64 => {
                type $T = i64;
                $body
            }
            DType::I32 => {
                type $T = i32;
                $body
            }
            DType::I16 => {
                type $T = i16;
                $body
            }
            DType::I8 => {
                type $T = i8;
                $body
            }
            DType::U8 => {
                type $T = u8;
                $body
            }
            _ => {
                return Err(Error::UnsupportedDType {
                    dtype: $dtype,
                    op: $error_op,
                })
            }
        }
    };
}

pub(crate) use dispatch_realh;
