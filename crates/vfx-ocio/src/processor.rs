//! Transform processor: the finalized, optimized op pipeline.
//!
//! A [`Processor`] is built once from transforms (or a raw [`OpList`]) and
//! is immutable afterwards. It hands out CPU renderers and GPU shader code
//! and can be shared across threads.
//!
//! # Example
//!
//! ```
//! use vfx_ocio::{FixedFunctionTransform, Processor, Transform, TransformDirection};
//! use vfx_ocio::ops::FixedFunctionStyle;
//!
//! let hsv = Transform::from(FixedFunctionTransform::new(FixedFunctionStyle::RgbToHsv));
//! let round_trip = Transform::group(vec![hsv.clone(), hsv.inverse()]);
//!
//! let processor = Processor::from_transform(&round_trip, TransformDirection::Forward).unwrap();
//! assert!(processor.is_noop());
//! assert_eq!(processor.cache_id(), "[]");
//! ```

use std::slice;

use tracing::debug;
use vfx_core::BitDepth;

use crate::config::{OptimizationFlags, ProcessorConfig};
use crate::cpu::CpuProcessor;
use crate::error::OcioResult;
use crate::gpu::GpuShaderDesc;
use crate::ops::{Op, OpList};
use crate::transform::{Transform, TransformDirection};

/// Compiled transform processor.
#[derive(Debug, Clone)]
pub struct Processor {
    ops: OpList,
    cache_id: String,
}

impl Processor {
    /// Creates a processor from a transform with the default configuration.
    pub fn from_transform(transform: &Transform, direction: TransformDirection) -> OcioResult<Self> {
        Self::from_transform_with_config(transform, direction, &ProcessorConfig::default())
    }

    /// Creates a processor from a transform using `config`'s optimization.
    pub fn from_transform_with_config(
        transform: &Transform,
        direction: TransformDirection,
        config: &ProcessorConfig,
    ) -> OcioResult<Self> {
        Self::from_transforms_with_config(slice::from_ref(transform), direction, config)
    }

    /// Creates a processor from an ordered list of transforms using
    /// `config`'s optimization, including the `OCIO_OPTIMIZATION_FLAGS`
    /// override.
    pub fn from_transforms_with_config(
        transforms: &[Transform],
        direction: TransformDirection,
        config: &ProcessorConfig,
    ) -> OcioResult<Self> {
        Self::from_ops(build_ops(transforms, direction)?, config.optimization_flags())
    }

    /// Creates a processor from an ordered list of transforms.
    ///
    /// In the inverse direction the list runs back to front, each transform
    /// inverted. `flags` are used exactly as given: the environment override
    /// only applies to the `*_with_config` constructors.
    pub fn from_transforms(
        transforms: &[Transform],
        direction: TransformDirection,
        flags: OptimizationFlags,
    ) -> OcioResult<Self> {
        Self::from_ops(build_ops(transforms, direction)?, flags)
    }

    /// Creates a processor from ops already in application order.
    ///
    /// Every op is validated before optimization, so invalid data fails
    /// even when the optimizer would have removed it.
    pub fn from_ops(mut ops: OpList, flags: OptimizationFlags) -> OcioResult<Self> {
        ops.finalize()?;
        ops.optimize(flags)?;
        ops.finalize()?;
        let cache_id = ops.cache_id();
        debug!(ops = ops.len(), %flags, cache_id = %cache_id, "Built processor");
        Ok(Self { ops, cache_id })
    }

    /// Pipeline cache ID: `[` op IDs joined by spaces `]`.
    pub fn cache_id(&self) -> &str {
        &self.cache_id
    }

    /// Finalized ops in application order.
    pub fn ops(&self) -> &[Op] {
        self.ops.as_slice()
    }

    /// Number of ops.
    #[inline]
    pub fn num_ops(&self) -> usize {
        self.ops.len()
    }

    /// True when the pipeline has no ops left.
    #[inline]
    pub fn is_noop(&self) -> bool {
        self.ops.is_empty()
    }

    /// CPU processor on float buffers.
    pub fn cpu_processor(&self) -> OcioResult<CpuProcessor> {
        self.cpu_processor_with_bit_depths(BitDepth::F32, BitDepth::F32)
    }

    /// CPU processor on buffers of `config`'s input and output depths.
    pub fn cpu_processor_with_config(&self, config: &ProcessorConfig) -> OcioResult<CpuProcessor> {
        self.cpu_processor_with_bit_depths(config.input_bit_depth, config.output_bit_depth)
    }

    /// CPU processor reading `input` buffers and writing `output` buffers.
    pub fn cpu_processor_with_bit_depths(
        &self,
        input: BitDepth,
        output: BitDepth,
    ) -> OcioResult<CpuProcessor> {
        let renderers = self
            .ops
            .iter()
            .map(Op::cpu_op)
            .collect::<OcioResult<Vec<_>>>()?;
        debug!(
            renderers = renderers.len(),
            input = input.clf_str(),
            output = output.clf_str(),
            "Created CPU processor"
        );
        CpuProcessor::new(renderers, input, output)
    }

    /// Appends the shader code of every op to `desc`.
    pub fn extract_gpu_shader_info(&self, desc: &mut GpuShaderDesc) -> OcioResult<()> {
        desc.set_processor_cache_id(&self.cache_id);
        for op in self.ops.iter() {
            op.extract_gpu_shader_info(desc)?;
        }
        Ok(())
    }
}

fn build_ops(transforms: &[Transform], direction: TransformDirection) -> OcioResult<OpList> {
    let mut ops = OpList::new();
    match direction {
        TransformDirection::Forward => {
            for t in transforms {
                t.build_ops(&mut ops, direction)?;
            }
        }
        TransformDirection::Inverse => {
            for t in transforms.iter().rev() {
                t.build_ops(&mut ops, direction)?;
            }
        }
    }
    Ok(ops)
}
