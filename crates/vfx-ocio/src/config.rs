//! Processor configuration: optimization level, bit depths, shader naming.
//!
//! # Example
//!
//! ```
//! use vfx_ocio::{OptimizationFlags, OptimizationLevel, ProcessorConfig};
//! use vfx_core::BitDepth;
//!
//! let config = ProcessorConfig::from_yaml_str(
//!     "optimization: good\ninput_bit_depth: 8i\n",
//! ).unwrap();
//! assert_eq!(config.optimization, OptimizationLevel::Good);
//! assert_eq!(config.input_bit_depth, BitDepth::U8);
//! assert!(OptimizationLevel::Good.flags().contains(OptimizationFlags::COMPOSE_LUTS));
//! ```

use std::env;
use std::fmt;
use std::ops::{BitAnd, BitOr};
use std::path::Path;

use serde::{Deserialize, Serialize};
use vfx_core::BitDepth;

use crate::error::OcioResult;
use crate::gpu::{GpuLanguage, GpuShaderDesc};

/// Environment variable overriding the optimization flags.
pub const OPTIMIZATION_FLAGS_ENV: &str = "OCIO_OPTIMIZATION_FLAGS";

/// Bit set selecting optimizer passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct OptimizationFlags(u32);

impl OptimizationFlags {
    /// No optimization.
    pub const NONE: Self = Self(0);
    /// Drop identity ops.
    pub const REMOVE_IDENTITY: Self = Self(0x1);
    /// Cancel adjacent inverse pairs.
    pub const REMOVE_INVERSE_PAIRS: Self = Self(0x2);
    /// Fuse adjacent combinable ops.
    pub const COMBINE: Self = Self(0x4);
    /// Allow fusions that resample LUTs.
    pub const COMPOSE_LUTS: Self = Self(0x8);
    /// Every pass that keeps the result exact.
    pub const LOSSLESS: Self = Self(0x7);
    /// Every pass.
    pub const ALL: Self = Self(0xF);

    /// Flags from raw bits; unknown bits are dropped.
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits & Self::ALL.0)
    }

    /// Raw bits.
    pub const fn bits(&self) -> u32 {
        self.0
    }

    /// True when no pass is selected.
    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// True when every bit of `other` is set.
    pub const fn contains(&self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Parses `0x`-prefixed hex or decimal.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        let bits = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => s.parse().ok()?,
        };
        Some(Self::from_bits(bits))
    }

    /// Value of [`OPTIMIZATION_FLAGS_ENV`], if set and valid.
    pub fn from_env() -> Option<Self> {
        let raw = env::var(OPTIMIZATION_FLAGS_ENV).ok()?;
        let flags = Self::parse(&raw);
        if flags.is_none() {
            tracing::warn!(
                var = OPTIMIZATION_FLAGS_ENV,
                value = %raw,
                "Ignoring unparsable optimization flags"
            );
        }
        flags
    }
}

impl BitOr for OptimizationFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitAnd for OptimizationFlags {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl fmt::Display for OptimizationFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Optimization level for processors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptimizationLevel {
    /// No optimization.
    None,
    /// Exact rewrites only: identities, inverse pairs, fusions.
    #[default]
    Lossless,
    /// Also resamples composed LUTs.
    Good,
    /// Same passes as [`OptimizationLevel::Lossless`].
    Best,
    /// Same passes as [`OptimizationLevel::Good`].
    Draft,
}

impl OptimizationLevel {
    /// Passes this level enables.
    pub fn flags(&self) -> OptimizationFlags {
        match self {
            Self::None => OptimizationFlags::NONE,
            Self::Lossless | Self::Best => OptimizationFlags::LOSSLESS,
            Self::Good | Self::Draft => OptimizationFlags::ALL,
        }
    }
}

/// Everything a [`crate::Processor`] is built with besides the transform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessorConfig {
    /// Optimization level.
    pub optimization: OptimizationLevel,
    /// Depth of buffers handed to the CPU processor.
    #[serde(with = "clf_depth")]
    pub input_bit_depth: BitDepth,
    /// Depth of buffers produced by the CPU processor.
    #[serde(with = "clf_depth")]
    pub output_bit_depth: BitDepth,
    /// Shader language for GPU extraction.
    pub gpu_language: GpuLanguage,
    /// Prefix of generated shader resources.
    pub resource_prefix: String,
    /// Name of the generated shader function.
    pub function_name: String,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            optimization: OptimizationLevel::Lossless,
            input_bit_depth: BitDepth::F32,
            output_bit_depth: BitDepth::F32,
            gpu_language: GpuLanguage::Glsl330,
            resource_prefix: "ocio".into(),
            function_name: "OCIOMain".into(),
        }
    }
}

impl ProcessorConfig {
    /// Parses YAML; missing fields take their defaults.
    pub fn from_yaml_str(yaml: &str) -> OcioResult<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Loads a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> OcioResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    /// Serializes to YAML.
    pub fn to_yaml_string(&self) -> OcioResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Flags for the optimizer: the environment override if present, else
    /// the level's flags.
    pub fn optimization_flags(&self) -> OptimizationFlags {
        OptimizationFlags::from_env().unwrap_or_else(|| self.optimization.flags())
    }

    /// Empty shader descriptor with this configuration's names.
    pub fn shader_desc(&self) -> GpuShaderDesc {
        GpuShaderDesc::new(self.gpu_language)
            .with_function_name(&self.function_name)
            .with_resource_prefix(&self.resource_prefix)
    }
}

/// Bit depths as CLF strings (`8i`, `16f`, ...).
mod clf_depth {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};
    use vfx_core::BitDepth;

    pub fn serialize<S: Serializer>(depth: &BitDepth, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(depth.clf_str())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<BitDepth, D::Error> {
        let s = String::deserialize(d)?;
        BitDepth::from_clf_str(&s).ok_or_else(|| D::Error::custom(format!("unknown bit depth '{s}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_map_to_flags() {
        assert!(OptimizationLevel::None.flags().is_empty());
        assert_eq!(OptimizationLevel::Lossless.flags().bits(), 0x7);
        assert_eq!(OptimizationLevel::Best.flags(), OptimizationLevel::Lossless.flags());
        assert_eq!(OptimizationLevel::Good.flags().bits(), 0xF);
        assert_eq!(OptimizationLevel::Draft.flags(), OptimizationLevel::Good.flags());
    }

    #[test]
    fn parse_hex_and_decimal() {
        assert_eq!(OptimizationFlags::parse("0x3").map(|f| f.bits()), Some(3));
        assert_eq!(OptimizationFlags::parse(" 12 ").map(|f| f.bits()), Some(12));
        assert_eq!(OptimizationFlags::parse("0xFF").map(|f| f.bits()), Some(0xF));
        assert_eq!(OptimizationFlags::parse("fast"), None);
        let f = OptimizationFlags::REMOVE_IDENTITY | OptimizationFlags::COMBINE;
        assert!(f.contains(OptimizationFlags::COMBINE));
        assert!(!f.contains(OptimizationFlags::REMOVE_INVERSE_PAIRS));
        assert_eq!(f.to_string(), "0x5");
    }

    #[test]
    fn yaml_defaults_and_overrides() {
        let config = ProcessorConfig::from_yaml_str("{}").unwrap();
        assert_eq!(config, ProcessorConfig::default());

        let config = ProcessorConfig::from_yaml_str(
            "optimization: none\noutput_bit_depth: 16i\ngpu_language: hlsl_50\nresource_prefix: grade\n",
        )
        .unwrap();
        assert_eq!(config.optimization, OptimizationLevel::None);
        assert_eq!(config.output_bit_depth, BitDepth::U16);
        assert_eq!(config.gpu_language, GpuLanguage::Hlsl50);
        let desc = config.shader_desc();
        assert_eq!(desc.resource_prefix(), "grade");
        assert_eq!(desc.function_name(), "OCIOMain");
    }

    #[test]
    fn yaml_round_trip_and_bad_depth() {
        let config = ProcessorConfig {
            input_bit_depth: BitDepth::U10,
            ..Default::default()
        };
        let text = config.to_yaml_string().unwrap();
        assert!(text.contains("input_bit_depth: 10i"));
        assert_eq!(ProcessorConfig::from_yaml_str(&text).unwrap(), config);

        let err = ProcessorConfig::from_yaml_str("input_bit_depth: 9i").unwrap_err();
        assert!(err.to_string().contains("unknown bit depth '9i'"));
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("processor.yaml");
        std::fs::write(&path, "optimization: draft\n").unwrap();
        let config = ProcessorConfig::from_file(&path).unwrap();
        assert_eq!(config.optimization, OptimizationLevel::Draft);
        assert!(ProcessorConfig::from_file(dir.path().join("missing.yaml")).is_err());
    }
}
