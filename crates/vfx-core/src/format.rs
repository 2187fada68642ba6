//! Bit depth formats.
//!
//! # Usage
//!
//! ```rust
//! use vfx_core::format::BitDepth;
//!
//! // 10-bit DPX code values live in u16 containers
//! let depth = BitDepth::U10;
//! assert_eq!(depth.max_value(), 1023.0);
//! assert!(!depth.is_float());
//! ```

/// Bit depth of one channel of pixel data.
///
/// Integer formats:
/// - `U8` - 8-bit unsigned [0, 255]
/// - `U10` - 10-bit unsigned [0, 1023] (DPX, broadcast)
/// - `U12` - 12-bit unsigned [0, 4095] (cinema cameras)
/// - `U16` - 16-bit unsigned [0, 65535]
///
/// Floating-point formats:
/// - `F16` - 16-bit half-precision IEEE 754
/// - `F32` - 32-bit single-precision IEEE 754
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BitDepth {
    /// Unknown/unspecified.
    Unknown,
    /// 8-bit unsigned integer.
    U8,
    /// 10-bit unsigned integer (DPX, broadcast).
    U10,
    /// 12-bit unsigned integer (cinema cameras).
    U12,
    /// 16-bit unsigned integer.
    U16,
    /// 16-bit half-precision float.
    F16,
    /// 32-bit single-precision float (VFX standard).
    #[default]
    F32,
}

impl BitDepth {
    /// Number of bits per channel.
    /// Returns 0 for Unknown.
    #[inline]
    pub const fn bits(&self) -> u32 {
        match self {
            Self::Unknown => 0,
            Self::U8 => 8,
            Self::U10 => 10,
            Self::U12 => 12,
            Self::U16 | Self::F16 => 16,
            Self::F32 => 32,
        }
    }

    /// Whether this is a floating-point format.
    #[inline]
    pub const fn is_float(&self) -> bool {
        matches!(self, Self::F16 | Self::F32)
    }

    /// Whether this is unknown.
    #[inline]
    pub const fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }

    /// Code value that maps to 1.0 when normalizing.
    ///
    /// Float and unknown depths are already normalized and return 1.0.
    #[inline]
    pub const fn max_value(&self) -> f32 {
        match self {
            Self::U8 => 255.0,
            Self::U10 => 1023.0,
            Self::U12 => 4095.0,
            Self::U16 => 65535.0,
            Self::Unknown | Self::F16 | Self::F32 => 1.0,
        }
    }

    /// Parse from CLF bit depth string ("8i", "10i", "12i", "16i", "16f", "32f").
    ///
    /// # Example
    /// ```rust
    /// use vfx_core::BitDepth;
    /// assert_eq!(BitDepth::from_clf_str("10i"), Some(BitDepth::U10));
    /// assert_eq!(BitDepth::from_clf_str("32f"), Some(BitDepth::F32));
    /// assert_eq!(BitDepth::from_clf_str("7i"), None);
    /// ```
    pub fn from_clf_str(s: &str) -> Option<Self> {
        match s {
            "8i" => Some(Self::U8),
            "10i" => Some(Self::U10),
            "12i" => Some(Self::U12),
            "16i" => Some(Self::U16),
            "16f" => Some(Self::F16),
            "32f" => Some(Self::F32),
            _ => None,
        }
    }

    /// Returns CLF bit depth string.
    ///
    /// # Example
    /// ```rust
    /// use vfx_core::BitDepth;
    /// assert_eq!(BitDepth::U10.clf_str(), "10i");
    /// assert_eq!(BitDepth::F32.clf_str(), "32f");
    /// ```
    pub fn clf_str(&self) -> &'static str {
        match self {
            Self::Unknown => "32f",
            Self::U8 => "8i",
            Self::U10 => "10i",
            Self::U12 => "12i",
            Self::U16 => "16i",
            Self::F16 => "16f",
            Self::F32 => "32f",
        }
    }
}

impl std::fmt::Display for BitDepth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unknown => write!(f, "unknown"),
            Self::U8 => write!(f, "8-bit"),
            Self::U10 => write!(f, "10-bit"),
            Self::U12 => write!(f, "12-bit"),
            Self::U16 => write!(f, "16-bit"),
            Self::F16 => write!(f, "half"),
            Self::F32 => write!(f, "float"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clf_strings_roundtrip() {
        for depth in [
            BitDepth::U8,
            BitDepth::U10,
            BitDepth::U12,
            BitDepth::U16,
            BitDepth::F16,
            BitDepth::F32,
        ] {
            assert_eq!(BitDepth::from_clf_str(depth.clf_str()), Some(depth));
        }
    }

    #[test]
    fn normalization_scale() {
        assert_eq!(BitDepth::U8.max_value(), 255.0);
        assert_eq!(BitDepth::U12.max_value(), 4095.0);
        assert_eq!(BitDepth::F16.max_value(), 1.0);
        assert!(BitDepth::F16.is_float());
        assert!(!BitDepth::U16.is_float());
    }
}
