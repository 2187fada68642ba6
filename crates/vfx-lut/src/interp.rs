//! Interpolation methods for LUT evaluation.

/// Interpolation method for LUT evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Interpolation {
    /// Nearest neighbor (no interpolation).
    Nearest,

    /// Linear interpolation (1D) / Trilinear (3D).
    #[default]
    Linear,

    /// Tetrahedral interpolation (3D only, linear for 1D).
    Tetrahedral,

    /// Highest quality the LUT kind offers.
    ///
    /// Tetrahedral for 3D LUTs, linear for 1D LUTs.
    Best,
}

impl Interpolation {
    /// Method actually used when evaluating a 1D LUT.
    pub const fn for_1d(self) -> Self {
        match self {
            Self::Nearest => Self::Nearest,
            _ => Self::Linear,
        }
    }

    /// Method actually used when evaluating a 3D LUT.
    pub const fn for_3d(self) -> Self {
        match self {
            Self::Nearest => Self::Nearest,
            Self::Linear => Self::Linear,
            Self::Tetrahedral | Self::Best => Self::Tetrahedral,
        }
    }

    /// Short lowercase name, stable across releases.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Nearest => "nearest",
            Self::Linear => "linear",
            Self::Tetrahedral => "tetrahedral",
            Self::Best => "best",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn best_resolves_per_dimension() {
        assert_eq!(Interpolation::Best.for_1d(), Interpolation::Linear);
        assert_eq!(Interpolation::Best.for_3d(), Interpolation::Tetrahedral);
        assert_eq!(Interpolation::Tetrahedral.for_1d(), Interpolation::Linear);
        assert_eq!(Interpolation::Nearest.for_3d(), Interpolation::Nearest);
    }
}
