use crate::error::{Result, ValidationError};
use crate::operations::cleanup::SeamParams;
use crate::operations::repair::ConsistencyParams;

use super::context::CachePolicy;

/// Which side of the edge the fillet works on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SideMode {
    /// Removes material (rounds a convex edge); the tool is subtracted.
    #[default]
    Inset,
    /// Adds material (fills a concave edge); the tool is united.
    Outset,
}

impl SideMode {
    /// `+1` for [`SideMode::Outset`], `-1` for [`SideMode::Inset`].
    #[must_use]
    pub fn sign(self) -> f64 {
        match self {
            Self::Inset => -1.0,
            Self::Outset => 1.0,
        }
    }
}

/// Tool construction strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StrategyKind {
    /// Offset-plane tangent circle per station.
    #[default]
    TangentCircle,
    /// 2D cross-section bisector per station.
    SectionSlice,
    /// Union of convex hulls of consecutive station kites, minus a tube.
    HullChainTube,
}

/// Adjusted recipe tried once when the first tool is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RetryStrategy {
    /// Never retry.
    None,
    /// Pick the first applicable adjustment below.
    #[default]
    Auto,
    /// Flip between face-projected and analytic side strips.
    ToggleProjection,
    /// Force a seam inset of at least ten times the default scale.
    ForceSeamInset,
    /// Halve the inflate distance.
    ShrinkInflate,
}

/// Tunables of a fillet request.
#[derive(Debug, Clone, PartialEq)]
pub struct FilletParams {
    /// Segments per arc ring.
    ///
    /// Default: `8`
    pub arc_segments: usize,
    /// Subdivisions across each side strip.
    ///
    /// Default: `1`
    pub strip_subdivisions: usize,
    /// Maximum station spacing as a multiple of the radius.
    ///
    /// Default: `0.5`
    pub max_station_spacing: f64,
    /// Minimum number of stations on an open edge.
    ///
    /// Default: `4`
    pub min_stations: usize,
    /// Project side strips onto the source faces.
    ///
    /// Default: `true`
    pub project_strips: bool,
    /// Seam inset as a multiple of the radius.
    ///
    /// Default: `2e-3`
    pub inset_scale: f64,
    /// End bulge of open tools as a multiple of the radius; `0` disables it.
    ///
    /// Default: `0.05`
    pub bulge_scale: f64,
    pub strategy: StrategyKind,
    pub retry: RetryStrategy,
    /// Inner radius of the tube used by [`StrategyKind::HullChainTube`].
    ///
    /// Default: `0.0`
    pub tube_inner_radius: f64,
    /// Simplification tolerance passed to the engine after composition.
    pub simplify_tolerance: Option<f64>,
    pub cache: CachePolicy,
    pub seam: SeamParams,
    pub consistency: ConsistencyParams,
}

impl Default for FilletParams {
    fn default() -> Self {
        Self {
            arc_segments: 8,
            strip_subdivisions: 1,
            max_station_spacing: 0.5,
            min_stations: 4,
            project_strips: true,
            inset_scale: 2e-3,
            bulge_scale: 0.05,
            strategy: StrategyKind::default(),
            retry: RetryStrategy::default(),
            tube_inner_radius: 0.0,
            simplify_tolerance: None,
            cache: CachePolicy::default(),
            seam: SeamParams::default(),
            consistency: ConsistencyParams::default(),
        }
    }
}

impl FilletParams {
    #[must_use]
    pub fn with_arc_segments(mut self, segments: usize) -> Self {
        self.arc_segments = segments;
        self
    }

    #[must_use]
    pub fn with_strip_subdivisions(mut self, subdivisions: usize) -> Self {
        self.strip_subdivisions = subdivisions;
        self
    }

    #[must_use]
    pub fn with_max_station_spacing(mut self, spacing: f64) -> Self {
        self.max_station_spacing = spacing;
        self
    }

    #[must_use]
    pub fn with_min_stations(mut self, stations: usize) -> Self {
        self.min_stations = stations;
        self
    }

    #[must_use]
    pub fn with_project_strips(mut self, project: bool) -> Self {
        self.project_strips = project;
        self
    }

    #[must_use]
    pub fn with_inset_scale(mut self, scale: f64) -> Self {
        self.inset_scale = scale;
        self
    }

    #[must_use]
    pub fn with_bulge_scale(mut self, scale: f64) -> Self {
        self.bulge_scale = scale;
        self
    }

    #[must_use]
    pub fn with_strategy(mut self, strategy: StrategyKind) -> Self {
        self.strategy = strategy;
        self
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryStrategy) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub fn with_tube_inner_radius(mut self, radius: f64) -> Self {
        self.tube_inner_radius = radius;
        self
    }

    #[must_use]
    pub fn with_simplify_tolerance(mut self, tolerance: Option<f64>) -> Self {
        self.simplify_tolerance = tolerance;
        self
    }

    #[must_use]
    pub fn with_cache(mut self, cache: CachePolicy) -> Self {
        self.cache = cache;
        self
    }

    #[must_use]
    pub fn with_seam(mut self, seam: SeamParams) -> Self {
        self.seam = seam;
        self
    }

    #[must_use]
    pub fn with_consistency(mut self, consistency: ConsistencyParams) -> Self {
        self.consistency = consistency;
        self
    }

    /// Rejects parameter combinations no strategy can work with.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidParameter`].
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: &str| Err(ValidationError::InvalidParameter(msg.to_owned()).into());
        if self.arc_segments < 2 {
            return invalid("arc_segments must be at least 2");
        }
        if self.strip_subdivisions == 0 {
            return invalid("strip_subdivisions must be at least 1");
        }
        if self.max_station_spacing.is_nan() || self.max_station_spacing <= 0.0 {
            return invalid("max_station_spacing must be positive");
        }
        if self.min_stations < 2 {
            return invalid("min_stations must be at least 2");
        }
        if self.inset_scale < 0.0 || self.bulge_scale < 0.0 {
            return invalid("inset_scale and bulge_scale must be non-negative");
        }
        Ok(())
    }
}
