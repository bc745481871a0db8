//! Edge fillets on triangulated solids.
//!
//! A fillet builds a closed tool solid along the selected edge (the region
//! between the edge and the rolling-ball arc), runs it through the
//! consistency layer, and composes it with the target: subtracted for
//! [`SideMode::Inset`], united for [`SideMode::Outset`]. Post-boolean
//! cleanup snaps seams and merges sliver faces.

pub mod context;
pub mod naming;
pub mod params;
pub mod retry;
pub mod ring;
pub mod sampler;
pub mod station;
pub mod strategy;
pub mod tool;
pub mod tube;

use std::collections::HashMap;

use tracing::{debug, info, warn};

pub use context::{CachePolicy, CacheStats, FilletContext, LruCache};
pub use naming::FaceNames;
pub use params::{FilletParams, RetryStrategy, SideMode, StrategyKind};
pub use retry::{Attempt, Recipe, RetryPlan};
pub use ring::Alignment;
pub use sampler::{FaceSample, FaceSampler};
pub use station::{SkipReason, SolveMethod, SolverMode, Station, StationSolver};
pub use strategy::{strategy_for, FilletStrategy, HullChainTube, SectionSlice, TangentCircle};
pub use tool::{face_submesh, SeamClosure, ToolBuild, ToolInput};
pub use tube::Tube;

use crate::error::{GeometryError, Result, ValidationError};
use crate::math::Tolerance;
use crate::mesh::{EdgeSelection, Solid, TriMesh};
use crate::operations::boolean::{BooleanOp, Compose, MeshEngine};
use crate::operations::cleanup::{merge_tiny_faces, snap_seams, tangent_curves};

/// Everything a fillet request produced.
#[derive(Debug, Clone)]
pub struct FilletResult {
    /// The finished tool solid.
    pub tool: Solid,
    /// Triangles of the rounded face of the tool.
    pub arc_mesh: TriMesh,
    /// Triangles of the two side strips (empty for tube tools' missing sides).
    pub side_strips: Vec<TriMesh>,
    /// The composed solid; `None` when a debug request stopped at an
    /// unusable tool.
    pub final_solid: Option<Solid>,
    /// Why the tool was rejected, in debug mode.
    pub error: Option<String>,
    pub stations: Vec<Station>,
    /// How a closed rail's loft meets its first ring.
    pub seam: Option<SeamClosure>,
    /// Number of construction attempts made (1 or 2).
    pub attempts: usize,
}

impl FilletResult {
    /// The composed solid, or an unmodified clone of `target` when there is
    /// none.
    #[must_use]
    pub fn solid_or_clone(&self, target: &Solid) -> Solid {
        self.final_solid.clone().unwrap_or_else(|| target.clone())
    }
}

/// Rounds (or fills) one edge of a solid.
pub struct Fillet {
    edge: EdgeSelection,
    radius: f64,
    side: SideMode,
    inflate: f64,
    debug: bool,
    params: FilletParams,
    name: String,
}

impl Fillet {
    #[must_use]
    pub fn new(edge: EdgeSelection, radius: f64) -> Self {
        Self {
            edge,
            radius,
            side: SideMode::default(),
            inflate: 0.0,
            debug: false,
            params: FilletParams::default(),
            name: "FILLET".to_owned(),
        }
    }

    #[must_use]
    pub fn with_side(mut self, side: SideMode) -> Self {
        self.side = side;
        self
    }

    /// Absolute grow distance applied to seams and side strips along the
    /// face normals.
    #[must_use]
    pub fn with_inflate(mut self, inflate: f64) -> Self {
        self.inflate = inflate;
        self
    }

    /// Stops at the raw tool and reports the problem instead of composing
    /// when the tool is rejected by the engine.
    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    #[must_use]
    pub fn with_params(mut self, params: FilletParams) -> Self {
        self.params = params;
        self
    }

    /// Base name of the tool's faces.
    #[must_use]
    pub fn with_name(mut self, name: &str) -> Self {
        name.clone_into(&mut self.name);
        self
    }

    fn validate(&self) -> Result<()> {
        if self.radius.is_nan() || self.radius <= 0.0 {
            return Err(ValidationError::NonPositiveRadius { radius: self.radius }.into());
        }
        if self.inflate.is_nan() || self.inflate < 0.0 {
            return Err(ValidationError::InvalidParameter(format!(
                "inflate must be non-negative, got {}",
                self.inflate
            ))
            .into());
        }
        self.params.validate()?;
        self.edge.validate()
    }

    /// Builds the tool and composes it with `target`.
    ///
    /// `target` is never modified; the result carries a new solid.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] for bad inputs (before any geometry is
    /// built), a [`GeometryError`](crate::error::GeometryError) when the tool
    /// cannot be constructed, and engine errors from the composition unless
    /// the request is in debug mode.
    pub fn execute(&self, target: &Solid, engine: &dyn MeshEngine) -> Result<FilletResult> {
        self.validate()?;
        let names = FaceNames::new(&self.name);
        let tolerance = Tolerance::for_radius(self.radius);
        let mut ctx = FilletContext::new(self.params.cache);
        let strategy = strategy_for(self.params.strategy);
        let mut plan = RetryPlan::new(self.params.retry, Recipe::initial(&self.params, self.inflate));

        let mut attempts = 0;
        let mut outcome: Option<(ToolBuild, Option<String>)> = None;
        while let Some(attempt) = plan.next_attempt() {
            attempts += 1;
            if let Some(adjustment) = attempt.adjusted_by {
                warn!(?adjustment, recipe = ?attempt.recipe, "retrying fillet tool with adjusted recipe");
            }
            let input = ToolInput {
                source: target,
                edge: &self.edge,
                radius: self.radius,
                side: self.side,
                recipe: attempt.recipe,
                params: &self.params,
                names: &names,
                tolerance,
            };
            let build = strategy.build(&input, &mut ctx, engine)?;
            let verdict = engine.validate(build.tool.engine_mesh()).err().map(|e| e.to_string());
            let usable = verdict.is_none();
            if let Some(reason) = &verdict {
                warn!(attempt = attempts, %reason, "engine rejected fillet tool");
            }
            outcome = Some((build, verdict));
            if usable {
                break;
            }
        }
        debug!(stats = ?ctx.stats(), "fillet cache usage");

        let (build, problem) =
            outcome.ok_or_else(|| GeometryError::Degenerate("no construction attempt was made".into()))?;
        let arc = if self.params.strategy == StrategyKind::HullChainTube {
            &names.tube_outer
        } else {
            &names.arc
        };
        let mut result = FilletResult {
            arc_mesh: face_submesh(&build.tool, arc),
            side_strips: vec![
                face_submesh(&build.tool, &names.side_a),
                face_submesh(&build.tool, &names.side_b),
            ],
            tool: build.tool,
            final_solid: None,
            error: None,
            stations: build.stations,
            seam: build.seam,
            attempts,
        };
        if let (Some(reason), true) = (&problem, self.debug) {
            result.error = Some(reason.clone());
            return Ok(result);
        }

        let op = match self.side {
            SideMode::Inset => BooleanOp::Subtract,
            SideMode::Outset => BooleanOp::Union,
        };
        let composed = Compose::new(target, &result.tool, op)
            .with_simplify(self.params.simplify_tolerance)
            .execute(engine);
        let mut solid = match composed {
            Ok(solid) => solid,
            Err(e) if self.debug => {
                result.error = Some(e.to_string());
                return Ok(result);
            }
            Err(e) => return Err(e),
        };

        if self.params.seam.enabled {
            let curves = tangent_curves(&result.tool);
            let snapped = snap_seams(&mut solid, &curves, self.radius, &self.params.seam);
            let reference: HashMap<String, f64> = result
                .tool
                .face_names()
                .into_iter()
                .map(|name| {
                    let area = result.tool.face_area(&name);
                    (name, area)
                })
                .collect();
            let merged = merge_tiny_faces(&mut solid, &reference, self.params.seam.tiny_face_ratio);
            debug!(snapped, merged = merged.len(), "post-boolean cleanup");
        }

        info!(
            side = ?self.side,
            strategy = ?self.params.strategy,
            radius = self.radius,
            stations = result.stations.len(),
            attempts,
            volume_before = target.volume(),
            volume_after = solid.volume(),
            "fillet finished"
        );
        result.final_solid = Some(solid);
        Ok(result)
    }
}
