//! Manifold consistency layer.
//!
//! Every tool mesh passes through here before it is handed to a boolean
//! engine: welding, degenerate removal, strict 2-manifold enforcement, winding
//! correction and outward orientation, in that order.

pub mod boundary;
pub mod degenerate;
pub mod manifold;
pub mod orientation;
pub mod patch;
pub mod weld;

use std::fmt;

use tracing::debug;

pub use boundary::{find_boundary_loops, BoundaryLoop};
pub use degenerate::{degenerate_area_threshold, remove_degenerate_triangles};
pub use manifold::{enforce_manifold, FaceRole};
pub use orientation::{fix_winding, orient_outward};
pub use patch::{patch_holes, triangulate_hole, HolePatch, PatchKind};
pub use weld::weld_vertices;

use crate::math::Tolerance;
use crate::mesh::{FaceTable, TriMesh};

/// Configuration of the consistency layer.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsistencyParams {
    /// Weld distance; `None` uses the tolerance's weld threshold.
    pub weld_epsilon: Option<f64>,
    /// Upper bound on manifold enforcement passes.
    ///
    /// Default: `8`
    pub max_manifold_passes: usize,
    /// Upper bound on boundary trace length (in edges).
    ///
    /// Default: `100_000`
    pub max_trace_length: usize,
}

impl Default for ConsistencyParams {
    fn default() -> Self {
        Self {
            weld_epsilon: None,
            max_manifold_passes: 8,
            max_trace_length: 100_000,
        }
    }
}

impl ConsistencyParams {
    #[must_use]
    pub fn with_weld_epsilon(mut self, epsilon: f64) -> Self {
        self.weld_epsilon = Some(epsilon);
        self
    }

    #[must_use]
    pub fn with_max_manifold_passes(mut self, passes: usize) -> Self {
        self.max_manifold_passes = passes;
        self
    }

    #[must_use]
    pub fn with_max_trace_length(mut self, length: usize) -> Self {
        self.max_trace_length = length;
        self
    }
}

/// What a consistency run changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsistencyReport {
    pub vertices_welded: usize,
    pub degenerates_removed: usize,
    pub manifold_dropped: usize,
    pub triangles_flipped: usize,
    pub reoriented: bool,
}

impl ConsistencyReport {
    #[must_use]
    pub fn had_changes(&self) -> bool {
        self.vertices_welded > 0
            || self.degenerates_removed > 0
            || self.manifold_dropped > 0
            || self.triangles_flipped > 0
            || self.reoriented
    }
}

impl fmt::Display for ConsistencyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "consistency: {} welded, {} degenerate, {} non-manifold dropped, {} flipped{}",
            self.vertices_welded,
            self.degenerates_removed,
            self.manifold_dropped,
            self.triangles_flipped,
            if self.reoriented { ", reoriented" } else { "" }
        )
    }
}

/// Runs the full consistency pipeline on a mesh.
pub struct ConsistencyLayer {
    tolerance: Tolerance,
    params: ConsistencyParams,
}

impl ConsistencyLayer {
    #[must_use]
    pub fn new(tolerance: Tolerance) -> Self {
        Self {
            tolerance,
            params: ConsistencyParams::default(),
        }
    }

    #[must_use]
    pub fn with_params(mut self, params: ConsistencyParams) -> Self {
        self.params = params;
        self
    }

    /// Minimum triangle area this layer keeps.
    #[must_use]
    pub fn min_area(&self) -> f64 {
        degenerate_area_threshold(self.tolerance.radius)
    }

    /// Maximum boundary trace length for hole patching.
    #[must_use]
    pub fn max_trace_length(&self) -> usize {
        self.params.max_trace_length
    }

    /// Cleans `mesh` in place. `faces` names the face IDs for role-based
    /// manifold enforcement.
    pub fn execute(&self, mesh: &mut TriMesh, faces: &FaceTable) -> ConsistencyReport {
        let weld = self.params.weld_epsilon.unwrap_or(self.tolerance.weld);
        let report = ConsistencyReport {
            vertices_welded: weld_vertices(mesh, weld),
            degenerates_removed: remove_degenerate_triangles(mesh, self.min_area()),
            manifold_dropped: enforce_manifold(mesh, faces, self.params.max_manifold_passes),
            triangles_flipped: fix_winding(mesh),
            reoriented: orient_outward(mesh),
        };
        debug!(%report, triangles = mesh.len(), "consistency layer finished");
        report
    }
}
