//! Post-boolean cleanup of a filleted solid.
//!
//! Both passes are best-effort: they report what they changed and log what
//! they could not do, but never fail the fillet.

pub mod seam;
pub mod tiny_faces;

pub use seam::{snap_seams, tangent_curves};
pub use tiny_faces::merge_tiny_faces;

/// Configuration of the cleanup passes.
#[derive(Debug, Clone, PartialEq)]
pub struct SeamParams {
    /// Run the cleanup passes at all.
    ///
    /// Default: `true`
    pub enabled: bool,
    /// Snap distance as a multiple of the fillet radius.
    ///
    /// Default: `0.05`
    pub snap_scale: f64,
    /// Arc-length distance from the ends of an open tangency curve, as a
    /// multiple of the radius, inside which vertices are left alone.
    ///
    /// Default: `0.25`
    pub endpoint_guard: f64,
    /// Faces whose area fell below this fraction of their tool area are
    /// merged into a round face.
    ///
    /// Default: `0.05`
    pub tiny_face_ratio: f64,
}

impl Default for SeamParams {
    fn default() -> Self {
        Self {
            enabled: true,
            snap_scale: 0.05,
            endpoint_guard: 0.25,
            tiny_face_ratio: 0.05,
        }
    }
}

impl SeamParams {
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_snap_scale(mut self, scale: f64) -> Self {
        self.snap_scale = scale;
        self
    }

    #[must_use]
    pub fn with_endpoint_guard(mut self, guard: f64) -> Self {
        self.endpoint_guard = guard;
        self
    }

    #[must_use]
    pub fn with_tiny_face_ratio(mut self, ratio: f64) -> Self {
        self.tiny_face_ratio = ratio;
        self
    }
}
