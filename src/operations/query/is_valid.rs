use crate::mesh::{EdgeAdjacency, Solid};

/// Why a solid failed validation; all zero/`true` for a valid one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValidityReport {
    pub boundary_edges: usize,
    pub non_manifold_edges: usize,
    pub inconsistent_edges: usize,
    pub unknown_face_ids: usize,
    pub volume: f64,
}

impl ValidityReport {
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.boundary_edges == 0
            && self.non_manifold_edges == 0
            && self.inconsistent_edges == 0
            && self.unknown_face_ids == 0
            && self.volume > 0.0
    }
}

/// Validates that a solid is a closed, consistently wound 2-manifold with
/// positive volume whose triangles all belong to named faces.
pub struct IsValid<'a> {
    solid: &'a Solid,
}

impl<'a> IsValid<'a> {
    /// Creates a new `IsValid` query.
    #[must_use]
    pub fn new(solid: &'a Solid) -> Self {
        Self { solid }
    }

    /// Collects the individual checks.
    #[must_use]
    pub fn report(&self) -> ValidityReport {
        let mesh = self.solid.mesh();
        let adjacency = EdgeAdjacency::build(&mesh.triangles);
        ValidityReport {
            boundary_edges: adjacency.boundary_edge_count(),
            non_manifold_edges: adjacency.non_manifold_edge_count(),
            inconsistent_edges: adjacency.inconsistent_edge_count(),
            unknown_face_ids: self.solid.unknown_face_ids().len(),
            volume: self.solid.volume(),
        }
    }

    /// Executes the validation, returning `true` if the solid is valid.
    #[must_use]
    pub fn execute(&self) -> bool {
        !self.solid.mesh().is_empty() && self.report().is_valid()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::math::Point3;
    use crate::operations::creation::MakeBox;

    #[test]
    fn box_is_valid() {
        let solid = MakeBox::new(Point3::origin(), Point3::new(1.0, 2.0, 3.0)).execute().unwrap();
        assert!(IsValid::new(&solid).execute());
    }

    #[test]
    fn open_box_is_invalid() {
        let mut solid = MakeBox::new(Point3::origin(), Point3::new(1.0, 1.0, 1.0)).execute().unwrap();
        solid.mesh_mut().retain_triangles(|i| i != 0);
        let report = IsValid::new(&solid).report();
        assert_eq!(report.boundary_edges, 3);
        assert!(!IsValid::new(&solid).execute());
    }

    #[test]
    fn inside_out_box_is_invalid() {
        let mut solid = MakeBox::new(Point3::origin(), Point3::new(1.0, 1.0, 1.0)).execute().unwrap();
        let mesh = solid.mesh_mut();
        for t in 0..mesh.len() {
            mesh.flip(t);
        }
        let report = IsValid::new(&solid).report();
        assert_eq!(report.boundary_edges, 0);
        assert!(report.volume < 0.0);
        assert!(!report.is_valid());
    }

    #[test]
    fn unnamed_triangles_are_invalid() {
        let mut solid = MakeBox::new(Point3::origin(), Point3::new(1.0, 1.0, 1.0)).execute().unwrap();
        solid.mesh_mut().face_ids[0] = u32::MAX;
        assert_eq!(IsValid::new(&solid).report().unknown_face_ids, 1);
        assert!(!IsValid::new(&solid).execute());
    }

    #[test]
    fn empty_solid_is_invalid() {
        assert!(!IsValid::new(&Solid::new("empty")).execute());
    }
}
