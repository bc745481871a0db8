use crate::mesh::Solid;

/// Computes the volume of a solid.
///
/// Uses the signed tetrahedron method: for each triangle, sums
/// `(1/6) * v0 . (v1 x v2)`. Outward-wound solids give a positive value;
/// [`Volume::execute`] returns the magnitude.
pub struct Volume<'a> {
    solid: &'a Solid,
}

impl<'a> Volume<'a> {
    /// Creates a new `Volume` query.
    #[must_use]
    pub fn new(solid: &'a Solid) -> Self {
        Self { solid }
    }

    /// Signed volume; negative for inside-out solids.
    #[must_use]
    pub fn signed(&self) -> f64 {
        self.solid.mesh().signed_volume()
    }

    /// Executes the query, returning the volume (absolute value).
    #[must_use]
    pub fn execute(&self) -> f64 {
        self.signed().abs()
    }
}
