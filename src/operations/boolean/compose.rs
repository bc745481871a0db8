use std::collections::HashMap;

use tracing::{debug, info};

use super::engine::{BooleanOp, MeshEngine};
use crate::error::{BooleanError, Result};
use crate::mesh::{FaceTable, Solid};

/// Combines a target solid with a tool solid through a [`MeshEngine`].
///
/// Neither input is modified. Face names of the result are re-derived from
/// the engine's triangle tags; tags the inputs never named get a placeholder
/// `FACE_{tag}` name. Metadata and auxiliary edges of both inputs are carried
/// over, the tool's entries winning on collision.
pub struct Compose<'a> {
    target: &'a Solid,
    tool: &'a Solid,
    op: BooleanOp,
    simplify: Option<f64>,
    name: Option<String>,
}

impl<'a> Compose<'a> {
    #[must_use]
    pub fn new(target: &'a Solid, tool: &'a Solid, op: BooleanOp) -> Self {
        Self {
            target,
            tool,
            op,
            simplify: None,
            name: None,
        }
    }

    /// Simplifies the engine result with the given tolerance.
    #[must_use]
    pub fn with_simplify(mut self, tolerance: Option<f64>) -> Self {
        self.simplify = tolerance;
        self
    }

    /// Name of the resulting solid (defaults to the target's name).
    #[must_use]
    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_owned());
        self
    }

    /// Runs the boolean and rebuilds a named solid.
    ///
    /// # Errors
    ///
    /// Propagates engine failures, and returns
    /// [`BooleanError::InvalidResult`] when the engine's own validation
    /// rejects the combined mesh.
    pub fn execute(&self, engine: &dyn MeshEngine) -> Result<Solid> {
        let mut names: HashMap<u32, String> = HashMap::new();
        for table in [self.target.faces(), self.tool.faces()] {
            for (id, name) in table.iter() {
                names.insert(id, name.to_owned());
            }
        }

        let mut result = engine.boolean(self.target.engine_mesh(), self.tool.engine_mesh(), self.op)?;
        if let Some(tolerance) = self.simplify {
            result = engine.simplify(&result, tolerance)?;
        }
        engine
            .validate(&result)
            .map_err(|e| BooleanError::InvalidResult(e.to_string()))?;

        let mut mesh = result.to_tri_mesh();
        let mut faces = FaceTable::new();
        let mut canonical: HashMap<u32, u32> = HashMap::new();
        let mut placeholders = 0usize;
        for slot in &mut mesh.face_ids {
            let tag = *slot;
            *slot = *canonical.entry(tag).or_insert_with(|| {
                let name = names.get(&tag).cloned().unwrap_or_else(|| {
                    placeholders += 1;
                    format!("FACE_{tag}")
                });
                if let Some(id) = faces.id(&name) {
                    id
                } else if faces.contains_id(tag) {
                    faces.ensure(&name)
                } else {
                    faces.bind(tag, &name);
                    tag
                }
            });
        }
        if placeholders > 0 {
            debug!(placeholders, "engine returned unnamed face tags");
        }

        let name = self.name.as_deref().unwrap_or_else(|| self.target.name());
        let mut solid = Solid::from_parts(name, mesh, faces);
        solid.merge_metadata(self.target.metadata());
        solid.merge_metadata(self.tool.metadata());
        solid.extend_aux_edges(self.target.aux_edges());
        solid.extend_aux_edges(self.tool.aux_edges());
        solid.prune_faces();

        info!(
            op = ?self.op,
            triangles = solid.mesh().len(),
            faces = solid.faces().len(),
            volume = solid.volume(),
            "boolean composition finished"
        );
        Ok(solid)
    }
}
