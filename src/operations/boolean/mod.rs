//! Boolean composition of tagged triangle meshes.

mod bsp;
mod bsp_engine;
mod compose;
mod engine;

pub use bsp::{BspTree, NodeId, Plane, Polygon};
pub use bsp_engine::{close_cracks, junction_pass_bound, split_t_junctions, BspEngine};
pub use compose::Compose;
pub use engine::{BooleanOp, EngineMesh, MeshEngine};
