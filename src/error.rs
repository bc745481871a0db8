use thiserror::Error;

/// Top-level error type for the Roundel fillet kernel.
#[derive(Debug, Error)]
pub enum RoundelError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error(transparent)]
    Topology(#[from] TopologyError),

    #[error(transparent)]
    Boolean(#[from] BooleanError),
}

/// Input errors reported before any geometry is built.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("fillet radius must be positive, got {radius}")]
    NonPositiveRadius { radius: f64 },

    #[error("face not found: {0}")]
    MissingFace(String),

    #[error("no edge shared by faces {face_a} and {face_b}")]
    MissingEdge { face_a: String, face_b: String },

    #[error("edge polyline needs at least {required} points, got {actual}")]
    PolylineTooShort { required: usize, actual: usize },

    #[error("tube inner radius {inner} must be smaller than outer radius {outer}")]
    InvalidTubeRadii { inner: f64, outer: f64 },

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Errors related to geometric computations.
#[derive(Debug, Error)]
pub enum GeometryError {
    #[error("degenerate geometry: {0}")]
    Degenerate(String),

    #[error("zero-length vector")]
    ZeroVector,

    #[error("insufficient valid sections: {valid} solved, {required} required")]
    InsufficientSections { valid: usize, required: usize },

    #[error("triangulation failed: {0}")]
    TriangulationFailed(String),
}

/// Errors related to mesh topology.
#[derive(Debug, Error)]
pub enum TopologyError {
    #[error("entity not found: {0}")]
    EntityNotFound(String),

    #[error("mesh is not a closed 2-manifold: {boundary} boundary edges, {non_manifold} non-manifold edges, {inconsistent} inconsistently wound edges")]
    NotManifold {
        boundary: usize,
        non_manifold: usize,
        inconsistent: usize,
    },

    #[error("invalid topology: {0}")]
    InvalidTopology(String),
}

/// Errors raised by a boolean-mesh engine.
#[derive(Debug, Error)]
pub enum BooleanError {
    #[error("operand {operand} rejected: {reason}")]
    InvalidOperand { operand: &'static str, reason: String },

    #[error("boolean operation produced an empty result")]
    EmptyResult,

    #[error("convex hull failed: {0}")]
    Hull(String),

    #[error("boolean operation failed: {0}")]
    Failed(String),

    #[error("boolean result is not a closed manifold: {0}")]
    InvalidResult(String),
}

/// Convenience type alias for results using [`RoundelError`].
pub type Result<T> = std::result::Result<T, RoundelError>;
