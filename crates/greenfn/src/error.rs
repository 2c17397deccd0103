//! Error types for greenfn

use greenfn_mesh::MeshError;
use thiserror::Error;

/// Result type for Green's function operations
pub type Result<T> = std::result::Result<T, GfError>;

/// Errors raised by containers, lazy expressions and block compositions
#[derive(Error, Debug)]
pub enum GfError {
    /// Mesh construction or lookup failed
    #[error(transparent)]
    Mesh(MeshError),

    /// Two containers live on incompatible meshes
    #[error("Mesh mismatch: {left} vs {right}")]
    MeshMismatch {
        /// Mesh of the left operand
        left: String,
        /// Mesh of the right operand
        right: String,
    },

    /// Data or target shapes do not match
    #[error("Shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        /// Shape required by the operation
        expected: Vec<usize>,
        /// Shape that was given
        actual: Vec<usize>,
    },

    /// Target extents must be strictly positive
    #[error("Invalid target shape {0:?}: every extent must be positive")]
    InvalidTargetShape(Vec<usize>),

    /// Blocks of a BlockGf differ in mesh kind or target rank
    #[error("Block '{name}' has mesh {kinds} and target rank {target_rank}, expected {expected}")]
    HeterogeneousBlocks {
        /// Name of the offending block
        name: String,
        /// Mesh kinds of the offending block
        kinds: String,
        /// Target rank of the offending block
        target_rank: usize,
        /// Mesh kinds and rank of the first block
        expected: String,
    },

    /// Two BlockGfs do not share block names or block shapes
    #[error("Block structure mismatch: {0}")]
    StructureMismatch(String),

    /// The operation is not defined for these target ranks
    #[error("{operation} is not supported for target ranks ({left}, {right})")]
    UnsupportedRank {
        /// Name of the operation
        operation: &'static str,
        /// Target rank of the left operand
        left: usize,
        /// Target rank of the right operand
        right: usize,
    },

    /// Terminals of a lazy expression live on incompatible meshes
    #[error("Incompatible meshes in lazy expression: {0}")]
    IncompatibleMesh(String),

    /// A lazy expression cannot be evaluated in the given context
    #[error("Cannot evaluate expression: {0}")]
    EvaluationContext(String),

    /// No implementation for this mesh kind / target rank
    #[error("Not supported: {0}")]
    NotSupported(String),

    /// The key does not address the container
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// A point lies outside the domain covered by the mesh
    #[error("Point {0} lies outside the mesh domain")]
    OutOfDomain(String),

    /// Reserved, empty or duplicate block name
    #[error("Invalid block name '{0}'")]
    InvalidBlockName(String),

    /// Complex data cannot be stored in a real container
    #[error("Data type mismatch: {0}")]
    DtypeMismatch(String),

    /// Matrix inversion hit a zero pivot
    #[error("Singular matrix at mesh point {point}")]
    SingularMatrix {
        /// Linear index of the mesh point
        point: usize,
    },

    /// Malformed or unknown persisted data
    #[error("Archive error: {0}")]
    Archive(String),

    /// The data buffer could not be allocated
    #[error("Cannot allocate Green's function data of shape {shape:?}")]
    Allocation {
        /// Requested data shape
        shape: Vec<usize>,
    },

    /// ndarray reshape failure
    #[error(transparent)]
    Layout(#[from] ndarray::ShapeError),
}

impl From<MeshError> for GfError {
    fn from(err: MeshError) -> Self {
        match err {
            MeshError::Mismatch { left, right } => GfError::MeshMismatch { left, right },
            other => GfError::Mesh(other),
        }
    }
}

impl GfError {
    /// Report a mesh mismatch inside a lazy expression as such.
    pub(crate) fn into_expression_error(self) -> Self {
        match self {
            GfError::MeshMismatch { left, right } => {
                GfError::IncompatibleMesh(format!("{left} vs {right}"))
            }
            other => other,
        }
    }
}
