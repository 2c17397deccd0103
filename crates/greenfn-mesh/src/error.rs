//! Error types for greenfn-mesh

use thiserror::Error;

use crate::MeshKind;

/// Result type for mesh operations
pub type Result<T> = std::result::Result<T, MeshError>;

/// Errors that can occur while building or querying meshes
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MeshError {
    /// A constructor parameter is out of range
    #[error("Invalid parameter for {mesh}: {message}")]
    InvalidParameter {
        /// Name of the mesh type being built
        mesh: &'static str,
        /// What is wrong with the parameter
        message: String,
    },

    /// A domain or linear index lies outside the mesh
    #[error("Index {index} is out of bounds for mesh of size {size}")]
    IndexOutOfBounds {
        /// The offending index, rendered
        index: String,
        /// Number of points of the mesh
        size: usize,
    },

    /// A continuous value lies outside the mesh domain
    #[error("Value {value} lies outside the mesh domain [{lower}, {upper}]")]
    OutOfDomain {
        /// The requested value
        value: f64,
        /// Lower end of the domain
        lower: f64,
        /// Upper end of the domain
        upper: f64,
    },

    /// The index variant does not fit the mesh kind
    #[error("Index {index} cannot address a {kind:?} mesh")]
    WrongIndexKind {
        /// Kind of the mesh being addressed
        kind: MeshKind,
        /// The offending index, rendered
        index: String,
    },

    /// Two meshes cannot be combined or compared
    #[error("Mesh mismatch: {left} vs {right}")]
    Mismatch {
        /// Left-hand mesh
        left: String,
        /// Right-hand mesh
        right: String,
    },

    /// Copying a mesh across different kinds
    #[error("Cannot copy a {actual:?} mesh into a {expected:?} mesh")]
    KindMismatch {
        /// Kinds of the destination mesh
        expected: Vec<MeshKind>,
        /// Kinds of the source mesh
        actual: Vec<MeshKind>,
    },

    /// Invalid product composition
    #[error("Invalid mesh product: {0}")]
    InvalidProduct(String),

    /// The mesh has no adjoint domain
    #[error("{0:?} mesh has no adjoint mesh")]
    NoAdjoint(MeshKind),
}
