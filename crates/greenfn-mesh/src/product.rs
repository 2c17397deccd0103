//! Cartesian products of single-axis meshes.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{MeshError, Result};
use crate::{GfMesh, MeshIndex};

/// Ordered product of at least two single-axis meshes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeshProduct {
    components: Vec<GfMesh>,
}

impl MeshProduct {
    /// Product of at least two non-product meshes whose total size fits in `usize`.
    pub fn new(components: Vec<GfMesh>) -> Result<Self> {
        if components.len() < 2 {
            return Err(MeshError::InvalidProduct(format!(
                "a product needs at least two components, got {}",
                components.len()
            )));
        }
        if components.iter().any(|m| matches!(m, GfMesh::Product(_))) {
            return Err(MeshError::InvalidProduct(
                "products cannot be nested".to_string(),
            ));
        }
        let size = components
            .iter()
            .try_fold(1usize, |acc, m| acc.checked_mul(m.len()));
        if size.is_none() {
            return Err(MeshError::InvalidProduct(
                "number of points overflows usize".to_string(),
            ));
        }
        Ok(Self { components })
    }

    /// Components in axis order.
    pub fn components(&self) -> &[GfMesh] {
        &self.components
    }

    /// Number of components.
    pub fn rank(&self) -> usize {
        self.components.len()
    }

    /// Number of points of each component.
    pub fn size_of_components(&self) -> Vec<usize> {
        self.components.iter().map(GfMesh::len).collect()
    }

    /// Total number of points.
    pub fn len(&self) -> usize {
        self.components.iter().map(GfMesh::len).product()
    }

    /// Whether any component is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Per-component dense positions of a tuple of domain indices.
    pub fn to_data_index(&self, indices: &[MeshIndex]) -> Result<Vec<usize>> {
        if indices.len() != self.rank() {
            return Err(MeshError::InvalidProduct(format!(
                "expected {} indices, got {}",
                self.rank(),
                indices.len()
            )));
        }
        self.components
            .iter()
            .zip(indices)
            .map(|(mesh, index)| mesh.to_data_index(index))
            .collect()
    }

    /// Row-major flattening of per-component dense positions.
    pub fn linear_index(&self, data_indices: &[usize]) -> Result<usize> {
        if data_indices.len() != self.rank() {
            return Err(MeshError::InvalidProduct(format!(
                "expected {} positions, got {}",
                self.rank(),
                data_indices.len()
            )));
        }
        let mut linear = 0usize;
        for (mesh, &i) in self.components.iter().zip(data_indices) {
            let size = mesh.len();
            if i >= size {
                return Err(MeshError::IndexOutOfBounds {
                    index: i.to_string(),
                    size,
                });
            }
            linear = linear * size + i;
        }
        Ok(linear)
    }
}

impl fmt::Display for MeshProduct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MeshProduct(")?;
        for (i, mesh) in self.components.iter().enumerate() {
            if i > 0 {
                write!(f, " x ")?;
            }
            write!(f, "{mesh}")?;
        }
        write!(f, ")")
    }
}
