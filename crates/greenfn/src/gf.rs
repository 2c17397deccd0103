//! The Green's function container: a mesh plus a dense data array.

use std::fmt;

use greenfn_mesh::GfMesh;
use log::debug;
use ndarray::{
    ArrayBase, ArrayD, ArrayViewMutD, Data, DataMut, Dimension, IxDyn, OwnedRepr, RawData,
    RawDataClone, ViewRepr, Zip,
};
use num_complex::Complex64;

use crate::error::{GfError, Result};
use crate::scalar::Scalar;

/// A Green's function over storage `S`.
///
/// The data has shape `mesh.size_of_components() ++ target_shape`: the
/// leading axes follow the mesh components and the trailing axes are the
/// target (orbital) indices. `Gf` owns its data; `GfView` and `GfViewMut`
/// borrow it from another container, so writes through a mutable view are
/// visible in the parent.
pub struct GfBase<S: RawData> {
    pub(crate) mesh: GfMesh,
    pub(crate) data: ArrayBase<S, IxDyn>,
    pub(crate) name: String,
}

/// Owned Green's function.
pub type Gf<A = Complex64> = GfBase<OwnedRepr<A>>;

/// Read-only view into another container's data.
pub type GfView<'a, A = Complex64> = GfBase<ViewRepr<&'a A>>;

/// Mutable view into another container's data.
pub type GfViewMut<'a, A = Complex64> = GfBase<ViewRepr<&'a mut A>>;

/// Check `shape == mesh.size_of_components() ++ target_shape` with a
/// strictly positive target shape.
pub(crate) fn check_layout(mesh: &GfMesh, shape: &[usize]) -> Result<()> {
    let sizes = mesh.size_of_components();
    if shape.len() < sizes.len() || shape[..sizes.len()] != sizes[..] {
        return Err(GfError::ShapeMismatch {
            expected: sizes,
            actual: shape.to_vec(),
        });
    }
    let target = &shape[sizes.len()..];
    if target.contains(&0) {
        return Err(GfError::InvalidTargetShape(target.to_vec()));
    }
    Ok(())
}

/// Zero-filled array, reporting allocation failure instead of aborting.
pub(crate) fn allocate_zeros<A: Scalar>(shape: &[usize]) -> Result<ArrayD<A>> {
    let alloc_error = || GfError::Allocation {
        shape: shape.to_vec(),
    };
    let elements = shape
        .iter()
        .try_fold(1usize, |acc, &d| acc.checked_mul(d))
        .ok_or_else(alloc_error)?;
    let too_large = elements
        .checked_mul(std::mem::size_of::<A>())
        .map_or(true, |bytes| bytes > isize::MAX as usize);
    if too_large {
        return Err(alloc_error());
    }
    let mut buffer = Vec::new();
    buffer
        .try_reserve_exact(elements)
        .map_err(|_| alloc_error())?;
    buffer.resize(elements, A::zero());
    Ok(ArrayD::from_shape_vec(IxDyn(shape), buffer)?)
}

impl<S: RawData> GfBase<S> {
    pub(crate) fn from_parts(mesh: GfMesh, data: ArrayBase<S, IxDyn>, name: String) -> Result<Self> {
        check_layout(&mesh, data.shape())?;
        Ok(Self { mesh, data, name })
    }
}

impl<A: Scalar> Gf<A> {
    /// Zero-initialized container on `mesh` with the given target shape.
    ///
    /// An empty `target_shape` gives a scalar-valued function.
    pub fn new(mesh: impl Into<GfMesh>, target_shape: &[usize]) -> Result<Self> {
        let mesh = mesh.into();
        if target_shape.contains(&0) {
            return Err(GfError::InvalidTargetShape(target_shape.to_vec()));
        }
        let mut shape = mesh.size_of_components();
        shape.extend_from_slice(target_shape);
        debug!("allocating Green's function of shape {shape:?} on {mesh}");
        let data = allocate_zeros(&shape)?;
        Self::from_parts(mesh, data, String::new())
    }

    /// Wrap existing data; its leading axes must match the mesh.
    pub fn from_data(mesh: impl Into<GfMesh>, data: ArrayD<A>) -> Result<Self> {
        Self::from_parts(mesh.into(), data, String::new())
    }

    /// Set the diagnostic name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Consume the container, returning its data.
    pub fn into_data(self) -> ArrayD<A> {
        self.data
    }
}

impl<A: Scalar, S: Data<Elem = A>> GfBase<S> {
    /// Mesh the function is sampled on.
    pub fn mesh(&self) -> &GfMesh {
        &self.mesh
    }

    /// Data with mesh axes first, then target axes.
    pub fn data(&self) -> &ArrayBase<S, IxDyn> {
        &self.data
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rename in place.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Number of mesh axes.
    pub fn rank(&self) -> usize {
        self.mesh.rank()
    }

    /// Number of target axes.
    pub fn target_rank(&self) -> usize {
        self.data.ndim() - self.rank()
    }

    /// Extents of the target axes.
    pub fn target_shape(&self) -> &[usize] {
        &self.data.shape()[self.rank()..]
    }

    /// All multi-indices of the target space in row-major order.
    pub fn target_indices(&self) -> Vec<Vec<usize>> {
        ndarray::indices(IxDyn(self.target_shape()))
            .into_iter()
            .map(|idx| idx.as_array_view().to_vec())
            .collect()
    }

    /// Whether the element type is complex.
    pub fn is_complex(&self) -> bool {
        A::IS_COMPLEX
    }

    /// Read-only view sharing this storage.
    pub fn view(&self) -> GfView<'_, A> {
        GfBase {
            mesh: self.mesh.clone(),
            data: self.data.view(),
            name: self.name.clone(),
        }
    }

    /// Deep copy with owned data.
    pub fn copy(&self) -> Gf<A> {
        GfBase {
            mesh: self.mesh.clone(),
            data: self.data.to_owned(),
            name: self.name.clone(),
        }
    }

    /// Pointwise comparison with absolute tolerance `eps`.
    pub fn abs_diff_eq<S2: Data<Elem = A>>(&self, other: &GfBase<S2>, eps: f64) -> bool {
        self.mesh == other.mesh
            && self.data.shape() == other.data.shape()
            && Zip::from(&self.data)
                .and(&other.data)
                .all(|&a, &b| (a - b).abs_f64() <= eps)
    }

    pub(crate) fn require_same_mesh<S2: Data<Elem = A>>(&self, other: &GfBase<S2>) -> Result<()> {
        if self.mesh != other.mesh {
            return Err(GfError::MeshMismatch {
                left: self.mesh.to_string(),
                right: other.mesh.to_string(),
            });
        }
        Ok(())
    }

    pub(crate) fn require_same_shape<S2: Data<Elem = A>>(&self, other: &GfBase<S2>) -> Result<()> {
        if self.data.shape() != other.data.shape() {
            return Err(GfError::ShapeMismatch {
                expected: self.data.shape().to_vec(),
                actual: other.data.shape().to_vec(),
            });
        }
        Ok(())
    }
}

impl<A: Scalar, S: DataMut<Elem = A>> GfBase<S> {
    /// Mutable access to the data; the shape cannot be changed through it.
    pub fn data_mut(&mut self) -> ArrayViewMutD<'_, A> {
        self.data.view_mut()
    }

    /// Mutable view sharing this storage.
    pub fn view_mut(&mut self) -> GfViewMut<'_, A> {
        GfBase {
            mesh: self.mesh.clone(),
            data: self.data.view_mut(),
            name: self.name.clone(),
        }
    }

    /// Copy data and mesh from `other`, which must have the same data shape
    /// and mesh kinds.
    pub fn copy_from<S2: Data<Elem = A>>(&mut self, other: &GfBase<S2>) -> Result<()> {
        self.require_same_shape(other)?;
        self.mesh.copy_from(&other.mesh)?;
        self.data.assign(&other.data);
        Ok(())
    }

    /// Set every element to zero.
    pub fn zero(&mut self) {
        self.data.fill(A::zero());
    }
}

impl<S: RawDataClone> Clone for GfBase<S> {
    fn clone(&self) -> Self {
        Self {
            mesh: self.mesh.clone(),
            data: self.data.clone(),
            name: self.name.clone(),
        }
    }
}

impl<A, S, S2> PartialEq<GfBase<S2>> for GfBase<S>
where
    A: Scalar,
    S: Data<Elem = A>,
    S2: Data<Elem = A>,
{
    fn eq(&self, other: &GfBase<S2>) -> bool {
        self.mesh == other.mesh && self.data == other.data
    }
}

impl<A: Scalar, S: Data<Elem = A>> fmt::Debug for GfBase<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gf")
            .field("name", &self.name)
            .field("mesh", &self.mesh)
            .field("data", &self.data)
            .finish()
    }
}

impl<A: Scalar, S: Data<Elem = A>> fmt::Display for GfBase<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Green's function '{}' on {} with target shape {:?}",
            self.name,
            self.mesh,
            self.target_shape()
        )
    }
}
