//! Point access and slicing of Green's functions.

use std::ops::Range;

use greenfn_mesh::{GfMesh, MeshIndex, MeshProduct};
use ndarray::{ArrayBase, ArrayD, ArrayViewMutD, Axis, Data, DataMut, IxDyn, Slice};
use num_complex::Complex64;

use crate::error::{GfError, Result};
use crate::gf::{GfBase, GfView, GfViewMut};
use crate::lazy::LazyExpr;
use crate::scalar::Scalar;

/// Selection along one mesh axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MeshSelector {
    /// Domain index, e.g. the Matsubara index `n`
    Index(MeshIndex),
    /// Dense position along the axis
    Linear(usize),
    /// Keep the whole axis
    All,
}

impl From<MeshIndex> for MeshSelector {
    fn from(index: MeshIndex) -> Self {
        MeshSelector::Index(index)
    }
}

/// Selection along one target axis.
#[derive(Debug, Clone, PartialEq)]
pub enum TargetSelector {
    /// Single target index; removes the axis
    Index(usize),
    /// Sub-range; keeps the axis
    Range(Range<usize>),
    /// Keep the whole axis
    All,
}

/// Key for [`GfBase::get`] and [`GfBase::set`].
#[derive(Debug, Clone, PartialEq)]
pub enum GfKey {
    /// The whole container
    All,
    /// One selector per mesh axis. Selecting a point on every axis addresses
    /// the target-space value at that point.
    Mesh(Vec<MeshSelector>),
    /// One selector per target axis; yields a view on the same mesh.
    Target(Vec<TargetSelector>),
}

impl GfKey {
    /// Key for the point with integer domain index `n` of a single-axis mesh.
    pub fn point(n: i64) -> Self {
        GfKey::Mesh(vec![MeshSelector::Index(MeshIndex::Int(n))])
    }

    /// Key for one point of a product mesh.
    pub fn points(indices: &[MeshIndex]) -> Self {
        GfKey::Mesh(indices.iter().copied().map(MeshSelector::Index).collect())
    }

    /// Key for a target-space element or block on every mesh point.
    pub fn target(selectors: impl IntoIterator<Item = TargetSelector>) -> Self {
        GfKey::Target(selectors.into_iter().collect())
    }

    /// Whether the key keeps every axis of a container with `mesh_rank` mesh
    /// axes and `target_rank` target axes whole.
    pub fn covers_all(&self, mesh_rank: usize, target_rank: usize) -> bool {
        match self {
            GfKey::All => true,
            GfKey::Mesh(selectors) => {
                selectors.len() == mesh_rank && selectors.iter().all(|s| *s == MeshSelector::All)
            }
            GfKey::Target(selectors) => {
                selectors.len() == target_rank
                    && selectors.iter().all(|s| *s == TargetSelector::All)
            }
        }
    }
}

/// Result of [`GfBase::get`].
#[derive(Debug)]
pub enum GfItem<'a, A: Scalar> {
    /// Target-space value at a mesh point
    Value(ArrayD<A>),
    /// Read-only sub-container
    View(GfView<'a, A>),
}

impl<'a, A: Scalar> GfItem<'a, A> {
    /// The point value; fails for a view.
    pub fn into_value(self) -> Result<ArrayD<A>> {
        match self {
            GfItem::Value(v) => Ok(v),
            GfItem::View(_) => Err(GfError::InvalidKey(
                "key selects a sub-container, not a value".to_string(),
            )),
        }
    }

    /// The view; fails for a point value.
    pub fn into_view(self) -> Result<GfView<'a, A>> {
        match self {
            GfItem::View(v) => Ok(v),
            GfItem::Value(_) => Err(GfError::InvalidKey(
                "key selects a value, not a sub-container".to_string(),
            )),
        }
    }
}

/// Right-hand side of [`GfBase::set`].
pub enum GfValue<'a, A: Scalar> {
    /// Target-space array for a single mesh point
    Array(ArrayD<A>),
    /// Scalar
    Scalar(A),
    /// Lazy expression
    Expr(LazyExpr<'a, A>),
}

impl<'a, A: Scalar> GfValue<'a, A> {
    fn into_expr(self) -> Result<LazyExpr<'a, A>> {
        match self {
            GfValue::Scalar(s) => Ok(LazyExpr::scalar(s)),
            GfValue::Expr(e) => Ok(e),
            GfValue::Array(_) => Err(GfError::InvalidKey(
                "an array can only be assigned to a single mesh point".to_string(),
            )),
        }
    }
}

impl<'a, A: Scalar> From<LazyExpr<'a, A>> for GfValue<'a, A> {
    fn from(expr: LazyExpr<'a, A>) -> Self {
        GfValue::Expr(expr)
    }
}

impl<'a, A: Scalar> From<ArrayD<A>> for GfValue<'a, A> {
    fn from(value: ArrayD<A>) -> Self {
        GfValue::Array(value)
    }
}

impl<'a> From<f64> for GfValue<'a, f64> {
    fn from(x: f64) -> Self {
        GfValue::Scalar(x)
    }
}

impl<'a> From<f64> for GfValue<'a, Complex64> {
    fn from(x: f64) -> Self {
        GfValue::Scalar(Complex64::new(x, 0.0))
    }
}

impl<'a> From<Complex64> for GfValue<'a, Complex64> {
    fn from(z: Complex64) -> Self {
        GfValue::Scalar(z)
    }
}

/// Dense position on each mesh axis, `None` for axes kept whole.
fn resolve_mesh_selectors(mesh: &GfMesh, selectors: &[MeshSelector]) -> Result<Vec<Option<usize>>> {
    let components = mesh.components();
    if selectors.len() != components.len() {
        return Err(GfError::InvalidKey(format!(
            "expected {} mesh selectors, got {}",
            components.len(),
            selectors.len()
        )));
    }
    components
        .iter()
        .zip(selectors)
        .map(|(component, selector)| match *selector {
            MeshSelector::Index(index) => Ok(Some(component.to_data_index(&index)?)),
            MeshSelector::Linear(i) if i < component.len() => Ok(Some(i)),
            MeshSelector::Linear(i) => Err(GfError::InvalidKey(format!(
                "position {i} is out of bounds for mesh of size {}",
                component.len()
            ))),
            MeshSelector::All => Ok(None),
        })
        .collect()
}

/// Mesh left after fixing the selected axes.
fn remaining_mesh(mesh: &GfMesh, picks: &[Option<usize>]) -> Result<GfMesh> {
    let mut kept: Vec<GfMesh> = mesh
        .components()
        .iter()
        .zip(picks)
        .filter(|(_, pick)| pick.is_none())
        .map(|(component, _)| component.clone())
        .collect();
    match kept.len() {
        0 => Err(GfError::InvalidKey("no mesh axis left".to_string())),
        1 => Ok(kept.remove(0)),
        _ => Ok(MeshProduct::new(kept)?.into()),
    }
}

fn pick_mesh_axes<S: Data>(data: ArrayBase<S, IxDyn>, picks: &[Option<usize>]) -> ArrayBase<S, IxDyn> {
    picks
        .iter()
        .enumerate()
        .rev()
        .fold(data, |acc, (axis, pick)| match *pick {
            Some(i) => acc.index_axis_move(Axis(axis), i),
            None => acc,
        })
}

fn check_target_selectors(target_shape: &[usize], selectors: &[TargetSelector]) -> Result<()> {
    if selectors.len() != target_shape.len() {
        return Err(GfError::InvalidKey(format!(
            "expected {} target selectors, got {}",
            target_shape.len(),
            selectors.len()
        )));
    }
    for (&extent, selector) in target_shape.iter().zip(selectors) {
        let valid = match selector {
            TargetSelector::Index(i) => *i < extent,
            TargetSelector::Range(r) => r.start < r.end && r.end <= extent,
            TargetSelector::All => true,
        };
        if !valid {
            return Err(GfError::InvalidKey(format!(
                "{selector:?} does not fit target extent {extent}"
            )));
        }
    }
    Ok(())
}

/// Apply validated target selectors to the trailing axes.
fn slice_target_axes<S: Data>(
    mut data: ArrayBase<S, IxDyn>,
    rank: usize,
    selectors: &[TargetSelector],
) -> ArrayBase<S, IxDyn> {
    for (k, selector) in selectors.iter().enumerate() {
        if let TargetSelector::Range(r) = selector {
            data.slice_axis_inplace(Axis(rank + k), Slice::from(r.clone()));
        }
    }
    selectors
        .iter()
        .enumerate()
        .rev()
        .fold(data, |acc, (k, selector)| match selector {
            TargetSelector::Index(i) => acc.index_axis_move(Axis(rank + k), *i),
            _ => acc,
        })
}

impl<A: Scalar, S: Data<Elem = A>> GfBase<S> {
    /// Read a value or a sub-container.
    ///
    /// A mesh key fixing every axis returns the target-space value at that
    /// point. Mesh keys keeping some axes and target keys return views.
    pub fn get(&self, key: &GfKey) -> Result<GfItem<'_, A>> {
        match key {
            GfKey::All => Ok(GfItem::View(self.view())),
            GfKey::Mesh(selectors) => {
                let picks = resolve_mesh_selectors(&self.mesh, selectors)?;
                let data = pick_mesh_axes(self.data.view(), &picks);
                if picks.iter().all(Option::is_some) {
                    Ok(GfItem::Value(data.to_owned()))
                } else {
                    let mesh = remaining_mesh(&self.mesh, &picks)?;
                    Ok(GfItem::View(GfBase::from_parts(mesh, data, self.name.clone())?))
                }
            }
            GfKey::Target(selectors) => {
                check_target_selectors(self.target_shape(), selectors)?;
                let data = slice_target_axes(self.data.view(), self.rank(), selectors);
                Ok(GfItem::View(GfBase::from_parts(
                    self.mesh.clone(),
                    data,
                    self.name.clone(),
                )?))
            }
        }
    }

    /// Target-space value at a mesh point given by domain indices.
    pub fn at(&self, indices: &[MeshIndex]) -> Result<ArrayD<A>> {
        self.get(&GfKey::points(indices))?.into_value()
    }

    /// Target-space value at dense positions along each mesh axis.
    pub fn at_linear(&self, positions: &[usize]) -> Result<ArrayD<A>> {
        let selectors = positions.iter().map(|&i| MeshSelector::Linear(i)).collect();
        self.get(&GfKey::Mesh(selectors))?.into_value()
    }
}

impl<A: Scalar, S: DataMut<Elem = A>> GfBase<S> {
    /// Mutable sub-container for a slicing key.
    pub fn get_mut(&mut self, key: &GfKey) -> Result<GfViewMut<'_, A>> {
        match key {
            GfKey::All => Ok(self.view_mut()),
            GfKey::Mesh(selectors) => {
                let picks = resolve_mesh_selectors(&self.mesh, selectors)?;
                if picks.iter().all(Option::is_some) {
                    return Err(GfError::InvalidKey(
                        "key selects a single point; use at_mut or set".to_string(),
                    ));
                }
                let mesh = remaining_mesh(&self.mesh, &picks)?;
                let name = self.name.clone();
                let data = pick_mesh_axes(self.data.view_mut(), &picks);
                GfBase::from_parts(mesh, data, name)
            }
            GfKey::Target(selectors) => {
                check_target_selectors(self.target_shape(), selectors)?;
                let (mesh, name, rank) = (self.mesh.clone(), self.name.clone(), self.rank());
                let data = slice_target_axes(self.data.view_mut(), rank, selectors);
                GfBase::from_parts(mesh, data, name)
            }
        }
    }

    /// Mutable target-space slot at a mesh point.
    pub fn at_mut(&mut self, selectors: &[MeshSelector]) -> Result<ArrayViewMutD<'_, A>> {
        let picks = resolve_mesh_selectors(&self.mesh, selectors)?;
        if picks.iter().any(Option::is_none) {
            return Err(GfError::InvalidKey(
                "at_mut needs a point on every mesh axis".to_string(),
            ));
        }
        Ok(pick_mesh_axes(self.data.view_mut(), &picks))
    }

    /// Write through a key.
    ///
    /// A key covering the whole container is the same as [`GfBase::assign`]:
    /// a scalar becomes `scalar · I` on matrix targets. On a point key or a
    /// partial slice a scalar fills every selected element. A point key also
    /// accepts an array of the target shape; partial slices accept a lazy
    /// expression, evaluated with the selected sub-container as context.
    pub fn set<'v>(&mut self, key: &GfKey, value: impl Into<GfValue<'v, A>>) -> Result<()> {
        let value = value.into();
        if key.covers_all(self.mesh.components().len(), self.target_rank()) {
            return self.assign(value.into_expr()?);
        }
        if let GfKey::Mesh(selectors) = key {
            let picks = resolve_mesh_selectors(&self.mesh, selectors)?;
            if picks.iter().all(Option::is_some) {
                let mut slot = pick_mesh_axes(self.data.view_mut(), &picks);
                return match value {
                    GfValue::Array(array) => {
                        if array.shape() != slot.shape() {
                            return Err(GfError::ShapeMismatch {
                                expected: slot.shape().to_vec(),
                                actual: array.shape().to_vec(),
                            });
                        }
                        slot.assign(&array);
                        Ok(())
                    }
                    GfValue::Scalar(s) => {
                        slot.fill(s);
                        Ok(())
                    }
                    GfValue::Expr(_) => Err(GfError::InvalidKey(
                        "a lazy expression needs a sub-container, not a point".to_string(),
                    )),
                };
            }
        }
        match value {
            GfValue::Scalar(s) => {
                self.get_mut(key)?.data_mut().fill(s);
                Ok(())
            }
            other => {
                let expr = other.into_expr()?;
                self.get_mut(key)?.assign(expr)
            }
        }
    }
}
