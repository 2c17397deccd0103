//! Evaluation of a container at arbitrary domain points.
//!
//! Kernels are looked up by `(mesh kind, target rank)` in a
//! [`KernelRegistry`] that is built once and only read afterwards.

use std::collections::HashMap;
use std::f64::consts::PI;

use greenfn_mesh::{GfMesh, Mesh, MeshIndex, MeshKind, MeshValue};
use log::debug;
use ndarray::{ArrayD, Axis, Data};

use crate::error::{GfError, Result};
use crate::gf::{GfBase, GfView};
use crate::scalar::Scalar;

/// Numeric kernel evaluating a container at one domain point.
///
/// `point` holds one value per mesh axis. The returned array has the
/// container's target shape. A kernel must not keep the view.
pub trait EvalKernel<A: Scalar> {
    /// Value of `gf` at `point`.
    fn evaluate(&self, gf: &GfView<'_, A>, point: &[MeshValue]) -> Result<ArrayD<A>>;
}

fn single_point<'p>(mesh: &GfMesh, point: &'p [MeshValue]) -> Result<&'p MeshValue> {
    match point {
        [value] => Ok(value),
        _ => Err(GfError::InvalidKey(format!(
            "{mesh} expects one coordinate, got {}",
            point.len()
        ))),
    }
}

fn not_a_point(mesh: &GfMesh, value: &MeshValue) -> GfError {
    GfError::InvalidKey(format!("{value:?} is not a point of {mesh}"))
}

/// Linear interpolation between neighbouring points of a uniform grid.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearInterpolation;

impl LinearInterpolation {
    /// `(first value, spacing, number of points)` of the grid.
    fn grid(mesh: &GfMesh) -> Option<(f64, f64, usize)> {
        match mesh {
            GfMesh::ImTime(m) => Some((0.0, m.delta(), m.n_tau())),
            GfMesh::ReFreq(m) => Some((m.omega_min(), m.delta(), m.n_w())),
            GfMesh::ReTime(m) => Some((m.t_min(), m.delta(), m.n_t())),
            GfMesh::ImFreq(_)
            | GfMesh::Legendre(_)
            | GfMesh::BrZone(_)
            | GfMesh::CycLat(_)
            | GfMesh::Product(_) => None,
        }
    }
}

impl<A: Scalar> EvalKernel<A> for LinearInterpolation {
    fn evaluate(&self, gf: &GfView<'_, A>, point: &[MeshValue]) -> Result<ArrayD<A>> {
        let mesh = gf.mesh();
        let value = single_point(mesh, point)?;
        let x = value.as_real().ok_or_else(|| not_a_point(mesh, value))?;
        let (start, delta, n) = Self::grid(mesh)
            .ok_or_else(|| GfError::NotSupported(format!("linear interpolation on {mesh}")))?;

        let s = (x - start) / delta;
        let last = (n - 1) as f64;
        let eps = 1e-12 * last.max(1.0);
        if !(s >= -eps && s <= last + eps) {
            return Err(GfError::OutOfDomain(format!("{x} on {mesh}")));
        }
        let s = s.clamp(0.0, last);
        let i = (s.floor() as usize).min(n.saturating_sub(2));
        let w = A::from_f64(s - i as f64);

        let data = gf.data();
        let lo = data.index_axis(Axis(0), i);
        let hi = data.index_axis(Axis(0), (i + 1).min(n - 1));
        Ok(ndarray::Zip::from(&lo)
            .and(&hi)
            .map_collect(|&a, &b| a + w * (b - a)))
    }
}

/// Exact lookup on a Matsubara mesh.
///
/// The point is either the Matsubara index `Int(n)` or the frequency
/// `Complex(iω_n)` itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct MatsubaraLookup;

impl<A: Scalar> EvalKernel<A> for MatsubaraLookup {
    fn evaluate(&self, gf: &GfView<'_, A>, point: &[MeshValue]) -> Result<ArrayD<A>> {
        let GfMesh::ImFreq(mesh) = gf.mesh() else {
            return Err(GfError::NotSupported(format!(
                "Matsubara lookup on {}",
                gf.mesh()
            )));
        };
        let value = single_point(gf.mesh(), point)?;
        let n = match *value {
            MeshValue::Int(n) => n,
            MeshValue::Complex(z) => {
                let offset = Mesh::statistic(mesh).map_or(0, |s| s.offset()) as f64;
                ((z.im * mesh.beta() / PI - offset) / 2.0).round() as i64
            }
            MeshValue::Real(_) | MeshValue::Vector(_) => {
                return Err(not_a_point(gf.mesh(), value));
            }
        };
        let p = mesh.to_data_index(&MeshIndex::Int(n))?;
        Ok(gf.data().index_axis(Axis(0), p).to_owned())
    }
}

/// Nearest-site lookup on a periodic lattice.
#[derive(Debug, Clone, Copy, Default)]
pub struct PeriodicLookup;

impl<A: Scalar> EvalKernel<A> for PeriodicLookup {
    fn evaluate(&self, gf: &GfView<'_, A>, point: &[MeshValue]) -> Result<ArrayD<A>> {
        let GfMesh::CycLat(mesh) = gf.mesh() else {
            return Err(GfError::NotSupported(format!(
                "periodic lookup on {}",
                gf.mesh()
            )));
        };
        let value = single_point(gf.mesh(), point)?;
        let r = value
            .as_vector()
            .ok_or_else(|| not_a_point(gf.mesh(), value))?;
        let p = mesh.to_data_index(&mesh.closest_index(r)?)?;
        Ok(gf.data().index_axis(Axis(0), p).to_owned())
    }
}

/// Lookup table from `(mesh kind, target rank)` to evaluation kernel.
pub struct KernelRegistry<A: Scalar> {
    kernels: HashMap<(MeshKind, usize), Box<dyn EvalKernel<A>>>,
}

impl<A: Scalar> KernelRegistry<A> {
    /// Empty registry.
    pub fn new() -> Self {
        Self {
            kernels: HashMap::new(),
        }
    }

    /// Registry with the built-in kernels for target ranks 0, 1 and 2.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for rank in 0..=2 {
            for kind in [MeshKind::ImTime, MeshKind::ReFreq, MeshKind::ReTime] {
                registry.register(kind, rank, LinearInterpolation);
            }
            registry.register(MeshKind::ImFreq, rank, MatsubaraLookup);
            registry.register(MeshKind::CycLat, rank, PeriodicLookup);
        }
        registry
    }

    /// Add or replace the kernel for `(kind, target_rank)`.
    pub fn register(
        &mut self,
        kind: MeshKind,
        target_rank: usize,
        kernel: impl EvalKernel<A> + 'static,
    ) {
        debug!("registering evaluation kernel for {kind} with target rank {target_rank}");
        self.kernels.insert((kind, target_rank), Box::new(kernel));
    }

    /// Kernel for `(kind, target_rank)`, if any.
    pub fn get(&self, kind: MeshKind, target_rank: usize) -> Option<&dyn EvalKernel<A>> {
        self.kernels.get(&(kind, target_rank)).map(|k| k.as_ref())
    }

    /// Number of registered kernels.
    pub fn len(&self) -> usize {
        self.kernels.len()
    }

    /// Whether no kernel is registered.
    pub fn is_empty(&self) -> bool {
        self.kernels.is_empty()
    }
}

impl<A: Scalar> Default for KernelRegistry<A> {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl<A: Scalar, S: Data<Elem = A>> GfBase<S> {
    /// Value at an arbitrary domain point, computed by the kernel
    /// registered for this mesh kind and target rank.
    pub fn evaluate(&self, registry: &KernelRegistry<A>, point: &[MeshValue]) -> Result<ArrayD<A>> {
        let kind = self.mesh.kind();
        let kernel = registry.get(kind, self.target_rank()).ok_or_else(|| {
            GfError::NotSupported(format!(
                "no evaluation kernel for {kind} with target rank {}",
                self.target_rank()
            ))
        })?;
        kernel.evaluate(&self.view(), point)
    }
}
