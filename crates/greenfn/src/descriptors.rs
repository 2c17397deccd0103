//! Descriptors: symbolic quantities that fill a container in place once the
//! target mesh is known.

use greenfn_mesh::{GfMesh, MeshValue};
use ndarray::{Array2, Axis};

use crate::error::{GfError, Result};
use crate::gf::Gf;
use crate::lazy::LazyExpr;
use crate::scalar::Scalar;

/// A transform from an abstract quantity to concrete container data.
///
/// `apply` receives a working copy of the evaluation target and overwrites
/// its data. Implementations must not keep a reference to the container.
pub trait Descriptor<A: Scalar> {
    /// Name shown when printing expressions.
    fn name(&self) -> &str;

    /// Overwrite the data of `gf`.
    fn apply(&self, gf: &mut Gf<A>) -> Result<()>;
}

fn require_frequency_mesh(descriptor: &str, mesh: &GfMesh) -> Result<()> {
    match mesh {
        GfMesh::ImFreq(_) | GfMesh::ReFreq(_) => Ok(()),
        GfMesh::ImTime(_)
        | GfMesh::ReTime(_)
        | GfMesh::Legendre(_)
        | GfMesh::BrZone(_)
        | GfMesh::CycLat(_)
        | GfMesh::Product(_) => Err(GfError::EvaluationContext(format!(
            "{descriptor} is only defined on frequency meshes, got {}",
            mesh.kind()
        ))),
    }
}

fn square_size<A: Scalar>(gf: &Gf<A>) -> Result<usize> {
    match gf.target_shape() {
        [rows, cols] if rows == cols => Ok(*rows),
        shape => Err(GfError::ShapeMismatch {
            expected: vec![shape[0], shape[0]],
            actual: shape.to_vec(),
        }),
    }
}

/// Point values of a single (non-product) mesh.
fn mesh_values(descriptor: &str, mesh: &GfMesh) -> Result<Vec<MeshValue>> {
    mesh.as_mesh().map(|m| m.values()).ok_or_else(|| {
        GfError::EvaluationContext(format!("{descriptor} cannot be applied on {mesh}"))
    })
}

fn to_scalar<A: Scalar>(value: &MeshValue) -> Result<A> {
    match value {
        MeshValue::Complex(z) => A::from_complex(*z).ok_or_else(|| {
            GfError::DtypeMismatch(format!("cannot store {z} in a {} container", A::DTYPE))
        }),
        other => other.as_real().map(A::from_f64).ok_or_else(|| {
            GfError::DtypeMismatch(format!("{other:?} is not a scalar mesh value"))
        }),
    }
}

/// Write `values[p]` (scalar targets) or `values[p] · I` (square matrix
/// targets) at every mesh point `p`.
fn fill_diagonal<A: Scalar>(gf: &mut Gf<A>, values: &[A], descriptor: &'static str) -> Result<()> {
    match gf.target_rank() {
        0 => {
            for (x, &v) in gf.data_mut().iter_mut().zip(values) {
                *x = v;
            }
            Ok(())
        }
        2 => {
            let n = square_size(gf)?;
            let mut data = gf.data_mut();
            for (mut point, &v) in data.outer_iter_mut().zip(values) {
                point.fill(A::zero());
                for i in 0..n {
                    point[[i, i]] = v;
                }
            }
            Ok(())
        }
        r => Err(GfError::UnsupportedRank {
            operation: descriptor,
            left: r,
            right: r,
        }),
    }
}

/// Constant value on a frequency mesh: a scalar (times the identity for
/// matrix targets) or an explicit matrix.
#[derive(Debug, Clone, PartialEq)]
pub enum Const<A: Scalar> {
    /// Scalar, times the identity on matrix targets
    Scalar(A),
    /// Explicit target-space matrix
    Matrix(Array2<A>),
}

impl<A: Scalar> Const<A> {
    /// Scalar constant.
    pub fn new(value: A) -> Self {
        Const::Scalar(value)
    }

    /// Matrix constant.
    pub fn matrix(value: Array2<A>) -> Self {
        Const::Matrix(value)
    }
}

impl<A: Scalar> Descriptor<A> for Const<A> {
    fn name(&self) -> &str {
        "Const"
    }

    fn apply(&self, gf: &mut Gf<A>) -> Result<()> {
        require_frequency_mesh("Const", gf.mesh())?;
        match self {
            Const::Scalar(c) => {
                let npts = gf.mesh().len();
                fill_diagonal(gf, &vec![*c; npts], "Const")
            }
            Const::Matrix(m) => {
                if gf.target_shape() != m.shape() {
                    return Err(GfError::ShapeMismatch {
                        expected: gf.target_shape().to_vec(),
                        actual: m.shape().to_vec(),
                    });
                }
                gf.data_mut().assign(m);
                Ok(())
            }
        }
    }
}

/// The frequency itself: `ω` on real-frequency meshes and `iω_n` on
/// Matsubara meshes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Omega {
    name: &'static str,
}

impl Omega {
    /// Real frequency `ω`.
    pub const OMEGA: Omega = Omega { name: "Omega" };
    /// Matsubara frequency `iω_n`.
    pub const IOMEGA_N: Omega = Omega { name: "iOmega_n" };
}

impl<A: Scalar> Descriptor<A> for Omega {
    fn name(&self) -> &str {
        self.name
    }

    fn apply(&self, gf: &mut Gf<A>) -> Result<()> {
        require_frequency_mesh(self.name, gf.mesh())?;
        let values = mesh_values(self.name, gf.mesh())?
            .iter()
            .map(to_scalar)
            .collect::<Result<Vec<A>>>()?;
        fill_diagonal(gf, &values, "Omega")
    }
}

/// `Omega` as an expression leaf.
pub fn omega<'a, A: Scalar>() -> LazyExpr<'a, A> {
    LazyExpr::descriptor(Omega::OMEGA)
}

/// `iOmega_n` as an expression leaf.
pub fn iomega_n<'a, A: Scalar>() -> LazyExpr<'a, A> {
    LazyExpr::descriptor(Omega::IOMEGA_N)
}

/// Constant as an expression leaf.
pub fn constant<'a, A: Scalar>(value: A) -> LazyExpr<'a, A> {
    LazyExpr::descriptor(Const::new(value))
}

type PointFn<'f, T> = Box<dyn Fn(&MeshValue) -> T + 'f>;

enum FunctionBody<'f, A> {
    Scalar(PointFn<'f, A>),
    Matrix(PointFn<'f, Array2<A>>),
}

/// Container filled with `f(x)` at every mesh point `x`.
///
/// Works on any single mesh. A scalar result is broadcast over the whole
/// target space; a matrix result must match the target shape.
pub struct Function<'f, A: Scalar> {
    body: FunctionBody<'f, A>,
}

impl<'f, A: Scalar> Function<'f, A> {
    /// Scalar-valued function.
    pub fn new(f: impl Fn(&MeshValue) -> A + 'f) -> Self {
        Self {
            body: FunctionBody::Scalar(Box::new(f)),
        }
    }

    /// Matrix-valued function.
    pub fn matrix(f: impl Fn(&MeshValue) -> Array2<A> + 'f) -> Self {
        Self {
            body: FunctionBody::Matrix(Box::new(f)),
        }
    }
}

impl<'f, A: Scalar> Descriptor<A> for Function<'f, A> {
    fn name(&self) -> &str {
        "Function"
    }

    fn apply(&self, gf: &mut Gf<A>) -> Result<()> {
        let values = mesh_values("Function", gf.mesh())?;
        let target_shape = gf.target_shape().to_vec();
        let mut data = gf.data_mut();
        for (mut point, x) in data.axis_iter_mut(Axis(0)).zip(&values) {
            match &self.body {
                FunctionBody::Scalar(f) => point.fill(f(x)),
                FunctionBody::Matrix(f) => {
                    let m = f(x);
                    if m.shape() != target_shape.as_slice() {
                        return Err(GfError::ShapeMismatch {
                            expected: target_shape,
                            actual: m.shape().to_vec(),
                        });
                    }
                    point.assign(&m);
                }
            }
        }
        Ok(())
    }
}

impl<'f, A: Scalar> From<Function<'f, A>> for LazyExpr<'f, A> {
    fn from(f: Function<'f, A>) -> Self {
        LazyExpr::descriptor(f)
    }
}

impl<'a, A: Scalar> From<Const<A>> for LazyExpr<'a, A> {
    fn from(c: Const<A>) -> Self {
        LazyExpr::descriptor(c)
    }
}
