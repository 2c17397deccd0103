//! Arithmetic and unary transforms of Green's functions.
//!
//! Addition and subtraction require equal meshes and target shapes.
//! Multiplication combines meshes with [`GfMesh::combine_mul`] and, for
//! rank-2 targets, takes the matrix product at every mesh point. Adding a
//! scalar to a matrix-valued function adds `scalar · I`.

use greenfn_mesh::GfMesh;
use ndarray::{Array2, ArrayD, ArrayView2, ArrayViewD, Axis, Data, DataMut, Zip};
use num_complex::Complex64;

use crate::error::{GfError, Result};
use crate::gf::{Gf, GfBase, GfView};
use crate::linalg::{invert_matrix, invert_points, matmul_points, sandwich_points};
use crate::scalar::Scalar;

/// Right-hand operand of a binary operation on a Green's function.
#[derive(Debug)]
pub enum Operand<'a, A: Scalar> {
    /// Another container, combined pointwise
    Gf(GfView<'a, A>),
    /// Scalar; on matrix targets it acts as `scalar · I` for `+` and `-`
    Scalar(A),
    /// Constant target-space matrix applied at every mesh point
    Matrix(ArrayView2<'a, A>),
}

impl<'a, A: Scalar, S: Data<Elem = A>> From<&'a GfBase<S>> for Operand<'a, A> {
    fn from(gf: &'a GfBase<S>) -> Self {
        Operand::Gf(gf.view())
    }
}

impl<'a, A: Scalar> From<ArrayView2<'a, A>> for Operand<'a, A> {
    fn from(m: ArrayView2<'a, A>) -> Self {
        Operand::Matrix(m)
    }
}

impl<'a, A: Scalar> From<&'a Array2<A>> for Operand<'a, A> {
    fn from(m: &'a Array2<A>) -> Self {
        Operand::Matrix(m.view())
    }
}

impl<'a> From<f64> for Operand<'a, f64> {
    fn from(x: f64) -> Self {
        Operand::Scalar(x)
    }
}

impl<'a> From<f64> for Operand<'a, Complex64> {
    fn from(x: f64) -> Self {
        Operand::Scalar(Complex64::new(x, 0.0))
    }
}

impl<'a> From<Complex64> for Operand<'a, Complex64> {
    fn from(z: Complex64) -> Self {
        Operand::Scalar(z)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Accumulate {
    Add,
    Sub,
}

/// Pointwise product of two data arrays on a combined mesh.
fn multiply_data<A: Scalar>(
    l: ArrayViewD<'_, A>,
    l_target: usize,
    r: ArrayViewD<'_, A>,
    r_target: usize,
    rank: usize,
) -> Result<ArrayD<A>> {
    if l.shape()[..rank] != r.shape()[..rank] {
        return Err(GfError::ShapeMismatch {
            expected: l.shape()[..rank].to_vec(),
            actual: r.shape()[..rank].to_vec(),
        });
    }
    match (l_target, r_target) {
        (2, 2) => matmul_points(l, r, rank),
        (0, 0) => Ok(Zip::from(&l).and(&r).map_collect(|&x, &y| x * y)),
        (2, 0) => {
            let rb = r.insert_axis(Axis(rank)).insert_axis(Axis(rank + 1));
            Ok(Zip::from(&l).and_broadcast(&rb).map_collect(|&x, &y| x * y))
        }
        (0, 2) => {
            let lb = l.insert_axis(Axis(rank)).insert_axis(Axis(rank + 1));
            Ok(Zip::from(&r).and_broadcast(&lb).map_collect(|&y, &x| x * y))
        }
        (left, right) => Err(GfError::UnsupportedRank {
            operation: "multiplication",
            left,
            right,
        }),
    }
}

/// `d[p] · m` at every mesh point.
fn multiply_matrix<A: Scalar>(
    data: ArrayViewD<'_, A>,
    target_rank: usize,
    m: ArrayView2<'_, A>,
    rank: usize,
) -> Result<ArrayD<A>> {
    if target_rank != 2 {
        return Err(GfError::UnsupportedRank {
            operation: "matrix multiplication",
            left: target_rank,
            right: 2,
        });
    }
    let identity = Array2::<A>::eye(data.shape()[rank]);
    sandwich_points(identity.view(), data, m, rank)
}

impl<A: Scalar, S: DataMut<Elem = A>> GfBase<S> {
    fn accumulate(&mut self, rhs: Operand<'_, A>, mode: Accumulate) -> Result<()> {
        let sign = match mode {
            Accumulate::Add => A::one(),
            Accumulate::Sub => -A::one(),
        };
        match rhs {
            Operand::Gf(g) => {
                self.require_same_mesh(&g)?;
                self.require_same_shape(&g)?;
                match mode {
                    Accumulate::Add => self.data.zip_mut_with(&g.data, |a, &b| *a += b),
                    Accumulate::Sub => self.data.zip_mut_with(&g.data, |a, &b| *a -= b),
                }
            }
            Operand::Scalar(s) => self.add_scalar_in_place(sign * s)?,
            Operand::Matrix(m) => {
                if self.target_shape() != m.shape() {
                    return Err(GfError::ShapeMismatch {
                        expected: self.target_shape().to_vec(),
                        actual: m.shape().to_vec(),
                    });
                }
                self.data.zip_mut_with(&m, |a, &b| *a += sign * b);
            }
        }
        Ok(())
    }

    /// Add `s · I` for square matrix targets, `s` elementwise otherwise.
    fn add_scalar_in_place(&mut self, s: A) -> Result<()> {
        if self.target_rank() != 2 {
            self.data.mapv_inplace(|x| x + s);
            return Ok(());
        }
        let rank = self.rank();
        let (rows, cols) = (self.target_shape()[0], self.target_shape()[1]);
        if rows != cols {
            return Err(GfError::ShapeMismatch {
                expected: vec![rows, rows],
                actual: vec![rows, cols],
            });
        }
        for i in 0..rows {
            let mut diagonal = self
                .data
                .view_mut()
                .index_axis_move(Axis(rank + 1), i)
                .index_axis_move(Axis(rank), i);
            diagonal.mapv_inplace(|x| x + s);
        }
        Ok(())
    }

    /// In-place sum; a container operand must live on an equal mesh.
    pub fn add_assign<'b>(&mut self, rhs: impl Into<Operand<'b, A>>) -> Result<()> {
        self.accumulate(rhs.into(), Accumulate::Add)
    }

    /// In-place difference.
    pub fn sub_assign<'b>(&mut self, rhs: impl Into<Operand<'b, A>>) -> Result<()> {
        self.accumulate(rhs.into(), Accumulate::Sub)
    }

    /// In-place product; the combined mesh must equal this container's mesh.
    pub fn mul_assign<'b>(&mut self, rhs: impl Into<Operand<'b, A>>) -> Result<()> {
        let product = match rhs.into() {
            Operand::Scalar(s) => {
                self.data.mapv_inplace(|x| x * s);
                return Ok(());
            }
            Operand::Gf(g) => {
                let mesh = self.mesh.combine_mul(&g.mesh)?;
                if mesh != self.mesh {
                    return Err(GfError::MeshMismatch {
                        left: self.mesh.to_string(),
                        right: mesh.to_string(),
                    });
                }
                multiply_data(
                    self.data.view(),
                    self.target_rank(),
                    g.data.view(),
                    g.target_rank(),
                    self.rank(),
                )?
            }
            Operand::Matrix(m) => {
                multiply_matrix(self.data.view(), self.target_rank(), m, self.rank())?
            }
        };
        if product.shape() != self.data.shape() {
            return Err(GfError::ShapeMismatch {
                expected: self.data.shape().to_vec(),
                actual: product.shape().to_vec(),
            });
        }
        self.data.assign(&product);
        Ok(())
    }

    /// In-place `self · rhs⁻¹`.
    pub fn div_assign<'b>(&mut self, rhs: impl Into<Operand<'b, A>>) -> Result<()> {
        match rhs.into() {
            Operand::Scalar(s) => {
                self.data.mapv_inplace(|x| x / s);
                Ok(())
            }
            Operand::Gf(g) => {
                let inverse = g.inverse()?;
                self.mul_assign(&inverse)
            }
            Operand::Matrix(m) => {
                let inverse = invert_matrix(m, 0)?;
                self.mul_assign(inverse.view())
            }
        }
    }

    /// Invert in place: reciprocal for scalar targets, matrix inverse at
    /// every point for square matrix targets.
    pub fn invert(&mut self) -> Result<()> {
        match self.target_rank() {
            0 => {
                self.data.mapv_inplace(|x| A::one() / x);
                Ok(())
            }
            2 => {
                let inverted = invert_points(self.data.view(), self.rank())?;
                self.data.assign(&inverted);
                Ok(())
            }
            r => Err(GfError::UnsupportedRank {
                operation: "inversion",
                left: r,
                right: r,
            }),
        }
    }

    /// Set every point to `left · g · right`; `g` must live on the same mesh.
    pub fn from_l_g_r<S2: Data<Elem = A>>(
        &mut self,
        left: ArrayView2<'_, A>,
        g: &GfBase<S2>,
        right: ArrayView2<'_, A>,
    ) -> Result<()> {
        self.require_same_mesh(g)?;
        if g.target_rank() != 2 || self.target_rank() != 2 {
            return Err(GfError::UnsupportedRank {
                operation: "from_l_g_r",
                left: self.target_rank(),
                right: g.target_rank(),
            });
        }
        let value = sandwich_points(left, g.data.view(), right, g.rank())?;
        if value.shape() != self.data.shape() {
            return Err(GfError::ShapeMismatch {
                expected: self.data.shape().to_vec(),
                actual: value.shape().to_vec(),
            });
        }
        self.data.assign(&value);
        Ok(())
    }
}

impl<A: Scalar, S: Data<Elem = A>> GfBase<S> {
    /// Sum as a new container.
    pub fn add<'b>(&self, rhs: impl Into<Operand<'b, A>>) -> Result<Gf<A>> {
        let mut out = self.copy();
        out.add_assign(rhs)?;
        Ok(out)
    }

    /// Difference as a new container.
    pub fn sub<'b>(&self, rhs: impl Into<Operand<'b, A>>) -> Result<Gf<A>> {
        let mut out = self.copy();
        out.sub_assign(rhs)?;
        Ok(out)
    }

    /// Product on the combined mesh (see [`GfMesh::combine_mul`]).
    pub fn mul<'b>(&self, rhs: impl Into<Operand<'b, A>>) -> Result<Gf<A>> {
        match rhs.into() {
            Operand::Gf(g) => {
                let mesh: GfMesh = self.mesh.combine_mul(&g.mesh)?;
                let data = multiply_data(
                    self.data.view(),
                    self.target_rank(),
                    g.data.view(),
                    g.target_rank(),
                    self.rank(),
                )?;
                GfBase::from_parts(mesh, data, self.name.clone())
            }
            Operand::Matrix(m) => {
                let data = multiply_matrix(self.data.view(), self.target_rank(), m, self.rank())?;
                GfBase::from_parts(self.mesh.clone(), data, self.name.clone())
            }
            Operand::Scalar(s) => {
                let mut out = self.copy();
                out.mul_assign(Operand::Scalar(s))?;
                Ok(out)
            }
        }
    }

    /// `self · rhs⁻¹` for matrix targets, elementwise quotient for scalar
    /// targets.
    pub fn div<'b>(&self, rhs: impl Into<Operand<'b, A>>) -> Result<Gf<A>> {
        match rhs.into() {
            Operand::Gf(g) => {
                let inverse = g.inverse()?;
                self.mul(&inverse)
            }
            Operand::Matrix(m) => {
                let inverse = invert_matrix(m, 0)?;
                self.mul(inverse.view())
            }
            Operand::Scalar(s) => {
                let mut out = self.copy();
                out.data.mapv_inplace(|x| x / s);
                Ok(out)
            }
        }
    }

    /// `m · self[p]` at every mesh point.
    pub fn left_mul_matrix(&self, m: ArrayView2<'_, A>) -> Result<Gf<A>> {
        if self.target_rank() != 2 {
            return Err(GfError::UnsupportedRank {
                operation: "matrix multiplication",
                left: 2,
                right: self.target_rank(),
            });
        }
        let identity = Array2::<A>::eye(self.target_shape()[1]);
        let data = sandwich_points(m, self.data.view(), identity.view(), self.rank())?;
        GfBase::from_parts(self.mesh.clone(), data, self.name.clone())
    }

    /// `s - self`.
    pub fn rsub_scalar(&self, s: A) -> Result<Gf<A>> {
        let mut out = self.neg();
        out.add_assign(Operand::Scalar(s))?;
        Ok(out)
    }

    /// `s · self⁻¹`.
    pub fn rdiv_scalar(&self, s: A) -> Result<Gf<A>> {
        let mut out = self.inverse()?;
        out.data.mapv_inplace(|x| s * x);
        Ok(out)
    }

    /// Pointwise inverse as a new container.
    pub fn inverse(&self) -> Result<Gf<A>> {
        let mut out = self.copy();
        out.invert()?;
        Ok(out)
    }

    /// Negated copy.
    pub fn neg(&self) -> Gf<A> {
        self.map(|x| -x)
    }

    /// Elementwise complex conjugate.
    pub fn conjugate(&self) -> Gf<A> {
        self.map(Scalar::conjugate)
    }

    /// Swap the two target indices at every point. Only single-axis meshes
    /// with matrix targets are supported.
    pub fn transpose(&self) -> Result<Gf<A>> {
        if self.rank() != 1 || self.target_rank() != 2 {
            return Err(GfError::UnsupportedRank {
                operation: "transpose",
                left: self.target_rank(),
                right: self.target_rank(),
            });
        }
        let mut data = self.data.to_owned();
        data.swap_axes(1, 2);
        GfBase::from_parts(
            self.mesh.clone(),
            data.as_standard_layout().into_owned(),
            self.name.clone(),
        )
    }

    /// Real part as a real-valued container.
    pub fn real(&self) -> Gf<f64> {
        GfBase {
            mesh: self.mesh.clone(),
            data: self.data.mapv(Scalar::real_f64),
            name: self.name.clone(),
        }
    }

    /// Imaginary part as a real-valued container.
    pub fn imag(&self) -> Gf<f64> {
        GfBase {
            mesh: self.mesh.clone(),
            data: self.data.mapv(Scalar::imag_f64),
            name: self.name.clone(),
        }
    }

    fn map(&self, f: impl Fn(A) -> A) -> Gf<A> {
        GfBase {
            mesh: self.mesh.clone(),
            data: self.data.mapv(f),
            name: self.name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use greenfn_mesh::{MeshImFreq, MeshImTime, MeshReFreq, Statistic};
    use ndarray::{arr2, Array, IxDyn};

    fn tau_gf(statistic: Statistic, values: &[f64]) -> Gf<f64> {
        let mesh = MeshImTime::new(1.0, statistic, values.len()).unwrap();
        Gf::from_data(mesh, Array::from_vec(values.to_vec()).into_dyn()).unwrap()
    }

    fn matrix_gf(values: Vec<f64>) -> Gf<f64> {
        let mesh = MeshReFreq::new(-1.0, 1.0, 2).unwrap();
        let data = Array::from_shape_vec(IxDyn(&[2, 2, 2]), values).unwrap();
        Gf::from_data(mesh, data).unwrap()
    }

    #[test]
    fn test_add_scalar_to_matrix_hits_diagonal() {
        let g = matrix_gf(vec![0.0; 8]);
        let h = g.add(2.0).unwrap();
        assert_eq!(
            h.at_linear(&[1]).unwrap(),
            arr2(&[[2.0, 0.0], [0.0, 2.0]]).into_dyn()
        );
        let k = h.sub(1.0).unwrap();
        assert_eq!(k.data()[[0, 0, 0]], 1.0);
        assert_eq!(k.data()[[0, 0, 1]], 0.0);
    }

    #[test]
    fn test_add_requires_same_mesh() {
        let a = tau_gf(Statistic::Fermion, &[1.0, 2.0]);
        let b = tau_gf(Statistic::Boson, &[1.0, 2.0]);
        assert!(matches!(a.add(&b), Err(GfError::MeshMismatch { .. })));
        let c = a.add(&a).unwrap();
        assert_eq!(c.data().as_slice().unwrap(), &[2.0, 4.0]);
    }

    #[test]
    fn test_mul_combines_statistics() {
        let f = tau_gf(Statistic::Fermion, &[1.0, 2.0, 3.0]);
        let product = f.mul(&f).unwrap();
        assert_eq!(product.mesh().statistic(), Some(Statistic::Boson));
        assert_eq!(product.data().as_slice().unwrap(), &[1.0, 4.0, 9.0]);

        let mut in_place = f.copy();
        assert!(matches!(
            in_place.mul_assign(&f),
            Err(GfError::MeshMismatch { .. })
        ));
    }

    #[test]
    fn test_matrix_product_per_point() {
        let a = matrix_gf(vec![1.0, 2.0, 3.0, 4.0, 1.0, 0.0, 0.0, 1.0]);
        let b = matrix_gf(vec![0.0, 1.0, 1.0, 0.0, 2.0, 0.0, 0.0, 2.0]);
        let c = a.mul(&b).unwrap();
        assert_eq!(
            c.at_linear(&[0]).unwrap(),
            arr2(&[[2.0, 1.0], [4.0, 3.0]]).into_dyn()
        );
        assert_eq!(
            c.at_linear(&[1]).unwrap(),
            arr2(&[[2.0, 0.0], [0.0, 2.0]]).into_dyn()
        );
    }

    #[test]
    fn test_mixed_rank_product() {
        let mesh = MeshReFreq::new(-1.0, 1.0, 2).unwrap();
        let scalar = Gf::from_data(mesh, Array::from_vec(vec![2.0, 3.0]).into_dyn()).unwrap();
        let m = matrix_gf(vec![1.0; 8]);
        let p = m.mul(&scalar).unwrap();
        assert_eq!(p.data()[[0, 1, 0]], 2.0);
        assert_eq!(p.data()[[1, 1, 1]], 3.0);
        let q = scalar.mul(&m).unwrap();
        assert_eq!(p, q);
    }

    #[test]
    fn test_unsupported_rank() {
        let mesh = MeshReFreq::new(-1.0, 1.0, 2).unwrap();
        let vector: Gf<f64> = Gf::new(mesh, &[3]).unwrap();
        assert!(matches!(
            vector.mul(&vector),
            Err(GfError::UnsupportedRank { .. })
        ));
        assert!(vector.inverse().is_err());
    }

    #[test]
    fn test_div_is_mul_by_inverse() {
        let a = matrix_gf(vec![2.0, 0.0, 0.0, 4.0, 1.0, 1.0, 0.0, 1.0]);
        let q = a.div(&a).unwrap();
        for p in 0..2 {
            let v = q.at_linear(&[p]).unwrap();
            assert_abs_diff_eq!(v[[0, 0]], 1.0, epsilon = 1e-14);
            assert_abs_diff_eq!(v[[0, 1]], 0.0, epsilon = 1e-14);
            assert_abs_diff_eq!(v[[1, 1]], 1.0, epsilon = 1e-14);
        }
        let half = a.div(2.0).unwrap();
        assert_eq!(half.data()[[0, 1, 1]], 2.0);
    }

    #[test]
    fn test_scalar_target_division() {
        let a = tau_gf(Statistic::Fermion, &[2.0, 8.0]);
        let b = tau_gf(Statistic::Fermion, &[4.0, 2.0]);
        let q = a.div(&b).unwrap();
        assert_eq!(q.data().as_slice().unwrap(), &[0.5, 4.0]);
        let r = b.rdiv_scalar(1.0).unwrap();
        assert_eq!(r.data().as_slice().unwrap(), &[0.25, 0.5]);
        let s = b.rsub_scalar(1.0).unwrap();
        assert_eq!(s.data().as_slice().unwrap(), &[-3.0, -1.0]);
    }

    #[test]
    fn test_invert_singular_point_fails() {
        let mut a = matrix_gf(vec![1.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0, 1.0]);
        assert!(matches!(a.invert(), Err(GfError::SingularMatrix { point: 1 })));
    }

    #[test]
    fn test_transpose_and_conjugate() {
        let a = matrix_gf(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]);
        let t = a.transpose().unwrap();
        assert_eq!(t.data()[[0, 0, 1]], 3.0);
        assert_eq!(t.data()[[1, 1, 0]], 6.0);

        let mesh = MeshImFreq::new(1.0, Statistic::Fermion, 1).unwrap();
        let z = Gf::from_data(
            mesh,
            Array::from_vec(vec![Complex64::new(1.0, 2.0), Complex64::new(0.0, -1.0)]).into_dyn(),
        )
        .unwrap();
        let c = z.conjugate();
        assert_eq!(c.data()[[0]], Complex64::new(1.0, -2.0));
        assert_eq!(z.imag().data()[[1]], -1.0);
        assert_eq!(z.real().data()[[0]], 1.0);
    }

    #[test]
    fn test_matrix_operands() {
        let a = matrix_gf(vec![1.0, 2.0, 3.0, 4.0, 1.0, 0.0, 0.0, 1.0]);
        let m = arr2(&[[0.0, 1.0], [1.0, 0.0]]);
        let right = a.mul(&m).unwrap();
        assert_eq!(right.data()[[0, 0, 0]], 2.0);
        let left = a.left_mul_matrix(m.view()).unwrap();
        assert_eq!(left.data()[[0, 0, 0]], 3.0);
        let shifted = a.add(&m).unwrap();
        assert_eq!(shifted.data()[[1, 0, 1]], 1.0);
    }

    #[test]
    fn test_from_l_g_r() {
        let g = matrix_gf(vec![1.0, 2.0, 3.0, 4.0, 1.0, 0.0, 0.0, 1.0]);
        let mesh = MeshReFreq::new(-1.0, 1.0, 2).unwrap();
        let mut out: Gf<f64> = Gf::new(mesh, &[1, 1]).unwrap();
        let l = arr2(&[[1.0, 1.0]]);
        let r = arr2(&[[1.0], [0.0]]);
        out.from_l_g_r(l.view(), &g, r.view()).unwrap();
        assert_eq!(out.data()[[0, 0, 0]], 4.0);
        assert_eq!(out.data()[[1, 0, 0]], 1.0);
    }
}
