//! Small dense linear algebra on per-point target matrices.

use ndarray::{Array2, Array3, ArrayD, ArrayView2, ArrayViewD, Axis, IxDyn};

use crate::error::{GfError, Result};
use crate::scalar::Scalar;

/// Inverse of a square matrix by Gauss-Jordan elimination with partial
/// pivoting. `point` is reported back in the singular-matrix error.
pub(crate) fn invert_matrix<A: Scalar>(m: ArrayView2<'_, A>, point: usize) -> Result<Array2<A>> {
    let n = m.nrows();
    if m.ncols() != n {
        return Err(GfError::ShapeMismatch {
            expected: vec![n, n],
            actual: m.shape().to_vec(),
        });
    }
    let mut a = m.to_owned();
    let mut inv = Array2::<A>::eye(n);

    for col in 0..n {
        let pivot = (col..n)
            .max_by(|&i, &j| a[[i, col]].abs_f64().total_cmp(&a[[j, col]].abs_f64()))
            .unwrap_or(col);
        // also rejects NaN pivots
        if !(a[[pivot, col]].abs_f64() > 0.0) {
            return Err(GfError::SingularMatrix { point });
        }
        if pivot != col {
            for k in 0..n {
                a.swap([col, k], [pivot, k]);
                inv.swap([col, k], [pivot, k]);
            }
        }

        let p = a[[col, col]];
        for k in 0..n {
            a[[col, k]] /= p;
            inv[[col, k]] /= p;
        }

        for row in 0..n {
            if row == col {
                continue;
            }
            let factor = a[[row, col]];
            if factor.is_zero() {
                continue;
            }
            for k in 0..n {
                let (ack, ick) = (a[[col, k]], inv[[col, k]]);
                a[[row, k]] -= factor * ack;
                inv[[row, k]] -= factor * ick;
            }
        }
    }
    Ok(inv)
}

/// Number of mesh points spanned by the leading `rank` axes.
pub(crate) fn point_count(shape: &[usize], rank: usize) -> usize {
    shape[..rank].iter().product()
}

/// Invert the `n x n` target matrix at every mesh point.
pub(crate) fn invert_points<A: Scalar>(data: ArrayViewD<'_, A>, rank: usize) -> Result<ArrayD<A>> {
    let shape = data.shape().to_vec();
    let (rows, cols) = (shape[rank], shape[rank + 1]);
    if rows != cols {
        return Err(GfError::ShapeMismatch {
            expected: vec![rows, rows],
            actual: vec![rows, cols],
        });
    }
    let npts = point_count(&shape, rank);
    let stacked = data.to_shape((npts, rows, cols))?;
    let mut out = Array3::<A>::zeros((npts, rows, cols));
    for (p, (src, mut dst)) in stacked
        .outer_iter()
        .zip(out.outer_iter_mut())
        .enumerate()
    {
        dst.assign(&invert_matrix(src, p)?);
    }
    Ok(out.into_shape_with_order(IxDyn(&shape))?)
}

/// `l[p] · r[p]` at every mesh point for rank-2 targets.
pub(crate) fn matmul_points<A: Scalar>(
    l: ArrayViewD<'_, A>,
    r: ArrayViewD<'_, A>,
    rank: usize,
) -> Result<ArrayD<A>> {
    let (ls, rs) = (l.shape(), r.shape());
    let (a, b) = (ls[rank], ls[rank + 1]);
    let (b2, c) = (rs[rank], rs[rank + 1]);
    if b != b2 || ls[..rank] != rs[..rank] {
        return Err(GfError::ShapeMismatch {
            expected: ls.to_vec(),
            actual: rs.to_vec(),
        });
    }
    let npts = point_count(ls, rank);
    let lm = l.to_shape((npts, a, b))?;
    let rm = r.to_shape((npts, b, c))?;
    let mut out = Array3::<A>::zeros((npts, a, c));
    for p in 0..npts {
        out.index_axis_mut(Axis(0), p)
            .assign(&lm.index_axis(Axis(0), p).dot(&rm.index_axis(Axis(0), p)));
    }
    let mut shape = ls[..rank].to_vec();
    shape.extend([a, c]);
    Ok(out.into_shape_with_order(IxDyn(&shape))?)
}

/// `left · g[p] · right` at every mesh point.
pub(crate) fn sandwich_points<A: Scalar>(
    left: ArrayView2<'_, A>,
    g: ArrayViewD<'_, A>,
    right: ArrayView2<'_, A>,
    rank: usize,
) -> Result<ArrayD<A>> {
    let gs = g.shape();
    let (m, n) = (gs[rank], gs[rank + 1]);
    if left.ncols() != m || right.nrows() != n {
        return Err(GfError::ShapeMismatch {
            expected: vec![left.ncols(), right.nrows()],
            actual: vec![m, n],
        });
    }
    let npts = point_count(gs, rank);
    let gm = g.to_shape((npts, m, n))?;
    let (rows, cols) = (left.nrows(), right.ncols());
    let mut out = Array3::<A>::zeros((npts, rows, cols));
    for p in 0..npts {
        let value = left.dot(&gm.index_axis(Axis(0), p)).dot(&right);
        out.index_axis_mut(Axis(0), p).assign(&value);
    }
    let mut shape = gs[..rank].to_vec();
    shape.extend([rows, cols]);
    Ok(out.into_shape_with_order(IxDyn(&shape))?)
}
