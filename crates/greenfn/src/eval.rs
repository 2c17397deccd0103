//! Recursive interpreter for lazy expressions.

use log::debug;
use ndarray::{Data, DataMut};

use crate::arithmetic::Operand;
use crate::descriptors::{Const, Descriptor};
use crate::error::{GfError, Result};
use crate::gf::{Gf, GfBase};
use crate::lazy::{BinaryOp, LazyExpr, Terminal};
use crate::scalar::Scalar;

/// Result of evaluating an expression node.
#[derive(Debug, Clone)]
pub enum EvalValue<A: Scalar> {
    /// Container result
    Gf(Gf<A>),
    /// Scalar result
    Scalar(A),
}

impl<A: Scalar> EvalValue<A> {
    /// The container, `None` for a scalar.
    pub fn into_gf(self) -> Option<Gf<A>> {
        match self {
            EvalValue::Gf(g) => Some(g),
            EvalValue::Scalar(_) => None,
        }
    }
}

fn promote_scalar<'a, A: Scalar>(expr: LazyExpr<'a, A>) -> LazyExpr<'a, A> {
    match expr {
        LazyExpr::Terminal(Terminal::Scalar(s)) => LazyExpr::descriptor(Const::new(s)),
        other => other,
    }
}

/// Replace scalar operands of `+` and `-` by constant descriptors, so that
/// `iOmega_n + 0.5` adds `0.5 · I` on matrix targets. A lone scalar becomes
/// a constant as well.
pub fn convert_scalar_to_const<'a, A: Scalar>(expr: LazyExpr<'a, A>) -> LazyExpr<'a, A> {
    if let LazyExpr::Terminal(Terminal::Scalar(_)) = expr {
        return promote_scalar(expr);
    }
    expr.transform(&|t| t, &|node| match node {
        LazyExpr::Binary {
            op: op @ (BinaryOp::Add | BinaryOp::Sub),
            lhs,
            rhs,
        } => LazyExpr::Binary {
            op,
            lhs: Box::new(promote_scalar(*lhs)),
            rhs: Box::new(promote_scalar(*rhs)),
        },
        other => other,
    })
}

fn combine<A: Scalar>(op: BinaryOp, lhs: EvalValue<A>, rhs: EvalValue<A>) -> Result<EvalValue<A>> {
    let gf = match (lhs, rhs) {
        (EvalValue::Gf(a), EvalValue::Gf(b)) => match op {
            BinaryOp::Add => a.add(&b),
            BinaryOp::Sub => a.sub(&b),
            BinaryOp::Mul => a.mul(&b),
            BinaryOp::Div => a.div(&b),
        }
        .map_err(GfError::into_expression_error)?,
        (EvalValue::Gf(a), EvalValue::Scalar(s)) => match op {
            BinaryOp::Add => a.add(Operand::Scalar(s))?,
            BinaryOp::Sub => a.sub(Operand::Scalar(s))?,
            BinaryOp::Mul => a.mul(Operand::Scalar(s))?,
            BinaryOp::Div => a.div(Operand::Scalar(s))?,
        },
        (EvalValue::Scalar(s), EvalValue::Gf(b)) => match op {
            BinaryOp::Add => b.add(Operand::Scalar(s))?,
            BinaryOp::Sub => b.rsub_scalar(s)?,
            BinaryOp::Mul => b.mul(Operand::Scalar(s))?,
            BinaryOp::Div => b.rdiv_scalar(s)?,
        },
        (EvalValue::Scalar(x), EvalValue::Scalar(y)) => {
            return Ok(EvalValue::Scalar(match op {
                BinaryOp::Add => x + y,
                BinaryOp::Sub => x - y,
                BinaryOp::Mul => x * y,
                BinaryOp::Div => x / y,
            }))
        }
    };
    Ok(EvalValue::Gf(gf))
}

/// Evaluate `expr` with `ctx` supplying the mesh and target shape that
/// descriptors fill. Container leaves are copied, so `ctx` is never
/// modified.
pub fn eval_with_context<A, S>(ctx: &GfBase<S>, expr: &LazyExpr<'_, A>) -> Result<EvalValue<A>>
where
    A: Scalar,
    S: Data<Elem = A>,
{
    match expr {
        LazyExpr::Terminal(Terminal::Gf(g)) => Ok(EvalValue::Gf(g.copy())),
        LazyExpr::Terminal(Terminal::Scalar(s)) => Ok(EvalValue::Scalar(*s)),
        LazyExpr::Terminal(Terminal::Descriptor(d)) => {
            let mut working = ctx.copy();
            d.apply(&mut working)?;
            Ok(EvalValue::Gf(working))
        }
        LazyExpr::Binary { op, lhs, rhs } => {
            let l = eval_with_context(ctx, lhs)?;
            let r = eval_with_context(ctx, rhs)?;
            combine(*op, l, r)
        }
        LazyExpr::Call { func, args } => {
            let values = args
                .iter()
                .map(|arg| eval_with_context(ctx, arg))
                .collect::<Result<Vec<_>>>()?;
            func.call(values)
        }
    }
}

/// Evaluate an expression whose context comes from its own container
/// leaves. All of them must share one mesh.
pub fn eval_expr<A: Scalar>(expr: &LazyExpr<'_, A>) -> Result<EvalValue<A>> {
    let containers: Vec<_> = expr
        .terminals()
        .into_iter()
        .filter_map(|t| match t {
            Terminal::Gf(g) => Some(g),
            Terminal::Scalar(_) | Terminal::Descriptor(_) => None,
        })
        .collect();
    let Some(first) = containers.first() else {
        return Err(GfError::EvaluationContext(format!(
            "expression {expr} is purely abstract"
        )));
    };
    if let Some(other) = containers.iter().find(|g| g.mesh() != first.mesh()) {
        return Err(GfError::IncompatibleMesh(format!(
            "{} vs {}",
            first.mesh(),
            other.mesh()
        )));
    }
    eval_with_context(*first, expr)
}

impl<A: Scalar, S: DataMut<Elem = A>> GfBase<S> {
    /// Deferred-evaluation assignment: evaluate `expr` against this
    /// container and write the result into its storage, adopting the
    /// result mesh.
    ///
    /// Nothing is written when evaluation fails.
    pub fn assign(&mut self, expr: LazyExpr<'_, A>) -> Result<()> {
        let expr = convert_scalar_to_const(expr);
        debug!("evaluating '{expr}' into {}", self.mesh);
        let result = match eval_with_context(&*self, &expr)? {
            EvalValue::Gf(g) => g,
            EvalValue::Scalar(s) => {
                let mut working = self.copy();
                Const::new(s).apply(&mut working)?;
                working
            }
        };
        if result.mesh.kinds() != self.mesh.kinds() {
            return Err(GfError::IncompatibleMesh(format!(
                "cannot assign a result on {} to a container on {}",
                result.mesh, self.mesh
            )));
        }
        self.copy_from(&result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptors::{iomega_n, omega};
    use crate::lazy::{conjugate, inverse, term};
    use approx::assert_abs_diff_eq;
    use greenfn_mesh::{MeshImFreq, MeshImTime, MeshIndex, Statistic};
    use ndarray::Array;
    use num_complex::Complex64;

    fn tau(statistic: Statistic, values: &[f64]) -> Gf<f64> {
        let mesh = MeshImTime::new(1.0, statistic, values.len()).unwrap();
        Gf::from_data(mesh, Array::from_vec(values.to_vec()).into_dyn()).unwrap()
    }

    #[test]
    fn test_scalar_promotion() {
        let expr: LazyExpr<Complex64> = iomega_n() + 0.5;
        let converted = convert_scalar_to_const(expr);
        let names: Vec<String> = converted.terminals().iter().map(|t| t.to_string()).collect();
        assert_eq!(names, vec!["iOmega_n", "Const"]);

        let product: LazyExpr<Complex64> = 2.0 * iomega_n();
        let kept = convert_scalar_to_const(product);
        assert_eq!(kept.to_string(), "2.0 * iOmega_n");

        let lone: LazyExpr<f64> = LazyExpr::scalar(1.0);
        assert_eq!(convert_scalar_to_const(lone).to_string(), "Const");
    }

    #[test]
    fn test_assign_descriptor_plus_scalar() {
        let mesh = MeshImFreq::new(10.0, Statistic::Fermion, 4).unwrap();
        let mut g: Gf<Complex64> = Gf::new(mesh, &[2, 2]).unwrap();
        g.assign(iomega_n() + 0.5).unwrap();
        let v = g.at(&[MeshIndex::Int(0)]).unwrap();
        assert_abs_diff_eq!(v[[0, 0]].re, 0.5);
        assert_abs_diff_eq!(v[[0, 0]].im, std::f64::consts::PI / 10.0, epsilon = 1e-14);
        assert_eq!(v[[0, 1]], Complex64::new(0.0, 0.0));
        assert_eq!(v[[1, 1]], v[[0, 0]]);
    }

    #[test]
    fn test_assign_containers_and_scalars() {
        let a = tau(Statistic::Fermion, &[1.0, 2.0]);
        let b = tau(Statistic::Fermion, &[4.0, 8.0]);
        let mut target = tau(Statistic::Fermion, &[0.0, 0.0]);
        target.assign(term(&a) * 2.0 + term(&b) / &a).unwrap();
        assert_eq!(target.data().as_slice().unwrap(), &[6.0, 8.0]);
    }

    #[test]
    fn test_assign_adopts_combined_mesh() {
        let f = tau(Statistic::Fermion, &[1.0, 2.0]);
        let mut target = tau(Statistic::Fermion, &[0.0, 0.0]);
        target.assign(term(&f) * &f).unwrap();
        assert_eq!(target.mesh().statistic(), Some(Statistic::Boson));
        assert_eq!(target.data().as_slice().unwrap(), &[1.0, 4.0]);
    }

    #[test]
    fn test_assign_self_snapshot_is_idempotent() {
        let mut g = tau(Statistic::Boson, &[0.25, -3.0, 7.5]);
        let snapshot = g.copy();
        g.assign(term(&snapshot) * 1.0).unwrap();
        assert_eq!(g, snapshot);
    }

    #[test]
    fn test_incompatible_mesh_in_expression() {
        let a = tau(Statistic::Fermion, &[1.0, 2.0]);
        let b = tau(Statistic::Boson, &[1.0, 2.0]);
        let mut target = a.copy();
        let err = target.assign(term(&a) + &b).unwrap_err();
        assert!(matches!(err, GfError::IncompatibleMesh(_)));
        assert_eq!(target, a);

        assert!(matches!(
            eval_expr(&(term(&a) - &b)),
            Err(GfError::IncompatibleMesh(_))
        ));
    }

    #[test]
    fn test_descriptor_needs_frequency_target() {
        let mut g = tau(Statistic::Fermion, &[1.0, 2.0]);
        assert!(matches!(
            g.assign(omega()),
            Err(GfError::EvaluationContext(_))
        ));
    }

    #[test]
    fn test_purely_abstract_expression() {
        let expr: LazyExpr<Complex64> = iomega_n() * 2.0;
        assert!(matches!(
            eval_expr(&expr),
            Err(GfError::EvaluationContext(_))
        ));
    }

    #[test]
    fn test_eval_expr_uses_leaf_context() {
        let mesh = MeshImFreq::new(1.0, Statistic::Boson, 3).unwrap();
        let g: Gf<Complex64> = Gf::new(mesh, &[]).unwrap();
        let value = eval_expr(&(term(&g) + iomega_n::<Complex64>())).unwrap().into_gf().unwrap();
        // bosonic n = 0 sits at linear index n_iw - 1
        assert_eq!(value.data()[[2]], Complex64::new(0.0, 0.0));
        assert_abs_diff_eq!(value.data()[[3]].im, 2.0 * std::f64::consts::PI, epsilon = 1e-12);
    }

    #[test]
    fn test_call_nodes() {
        let a = tau(Statistic::Fermion, &[2.0, 4.0]);
        let mut target = a.copy();
        // scalars next to `+` become frequency-only constants
        assert!(target.assign(inverse().apply(vec![term(&a)]) + 1.0).is_err());
        target.assign(inverse().apply(vec![term(&a)])).unwrap();
        assert_eq!(target.data().as_slice().unwrap(), &[0.5, 0.25]);

        let mesh = MeshImFreq::new(1.0, Statistic::Fermion, 1).unwrap();
        let mut z: Gf<Complex64> = Gf::new(mesh, &[]).unwrap();
        z.assign(conjugate().apply(vec![iomega_n()])).unwrap();
        assert!(z.data()[[1]].im < 0.0);
    }

    #[test]
    fn test_scalar_only_call_result_becomes_const() {
        let mesh = MeshImFreq::new(1.0, Statistic::Fermion, 1).unwrap();
        let mut g: Gf<Complex64> = Gf::new(mesh, &[1, 1]).unwrap();
        g.assign(inverse().apply(vec![LazyExpr::scalar(Complex64::new(4.0, 0.0))]))
            .unwrap();
        assert_eq!(g.data()[[0, 0, 0]], Complex64::new(0.25, 0.0));
    }
}
