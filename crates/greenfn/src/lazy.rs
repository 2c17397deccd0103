//! Lazy expression trees over Green's functions, scalars and descriptors.
//!
//! An expression is built with the arithmetic operators and evaluated later
//! against a target container (see [`GfBase::assign`](crate::GfBase::assign)).
//! Descriptors such as [`iomega_n`](crate::descriptors::iomega_n) only get
//! a meaning once the target mesh is known.
//!
//! ```
//! use greenfn::descriptors::iomega_n;
//! use greenfn::{Gf, LazyExpr};
//! use greenfn_mesh::{MeshImFreq, Statistic};
//! use num_complex::Complex64;
//!
//! let mesh = MeshImFreq::new(10.0, Statistic::Fermion, 16).unwrap();
//! let mut g: Gf<Complex64> = Gf::new(mesh, &[1, 1]).unwrap();
//! let expr: LazyExpr<Complex64> = iomega_n() + 0.5;
//! assert_eq!(expr.to_string(), "iOmega_n + 0.5");
//! g.assign(expr).unwrap();
//! ```

use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Sub};
use std::rc::Rc;

use ndarray::Data;
use num_complex::Complex64;

use crate::descriptors::Descriptor;
use crate::error::Result;
use crate::eval::EvalValue;
use crate::gf::{GfBase, GfView};
use crate::scalar::Scalar;

/// Binary operator tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
}

impl BinaryOp {
    /// Infix symbol used when printing.
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
        }
    }

    fn priority(self) -> u8 {
        match self {
            BinaryOp::Add | BinaryOp::Sub => 1,
            BinaryOp::Mul | BinaryOp::Div => 2,
        }
    }

    fn is_commutative(self) -> bool {
        matches!(self, BinaryOp::Add | BinaryOp::Mul)
    }
}

type LazyFn<A> = dyn Fn(Vec<EvalValue<A>>) -> Result<EvalValue<A>>;

/// Named function applied to evaluated arguments.
pub struct LazyFunction<A: Scalar> {
    name: String,
    func: Rc<LazyFn<A>>,
}

impl<A: Scalar> LazyFunction<A> {
    /// Function called `name`.
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(Vec<EvalValue<A>>) -> Result<EvalValue<A>> + 'static,
    {
        Self {
            name: name.into(),
            func: Rc::new(func),
        }
    }

    /// Name shown when printing.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn call(&self, args: Vec<EvalValue<A>>) -> Result<EvalValue<A>> {
        (self.func)(args)
    }

    /// Wrap in a call node over `args`.
    pub fn apply<'a>(&self, args: Vec<LazyExpr<'a, A>>) -> LazyExpr<'a, A> {
        LazyExpr::Call {
            func: self.clone(),
            args,
        }
    }
}

impl<A: Scalar> Clone for LazyFunction<A> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            func: Rc::clone(&self.func),
        }
    }
}

impl<A: Scalar> fmt::Debug for LazyFunction<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyFunction")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Leaf of an expression tree.
pub enum Terminal<'a, A: Scalar> {
    /// Borrowed container
    Gf(GfView<'a, A>),
    /// Scalar constant
    Scalar(A),
    /// Descriptor evaluated against the target
    Descriptor(Rc<dyn Descriptor<A> + 'a>),
}

impl<'a, A: Scalar> Clone for Terminal<'a, A> {
    fn clone(&self) -> Self {
        match self {
            Terminal::Gf(g) => Terminal::Gf(g.clone()),
            Terminal::Scalar(s) => Terminal::Scalar(*s),
            Terminal::Descriptor(d) => Terminal::Descriptor(Rc::clone(d)),
        }
    }
}

impl<'a, A: Scalar> fmt::Display for Terminal<'a, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Terminal::Gf(g) if g.name().is_empty() => write!(f, "Gf"),
            Terminal::Gf(g) => write!(f, "{}", g.name()),
            Terminal::Scalar(s) => write!(f, "{}", s.format_value()),
            Terminal::Descriptor(d) => write!(f, "{}", d.name()),
        }
    }
}

impl<'a, A: Scalar> fmt::Debug for Terminal<'a, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Terminal({self})")
    }
}

/// Expression tree node.
#[derive(Clone, Debug)]
pub enum LazyExpr<'a, A: Scalar> {
    /// Leaf
    Terminal(Terminal<'a, A>),
    /// Binary operation
    Binary {
        /// Operator
        op: BinaryOp,
        /// Left operand
        lhs: Box<LazyExpr<'a, A>>,
        /// Right operand
        rhs: Box<LazyExpr<'a, A>>,
    },
    /// Function call
    Call {
        /// Function to call
        func: LazyFunction<A>,
        /// Arguments, evaluated before the call
        args: Vec<LazyExpr<'a, A>>,
    },
}

impl<'a, A: Scalar> LazyExpr<'a, A> {
    /// Scalar leaf.
    pub fn scalar(value: A) -> Self {
        LazyExpr::Terminal(Terminal::Scalar(value))
    }

    /// Container leaf borrowing `gf`.
    pub fn gf<S: Data<Elem = A>>(gf: &'a GfBase<S>) -> Self {
        LazyExpr::Terminal(Terminal::Gf(gf.view()))
    }

    /// Descriptor leaf.
    pub fn descriptor(d: impl Descriptor<A> + 'a) -> Self {
        LazyExpr::Terminal(Terminal::Descriptor(Rc::new(d)))
    }

    /// Binary node.
    pub fn binary(op: BinaryOp, lhs: LazyExpr<'a, A>, rhs: LazyExpr<'a, A>) -> Self {
        LazyExpr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    /// Whether the node is a leaf.
    pub fn is_terminal(&self) -> bool {
        matches!(self, LazyExpr::Terminal(_))
    }

    /// Leaves in left-to-right order.
    pub fn terminals(&self) -> Vec<&Terminal<'a, A>> {
        let mut out = Vec::new();
        self.collect_terminals(&mut out);
        out
    }

    fn collect_terminals<'s>(&'s self, out: &mut Vec<&'s Terminal<'a, A>>) {
        match self {
            LazyExpr::Terminal(t) => out.push(t),
            LazyExpr::Binary { lhs, rhs, .. } => {
                lhs.collect_terminals(out);
                rhs.collect_terminals(out);
            }
            LazyExpr::Call { args, .. } => {
                for arg in args {
                    arg.collect_terminals(out);
                }
            }
        }
    }

    /// Rebuild the tree bottom-up: `on_terminal` maps every leaf, then
    /// `on_node` maps every inner node after its children were rebuilt.
    pub fn transform<FT, FN>(self, on_terminal: &FT, on_node: &FN) -> Self
    where
        FT: Fn(Terminal<'a, A>) -> Terminal<'a, A>,
        FN: Fn(LazyExpr<'a, A>) -> LazyExpr<'a, A>,
    {
        match self {
            LazyExpr::Terminal(t) => LazyExpr::Terminal(on_terminal(t)),
            LazyExpr::Binary { op, lhs, rhs } => on_node(LazyExpr::Binary {
                op,
                lhs: Box::new(lhs.transform(on_terminal, on_node)),
                rhs: Box::new(rhs.transform(on_terminal, on_node)),
            }),
            LazyExpr::Call { func, args } => on_node(LazyExpr::Call {
                func,
                args: args
                    .into_iter()
                    .map(|arg| arg.transform(on_terminal, on_node))
                    .collect(),
            }),
        }
    }

    fn priority(&self) -> u8 {
        match self {
            LazyExpr::Binary { op, .. } => op.priority(),
            LazyExpr::Terminal(_) | LazyExpr::Call { .. } => u8::MAX,
        }
    }
}

fn write_operand<A: Scalar>(
    f: &mut fmt::Formatter<'_>,
    child: &LazyExpr<'_, A>,
    parent_priority: u8,
    strict: bool,
) -> fmt::Result {
    let bare = if strict {
        child.priority() > parent_priority
    } else {
        child.priority() >= parent_priority
    };
    if bare {
        write!(f, "{child}")
    } else {
        write!(f, "({child})")
    }
}

impl<'a, A: Scalar> fmt::Display for LazyExpr<'a, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LazyExpr::Terminal(t) => write!(f, "{t}"),
            LazyExpr::Binary { op, lhs, rhs } => {
                write_operand(f, lhs, op.priority(), false)?;
                write!(f, " {} ", op.symbol())?;
                write_operand(f, rhs, op.priority(), !op.is_commutative())
            }
            LazyExpr::Call { func, args } => {
                write!(f, "{}(", func.name())?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ")")
            }
        }
    }
}

impl<'a, A: Scalar, S: Data<Elem = A>> From<&'a GfBase<S>> for LazyExpr<'a, A> {
    fn from(gf: &'a GfBase<S>) -> Self {
        LazyExpr::gf(gf)
    }
}

impl<'a, A: Scalar> From<GfView<'a, A>> for LazyExpr<'a, A> {
    fn from(view: GfView<'a, A>) -> Self {
        LazyExpr::Terminal(Terminal::Gf(view))
    }
}

impl<'a> From<f64> for LazyExpr<'a, f64> {
    fn from(x: f64) -> Self {
        LazyExpr::scalar(x)
    }
}

impl<'a> From<f64> for LazyExpr<'a, Complex64> {
    fn from(x: f64) -> Self {
        LazyExpr::scalar(Complex64::new(x, 0.0))
    }
}

impl<'a> From<Complex64> for LazyExpr<'a, Complex64> {
    fn from(z: Complex64) -> Self {
        LazyExpr::scalar(z)
    }
}

/// Turn any supported value into a leaf expression.
pub fn term<'a, A: Scalar>(value: impl Into<LazyExpr<'a, A>>) -> LazyExpr<'a, A> {
    value.into()
}

macro_rules! impl_binary_op {
    ($trait:ident, $method:ident, $op:expr) => {
        impl<'a, A: Scalar, R: Into<LazyExpr<'a, A>>> $trait<R> for LazyExpr<'a, A> {
            type Output = LazyExpr<'a, A>;

            fn $method(self, rhs: R) -> LazyExpr<'a, A> {
                LazyExpr::binary($op, self, rhs.into())
            }
        }

        impl<'a, A: Scalar> $trait<LazyExpr<'a, A>> for f64
        where
            f64: Into<LazyExpr<'a, A>>,
        {
            type Output = LazyExpr<'a, A>;

            fn $method(self, rhs: LazyExpr<'a, A>) -> LazyExpr<'a, A> {
                LazyExpr::binary($op, self.into(), rhs)
            }
        }

        impl<'a> $trait<LazyExpr<'a, Complex64>> for Complex64 {
            type Output = LazyExpr<'a, Complex64>;

            fn $method(self, rhs: LazyExpr<'a, Complex64>) -> LazyExpr<'a, Complex64> {
                LazyExpr::binary($op, LazyExpr::scalar(self), rhs)
            }
        }
    };
}

impl_binary_op!(Add, add, BinaryOp::Add);
impl_binary_op!(Sub, sub, BinaryOp::Sub);
impl_binary_op!(Mul, mul, BinaryOp::Mul);
impl_binary_op!(Div, div, BinaryOp::Div);

impl<'a, A: Scalar> Neg for LazyExpr<'a, A> {
    type Output = LazyExpr<'a, A>;

    fn neg(self) -> LazyExpr<'a, A> {
        LazyExpr::binary(BinaryOp::Mul, LazyExpr::scalar(-A::one()), self)
    }
}

/// Lazy inverse: `inverse()(g)` evaluates to `g⁻¹`.
pub fn inverse<A: Scalar>() -> LazyFunction<A> {
    LazyFunction::new("inverse", |args: Vec<EvalValue<A>>| {
        match single_arg("inverse", args)? {
            EvalValue::Gf(g) => Ok(EvalValue::Gf(g.inverse()?)),
            EvalValue::Scalar(s) => Ok(EvalValue::Scalar(A::one() / s)),
        }
    })
}

/// Lazy complex conjugate.
pub fn conjugate<A: Scalar>() -> LazyFunction<A> {
    LazyFunction::new("conjugate", |args: Vec<EvalValue<A>>| {
        match single_arg("conjugate", args)? {
            EvalValue::Gf(g) => Ok(EvalValue::Gf(g.conjugate())),
            EvalValue::Scalar(s) => Ok(EvalValue::Scalar(s.conjugate())),
        }
    })
}

fn single_arg<A: Scalar>(name: &str, args: Vec<EvalValue<A>>) -> Result<EvalValue<A>> {
    let n = args.len();
    let mut args = args.into_iter();
    match (args.next(), args.next()) {
        (Some(arg), None) => Ok(arg),
        _ => Err(crate::GfError::EvaluationContext(format!(
            "{name} takes exactly one argument, got {n}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use greenfn_mesh::{MeshImTime, Statistic};

    use crate::descriptors::{iomega_n, omega};
    use crate::gf::Gf;

    fn named(name: &str) -> Gf<f64> {
        let mesh = MeshImTime::new(1.0, Statistic::Fermion, 2).unwrap();
        Gf::new(mesh, &[]).unwrap().with_name(name)
    }

    #[test]
    fn test_display_priorities() {
        let (a, b, c) = (named("A"), named("B"), named("C"));
        let expr = (term(&a) + &b) * &c;
        assert_eq!(expr.to_string(), "(A + B) * C");
        let expr = term(&a) + term(&b) * &c;
        assert_eq!(expr.to_string(), "A + B * C");
        let expr = term(&a) - (term(&b) - &c);
        assert_eq!(expr.to_string(), "A - (B - C)");
        let expr = term(&a) / (term(&b) * &c);
        assert_eq!(expr.to_string(), "A / (B * C)");
    }

    #[test]
    fn test_display_calls_and_scalars() {
        let a = named("G");
        let expr = inverse().apply(vec![term(&a) + 2.0]);
        assert_eq!(expr.to_string(), "inverse(G + 2.0)");
        let expr: LazyExpr<Complex64> = 2.0 * omega::<Complex64>();
        assert_eq!(expr.to_string(), "2.0 * Omega");
    }

    #[test]
    fn test_terminals_order() {
        let (a, b) = (named("A"), named("B"));
        let expr = term(&a) * 3.0 + &b;
        let leaves: Vec<String> = expr.terminals().iter().map(|t| t.to_string()).collect();
        assert_eq!(leaves, vec!["A", "3.0", "B"]);
        assert!(!expr.is_terminal());
        assert!(term(&a).is_terminal());
    }

    #[test]
    fn test_transform_rewrites_leaves() {
        let a = named("A");
        let expr = term(&a) + 1.0;
        let doubled = expr.transform(
            &|t| match t {
                Terminal::Scalar(s) => Terminal::Scalar(2.0 * s),
                other => other,
            },
            &|node| node,
        );
        assert_eq!(doubled.to_string(), "A + 2.0");
    }

    #[test]
    fn test_negation_builds_product() {
        let expr: LazyExpr<Complex64> = -iomega_n::<Complex64>();
        match expr {
            LazyExpr::Binary { op, .. } => assert_eq!(op, BinaryOp::Mul),
            _ => panic!("expected a binary node"),
        }
    }
}
