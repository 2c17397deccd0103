#![warn(missing_docs)]
//! Green's function containers.
//!
//! A [`Gf`] holds values of a function sampled on a mesh (see
//! [`greenfn_mesh`]) with a matrix-valued or scalar target space. On top of
//! the container this crate provides:
//!
//! - indexing by mesh points, target slices or both ([`GfKey`]),
//! - eager arithmetic between containers, scalars and constant matrices,
//! - lazy expressions ([`LazyExpr`]) evaluated against a target mesh, with
//!   descriptors such as `iOmega_n` that only make sense on a mesh,
//! - point evaluation through a [`KernelRegistry`],
//! - named block collections ([`BlockGf`]),
//! - a scheme-tagged persistence mapping ([`archive`]) and plot series.
//!
//! # Example
//!
//! ```
//! use greenfn::descriptors::iomega_n;
//! use greenfn::{BlockGf, Gf};
//! use greenfn_mesh::{MeshImFreq, MeshIndex, Statistic};
//! use num_complex::Complex64;
//!
//! let mesh = MeshImFreq::new(10.0, Statistic::Fermion, 100).unwrap();
//! let mut g: Gf = Gf::new(mesh, &[1, 1]).unwrap();
//! g.assign(iomega_n::<Complex64>() + 0.5).unwrap();
//! g.invert().unwrap();
//!
//! let expected = Complex64::new(0.5, std::f64::consts::PI / 10.0).inv();
//! let value = g.at(&[MeshIndex::Int(0)]).unwrap()[[0, 0]];
//! assert!((value - expected).norm() < 1e-10);
//!
//! let blocks = BlockGf::from_copies(["up", "down"], &[&g, &g]).unwrap();
//! assert_eq!(blocks.names(), ["up", "down"]);
//! ```

/// Persistence mapping and scheme registry.
pub mod archive;
mod arithmetic;
mod block;
/// Descriptors usable as lazy-expression terminals.
pub mod descriptors;
mod error;
mod eval;
mod gf;
mod indexing;
mod kernel;
mod lazy;
mod linalg;
mod plot;
mod scalar;

pub use greenfn_mesh;

pub use archive::{Archivable, ArchiveGroup, ArchiveValue, Archived, ArrayRecord, SchemeRegistry};
pub use arithmetic::Operand;
pub use block::{BlockGf, BlockGfOptions, BlockOperand};
pub use descriptors::Descriptor;
pub use error::{GfError, Result};
pub use eval::{convert_scalar_to_const, eval_expr, eval_with_context, EvalValue};
pub use gf::{Gf, GfBase, GfView, GfViewMut};
pub use indexing::{GfItem, GfKey, GfValue, MeshSelector, TargetSelector};
pub use kernel::{EvalKernel, KernelRegistry, LinearInterpolation, MatsubaraLookup, PeriodicLookup};
pub use lazy::{conjugate, inverse, term, BinaryOp, LazyExpr, LazyFunction, Terminal};
pub use plot::PlotSeries;
pub use scalar::Scalar;
