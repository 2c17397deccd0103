//! Domain indices, mesh values and mesh points.

use std::fmt;

use num_complex::Complex64;
use serde::{Deserialize, Serialize};

/// Domain index of a mesh point.
///
/// Matsubara meshes use signed integers (`n` in `i(2n+s)π/β`), the
/// uniform grids use `0..len`, and the lattice meshes use integer
/// 3-vectors that wrap periodically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MeshIndex {
    /// Signed integer index
    Int(i64),
    /// Integer lattice vector
    Vec3([i64; 3]),
}

impl From<i64> for MeshIndex {
    fn from(n: i64) -> Self {
        MeshIndex::Int(n)
    }
}

impl From<[i64; 3]> for MeshIndex {
    fn from(n: [i64; 3]) -> Self {
        MeshIndex::Vec3(n)
    }
}

impl fmt::Display for MeshIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MeshIndex::Int(n) => write!(f, "{n}"),
            MeshIndex::Vec3([a, b, c]) => write!(f, "({a}, {b}, {c})"),
        }
    }
}

/// Physical value attached to a mesh point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MeshValue {
    /// Imaginary time, real frequency or real time
    Real(f64),
    /// Matsubara frequency `iω_n`
    Complex(Complex64),
    /// Legendre order or Matsubara index
    Int(i64),
    /// Momentum or lattice vector
    Vector([f64; 3]),
}

impl MeshValue {
    /// Real value, if the point lies on a real axis.
    pub fn as_real(&self) -> Option<f64> {
        match *self {
            MeshValue::Real(x) => Some(x),
            MeshValue::Int(n) => Some(n as f64),
            MeshValue::Complex(_) | MeshValue::Vector(_) => None,
        }
    }

    /// Value as a complex number; real values get a zero imaginary part.
    pub fn as_complex(&self) -> Option<Complex64> {
        match *self {
            MeshValue::Real(x) => Some(Complex64::new(x, 0.0)),
            MeshValue::Complex(z) => Some(z),
            MeshValue::Int(n) => Some(Complex64::new(n as f64, 0.0)),
            MeshValue::Vector(_) => None,
        }
    }

    /// Value as an integer, for Legendre orders.
    pub fn as_int(&self) -> Option<i64> {
        match *self {
            MeshValue::Int(n) => Some(n),
            _ => None,
        }
    }

    /// Value as a 3-vector, for lattice meshes.
    pub fn as_vector(&self) -> Option<[f64; 3]> {
        match *self {
            MeshValue::Vector(v) => Some(v),
            _ => None,
        }
    }
}

impl From<f64> for MeshValue {
    fn from(x: f64) -> Self {
        MeshValue::Real(x)
    }
}

impl From<Complex64> for MeshValue {
    fn from(z: Complex64) -> Self {
        MeshValue::Complex(z)
    }
}

impl From<[f64; 3]> for MeshValue {
    fn from(v: [f64; 3]) -> Self {
        MeshValue::Vector(v)
    }
}

/// A point of a single mesh: dense position, domain index and value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshPoint {
    /// Position along the mesh axis
    pub linear_index: usize,
    /// Domain index
    pub index: MeshIndex,
    /// Value of the point
    pub value: MeshValue,
}
