//! Periodic meshes: Brillouin-zone momenta and cyclic real-space lattices.

use std::f64::consts::PI;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{MeshError, Result};
use crate::{Mesh, MeshIndex, MeshKind, MeshValue};

/// Row-major 3x3 matrix; row `a` is basis vector `a`.
type Basis = [[f64; 3]; 3];

const IDENTITY: Basis = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];

fn invert3(m: &Basis) -> Option<Basis> {
    let det = m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
        - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
        + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0]);
    if det.abs() < f64::EPSILON {
        return None;
    }
    let mut inv = [[0.0; 3]; 3];
    for (i, row) in inv.iter_mut().enumerate() {
        for (j, entry) in row.iter_mut().enumerate() {
            // cofactor of m[j][i]
            let (r0, r1) = ((j + 1) % 3, (j + 2) % 3);
            let (c0, c1) = ((i + 1) % 3, (i + 2) % 3);
            *entry = (m[r0][c0] * m[r1][c1] - m[r0][c1] * m[r1][c0]) / det;
        }
    }
    Some(inv)
}

/// `2π (m^{-1})^T`: maps a real-space basis to its reciprocal basis and back.
fn reciprocal(m: &Basis) -> Option<Basis> {
    let inv = invert3(m)?;
    let mut out = [[0.0; 3]; 3];
    for (a, row) in out.iter_mut().enumerate() {
        for (b, entry) in row.iter_mut().enumerate() {
            *entry = 2.0 * PI * inv[b][a];
        }
    }
    Some(out)
}

/// Coordinates of `x` in `basis`: solves `x = Σ_a c_a basis[a]`.
fn coordinates(inverse: &Basis, x: [f64; 3]) -> [f64; 3] {
    let mut c = [0.0; 3];
    for (b, cb) in c.iter_mut().enumerate() {
        *cb = (0..3).map(|a| x[a] * inverse[a][b]).sum();
    }
    c
}

fn check_dims(mesh: &'static str, dims: [usize; 3]) -> Result<()> {
    if dims.iter().any(|&d| d == 0) {
        return Err(MeshError::InvalidParameter {
            mesh,
            message: format!("all dimensions must be at least 1, got {dims:?}"),
        });
    }
    let size = dims.iter().try_fold(1usize, |acc, &d| acc.checked_mul(d));
    match size {
        Some(size) if i64::try_from(size).is_ok() => Ok(()),
        _ => Err(MeshError::InvalidParameter {
            mesh,
            message: format!("number of points overflows for dimensions {dims:?}"),
        }),
    }
}

fn checked_inverse(mesh: &'static str, units: &Basis) -> Result<Basis> {
    invert3(units).ok_or_else(|| MeshError::InvalidParameter {
        mesh,
        message: "basis vectors are linearly dependent".to_string(),
    })
}

/// Wrap an integer 3-vector into `[0, dims)` and flatten row-major.
fn wrap(dims: [usize; 3], n: [i64; 3]) -> usize {
    (0..3).fold(0usize, |acc, a| {
        acc * dims[a] + n[a].rem_euclid(dims[a] as i64) as usize
    })
}

fn unwrap(dims: [usize; 3], mut linear: usize) -> [i64; 3] {
    let mut n = [0i64; 3];
    for a in (0..3).rev() {
        n[a] = (linear % dims[a]) as i64;
        linear /= dims[a];
    }
    n
}

fn lattice_index(kind: MeshKind, index: &MeshIndex) -> Result<[i64; 3]> {
    match *index {
        MeshIndex::Vec3(n) => Ok(n),
        MeshIndex::Int(_) => Err(MeshError::WrongIndexKind {
            kind,
            index: index.to_string(),
        }),
    }
}

/// Momentum mesh `k = Σ_a (n_a / dims_a) · units_a` on the reciprocal basis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeshBrZone {
    units: Basis,
    dims: [usize; 3],
}

impl MeshBrZone {
    /// Zone spanned by the reciprocal vectors `units` with `dims` points per axis.
    pub fn new(units: Basis, dims: [usize; 3]) -> Result<Self> {
        check_dims("MeshBrZone", dims)?;
        checked_inverse("MeshBrZone", &units)?;
        Ok(Self { units, dims })
    }

    /// `n_k` points along each of the first `ndim` axes of a hypercubic
    /// lattice with unit spacing.
    pub fn hypercubic(ndim: usize, n_k: usize) -> Result<Self> {
        if !(1..=3).contains(&ndim) {
            return Err(MeshError::InvalidParameter {
                mesh: "MeshBrZone",
                message: format!("ndim must be 1, 2 or 3, got {ndim}"),
            });
        }
        let mut dims = [1; 3];
        dims[..ndim].fill(n_k);
        let mut units = IDENTITY;
        for row in units.iter_mut() {
            for x in row.iter_mut() {
                *x *= 2.0 * PI;
            }
        }
        Self::new(units, dims)
    }

    /// Reciprocal basis vectors, one per row.
    pub fn units(&self) -> &Basis {
        &self.units
    }

    /// Points per axis.
    pub fn dims(&self) -> [usize; 3] {
        self.dims
    }

    /// Nearest momentum point, folded into the zone.
    pub fn closest_index(&self, k: [f64; 3]) -> Result<MeshIndex> {
        let inverse = checked_inverse("MeshBrZone", &self.units)?;
        let c = coordinates(&inverse, k);
        let mut n = [0i64; 3];
        for a in 0..3 {
            n[a] = (c[a] * self.dims[a] as f64).round() as i64;
        }
        Ok(MeshIndex::Vec3(unwrap(self.dims, wrap(self.dims, n))))
    }

    /// Real-space lattice whose reciprocal basis is `units`.
    pub fn adjoint(&self) -> Result<MeshCycLat> {
        let units = reciprocal(&self.units).ok_or_else(|| MeshError::InvalidParameter {
            mesh: "MeshBrZone",
            message: "basis vectors are linearly dependent".to_string(),
        })?;
        MeshCycLat::new(units, self.dims)
    }
}

impl Mesh for MeshBrZone {
    fn kind(&self) -> MeshKind {
        MeshKind::BrZone
    }

    fn len(&self) -> usize {
        self.dims.iter().product()
    }

    fn to_data_index(&self, index: &MeshIndex) -> Result<usize> {
        Ok(wrap(self.dims, lattice_index(MeshKind::BrZone, index)?))
    }

    fn linear_to_index(&self, data_index: usize) -> MeshIndex {
        MeshIndex::Vec3(unwrap(self.dims, data_index))
    }

    fn linear_to_value(&self, data_index: usize) -> MeshValue {
        let n = unwrap(self.dims, data_index);
        let mut k = [0.0; 3];
        for a in 0..3 {
            let frac = n[a] as f64 / self.dims[a] as f64;
            for (kb, ub) in k.iter_mut().zip(self.units[a].iter()) {
                *kb += frac * ub;
            }
        }
        MeshValue::Vector(k)
    }
}

impl fmt::Display for MeshBrZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MeshBrZone(dims={:?})", self.dims)
    }
}

/// Cyclic real-space lattice `r = Σ_a n_a · units_a`, periodic in `dims`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeshCycLat {
    units: Basis,
    dims: [usize; 3],
}

impl MeshCycLat {
    /// Lattice with basis vectors `units` and period `dims`.
    pub fn new(units: Basis, dims: [usize; 3]) -> Result<Self> {
        check_dims("MeshCycLat", dims)?;
        checked_inverse("MeshCycLat", &units)?;
        Ok(Self { units, dims })
    }

    /// Lattice with unit basis vectors.
    pub fn from_dims(l1: usize, l2: usize, l3: usize) -> Result<Self> {
        Self::new(IDENTITY, [l1, l2, l3])
    }

    /// Basis vectors, one per row.
    pub fn units(&self) -> &Basis {
        &self.units
    }

    /// Period along each axis.
    pub fn dims(&self) -> [usize; 3] {
        self.dims
    }

    /// Nearest lattice site, folded into the periodic cell.
    pub fn closest_index(&self, r: [f64; 3]) -> Result<MeshIndex> {
        let inverse = checked_inverse("MeshCycLat", &self.units)?;
        let c = coordinates(&inverse, r);
        let n = [
            c[0].round() as i64,
            c[1].round() as i64,
            c[2].round() as i64,
        ];
        Ok(MeshIndex::Vec3(unwrap(self.dims, wrap(self.dims, n))))
    }

    /// Brillouin zone of this lattice.
    pub fn adjoint(&self) -> Result<MeshBrZone> {
        let units = reciprocal(&self.units).ok_or_else(|| MeshError::InvalidParameter {
            mesh: "MeshCycLat",
            message: "basis vectors are linearly dependent".to_string(),
        })?;
        MeshBrZone::new(units, self.dims)
    }
}

impl Mesh for MeshCycLat {
    fn kind(&self) -> MeshKind {
        MeshKind::CycLat
    }

    fn len(&self) -> usize {
        self.dims.iter().product()
    }

    fn to_data_index(&self, index: &MeshIndex) -> Result<usize> {
        Ok(wrap(self.dims, lattice_index(MeshKind::CycLat, index)?))
    }

    fn linear_to_index(&self, data_index: usize) -> MeshIndex {
        MeshIndex::Vec3(unwrap(self.dims, data_index))
    }

    fn linear_to_value(&self, data_index: usize) -> MeshValue {
        let n = unwrap(self.dims, data_index);
        let mut r = [0.0; 3];
        for a in 0..3 {
            for (rb, ub) in r.iter_mut().zip(self.units[a].iter()) {
                *rb += n[a] as f64 * ub;
            }
        }
        MeshValue::Vector(r)
    }
}

impl fmt::Display for MeshCycLat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MeshCycLat(dims={:?})", self.dims)
    }
}
