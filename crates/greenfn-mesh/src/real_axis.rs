//! Uniform real-frequency and real-time meshes.

use std::f64::consts::PI;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{MeshError, Result};
use crate::{Mesh, MeshIndex, MeshKind, MeshValue};

/// `n` equidistant points from `min` to `max`, both included.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
struct UniformGrid {
    min: f64,
    max: f64,
    n: usize,
}

impl UniformGrid {
    fn new(mesh: &'static str, min: f64, max: f64, n: usize) -> Result<Self> {
        if !(min.is_finite() && max.is_finite() && min < max) {
            return Err(MeshError::InvalidParameter {
                mesh,
                message: format!("expected a finite window with min < max, got [{min}, {max}]"),
            });
        }
        if n < 2 {
            return Err(MeshError::InvalidParameter {
                mesh,
                message: format!("need at least 2 points, got {n}"),
            });
        }
        Ok(Self { min, max, n })
    }

    fn delta(&self) -> f64 {
        (self.max - self.min) / (self.n - 1) as f64
    }

    fn value(&self, i: usize) -> f64 {
        self.min + i as f64 * self.delta()
    }

    fn index(&self, kind: MeshKind, index: &MeshIndex) -> Result<usize> {
        match *index {
            MeshIndex::Int(i) if i >= 0 && (i as usize) < self.n => Ok(i as usize),
            MeshIndex::Int(i) => Err(MeshError::IndexOutOfBounds {
                index: i.to_string(),
                size: self.n,
            }),
            MeshIndex::Vec3(_) => Err(MeshError::WrongIndexKind {
                kind,
                index: index.to_string(),
            }),
        }
    }

    fn closest(&self, x: f64) -> Result<usize> {
        let half = 0.5 * self.delta();
        if x < self.min - half || x > self.max + half || x.is_nan() {
            return Err(MeshError::OutOfDomain {
                value: x,
                lower: self.min,
                upper: self.max,
            });
        }
        let i = ((x - self.min) / self.delta()).round().max(0.0) as usize;
        Ok(i.min(self.n - 1))
    }
}

/// Real frequencies `ω_i = ω_min + iΔω`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeshReFreq {
    grid: UniformGrid,
}

impl MeshReFreq {
    /// `n_w >= 2` frequencies on `[omega_min, omega_max]`.
    pub fn new(omega_min: f64, omega_max: f64, n_w: usize) -> Result<Self> {
        Ok(Self {
            grid: UniformGrid::new("MeshReFreq", omega_min, omega_max, n_w)?,
        })
    }

    /// Lowest frequency.
    pub fn omega_min(&self) -> f64 {
        self.grid.min
    }

    /// Highest frequency.
    pub fn omega_max(&self) -> f64 {
        self.grid.max
    }

    /// Number of frequencies.
    pub fn n_w(&self) -> usize {
        self.grid.n
    }

    /// Frequency spacing.
    pub fn delta(&self) -> f64 {
        self.grid.delta()
    }

    /// Dense position of the grid point nearest to `omega`.
    pub fn closest_index(&self, omega: f64) -> Result<usize> {
        self.grid.closest(omega)
    }

    /// Time mesh conjugate to this frequency window.
    pub fn adjoint(&self) -> Result<MeshReTime> {
        let t_max = PI / self.delta();
        MeshReTime::new(-t_max, t_max, self.grid.n)
    }
}

impl Mesh for MeshReFreq {
    fn kind(&self) -> MeshKind {
        MeshKind::ReFreq
    }

    fn len(&self) -> usize {
        self.grid.n
    }

    fn to_data_index(&self, index: &MeshIndex) -> Result<usize> {
        self.grid.index(MeshKind::ReFreq, index)
    }

    fn linear_to_index(&self, data_index: usize) -> MeshIndex {
        MeshIndex::Int(data_index as i64)
    }

    fn linear_to_value(&self, data_index: usize) -> MeshValue {
        MeshValue::Real(self.grid.value(data_index))
    }
}

impl fmt::Display for MeshReFreq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "MeshReFreq(omega_min={}, omega_max={}, n_w={})",
            self.grid.min, self.grid.max, self.grid.n
        )
    }
}

/// Real times `t_i = t_min + iΔt`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeshReTime {
    grid: UniformGrid,
}

impl MeshReTime {
    /// `n_t >= 2` times on `[t_min, t_max]`.
    pub fn new(t_min: f64, t_max: f64, n_t: usize) -> Result<Self> {
        Ok(Self {
            grid: UniformGrid::new("MeshReTime", t_min, t_max, n_t)?,
        })
    }

    /// Earliest time.
    pub fn t_min(&self) -> f64 {
        self.grid.min
    }

    /// Latest time.
    pub fn t_max(&self) -> f64 {
        self.grid.max
    }

    /// Number of times.
    pub fn n_t(&self) -> usize {
        self.grid.n
    }

    /// Time step.
    pub fn delta(&self) -> f64 {
        self.grid.delta()
    }

    /// Dense position of the grid point nearest to `t`.
    pub fn closest_index(&self, t: f64) -> Result<usize> {
        self.grid.closest(t)
    }

    /// Frequency mesh conjugate to this time window.
    pub fn adjoint(&self) -> Result<MeshReFreq> {
        let w_max = PI / self.delta();
        MeshReFreq::new(-w_max, w_max, self.grid.n)
    }
}

impl Mesh for MeshReTime {
    fn kind(&self) -> MeshKind {
        MeshKind::ReTime
    }

    fn len(&self) -> usize {
        self.grid.n
    }

    fn to_data_index(&self, index: &MeshIndex) -> Result<usize> {
        self.grid.index(MeshKind::ReTime, index)
    }

    fn linear_to_index(&self, data_index: usize) -> MeshIndex {
        MeshIndex::Int(data_index as i64)
    }

    fn linear_to_value(&self, data_index: usize) -> MeshValue {
        MeshValue::Real(self.grid.value(data_index))
    }
}

impl fmt::Display for MeshReTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "MeshReTime(t_min={}, t_max={}, n_t={})",
            self.grid.min, self.grid.max, self.grid.n
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_refreq_grid() {
        let mesh = MeshReFreq::new(-1.0, 1.0, 5).unwrap();
        assert_eq!(mesh.len(), 5);
        assert_abs_diff_eq!(mesh.delta(), 0.5);
        assert_eq!(mesh.value(0).unwrap(), MeshValue::Real(-1.0));
        assert_eq!(mesh.value(4).unwrap(), MeshValue::Real(1.0));
        assert_eq!(mesh.closest_index(0.2).unwrap(), 2);
        assert_eq!(mesh.closest_index(-1.1).unwrap(), 0);
        assert!(mesh.closest_index(3.0).is_err());
    }

    #[test]
    fn test_retime_bounds() {
        let mesh = MeshReTime::new(0.0, 10.0, 11).unwrap();
        assert_eq!(mesh.to_data_index(&MeshIndex::Int(10)).unwrap(), 10);
        assert!(mesh.to_data_index(&MeshIndex::Int(11)).is_err());
        assert!(mesh.to_data_index(&MeshIndex::Int(-1)).is_err());
    }

    #[test]
    fn test_invalid_window() {
        assert!(MeshReFreq::new(1.0, -1.0, 10).is_err());
        assert!(MeshReTime::new(0.0, 1.0, 1).is_err());
        assert!(MeshReFreq::new(f64::NAN, 1.0, 10).is_err());
    }

    #[test]
    fn test_adjoint_window() {
        let t = MeshReTime::new(-5.0, 5.0, 101).unwrap();
        let w = t.adjoint().unwrap();
        assert_eq!(w.n_w(), 101);
        assert_abs_diff_eq!(w.omega_max(), PI / 0.1, epsilon = 1e-10);
    }
}
