//! Meshes attached to an inverse temperature: Matsubara frequencies,
//! imaginary time and Legendre orders.

use std::f64::consts::PI;
use std::fmt;

use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::error::{MeshError, Result};
use crate::{Mesh, MeshIndex, MeshKind, MeshValue, Statistic, BETA_TOLERANCE};

fn check_beta(mesh: &'static str, beta: f64) -> Result<()> {
    if beta.is_finite() && beta > 0.0 {
        Ok(())
    } else {
        Err(MeshError::InvalidParameter {
            mesh,
            message: format!("beta must be positive and finite, got {beta}"),
        })
    }
}

fn same_beta(a: f64, b: f64) -> bool {
    (a - b).abs() < BETA_TOLERANCE
}

fn int_index(kind: MeshKind, index: &MeshIndex) -> Result<i64> {
    match *index {
        MeshIndex::Int(n) => Ok(n),
        MeshIndex::Vec3(_) => Err(MeshError::WrongIndexKind {
            kind,
            index: index.to_string(),
        }),
    }
}

/// Which Matsubara frequencies a [`MeshImFreq`] holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
pub enum ImFreqOption {
    /// Negative and positive frequencies.
    #[default]
    AllFrequencies,
    /// Only `n >= 0`.
    PositiveFrequenciesOnly,
}

/// Matsubara frequencies `iω_n = i(2n + s)π/β`.
///
/// With all frequencies, a fermionic mesh holds `n ∈ [-n_iw, n_iw)` and a
/// bosonic one `n ∈ (-n_iw, n_iw)`, so that the bosonic mesh is symmetric
/// around `ω = 0`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeshImFreq {
    beta: f64,
    statistic: Statistic,
    n_iw: usize,
    option: ImFreqOption,
}

impl MeshImFreq {
    /// Default number of positive frequencies.
    pub const DEFAULT_N_IW: usize = 1025;

    /// Largest `n_iw` whose index range `2·n_iw` fits in an `i64`.
    pub const MAX_N_IW: usize = (i64::MAX / 2) as usize;

    /// Mesh holding all frequencies.
    pub fn new(beta: f64, statistic: Statistic, n_iw: usize) -> Result<Self> {
        Self::with_option(beta, statistic, n_iw, ImFreqOption::AllFrequencies)
    }

    /// Mesh with an explicit frequency selection.
    pub fn with_option(
        beta: f64,
        statistic: Statistic,
        n_iw: usize,
        option: ImFreqOption,
    ) -> Result<Self> {
        check_beta("MeshImFreq", beta)?;
        if n_iw == 0 {
            return Err(MeshError::InvalidParameter {
                mesh: "MeshImFreq",
                message: "n_iw must be at least 1".to_string(),
            });
        }
        if n_iw > Self::MAX_N_IW {
            return Err(MeshError::InvalidParameter {
                mesh: "MeshImFreq",
                message: format!("n_iw must not exceed {}, got {n_iw}", Self::MAX_N_IW),
            });
        }
        Ok(Self {
            beta,
            statistic,
            n_iw,
            option,
        })
    }

    /// Inverse temperature.
    pub fn beta(&self) -> f64 {
        self.beta
    }

    /// Number of non-negative frequencies.
    pub fn n_iw(&self) -> usize {
        self.n_iw
    }

    /// Which frequencies the mesh holds.
    pub fn option(&self) -> ImFreqOption {
        self.option
    }

    /// Whether only `n >= 0` is held.
    pub fn positive_only(&self) -> bool {
        self.option == ImFreqOption::PositiveFrequenciesOnly
    }

    /// Smallest Matsubara index held by the mesh.
    pub fn first_index(&self) -> i64 {
        let n_iw = self.n_iw as i64;
        match (self.option, self.statistic) {
            (ImFreqOption::PositiveFrequenciesOnly, _) => 0,
            (ImFreqOption::AllFrequencies, Statistic::Fermion) => -n_iw,
            (ImFreqOption::AllFrequencies, Statistic::Boson) => 1 - n_iw,
        }
    }

    /// Largest Matsubara index held by the mesh.
    pub fn last_index(&self) -> i64 {
        self.n_iw as i64 - 1
    }

    /// `iω_n` for an arbitrary Matsubara index.
    pub fn frequency(&self, n: i64) -> Complex64 {
        let m = 2.0 * n as f64 + self.statistic.offset() as f64;
        Complex64::new(0.0, m * PI / self.beta)
    }

    /// Imaginary-time mesh of the same temperature.
    pub fn adjoint(&self, n_tau: Option<usize>) -> Result<MeshImTime> {
        MeshImTime::new(
            self.beta,
            self.statistic,
            n_tau.unwrap_or(self.n_iw.saturating_mul(6).saturating_add(1)),
        )
    }
}

impl Mesh for MeshImFreq {
    fn kind(&self) -> MeshKind {
        MeshKind::ImFreq
    }

    fn len(&self) -> usize {
        (self.last_index() - self.first_index() + 1) as usize
    }

    fn statistic(&self) -> Option<Statistic> {
        Some(self.statistic)
    }

    fn to_data_index(&self, index: &MeshIndex) -> Result<usize> {
        let n = int_index(MeshKind::ImFreq, index)?;
        if n < self.first_index() || n > self.last_index() {
            return Err(MeshError::IndexOutOfBounds {
                index: n.to_string(),
                size: self.len(),
            });
        }
        Ok((n - self.first_index()) as usize)
    }

    fn linear_to_index(&self, data_index: usize) -> MeshIndex {
        MeshIndex::Int(self.first_index() + data_index as i64)
    }

    fn linear_to_value(&self, data_index: usize) -> MeshValue {
        MeshValue::Complex(self.frequency(self.first_index() + data_index as i64))
    }
}

impl PartialEq for MeshImFreq {
    fn eq(&self, other: &Self) -> bool {
        same_beta(self.beta, other.beta)
            && self.statistic == other.statistic
            && self.n_iw == other.n_iw
            && self.option == other.option
    }
}

impl fmt::Display for MeshImFreq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "MeshImFreq(beta={}, statistic={}, n_iw={}{})",
            self.beta,
            self.statistic,
            self.n_iw,
            if self.positive_only() {
                ", positive_only"
            } else {
                ""
            }
        )
    }
}

/// Imaginary time `τ_i = iβ/(n_tau - 1)`, both endpoints included.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeshImTime {
    beta: f64,
    statistic: Statistic,
    n_tau: usize,
}

impl MeshImTime {
    /// `n_tau >= 2` points on `[0, β]`.
    pub fn new(beta: f64, statistic: Statistic, n_tau: usize) -> Result<Self> {
        check_beta("MeshImTime", beta)?;
        if n_tau < 2 {
            return Err(MeshError::InvalidParameter {
                mesh: "MeshImTime",
                message: format!("n_tau must be at least 2, got {n_tau}"),
            });
        }
        Ok(Self {
            beta,
            statistic,
            n_tau,
        })
    }

    /// Inverse temperature.
    pub fn beta(&self) -> f64 {
        self.beta
    }

    /// Number of time slices.
    pub fn n_tau(&self) -> usize {
        self.n_tau
    }

    /// Spacing between slices.
    pub fn delta(&self) -> f64 {
        self.beta / (self.n_tau - 1) as f64
    }

    /// Nearest grid point to `tau`.
    pub fn closest_index(&self, tau: f64) -> Result<usize> {
        if !(0.0..=self.beta).contains(&tau) {
            return Err(MeshError::OutOfDomain {
                value: tau,
                lower: 0.0,
                upper: self.beta,
            });
        }
        Ok(((tau / self.delta()).round() as usize).min(self.n_tau - 1))
    }

    /// Matsubara mesh of the same temperature.
    pub fn adjoint(&self, n_iw: Option<usize>) -> Result<MeshImFreq> {
        MeshImFreq::new(
            self.beta,
            self.statistic,
            n_iw.unwrap_or(((self.n_tau - 1) / 6).max(1)),
        )
    }
}

impl Mesh for MeshImTime {
    fn kind(&self) -> MeshKind {
        MeshKind::ImTime
    }

    fn len(&self) -> usize {
        self.n_tau
    }

    fn statistic(&self) -> Option<Statistic> {
        Some(self.statistic)
    }

    fn to_data_index(&self, index: &MeshIndex) -> Result<usize> {
        let i = int_index(MeshKind::ImTime, index)?;
        if i < 0 || i as usize >= self.n_tau {
            return Err(MeshError::IndexOutOfBounds {
                index: i.to_string(),
                size: self.n_tau,
            });
        }
        Ok(i as usize)
    }

    fn linear_to_index(&self, data_index: usize) -> MeshIndex {
        MeshIndex::Int(data_index as i64)
    }

    fn linear_to_value(&self, data_index: usize) -> MeshValue {
        MeshValue::Real(data_index as f64 * self.delta())
    }
}

impl PartialEq for MeshImTime {
    fn eq(&self, other: &Self) -> bool {
        same_beta(self.beta, other.beta)
            && self.statistic == other.statistic
            && self.n_tau == other.n_tau
    }
}

impl fmt::Display for MeshImTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "MeshImTime(beta={}, statistic={}, n_tau={})",
            self.beta, self.statistic, self.n_tau
        )
    }
}

/// Legendre orders `l = 0..max_n`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeshLegendre {
    beta: f64,
    statistic: Statistic,
    max_n: usize,
}

impl MeshLegendre {
    /// Orders `0..max_n`.
    pub fn new(beta: f64, statistic: Statistic, max_n: usize) -> Result<Self> {
        check_beta("MeshLegendre", beta)?;
        if max_n == 0 {
            return Err(MeshError::InvalidParameter {
                mesh: "MeshLegendre",
                message: "max_n must be at least 1".to_string(),
            });
        }
        Ok(Self {
            beta,
            statistic,
            max_n,
        })
    }

    /// Inverse temperature.
    pub fn beta(&self) -> f64 {
        self.beta
    }

    /// Number of orders.
    pub fn max_n(&self) -> usize {
        self.max_n
    }
}

impl Mesh for MeshLegendre {
    fn kind(&self) -> MeshKind {
        MeshKind::Legendre
    }

    fn len(&self) -> usize {
        self.max_n
    }

    fn statistic(&self) -> Option<Statistic> {
        Some(self.statistic)
    }

    fn to_data_index(&self, index: &MeshIndex) -> Result<usize> {
        let l = int_index(MeshKind::Legendre, index)?;
        if l < 0 || l as usize >= self.max_n {
            return Err(MeshError::IndexOutOfBounds {
                index: l.to_string(),
                size: self.max_n,
            });
        }
        Ok(l as usize)
    }

    fn linear_to_index(&self, data_index: usize) -> MeshIndex {
        MeshIndex::Int(data_index as i64)
    }

    fn linear_to_value(&self, data_index: usize) -> MeshValue {
        MeshValue::Int(data_index as i64)
    }
}

impl PartialEq for MeshLegendre {
    fn eq(&self, other: &Self) -> bool {
        same_beta(self.beta, other.beta)
            && self.statistic == other.statistic
            && self.max_n == other.max_n
    }
}

impl fmt::Display for MeshLegendre {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "MeshLegendre(beta={}, statistic={}, max_n={})",
            self.beta, self.statistic, self.max_n
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_imfreq_fermion_layout() {
        let mesh = MeshImFreq::new(10.0, Statistic::Fermion, 100).unwrap();
        assert_eq!(mesh.len(), 200);
        assert_eq!(mesh.first_index(), -100);
        assert_eq!(mesh.last_index(), 99);
        assert_eq!(mesh.to_data_index(&MeshIndex::Int(0)).unwrap(), 100);
        assert_eq!(mesh.to_index(100).unwrap(), MeshIndex::Int(0));

        let w0 = mesh.value(100).unwrap().as_complex().unwrap();
        assert_abs_diff_eq!(w0.re, 0.0);
        assert_abs_diff_eq!(w0.im, PI / 10.0, epsilon = 1e-14);

        let w_first = mesh.value(0).unwrap().as_complex().unwrap();
        assert_abs_diff_eq!(w_first.im, -199.0 * PI / 10.0, epsilon = 1e-12);
    }

    #[test]
    fn test_imfreq_boson_is_symmetric() {
        let mesh = MeshImFreq::new(5.0, Statistic::Boson, 4).unwrap();
        assert_eq!(mesh.len(), 7);
        assert_eq!(mesh.first_index(), -3);
        let first = mesh.value(0).unwrap().as_complex().unwrap();
        let last = mesh.value(6).unwrap().as_complex().unwrap();
        assert_abs_diff_eq!(first.im, -last.im, epsilon = 1e-14);
        assert_abs_diff_eq!(mesh.frequency(0).im, 0.0);
    }

    #[test]
    fn test_imfreq_positive_only() {
        let mesh = MeshImFreq::with_option(
            1.0,
            Statistic::Fermion,
            3,
            ImFreqOption::PositiveFrequenciesOnly,
        )
        .unwrap();
        assert!(mesh.positive_only());
        assert_eq!(mesh.len(), 3);
        assert_eq!(mesh.to_data_index(&MeshIndex::Int(0)).unwrap(), 0);
        assert!(mesh.to_data_index(&MeshIndex::Int(-1)).is_err());
    }

    #[test]
    fn test_imfreq_rejects_bad_index() {
        let mesh = MeshImFreq::new(1.0, Statistic::Fermion, 2).unwrap();
        assert!(matches!(
            mesh.to_data_index(&MeshIndex::Int(2)),
            Err(MeshError::IndexOutOfBounds { .. })
        ));
        assert!(matches!(
            mesh.to_data_index(&MeshIndex::Vec3([0, 0, 0])),
            Err(MeshError::WrongIndexKind { .. })
        ));
        assert!(mesh.value(4).is_err());
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(MeshImFreq::new(0.0, Statistic::Fermion, 10).is_err());
        assert!(MeshImFreq::new(1.0, Statistic::Fermion, 0).is_err());
        assert!(MeshImTime::new(1.0, Statistic::Fermion, 1).is_err());
        assert!(MeshLegendre::new(-1.0, Statistic::Boson, 4).is_err());
    }

    #[test]
    fn test_imfreq_size_limit() {
        assert!(matches!(
            MeshImFreq::new(1.0, Statistic::Fermion, 1 << 62),
            Err(MeshError::InvalidParameter { .. })
        ));
        let mesh = MeshImFreq::new(1.0, Statistic::Boson, MeshImFreq::MAX_N_IW).unwrap();
        assert_eq!(mesh.len(), 2 * MeshImFreq::MAX_N_IW - 1);
        assert_eq!(mesh.first_index(), 1 - i64::MAX / 2);
        assert!(mesh.frequency(mesh.last_index()).im.is_finite());
    }

    #[test]
    fn test_beta_tolerance_in_equality() {
        let a = MeshImFreq::new(10.0, Statistic::Fermion, 8).unwrap();
        let b = MeshImFreq::new(10.0 + 1e-16, Statistic::Fermion, 8).unwrap();
        let c = MeshImFreq::new(10.0 + 1e-10, Statistic::Fermion, 8).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_imtime_points() {
        let mesh = MeshImTime::new(2.0, Statistic::Fermion, 5).unwrap();
        let taus: Vec<f64> = mesh
            .values()
            .into_iter()
            .map(|v| v.as_real().unwrap())
            .collect();
        assert_eq!(taus, vec![0.0, 0.5, 1.0, 1.5, 2.0]);
        assert_eq!(mesh.closest_index(0.74).unwrap(), 1);
        assert_eq!(mesh.closest_index(2.0).unwrap(), 4);
        assert!(mesh.closest_index(2.5).is_err());
    }

    #[test]
    fn test_adjoint_meshes() {
        let tau = MeshImTime::new(5.0, Statistic::Boson, 61).unwrap();
        let iw = tau.adjoint(None).unwrap();
        assert_eq!(iw.n_iw(), 10);
        assert_eq!(Mesh::statistic(&iw), Some(Statistic::Boson));
        let back = iw.adjoint(None).unwrap();
        assert_eq!(back, tau);
    }

    #[test]
    fn test_legendre_values() {
        let mesh = MeshLegendre::new(1.0, Statistic::Fermion, 4).unwrap();
        assert_eq!(mesh.len(), 4);
        assert_eq!(mesh.value(3).unwrap(), MeshValue::Int(3));
        let points = mesh.points();
        assert_eq!(points[2].index, MeshIndex::Int(2));
        assert_eq!(points[2].linear_index, 2);
    }
}
