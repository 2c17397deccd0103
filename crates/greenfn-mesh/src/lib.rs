#![warn(missing_docs)]
//! Meshes for Green's function containers.
//!
//! A mesh is the discrete domain a Green's function is sampled on. This crate
//! provides the single-axis meshes (Matsubara frequencies, imaginary time,
//! Legendre orders, real frequencies and times, Brillouin zones and cyclic
//! lattices) together with [`MeshProduct`] for multi-variable functions, and
//! the closed [`GfMesh`] enum that containers store.
//!
//! # Example
//!
//! ```
//! use greenfn_mesh::{GfMesh, Mesh, MeshImFreq, MeshIndex, Statistic};
//!
//! let mesh = MeshImFreq::new(10.0, Statistic::Fermion, 4).unwrap();
//! assert_eq!(mesh.len(), 8);
//! assert_eq!(mesh.to_data_index(&MeshIndex::Int(0)).unwrap(), 4);
//!
//! let mesh: GfMesh = mesh.into();
//! assert_eq!(mesh.rank(), 1);
//! ```

mod error;
mod gf_mesh;
mod lattice;
mod matsubara;
mod point;
mod product;
mod real_axis;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use error::{MeshError, Result};
pub use gf_mesh::GfMesh;
pub use lattice::{MeshBrZone, MeshCycLat};
pub use matsubara::{ImFreqOption, MeshImFreq, MeshImTime, MeshLegendre};
pub use point::{MeshIndex, MeshPoint, MeshValue};
pub use product::MeshProduct;
pub use real_axis::{MeshReFreq, MeshReTime};

/// Two inverse temperatures closer than this are considered equal.
pub const BETA_TOLERANCE: f64 = 1e-15;

/// Particle statistic of a Matsubara-type mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Statistic {
    /// Antiperiodic in imaginary time
    Fermion,
    /// Periodic in imaginary time
    Boson,
}

impl Statistic {
    /// Offset `s` in `ω_n = (2n + s)π/β`.
    pub fn offset(self) -> i64 {
        match self {
            Statistic::Fermion => 1,
            Statistic::Boson => 0,
        }
    }

    /// Statistic of a product of two functions: equal statistics give a
    /// boson, different ones a fermion.
    pub fn combine(self, other: Statistic) -> Statistic {
        if self == other {
            Statistic::Boson
        } else {
            Statistic::Fermion
        }
    }
}

impl fmt::Display for Statistic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statistic::Fermion => write!(f, "Fermion"),
            Statistic::Boson => write!(f, "Boson"),
        }
    }
}

impl std::str::FromStr for Statistic {
    type Err = MeshError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Fermion" | "F" => Ok(Statistic::Fermion),
            "Boson" | "B" => Ok(Statistic::Boson),
            other => Err(MeshError::InvalidParameter {
                mesh: "Statistic",
                message: format!("unknown statistic '{other}'"),
            }),
        }
    }
}

/// Kind tag of a mesh. Products carry their own tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MeshKind {
    /// Matsubara frequencies
    ImFreq,
    /// Imaginary time
    ImTime,
    /// Real frequencies
    ReFreq,
    /// Real time
    ReTime,
    /// Legendre orders
    Legendre,
    /// Brillouin zone
    BrZone,
    /// Cyclic lattice
    CycLat,
    /// Cartesian product of single-axis meshes
    Product,
}

impl MeshKind {
    /// All kinds, in declaration order.
    pub const ALL: [MeshKind; 8] = [
        MeshKind::ImFreq,
        MeshKind::ImTime,
        MeshKind::ReFreq,
        MeshKind::ReTime,
        MeshKind::Legendre,
        MeshKind::BrZone,
        MeshKind::CycLat,
        MeshKind::Product,
    ];

    /// Persistence scheme tag.
    pub fn scheme(self) -> &'static str {
        match self {
            MeshKind::ImFreq => "MeshImFreq",
            MeshKind::ImTime => "MeshImTime",
            MeshKind::ReFreq => "MeshReFreq",
            MeshKind::ReTime => "MeshReTime",
            MeshKind::Legendre => "MeshLegendre",
            MeshKind::BrZone => "MeshBrZone",
            MeshKind::CycLat => "MeshCycLat",
            MeshKind::Product => "MeshProduct",
        }
    }

    /// Inverse of [`MeshKind::scheme`].
    pub fn from_scheme(scheme: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.scheme() == scheme)
    }
}

impl fmt::Display for MeshKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.scheme())
    }
}

/// Common interface of the single-axis meshes.
///
/// Implementors provide the index/value formulas; bounds checking and point
/// iteration come from the provided methods.
pub trait Mesh {
    /// Kind tag of the mesh.
    fn kind(&self) -> MeshKind;

    /// Number of points.
    fn len(&self) -> usize;

    /// Whether the mesh has no points.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Statistic of Matsubara-type meshes, `None` otherwise.
    fn statistic(&self) -> Option<Statistic> {
        None
    }

    /// Map a domain index to its dense position.
    fn to_data_index(&self, index: &MeshIndex) -> Result<usize>;

    /// Domain index at dense position `data_index`. Callers guarantee
    /// `data_index < len()`.
    fn linear_to_index(&self, data_index: usize) -> MeshIndex;

    /// Value at dense position `data_index`. Callers guarantee
    /// `data_index < len()`.
    fn linear_to_value(&self, data_index: usize) -> MeshValue;

    /// Fail unless `data_index < len()`.
    fn check_bounds(&self, data_index: usize) -> Result<()> {
        if data_index < self.len() {
            Ok(())
        } else {
            Err(MeshError::IndexOutOfBounds {
                index: data_index.to_string(),
                size: self.len(),
            })
        }
    }

    /// Inverse of [`Mesh::to_data_index`].
    fn to_index(&self, data_index: usize) -> Result<MeshIndex> {
        self.check_bounds(data_index)?;
        Ok(self.linear_to_index(data_index))
    }

    /// Value at a checked dense position.
    fn value(&self, data_index: usize) -> Result<MeshValue> {
        self.check_bounds(data_index)?;
        Ok(self.linear_to_value(data_index))
    }

    /// Point at a checked dense position.
    fn point(&self, data_index: usize) -> Result<MeshPoint> {
        self.check_bounds(data_index)?;
        Ok(MeshPoint {
            linear_index: data_index,
            index: self.linear_to_index(data_index),
            value: self.linear_to_value(data_index),
        })
    }

    /// All points in dense order.
    fn points(&self) -> Vec<MeshPoint> {
        (0..self.len())
            .map(|i| MeshPoint {
                linear_index: i,
                index: self.linear_to_index(i),
                value: self.linear_to_value(i),
            })
            .collect()
    }

    /// All values in dense order.
    fn values(&self) -> Vec<MeshValue> {
        (0..self.len()).map(|i| self.linear_to_value(i)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statistic_combine() {
        use Statistic::*;
        assert_eq!(Fermion.combine(Fermion), Boson);
        assert_eq!(Boson.combine(Boson), Boson);
        assert_eq!(Fermion.combine(Boson), Fermion);
        assert_eq!(Boson.combine(Fermion), Fermion);
    }

    #[test]
    fn test_statistic_parse() {
        assert_eq!("Fermion".parse::<Statistic>().unwrap(), Statistic::Fermion);
        assert_eq!("B".parse::<Statistic>().unwrap(), Statistic::Boson);
        assert!("Anyon".parse::<Statistic>().is_err());
    }

    #[test]
    fn test_scheme_roundtrip() {
        for kind in MeshKind::ALL {
            assert_eq!(MeshKind::from_scheme(kind.scheme()), Some(kind));
        }
        assert_eq!(MeshKind::from_scheme("MeshUnknown"), None);
    }
}
