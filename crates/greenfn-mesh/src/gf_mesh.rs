//! The closed set of meshes a Green's function container can carry.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{MeshError, Result};
use crate::{
    Mesh, MeshBrZone, MeshCycLat, MeshImFreq, MeshImTime, MeshIndex, MeshKind, MeshLegendre,
    MeshProduct, MeshReFreq, MeshReTime, Statistic, BETA_TOLERANCE,
};

/// Mesh of a Green's function: one of the single-axis meshes or a product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GfMesh {
    /// Matsubara frequencies
    ImFreq(MeshImFreq),
    /// Imaginary time
    ImTime(MeshImTime),
    /// Real frequencies
    ReFreq(MeshReFreq),
    /// Real time
    ReTime(MeshReTime),
    /// Legendre orders
    Legendre(MeshLegendre),
    /// Brillouin zone
    BrZone(MeshBrZone),
    /// Cyclic lattice
    CycLat(MeshCycLat),
    /// Product of single-axis meshes
    Product(MeshProduct),
}

impl GfMesh {
    /// Kind tag; products report [`MeshKind::Product`].
    pub fn kind(&self) -> MeshKind {
        match self {
            GfMesh::ImFreq(_) => MeshKind::ImFreq,
            GfMesh::ImTime(_) => MeshKind::ImTime,
            GfMesh::ReFreq(_) => MeshKind::ReFreq,
            GfMesh::ReTime(_) => MeshKind::ReTime,
            GfMesh::Legendre(_) => MeshKind::Legendre,
            GfMesh::BrZone(_) => MeshKind::BrZone,
            GfMesh::CycLat(_) => MeshKind::CycLat,
            GfMesh::Product(_) => MeshKind::Product,
        }
    }

    /// The single-axis view of this mesh; `None` for products.
    pub fn as_mesh(&self) -> Option<&dyn Mesh> {
        match self {
            GfMesh::ImFreq(m) => Some(m),
            GfMesh::ImTime(m) => Some(m),
            GfMesh::ReFreq(m) => Some(m),
            GfMesh::ReTime(m) => Some(m),
            GfMesh::Legendre(m) => Some(m),
            GfMesh::BrZone(m) => Some(m),
            GfMesh::CycLat(m) => Some(m),
            GfMesh::Product(_) => None,
        }
    }

    /// Number of mesh axes in the container data.
    pub fn rank(&self) -> usize {
        match self {
            GfMesh::Product(p) => p.rank(),
            _ => 1,
        }
    }

    /// Components in axis order; a single mesh is its own only component.
    pub fn components(&self) -> &[GfMesh] {
        match self {
            GfMesh::Product(p) => p.components(),
            _ => std::slice::from_ref(self),
        }
    }

    /// Number of points of each component.
    pub fn size_of_components(&self) -> Vec<usize> {
        match self {
            GfMesh::Product(p) => p.size_of_components(),
            _ => vec![self.len()],
        }
    }

    /// Total number of points.
    pub fn len(&self) -> usize {
        match (self, self.as_mesh()) {
            (GfMesh::Product(p), _) => p.len(),
            (_, Some(m)) => m.len(),
            (_, None) => 0,
        }
    }

    /// Whether the mesh has no points.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Kinds of the components, used as the structural signature.
    pub fn kinds(&self) -> Vec<MeshKind> {
        self.components().iter().map(GfMesh::kind).collect()
    }

    /// Statistic of a Matsubara-type mesh, `None` for other kinds and products.
    pub fn statistic(&self) -> Option<Statistic> {
        self.as_mesh().and_then(|m| m.statistic())
    }

    /// Dense position of a single-axis domain index.
    pub fn to_data_index(&self, index: &MeshIndex) -> Result<usize> {
        match self {
            GfMesh::Product(p) => Err(MeshError::InvalidProduct(format!(
                "a single index cannot address {p}"
            ))),
            single => match single.as_mesh() {
                Some(m) => m.to_data_index(index),
                None => Err(MeshError::InvalidProduct(single.to_string())),
            },
        }
    }

    /// Replace this mesh by `other`, which must have the same component kinds.
    pub fn copy_from(&mut self, other: &GfMesh) -> Result<()> {
        let (expected, actual) = (self.kinds(), other.kinds());
        if expected != actual {
            return Err(MeshError::KindMismatch { expected, actual });
        }
        *self = other.clone();
        Ok(())
    }

    /// Mesh of the pointwise product of two functions.
    ///
    /// Imaginary-time meshes at the same temperature and size combine even
    /// when their statistics differ; every other pair must be equal.
    /// Products combine component by component.
    pub fn combine_mul(&self, other: &GfMesh) -> Result<GfMesh> {
        match (self, other) {
            (GfMesh::Product(l), GfMesh::Product(r)) if l.rank() == r.rank() => {
                let components = l
                    .components()
                    .iter()
                    .zip(r.components())
                    .map(|(a, b)| a.combine_mul(b))
                    .collect::<Result<Vec<_>>>()?;
                Ok(GfMesh::Product(MeshProduct::new(components)?))
            }
            (GfMesh::ImTime(l), GfMesh::ImTime(r))
                if (l.beta() - r.beta()).abs() < BETA_TOLERANCE && l.n_tau() == r.n_tau() =>
            {
                let (ls, rs) = (Mesh::statistic(l), Mesh::statistic(r));
                let statistic = match (ls, rs) {
                    (Some(a), Some(b)) => a.combine(b),
                    _ => Statistic::Boson,
                };
                Ok(GfMesh::ImTime(MeshImTime::new(
                    l.beta(),
                    statistic,
                    l.n_tau(),
                )?))
            }
            (l, r) if l == r => Ok(l.clone()),
            (l, r) => Err(MeshError::Mismatch {
                left: l.to_string(),
                right: r.to_string(),
            }),
        }
    }

    /// Mesh of the Fourier-conjugate variable with default resolution.
    pub fn adjoint(&self) -> Result<GfMesh> {
        match self {
            GfMesh::ImFreq(m) => Ok(m.adjoint(None)?.into()),
            GfMesh::ImTime(m) => Ok(m.adjoint(None)?.into()),
            GfMesh::ReFreq(m) => Ok(m.adjoint()?.into()),
            GfMesh::ReTime(m) => Ok(m.adjoint()?.into()),
            GfMesh::BrZone(m) => Ok(m.adjoint()?.into()),
            GfMesh::CycLat(m) => Ok(m.adjoint()?.into()),
            GfMesh::Legendre(_) => Err(MeshError::NoAdjoint(MeshKind::Legendre)),
            GfMesh::Product(p) => {
                let components = p
                    .components()
                    .iter()
                    .map(GfMesh::adjoint)
                    .collect::<Result<Vec<_>>>()?;
                Ok(GfMesh::Product(MeshProduct::new(components)?))
            }
        }
    }
}

impl fmt::Display for GfMesh {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GfMesh::ImFreq(m) => fmt::Display::fmt(m, f),
            GfMesh::ImTime(m) => fmt::Display::fmt(m, f),
            GfMesh::ReFreq(m) => fmt::Display::fmt(m, f),
            GfMesh::ReTime(m) => fmt::Display::fmt(m, f),
            GfMesh::Legendre(m) => fmt::Display::fmt(m, f),
            GfMesh::BrZone(m) => fmt::Display::fmt(m, f),
            GfMesh::CycLat(m) => fmt::Display::fmt(m, f),
            GfMesh::Product(m) => fmt::Display::fmt(m, f),
        }
    }
}

macro_rules! impl_from_mesh {
    ($($variant:ident => $ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for GfMesh {
                fn from(mesh: $ty) -> Self {
                    GfMesh::$variant(mesh)
                }
            }
        )*
    };
}

impl_from_mesh!(
    ImFreq => MeshImFreq,
    ImTime => MeshImTime,
    ReFreq => MeshReFreq,
    ReTime => MeshReTime,
    Legendre => MeshLegendre,
    BrZone => MeshBrZone,
    CycLat => MeshCycLat,
    Product => MeshProduct,
);

#[cfg(test)]
mod tests {
    use super::*;

    fn tau(statistic: Statistic) -> GfMesh {
        MeshImTime::new(10.0, statistic, 11).unwrap().into()
    }

    #[test]
    fn test_combine_imtime_statistics() {
        let f = tau(Statistic::Fermion);
        let b = tau(Statistic::Boson);
        assert_eq!(f.combine_mul(&f).unwrap().statistic(), Some(Statistic::Boson));
        assert_eq!(b.combine_mul(&b).unwrap().statistic(), Some(Statistic::Boson));
        assert_eq!(f.combine_mul(&b).unwrap().statistic(), Some(Statistic::Fermion));
        assert_eq!(b.combine_mul(&f).unwrap().statistic(), Some(Statistic::Fermion));
    }

    #[test]
    fn test_combine_requires_equality_elsewhere() {
        let a: GfMesh = MeshImFreq::new(10.0, Statistic::Fermion, 8).unwrap().into();
        let b: GfMesh = MeshImFreq::new(10.0, Statistic::Boson, 8).unwrap().into();
        assert_eq!(a.combine_mul(&a).unwrap(), a);
        assert!(matches!(a.combine_mul(&b), Err(MeshError::Mismatch { .. })));
        assert!(a.combine_mul(&tau(Statistic::Fermion)).is_err());
        let other_size: GfMesh = MeshImTime::new(10.0, Statistic::Fermion, 12).unwrap().into();
        assert!(tau(Statistic::Fermion).combine_mul(&other_size).is_err());
    }

    #[test]
    fn test_combine_products_componentwise() {
        let lat: GfMesh = MeshCycLat::from_dims(2, 2, 1).unwrap().into();
        let p = |s| GfMesh::Product(MeshProduct::new(vec![lat.clone(), tau(s)]).unwrap());
        let combined = p(Statistic::Fermion).combine_mul(&p(Statistic::Fermion)).unwrap();
        assert_eq!(combined, p(Statistic::Boson));
        assert!(p(Statistic::Fermion).combine_mul(&lat).is_err());
    }

    #[test]
    fn test_components_and_rank() {
        let single = tau(Statistic::Fermion);
        assert_eq!(single.rank(), 1);
        assert_eq!(single.components().len(), 1);
        assert_eq!(single.size_of_components(), vec![11]);

        let iw: GfMesh = MeshImFreq::new(10.0, Statistic::Fermion, 3).unwrap().into();
        let prod = GfMesh::Product(MeshProduct::new(vec![iw, single]).unwrap());
        assert_eq!(prod.rank(), 2);
        assert_eq!(prod.len(), 66);
        assert_eq!(prod.kinds(), vec![MeshKind::ImFreq, MeshKind::ImTime]);
        assert!(prod.as_mesh().is_none());
        assert!(prod.to_data_index(&MeshIndex::Int(0)).is_err());
    }

    #[test]
    fn test_copy_from_checks_kinds() {
        let mut m = tau(Statistic::Fermion);
        m.copy_from(&tau(Statistic::Boson)).unwrap();
        assert_eq!(m.statistic(), Some(Statistic::Boson));
        let iw: GfMesh = MeshImFreq::new(10.0, Statistic::Fermion, 3).unwrap().into();
        assert!(matches!(m.copy_from(&iw), Err(MeshError::KindMismatch { .. })));
    }

    #[test]
    fn test_adjoint() {
        let iw: GfMesh = MeshImFreq::new(10.0, Statistic::Fermion, 3).unwrap().into();
        assert_eq!(iw.adjoint().unwrap().kind(), MeshKind::ImTime);
        let leg: GfMesh = MeshLegendre::new(1.0, Statistic::Fermion, 3).unwrap().into();
        assert!(matches!(leg.adjoint(), Err(MeshError::NoAdjoint(MeshKind::Legendre))));
    }

    #[test]
    fn test_serde_roundtrip() {
        let iw: GfMesh = MeshImFreq::new(10.0, Statistic::Fermion, 3).unwrap().into();
        let json = serde_json::to_string(&iw).unwrap();
        let back: GfMesh = serde_json::from_str(&json).unwrap();
        assert_eq!(back, iw);
    }
}
