//! Persistence mapping.
//!
//! Every persistable entity reduces to an [`ArchiveGroup`]: a scheme tag
//! plus a flat map of named values. A storage backend only has to persist
//! that map (it derives serde). Loading goes through a [`SchemeRegistry`],
//! which resolves the scheme tag to a builder and falls back to
//! compatibility rules for legacy tags.

use std::collections::{BTreeMap, HashMap};

use greenfn_mesh::{
    GfMesh, ImFreqOption, Mesh, MeshBrZone, MeshCycLat, MeshImFreq, MeshImTime, MeshKind,
    MeshLegendre, MeshProduct, MeshReFreq, MeshReTime, Statistic,
};
use log::{debug, warn};
use ndarray::{ArrayD, Axis, IxDyn};
use serde::{Deserialize, Serialize};

use crate::block::{BlockGf, BlockGfOptions, BLOCK_NAMES_KEY, COLLECTION_NAME_KEY};
use crate::error::{GfError, Result};
use crate::gf::Gf;
use crate::scalar::Scalar;

/// Reserved key of the mesh sub-group.
pub const MESH_KEY: &str = "mesh";

/// Reserved key of the data array.
pub const DATA_KEY: &str = "data";

/// Scheme tag of a persisted container.
pub const GF_SCHEME: &str = "Gf";

/// Scheme tag of a persisted block collection.
pub const BLOCK_GF_SCHEME: &str = "BlockGf";

/// Keys of old container layouts that carry nothing we still use.
const LEGACY_GF_KEYS: [&str; 2] = ["singularity", "indices"];

/// Dense array split into real and imaginary parts, row-major.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrayRecord {
    /// Array shape
    pub shape: Vec<usize>,
    /// Real parts
    pub real: Vec<f64>,
    /// Imaginary parts, absent for real data
    pub imag: Option<Vec<f64>>,
}

impl ArrayRecord {
    /// Record of `array`; the imaginary parts are kept for complex types only.
    pub fn from_array<A: Scalar>(array: &ArrayD<A>) -> Self {
        let real = array.iter().map(|x| x.real_f64()).collect();
        let imag = A::IS_COMPLEX.then(|| array.iter().map(|x| x.imag_f64()).collect());
        Self {
            shape: array.shape().to_vec(),
            real,
            imag,
        }
    }

    /// Rebuild the array. A real element type accepts complex records only
    /// when every imaginary part is zero.
    pub fn to_array<A: Scalar>(&self) -> Result<ArrayD<A>> {
        let expected = self
            .shape
            .iter()
            .try_fold(1usize, |acc, &d| acc.checked_mul(d))
            .ok_or_else(|| GfError::Archive(format!("array record shape {:?} overflows", self.shape)))?;
        if self.real.len() != expected || self.imag.as_ref().is_some_and(|im| im.len() != expected) {
            return Err(GfError::Archive(format!(
                "array record of shape {:?} holds {} values",
                self.shape,
                self.real.len()
            )));
        }
        let values = match &self.imag {
            None => self.real.iter().map(|&x| A::from_f64(x)).collect(),
            Some(imag) => self
                .real
                .iter()
                .zip(imag)
                .map(|(&re, &im)| {
                    A::from_complex(num_complex::Complex64::new(re, im)).ok_or_else(|| {
                        GfError::DtypeMismatch(format!(
                            "complex data cannot be read into a {} container",
                            A::DTYPE
                        ))
                    })
                })
                .collect::<Result<Vec<A>>>()?,
        };
        Ok(ArrayD::from_shape_vec(IxDyn(&self.shape), values)?)
    }
}

/// Value stored under a key of an [`ArchiveGroup`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ArchiveValue {
    /// Integer
    Int(i64),
    /// Floating-point number
    Float(f64),
    /// String
    Str(String),
    /// Integer list
    Ints(Vec<i64>),
    /// String list
    Strings(Vec<String>),
    /// Dense array
    Array(ArrayRecord),
    /// Nested group
    Group(ArchiveGroup),
}

/// Scheme-tagged flat mapping.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArchiveGroup {
    /// Scheme tag selecting the builder
    pub scheme: String,
    /// Values by key
    pub entries: BTreeMap<String, ArchiveValue>,
}

macro_rules! typed_getter {
    ($name:ident, $variant:ident, $ty:ty, $what:literal) => {
        #[doc = concat!("Entry under `key`, which must hold ", $what, ".")]
        pub fn $name(&self, key: &str) -> Result<&$ty> {
            match self.get(key)? {
                ArchiveValue::$variant(v) => Ok(v),
                other => Err(self.wrong_type(key, $what, other)),
            }
        }
    };
}

impl ArchiveGroup {
    /// Empty group tagged `scheme`.
    pub fn new(scheme: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into(),
            entries: BTreeMap::new(),
        }
    }

    /// Add or replace an entry.
    pub fn insert(&mut self, key: impl Into<String>, value: ArchiveValue) {
        self.entries.insert(key.into(), value);
    }

    /// Remove an entry, returning it.
    pub fn remove(&mut self, key: &str) -> Option<ArchiveValue> {
        self.entries.remove(key)
    }

    /// Whether `key` is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Entry under `key`; a missing key is an archive error.
    pub fn get(&self, key: &str) -> Result<&ArchiveValue> {
        self.entries.get(key).ok_or_else(|| {
            GfError::Archive(format!("key '{key}' missing from '{}' group", self.scheme))
        })
    }

    fn wrong_type(&self, key: &str, expected: &str, found: &ArchiveValue) -> GfError {
        GfError::Archive(format!(
            "key '{key}' of '{}' group should hold {expected}, found {found:?}",
            self.scheme
        ))
    }

    typed_getter!(get_int, Int, i64, "an integer");
    typed_getter!(get_float, Float, f64, "a float");
    typed_getter!(get_str, Str, String, "a string");
    typed_getter!(get_ints, Ints, Vec<i64>, "integers");
    typed_getter!(get_strings, Strings, Vec<String>, "strings");
    typed_getter!(get_array, Array, ArrayRecord, "an array");
    typed_getter!(get_group, Group, ArchiveGroup, "a group");

    fn get_usize(&self, key: &str) -> Result<usize> {
        let n = *self.get_int(key)?;
        usize::try_from(n)
            .map_err(|_| GfError::Archive(format!("key '{key}' holds negative size {n}")))
    }

    fn get_statistic(&self) -> Result<Statistic> {
        Ok(self.get_str("statistic")?.parse()?)
    }

    fn get_basis(&self, key: &str) -> Result<[[f64; 3]; 3]> {
        let record = self.get_array(key)?;
        if record.shape != [3, 3] {
            return Err(GfError::Archive(format!(
                "key '{key}' should hold a 3x3 basis, got shape {:?}",
                record.shape
            )));
        }
        let values = record.to_array::<f64>()?;
        let mut basis = [[0.0; 3]; 3];
        for ((i, j), x) in values.indexed_iter().map(|(ix, x)| ((ix[0], ix[1]), x)) {
            basis[i][j] = *x;
        }
        Ok(basis)
    }

    fn get_dims(&self, key: &str) -> Result<[usize; 3]> {
        let values = self.get_ints(key)?;
        match values.as_slice() {
            &[a, b, c] if a >= 0 && b >= 0 && c >= 0 => Ok([a as usize, b as usize, c as usize]),
            _ => Err(GfError::Archive(format!(
                "key '{key}' should hold three sizes, got {values:?}"
            ))),
        }
    }
}

fn basis_record(basis: &[[f64; 3]; 3]) -> ArchiveValue {
    ArchiveValue::Array(ArrayRecord {
        shape: vec![3, 3],
        real: basis.iter().flatten().copied().collect(),
        imag: None,
    })
}

fn dims_value(dims: [usize; 3]) -> ArchiveValue {
    ArchiveValue::Ints(dims.iter().map(|&d| d as i64).collect())
}

fn component_key(i: usize) -> String {
    format!("MeshComponent{i}")
}

/// An entity that reduces to and rebuilds from an [`ArchiveGroup`].
pub trait Archivable: Sized {
    /// Scheme tag written into the mapping.
    fn scheme(&self) -> String;

    /// Canonical mapping of the entity.
    fn reduce_to_mapping(&self) -> ArchiveGroup;

    /// Rebuild the entity from its mapping.
    fn build_from_mapping(group: &ArchiveGroup) -> Result<Self>;
}

impl Archivable for GfMesh {
    fn scheme(&self) -> String {
        self.kind().scheme().to_string()
    }

    fn reduce_to_mapping(&self) -> ArchiveGroup {
        let mut group = ArchiveGroup::new(self.scheme());
        match self {
            GfMesh::ImFreq(m) => {
                group.insert("beta", ArchiveValue::Float(m.beta()));
                group.insert("statistic", statistic_value(self.statistic()));
                group.insert("n_iw", ArchiveValue::Int(m.n_iw() as i64));
                group.insert("positive_freq_only", ArchiveValue::Int(m.positive_only() as i64));
            }
            GfMesh::ImTime(m) => {
                group.insert("beta", ArchiveValue::Float(m.beta()));
                group.insert("statistic", statistic_value(self.statistic()));
                group.insert("n_tau", ArchiveValue::Int(m.n_tau() as i64));
            }
            GfMesh::ReFreq(m) => {
                group.insert("omega_min", ArchiveValue::Float(m.omega_min()));
                group.insert("omega_max", ArchiveValue::Float(m.omega_max()));
                group.insert("n_w", ArchiveValue::Int(m.n_w() as i64));
            }
            GfMesh::ReTime(m) => {
                group.insert("t_min", ArchiveValue::Float(m.t_min()));
                group.insert("t_max", ArchiveValue::Float(m.t_max()));
                group.insert("n_t", ArchiveValue::Int(m.n_t() as i64));
            }
            GfMesh::Legendre(m) => {
                group.insert("beta", ArchiveValue::Float(m.beta()));
                group.insert("statistic", statistic_value(self.statistic()));
                group.insert("max_n", ArchiveValue::Int(m.max_n() as i64));
            }
            GfMesh::BrZone(m) => {
                group.insert("units", basis_record(m.units()));
                group.insert("dims", dims_value(m.dims()));
            }
            GfMesh::CycLat(m) => {
                group.insert("units", basis_record(m.units()));
                group.insert("dims", dims_value(m.dims()));
            }
            GfMesh::Product(p) => {
                for (i, component) in p.components().iter().enumerate() {
                    group.insert(component_key(i), ArchiveValue::Group(component.reduce_to_mapping()));
                }
            }
        }
        group
    }

    fn build_from_mapping(group: &ArchiveGroup) -> Result<Self> {
        let kind = MeshKind::from_scheme(&group.scheme)
            .ok_or_else(|| GfError::Archive(format!("unknown mesh scheme '{}'", group.scheme)))?;
        let mesh: GfMesh = match kind {
            MeshKind::ImFreq => {
                let option = if *group.get_int("positive_freq_only")? != 0 {
                    ImFreqOption::PositiveFrequenciesOnly
                } else {
                    ImFreqOption::AllFrequencies
                };
                MeshImFreq::with_option(
                    *group.get_float("beta")?,
                    group.get_statistic()?,
                    group.get_usize("n_iw")?,
                    option,
                )?
                .into()
            }
            MeshKind::ImTime => MeshImTime::new(
                *group.get_float("beta")?,
                group.get_statistic()?,
                group.get_usize("n_tau")?,
            )?
            .into(),
            MeshKind::ReFreq => MeshReFreq::new(
                *group.get_float("omega_min")?,
                *group.get_float("omega_max")?,
                group.get_usize("n_w")?,
            )?
            .into(),
            MeshKind::ReTime => MeshReTime::new(
                *group.get_float("t_min")?,
                *group.get_float("t_max")?,
                group.get_usize("n_t")?,
            )?
            .into(),
            MeshKind::Legendre => MeshLegendre::new(
                *group.get_float("beta")?,
                group.get_statistic()?,
                group.get_usize("max_n")?,
            )?
            .into(),
            MeshKind::BrZone => {
                MeshBrZone::new(group.get_basis("units")?, group.get_dims("dims")?)?.into()
            }
            MeshKind::CycLat => {
                MeshCycLat::new(group.get_basis("units")?, group.get_dims("dims")?)?.into()
            }
            MeshKind::Product => {
                let mut components = Vec::new();
                while let Some(value) = group.entries.get(&component_key(components.len())) {
                    let ArchiveValue::Group(sub) = value else {
                        return Err(group.wrong_type(
                            &component_key(components.len()),
                            "a group",
                            value,
                        ));
                    };
                    components.push(GfMesh::build_from_mapping(sub)?);
                }
                MeshProduct::new(components)?.into()
            }
        };
        Ok(mesh)
    }
}

fn statistic_value(statistic: Option<Statistic>) -> ArchiveValue {
    let statistic = statistic.unwrap_or(Statistic::Fermion);
    ArchiveValue::Str(statistic.to_string())
}

macro_rules! impl_archivable_mesh {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl Archivable for $ty {
                fn scheme(&self) -> String {
                    MeshKind::$variant.scheme().to_string()
                }

                fn reduce_to_mapping(&self) -> ArchiveGroup {
                    GfMesh::from(self.clone()).reduce_to_mapping()
                }

                fn build_from_mapping(group: &ArchiveGroup) -> Result<Self> {
                    match GfMesh::build_from_mapping(group)? {
                        GfMesh::$variant(mesh) => Ok(mesh),
                        other => Err(GfError::Archive(format!(
                            "expected a {} group, found {}",
                            MeshKind::$variant.scheme(),
                            other.kind()
                        ))),
                    }
                }
            }
        )*
    };
}

impl_archivable_mesh!(
    MeshImFreq => ImFreq,
    MeshImTime => ImTime,
    MeshReFreq => ReFreq,
    MeshReTime => ReTime,
    MeshLegendre => Legendre,
    MeshBrZone => BrZone,
    MeshCycLat => CycLat,
    MeshProduct => Product,
);

/// Expand a function stored on non-negative Matsubara frequencies to the
/// full mesh using `g(-iω_n) = conj(g(iω_n))`.
fn unfold_positive_frequencies<A: Scalar>(gf: Gf<A>) -> Result<Gf<A>> {
    let GfMesh::ImFreq(mesh) = gf.mesh() else {
        return Ok(gf);
    };
    if !mesh.positive_only() {
        return Ok(gf);
    }
    let statistic = Mesh::statistic(mesh).unwrap_or(Statistic::Fermion);
    let full = MeshImFreq::new(mesh.beta(), statistic, mesh.n_iw())?;
    debug!("unfolding positive-frequency data onto {full}");
    let mut out = Gf::<A>::new(full.clone(), gf.target_shape())?.with_name(gf.name());
    for p in 0..full.len() {
        let n = full.first_index() + p as i64;
        let mirrored = match statistic {
            Statistic::Fermion => -n - 1,
            Statistic::Boson => -n,
        };
        let (source, conjugate) = if n >= 0 { (n, false) } else { (mirrored, true) };
        let row = gf.data().index_axis(Axis(0), source as usize);
        let mut slot = out.data_mut().index_axis_move(Axis(0), p);
        if conjugate {
            slot.zip_mut_with(&row, |d, &s| *d = s.conjugate());
        } else {
            slot.assign(&row);
        }
    }
    Ok(out)
}

impl<A: Scalar> Archivable for Gf<A> {
    fn scheme(&self) -> String {
        GF_SCHEME.to_string()
    }

    fn reduce_to_mapping(&self) -> ArchiveGroup {
        let mut group = ArchiveGroup::new(GF_SCHEME);
        group.insert(MESH_KEY, ArchiveValue::Group(self.mesh().reduce_to_mapping()));
        group.insert(DATA_KEY, ArchiveValue::Array(ArrayRecord::from_array(self.data())));
        group
    }

    fn build_from_mapping(group: &ArchiveGroup) -> Result<Self> {
        for key in LEGACY_GF_KEYS {
            if group.contains_key(key) {
                debug!("ignoring legacy key '{key}' of '{}' group", group.scheme);
            }
        }
        let mesh = GfMesh::build_from_mapping(group.get_group(MESH_KEY)?)?;
        let data = group.get_array(DATA_KEY)?.to_array::<A>()?;
        unfold_positive_frequencies(Gf::from_data(mesh, data)?)
    }
}

impl<A: Scalar> Archivable for BlockGf<A> {
    fn scheme(&self) -> String {
        BLOCK_GF_SCHEME.to_string()
    }

    fn reduce_to_mapping(&self) -> ArchiveGroup {
        let mut group = ArchiveGroup::new(BLOCK_GF_SCHEME);
        group.insert(BLOCK_NAMES_KEY, ArchiveValue::Strings(self.names().to_vec()));
        group.insert(COLLECTION_NAME_KEY, ArchiveValue::Str(self.name().to_string()));
        for (name, block) in self.iter() {
            group.insert(name, ArchiveValue::Group(block.reduce_to_mapping()));
        }
        group
    }

    fn build_from_mapping(group: &ArchiveGroup) -> Result<Self> {
        let names = group.get_strings(BLOCK_NAMES_KEY)?;
        let blocks = names
            .iter()
            .map(|name| Gf::build_from_mapping(group.get_group(name)?))
            .collect::<Result<Vec<_>>>()?;
        let mut options = BlockGfOptions::default();
        if group.contains_key(COLLECTION_NAME_KEY) {
            options = options.with_name(group.get_str(COLLECTION_NAME_KEY)?.as_str());
        }
        BlockGf::with_options(names.iter().cloned(), blocks, options)
    }
}

/// Entity rebuilt by a [`SchemeRegistry`].
#[derive(Debug, Clone)]
pub enum Archived<A: Scalar> {
    /// A mesh
    Mesh(GfMesh),
    /// A container
    Gf(Gf<A>),
    /// A block collection
    BlockGf(BlockGf<A>),
}

impl<A: Scalar> Archived<A> {
    /// Mapping of the wrapped entity.
    pub fn reduce_to_mapping(&self) -> ArchiveGroup {
        match self {
            Archived::Mesh(m) => m.reduce_to_mapping(),
            Archived::Gf(g) => g.reduce_to_mapping(),
            Archived::BlockGf(b) => b.reduce_to_mapping(),
        }
    }
}

/// Builder for one scheme tag.
pub type Builder<A> = fn(&ArchiveGroup) -> Result<Archived<A>>;

/// Matcher of legacy scheme tags. On a match it returns the scheme to load
/// with and scheme hints for sub-groups that lack one.
pub type CompatMatcher = fn(&str) -> Option<(String, BTreeMap<String, String>)>;

fn build_mesh<A: Scalar>(group: &ArchiveGroup) -> Result<Archived<A>> {
    GfMesh::build_from_mapping(group).map(Archived::Mesh)
}

fn build_gf<A: Scalar>(group: &ArchiveGroup) -> Result<Archived<A>> {
    Gf::build_from_mapping(group).map(Archived::Gf)
}

fn build_block_gf<A: Scalar>(group: &ArchiveGroup) -> Result<Archived<A>> {
    BlockGf::build_from_mapping(group).map(Archived::BlockGf)
}

/// Resolve `GfImFreq`, `GfReTime_s`, `GfLegendreTv4`, ... to the current
/// container scheme, hinting the mesh scheme from the old tag.
pub fn legacy_gf_scheme(scheme: &str) -> Option<(String, BTreeMap<String, String>)> {
    let rest = scheme.strip_prefix("Gf")?;
    let mesh = ["_s", "Tv3", "Tv4"]
        .iter()
        .find_map(|suffix| rest.strip_suffix(suffix))
        .unwrap_or(rest);
    let mesh_scheme = format!("Mesh{mesh}");
    match MeshKind::from_scheme(&mesh_scheme) {
        Some(MeshKind::ImFreq | MeshKind::ImTime | MeshKind::Legendre | MeshKind::ReFreq | MeshKind::ReTime) => {
            let hints = BTreeMap::from([(MESH_KEY.to_string(), mesh_scheme)]);
            Some((GF_SCHEME.to_string(), hints))
        }
        _ => None,
    }
}

/// Lookup table from scheme tag to builder, with compatibility matchers
/// tried in registration order for unknown tags.
pub struct SchemeRegistry<A: Scalar> {
    builders: HashMap<String, Builder<A>>,
    compat: Vec<CompatMatcher>,
}

impl<A: Scalar> SchemeRegistry<A> {
    /// Registry with no builders.
    pub fn new() -> Self {
        Self {
            builders: HashMap::new(),
            compat: Vec::new(),
        }
    }

    /// Builders for every mesh scheme, `Gf` and `BlockGf`, plus the legacy
    /// container matcher.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for kind in MeshKind::ALL {
            registry.register(kind.scheme(), build_mesh::<A>);
        }
        registry.register(GF_SCHEME, build_gf::<A>);
        registry.register(BLOCK_GF_SCHEME, build_block_gf::<A>);
        registry.register_compat(legacy_gf_scheme);
        registry
    }

    /// Add or replace the builder for `scheme`.
    pub fn register(&mut self, scheme: impl Into<String>, builder: Builder<A>) {
        self.builders.insert(scheme.into(), builder);
    }

    /// Append a matcher for unknown scheme tags.
    pub fn register_compat(&mut self, matcher: CompatMatcher) {
        self.compat.push(matcher);
    }

    /// Whether a builder is registered for `scheme`.
    pub fn contains(&self, scheme: &str) -> bool {
        self.builders.contains_key(scheme)
    }

    /// Rebuild the entity stored in `group`.
    pub fn load(&self, group: &ArchiveGroup) -> Result<Archived<A>> {
        if let Some(builder) = self.builders.get(&group.scheme) {
            return builder(group);
        }
        for matcher in &self.compat {
            let Some((scheme, hints)) = matcher(&group.scheme) else {
                continue;
            };
            let Some(builder) = self.builders.get(&scheme) else {
                continue;
            };
            warn!(
                "reading '{}' group with the '{scheme}' builder for backward compatibility",
                group.scheme
            );
            let upgraded = upgrade_group(group, &scheme, &hints);
            return builder(&upgraded);
        }
        Err(GfError::Archive(format!("unknown scheme '{}'", group.scheme)))
    }
}

impl<A: Scalar> Default for SchemeRegistry<A> {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Copy of `group` retagged with `scheme`; sub-groups named in `hints`
/// get the hinted scheme when they have none.
fn upgrade_group(group: &ArchiveGroup, scheme: &str, hints: &BTreeMap<String, String>) -> ArchiveGroup {
    let mut upgraded = group.clone();
    upgraded.scheme = scheme.to_string();
    for (key, hint) in hints {
        if let Some(ArchiveValue::Group(sub)) = upgraded.entries.get_mut(key) {
            if sub.scheme.is_empty() {
                sub.scheme = hint.clone();
            }
        }
    }
    upgraded
}

#[cfg(test)]
mod tests {
    use super::*;
    use greenfn_mesh::MeshIndex;
    use ndarray::Array;
    use num_complex::Complex64;

    fn all_meshes() -> Vec<GfMesh> {
        let iw = MeshImFreq::new(4.0, Statistic::Boson, 3).unwrap();
        let tau = MeshImTime::new(4.0, Statistic::Fermion, 7).unwrap();
        vec![
            iw.clone().into(),
            MeshImFreq::with_option(2.0, Statistic::Fermion, 2, ImFreqOption::PositiveFrequenciesOnly)
                .unwrap()
                .into(),
            tau.clone().into(),
            MeshReFreq::new(-3.0, 3.0, 11).unwrap().into(),
            MeshReTime::new(0.0, 5.0, 6).unwrap().into(),
            MeshLegendre::new(4.0, Statistic::Fermion, 10).unwrap().into(),
            MeshBrZone::hypercubic(2, 4).unwrap().into(),
            MeshCycLat::from_dims(2, 3, 1).unwrap().into(),
            MeshProduct::new(vec![iw.into(), tau.into()]).unwrap().into(),
        ]
    }

    #[test]
    fn test_mesh_mappings_rebuild_equal_meshes() {
        for mesh in all_meshes() {
            let group = mesh.reduce_to_mapping();
            assert_eq!(group.scheme, mesh.kind().scheme());
            assert_eq!(GfMesh::build_from_mapping(&group).unwrap(), mesh);
        }
    }

    #[test]
    fn test_concrete_mesh_builder_checks_kind() {
        let tau = MeshImTime::new(1.0, Statistic::Boson, 3).unwrap();
        let group = tau.reduce_to_mapping();
        assert_eq!(MeshImTime::build_from_mapping(&group).unwrap(), tau);
        assert!(MeshReFreq::build_from_mapping(&group).is_err());
    }

    #[test]
    fn test_gf_mapping_has_reserved_keys() {
        let mesh = MeshImTime::new(1.0, Statistic::Fermion, 3).unwrap();
        let data = Array::from_shape_fn(IxDyn(&[3, 2]), |i| Complex64::new(i[0] as f64, i[1] as f64));
        let g = Gf::from_data(mesh, data).unwrap();
        let group = g.reduce_to_mapping();
        assert!(group.contains_key(MESH_KEY));
        assert!(group.contains_key(DATA_KEY));
        assert_eq!(Gf::<Complex64>::build_from_mapping(&group).unwrap(), g);
        assert!(matches!(
            Gf::<f64>::build_from_mapping(&group),
            Err(GfError::DtypeMismatch(_))
        ));
    }

    #[test]
    fn test_block_mapping_keeps_order() {
        let mesh = MeshReFreq::new(-1.0, 1.0, 3).unwrap();
        let blocks = vec![Gf::<f64>::new(mesh.clone(), &[1]).unwrap(), Gf::new(mesh, &[1]).unwrap()];
        let g = BlockGf::new(["up", "down"], blocks).unwrap();
        let group = g.reduce_to_mapping();
        assert_eq!(
            group.get_strings(BLOCK_NAMES_KEY).unwrap(),
            &vec!["up".to_string(), "down".to_string()]
        );
        let back = BlockGf::<f64>::build_from_mapping(&group).unwrap();
        assert_eq!(back, g);
        assert_eq!(back.get("down").unwrap().name(), "G_down");
    }

    #[test]
    fn test_block_mapping_keeps_collection_name() {
        let mesh = MeshReFreq::new(-1.0, 1.0, 3).unwrap();
        let blocks = vec![Gf::<f64>::new(mesh.clone(), &[1]).unwrap(), Gf::new(mesh, &[1]).unwrap()];
        let options = BlockGfOptions::default().with_name("Sigma");
        let g = BlockGf::with_options(["up", "down"], blocks, options).unwrap();
        let mut group = g.reduce_to_mapping();

        let back = BlockGf::<f64>::build_from_mapping(&group).unwrap();
        assert_eq!(back.name(), "Sigma");
        assert_eq!(back.get("up").unwrap().name(), "Sigma_up");

        group.remove(COLLECTION_NAME_KEY);
        let unnamed = BlockGf::<f64>::build_from_mapping(&group).unwrap();
        assert_eq!(unnamed.name(), "G");
    }

    #[test]
    fn test_malformed_basis_is_an_error() {
        let mut group = MeshCycLat::from_dims(2, 2, 1).unwrap().reduce_to_mapping();
        group.insert(
            "units",
            ArchiveValue::Array(ArrayRecord {
                shape: vec![3, 3],
                real: vec![1.0; 12],
                imag: None,
            }),
        );
        assert!(matches!(
            GfMesh::build_from_mapping(&group),
            Err(GfError::Archive(_))
        ));

        let overflowing = ArrayRecord {
            shape: vec![usize::MAX, 2],
            real: vec![],
            imag: None,
        };
        assert!(matches!(overflowing.to_array::<f64>(), Err(GfError::Archive(_))));
    }

    #[test]
    fn test_missing_block_is_an_error() {
        let mut group = ArchiveGroup::new(BLOCK_GF_SCHEME);
        group.insert(BLOCK_NAMES_KEY, ArchiveValue::Strings(vec!["up".to_string()]));
        assert!(matches!(
            BlockGf::<f64>::build_from_mapping(&group),
            Err(GfError::Archive(_))
        ));
    }

    #[test]
    fn test_legacy_scheme_matcher() {
        let (scheme, hints) = legacy_gf_scheme("GfImFreq_s").unwrap();
        assert_eq!(scheme, GF_SCHEME);
        assert_eq!(hints[MESH_KEY], "MeshImFreq");
        assert_eq!(legacy_gf_scheme("GfLegendreTv4").unwrap().1[MESH_KEY], "MeshLegendre");
        assert_eq!(legacy_gf_scheme("GfReTime").unwrap().1[MESH_KEY], "MeshReTime");
        assert!(legacy_gf_scheme("GfBrZone").is_none());
        assert!(legacy_gf_scheme("Foo").is_none());
    }

    #[test]
    fn test_registry_upgrades_legacy_groups() {
        let mesh = MeshImTime::new(1.0, Statistic::Fermion, 2).unwrap();
        let g = Gf::from_data(mesh, Array::from_vec(vec![1.0, 2.0]).into_dyn()).unwrap();
        let mut group = g.reduce_to_mapping();
        group.scheme = "GfImTimeTv3".to_string();
        group.insert("singularity", ArchiveValue::Int(0));
        group.insert("indices", ArchiveValue::Strings(vec!["0".to_string()]));
        if let Some(ArchiveValue::Group(sub)) = group.entries.get_mut(MESH_KEY) {
            sub.scheme.clear();
        }

        let registry = SchemeRegistry::<f64>::with_defaults();
        match registry.load(&group).unwrap() {
            Archived::Gf(loaded) => assert_eq!(loaded, g),
            other => panic!("expected a container, got {other:?}"),
        }

        group.scheme = "Unknown".to_string();
        assert!(matches!(registry.load(&group), Err(GfError::Archive(_))));
    }

    #[test]
    fn test_registry_dispatches_meshes_and_blocks() {
        let registry = SchemeRegistry::<Complex64>::default();
        for mesh in all_meshes() {
            assert!(registry.contains(mesh.kind().scheme()));
            assert!(matches!(
                registry.load(&mesh.reduce_to_mapping()),
                Ok(Archived::Mesh(m)) if m == mesh
            ));
        }
    }

    #[test]
    fn test_positive_only_data_is_unfolded() {
        let mesh = MeshImFreq::with_option(1.0, Statistic::Fermion, 2, ImFreqOption::PositiveFrequenciesOnly)
            .unwrap();
        let data = Array::from_vec(vec![Complex64::new(1.0, 2.0), Complex64::new(3.0, 4.0)]).into_dyn();
        let g = Gf::from_data(mesh, data).unwrap();
        let full = Gf::<Complex64>::build_from_mapping(&g.reduce_to_mapping()).unwrap();
        assert_eq!(full.mesh().len(), 4);
        assert_eq!(full.at(&[MeshIndex::Int(1)]).unwrap().iter().next(), Some(&Complex64::new(3.0, 4.0)));
        assert_eq!(full.at(&[MeshIndex::Int(-1)]).unwrap().iter().next(), Some(&Complex64::new(1.0, -2.0)));
        assert_eq!(full.at(&[MeshIndex::Int(-2)]).unwrap().iter().next(), Some(&Complex64::new(3.0, -4.0)));
    }

    #[test]
    fn test_group_survives_json() {
        let mesh = MeshImFreq::new(3.0, Statistic::Fermion, 2).unwrap();
        let g: Gf = Gf::new(mesh, &[1, 1]).unwrap();
        let group = g.reduce_to_mapping();
        let text = serde_json::to_string(&group).unwrap();
        let back: ArchiveGroup = serde_json::from_str(&text).unwrap();
        assert_eq!(back, group);
    }
}
