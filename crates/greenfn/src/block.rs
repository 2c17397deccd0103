//! Named collections of Green's functions sharing one mesh kind and target
//! rank.

use std::collections::{HashMap, HashSet};
use std::fmt;

use greenfn_mesh::GfMesh;
use log::debug;
use ndarray::Data;
use num_complex::Complex64;

use crate::arithmetic::Operand;
use crate::error::{GfError, Result};
use crate::gf::{Gf, GfBase};
use crate::indexing::{GfKey, GfValue};
use crate::lazy::LazyExpr;
use crate::scalar::Scalar;

/// Name of the key holding the ordered block names in a persisted mapping.
pub const BLOCK_NAMES_KEY: &str = "block_names";

/// Name of the key holding the collection name in a persisted mapping.
/// Block names cannot start with `__`, so it never clashes with a block.
pub const COLLECTION_NAME_KEY: &str = "__name";

const RESERVED_PREFIX: &str = "__";

/// Construction options for [`BlockGf`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockGfOptions {
    /// Name of the collection
    pub name: String,
    /// Rename every block to `"<name>_<block>"`
    pub rename_blocks: bool,
}

impl Default for BlockGfOptions {
    fn default() -> Self {
        Self {
            name: "G".to_string(),
            rename_blocks: true,
        }
    }
}

impl BlockGfOptions {
    /// Set the collection name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Enable or disable block renaming.
    pub fn with_rename_blocks(mut self, rename_blocks: bool) -> Self {
        self.rename_blocks = rename_blocks;
        self
    }
}

/// Right-hand operand of block arithmetic.
#[derive(Debug, Clone, Copy)]
pub enum BlockOperand<'a, A: Scalar> {
    /// Blockwise against a collection with the same names
    Block(&'a BlockGf<A>),
    /// Same scalar for every block
    Scalar(A),
    /// One scalar per block, in iteration order
    Sequence(&'a [A]),
}

impl<'a, A: Scalar> From<&'a BlockGf<A>> for BlockOperand<'a, A> {
    fn from(block: &'a BlockGf<A>) -> Self {
        BlockOperand::Block(block)
    }
}

impl<'a, A: Scalar> From<&'a [A]> for BlockOperand<'a, A> {
    fn from(values: &'a [A]) -> Self {
        BlockOperand::Sequence(values)
    }
}

impl<'a> From<f64> for BlockOperand<'a, f64> {
    fn from(x: f64) -> Self {
        BlockOperand::Scalar(x)
    }
}

impl<'a> From<f64> for BlockOperand<'a, Complex64> {
    fn from(x: f64) -> Self {
        BlockOperand::Scalar(Complex64::new(x, 0.0))
    }
}

impl<'a> From<Complex64> for BlockOperand<'a, Complex64> {
    fn from(z: Complex64) -> Self {
        BlockOperand::Scalar(z)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockOp {
    Add,
    Sub,
    Mul,
    Div,
}

/// Ordered, name-keyed collection of Green's functions.
///
/// Every block has the same mesh kind and target rank. Iteration follows
/// construction order, which copies preserve.
#[derive(Debug, Clone)]
pub struct BlockGf<A: Scalar = Complex64> {
    name: String,
    names: Vec<String>,
    blocks: Vec<Gf<A>>,
    positions: HashMap<String, usize>,
}

fn validate_names(names: &[String]) -> Result<HashMap<String, usize>> {
    let mut positions = HashMap::with_capacity(names.len());
    for (i, name) in names.iter().enumerate() {
        if name.is_empty() || name.starts_with(RESERVED_PREFIX) || name == BLOCK_NAMES_KEY {
            return Err(GfError::InvalidBlockName(name.clone()));
        }
        if positions.insert(name.clone(), i).is_some() {
            return Err(GfError::InvalidBlockName(name.clone()));
        }
    }
    Ok(positions)
}

fn validate_homogeneous<A: Scalar>(names: &[String], blocks: &[Gf<A>]) -> Result<()> {
    let first = &blocks[0];
    let (kinds, rank) = (first.mesh().kinds(), first.target_rank());
    for (name, block) in names.iter().zip(blocks) {
        if block.mesh().kinds() != kinds || block.target_rank() != rank {
            return Err(GfError::HeterogeneousBlocks {
                name: name.clone(),
                kinds: format!("{:?}", block.mesh().kinds()),
                target_rank: block.target_rank(),
                expected: format!("{kinds:?} with target rank {rank}"),
            });
        }
    }
    Ok(())
}

impl<A: Scalar> BlockGf<A> {
    /// Collection taking ownership of `blocks`, with default options.
    pub fn new<N: Into<String>>(
        names: impl IntoIterator<Item = N>,
        blocks: Vec<Gf<A>>,
    ) -> Result<Self> {
        Self::with_options(names, blocks, BlockGfOptions::default())
    }

    /// Collection with explicit options.
    ///
    /// Validates, in order: non-empty sequences of equal length, valid and
    /// unique names, then one mesh kind and target rank for all blocks.
    pub fn with_options<N: Into<String>>(
        names: impl IntoIterator<Item = N>,
        mut blocks: Vec<Gf<A>>,
        options: BlockGfOptions,
    ) -> Result<Self> {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        if blocks.is_empty() {
            return Err(GfError::StructureMismatch("empty list of blocks".to_string()));
        }
        if names.len() != blocks.len() {
            return Err(GfError::StructureMismatch(format!(
                "{} names for {} blocks",
                names.len(),
                blocks.len()
            )));
        }
        let positions = validate_names(&names)?;
        validate_homogeneous(&names, &blocks)?;

        if options.rename_blocks {
            for (name, block) in names.iter().zip(blocks.iter_mut()) {
                let label = if options.name.is_empty() {
                    name.clone()
                } else {
                    format!("{}_{}", options.name, name)
                };
                block.set_name(label);
            }
        }
        debug!(
            "built block Green's function '{}' with blocks {:?}",
            options.name, names
        );
        Ok(Self {
            name: options.name,
            names,
            blocks,
            positions,
        })
    }

    /// Blocks named `"0"`, `"1"`, ... in order.
    pub fn from_blocks(blocks: Vec<Gf<A>>) -> Result<Self> {
        let names: Vec<String> = (0..blocks.len()).map(|i| i.to_string()).collect();
        Self::new(names, blocks)
    }

    /// Collection of deep copies of `blocks`.
    pub fn from_copies<N, S>(names: impl IntoIterator<Item = N>, blocks: &[&GfBase<S>]) -> Result<Self>
    where
        N: Into<String>,
        S: Data<Elem = A>,
    {
        Self::new(names, blocks.iter().map(|g| g.copy()).collect())
    }

    /// Collection from `(name, block)` pairs.
    pub fn from_pairs<N: Into<String>>(pairs: impl IntoIterator<Item = (N, Gf<A>)>) -> Result<Self> {
        let (names, blocks): (Vec<String>, Vec<Gf<A>>) =
            pairs.into_iter().map(|(n, g)| (n.into(), g)).unzip();
        Self::new(names, blocks)
    }

    /// One zero block per `(name, size)` pair on `mesh`, each with target
    /// shape `[size; target_rank]` (scalar-valued when either is zero).
    pub fn from_structure(
        mesh: impl Into<GfMesh>,
        gf_struct: &[(&str, usize)],
        target_rank: usize,
    ) -> Result<Self> {
        let mesh = mesh.into();
        let blocks = gf_struct
            .iter()
            .map(|&(_, size)| {
                let shape = if size > 0 && target_rank > 0 {
                    vec![size; target_rank]
                } else {
                    Vec::new()
                };
                Gf::new(mesh.clone(), &shape)
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(gf_struct.iter().map(|&(name, _)| name), blocks)
    }

    /// Same names and collection name around new blocks.
    fn with_blocks<B: Scalar>(&self, blocks: Vec<Gf<B>>) -> BlockGf<B> {
        BlockGf {
            name: self.name.clone(),
            names: self.names.clone(),
            blocks,
            positions: self.positions.clone(),
        }
    }

    /// Collection name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of blocks.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Always false for a constructed collection.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Block names in iteration order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Position of `name` in iteration order.
    pub fn block_index(&self, name: &str) -> Option<usize> {
        self.positions.get(name).copied()
    }

    /// Mesh of the first block.
    pub fn mesh(&self) -> &GfMesh {
        self.blocks[0].mesh()
    }

    /// `(name, block)` pairs in iteration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Gf<A>)> {
        self.names.iter().map(String::as_str).zip(self.blocks.iter())
    }

    /// Mutable `(name, block)` pairs in iteration order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut Gf<A>)> {
        self.names.iter().map(String::as_str).zip(self.blocks.iter_mut())
    }

    fn unknown_block(&self, name: &str) -> GfError {
        GfError::InvalidKey(format!(
            "block '{name}' does not exist, possible names are {:?}",
            self.names
        ))
    }

    /// Block called `name`.
    pub fn get(&self, name: &str) -> Result<&Gf<A>> {
        match self.block_index(name) {
            Some(i) => Ok(&self.blocks[i]),
            None => Err(self.unknown_block(name)),
        }
    }

    /// Mutable block called `name`.
    pub fn get_mut(&mut self, name: &str) -> Result<&mut Gf<A>> {
        match self.block_index(name) {
            Some(i) => Ok(&mut self.blocks[i]),
            None => Err(self.unknown_block(name)),
        }
    }

    /// Write `value` into the whole named block (see [`GfBase::set`]).
    pub fn set<'v>(&mut self, name: &str, value: impl Into<GfValue<'v, A>>) -> Result<()> {
        self.get_mut(name)?.set(&GfKey::All, value)
    }

    /// Evaluate `expr` into every block. All blocks are evaluated before
    /// any is written.
    pub fn assign(&mut self, expr: LazyExpr<'_, A>) -> Result<()> {
        let staged = self
            .blocks
            .iter()
            .map(|block| {
                let mut working = block.copy();
                working.assign(expr.clone())?;
                Ok(working)
            })
            .collect::<Result<Vec<_>>>()?;
        self.write_back(&staged)
    }

    /// Copy every block of `other` into the block of the same name.
    pub fn assign_from(&mut self, other: &BlockGf<A>) -> Result<()> {
        self.copy_from(other)
    }

    fn write_back(&mut self, staged: &[Gf<A>]) -> Result<()> {
        for (block, value) in self.blocks.iter_mut().zip(staged) {
            block.copy_from(value)?;
        }
        Ok(())
    }

    /// Fail unless `other` has the same names and per-block data shapes.
    fn check_structure(&self, other: &BlockGf<A>) -> Result<()> {
        let mine: HashSet<&String> = self.names.iter().collect();
        let theirs: HashSet<&String> = other.names.iter().collect();
        if mine != theirs {
            return Err(GfError::StructureMismatch(format!(
                "block names {:?} vs {:?}",
                self.names, other.names
            )));
        }
        for (name, block) in self.iter() {
            let peer = other.get(name)?;
            if block.data().shape() != peer.data().shape() {
                return Err(GfError::StructureMismatch(format!(
                    "block '{name}' has shape {:?} vs {:?}",
                    block.data().shape(),
                    peer.data().shape()
                )));
            }
        }
        Ok(())
    }

    /// Deep copy; names and order are preserved.
    pub fn copy(&self) -> BlockGf<A> {
        self.with_blocks(self.blocks.iter().map(Gf::copy).collect())
    }

    /// Copy data and meshes from `other`, matching blocks by name.
    pub fn copy_from(&mut self, other: &BlockGf<A>) -> Result<()> {
        self.check_structure(other)?;
        let staged = self
            .names
            .iter()
            .map(|name| other.get(name).map(Gf::copy))
            .collect::<Result<Vec<_>>>()?;
        self.write_back(&staged)
    }

    /// Deep copy restricted to `selected`, in the order given.
    pub fn copy_selected_blocks(&self, selected: &[&str]) -> Result<BlockGf<A>> {
        let blocks = selected
            .iter()
            .map(|name| self.get(name).map(Gf::copy))
            .collect::<Result<Vec<_>>>()?;
        let options = BlockGfOptions::default()
            .with_name(self.name.clone())
            .with_rename_blocks(false);
        BlockGf::with_options(selected.iter().copied(), blocks, options)
    }

    /// Zero every block.
    pub fn zero(&mut self) {
        for block in &mut self.blocks {
            block.zero();
        }
    }

    /// Invert every block in place; nothing changes if any block is
    /// singular.
    pub fn invert(&mut self) -> Result<()> {
        let staged = self
            .blocks
            .iter()
            .map(|b| b.inverse())
            .collect::<Result<Vec<_>>>()?;
        self.write_back(&staged)
    }

    /// Blockwise inverse.
    pub fn inverse(&self) -> Result<BlockGf<A>> {
        self.try_map(|b| b.inverse())
    }

    /// Blockwise target transpose.
    pub fn transpose(&self) -> Result<BlockGf<A>> {
        self.try_map(|b| b.transpose())
    }

    /// Blockwise complex conjugate.
    pub fn conjugate(&self) -> BlockGf<A> {
        self.with_blocks(self.blocks.iter().map(|b| b.conjugate()).collect())
    }

    /// Blockwise negation.
    pub fn neg(&self) -> BlockGf<A> {
        self.with_blocks(self.blocks.iter().map(|b| b.neg()).collect())
    }

    /// Real part of every block.
    pub fn real(&self) -> BlockGf<f64> {
        self.with_blocks(self.blocks.iter().map(|b| b.real()).collect())
    }

    /// Imaginary part of every block.
    pub fn imag(&self) -> BlockGf<f64> {
        self.with_blocks(self.blocks.iter().map(|b| b.imag()).collect())
    }

    fn try_map(&self, f: impl Fn(&Gf<A>) -> Result<Gf<A>>) -> Result<BlockGf<A>> {
        let blocks = self.blocks.iter().map(f).collect::<Result<Vec<_>>>()?;
        Ok(self.with_blocks(blocks))
    }

    /// One container operand per block, in iteration order.
    fn operands<'o>(&self, rhs: BlockOperand<'o, A>) -> Result<Vec<Operand<'o, A>>> {
        match rhs {
            BlockOperand::Block(other) => {
                let mine: HashSet<&String> = self.names.iter().collect();
                let theirs: HashSet<&String> = other.names.iter().collect();
                if mine != theirs {
                    return Err(GfError::StructureMismatch(format!(
                        "block names {:?} vs {:?}",
                        self.names, other.names
                    )));
                }
                self.names
                    .iter()
                    .map(|name| other.get(name).map(Operand::from))
                    .collect()
            }
            BlockOperand::Scalar(s) => Ok(self.blocks.iter().map(|_| Operand::Scalar(s)).collect()),
            BlockOperand::Sequence(values) => {
                if values.len() != self.len() {
                    return Err(GfError::StructureMismatch(format!(
                        "{} values for {} blocks",
                        values.len(),
                        self.len()
                    )));
                }
                Ok(values.iter().map(|&s| Operand::Scalar(s)).collect())
            }
        }
    }

    fn binary(&self, rhs: BlockOperand<'_, A>, op: BlockOp) -> Result<BlockGf<A>> {
        let operands = self.operands(rhs)?;
        let blocks = self
            .blocks
            .iter()
            .zip(operands)
            .map(|(block, operand)| match op {
                BlockOp::Add => block.add(operand),
                BlockOp::Sub => block.sub(operand),
                BlockOp::Mul => block.mul(operand),
                BlockOp::Div => block.div(operand),
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(self.with_blocks(blocks))
    }

    /// Apply `op` to working copies of every block, then write all of them
    /// back, so a failure leaves the collection untouched.
    fn binary_in_place(&mut self, rhs: BlockOperand<'_, A>, op: BlockOp) -> Result<()> {
        let operands = self.operands(rhs)?;
        let staged = self
            .blocks
            .iter()
            .zip(operands)
            .map(|(block, operand)| {
                let mut working = block.copy();
                match op {
                    BlockOp::Add => working.add_assign(operand)?,
                    BlockOp::Sub => working.sub_assign(operand)?,
                    BlockOp::Mul => working.mul_assign(operand)?,
                    BlockOp::Div => working.div_assign(operand)?,
                }
                Ok(working)
            })
            .collect::<Result<Vec<_>>>()?;
        self.write_back(&staged)
    }

    /// Blockwise sum.
    pub fn add<'o>(&self, rhs: impl Into<BlockOperand<'o, A>>) -> Result<BlockGf<A>> {
        self.binary(rhs.into(), BlockOp::Add)
    }

    /// Blockwise difference.
    pub fn sub<'o>(&self, rhs: impl Into<BlockOperand<'o, A>>) -> Result<BlockGf<A>> {
        self.binary(rhs.into(), BlockOp::Sub)
    }

    /// Blockwise product.
    pub fn mul<'o>(&self, rhs: impl Into<BlockOperand<'o, A>>) -> Result<BlockGf<A>> {
        self.binary(rhs.into(), BlockOp::Mul)
    }

    /// Blockwise quotient.
    pub fn div<'o>(&self, rhs: impl Into<BlockOperand<'o, A>>) -> Result<BlockGf<A>> {
        self.binary(rhs.into(), BlockOp::Div)
    }

    /// `s - self`, blockwise.
    pub fn rsub_scalar(&self, s: A) -> Result<BlockGf<A>> {
        self.try_map(|b| b.rsub_scalar(s))
    }

    /// In-place blockwise sum; no block changes on failure.
    pub fn add_assign<'o>(&mut self, rhs: impl Into<BlockOperand<'o, A>>) -> Result<()> {
        self.binary_in_place(rhs.into(), BlockOp::Add)
    }

    /// In-place blockwise difference.
    pub fn sub_assign<'o>(&mut self, rhs: impl Into<BlockOperand<'o, A>>) -> Result<()> {
        self.binary_in_place(rhs.into(), BlockOp::Sub)
    }

    /// In-place blockwise product.
    pub fn mul_assign<'o>(&mut self, rhs: impl Into<BlockOperand<'o, A>>) -> Result<()> {
        self.binary_in_place(rhs.into(), BlockOp::Mul)
    }

    /// In-place blockwise quotient.
    pub fn div_assign<'o>(&mut self, rhs: impl Into<BlockOperand<'o, A>>) -> Result<()> {
        self.binary_in_place(rhs.into(), BlockOp::Div)
    }
}

impl<A: Scalar> PartialEq for BlockGf<A> {
    fn eq(&self, other: &Self) -> bool {
        self.names == other.names && self.blocks == other.blocks
    }
}

impl<A: Scalar> fmt::Display for BlockGf<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Green's function '{}' with blocks [", self.name)?;
        for (i, name) in self.names.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{name}")?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use greenfn_mesh::{MeshImFreq, MeshImTime, MeshReFreq, Statistic};
    use ndarray::Array;

    use crate::descriptors::iomega_n;

    fn tau(values: &[f64]) -> Gf<f64> {
        let mesh = MeshImTime::new(1.0, Statistic::Fermion, values.len()).unwrap();
        Gf::from_data(mesh, Array::from_vec(values.to_vec()).into_dyn()).unwrap()
    }

    fn up_down() -> BlockGf<f64> {
        BlockGf::new(["up", "down"], vec![tau(&[1.0, 2.0]), tau(&[3.0, 4.0])]).unwrap()
    }

    #[test]
    fn test_construction_and_renaming() {
        let g = up_down();
        assert_eq!(g.len(), 2);
        assert_eq!(g.name(), "G");
        assert_eq!(g.get("down").unwrap().name(), "G_down");
        assert_eq!(g.block_index("down"), Some(1));
        let names: Vec<&str> = g.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["up", "down"]);

        let kept = BlockGf::with_options(
            ["a"],
            vec![tau(&[1.0, 2.0]).with_name("mine")],
            BlockGfOptions::default().with_rename_blocks(false),
        )
        .unwrap();
        assert_eq!(kept.get("a").unwrap().name(), "mine");
    }

    #[test]
    fn test_rejects_bad_names() {
        for bad in ["", "__hidden", BLOCK_NAMES_KEY] {
            let err = BlockGf::new([bad], vec![tau(&[1.0, 2.0])]).unwrap_err();
            assert!(matches!(err, GfError::InvalidBlockName(_)));
        }
        let dup = BlockGf::new(["x", "x"], vec![tau(&[1.0, 2.0]), tau(&[1.0, 2.0])]);
        assert!(matches!(dup, Err(GfError::InvalidBlockName(_))));
    }

    #[test]
    fn test_rejects_bad_structure() {
        assert!(matches!(
            BlockGf::<f64>::new(Vec::<String>::new(), vec![]),
            Err(GfError::StructureMismatch(_))
        ));
        assert!(matches!(
            BlockGf::new(["a", "b"], vec![tau(&[1.0, 2.0])]),
            Err(GfError::StructureMismatch(_))
        ));
    }

    #[test]
    fn test_rejects_heterogeneous_blocks() {
        let freq = MeshReFreq::new(-1.0, 1.0, 2).unwrap();
        let other: Gf<f64> = Gf::new(freq, &[]).unwrap();
        assert!(matches!(
            BlockGf::new(["a", "b"], vec![tau(&[1.0, 2.0]), other]),
            Err(GfError::HeterogeneousBlocks { .. })
        ));

        let matrix: Gf<f64> = Gf::new(MeshImTime::new(1.0, Statistic::Fermion, 2).unwrap(), &[1, 1]).unwrap();
        assert!(matches!(
            BlockGf::new(["a", "b"], vec![tau(&[1.0, 2.0]), matrix]),
            Err(GfError::HeterogeneousBlocks { .. })
        ));
    }

    #[test]
    fn test_from_structure() {
        let mesh = MeshImFreq::new(5.0, Statistic::Fermion, 8).unwrap();
        let g: BlockGf = BlockGf::from_structure(mesh.clone(), &[("up", 2), ("down", 1)], 2).unwrap();
        assert_eq!(g.get("up").unwrap().target_shape(), &[2, 2]);
        assert_eq!(g.get("down").unwrap().target_shape(), &[1, 1]);
        assert_eq!(g.mesh(), &GfMesh::from(mesh.clone()));

        // a zero-sized block is scalar-valued and breaks homogeneity
        let mixed = BlockGf::<Complex64>::from_structure(mesh, &[("up", 2), ("down", 0)], 2);
        assert!(matches!(mixed, Err(GfError::HeterogeneousBlocks { .. })));
    }

    #[test]
    fn test_arithmetic() {
        let g = up_down();
        let doubled = g.add(&g).unwrap();
        assert_eq!(doubled.get("down").unwrap().data().as_slice().unwrap(), &[6.0, 8.0]);
        let shifted = g.sub([1.0, 2.0].as_slice()).unwrap();
        assert_eq!(shifted.get("up").unwrap().data().as_slice().unwrap(), &[0.0, 1.0]);
        assert_eq!(shifted.get("down").unwrap().data().as_slice().unwrap(), &[1.0, 2.0]);
        let scaled = g.mul(0.5).unwrap();
        assert_eq!(scaled.get("up").unwrap().data().as_slice().unwrap(), &[0.5, 1.0]);
        let ratio = g.div(&g).unwrap();
        assert!(ratio.iter().all(|(_, b)| b.data().iter().all(|&x| x == 1.0)));
        assert!(matches!(
            g.add([1.0].as_slice()),
            Err(GfError::StructureMismatch(_))
        ));
    }

    #[test]
    fn test_in_place_failure_leaves_blocks_untouched() {
        let mut g = up_down();
        let before = g.copy();
        let other = BlockGf::new(
            ["up", "down"],
            vec![tau(&[1.0, 1.0]), tau(&[1.0, 1.0, 1.0])],
        )
        .unwrap();
        assert!(g.add_assign(&other).is_err());
        assert_eq!(g, before);

        g.mul_assign(2.0).unwrap();
        assert_eq!(g.get("up").unwrap().data().as_slice().unwrap(), &[2.0, 4.0]);
    }

    #[test]
    fn test_copy_from_matches_by_name() {
        let mut g = up_down();
        let swapped = BlockGf::new(["down", "up"], vec![tau(&[7.0, 8.0]), tau(&[5.0, 6.0])]).unwrap();
        g.copy_from(&swapped).unwrap();
        assert_eq!(g.get("up").unwrap().data().as_slice().unwrap(), &[5.0, 6.0]);
        assert_eq!(g.names(), &["up".to_string(), "down".to_string()]);

        let other = BlockGf::new(["up", "left"], vec![tau(&[1.0, 1.0]), tau(&[1.0, 1.0])]).unwrap();
        assert!(matches!(g.copy_from(&other), Err(GfError::StructureMismatch(_))));
    }

    #[test]
    fn test_copy_selected_blocks() {
        let g = up_down();
        let only = g.copy_selected_blocks(&["down"]).unwrap();
        assert_eq!(only.len(), 1);
        assert_eq!(only.get("down").unwrap(), g.get("down").unwrap());
        assert!(g.copy_selected_blocks(&["left"]).is_err());
    }

    #[test]
    fn test_assign_expression_to_every_block() {
        let mesh = MeshImFreq::new(5.0, Statistic::Fermion, 4).unwrap();
        let mut g: BlockGf = BlockGf::from_structure(mesh, &[("up", 1), ("down", 1)], 2).unwrap();
        g.assign(iomega_n() + 1.0).unwrap();
        g.invert().unwrap();
        let up = g.get("up").unwrap();
        let down = g.get("down").unwrap();
        assert_eq!(up.data(), down.data());
        assert_eq!(up.name(), "G_up");
    }

    #[test]
    fn test_set_and_real_parts() {
        let mesh = MeshImFreq::new(5.0, Statistic::Fermion, 2).unwrap();
        let mut g: BlockGf = BlockGf::from_structure(mesh, &[("a", 1)], 0).unwrap();
        g.set("a", GfValue::Scalar(Complex64::new(1.0, -2.0))).unwrap();
        assert!(g.real().get("a").unwrap().data().iter().all(|&x| x == 1.0));
        assert!(g.imag().get("a").unwrap().data().iter().all(|&x| x == -2.0));
        assert!(g.conjugate().imag().get("a").unwrap().data().iter().all(|&x| x == 2.0));
        assert!(g.set("b", GfValue::Scalar(Complex64::new(0.0, 0.0))).is_err());
    }
}
