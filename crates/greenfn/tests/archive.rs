use greenfn::archive::{Archivable, ArchiveGroup, Archived, SchemeRegistry};
use greenfn::descriptors::iomega_n;
use greenfn::{BlockGf, Gf};
use greenfn_mesh::{MeshImFreq, MeshImTime, MeshProduct, Statistic};
use num_complex::Complex64;

#[test]
fn test_block_gf_survives_json() -> anyhow::Result<()> {
    let mesh = MeshImFreq::new(4.0, Statistic::Fermion, 8)?;
    let mut g = BlockGf::<Complex64>::from_structure(mesh, &[("up", 2), ("down", 1)], 2)?;
    g.assign(iomega_n::<Complex64>() + 0.25)?;
    g.invert()?;

    let text = serde_json::to_string(&g.reduce_to_mapping())?;
    let group: ArchiveGroup = serde_json::from_str(&text)?;
    let registry = SchemeRegistry::<Complex64>::with_defaults();
    match registry.load(&group)? {
        Archived::BlockGf(loaded) => {
            assert_eq!(loaded.names(), ["up", "down"]);
            for ((_, a), (_, b)) in loaded.iter().zip(g.iter()) {
                assert!(a.abs_diff_eq(b, 1e-12));
            }
        }
        other => panic!("expected a block collection, got {other:?}"),
    }
    Ok(())
}

#[test]
fn test_product_mesh_container_survives_json() -> anyhow::Result<()> {
    let mesh = MeshProduct::new(vec![
        MeshImFreq::new(2.0, Statistic::Boson, 3)?.into(),
        MeshImTime::new(2.0, Statistic::Fermion, 4)?.into(),
    ])?;
    let mut g: Gf<f64> = Gf::new(mesh, &[2])?;
    for (i, x) in g.data_mut().iter_mut().enumerate() {
        *x = i as f64 * 0.5;
    }

    let text = serde_json::to_string(&g.reduce_to_mapping())?;
    let group: ArchiveGroup = serde_json::from_str(&text)?;
    assert_eq!(Gf::<f64>::build_from_mapping(&group)?, g);
    Ok(())
}
