//! Plot series for external plotting tools.

use greenfn_mesh::{GfMesh, Mesh, MeshValue};
use ndarray::{Axis, Data, IxDyn};
use serde::Serialize;

use crate::block::BlockGf;
use crate::error::{GfError, Result};
use crate::gf::GfBase;
use crate::scalar::Scalar;

/// One curve: x values, y values and a legend label.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlotSeries {
    /// Abscissae, one per mesh point
    pub xdata: Vec<f64>,
    /// Ordinates
    pub ydata: Vec<f64>,
    /// Legend label
    pub label: String,
}

fn x_axis(mesh: &GfMesh) -> Result<Vec<f64>> {
    let axis: &dyn Mesh = match mesh {
        GfMesh::ImFreq(m) => m,
        GfMesh::ImTime(m) => m,
        GfMesh::ReFreq(m) => m,
        GfMesh::ReTime(m) => m,
        GfMesh::Legendre(m) => m,
        GfMesh::BrZone(_) | GfMesh::CycLat(_) | GfMesh::Product(_) => {
            return Err(GfError::NotSupported(format!(
                "plotting a function on {}",
                mesh.kind()
            )))
        }
    };
    Ok((0..axis.len())
        .map(|p| match axis.linear_to_value(p) {
            MeshValue::Complex(z) => z.im,
            MeshValue::Real(x) => x,
            MeshValue::Int(l) => l as f64,
            MeshValue::Vector(v) => v[0],
        })
        .collect())
}

fn label(name: &str, index: &[usize]) -> String {
    let name = if name.is_empty() { "G" } else { name };
    index
        .iter()
        .fold(name.to_string(), |acc, i| format!("{acc}_{i}"))
}

impl<A: Scalar, S: Data<Elem = A>> GfBase<S> {
    /// Real part of every target element against the mesh axis, followed
    /// by its imaginary part for complex containers.
    pub fn plot_series(&self) -> Result<Vec<PlotSeries>> {
        let xdata = x_axis(self.mesh())?;
        let mut series = Vec::new();
        for index in self.target_indices() {
            let values: Vec<A> = self
                .data()
                .axis_iter(Axis(0))
                .map(|row| row[IxDyn(&index)])
                .collect();
            let name = label(self.name(), &index);
            series.push(PlotSeries {
                xdata: xdata.clone(),
                ydata: values.iter().map(|v| v.real_f64()).collect(),
                label: format!("Re {name}"),
            });
            if A::IS_COMPLEX {
                series.push(PlotSeries {
                    xdata: xdata.clone(),
                    ydata: values.iter().map(|v| v.imag_f64()).collect(),
                    label: format!("Im {name}"),
                });
            }
        }
        Ok(series)
    }
}

impl<A: Scalar> BlockGf<A> {
    /// Series of every block, in block order.
    pub fn plot_series(&self) -> Result<Vec<PlotSeries>> {
        let mut series = Vec::new();
        for (_, block) in self.iter() {
            series.extend(block.plot_series()?);
        }
        Ok(series)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gf::Gf;
    use greenfn_mesh::{MeshBrZone, MeshImFreq, MeshLegendre, MeshReFreq, Statistic};
    use ndarray::Array;
    use num_complex::Complex64;
    use std::f64::consts::PI;

    #[test]
    fn test_imfreq_uses_imaginary_axis() {
        let mesh = MeshImFreq::new(1.0, Statistic::Fermion, 2).unwrap();
        let g: Gf = Gf::new(mesh, &[1, 1]).unwrap().with_name("G_up");
        let series = g.plot_series().unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].label, "Re G_up_0_0");
        assert_eq!(series[1].label, "Im G_up_0_0");
        approx::assert_abs_diff_eq!(series[0].xdata[2], PI, epsilon = 1e-12);
        approx::assert_abs_diff_eq!(series[0].xdata[0], -3.0 * PI, epsilon = 1e-12);
    }

    #[test]
    fn test_real_container_has_only_real_series() {
        let mesh = MeshReFreq::new(-1.0, 1.0, 3).unwrap();
        let data = Array::from_vec(vec![1.0, 2.0, 3.0]).into_dyn();
        let g = Gf::from_data(mesh, data).unwrap().with_name("A");
        let series = g.plot_series().unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].label, "Re A");
        assert_eq!(series[0].xdata, vec![-1.0, 0.0, 1.0]);
        assert_eq!(series[0].ydata, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_legendre_axis_is_order() {
        let mesh = MeshLegendre::new(1.0, Statistic::Fermion, 3).unwrap();
        let g: Gf<f64> = Gf::new(mesh, &[]).unwrap();
        assert_eq!(g.plot_series().unwrap()[0].xdata, vec![0.0, 1.0, 2.0]);
    }

    #[test]
    fn test_momentum_mesh_is_not_plotted() {
        let mesh = MeshBrZone::hypercubic(1, 4).unwrap();
        let g: Gf<Complex64> = Gf::new(mesh, &[]).unwrap();
        assert!(matches!(g.plot_series(), Err(GfError::NotSupported(_))));
    }

    #[test]
    fn test_block_series_follow_block_order() {
        let mesh = MeshReFreq::new(-1.0, 1.0, 3).unwrap();
        let g = BlockGf::<Complex64>::from_structure(mesh, &[("up", 1), ("down", 1)], 2).unwrap();
        let labels: Vec<String> = g
            .plot_series()
            .unwrap()
            .into_iter()
            .map(|s| s.label)
            .collect();
        assert_eq!(labels, vec!["Re G_up_0_0", "Im G_up_0_0", "Re G_down_0_0", "Im G_down_0_0"]);
    }
}
