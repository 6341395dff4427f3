// ─────────────────────────────────────────────────────────────────────
// MEWarpX-RS — Interp
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Linear / bilinear interpolation of node-centred grid data.

use mwx_types::error::{MwxError, MwxResult};
use mwx_types::grid::{DomainDescriptor, Geometry};
use ndarray::{Array1, ArrayView2, ArrayViewD, Ix1, Ix2};

/// Lower node index and weight of that node along one axis.
///
/// Clamps to the grid so that points on (or slightly past) the last node
/// still interpolate from the final cell.
fn lower_node_and_weight(coord: f64, lo: f64, spacing: f64, n_nodes: usize) -> (usize, f64) {
    let f = (coord - lo) / spacing;
    let i0 = (f.floor() as isize).clamp(0, n_nodes as isize - 2) as usize;
    let frac = (f - i0 as f64).clamp(0.0, 1.0);
    (i0, 1.0 - frac)
}

/// Interpolate `grid` (nodal values) at `coords`, shaped `[dim, n]` in the
/// domain's axis order. Supports 1D and 2D domains.
pub fn interpolate_from_grid(
    domain: &DomainDescriptor,
    coords: ArrayView2<f64>,
    grid: ArrayViewD<f64>,
) -> MwxResult<Array1<f64>> {
    let dim = domain.dim();
    if coords.nrows() != dim {
        return Err(MwxError::ShapeMismatch {
            what: "interpolation coordinates".to_string(),
            expected: vec![dim, coords.ncols()],
            got: coords.shape().to_vec(),
        });
    }
    let n = coords.ncols();

    match dim {
        1 => {
            let grid = grid
                .into_dimensionality::<Ix1>()
                .map_err(|e| MwxError::ConfigError(format!("1D grid expected: {e}")))?;
            if grid.len() < 2 {
                return Err(MwxError::ConfigError(
                    "Interpolation grid needs at least 2 nodes".to_string(),
                ));
            }
            Ok(Array1::from_shape_fn(n, |k| {
                let (i, w) = lower_node_and_weight(coords[[0, k]], domain.zmin, domain.dz, grid.len());
                grid[i] * w + grid[i + 1] * (1.0 - w)
            }))
        }
        2 => {
            let grid = grid
                .into_dimensionality::<Ix2>()
                .map_err(|e| MwxError::ConfigError(format!("2D grid expected: {e}")))?;
            let (n0, n1) = grid.dim();
            if n0 < 2 || n1 < 2 {
                return Err(MwxError::ConfigError(
                    "Interpolation grid needs at least 2 nodes per axis".to_string(),
                ));
            }
            let (lo0, d0) = match domain.geometry {
                Geometry::RZ => (
                    domain.rmin.unwrap_or(domain.xmin),
                    domain.dr.or(domain.dx).unwrap_or(1.0),
                ),
                _ => (domain.xmin, domain.dx.unwrap_or(1.0)),
            };
            Ok(Array1::from_shape_fn(n, |k| {
                let (i, wi) = lower_node_and_weight(coords[[0, k]], lo0, d0, n0);
                let (j, wj) = lower_node_and_weight(coords[[1, k]], domain.zmin, domain.dz, n1);
                grid[[i, j]] * wi * wj
                    + grid[[i + 1, j]] * (1.0 - wi) * wj
                    + grid[[i, j + 1]] * wi * (1.0 - wj)
                    + grid[[i + 1, j + 1]] * (1.0 - wi) * (1.0 - wj)
            }))
        }
        _ => Err(MwxError::NotImplemented(
            "XYZ interpolation".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array2, Array3};

    fn xz_domain() -> DomainDescriptor {
        DomainDescriptor::new(Geometry::XZ, &[0.0, 0.0], &[4.0, 10.0], &[4, 10]).unwrap()
    }

    #[test]
    fn test_exact_gridpoint() {
        let d = xz_domain();
        let field = Array2::from_shape_fn((5, 11), |(i, j)| (i * 100 + j) as f64);
        let coords = array![[2.0], [7.0]];
        let v = interpolate_from_grid(&d, coords.view(), field.view().into_dyn()).unwrap();
        assert!((v[0] - 207.0).abs() < 1e-10, "v = {}", v[0]);
    }

    #[test]
    fn test_bilinear_field_is_reproduced() {
        let d = xz_domain();
        // f(x, z) = 2x + 3z + 1
        let field = Array2::from_shape_fn((5, 11), |(i, j)| 2.0 * i as f64 + 3.0 * j as f64 + 1.0);
        let coords = array![[0.5, 3.25, 4.0], [9.9, 0.1, 10.0]];
        let v = interpolate_from_grid(&d, coords.view(), field.view().into_dyn()).unwrap();
        for k in 0..3 {
            let expected = 2.0 * coords[[0, k]] + 3.0 * coords[[1, k]] + 1.0;
            assert!((v[k] - expected).abs() < 1e-10, "k={k}: {} vs {expected}", v[k]);
        }
    }

    #[test]
    fn test_1d_linear() {
        let d = DomainDescriptor::new(Geometry::Z, &[0.0], &[1.0], &[10]).unwrap();
        let field = Array1::from_shape_fn(11, |j| j as f64 * 0.1);
        let coords = array![[0.35, 0.9]];
        let v = interpolate_from_grid(&d, coords.view(), field.view().into_dyn()).unwrap();
        assert!((v[0] - 0.35).abs() < 1e-12);
        assert!((v[1] - 0.9).abs() < 1e-12);
    }

    #[test]
    fn test_wrong_coordinate_count() {
        let d = xz_domain();
        let field = Array2::<f64>::zeros((5, 11));
        let coords = array![[1.0, 2.0]];
        let err = interpolate_from_grid(&d, coords.view(), field.view().into_dyn()).unwrap_err();
        assert!(matches!(err, MwxError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_3d_not_implemented() {
        let d = DomainDescriptor::new(Geometry::XYZ, &[0.0; 3], &[1.0; 3], &[2, 2, 2]).unwrap();
        let field = Array3::<f64>::zeros((3, 3, 3));
        let coords = Array2::<f64>::zeros((3, 1));
        let err = interpolate_from_grid(&d, coords.view(), field.view().into_dyn()).unwrap_err();
        assert!(matches!(err, MwxError::NotImplemented(_)));
    }
}
