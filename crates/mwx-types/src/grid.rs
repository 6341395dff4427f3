// ─────────────────────────────────────────────────────────────────────
// MEWarpX-RS — Domain Descriptor
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Simulation domain: geometry, extents, spacings and face boundary slots.
//!
//! Axis naming follows the engine: in 2D Cartesian runs the grid's second
//! axis is `z`, and in RZ runs `x`, `y` and `r` all alias the radial axis.

use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::error::{MwxError, MwxResult};
use crate::time::TimeValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Geometry {
    Z,
    XZ,
    RZ,
    XYZ,
}

impl Geometry {
    pub fn as_str(&self) -> &'static str {
        match self {
            Geometry::Z => "Z",
            Geometry::XZ => "XZ",
            Geometry::RZ => "RZ",
            Geometry::XYZ => "XYZ",
        }
    }

    pub fn dim(&self) -> usize {
        match self {
            Geometry::Z => 1,
            Geometry::XZ | Geometry::RZ => 2,
            Geometry::XYZ => 3,
        }
    }

    /// Index of a named axis in the engine's coordinate arrays.
    pub fn axis_index(&self, axis: &str) -> Option<usize> {
        match (self, axis) {
            (Geometry::Z, "z") => Some(0),
            (Geometry::XZ, "x") | (Geometry::RZ, "r") => Some(0),
            (Geometry::XZ, "z") | (Geometry::RZ, "z") => Some(1),
            (Geometry::XYZ, "x") => Some(0),
            (Geometry::XYZ, "y") => Some(1),
            (Geometry::XYZ, "z") => Some(2),
            _ => None,
        }
    }
}

impl fmt::Display for Geometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Geometry {
    type Err = MwxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Z" => Ok(Geometry::Z),
            "XZ" => Ok(Geometry::XZ),
            "RZ" => Ok(Geometry::RZ),
            "XYZ" => Ok(Geometry::XYZ),
            other => Err(MwxError::ConfigError(format!(
                "Unknown geometry '{other}', expected one of Z, XZ, RZ, XYZ"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldBoundary {
    Periodic,
    Dirichlet,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticleBoundary {
    Periodic,
    Absorbing,
    Reflecting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Min,
    Max,
}

/// Field and particle boundary conditions, one entry per axis.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryConditions {
    pub fields_min: Vec<FieldBoundary>,
    pub fields_max: Vec<FieldBoundary>,
    pub particles_min: Vec<ParticleBoundary>,
    pub particles_max: Vec<ParticleBoundary>,
}

impl BoundaryConditions {
    /// Periodic transverse axes for Cartesian runs, open/absorbing radial
    /// axis for RZ; the z axis is always Dirichlet/absorbing.
    pub fn default_for(geometry: Geometry) -> Self {
        let transverse = geometry.dim() - 1;
        let (mut fields, mut particles) = if geometry == Geometry::RZ {
            (
                vec![FieldBoundary::None; transverse],
                vec![ParticleBoundary::Absorbing; transverse],
            )
        } else {
            (
                vec![FieldBoundary::Periodic; transverse],
                vec![ParticleBoundary::Periodic; transverse],
            )
        };
        fields.push(FieldBoundary::Dirichlet);
        particles.push(ParticleBoundary::Absorbing);

        BoundaryConditions {
            fields_min: fields.clone(),
            fields_max: fields,
            particles_min: particles.clone(),
            particles_max: particles,
        }
    }
}

/// Boundary-potential slot for each domain face. `None` means the engine
/// default (grounded) or that a solver has taken ownership of the face.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FacePotentials {
    pub xmin: Option<TimeValue>,
    pub xmax: Option<TimeValue>,
    pub ymin: Option<TimeValue>,
    pub ymax: Option<TimeValue>,
    pub zmin: Option<TimeValue>,
    pub zmax: Option<TimeValue>,
}

impl FacePotentials {
    pub fn clear(&mut self) {
        *self = FacePotentials::default();
    }
}

/// Grid and domain description shared by the setup layer and the solvers.
#[derive(Debug, Clone)]
pub struct DomainDescriptor {
    pub geometry: Geometry,
    pub xmin: f64,
    pub xmax: f64,
    pub ymin: f64,
    pub ymax: f64,
    pub zmin: f64,
    pub zmax: f64,
    pub rmin: Option<f64>,
    pub rmax: Option<f64>,
    pub nx: usize,
    pub ny: usize,
    pub nz: usize,
    pub nr: Option<usize>,
    pub dx: Option<f64>,
    pub dy: Option<f64>,
    pub dz: f64,
    pub dr: Option<f64>,
    pub boundary_conditions: BoundaryConditions,
    pub potentials: FacePotentials,
}

impl DomainDescriptor {
    /// Build the domain from per-axis bounds and cell counts, in the
    /// engine's axis order for `geometry`.
    pub fn new(
        geometry: Geometry,
        lower_bound: &[f64],
        upper_bound: &[f64],
        number_of_cells: &[usize],
    ) -> MwxResult<Self> {
        let dim = geometry.dim();
        if lower_bound.len() != dim || upper_bound.len() != dim || number_of_cells.len() != dim {
            return Err(MwxError::ConfigError(format!(
                "{geometry} grid needs {dim} bounds and cell counts, got lower={}, upper={}, cells={}",
                lower_bound.len(),
                upper_bound.len(),
                number_of_cells.len()
            )));
        }
        for axis in 0..dim {
            if number_of_cells[axis] == 0 {
                return Err(MwxError::ConfigError(format!(
                    "Axis {axis} must have at least one cell"
                )));
            }
            let (lo, hi) = (lower_bound[axis], upper_bound[axis]);
            if !lo.is_finite() || !hi.is_finite() || hi <= lo {
                return Err(MwxError::ConfigError(format!(
                    "Axis {axis} bounds must be finite with upper > lower, got [{lo}, {hi}]"
                )));
            }
        }

        let spacing = |axis: usize| {
            (upper_bound[axis] - lower_bound[axis]) / number_of_cells[axis] as f64
        };

        let base = DomainDescriptor {
            geometry,
            xmin: 0.0,
            xmax: 1.0,
            ymin: 0.0,
            ymax: 1.0,
            zmin: 0.0,
            zmax: 1.0,
            rmin: None,
            rmax: None,
            nx: 0,
            ny: 0,
            nz: 0,
            nr: None,
            dx: None,
            dy: None,
            dz: 1.0,
            dr: None,
            boundary_conditions: BoundaryConditions::default_for(geometry),
            potentials: FacePotentials::default(),
        };

        let domain = match geometry {
            Geometry::Z => DomainDescriptor {
                zmin: lower_bound[0],
                zmax: upper_bound[0],
                nz: number_of_cells[0],
                dz: spacing(0),
                ..base
            },
            Geometry::XZ => DomainDescriptor {
                xmin: lower_bound[0],
                xmax: upper_bound[0],
                zmin: lower_bound[1],
                zmax: upper_bound[1],
                nx: number_of_cells[0],
                nz: number_of_cells[1],
                dx: Some(spacing(0)),
                dz: spacing(1),
                ..base
            },
            Geometry::RZ => DomainDescriptor {
                xmin: lower_bound[0],
                xmax: upper_bound[0],
                ymin: lower_bound[0],
                ymax: upper_bound[0],
                zmin: lower_bound[1],
                zmax: upper_bound[1],
                rmin: Some(lower_bound[0]),
                rmax: Some(upper_bound[0]),
                nx: number_of_cells[0],
                ny: number_of_cells[0],
                nz: number_of_cells[1],
                nr: Some(number_of_cells[0]),
                dx: Some(spacing(0)),
                dy: Some(spacing(0)),
                dz: spacing(1),
                dr: Some(spacing(0)),
                ..base
            },
            Geometry::XYZ => DomainDescriptor {
                xmin: lower_bound[0],
                xmax: upper_bound[0],
                ymin: lower_bound[1],
                ymax: upper_bound[1],
                zmin: lower_bound[2],
                zmax: upper_bound[2],
                nx: number_of_cells[0],
                ny: number_of_cells[1],
                nz: number_of_cells[2],
                dx: Some(spacing(0)),
                dy: Some(spacing(1)),
                dz: spacing(2),
                ..base
            },
        };
        Ok(domain)
    }

    pub fn dim(&self) -> usize {
        self.geometry.dim()
    }

    /// Override one boundary condition, addressed by axis name as in
    /// `bc_fields_x_min`.
    pub fn set_field_boundary(
        &mut self,
        axis: &str,
        side: Side,
        value: FieldBoundary,
    ) -> MwxResult<()> {
        let idx = self.axis_or_err(axis)?;
        match side {
            Side::Min => self.boundary_conditions.fields_min[idx] = value,
            Side::Max => self.boundary_conditions.fields_max[idx] = value,
        }
        Ok(())
    }

    pub fn set_particle_boundary(
        &mut self,
        axis: &str,
        side: Side,
        value: ParticleBoundary,
    ) -> MwxResult<()> {
        let idx = self.axis_or_err(axis)?;
        match side {
            Side::Min => self.boundary_conditions.particles_min[idx] = value,
            Side::Max => self.boundary_conditions.particles_max[idx] = value,
        }
        Ok(())
    }

    fn axis_or_err(&self, axis: &str) -> MwxResult<usize> {
        self.geometry.axis_index(axis).ok_or_else(|| {
            MwxError::ConfigError(format!(
                "Axis '{axis}' does not exist in {} geometry",
                self.geometry
            ))
        })
    }

    /// Area normal to z through which current is emitted or absorbed.
    pub fn domain_area(&self) -> f64 {
        match self.geometry {
            Geometry::Z => 1.0,
            Geometry::XZ => self.xmax - self.xmin,
            Geometry::XYZ => (self.xmax - self.xmin) * (self.ymax - self.ymin),
            Geometry::RZ => {
                let rmin = self.rmin.unwrap_or(self.xmin);
                let rmax = self.rmax.unwrap_or(self.xmax);
                PI * (rmax * rmax - rmin * rmin)
            }
        }
    }

    /// Largest tile edge such that the domain splits into at least
    /// `min_tiles` tiles.
    pub fn max_grid_size(&self, min_tiles: usize) -> MwxResult<usize> {
        if min_tiles == 0 {
            return Err(MwxError::ConfigError(
                "min_tiles must be >= 1".to_string(),
            ));
        }
        match self.dim() {
            1 => Ok(self.nz / min_tiles),
            2 => {
                let (nx, nz) = (self.nx as f64, self.nz as f64);
                let max_nx_nz = self.nx.max(self.nz);
                if min_tiles as f64 <= (nx / nz).max(nz / nx) {
                    // all tiles sliced along one axis only
                    Ok(max_nx_nz / min_tiles)
                } else {
                    let max_length_per_tile = (nx * nz / min_tiles as f64).sqrt();
                    let divisor =
                        (2.0 * (max_nx_nz as f64 / max_length_per_tile / 2.0).ceil()) as usize;
                    Ok(max_nx_nz / divisor.max(1))
                }
            }
            _ => Err(MwxError::NotImplemented(
                "tile sizing for 3D simulations".to_string(),
            )),
        }
    }

    /// Node coordinate meshes for a 2D domain, each shaped `[nx + 1, nz + 1]`
    /// (transverse axis first, matching the engine's field layout).
    pub fn node_meshgrid(&self) -> MwxResult<(Array2<f64>, Array2<f64>)> {
        if self.dim() != 2 {
            return Err(MwxError::NotImplemented(format!(
                "node meshgrid for {} geometry",
                self.geometry
            )));
        }
        let dx = self.dx.unwrap_or((self.xmax - self.xmin) / self.nx as f64);
        let shape = (self.nx + 1, self.nz + 1);
        let xx = Array2::from_shape_fn(shape, |(i, _)| self.xmin + i as f64 * dx);
        let zz = Array2::from_shape_fn(shape, |(_, j)| self.zmin + j as f64 * self.dz);
        Ok((xx, zz))
    }
}

impl fmt::Display for DomainDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.geometry == Geometry::RZ {
            write!(
                f,
                "RZ grid with nr={}, nz={} and r, z limits of [[{:.4}, {:.4}], [{:.4}, {:.4}]]",
                self.nx, self.nz, self.xmin, self.xmax, self.zmin, self.zmax
            )
        } else {
            write!(
                f,
                "{} grid with nx={}, ny={}, nz={} and x, y, z limits of \
                 [[{:.4}, {:.4}], [{:.4}, {:.4}], [{:.4}, {:.4}]]",
                self.geometry,
                self.nx,
                self.ny,
                self.nz,
                self.xmin,
                self.xmax,
                self.ymin,
                self.ymax,
                self.zmin,
                self.zmax
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_xz_grid_maps_second_axis_to_z() {
        let d = DomainDescriptor::new(Geometry::XZ, &[0.0, 0.0], &[8e-6, 50e-6], &[8, 128]).unwrap();
        assert_eq!(d.nx, 8);
        assert_eq!(d.nz, 128);
        assert_eq!(d.ny, 0);
        assert!((d.dx.unwrap() - 1e-6).abs() < 1e-18);
        assert!((d.dz - 50e-6 / 128.0).abs() < 1e-18);
        assert!(d.dy.is_none());
        assert_eq!((d.ymin, d.ymax), (0.0, 1.0));
    }

    #[test]
    fn test_rz_aliases_radial_axis() {
        let d = DomainDescriptor::new(Geometry::RZ, &[0.0, -1.0], &[2.0, 1.0], &[16, 32]).unwrap();
        assert_eq!(d.nr, Some(16));
        assert_eq!(d.rmax, Some(2.0));
        assert_eq!(d.xmax, 2.0);
        assert_eq!(d.ymax, 2.0);
        assert_eq!(d.dr, d.dx);
        assert!((d.domain_area() - PI * 4.0).abs() < 1e-12);
        assert_eq!(d.boundary_conditions.fields_min[0], FieldBoundary::None);
        assert_eq!(d.boundary_conditions.particles_max[0], ParticleBoundary::Absorbing);
    }

    #[test]
    fn test_z_grid_has_unit_transverse_extent() {
        let d = DomainDescriptor::new(Geometry::Z, &[0.0], &[1e-3], &[100]).unwrap();
        assert_eq!(d.nz, 100);
        assert_eq!(d.domain_area(), 1.0);
        assert_eq!(d.boundary_conditions.fields_min, vec![FieldBoundary::Dirichlet]);
    }

    #[test]
    fn test_mismatched_bounds_rejected() {
        let err = DomainDescriptor::new(Geometry::XZ, &[0.0], &[1.0, 1.0], &[4, 4]).unwrap_err();
        assert!(matches!(err, MwxError::ConfigError(_)));
        let err = DomainDescriptor::new(Geometry::XZ, &[0.0, 1.0], &[1.0, 1.0], &[4, 4]).unwrap_err();
        assert!(err.to_string().contains("upper > lower"));
    }

    #[test]
    fn test_boundary_override_by_axis_name() {
        let mut d = DomainDescriptor::new(Geometry::XZ, &[0.0, 0.0], &[1.0, 1.0], &[4, 4]).unwrap();
        d.set_field_boundary("x", Side::Max, FieldBoundary::Dirichlet).unwrap();
        assert_eq!(d.boundary_conditions.fields_max[0], FieldBoundary::Dirichlet);
        assert_eq!(d.boundary_conditions.fields_min[0], FieldBoundary::Periodic);
        assert!(d.set_field_boundary("y", Side::Min, FieldBoundary::None).is_err());
    }

    #[test]
    fn test_max_grid_size_single_axis_slicing() {
        let d = DomainDescriptor::new(Geometry::XZ, &[0.0, 0.0], &[1.0, 16.0], &[8, 128]).unwrap();
        // 4 <= 128 / 8, so tiles slice along z only
        assert_eq!(d.max_grid_size(4).unwrap(), 32);
    }

    #[test]
    fn test_max_grid_size_square_domain() {
        let d = DomainDescriptor::new(Geometry::XZ, &[0.0, 0.0], &[1.0, 1.0], &[64, 64]).unwrap();
        // max_length_per_tile = 32, divisor = 2 * ceil(64 / 32 / 2) = 2
        assert_eq!(d.max_grid_size(4).unwrap(), 32);
    }

    #[test]
    fn test_meshgrid_layout() {
        let d = DomainDescriptor::new(Geometry::XZ, &[0.0, 0.0], &[4.0, 8.0], &[4, 8]).unwrap();
        let (xx, zz) = d.node_meshgrid().unwrap();
        assert_eq!(xx.dim(), (5, 9));
        assert_eq!(xx[[3, 7]], 3.0);
        assert_eq!(zz[[3, 7]], 7.0);
    }

    #[test]
    fn test_geometry_parse() {
        assert_eq!("RZ".parse::<Geometry>().unwrap(), Geometry::RZ);
        assert!("XY".parse::<Geometry>().is_err());
    }
}
