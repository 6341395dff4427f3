// ─────────────────────────────────────────────────────────────────────
// MEWarpX-RS — Shapes
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Conductor geometry: implicit functions, inside tests and surface normals.
//!
//! Implicit functions are written in the engine's expression grammar and
//! are negative outside, zero on the surface and positive inside. Inside
//! tests return a 0/1 mask; normals are `[3, n]` arrays.

use mwx_types::error::{MwxError, MwxResult};
use mwx_types::grid::Geometry;
use ndarray::{Array1, Array2, ArrayView1};

/// Semi-infinite conductor bounded by the plane `z`.
#[derive(Debug, Clone, PartialEq)]
pub struct HalfSpace {
    pub z: f64,
    /// +1 extends to +inf, -1 extends to -inf.
    pub zsign: i32,
}

/// Infinite cylinder along y, cross-section in the x-z plane.
#[derive(Debug, Clone, PartialEq)]
pub struct InfCylinderY {
    pub center_x: f64,
    pub center_z: f64,
    pub radius: f64,
}

/// Cylindrical shell around the z axis (RZ).
#[derive(Debug, Clone, PartialEq)]
pub struct CylinderZ {
    pub r_inner: f64,
    pub r_outer: f64,
    pub r_center: f64,
    pub zmin: f64,
    pub zmax: f64,
    /// True when the shell spans the whole z domain.
    pub infinite: bool,
}

/// Rectangular prism, infinite in y.
#[derive(Debug, Clone, PartialEq)]
pub struct Rectangle {
    pub center_x: f64,
    pub center_z: f64,
    pub length_x: f64,
    pub length_z: f64,
    pub xmin: f64,
    pub xmax: f64,
    pub zmin: f64,
    pub zmax: f64,
    scaled_h: f64,
    region_normals: [(f64, f64); 4],
    transform: [[f64; 3]; 3],
}

#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    HalfSpace(HalfSpace),
    InfCylinderY(InfCylinderY),
    CylinderZ(CylinderZ),
    Rectangle(Rectangle),
}

fn check_lengths(x: &ArrayView1<f64>, y: &ArrayView1<f64>, z: &ArrayView1<f64>) -> MwxResult<usize> {
    let n = x.len();
    if y.len() != n || z.len() != n {
        return Err(MwxError::ShapeMismatch {
            what: "shape test coordinates".to_string(),
            expected: vec![n, n, n],
            got: vec![x.len(), y.len(), z.len()],
        });
    }
    Ok(n)
}

fn mask(n: usize, f: impl Fn(usize) -> bool) -> Array1<u8> {
    Array1::from_shape_fn(n, |k| u8::from(f(k)))
}

impl HalfSpace {
    pub fn new(z: f64, zsign: i32) -> MwxResult<Self> {
        if zsign != 1 && zsign != -1 {
            return Err(MwxError::ConfigError(format!(
                "zsign = {zsign} is not -1 or 1"
            )));
        }
        Ok(HalfSpace { z, zsign })
    }
}

impl InfCylinderY {
    pub fn new(center_x: f64, center_z: f64, radius: f64) -> MwxResult<Self> {
        if !(radius > 0.0) {
            return Err(MwxError::ConfigError(format!(
                "Cylinder radius must be positive, got {radius}"
            )));
        }
        Ok(InfCylinderY {
            center_x,
            center_z,
            radius,
        })
    }

    pub fn implicit_function(&self) -> String {
        format!(
            "-((x-{:?})**2+(z-{:?})**2-{:?}**2)",
            self.center_x, self.center_z, self.radius
        )
    }

    fn is_inside(&self, x: ArrayView1<f64>, z: ArrayView1<f64>, aura: f64) -> Array1<u8> {
        let boundary = (self.radius + aura).powi(2);
        mask(x.len(), |k| {
            let d2 = (x[k] - self.center_x).powi(2) + (z[k] - self.center_z).powi(2);
            d2 <= boundary
        })
    }

    fn normal_at(&self, px: ArrayView1<f64>, pz: ArrayView1<f64>) -> Array2<f64> {
        let n = px.len();
        let mut nhat = Array2::zeros((3, n));
        for k in 0..n {
            let dx = px[k] - self.center_x;
            let dz = pz[k] - self.center_z;
            let dist = (dx * dx + dz * dz).sqrt();
            // NaN exactly at the axis
            nhat[[0, k]] = dx / dist;
            nhat[[2, k]] = dz / dist;
        }
        nhat
    }
}

impl CylinderZ {
    /// Shell between `r_inner` and `r_outer`, from `zmin` to `zmax`.
    /// `domain_z` is the simulation's z extent, used to decide whether the
    /// shell is axially infinite.
    pub fn new(
        r_inner: f64,
        r_outer: f64,
        zmin: f64,
        zmax: f64,
        domain_z: (f64, f64),
    ) -> MwxResult<Self> {
        if r_outer == 0.0 {
            return Err(MwxError::ConfigError(
                "Cannot have a cylinder with 0 outer radius".to_string(),
            ));
        }
        if r_inner < 0.0 || r_inner >= r_outer {
            return Err(MwxError::ConfigError(format!(
                "Cylinder radii must satisfy 0 <= r_inner < r_outer, got {r_inner}, {r_outer}"
            )));
        }
        if zmax <= zmin {
            return Err(MwxError::ConfigError(format!(
                "Cylinder z limits must satisfy zmin < zmax, got {zmin}, {zmax}"
            )));
        }
        let infinite = is_close(zmax - domain_z.1, 0.0) && is_close(zmin - domain_z.0, 0.0);
        Ok(CylinderZ {
            r_inner,
            r_outer,
            r_center: (r_inner + r_outer) / 2.0,
            zmin,
            zmax,
            infinite,
        })
    }

    pub fn half_width(&self) -> f64 {
        self.r_outer - self.r_center
    }

    pub fn implicit_function(&self) -> String {
        let radial = format!("-(abs(x-{:?})-{:?})", self.r_center, self.half_width());
        if self.infinite {
            radial
        } else {
            format!("if(z>{:?} and z<{:?}, {radial},-1.0)", self.zmin, self.zmax)
        }
    }

    fn is_inside(&self, x: ArrayView1<f64>, y: ArrayView1<f64>, z: ArrayView1<f64>, aura: f64) -> Array1<u8> {
        let dr = self.r_outer + aura - self.r_center;
        mask(x.len(), |k| {
            let dist = (x[k] * x[k] + y[k] * y[k]).sqrt();
            let radial = (dist - self.r_center).abs() <= dr;
            let axial = self.infinite || (z[k] >= self.zmin - aura && z[k] <= self.zmax + aura);
            radial && axial
        })
    }

    fn normal_at(&self, px: ArrayView1<f64>, py: ArrayView1<f64>) -> Array2<f64> {
        let n = px.len();
        let hollow = self.r_inner > 0.0;
        let mut nhat = Array2::zeros((3, n));
        for k in 0..n {
            let dist = (px[k] * px[k] + py[k] * py[k]).sqrt();
            // nearer the inner wall of a hollow shell: point toward the axis
            let sign = if hollow && dist < self.r_center { -1.0 } else { 1.0 };
            nhat[[0, k]] = sign * px[k] / dist;
            nhat[[1, k]] = sign * py[k] / dist;
        }
        nhat
    }
}

impl Rectangle {
    pub fn new(center_x: f64, center_z: f64, length_x: f64, length_z: f64) -> MwxResult<Self> {
        if !(length_x > 0.0) || !(length_z > 0.0) {
            return Err(MwxError::ConfigError(format!(
                "Rectangle lengths must be positive, got {length_x} x {length_z}"
            )));
        }
        let short = length_x.min(length_z);
        let scaled_h = 2.0 * length_x.max(length_z) / short;

        let region_normals = if length_x <= length_z {
            [(0.0, -1.0), (1.0, 0.0), (0.0, 1.0), (-1.0, 0.0)]
        } else {
            [(-1.0, 0.0), (0.0, -1.0), (1.0, 0.0), (0.0, 1.0)]
        };

        // corner to origin, scale the short side to 2, centre it on 0, and
        // rotate so the long side runs along the canonical y axis
        let translate1 = [
            [1.0, 0.0, -center_x + length_x / 2.0],
            [0.0, 1.0, -center_z + length_z / 2.0],
            [0.0, 0.0, 1.0],
        ];
        let scale = [[2.0 / short, 0.0, 0.0], [0.0, 2.0 / short, 0.0], [0.0, 0.0, 1.0]];
        let translate2 = [[1.0, 0.0, -1.0], [0.0, 1.0, -1.0], [0.0, 0.0, 1.0]];
        let rotate = if length_z < length_x {
            [[0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]]
        } else {
            [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]]
        };
        let transform = matmul3(&matmul3(&rotate, &translate2), &matmul3(&scale, &translate1));

        Ok(Rectangle {
            center_x,
            center_z,
            length_x,
            length_z,
            xmin: center_x - length_x / 2.0,
            xmax: center_x + length_x / 2.0,
            zmin: center_z - length_z / 2.0,
            zmax: center_z + length_z / 2.0,
            scaled_h,
            region_normals,
            transform,
        })
    }

    pub fn implicit_function(&self) -> String {
        format!(
            "-max(max(x-({:?}),({:?})-x),max(z-({:?}),({:?})-z))",
            self.xmax, self.xmin, self.zmax, self.zmin
        )
    }

    fn is_inside(&self, x: ArrayView1<f64>, z: ArrayView1<f64>, aura: f64) -> Array1<u8> {
        mask(x.len(), |k| {
            let x_in = (x[k] - self.xmax - aura).max(self.xmin - aura - x[k]) <= 0.0;
            let z_in = (z[k] - self.zmax - aura).max(self.zmin - aura - z[k]) <= 0.0;
            x_in && z_in
        })
    }

    fn to_canonical(&self, x: f64, z: f64) -> (f64, f64) {
        let m = &self.transform;
        (
            m[0][0] * x + m[0][1] * z + m[0][2],
            m[1][0] * x + m[1][1] * z + m[1][2],
        )
    }

    /// Region 0-3 (bottom, right, top, left of the canonical rectangle).
    pub fn region(&self, x: f64, z: f64) -> usize {
        let (cx, cy) = self.to_canonical(x, z);
        let c0 = cy < -cx.abs();
        let c2 = cy - self.scaled_h + 2.0 > cx.abs();
        let not_c1 = cx <= 0.0;
        let bit2 = c2 || (not_c1 && !c0);
        let bit1 = !(c0 || c2);
        2 * usize::from(bit2) + usize::from(bit1)
    }

    fn normal_at(&self, px: ArrayView1<f64>, pz: ArrayView1<f64>) -> Array2<f64> {
        let n = px.len();
        let mut nhat = Array2::zeros((3, n));
        for k in 0..n {
            let (nx, nz) = self.region_normals[self.region(px[k], pz[k])];
            nhat[[0, k]] = nx;
            nhat[[2, k]] = nz;
        }
        nhat
    }
}

fn matmul3(a: &[[f64; 3]; 3], b: &[[f64; 3]; 3]) -> [[f64; 3]; 3] {
    let mut out = [[0.0; 3]; 3];
    for (i, row) in out.iter_mut().enumerate() {
        for (j, v) in row.iter_mut().enumerate() {
            *v = (0..3).map(|k| a[i][k] * b[k][j]).sum();
        }
    }
    out
}

/// `|a - b| <= 1e-8 + 1e-5 * |b|`.
pub fn is_close(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-8 + 1e-5 * b.abs()
}

impl Shape {
    pub fn kind(&self) -> &'static str {
        match self {
            Shape::HalfSpace(_) => "ZPlane",
            Shape::InfCylinderY(_) => "InfCylinderY",
            Shape::CylinderZ(_) => "CylinderZ",
            Shape::Rectangle(_) => "Rectangle",
        }
    }

    pub fn supported_geometries(&self) -> &'static [Geometry] {
        match self {
            Shape::HalfSpace(_) => &[Geometry::Z, Geometry::XZ, Geometry::RZ, Geometry::XYZ],
            Shape::InfCylinderY(_) | Shape::Rectangle(_) => &[Geometry::XZ, Geometry::XYZ],
            Shape::CylinderZ(_) => &[Geometry::RZ],
        }
    }

    pub fn check_geom(&self, geometry: Geometry, assembly: &str) -> MwxResult<()> {
        if self.supported_geometries().contains(&geometry) {
            Ok(())
        } else {
            Err(MwxError::UnsupportedGeometry {
                geometry: geometry.to_string(),
                assembly: assembly.to_string(),
            })
        }
    }

    /// Implicit function for embedded variants, `None` for half-spaces.
    pub fn implicit_function(&self) -> Option<String> {
        match self {
            Shape::HalfSpace(_) => None,
            Shape::InfCylinderY(c) => Some(c.implicit_function()),
            Shape::CylinderZ(c) => Some(c.implicit_function()),
            Shape::Rectangle(r) => Some(r.implicit_function()),
        }
    }

    /// 0/1 mask of points inside the shape, dilated by `aura` (m).
    pub fn is_inside(
        &self,
        x: ArrayView1<f64>,
        y: ArrayView1<f64>,
        z: ArrayView1<f64>,
        aura: f64,
    ) -> MwxResult<Array1<u8>> {
        check_lengths(&x, &y, &z)?;
        match self {
            Shape::HalfSpace(_) => Err(MwxError::ConfigError(
                "ZPlane has no inside test".to_string(),
            )),
            Shape::InfCylinderY(c) => Ok(c.is_inside(x, z, aura)),
            Shape::CylinderZ(c) => Ok(c.is_inside(x, y, z, aura)),
            Shape::Rectangle(r) => Ok(r.is_inside(x, z, aura)),
        }
    }

    /// Outward unit normal of the nearest surface, shaped `[3, n]`.
    pub fn normal_at(
        &self,
        px: ArrayView1<f64>,
        py: ArrayView1<f64>,
        pz: ArrayView1<f64>,
    ) -> MwxResult<Array2<f64>> {
        let n = check_lengths(&px, &py, &pz)?;
        Ok(match self {
            Shape::HalfSpace(h) => {
                let mut nhat = Array2::zeros((3, n));
                nhat.row_mut(2).fill(-f64::from(h.zsign));
                nhat
            }
            Shape::InfCylinderY(c) => c.normal_at(px, pz),
            Shape::CylinderZ(c) => c.normal_at(px, py),
            Shape::Rectangle(r) => r.normal_at(px, pz),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn zeros(n: usize) -> Array1<f64> {
        Array1::zeros(n)
    }

    #[test]
    fn test_zsign_validated() {
        assert!(HalfSpace::new(0.0, 2).is_err());
        assert!(HalfSpace::new(0.0, -1).is_ok());
    }

    #[test]
    fn test_half_space_has_no_inside_test() {
        let s = Shape::HalfSpace(HalfSpace::new(0.0, -1).unwrap());
        let p = zeros(2);
        assert!(matches!(
            s.is_inside(p.view(), p.view(), p.view(), 0.0),
            Err(MwxError::ConfigError(_))
        ));
        let n = s.normal_at(p.view(), p.view(), p.view()).unwrap();
        assert_eq!(n[[2, 0]], 1.0);
        assert!(s.implicit_function().is_none());
    }

    #[test]
    fn test_cylinder_boundary_inclusive() {
        let c = InfCylinderY::new(0.0, 0.0, 1.0).unwrap();
        let s = Shape::InfCylinderY(c);
        let x = array![1.0, 1.0 + 1e-9, 0.0];
        let z = array![0.0, 0.0, 0.5];
        let m = s.is_inside(x.view(), zeros(3).view(), z.view(), 0.0).unwrap();
        assert_eq!(m, array![1, 0, 1]);
        let m = s.is_inside(x.view(), zeros(3).view(), z.view(), 1e-6).unwrap();
        assert_eq!(m, array![1, 1, 1]);
    }

    #[test]
    fn test_cylinder_normal_is_radial() {
        let s = Shape::InfCylinderY(InfCylinderY::new(1.0, 2.0, 0.5).unwrap());
        let px = array![2.0, 1.0, 1.0];
        let pz = array![2.0, 3.0, 2.0];
        let n = s.normal_at(px.view(), zeros(3).view(), pz.view()).unwrap();
        assert_eq!((n[[0, 0]], n[[1, 0]], n[[2, 0]]), (1.0, 0.0, 0.0));
        assert_eq!((n[[0, 1]], n[[2, 1]]), (0.0, 1.0));
        assert!(n[[0, 2]].is_nan());
    }

    #[test]
    fn test_cylinder_implicit_sign() {
        let c = InfCylinderY::new(1e-6, 2e-6, 5e-7).unwrap();
        let f = mwx_math::parser::Expr::parse(&c.implicit_function()).unwrap();
        assert!(f.eval_at(1e-6, 0.0, 2e-6, 0.0) > 0.0);
        assert!(f.eval_at(1e-5, 0.0, 2e-6, 0.0) < 0.0);
        assert_eq!(c.implicit_function(), "-((x-1e-6)**2+(z-2e-6)**2-5e-7**2)");
    }

    #[test]
    fn test_shell_implicit_functions() {
        let full = CylinderZ::new(0.5, 1.0, 0.0, 2.0, (0.0, 2.0)).unwrap();
        assert!(full.infinite);
        assert_eq!(full.implicit_function(), "-(abs(x-0.75)-0.25)");

        let short = CylinderZ::new(0.5, 1.0, 0.5, 1.5, (0.0, 2.0)).unwrap();
        assert!(!short.infinite);
        assert_eq!(
            short.implicit_function(),
            "if(z>0.5 and z<1.5, -(abs(x-0.75)-0.25),-1.0)"
        );
        let f = mwx_math::parser::Expr::parse(&short.implicit_function()).unwrap();
        assert!(f.eval_at(0.75, 0.0, 1.0, 0.0) > 0.0);
        assert_eq!(f.eval_at(0.75, 0.0, 1.9, 0.0), -1.0);
    }

    #[test]
    fn test_shell_rejects_zero_outer_radius() {
        assert!(CylinderZ::new(0.0, 0.0, 0.0, 1.0, (0.0, 1.0)).is_err());
    }

    #[test]
    fn test_shell_inside_and_normals() {
        let s = Shape::CylinderZ(CylinderZ::new(0.5, 1.0, 0.0, 1.0, (0.0, 2.0)).unwrap());
        let x = array![0.6, 0.0, 0.2, 0.9];
        let y = array![0.0, 0.7, 0.0, 0.0];
        let z = array![0.5, 0.5, 0.5, 1.5];
        let m = s.is_inside(x.view(), y.view(), z.view(), 0.0).unwrap();
        assert_eq!(m, array![1, 1, 0, 0]);

        let n = s.normal_at(x.view(), y.view(), z.view()).unwrap();
        // 0.6 < r_center = 0.75 -> toward the axis
        assert_eq!(n[[0, 0]], -1.0);
        // 0.9 > r_center -> outward
        assert_eq!(n[[0, 3]], 1.0);
        assert_eq!(n[[1, 1]], -1.0);
        assert_eq!(n[[2, 0]], 0.0);
    }

    #[test]
    fn test_rectangle_inside() {
        let s = Shape::Rectangle(Rectangle::new(0.0, 0.0, 2.0, 4.0).unwrap());
        let x = array![0.0, 1.0, 1.1, 0.0];
        let z = array![0.0, 2.0, 0.0, -2.05];
        let m = s.is_inside(x.view(), zeros(4).view(), z.view(), 0.0).unwrap();
        assert_eq!(m, array![1, 1, 0, 0]);
        let m = s.is_inside(x.view(), zeros(4).view(), z.view(), 0.2).unwrap();
        assert_eq!(m, array![1, 1, 1, 1]);
    }

    #[test]
    fn test_rectangle_implicit_sign() {
        let r = Rectangle::new(1.0, 1.0, 2.0, 4.0).unwrap();
        let f = mwx_math::parser::Expr::parse(&r.implicit_function()).unwrap();
        assert!(f.eval_at(1.0, 0.0, 1.0, 0.0) > 0.0);
        assert!(f.eval_at(5.0, 0.0, 1.0, 0.0) < 0.0);
        assert!(f.eval_at(2.0, 0.0, 1.0, 0.0).abs() < 1e-15);
    }

    #[test]
    fn test_rectangle_normals_tall() {
        // lx < lz: long side along z
        let s = Shape::Rectangle(Rectangle::new(0.0, 0.0, 1.0, 3.0).unwrap());
        let px = array![0.0, 0.0, 0.9, -0.9, 0.4, 0.1];
        let pz = array![2.0, -2.0, 0.0, 0.0, 1.45, 1.0];
        let n = s.normal_at(px.view(), zeros(6).view(), pz.view()).unwrap();
        let got: Vec<(f64, f64)> = (0..6).map(|k| (n[[0, k]], n[[2, k]])).collect();
        assert_eq!(
            got,
            vec![(0.0, 1.0), (0.0, -1.0), (1.0, 0.0), (-1.0, 0.0), (0.0, 1.0), (1.0, 0.0)]
        );
    }

    #[test]
    fn test_rectangle_normals_wide() {
        // lz < lx: the complementary table
        let s = Shape::Rectangle(Rectangle::new(0.0, 0.0, 3.0, 1.0).unwrap());
        let px = array![0.0, 0.0, 2.0, -2.0];
        let pz = array![2.0, -2.0, 0.0, 0.0];
        let n = s.normal_at(px.view(), zeros(4).view(), pz.view()).unwrap();
        let got: Vec<(f64, f64)> = (0..4).map(|k| (n[[0, k]], n[[2, k]])).collect();
        assert_eq!(got, vec![(0.0, 1.0), (0.0, -1.0), (1.0, 0.0), (-1.0, 0.0)]);
    }

    #[test]
    fn test_geometry_support() {
        let s = Shape::CylinderZ(CylinderZ::new(0.0, 1.0, 0.0, 1.0, (0.0, 1.0)).unwrap());
        assert!(s.check_geom(Geometry::RZ, "shell").is_ok());
        let err = s.check_geom(Geometry::XZ, "shell").unwrap_err();
        assert_eq!(err.to_string(), "XZ geometry not supported by assembly 'shell'");
    }

    #[test]
    fn test_coordinate_lengths_checked() {
        let s = Shape::InfCylinderY(InfCylinderY::new(0.0, 0.0, 1.0).unwrap());
        let a = zeros(3);
        let b = zeros(2);
        assert!(matches!(
            s.is_inside(a.view(), b.view(), a.view(), 0.0),
            Err(MwxError::ShapeMismatch { .. })
        ));
    }
}
