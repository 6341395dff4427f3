// ─────────────────────────────────────────────────────────────────────
// MEWarpX-RS — Direct Poisson Solvers
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Direct sparse-LU Poisson solve for thin 2D (pseudo-1D) diodes.
//!
//! The unknowns are the potential on an `(nx + 3) x (nz + 1)` block: every
//! grid column plus one periodic ghost column on each side in x. Rows are
//! numbered `ii * (nz + 1) + jj`. The operator is built once and factored
//! with `faer`; each step only rebuilds the right-hand side.
//!
//! ```text
//!   jj = 0, nz       phi = V_L / V_R                  (Dirichlet)
//!   jj = 1, nz - 1   phi[jj-1] - 2 phi[jj] + phi[jj+1]  (1D stencil)
//!   ii = 0           phi[0] - phi[nx]     = 0          (periodic ghost)
//!   ii = nx + 2      phi[nx+2] - phi[2]   = 0          (periodic ghost)
//!   otherwise        5-point Laplacian * dx^2
//! ```

use mwx_math::sparse::{SparseLu, TripletBuilder};
use mwx_types::constants::EPSILON_0;
use mwx_types::error::{MwxError, MwxResult};
use mwx_types::grid::{DomainDescriptor, Geometry};
use mwx_types::time::{ExpressionEvaluator, TimeValue};
use ndarray::{s, Array2};
use tracing::{debug, info};

use crate::fields::{check_shape, FieldAccess};
use crate::shapes::is_close;

/// What a solver hook gets each step.
pub struct SolveContext<'a> {
    pub t: f64,
    pub evaluator: &'a dyn ExpressionEvaluator,
}

pub trait FieldSolver: Send {
    fn name(&self) -> &str;

    fn solve(&mut self, ctx: &SolveContext<'_>, fields: &mut dyn FieldAccess) -> MwxResult<()>;
}

#[derive(Debug)]
pub struct PoissonSolverPseudo1D {
    nx: usize,
    nz: usize,
    dx: f64,
    left_voltage: TimeValue,
    right_voltage: TimeValue,
    lu: SparseLu,
    phi: Array2<f64>,
}

impl PoissonSolverPseudo1D {
    /// Build and factor the operator for `domain`.
    ///
    /// The z-face potentials become this solver's boundary voltages and all
    /// face slots on the domain are cleared.
    pub fn new(domain: &mut DomainDescriptor) -> MwxResult<Self> {
        match domain.geometry {
            Geometry::XZ => {}
            Geometry::XYZ => {
                return Err(MwxError::NotImplemented(
                    "Direct solver for 3D simulations".to_string(),
                ))
            }
            other => {
                return Err(MwxError::ConfigError(format!(
                    "Direct solver can only be used on a 2D Cartesian grid, got {other}"
                )))
            }
        }
        let (nx, nz) = (domain.nx, domain.nz);
        let dx = (domain.xmax - domain.xmin) / nx as f64;
        let dz = (domain.zmax - domain.zmin) / nz as f64;
        if !is_close(dx, dz) {
            return Err(MwxError::ConfigError(format!(
                "Direct solver requires dx = dz, got dx={dx:e}, dz={dz:e}"
            )));
        }

        let left_voltage = domain.potentials.zmin.clone().unwrap_or_default();
        let right_voltage = domain.potentials.zmax.clone().unwrap_or_default();
        domain.potentials.clear();

        let lu = Self::decompose(nx, nz)?;
        info!("Using direct solver");
        Ok(PoissonSolverPseudo1D {
            nx,
            nz,
            dx,
            left_voltage,
            right_voltage,
            lu,
            phi: Array2::zeros((nx + 3, nz + 3)),
        })
    }

    /// Assemble the operator as triplets.
    pub fn build_operator(nx: usize, nz: usize) -> TripletBuilder {
        let nzsolve = nz + 1;
        let nxsolve = nx + 3;
        let idx = |ii: usize, jj: usize| ii * nzsolve + jj;

        let mut a = TripletBuilder::with_capacity(nxsolve * nzsolve, 5 * nxsolve * nzsolve);
        for ii in 0..nxsolve {
            for jj in 0..nzsolve {
                let row = idx(ii, jj);
                if jj == 0 || jj == nz {
                    a.push(row, row, 1.0);
                } else if jj == 1 || jj == nz - 1 {
                    a.push(row, idx(ii, jj - 1), 1.0);
                    a.push(row, row, -2.0);
                    a.push(row, idx(ii, jj + 1), 1.0);
                } else if ii == 0 {
                    a.push(row, row, 1.0);
                    a.push(row, idx(nx, jj), -1.0);
                } else if ii == nxsolve - 1 {
                    a.push(row, row, 1.0);
                    a.push(row, idx(2, jj), -1.0);
                } else {
                    a.push(row, row, -4.0);
                    a.push(row, idx(ii + 1, jj), 1.0);
                    a.push(row, idx(ii - 1, jj), 1.0);
                    a.push(row, idx(ii, jj - 1), 1.0);
                    a.push(row, idx(ii, jj + 1), 1.0);
                }
            }
        }
        a
    }

    fn decompose(nx: usize, nz: usize) -> MwxResult<SparseLu> {
        let a = Self::build_operator(nx, nz);
        debug!(n = a.dim(), nnz = a.nnz(), "Factoring direct Poisson operator");
        a.factor()
    }

    /// Right-hand side for the given node-centred charge density.
    pub fn source(&self, rho: &Array2<f64>, left: f64, right: f64) -> MwxResult<Array2<f64>> {
        check_shape("rho", rho, (self.nx + 1, self.nz + 1))?;
        let mut source = Array2::zeros((self.nx + 3, self.nz + 1));
        let scale = -self.dx * self.dx / EPSILON_0;
        source
            .slice_mut(s![1..self.nx + 2, ..])
            .assign(&rho.mapv(|r| r * scale));
        source.column_mut(0).fill(left);
        source.column_mut(self.nz).fill(right);
        Ok(source)
    }

    /// Solve for phi (ghost cells included) from rho and the boundary voltages.
    pub fn solve_rho(&mut self, rho: &Array2<f64>, left: f64, right: f64) -> MwxResult<&Array2<f64>> {
        let source = self.source(rho, left, right)?;
        let b: Vec<f64> = source.iter().copied().collect();
        let x = self.lu.solve(&b)?;
        let solution = Array2::from_shape_vec((self.nx + 3, self.nz + 1), x)
            .map_err(|e| MwxError::LinAlg(e.to_string()))?;

        let last = self.nz + 2;
        self.phi.slice_mut(s![.., 1..last]).assign(&solution);
        self.phi.slice_mut(s![.., 0..2]).fill(left);
        self.phi.slice_mut(s![.., self.nz + 1..]).fill(right);
        self.phi.row_mut(0).fill(0.0);
        self.phi.row_mut(self.nx + 2).fill(0.0);
        Ok(&self.phi)
    }

    pub fn phi(&self) -> &Array2<f64> {
        &self.phi
    }

    pub fn dx(&self) -> f64 {
        self.dx
    }

    pub fn left_voltage(&self) -> &TimeValue {
        &self.left_voltage
    }

    pub fn right_voltage(&self) -> &TimeValue {
        &self.right_voltage
    }
}

impl FieldSolver for PoissonSolverPseudo1D {
    fn name(&self) -> &str {
        "pseudo_1d"
    }

    fn solve(&mut self, ctx: &SolveContext<'_>, fields: &mut dyn FieldAccess) -> MwxResult<()> {
        let left = self.left_voltage.evaluate(ctx.evaluator, ctx.t)?;
        let right = self.right_voltage.evaluate(ctx.evaluator, ctx.t)?;
        let rho = fields.gathered_rho()?;
        self.solve_rho(&rho, left, right)?;
        fields.set_phi(&self.phi)
    }
}

/// Hook that leaves the fields untouched.
#[derive(Debug, Default, Clone, Copy)]
pub struct DummyPoissonSolver;

impl DummyPoissonSolver {
    pub fn new() -> Self {
        DummyPoissonSolver
    }
}

impl FieldSolver for DummyPoissonSolver {
    fn name(&self) -> &str {
        "dummy"
    }

    fn solve(&mut self, _ctx: &SolveContext<'_>, _fields: &mut dyn FieldAccess) -> MwxResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::GridFields;
    use mwx_math::parser::ParserEvaluator;

    fn diode(nx: usize, nz: usize) -> DomainDescriptor {
        let d = 1e-6;
        DomainDescriptor::new(
            Geometry::XZ,
            &[0.0, 0.0],
            &[nx as f64 * d, nz as f64 * d],
            &[nx, nz],
        )
        .unwrap()
    }

    #[test]
    fn test_rejects_other_geometries() {
        let mut rz = DomainDescriptor::new(Geometry::RZ, &[0.0, 0.0], &[1.0, 1.0], &[4, 4]).unwrap();
        assert!(matches!(
            PoissonSolverPseudo1D::new(&mut rz),
            Err(MwxError::ConfigError(_))
        ));
        let mut xyz =
            DomainDescriptor::new(Geometry::XYZ, &[0.0; 3], &[1.0; 3], &[4, 4, 4]).unwrap();
        assert!(matches!(
            PoissonSolverPseudo1D::new(&mut xyz),
            Err(MwxError::NotImplemented(_))
        ));
    }

    #[test]
    fn test_rejects_anisotropic_spacing() {
        let mut d = DomainDescriptor::new(Geometry::XZ, &[0.0, 0.0], &[1.0, 1.0], &[4, 8]).unwrap();
        d.potentials.zmin = Some(TimeValue::Constant(3.0));
        assert!(PoissonSolverPseudo1D::new(&mut d).is_err());
        // nothing consumed on failure
        assert!(d.potentials.zmin.is_some());
    }

    #[test]
    fn test_operator_row_structure() {
        let (nx, nz) = (4, 6);
        let a = PoissonSolverPseudo1D::build_operator(nx, nz);
        assert_eq!(a.dim(), (nx + 3) * (nz + 1));
        let row_nnz = |row: usize| a.entries().iter().filter(|(r, _, _)| *r == row).count();
        assert_eq!(row_nnz(0), 1);
        assert_eq!(row_nnz(1), 3);
        assert_eq!(row_nnz(3), 2);
        assert_eq!(row_nnz(3 * (nz + 1) + 3), 5);
        // ghost row ii = 0 pairs with ii = nx
        assert!(a
            .entries()
            .iter()
            .any(|&(r, c, v)| r == 3 && c == nx * (nz + 1) + 3 && v == -1.0));
    }

    #[test]
    fn test_zero_source_gives_zero() {
        let mut d = diode(4, 8);
        let mut solver = PoissonSolverPseudo1D::new(&mut d).unwrap();
        let phi = solver.solve_rho(&Array2::zeros((5, 9)), 0.0, 0.0).unwrap();
        assert!(phi.iter().all(|v| v.abs() < 1e-12));
    }

    #[test]
    fn test_vacuum_profile_is_linear() {
        let (nx, nz) = (4, 10);
        let mut d = diode(nx, nz);
        d.potentials.zmax = Some(TimeValue::Constant(10.0));
        let mut solver = PoissonSolverPseudo1D::new(&mut d).unwrap();
        assert!(d.potentials.zmax.is_none());

        let mut fields = GridFields::new(nx, nz);
        let ctx = SolveContext {
            t: 0.0,
            evaluator: &ParserEvaluator,
        };
        solver.solve(&ctx, &mut fields).unwrap();
        let phi = fields.gathered_phi(true).unwrap();
        for ii in 1..nx + 2 {
            for jj in 0..=nz {
                let expected = 10.0 * jj as f64 / nz as f64;
                assert!((phi[[ii, jj + 1]] - expected).abs() < 1e-9, "({ii}, {jj})");
            }
        }
        assert!(phi.row(0).iter().all(|&v| v == 0.0));
        assert!(phi.row(nx + 2).iter().all(|&v| v == 0.0));
        assert_eq!(phi[[2, 0]], 0.0);
        assert_eq!(phi[[2, nz + 2]], 10.0);
    }

    #[test]
    fn test_time_dependent_anode() {
        let mut d = diode(2, 4);
        d.potentials.zmax = Some(TimeValue::from("100*t"));
        let mut solver = PoissonSolverPseudo1D::new(&mut d).unwrap();
        let mut fields = GridFields::new(2, 4);
        let ctx = SolveContext {
            t: 0.05,
            evaluator: &ParserEvaluator,
        };
        solver.solve(&ctx, &mut fields).unwrap();
        assert!((fields.phi()[[1, 5]] - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_uniform_charge_gives_parabola() {
        let (nx, nz) = (2, 8);
        let mut d = diode(nx, nz);
        let mut solver = PoissonSolverPseudo1D::new(&mut d).unwrap();
        let rho0 = 1e-3;
        let rho = Array2::from_elem((nx + 1, nz + 1), rho0);
        let phi = solver.solve_rho(&rho, 0.0, 0.0).unwrap().clone();
        // phi'' = -rho/eps0 with phi(0) = phi(L) = 0
        let dz = 1e-6;
        let length = nz as f64 * dz;
        for jj in 0..=nz {
            let z = jj as f64 * dz;
            let exact = rho0 / (2.0 * EPSILON_0) * z * (length - z);
            let got = phi[[1, jj + 1]];
            assert!((got - exact).abs() <= 1e-9 * exact.abs().max(1e-3), "{jj}: {got} vs {exact}");
        }
    }

    #[test]
    fn test_rho_shape_checked() {
        let mut d = diode(2, 4);
        let mut solver = PoissonSolverPseudo1D::new(&mut d).unwrap();
        assert!(matches!(
            solver.solve_rho(&Array2::zeros((4, 4)), 0.0, 0.0),
            Err(MwxError::ShapeMismatch { .. })
        ));
    }
}
