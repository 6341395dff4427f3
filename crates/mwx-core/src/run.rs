// ─────────────────────────────────────────────────────────────────────
// MEWarpX-RS — Run Context
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Run context shared by assemblies, solvers and diagnostics.
//!
//! `MwxRun` is passed explicitly to everything that needs the grid, the
//! clock or the embedded boundary. Setup mutates it (grid, species,
//! assemblies, solver hooks); `init_run` freezes the embedded boundary and
//! enables the per-step hooks.

use mwx_math::parser::ParserEvaluator;
use mwx_types::constants::{M_E, Q_E};
use mwx_types::error::{MwxError, MwxResult};
use mwx_types::grid::{DomainDescriptor, Geometry};
use mwx_types::time::{ExpressionEvaluator, TimeValue};
use tracing::{debug, info};

use crate::assembly::{Assembly, ScrapeContext, ScrapePass};
use crate::boundary::EmbeddedBoundary;
use crate::buffer::BoundaryBufferAccess;
use crate::callbacks::Callbacks;
use crate::fields::FieldAccess;
use crate::parallel::{Communicator, ReduceOp, SingleProcess};
use crate::poisson::{FieldSolver, SolveContext};
use crate::records::FieldTable;
use crate::species::Species;

/// Handle to an assembly registered with a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AssemblyId(usize);

impl AssemblyId {
    pub fn index(&self) -> usize {
        self.0
    }
}

pub struct MwxRun {
    domain: Option<DomainDescriptor>,
    max_grid_size: Option<usize>,
    embedded_boundary: EmbeddedBoundary,
    species: Vec<Species>,
    assemblies: Vec<Assembly>,
    callbacks: Callbacks,
    evaluator: Box<dyn ExpressionEvaluator + Send + Sync>,
    comm: Box<dyn Communicator>,
    step: u64,
    dt: Option<f64>,
    level: usize,
    initialized: bool,
}

impl Default for MwxRun {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MwxRun {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MwxRun")
            .field("domain", &self.domain)
            .field("species", &self.species)
            .field("n_assemblies", &self.assemblies.len())
            .field("step", &self.step)
            .field("dt", &self.dt)
            .field("rank", &self.comm.rank())
            .field("initialized", &self.initialized)
            .finish()
    }
}

impl MwxRun {
    pub fn new() -> Self {
        MwxRun {
            domain: None,
            max_grid_size: None,
            embedded_boundary: EmbeddedBoundary::new(),
            species: Vec::new(),
            assemblies: Vec::new(),
            callbacks: Callbacks::new(),
            evaluator: Box::new(ParserEvaluator),
            comm: Box::new(SingleProcess),
            step: 0,
            dt: None,
            level: 0,
            initialized: false,
        }
    }

    pub fn with_communicator(mut self, comm: Box<dyn Communicator>) -> Self {
        self.comm = comm;
        self
    }

    pub fn with_evaluator(mut self, evaluator: Box<dyn ExpressionEvaluator + Send + Sync>) -> Self {
        self.evaluator = evaluator;
        self
    }

    // ── Grid ─────────────────────────────────────────────────────────

    /// Install the simulation domain and derive the tile size.
    pub fn init_grid(&mut self, domain: DomainDescriptor, min_tiles: Option<usize>) -> MwxResult<()> {
        if self.domain.is_some() {
            return Err(MwxError::ConfigError(
                "init_grid was already called for this run".to_string(),
            ));
        }
        self.max_grid_size = match min_tiles {
            Some(tiles) if domain.dim() < 3 => Some(domain.max_grid_size(tiles)?),
            Some(_) => {
                return Err(MwxError::NotImplemented(
                    "Tile sizing for 3D simulations".to_string(),
                ))
            }
            None => None,
        };
        info!("Creating {domain}");
        self.domain = Some(domain);
        Ok(())
    }

    pub fn domain(&self) -> MwxResult<&DomainDescriptor> {
        self.domain
            .as_ref()
            .ok_or_else(|| MwxError::ConfigError("init_grid must be called first".to_string()))
    }

    pub fn domain_mut(&mut self) -> MwxResult<&mut DomainDescriptor> {
        self.domain
            .as_mut()
            .ok_or_else(|| MwxError::ConfigError("init_grid must be called first".to_string()))
    }

    pub fn geometry(&self) -> MwxResult<Geometry> {
        Ok(self.domain()?.geometry)
    }

    pub fn max_grid_size(&self) -> Option<usize> {
        self.max_grid_size
    }

    /// Cross-section over which current is emitted or absorbed (m^2).
    pub fn domain_area(&self) -> MwxResult<f64> {
        Ok(self.domain()?.domain_area())
    }

    // ── Species ──────────────────────────────────────────────────────

    /// Declare a species. Ids follow declaration order.
    pub fn add_species(&mut self, name: &str, sq: f64, mass: f64) -> MwxResult<&Species> {
        if self.species.iter().any(|s| s.name == name) {
            return Err(MwxError::ConfigError(format!(
                "Species '{name}' is already declared"
            )));
        }
        let species = Species::new(name, self.species.len(), sq, mass)?;
        self.species.push(species);
        Ok(&self.species[self.species.len() - 1])
    }

    pub fn species(&self) -> &[Species] {
        &self.species
    }

    pub fn species_by_name(&self, name: &str) -> Option<&Species> {
        self.species.iter().find(|s| s.name == name)
    }

    // ── Clock ────────────────────────────────────────────────────────

    /// Set dt explicitly, or from the CFL condition for the fastest electron
    /// accelerated through `v_grid` volts.
    pub fn init_timestep(&mut self, dt: Option<f64>, cfl_factor: Option<f64>, v_grid: f64) -> MwxResult<f64> {
        let domain = self
            .domain
            .as_ref()
            .ok_or_else(|| MwxError::ConfigError("init_grid must be called before init_timestep".to_string()))?;

        if let Some(dt) = dt {
            if !(dt > 0.0) {
                return Err(MwxError::ConfigError(format!("dt must be positive, got {dt}")));
            }
            self.dt = Some(dt);
            return Ok(dt);
        }

        let cfl = cfl_factor.ok_or_else(|| {
            MwxError::ConfigError("Either CFL-factor or DT should be passed to init_timestep".to_string())
        })?;
        let v_grid = v_grid.abs();
        if v_grid < 1.0 {
            return Err(MwxError::ConfigError(
                "V_grid must be greater than or equal to 1 V to calculate timestep using CFL_factor"
                    .to_string(),
            ));
        }
        let vmax = (2.0 * Q_E / M_E * v_grid).sqrt();

        let mut spacing = domain.dz;
        if let Some(dx) = domain.dx {
            spacing = spacing.min(dx);
        }
        if domain.geometry == Geometry::XYZ {
            if let Some(dy) = domain.dy {
                spacing = spacing.min(dy);
            }
        }
        let dt_local = spacing / vmax * cfl;
        let dt = self.comm.all_reduce_scalar(dt_local, ReduceOp::Min)?;
        debug!(dt, vmax, "Timestep from CFL condition");
        self.dt = Some(dt);
        Ok(dt)
    }

    pub fn dt(&self) -> Option<f64> {
        self.dt
    }

    /// Current integer iteration.
    pub fn get_it(&self) -> u64 {
        self.step
    }

    pub fn set_step(&mut self, step: u64) {
        self.step = step;
    }

    pub fn advance(&mut self) -> u64 {
        self.step += 1;
        self.step
    }

    /// Simulation time, `(it - 1) * dt`.
    pub fn get_t(&self) -> f64 {
        (self.step as f64 - 1.0) * self.dt.unwrap_or(0.0)
    }

    pub fn eval_expression_t(&self, value: &TimeValue) -> MwxResult<f64> {
        value.evaluate(self.evaluator.as_ref(), self.get_t())
    }

    pub fn evaluator(&self) -> &dyn ExpressionEvaluator {
        self.evaluator.as_ref()
    }

    pub fn comm(&self) -> &dyn Communicator {
        self.comm.as_ref()
    }

    pub fn level(&self) -> usize {
        self.level
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    pub fn init_run(&mut self) -> MwxResult<()> {
        if self.initialized {
            return Err(MwxError::ConfigError(
                "Attempted to initialize the run multiple times".to_string(),
            ));
        }
        self.domain()?;
        if self.dt.is_none() {
            return Err(MwxError::ConfigError(
                "init_timestep must be called before init_run".to_string(),
            ));
        }
        self.embedded_boundary.freeze();
        self.initialized = true;
        info!(
            rank = self.comm.rank(),
            n_procs = self.comm.size(),
            n_species = self.species.len(),
            n_assemblies = self.assemblies.len(),
            "Successfully initialized run"
        );
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    // ── Embedded boundary ────────────────────────────────────────────

    pub fn embedded_boundary(&self) -> &EmbeddedBoundary {
        &self.embedded_boundary
    }

    pub fn embedded_boundary_mut(&mut self) -> &mut EmbeddedBoundary {
        &mut self.embedded_boundary
    }

    // ── Field solve ──────────────────────────────────────────────────

    pub fn install_solver(&mut self, solver: Box<dyn FieldSolver>) {
        self.callbacks.install_poisson_solver(solver);
    }

    pub fn callbacks(&self) -> &Callbacks {
        &self.callbacks
    }

    /// Per-step Poisson hook. Does nothing before `init_run`.
    pub fn run_poisson_solver(&mut self, fields: &mut dyn FieldAccess) -> MwxResult<()> {
        if !self.initialized {
            return Ok(());
        }
        let ctx = SolveContext {
            t: self.get_t(),
            evaluator: self.evaluator.as_ref(),
        };
        self.callbacks.call_poisson_solver(&ctx, fields)
    }

    // ── Assemblies ───────────────────────────────────────────────────

    pub fn register_assembly(&mut self, assembly: Assembly) -> AssemblyId {
        self.assemblies.push(assembly);
        AssemblyId(self.assemblies.len() - 1)
    }

    pub fn assembly(&self, id: AssemblyId) -> Option<&Assembly> {
        self.assemblies.get(id.0)
    }

    pub fn assemblies(&self) -> &[Assembly] {
        &self.assemblies
    }

    pub fn find_assembly(&self, name: &str) -> Option<AssemblyId> {
        self.assemblies
            .iter()
            .position(|a| a.name() == name)
            .map(AssemblyId)
    }

    /// Move this step's scraped particles from the engine buffers into each
    /// assembly's records, in registration order.
    pub fn record_scraped_particles(&mut self, buffers: &dyn BoundaryBufferAccess) -> MwxResult<()> {
        let geometry = self.geometry()?;
        let ctx = ScrapeContext {
            t: self.get_t(),
            step: self.step,
            geometry,
            species: &self.species,
            evaluator: self.evaluator.as_ref(),
            buffers,
            level: self.level,
        };
        let mut pass = ScrapePass::new(self.step);
        for assembly in &mut self.assemblies {
            assembly.record_scraped_particles(&ctx, &mut pass)?;
        }
        Ok(())
    }

    /// Scraped-particle table of one assembly, summed across ranks.
    pub fn scraped_particles(&mut self, id: AssemblyId, clear: bool) -> MwxResult<FieldTable> {
        let assembly = self
            .assemblies
            .get_mut(id.0)
            .ok_or_else(|| MwxError::ConfigError(format!("No assembly with index {}", id.0)))?;
        assembly.get_scraped_particles(self.comm.as_ref(), clear)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::GridFields;
    use crate::poisson::DummyPoissonSolver;

    fn xz_run() -> MwxRun {
        let mut run = MwxRun::new();
        let domain = DomainDescriptor::new(Geometry::XZ, &[0.0, 0.0], &[1e-3, 2e-3], &[10, 20]).unwrap();
        run.init_grid(domain, Some(1)).unwrap();
        run
    }

    #[test]
    fn test_clock() {
        let mut run = xz_run();
        run.init_timestep(Some(1e-12), None, 5.0).unwrap();
        assert_eq!(run.get_t(), -1e-12);
        run.set_step(3);
        assert!((run.get_t() - 2e-12).abs() < 1e-24);
        assert_eq!(run.advance(), 4);
    }

    #[test]
    fn test_cfl_timestep() {
        let mut run = xz_run();
        let dt = run.init_timestep(None, Some(0.5), -5.0).unwrap();
        let vmax = (2.0 * Q_E / M_E * 5.0).sqrt();
        assert!((dt - 1e-4 / vmax * 0.5).abs() < 1e-25);
    }

    #[test]
    fn test_timestep_errors() {
        let mut run = MwxRun::new();
        assert!(run.init_timestep(Some(1e-12), None, 5.0).is_err());
        let mut run = xz_run();
        assert!(run.init_timestep(None, None, 5.0).is_err());
        assert!(run.init_timestep(None, Some(0.5), 0.5).is_err());
    }

    #[test]
    fn test_double_init_rejected() {
        let mut run = xz_run();
        run.init_timestep(Some(1e-12), None, 5.0).unwrap();
        run.init_run().unwrap();
        assert!(run.init_run().is_err());
        assert!(run
            .embedded_boundary_mut()
            .union_with("-(x)", &TimeValue::Constant(0.0))
            .is_err());
    }

    #[test]
    fn test_duplicate_grid_and_species() {
        let mut run = xz_run();
        let domain = DomainDescriptor::new(Geometry::Z, &[0.0], &[1.0], &[4]).unwrap();
        assert!(run.init_grid(domain, None).is_err());
        run.add_species("electrons", -Q_E, M_E).unwrap();
        assert!(run.add_species("electrons", -Q_E, M_E).is_err());
        assert_eq!(run.add_species("ions", Q_E, 1e-26).unwrap().species_id, 1);
    }

    #[test]
    fn test_solver_hook_waits_for_init() {
        let mut run = xz_run();
        run.init_timestep(Some(1e-12), None, 5.0).unwrap();
        run.install_solver(Box::new(DummyPoissonSolver::new()));
        let mut fields = GridFields::new(10, 20);
        run.run_poisson_solver(&mut fields).unwrap();
        run.init_run().unwrap();
        run.run_poisson_solver(&mut fields).unwrap();
        assert_eq!(run.callbacks().n_poisson_calls(), 1);
    }

    #[test]
    fn test_time_expression() {
        let mut run = xz_run();
        run.init_timestep(Some(0.5), None, 5.0).unwrap();
        run.set_step(5);
        assert_eq!(run.eval_expression_t(&TimeValue::from("2*t")).unwrap(), 4.0);
        assert_eq!(run.eval_expression_t(&TimeValue::Constant(3.0)).unwrap(), 3.0);
    }
}
