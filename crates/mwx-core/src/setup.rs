// ─────────────────────────────────────────────────────────────────────
// MEWarpX-RS — Run Setup
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Build a run context from a JSON [`RunConfig`].

use std::path::PathBuf;

use mwx_types::config::{AssemblyConfig, RunConfig, SolverKind};
use mwx_types::error::{MwxError, MwxResult};
use tracing::info;

use crate::assembly::Assembly;
use crate::mcc::MccGas;
use crate::poisson::{DummyPoissonSolver, PoissonSolverPseudo1D};
use crate::run::{AssemblyId, MwxRun};
use crate::sim_control::SimControl;

/// Everything a configured run needs before the engine starts stepping.
#[derive(Debug)]
pub struct Simulation {
    pub run: MwxRun,
    /// In declaration order.
    pub assemblies: Vec<AssemblyId>,
    pub control: SimControl,
    pub gas: Option<MccGas>,
}

pub trait RunBuilder {
    /// Build on a fresh single-process run.
    fn build(&self) -> MwxResult<Simulation> {
        self.build_on(MwxRun::new())
    }

    /// Build on `run`, which carries the communicator and evaluator.
    fn build_on(&self, run: MwxRun) -> MwxResult<Simulation>;
}

impl RunBuilder for RunConfig {
    fn build_on(&self, mut run: MwxRun) -> MwxResult<Simulation> {
        self.validate_species()?;

        let domain = self.create_domain()?;
        let min_tiles = (domain.dim() < 3).then_some(self.grid.min_tiles);
        run.init_grid(domain, min_tiles)?;

        for species in &self.species {
            run.add_species(&species.name, species.sq, species.mass)?;
        }

        let ts = &self.timestep;
        run.init_timestep(ts.dt, ts.cfl_factor, ts.v_grid)?;

        let mut assemblies = Vec::with_capacity(self.assemblies.len());
        for cfg in &self.assemblies {
            let assembly = build_assembly(&mut run, cfg)?;
            assemblies.push(run.register_assembly(assembly));
        }

        // after the assemblies: the solver consumes the face potentials
        match self.solver {
            SolverKind::Engine => {}
            SolverKind::PseudoOneD => {
                let solver = PoissonSolverPseudo1D::new(run.domain_mut()?)?;
                run.install_solver(Box::new(solver));
            }
            SolverKind::Dummy => run.install_solver(Box::new(DummyPoissonSolver::new())),
        }

        let gas = match &self.gas {
            None => None,
            Some(g) => {
                let lookup = |name: &str| {
                    run.species_by_name(name).ok_or_else(|| {
                        MwxError::ConfigError(format!("Gas refers to undeclared species '{name}'"))
                    })
                };
                let files: Vec<PathBuf> = g.cross_section_files.iter().map(PathBuf::from).collect();
                Some(MccGas::new(
                    lookup(&g.electron_species)?,
                    lookup(&g.ion_species)?,
                    &g.gas_type,
                    g.temperature,
                    g.pressure_torr,
                    g.density,
                    &files,
                    &g.exclude_collisions,
                )?)
            }
        };

        let control = SimControl::new(self.control.max_steps as u64)?;

        info!(
            name = %self.name,
            n_assemblies = assemblies.len(),
            solver = ?self.solver,
            "Run configured"
        );
        Ok(Simulation {
            run,
            assemblies,
            control,
            gas,
        })
    }
}

fn build_assembly(run: &mut MwxRun, cfg: &AssemblyConfig) -> MwxResult<Assembly> {
    match cfg.clone() {
        AssemblyConfig::Cathode { v, t, wf } => Assembly::cathode(run, v, t, wf),
        AssemblyConfig::Anode { z, v, t, wf } => {
            let z = match z {
                Some(z) => z,
                None => run.domain()?.zmax,
            };
            Assembly::anode(run, z, v, t, wf)
        }
        AssemblyConfig::ZPlane {
            name,
            z,
            zsign,
            v,
            t,
            wf,
        } => Assembly::z_plane(run, &name, z, zsign, v, t, wf),
        AssemblyConfig::InfCylinderY {
            name,
            center_x,
            center_z,
            radius,
            v,
            t,
            wf,
            install_in_simulation,
        } => Assembly::inf_cylinder_y(
            run,
            &name,
            center_x,
            center_z,
            radius,
            v,
            t,
            wf,
            install_in_simulation,
        ),
        AssemblyConfig::CylinderZ {
            name,
            r_outer,
            r_inner,
            zmin,
            zmax,
            v,
            t,
            wf,
            install_in_simulation,
        } => {
            if !install_in_simulation {
                return Err(MwxError::ConfigError(format!(
                    "CylinderZ '{name}' is always installed in the simulation"
                )));
            }
            Assembly::cylinder_z(run, &name, r_outer, r_inner, zmin, zmax, v, t, wf)
        }
        AssemblyConfig::Rectangle {
            name,
            center_x,
            center_z,
            length_x,
            length_z,
            v,
            t,
            wf,
            install_in_simulation,
        } => Assembly::rectangle(
            run,
            &name,
            center_x,
            center_z,
            length_x,
            length_z,
            v,
            t,
            wf,
            install_in_simulation,
        ),
    }
}
