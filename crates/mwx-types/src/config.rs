// ─────────────────────────────────────────────────────────────────────
// MEWarpX-RS — Config
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
use serde::{Deserialize, Serialize};

use crate::error::{MwxError, MwxResult};
use crate::grid::{DomainDescriptor, FieldBoundary, Geometry, ParticleBoundary, Side};
use crate::time::TimeValue;

/// Top-level run configuration, loaded from JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default = "default_run_name")]
    pub name: String,
    pub grid: GridConfig,
    #[serde(default)]
    pub timestep: TimestepConfig,
    #[serde(default)]
    pub species: Vec<SpeciesConfig>,
    #[serde(default)]
    pub assemblies: Vec<AssemblyConfig>,
    #[serde(default)]
    pub solver: SolverKind,
    #[serde(default)]
    pub control: ControlConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas: Option<GasConfig>,
}

fn default_run_name() -> String {
    "mewarpx".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridConfig {
    pub geometry: Geometry,
    pub lower_bound: Vec<f64>,
    pub upper_bound: Vec<f64>,
    pub number_of_cells: Vec<usize>,
    /// Minimum number of tiles the domain is split into.
    #[serde(default = "default_min_tiles")]
    pub min_tiles: usize,
    #[serde(default)]
    pub field_boundaries: Vec<BoundaryOverride<FieldBoundary>>,
    #[serde(default)]
    pub particle_boundaries: Vec<BoundaryOverride<ParticleBoundary>>,
}

fn default_min_tiles() -> usize {
    1
}

/// Replaces the default boundary condition on one face.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoundaryOverride<T> {
    pub axis: String,
    pub side: Side,
    pub value: T,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimestepConfig {
    /// Explicit step size (s); takes precedence over the CFL estimate.
    #[serde(default)]
    pub dt: Option<f64>,
    #[serde(default)]
    pub cfl_factor: Option<f64>,
    /// Largest expected bias (V) used to bound particle speeds.
    #[serde(default = "default_v_grid")]
    pub v_grid: f64,
}

fn default_v_grid() -> f64 {
    5.0
}

impl Default for TimestepConfig {
    fn default() -> Self {
        TimestepConfig {
            dt: None,
            cfl_factor: None,
            v_grid: default_v_grid(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeciesConfig {
    pub name: String,
    /// Signed charge per physical particle (C).
    pub sq: f64,
    /// Mass per physical particle (kg).
    pub mass: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum AssemblyConfig {
    Cathode {
        v: TimeValue,
        t: TimeValue,
        wf: TimeValue,
    },
    Anode {
        /// Defaults to the domain's upper z limit.
        #[serde(default)]
        z: Option<f64>,
        v: TimeValue,
        t: TimeValue,
        wf: TimeValue,
    },
    ZPlane {
        name: String,
        z: f64,
        zsign: i32,
        v: TimeValue,
        t: TimeValue,
        wf: TimeValue,
    },
    InfCylinderY {
        name: String,
        center_x: f64,
        center_z: f64,
        radius: f64,
        v: TimeValue,
        t: TimeValue,
        wf: TimeValue,
        #[serde(default = "default_install")]
        install_in_simulation: bool,
    },
    CylinderZ {
        name: String,
        r_outer: f64,
        #[serde(default)]
        r_inner: f64,
        #[serde(default)]
        zmin: Option<f64>,
        #[serde(default)]
        zmax: Option<f64>,
        v: TimeValue,
        t: TimeValue,
        wf: TimeValue,
        #[serde(default = "default_install")]
        install_in_simulation: bool,
    },
    Rectangle {
        name: String,
        center_x: f64,
        center_z: f64,
        length_x: f64,
        length_z: f64,
        v: TimeValue,
        t: TimeValue,
        wf: TimeValue,
        #[serde(default = "default_install")]
        install_in_simulation: bool,
    },
}

fn default_install() -> bool {
    true
}

/// Which field solver hook to install.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolverKind {
    /// Leave the engine's own solver in place.
    #[default]
    Engine,
    #[serde(rename = "pseudo_1d")]
    PseudoOneD,
    Dummy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlConfig {
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,
}

fn default_max_steps() -> usize {
    1
}

impl Default for ControlConfig {
    fn default() -> Self {
        ControlConfig {
            max_steps: default_max_steps(),
        }
    }
}

/// Neutral background gas for Monte Carlo collisions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GasConfig {
    pub electron_species: String,
    pub ion_species: String,
    /// Element symbol of the neutral: `He`, `Ar` or `Xe`.
    pub gas_type: String,
    /// Gas temperature (K).
    pub temperature: f64,
    #[serde(default)]
    pub pressure_torr: Option<f64>,
    /// Neutral density (m^-3).
    #[serde(default)]
    pub density: Option<f64>,
    #[serde(default)]
    pub cross_section_files: Vec<String>,
    #[serde(default)]
    pub exclude_collisions: Vec<String>,
}

impl RunConfig {
    pub fn from_file(path: &str) -> MwxResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)?;
        Ok(config)
    }

    /// Domain descriptor with boundary overrides applied.
    pub fn create_domain(&self) -> MwxResult<DomainDescriptor> {
        let g = &self.grid;
        let mut domain = DomainDescriptor::new(
            g.geometry,
            &g.lower_bound,
            &g.upper_bound,
            &g.number_of_cells,
        )?;
        for o in &g.field_boundaries {
            domain.set_field_boundary(&o.axis, o.side, o.value)?;
        }
        for o in &g.particle_boundaries {
            domain.set_particle_boundary(&o.axis, o.side, o.value)?;
        }
        Ok(domain)
    }

    /// Species ids are assigned in declaration order; names must be unique.
    pub fn validate_species(&self) -> MwxResult<()> {
        for (i, s) in self.species.iter().enumerate() {
            if self.species[..i].iter().any(|o| o.name == s.name) {
                return Err(MwxError::ConfigError(format!(
                    "Duplicate species name '{}'",
                    s.name
                )));
            }
            if !(s.mass > 0.0) {
                return Err(MwxError::ConfigError(format!(
                    "Species '{}' must have positive mass, got {}",
                    s.name, s.mass
                )));
            }
        }
        Ok(())
    }
}
