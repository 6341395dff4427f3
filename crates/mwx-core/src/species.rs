// ─────────────────────────────────────────────────────────────────────
// MEWarpX-RS — Species
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Particle species known to the run.

use mwx_types::config::SpeciesConfig;
use mwx_types::error::{MwxError, MwxResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Species {
    pub name: String,
    /// Engine-assigned index, in declaration order.
    pub species_id: usize,
    /// Signed charge per physical particle (C).
    pub sq: f64,
    /// Mass per physical particle (kg).
    pub mass: f64,
}

impl Species {
    pub fn new(name: &str, species_id: usize, sq: f64, mass: f64) -> MwxResult<Self> {
        if !(mass > 0.0) {
            return Err(MwxError::ConfigError(format!(
                "Species '{name}' must have positive mass, got {mass}"
            )));
        }
        Ok(Species {
            name: name.to_string(),
            species_id,
            sq,
            mass,
        })
    }

    pub fn from_config(cfg: &SpeciesConfig, species_id: usize) -> MwxResult<Self> {
        Species::new(&cfg.name, species_id, cfg.sq, cfg.mass)
    }
}
