// ─────────────────────────────────────────────────────────────────────
// MEWarpX-RS — Monte Carlo Collisions
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Neutral background gas and the collision processes handed to the engine.
//!
//! Processes are discovered from cross-section file names
//! (`<process>.dat`); file contents are read by the engine, not here.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use mwx_math::physics::ideal_gas_density;
use mwx_types::error::{MwxError, MwxResult};
use serde::Serialize;
use tracing::{debug, info};

use crate::species::Species;

/// One scattering channel of an MCC collision set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScatteringProcess {
    pub cross_section: PathBuf,
    /// Threshold energy (eV) for inelastic channels.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub energy: Option<f64>,
    /// Species created by the process (ionization).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub species: Option<String>,
}

/// Collisions of one projectile species with the background gas.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MccCollisions {
    pub name: String,
    pub species: String,
    pub background_density: f64,
    pub background_temperature: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_mass: Option<f64>,
    /// Keyed by engine process type (`elastic`, `ionization`, ...).
    pub scattering_processes: BTreeMap<String, ScatteringProcess>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MccGas {
    pub name: String,
    pub gas_type: String,
    pub temperature: f64,
    pub density: f64,
    pub electron_mcc: Option<MccCollisions>,
    pub ion_mcc: Option<MccCollisions>,
}

fn electron_process(key: &str) -> Option<&'static str> {
    match key {
        "electron_scattering" => Some("elastic"),
        "excitation_1" => Some("excitation1"),
        "excitation_2" => Some("excitation2"),
        "ionization" => Some("ionization"),
        _ => None,
    }
}

fn ion_process(key: &str) -> Option<&'static str> {
    match key {
        "ion_scattering" => Some("elastic"),
        "ion_back_scatter" => Some("back"),
        "charge_exchange" => Some("charge_exchange"),
        _ => None,
    }
}

/// Threshold energy (eV) of an inelastic electron process in `gas`.
pub fn required_energy(gas: &str, key: &str) -> MwxResult<Option<f64>> {
    let table: &[(&str, f64)] = match gas {
        "He" => &[("excitation_1", 19.82), ("excitation_2", 20.61), ("ionization", 24.55)],
        "Ar" => &[("excitation_1", 11.5), ("ionization", 15.7596112)],
        "Xe" => &[("excitation_1", 8.315), ("ionization", 12.1298431)],
        other => {
            return Err(MwxError::ConfigError(format!(
                "No collision energies known for gas '{other}'"
            )))
        }
    };
    Ok(table.iter().find(|(k, _)| *k == key).map(|(_, e)| *e))
}

/// Cross-section files (`*.dat`) for `gas_type` under `root`, sorted.
pub fn cross_section_files(root: &Path, gas_type: &str) -> MwxResult<Vec<PathBuf>> {
    let dir = root.join(gas_type);
    let mut files = Vec::new();
    for entry in fs::read_dir(&dir)? {
        let path = entry?.path();
        if path.extension().is_some_and(|e| e == "dat") {
            files.push(path);
        }
    }
    files.sort();
    debug!(dir = %dir.display(), n = files.len(), "Found cross-section files");
    Ok(files)
}

impl MccGas {
    /// Background gas of `ion`'s neutral at `temperature` (K). Give exactly
    /// one of `pressure_torr` and `density` (m^-3).
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        electron: &Species,
        ion: &Species,
        gas_type: &str,
        temperature: f64,
        pressure_torr: Option<f64>,
        density: Option<f64>,
        files: &[PathBuf],
        exclude_collisions: &[String],
    ) -> MwxResult<Self> {
        let density = match (density, pressure_torr) {
            (Some(_), Some(_)) => {
                return Err(MwxError::ConfigError(
                    "Must specify N_INERT or P_INERT, not both".to_string(),
                ))
            }
            (None, None) => {
                return Err(MwxError::ConfigError(
                    "Must specify one of N_INERT or P_INERT".to_string(),
                ))
            }
            (Some(n), None) => n,
            (None, Some(p)) => ideal_gas_density(p, temperature),
        };

        let mut elec = BTreeMap::new();
        let mut ions = BTreeMap::new();
        for path in files {
            let key = path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(|n| n.split(".dat").next())
                .unwrap_or_default();
            if exclude_collisions.iter().any(|x| x == key) {
                continue;
            }
            if let Some(kind) = electron_process(key) {
                let process = ScatteringProcess {
                    cross_section: path.clone(),
                    energy: required_energy(gas_type, key)?,
                    species: (key == "ionization").then(|| ion.name.clone()),
                };
                elec.insert(kind.to_string(), process);
            } else if let Some(kind) = ion_process(key) {
                let process = ScatteringProcess {
                    cross_section: path.clone(),
                    energy: None,
                    species: None,
                };
                ions.insert(kind.to_string(), process);
            } else {
                return Err(MwxError::ConfigError(format!(
                    "{}: filename not recognized as an MCC cross-section file",
                    path.display()
                )));
            }
        }

        if elec.is_empty() && ions.is_empty() {
            return Err(MwxError::ConfigError(
                "No scattering processes for electron or ion species.".to_string(),
            ));
        }

        let electron_mcc = (!elec.is_empty()).then(|| MccCollisions {
            name: format!("coll_{}", electron.name),
            species: electron.name.clone(),
            background_density: density,
            background_temperature: temperature,
            background_mass: Some(ion.mass),
            scattering_processes: elec,
        });
        let ion_mcc = (!ions.is_empty()).then(|| MccCollisions {
            name: format!("coll_{}", ion.name),
            species: ion.name.clone(),
            background_density: density,
            background_temperature: temperature,
            background_mass: None,
            scattering_processes: ions,
        });

        info!(
            gas = gas_type,
            density,
            temperature,
            n_electron = electron_mcc.as_ref().map_or(0, |c| c.scattering_processes.len()),
            n_ion = ion_mcc.as_ref().map_or(0, |c| c.scattering_processes.len()),
            "Configured MCC background gas"
        );

        Ok(MccGas {
            name: format!("mcc_{}_{}", electron.name, ion.name),
            gas_type: gas_type.to_string(),
            temperature,
            density,
            electron_mcc,
            ion_mcc,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mwx_types::constants::{M_E, Q_E};

    fn species() -> (Species, Species) {
        (
            Species::new("electrons", 0, -Q_E, M_E).unwrap(),
            Species::new("he_ions", 1, Q_E, 6.646e-27).unwrap(),
        )
    }

    fn files(names: &[&str]) -> Vec<PathBuf> {
        names.iter().map(|n| PathBuf::from(format!("/xs/He/{n}.dat"))).collect()
    }

    #[test]
    fn test_density_from_pressure() {
        let (e, i) = species();
        let gas = MccGas::new(&e, &i, "He", 300.0, Some(2.0), None, &files(&["ionization"]), &[]).unwrap();
        assert!((gas.density / ideal_gas_density(2.0, 300.0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_exactly_one_of_pressure_and_density() {
        let (e, i) = species();
        let f = files(&["ionization"]);
        assert!(MccGas::new(&e, &i, "He", 300.0, Some(2.0), Some(1e20), &f, &[]).is_err());
        assert!(MccGas::new(&e, &i, "He", 300.0, None, None, &f, &[]).is_err());
    }

    #[test]
    fn test_catalogue() {
        let (e, i) = species();
        let f = files(&[
            "electron_scattering",
            "excitation_1",
            "excitation_2",
            "ionization",
            "ion_scattering",
            "charge_exchange",
        ]);
        let exclude = vec!["excitation_2".to_string()];
        let gas = MccGas::new(&e, &i, "He", 300.0, None, Some(1e21), &f, &exclude).unwrap();
        let elec = gas.electron_mcc.unwrap();
        assert_eq!(elec.scattering_processes.len(), 3);
        assert_eq!(elec.scattering_processes["excitation1"].energy, Some(19.82));
        assert_eq!(elec.scattering_processes["ionization"].species.as_deref(), Some("he_ions"));
        assert_eq!(elec.scattering_processes["elastic"].energy, None);
        assert_eq!(elec.background_mass, Some(6.646e-27));
        let ion = gas.ion_mcc.unwrap();
        assert!(ion.scattering_processes.contains_key("charge_exchange"));
        assert_eq!(ion.name, "coll_he_ions");
    }

    #[test]
    fn test_unknown_file_rejected() {
        let (e, i) = species();
        let err = MccGas::new(&e, &i, "He", 300.0, Some(1.0), None, &files(&["readme"]), &[]);
        assert!(matches!(err, Err(MwxError::ConfigError(_))));
    }

    #[test]
    fn test_empty_catalogue_rejected() {
        let (e, i) = species();
        let exclude = vec!["ionization".to_string()];
        let err = MccGas::new(&e, &i, "Ar", 300.0, Some(1.0), None, &files(&["ionization"]), &exclude)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Configuration error: No scattering processes for electron or ion species."
        );
    }

    #[test]
    fn test_energies() {
        assert_eq!(required_energy("Xe", "ionization").unwrap(), Some(12.1298431));
        assert_eq!(required_energy("Ar", "excitation_2").unwrap(), None);
        assert!(required_energy("Ne", "ionization").is_err());
    }
}
