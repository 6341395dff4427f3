// ─────────────────────────────────────────────────────────────────────
// MEWarpX-RS — Constants
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Physical constants in SI (and a few CGS) units.

use std::f64::consts::PI;

/// Elementary charge (C)
pub const Q_E: f64 = 1.602_176_634e-19;

/// Electron mass (kg)
pub const M_E: f64 = 9.109_383_701_5e-31;

/// Boltzmann constant (J/K)
pub const KB_J: f64 = 1.380_649e-23;

/// Vacuum permittivity (F/m)
pub const EPSILON_0: f64 = 8.854_187_812_8e-12;

/// Planck constant (J s)
pub const H_PLANCK: f64 = 6.626_070_15e-34;

/// 1 eV in J
pub const EV_SI: f64 = Q_E;

/// 1 torr in Pa
pub const TORR_SI: f64 = 133.322_368_421;

/// 1 erg in J
pub const ERG_SI: f64 = 1e-7;

/// Boltzmann constant (erg/K)
pub const KB_CGS: f64 = KB_J / ERG_SI;

/// 1 torr in dyne/cm^2
pub const TORR_CGS: f64 = TORR_SI * 10.0;

/// Boltzmann constant (eV/K)
pub const KB_EV: f64 = KB_J / Q_E;

/// Theoretical Richardson constant, ~120 A/cm^2/K^2.
pub fn richardson_a0() -> f64 {
    4.0 * PI * M_E * KB_J * KB_J * Q_E / H_PLANCK.powi(3) * 1e-4
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_richardson_constant_near_120() {
        let a0 = richardson_a0();
        assert!((a0 - 120.17).abs() < 0.1, "A0 = {a0}");
    }

    #[test]
    fn test_kb_ev() {
        assert!((KB_EV - 8.617_333e-5).abs() < 1e-10);
    }
}
