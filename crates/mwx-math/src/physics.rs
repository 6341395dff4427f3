// ─────────────────────────────────────────────────────────────────────
// MEWarpX-RS — Plasma Utilities
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Closed-form plasma and gas relations.

use mwx_types::constants::{EPSILON_0, KB_CGS, KB_EV, KB_J, Q_E, TORR_CGS};

/// Neutral number density (m^-3) from pressure in Torr and temperature in K.
pub fn ideal_gas_density(p_torr: f64, t_kelvin: f64) -> f64 {
    p_torr * TORR_CGS / (KB_CGS * t_kelvin) * 1e6
}

/// Richardson-Dushman thermionic current density (A/m^2).
///
/// `wf` is the work function in eV, `a` the emission constant in A/m^2/K^2.
pub fn j_rd(t_kelvin: f64, wf: f64, a: f64) -> f64 {
    a * t_kelvin * t_kelvin * (-wf / (KB_EV * t_kelvin)).exp()
}

/// Thermal Debye length (m) for temperature in K and density in m^-3.
pub fn plasma_debye_length(t_kelvin: f64, n: f64) -> f64 {
    (EPSILON_0 * KB_J * t_kelvin / (n * Q_E * Q_E)).sqrt()
}

/// Round `x` to the nearest multiple of `base`, ties to even like NumPy.
pub fn mwx_round(x: f64, base: f64) -> f64 {
    let q = x / base;
    let r = q.round();
    let rounded = if (q - q.trunc()).abs() == 0.5 && r % 2.0 != 0.0 {
        r - q.signum()
    } else {
        r
    };
    base * rounded
}

#[cfg(test)]
mod tests {
    use super::*;
    use mwx_types::constants::richardson_a0;

    #[test]
    fn test_ideal_gas_one_torr_room_temperature() {
        // ~3.22e22 m^-3 at 1 Torr, 300 K
        let n = ideal_gas_density(1.0, 300.0);
        assert!((n / 3.219e22 - 1.0).abs() < 1e-3, "n = {n:e}");
    }

    #[test]
    fn test_j_rd_scales_with_work_function() {
        let a = richardson_a0() * 1e4;
        let j1 = j_rd(1500.0, 2.0, a);
        let j2 = j_rd(1500.0, 2.1, a);
        let expected = (-0.1 / (KB_EV * 1500.0)).exp();
        assert!((j2 / j1 - expected).abs() < 1e-12);
        assert!(j1 > 0.0);
    }

    #[test]
    fn test_debye_length_reference_value() {
        // 1 eV plasma at 1e16 m^-3 -> ~74 um
        let t = 1.0 / KB_EV;
        let l = plasma_debye_length(t, 1e16);
        assert!((l - 7.434e-5).abs() < 1e-7, "lambda_D = {l:e}");
    }

    #[test]
    fn test_mwx_round() {
        assert_eq!(mwx_round(7.3, 5.0), 5.0);
        assert_eq!(mwx_round(8.0, 5.0), 10.0);
        assert_eq!(mwx_round(2.5, 1.0), 2.0);
        assert_eq!(mwx_round(3.5, 1.0), 4.0);
        assert_eq!(mwx_round(-2.5, 1.0), -2.0);
        assert!((mwx_round(0.123, 0.05) - 0.1).abs() < 1e-12);
    }
}
