// ─────────────────────────────────────────────────────────────────────
// MEWarpX-RS — Sampling
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Random particle velocities and positions for emitters.
//!
//! All samplers take the RNG explicitly; pass a seeded `StdRng` for
//! reproducible draws.

use std::f64::consts::PI;

use mwx_types::constants::KB_J;
use mwx_types::error::{MwxError, MwxResult};
use ndarray::{Array1, Array2};
use rand::Rng;
use rand_distr::{Distribution, StandardNormal, Uniform};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmissionType {
    /// Flux-weighted emission along +z from a hot surface.
    Thermionic,
    /// Isotropic Maxwellian.
    Random,
    /// Maxwellian with |vz| along +z.
    HalfMaxwellian,
}

/// Velocity components for `num_samples` particles of mass `m` at `t_kelvin`.
///
/// `transverse_fac` scales the mean x/y energy (range 0..=2, clamped with a
/// warning) while vz is rescaled to conserve total mean energy. Only
/// thermionic emission accepts a factor other than 1.
pub fn get_velocities<R: Rng + ?Sized>(
    rng: &mut R,
    num_samples: usize,
    t_kelvin: f64,
    m: f64,
    emission_type: EmissionType,
    transverse_fac: f64,
) -> MwxResult<(Array1<f64>, Array1<f64>, Array1<f64>)> {
    if emission_type != EmissionType::Thermionic && (transverse_fac - 1.0).abs() > 1e-8 {
        return Err(MwxError::ConfigError(format!(
            "transverse_fac={transverse_fac} is only supported for thermionic emission"
        )));
    }
    if !(m > 0.0) || !(t_kelvin >= 0.0) {
        return Err(MwxError::ConfigError(format!(
            "Sampling needs m > 0 and T >= 0, got m={m}, T={t_kelvin}"
        )));
    }

    let sigma = (KB_J * t_kelvin / m).sqrt();
    let beta = if transverse_fac < 0.0 {
        tracing::warn!(transverse_fac, "transverse_fac out of bounds, clamping to 0");
        0.0
    } else if transverse_fac > 2.0 {
        tracing::warn!(transverse_fac, "transverse_fac out of bounds, clamping to 2");
        2.0_f64.sqrt()
    } else {
        transverse_fac.sqrt()
    };
    let alpha = (2.0 - beta * beta).sqrt();

    let vx = Array1::from_shape_fn(num_samples, |_| sigma * std_normal(rng) * beta);
    let vy = Array1::from_shape_fn(num_samples, |_| sigma * std_normal(rng) * beta);
    let vz = match emission_type {
        EmissionType::Random => {
            Array1::from_shape_fn(num_samples, |_| sigma * std_normal(rng) * beta)
        }
        EmissionType::Thermionic => Array1::from_shape_fn(num_samples, |_| {
            // Rayleigh-distributed normal component
            let p: f64 = rng.gen();
            (-2.0 * sigma * sigma * (1.0 - p).ln()).sqrt() * alpha
        }),
        EmissionType::HalfMaxwellian => {
            Array1::from_shape_fn(num_samples, |_| (sigma * std_normal(rng) * beta).abs())
        }
    };
    Ok((vx, vy, vz))
}

/// Uniform positions over `[xmin, xmax) x [ymin, ymax)` on the plane `z`.
pub fn get_positions<R: Rng + ?Sized>(
    rng: &mut R,
    num_samples: usize,
    xmin: f64,
    xmax: f64,
    ymin: f64,
    ymax: f64,
    z: f64,
) -> (Array1<f64>, Array1<f64>, Array1<f64>) {
    let x = Array1::from_shape_fn(num_samples, |_| uniform(rng, xmin, xmax));
    let y = Array1::from_shape_fn(num_samples, |_| uniform(rng, ymin, ymax));
    (x, y, Array1::from_elem(num_samples, z))
}

/// Positions uniform in area over an annular sector on the plane `z`.
pub fn get_positions_rz<R: Rng + ?Sized>(
    rng: &mut R,
    num_samples: usize,
    rmin: f64,
    rmax: f64,
    theta_min: f64,
    theta_max: f64,
    z: f64,
) -> (Array1<f64>, Array1<f64>, Array1<f64>) {
    let mut x = Array1::zeros(num_samples);
    let mut y = Array1::zeros(num_samples);
    for k in 0..num_samples {
        let r = uniform(rng, rmin * rmin, rmax * rmax).sqrt();
        let theta = uniform(rng, theta_min, theta_max);
        x[k] = r * theta.cos();
        y[k] = r * theta.sin();
    }
    (x, y, Array1::from_elem(num_samples, z))
}

/// Isotropic velocity vectors with the given magnitudes, shaped `[n, 3]`.
pub fn get_vel_vector<R: Rng + ?Sized>(rng: &mut R, v_mag: &Array1<f64>) -> Array2<f64> {
    let mut out = Array2::zeros((v_mag.len(), 3));
    for (k, &v) in v_mag.iter().enumerate() {
        let theta = rng.gen::<f64>() * 2.0 * PI;
        let cz = 2.0 * rng.gen::<f64>() - 1.0;
        let s = (1.0 - cz * cz).sqrt();
        out[[k, 0]] = v * s * theta.cos();
        out[[k, 1]] = v * s * theta.sin();
        out[[k, 2]] = v * cz;
    }
    out
}

fn std_normal<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    StandardNormal.sample(rng)
}

fn uniform<R: Rng + ?Sized>(rng: &mut R, lo: f64, hi: f64) -> f64 {
    if hi > lo {
        Uniform::new(lo, hi).sample(rng)
    } else {
        lo
    }
}
