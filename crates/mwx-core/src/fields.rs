// ─────────────────────────────────────────────────────────────────────
// MEWarpX-RS — Field Access
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Charge-density and potential grids exchanged with the PIC engine.

use mwx_types::error::{MwxError, MwxResult};
use ndarray::{s, Array2};

/// Gathered (whole-domain) field data of a 2D simulation.
///
/// Node-centred arrays are shaped `[nx + 1, nz + 1]`; the potential with
/// one ghost layer per side is `[nx + 3, nz + 3]`.
pub trait FieldAccess {
    fn gathered_rho(&self) -> MwxResult<Array2<f64>>;

    fn gathered_phi(&self, include_ghosts: bool) -> MwxResult<Array2<f64>>;

    /// Overwrite the potential, ghost cells included.
    fn set_phi(&mut self, phi: &Array2<f64>) -> MwxResult<()>;
}

/// In-memory field storage.
#[derive(Debug, Clone)]
pub struct GridFields {
    nx: usize,
    nz: usize,
    rho: Array2<f64>,
    phi: Array2<f64>,
}

impl GridFields {
    pub fn new(nx: usize, nz: usize) -> Self {
        GridFields {
            nx,
            nz,
            rho: Array2::zeros((nx + 1, nz + 1)),
            phi: Array2::zeros((nx + 3, nz + 3)),
        }
    }

    pub fn set_rho(&mut self, rho: Array2<f64>) -> MwxResult<()> {
        check_shape("rho", &rho, (self.nx + 1, self.nz + 1))?;
        self.rho = rho;
        Ok(())
    }

    pub fn rho(&self) -> &Array2<f64> {
        &self.rho
    }

    pub fn phi(&self) -> &Array2<f64> {
        &self.phi
    }
}

pub(crate) fn check_shape(what: &str, arr: &Array2<f64>, expected: (usize, usize)) -> MwxResult<()> {
    if arr.dim() != expected {
        return Err(MwxError::ShapeMismatch {
            what: what.to_string(),
            expected: vec![expected.0, expected.1],
            got: arr.shape().to_vec(),
        });
    }
    Ok(())
}

impl FieldAccess for GridFields {
    fn gathered_rho(&self) -> MwxResult<Array2<f64>> {
        Ok(self.rho.clone())
    }

    fn gathered_phi(&self, include_ghosts: bool) -> MwxResult<Array2<f64>> {
        if include_ghosts {
            Ok(self.phi.clone())
        } else {
            Ok(self.phi.slice(s![1..self.nx + 2, 1..self.nz + 2]).to_owned())
        }
    }

    fn set_phi(&mut self, phi: &Array2<f64>) -> MwxResult<()> {
        check_shape("phi", phi, (self.nx + 3, self.nz + 3))?;
        self.phi.assign(phi);
        Ok(())
    }
}
