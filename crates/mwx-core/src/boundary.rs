// ─────────────────────────────────────────────────────────────────────
// MEWarpX-RS — Embedded Boundary
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Union of all embedded conductors, as handed to the engine.
//!
//! Each conductor contributes an implicit function (positive inside). The
//! union is the running `max` of the individual functions; the potential
//! is a chain of `if(f>0, V, ...)` so that the most recently added
//! conductor wins where regions overlap.

use mwx_math::parser::Expr;
use mwx_types::error::{MwxError, MwxResult};
use mwx_types::time::TimeValue;
use ndarray::{Array1, ArrayView1};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmbeddedBoundary {
    implicit_function: Option<String>,
    potential: Option<String>,
    n_conductors: usize,
    frozen: bool,
}

impl EmbeddedBoundary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one conductor into the union.
    pub fn union_with(&mut self, implicit_function: &str, voltage: &TimeValue) -> MwxResult<()> {
        if self.frozen {
            return Err(MwxError::ConfigError(
                "Embedded boundary cannot change after the run is initialized".to_string(),
            ));
        }
        // reject malformed functions before they reach the engine
        Expr::parse(implicit_function)?;

        self.potential = Some(match self.potential.take() {
            None => voltage.to_string(),
            Some(old) => format!("if({implicit_function}>0,{voltage},{old})"),
        });
        self.implicit_function = Some(match self.implicit_function.take() {
            None => implicit_function.to_string(),
            Some(old) => format!("max({old},{implicit_function})"),
        });
        self.n_conductors += 1;
        Ok(())
    }

    pub fn implicit_function(&self) -> Option<&str> {
        self.implicit_function.as_deref()
    }

    pub fn potential(&self) -> Option<&str> {
        self.potential.as_deref()
    }

    pub fn n_conductors(&self) -> usize {
        self.n_conductors
    }

    pub fn is_empty(&self) -> bool {
        self.n_conductors == 0
    }

    pub(crate) fn freeze(&mut self) {
        self.frozen = true;
    }

    /// Evaluate the merged implicit function at points in the x-z plane.
    /// Returns all -1 (outside) when no conductor is installed.
    pub fn evaluate(
        &self,
        x: ArrayView1<f64>,
        y: ArrayView1<f64>,
        z: ArrayView1<f64>,
    ) -> MwxResult<Array1<f64>> {
        let n = x.len();
        if y.len() != n || z.len() != n {
            return Err(MwxError::ShapeMismatch {
                what: "embedded boundary coordinates".to_string(),
                expected: vec![n, n, n],
                got: vec![x.len(), y.len(), z.len()],
            });
        }
        let Some(src) = self.implicit_function.as_deref() else {
            return Ok(Array1::from_elem(n, -1.0));
        };
        let expr = Expr::parse(src)?;
        Ok(Array1::from_shape_fn(n, |k| expr.eval_at(x[k], y[k], z[k], 0.0)))
    }

    /// Evaluate the merged potential at one point and time.
    pub fn potential_at(&self, x: f64, y: f64, z: f64, t: f64) -> MwxResult<Option<f64>> {
        match self.potential.as_deref() {
            None => Ok(None),
            Some(src) => Ok(Some(Expr::parse(src)?.eval_at(x, y, z, t))),
        }
    }
}
