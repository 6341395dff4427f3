// ─────────────────────────────────────────────────────────────────────
// MEWarpX-RS — Simulation Control
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Decide whether the step loop should keep going.
//!
//! ```ignore
//! while control.check_criteria(run.get_it()) {
//!     engine.step(steps_per_loop);
//! }
//! ```

use mwx_types::error::{MwxError, MwxResult};
use tracing::info;

type Criterion = Box<dyn Fn() -> bool + Send>;

pub struct SimControl {
    max_steps: u64,
    criteria: Vec<(String, Criterion)>,
}

impl SimControl {
    pub fn new(max_steps: u64) -> MwxResult<Self> {
        if max_steps < 1 {
            return Err(MwxError::ConfigError("max_steps must be >= 1".to_string()));
        }
        Ok(SimControl {
            max_steps,
            criteria: Vec::new(),
        })
    }

    pub fn max_steps(&self) -> u64 {
        self.max_steps
    }

    /// Add a named continuation criterion; it returns false to stop the run.
    pub fn add_checker(&mut self, name: &str, criterion: impl Fn() -> bool + Send + 'static) {
        self.criteria.push((name.to_string(), Box::new(criterion)));
    }

    pub fn n_criteria(&self) -> usize {
        self.criteria.len()
    }

    /// True if the run should continue past `step`.
    pub fn check_criteria(&self, step: u64) -> bool {
        if step >= self.max_steps {
            info!("SimControl: Max steps reached");
            return false;
        }
        let failed: Vec<&str> = self
            .criteria
            .iter()
            .filter(|(_, crit)| !crit())
            .map(|(name, _)| name.as_str())
            .collect();
        if failed.is_empty() {
            return true;
        }
        info!("SimControl: Termination from criteria: {}", failed.join(" "));
        false
    }
}

impl std::fmt::Debug for SimControl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.criteria.iter().map(|(n, _)| n.as_str()).collect();
        f.debug_struct("SimControl")
            .field("max_steps", &self.max_steps)
            .field("criteria", &names)
            .finish()
    }
}
