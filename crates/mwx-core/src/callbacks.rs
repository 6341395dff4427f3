// ─────────────────────────────────────────────────────────────────────
// MEWarpX-RS — Callbacks
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Per-step hooks invoked by the engine loop.

use mwx_types::error::MwxResult;
use tracing::warn;

use crate::fields::FieldAccess;
use crate::poisson::{FieldSolver, SolveContext};

/// Registry holding at most one Poisson hook.
#[derive(Default)]
pub struct Callbacks {
    poisson: Option<Box<dyn FieldSolver>>,
    n_poisson_calls: u64,
}

impl Callbacks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `solver` as the field-solve hook, replacing any previous one.
    pub fn install_poisson_solver(&mut self, solver: Box<dyn FieldSolver>) {
        if let Some(old) = &self.poisson {
            warn!(
                "Replacing Poisson solver hook '{}' with '{}'",
                old.name(),
                solver.name()
            );
        }
        self.poisson = Some(solver);
    }

    pub fn has_poisson_solver(&self) -> bool {
        self.poisson.is_some()
    }

    pub fn poisson_solver_name(&self) -> Option<&str> {
        self.poisson.as_ref().map(|s| s.name())
    }

    pub fn n_poisson_calls(&self) -> u64 {
        self.n_poisson_calls
    }

    /// Run the installed hook, if any.
    pub fn call_poisson_solver(&mut self, ctx: &SolveContext<'_>, fields: &mut dyn FieldAccess) -> MwxResult<()> {
        if let Some(solver) = self.poisson.as_mut() {
            solver.solve(ctx, fields)?;
            self.n_poisson_calls += 1;
        }
        Ok(())
    }
}

impl std::fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Callbacks")
            .field("poisson", &self.poisson_solver_name())
            .field("n_poisson_calls", &self.n_poisson_calls)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::GridFields;
    use crate::poisson::DummyPoissonSolver;
    use mwx_math::parser::ParserEvaluator;

    #[test]
    fn test_empty_registry_is_noop() {
        let mut cb = Callbacks::new();
        let mut fields = GridFields::new(2, 2);
        let ctx = SolveContext {
            t: 0.0,
            evaluator: &ParserEvaluator,
        };
        cb.call_poisson_solver(&ctx, &mut fields).unwrap();
        assert_eq!(cb.n_poisson_calls(), 0);
    }

    #[test]
    fn test_second_install_replaces() {
        let mut cb = Callbacks::new();
        cb.install_poisson_solver(Box::new(DummyPoissonSolver::new()));
        cb.install_poisson_solver(Box::new(DummyPoissonSolver::new()));
        assert_eq!(cb.poisson_solver_name(), Some("dummy"));
    }
}
